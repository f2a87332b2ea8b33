//! Syntax tree produced by the parser and consumed by the evaluator

use crate::combine::CombineOp;
use crate::descriptor::TransformerKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RandomCount {
    Fixed(usize),
    /// `R(r,n)`: onset count drawn from a bell curve
    Bell,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Atom {
    Euclidean {
        onsets: usize,
        steps: usize,
        rotation: i64,
    },
    Polygon {
        vertices: usize,
        offset: i64,
        expansion: usize,
    },
    /// `B(k,n)` / `W(k,n)`
    Fill {
        onsets: usize,
        steps: usize,
        inverse: bool,
    },
    /// `D(k,n)`
    InverseEuclidean {
        onsets: usize,
        steps: usize,
    },
    Random {
        onsets: RandomCount,
        steps: usize,
        seed: Option<u64>,
    },
    Binary {
        digits: String,
        steps: Option<usize>,
    },
    Hex {
        digits: String,
        steps: Option<usize>,
    },
    Octal {
        digits: String,
        steps: Option<usize>,
    },
    Decimal {
        value: u64,
        steps: Option<usize>,
    },
    /// Dots and dashes, from `M:text` or a raw `.-` run
    Morse {
        code: String,
        steps: Option<usize>,
    },
    Onsets {
        indices: Vec<usize>,
        steps: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Expr {
    Atom(Atom),
    Invert(Box<Expr>),
    Reverse(Box<Expr>),
    Rotate { inner: Box<Expr>, amount: i64 },
    /// Negative step counts map counter-clockwise
    Quantize { inner: Box<Expr>, steps: i64 },
    Combine {
        left: Box<Expr>,
        op: CombineOp,
        right: Box<Expr>,
    },
    /// Juxtaposed expressions played back to back
    Concat(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Progression {
    pub kind: TransformerKind,
    pub target: usize,
}

/// One scene's worth of parsed notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Program {
    pub accent: Option<Expr>,
    pub rhythm: Expr,
    pub progression: Option<Progression>,
    pub rotation_step: Option<i64>,
    pub lengthening: Option<usize>,
}
