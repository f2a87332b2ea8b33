//! Turns a parsed [`Program`] into a [`PatternDescriptor`]

use crate::algorithms;
use crate::combine::{self, CombineOp};
use crate::convert;
use crate::descriptor::{PatternDescriptor, ProgressiveSpec};
use crate::error::{ConvertError, ParseError, Result};
use crate::indispensability;
use crate::sequence::{MAX_STEPS, StepSequence};

use super::ast::{Atom, Expr, Program, RandomCount};

const MAX_VERTICES: usize = 32;
const MAX_EXPANSION: usize = 21;
/// Mixed into derived seeds for `R(..)` without an explicit seed
const DEFAULT_RANDOM_SEED: u64 = 0x5EED_CAFE;
/// Bare decimal literals default to at least one bar of eighths
const MIN_DECIMAL_STEPS: usize = 8;

/// Intermediate result; polygons remember their shape so a pure polygon
/// combination can be re-projected instead of tiled.
struct Value {
    steps: Vec<bool>,
    polygon: Option<(usize, i64)>,
}

impl Value {
    fn plain(steps: Vec<bool>) -> Self {
        Self {
            steps,
            polygon: None,
        }
    }
}

fn check_steps(steps: usize, what: &str) -> Result<()> {
    if steps == 0 {
        return Err(ParseError::range(format!("{what} needs at least one step")));
    }
    if steps > MAX_STEPS {
        return Err(ParseError::range(format!(
            "{what} has {steps} steps, the maximum is {MAX_STEPS}"
        )));
    }
    Ok(())
}

fn check_onsets(onsets: usize, steps: usize, what: &str) -> Result<()> {
    if onsets > steps {
        return Err(ParseError::range(format!(
            "{what} asks for {onsets} onsets in {steps} steps"
        )));
    }
    Ok(())
}

fn convert_error(err: ConvertError) -> ParseError {
    ParseError::range(err.to_string())
}

pub(crate) fn evaluate(program: &Program, source: &str) -> Result<PatternDescriptor> {
    let rhythm = eval_expr(&program.rhythm)?;
    let steps = StepSequence::new(rhythm.steps)
        .ok_or_else(|| ParseError::range("pattern needs at least one step"))?;

    let accents = program
        .accent
        .as_ref()
        .map(|expr| {
            let value = eval_expr(expr)?;
            StepSequence::new(value.steps)
                .ok_or_else(|| ParseError::range("accent pattern needs at least one step"))
        })
        .transpose()?;

    let progressive = program
        .progression
        .as_ref()
        .map(|p| {
            if p.target > steps.len() {
                return Err(ParseError::range(format!(
                    "progressive target {} exceeds {} steps",
                    p.target,
                    steps.len()
                )));
            }
            Ok(ProgressiveSpec::new(p.kind, p.target, steps.clone()))
        })
        .transpose()?;

    Ok(PatternDescriptor::new(steps, source)
        .with_accents(accents)
        .with_progressive(progressive)
        .with_rotation_step(program.rotation_step)
        .with_lengthening(program.lengthening))
}

fn eval_expr(expr: &Expr) -> Result<Value> {
    match expr {
        Expr::Atom(atom) => eval_atom(atom),
        Expr::Invert(inner) => Ok(Value::plain(algorithms::invert(&eval_expr(inner)?.steps))),
        Expr::Reverse(inner) => Ok(Value::plain(algorithms::reverse(&eval_expr(inner)?.steps))),
        Expr::Rotate { inner, amount } => Ok(Value::plain(algorithms::rotate(
            &eval_expr(inner)?.steps,
            *amount,
        ))),
        Expr::Quantize { inner, steps } => {
            let target = steps.unsigned_abs() as usize;
            check_steps(target, "quantization")?;
            let value = eval_expr(inner)?;
            Ok(Value::plain(algorithms::quantize(
                &value.steps,
                target,
                *steps > 0,
            )))
        }
        Expr::Combine { .. } => eval_combination(expr),
        Expr::Concat(parts) => {
            let mut steps = Vec::new();
            for part in parts {
                steps.extend(eval_expr(part)?.steps);
            }
            check_steps(steps.len(), "concatenated pattern")?;
            Ok(Value::plain(steps))
        }
    }
}

/// Flatten a left-associative chain into its first operand and the rest
fn flatten<'a>(expr: &'a Expr, out: &mut Vec<(Option<CombineOp>, &'a Expr)>) {
    match expr {
        Expr::Combine { left, op, right } => {
            flatten(left, out);
            out.push((Some(*op), right));
        }
        other => out.push((None, other)),
    }
}

fn eval_combination(expr: &Expr) -> Result<Value> {
    let mut chain = Vec::new();
    flatten(expr, &mut chain);

    let mut operands = Vec::with_capacity(chain.len());
    for (op, operand) in chain {
        operands.push((op.unwrap_or(CombineOp::Union), eval_expr(operand)?));
    }

    // Every operand is within MAX_STEPS, so checking the running period
    // keeps each lcm product small
    let mut period = 1;
    for (_, value) in &operands {
        period = combine::lcm(period, value.steps.len());
        check_steps(period, "combined pattern")?;
    }

    let all_polygons = operands.iter().all(|(_, v)| v.polygon.is_some());
    let resolved: Vec<(CombineOp, Vec<bool>)> = operands
        .into_iter()
        .map(|(op, value)| match value.polygon {
            Some((vertices, offset)) if all_polygons => {
                (op, algorithms::project_polygon(vertices, offset, period))
            }
            _ => (op, value.steps),
        })
        .collect();

    let Some(((_, first), rest)) = resolved.split_first() else {
        return Ok(Value::plain(Vec::new()));
    };
    let merged = combine::combine_all(first, rest.iter().map(|(op, s)| (*op, s.as_slice())));
    Ok(Value::plain(merged))
}

fn eval_atom(atom: &Atom) -> Result<Value> {
    let steps = match atom {
        Atom::Euclidean {
            onsets,
            steps,
            rotation,
        } => {
            check_steps(*steps, "E()")?;
            check_onsets(*onsets, *steps, "E()")?;
            algorithms::euclidean(*onsets, *steps, *rotation)
        }
        Atom::Polygon {
            vertices,
            offset,
            expansion,
        } => {
            if !(2..=MAX_VERTICES).contains(vertices) {
                return Err(ParseError::range(format!(
                    "polygon needs 2 to {MAX_VERTICES} vertices, got {vertices}"
                )));
            }
            if !(1..=MAX_EXPANSION).contains(expansion) {
                return Err(ParseError::range(format!(
                    "polygon expansion must be 1 to {MAX_EXPANSION}, got {expansion}"
                )));
            }
            check_steps(vertices * expansion, "P()")?;
            return Ok(Value {
                steps: algorithms::polygon(*vertices, *offset, *expansion),
                polygon: Some((*vertices, *offset)),
            });
        }
        Atom::Fill {
            onsets,
            steps,
            inverse,
        } => {
            check_steps(*steps, "B()")?;
            check_onsets(*onsets, *steps, "B()")?;
            indispensability::indispensability_fill(*onsets, *steps, *inverse)
        }
        Atom::InverseEuclidean { onsets, steps } => {
            check_steps(*steps, "D()")?;
            check_onsets(*onsets, *steps, "D()")?;
            algorithms::inverse_euclidean(*onsets, *steps)
        }
        Atom::Random {
            onsets,
            steps,
            seed,
        } => {
            check_steps(*steps, "R()")?;
            match onsets {
                RandomCount::Fixed(k) => {
                    check_onsets(*k, *steps, "R()")?;
                    let seed = seed
                        .unwrap_or(DEFAULT_RANDOM_SEED ^ ((*k as u64) << 32) ^ *steps as u64);
                    algorithms::random(*k, *steps, seed)
                }
                RandomCount::Bell => {
                    let seed = seed.unwrap_or(DEFAULT_RANDOM_SEED ^ *steps as u64);
                    algorithms::random_bell(*steps, seed)
                }
            }
        }
        Atom::Binary { digits, steps } => {
            let len = steps.unwrap_or(digits.len());
            if len < digits.len() {
                return Err(ParseError::range(format!(
                    "binary literal has {} digits but declares {len} steps",
                    digits.len()
                )));
            }
            check_steps(len, "binary literal")?;
            let mut out = convert::from_binary(digits)
                .map_err(convert_error)?
                .into_steps();
            out.resize(len, false);
            out
        }
        Atom::Hex { digits, steps } => {
            let len = steps.unwrap_or(digits.len() * 4);
            check_steps(len, "hex literal")?;
            convert::from_hex(digits, len).map_err(convert_error)?.into_steps()
        }
        Atom::Octal { digits, steps } => {
            let len = steps.unwrap_or(digits.len() * 3);
            check_steps(len, "octal literal")?;
            convert::from_octal(digits, len).map_err(convert_error)?.into_steps()
        }
        Atom::Decimal { value, steps } => {
            let bits = (u64::BITS - value.leading_zeros()) as usize;
            let len = steps.unwrap_or(bits.max(MIN_DECIMAL_STEPS));
            check_steps(len, "decimal literal")?;
            convert::from_integer(*value, len)
                .map_err(convert_error)?
                .into_steps()
        }
        Atom::Morse { code, steps } => {
            let mut out = algorithms::morse(code);
            match steps {
                // Explicit length pads with rests or truncates
                Some(len) => {
                    check_steps(*len, "morse pattern")?;
                    out.resize(*len, false);
                }
                None => check_steps(out.len(), "morse pattern")?,
            }
            out
        }
        Atom::Onsets { indices, steps } => {
            let len = steps.unwrap_or_else(|| {
                indices.iter().max().map_or(1, |m| m.saturating_add(1))
            });
            check_steps(len, "onset list")?;
            if let Some(bad) = indices.iter().find(|&&i| i >= len) {
                return Err(ParseError::range(format!(
                    "onset index {bad} is outside {len} steps"
                )));
            }
            convert::from_onsets(indices, len)
                .map_err(convert_error)?
                .into_steps()
        }
    };
    Ok(Value::plain(steps))
}
