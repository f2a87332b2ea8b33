//! Recursive-descent parser from tokens to a [`Program`]

use crate::algorithms;
use crate::combine::CombineOp;
use crate::descriptor::TransformerKind;
use crate::error::{ParseError, Result};

use super::ast::{Atom, Expr, Program, Progression, RandomCount};
use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Arg {
    Int(i64),
    Word(String),
}

fn is_digits(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b.is_ascii_digit())
}

fn is_binary(word: &str) -> bool {
    !word.is_empty() && word.bytes().all(|b| b == b'0' || b == b'1')
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Word(w) => format!("'{w}'"),
        TokenKind::Morse(code) => format!("morse '{code}'"),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
        TokenKind::LBracket => "'['".into(),
        TokenKind::RBracket => "']'".into(),
        TokenKind::LBrace => "'{'".into(),
        TokenKind::RBrace => "'}'".into(),
        TokenKind::Comma => "','".into(),
        TokenKind::Colon => "':'".into(),
        TokenKind::Semicolon => "';'".into(),
        TokenKind::Plus => "'+'".into(),
        TokenKind::Minus => "'-'".into(),
        TokenKind::At => "'@'".into(),
        TokenKind::Tilde => "'~'".into(),
        TokenKind::Greater => "'>'".into(),
        TokenKind::Star => "'*'".into(),
        TokenKind::Pipe => "'|'".into(),
        TokenKind::Eof => "end of pattern".into(),
    }
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Parser {
    /// `tokens` must end with [`TokenKind::Eof`]
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cursor: 0 }
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.cursor + offset).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.cursor < self.tokens.len() - 1 {
            self.cursor += 1;
        }
        token
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        let token = self.peek();
        if token.kind == kind {
            return Ok(self.advance());
        }
        Err(ParseError::syntax(
            token.pos,
            format!("expected {}, found {}", describe(&kind), describe(&token.kind)),
        ))
    }

    fn unexpected(&self) -> ParseError {
        let token = self.peek();
        ParseError::syntax(token.pos, format!("unexpected {}", describe(&token.kind)))
    }

    /// Whether the next token can begin a pattern expression
    fn starts_operand(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Word(_) => self.peek_at(1).kind != TokenKind::Greater,
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Tilde | TokenKind::Morse(_) => {
                true
            }
            _ => false,
        }
    }

    /// `+N` / `+-N` at the current position is a progressive offset
    fn plus_starts_offset(&self) -> bool {
        match &self.peek_at(1).kind {
            TokenKind::Word(w) => is_digits(w),
            TokenKind::Minus => {
                matches!(&self.peek_at(2).kind, TokenKind::Word(w) if is_digits(w))
            }
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Program level
    // ------------------------------------------------------------------

    pub fn parse_program(&mut self) -> Result<Program> {
        if self.peek().kind == TokenKind::Eof {
            return Err(ParseError::syntax(self.peek().pos, "empty pattern"));
        }

        let mut accent = None;
        if self.peek().kind == TokenKind::LBrace {
            accent = Some(self.parse_accent()?);
        }

        let rhythm = self.parse_concat()?;
        let mut progression = None;
        let mut rotation_step = None;
        let mut lengthening = None;

        loop {
            let token = self.peek().clone();
            match &token.kind {
                TokenKind::Eof => break,
                TokenKind::LBrace => {
                    if accent.is_some() {
                        return Err(ParseError::syntax(token.pos, "duplicate accent pattern"));
                    }
                    accent = Some(self.parse_accent()?);
                }
                TokenKind::Word(_) | TokenKind::Greater => {
                    if progression.is_some() {
                        return Err(ParseError::syntax(
                            token.pos,
                            "duplicate progressive transformation",
                        ));
                    }
                    progression = Some(self.parse_progression()?);
                }
                TokenKind::Plus => {
                    if rotation_step.is_some() {
                        return Err(ParseError::syntax(token.pos, "duplicate progressive offset"));
                    }
                    self.advance();
                    rotation_step = Some(self.parse_signed()?);
                }
                TokenKind::Star => {
                    if lengthening.is_some() {
                        return Err(ParseError::syntax(
                            token.pos,
                            "duplicate progressive lengthening",
                        ));
                    }
                    self.advance();
                    let steps = self.parse_unsigned()?;
                    if steps == 0 {
                        return Err(ParseError::range(
                            "progressive lengthening must add at least one step",
                        ));
                    }
                    lengthening = Some(steps);
                }
                TokenKind::Pipe => {
                    return Err(ParseError::syntax(
                        token.pos,
                        "scene separator '|' outside a scene list",
                    ));
                }
                _ => return Err(self.unexpected()),
            }
        }

        Ok(Program {
            accent,
            rhythm,
            progression,
            rotation_step,
            lengthening,
        })
    }

    fn parse_accent(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LBrace)?;
        if self.peek().kind == TokenKind::RBrace {
            return Err(ParseError::syntax(self.peek().pos, "empty accent pattern"));
        }
        let accent = self.parse_concat()?;
        self.expect(TokenKind::RBrace)?;
        Ok(accent)
    }

    /// `[letter] '>' target`
    fn parse_progression(&mut self) -> Result<Progression> {
        let kind = match self.peek().kind.clone() {
            TokenKind::Word(letters) => {
                self.advance();
                let mut chars = letters.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => TransformerKind::from_letter(c),
                    _ => None,
                }
                .ok_or_else(|| ParseError::range(format!("unknown transformer '{letters}'")))?
            }
            _ => TransformerKind::Indispensability,
        };
        self.expect(TokenKind::Greater)?;
        let target = self.parse_unsigned()?;
        Ok(Progression { kind, target })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_concat(&mut self) -> Result<Expr> {
        let mut parts = vec![self.parse_expr()?];
        while self.starts_operand() {
            parts.push(self.parse_expr()?);
        }
        if parts.len() == 1 {
            Ok(parts.remove(0))
        } else {
            Ok(Expr::Concat(parts))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => CombineOp::Union,
                TokenKind::Minus => CombineOp::Difference,
                _ => break,
            };
            if op == CombineOp::Union && self.plus_starts_offset() {
                break;
            }
            self.advance();
            if !self.starts_operand() {
                return Err(ParseError::combination(
                    self.peek().pos,
                    format!("missing right operand, found {}", describe(&self.peek().kind)),
                ));
            }
            let right = self.parse_term()?;
            left = Expr::Combine {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let inner = self.parse_unary()?;
        if self.peek().kind != TokenKind::Semicolon {
            return Ok(inner);
        }
        self.advance();
        let steps = self.parse_signed()?;
        Ok(Expr::Quantize {
            inner: Box::new(inner),
            steps,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        let invert = match &token.kind {
            TokenKind::Tilde => true,
            TokenKind::Word(w)
                if matches!(w.as_str(), "inv" | "comp" | "rev")
                    && self.peek_at(1).kind != TokenKind::LParen =>
            {
                w != "rev"
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        if !self.starts_operand() {
            return Err(ParseError::syntax(
                self.peek().pos,
                format!("expected a pattern after {}", describe(&token.kind)),
            ));
        }
        let inner = Box::new(self.parse_unary()?);
        Ok(if invert {
            Expr::Invert(inner)
        } else {
            Expr::Reverse(inner)
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        while self.peek().kind == TokenKind::At {
            self.advance();
            let amount = self.parse_signed()?;
            expr = Expr::Rotate {
                inner: Box::new(expr),
                amount,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_concat()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_onset_list(),
            TokenKind::Morse(code) => {
                self.advance();
                let steps = self.parse_step_suffix()?;
                Ok(Expr::Atom(Atom::Morse { code, steps }))
            }
            TokenKind::Word(word) => {
                self.advance();
                let atom = if self.peek().kind == TokenKind::LParen {
                    self.parse_call(&word, token.pos)?
                } else {
                    self.parse_literal(&word, token.pos)?
                };
                Ok(Expr::Atom(atom))
            }
            TokenKind::Plus | TokenKind::Minus => Err(ParseError::combination(
                token.pos,
                format!("{} without a left operand", describe(&token.kind)),
            )),
            TokenKind::Eof => Err(ParseError::syntax(token.pos, "unexpected end of pattern")),
            _ => Err(self.unexpected()),
        }
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    fn parse_call(&mut self, name: &str, pos: usize) -> Result<Atom> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.peek().kind != TokenKind::RParen {
            loop {
                args.push(self.parse_arg()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RParen)?;

        let arity = |min: usize, max: usize| -> Result<()> {
            if (min..=max).contains(&args.len()) {
                Ok(())
            } else {
                Err(ParseError::syntax(
                    pos,
                    format!(
                        "{}() takes {min} to {max} arguments, got {}",
                        name.to_ascii_uppercase(),
                        args.len()
                    ),
                ))
            }
        };

        match name {
            "e" => {
                arity(2, 3)?;
                Ok(Atom::Euclidean {
                    onsets: unsigned(&args[0], pos)?,
                    steps: unsigned(&args[1], pos)?,
                    rotation: args.get(2).map(|a| signed(a, pos)).transpose()?.unwrap_or(0),
                })
            }
            "p" => {
                arity(2, 3)?;
                Ok(Atom::Polygon {
                    vertices: unsigned(&args[0], pos)?,
                    offset: signed(&args[1], pos)?,
                    expansion: args.get(2).map(|a| unsigned(a, pos)).transpose()?.unwrap_or(1),
                })
            }
            "b" | "w" => {
                arity(2, 2)?;
                Ok(Atom::Fill {
                    onsets: unsigned(&args[0], pos)?,
                    steps: unsigned(&args[1], pos)?,
                    inverse: name == "w",
                })
            }
            "d" => {
                arity(2, 2)?;
                Ok(Atom::InverseEuclidean {
                    onsets: unsigned(&args[0], pos)?,
                    steps: unsigned(&args[1], pos)?,
                })
            }
            "r" => {
                arity(2, 3)?;
                let onsets = match &args[0] {
                    Arg::Word(w) if w == "r" => RandomCount::Bell,
                    other => RandomCount::Fixed(unsigned(other, pos)?),
                };
                Ok(Atom::Random {
                    onsets,
                    steps: unsigned(&args[1], pos)?,
                    seed: args
                        .get(2)
                        .map(|a| unsigned(a, pos).map(|s| s as u64))
                        .transpose()?,
                })
            }
            other => Err(ParseError::syntax(
                pos,
                format!("unknown generator '{}'", other.to_ascii_uppercase()),
            )),
        }
    }

    fn parse_arg(&mut self) -> Result<Arg> {
        let numeric = match &self.peek().kind {
            TokenKind::Minus => true,
            TokenKind::Word(w) => is_digits(w),
            _ => false,
        };
        if numeric {
            return Ok(Arg::Int(self.parse_signed()?));
        }
        match self.advance() {
            Token {
                kind: TokenKind::Word(w),
                ..
            } => Ok(Arg::Word(w)),
            token => Err(ParseError::syntax(
                token.pos,
                format!("expected an argument, found {}", describe(&token.kind)),
            )),
        }
    }

    fn parse_literal(&mut self, word: &str, pos: usize) -> Result<Atom> {
        if word == "m" && self.peek().kind == TokenKind::Colon {
            return self.parse_morse_text();
        }
        let named = match word {
            "tri" => Some(3),
            "pent" => Some(5),
            "hex" => Some(6),
            "hept" => Some(7),
            "oct" => Some(8),
            _ => None,
        };
        if let Some(vertices) = named {
            return Ok(Atom::Polygon {
                vertices,
                offset: 0,
                expansion: 1,
            });
        }
        match word {
            "tresillo" => {
                return Ok(Atom::Euclidean {
                    onsets: 3,
                    steps: 8,
                    rotation: 0,
                });
            }
            "cinquillo" => {
                return Ok(Atom::Euclidean {
                    onsets: 5,
                    steps: 8,
                    rotation: 0,
                });
            }
            _ => {}
        }

        let atom = if let Some(digits) = word.strip_prefix("0x") {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ParseError::syntax(pos, format!("malformed hex literal '{word}'")));
            }
            Atom::Hex {
                digits: digits.to_string(),
                steps: None,
            }
        } else if let Some(digits) = word.strip_prefix("0o").or_else(|| word.strip_prefix('o')) {
            if digits.is_empty() || !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
                return Err(ParseError::syntax(pos, format!("malformed octal literal '{word}'")));
            }
            Atom::Octal {
                digits: digits.to_string(),
                steps: None,
            }
        } else if let Some(digits) = word.strip_prefix('b').filter(|d| is_binary(d)) {
            Atom::Binary {
                digits: digits.to_string(),
                steps: None,
            }
        } else if is_binary(word) {
            Atom::Binary {
                digits: word.to_string(),
                steps: None,
            }
        } else if let Some(digits) = word
            .strip_prefix('d')
            .filter(|d| is_digits(d))
            .or(is_digits(word).then_some(word))
        {
            let value = digits.parse::<u64>().map_err(|_| {
                ParseError::range(format!("decimal literal '{digits}' is too large"))
            })?;
            Atom::Decimal { value, steps: None }
        } else {
            return Err(ParseError::syntax(pos, format!("unknown pattern '{word}'")));
        };

        let declared = self.parse_step_suffix()?;
        Ok(match atom {
            Atom::Hex { digits, .. } => Atom::Hex {
                digits,
                steps: declared,
            },
            Atom::Octal { digits, .. } => Atom::Octal {
                digits,
                steps: declared,
            },
            Atom::Binary { digits, .. } => Atom::Binary {
                digits,
                steps: declared,
            },
            Atom::Decimal { value, .. } => Atom::Decimal {
                value,
                steps: declared,
            },
            other => other,
        })
    }

    /// `M:text` or `M:.-`, after the `M`
    fn parse_morse_text(&mut self) -> Result<Atom> {
        self.expect(TokenKind::Colon)?;
        let token = self.advance();
        let code = match &token.kind {
            TokenKind::Word(text) => algorithms::morse_code(text).ok_or_else(|| {
                ParseError::range(format!("morse text '{text}' may only contain letters"))
            })?,
            TokenKind::Morse(code) => code.clone(),
            other => {
                return Err(ParseError::syntax(
                    token.pos,
                    format!("expected morse text, found {}", describe(other)),
                ));
            }
        };
        let steps = self.parse_step_suffix()?;
        Ok(Atom::Morse { code, steps })
    }

    fn parse_onset_list(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LBracket)?;
        let mut indices = Vec::new();
        if self.peek().kind != TokenKind::RBracket {
            loop {
                indices.push(self.parse_unsigned()?);
                if self.peek().kind != TokenKind::Comma {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RBracket)?;
        let steps = self.parse_step_suffix()?;
        Ok(Expr::Atom(Atom::Onsets { indices, steps }))
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn parse_step_suffix(&mut self) -> Result<Option<usize>> {
        if self.peek().kind != TokenKind::Colon {
            return Ok(None);
        }
        self.advance();
        self.parse_unsigned().map(Some)
    }

    fn parse_unsigned(&mut self) -> Result<usize> {
        let token = self.advance();
        match &token.kind {
            TokenKind::Word(w) if is_digits(w) => w
                .parse::<usize>()
                .map_err(|_| ParseError::range(format!("number '{w}' is too large"))),
            other => Err(ParseError::syntax(
                token.pos,
                format!("expected a number, found {}", describe(other)),
            )),
        }
    }

    fn parse_signed(&mut self) -> Result<i64> {
        let negative = self.peek().kind == TokenKind::Minus;
        if negative {
            self.advance();
        }
        let value = self.parse_unsigned()?;
        let value = i64::try_from(value)
            .map_err(|_| ParseError::range(format!("number {value} is too large")))?;
        Ok(if negative { -value } else { value })
    }
}

fn unsigned(arg: &Arg, pos: usize) -> Result<usize> {
    match arg {
        Arg::Int(v) if *v >= 0 => Ok(*v as usize),
        Arg::Int(v) => Err(ParseError::range(format!("argument {v} must not be negative"))),
        Arg::Word(w) => Err(ParseError::syntax(pos, format!("expected a number, found '{w}'"))),
    }
}

fn signed(arg: &Arg, pos: usize) -> Result<i64> {
    match arg {
        Arg::Int(v) => Ok(*v),
        Arg::Word(w) => Err(ParseError::syntax(pos, format!("expected a number, found '{w}'"))),
    }
}
