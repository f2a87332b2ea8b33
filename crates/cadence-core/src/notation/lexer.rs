//! Tokenizer for pattern notation

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// Run of ASCII letters and digits, lowercased
    Word(String),
    /// Run of `.` and `-` read as Morse code
    Morse(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Plus,
    Minus,
    At,
    Tilde,
    Greater,
    Star,
    Pipe,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset in the full source text
    pub pos: usize,
}

fn ends_operand(token: Option<&Token>) -> bool {
    matches!(
        token.map(|t| &t.kind),
        Some(TokenKind::Word(_) | TokenKind::RParen | TokenKind::RBracket | TokenKind::Morse(_))
    )
}

/// Split `text` into tokens; `base` shifts every reported position
pub(crate) fn tokenize(text: &str, base: usize) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        let pos = base + i;
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_ascii_alphanumeric() {
            let mut word = String::new();
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_ascii_alphanumeric() {
                    break;
                }
                word.push(c.to_ascii_lowercase());
                chars.next();
            }
            tokens.push(Token {
                kind: TokenKind::Word(word),
                pos,
            });
            continue;
        }
        if c == '.' || c == '-' {
            let run: String = text[i..]
                .chars()
                .take_while(|&c| c == '.' || c == '-')
                .collect();
            // After an operand, or alone, a dash is the difference operator
            if c == '.' || (!ends_operand(tokens.last()) && run.len() > 1) {
                for _ in 0..run.len() {
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Morse(run),
                    pos,
                });
                continue;
            }
        }
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '@' => TokenKind::At,
            '~' => TokenKind::Tilde,
            '>' => TokenKind::Greater,
            '*' => TokenKind::Star,
            '|' => TokenKind::Pipe,
            other => {
                return Err(ParseError::syntax(
                    pos,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(Token { kind, pos });
        chars.next();
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: base + text.len(),
    });
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text, 0)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_words_are_lowercased() {
        assert_eq!(
            kinds("E(3, 8)"),
            vec![
                TokenKind::Word("e".into()),
                TokenKind::LParen,
                TokenKind::Word("3".into()),
                TokenKind::Comma,
                TokenKind::Word("8".into()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("0x9F")[0], TokenKind::Word("0x9f".into()));
    }

    #[test]
    fn test_positions_are_offset() {
        let tokens = tokenize(" {10}", 7).unwrap();
        assert_eq!(tokens[0].pos, 8);
        assert_eq!(tokens.last().unwrap().pos, 12);
    }

    #[test]
    fn test_morse_runs() {
        assert_eq!(kinds("-.-"), vec![TokenKind::Morse("-.-".into()), TokenKind::Eof]);
        assert_eq!(
            kinds("E(3,8)-.-"),
            vec![
                TokenKind::Word("e".into()),
                TokenKind::LParen,
                TokenKind::Word("3".into()),
                TokenKind::Comma,
                TokenKind::Word("8".into()),
                TokenKind::RParen,
                TokenKind::Minus,
                TokenKind::Morse(".-".into()),
                TokenKind::Eof,
            ]
        );
        // Signed numbers keep their minus
        assert_eq!(kinds("@-2")[1], TokenKind::Minus);
        assert_eq!(
            kinds("--- ..."),
            vec![
                TokenKind::Morse("---".into()),
                TokenKind::Morse("...".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_rejects_unknown_characters() {
        assert_eq!(
            tokenize("E(3,8)#", 0),
            Err(ParseError::syntax(6, "unexpected character '#'"))
        );
    }
}
