//! Pattern notation
//!
//! ```text
//! E(3,8)            even distribution          P(5,0,2)     pentagon on 10 steps
//! B(5,12) W(3,7)    indispensability fills     D(3,8)       inverse even distribution
//! R(3,8,42)         seeded random              b10010010    binary literal
//! 0x94:8  o17  d73  numeric literals           [0,3,6]:8    onset list
//! E(3,8)+E(2,5)     union over the LCM         A-B          difference
//! ~A  rev A  A@2    invert, reverse, rotate    A;12         quantize to 12 steps
//! {10}E(5,8)        accent pattern             E(1,8)E>8    progressive transformation
//! E(3,8)+1  A*2     progressive offset and lengthening
//! A|B|C             scenes (see `parse_scenes`)
//! ```
//!
//! Parsing is pure and deterministic: nothing here touches progressive or
//! playback state.

mod ast;
mod eval;
mod lexer;
mod parser;

use tracing::debug;

use crate::descriptor::PatternDescriptor;
use crate::error::{ParseError, Result};

fn parse_at(text: &str, base: usize) -> Result<PatternDescriptor> {
    let tokens = lexer::tokenize(text, base)?;
    let program = parser::Parser::new(tokens).parse_program()?;
    let descriptor = eval::evaluate(&program, text.trim())?;
    debug!(
        source = descriptor.source(),
        steps = %descriptor.steps(),
        "parsed pattern"
    );
    Ok(descriptor)
}

/// Parse a single pattern.
///
/// Fails with a syntax error on `|`; scene lists go through [`parse_scenes`].
pub fn parse(text: &str) -> Result<PatternDescriptor> {
    parse_at(text, 0)
}

/// Parse a `|`-separated list of scenes, one descriptor per scene
pub fn parse_scenes(text: &str) -> Result<Vec<PatternDescriptor>> {
    let mut scenes = Vec::new();
    let mut base = 0;
    for part in text.split('|') {
        if part.trim().is_empty() {
            return Err(ParseError::syntax(base, "empty scene"));
        }
        scenes.push(parse_at(part, base)?);
        base += part.len() + 1;
    }
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Format, format_notation, from_binary};
    use crate::descriptor::{Direction, TransformerKind};
    use crate::error::ParseWarning;

    fn bits(text: &str) -> String {
        parse(text).unwrap().steps().to_string()
    }

    #[test]
    fn test_generators() {
        assert_eq!(bits("E(3,8)"), "10010010");
        assert_eq!(bits("e(5, 8)"), "10110110");
        assert_eq!(bits("E(3,8,1)"), "00100101");
        assert_eq!(bits("P(4,0,2)"), "10101010");
        assert_eq!(bits("B(3,8)"), "10001001");
        assert_eq!(bits("W(3,8)"), "11010000");
        assert_eq!(bits("D(3,8)"), "01001001");
        assert_eq!(bits("tresillo"), "10010010");
        assert_eq!(bits("pent"), "11111");
        assert_eq!(parse("R(3,8)").unwrap(), parse("R(3,8)").unwrap());
        assert_eq!(parse("R(3,8,9)").unwrap().onset_count(), 3);
    }

    #[test]
    fn test_literals() {
        assert_eq!(bits("10010010"), "10010010");
        assert_eq!(bits("b101:6"), "101000");
        assert_eq!(bits("0x94"), "10010010");
        assert_eq!(bits("0x1:6"), "100000");
        assert_eq!(bits("o551"), "101101100");
        assert_eq!(bits("0o551:8"), "10110110");
        assert_eq!(bits("d73"), "10010010");
        assert_eq!(bits("73"), "10010010");
        assert_eq!(bits("[0,3,6]:8"), "10010010");
        assert_eq!(bits("[0,2]"), "101");
    }

    #[test]
    fn test_converter_notation_round_trips() {
        let s = from_binary("1011000100101").unwrap();
        for format in [
            Format::Binary,
            Format::Hex,
            Format::Octal,
            Format::Decimal,
            Format::Onsets,
        ] {
            let text = format_notation(&s, format);
            assert_eq!(parse(&text).unwrap().steps(), &s, "{text}");
        }
    }

    #[test]
    fn test_transformations() {
        assert_eq!(bits("~E(3,8)"), "01101101");
        assert_eq!(bits("inv E(3,8)"), "01101101");
        assert_eq!(bits("comp b1010"), "0101");
        assert_eq!(bits("comp E(5,8)"), bits("~E(5,8)"));
        assert_eq!(bits("rev E(3,8)"), "01001001");
        assert_eq!(bits("E(3,8)@1"), "00100101");
        assert_eq!(bits("E(3,8)@-1"), "01001001");
        assert_eq!(bits("E(3,8);12"), "100001000100");
        assert_eq!(bits("E(3,8);-12"), "100100001000");
    }

    #[test]
    fn test_combination() {
        assert_eq!(bits("b100+b10"), "101110");
        assert_eq!(bits("b1111-b10"), "0101");
        assert_eq!(parse("E(3,8)+E(2,5)").unwrap().step_count(), 40);
        assert_eq!(bits("(b100+b10)-b11"), "000000");
        // Polygons project onto the shared ring instead of tiling
        assert_eq!(bits("P(3,0)+P(5,0)"), "100101100110100");
        assert_eq!(bits("E(3,8) E(1,4)"), "100100101000");
        assert_eq!(bits("P(3,9223372036854775807)"), "111");
        assert_eq!(bits("P(3,9223372036854775807)+P(2,0)"), "110101");
    }

    #[test]
    fn test_morse() {
        assert_eq!(bits("M:SOS"), "111101010111");
        assert_eq!(bits("m:a"), "110");
        assert_eq!(bits("M:A:5"), "11000");
        assert_eq!(bits("M:A:2"), "11");
        assert_eq!(bits("M:.-"), "110");
        assert_eq!(bits(".-"), "110");
        assert_eq!(bits("-.-"), "10110");
        assert_eq!(bits(".-:4"), "1100");
        assert_eq!(bits("~.-"), "001");
        // A dash after an operand is the difference operator
        assert_eq!(bits("E(3,8)-.-"), "000000001001001000000000");
    }

    #[test]
    fn test_accent_and_suffixes() {
        let d = parse("{10}E(5,8)").unwrap();
        assert_eq!(d.accents().unwrap().to_string(), "10");
        let d = parse("E(5,8){E(2,3)}").unwrap();
        assert_eq!(d.accents().unwrap().to_string(), "101");

        let d = parse("E(1,8)E>5").unwrap();
        let spec = d.progressive().unwrap();
        assert_eq!(spec.kind, TransformerKind::EvenDistribution);
        assert_eq!(spec.target, 5);
        assert_eq!(spec.direction(), Direction::Concentrate);
        assert_eq!(d.steps().to_string(), "10000000");

        let d = parse("E(3,8)+2*4").unwrap();
        assert_eq!(d.rotation_step(), Some(2));
        assert_eq!(d.lengthening(), Some(4));
    }

    #[test]
    fn test_range_errors() {
        for text in [
            "P(1,0)",
            "P(33,0)",
            "P(3,0,22)",
            "P(32,0,3)",
            "E(3,65)",
            "E(9,8)",
            "E(3,0)",
            "[0,8]:8",
            "b101:2",
            "E(3,8)x>4",
            "E(3,8)>9",
            "E(3,8)+E(5,7)+E(2,3)",
            "E(3,8);0",
            "E(3,8)*0",
            // Coprime periods: the running lcm passes the limit early
            "E(1,61)+E(1,59)+E(1,53)+E(1,47)+E(1,43)+E(1,41)+E(1,37)+E(1,31)+E(1,29)+E(1,23)",
            "E(1,19)-E(1,17)-E(1,13)-E(1,11)-E(1,7)-E(1,5)-E(1,3)-E(1,2)",
            "[18446744073709551615]",
            "M:S0S",
            "M:A:0",
        ] {
            assert!(
                matches!(parse(text), Err(ParseError::Range(_))),
                "{text} -> {:?}",
                parse(text)
            );
        }
    }

    #[test]
    fn test_syntax_and_combination_errors() {
        assert!(matches!(parse(""), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("E(3,8))"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("hello"), Err(ParseError::Syntax { .. })));
        assert!(matches!(parse("E(3,8)-"), Err(ParseError::Combination { .. })));
        assert!(matches!(parse("- E(3,8)"), Err(ParseError::Combination { .. })));
    }

    #[test]
    fn test_empty_pattern_is_a_warning() {
        let d = parse("E(0,8)").unwrap();
        assert_eq!(d.warnings(), &[ParseWarning::EmptyPattern]);
        assert_eq!(d.steps().to_string(), "00000000");
    }

    #[test]
    fn test_scenes() {
        let scenes = parse_scenes("E(3,8) | B(5,12)+2 |tresillo").unwrap();
        assert_eq!(scenes.len(), 3);
        assert_eq!(scenes[0].source(), "E(3,8)");
        assert_eq!(scenes[1].rotation_step(), Some(2));
        assert!(matches!(
            parse_scenes("E(3,8)||E(5,8)"),
            Err(ParseError::Syntax { position: 7, .. })
        ));
        assert!(matches!(
            parse_scenes("E(3,8)|E(5,8)#"),
            Err(ParseError::Syntax { position: 13, .. })
        ));
    }
}
