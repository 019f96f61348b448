//! Source regeneration.
//!
//! Rebuilds a block's text with some numeric literals replaced and every
//! other byte (whitespace, comments, formatting) left exactly as written.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::Program;

/// What to put in place of a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Replacement {
    Number(f64),
    /// Inserted verbatim, e.g. `() => freq_value`.
    Expression(String),
}

impl Replacement {
    pub fn render(&self) -> String {
        match self {
            Replacement::Number(v) => format_number(*v),
            Replacement::Expression(text) => text.clone(),
        }
    }
}

impl From<f64> for Replacement {
    fn from(value: f64) -> Self {
        Replacement::Number(value)
    }
}

impl From<&str> for Replacement {
    fn from(text: &str) -> Self {
        Replacement::Expression(text.to_string())
    }
}

/// Replacements keyed by literal index (order of `Program::number_literals`).
pub type ValueMap = BTreeMap<usize, Replacement>;

/// Regenerate `original` with the literals named in `values` replaced.
///
/// Without a program or with no replacements the text comes back unchanged.
/// Replacement spans that do not fit `original` are skipped.
pub fn generate_code(program: Option<&Program>, original: &str, values: Option<&ValueMap>) -> String {
    let (Some(program), Some(values)) = (program, values) else {
        return original.to_string();
    };
    if values.is_empty() {
        return original.to_string();
    }

    let literals = program.number_literals();
    let mut out = original.to_string();
    // Back to front, so earlier spans stay valid as lengths change.
    for (index, literal) in literals.iter().enumerate().rev() {
        let Some(replacement) = values.get(&index) else {
            continue;
        };
        let span = literal.span.clone();
        if span.end > out.len() || !out.is_char_boundary(span.start) || !out.is_char_boundary(span.end) {
            log::warn!("literal #{index} at {span:?} does not fit a {} byte text", out.len());
            continue;
        }
        out.replace_range(span, &replacement.render());
    }
    out
}

/// Format a number for writing back into source.
///
/// Below 1 keeps three decimals, below 10 two, anything larger is rounded to
/// an integer (half away from zero). Trailing zeros are trimmed.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    let text = if magnitude < 1.0 {
        trim_fraction(format!("{value:.3}"))
    } else if magnitude < 10.0 {
        trim_fraction(format!("{value:.2}"))
    } else {
        format!("{:.0}", value.round())
    };

    if text == "-0" {
        "0".to_string()
    } else {
        text
    }
}

fn trim_fraction(mut text: String) -> String {
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn regenerate(source: &str, values: &[(usize, Replacement)]) -> String {
        let program = parse(source).unwrap();
        let map: ValueMap = values.iter().cloned().collect();
        generate_code(Some(&program), source, Some(&map))
    }

    #[test]
    fn empty_map_is_identity() {
        let source = "osc(10, 0.1)\n  // keep me\n  .out(o0)";
        let program = parse(source).unwrap();
        assert_eq!(generate_code(Some(&program), source, Some(&ValueMap::new())), source);
        assert_eq!(generate_code(Some(&program), source, None), source);
        assert_eq!(generate_code(None, source, None), source);
    }

    #[test]
    fn single_substitution() {
        assert_eq!(regenerate("osc(10).out()", &[(0, 20.0.into())]), "osc(20).out()");
    }

    #[test]
    fn multiline_layout_survives() {
        assert_eq!(
            regenerate(
                "osc(10)\n  .color(0.5)\n  .out()",
                &[(0, 20.0.into()), (1, 0.8.into())]
            ),
            "osc(20)\n  .color(0.8)\n  .out()"
        );
    }

    #[test]
    fn expression_replacement() {
        assert_eq!(
            regenerate("osc(10).out()", &[(0, "() => freq_value".into())]),
            "osc(() => freq_value).out()"
        );
    }

    #[test]
    fn comments_survive_substitution() {
        let source = "// Oscillator\nosc(10) /* speed */ .out()";
        assert_eq!(
            regenerate(source, &[(0, 42.0.into())]),
            "// Oscillator\nosc(42) /* speed */ .out()"
        );
    }

    #[test]
    fn signed_literals_are_replaced_whole() {
        assert_eq!(
            regenerate("rotate(-0.5, 1)", &[(0, 0.25.into()), (1, (-2.0).into())]),
            "rotate(0.25, -2)"
        );
    }

    #[test]
    fn out_of_bounds_spans_are_skipped() {
        let program = parse("osc(10, 20, 30)").unwrap();
        let map: ValueMap = [(0, 1.0.into()), (2, 3.0.into())].into_iter().collect();
        // Shorter text than the program was parsed from: the last span no
        // longer fits and is left alone.
        assert_eq!(generate_code(Some(&program), "osc(10, 2", Some(&map)), "osc(1, 2");
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(0.123456), "0.123");
        assert_eq!(format_number(9.5), "9.5");
        assert_eq!(format_number(10.6), "11");
        assert_eq!(format_number(-0.123456), "-0.123");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(10.5), "11");
        assert_eq!(format_number(-10.5), "-11");
        assert_eq!(format_number(0.0001), "0");
        assert_eq!(format_number(-0.0001), "0");
        assert_eq!(format_number(0.9999), "1");
        assert_eq!(format_number(1234.4), "1234");
    }
}
