//! Parameter classification: which function argument does a literal feed?
//!
//! The classifier does not walk the AST. It looks backward through the token
//! stream from the literal for the nearest registry call whose parentheses
//! still enclose it, then counts top-level commas to get the argument
//! position. Anything it cannot place lands in the `unknown` bucket.

use serde::{Deserialize, Serialize};

use crate::analyzer::NumericLiteralSite;
use crate::registry::{ParamSpec, SignatureRegistry};
use crate::token::{Spanned, Token};

/// Function name given to literals the classifier could not place.
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Default look-behind window, in bytes.
pub const DEFAULT_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    Float,
    Select,
    ColorComponent,
    PointComponent,
}

/// What the classifier learned about one literal site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterDescriptor {
    pub site_index: usize,
    /// Owning function, or [`UNKNOWN_FUNCTION`].
    pub function: String,
    /// Byte offset of the owning call's name; tells apart two calls of the
    /// same function.
    pub call_offset: Option<usize>,
    /// Zero-based argument position inside the call.
    pub position: Option<usize>,
    pub name: String,
    pub param_type: ParamType,
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<f64>,
}

impl ParameterDescriptor {
    /// Descriptor for a literal with no known owner.
    pub fn unknown(site_index: usize) -> Self {
        Self {
            site_index,
            function: UNKNOWN_FUNCTION.to_string(),
            call_offset: None,
            position: None,
            name: format!("param{site_index}"),
            param_type: ParamType::Float,
            default: None,
            options: Vec::new(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.function == UNKNOWN_FUNCTION
    }

    /// True when both descriptors were produced by the same call expression.
    pub fn same_call(&self, other: &ParameterDescriptor) -> bool {
        self.call_offset.is_some() && self.call_offset == other.call_offset
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    registry: SignatureRegistry,
    window: usize,
    log_misses: bool,
}

/// A registry call that encloses the literal.
struct CallHit<'a> {
    function: &'a str,
    offset: usize,
    position: usize,
}

impl Classifier {
    pub fn new(registry: SignatureRegistry) -> Self {
        Self {
            registry,
            window: DEFAULT_WINDOW,
            log_misses: true,
        }
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn with_miss_logging(mut self, enabled: bool) -> Self {
        self.log_misses = enabled;
        self
    }

    pub fn registry(&self) -> &SignatureRegistry {
        &self.registry
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Classify one site. `tokens` is the token stream of `source`.
    pub fn classify(
        &self,
        source: &str,
        tokens: &[Spanned],
        site_index: usize,
        site: &NumericLiteralSite,
    ) -> ParameterDescriptor {
        let Some(first) = tokens.iter().position(|t| t.span.start == site.offset) else {
            return self.miss(source, site_index, site, "literal is not a token");
        };

        let hit = match self.enclosing_call(tokens, first, site.offset) {
            Ok(hit) => hit,
            Err(reason) => return self.miss(source, site_index, site, reason),
        };
        let Some(signature) = self.registry.get(hit.function) else {
            return self.miss(source, site_index, site, "function not in registry");
        };
        let Some(spec) = signature.param(hit.position) else {
            return self.miss(source, site_index, site, "argument past signature");
        };

        ParameterDescriptor {
            site_index,
            function: hit.function.to_string(),
            call_offset: Some(hit.offset),
            position: Some(hit.position),
            name: spec.name.clone(),
            param_type: self.infer_type(hit.function, spec),
            default: spec.default,
            options: spec.options.clone(),
        }
    }

    /// Nearest registry call, inside the look-behind window, whose argument
    /// list still encloses the token at `first`.
    fn enclosing_call<'t>(
        &self,
        tokens: &'t [Spanned],
        first: usize,
        offset: usize,
    ) -> Result<CallHit<'t>, &'static str> {
        let mut window_start = offset.saturating_sub(self.window);
        if let Some(call_start) = innermost_call_start(tokens, first) {
            window_start = window_start.min(call_start);
        }

        for j in (0..first.saturating_sub(1)).rev() {
            let candidate = &tokens[j];
            if candidate.span.start < window_start {
                break;
            }
            let Token::Ident(name) = &candidate.token else {
                continue;
            };
            if tokens[j + 1].token != Token::LParen || !self.registry.contains(name) {
                continue;
            }
            match argument_position(&tokens[j + 2..first]) {
                Scan::Closed => continue,
                Scan::Nested => return Err("literal nested inside an argument"),
                Scan::Argument(position) => {
                    return Ok(CallHit {
                        function: name,
                        offset: candidate.span.start,
                        position,
                    })
                }
            }
        }
        Err("no enclosing call")
    }

    fn infer_type(&self, function: &str, spec: &ParamSpec) -> ParamType {
        if spec.is_select() {
            return ParamType::Select;
        }
        let Some(signature) = self.registry.get(function) else {
            return ParamType::Float;
        };
        if signature.is_rgb() && matches!(spec.name.as_str(), "r" | "g" | "b" | "a") {
            return ParamType::ColorComponent;
        }
        if matches!(spec.name.as_str(), "xMult" | "yMult") {
            return ParamType::PointComponent;
        }
        if let Some(base) = spec.name.strip_suffix(['X', 'x']) {
            if signature.has_param(&format!("{base}Y")) || signature.has_param(&format!("{base}y")) {
                return ParamType::PointComponent;
            }
        }
        if let Some(base) = spec.name.strip_suffix(['Y', 'y']) {
            if signature.has_param(&format!("{base}X")) || signature.has_param(&format!("{base}x")) {
                return ParamType::PointComponent;
            }
        }
        ParamType::Float
    }

    fn miss(
        &self,
        source: &str,
        site_index: usize,
        site: &NumericLiteralSite,
        reason: &str,
    ) -> ParameterDescriptor {
        if self.log_misses {
            let end = (site.offset + site.byte_len).min(source.len());
            log::debug!(
                "unclassified literal #{site_index} `{}` at {}:{}: {reason}",
                source.get(site.offset..end).unwrap_or(&site.raw),
                site.line,
                site.column
            );
        }
        ParameterDescriptor::unknown(site_index)
    }
}

enum Scan {
    /// The call's parentheses close before the literal.
    Closed,
    /// The literal sits inside brackets or parens within an argument.
    Nested,
    /// The literal is a direct argument at this position.
    Argument(usize),
}

/// Scan the tokens between a call's `(` and the literal.
fn argument_position(between: &[Spanned]) -> Scan {
    let mut depth = 0usize;
    let mut commas = 0;
    for spanned in between {
        match spanned.token {
            Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
            Token::RParen | Token::RBracket | Token::RBrace => {
                if depth == 0 {
                    return Scan::Closed;
                }
                depth -= 1;
            }
            Token::Comma if depth == 0 => commas += 1,
            _ => {}
        }
    }
    if depth == 0 {
        Scan::Argument(commas)
    } else {
        Scan::Nested
    }
}

/// Start offset of the name of the innermost call whose `(` is still open at
/// token `first`.
fn innermost_call_start(tokens: &[Spanned], first: usize) -> Option<usize> {
    let mut depth = 0usize;
    for j in (0..first).rev() {
        match tokens[j].token {
            Token::RParen | Token::RBracket | Token::RBrace => depth += 1,
            Token::LParen | Token::LBracket | Token::LBrace if depth > 0 => depth -= 1,
            Token::LParen => {
                return match j.checked_sub(1).map(|k| &tokens[k]) {
                    Some(Spanned {
                        token: Token::Ident(_),
                        span,
                    }) => Some(span.start),
                    _ => None,
                };
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{find_numeric_literals, EvalRange, Position, SourceBlock};
    use crate::lexer;

    fn classify_all(source: &str) -> Vec<ParameterDescriptor> {
        classify_with(&Classifier::new(SignatureRegistry::hydra()), source)
    }

    fn classify_with(classifier: &Classifier, source: &str) -> Vec<ParameterDescriptor> {
        let block = SourceBlock::document(source);
        let range = EvalRange::new(Position::new(0, 0), Position::new(u32::MAX, 0));
        let sites = find_numeric_literals(&block, &range).unwrap();
        let tokens = lexer::lex(source).unwrap().tokens;
        sites
            .iter()
            .enumerate()
            .map(|(i, site)| classifier.classify(source, &tokens, i, site))
            .collect()
    }

    fn names(descriptors: &[ParameterDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn positional_arguments_resolve_to_names() {
        let d = classify_all("osc(10, 0.1, 1.2).out()");
        assert_eq!(names(&d), vec!["frequency", "sync", "offset"]);
        assert!(d.iter().all(|p| p.function == "osc"));
        assert_eq!(d[0].default, Some(60.0));
        assert_eq!(d[2].position, Some(2));
        assert_eq!(d[0].call_offset, Some(0));
    }

    #[test]
    fn chained_calls_pick_the_nearest_enclosing() {
        let d = classify_all("osc(10).rotate(0.5, 0.1).color(1, 0.5, 0.2)");
        assert_eq!(
            names(&d),
            vec!["frequency", "angle", "speed", "r", "g", "b"]
        );
        assert_eq!(d[3].param_type, ParamType::ColorComponent);
        assert_eq!(d[1].param_type, ParamType::Float);
    }

    #[test]
    fn texture_argument_shifts_position() {
        let d = classify_all("src(o0).modulate(noise(3), 0.2)");
        assert_eq!(d[0].function, "noise");
        assert_eq!(d[0].name, "scale");
        assert_eq!(d[1].function, "modulate");
        assert_eq!(d[1].name, "amount");
        assert_eq!(d[1].position, Some(1));
    }

    #[test]
    fn closed_calls_are_skipped() {
        let d = classify_all("blend(shape(4), 0.7)");
        assert_eq!((d[0].function.as_str(), d[0].name.as_str()), ("shape", "sides"));
        assert_eq!((d[1].function.as_str(), d[1].name.as_str()), ("blend", "amount"));
    }

    #[test]
    fn nested_literals_are_unknown() {
        let d = classify_all("shape([3, 4, 5].fast(1.5), 0.3)");
        assert!(d[..3].iter().all(|p| p.is_unknown()));
        // `fast` is not a registered function, so 1.5 has no owner either.
        assert!(d[3].is_unknown());
        assert_eq!(d[4].name, "radius");
    }

    #[test]
    fn misses_get_indexed_names() {
        let d = classify_all("x = 3; osc(1, 2, 3, 4)");
        assert_eq!(d[0].name, "param0");
        assert_eq!(d[0].function, UNKNOWN_FUNCTION);
        assert_eq!(d[0].call_offset, None);
        // osc takes three arguments.
        assert_eq!(d[4].name, "param4");
        assert!(d[4].is_unknown());
    }

    #[test]
    fn select_and_point_types() {
        let d = classify_all("shape(4).scroll(0.1, 0.2).scale(1, 2, 3)");
        assert_eq!(d[0].param_type, ParamType::Select);
        assert!(d[0].options.contains(&4.0));
        assert_eq!(d[1].name, "scrollX");
        assert_eq!(d[1].param_type, ParamType::PointComponent);
        assert_eq!(d[2].param_type, ParamType::PointComponent);
        assert_eq!(d[3].name, "amount");
        assert_eq!(d[3].param_type, ParamType::Float);
        assert_eq!(d[4].name, "xMult");
        assert_eq!(d[4].param_type, ParamType::PointComponent);
    }

    #[test]
    fn declarations_outside_calls_are_unknown() {
        let d = classify_all("const f = 3\nnoise(f, 0.2)");
        assert!(d[0].is_unknown());
        assert_eq!(d[1].name, "offset");
        assert_eq!(d[1].call_offset, Some(12));
    }

    #[test]
    fn window_extends_to_enclosing_call() {
        let source = "modulate(o1,                                  0.25)";
        let d = classify_all(source);
        assert_eq!(d[0].function, "modulate");
        assert_eq!(d[0].name, "amount");
    }

    #[test]
    fn empty_registry_classifies_nothing() {
        let classifier = Classifier::new(SignatureRegistry::empty()).with_miss_logging(false);
        let d = classify_with(&classifier, "osc(10).out()");
        assert!(d[0].is_unknown());
        assert_eq!(d[0].name, "param0");
    }

    #[test]
    fn param_type_serializes_kebab_case() {
        let json = serde_json::to_string(&ParamType::ColorComponent).unwrap();
        assert_eq!(json, "\"color-component\"");
    }
}
