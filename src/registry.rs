//! Function signature registry.
//!
//! Maps a Hydra function name to its ordered parameter list so a literal's
//! argument position can be turned into a parameter name and default. The
//! built-in table covers the stock source, geometry, color, blend and
//! modulate families; configuration can add or override entries.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One parameter slot of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    /// Default value, when the slot is numeric.
    #[serde(default)]
    pub default: Option<f64>,
    /// Enumerated choices; non-empty marks a categorical parameter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<f64>,
}

impl ParamSpec {
    pub fn is_select(&self) -> bool {
        !self.options.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub params: Vec<ParamSpec>,
}

impl FunctionSignature {
    pub fn param(&self, position: usize) -> Option<&ParamSpec> {
        self.params.get(position)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// True when the function takes an `r, g, b` triple.
    pub fn is_rgb(&self) -> bool {
        ["r", "g", "b"].iter().all(|n| self.has_param(n))
    }
}

/// Lookup table of known function signatures.
#[derive(Debug, Clone, Default)]
pub struct SignatureRegistry {
    functions: HashMap<String, FunctionSignature>,
}

// `None` marks a texture slot (a source chain, never a numeric literal).
type Slot = (&'static str, Option<f64>);

const HYDRA_SIGNATURES: &[(&str, &[Slot])] = &[
    // ── Sources ─────────────────────────────────────────────────────
    ("noise", &[("scale", Some(10.0)), ("offset", Some(0.1))]),
    ("voronoi", &[("scale", Some(5.0)), ("speed", Some(0.3)), ("blending", Some(0.3))]),
    ("osc", &[("frequency", Some(60.0)), ("sync", Some(0.1)), ("offset", Some(0.0))]),
    ("shape", &[("sides", Some(3.0)), ("radius", Some(0.3)), ("smoothing", Some(0.01))]),
    ("gradient", &[("speed", Some(0.0))]),
    ("src", &[("tex", None)]),
    ("solid", &[("r", Some(0.0)), ("g", Some(0.0)), ("b", Some(0.0)), ("a", Some(1.0))]),
    // ── Geometry ────────────────────────────────────────────────────
    ("rotate", &[("angle", Some(10.0)), ("speed", Some(0.0))]),
    (
        "scale",
        &[
            ("amount", Some(1.5)),
            ("xMult", Some(1.0)),
            ("yMult", Some(1.0)),
            ("offsetX", Some(0.5)),
            ("offsetY", Some(0.5)),
        ],
    ),
    ("pixelate", &[("pixelX", Some(20.0)), ("pixelY", Some(20.0))]),
    (
        "repeat",
        &[
            ("repeatX", Some(3.0)),
            ("repeatY", Some(3.0)),
            ("offsetX", Some(0.0)),
            ("offsetY", Some(0.0)),
        ],
    ),
    ("repeatX", &[("reps", Some(3.0)), ("offset", Some(0.0))]),
    ("repeatY", &[("reps", Some(3.0)), ("offset", Some(0.0))]),
    ("kaleid", &[("nSides", Some(4.0))]),
    (
        "scroll",
        &[
            ("scrollX", Some(0.5)),
            ("scrollY", Some(0.5)),
            ("speedX", Some(0.0)),
            ("speedY", Some(0.0)),
        ],
    ),
    ("scrollX", &[("scrollX", Some(0.5)), ("speed", Some(0.0))]),
    ("scrollY", &[("scrollY", Some(0.5)), ("speed", Some(0.0))]),
    // ── Color ───────────────────────────────────────────────────────
    ("posterize", &[("bins", Some(3.0)), ("gamma", Some(0.6))]),
    ("shift", &[("r", Some(0.5)), ("g", Some(0.0)), ("b", Some(0.0)), ("a", Some(0.0))]),
    ("invert", &[("amount", Some(1.0))]),
    ("contrast", &[("amount", Some(1.6))]),
    ("brightness", &[("amount", Some(0.4))]),
    ("luma", &[("threshold", Some(0.5)), ("tolerance", Some(0.1))]),
    ("thresh", &[("threshold", Some(0.5)), ("tolerance", Some(0.04))]),
    ("color", &[("r", Some(1.0)), ("g", Some(1.0)), ("b", Some(1.0)), ("a", Some(1.0))]),
    ("saturate", &[("amount", Some(2.0))]),
    ("hue", &[("hue", Some(0.4))]),
    ("colorama", &[("amount", Some(0.005))]),
    ("r", &[("scale", Some(1.0)), ("offset", Some(0.0))]),
    ("g", &[("scale", Some(1.0)), ("offset", Some(0.0))]),
    ("b", &[("scale", Some(1.0)), ("offset", Some(0.0))]),
    ("a", &[("scale", Some(1.0)), ("offset", Some(0.0))]),
    // ── Blend ───────────────────────────────────────────────────────
    ("add", &[("texture", None), ("amount", Some(1.0))]),
    ("sub", &[("texture", None), ("amount", Some(1.0))]),
    ("layer", &[("texture", None)]),
    ("blend", &[("texture", None), ("amount", Some(0.5))]),
    ("mult", &[("texture", None), ("amount", Some(1.0))]),
    ("diff", &[("texture", None)]),
    ("mask", &[("texture", None)]),
    // ── Modulate ────────────────────────────────────────────────────
    (
        "modulateRepeat",
        &[
            ("texture", None),
            ("repeatX", Some(3.0)),
            ("repeatY", Some(3.0)),
            ("offsetX", Some(0.5)),
            ("offsetY", Some(0.5)),
        ],
    ),
    ("modulateRepeatX", &[("texture", None), ("reps", Some(3.0)), ("offset", Some(0.5))]),
    ("modulateRepeatY", &[("texture", None), ("reps", Some(3.0)), ("offset", Some(0.5))]),
    ("modulateKaleid", &[("texture", None), ("nSides", Some(4.0))]),
    ("modulateScrollX", &[("texture", None), ("scrollX", Some(0.5)), ("speed", Some(0.0))]),
    ("modulateScrollY", &[("texture", None), ("scrollY", Some(0.5)), ("speed", Some(0.0))]),
    ("modulate", &[("texture", None), ("amount", Some(0.1))]),
    ("modulateScale", &[("texture", None), ("multiple", Some(1.0)), ("offset", Some(1.0))]),
    ("modulatePixelate", &[("texture", None), ("multiple", Some(10.0)), ("offset", Some(3.0))]),
    ("modulateRotate", &[("texture", None), ("multiple", Some(1.0)), ("offset", Some(0.0))]),
    ("modulateHue", &[("texture", None), ("amount", Some(1.0))]),
    // ── Output ──────────────────────────────────────────────────────
    ("out", &[("buffer", None)]),
];

/// Categorical parameters: (function, parameter, choices).
const SELECT_OPTIONS: &[(&str, &str, &[f64])] = &[
    ("shape", "sides", &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 12.0, 100.0]),
    ("kaleid", "nSides", &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 12.0]),
    ("modulateKaleid", "nSides", &[2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 12.0]),
];

impl SignatureRegistry {
    /// An empty registry: every literal classifies as unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in Hydra signature table.
    pub fn hydra() -> Self {
        let mut registry = Self::default();
        for (name, slots) in HYDRA_SIGNATURES {
            let params = slots
                .iter()
                .map(|(param, default)| ParamSpec {
                    name: param.to_string(),
                    default: *default,
                    options: select_options(name, param),
                })
                .collect();
            registry.insert(FunctionSignature {
                name: name.to_string(),
                params,
            });
        }
        registry
    }

    /// Add a signature, replacing any existing entry of the same name.
    pub fn insert(&mut self, signature: FunctionSignature) {
        self.functions.insert(signature.name.clone(), signature);
    }

    pub fn extend(&mut self, signatures: impl IntoIterator<Item = FunctionSignature>) {
        for signature in signatures {
            self.insert(signature);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Parameter at `position` of `function`, if both are known.
    pub fn param(&self, function: &str, position: usize) -> Option<&ParamSpec> {
        self.get(function)?.param(position)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn select_options(function: &str, param: &str) -> Vec<f64> {
    SELECT_OPTIONS
        .iter()
        .find(|(f, p, _)| *f == function && *p == param)
        .map(|(_, _, options)| options.to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hydra_table_has_core_functions() {
        let registry = SignatureRegistry::hydra();
        for name in ["osc", "noise", "shape", "color", "scale", "scroll", "modulate", "out"] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert_eq!(registry.param("osc", 0).unwrap().name, "frequency");
        assert_eq!(registry.param("osc", 0).unwrap().default, Some(60.0));
        assert!(registry.param("osc", 3).is_none());
    }

    #[test]
    fn texture_slots_have_no_default() {
        let registry = SignatureRegistry::hydra();
        let tex = registry.param("modulate", 0).unwrap();
        assert_eq!(tex.name, "texture");
        assert_eq!(tex.default, None);
        assert_eq!(registry.param("modulate", 1).unwrap().name, "amount");
    }

    #[test]
    fn select_options_attach_to_categorical_params() {
        let registry = SignatureRegistry::hydra();
        assert!(registry.param("shape", 0).unwrap().is_select());
        assert!(!registry.param("shape", 1).unwrap().is_select());
        assert!(registry.param("kaleid", 0).unwrap().options.contains(&4.0));
    }

    #[test]
    fn rgb_functions_detected() {
        let registry = SignatureRegistry::hydra();
        assert!(registry.get("color").unwrap().is_rgb());
        assert!(registry.get("solid").unwrap().is_rgb());
        assert!(!registry.get("r").unwrap().is_rgb());
    }

    #[test]
    fn insert_overrides_existing() {
        let mut registry = SignatureRegistry::hydra();
        let before = registry.len();
        registry.insert(FunctionSignature {
            name: "osc".into(),
            params: vec![ParamSpec {
                name: "freq".into(),
                default: Some(1.0),
                options: vec![],
            }],
        });
        assert_eq!(registry.len(), before);
        assert_eq!(registry.param("osc", 0).unwrap().name, "freq");
    }

    #[test]
    fn signatures_deserialize_from_json() {
        let sig: FunctionSignature = serde_json::from_str(
            r#"{ "name": "wobble", "params": [ { "name": "depth", "default": 0.2 }, { "name": "mode", "options": [1, 2] } ] }"#,
        )
        .unwrap();
        assert_eq!(sig.params[0].default, Some(0.2));
        assert!(sig.params[1].is_select());
    }
}
