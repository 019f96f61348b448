//! WASM bindings for browser hosts.
//!
//! Exposes analysis and regeneration to JavaScript via wasm-bindgen; the
//! host keeps its own editor and GUI and calls back in with edits.
//! Build with: `wasm-pack build --target web --features wasm`

use std::collections::BTreeMap;

use wasm_bindgen::prelude::*;

use crate::analyzer::{EvalRange, SourceBlock};
use crate::formatter::{self, Replacement};
use crate::Report;

/// Analyze a sketch and describe the controls it would get.
///
/// `range` is optional `{ start: { line, column }, end: { line, column } }`;
/// without it every literal is kept. Throws on a parse error.
#[wasm_bindgen]
pub fn analyze(source: &str, range: JsValue) -> Result<JsValue, JsError> {
    let analyzer = crate::hydra_analyzer();
    let block = SourceBlock::document(source);
    let analysis = if range.is_undefined() || range.is_null() {
        analyzer.analyze(block)
    } else {
        let range: EvalRange = serde_wasm_bindgen::from_value(range)?;
        analyzer.analyze_in(block, range)
    }
    .map_err(|e| JsError::new(&e.to_string()))?;

    let report = Report::new(&analysis, crate::sync::DEFAULT_TITLE);
    Ok(serde_wasm_bindgen::to_value(&report)?)
}

/// Rewrite `source` with some literal sites replaced.
///
/// `edits` maps site index to a number or an expression string, e.g.
/// `{ "0": 20, "2": "() => time" }`.
#[wasm_bindgen]
pub fn regenerate(source: &str, edits: JsValue) -> Result<String, JsError> {
    let raw: BTreeMap<String, Replacement> = serde_wasm_bindgen::from_value(edits)?;
    let mut edits = BTreeMap::new();
    for (key, replacement) in raw {
        let site = key
            .parse::<usize>()
            .map_err(|_| JsError::new(&format!("`{key}` is not a site index")))?;
        edits.insert(site, replacement);
    }
    crate::set_values(source, &edits).map_err(|e| JsError::new(&e.to_string()))
}

/// Format a number the way write-back does.
#[wasm_bindgen]
pub fn format_value(value: f64) -> String {
    formatter::format_number(value)
}
