pub mod analyzer;
pub mod ast;
pub mod classifier;
pub mod config;
pub mod controls;
pub mod error;
pub mod formatter;
pub mod groups;
pub mod headless;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod sync;
pub mod token;

#[cfg(not(target_arch = "wasm32"))]
pub mod live;
#[cfg(not(target_arch = "wasm32"))]
pub mod session;
#[cfg(feature = "wasm")]
pub mod wasm;

use std::collections::BTreeMap;

use serde::Serialize;

use analyzer::{Analysis, Analyzer, EvalRange, NumericLiteralSite, SourceBlock};
use classifier::{Classifier, ParameterDescriptor};
use controls::{ControlBinding, ControlPanel};
use error::Result;
use formatter::Replacement;
use headless::HeadlessGui;
use registry::SignatureRegistry;

/// Analyzer over the built-in Hydra signature table.
pub fn hydra_analyzer() -> Analyzer {
    Analyzer::new(Classifier::new(SignatureRegistry::hydra()))
}

/// Analyze a whole sketch with the built-in Hydra signatures.
pub fn analyze_source(source: &str) -> Result<Analysis> {
    hydra_analyzer().analyze(SourceBlock::document(source))
}

/// Rewrite `source` with the listed literal sites replaced.
pub fn set_values(source: &str, edits: &BTreeMap<usize, Replacement>) -> Result<String> {
    Ok(analyze_source(source)?.rewrite(edits))
}

/// Everything an analysis binds, in a shape fit for JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub range: EvalRange,
    pub calls: Vec<String>,
    pub sites: Vec<NumericLiteralSite>,
    pub parameters: Vec<ParameterDescriptor>,
    pub controls: Vec<ControlBinding>,
}

impl Report {
    /// Build the controls for `analysis` on a headless panel and collect them.
    pub fn new(analysis: &Analysis, title: &str) -> Self {
        let mut gui = HeadlessGui::new();
        let mut panel = ControlPanel::new();
        let controls = panel
            .rebuild(&mut gui, analysis, &BTreeMap::new(), title)
            .to_vec();
        Self {
            range: analysis.range,
            calls: analysis.program.call_names(),
            sites: analysis.sites.clone(),
            parameters: analysis.parameters.clone(),
            controls,
        }
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::controls::{ControlValue, ControlView};
    use crate::groups::GroupKind;

    #[test]
    fn end_to_end_color_and_frequency() {
        let source = "osc(10, 0.1, 1.2)\n  .color(0.9, 0.3, 0.7)\n  .out(o0)";
        let analysis = analyze_source(source).expect("analysis should succeed");
        assert_eq!(analysis.sites.len(), 6);

        let report = Report::new(&analysis, "hydra");
        let kinds: Vec<_> = report.controls.iter().map(|c| c.group.kind).collect();
        assert_eq!(
            kinds,
            vec![GroupKind::Color, GroupKind::Number, GroupKind::Number, GroupKind::Number]
        );
        assert_eq!(
            report.controls[0].display,
            ControlValue::Color { r: 0.9, g: 0.3, b: 0.7 }
        );
        assert_eq!(report.calls, vec!["out", "color", "osc"]);
    }

    #[test]
    fn end_to_end_point_pad() {
        let source = "shape(4).scrollX(0.1).scrollY(0.2).modulateScale(osc(4), 0.5, 1).out()";
        let analysis = analyze_source(source).unwrap();
        let report = Report::new(&analysis, "hydra");
        let labels: Vec<_> = report.controls.iter().map(|c| c.group.label.as_str()).collect();
        assert!(labels.contains(&"sides"));
        assert!(labels.contains(&"frequency"));
        assert!(report
            .controls
            .iter()
            .all(|c| !matches!(c.view, ControlView::Color)));
    }

    #[test]
    fn end_to_end_set_values() {
        let source = "// slow\nosc(10, 0.1).out()";
        let edits = BTreeMap::from([(0, Replacement::Number(60.0)), (1, Replacement::from("() => time"))]);
        assert_eq!(
            set_values(source, &edits).unwrap(),
            "// slow\nosc(60, () => time).out()"
        );
    }

    #[test]
    fn report_serializes() {
        let analysis = analyze_source("noise(3, 0.1).out()").unwrap();
        let json = serde_json::to_value(Report::new(&analysis, "hydra")).unwrap();
        assert_eq!(json["sites"][0]["raw"], "3");
        assert_eq!(json["parameters"][0]["name"], "scale");
        assert_eq!(json["controls"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn parse_errors_surface() {
        let err = analyze_source("osc(10,").unwrap_err();
        assert!(err.to_string().contains("expected"));
    }
}
