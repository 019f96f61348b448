use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use hydra_tweak::formatter::Replacement;
use hydra_tweak::Report;

fn sketches() -> Vec<(PathBuf, String)> {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("sketches");
    assert!(dir.is_dir(), "{} is not a directory", dir.display());

    let mut entries: Vec<_> = fs::read_dir(&dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "js").unwrap_or(false))
        .collect();
    entries.sort();
    assert!(!entries.is_empty(), "no .js files found in {}", dir.display());

    entries
        .into_iter()
        .map(|path| {
            let source = fs::read_to_string(&path)
                .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
            (path, source)
        })
        .collect()
}

#[test]
fn all_sketches_analyze() {
    for (path, source) in sketches() {
        let analysis = hydra_tweak::analyze_source(&source)
            .unwrap_or_else(|e| panic!("{} failed to analyze: {e}", path.display()));

        assert!(!analysis.sites.is_empty(), "{} has no literals", path.display());
        assert_eq!(analysis.parameters.len(), analysis.sites.len());
        for i in 0..analysis.sites.len() {
            assert!(
                analysis.literal_index(i).is_some(),
                "{}: site #{i} has no matching literal",
                path.display()
            );
        }
    }
}

#[test]
fn groups_partition_sites() {
    for (path, source) in sketches() {
        let analysis = hydra_tweak::analyze_source(&source).unwrap();
        let mut seen = BTreeSet::new();
        for group in &analysis.groups {
            for site in group.site_indices() {
                assert!(seen.insert(site), "{}: site #{site} in two groups", path.display());
            }
        }
        assert_eq!(seen.len(), analysis.sites.len(), "{}", path.display());
    }
}

#[test]
fn empty_edit_is_identity() {
    for (path, source) in sketches() {
        let output = hydra_tweak::set_values(&source, &BTreeMap::new()).unwrap();
        assert_eq!(output, source, "{} changed without edits", path.display());
    }
}

#[test]
fn single_edit_touches_one_literal() {
    for (path, source) in sketches() {
        let analysis = hydra_tweak::analyze_source(&source).unwrap();
        let last = analysis.sites.len() - 1;
        let edits = BTreeMap::from([(last, Replacement::Number(123.0))]);
        let output = analysis.rewrite(&edits);

        let site = &analysis.sites[last];
        let span = site.span();
        assert_eq!(&output[..span.start], &source[..span.start], "{}", path.display());
        assert_eq!(&output[span.start..span.start + 3], "123");
        assert_eq!(
            &output[span.start + 3..],
            &source[span.end..],
            "{}",
            path.display()
        );

        let again = hydra_tweak::analyze_source(&output).unwrap();
        assert_eq!(again.sites.len(), analysis.sites.len());
        assert_eq!(again.sites[last].value, 123.0);
    }
}

#[test]
fn every_group_gets_a_control() {
    for (path, source) in sketches() {
        let analysis = hydra_tweak::analyze_source(&source).unwrap();
        let report = Report::new(&analysis, "corpus");
        assert_eq!(
            report.controls.len(),
            analysis.groups.len(),
            "{}",
            path.display()
        );
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"controls\""));
    }
}

#[test]
fn scroll_sketch_binds_known_parameters() {
    let (_, source) = sketches()
        .into_iter()
        .find(|(p, _)| p.ends_with("03-scroll.js"))
        .expect("03-scroll.js present");
    let analysis = hydra_tweak::analyze_source(&source).unwrap();
    let names: Vec<_> = analysis.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(&names[..3], &["sides", "radius", "smoothing"]);
    assert!(names.contains(&"scrollX"));
    assert!(names.contains(&"nSides"));
    let scroll_y = analysis.sites.iter().find(|s| s.raw == "-0.2").unwrap();
    assert_eq!(scroll_y.value, -0.2);
}
