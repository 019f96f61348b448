//! Parameter grouping: RGB triples, XY pairs, and everything else.
//!
//! Detection runs in three phases (color, point, number) and claims each
//! descriptor exactly once, so the groups always partition the input.

use serde::Serialize;

use crate::classifier::ParameterDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Color,
    Point,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPattern {
    Rgb,
    Xy,
    Mult,
    Speed,
}

/// One control's worth of descriptors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterGroup {
    pub kind: GroupKind,
    /// Three members for color (r, g, b), two for point (x, y), one for number.
    pub members: Vec<ParameterDescriptor>,
    pub label: String,
    pub pattern: Option<GroupPattern>,
}

impl ParameterGroup {
    pub fn site_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().map(|m| m.site_index)
    }

    pub fn first_site(&self) -> Option<usize> {
        self.members.first().map(|m| m.site_index)
    }
}

/// Partition `descriptors` into groups, colors first, then points, then
/// singletons.
pub fn detect_groups(descriptors: &[ParameterDescriptor]) -> Vec<ParameterGroup> {
    let mut claimed = vec![false; descriptors.len()];
    let mut groups = Vec::new();

    // ── Color ───────────────────────────────────────────────────────────
    loop {
        let find = |name: &str, claimed: &[bool]| {
            descriptors
                .iter()
                .enumerate()
                .position(|(i, d)| !claimed[i] && d.name == name)
        };
        let (Some(r), Some(g), Some(b)) = (
            find("r", &claimed),
            find("g", &claimed),
            find("b", &claimed),
        ) else {
            break;
        };
        for i in [r, g, b] {
            claimed[i] = true;
        }
        groups.push(ParameterGroup {
            kind: GroupKind::Color,
            members: vec![
                descriptors[r].clone(),
                descriptors[g].clone(),
                descriptors[b].clone(),
            ],
            label: descriptors[r].function.clone(),
            pattern: Some(GroupPattern::Rgb),
        });
    }

    // ── Point ───────────────────────────────────────────────────────────
    for i in 0..descriptors.len() {
        if claimed[i] {
            continue;
        }
        let x = &descriptors[i];
        let Some((siblings, label, pattern)) = point_pairing(&x.name) else {
            continue;
        };
        let candidates: Vec<usize> = (0..descriptors.len())
            .filter(|&j| j != i && !claimed[j] && siblings.contains(&descriptors[j].name))
            .collect();
        let partner = candidates
            .iter()
            .copied()
            .find(|&j| x.same_call(&descriptors[j]))
            .or_else(|| candidates.first().copied());
        let Some(j) = partner else {
            continue;
        };
        claimed[i] = true;
        claimed[j] = true;
        groups.push(ParameterGroup {
            kind: GroupKind::Point,
            members: vec![x.clone(), descriptors[j].clone()],
            label,
            pattern: Some(pattern),
        });
    }

    // ── Number ──────────────────────────────────────────────────────────
    for (i, d) in descriptors.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        groups.push(ParameterGroup {
            kind: GroupKind::Number,
            members: vec![d.clone()],
            label: d.name.clone(),
            pattern: None,
        });
    }

    groups
}

/// For an X-side name: acceptable Y-side names, group label and pattern.
fn point_pairing(name: &str) -> Option<(Vec<String>, String, GroupPattern)> {
    match name {
        "xMult" => return Some((vec!["yMult".into()], "mult".into(), GroupPattern::Mult)),
        "speedX" => return Some((vec!["speedY".into()], "speed".into(), GroupPattern::Speed)),
        _ => {}
    }
    let base = name.strip_suffix(['X', 'x'])?;
    let label = if base.is_empty() {
        "xy".to_string()
    } else {
        base.to_lowercase()
    };
    Some((vec![format!("{base}Y"), format!("{base}y")], label, GroupPattern::Xy))
}
