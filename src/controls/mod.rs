//! Control binding layer.
//!
//! One control per parameter group: an RGB picker for colors, a 2D pad for
//! points, a select or number field for everything else. Controls never
//! touch source text; a change comes back as a list of [`ValueChange`]s for
//! the coordinator to splice.

pub mod mapping;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::analyzer::Analysis;
use crate::classifier::ParamType;
use crate::groups::{GroupKind, ParameterGroup};
use crate::sync::adapters::{ControllerId, FolderId, FolderOptions, GuiToolkit};

pub use mapping::{NumberRange, PointMapping};

/// Title of the button that restores created values.
pub const RESET_BUTTON: &str = "reset";

/// What a control currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlValue {
    Color { r: f64, g: f64, b: f64 },
    Point { x: f64, y: f64 },
    Number(f64),
    Choice(f64),
}

/// Which widget to build and how to constrain it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlView {
    Color,
    Point { min: f64, max: f64 },
    Number(NumberRange),
    Select { options: Vec<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingOptions {
    pub label: String,
    pub view: ControlView,
}

/// A new source-space value for one literal site.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueChange {
    pub site_index: usize,
    pub value: f64,
}

/// A live control and the group it edits.
#[derive(Debug, Clone, Serialize)]
pub struct ControlBinding {
    pub controller: ControllerId,
    pub group: ParameterGroup,
    /// Value the control shows now, in display space.
    pub display: ControlValue,
    /// Value the control was created with.
    pub original: ControlValue,
    pub view: ControlView,
    /// Present for point groups only.
    pub mapping: Option<PointMapping>,
}

impl ControlBinding {
    /// Map a display value back onto the group's sites. Empty when the
    /// value's shape does not fit the control.
    pub fn site_values(&self, display: &ControlValue) -> Vec<ValueChange> {
        let values = match (self.group.kind, display) {
            (GroupKind::Color, ControlValue::Color { r, g, b }) => vec![*r, *g, *b],
            (GroupKind::Point, ControlValue::Point { x, y }) => {
                let mapping = self.mapping.unwrap_or(PointMapping::Normal);
                vec![mapping.from_display(*x), mapping.from_display(*y)]
            }
            (GroupKind::Number, ControlValue::Number(v) | ControlValue::Choice(v)) => vec![*v],
            _ => return Vec::new(),
        };
        self.group
            .site_indices()
            .zip(values)
            .map(|(site_index, value)| ValueChange { site_index, value })
            .collect()
    }
}

/// The folder of controls for the current analysis.
#[derive(Debug, Default)]
pub struct ControlPanel {
    folder: Option<FolderId>,
    bindings: Vec<ControlBinding>,
    reset_button: Option<ControllerId>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispose the current controls and build one per group of `analysis`.
    /// Sites listed in `preserved` start from that value instead of the
    /// literal in the text.
    pub fn rebuild<G: GuiToolkit + ?Sized>(
        &mut self,
        gui: &mut G,
        analysis: &Analysis,
        preserved: &BTreeMap<usize, f64>,
        title: &str,
    ) -> &[ControlBinding] {
        self.dispose_controls(gui);

        let folder = match self.folder {
            Some(folder) => {
                gui.clear_folder(folder);
                folder
            }
            None => {
                let options = FolderOptions {
                    title: title.to_string(),
                    expanded: true,
                };
                let folder = gui.create_folder(None, &options);
                self.folder = Some(folder);
                folder
            }
        };

        let literal = |site: usize| analysis.site(site).map_or(0.0, |s| s.value);
        let current = |site: usize| preserved.get(&site).copied().unwrap_or_else(|| literal(site));
        for group in &analysis.groups {
            let binding = create_binding(gui, folder, group, &literal, &current);
            self.bindings.push(binding);
        }
        if !self.bindings.is_empty() {
            self.reset_button = Some(gui.add_button(folder, RESET_BUTTON));
        }

        log::debug!(
            "built {} controls for {} sites ({} preserved)",
            self.bindings.len(),
            analysis.sites.len(),
            preserved.len()
        );
        gui.ensure_mounted();
        &self.bindings
    }

    /// Record a change reported by the toolkit and return the site values
    /// that moved.
    pub fn apply_change(&mut self, controller: ControllerId, value: ControlValue) -> Vec<ValueChange> {
        let Some(binding) = self.bindings.iter_mut().find(|b| b.controller == controller) else {
            log::debug!("change from unbound controller {controller:?}");
            return Vec::new();
        };
        let next = binding.site_values(&value);
        if next.is_empty() {
            log::warn!(
                "{value:?} does not fit the {:?} control `{}`",
                binding.group.kind,
                binding.group.label
            );
            return Vec::new();
        }
        let previous = binding.site_values(&binding.display);
        binding.display = value;

        if binding.group.kind == GroupKind::Number {
            return next;
        }
        next.into_iter()
            .zip(previous)
            .filter(|(n, p)| n.value != p.value)
            .map(|(n, _)| n)
            .collect()
    }

    /// Current source-space value of every bound site.
    pub fn snapshot(&self) -> BTreeMap<usize, f64> {
        self.bindings
            .iter()
            .flat_map(|b| b.site_values(&b.display))
            .map(|c| (c.site_index, c.value))
            .collect()
    }

    /// Restore the values the controls were created with.
    pub fn reset<G: GuiToolkit + ?Sized>(&mut self, gui: &mut G) -> Vec<ValueChange> {
        let mut changes = Vec::new();
        for binding in &mut self.bindings {
            binding.display = binding.original;
            gui.refresh(binding.controller, &binding.display);
            changes.extend(binding.site_values(&binding.display));
        }
        changes
    }

    /// Show the literal values of `analysis` again without emitting changes.
    pub fn revert_to<G: GuiToolkit + ?Sized>(&mut self, gui: &mut G, analysis: &Analysis) {
        let literal = |site: usize| analysis.site(site).map_or(0.0, |s| s.value);
        for binding in &mut self.bindings {
            binding.display = display_value(&binding.group, binding.mapping, &literal);
            gui.refresh(binding.controller, &binding.display);
        }
    }

    pub fn is_reset_button(&self, controller: ControllerId) -> bool {
        self.reset_button == Some(controller)
    }

    pub fn bindings(&self) -> &[ControlBinding] {
        &self.bindings
    }

    pub fn binding(&self, controller: ControllerId) -> Option<&ControlBinding> {
        self.bindings.iter().find(|b| b.controller == controller)
    }

    pub fn folder(&self) -> Option<FolderId> {
        self.folder
    }

    /// Tear down every control and empty the folder.
    pub fn dispose<G: GuiToolkit + ?Sized>(&mut self, gui: &mut G) {
        self.dispose_controls(gui);
        if let Some(folder) = self.folder {
            gui.clear_folder(folder);
        }
    }

    fn dispose_controls<G: GuiToolkit + ?Sized>(&mut self, gui: &mut G) {
        for binding in self.bindings.drain(..) {
            gui.dispose(binding.controller);
        }
        if let Some(button) = self.reset_button.take() {
            gui.dispose(button);
        }
    }
}

/// Build the control for one group.
fn create_binding<G: GuiToolkit + ?Sized>(
    gui: &mut G,
    folder: FolderId,
    group: &ParameterGroup,
    literal: &dyn Fn(usize) -> f64,
    current: &dyn Fn(usize) -> f64,
) -> ControlBinding {
    let mapping = match group.kind {
        GroupKind::Point => Some(PointMapping::from_default(
            group.members.first().and_then(|m| m.default),
        )),
        _ => None,
    };
    let display = display_value(group, mapping, current);
    let original = display_value(group, mapping, literal);

    let view = match (group.kind, display) {
        (GroupKind::Color, _) => ControlView::Color,
        (GroupKind::Point, _) => {
            let (min, max) = mapping.unwrap_or(PointMapping::Normal).range();
            ControlView::Point { min, max }
        }
        (GroupKind::Number, ControlValue::Choice(value)) => {
            let mut options = group.members[0].options.clone();
            for v in [value, scalar(&original)] {
                if !options.contains(&v) {
                    options.push(v);
                }
            }
            options.sort_by(f64::total_cmp);
            ControlView::Select { options }
        }
        (GroupKind::Number, _) => ControlView::Number(NumberRange::for_value(scalar(&original))),
    };

    let options = BindingOptions {
        label: group.label.clone(),
        view,
    };
    let controller = gui.add_binding(folder, &group.label, &display, &options);
    ControlBinding {
        controller,
        group: group.clone(),
        display,
        original,
        view: options.view,
        mapping,
    }
}

fn display_value(
    group: &ParameterGroup,
    mapping: Option<PointMapping>,
    value_of: &dyn Fn(usize) -> f64,
) -> ControlValue {
    let v = |i: usize| group.members.get(i).map_or(0.0, |m| value_of(m.site_index));
    match group.kind {
        GroupKind::Color => ControlValue::Color {
            r: v(0),
            g: v(1),
            b: v(2),
        },
        GroupKind::Point => {
            let mapping = mapping.unwrap_or(PointMapping::Normal);
            ControlValue::Point {
                x: mapping.to_display(v(0)),
                y: mapping.to_display(v(1)),
            }
        }
        GroupKind::Number if group.members[0].param_type == ParamType::Select => {
            ControlValue::Choice(v(0))
        }
        GroupKind::Number => ControlValue::Number(v(0)),
    }
}

fn scalar(value: &ControlValue) -> f64 {
    match value {
        ControlValue::Number(v) | ControlValue::Choice(v) => *v,
        ControlValue::Color { r, .. } => *r,
        ControlValue::Point { x, .. } => *x,
    }
}
