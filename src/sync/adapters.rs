//! Collaborator traits the coordinator drives.
//!
//! Hosts implement these for their editor, evaluation sandbox and widget
//! toolkit. Controls are addressed by id; change events come back to the
//! coordinator as `(ControllerId, ControlValue)` pairs instead of closures.

use serde::Serialize;

use crate::analyzer::{EvalRange, Position};
use crate::controls::{BindingOptions, ControlValue};

/// Text editor owning the persistent source.
pub trait HostEditor {
    /// Current text of `range`.
    fn get_text(&self, range: &EvalRange) -> String;
    /// Replace the text between `from` and `to` with `text`.
    fn replace_range(&mut self, text: &str, from: Position, to: Position);
    fn cursor(&self) -> Position;
}

/// Live execution environment. Fire-and-forget: failures are reported back
/// through `Coordinator::report_eval_error`.
pub trait Sandbox {
    fn evaluate(&mut self, code: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FolderId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ControllerId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderOptions {
    pub title: String,
    pub expanded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Warning,
    Error,
}

/// Widget toolkit hosting the control panel.
pub trait GuiToolkit {
    fn create_folder(&mut self, parent: Option<FolderId>, options: &FolderOptions) -> FolderId;
    fn add_binding(
        &mut self,
        folder: FolderId,
        key: &str,
        value: &ControlValue,
        options: &BindingOptions,
    ) -> ControllerId;
    /// Push a new value into an existing control without emitting a change.
    fn refresh(&mut self, id: ControllerId, value: &ControlValue);
    fn dispose(&mut self, id: ControllerId);
    fn add_button(&mut self, folder: FolderId, title: &str) -> ControllerId;
    fn clear_folder(&mut self, folder: FolderId);
    fn show_message(&mut self, level: MessageLevel, text: &str);
    /// Attach the panel to the host's display if it is not attached yet.
    fn ensure_mounted(&mut self);
}
