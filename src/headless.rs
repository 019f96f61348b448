//! In-memory adapters: an editor over a `String`, a sandbox that records
//! what it was asked to run, and a GUI that keeps controls in a table.
//!
//! The CLI uses them to build a panel without a display; tests use them to
//! observe a coordinator from the outside. Each adapter is a cheap handle
//! over shared state, so a clone kept by the caller sees what the
//! coordinator did with the original.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::analyzer::{byte_offset, EvalRange, Position};
use crate::controls::{BindingOptions, ControlValue};
use crate::sync::adapters::{
    ControllerId, FolderId, FolderOptions, GuiToolkit, HostEditor, MessageLevel, Sandbox,
};

// ── Editor ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct EditorState {
    text: String,
    cursor: Position,
    writes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryEditor {
    state: Rc<RefCell<EditorState>>,
}

impl MemoryEditor {
    pub fn new(text: impl Into<String>) -> Self {
        let editor = Self::default();
        editor.state.borrow_mut().text = text.into();
        editor
    }

    pub fn text(&self) -> String {
        self.state.borrow().text.clone()
    }

    /// Replace the whole document as a user would, without recording a write.
    pub fn set_text(&self, text: impl Into<String>) {
        self.state.borrow_mut().text = text.into();
    }

    pub fn set_cursor(&self, cursor: Position) {
        self.state.borrow_mut().cursor = cursor;
    }

    /// Every `replace_range` payload, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.state.borrow().writes.clone()
    }

    /// Range covering the whole document.
    pub fn full_range(&self) -> EvalRange {
        EvalRange::covering(Position::default(), &self.state.borrow().text)
    }

    /// Range covering one line, without its newline.
    pub fn line_range(&self, line: u32) -> EvalRange {
        let state = self.state.borrow();
        let len = state
            .text
            .split('\n')
            .nth(line as usize)
            .map_or(0, |l| l.chars().count() as u32);
        EvalRange::new(Position::new(line, 0), Position::new(line, len))
    }
}

impl HostEditor for MemoryEditor {
    fn get_text(&self, range: &EvalRange) -> String {
        let state = self.state.borrow();
        let start = byte_offset(&state.text, range.start);
        let end = byte_offset(&state.text, range.end).max(start);
        state.text[start..end].to_string()
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Position) {
        let mut state = self.state.borrow_mut();
        let start = byte_offset(&state.text, from);
        let end = byte_offset(&state.text, to).max(start);
        state.text.replace_range(start..end, text);
        state.writes.push(text.to_string());
    }

    fn cursor(&self) -> Position {
        self.state.borrow().cursor
    }
}

// ── Sandbox ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RecordingSandbox {
    runs: Rc<RefCell<Vec<String>>>,
}

impl RecordingSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runs(&self) -> Vec<String> {
        self.runs.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.runs.borrow().last().cloned()
    }
}

impl Sandbox for RecordingSandbox {
    fn evaluate(&mut self, code: &str) {
        self.runs.borrow_mut().push(code.to_string());
    }
}

// ── GUI ─────────────────────────────────────────────────────────────────

/// One control as the headless toolkit stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessControl {
    pub id: ControllerId,
    pub folder: FolderId,
    pub key: String,
    pub value: ControlValue,
    pub options: BindingOptions,
}

#[derive(Debug, Default)]
struct GuiState {
    next_id: u64,
    folders: Vec<(FolderId, String)>,
    controls: BTreeMap<ControllerId, HeadlessControl>,
    buttons: BTreeMap<ControllerId, String>,
    messages: Vec<(MessageLevel, String)>,
    mounts: usize,
}

impl GuiState {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessGui {
    state: Rc<RefCell<GuiState>>,
}

impl HeadlessGui {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live controls, buttons excluded, in creation order.
    pub fn controls(&self) -> Vec<HeadlessControl> {
        self.state.borrow().controls.values().cloned().collect()
    }

    pub fn value_of(&self, id: ControllerId) -> Option<ControlValue> {
        self.state.borrow().controls.get(&id).map(|c| c.value)
    }

    pub fn buttons(&self) -> Vec<(ControllerId, String)> {
        let state = self.state.borrow();
        state.buttons.iter().map(|(id, t)| (*id, t.clone())).collect()
    }

    /// Controls plus buttons not yet disposed.
    pub fn live_controls(&self) -> usize {
        let state = self.state.borrow();
        state.controls.len() + state.buttons.len()
    }

    pub fn messages(&self) -> Vec<(MessageLevel, String)> {
        self.state.borrow().messages.clone()
    }

    pub fn folders(&self) -> Vec<String> {
        self.state.borrow().folders.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn mount_count(&self) -> usize {
        self.state.borrow().mounts
    }

    /// Most recently allocated id.
    pub fn last_id(&self) -> u64 {
        self.state.borrow().next_id
    }
}

impl GuiToolkit for HeadlessGui {
    fn create_folder(&mut self, _parent: Option<FolderId>, options: &FolderOptions) -> FolderId {
        let mut state = self.state.borrow_mut();
        let id = FolderId(state.allocate());
        state.folders.push((id, options.title.clone()));
        id
    }

    fn add_binding(
        &mut self,
        folder: FolderId,
        key: &str,
        value: &ControlValue,
        options: &BindingOptions,
    ) -> ControllerId {
        let mut state = self.state.borrow_mut();
        let id = ControllerId(state.allocate());
        state.controls.insert(
            id,
            HeadlessControl {
                id,
                folder,
                key: key.to_string(),
                value: *value,
                options: options.clone(),
            },
        );
        id
    }

    fn refresh(&mut self, id: ControllerId, value: &ControlValue) {
        if let Some(control) = self.state.borrow_mut().controls.get_mut(&id) {
            control.value = *value;
        }
    }

    fn dispose(&mut self, id: ControllerId) {
        let mut state = self.state.borrow_mut();
        state.controls.remove(&id);
        state.buttons.remove(&id);
    }

    fn add_button(&mut self, _folder: FolderId, title: &str) -> ControllerId {
        let mut state = self.state.borrow_mut();
        let id = ControllerId(state.allocate());
        state.buttons.insert(id, title.to_string());
        id
    }

    fn clear_folder(&mut self, folder: FolderId) {
        let mut state = self.state.borrow_mut();
        state.controls.retain(|_, c| c.folder != folder);
    }

    fn show_message(&mut self, level: MessageLevel, text: &str) {
        self.state.borrow_mut().messages.push((level, text.to_string()));
    }

    fn ensure_mounted(&mut self) {
        self.state.borrow_mut().mounts += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_replaces_by_position() {
        let mut editor = MemoryEditor::new("a\nosc(10)\nb");
        let line = editor.line_range(1);
        assert_eq!(editor.get_text(&line), "osc(10)");
        editor.replace_range("osc(20)", line.start, line.end);
        assert_eq!(editor.text(), "a\nosc(20)\nb");
        assert_eq!(editor.writes(), vec!["osc(20)".to_string()]);
    }

    #[test]
    fn clones_share_state() {
        let gui = HeadlessGui::new();
        let mut handle = gui.clone();
        handle.show_message(MessageLevel::Info, "hi");
        assert_eq!(gui.messages().len(), 1);

        let sandbox = RecordingSandbox::new();
        let mut handle = sandbox.clone();
        handle.evaluate("osc().out()");
        assert_eq!(sandbox.last().as_deref(), Some("osc().out()"));
    }
}
