//! Sync coordinator.
//!
//! Owns the current analysis and control panel and keeps three copies of
//! the sketch in step: the editor text, the code running in the sandbox,
//! and the values shown by the controls. A control change regenerates the
//! code right away for the sandbox; the editor is only written once the
//! debounce deadline passes, so dragging a slider produces one write.
//!
//! Time is passed in by the caller (`now`), which keeps the coordinator a
//! plain state machine. `session` wraps it in a tokio event loop.

pub mod adapters;
pub mod debounce;
pub mod guard;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::analyzer::{Analysis, Analyzer, EvalRange, Position, SourceBlock};
use crate::config::TweakConfig;
use crate::controls::{ControlBinding, ControlPanel, ControlValue};
use crate::error::{Result, TweakError};
use crate::formatter::Replacement;

pub use adapters::{
    ControllerId, FolderId, FolderOptions, GuiToolkit, HostEditor, MessageLevel, Sandbox,
};
pub use debounce::Debounce;
pub use guard::{WriteFlag, WriteGuard};

/// Folder title used when none is configured.
pub const DEFAULT_TITLE: &str = "hydra";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    /// Nothing evaluated yet.
    Idle,
    Analyzing,
    /// Controls match the editor text.
    Bound,
    /// Edits are waiting for the debounce deadline.
    Editing,
    Committing,
    /// The last analysis failed.
    Error,
}

pub struct Coordinator<E, S, G> {
    editor: E,
    sandbox: S,
    gui: G,
    analyzer: Analyzer,
    panel: ControlPanel,
    debounce: Debounce,
    flag: WriteFlag,
    state: SyncState,
    title: String,
    analysis: Option<Analysis>,
    /// Latest replacement per site index since the last commit.
    pending: BTreeMap<usize, Replacement>,
    out_of_band: bool,
}

impl<E: HostEditor, S: Sandbox, G: GuiToolkit> Coordinator<E, S, G> {
    pub fn new(editor: E, sandbox: S, gui: G, analyzer: Analyzer) -> Self {
        Self {
            editor,
            sandbox,
            gui,
            analyzer,
            panel: ControlPanel::new(),
            debounce: Debounce::default(),
            flag: WriteFlag::new(),
            state: SyncState::Idle,
            title: DEFAULT_TITLE.to_string(),
            analysis: None,
            pending: BTreeMap::new(),
            out_of_band: false,
        }
    }

    pub fn from_config(editor: E, sandbox: S, gui: G, config: &TweakConfig) -> Self {
        Self::new(editor, sandbox, gui, config.analyzer())
            .with_debounce(config.debounce())
            .with_title(config.panel_title.clone())
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = Debounce::new(delay);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Use a flag the host adapter already holds.
    pub fn with_write_flag(mut self, flag: WriteFlag) -> Self {
        self.flag = flag;
        self
    }

    // ── Commands ────────────────────────────────────────────────────────

    /// Analyze the text of `range` and rebuild the controls for it. Any
    /// pending write-back is dropped. Returns the number of controls.
    ///
    /// On a parse error the previous controls stay as they are.
    pub fn evaluate(&mut self, range: EvalRange) -> Result<usize> {
        if self.debounce.cancel() {
            log::debug!("evaluation dropped {} pending edits", self.pending.len());
        }
        self.pending.clear();
        self.out_of_band = false;
        self.state = SyncState::Analyzing;

        let text = self.editor.get_text(&range);
        let block = SourceBlock::new(text, range.start);
        match self.analyzer.analyze_in(block, range) {
            Ok(analysis) => {
                self.panel
                    .rebuild(&mut self.gui, &analysis, &BTreeMap::new(), &self.title);
                let controls = self.panel.bindings().len();
                log::info!(
                    "bound {controls} controls to {} literals",
                    analysis.sites.len()
                );
                self.analysis = Some(analysis);
                self.state = SyncState::Bound;
                Ok(controls)
            }
            Err(err) => {
                log::warn!("analysis failed: {err}");
                let message = TweakError::Parse(err.clone()).to_string();
                self.gui.show_message(MessageLevel::Error, &message);
                self.state = SyncState::Error;
                Err(err)
            }
        }
    }

    /// Evaluate the line under the editor cursor.
    pub fn evaluate_line(&mut self) -> Result<usize> {
        let line = self.editor.cursor().line;
        let with_newline = EvalRange::new(Position::new(line, 0), Position::new(line + 1, 0));
        let text = self.editor.get_text(&with_newline);
        let text = text.strip_suffix('\n').unwrap_or(&text);
        let text = text.strip_suffix('\r').unwrap_or(text);
        let range = EvalRange::covering(Position::new(line, 0), text);
        self.evaluate(range)
    }

    /// A control reported a new value.
    pub fn control_changed(&mut self, controller: ControllerId, value: ControlValue, now: Instant) {
        if self.panel.is_reset_button(controller) {
            self.button_pressed(controller, now);
            return;
        }
        if self.analysis.is_none() {
            log::debug!("control change with nothing bound");
            return;
        }
        let changes = self.panel.apply_change(controller, value);
        if changes.is_empty() {
            return;
        }
        for change in changes {
            self.pending
                .insert(change.site_index, Replacement::Number(change.value));
        }
        self.push_edit(now);
    }

    /// Replace a literal with a dynamic expression such as `() => time`.
    pub fn rebind_expression(&mut self, site_index: usize, expression: &str, now: Instant) {
        let Some(analysis) = &self.analysis else {
            log::debug!("rebind with nothing bound");
            return;
        };
        if analysis.site(site_index).is_none() {
            let message = format!(
                "no literal #{site_index}; the block has {}",
                analysis.sites.len()
            );
            log::warn!("{message}");
            self.gui.show_message(MessageLevel::Warning, &message);
            return;
        }
        self.pending
            .insert(site_index, Replacement::Expression(expression.to_string()));
        self.push_edit(now);
    }

    pub fn button_pressed(&mut self, controller: ControllerId, now: Instant) {
        if !self.panel.is_reset_button(controller) {
            log::debug!("press from unknown button {controller:?}");
            return;
        }
        self.reset(now);
    }

    /// Put every control back to the value it was created with.
    pub fn reset(&mut self, now: Instant) {
        let Some(analysis) = &self.analysis else {
            return;
        };
        for change in self.panel.reset(&mut self.gui) {
            let unchanged = analysis
                .site(change.site_index)
                .is_some_and(|site| site.value == change.value);
            if unchanged {
                self.pending.remove(&change.site_index);
            } else {
                self.pending
                    .insert(change.site_index, Replacement::Number(change.value));
            }
        }
        self.push_edit(now);
    }

    /// Commit if the debounce deadline has passed. Returns true on commit.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.debounce.fire_if_due(now) {
            self.commit();
            true
        } else {
            false
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Commit pending edits now instead of waiting for the deadline.
    pub fn flush(&mut self) {
        if self.debounce.cancel() {
            self.commit();
        }
    }

    /// The host editor's text changed.
    pub fn editor_changed(&mut self) {
        if self.flag.is_engaged() {
            return;
        }
        let Some(analysis) = &self.analysis else {
            return;
        };
        let text = self.editor.get_text(&analysis.block.range);
        if text == analysis.block.text {
            log::trace!("editor change matches the committed text");
            return;
        }
        if !self.pending.is_empty() {
            log::debug!(
                "out-of-band edit with {} edits pending",
                self.pending.len()
            );
            self.out_of_band = true;
        }
    }

    /// The sandbox failed to run the last code. Controls stay as they are.
    pub fn report_eval_error(&mut self, message: &str) {
        let err = TweakError::Eval(message.to_string());
        log::warn!("{err}");
        self.gui.show_message(MessageLevel::Error, &err.to_string());
    }

    /// Rebuild the controls, keeping the values they show now.
    pub fn refresh_gui(&mut self) {
        let Some(analysis) = &self.analysis else {
            self.gui.ensure_mounted();
            return;
        };
        let preserved = self.panel.snapshot();
        self.panel
            .rebuild(&mut self.gui, analysis, &preserved, &self.title);
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn push_edit(&mut self, now: Instant) {
        let Some(analysis) = &self.analysis else {
            return;
        };
        let code = analysis.rewrite(&self.pending);
        self.sandbox.evaluate(&code);
        if self.pending.is_empty() {
            self.debounce.cancel();
            self.state = SyncState::Bound;
        } else {
            self.debounce.arm(now);
            self.state = SyncState::Editing;
        }
    }

    fn commit(&mut self) {
        let Some(analysis) = &self.analysis else {
            self.pending.clear();
            return;
        };
        if self.pending.is_empty() {
            self.state = SyncState::Bound;
            return;
        }
        self.state = SyncState::Committing;

        let range = analysis.block.range;
        let current = self.editor.get_text(&range);
        if self.out_of_band || current != analysis.block.text {
            let err = TweakError::WriteBackConflict {
                discarded: self.pending.len(),
            };
            log::warn!("{err}");
            self.pending.clear();
            self.out_of_band = false;
            self.panel.revert_to(&mut self.gui, analysis);
            self.gui.show_message(MessageLevel::Warning, &err.to_string());
            self.state = SyncState::Bound;
            return;
        }

        let text = analysis.rewrite(&self.pending);
        let filter_start = analysis.range.start;
        let previous_sites = analysis.sites.len();
        {
            let _guard = self.flag.engage();
            self.editor.replace_range(&text, range.start, range.end);
        }
        let edits = std::mem::take(&mut self.pending).len();
        self.out_of_band = false;

        let block = SourceBlock::new(text, range.start);
        let filter = EvalRange::new(filter_start, block.range.end);
        match self.analyzer.analyze_in(block, filter) {
            Ok(next) => {
                if next.sites.len() != previous_sites {
                    self.panel
                        .rebuild(&mut self.gui, &next, &BTreeMap::new(), &self.title);
                }
                log::info!(
                    "wrote back {edits} edits; {} literals bound",
                    next.sites.len()
                );
                self.analysis = Some(next);
                self.state = SyncState::Bound;
            }
            Err(err) => {
                log::warn!("written text no longer parses: {err}");
                let message = TweakError::Parse(err).to_string();
                self.gui.show_message(MessageLevel::Error, &message);
                self.panel.dispose(&mut self.gui);
                self.analysis = None;
                self.state = SyncState::Error;
            }
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn bindings(&self) -> &[ControlBinding] {
        self.panel.bindings()
    }

    pub fn analysis(&self) -> Option<&Analysis> {
        self.analysis.as_ref()
    }

    pub fn pending_edits(&self) -> usize {
        self.pending.len()
    }

    pub fn write_flag(&self) -> WriteFlag {
        self.flag.clone()
    }

    pub fn editor(&self) -> &E {
        &self.editor
    }

    pub fn sandbox(&self) -> &S {
        &self.sandbox
    }

    pub fn gui(&self) -> &G {
        &self.gui
    }
}
