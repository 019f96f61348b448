//! Terminal live session: the sketch file is the editor, stdout is the
//! sandbox, and stdin lines drive the controls.

use std::cell::RefCell;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use notify::{Event, RecursiveMode, Watcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::analyzer::{byte_offset, EvalRange, Position};
use crate::config::TweakConfig;
use crate::controls::{BindingOptions, ControlValue, ControlView};
use crate::error::TweakError;
use crate::headless::HeadlessGui;
use crate::session::{run_session, SessionEvent};
use crate::sync::{
    ControllerId, Coordinator, FolderId, FolderOptions, GuiToolkit, HostEditor, MessageLevel,
    Sandbox,
};

// ── Adapters ────────────────────────────────────────────────────────────

/// Host editor backed by a file on disk. Reads are always fresh so edits
/// made in another program show up as out-of-band changes.
pub struct FileEditor {
    path: PathBuf,
    last: RefCell<String>,
}

impl FileEditor {
    pub fn open(path: &Path) -> Result<Self, TweakError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            last: RefCell::new(text),
        })
    }

    pub fn full_range(&self) -> EvalRange {
        EvalRange::covering(Position::default(), &self.document())
    }

    fn document(&self) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => {
                *self.last.borrow_mut() = text.clone();
                text
            }
            Err(err) => {
                log::warn!("cannot read {}: {err}", self.path.display());
                self.last.borrow().clone()
            }
        }
    }
}

impl HostEditor for FileEditor {
    fn get_text(&self, range: &EvalRange) -> String {
        let text = self.document();
        let start = byte_offset(&text, range.start);
        let end = byte_offset(&text, range.end).max(start);
        text[start..end].to_string()
    }

    fn replace_range(&mut self, text: &str, from: Position, to: Position) {
        let mut document = self.document();
        let start = byte_offset(&document, from);
        let end = byte_offset(&document, to).max(start);
        document.replace_range(start..end, text);
        match std::fs::write(&self.path, &document) {
            Ok(()) => *self.last.borrow_mut() = document,
            Err(err) => log::error!("cannot write {}: {err}", self.path.display()),
        }
    }

    // No cursor; `line <n>` sends an explicit range instead.
    fn cursor(&self) -> Position {
        Position::default()
    }
}

/// Prints each evaluated program.
#[derive(Debug, Default)]
pub struct StdoutSandbox;

impl Sandbox for StdoutSandbox {
    fn evaluate(&mut self, code: &str) {
        println!("── eval ──────────────────────────────");
        println!("{code}");
    }
}

/// Headless controls, printed as a table whenever the panel is rebuilt.
#[derive(Debug, Default)]
pub struct TerminalGui {
    inner: HeadlessGui,
}

impl TerminalGui {
    fn print_panel(&self) {
        let mut out = std::io::stdout().lock();
        for title in self.inner.folders() {
            let _ = writeln!(out, "── {title} ──");
        }
        for control in self.inner.controls() {
            let _ = writeln!(
                out,
                "  #{:<3} {:<12} {}",
                control.id.0,
                control.key,
                describe(&control.value, &control.options)
            );
        }
        for (id, title) in self.inner.buttons() {
            let _ = writeln!(out, "  #{:<3} [{title}]", id.0);
        }
    }
}

fn describe(value: &ControlValue, options: &BindingOptions) -> String {
    let value = match value {
        ControlValue::Color { r, g, b } => format!("rgb({r}, {g}, {b})"),
        ControlValue::Point { x, y } => format!("({x}, {y})"),
        ControlValue::Number(v) | ControlValue::Choice(v) => v.to_string(),
    };
    match &options.view {
        ControlView::Color => value,
        ControlView::Point { min, max } => format!("{value}  pad [{min}, {max}]"),
        ControlView::Number(range) => {
            format!("{value}  [{}, {}] step {}", range.min, range.max, range.step)
        }
        ControlView::Select { options } => format!("{value}  one of {options:?}"),
    }
}

impl GuiToolkit for TerminalGui {
    fn create_folder(&mut self, parent: Option<FolderId>, options: &FolderOptions) -> FolderId {
        self.inner.create_folder(parent, options)
    }

    fn add_binding(
        &mut self,
        folder: FolderId,
        key: &str,
        value: &ControlValue,
        options: &BindingOptions,
    ) -> ControllerId {
        self.inner.add_binding(folder, key, value, options)
    }

    fn refresh(&mut self, id: ControllerId, value: &ControlValue) {
        self.inner.refresh(id, value);
    }

    fn dispose(&mut self, id: ControllerId) {
        self.inner.dispose(id);
    }

    fn add_button(&mut self, folder: FolderId, title: &str) -> ControllerId {
        self.inner.add_button(folder, title)
    }

    fn clear_folder(&mut self, folder: FolderId) {
        self.inner.clear_folder(folder);
    }

    fn show_message(&mut self, level: MessageLevel, text: &str) {
        let tag = match level {
            MessageLevel::Info => "info",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        eprintln!("{tag}: {text}");
    }

    fn ensure_mounted(&mut self) {
        self.inner.ensure_mounted();
        self.print_panel();
    }
}

// ── Commands ────────────────────────────────────────────────────────────

pub const HELP: &str = "\
commands:
  eval                 evaluate the whole file
  line <n>             evaluate line n (1-based)
  set <id> <v>...      set control #id (1 value, 2 for a pad, 3 for a color)
  expr <site> <code>   replace literal #site with an expression
  reset                restore the values the controls started with
  show                 print the controls again
  flush                write pending edits now
  quit                 write pending edits and exit";

/// What one stdin line asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveCommand {
    EvaluateAll,
    EvaluateLine(u32),
    Event(SessionEvent),
    Help,
}

pub fn parse_command(line: &str) -> Result<LiveCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let number = |word: Option<&str>, what: &str| -> Result<f64, String> {
        let word = word.ok_or_else(|| format!("missing {what}"))?;
        word.parse::<f64>().map_err(|_| format!("`{word}` is not a number"))
    };
    match head {
        "eval" | "e" => Ok(LiveCommand::EvaluateAll),
        "line" | "l" => {
            let n = number(words.next(), "line number")?;
            if n < 1.0 || n.fract() != 0.0 {
                return Err(format!("bad line number {n}"));
            }
            Ok(LiveCommand::EvaluateLine(n as u32 - 1))
        }
        "set" | "s" => {
            let id = number(words.next(), "control id")? as u64;
            let values = words
                .map(|w| number(Some(w), "value"))
                .collect::<Result<Vec<_>, _>>()?;
            let value = match values[..] {
                [v] => ControlValue::Number(v),
                [x, y] => ControlValue::Point { x, y },
                [r, g, b] => ControlValue::Color { r, g, b },
                _ => return Err("set takes 1, 2 or 3 values".into()),
            };
            Ok(LiveCommand::Event(SessionEvent::Control {
                controller: ControllerId(id),
                value,
            }))
        }
        "expr" | "x" => {
            let site = number(words.next(), "site index")? as usize;
            let expression = words.collect::<Vec<_>>().join(" ");
            if expression.is_empty() {
                return Err("missing expression".into());
            }
            Ok(LiveCommand::Event(SessionEvent::Rebind { site, expression }))
        }
        "reset" => Ok(LiveCommand::Event(SessionEvent::Reset)),
        "show" => Ok(LiveCommand::Event(SessionEvent::RefreshGui)),
        "flush" | "w" => Ok(LiveCommand::Event(SessionEvent::Flush)),
        "quit" | "q" => Ok(LiveCommand::Event(SessionEvent::Shutdown)),
        "help" | "?" => Ok(LiveCommand::Help),
        other => Err(format!("unknown command `{other}` (try `help`)")),
    }
}

// ── Session ─────────────────────────────────────────────────────────────

/// Run a live session on `path` until `quit` or end of input.
pub async fn run(path: &Path, config: &TweakConfig) -> Result<(), TweakError> {
    let editor = FileEditor::open(path)?;
    let range = editor.full_range();
    let mut coordinator =
        Coordinator::from_config(editor, StdoutSandbox, TerminalGui::default(), config);

    let (tx, rx) = mpsc::channel::<SessionEvent>(64);

    // Our own writes come back here too; the coordinator drops those as echoes.
    let watch_tx = tx.clone();
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, _>| {
        if let Ok(event) = res {
            if event.kind.is_modify() {
                let _ = watch_tx.try_send(SessionEvent::EditorChanged);
            }
        }
    })
    .map_err(|err| TweakError::Io(std::io::Error::other(err)))?;
    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|err| TweakError::Io(std::io::Error::other(err)))?;

    eprintln!("hydra-tweak live");
    eprintln!("  file:     {}", path.display());
    eprintln!("  debounce: {} ms", config.debounce_ms);
    eprintln!("  type `help` for commands");

    if let Err(err) = coordinator.evaluate(range) {
        log::debug!("initial evaluation failed: {err}");
    }

    let input_path = path.to_path_buf();
    let input = tokio::spawn(read_commands(input_path, tx));
    run_session(&mut coordinator, rx).await;
    input.abort();

    drop(watcher);
    Ok(())
}

async fn read_commands(path: PathBuf, tx: mpsc::Sender<SessionEvent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }
        let event = match parse_command(&line) {
            Ok(LiveCommand::EvaluateAll) => match std::fs::read_to_string(&path) {
                Ok(text) => SessionEvent::Evaluate(EvalRange::covering(Position::default(), &text)),
                Err(err) => {
                    eprintln!("error: cannot read {}: {err}", path.display());
                    continue;
                }
            },
            Ok(LiveCommand::EvaluateLine(line)) => match std::fs::read_to_string(&path) {
                Ok(text) => {
                    let len = text
                        .split('\n')
                        .nth(line as usize)
                        .map_or(0, |l| l.trim_end_matches('\r').chars().count() as u32);
                    SessionEvent::Evaluate(EvalRange::new(
                        Position::new(line, 0),
                        Position::new(line, len),
                    ))
                }
                Err(err) => {
                    eprintln!("error: cannot read {}: {err}", path.display());
                    continue;
                }
            },
            Ok(LiveCommand::Event(event)) => event,
            Ok(LiveCommand::Help) => {
                eprintln!("{HELP}");
                continue;
            }
            Err(message) => {
                eprintln!("error: {message}");
                continue;
            }
        };
        let quitting = event == SessionEvent::Shutdown;
        if tx.send(event).await.is_err() || quitting {
            break;
        }
    }
}
