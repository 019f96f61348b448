//! Async driver: feeds events from a channel into a [`Coordinator`] and
//! sleeps until the debounce deadline in between.
//!
//! The coordinator is not `Send` (it shares an `Rc` flag with the host), so
//! the session runs on the task that owns it; only the senders travel.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::time;

use crate::analyzer::EvalRange;
use crate::controls::ControlValue;
use crate::sync::{ControllerId, Coordinator, GuiToolkit, HostEditor, Sandbox};

/// Everything a host can tell a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Evaluate(EvalRange),
    EvaluateLine,
    Control {
        controller: ControllerId,
        value: ControlValue,
    },
    Rebind {
        site: usize,
        expression: String,
    },
    Button(ControllerId),
    Reset,
    EditorChanged,
    EvalError(String),
    RefreshGui,
    Flush,
    Shutdown,
}

/// Current time on tokio's clock, so paused-time tests see deadlines pass.
pub fn now() -> Instant {
    time::Instant::now().into_std()
}

/// Run until `Shutdown` arrives or every sender is gone. Pending edits are
/// flushed on the way out.
pub async fn run_session<E, S, G>(
    coordinator: &mut Coordinator<E, S, G>,
    mut events: mpsc::Receiver<SessionEvent>,
) where
    E: HostEditor,
    S: Sandbox,
    G: GuiToolkit,
{
    loop {
        let event = match coordinator.next_deadline() {
            Some(deadline) => {
                tokio::select! {
                    event = events.recv() => event,
                    _ = time::sleep_until(time::Instant::from_std(deadline)) => {
                        coordinator.poll(now());
                        continue;
                    }
                }
            }
            None => events.recv().await,
        };

        match event {
            None | Some(SessionEvent::Shutdown) => break,
            Some(event) => dispatch(coordinator, event),
        }
    }
    coordinator.flush();
    log::debug!("session ended");
}

fn dispatch<E, S, G>(coordinator: &mut Coordinator<E, S, G>, event: SessionEvent)
where
    E: HostEditor,
    S: Sandbox,
    G: GuiToolkit,
{
    match event {
        SessionEvent::Evaluate(range) => {
            if let Err(err) = coordinator.evaluate(range) {
                log::debug!("evaluate failed: {err}");
            }
        }
        SessionEvent::EvaluateLine => {
            if let Err(err) = coordinator.evaluate_line() {
                log::debug!("evaluate line failed: {err}");
            }
        }
        SessionEvent::Control { controller, value } => {
            coordinator.control_changed(controller, value, now())
        }
        SessionEvent::Rebind { site, expression } => {
            coordinator.rebind_expression(site, &expression, now())
        }
        SessionEvent::Button(controller) => coordinator.button_pressed(controller, now()),
        SessionEvent::Reset => coordinator.reset(now()),
        SessionEvent::EditorChanged => coordinator.editor_changed(),
        SessionEvent::EvalError(message) => coordinator.report_eval_error(&message),
        SessionEvent::RefreshGui => coordinator.refresh_gui(),
        SessionEvent::Flush => coordinator.flush(),
        SessionEvent::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::analyzer::Analyzer;
    use crate::classifier::Classifier;
    use crate::headless::{HeadlessGui, MemoryEditor, RecordingSandbox};
    use crate::registry::SignatureRegistry;
    use crate::sync::SyncState;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn coordinator(
        editor: &MemoryEditor,
        sandbox: &RecordingSandbox,
        gui: &HeadlessGui,
    ) -> Coordinator<MemoryEditor, RecordingSandbox, HeadlessGui> {
        let analyzer = Analyzer::new(Classifier::new(SignatureRegistry::hydra()));
        Coordinator::new(editor.clone(), sandbox.clone(), gui.clone(), analyzer)
    }

    fn first_control(gui: &HeadlessGui) -> ControllerId {
        gui.controls()[0].id
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_fires_once_on_the_runtime_clock() {
        let editor = MemoryEditor::new("osc(10).out()");
        let sandbox = RecordingSandbox::new();
        let gui = HeadlessGui::new();
        let mut coordinator = coordinator(&editor, &sandbox, &gui);
        let (tx, rx) = mpsc::channel(16);
        let range = editor.full_range();

        let script = {
            let editor = editor.clone();
            let sandbox = sandbox.clone();
            let gui = gui.clone();
            async move {
                tx.send(SessionEvent::Evaluate(range)).await.unwrap();
                time::sleep(ms(10)).await;
                let freq = first_control(&gui);

                tx.send(SessionEvent::Control {
                    controller: freq,
                    value: ControlValue::Number(20.0),
                })
                .await
                .unwrap();
                time::sleep(ms(300)).await;
                tx.send(SessionEvent::Control {
                    controller: freq,
                    value: ControlValue::Number(30.0),
                })
                .await
                .unwrap();
                time::sleep(ms(900)).await;
                assert!(editor.writes().is_empty());
                assert_eq!(sandbox.runs().len(), 2);

                time::sleep(ms(200)).await;
                assert_eq!(editor.writes(), vec!["osc(30).out()".to_string()]);
            }
        };

        tokio::join!(run_session(&mut coordinator, rx), script);
        assert_eq!(coordinator.state(), SyncState::Bound);
        assert_eq!(editor.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_pending_edits() {
        let editor = MemoryEditor::new("noise(3, 0.1).out()");
        let sandbox = RecordingSandbox::new();
        let gui = HeadlessGui::new();
        let mut coordinator = coordinator(&editor, &sandbox, &gui);
        let (tx, rx) = mpsc::channel(16);
        let range = editor.full_range();
        let start = time::Instant::now();

        let script = {
            let gui = gui.clone();
            async move {
                tx.send(SessionEvent::Evaluate(range)).await.unwrap();
                time::sleep(ms(1)).await;
                tx.send(SessionEvent::Control {
                    controller: first_control(&gui),
                    value: ControlValue::Number(4.0),
                })
                .await
                .unwrap();
                tx.send(SessionEvent::Shutdown).await.unwrap();
            }
        };

        tokio::join!(run_session(&mut coordinator, rx), script);
        assert_eq!(editor.text(), "noise(4, 0.1).out()");
        assert!(start.elapsed() < ms(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn editor_change_during_window_discards_write() {
        let editor = MemoryEditor::new("osc(10).out()");
        let sandbox = RecordingSandbox::new();
        let gui = HeadlessGui::new();
        let mut coordinator = coordinator(&editor, &sandbox, &gui);
        let (tx, rx) = mpsc::channel(16);
        let range = editor.full_range();

        let script = {
            let editor = editor.clone();
            let gui = gui.clone();
            async move {
                tx.send(SessionEvent::Evaluate(range)).await.unwrap();
                time::sleep(ms(1)).await;
                tx.send(SessionEvent::Control {
                    controller: first_control(&gui),
                    value: ControlValue::Number(50.0),
                })
                .await
                .unwrap();
                time::sleep(ms(100)).await;
                editor.set_text("osc(12).out()");
                tx.send(SessionEvent::EditorChanged).await.unwrap();
                time::sleep(ms(2000)).await;
            }
        };

        tokio::join!(run_session(&mut coordinator, rx), script);
        assert!(editor.writes().is_empty());
        assert_eq!(editor.text(), "osc(12).out()");
        assert_eq!(coordinator.pending_edits(), 0);
    }
}
