// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages sent to the
// app orchestrator, or into local ViewState mutations (selection movement,
// the chat input line, prompts, the quit dialog).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use ataraxis_core::assistant::BusyPolicy;

use super::{Prompt, PromptKind, ViewState};
use crate::protocol::UserCommand;

const BUSY_NOTICE: &str = "Still replying. Press Esc to stop the current reply.";
const MISSING_REASON: &str = "Please provide a reason for overriding the recommendation";

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator (e.g. SubmitMessage, Quit). Returns `None` when the key
/// press was handled locally by mutating `ViewState`.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // On Windows crossterm emits both Press and Release events for each
    // physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    // Ctrl+C always quits immediately regardless of mode (escape hatch)
    if key_event.modifiers.contains(KeyModifiers::CONTROL) && key_event.code == KeyCode::Char('c')
    {
        return Some(UserCommand::Quit);
    }

    // Quit confirmation mode: only y/q confirm, n/Esc cancel, everything else blocked
    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if view_state.prompt.is_some() {
        return handle_prompt(key_event, view_state);
    }

    if view_state.input_mode {
        return handle_input_mode(key_event, view_state);
    }

    match key_event.code {
        KeyCode::Up | KeyCode::Char('k') => move_selection(view_state, -1),
        KeyCode::Down | KeyCode::Char('j') => move_selection(view_state, 1),
        KeyCode::Enter => view_state
            .selected_patient_id()
            .map(|id| UserCommand::SelectPatient(id.to_string())),

        KeyCode::Char('c') => Some(UserCommand::ToggleChat),
        KeyCode::Char('b') => Some(UserCommand::BriefMe),

        // Start typing, opening the chat first if needed
        KeyCode::Char('i') => {
            view_state.input_mode = true;
            if view_state.chat.is_open {
                None
            } else {
                Some(UserCommand::OpenChat)
            }
        }

        // Review of the patient shown in the detail panel
        KeyCode::Char('u') => {
            let detail = view_state.detail.as_ref()?;
            if detail.plan.is_some() {
                view_state.status_message = Some("A treatment plan is already on file".into());
                return None;
            }
            view_state.prompt = Some(Prompt::new(PromptKind::SlidePath, &detail.patient.id));
            None
        }
        KeyCode::Char('r') => {
            let detail = view_state.detail.as_ref()?;
            Some(UserCommand::RunAiTest(detail.patient.id.clone()))
        }
        KeyCode::Char('a') => {
            let detail = view_state.detail.as_ref().filter(|d| awaiting_decision(d))?;
            Some(UserCommand::AcceptRecommendation(detail.patient.id.clone()))
        }
        KeyCode::Char('o') => {
            let detail = view_state.detail.as_ref().filter(|d| awaiting_decision(d))?;
            view_state.prompt = Some(Prompt::new(PromptKind::OverrideReason, &detail.patient.id));
            None
        }

        // Stop a reply in progress, otherwise dismiss notices and the chat
        KeyCode::Esc => {
            if view_state.is_streaming() {
                return Some(UserCommand::CancelReply);
            }
            view_state.status_message = None;
            view_state.error_message = None;
            view_state.chat.is_open.then_some(UserCommand::CloseChat)
        }

        // Quit: enter confirmation mode instead of quitting immediately
        KeyCode::Char('q') => {
            view_state.confirm_quit = true;
            None
        }

        _ => None,
    }
}

/// Handle key events while in quit confirmation mode.
///
/// In quit confirmation mode:
/// - `y` or `q` confirms quit (sends UserCommand::Quit)
/// - `n` or `Esc` cancels (returns to normal mode)
/// - All other keys are blocked (no-op)
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn awaiting_decision(detail: &crate::protocol::PatientDetail) -> bool {
    detail.analysis.is_some() && detail.decision.is_none()
}

/// Handle key events while a prompt overlay is open.
///
/// Esc discards the prompt. Enter submits it, except that a blank slide path
/// is ignored and a blank override reason is refused with a notice.
fn handle_prompt(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let prompt = view_state.prompt.as_mut()?;
    match key_event.code {
        KeyCode::Esc => {
            view_state.prompt = None;
            None
        }
        KeyCode::Backspace => {
            prompt.text.pop();
            None
        }
        KeyCode::Char(c) => {
            prompt.text.push(c);
            None
        }
        KeyCode::Enter => {
            if prompt.text.trim().is_empty() {
                if prompt.kind == PromptKind::OverrideReason {
                    view_state.error_message = Some(MISSING_REASON.into());
                }
                return None;
            }
            let Prompt {
                kind,
                patient_id,
                text,
            } = view_state.prompt.take()?;
            view_state.error_message = None;
            Some(match kind {
                PromptKind::SlidePath => UserCommand::UploadSlide {
                    patient_id,
                    path: text,
                },
                PromptKind::OverrideReason => UserCommand::OverrideRecommendation {
                    patient_id,
                    reason: text,
                },
            })
        }
        _ => None,
    }
}

/// Handle key events while the chat input line has focus.
///
/// - Printable characters are appended to input_text
/// - Backspace removes the last character
/// - Enter sends the line and clears it; a blank line stays put, and so does
///   a line the assistant would refuse because it is still replying
/// - Esc stops a reply in progress, otherwise leaves input mode
fn handle_input_mode(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => {
            if view_state.is_streaming() {
                Some(UserCommand::CancelReply)
            } else {
                view_state.input_mode = false;
                None
            }
        }
        KeyCode::Enter => {
            if view_state.input_text.trim().is_empty() {
                return None;
            }
            if view_state.is_streaming() && view_state.chat.policy == BusyPolicy::Reject {
                view_state.status_message = Some(BUSY_NOTICE.into());
                return None;
            }
            view_state.status_message = None;
            let text = std::mem::take(&mut view_state.input_text);
            Some(UserCommand::SubmitMessage(text))
        }
        KeyCode::Backspace => {
            view_state.input_text.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.input_text.push(c);
            None
        }
        _ => None,
    }
}

/// Move the highlighted row by `delta` and request the new patient's detail.
///
/// Returns `None` at either end of the list.
fn move_selection(view_state: &mut ViewState, delta: isize) -> Option<UserCommand> {
    let len = view_state.patients.len();
    if len == 0 {
        return None;
    }
    let next = view_state.selected.checked_add_signed(delta)?;
    if next >= len {
        return None;
    }
    view_state.selected = next;
    view_state
        .selected_patient_id()
        .map(|id| UserCommand::SelectPatient(id.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
