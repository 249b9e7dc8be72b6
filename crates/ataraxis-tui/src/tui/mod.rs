// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app orchestrator reports:
// the patient list, the selected patient's detail and slide upload, and the
// chat conversation.
// Updates arrive as `UiUpdate` messages over an mpsc channel; the TUI applies
// them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;

use ataraxis_core::assistant::ChatPhase;
use ataraxis_core::records::Patient;

use crate::protocol::{
    ChatSnapshot, DashboardStats, PatientDetail, UiUpdate, UploadView, UserCommand,
};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// What a prompt overlay is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    SlidePath,
    OverrideReason,
}

/// An open single-line prompt and the patient it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub patient_id: String,
    pub text: String,
}

impl Prompt {
    pub fn new(kind: PromptKind, patient_id: impl Into<String>) -> Self {
        Prompt {
            kind,
            patient_id: patient_id.into(),
            text: String::new(),
        }
    }
}

/// TUI-local state that mirrors the application state for rendering.
///
/// Updated incrementally via `UiUpdate` messages from the app orchestrator.
/// The `render_frame` function reads this struct to draw the dashboard.
#[derive(Default)]
pub struct ViewState {
    /// Patients in the order the record source returned them.
    pub patients: Vec<Patient>,
    /// Overview counters for the status bar.
    pub stats: DashboardStats,
    /// Index into `patients` of the highlighted row.
    pub selected: usize,
    /// Detail of the last patient the user opened.
    pub detail: Option<PatientDetail>,
    /// Latest chat snapshot.
    pub chat: ChatSnapshot,
    /// Text typed into the chat input line.
    pub input_text: String,
    /// Whether keystrokes go to the chat input line.
    pub input_mode: bool,
    /// Whether the quit confirmation dialog is showing.
    pub confirm_quit: bool,
    /// Open prompt overlay, if any. Takes all keystrokes while set.
    pub prompt: Option<Prompt>,
    /// Latest slide upload progress.
    pub upload: Option<UploadView>,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
}

impl ViewState {
    /// Id of the highlighted patient, if the list is not empty.
    pub fn selected_patient_id(&self) -> Option<&str> {
        self.patients.get(self.selected).map(|p| p.id.as_str())
    }

    pub fn is_streaming(&self) -> bool {
        self.chat.phase == ChatPhase::Streaming
    }

    /// Upload progress for `patient_id`, if that patient's slide is the one
    /// being processed.
    pub fn upload_for(&self, patient_id: &str) -> Option<&UploadView> {
        self.upload.as_ref().filter(|u| u.patient_id == patient_id)
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Chat(snapshot) => {
            state.chat = *snapshot;
            if !state.chat.is_open {
                state.input_mode = false;
            }
        }
        UiUpdate::Patients { patients, stats } => {
            state.patients = patients;
            state.stats = stats;
            if state.selected >= state.patients.len() {
                state.selected = state.patients.len().saturating_sub(1);
            }
        }
        UiUpdate::PatientDetail(detail) => {
            state.detail = Some(*detail);
            state.error_message = None;
        }
        UiUpdate::Upload(view) => {
            state.upload = Some(view);
        }
        UiUpdate::Status(message) => {
            state.status_message = Some(message);
        }
        UiUpdate::Error(message) => {
            state.error_message = Some(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete dashboard frame.
fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area(), state.chat.is_open);

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::patient_list::render(frame, layout.patient_list, state);
    widgets::patient_detail::render(frame, layout.patient_detail, state);
    if let Some(chat_area) = layout.chat {
        widgets::chat::render(frame, chat_area, state);
    }
    render_help_bar(frame, &layout, state);

    if let Some(prompt) = &state.prompt {
        widgets::prompt::render(frame, frame.area(), prompt);
    }
    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

/// Key hints for the current input mode.
fn help_text(state: &ViewState) -> String {
    if state.prompt.is_some() {
        return " Enter:Confirm | Esc:Cancel | Backspace:Delete".to_string();
    }
    if state.input_mode {
        let esc = if state.is_streaming() {
            "Esc:Stop reply"
        } else {
            "Esc:Leave input"
        };
        return format!(" Enter:Send | {esc} | Backspace:Delete");
    }

    let mut hints = vec!["q:Quit", "j/k:Select", "Enter:Open"];
    if let Some(detail) = &state.detail {
        match (&detail.plan, &detail.decision) {
            (None, _) => hints.extend(["u:Upload slide", "r:Run AI test"]),
            (Some(_), None) => hints.extend(["a:Accept", "o:Override"]),
            (Some(_), Some(_)) => {}
        }
    }
    if state.chat.is_open {
        hints.extend(["i:Type", "b:Brief me", "c:Close chat"]);
        hints.push(if state.is_streaming() {
            "Esc:Stop reply"
        } else {
            "Esc:Close chat"
        });
    } else {
        hints.extend(["c:Chat", "b:Brief me"]);
    }
    format!(" {}", hints.join(" | "))
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// This is the main entry point for the terminal UI. It:
/// 1. Initializes the terminal (enters raw mode, enables alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on clean exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    // 1. Initialize terminal
    let mut terminal = ratatui::init();

    // 2. Set panic hook to restore terminal on crash.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    // 3. Create ViewState
    let mut view_state = ViewState::default();

    // 4. Create crossterm EventStream for async keyboard input
    let mut event_stream = EventStream::new();

    // 5. Create render interval (~30fps)
    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // 6. Main loop
    loop {
        tokio::select! {
            // UI updates from the app orchestrator
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => {
                        apply_ui_update(&mut view_state, ui_update);
                    }
                    None => {
                        // Channel closed: app is shutting down
                        break;
                    }
                }
            }

            // Keyboard input
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {
                        // Mouse events, resize events, etc.
                    }
                    Some(Err(_)) | None => {
                        break;
                    }
                }
            }

            // Render tick
            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    // 7. Restore terminal
    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
