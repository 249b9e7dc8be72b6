// Integration tests for the dashboard.
//
// These drive the app event loop through its public API the way the TUI does:
// commands in, `UiUpdate`s out. They cover a full session against the
// built-in records, a slide review from upload to accepted plan, and a
// session against a local HTTP backend.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use ataraxis_core::assistant::{Assistant, ChatPhase};
use ataraxis_core::chat::{RevealPacing, Sender};
use ataraxis_core::config::{Config, RecordSourceKind, RecordsConfig};
use ataraxis_core::records::mock::{builtin_patients, builtin_plans};
use ataraxis_core::records::{self, MockRecords, RecordSource};
use ataraxis_core::review::{ReviewDecision, UploadStage};
use ataraxis_tui::app::{self, AppState};
use ataraxis_tui::protocol::{ChatSnapshot, UiUpdate, UserCommand};

// ===========================================================================
// Test helpers
// ===========================================================================

const INSTANT: RevealPacing = RevealPacing {
    initial_delay_ms: 0,
    base_delay_ms: 0,
    variable_delay_ms: 0,
    punctuation_factor: 1,
};

/// Default configuration with typing delays removed.
fn instant_config() -> Config {
    let mut config = Config::default();
    config.typing.chat = INSTANT;
    config.typing.briefing = INSTANT;
    config.assistant.seed = Some(11);
    config
}

struct Session {
    cmd_tx: mpsc::Sender<UserCommand>,
    ui_rx: mpsc::Receiver<UiUpdate>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Session {
    fn start(config: &Config, records: Arc<dyn RecordSource>) -> Self {
        let (reveal_tx, reveal_rx) = mpsc::channel(256);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (ui_tx, ui_rx) = mpsc::channel(1024);
        let assistant = Assistant::from_config(config, reveal_tx).unwrap();
        let state = AppState::new(assistant, records);
        let handle = tokio::spawn(app::run(reveal_rx, cmd_rx, ui_tx, state));
        Session {
            cmd_tx,
            ui_rx,
            handle,
        }
    }

    async fn send(&self, cmd: UserCommand) {
        self.cmd_tx.send(cmd).await.unwrap();
    }

    async fn next_matching<F>(&mut self, mut pred: F) -> UiUpdate
    where
        F: FnMut(&UiUpdate) -> bool,
    {
        loop {
            let update = tokio::time::timeout(Duration::from_secs(10), self.ui_rx.recv())
                .await
                .expect("timed out waiting for a UI update")
                .expect("ui channel closed");
            if pred(&update) {
                return update;
            }
        }
    }

    async fn idle_chat_with(&mut self, len: usize) -> ChatSnapshot {
        let update = self
            .next_matching(|u| {
                matches!(u, UiUpdate::Chat(s) if s.phase == ChatPhase::Idle && s.messages.len() == len)
            })
            .await;
        match update {
            UiUpdate::Chat(snapshot) => *snapshot,
            other => panic!("Expected Chat, got {:?}", other),
        }
    }

    async fn quit(self) {
        self.send(UserCommand::Quit).await;
        let result = self.handle.await.unwrap();
        assert!(result.is_ok());
    }
}

/// Serve the demo records over HTTP until the test ends.
async fn spawn_records_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                let (status, body) = route(&path);
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.flush().await;
            });
        }
    });

    format!("http://{addr}")
}

fn route(path: &str) -> (&'static str, String) {
    let patients = builtin_patients();
    let plans = builtin_plans();
    let not_found = ("404 Not Found", r#"{"detail":"Not found"}"#.to_string());

    if path == "/patients/" {
        return ("200 OK", serde_json::to_string(&patients).unwrap());
    }
    if path == "/treatments/" {
        return ("200 OK", serde_json::to_string(&plans).unwrap());
    }
    if let Some(id) = path.strip_prefix("/patients/") {
        return match patients.iter().find(|p| p.id == id) {
            Some(p) => ("200 OK", serde_json::to_string(p).unwrap()),
            None => not_found,
        };
    }
    if let Some(id) = path.strip_prefix("/treatments/") {
        return match plans.iter().find(|p| p.patient_id == id) {
            Some(p) => ("200 OK", serde_json::to_string(p).unwrap()),
            None => not_found,
        };
    }
    not_found
}

// ===========================================================================
// Sessions
// ===========================================================================

#[tokio::test]
async fn full_session_with_builtin_records() {
    let config = instant_config();
    let mut session = Session::start(&config, Arc::new(MockRecords::builtin()));

    let update = session
        .next_matching(|u| matches!(u, UiUpdate::Patients { .. }))
        .await;
    if let UiUpdate::Patients { patients, stats } = update {
        assert_eq!(patients.len(), 6);
        assert_eq!(stats.new_recommendations, 3);
        assert_eq!(stats.pending_uploads, 1);
    }

    // Briefing opens the chat and is revealed in full.
    session.send(UserCommand::BriefMe).await;
    let chat = session.idle_chat_with(2).await;
    assert!(chat.is_open);
    let briefing = &chat.messages[1].content;
    assert!(briefing.starts_with("Here's your daily briefing, Dr. Smith:\n\n"));
    assert!(briefing.contains("• 1 patients are awaiting slide uploads."));
    assert!(briefing.ends_with("provide more details on any specific patient?"));

    // A typed question gets the scripted answer. Keywords match anywhere, so
    // the wording avoids "hi" inside other words.
    session
        .send(UserCommand::SubmitMessage("Can we override it?".into()))
        .await;
    let chat = session.idle_chat_with(4).await;
    assert_eq!(chat.messages[2].sender, Sender::User);
    assert_eq!(chat.messages[2].content, "Can we override it?");
    assert!(chat.messages[3].content.starts_with("You can override AI recommendations"));

    // Blank input changes nothing and raises no notice.
    session.send(UserCommand::SubmitMessage("   ".into())).await;

    session.send(UserCommand::SelectPatient("3".into())).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::PatientDetail(_) | UiUpdate::Status(_)))
        .await;
    match update {
        UiUpdate::PatientDetail(detail) => {
            assert_eq!(detail.patient.id, "3");
            assert_eq!(detail.plan.map(|p| p.confidence), Some(91));
        }
        other => panic!("Expected PatientDetail, got {:?}", other),
    }

    session.send(UserCommand::CloseChat).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::Chat(_)))
        .await;
    if let UiUpdate::Chat(chat) = update {
        assert!(!chat.is_open);
        assert_eq!(chat.messages.len(), 4, "closing keeps the conversation");
    }

    session.quit().await;
}

#[tokio::test(start_paused = true)]
async fn slide_review_from_upload_to_accepted_plan() {
    let config = instant_config();
    let mut session = Session::start(&config, Arc::new(MockRecords::builtin()));

    session.send(UserCommand::SelectPatient("4".into())).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::PatientDetail(_)))
        .await;
    if let UiUpdate::PatientDetail(detail) = update {
        assert_eq!(detail.patient.name, "David Lee");
        assert!(detail.plan.is_none());
        assert_eq!(detail.biomarkers.er, "N/A");
    }

    session
        .send(UserCommand::UploadSlide {
            patient_id: "4".into(),
            path: "lee-core-biopsy.png".into(),
        })
        .await;
    session
        .next_matching(|u| matches!(u, UiUpdate::Upload(v) if v.stage == UploadStage::Uploaded))
        .await;

    session.send(UserCommand::RunAiTest("4".into())).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::PatientDetail(_) | UiUpdate::Error(_)))
        .await;
    match update {
        UiUpdate::PatientDetail(detail) => {
            let plan = detail.plan.expect("plan generated from the slide");
            assert_eq!(plan.patient_id, "4");
            assert_eq!(plan.confidence, 78);
            assert_eq!(
                detail.analysis.map(|a| a.confidence_score),
                Some("C-index: 0.75".to_string())
            );
            assert!(detail.decision.is_none());
        }
        other => panic!("Expected PatientDetail, got {:?}", other),
    }

    session
        .send(UserCommand::AcceptRecommendation("4".into()))
        .await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::PatientDetail(_)))
        .await;
    if let UiUpdate::PatientDetail(detail) = update {
        assert_eq!(
            detail.decision.map(|d| d.decision),
            Some(ReviewDecision::Accepted)
        );
    }

    // The briefing counts the new plan.
    session.send(UserCommand::BriefMe).await;
    let chat = session.idle_chat_with(2).await;
    assert!(chat.messages[1]
        .content
        .contains("• You have 4 new AI recommendations awaiting review."));

    session.quit().await;
}

#[tokio::test]
async fn session_against_http_backend() {
    let base_url = spawn_records_backend().await;
    let mut config = instant_config();
    config.records = RecordsConfig {
        source: RecordSourceKind::Http,
        base_url,
        ..RecordsConfig::default()
    };
    let records = records::from_config(&config.records).unwrap();
    let mut session = Session::start(&config, records);

    let update = session
        .next_matching(|u| matches!(u, UiUpdate::Patients { .. } | UiUpdate::Error(_)))
        .await;
    match update {
        UiUpdate::Patients { patients, stats } => {
            assert_eq!(patients, builtin_patients());
            assert_eq!(stats.high_risk, 1);
        }
        other => panic!("Expected Patients, got {:?}", other),
    }

    session.send(UserCommand::BriefMe).await;
    let chat = session.idle_chat_with(2).await;
    assert!(chat.messages[1]
        .content
        .contains("• Urgent attention needed for: Robert Johnson"));

    session.send(UserCommand::SelectPatient("4".into())).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::PatientDetail(_) | UiUpdate::Error(_)))
        .await;
    match update {
        UiUpdate::PatientDetail(detail) => {
            assert_eq!(detail.patient.name, "David Lee");
            assert!(detail.plan.is_none());
        }
        other => panic!("Expected PatientDetail, got {:?}", other),
    }

    session.send(UserCommand::SelectPatient("99".into())).await;
    let update = session
        .next_matching(|u| matches!(u, UiUpdate::Error(_)))
        .await;
    assert_eq!(update, UiUpdate::Error("Patient not found".into()));

    session.quit().await;
}
