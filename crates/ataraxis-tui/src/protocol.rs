// Messages exchanged between the TUI and the application event loop.
//
// The TUI sends `UserCommand`s; the app loop answers with `UiUpdate`s. Both
// directions go over tokio mpsc channels, so everything here is owned data.

use ataraxis_core::assistant::{BusyPolicy, ChatPhase};
use ataraxis_core::briefing::BriefingPayload;
use ataraxis_core::chat::Message;
use ataraxis_core::records::{Patient, TreatmentPlan};
use ataraxis_core::review::{AiAnalysis, Biomarkers, DecisionRecord, UploadStage};

/// Commands from the TUI to the app orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    ToggleChat,
    OpenChat,
    CloseChat,
    SubmitMessage(String),
    /// Open the chat and reveal the daily briefing.
    BriefMe,
    /// Load detail and treatment plan for the patient with this id.
    SelectPatient(String),
    /// Stop the reply that is currently being typed.
    CancelReply,
    /// Start the simulated upload of a slide image for a patient.
    UploadSlide { patient_id: String, path: String },
    /// Generate a treatment plan from the patient's uploaded slide.
    RunAiTest(String),
    AcceptRecommendation(String),
    OverrideRecommendation { patient_id: String, reason: String },
    Quit,
}

/// Everything the chat panel needs to draw itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSnapshot {
    pub is_open: bool,
    pub messages: Vec<Message>,
    pub phase: ChatPhase,
    /// How a message sent mid-reply will be treated.
    pub policy: BusyPolicy,
}

impl Default for ChatSnapshot {
    fn default() -> Self {
        ChatSnapshot {
            is_open: false,
            messages: Vec::new(),
            phase: ChatPhase::Idle,
            policy: BusyPolicy::default(),
        }
    }
}

/// Overview counters shown in the status bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub patients_reviewed: usize,
    pub new_recommendations: usize,
    pub high_risk: usize,
    pub pending_uploads: usize,
}

impl DashboardStats {
    pub fn from_briefing(patients_reviewed: usize, payload: &BriefingPayload) -> Self {
        DashboardStats {
            patients_reviewed,
            new_recommendations: payload.new_recommendations_count,
            high_risk: payload.high_risk_count,
            pending_uploads: payload.pending_uploads_count,
        }
    }
}

/// A patient with everything the detail panel shows about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDetail {
    pub patient: Patient,
    pub plan: Option<TreatmentPlan>,
    pub biomarkers: Biomarkers,
    /// Model analysis behind the plan; absent while there is no plan.
    pub analysis: Option<AiAnalysis>,
    /// The clinician's verdict on the current plan, once given.
    pub decision: Option<DecisionRecord>,
}

impl PatientDetail {
    /// Detail with the review data on file for `patient` and no decision yet.
    pub fn new(patient: Patient, plan: Option<TreatmentPlan>) -> Self {
        let biomarkers = Biomarkers::for_patient(&patient.id);
        let analysis = plan.as_ref().map(|_| AiAnalysis::for_patient(&patient.id));
        PatientDetail {
            patient,
            plan,
            biomarkers,
            analysis,
            decision: None,
        }
    }
}

/// Slide upload and AI test progress for one patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView {
    pub patient_id: String,
    pub file_name: String,
    pub percent: u8,
    pub stage: UploadStage,
}

/// Updates from the app orchestrator to the TUI.
#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Chat(Box<ChatSnapshot>),
    Patients {
        patients: Vec<Patient>,
        stats: DashboardStats,
    },
    PatientDetail(Box<PatientDetail>),
    Upload(UploadView),
    /// Transient informational notice.
    Status(String),
    /// User-visible failure notice.
    Error(String),
}
