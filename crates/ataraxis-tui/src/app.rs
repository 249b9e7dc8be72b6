// Application state and orchestration logic.
//
// The central event loop that coordinates reveal events from the assistant's
// typing tasks, slide upload progress, and user commands from the TUI. Owns
// the `Assistant` (and with it the conversation), the cached patient records
// and the clinician's review decisions, and pushes UI updates to the TUI
// render loop.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ataraxis_core::assistant::{Assistant, AssistantError, Submission};
use ataraxis_core::briefing::BriefingPayload;
use ataraxis_core::chat::{RevealEvent, TokioScheduler};
use ataraxis_core::records::{Patient, RecordSource, TreatmentPlan};
use ataraxis_core::review::{
    ai_generated_plan, run_upload, DecisionRecord, ReviewDecision, ReviewError, SlideFile,
    UploadEvent, UploadStage,
};

use crate::protocol::{
    ChatSnapshot, DashboardStats, PatientDetail, UiUpdate, UploadView, UserCommand,
};

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// A slide upload in flight, or finished and awaiting the AI test.
struct UploadJob {
    id: u64,
    patient_id: String,
    file_name: String,
    percent: u8,
    stage: UploadStage,
    cancel: CancellationToken,
}

impl UploadJob {
    fn view(&self) -> UploadView {
        UploadView {
            patient_id: self.patient_id.clone(),
            file_name: self.file_name.clone(),
            percent: self.percent,
            stage: self.stage,
        }
    }
}

/// The complete application state.
pub struct AppState {
    pub assistant: Assistant,
    pub records: Arc<dyn RecordSource>,
    /// Last successfully fetched patient list.
    pub patients: Vec<Patient>,
    /// Last successfully fetched treatment plans.
    pub plans: Vec<TreatmentPlan>,
    /// Accept/override verdicts by patient id, for the current plan.
    pub decisions: HashMap<String, DecisionRecord>,
    upload: Option<UploadJob>,
    last_upload_id: u64,
}

impl AppState {
    pub fn new(assistant: Assistant, records: Arc<dyn RecordSource>) -> Self {
        AppState {
            assistant,
            records,
            patients: Vec::new(),
            plans: Vec::new(),
            decisions: HashMap::new(),
            upload: None,
            last_upload_id: 0,
        }
    }

    pub fn chat_snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            is_open: self.assistant.is_open(),
            messages: self.assistant.messages().to_vec(),
            phase: self.assistant.phase(),
            policy: self.assistant.policy(),
        }
    }

    pub fn briefing(&self) -> BriefingPayload {
        BriefingPayload::compile(&self.patients, &self.plans)
    }

    pub fn stats(&self) -> DashboardStats {
        DashboardStats::from_briefing(self.patients.len(), &self.briefing())
    }

    /// Refresh the cached patients and plans from the record source.
    ///
    /// A failed fetch keeps the previous cache and reports a generic message.
    pub async fn refresh_records(&mut self, ui_tx: &mpsc::Sender<UiUpdate>) {
        match self.records.list_patients().await {
            Ok(patients) => self.patients = patients,
            Err(e) => {
                warn!("failed to fetch patients: {}", e);
                let _ = ui_tx
                    .send(UiUpdate::Error("Failed to fetch patients from API".into()))
                    .await;
            }
        }
        match self.records.list_treatment_plans().await {
            Ok(plans) => self.plans = plans,
            Err(e) => {
                warn!("failed to fetch treatment plans: {}", e);
                let _ = ui_tx
                    .send(UiUpdate::Error(
                        "Failed to fetch treatment plans from API".into(),
                    ))
                    .await;
            }
        }
        info!(
            patients = self.patients.len(),
            plans = self.plans.len(),
            "records refreshed"
        );
        let _ = ui_tx
            .send(UiUpdate::Patients {
                patients: self.patients.clone(),
                stats: self.stats(),
            })
            .await;
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the application event loop until the user quits or the command
/// channel closes.
///
/// Pushes UI updates through `ui_tx` for the TUI render loop.
pub async fn run(
    mut reveal_rx: mpsc::Receiver<RevealEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    state.refresh_records(&ui_tx).await;
    send_chat(&state, &ui_tx).await;

    let (upload_tx, mut upload_rx) = mpsc::channel::<UploadEvent>(32);

    // The assistant keeps a sender, so this only closes if it is dropped.
    let mut reveal_open = true;

    loop {
        tokio::select! {
            // --- Reveal progress ---
            event = reveal_rx.recv(), if reveal_open => {
                match event {
                    Some(event) => {
                        if state.assistant.apply_reveal_event(event) {
                            send_chat(&state, &ui_tx).await;
                        }
                    }
                    None => {
                        info!("Reveal channel closed");
                        reveal_open = false;
                    }
                }
            }

            // --- Slide upload progress ---
            Some(event) = upload_rx.recv() => {
                apply_upload_event(&mut state, event, &ui_tx).await;
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        handle_user_command(&mut state, cmd, &upload_tx, &ui_tx).await;
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    state.assistant.shutdown();
    if let Some(job) = state.upload.take() {
        job.cancel.cancel();
    }
    info!("Application event loop exiting");
    Ok(())
}

async fn send_chat(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Chat(Box::new(state.chat_snapshot())))
        .await;
}

/// Report a refused submission. Blank input is dropped silently.
async fn report_submission_error(err: AssistantError, ui_tx: &mpsc::Sender<UiUpdate>) {
    match err {
        AssistantError::EmptyMessage => debug!("ignoring blank message"),
        AssistantError::Busy => {
            let _ = ui_tx
                .send(UiUpdate::Status(
                    "Still replying. Press Esc to stop the current reply.".into(),
                ))
                .await;
        }
        other => {
            warn!("submission failed: {}", other);
            let _ = ui_tx.send(UiUpdate::Error(other.to_string())).await;
        }
    }
}

async fn report_queued(outcome: Submission, ui_tx: &mpsc::Sender<UiUpdate>) {
    if let Submission::Queued { position } = outcome {
        let _ = ui_tx
            .send(UiUpdate::Status(format!("Queued ({position} waiting)")))
            .await;
    }
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    uploads: &mpsc::Sender<UploadEvent>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::ToggleChat => {
            state.assistant.toggle();
            send_chat(state, ui_tx).await;
        }
        UserCommand::OpenChat => {
            state.assistant.open();
            send_chat(state, ui_tx).await;
        }
        UserCommand::CloseChat => {
            state.assistant.close();
            send_chat(state, ui_tx).await;
        }
        UserCommand::SubmitMessage(text) => {
            match state.assistant.submit_user_text(&text) {
                Ok(outcome) => report_queued(outcome, ui_tx).await,
                Err(e) => report_submission_error(e, ui_tx).await,
            }
            send_chat(state, ui_tx).await;
        }
        UserCommand::BriefMe => {
            info!("Briefing requested");
            state.assistant.open();
            let payload = state.briefing();
            match state.assistant.append_briefing(&payload) {
                Ok(outcome) => report_queued(outcome, ui_tx).await,
                Err(e) => report_submission_error(e, ui_tx).await,
            }
            send_chat(state, ui_tx).await;
        }
        UserCommand::SelectPatient(id) => {
            select_patient(state, &id, ui_tx).await;
        }
        UserCommand::CancelReply => {
            if state.assistant.cancel_reveal() {
                let _ = ui_tx.send(UiUpdate::Status("Reply stopped".into())).await;
                send_chat(state, ui_tx).await;
            }
        }
        UserCommand::UploadSlide { patient_id, path } => {
            start_upload(state, &patient_id, &path, uploads, ui_tx).await;
        }
        UserCommand::RunAiTest(patient_id) => {
            run_ai_test(state, &patient_id, ui_tx).await;
        }
        UserCommand::AcceptRecommendation(patient_id) => {
            record_decision(state, &patient_id, Ok(ReviewDecision::Accepted), ui_tx).await;
        }
        UserCommand::OverrideRecommendation { patient_id, reason } => {
            let decision = ReviewDecision::overridden(&reason);
            record_decision(state, &patient_id, decision, ui_tx).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

async fn send_status(ui_tx: &mpsc::Sender<UiUpdate>, message: &str) {
    let _ = ui_tx.send(UiUpdate::Status(message.to_string())).await;
}

async fn send_error(ui_tx: &mpsc::Sender<UiUpdate>, message: &str) {
    let _ = ui_tx.send(UiUpdate::Error(message.to_string())).await;
}

/// Whether `patient_id` already has a plan. Reports a failed lookup and
/// returns `None`.
async fn has_plan(
    state: &AppState,
    patient_id: &str,
    ui_tx: &mpsc::Sender<UiUpdate>,
) -> Option<bool> {
    match state.records.get_treatment_plan(patient_id).await {
        Ok(plan) => Some(plan.is_some()),
        Err(e) => {
            warn!("failed to fetch treatment plan for {}: {}", patient_id, e);
            send_error(ui_tx, "Failed to fetch treatment plan from API").await;
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Slide upload and AI test
// ---------------------------------------------------------------------------

async fn start_upload(
    state: &mut AppState,
    patient_id: &str,
    path: &str,
    uploads: &mpsc::Sender<UploadEvent>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let slide = match SlideFile::from_path(path) {
        Ok(slide) => slide,
        Err(e) => {
            debug!(path, "rejected slide upload");
            send_error(ui_tx, &e.to_string()).await;
            return;
        }
    };
    match has_plan(state, patient_id, ui_tx).await {
        Some(false) => {}
        Some(true) => {
            send_status(ui_tx, "A treatment plan is already on file").await;
            return;
        }
        None => return,
    }

    // One upload at a time; a new one supersedes the last.
    if let Some(previous) = state.upload.take() {
        previous.cancel.cancel();
    }
    state.last_upload_id += 1;
    let job = UploadJob {
        id: state.last_upload_id,
        patient_id: patient_id.to_string(),
        file_name: slide.file_name,
        percent: 0,
        stage: UploadStage::Uploading,
        cancel: CancellationToken::new(),
    };
    info!(job = job.id, patient_id, file = %job.file_name, "slide upload started");
    tokio::spawn(run_upload(
        job.id,
        Arc::new(TokioScheduler),
        job.cancel.clone(),
        uploads.clone(),
    ));
    let _ = ui_tx.send(UiUpdate::Upload(job.view())).await;
    state.upload = Some(job);
}

async fn apply_upload_event(
    state: &mut AppState,
    event: UploadEvent,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let Some(job) = state.upload.as_mut().filter(|job| job.id == event.job) else {
        debug!(job = event.job, "dropping progress from superseded upload");
        return;
    };
    job.percent = event.percent;
    if event.is_complete() {
        job.stage = UploadStage::Uploaded;
        info!(job = job.id, patient_id = %job.patient_id, "slide upload complete");
    }
    let _ = ui_tx.send(UiUpdate::Upload(job.view())).await;
    if event.is_complete() {
        send_status(ui_tx, "Upload complete").await;
    }
}

async fn set_upload_stage(state: &mut AppState, stage: UploadStage, ui_tx: &mpsc::Sender<UiUpdate>) {
    if let Some(job) = state.upload.as_mut() {
        job.stage = stage;
        let _ = ui_tx.send(UiUpdate::Upload(job.view())).await;
    }
}

/// Ask the model for a plan from the patient's uploaded slide and store it.
async fn run_ai_test(state: &mut AppState, patient_id: &str, ui_tx: &mpsc::Sender<UiUpdate>) {
    let stage = state
        .upload
        .as_ref()
        .filter(|job| job.patient_id == patient_id)
        .map(|job| job.stage);
    match stage {
        Some(UploadStage::Uploaded) => {}
        Some(UploadStage::Uploading) => {
            send_status(ui_tx, "Upload still in progress").await;
            return;
        }
        Some(UploadStage::Analyzing) => return,
        Some(UploadStage::Analyzed) => {
            send_status(ui_tx, "A treatment plan is already on file").await;
            return;
        }
        None => {
            send_error(ui_tx, "Upload a pathology slide first").await;
            return;
        }
    }

    set_upload_stage(state, UploadStage::Analyzing, ui_tx).await;
    info!(patient_id, "running AI test");
    match state
        .records
        .create_treatment_plan(patient_id, ai_generated_plan())
        .await
    {
        Ok(plan) => {
            info!(patient_id, plan_id = %plan.id, "treatment plan generated");
            state.decisions.remove(patient_id);
            set_upload_stage(state, UploadStage::Analyzed, ui_tx).await;
            send_status(ui_tx, "Treatment plan generated").await;
            state.refresh_records(ui_tx).await;
            select_patient(state, patient_id, ui_tx).await;
        }
        Err(e) => {
            warn!("failed to generate treatment plan for {}: {}", patient_id, e);
            set_upload_stage(state, UploadStage::Uploaded, ui_tx).await;
            send_error(ui_tx, "Failed to generate treatment plan. Please try again.").await;
        }
    }
}

// ---------------------------------------------------------------------------
// Review decisions
// ---------------------------------------------------------------------------

async fn record_decision(
    state: &mut AppState,
    patient_id: &str,
    decision: Result<ReviewDecision, ReviewError>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    let decision = match decision {
        Ok(decision) => decision,
        Err(e) => {
            send_error(ui_tx, &e.to_string()).await;
            return;
        }
    };
    match has_plan(state, patient_id, ui_tx).await {
        Some(true) => {}
        Some(false) => {
            send_error(ui_tx, "No treatment plan to review").await;
            return;
        }
        None => return,
    }
    if state.decisions.contains_key(patient_id) {
        send_status(ui_tx, "Recommendation already reviewed").await;
        return;
    }

    let notice = match decision {
        ReviewDecision::Accepted => "Recommendation accepted",
        ReviewDecision::Overridden { .. } => "Recommendation overridden",
    };
    info!(patient_id, "{}", notice);
    state
        .decisions
        .insert(patient_id.to_string(), DecisionRecord::new(decision, Utc::now()));
    send_status(ui_tx, notice).await;
    select_patient(state, patient_id, ui_tx).await;
}

async fn select_patient(state: &AppState, id: &str, ui_tx: &mpsc::Sender<UiUpdate>) {
    let patient = match state.records.get_patient(id).await {
        Ok(Some(patient)) => patient,
        Ok(None) => {
            debug!(id, "patient not found");
            let _ = ui_tx.send(UiUpdate::Error("Patient not found".into())).await;
            return;
        }
        Err(e) => {
            warn!("failed to fetch patient {}: {}", id, e);
            let _ = ui_tx
                .send(UiUpdate::Error(
                    "Failed to fetch patient details from API".into(),
                ))
                .await;
            return;
        }
    };

    let plan = match state.records.get_treatment_plan(id).await {
        Ok(plan) => plan,
        Err(e) => {
            warn!("failed to fetch treatment plan for {}: {}", id, e);
            send_error(ui_tx, "Failed to fetch treatment plan from API").await;
            None
        }
    };

    let mut detail = PatientDetail::new(patient, plan);
    if detail.plan.is_some() {
        detail.decision = state.decisions.get(id).cloned();
    }
    let _ = ui_tx
        .send(UiUpdate::PatientDetail(Box::new(detail)))
        .await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
