// Clinical review of a single patient: biomarker readings, the model's
// analysis of a case, the clinician's accept/override decision, and the
// simulated pathology slide upload that produces a new treatment plan.

pub mod analysis;
pub mod biomarkers;
pub mod upload;

use thiserror::Error;

pub use analysis::{AiAnalysis, DecisionRecord, RecurrenceBand, ReviewDecision};
pub use biomarkers::{Biomarkers, MarkerTone};
pub use upload::{ai_generated_plan, run_upload, SlideFile, UploadEvent, UploadStage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("Please provide a reason for overriding the recommendation")]
    MissingOverrideReason,

    #[error("Please upload an image file")]
    NotAnImage { path: String },
}
