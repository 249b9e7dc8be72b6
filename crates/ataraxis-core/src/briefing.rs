// Daily briefing: the summary the dashboard pushes into the chat when the
// clinician asks to be briefed.

use serde::{Deserialize, Serialize};

use crate::records::{Patient, PatientStatus, RiskLevel, TreatmentPlan};

pub const DEFAULT_CLINICIAN: &str = "Dr. Smith";

/// Urgency label that puts a patient on the "urgent attention" line.
pub const URGENT: &str = "High";

const CLOSING_QUESTION: &str = "Would you like me to prioritize these cases for you or provide more details on any specific patient?";

/// One patient with a pending recommendation.
///
/// `urgency` and `recommendation_date` are display labels ("High",
/// "Yesterday", "2025-04-10"), so a payload built elsewhere keeps its wording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationSummary {
    pub id: String,
    pub name: String,
    pub diagnosis: String,
    pub urgency: String,
    pub recommendation_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingPayload {
    pub high_risk_count: usize,
    pub pending_uploads_count: usize,
    pub new_recommendations_count: usize,
    pub patients_with_recommendations: Vec<RecommendationSummary>,
}

impl BriefingPayload {
    /// Summarise the current records.
    ///
    /// Plans whose patient is unknown are skipped. Urgency is the patient's
    /// risk level and the recommendation date is the plan's creation date,
    /// formatted `YYYY-MM-DD`.
    pub fn compile(patients: &[Patient], plans: &[TreatmentPlan]) -> Self {
        let high_risk_count = patients
            .iter()
            .filter(|p| p.risk_level == RiskLevel::High)
            .count();
        let pending_uploads_count = patients
            .iter()
            .filter(|p| p.status == PatientStatus::AwaitingUpload)
            .count();

        let patients_with_recommendations: Vec<RecommendationSummary> = plans
            .iter()
            .filter_map(|plan| {
                let patient = patients.iter().find(|p| p.id == plan.patient_id)?;
                Some(RecommendationSummary {
                    id: patient.id.clone(),
                    name: patient.name.clone(),
                    diagnosis: patient.diagnosis.clone(),
                    urgency: patient.risk_level.to_string(),
                    recommendation_date: plan.created_at.format("%Y-%m-%d").to_string(),
                })
            })
            .collect();

        BriefingPayload {
            high_risk_count,
            pending_uploads_count,
            new_recommendations_count: patients_with_recommendations.len(),
            patients_with_recommendations,
        }
    }

    /// Names of patients whose urgency is exactly `URGENT`, in list order.
    pub fn urgent_names(&self) -> Vec<&str> {
        self.patients_with_recommendations
            .iter()
            .filter(|r| r.urgency == URGENT)
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Render the briefing text. Bullets with a zero count (or no urgent
/// patients) are left out entirely.
pub fn render_briefing(payload: &BriefingPayload, clinician: &str) -> String {
    let mut bullets = Vec::new();
    if payload.new_recommendations_count > 0 {
        bullets.push(format!(
            "• You have {} new AI recommendations awaiting review.",
            payload.new_recommendations_count
        ));
    }
    if payload.high_risk_count > 0 {
        bullets.push(format!(
            "• There are {} high-risk cases that need attention.",
            payload.high_risk_count
        ));
    }
    if payload.pending_uploads_count > 0 {
        bullets.push(format!(
            "• {} patients are awaiting slide uploads.",
            payload.pending_uploads_count
        ));
    }
    let urgent = payload.urgent_names();
    if !urgent.is_empty() {
        bullets.push(format!(
            "• Urgent attention needed for: {}",
            urgent.join(", ")
        ));
    }

    let mut out = format!("Here's your daily briefing, {clinician}:\n\n");
    if !bullets.is_empty() {
        out.push_str(&bullets.join("\n"));
        out.push_str("\n\n");
    }
    out.push_str(CLOSING_QUESTION);
    out
}
