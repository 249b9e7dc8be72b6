// Model analysis of a case and the clinician's response to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ReviewError;

/// Recurrence estimate and explanation behind an AI recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiAnalysis {
    /// Percentage label, e.g. "18%".
    pub recurrence_risk: String,
    /// Model discrimination, e.g. "C-index: 0.78".
    pub confidence_score: String,
    pub explanation: String,
    pub suggested_treatment: String,
}

/// Severity bucket of a recurrence estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrenceBand {
    /// Below 15%.
    Low,
    /// 15% up to 30%.
    Moderate,
    /// 30% and above.
    Elevated,
    /// The estimate is not a percentage.
    Unknown,
}

const ANALYSES: [(&str, &str, &str, &str, &str); 6] = [
    (
        "1",
        "18%",
        "C-index: 0.78",
        "Low nuclear grade, high TILs, hormone receptor positive",
        "Recommend hormone therapy without chemotherapy",
    ),
    (
        "2",
        "42%",
        "C-index: 0.71",
        "High nuclear grade, low TILs, triple negative",
        "Recommend adjuvant chemotherapy",
    ),
    (
        "3",
        "12%",
        "C-index: 0.82",
        "Low nuclear grade, hormone receptor positive",
        "Recommend hormone therapy only",
    ),
    (
        "4",
        "35%",
        "C-index: 0.75",
        "Intermediate nuclear grade, moderate TILs",
        "Consider adjuvant chemotherapy",
    ),
    (
        "5",
        "8%",
        "C-index: 0.85",
        "Low nuclear grade, high TILs",
        "Recommend active surveillance",
    ),
    (
        "6",
        "27%",
        "C-index: 0.73",
        "Intermediate nuclear grade, moderate TILs",
        "Consider adjuvant therapy",
    ),
];

impl AiAnalysis {
    /// Analysis on file for `patient_id`, or a placeholder asking for a
    /// specialist when the model has nothing.
    pub fn for_patient(patient_id: &str) -> Self {
        let (risk, score, explanation, treatment) = ANALYSES
            .iter()
            .find(|(id, ..)| *id == patient_id)
            .map(|&(_, risk, score, explanation, treatment)| (risk, score, explanation, treatment))
            .unwrap_or((
                "N/A",
                "N/A",
                "Insufficient data for analysis",
                "Consult with specialist",
            ));
        AiAnalysis {
            recurrence_risk: risk.to_string(),
            confidence_score: score.to_string(),
            explanation: explanation.to_string(),
            suggested_treatment: treatment.to_string(),
        }
    }

    pub fn band(&self) -> RecurrenceBand {
        let Some(Ok(percent)) = self
            .recurrence_risk
            .trim()
            .strip_suffix('%')
            .map(|n| n.trim().parse::<f64>())
        else {
            return RecurrenceBand::Unknown;
        };
        if percent < 15.0 {
            RecurrenceBand::Low
        } else if percent < 30.0 {
            RecurrenceBand::Moderate
        } else {
            RecurrenceBand::Elevated
        }
    }
}

/// The clinician's verdict on an AI recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    Accepted,
    Overridden { reason: String },
}

impl ReviewDecision {
    /// An override must carry the clinician's reasoning.
    pub fn overridden(reason: &str) -> Result<Self, ReviewError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReviewError::MissingOverrideReason);
        }
        Ok(ReviewDecision::Overridden {
            reason: reason.to_string(),
        })
    }
}

/// A decision and when it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: ReviewDecision,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(decision: ReviewDecision, decided_at: DateTime<Utc>) -> Self {
        DecisionRecord {
            decision,
            decided_at,
        }
    }

    /// Footer line, e.g. "Recommendation accepted on Apr 10, 2025 at 2:32 PM".
    pub fn summary(&self) -> String {
        let verb = match self.decision {
            ReviewDecision::Accepted => "accepted",
            ReviewDecision::Overridden { .. } => "overridden",
        };
        format!(
            "Recommendation {verb} on {}",
            self.decided_at.format("%b %-d, %Y at %-I:%M %p")
        )
    }
}
