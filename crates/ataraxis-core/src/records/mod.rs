// Patient and treatment-plan records, and the sources the dashboard reads
// them from.
//
// A source is either the built-in in-memory data set (`MockRecords`) or the
// REST backend (`HttpRecords`). Both report "not found" as `Ok(None)` so the
// caller can tell a missing record apart from a failed request.

pub mod http;
pub mod mock;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{RecordSourceKind, RecordsConfig};

pub use http::HttpRecords;
pub use mock::MockRecords;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RecordsError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {source}")]
    Client { source: reqwest::Error },
}

// ---------------------------------------------------------------------------
// Patient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatientStatus {
    Stable,
    #[serde(rename = "High-Risk")]
    HighRisk,
    #[serde(rename = "Awaiting Upload")]
    AwaitingUpload,
    #[serde(rename = "New Patient")]
    NewPatient,
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PatientStatus::Stable => "Stable",
            PatientStatus::HighRisk => "High-Risk",
            PatientStatus::AwaitingUpload => "Awaiting Upload",
            PatientStatus::NewPatient => "New Patient",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    pub name: String,
    pub age: u32,
    pub diagnosis: String,
    pub risk_level: RiskLevel,
    pub status: PatientStatus,
    /// Free-form recency label, e.g. "2 days ago".
    pub last_update: String,
    pub avatar: String,
}

// ---------------------------------------------------------------------------
// Treatment plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    pub id: String,
    pub patient_id: String,
    pub recommendation: String,
    pub rationale: String,
    /// Model confidence, 0-100.
    pub confidence: u8,
    /// Number of reference cases behind the recommendation.
    pub data_points: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied by the caller when creating a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTreatmentPlan {
    pub recommendation: String,
    pub rationale: String,
    pub confidence: u8,
    pub data_points: u32,
}

impl NewTreatmentPlan {
    /// Complete the plan with an id and creation time.
    pub fn into_plan(self, id: String, patient_id: &str, now: DateTime<Utc>) -> TreatmentPlan {
        TreatmentPlan {
            id,
            patient_id: patient_id.to_string(),
            recommendation: self.recommendation,
            rationale: self.rationale,
            confidence: self.confidence,
            data_points: self.data_points,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// RecordSource
// ---------------------------------------------------------------------------

/// Read (and minimal write) access to patient and treatment-plan records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn list_patients(&self) -> Result<Vec<Patient>, RecordsError>;

    async fn get_patient(&self, id: &str) -> Result<Option<Patient>, RecordsError>;

    async fn list_treatment_plans(&self) -> Result<Vec<TreatmentPlan>, RecordsError>;

    /// The plan recommended for `patient_id`, if there is one.
    async fn get_treatment_plan(
        &self,
        patient_id: &str,
    ) -> Result<Option<TreatmentPlan>, RecordsError>;

    async fn create_treatment_plan(
        &self,
        patient_id: &str,
        plan: NewTreatmentPlan,
    ) -> Result<TreatmentPlan, RecordsError>;
}

/// Build the record source selected in the configuration.
pub fn from_config(config: &RecordsConfig) -> Result<Arc<dyn RecordSource>, RecordsError> {
    match config.source {
        RecordSourceKind::Mock => {
            info!(
                latency_ms = config.simulated_latency_ms,
                "using built-in mock records"
            );
            Ok(Arc::new(
                MockRecords::builtin()
                    .with_latency(Duration::from_millis(config.simulated_latency_ms)),
            ))
        }
        RecordSourceKind::Http => {
            info!(base_url = %config.base_url, "using HTTP records backend");
            let client = HttpRecords::new(
                config.base_url.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patient_uses_camel_case_and_display_labels() {
        let json = r#"{
            "id": "4",
            "name": "David Lee",
            "age": 67,
            "diagnosis": "Prostate Cancer",
            "riskLevel": "Medium",
            "status": "Awaiting Upload",
            "lastUpdate": "3 days ago",
            "avatar": "/thoughtful-urbanite.png"
        }"#;
        let patient: Patient = serde_json::from_str(json).unwrap();
        assert_eq!(patient.risk_level, RiskLevel::Medium);
        assert_eq!(patient.status, PatientStatus::AwaitingUpload);
        assert_eq!(patient.last_update, "3 days ago");

        let back = serde_json::to_value(&patient).unwrap();
        assert_eq!(back["status"], "Awaiting Upload");
        assert_eq!(back["riskLevel"], "Medium");
    }

    #[test]
    fn status_display_matches_wire_labels() {
        assert_eq!(PatientStatus::HighRisk.to_string(), "High-Risk");
        assert_eq!(PatientStatus::NewPatient.to_string(), "New Patient");
        assert_eq!(RiskLevel::High.to_string(), "High");
    }

    #[test]
    fn treatment_plan_parses_timestamps() {
        let json = r#"{
            "id": "t2",
            "patientId": "2",
            "recommendation": "Combination chemotherapy",
            "rationale": "Stage III NSCLC",
            "confidence": 82,
            "dataPoints": 950,
            "createdAt": "2025-04-12T09:15:00Z",
            "updatedAt": "2025-04-12T09:15:00Z"
        }"#;
        let plan: TreatmentPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.patient_id, "2");
        assert_eq!(plan.data_points, 950);
        assert_eq!(plan.created_at.format("%Y-%m-%d").to_string(), "2025-04-12");
    }

    #[test]
    fn from_config_builds_each_kind() {
        let mut config = RecordsConfig {
            source: RecordSourceKind::Mock,
            base_url: String::new(),
            simulated_latency_ms: 0,
            request_timeout_secs: 5,
        };
        assert!(from_config(&config).is_ok());

        config.source = RecordSourceKind::Http;
        config.base_url = "http://127.0.0.1:8000".to_string();
        assert!(from_config(&config).is_ok());
    }
}
