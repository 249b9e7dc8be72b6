// In-memory record source with the built-in demo data set.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    NewTreatmentPlan, Patient, PatientStatus, RecordSource, RecordsError, RiskLevel, TreatmentPlan,
};

pub struct MockRecords {
    patients: Vec<Patient>,
    /// Plans created at runtime are appended here and live for the process.
    plans: RwLock<Vec<TreatmentPlan>>,
    /// Artificial delay applied to every call.
    latency: Duration,
}

impl MockRecords {
    pub fn new(patients: Vec<Patient>, plans: Vec<TreatmentPlan>) -> Self {
        MockRecords {
            patients,
            plans: RwLock::new(plans),
            latency: Duration::ZERO,
        }
    }

    pub fn builtin() -> Self {
        MockRecords::new(builtin_patients(), builtin_plans())
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl RecordSource for MockRecords {
    async fn list_patients(&self) -> Result<Vec<Patient>, RecordsError> {
        self.simulate_latency().await;
        Ok(self.patients.clone())
    }

    async fn get_patient(&self, id: &str) -> Result<Option<Patient>, RecordsError> {
        self.simulate_latency().await;
        Ok(self.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn list_treatment_plans(&self) -> Result<Vec<TreatmentPlan>, RecordsError> {
        self.simulate_latency().await;
        Ok(self.plans.read().await.clone())
    }

    async fn get_treatment_plan(
        &self,
        patient_id: &str,
    ) -> Result<Option<TreatmentPlan>, RecordsError> {
        self.simulate_latency().await;
        let plans = self.plans.read().await;
        Ok(plans.iter().find(|p| p.patient_id == patient_id).cloned())
    }

    async fn create_treatment_plan(
        &self,
        patient_id: &str,
        plan: NewTreatmentPlan,
    ) -> Result<TreatmentPlan, RecordsError> {
        self.simulate_latency().await;
        let mut plans = self.plans.write().await;
        let id = format!("t{}", plans.len() + 1);
        let created = plan.into_plan(id, patient_id, Utc::now());
        debug!(id = %created.id, patient_id, "created treatment plan");
        plans.push(created.clone());
        Ok(created)
    }
}

// ---------------------------------------------------------------------------
// Built-in data set
// ---------------------------------------------------------------------------

fn patient(
    id: &str,
    name: &str,
    age: u32,
    diagnosis: &str,
    risk_level: RiskLevel,
    status: PatientStatus,
    last_update: &str,
    avatar: &str,
) -> Patient {
    Patient {
        id: id.to_string(),
        name: name.to_string(),
        age,
        diagnosis: diagnosis.to_string(),
        risk_level,
        status,
        last_update: last_update.to_string(),
        avatar: avatar.to_string(),
    }
}

pub fn builtin_patients() -> Vec<Patient> {
    vec![
        patient("1", "Jane Smith", 62, "Breast Cancer Stage II", RiskLevel::Medium, PatientStatus::Stable, "2 days ago", "/contemplative-artist.png"),
        patient("2", "Robert Johnson", 71, "Lung Cancer Stage III", RiskLevel::High, PatientStatus::HighRisk, "Today", "/contemplative-elder.png"),
        patient("3", "Maria Garcia", 54, "Colorectal Cancer Stage I", RiskLevel::Low, PatientStatus::Stable, "1 week ago", "/contemplative-artist.png"),
        patient("4", "David Lee", 67, "Prostate Cancer", RiskLevel::Medium, PatientStatus::AwaitingUpload, "3 days ago", "/thoughtful-urbanite.png"),
        patient("5", "Sarah Williams", 45, "Thyroid Cancer", RiskLevel::Low, PatientStatus::Stable, "5 days ago", "/contemplative-artist.png"),
        patient("6", "Michael Brown", 59, "Melanoma Stage II", RiskLevel::Medium, PatientStatus::NewPatient, "Just now", "/thoughtful-urbanite.png"),
    ]
}

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
        .single()
        .unwrap_or_default()
}

pub fn builtin_plans() -> Vec<TreatmentPlan> {
    let plan = |id: &str, patient_id: &str, recommendation: &str, rationale: &str, confidence, data_points, at| TreatmentPlan {
        id: id.to_string(),
        patient_id: patient_id.to_string(),
        recommendation: recommendation.to_string(),
        rationale: rationale.to_string(),
        confidence,
        data_points,
        created_at: at,
        updated_at: at,
    };
    vec![
        plan(
            "t1",
            "1",
            "Hormone therapy (Tamoxifen) for 5-10 years without adjuvant chemotherapy",
            "Patient has ER+/PR+ breast cancer with low Ki-67 proliferation index, negative lymph nodes, and low genomic recurrence score. Molecular profiling indicates low risk of recurrence with endocrine therapy alone.",
            87,
            1240,
            utc(2025, 4, 10, 14, 32),
        ),
        plan(
            "t2",
            "2",
            "Combination chemotherapy (cisplatin/pemetrexed) followed by immunotherapy maintenance",
            "Patient has stage III non-small cell lung cancer with high PD-L1 expression. Genomic analysis shows no targetable mutations. Recent clinical trials demonstrate survival benefit with this approach.",
            82,
            950,
            utc(2025, 4, 12, 9, 15),
        ),
        plan(
            "t3",
            "3",
            "Surgical resection followed by adjuvant FOLFOX chemotherapy for 3 months",
            "Patient has stage I colorectal cancer with microsatellite stability and low-risk features. Short-course adjuvant therapy is recommended based on recent trials showing non-inferiority to 6-month regimens.",
            91,
            1580,
            utc(2025, 4, 8, 11, 20),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_builtin_patients() {
        let records = MockRecords::builtin();
        let patients = records.list_patients().await.unwrap();
        assert_eq!(patients.len(), 6);
        assert_eq!(patients[1].name, "Robert Johnson");
        assert_eq!(patients[1].risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn get_patient_distinguishes_missing() {
        let records = MockRecords::builtin();
        let found = records.get_patient("3").await.unwrap();
        assert_eq!(found.map(|p| p.name), Some("Maria Garcia".to_string()));
        assert!(records.get_patient("99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn plan_lookup_is_by_patient_id() {
        let records = MockRecords::builtin();
        let plan = records.get_treatment_plan("2").await.unwrap().unwrap();
        assert_eq!(plan.id, "t2");
        assert_eq!(plan.confidence, 82);
        assert!(records.get_treatment_plan("5").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn created_plans_are_kept_in_memory() {
        let records = MockRecords::builtin();
        let created = records
            .create_treatment_plan(
                "5",
                NewTreatmentPlan {
                    recommendation: "Radioactive iodine ablation".to_string(),
                    rationale: "Differentiated thyroid carcinoma".to_string(),
                    confidence: 78,
                    data_points: 640,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.id, "t4");
        assert_eq!(created.patient_id, "5");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = records.get_treatment_plan("5").await.unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(records.list_treatment_plans().await.unwrap().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied() {
        let records = MockRecords::builtin().with_latency(Duration::from_millis(800));
        let start = tokio::time::Instant::now();
        records.list_patients().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[test]
    fn builtin_plan_dates() {
        let plans = builtin_plans();
        assert_eq!(plans[0].created_at.to_rfc3339(), "2025-04-10T14:32:00+00:00");
    }
}
