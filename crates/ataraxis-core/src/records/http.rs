// REST client for the records backend.
//
// Routes:
//   GET  /patients/              all patients
//   GET  /patients/{id}          one patient, 404 when unknown
//   GET  /treatments/            all plans
//   GET  /treatments/{id}        plan for a patient, 404 when none
//   POST /treatments/            create a plan, echoes the stored plan

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{NewTreatmentPlan, Patient, RecordSource, RecordsError, TreatmentPlan};

pub struct HttpRecords {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRecords {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, RecordsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RecordsError::Client { source })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the body. `Ok(None)` on 404.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, RecordsError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| RecordsError::Transport {
                url: url.clone(),
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode(url, response).await.map(Some)
    }
}

async fn decode<T: DeserializeOwned>(
    url: String,
    response: reqwest::Response,
) -> Result<T, RecordsError> {
    let status = response.status();
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), "records backend returned an error");
        return Err(RecordsError::Status {
            url,
            status: status.as_u16(),
        });
    }
    let body = response
        .text()
        .await
        .map_err(|source| RecordsError::Transport {
            url: url.clone(),
            source,
        })?;
    serde_json::from_str(&body).map_err(|source| RecordsError::Decode { url, source })
}

#[async_trait]
impl RecordSource for HttpRecords {
    async fn list_patients(&self) -> Result<Vec<Patient>, RecordsError> {
        Ok(self.get_json("/patients/").await?.unwrap_or_default())
    }

    async fn get_patient(&self, id: &str) -> Result<Option<Patient>, RecordsError> {
        self.get_json(&format!("/patients/{id}")).await
    }

    async fn list_treatment_plans(&self) -> Result<Vec<TreatmentPlan>, RecordsError> {
        Ok(self.get_json("/treatments/").await?.unwrap_or_default())
    }

    async fn get_treatment_plan(
        &self,
        patient_id: &str,
    ) -> Result<Option<TreatmentPlan>, RecordsError> {
        self.get_json(&format!("/treatments/{patient_id}")).await
    }

    async fn create_treatment_plan(
        &self,
        patient_id: &str,
        plan: NewTreatmentPlan,
    ) -> Result<TreatmentPlan, RecordsError> {
        // The backend stores the body as sent, so the full record is built here.
        let now = Utc::now();
        let body = plan.into_plan(format!("t-{}", now.timestamp_millis()), patient_id, now);

        let url = self.url("/treatments/");
        debug!(%url, patient_id, "POST");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| RecordsError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(url, response).await
    }
}
