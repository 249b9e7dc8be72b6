// Hormone receptor and HER2 status per patient.

use serde::{Deserialize, Serialize};

/// Receptor status for one patient. Values are free-form readings such as
/// "Positive (90%)", "Negative", "Pending" or "N/A".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Biomarkers {
    pub er: String,
    pub pr: String,
    pub her2: String,
}

/// How a reading should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerTone {
    Positive,
    Negative,
    Pending,
    Unknown,
}

impl MarkerTone {
    pub fn of(value: &str) -> Self {
        let value = value.to_lowercase();
        if value.contains("positive") {
            MarkerTone::Positive
        } else if value.contains("negative") {
            MarkerTone::Negative
        } else if value.contains("pending") {
            MarkerTone::Pending
        } else {
            MarkerTone::Unknown
        }
    }
}

const READINGS: [(&str, &str, &str, &str); 6] = [
    ("1", "Positive (90%)", "Positive (85%)", "Negative"),
    ("2", "Negative", "Negative", "Positive (3+)"),
    ("3", "Positive (65%)", "Positive (40%)", "Negative"),
    ("4", "N/A", "N/A", "N/A"),
    ("5", "N/A", "N/A", "N/A"),
    ("6", "Pending", "Pending", "Pending"),
];

impl Biomarkers {
    /// Readings on file for `patient_id`; "N/A" throughout when none are.
    pub fn for_patient(patient_id: &str) -> Self {
        let (er, pr, her2) = READINGS
            .iter()
            .find(|(id, ..)| *id == patient_id)
            .map(|&(_, er, pr, her2)| (er, pr, her2))
            .unwrap_or(("N/A", "N/A", "N/A"));
        Biomarkers {
            er: er.to_string(),
            pr: pr.to_string(),
            her2: her2.to_string(),
        }
    }

    /// Labelled readings in display order.
    pub fn rows(&self) -> [(&'static str, &str); 3] {
        [
            ("ER Status", self.er.as_str()),
            ("PR Status", self.pr.as_str()),
            ("HER2 Status", self.her2.as_str()),
        ]
    }
}
