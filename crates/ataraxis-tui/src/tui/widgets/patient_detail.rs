// Patient detail widget: demographics, biomarkers, the AI treatment plan and
// its analysis, or the slide upload that will produce one.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use ataraxis_core::records::TreatmentPlan;
use ataraxis_core::review::{
    AiAnalysis, Biomarkers, DecisionRecord, MarkerTone, RecurrenceBand, ReviewDecision,
    UploadStage,
};

use super::patient_list::{risk_color, status_color};
use crate::protocol::{PatientDetail, UploadView};
use crate::tui::ViewState;

const PROGRESS_WIDTH: usize = 20;

/// Render the detail panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (title, lines) = match &state.detail {
        Some(detail) => (
            format!("Patient: {}", detail.patient.name),
            detail_lines(detail, state.upload_for(&detail.patient.id)),
        ),
        None => (
            "Patient".to_string(),
            vec![Line::styled(
                "Select a patient and press Enter to view details.",
                Style::default().fg(Color::DarkGray),
            )],
        ),
    };

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(value.into()),
    ])
}

fn heading(text: &'static str) -> Line<'static> {
    Line::styled(
        text,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}

fn hint(text: impl Into<String>) -> Line<'static> {
    Line::styled(text.into(), Style::default().fg(Color::DarkGray))
}

/// Build the body lines for a patient, its plan, and any upload in flight.
pub fn detail_lines(detail: &PatientDetail, upload: Option<&UploadView>) -> Vec<Line<'static>> {
    let p = &detail.patient;
    let mut lines = vec![
        field("Age", format!("{} years", p.age)),
        field("Diagnosis", p.diagnosis.clone()),
        Line::from(vec![
            Span::styled("Risk: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(p.risk_level.to_string(), Style::default().fg(risk_color(p.risk_level))),
            Span::raw("   "),
            Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(p.status.to_string(), Style::default().fg(status_color(p.status))),
        ]),
        field("Last update", p.last_update.clone()),
        Line::raw(""),
    ];
    lines.extend(biomarker_lines(&detail.biomarkers));
    lines.push(Line::raw(""));

    match &detail.plan {
        Some(plan) => {
            lines.extend(plan_lines(plan));
            if let Some(analysis) = &detail.analysis {
                lines.push(Line::raw(""));
                lines.extend(analysis_lines(analysis, detail.decision.as_ref()));
            }
        }
        None => lines.extend(upload_lines(upload)),
    }
    lines
}

pub fn marker_color(tone: MarkerTone) -> Color {
    match tone {
        MarkerTone::Positive => Color::Green,
        MarkerTone::Negative => Color::Red,
        MarkerTone::Pending => Color::Yellow,
        MarkerTone::Unknown => Color::Gray,
    }
}

fn biomarker_lines(markers: &Biomarkers) -> Vec<Line<'static>> {
    let mut spans = Vec::new();
    for (label, value) in markers.rows() {
        if !spans.is_empty() {
            spans.push(Span::raw("   "));
        }
        spans.push(Span::styled(
            format!("{label}: "),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            value.to_string(),
            Style::default().fg(marker_color(MarkerTone::of(value))),
        ));
    }
    vec![heading("Biomarker Status"), Line::from(spans)]
}

fn plan_lines(plan: &TreatmentPlan) -> Vec<Line<'static>> {
    vec![
        heading("AI Treatment Recommendation"),
        field("Recommendation", plan.recommendation.clone()),
        field("Rationale", plan.rationale.clone()),
        field(
            "Confidence",
            format!("{}% ({} data points)", plan.confidence, plan.data_points),
        ),
        field("Updated", plan.updated_at.format("%Y-%m-%d %H:%M").to_string()),
    ]
}

fn band_color(band: RecurrenceBand) -> Color {
    match band {
        RecurrenceBand::Low => Color::Green,
        RecurrenceBand::Moderate => Color::Yellow,
        RecurrenceBand::Elevated => Color::Red,
        RecurrenceBand::Unknown => Color::Gray,
    }
}

fn analysis_lines(analysis: &AiAnalysis, decision: Option<&DecisionRecord>) -> Vec<Line<'static>> {
    let mut lines = vec![
        heading("AI Analysis Results"),
        Line::from(vec![
            Span::styled("Recurrence risk: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                analysis.recurrence_risk.clone(),
                Style::default()
                    .fg(band_color(analysis.band()))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("   "),
            Span::styled(
                analysis.confidence_score.clone(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        field("Model explanation", analysis.explanation.clone()),
        field("AI-suggested treatment", analysis.suggested_treatment.clone()),
    ];

    match decision {
        Some(record) => {
            let verdict = match &record.decision {
                ReviewDecision::Accepted => Line::styled(
                    "Recommendation Accepted",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
                ReviewDecision::Overridden { reason } => Line::from(vec![
                    Span::styled(
                        "Recommendation Overridden: ",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(reason.clone()),
                ]),
            };
            lines.push(verdict);
            lines.push(hint(record.summary()));
        }
        None => lines.push(hint("Press a to accept or o to override.")),
    }
    lines
}

/// Text progress bar, e.g. `[########            ] 40%`.
pub fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * PROGRESS_WIDTH / 100;
    format!(
        "[{}{}] {percent}%",
        "#".repeat(filled),
        " ".repeat(PROGRESS_WIDTH - filled)
    )
}

fn upload_lines(upload: Option<&UploadView>) -> Vec<Line<'static>> {
    let Some(upload) = upload else {
        return vec![
            Line::styled(
                "No treatment suggestion available yet.",
                Style::default().fg(Color::Gray),
            ),
            hint("Press u to upload a pathology slide for an AI-powered recommendation."),
        ];
    };

    let mut lines = vec![heading("Pathology Slide Upload"), field("Slide", upload.file_name.clone())];
    match upload.stage {
        UploadStage::Uploading => {
            lines.push(Line::raw(format!("Uploading... {}", progress_bar(upload.percent))));
        }
        UploadStage::Uploaded => {
            lines.push(Line::styled(
                "Upload complete.",
                Style::default().fg(Color::Green),
            ));
            lines.push(hint("Press r to run the AI test."));
        }
        UploadStage::Analyzing => {
            lines.push(Line::styled(
                "Processing...",
                Style::default().fg(Color::Yellow),
            ));
        }
        UploadStage::Analyzed => {
            lines.push(hint("Analysis complete. Loading the new treatment plan..."));
        }
    }
    lines
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
