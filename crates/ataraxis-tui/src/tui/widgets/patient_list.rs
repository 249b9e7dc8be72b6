// Patient list widget: table of patients with risk and status.
//
// Columns: Name, Age, Diagnosis, Risk, Status, Updated
// The highlighted row follows ViewState::selected.

use ratatui::layout::{Constraint, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Row, Table, TableState};
use ratatui::Frame;

use ataraxis_core::records::{PatientStatus, RiskLevel};

use crate::tui::ViewState;

/// Render the patient table into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Age"),
        Cell::from("Diagnosis"),
        Cell::from("Risk"),
        Cell::from("Status"),
        Cell::from("Updated"),
    ])
    .style(
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = state
        .patients
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(p.name.clone()),
                Cell::from(p.age.to_string()),
                Cell::from(p.diagnosis.clone()),
                Cell::from(p.risk_level.to_string()).style(Style::default().fg(risk_color(p.risk_level))),
                Cell::from(p.status.to_string()).style(Style::default().fg(status_color(p.status))),
                Cell::from(p.last_update.clone()),
            ])
        })
        .collect();

    let widths = [
        Constraint::Min(16),
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(7),
        Constraint::Length(16),
        Constraint::Length(12),
    ];

    let title = format!("Patients ({})", state.patients.len());

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol(">> ");

    let mut table_state = TableState::default();
    if !state.patients.is_empty() {
        table_state.select(Some(state.selected));
    }
    frame.render_stateful_widget(table, area, &mut table_state);
}

pub fn risk_color(risk: RiskLevel) -> Color {
    match risk {
        RiskLevel::Low => Color::Green,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::High => Color::Red,
    }
}

pub fn status_color(status: PatientStatus) -> Color {
    match status {
        PatientStatus::Stable => Color::Green,
        PatientStatus::HighRisk => Color::Red,
        PatientStatus::AwaitingUpload => Color::Yellow,
        PatientStatus::NewPatient => Color::Cyan,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
