// Status bar widget: dashboard counters plus the latest notice.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::DashboardStats;
use crate::tui::ViewState;

/// Render the status bar into the given area.
///
/// Layout: [title] [counters] [error or status notice]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " Ataraxis ",
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(" "));
    spans.extend(stat_spans(&state.stats));

    if let Some((text, color)) = notice(state) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(text.to_string(), Style::default().fg(color)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Counter spans, with high-risk and pending counts colored when non-zero.
pub fn stat_spans(stats: &DashboardStats) -> Vec<Span<'static>> {
    let counters = [
        ("Reviewed", stats.patients_reviewed, Color::White),
        ("New recs", stats.new_recommendations, Color::Cyan),
        ("High risk", stats.high_risk, Color::Red),
        ("Pending uploads", stats.pending_uploads, Color::Yellow),
    ];

    let mut spans = Vec::new();
    for (i, (label, count, color)) in counters.into_iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        }
        let style = if count > 0 {
            Style::default().fg(color)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{label}: {count}"), style));
    }
    spans
}

/// The notice to show, errors taking precedence over status text.
pub fn notice(state: &ViewState) -> Option<(&str, Color)> {
    state
        .error_message
        .as_deref()
        .map(|msg| (msg, Color::Red))
        .or_else(|| state.status_message.as_deref().map(|msg| (msg, Color::Yellow)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
