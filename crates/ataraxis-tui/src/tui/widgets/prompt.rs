// Single-line prompt overlay for the slide path and the override reason.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::quit_confirm::centered_rect;
use crate::tui::{Prompt, PromptKind};

const DIALOG_WIDTH: u16 = 64;
const DIALOG_HEIGHT: u16 = 6;

fn title(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::SlidePath => " Upload Pathology Slide ",
        PromptKind::OverrideReason => " Reason for Override ",
    }
}

fn placeholder(kind: PromptKind) -> &'static str {
    match kind {
        PromptKind::SlidePath => "Path to a slide image (PNG, JPG, TIFF)",
        PromptKind::OverrideReason => "Your clinical reasoning for overriding the recommendation",
    }
}

/// Body lines: the typed text (or a placeholder) and the key hints.
pub fn prompt_lines(prompt: &Prompt) -> Vec<Line<'static>> {
    let entry = if prompt.text.is_empty() {
        Line::styled(
            placeholder(prompt.kind),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Line::from(vec![
            Span::raw(prompt.text.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ])
    };
    vec![
        entry,
        Line::raw(""),
        Line::styled(
            "Enter:Confirm  Esc:Cancel",
            Style::default().fg(Color::DarkGray),
        ),
    ]
}

/// Render the prompt centered over the dashboard.
pub fn render(frame: &mut Frame, area: Rect, prompt: &Prompt) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            title(prompt.kind),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let paragraph = Paragraph::new(prompt_lines(prompt))
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}
