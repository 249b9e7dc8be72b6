// Chat panel widget: conversation log, typing indicator and input line.
//
// The log auto-scrolls so the newest text stays visible while a reply is
// being revealed.

use chrono::Local;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use ataraxis_core::chat::{Message, Sender};

use crate::tui::ViewState;

const INPUT_HEIGHT: u16 = 3;

/// Render the chat panel into the given area.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let streaming = state.is_streaming();
    let title = Line::from(vec![
        Span::styled("AI Assistant", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(" -- ", Style::default().fg(Color::DarkGray)),
        if streaming {
            Span::styled("typing...", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("ready", Style::default().fg(Color::Green))
        },
    ]);

    let sections =
        Layout::vertical([Constraint::Min(1), Constraint::Length(INPUT_HEIGHT)]).split(area);

    let log_block = Block::default().borders(Borders::ALL).title(title);
    let inner = log_block.inner(sections[0]);
    let lines = message_lines(&state.chat.messages, streaming);
    let scroll = auto_scroll(&lines, inner.width, inner.height);

    let log = Paragraph::new(lines)
        .block(log_block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(log, sections[0]);

    render_input(frame, sections[1], state);
}

fn render_input(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (content, border) = if state.input_mode {
        (
            Line::from(vec![
                Span::raw("> "),
                Span::raw(state.input_text.clone()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            ]),
            Style::default().fg(Color::Yellow),
        )
    } else {
        (
            Line::styled(
                "Press i to ask a question",
                Style::default().fg(Color::DarkGray),
            ),
            Style::default(),
        )
    };

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Message"),
    );
    frame.render_widget(paragraph, area);
}

/// Lay the conversation out as display lines: a header per message, its
/// content, then a blank separator.
///
/// The assistant's placeholder shows as a typing indicator until its first
/// character arrives.
pub fn message_lines(messages: &[Message], streaming: bool) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let last = messages.len().saturating_sub(1);

    for (i, message) in messages.iter().enumerate() {
        let (author, color) = match message.sender {
            Sender::User => ("You", Color::Cyan),
            Sender::Assistant => ("Ataraxis AI", Color::Green),
        };
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        lines.push(Line::from(vec![
            Span::styled(
                author,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
        ]));

        if message.content.is_empty() && streaming && i == last {
            lines.push(Line::styled(
                "...",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ));
        } else {
            lines.extend(message.content.split('\n').map(|l| Line::raw(l.to_string())));
        }
        lines.push(Line::raw(""));
    }
    lines
}

/// Scroll offset that keeps the last line in view.
pub fn auto_scroll(lines: &[Line], width: u16, height: u16) -> u16 {
    let total: usize = lines
        .iter()
        .map(|line| {
            let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
            wrapped_rows(&text, width as usize)
        })
        .sum();
    let overflow = total.saturating_sub(height as usize);
    u16::try_from(overflow).unwrap_or(u16::MAX)
}

/// Rows a line occupies under greedy word wrapping at `width` columns.
pub fn wrapped_rows(text: &str, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    let mut rows = 1;
    let mut col = 0;
    for word in text.split(' ') {
        let len = word.chars().count();
        let needed = if col == 0 { len } else { col + 1 + len };
        if needed <= width {
            col = needed;
        } else if len <= width {
            rows += 1;
            col = len;
        } else {
            // Long words are broken across rows.
            if col > 0 {
                rows += 1;
            }
            rows += (len - 1) / width;
            col = len % width;
            if col == 0 {
                col = width;
            }
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
