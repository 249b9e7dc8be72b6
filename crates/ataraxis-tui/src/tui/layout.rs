// Screen layout: panel arrangement and sizing.
//
// Divides the terminal area into fixed zones for the oncology dashboard:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-------------------------+------------------------+
// | Patient List (45%)       | AI Assistant (40%)     |
// +-------------------------+ (only while the chat   |
// | Patient Detail (55%)     |  panel is open)        |
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// With the chat closed the patient column takes the full width.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: dashboard counters and notices.
    pub status_bar: Rect,
    /// Upper left: patient table.
    pub patient_list: Rect,
    /// Lower left: selected patient and treatment plan.
    pub patient_detail: Rect,
    /// Right column: chat panel, present only while the chat is open.
    pub chat: Option<Rect>,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the dashboard layout from the available terminal area.
pub fn build_layout(area: Rect, chat_open: bool) -> AppLayout {
    // Vertical: status(1) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(10),   // middle section
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let status_bar = vertical[0];
    let middle = vertical[1];
    let help_bar = vertical[2];

    let (patients_column, chat) = if chat_open {
        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(middle);
        (horizontal[0], Some(horizontal[1]))
    } else {
        (middle, None)
    };

    let patient_sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(patients_column);

    AppLayout {
        status_bar,
        patient_list: patient_sections[0],
        patient_detail: patient_sections[1],
        chat,
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// A reasonable terminal size for testing.
    fn test_area() -> Rect {
        Rect::new(0, 0, 160, 50)
    }

    fn all_rects(layout: &AppLayout) -> Vec<(&'static str, Rect)> {
        let mut rects = vec![
            ("status_bar", layout.status_bar),
            ("patient_list", layout.patient_list),
            ("patient_detail", layout.patient_detail),
            ("help_bar", layout.help_bar),
        ];
        if let Some(chat) = layout.chat {
            rects.push(("chat", chat));
        }
        rects
    }

    #[test]
    fn layout_all_rects_nonzero() {
        for chat_open in [false, true] {
            let layout = build_layout(test_area(), chat_open);
            for (name, rect) in all_rects(&layout) {
                assert!(
                    rect.width > 0 && rect.height > 0,
                    "{} has zero area: {:?}",
                    name,
                    rect
                );
            }
        }
    }

    #[test]
    fn layout_bars_are_one_row() {
        let layout = build_layout(test_area(), true);
        assert_eq!(layout.status_bar.height, 1, "Status bar should be exactly 1 row");
        assert_eq!(layout.help_bar.height, 1, "Help bar should be exactly 1 row");
    }

    #[test]
    fn layout_chat_only_when_open() {
        assert!(build_layout(test_area(), false).chat.is_none());
        assert!(build_layout(test_area(), true).chat.is_some());
    }

    #[test]
    fn layout_closed_chat_gives_patients_full_width() {
        let layout = build_layout(test_area(), false);
        assert_eq!(layout.patient_list.width, test_area().width);
        assert_eq!(layout.patient_detail.width, test_area().width);
    }

    #[test]
    fn layout_chat_sits_right_of_patients() {
        let layout = build_layout(test_area(), true);
        let chat = layout.chat.unwrap();
        assert!(chat.x >= layout.patient_list.x + layout.patient_list.width);
        assert!(layout.patient_list.width > chat.width);
    }

    #[test]
    fn layout_list_above_detail() {
        let layout = build_layout(test_area(), true);
        assert!(layout.patient_list.y < layout.patient_detail.y);
        assert_eq!(layout.patient_list.width, layout.patient_detail.width);
    }

    #[test]
    fn layout_fits_within_area() {
        let area = test_area();
        let layout = build_layout(area, true);
        for (name, rect) in all_rects(&layout) {
            assert!(
                rect.x + rect.width <= area.width,
                "{} {:?} exceeds area width {}",
                name,
                rect,
                area.width
            );
            assert!(
                rect.y + rect.height <= area.height,
                "{} {:?} exceeds area height {}",
                name,
                rect,
                area.height
            );
        }
    }

    #[test]
    fn layout_small_terminal_still_valid() {
        let area = Rect::new(0, 0, 40, 16);
        let layout = build_layout(area, true);
        for (name, rect) in all_rects(&layout) {
            assert!(
                rect.width > 0 && rect.height > 0,
                "Small terminal: {} {:?} has zero area",
                name,
                rect
            );
        }
    }
}
