// TUI widget modules for each dashboard panel.

pub mod chat;
pub mod patient_detail;
pub mod patient_list;
pub mod prompt;
pub mod quit_confirm;
pub mod status_bar;
