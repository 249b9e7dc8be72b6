// Library root: exposes the app loop, the TUI and their shared protocol so
// integration tests can drive them without a terminal.

pub mod app;
pub mod protocol;
pub mod tui;
