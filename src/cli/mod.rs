pub mod report;
pub mod tui;
