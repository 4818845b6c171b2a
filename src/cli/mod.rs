pub mod analyze;
pub mod diagram;
pub mod metrics;
pub mod report;
pub mod setup;
pub mod ui;
