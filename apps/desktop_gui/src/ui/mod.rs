//! UI layer for desktop GUI: app shell, form and correlation views.

pub mod app;

pub use app::DiagnosisApp;
