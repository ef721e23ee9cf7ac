//! Backend commands queued from UI to backend worker.

use shared::domain::Feature;

pub enum BackendCommand {
    SetField { feature: Feature, raw: String },
    ResetForm,
    Submit,
    ShowForm,
    ShowCorrelations,
    ReloadCorrelations,
}
