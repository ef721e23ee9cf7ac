//! UI/backend events and error modeling for desktop GUI controller.

use client_core::{PredictionStatus, SlotState, ViewMode};
use shared::domain::CorrelationKind;

pub enum UiEvent {
    Info(String),
    Error(UiError),
    PredictionChanged(PredictionStatus),
    ViewChanged(ViewMode),
    CorrelationSlotChanged { kind: CorrelationKind, state: SlotState },
    CorrelationsSettled,
    CorrelationsReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Transport,
    Configuration,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    CommandQueue,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("invalid server url")
            || message_lower.contains("unsupported scheme")
        {
            UiErrorCategory::Configuration
        } else if message_lower.contains("connection")
            || message_lower.contains("timed out")
            || message_lower.contains("dns")
            || message_lower.contains("unreachable")
            || message_lower.contains("disconnected")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-line hint shown under the error banner.
    pub fn hint(&self) -> Option<&'static str> {
        match self.category {
            UiErrorCategory::Configuration => {
                Some("Set server_url in diagnosis_client.toml or pass --server-url.")
            }
            UiErrorCategory::Transport => Some("Check that the prediction backend is running."),
            UiErrorCategory::Unknown => None,
        }
    }
}
