use serde::{Deserialize, Serialize};

/// Shown when a failed prediction response carries no usable message.
pub const GENERIC_PREDICTION_ERROR: &str = "prediction request failed";

/// Error body the backend attaches to non-2xx prediction responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    /// The backend message, or the generic fallback when absent or blank.
    pub fn into_message(self) -> String {
        self.error
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| GENERIC_PREDICTION_ERROR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_generic_message() {
        let body: ApiErrorBody = serde_json::from_str("{}").expect("decode");
        assert_eq!(body.into_message(), GENERIC_PREDICTION_ERROR);

        let blank = ApiErrorBody::new("   ");
        assert_eq!(blank.into_message(), GENERIC_PREDICTION_ERROR);
    }

    #[test]
    fn keeps_backend_message() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error": "missing field"}"#).expect("decode");
        assert_eq!(body.into_message(), "missing field");
    }
}
