use habit_model::ValidationError;

pub(crate) const UNEXPECTED_ERROR: &str = "An unexpected error occurred.";

/// A failure reported by the store, already reduced to something a person can read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Transport(String),
    /// The client can't be built. This is a setup bug, so nothing tries to work around it.
    #[error("The store client is not initialized: `{0}` is not set.")]
    NotInitialized(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Caught before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Nobody is signed in.")]
    NoIdentity,
}

impl SyncError {
    /// The text to show the user.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Pull the human-readable part out of an error body, e.g. PostgREST's
/// `{"code": "...", "message": "...", "details": ..., "hint": ...}`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let field = ["message", "error_description", "error", "hint", "details"]
            .into_iter()
            .filter_map(|field| value.get(field).and_then(serde_json::Value::as_str))
            .map(str::trim)
            .find(|text| !text.is_empty());
        if let Some(text) = field {
            return Some(text.to_string());
        }
        if let Some(text) = value.as_str() {
            return Some(text.to_string());
        }
    }

    Some(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_message_wins() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"permission denied for table habits"}"#;
        assert_eq!(
            error_message(body).as_deref(),
            Some("permission denied for table habits")
        );
    }

    #[test]
    fn test_falls_back_through_fields() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","message":"  "}"#).as_deref(),
            Some("invalid_grant")
        );
        assert_eq!(error_message(r#""just a string""#).as_deref(), Some("just a string"));
        assert_eq!(error_message("<html>502</html>").as_deref(), Some("<html>502</html>"));
        assert_eq!(error_message(" \n"), None);
    }

    #[test]
    fn test_sync_error_messages() {
        let err = SyncError::from(StoreError::Transport("offline".to_string()));
        assert_eq!(err.message(), "offline");
        let err = SyncError::from(ValidationError::EmptyName);
        assert_eq!(err.message(), "A habit needs a name.");
    }
}
