use thiserror::Error;

/// Failure kinds of a grammar check.
///
/// Advisories are not errors; they travel with a successful
/// [`crate::checker::CheckResponse`].
#[derive(Debug, Error, PartialEq)]
pub enum CheckError {
    /// The request was rejected before any network call was made.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The LLM endpoint or proxy could not be reached, or answered with a
    /// non-success status.
    #[error("Network error: {0}")]
    Transport(String),

    /// The model refused or stopped abnormally (safety block, no candidates,
    /// unexpected finish reason).
    #[error("Request refused: {0}")]
    UpstreamRefusal(String),

    /// The structured reply contract was violated.
    #[error("Could not decode response: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<CheckError> for String {
    fn from(err: CheckError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_prefix_survives_string_conversion() {
        let msg: String = CheckError::Decode("expected value at line 1".to_string()).into();
        assert_eq!(msg, "Could not decode response: expected value at line 1");

        let msg: String = CheckError::UpstreamRefusal("SAFETY".to_string()).into();
        assert!(msg.starts_with("Request refused"));
    }
}
