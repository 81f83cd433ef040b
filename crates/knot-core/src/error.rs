/// Error returned when parsing a model enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl ParseEnumError {
    pub(crate) fn new(expected: &'static str, got: &str) -> Self {
        Self {
            expected,
            got: got.to_string(),
        }
    }
}

/// Lower-case and trim user-supplied enum text before matching.
pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}
