use thiserror::Error;

/// Error type covering rejected transactions, roster problems and engine defects.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid input ({context}): {message}")]
    InvalidInput { context: String, message: String },
    #[error("Missing total ({context}): provide payer amounts, a split, or a total")]
    MissingTotal { context: String },
    #[error("`{name}` is not a member of the group ({context}){hint}")]
    NotAMember {
        name: String,
        context: String,
        hint: String,
    },
    #[error("Conservation check failed ({context}): {message}")]
    Conservation { context: String, message: String },
    #[error("Invalid group: {0}")]
    InvalidGroup(String),
    #[error("Internal consistency violated: {0}")]
    Integrity(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

impl LedgerError {
    /// True for failures that indicate a defect in the engine rather than bad input.
    pub fn is_internal(&self) -> bool {
        matches!(self, LedgerError::Integrity(_))
    }
}
