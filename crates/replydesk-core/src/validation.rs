//! Local input validation.
//!
//! Everything here runs before any network call.

/// Input rejected before reaching the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Message body is empty or whitespace.
    EmptyBody,
    /// Recipient is empty.
    EmptyRecipient,
    /// Recipient is not a well-formed address.
    InvalidRecipient,
    /// The batch selection is already at its bound.
    SelectionFull {
        /// Maximum number of selected messages.
        limit: usize,
    },
    /// Batch generation was requested with nothing selected.
    EmptySelection,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::EmptyBody => "Message body is required".to_string(),
            Self::EmptyRecipient => "Recipient is required".to_string(),
            Self::InvalidRecipient => "Invalid email address format".to_string(),
            Self::SelectionFull { limit } => {
                format!("You can select at most {limit} messages at a time")
            }
            Self::EmptySelection => "Select at least one message".to_string(),
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyBody => "body",
            Self::EmptyRecipient | Self::InvalidRecipient => "to",
            Self::SelectionFull { .. } | Self::EmptySelection => "selection",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ValidationError {}

/// Rejects bodies that are empty after trimming.
///
/// # Errors
///
/// Returns `ValidationError::EmptyBody` for blank content.
pub fn require_body(body: &str) -> Result<(), ValidationError> {
    if body.trim().is_empty() {
        Err(ValidationError::EmptyBody)
    } else {
        Ok(())
    }
}

/// Checks a single recipient address.
///
/// # Errors
///
/// Returns `EmptyRecipient` or `InvalidRecipient`.
pub fn require_recipient(to: &str) -> Result<(), ValidationError> {
    if to.trim().is_empty() {
        Err(ValidationError::EmptyRecipient)
    } else if is_valid_email(to) {
        Ok(())
    } else {
        Err(ValidationError::InvalidRecipient)
    }
}

/// Basic address check: one `@`, non-empty local part, dotted domain.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') || local.contains(char::is_whitespace) {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|part| !part.is_empty())
}
