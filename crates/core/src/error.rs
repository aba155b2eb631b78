//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Business-rule failure raised by the department crates.
///
/// Storage and transport failures are modelled in `infra`, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Form input the console would reject.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The change would break a rule such as non-negative stock.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate key or a status move the record does not allow.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller lacks the role this rule needs.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Detail text without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::InvariantViolation(m)
            | Self::InvalidId(m)
            | Self::NotFound(m)
            | Self::Conflict(m) => m,
            Self::Unauthorized => "unauthorized",
        }
    }
}

/// Reject blank strings, returning the trimmed value.
pub fn require_text(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

/// Normalise optional free text: trims and maps blank to `None`.
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accept `#RRGGBB` colours, normalised to upper case.
pub fn require_hex_color(field: &str, value: &str) -> DomainResult<String> {
    let v = value.trim();
    let valid = v.len() == 7
        && v.starts_with('#')
        && v[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(DomainError::validation(format!(
            "{field} must be a #RRGGBB colour"
        )));
    }
    Ok(v.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_text_trims_and_rejects_blank() {
        assert_eq!(require_text("title", "  Pump  ").unwrap(), "Pump");
        assert_eq!(
            require_text("title", "   ").unwrap_err(),
            DomainError::validation("title cannot be empty")
        );
    }

    #[test]
    fn optional_text_drops_blank() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" a ".into())), Some("a".into()));
        assert_eq!(optional_text(None), None);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(require_hex_color("color", "#6366f1").unwrap(), "#6366F1");
        assert!(require_hex_color("color", "6366F1").is_err());
        assert!(require_hex_color("color", "#GGGGGG").is_err());
    }
}
