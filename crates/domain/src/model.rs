//! Model names.

use pilot_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Non-empty model identifier (`codellama:7b`, `nomic-embed-text`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelName(Box<str>);

impl ModelName {
    /// Parse a model name; surrounding whitespace is removed.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ErrorEnvelope> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("config", "missing_model"),
                "model name must be non-empty",
            ));
        }
        Ok(Self(trimmed.into()))
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_names_are_configuration_errors() {
        let error = ModelName::parse("   ").err();
        assert_eq!(
            error.map(|error| error.code.to_string()),
            Some("config:missing_model".to_owned())
        );
    }

    #[test]
    fn names_are_trimmed() -> Result<(), ErrorEnvelope> {
        assert_eq!(ModelName::parse(" nomic-embed-text ")?.as_str(), "nomic-embed-text");
        Ok(())
    }
}
