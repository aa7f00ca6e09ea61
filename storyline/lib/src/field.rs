//! Research fields offered for topic discovery.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Instruction sent as the field when no specific field is chosen.
pub const AUTO_SEARCH_INSTRUCTION: &str = "No specific field. Automatically find the hottest, \
most discussed potential topics across the whole US stock market recently, drawing on \
communities such as X (Twitter) and Reddit combined with mainstream financial media.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("A custom field was selected but no field text was given")]
    EmptyCustomField,

    #[error("Unknown field '{0}'. Expected one of: auto, ai, semiconductors, ev, macro")]
    Unknown(String),
}

/// Which area the discovery flow should scout.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Let the model find the hottest US-market topics on its own.
    #[default]
    Auto,
    Ai,
    Semiconductors,
    EvAndNewEnergy,
    /// Interest rates and inflation.
    Macroeconomy,
    /// Free-text field supplied by the user.
    Custom(String),
}

impl FieldSelection {
    /// The predefined choices, in menu order.
    pub const PREDEFINED: [FieldSelection; 5] = [
        FieldSelection::Auto,
        FieldSelection::Ai,
        FieldSelection::Semiconductors,
        FieldSelection::EvAndNewEnergy,
        FieldSelection::Macroeconomy,
    ];

    /// Build a custom selection, rejecting blank text.
    pub fn custom(text: &str) -> Result<Self, FieldError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(FieldError::EmptyCustomField);
        }
        Ok(FieldSelection::Custom(trimmed.to_string()))
    }

    /// The value substituted into the discovery prompt.
    pub fn prompt_value(&self) -> Result<String, FieldError> {
        match self {
            FieldSelection::Auto => Ok(AUTO_SEARCH_INSTRUCTION.to_string()),
            FieldSelection::Custom(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Err(FieldError::EmptyCustomField)
                } else {
                    Ok(trimmed.to_string())
                }
            }
            other => Ok(other.to_string()),
        }
    }
}

impl fmt::Display for FieldSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelection::Auto => f.write_str("Auto-discover trending US stock topics"),
            FieldSelection::Ai => f.write_str("AI"),
            FieldSelection::Semiconductors => f.write_str("Semiconductors"),
            FieldSelection::EvAndNewEnergy => f.write_str("EVs and new energy"),
            FieldSelection::Macroeconomy => f.write_str("Macroeconomy (rates, inflation)"),
            FieldSelection::Custom(text) => f.write_str(text),
        }
    }
}

impl FromStr for FieldSelection {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(FieldSelection::Auto),
            "ai" => Ok(FieldSelection::Ai),
            "semiconductors" | "semis" => Ok(FieldSelection::Semiconductors),
            "ev" | "energy" => Ok(FieldSelection::EvAndNewEnergy),
            "macro" => Ok(FieldSelection::Macroeconomy),
            _ => Err(FieldError::Unknown(s.to_string())),
        }
    }
}
