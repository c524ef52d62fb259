//! Intent labels.
//!
//! The runtime only knows a handful of intents by name. Anything else travels
//! through the pipeline as `Intent::Other` so that proposals from unfamiliar
//! providers can still be scored, rejected, and recorded verbatim.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label of what a proposal or decision wants the agent to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Intent {
    /// Ask the user to confirm before acting.
    AskForConfirmation,
    /// Send a reschedule email on the user's behalf.
    SendRescheduleEmail,
    /// Stop the session.
    Abort,
    /// Any intent the runtime has no transition for.
    Other(String),
}

impl Intent {
    /// Returns the wire label of this intent.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AskForConfirmation => "AskForConfirmation",
            Self::SendRescheduleEmail => "SendRescheduleEmail",
            Self::Abort => "Abort",
            Self::Other(label) => label,
        }
    }

    /// Parses a wire label. Unknown labels become `Other`.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "AskForConfirmation" => Self::AskForConfirmation,
            "SendRescheduleEmail" => Self::SendRescheduleEmail,
            "Abort" => Self::Abort,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for Intent {
    fn from(label: String) -> Self {
        match Self::parse(&label) {
            Self::Other(_) => Self::Other(label),
            known => known,
        }
    }
}

impl From<&str> for Intent {
    fn from(label: &str) -> Self {
        Self::parse(label)
    }
}

impl From<Intent> for String {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_parse_to_variants() {
        assert_eq!(Intent::parse("Abort"), Intent::Abort);
        assert_eq!(Intent::parse("AskForConfirmation"), Intent::AskForConfirmation);
        assert_eq!(Intent::parse("SendRescheduleEmail"), Intent::SendRescheduleEmail);
    }

    #[test]
    fn unknown_label_is_preserved() {
        let intent = Intent::from("Snooze".to_string());
        assert_eq!(intent, Intent::Other("Snooze".to_string()));
        assert_eq!(intent.to_string(), "Snooze");
    }

    #[test]
    fn serializes_as_plain_string() {
        let json = serde_json::to_string(&Intent::AskForConfirmation).unwrap();
        assert_eq!(json, "\"AskForConfirmation\"");
        let back: Intent = serde_json::from_str("\"Snooze\"").unwrap();
        assert_eq!(back, Intent::Other("Snooze".to_string()));
    }
}
