use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//
// ─── STRING IDENTIFIERS ────────────────────────────────────────────────────────
//

// Portal identifiers are opaque strings ("ADS", "U1", "Q17"), so every id is a
// transparent newtype over `String`.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new id from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name).to_string(),
                    });
                }
                Ok(Self::new(trimmed))
            }
        }
    };
}

string_id!(
    /// Identifier of a candidate (asesi) sitting the exam.
    CandidateId
);
string_id!(
    /// Identifier of a certification scheme.
    SchemeId
);
string_id!(
    /// Identifier of a competency unit within a scheme.
    UnitId
);
string_id!(
    /// Identifier of a theory question.
    QuestionId
);

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to parse {kind} from string")]
pub struct ParseIdError {
    kind: String,
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_id_display() {
        let id = CandidateId::new("asesi-7");
        assert_eq!(id.to_string(), "asesi-7");
    }

    #[test]
    fn test_scheme_id_from_str_trims() {
        let id: SchemeId = "  ADS ".parse().unwrap();
        assert_eq!(id, SchemeId::new("ADS"));
    }

    #[test]
    fn test_question_id_from_str_rejects_blank() {
        let err = "   ".parse::<QuestionId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse QuestionId from string");
    }

    #[test]
    fn test_unit_id_debug() {
        assert_eq!(format!("{:?}", UnitId::new("U1")), "UnitId(U1)");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&QuestionId::new("Q1")).unwrap();
        assert_eq!(json, "\"Q1\"");
    }
}
