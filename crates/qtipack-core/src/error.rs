//! Package generation error types.
//!
//! Every variant aborts the current generation run; a partially valid package is
//! never returned. Errors carry the offending entry location so callers can point
//! the user at the right question or group.

use std::fmt;

use thiserror::Error;

use crate::ident::IdentKind;

/// Position of a question, group or text region in the quiz.
///
/// Indices are zero-based; `Display` renders them one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryLocation {
    /// Index of the top-level entry.
    pub entry: usize,
    /// Index of the question inside a group, if the entry is a group.
    pub member: Option<usize>,
}

impl EntryLocation {
    pub fn entry(entry: usize) -> Self {
        Self {
            entry,
            member: None,
        }
    }

    pub fn member(entry: usize, member: usize) -> Self {
        Self {
            entry,
            member: Some(member),
        }
    }
}

impl fmt::Display for EntryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.member {
            Some(member) => write!(f, "entry {}, group question {}", self.entry + 1, member + 1),
            None => write!(f, "entry {}", self.entry + 1),
        }
    }
}

/// Errors that abort package generation.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Malformed or unscoreable question data.
    #[error("invalid question at {location}: {reason}")]
    InvalidQuestion {
        location: EntryLocation,
        reason: String,
    },

    /// A group's pick-count cannot be satisfied by its members.
    #[error("invalid group at {location}: cannot pick {pick} of {members} question(s)")]
    InvalidGroup {
        location: EntryLocation,
        pick: usize,
        members: usize,
    },

    /// Two entities asked for the same identifier hint (strict mode only).
    #[error("duplicate {kind} identifier hint at {location}: {hint:?}")]
    DuplicateHint {
        location: EntryLocation,
        kind: IdentKind,
        hint: String,
    },

    /// A generated document references something that does not exist, or the
    /// manifest and the document set disagree.
    #[error("integrity violation in {document}: {detail}")]
    Integrity { document: String, detail: String },
}

impl PackageError {
    pub fn invalid_question(location: EntryLocation, reason: impl Into<String>) -> Self {
        PackageError::InvalidQuestion {
            location,
            reason: reason.into(),
        }
    }

    pub fn integrity(document: impl Into<String>, detail: impl Into<String>) -> Self {
        PackageError::Integrity {
            document: document.into(),
            detail: detail.into(),
        }
    }

    /// The quiz location the error refers to, if any.
    pub fn location(&self) -> Option<EntryLocation> {
        match self {
            PackageError::InvalidQuestion { location, .. }
            | PackageError::InvalidGroup { location, .. }
            | PackageError::DuplicateHint { location, .. } => Some(*location),
            _ => None,
        }
    }
}

/// Result alias used throughout the engine.
pub type PackageResult<T> = Result<T, PackageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_display_is_one_based() {
        assert_eq!(EntryLocation::entry(0).to_string(), "entry 1");
        assert_eq!(
            EntryLocation::member(2, 4).to_string(),
            "entry 3, group question 5"
        );
    }

    #[test]
    fn error_messages_carry_context() {
        let err = PackageError::InvalidGroup {
            location: EntryLocation::entry(1),
            pick: 6,
            members: 5,
        };
        assert_eq!(
            err.to_string(),
            "invalid group at entry 2: cannot pick 6 of 5 question(s)"
        );
        assert_eq!(err.location(), Some(EntryLocation::entry(1)));

        let err = PackageError::DuplicateHint {
            location: EntryLocation::member(0, 2),
            kind: IdentKind::Item,
            hint: "Intro".into(),
        };
        assert_eq!(
            err.to_string(),
            "duplicate item identifier hint at entry 1, group question 3: \"Intro\""
        );
        assert_eq!(err.location(), Some(EntryLocation::member(0, 2)));

        let err = PackageError::integrity("imsmanifest.xml", "missing item");
        assert!(err.location().is_none());
        assert!(err.to_string().contains("imsmanifest.xml"));
    }
}
