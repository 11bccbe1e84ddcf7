use crate::error::{PlanError, Result};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Identifier of a phase: an integer (`03`) or a decimal sub-phase (`03.1`)
/// inserted after its integer parent.
///
/// Ordering is numeric on `(integer, decimal)` with the bare integer first:
/// `02 < 02.1 < 02.2 < 02.10 < 03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId {
    major: u32,
    minor: Option<u32>,
}

impl PhaseId {
    pub fn integer(major: u32) -> Self {
        Self { major, minor: None }
    }

    pub fn decimal(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor: Some(minor),
        }
    }

    pub fn major(self) -> u32 {
        self.major
    }

    pub fn minor(self) -> Option<u32> {
        self.minor
    }

    pub fn is_integer(self) -> bool {
        self.minor.is_none()
    }

    /// The integer phase this id belongs to (itself for integer ids).
    pub fn parent(self) -> PhaseId {
        PhaseId::integer(self.major)
    }

    /// Zero-padded form used in directory and file names: `03`, `03.1`.
    pub fn padded(self) -> String {
        match self.minor {
            Some(minor) => format!("{:02}.{}", self.major, minor),
            None => format!("{:02}", self.major),
        }
    }

    /// Unpadded form used in roadmap prose: `3`, `3.1`.
    pub fn label(self) -> String {
        match self.minor {
            Some(minor) => format!("{}.{}", self.major, minor),
            None => self.major.to_string(),
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.padded())
    }
}

impl FromStr for PhaseId {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PlanError::InvalidPhaseId(s.to_string());
        let digits = |part: &str| -> Result<u32> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        let trimmed = s.trim();
        match trimmed.split_once('.') {
            Some((major, minor)) => Ok(PhaseId::decimal(digits(major)?, digits(minor)?)),
            None => Ok(PhaseId::integer(digits(trimmed)?)),
        }
    }
}

impl Serialize for PhaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.padded())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
