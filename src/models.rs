use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "CS")]
    Cs,
    #[serde(rename = "IT")]
    It,
    #[serde(rename = "ECS")]
    Ecs,
    #[serde(rename = "EXTC")]
    Extc,
}

impl Branch {
    pub const ALL: [Branch; 4] = [Branch::Cs, Branch::It, Branch::Ecs, Branch::Extc];

    pub fn key(self) -> &'static str {
        match self {
            Branch::Cs => "CS",
            Branch::It => "IT",
            Branch::Ecs => "ECS",
            Branch::Extc => "EXTC",
        }
    }

    /// Resolves a stored or typed branch key, ignoring case and surrounding whitespace.
    pub fn from_key(key: &str) -> Option<Branch> {
        let key = key.trim();
        Branch::ALL
            .into_iter()
            .find(|branch| branch.key().eq_ignore_ascii_case(key))
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown branch '{0}' (expected one of CS, IT, ECS, EXTC)")]
pub struct UnknownBranch(pub String);

impl FromStr for Branch {
    type Err = UnknownBranch;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Branch::from_key(value).ok_or_else(|| UnknownBranch(value.trim().to_string()))
    }
}

/// One stored student record.
///
/// `branch` is kept as the raw stored text: rows written by older tools or
/// imported by hand may carry no branch or an unknown one, and evaluation
/// decides what to do with that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub branch: Option<String>,
    pub year: u8,
    pub cgpa: f64,
    pub dsa_solved: u32,
    pub major_projects: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub email: String,
    pub name: String,
    pub branch: Branch,
    pub year: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub cgpa: f64,
    pub dsa_solved: u32,
    pub major_projects: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub upserted: usize,
    pub skipped: usize,
}
