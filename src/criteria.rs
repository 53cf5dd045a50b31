use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::Branch;

pub const PROJECTS_MIN_GOAL: u32 = 2;
pub const FALLBACK_BRANCH: Branch = Branch::Cs;

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub cgpa_min: f64,
    pub dsa_min: u32,
    pub job_focus: String,
}

impl ThresholdRule {
    fn new(cgpa_min: f64, dsa_min: u32, job_focus: &str) -> Self {
        Self {
            cgpa_min,
            dsa_min,
            job_focus: job_focus.to_string(),
        }
    }
}

/// Branch-indexed thresholds. Every branch always has a row, so lookups never fail.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    rules: [ThresholdRule; 4],
    pub projects_min: u32,
    pub fallback: Branch,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            rules: [
                ThresholdRule::new(8.5, 150, "Software Dev, Cloud"),
                ThresholdRule::new(8.0, 150, "Full Stack Dev, Cybersecurity"),
                ThresholdRule::new(7.5, 150, "Embedded Systems, IoT"),
                ThresholdRule::new(7.0, 150, "Telecom Engineer, VLSI"),
            ],
            projects_min: PROJECTS_MIN_GOAL,
            fallback: FALLBACK_BRANCH,
        }
    }
}

impl ThresholdTable {
    pub fn rule(&self, branch: Branch) -> &ThresholdRule {
        &self.rules[branch.index()]
    }

    /// Resolves a raw branch key, using the fallback row for unknown keys.
    pub fn resolve(&self, key: &str) -> (Branch, &ThresholdRule) {
        let branch = Branch::from_key(key).unwrap_or(self.fallback);
        (branch, self.rule(branch))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Branch, &ThresholdRule)> {
        Branch::ALL.into_iter().map(move |branch| (branch, self.rule(branch)))
    }

    pub fn with_overrides(mut self, overrides: &ThresholdOverrides) -> Result<Self, ThresholdError> {
        if let Some(projects_min) = overrides.projects_min {
            self.projects_min = projects_min;
        }
        if let Some(fallback) = overrides.fallback_branch {
            self.fallback = fallback;
        }

        for (branch, patch) in &overrides.branches {
            let rule = &mut self.rules[branch.index()];
            if let Some(cgpa_min) = patch.cgpa_min {
                if !(0.0..=10.0).contains(&cgpa_min) {
                    return Err(ThresholdError::CgpaOutOfRange {
                        branch: *branch,
                        value: cgpa_min,
                    });
                }
                rule.cgpa_min = cgpa_min;
            }
            if let Some(dsa_min) = patch.dsa_min {
                rule.dsa_min = dsa_min;
            }
            if let Some(job_focus) = &patch.job_focus {
                rule.job_focus = job_focus.clone();
            }
        }

        Ok(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdOverrides {
    pub projects_min: Option<u32>,
    pub fallback_branch: Option<Branch>,
    #[serde(default)]
    pub branches: BTreeMap<Branch, RuleOverride>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleOverride {
    pub cgpa_min: Option<f64>,
    pub dsa_min: Option<u32>,
    pub job_focus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("cgpa_min for {branch} must be within 0.0-10.0, got {value}")]
    CgpaOutOfRange { branch: Branch, value: f64 },
}
