use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::criteria::ThresholdTable;
use crate::guidance::{self, Criterion, Guidance, Verdict};
use crate::models::{Branch, StudentProfile};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessTally {
    pub ready: usize,
    pub needs_focus: usize,
    pub incomplete: usize,
}

impl ReadinessTally {
    fn record(&mut self, guidance: &Guidance) {
        match guidance.verdict {
            Some(Verdict::Ready) => self.ready += 1,
            Some(Verdict::NeedsFocus) => self.needs_focus += 1,
            None => self.incomplete += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ready + self.needs_focus + self.incomplete
    }
}

/// Overall and per-branch tallies. Profiles with an unknown branch count
/// under the branch whose thresholds they were evaluated against.
pub fn tally_by_branch(
    evaluated: &[(&StudentProfile, Guidance)],
) -> (ReadinessTally, BTreeMap<Branch, ReadinessTally>) {
    let mut overall = ReadinessTally::default();
    let mut by_branch: BTreeMap<Branch, ReadinessTally> = BTreeMap::new();

    for (_, guidance) in evaluated {
        overall.record(guidance);
        if let Some(branch) = guidance.branch {
            by_branch.entry(branch).or_default().record(guidance);
        }
    }

    (overall, by_branch)
}

pub fn gap_counts(evaluated: &[(&StudentProfile, Guidance)]) -> Vec<(Criterion, usize)> {
    let mut counts: BTreeMap<Criterion, usize> = BTreeMap::new();
    for (_, guidance) in evaluated {
        for criterion in guidance.failing() {
            *counts.entry(criterion).or_insert(0) += 1;
        }
    }

    let mut values: Vec<(Criterion, usize)> = counts.into_iter().collect();
    values.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    values
}

/// Renders the markdown report. With a branch filter, profiles are kept by
/// the branch whose thresholds they were evaluated against, so an unknown
/// stored key counts under the fallback branch in both views.
pub fn build_report(
    branch: Option<Branch>,
    generated_at: DateTime<Utc>,
    profiles: &[StudentProfile],
    table: &ThresholdTable,
) -> String {
    let evaluated: Vec<(&StudentProfile, Guidance)> = profiles
        .iter()
        .map(|profile| (profile, guidance::evaluate(Some(profile), table)))
        .filter(|(_, guidance)| branch.is_none() || guidance.branch == branch)
        .collect();
    let (overall, by_branch) = tally_by_branch(&evaluated);
    let gaps = gap_counts(&evaluated);

    let mut output = String::new();
    let scope = branch.map(|b| b.key()).unwrap_or("all branches");

    let _ = writeln!(output, "# Placement Readiness Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");

    if overall.total() == 0 {
        let _ = writeln!(output, "No students registered.");
        return output;
    }

    let _ = writeln!(output, "- Students: {}", overall.total());
    let _ = writeln!(output, "- Ready: {}", overall.ready);
    let _ = writeln!(output, "- Needs focus: {}", overall.needs_focus);
    if overall.incomplete > 0 {
        let _ = writeln!(output, "- Incomplete profiles: {}", overall.incomplete);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Branch");
    for (key, tally) in by_branch.iter() {
        let rule = table.rule(*key);
        let _ = writeln!(
            output,
            "- {}: {} of {} ready (CGPA {:.1}+, DSA {}+)",
            key,
            tally.ready,
            tally.total(),
            rule.cgpa_min,
            rule.dsa_min
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Most Common Gaps");
    if gaps.is_empty() {
        let _ = writeln!(output, "Every student meets every threshold.");
    } else {
        for (criterion, count) in gaps.iter() {
            let _ = writeln!(output, "- {}: {} students", criterion.label(), count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");
    for (profile, guidance) in evaluated.iter() {
        let verdict = guidance.verdict.map(Verdict::label).unwrap_or("incomplete");
        let _ = writeln!(
            output,
            "- {} ({}, {}, year {}): {} (CGPA {:.1}, DSA {}, projects {})",
            profile.name,
            profile.email,
            profile.branch.as_deref().unwrap_or("no branch"),
            profile.year,
            verdict,
            profile.cgpa,
            profile.dsa_solved,
            profile.major_projects
        );
    }

    output
}
