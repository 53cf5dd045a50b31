use serde::Serialize;

use crate::criteria::ThresholdTable;
use crate::models::{Branch, StudentProfile};

pub const INCOMPLETE_PROFILE: &str = "Please complete your profile.";
const READY_SUMMARY: &str = "🎉 READY! Start interviews.";
const NEEDS_FOCUS_SUMMARY: &str = "🚨 NEEDS FOCUS! Check the ❌ areas.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Ready,
    NeedsFocus,
}

impl Verdict {
    pub fn summary(self) -> &'static str {
        match self {
            Verdict::Ready => READY_SUMMARY,
            Verdict::NeedsFocus => NEEDS_FOCUS_SUMMARY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Ready => "ready",
            Verdict::NeedsFocus => "needs focus",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Cgpa,
    DsaPractice,
    Projects,
}

impl Criterion {
    pub fn label(self) -> &'static str {
        match self {
            Criterion::Cgpa => "CGPA",
            Criterion::DsaPractice => "DSA practice",
            Criterion::Projects => "Major projects",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    pub criterion: Criterion,
    pub passed: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guidance {
    /// `None` when the profile was missing or incomplete.
    pub verdict: Option<Verdict>,
    pub summary: String,
    /// Branch whose thresholds were applied, after fallback.
    pub branch: Option<Branch>,
    pub checks: Vec<CheckResult>,
    pub recommendation: Option<String>,
}

impl Guidance {
    fn incomplete() -> Self {
        Self {
            verdict: None,
            summary: INCOMPLETE_PROFILE.to_string(),
            branch: None,
            checks: Vec::new(),
            recommendation: None,
        }
    }

    /// Check messages in fixed order, followed by the role recommendation.
    pub fn lines(&self) -> Vec<&str> {
        self.checks
            .iter()
            .map(|check| check.message.as_str())
            .chain(self.recommendation.as_deref())
            .collect()
    }

    pub fn failing(&self) -> impl Iterator<Item = Criterion> + '_ {
        self.checks
            .iter()
            .filter(|check| !check.passed)
            .map(|check| check.criterion)
    }
}

pub fn evaluate(profile: Option<&StudentProfile>, table: &ThresholdTable) -> Guidance {
    let Some(profile) = profile else {
        return Guidance::incomplete();
    };
    let Some(branch_key) = profile.branch.as_deref() else {
        return Guidance::incomplete();
    };

    let (branch, rule) = table.resolve(branch_key);

    let cgpa = if profile.cgpa < rule.cgpa_min {
        CheckResult {
            criterion: Criterion::Cgpa,
            passed: false,
            message: format!(
                "❌ CGPA ({:.1}) is below {:.1}.",
                profile.cgpa, rule.cgpa_min
            ),
        }
    } else {
        CheckResult {
            criterion: Criterion::Cgpa,
            passed: true,
            message: "✅ CGPA is strong.".to_string(),
        }
    };

    let practice = if profile.dsa_solved < rule.dsa_min {
        CheckResult {
            criterion: Criterion::DsaPractice,
            passed: false,
            message: format!(
                "❌ DSA ({}) is below the new goal of {}. Practice daily!",
                profile.dsa_solved, rule.dsa_min
            ),
        }
    } else {
        CheckResult {
            criterion: Criterion::DsaPractice,
            passed: true,
            message: "✅ DSA practice is good.".to_string(),
        }
    };

    let projects = if profile.major_projects < table.projects_min {
        CheckResult {
            criterion: Criterion::Projects,
            passed: false,
            message: format!(
                "⚠️ Need at least {} major projects. Build one now.",
                table.projects_min
            ),
        }
    } else {
        CheckResult {
            criterion: Criterion::Projects,
            passed: true,
            message: "✅ Projects portfolio is solid.".to_string(),
        }
    };

    let checks = vec![cgpa, practice, projects];
    let verdict = if checks.iter().all(|check| check.passed) {
        Verdict::Ready
    } else {
        Verdict::NeedsFocus
    };

    Guidance {
        verdict: Some(verdict),
        summary: verdict.summary().to_string(),
        branch: Some(branch),
        checks,
        recommendation: Some(format!("💡 Suitable Roles: {}", rule.job_focus)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn profile(branch: &str, cgpa: f64, dsa_solved: u32, major_projects: u32) -> StudentProfile {
        StudentProfile {
            id: Uuid::new_v4(),
            email: "asha.rao@vit.edu.in".to_string(),
            name: "Asha Rao".to_string(),
            branch: Some(branch.to_string()),
            year: 4,
            cgpa,
            dsa_solved,
            major_projects,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn passed(guidance: &Guidance) -> Vec<bool> {
        guidance.checks.iter().map(|check| check.passed).collect()
    }

    #[test]
    fn strong_cs_profile_is_ready() {
        let table = ThresholdTable::default();
        let guidance = evaluate(Some(&profile("CS", 9.0, 160, 2)), &table);

        assert_eq!(guidance.verdict, Some(Verdict::Ready));
        assert_eq!(guidance.summary, "🎉 READY! Start interviews.");
        assert_eq!(
            guidance.lines(),
            vec![
                "✅ CGPA is strong.",
                "✅ DSA practice is good.",
                "✅ Projects portfolio is solid.",
                "💡 Suitable Roles: Software Dev, Cloud",
            ]
        );
    }

    #[test]
    fn weak_extc_profile_fails_every_check_in_order() {
        let table = ThresholdTable::default();
        let guidance = evaluate(Some(&profile("EXTC", 6.0, 100, 0)), &table);

        assert_eq!(guidance.verdict, Some(Verdict::NeedsFocus));
        assert_eq!(guidance.summary, "🚨 NEEDS FOCUS! Check the ❌ areas.");
        assert_eq!(
            guidance.lines(),
            vec![
                "❌ CGPA (6.0) is below 7.0.",
                "❌ DSA (100) is below the new goal of 150. Practice daily!",
                "⚠️ Need at least 2 major projects. Build one now.",
                "💡 Suitable Roles: Telecom Engineer, VLSI",
            ]
        );
    }

    #[test]
    fn each_field_fails_independently() {
        let table = ThresholdTable::default();

        let low_cgpa = evaluate(Some(&profile("IT", 7.9, 150, 2)), &table);
        assert_eq!(passed(&low_cgpa), vec![false, true, true]);
        assert_eq!(low_cgpa.verdict, Some(Verdict::NeedsFocus));

        let low_dsa = evaluate(Some(&profile("IT", 8.0, 149, 2)), &table);
        assert_eq!(passed(&low_dsa), vec![true, false, true]);
        assert_eq!(low_dsa.verdict, Some(Verdict::NeedsFocus));

        let low_projects = evaluate(Some(&profile("IT", 8.0, 150, 1)), &table);
        assert_eq!(passed(&low_projects), vec![true, true, false]);
        assert_eq!(low_projects.failing().collect::<Vec<_>>(), vec![Criterion::Projects]);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let table = ThresholdTable::default();
        let guidance = evaluate(Some(&profile("ECS", 7.5, 150, 2)), &table);
        assert_eq!(guidance.verdict, Some(Verdict::Ready));
    }

    #[test]
    fn unknown_branch_uses_fallback_thresholds() {
        let table = ThresholdTable::default();
        let unknown = evaluate(Some(&profile("MECH", 8.2, 160, 2)), &table);
        let cs = evaluate(Some(&profile("CS", 8.2, 160, 2)), &table);

        assert_eq!(unknown.branch, Some(Branch::Cs));
        assert_eq!(unknown.checks, cs.checks);
        assert_eq!(unknown.recommendation, cs.recommendation);
        assert_eq!(unknown.verdict, Some(Verdict::NeedsFocus));
    }

    #[test]
    fn missing_profile_or_branch_asks_for_completion() {
        let table = ThresholdTable::default();

        let missing = evaluate(None, &table);
        assert_eq!(missing.summary, INCOMPLETE_PROFILE);
        assert!(missing.checks.is_empty());
        assert!(missing.lines().is_empty());
        assert_eq!(missing.verdict, None);

        let mut no_branch = profile("CS", 9.5, 300, 4);
        no_branch.branch = None;
        let guidance = evaluate(Some(&no_branch), &table);
        assert_eq!(guidance, missing);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let table = ThresholdTable::default();
        let student = profile("IT", 8.4, 120, 3);
        assert_eq!(evaluate(Some(&student), &table), evaluate(Some(&student), &table));
    }

    #[test]
    fn serializes_for_json_output() {
        let table = ThresholdTable::default();
        let guidance = evaluate(Some(&profile("CS", 9.0, 160, 2)), &table);
        let value = serde_json::to_value(&guidance).unwrap();

        assert_eq!(value["verdict"], "ready");
        assert_eq!(value["branch"], "CS");
        assert_eq!(value["checks"][1]["criterion"], "dsa_practice");
    }
}
