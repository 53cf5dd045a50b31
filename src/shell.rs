//! Line-oriented login/register form and progress dashboard.

use std::io::{BufRead, Write};

use sqlx::SqlitePool;

use crate::criteria::ThresholdTable;
use crate::db::{self, StoreError};
use crate::form;
use crate::guidance;
use crate::models::StudentProfile;

const MENU: &str = "Commands: update, guidance, show, logout, quit";

enum Login {
    Loaded(StudentProfile),
    Retry,
    Exit,
}

pub struct Shell<'a, R, W> {
    pool: &'a SqlitePool,
    table: &'a ThresholdTable,
    input: R,
    output: W,
    current: Option<StudentProfile>,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(pool: &'a SqlitePool, table: &'a ThresholdTable, input: R, output: W) -> Self {
        Self {
            pool,
            table,
            input,
            output,
            current: None,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs until `quit` or end of input. Only I/O failures on the terminal
    /// itself end the loop with an error.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "Placement Readiness Tracker")?;

        loop {
            let Some(profile) = self.current.clone() else {
                match self.login().await? {
                    Login::Loaded(profile) => {
                        tracing::debug!(email = %profile.email, "dashboard opened");
                        self.current = Some(profile);
                        self.render_dashboard()?;
                    }
                    Login::Retry => {}
                    Login::Exit => break,
                }
                continue;
            };

            let Some(command) = self.prompt("dashboard>")? else {
                break;
            };

            match command.to_ascii_lowercase().as_str() {
                "update" | "u" => self.update_progress(&profile).await?,
                "guidance" | "g" => self.render_dashboard()?,
                "show" | "s" => self.show_profile(&profile)?,
                "logout" => {
                    writeln!(self.output, "Logged out {}.", profile.email)?;
                    self.current = None;
                }
                "quit" | "exit" | "q" => break,
                "" => {}
                _ => writeln!(self.output, "{MENU}")?,
            }
        }

        writeln!(self.output, "Goodbye.")?;
        self.output.flush()?;
        Ok(())
    }

    async fn login(&mut self) -> anyhow::Result<Login> {
        let Some(raw_email) = self.prompt("Email:")? else {
            return Ok(Login::Exit);
        };
        let email = match form::parse_email(&raw_email) {
            Ok(email) => email,
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Login::Retry);
            }
        };

        match db::find_by_email(self.pool, &email).await {
            Ok(Some(profile)) => return Ok(Login::Loaded(profile)),
            Ok(None) => {}
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Login::Retry);
            }
        }

        writeln!(self.output, "No profile for {email}, registering a new one.")?;
        let Some(name) = self.prompt("Name:")? else {
            return Ok(Login::Exit);
        };
        let Some(branch) = self.prompt_default("Branch (CS/IT/ECS/EXTC)", "CS")? else {
            return Ok(Login::Exit);
        };
        let Some(year) = self.prompt_default("Year (1-4)", "4")? else {
            return Ok(Login::Exit);
        };

        let student = match form::parse_registration(&email, &name, &branch, &year) {
            Ok(student) => student,
            Err(err) => {
                writeln!(self.output, "Error: {err}")?;
                return Ok(Login::Retry);
            }
        };

        match db::register(self.pool, &student).await {
            Ok(profile) => Ok(Login::Loaded(profile)),
            Err(err) => {
                writeln!(self.output, "Error: Registration failed: {err}")?;
                Ok(Login::Retry)
            }
        }
    }

    async fn update_progress(&mut self, profile: &StudentProfile) -> anyhow::Result<()> {
        let cgpa_default = format!("{:.1}", profile.cgpa);
        let Some(cgpa) = self.prompt_default("CGPA (0.0-10.0)", &cgpa_default)? else {
            return Ok(());
        };
        let dsa_default = profile.dsa_solved.to_string();
        let dsa_goal = format!("DSA Solved (Goal: {})", self.rule_dsa_goal(profile));
        let Some(dsa_solved) = self.prompt_default(&dsa_goal, &dsa_default)? else {
            return Ok(());
        };
        let projects_default = profile.major_projects.to_string();
        let projects_goal = format!("Projects Completed (Goal: {})", self.table.projects_min);
        let Some(major_projects) = self.prompt_default(&projects_goal, &projects_default)? else {
            return Ok(());
        };

        let progress = match form::parse_progress(&cgpa, &dsa_solved, &major_projects) {
            Ok(progress) => progress,
            Err(err) => {
                writeln!(self.output, "Input Error: Invalid input: {err}")?;
                return Ok(());
            }
        };

        match db::update_progress(self.pool, &profile.email, &progress).await {
            Ok(updated) => {
                self.current = Some(updated);
                self.render_dashboard()?;
                writeln!(self.output, "Progress saved and guidance refreshed!")?;
            }
            Err(StoreError::NotFound(email)) => {
                writeln!(self.output, "Error: {email} is no longer registered. Login first.")?;
                self.current = None;
            }
            Err(err) => writeln!(self.output, "Error: {err}")?,
        }

        Ok(())
    }

    fn rule_dsa_goal(&self, profile: &StudentProfile) -> u32 {
        profile
            .branch
            .as_deref()
            .map(|key| self.table.resolve(key).1.dsa_min)
            .unwrap_or_else(|| self.table.rule(self.table.fallback).dsa_min)
    }

    fn render_dashboard(&mut self) -> anyhow::Result<()> {
        let guidance = guidance::evaluate(self.current.as_ref(), self.table);
        if let Some(profile) = &self.current {
            writeln!(self.output, "Student: {}", profile.name)?;
        }
        writeln!(self.output, "{}", guidance.summary)?;
        for line in guidance.lines() {
            writeln!(self.output, "  {line}")?;
        }
        writeln!(self.output, "{MENU}")?;
        Ok(())
    }

    fn show_profile(&mut self, profile: &StudentProfile) -> anyhow::Result<()> {
        writeln!(self.output, "Name:     {}", profile.name)?;
        writeln!(self.output, "Email:    {}", profile.email)?;
        writeln!(
            self.output,
            "Branch:   {}",
            profile.branch.as_deref().unwrap_or("(none)")
        )?;
        writeln!(self.output, "Year:     {}", profile.year)?;
        writeln!(self.output, "CGPA:     {:.1}", profile.cgpa)?;
        writeln!(self.output, "DSA:      {}", profile.dsa_solved)?;
        writeln!(self.output, "Projects: {}", profile.major_projects)?;
        Ok(())
    }

    /// Returns `None` at end of input.
    fn prompt(&mut self, label: &str) -> std::io::Result<Option<String>> {
        write!(self.output, "{label} ")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn prompt_default(&mut self, label: &str, default: &str) -> std::io::Result<Option<String>> {
        let answer = self.prompt(&format!("{label} [{default}]:"))?;
        Ok(answer.map(|value| {
            if value.is_empty() {
                default.to_string()
            } else {
                value
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::memory_pool;
    use crate::models::{Branch, NewStudent};

    async fn run_session(pool: &SqlitePool, script: &str) -> String {
        let table = ThresholdTable::default();
        let mut shell = Shell::new(pool, &table, script.as_bytes(), Vec::new());
        shell.run().await.unwrap();
        String::from_utf8(shell.into_output()).unwrap()
    }

    #[tokio::test]
    async fn registers_then_updates_to_ready() {
        let pool = memory_pool().await;
        let output = run_session(
            &pool,
            "asha@vit.edu.in\nAsha Rao\ncs\n\nupdate\n9.0\n160\n2\nquit\n",
        )
        .await;

        assert!(output.contains("No profile for asha@vit.edu.in, registering a new one."));
        assert!(output.contains("Student: Asha Rao"));
        assert!(output.contains("🚨 NEEDS FOCUS! Check the ❌ areas."));
        assert!(output.contains("❌ CGPA (0.0) is below 8.5."));
        assert!(output.contains("🎉 READY! Start interviews."));
        assert!(output.contains("💡 Suitable Roles: Software Dev, Cloud"));
        assert!(output.contains("Progress saved and guidance refreshed!"));
        assert!(output.ends_with("Goodbye.\n"));

        let stored = db::find_by_email(&pool, "asha@vit.edu.in").await.unwrap().unwrap();
        assert_eq!(stored.branch.as_deref(), Some("CS"));
        assert_eq!(stored.year, 4);
        assert_eq!(stored.dsa_solved, 160);
        assert_eq!(stored.major_projects, 2);
    }

    #[tokio::test]
    async fn invalid_progress_leaves_store_untouched() {
        let pool = memory_pool().await;
        let student = NewStudent {
            email: "vikram@vit.edu.in".to_string(),
            name: "Vikram Rao".to_string(),
            branch: Branch::It,
            year: 3,
        };
        let before = db::register(&pool, &student).await.unwrap();

        let output = run_session(&pool, "vikram@vit.edu.in\nupdate\n11\n40\n1\nupdate\n8\n-2\n1\n").await;

        assert!(!output.contains("registering"));
        assert!(output.contains("Student: Vikram Rao"));
        assert!(output.contains("Input Error: Invalid input: CGPA must be between 0.0 and 10.0, got 11"));
        assert!(output.contains("Input Error: Invalid input: DSA solved cannot be negative, got -2"));
        assert!(!output.contains("Progress saved"));

        let after = db::find_by_email(&pool, "vikram@vit.edu.in").await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn blank_update_fields_keep_current_values() {
        let pool = memory_pool().await;
        let output = run_session(
            &pool,
            "pooja@vit.edu.in\nPooja Kale\nEXTC\n2\nupdate\n7.2\n\n\nshow\nquit\n",
        )
        .await;

        assert!(output.contains("DSA Solved (Goal: 150) [0]:"));
        assert!(output.contains("CGPA:     7.2"));
        let stored = db::find_by_email(&pool, "pooja@vit.edu.in").await.unwrap().unwrap();
        assert_eq!(stored.cgpa, 7.2);
        assert_eq!(stored.dsa_solved, 0);
        assert_eq!(stored.year, 2);
    }

    #[tokio::test]
    async fn registration_errors_restart_the_form() {
        let pool = memory_pool().await;
        let output = run_session(
            &pool,
            "not-an-email\nnew@vit.edu.in\n\nCS\n4\nnew@vit.edu.in\nNew Student\nMECH\n4\n",
        )
        .await;

        assert!(output.contains("Error: 'not-an-email' is not a valid email address"));
        assert!(output.contains("Error: Enter Name for registration."));
        assert!(output.contains("Error: unknown branch 'MECH'"));
        assert!(db::list_profiles(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_returns_to_login_form() {
        let pool = memory_pool().await;
        db::seed(&pool).await.unwrap();

        let output = run_session(
            &pool,
            "aarav.shah@vit.edu.in\nlogout\nrohan.deshmukh@vit.edu.in\nhelp\n",
        )
        .await;

        assert!(output.contains("Student: Aarav Shah"));
        assert!(output.contains("Logged out aarav.shah@vit.edu.in."));
        assert!(output.contains("Student: Rohan Deshmukh"));
        assert!(output.contains("💡 Suitable Roles: Telecom Engineer, VLSI"));
        assert!(output.ends_with("Goodbye.\n"));
    }
}
