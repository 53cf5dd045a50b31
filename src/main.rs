use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, trace};

mod config;
mod criteria;
mod db;
mod form;
mod guidance;
mod models;
mod report;
mod shell;

use config::AppConfig;
use models::Branch;

#[derive(Parser)]
#[command(name = "placement-tracker")]
#[command(about = "Student placement readiness tracker", long_about = None)]
struct Cli {
    /// Path to a placement-tracker.toml config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo students
    Seed,
    /// Open the interactive login and progress dashboard
    Shell,
    /// Register a new student with zeroed progress
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "CS")]
        branch: String,
        #[arg(long, default_value = "4")]
        year: String,
    },
    /// Print a stored profile
    Show {
        #[arg(long)]
        email: String,
    },
    /// Replace a student's CGPA, DSA count and project count
    Update {
        #[arg(long)]
        email: String,
        #[arg(long, allow_hyphen_values = true)]
        cgpa: String,
        #[arg(long, allow_hyphen_values = true)]
        dsa: String,
        #[arg(long, allow_hyphen_values = true)]
        projects: String,
    },
    /// Evaluate a student against the branch thresholds
    Guidance {
        #[arg(long)]
        email: String,
        /// Print the evaluation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import or refresh profiles from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Generate a markdown readiness report
    Report {
        #[arg(long)]
        branch: Option<Branch>,
        #[arg(long, default_value = "readiness.md")]
        out: PathBuf,
    },
    /// Print the active threshold table
    Thresholds,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter(cli.verbose))
        .with_target(cli.verbose >= 2)
        .with_line_number(cli.verbose >= 3)
        .with_writer(std::io::stderr)
        .init();

    debug!("placement-tracker started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());
    match &config.source {
        Some(path) => debug!(path = %path.display(), "loaded config file"),
        None => debug!("no config file found, using defaults"),
    }

    let pool = db::connect(&config.database_url).await?;
    db::init_db(&pool).await.context("failed to prepare schema")?;
    let table = &config.thresholds;

    match cli.command {
        Commands::InitDb => {
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Shell => {
            let stdin = std::io::stdin();
            let mut shell = shell::Shell::new(&pool, table, stdin.lock(), std::io::stdout());
            shell.run().await?;
        }
        Commands::Register {
            email,
            name,
            branch,
            year,
        } => {
            let student = form::parse_registration(&email, &name, &branch, &year)?;
            let profile = db::register(&pool, &student).await?;
            println!("Registered {} ({}, year {}).", profile.name, student.branch, profile.year);
        }
        Commands::Show { email } => {
            let profile = db::find_by_email(&pool, email.trim())
                .await?
                .with_context(|| format!("no student registered with email {}", email.trim()))?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
        Commands::Update {
            email,
            cgpa,
            dsa,
            projects,
        } => {
            let progress = form::parse_progress(&cgpa, &dsa, &projects)?;
            let profile = db::update_progress(&pool, email.trim(), &progress).await?;
            println!("Progress saved for {}.", profile.name);
            print_guidance(&guidance::evaluate(Some(&profile), table));
        }
        Commands::Guidance { email, json } => {
            let profile = db::find_by_email(&pool, email.trim()).await?;
            let result = guidance::evaluate(profile.as_ref(), table);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                if let Some(profile) = &profile {
                    println!("Student: {}", profile.name);
                }
                print_guidance(&result);
            }
        }
        Commands::Import { csv } => {
            let summary = db::import_csv(&pool, &csv).await?;
            println!(
                "Imported {} profiles from {} ({} invalid rows skipped).",
                summary.upserted,
                csv.display(),
                summary.skipped
            );
        }
        Commands::Report { branch, out } => {
            let profiles = db::list_profiles(&pool).await?;
            let report = report::build_report(branch, chrono::Utc::now(), &profiles, table);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Thresholds => print_thresholds(&config),
    }

    Ok(())
}

fn print_guidance(result: &guidance::Guidance) {
    println!("{}", result.summary);
    for line in result.lines() {
        println!("  {line}");
    }
}

fn print_thresholds(config: &AppConfig) {
    let table = &config.thresholds;
    println!("Branch  CGPA  DSA  Job focus");
    for (branch, rule) in table.iter() {
        println!(
            "{:<6}  {:>4.1}  {:>3}  {}",
            branch.key(),
            rule.cgpa_min,
            rule.dsa_min,
            rule.job_focus
        );
    }
    println!("Projects (all branches): {}", table.projects_min);
    println!("Unknown branches use: {}", table.fallback);
}
