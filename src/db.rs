use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::form;
use crate::models::{Branch, ImportSummary, NewStudent, ProgressUpdate, StudentProfile};

const PROFILE_COLUMNS: &str = "id, email, name, branch, year, cgpa, dsa_solved, major_projects, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a student with email {0} is already registered")]
    Duplicate(String),
    #[error("no student registered with email {0}")]
    NotFound(String),
    #[error("stored record is malformed: {0}")]
    Malformed(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Opens the single-connection pool used by every command. The database file
/// is created on first use.
pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid database url '{database_url}'"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database at {database_url}"))?;

    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("student schema ready");
    Ok(())
}

pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let students = vec![
        (
            "aarav.shah@vit.edu.in",
            "Aarav Shah",
            Branch::Cs,
            4,
            ProgressUpdate {
                cgpa: 9.1,
                dsa_solved: 182,
                major_projects: 3,
            },
        ),
        (
            "meera.iyer@vit.edu.in",
            "Meera Iyer",
            Branch::It,
            3,
            ProgressUpdate {
                cgpa: 8.3,
                dsa_solved: 97,
                major_projects: 2,
            },
        ),
        (
            "rohan.deshmukh@vit.edu.in",
            "Rohan Deshmukh",
            Branch::Extc,
            4,
            ProgressUpdate {
                cgpa: 6.8,
                dsa_solved: 64,
                major_projects: 1,
            },
        ),
    ];

    for (email, name, branch, year, progress) in students {
        let student = NewStudent {
            email: email.to_string(),
            name: name.to_string(),
            branch,
            year,
        };
        upsert(pool, &student, &progress).await?;
    }

    Ok(())
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> StoreResult<Option<StudentProfile>> {
    let row = sqlx::query(&format!(
        "SELECT {PROFILE_COLUMNS} FROM students WHERE email = ?"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(profile_from_row).transpose()
}

/// Registers a new student with zeroed progress.
pub async fn register(pool: &SqlitePool, student: &NewStudent) -> StoreResult<StudentProfile> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO students
        (id, email, name, branch, year, cgpa, dsa_solved, major_projects, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0.0, 0, 0, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&student.email)
    .bind(&student.name)
    .bind(student.branch.key())
    .bind(i64::from(student.year))
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            tracing::warn!(email = %student.email, "duplicate registration rejected");
            return Err(StoreError::Duplicate(student.email.clone()));
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(email = %student.email, branch = %student.branch, "student registered");
    find_by_email(pool, &student.email)
        .await?
        .ok_or_else(|| StoreError::NotFound(student.email.clone()))
}

/// Replaces all three progress fields at once.
pub async fn update_progress(
    pool: &SqlitePool,
    email: &str,
    progress: &ProgressUpdate,
) -> StoreResult<StudentProfile> {
    let result = sqlx::query(
        r#"
        UPDATE students
        SET cgpa = ?, dsa_solved = ?, major_projects = ?, updated_at = ?
        WHERE email = ?
        "#,
    )
    .bind(progress.cgpa)
    .bind(i64::from(progress.dsa_solved))
    .bind(i64::from(progress.major_projects))
    .bind(Utc::now().to_rfc3339())
    .bind(email)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(email.to_string()));
    }

    tracing::info!(
        email,
        cgpa = progress.cgpa,
        dsa_solved = progress.dsa_solved,
        major_projects = progress.major_projects,
        "progress updated"
    );
    find_by_email(pool, email)
        .await?
        .ok_or_else(|| StoreError::NotFound(email.to_string()))
}

/// Every stored profile, ordered by name. Branch scoping happens after
/// evaluation so unknown keys land under their fallback branch.
pub async fn list_profiles(pool: &SqlitePool) -> StoreResult<Vec<StudentProfile>> {
    let records = sqlx::query(&format!(
        "SELECT {PROFILE_COLUMNS} FROM students ORDER BY name, email"
    ))
    .fetch_all(pool)
    .await?;
    let mut profiles = Vec::with_capacity(records.len());

    for row in records.iter() {
        profiles.push(profile_from_row(row)?);
    }

    Ok(profiles)
}

/// Upserts profiles from a CSV export. Rows that fail form validation are
/// logged and skipped; the import commits as one transaction.
pub async fn import_csv(pool: &SqlitePool, csv_path: &std::path::Path) -> anyhow::Result<ImportSummary> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        email: String,
        name: String,
        branch: String,
        year: String,
        cgpa: String,
        dsa_solved: String,
        major_projects: String,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("malformed CSV record {}", index + 1))?;
        let parsed = form::parse_registration(&row.email, &row.name, &row.branch, &row.year).and_then(
            |student| {
                form::parse_progress(&row.cgpa, &row.dsa_solved, &row.major_projects)
                    .map(|progress| (student, progress))
            },
        );

        let (student, progress) = match parsed {
            Ok(values) => values,
            Err(err) => {
                tracing::warn!(record = index + 1, email = %row.email, error = %err, "skipping invalid row");
                summary.skipped += 1;
                continue;
            }
        };

        upsert(&mut *tx, &student, &progress).await?;
        summary.upserted += 1;
    }

    tx.commit().await?;
    tracing::info!(upserted = summary.upserted, skipped = summary.skipped, "import finished");
    Ok(summary)
}

async fn upsert<'e, E>(executor: E, student: &NewStudent, progress: &ProgressUpdate) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        r#"
        INSERT INTO students
        (id, email, name, branch, year, cgpa, dsa_solved, major_projects, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT (email) DO UPDATE
        SET name = excluded.name, branch = excluded.branch, year = excluded.year,
            cgpa = excluded.cgpa, dsa_solved = excluded.dsa_solved,
            major_projects = excluded.major_projects, updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&student.email)
    .bind(&student.name)
    .bind(student.branch.key())
    .bind(i64::from(student.year))
    .bind(progress.cgpa)
    .bind(i64::from(progress.dsa_solved))
    .bind(i64::from(progress.major_projects))
    .bind(&now)
    .bind(&now)
    .execute(executor)
    .await?;

    Ok(())
}

fn profile_from_row(row: &SqliteRow) -> StoreResult<StudentProfile> {
    let id: String = row.try_get("id")?;
    let year: i64 = row.try_get("year")?;
    let dsa_solved: i64 = row.try_get("dsa_solved")?;
    let major_projects: i64 = row.try_get("major_projects")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(StudentProfile {
        id: Uuid::parse_str(&id).map_err(|err| StoreError::Malformed(format!("id {id}: {err}")))?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        branch: row.try_get("branch")?,
        year: u8::try_from(year).map_err(|_| StoreError::Malformed(format!("year {year}")))?,
        cgpa: row.try_get("cgpa")?,
        dsa_solved: u32::try_from(dsa_solved)
            .map_err(|_| StoreError::Malformed(format!("dsa_solved {dsa_solved}")))?,
        major_projects: u32::try_from(major_projects)
            .map_err(|_| StoreError::Malformed(format!("major_projects {major_projects}")))?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| StoreError::Malformed(format!("timestamp {value}: {err}")))
}
