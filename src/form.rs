//! Validation for text typed into the registration and progress forms.
//!
//! Nothing here touches the store; a rejected form leaves saved data as it was.

use crate::models::{Branch, NewStudent, ProgressUpdate, UnknownBranch};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{field} must be a number, got '{value}'")]
    NotANumber { field: &'static str, value: String },
    #[error("CGPA must be between 0.0 and 10.0, got {0}")]
    CgpaOutOfRange(f64),
    #[error("{field} cannot be negative, got {value}")]
    NegativeCount { field: &'static str, value: i64 },
    #[error("{field} is too large, got {value}")]
    CountTooLarge { field: &'static str, value: i64 },
    #[error("Enter an email address.")]
    MissingEmail,
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Enter Name for registration.")]
    MissingName,
    #[error(transparent)]
    UnknownBranch(#[from] UnknownBranch),
    #[error("year must be between 1 and 4, got '{0}'")]
    YearOutOfRange(String),
}

pub fn parse_progress(cgpa: &str, dsa_solved: &str, major_projects: &str) -> Result<ProgressUpdate, InputError> {
    let cgpa_value: f64 = cgpa.trim().parse().map_err(|_| InputError::NotANumber {
        field: "CGPA",
        value: cgpa.trim().to_string(),
    })?;
    if !(0.0..=10.0).contains(&cgpa_value) {
        return Err(InputError::CgpaOutOfRange(cgpa_value));
    }

    Ok(ProgressUpdate {
        cgpa: cgpa_value,
        dsa_solved: parse_count("DSA solved", dsa_solved)?,
        major_projects: parse_count("Projects completed", major_projects)?,
    })
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, InputError> {
    let value: i64 = raw.trim().parse().map_err(|_| InputError::NotANumber {
        field,
        value: raw.trim().to_string(),
    })?;
    if value < 0 {
        return Err(InputError::NegativeCount { field, value });
    }
    u32::try_from(value).map_err(|_| InputError::CountTooLarge { field, value })
}

pub fn parse_email(raw: &str) -> Result<String, InputError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(InputError::MissingEmail);
    }
    if !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(InputError::InvalidEmail(email.to_string()));
    }
    Ok(email.to_string())
}

pub fn parse_year(raw: &str) -> Result<u8, InputError> {
    match raw.trim().parse::<u8>() {
        Ok(year @ 1..=4) => Ok(year),
        _ => Err(InputError::YearOutOfRange(raw.trim().to_string())),
    }
}

pub fn parse_registration(email: &str, name: &str, branch: &str, year: &str) -> Result<NewStudent, InputError> {
    let email = parse_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(InputError::MissingName);
    }

    Ok(NewStudent {
        email,
        name: name.to_string(),
        branch: branch.parse::<Branch>()?,
        year: parse_year(year)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_trimmed_progress() {
        let update = parse_progress(" 8.7 ", "162", " 3").unwrap();
        assert_eq!(
            update,
            ProgressUpdate {
                cgpa: 8.7,
                dsa_solved: 162,
                major_projects: 3
            }
        );
    }

    #[test]
    fn accepts_cgpa_bounds() {
        assert!(parse_progress("0", "0", "0").is_ok());
        assert!(parse_progress("10.0", "0", "0").is_ok());
    }

    #[test]
    fn rejects_out_of_range_cgpa() {
        assert_eq!(
            parse_progress("10.5", "10", "1"),
            Err(InputError::CgpaOutOfRange(10.5))
        );
        assert_eq!(
            parse_progress("-0.1", "10", "1"),
            Err(InputError::CgpaOutOfRange(-0.1))
        );
        assert!(matches!(
            parse_progress("NaN", "10", "1"),
            Err(InputError::CgpaOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_negative_and_non_numeric_counts() {
        assert_eq!(
            parse_progress("8.0", "-4", "1"),
            Err(InputError::NegativeCount {
                field: "DSA solved",
                value: -4
            })
        );
        assert_eq!(
            parse_progress("8.0", "40", "two"),
            Err(InputError::NotANumber {
                field: "Projects completed",
                value: "two".to_string()
            })
        );
        assert!(matches!(
            parse_progress("eight", "40", "2"),
            Err(InputError::NotANumber { field: "CGPA", .. })
        ));
    }

    #[test]
    fn rejects_counts_beyond_u32() {
        assert_eq!(
            parse_progress("8", "5000000000", "1"),
            Err(InputError::CountTooLarge {
                field: "DSA solved",
                value: 5_000_000_000
            })
        );
        assert_eq!(
            InputError::CountTooLarge {
                field: "Projects completed",
                value: 4_294_967_296
            }
            .to_string(),
            "Projects completed is too large, got 4294967296"
        );
        assert!(parse_progress("8", "4294967295", "1").is_ok());
    }

    #[test]
    fn registration_requires_name_and_known_branch() {
        assert_eq!(
            parse_registration("neha@vit.edu.in", "  ", "CS", "3"),
            Err(InputError::MissingName)
        );
        assert!(matches!(
            parse_registration("neha@vit.edu.in", "Neha", "MECH", "3"),
            Err(InputError::UnknownBranch(_))
        ));
        assert_eq!(
            parse_registration("neha@vit.edu.in", "Neha", "CS", "5"),
            Err(InputError::YearOutOfRange("5".to_string()))
        );
        assert_eq!(
            parse_registration("neha.vit.edu.in", "Neha", "CS", "3"),
            Err(InputError::InvalidEmail("neha.vit.edu.in".to_string()))
        );

        let student = parse_registration(" neha@vit.edu.in ", "Neha Kulkarni", "extc", "2").unwrap();
        assert_eq!(student.email, "neha@vit.edu.in");
        assert_eq!(student.branch, Branch::Extc);
        assert_eq!(student.year, 2);
    }

    #[test]
    fn error_messages_read_well() {
        assert_eq!(
            InputError::MissingName.to_string(),
            "Enter Name for registration."
        );
        assert_eq!(
            InputError::CgpaOutOfRange(11.0).to_string(),
            "CGPA must be between 0.0 and 10.0, got 11"
        );
    }
}
