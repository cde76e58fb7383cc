use std::collections::BTreeMap;

use crate::csv_import::parser::CsvRecord;
use crate::csv_import::repo_types::NewCsvUser;
use crate::validation::is_valid_email;

/// Checks one parsed record. On failure returns a message per offending field.
pub fn validate_row(record: &CsvRecord) -> Result<NewCsvUser, BTreeMap<String, String>> {
    let mut details = BTreeMap::new();

    let name = field(record, "name");
    if name.is_empty() {
        details.insert("name".to_string(), "name must not be empty".to_string());
    }

    let email = field(record, "email");
    if email.is_empty() {
        details.insert("email".to_string(), "email must not be empty".to_string());
    } else if !is_valid_email(email) {
        details.insert("email".to_string(), "email format is invalid".to_string());
    }

    let age = match parse_age(field(record, "age")) {
        Ok(age) => Some(age),
        Err(msg) => {
            details.insert("age".to_string(), msg.to_string());
            None
        }
    };

    match age {
        Some(age) if details.is_empty() => Ok(NewCsvUser {
            name: name.to_string(),
            email: email.to_string(),
            age,
        }),
        _ => Err(details),
    }
}

fn field<'a>(record: &'a CsvRecord, name: &str) -> &'a str {
    record.get(name).map(String::as_str).unwrap_or_default()
}

/// Accepts any numeric spelling of a positive whole number that fits `i32`,
/// so `7`, `7.0` and `7e0` all read as 7.
fn parse_age(raw: &str) -> Result<i32, &'static str> {
    if raw.is_empty() {
        return Err("age is required");
    }
    let invalid = "age must be a positive integer";
    let value: f64 = raw.parse().map_err(|_| invalid)?;
    if !value.is_finite() || value.fract() != 0.0 || value <= 0.0 || value > i32::MAX as f64 {
        return Err(invalid);
    }
    Ok(value as i32)
}
