//! Input validation for uploaded exports and run parameters.
//!
//! Every problem found is collected so the caller sees all of them at once,
//! each with a short hint on how to fix it.

use std::fmt;

use super::table::Table;

/// Identity key shared by both exports.
pub const COLL_NO: &str = "COLL_NO";
pub const SEAT_NO: &str = "SEAT_NO";
pub const NAME: &str = "NAME";
pub const SEX: &str = "SEX";
pub const RSLT: &str = "RSLT";
pub const FREM: &str = "FREM";
pub const RES: &str = "RES";
pub const CGPA: &str = "CGPA";
pub const GRADE: &str = "GRADE";

pub const REQUIRED_ROSTER_COLUMNS: &[&str] = &[COLL_NO];
pub const REQUIRED_OUTCOME_COLUMNS: &[&str] = &[COLL_NO, SEAT_NO, NAME, SEX, RSLT, FREM, RES];

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xls"];

/// A single validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// The upload or form field that failed validation
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn missing_upload(field: &str, label: &str) -> Self {
        Self::new(field, format!("{label} file is required"))
            .with_suggestion(format!("Attach the {label} export as '{field}'"))
    }

    pub fn missing_parameter(field: &str, label: &str) -> Self {
        Self::new(field, format!("{label} must not be empty"))
    }

    pub fn unsupported_file_type(field: &str, filename: &str) -> Self {
        Self::new(
            field,
            format!("Invalid file type '{filename}'. Only .xlsx or .xls files are allowed"),
        )
        .with_suggestion("Export the sheet from Excel as .xlsx")
    }

    pub fn unreadable_workbook(field: &str, detail: impl fmt::Display) -> Self {
        Self::new(field, format!("Could not read spreadsheet: {detail}"))
    }

    pub fn missing_columns(field: &str, label: &str, columns: &[&str]) -> Self {
        Self::new(
            field,
            format!(
                "{label} file is missing required columns: {}",
                columns.join(", ")
            ),
        )
        .with_suggestion("Check the header row of the first worksheet")
    }

    pub fn missing_narrative_column(field: &str) -> Self {
        Self::new(
            field,
            format!("Result file has neither a {CGPA} nor a {GRADE} column"),
        )
        .with_suggestion("Certificates need one of them to pick the result wording")
    }

    pub fn invalid_semester(value: &str) -> Self {
        Self::new(
            "semester",
            format!("Semester '{value}' is not a number between 1 and 3999"),
        )
        .with_suggestion("Use a plain number, e.g. 6")
    }

    pub fn invalid_image(field: &str, filename: &str) -> Self {
        Self::new(
            field,
            format!("'{filename}' is not a supported image"),
        )
        .with_suggestion("Upload the signature as .png or .jpg")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, ". {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors with formatted output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Numbered, human readable summary.
    pub fn to_message(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        if self.errors.len() == 1 {
            return self.errors[0].to_string();
        }

        let mut parts = vec![format!(
            "Validation failed: {} problems found",
            self.errors.len()
        )];
        for (i, error) in self.errors.iter().enumerate() {
            parts.push(format!("{}. {}", i + 1, error));
        }
        parts.join("\n")
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

impl std::error::Error for ValidationErrors {}

// ============================================================================
// Validation functions
// ============================================================================

/// Validate that an uploaded filename carries a spreadsheet extension.
pub fn validate_spreadsheet_name(filename: &str, field: &str, errors: &mut ValidationErrors) {
    let extension = std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension {
        Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => errors.add(ValidationError::unsupported_file_type(field, filename)),
    }
}

/// Validate that `table` carries every column in `required`.
pub fn validate_columns(
    table: &Table,
    required: &[&str],
    field: &str,
    label: &str,
    errors: &mut ValidationErrors,
) {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|column| !table.has_column(column))
        .collect();

    if !missing.is_empty() {
        errors.add(ValidationError::missing_columns(field, label, &missing));
    }
}

pub fn validate_roster(table: &Table, field: &str, errors: &mut ValidationErrors) {
    validate_columns(table, REQUIRED_ROSTER_COLUMNS, field, "MS6", errors);
}

/// Result exports additionally need one narrative column.
pub fn validate_outcomes(table: &Table, field: &str, errors: &mut ValidationErrors) {
    validate_columns(table, REQUIRED_OUTCOME_COLUMNS, field, "BMS", errors);
    if !table.has_column(CGPA) && !table.has_column(GRADE) {
        errors.add(ValidationError::missing_narrative_column(field));
    }
}

/// Validate that a string is not empty after trimming.
pub fn validate_required(value: &str, field: &str, label: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::missing_parameter(field, label));
    }
}

/// Parse an optional semester; blank means "no semester".
pub fn parse_semester(value: Option<&str>, errors: &mut ValidationErrors) -> Option<u32> {
    let trimmed = value.map(str::trim).filter(|v| !v.is_empty())?;
    match trimmed.parse::<u32>() {
        Ok(n) if (1..=3999).contains(&n) => Some(n),
        _ => {
            errors.add(ValidationError::invalid_semester(trimmed));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::table::Cell;

    #[test]
    fn test_spreadsheet_extension_check() {
        let mut errors = ValidationErrors::new();
        validate_spreadsheet_name("MS6.XLSX", "ms6File", &mut errors);
        validate_spreadsheet_name("bms.xls", "bmsFile", &mut errors);
        assert!(errors.is_empty());

        validate_spreadsheet_name("bms.csv", "bmsFile", &mut errors);
        assert_eq!(errors.len(), 1);
        assert!(errors.to_message().contains("Only .xlsx or .xls"));
    }

    #[test]
    fn test_missing_outcome_columns_are_listed() {
        let table = Table::from_rows(&["COLL_NO", "SEAT_NO"], vec![vec![Cell::Int(1)]]);
        let mut errors = ValidationErrors::new();
        validate_outcomes(&table, "bmsFile", &mut errors);

        let message = errors.to_message();
        assert_eq!(errors.len(), 2);
        assert!(message.contains("NAME, SEX, RSLT, FREM, RES"));
        assert!(message.contains("neither a CGPA nor a GRADE"));
    }

    #[test]
    fn test_parse_semester() {
        let mut errors = ValidationErrors::new();
        assert_eq!(parse_semester(Some(" 6 "), &mut errors), Some(6));
        assert_eq!(parse_semester(Some(""), &mut errors), None);
        assert_eq!(parse_semester(None, &mut errors), None);
        assert!(errors.is_empty());

        assert_eq!(parse_semester(Some("0"), &mut errors), None);
        assert_eq!(parse_semester(Some("six"), &mut errors), None);
        assert_eq!(errors.len(), 2);
    }
}
