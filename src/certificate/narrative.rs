//! Certificate wording.

use chrono::{Local, NaiveDate};

use super::roman::to_roman;
use super::RenderError;
use crate::dataset::{EligibleRecord, Gender, NarrativeVariant};

pub const HELD_BY: &str = "held by the University of Mumbai in the month of";
pub const DIRECTOR: &str = "DIRECTOR";
pub const BOARD: &str = "BOARD OF EXAMINATIONS & EVALUATION";
pub const FEMALE_MARKER: &str = "/ - FEMALE";
pub const NOT_AVAILABLE: &str = "N/A";

/// Run-wide parameters of the certificate wording.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeContext {
    /// Examination session, e.g. `MAY 2024`.
    pub year: String,
    pub course_name: String,
    pub semester: Option<u32>,
    pub issue_date: NaiveDate,
}

impl NarrativeContext {
    pub fn new(year: impl Into<String>, course_name: impl Into<String>) -> Self {
        Self {
            year: year.into().trim().to_string(),
            course_name: course_name.into().trim().to_string(),
            semester: None,
            issue_date: Local::now().date_naive(),
        }
    }

    pub fn with_semester(mut self, semester: Option<u32>) -> Self {
        self.semester = semester;
        self
    }

    pub fn with_issue_date(mut self, issue_date: NaiveDate) -> Self {
        self.issue_date = issue_date;
        self
    }

    /// `(SEM VI) ` fragment, empty when the run has no semester.
    fn semester_fragment(&self, has_semester: bool) -> Result<String, RenderError> {
        if !has_semester {
            return Ok(String::new());
        }
        let semester = self.semester.ok_or(RenderError::MissingSemester)?;
        let roman = to_roman(semester).ok_or(RenderError::InvalidSemester(semester))?;
        Ok(format!("(SEM {roman}) "))
    }
}

/// All strings printed on one certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateText {
    pub ccf: String,
    pub seat_line: String,
    pub name_line: String,
    pub course_line: String,
    pub held_by: String,
    pub result_line: String,
    /// Empty unless the candidate is female.
    pub gender_line: String,
    pub issue_date: String,
    pub director: String,
    pub board: String,
}

impl CertificateText {
    pub fn compose(
        record: &EligibleRecord,
        context: &NarrativeContext,
        has_semester: bool,
    ) -> Result<Self, RenderError> {
        let semester = context.semester_fragment(has_semester)?;
        let course = single_spaced(&context.course_name);
        let year = single_spaced(&context.year);
        let name = record.display_name();
        let female = record.gender == Gender::Female;

        let (course_line, result_line) = match &record.result.narrative {
            NarrativeVariant::CgpaBased { cgpa } => (
                format!(
                    "PASSED THE {} {}(CBCGS) EXAMINATION",
                    course, semester
                ),
                format!(
                    "{} WITH {} CGPI",
                    year,
                    cgpa.as_deref().unwrap_or(NOT_AVAILABLE)
                ),
            ),
            NarrativeVariant::GradeBased { grade } => (
                format!(
                    "PASSED THE {} {}(CBSGS) EXAMINATION",
                    course, semester
                ),
                format!(
                    "{} AND WAS PLACED IN THE {} GRADE",
                    year,
                    grade.as_deref().unwrap_or(NOT_AVAILABLE)
                ),
            ),
        };

        Ok(Self {
            ccf: format!("CCF : {} : {}", record.coll_no_padded, record.pno_padded),
            seat_line: format!("NO : {}", record.seat_no()),
            name_line: if female { format!("/ {name}") } else { name },
            course_line,
            held_by: HELD_BY.to_string(),
            result_line,
            gender_line: if female {
                FEMALE_MARKER.to_string()
            } else {
                String::new()
            },
            issue_date: context.issue_date.format("%B %d, %Y").to_string(),
            director: DIRECTOR.to_string(),
            board: BOARD.to_string(),
        })
    }

    pub fn get(&self, field: super::geometry::Field) -> &str {
        use super::geometry::Field;
        match field {
            Field::Ccf => &self.ccf,
            Field::SeatNo => &self.seat_line,
            Field::Name => &self.name_line,
            Field::Course => &self.course_line,
            Field::HeldBy => &self.held_by,
            Field::Result => &self.result_line,
            Field::Gender => &self.gender_line,
            Field::IssueDate => &self.issue_date,
            Field::Director => &self.director,
            Field::Board => &self.board,
        }
    }
}

/// Collapse whitespace runs so the printed line matches what the layout measured.
fn single_spaced(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
