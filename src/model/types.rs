//! Catalog records: schools, professors, and the reviews attached to them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary key of a row in `universities`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstitutionId(pub i64);

/// Primary key of a row in `professors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructorId(pub i64);

/// Primary key of a row in `courses`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub i64);

impl std::fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for InstructorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for CourseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A school or university.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// A professor, always owned by exactly one institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub department: Option<String>,
    pub institution: InstitutionId,
    #[serde(default)]
    pub ratings: RatingSummary,
}

impl Instructor {
    /// "First Last", trimmed when one half is missing.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// "Last, First" as used by result listings.
    pub fn sort_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{}, {}", self.last_name, self.first_name)
        }
    }
}

/// Aggregate rating fields stored on the professor row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    /// Out of 5.
    pub overall_rating: Option<f64>,
    pub would_take_again_percentage: Option<f64>,
    pub difficulty_level: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub course_code: String,
}

/// A student review of one professor, optionally tied to a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub instructor: InstructorId,
    #[serde(default)]
    pub course: Option<CourseId>,
    pub rating: Option<f64>,
    pub difficulty: Option<f64>,
    #[serde(default)]
    pub text_review: Option<String>,
    #[serde(default)]
    pub grade_received: Option<String>,
    #[serde(default)]
    pub for_credit: bool,
    #[serde(default)]
    pub attendance: bool,
    #[serde(default)]
    pub textbook_required: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prof(first: &str, last: &str) -> Instructor {
        Instructor {
            id: InstructorId(1),
            first_name: first.into(),
            last_name: last.into(),
            department: None,
            institution: InstitutionId(1),
            ratings: RatingSummary::default(),
        }
    }

    #[test]
    fn display_name_handles_missing_last_name() {
        assert_eq!(prof("Ada", "Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(prof("Ada", "").display_name(), "Ada");
        assert_eq!(prof("Ada", "").sort_name(), "Ada");
        assert_eq!(prof("Ada", "Lovelace").sort_name(), "Lovelace, Ada");
    }

    #[test]
    fn ids_serialize_as_bare_integers() {
        let inst = Institution {
            id: InstitutionId(7),
            name: "Oxford University".into(),
            location: "Oxford, UK".into(),
        };
        let json = serde_json::to_value(&inst).unwrap();
        assert_eq!(json["id"], 7);
        let back: Institution = serde_json::from_value(json).unwrap();
        assert_eq!(back, inst);
    }
}
