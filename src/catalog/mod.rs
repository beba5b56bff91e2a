//! Query interface over the read-only school/professor catalog.
//!
//! The type-ahead search never talks to storage directly: it holds an
//! `Arc<dyn Catalog>` handed to it at construction. [`sqlite::SqliteCatalog`]
//! is the production implementation; tests plug in their own.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::types::{
    Course, CourseId, Institution, InstitutionId, Instructor, InstructorId, Review,
};

pub mod seed;
pub mod sqlite;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog query failed: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("invalid seed data: {0}")]
    Seed(String),

    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

/// Which professor name columns a name fragment is matched against.
///
/// Deployments disagree here, so it is configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NameMatch {
    #[default]
    First,
    Last,
    #[value(alias = "both")]
    #[serde(alias = "both")]
    Either,
}

impl NameMatch {
    pub fn as_str(self) -> &'static str {
        match self {
            NameMatch::First => "first",
            NameMatch::Last => "last",
            NameMatch::Either => "either",
        }
    }

    /// In-memory equivalent of the SQL filter, used by non-SQL catalogs.
    pub fn matches(self, instructor: &Instructor, fragment: &str) -> bool {
        let needle = fold(fragment);
        let first = || fold(&instructor.first_name).contains(&needle);
        let last = || fold(&instructor.last_name).contains(&needle);
        match self {
            NameMatch::First => first(),
            NameMatch::Last => last(),
            NameMatch::Either => first() || last(),
        }
    }
}

impl std::str::FromStr for NameMatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(NameMatch::First),
            "last" => Ok(NameMatch::Last),
            "either" | "both" => Ok(NameMatch::Either),
            other => Err(format!("unknown name match `{other}` (expected first, last, either)")),
        }
    }
}

/// Read-only access to schools, professors and their reviews.
///
/// Implementations must be shareable across the lookup worker threads.
pub trait Catalog: Send + Sync {
    /// Schools whose name contains `fragment`, ignoring case.
    ///
    /// `limit: None` returns every match.
    fn search_institutions(
        &self,
        fragment: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Institution>, CatalogError>;

    /// Professors at `institution` whose name contains `fragment`, ignoring case.
    fn search_instructors(
        &self,
        institution: InstitutionId,
        fragment: &str,
        name_match: NameMatch,
        limit: Option<usize>,
    ) -> Result<Vec<Instructor>, CatalogError>;

    /// Exactly one school, or [`CatalogError::NotFound`].
    fn institution(&self, id: InstitutionId) -> Result<Institution, CatalogError>;

    /// Exactly one professor, or [`CatalogError::NotFound`].
    fn instructor(&self, id: InstructorId) -> Result<Instructor, CatalogError>;

    fn reviews_for(&self, instructor: InstructorId) -> Result<Vec<Review>, CatalogError>;

    /// Courses for the given ids; unknown ids are skipped.
    fn courses(&self, ids: &[CourseId]) -> Result<Vec<Course>, CatalogError>;
}

/// Case folding shared by every catalog so substring matches agree.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}
