//! JSON seed import for the SQLite catalog.
//!
//! ```json
//! {
//!   "institutions": [{"id": 1, "name": "Stanford University", "location": "Stanford, CA"}],
//!   "instructors": [{"id": 42, "first_name": "Smith", "last_name": "Adams", "institution": 1}],
//!   "courses": [],
//!   "reviews": []
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::CatalogError;
use super::sqlite::SqliteCatalog;
use crate::model::types::{Course, Institution, Instructor, Review};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub institutions: Vec<Institution>,
    #[serde(default)]
    pub instructors: Vec<Instructor>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedStats {
    pub institutions: usize,
    pub instructors: usize,
    pub courses: usize,
    pub reviews: usize,
}

impl Seed {
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check cross-record references before anything touches the database.
    ///
    /// Records already present in the target catalog are not consulted, so a
    /// seed must be self-contained.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let schools: HashSet<_> = self.institutions.iter().map(|i| i.id).collect();
        if schools.len() != self.institutions.len() {
            return Err(CatalogError::Seed("duplicate institution id".into()));
        }
        let profs: HashSet<_> = self.instructors.iter().map(|p| p.id).collect();
        if profs.len() != self.instructors.len() {
            return Err(CatalogError::Seed("duplicate instructor id".into()));
        }
        let courses: HashSet<_> = self.courses.iter().map(|c| c.id).collect();

        for prof in &self.instructors {
            if prof.first_name.trim().is_empty() {
                return Err(CatalogError::Seed(format!(
                    "instructor {} has an empty first name",
                    prof.id
                )));
            }
            if !schools.contains(&prof.institution) {
                return Err(CatalogError::Seed(format!(
                    "instructor {} references unknown institution {}",
                    prof.id, prof.institution
                )));
            }
        }
        for review in &self.reviews {
            if !profs.contains(&review.instructor) {
                return Err(CatalogError::Seed(format!(
                    "review {} references unknown instructor {}",
                    review.id, review.instructor
                )));
            }
            if let Some(course) = review.course
                && !courses.contains(&course)
            {
                return Err(CatalogError::Seed(format!(
                    "review {} references unknown course {}",
                    review.id, course
                )));
            }
        }
        Ok(())
    }

    /// Validate, then upsert every record in one transaction.
    pub fn apply(&self, catalog: &SqliteCatalog) -> Result<SeedStats, CatalogError> {
        self.validate()?;
        catalog.with_connection(|conn| {
            let tx = conn.transaction()?;
            for inst in &self.institutions {
                tx.execute(
                    "INSERT INTO universities (university_id, name, location)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(university_id) DO UPDATE SET
                        name = excluded.name, location = excluded.location",
                    params![inst.id.0, inst.name, inst.location],
                )?;
            }
            for prof in &self.instructors {
                tx.execute(
                    "INSERT INTO professors (professor_id, first_name, last_name,
                        department, university_id, overall_rating,
                        would_take_again_percentage, difficulty_level)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(professor_id) DO UPDATE SET
                        first_name = excluded.first_name, last_name = excluded.last_name,
                        department = excluded.department, university_id = excluded.university_id,
                        overall_rating = excluded.overall_rating,
                        would_take_again_percentage = excluded.would_take_again_percentage,
                        difficulty_level = excluded.difficulty_level",
                    params![
                        prof.id.0,
                        prof.first_name,
                        prof.last_name,
                        prof.department,
                        prof.institution.0,
                        prof.ratings.overall_rating,
                        prof.ratings.would_take_again_percentage,
                        prof.ratings.difficulty_level,
                    ],
                )?;
            }
            for course in &self.courses {
                tx.execute(
                    "INSERT INTO courses (course_id, course_code) VALUES (?1, ?2)
                     ON CONFLICT(course_id) DO UPDATE SET course_code = excluded.course_code",
                    params![course.id.0, course.course_code],
                )?;
            }
            for review in &self.reviews {
                tx.execute(
                    "INSERT INTO reviews (review_id, professor_id, course_id, rating,
                        difficulty, text_review, grade_received, for_credit, attendance,
                        textbook_required, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                     ON CONFLICT(review_id) DO UPDATE SET
                        professor_id = excluded.professor_id, course_id = excluded.course_id,
                        rating = excluded.rating, difficulty = excluded.difficulty,
                        text_review = excluded.text_review,
                        grade_received = excluded.grade_received,
                        for_credit = excluded.for_credit, attendance = excluded.attendance,
                        textbook_required = excluded.textbook_required,
                        created_at = excluded.created_at",
                    params![
                        review.id,
                        review.instructor.0,
                        review.course.map(|c| c.0),
                        review.rating,
                        review.difficulty,
                        review.text_review,
                        review.grade_received,
                        review.for_credit,
                        review.attendance,
                        review.textbook_required,
                        review.created_at.map(|dt| dt.to_rfc3339()),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(())
        })?;

        let stats = SeedStats {
            institutions: self.institutions.len(),
            instructors: self.instructors.len(),
            courses: self.courses.len(),
            reviews: self.reviews.len(),
        };
        info!(?stats, "catalog seeded");
        Ok(stats)
    }
}
