//! Professor detail view, the target of a submitted search.
//!
//! Only the professor row is mandatory. The school name, reviews and course
//! codes are fetched best-effort; failures are logged and left empty.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::catalog::{Catalog, CatalogError};
use crate::model::types::{Course, CourseId, Instructor, InstructorId, Review};
use crate::route::Route;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessorProfile {
    pub instructor: Instructor,
    pub university_name: Option<String>,
    pub reviews: Vec<Review>,
    pub courses: Vec<Course>,
}

impl ProfessorProfile {
    pub fn load(catalog: &dyn Catalog, id: InstructorId) -> Result<Self, CatalogError> {
        let instructor = catalog.instructor(id)?;

        let university_name = match catalog.institution(instructor.institution) {
            Ok(inst) => Some(inst.name),
            Err(e) => {
                warn!(professor = %id, error = %e, "could not resolve university name");
                None
            }
        };

        let reviews = catalog.reviews_for(id).unwrap_or_else(|e| {
            warn!(professor = %id, error = %e, "could not fetch reviews");
            Vec::new()
        });

        let course_ids: Vec<CourseId> = reviews
            .iter()
            .filter_map(|r| r.course)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let courses = catalog.courses(&course_ids).unwrap_or_else(|e| {
            warn!(professor = %id, error = %e, "could not fetch courses");
            Vec::new()
        });

        Ok(Self {
            instructor,
            university_name,
            reviews,
            courses,
        })
    }

    /// Resolve a navigation target; only professor routes have a profile.
    pub fn for_route(catalog: &dyn Catalog, route: &Route) -> Result<Option<Self>, CatalogError> {
        match route {
            Route::Professor(id) => Self::load(catalog, *id).map(Some),
            _ => Ok(None),
        }
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    /// Mean of the per-review quality ratings that are present.
    pub fn mean_review_rating(&self) -> Option<f64> {
        let ratings: Vec<f64> = self.reviews.iter().filter_map(|r| r.rating).collect();
        if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        }
    }

    pub fn course_code(&self, id: CourseId) -> Option<&str> {
        self.courses
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.course_code.as_str())
    }

    /// Plain-text summary for terminal output.
    pub fn summary_lines(&self) -> Vec<String> {
        let prof = &self.instructor;
        let mut lines = vec![prof.display_name()];

        let dept = prof.department.as_deref().unwrap_or("unknown");
        let school = self.university_name.as_deref().unwrap_or("unknown university");
        lines.push(format!("Professor in the {dept} department at {school}"));

        let fmt = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}"));
        lines.push(format!(
            "Overall {}/5 · Difficulty {} · Would take again {}",
            fmt(prof.ratings.overall_rating),
            fmt(prof.ratings.difficulty_level),
            prof.ratings
                .would_take_again_percentage
                .map_or_else(|| "N/A".to_string(), |v| format!("{v:.0}%")),
        ));
        lines.push(match self.mean_review_rating() {
            Some(mean) => format!("{} reviews, averaging {mean:.1}/5", self.review_count()),
            None => format!("{} reviews", self.review_count()),
        });
        for review in &self.reviews {
            let course = review
                .course
                .and_then(|id| self.course_code(id))
                .unwrap_or("General");
            let mut line = format!(
                "- {course} · Rating {} · Difficulty {}",
                fmt(review.rating),
                fmt(review.difficulty)
            );
            if let Some(text) = review.text_review.as_deref().filter(|t| !t.is_empty()) {
                line.push_str(&format!(" · \"{text}\""));
            }
            lines.push(line);
        }
        if !self.courses.is_empty() {
            let codes: Vec<&str> = self.courses.iter().map(|c| c.course_code.as_str()).collect();
            lines.push(format!("Courses: {}", codes.join(", ")));
        }
        lines
    }
}
