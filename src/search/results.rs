//! One-shot result lists: every school matching a name, or every professor
//! matching a name at one school. No length threshold applies here, and the
//! lists are uncapped unless the caller passes a limit.

use serde::Serialize;
use tracing::warn;

use crate::catalog::{Catalog, CatalogError, NameMatch};
use crate::model::types::{Institution, InstitutionId, Instructor};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfessorResults {
    pub university: InstitutionId,
    /// `None` when the school could not be fetched.
    pub university_name: Option<String>,
    pub professors: Vec<Instructor>,
}

pub fn school_results(
    catalog: &dyn Catalog,
    school: &str,
    limit: Option<usize>,
) -> Result<Vec<Institution>, CatalogError> {
    let school = school.trim();
    if school.is_empty() {
        return Ok(Vec::new());
    }
    catalog.search_institutions(school, limit)
}

/// The school name is best-effort: a failed lookup is logged and the
/// professor list is still returned.
pub fn professor_results(
    catalog: &dyn Catalog,
    university: InstitutionId,
    professor: &str,
    name_match: NameMatch,
    limit: Option<usize>,
) -> Result<ProfessorResults, CatalogError> {
    let university_name = match catalog.institution(university) {
        Ok(inst) => Some(inst.name),
        Err(e) => {
            warn!(%university, error = %e, "could not resolve university name");
            None
        }
    };

    let professor = professor.trim();
    let professors = if professor.is_empty() {
        Vec::new()
    } else {
        catalog.search_instructors(university, professor, name_match, limit)?
    };

    Ok(ProfessorResults {
        university,
        university_name,
        professors,
    })
}
