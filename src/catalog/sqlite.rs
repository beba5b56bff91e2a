//! SQLite-backed [`Catalog`].
//!
//! Table and column names follow the hosted schema the app was built on
//! (`universities`, `professors`, `reviews`, `courses`), so a dump of that
//! database can be loaded as-is.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, params};
use tracing::debug;

use super::{Catalog, CatalogError, NameMatch, fold};
use crate::model::types::{
    Course, CourseId, Institution, InstitutionId, Instructor, InstructorId, RatingSummary, Review,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS universities (
    university_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS professors (
    professor_id INTEGER PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL DEFAULT '',
    department TEXT,
    university_id INTEGER NOT NULL REFERENCES universities(university_id),
    overall_rating REAL,
    would_take_again_percentage REAL,
    difficulty_level REAL
);
CREATE INDEX IF NOT EXISTS idx_professors_university ON professors(university_id);
CREATE TABLE IF NOT EXISTS courses (
    course_id INTEGER PRIMARY KEY,
    course_code TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS reviews (
    review_id INTEGER PRIMARY KEY,
    professor_id INTEGER NOT NULL REFERENCES professors(professor_id),
    course_id INTEGER REFERENCES courses(course_id),
    rating REAL,
    difficulty REAL,
    text_review TEXT,
    grade_received TEXT,
    for_credit INTEGER NOT NULL DEFAULT 0,
    attendance INTEGER NOT NULL DEFAULT 0,
    textbook_required INTEGER NOT NULL DEFAULT 0,
    created_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_reviews_professor ON reviews(professor_id);
";

const INSTRUCTOR_COLUMNS: &str = "professor_id, first_name, last_name, department, university_id, \
     overall_rating, would_take_again_percentage, difficulty_level";

pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open (creating if needed) a catalog database and ensure the schema exists.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// Open an existing catalog without write access.
    pub fn open_readonly(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        register_fold(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, CatalogError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CatalogError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        register_fold(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the underlying connection.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, CatalogError>,
    ) -> Result<T, CatalogError> {
        let mut conn = self.conn.lock();
        f(&mut conn)
    }
}

/// `fold(text)`: Unicode lowercase. The built-in `LIKE` and `lower()` fold
/// ASCII only. Matching is `instr(fold(col), fold(?)) > 0`, so `%` and `_` in
/// user text stay literal.
fn register_fold(conn: &Connection) -> Result<(), CatalogError> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| fold(&text))),
    )?;
    Ok(())
}

fn institution_from_row(row: &Row<'_>) -> rusqlite::Result<Institution> {
    Ok(Institution {
        id: InstitutionId(row.get(0)?),
        name: row.get(1)?,
        location: row.get(2)?,
    })
}

fn instructor_from_row(row: &Row<'_>) -> rusqlite::Result<Instructor> {
    Ok(Instructor {
        id: InstructorId(row.get(0)?),
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        department: row.get(3)?,
        institution: InstitutionId(row.get(4)?),
        ratings: RatingSummary {
            overall_rating: row.get(5)?,
            would_take_again_percentage: row.get(6)?,
            difficulty_level: row.get(7)?,
        },
    })
}

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<Review> {
    let created_at: Option<String> = row.get(10)?;
    Ok(Review {
        id: row.get(0)?,
        instructor: InstructorId(row.get(1)?),
        course: row.get::<_, Option<i64>>(2)?.map(CourseId),
        rating: row.get(3)?,
        difficulty: row.get(4)?,
        text_review: row.get(5)?,
        grade_received: row.get(6)?,
        for_credit: row.get(7)?,
        attendance: row.get(8)?,
        textbook_required: row.get(9)?,
        // Unparseable timestamps are dropped rather than failing the whole row.
        created_at: created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

fn name_filter(name_match: NameMatch) -> &'static str {
    match name_match {
        NameMatch::First => "instr(fold(first_name), fold(?2)) > 0",
        NameMatch::Last => "instr(fold(last_name), fold(?2)) > 0",
        NameMatch::Either => {
            "(instr(fold(first_name), fold(?2)) > 0 OR instr(fold(last_name), fold(?2)) > 0)"
        }
    }
}

/// SQLite treats a negative LIMIT as unbounded.
fn limit_param(limit: Option<usize>) -> i64 {
    limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX))
}

impl Catalog for SqliteCatalog {
    fn search_institutions(
        &self,
        fragment: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Institution>, CatalogError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT university_id, name, location FROM universities
             WHERE instr(fold(name), fold(?1)) > 0
             ORDER BY name, university_id
             LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![fragment, limit_param(limit)], |row| {
                institution_from_row(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(fragment, hits = rows.len(), "institution lookup");
        Ok(rows)
    }

    fn search_instructors(
        &self,
        institution: InstitutionId,
        fragment: &str,
        name_match: NameMatch,
        limit: Option<usize>,
    ) -> Result<Vec<Instructor>, CatalogError> {
        let sql = format!(
            "SELECT {INSTRUCTOR_COLUMNS} FROM professors
             WHERE university_id = ?1 AND {}
             ORDER BY last_name, first_name, professor_id
             LIMIT ?3",
            name_filter(name_match)
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(
                params![institution.0, fragment, limit_param(limit)],
                instructor_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            %institution,
            fragment,
            name_match = name_match.as_str(),
            hits = rows.len(),
            "instructor lookup"
        );
        Ok(rows)
    }

    fn institution(&self, id: InstitutionId) -> Result<Institution, CatalogError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT university_id, name, location FROM universities WHERE university_id = ?1",
            params![id.0],
            institution_from_row,
        )
        .optional()?
        .ok_or(CatalogError::NotFound {
            entity: "university",
            id: id.0,
        })
    }

    fn instructor(&self, id: InstructorId) -> Result<Instructor, CatalogError> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {INSTRUCTOR_COLUMNS} FROM professors WHERE professor_id = ?1"),
            params![id.0],
            instructor_from_row,
        )
        .optional()?
        .ok_or(CatalogError::NotFound {
            entity: "professor",
            id: id.0,
        })
    }

    fn reviews_for(&self, instructor: InstructorId) -> Result<Vec<Review>, CatalogError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT review_id, professor_id, course_id, rating, difficulty, text_review,
                    grade_received, for_credit, attendance, textbook_required, created_at
             FROM reviews WHERE professor_id = ?1
             ORDER BY created_at DESC, review_id DESC",
        )?;
        let rows = stmt
            .query_map(params![instructor.0], review_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn courses(&self, ids: &[CourseId]) -> Result<Vec<Course>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT course_id, course_code FROM courses WHERE course_id IN ({placeholders})
             ORDER BY course_code"
        );
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(ids.iter().map(|id| id.0)), |row| {
                Ok(Course {
                    id: CourseId(row.get(0)?),
                    course_code: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
