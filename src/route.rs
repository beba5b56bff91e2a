//! Navigation targets.
//!
//! The search component's only outbound effect is a [`Route`] handed to a
//! [`Navigator`]. Paths match the web app's URL scheme.

use parking_lot::Mutex;
use thiserror::Error;

use crate::model::types::{InstitutionId, InstructorId};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown route: {0}")]
    Unknown(String),

    #[error("invalid {param} in route: {value}")]
    InvalidParam { param: &'static str, value: String },

    #[error("missing query parameter `{0}`")]
    MissingParam(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Professor detail page.
    Professor(InstructorId),
    /// Full school result list for a name fragment.
    SchoolResults { school: String },
    /// Full professor result list within one school.
    ProfessorResults {
        university: InstitutionId,
        professor: String,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::Professor(id) => format!("/professor/{id}"),
            Route::SchoolResults { school } => {
                format!("/search-results/school?school={}", urlencoding::encode(school))
            }
            Route::ProfessorResults {
                university,
                professor,
            } => format!(
                "/search-results/professors?university={university}&professor={}",
                urlencoding::encode(professor)
            ),
        }
    }

    pub fn parse(path: &str) -> Result<Self, RouteError> {
        let (base, query) = match path.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (path, None),
        };
        let base = base.trim_end_matches('/');

        if let Some(id) = base.strip_prefix("/professor/") {
            let id = id.parse::<i64>().map_err(|_| RouteError::InvalidParam {
                param: "professor id",
                value: id.to_string(),
            })?;
            return Ok(Route::Professor(InstructorId(id)));
        }

        let params = parse_query(query.unwrap_or_default())?;
        let get = |key: &'static str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .ok_or(RouteError::MissingParam(key))
        };

        match base {
            "/search-results/school" => Ok(Route::SchoolResults {
                school: get("school")?,
            }),
            "/search-results/professors" => {
                let raw = get("university")?;
                let university = raw.parse::<i64>().map_err(|_| RouteError::InvalidParam {
                    param: "university",
                    value: raw.clone(),
                })?;
                Ok(Route::ProfessorResults {
                    university: InstitutionId(university),
                    professor: get("professor").unwrap_or_default(),
                })
            }
            _ => Err(RouteError::Unknown(path.to_string())),
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

fn parse_query(query: &str) -> Result<Vec<(String, String)>, RouteError> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                urlencoding::decode(&s.replace('+', " "))
                    .map(|c| c.into_owned())
                    .map_err(|_| RouteError::InvalidParam {
                        param: "query string",
                        value: s.to_string(),
                    })
            };
            Ok((decode(k)?, decode(v)?))
        })
        .collect()
}

/// Receives navigation requests.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that only remembers where it was sent.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<Route> {
        self.visited.lock().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.visited.lock().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.visited.lock().push(route);
    }
}
