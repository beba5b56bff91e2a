//! Two-stage type-ahead search: school first, then a professor at that school.
//!
//! Elm-architecture state machine. [`TypeAheadSearch::update`] performs the
//! pure state transition for one [`SearchMsg`] and returns the side effect to
//! run as a [`SearchCmd`]. Nothing here blocks or touches storage; the
//! [`runtime`](super::runtime) executes lookups and feeds completions back in.
//!
//! ```text
//!   InstitutionQueryChanged ──► Lookup(seq=n) ──► InstitutionsLoaded{seq=n}
//!            │                                          │
//!            ▼                                          ▼
//!   InstitutionSelected ─► stage = SelectingInstructor  suggestions (if n is latest)
//!            │
//!            ▼
//!   InstructorQueryChanged ──► Lookup(seq=m) ──► InstructorsLoaded{seq=m}
//!            │
//!            ▼
//!   InstructorSelected ─► SearchSubmitted ─► Navigate(/professor/{id})
//! ```
//!
//! Lookups are never cancelled. Each one carries the sequence number it was
//! issued with, and a completion is applied only when that number is still
//! the latest; anything that changes what the suggestion list should show
//! (a short query, a selection, a reset) bumps the sequence too.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, NameMatch};
use crate::model::types::{Institution, InstitutionId, Instructor};
use crate::route::Route;

/// Queries of this many characters or fewer never hit the catalog.
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_SUGGESTION_LIMIT: usize = 25;

/// What to do with the visible suggestions when a lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LookupFailurePolicy {
    /// Leave the current list untouched.
    #[default]
    KeepExisting,
    /// Replace the list with nothing.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub min_query_len: usize,
    pub name_match: NameMatch,
    pub failure_policy: LookupFailurePolicy,
    pub suggestion_limit: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            name_match: NameMatch::default(),
            failure_policy: LookupFailurePolicy::default(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl SearchSettings {
    fn qualifies(&self, query: &str) -> bool {
        query.chars().count() > self.min_query_len
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    #[default]
    SelectingInstitution,
    SelectingInstructor,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::SelectingInstitution => "selecting-institution",
            Stage::SelectingInstructor => "selecting-instructor",
        }
    }
}

/// Every input the search state machine reacts to.
#[derive(Debug, Clone)]
pub enum SearchMsg {
    // -- User input ------------------------------------------------------
    InstitutionQueryChanged(String),
    InstitutionSelected(Institution),
    InstructorQueryChanged(String),
    InstructorSelected(Instructor),
    /// Select entry `n` of the active suggestion list.
    SuggestionPicked(usize),
    /// Drop the chosen school and start over.
    InstitutionReset,
    /// Go to the selected professor's page.
    SearchSubmitted,
    /// Go to the full result list for the current query.
    AllResultsRequested,

    // -- Lookup completions ----------------------------------------------
    InstitutionsLoaded {
        seq: u64,
        result: Result<Vec<Institution>, String>,
    },
    InstructorsLoaded {
        seq: u64,
        result: Result<Vec<Instructor>, String>,
    },
}

/// Side effect requested by [`TypeAheadSearch::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCmd {
    None,
    Lookup(LookupRequest),
    Navigate(Route),
}

impl SearchCmd {
    pub fn is_none(&self) -> bool {
        matches!(self, SearchCmd::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKind {
    Institutions {
        fragment: String,
    },
    Instructors {
        institution: InstitutionId,
        fragment: String,
        name_match: NameMatch,
    },
}

/// One catalog query, tagged with the sequence number it was issued under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub seq: u64,
    pub kind: LookupKind,
    pub limit: usize,
}

impl LookupRequest {
    /// Run the query and wrap the outcome as the matching completion message.
    pub fn execute(&self, catalog: &dyn Catalog) -> SearchMsg {
        match &self.kind {
            LookupKind::Institutions { fragment } => SearchMsg::InstitutionsLoaded {
                seq: self.seq,
                result: catalog
                    .search_institutions(fragment, Some(self.limit))
                    .map_err(|e| e.to_string()),
            },
            LookupKind::Instructors {
                institution,
                fragment,
                name_match,
            } => SearchMsg::InstructorsLoaded {
                seq: self.seq,
                result: catalog
                    .search_instructors(*institution, fragment, *name_match, Some(self.limit))
                    .map_err(|e| e.to_string()),
            },
        }
    }

    /// Completion to deliver when the query could not even be started.
    pub fn failed(&self, err: impl Into<String>) -> SearchMsg {
        let err: String = err.into();
        match self.kind {
            LookupKind::Institutions { .. } => SearchMsg::InstitutionsLoaded {
                seq: self.seq,
                result: Err(err),
            },
            LookupKind::Instructors { .. } => SearchMsg::InstructorsLoaded {
                seq: self.seq,
                result: Err(err),
            },
        }
    }
}

/// Transient state of one search interaction.
#[derive(Debug, Clone, Default)]
pub struct TypeAheadSearch {
    settings: SearchSettings,
    stage: Stage,
    institution_query: String,
    instructor_query: String,
    institution_suggestions: Vec<Institution>,
    instructor_suggestions: Vec<Instructor>,
    selected_institution: Option<Institution>,
    selected_instructor: Option<Instructor>,
    /// Sequence of the newest lookup whose result may still be shown.
    latest_seq: u64,
    /// Lookups issued so far.
    issued: u64,
    pub status: String,
}

impl TypeAheadSearch {
    pub fn new(settings: SearchSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Query text of the active stage.
    pub fn query(&self) -> &str {
        match self.stage {
            Stage::SelectingInstitution => &self.institution_query,
            Stage::SelectingInstructor => &self.instructor_query,
        }
    }

    pub fn institution_query(&self) -> &str {
        &self.institution_query
    }

    pub fn instructor_query(&self) -> &str {
        &self.instructor_query
    }

    pub fn institution_suggestions(&self) -> &[Institution] {
        &self.institution_suggestions
    }

    pub fn instructor_suggestions(&self) -> &[Instructor] {
        &self.instructor_suggestions
    }

    /// Display labels of the active suggestion list.
    pub fn suggestion_labels(&self) -> Vec<String> {
        match self.stage {
            Stage::SelectingInstitution => self
                .institution_suggestions
                .iter()
                .map(|i| {
                    if i.location.is_empty() {
                        i.name.clone()
                    } else {
                        format!("{} ({})", i.name, i.location)
                    }
                })
                .collect(),
            Stage::SelectingInstructor => self
                .instructor_suggestions
                .iter()
                .map(Instructor::display_name)
                .collect(),
        }
    }

    pub fn selected_institution(&self) -> Option<&Institution> {
        self.selected_institution.as_ref()
    }

    pub fn selected_instructor(&self) -> Option<&Instructor> {
        self.selected_instructor.as_ref()
    }

    pub fn lookups_issued(&self) -> u64 {
        self.issued
    }

    pub fn latest_seq(&self) -> u64 {
        self.latest_seq
    }

    /// Whether submitting would navigate anywhere.
    pub fn can_submit(&self) -> bool {
        self.selected_instructor.is_some()
    }

    fn next_seq(&mut self) -> u64 {
        self.latest_seq += 1;
        self.latest_seq
    }

    fn issue(&mut self, kind: LookupKind) -> SearchCmd {
        let seq = self.next_seq();
        self.issued += 1;
        debug!(seq, ?kind, "lookup issued");
        SearchCmd::Lookup(LookupRequest {
            seq,
            kind,
            limit: self.settings.suggestion_limit,
        })
    }

    pub fn update(&mut self, msg: SearchMsg) -> SearchCmd {
        match msg {
            SearchMsg::InstitutionQueryChanged(text) => {
                self.institution_query = text;
                if self.stage != Stage::SelectingInstitution {
                    // Input only reaches here from a stale widget; keep the text, no lookup.
                    return SearchCmd::None;
                }
                if self.settings.qualifies(&self.institution_query) {
                    self.issue(LookupKind::Institutions {
                        fragment: self.institution_query.clone(),
                    })
                } else {
                    self.next_seq();
                    self.institution_suggestions.clear();
                    SearchCmd::None
                }
            }
            SearchMsg::InstitutionSelected(institution) => {
                if self.stage == Stage::SelectingInstructor
                    && self.selected_institution.as_ref() == Some(&institution)
                {
                    return SearchCmd::None;
                }
                self.next_seq();
                self.status = format!("Searching professors at {}", institution.name);
                self.selected_institution = Some(institution);
                self.institution_suggestions.clear();
                self.instructor_query.clear();
                self.instructor_suggestions.clear();
                self.selected_instructor = None;
                self.stage = Stage::SelectingInstructor;
                SearchCmd::None
            }
            SearchMsg::InstructorQueryChanged(text) => {
                self.instructor_query = text;
                let institution = match (&self.stage, &self.selected_institution) {
                    (Stage::SelectingInstructor, Some(inst)) => inst.id,
                    _ => {
                        self.instructor_suggestions.clear();
                        return SearchCmd::None;
                    }
                };
                if self.settings.qualifies(&self.instructor_query) {
                    self.issue(LookupKind::Instructors {
                        institution,
                        fragment: self.instructor_query.clone(),
                        name_match: self.settings.name_match,
                    })
                } else {
                    self.next_seq();
                    self.instructor_suggestions.clear();
                    SearchCmd::None
                }
            }
            SearchMsg::InstructorSelected(instructor) => {
                let Some(institution) = &self.selected_institution else {
                    warn!(instructor = %instructor.id, "instructor selected before any institution");
                    return SearchCmd::None;
                };
                if instructor.institution != institution.id {
                    warn!(
                        instructor = %instructor.id,
                        expected = %institution.id,
                        actual = %instructor.institution,
                        "instructor belongs to a different institution"
                    );
                    return SearchCmd::None;
                }
                self.next_seq();
                self.instructor_query = instructor.first_name.clone();
                self.instructor_suggestions.clear();
                self.status = format!("Selected {}", instructor.display_name());
                self.selected_instructor = Some(instructor);
                SearchCmd::None
            }
            SearchMsg::SuggestionPicked(index) => match self.stage {
                Stage::SelectingInstitution => match self.institution_suggestions.get(index) {
                    Some(inst) => {
                        let inst = inst.clone();
                        self.update(SearchMsg::InstitutionSelected(inst))
                    }
                    None => SearchCmd::None,
                },
                Stage::SelectingInstructor => match self.instructor_suggestions.get(index) {
                    Some(prof) => {
                        let prof = prof.clone();
                        self.update(SearchMsg::InstructorSelected(prof))
                    }
                    None => SearchCmd::None,
                },
            },
            SearchMsg::InstitutionReset => {
                self.next_seq();
                self.stage = Stage::SelectingInstitution;
                self.institution_query.clear();
                self.instructor_query.clear();
                self.institution_suggestions.clear();
                self.instructor_suggestions.clear();
                self.selected_institution = None;
                self.selected_instructor = None;
                self.status.clear();
                SearchCmd::None
            }
            SearchMsg::SearchSubmitted => match &self.selected_instructor {
                Some(prof) => {
                    let route = Route::Professor(prof.id);
                    info!(%route, "navigating to professor");
                    SearchCmd::Navigate(route)
                }
                None => SearchCmd::None,
            },
            SearchMsg::AllResultsRequested => {
                let route = match (&self.stage, &self.selected_institution) {
                    (Stage::SelectingInstructor, Some(inst)) => Route::ProfessorResults {
                        university: inst.id,
                        professor: self.instructor_query.trim().to_string(),
                    },
                    _ => {
                        let school = self.institution_query.trim();
                        if school.is_empty() {
                            return SearchCmd::None;
                        }
                        Route::SchoolResults {
                            school: school.to_string(),
                        }
                    }
                };
                info!(%route, "navigating to result list");
                SearchCmd::Navigate(route)
            }
            SearchMsg::InstitutionsLoaded { seq, result } => {
                if !self.accepts(seq, Stage::SelectingInstitution) {
                    return SearchCmd::None;
                }
                match result {
                    Ok(rows) => {
                        self.status = format!("{} schools", rows.len());
                        self.institution_suggestions = rows;
                    }
                    Err(err) => {
                        self.lookup_failed(seq, &err);
                        if self.settings.failure_policy == LookupFailurePolicy::Clear {
                            self.institution_suggestions.clear();
                        }
                    }
                }
                SearchCmd::None
            }
            SearchMsg::InstructorsLoaded { seq, result } => {
                if !self.accepts(seq, Stage::SelectingInstructor) {
                    return SearchCmd::None;
                }
                match result {
                    Ok(rows) => {
                        self.status = format!("{} professors", rows.len());
                        self.instructor_suggestions = rows;
                    }
                    Err(err) => {
                        self.lookup_failed(seq, &err);
                        if self.settings.failure_policy == LookupFailurePolicy::Clear {
                            self.instructor_suggestions.clear();
                        }
                    }
                }
                SearchCmd::None
            }
        }
    }

    fn accepts(&self, seq: u64, stage: Stage) -> bool {
        if seq != self.latest_seq || stage != self.stage {
            debug!(seq, latest = self.latest_seq, "discarding stale lookup result");
            return false;
        }
        true
    }

    fn lookup_failed(&mut self, seq: u64, err: &str) {
        warn!(seq, error = err, "suggestion lookup failed");
        self.status = format!("Lookup failed: {err}");
    }
}
