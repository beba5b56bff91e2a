//! Line-oriented interactive search.
//!
//! Each input line is either query text for the active stage or a
//! `:command`. After every line the shell waits for outstanding lookups and
//! redraws the suggestion list.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::debug;

use crate::catalog::Catalog;
use crate::profile::ProfessorProfile;
use crate::route::{RecordingNavigator, Route};
use crate::search::results::{professor_results, school_results};
use crate::search::{SearchMsg, SearchRuntime, SearchSettings, Stage};

pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

const HELP: &str = "\
Type to search. Commands:
  :pick N   select suggestion N
  :submit   open the selected professor
  :all      list every match for the current text
  :reset    choose a different school
  :quit     leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellInput {
    Text(String),
    Pick(usize),
    Submit,
    All,
    Reset,
    Help,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> ShellInput {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let Some(cmd) = trimmed.strip_prefix(':') else {
        return ShellInput::Text(trimmed.to_string());
    };
    let mut parts = cmd.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("pick" | "p"), Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => ShellInput::Pick(n - 1),
            _ => ShellInput::Unknown(trimmed.to_string()),
        },
        (Some("submit" | "s"), None) => ShellInput::Submit,
        (Some("all" | "a"), None) => ShellInput::All,
        (Some("reset" | "r"), None) => ShellInput::Reset,
        (Some("help" | "h" | "?"), None) => ShellInput::Help,
        (Some("quit" | "q"), None) => ShellInput::Quit,
        _ => ShellInput::Unknown(trimmed.to_string()),
    }
}

pub struct Shell {
    runtime: SearchRuntime,
    catalog: Arc<dyn Catalog>,
    navigator: Arc<RecordingNavigator>,
    settle_timeout: Duration,
}

impl Shell {
    pub fn new(settings: SearchSettings, catalog: Arc<dyn Catalog>) -> Self {
        let navigator = Arc::new(RecordingNavigator::new());
        let runtime = SearchRuntime::new(settings, Arc::clone(&catalog), navigator.clone());
        Self {
            runtime,
            catalog,
            navigator,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Run until the user opens a professor, quits, or input ends.
    ///
    /// Returns the professor route that was opened, if any.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<Option<Route>> {
        writeln!(out, "{}", HELP)?;
        self.prompt(out)?;
        for line in input.lines() {
            let line = line.context("failed to read input")?;
            let parsed = parse_line(&line);
            debug!(?parsed, "shell input");
            let seen = self.navigator.visited().len();
            match parsed {
                ShellInput::Text(text) => {
                    let msg = match self.runtime.state().stage() {
                        Stage::SelectingInstitution => SearchMsg::InstitutionQueryChanged(text),
                        Stage::SelectingInstructor => SearchMsg::InstructorQueryChanged(text),
                    };
                    self.runtime.dispatch(msg);
                    if !self.runtime.settle(self.settle_timeout) {
                        writeln!(out, "{}", "lookup still running".yellow())?;
                    }
                }
                ShellInput::Pick(n) => self.runtime.dispatch(SearchMsg::SuggestionPicked(n)),
                ShellInput::Submit => {
                    if !self.runtime.state().can_submit() {
                        writeln!(out, "pick a professor first")?;
                    }
                    self.runtime.dispatch(SearchMsg::SearchSubmitted);
                }
                ShellInput::All => self.runtime.dispatch(SearchMsg::AllResultsRequested),
                ShellInput::Reset => self.runtime.dispatch(SearchMsg::InstitutionReset),
                ShellInput::Help => writeln!(out, "{HELP}")?,
                ShellInput::Quit => return Ok(None),
                ShellInput::Unknown(raw) => writeln!(out, "unknown command: {raw}")?,
            }

            let navigated: Vec<Route> = self.navigator.visited().into_iter().skip(seen).collect();
            for route in navigated {
                if self.open(&route, out)? {
                    return Ok(Some(route));
                }
            }
            self.render(out)?;
            self.prompt(out)?;
        }
        Ok(None)
    }

    /// Show a navigation target. Returns true when it ends the session.
    fn open<W: Write>(&self, route: &Route, out: &mut W) -> Result<bool> {
        let settings = *self.runtime.state().settings();
        writeln!(out, "{} {}", "→".cyan(), route)?;
        match route {
            Route::Professor(_) => {
                if let Some(profile) = ProfessorProfile::for_route(self.catalog.as_ref(), route)? {
                    for line in profile.summary_lines() {
                        writeln!(out, "  {line}")?;
                    }
                }
                Ok(true)
            }
            Route::SchoolResults { school } => {
                let rows = school_results(self.catalog.as_ref(), school, None)?;
                if rows.is_empty() {
                    writeln!(out, "  No results found.")?;
                }
                for inst in rows {
                    writeln!(out, "  {} ({})", inst.name, inst.location)?;
                }
                Ok(false)
            }
            Route::ProfessorResults {
                university,
                professor,
            } => {
                let res = professor_results(
                    self.catalog.as_ref(),
                    *university,
                    professor,
                    settings.name_match,
                    None,
                )?;
                if res.professors.is_empty() {
                    writeln!(out, "  No results found.")?;
                }
                let school = res.university_name.as_deref().unwrap_or("unknown");
                for prof in res.professors {
                    writeln!(out, "  {}  University: {school}", prof.sort_name())?;
                }
                Ok(false)
            }
        }
    }

    fn render<W: Write>(&self, out: &mut W) -> Result<()> {
        let state = self.runtime.state();
        for (i, label) in state.suggestion_labels().iter().enumerate() {
            writeln!(out, "  {} {label}", format!("[{}]", i + 1).bold())?;
        }
        if !state.status.is_empty() {
            writeln!(out, "{}", state.status.dimmed())?;
        }
        Ok(())
    }

    fn prompt<W: Write>(&self, out: &mut W) -> Result<()> {
        let state = self.runtime.state();
        let label = match (state.stage(), state.selected_institution()) {
            (Stage::SelectingInstructor, Some(inst)) => format!("professor @ {}", inst.name),
            _ => "school".to_string(),
        };
        write!(out, "{}> ", label.green())?;
        out.flush()?;
        Ok(())
    }
}
