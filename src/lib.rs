//! profsearch: find a professor by school, then by name.
//!
//! The library is usable on its own (see [`search::SearchRuntime`]); this
//! module adds the `profsearch` command line on top.

pub mod catalog;
pub mod config;
pub mod model;
pub mod profile;
pub mod route;
pub mod search;
pub mod ui;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use catalog::seed::Seed;
use catalog::sqlite::SqliteCatalog;
use catalog::{Catalog, CatalogError, NameMatch};
use config::{AppConfig, ConfigError};
use model::types::{InstitutionId, InstructorId};
use profile::ProfessorProfile;
use route::{RecordingNavigator, Route};
use search::results::{professor_results, school_results};
use search::{LookupFailurePolicy, SearchMsg, SearchRuntime, SearchSettings};

#[derive(Parser, Debug)]
#[command(
    name = "profsearch",
    version,
    about = "Search schools and professors in a ratings catalog"
)]
pub struct Cli {
    /// Catalog database path (overrides config and PROFSEARCH_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file (defaults to ~/.config/profsearch/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true, alias = "robot")]
    pub json: bool,

    /// Professor name columns to match
    #[arg(long, global = true, value_enum)]
    pub name_match: Option<NameMatch>,

    /// What a failed lookup does to the suggestion list
    #[arg(long, global = true, value_enum)]
    pub failure_policy: Option<LookupFailurePolicy>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Create or update the catalog from a JSON seed file
    Seed { file: PathBuf },
    /// List every school whose name contains NAME
    Schools {
        name: String,
        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List every professor at one school whose name contains NAME
    Professors {
        #[arg(long)]
        university: i64,
        name: String,
        /// Stop after this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one professor's detail page
    Professor { id: i64 },
    /// Run the two-stage type-ahead non-interactively and print the route
    Resolve {
        #[arg(long)]
        school: String,
        #[arg(long)]
        professor: String,
        /// 1-based school suggestion to select
        #[arg(long, default_value_t = 1)]
        pick_school: usize,
        /// 1-based professor suggestion to select
        #[arg(long, default_value_t = 1)]
        pick_professor: usize,
    },
    /// Open an app path such as /professor/42
    Open { path: String },
    /// Interactive type-ahead search
    Shell,
}

/// Structured failure reported by the binary.
#[derive(Debug, Clone)]
pub struct CliError {
    pub code: i32,
    pub kind: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub retryable: bool,
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self {
            code: 2,
            kind: "usage",
            message: message.into(),
            hint: None,
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: 3,
            kind: "not-found",
            message: message.into(),
            hint: None,
            retryable: false,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "error": {
                "code": self.code,
                "kind": self.kind,
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
            }
        })
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\nhint: {hint}")?;
        }
        Ok(())
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(cli) = err.downcast_ref::<CliError>() {
            return cli.clone();
        }
        let message = format!("{err:#}");
        if let Some(cat) = err.downcast_ref::<CatalogError>() {
            return match cat {
                CatalogError::NotFound { .. } => CliError::not_found(message),
                CatalogError::Seed(_) | CatalogError::Json(_) => CliError {
                    code: 6,
                    kind: "invalid-seed",
                    message,
                    hint: None,
                    retryable: false,
                },
                CatalogError::Sqlite(_) | CatalogError::Io(_) => CliError {
                    code: 5,
                    kind: "catalog",
                    message,
                    hint: None,
                    retryable: true,
                },
            };
        }
        if err.downcast_ref::<ConfigError>().is_some() {
            return CliError {
                code: 4,
                kind: "config",
                message,
                hint: None,
                retryable: false,
            };
        }
        CliError {
            code: 9,
            kind: "internal",
            message,
            hint: None,
            retryable: false,
        }
    }
}

impl std::error::Error for CliError {}

#[derive(Debug)]
pub struct ParsedCli {
    pub cli: Cli,
}

pub fn parse_cli(raw_args: Vec<String>) -> Result<ParsedCli, CliError> {
    match Cli::try_parse_from(raw_args) {
        Ok(cli) => Ok(ParsedCli { cli }),
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                e.exit()
            }
            _ => Err(CliError::usage(e.to_string().trim_end().to_string())),
        },
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.unwrap_or("warn")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Everything a command needs that comes from configuration.
struct RunContext {
    config: AppConfig,
    settings: SearchSettings,
    json: bool,
}

impl RunContext {
    fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = AppConfig::load(cli.config.as_deref())?;
        if let Some(db) = &cli.db {
            config.db_path = Some(db.clone());
        }
        let mut settings = config.search;
        if let Some(nm) = cli.name_match {
            settings.name_match = nm;
        }
        if let Some(policy) = cli.failure_policy {
            settings.failure_policy = policy;
        }
        Ok(Self {
            config,
            settings,
            json: cli.json,
        })
    }

    fn db_path(&self) -> PathBuf {
        self.config.database_path()
    }

    fn open_catalog(&self) -> anyhow::Result<Arc<dyn Catalog>> {
        let path = self.db_path();
        if !path.exists() {
            return Err(CliError {
                code: 5,
                kind: "catalog-missing",
                message: format!("catalog database not found at {}", path.display()),
                hint: Some("run `profsearch seed <file.json>` first, or pass --db".into()),
                retryable: false,
            }
            .into());
        }
        let catalog = SqliteCatalog::open_readonly(&path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        debug!(path = %path.display(), "catalog opened");
        Ok(Arc::new(catalog))
    }
}

/// Result lists are uncapped unless `--limit` is given.
fn result_limit(explicit: Option<usize>) -> Option<usize> {
    explicit.map(|n| n.max(1))
}

pub fn run_with_parsed(parsed: ParsedCli) -> Result<(), CliError> {
    let cli = parsed.cli;
    if cli.json || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let ctx = RunContext::from_cli(&cli)?;
    init_tracing(ctx.config.log_level.as_deref());

    let Some(command) = cli.command.clone() else {
        return Err(CliError::usage("no command given").with_hint("try `profsearch --help`"));
    };
    run_command(&ctx, command).map_err(CliError::from)
}

fn run_command(ctx: &RunContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Seed { file } => cmd_seed(ctx, &file),
        Commands::Schools { name, limit } => cmd_schools(ctx, &name, result_limit(limit)),
        Commands::Professors {
            university,
            name,
            limit,
        } => cmd_professors(ctx, InstitutionId(university), &name, result_limit(limit)),
        Commands::Professor { id } => cmd_professor(ctx, InstructorId(id)),
        Commands::Resolve {
            school,
            professor,
            pick_school,
            pick_professor,
        } => cmd_resolve(ctx, &school, &professor, pick_school, pick_professor),
        Commands::Open { path } => {
            let route = Route::parse(&path).map_err(|e| CliError::usage(e.to_string()))?;
            open_route(ctx, &route)
        }
        Commands::Shell => {
            let catalog = ctx.open_catalog()?;
            let mut shell =
                ui::shell::Shell::new(ctx.settings, catalog).with_settle_timeout(LOOKUP_TIMEOUT);
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            shell.run(stdin.lock(), &mut stdout)?;
            Ok(())
        }
    }
}

fn open_route(ctx: &RunContext, route: &Route) -> anyhow::Result<()> {
    match route {
        Route::Professor(id) => cmd_professor(ctx, *id),
        Route::SchoolResults { school } => cmd_schools(ctx, school, None),
        Route::ProfessorResults {
            university,
            professor,
        } => cmd_professors(ctx, *university, professor, None),
    }
}

fn cmd_seed(ctx: &RunContext, file: &Path) -> anyhow::Result<()> {
    let seed = Seed::from_path(file).with_context(|| format!("loading seed {}", file.display()))?;
    let path = ctx.db_path();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let catalog = SqliteCatalog::open(&path)?;
    let stats = seed.apply(&catalog)?;
    if ctx.json {
        println!(
            "{}",
            json!({ "db": path.display().to_string(), "imported": stats })
        );
    } else {
        println!(
            "Imported {} schools, {} professors, {} courses, {} reviews into {}",
            stats.institutions,
            stats.instructors,
            stats.courses,
            stats.reviews,
            path.display()
        );
    }
    Ok(())
}

fn cmd_schools(ctx: &RunContext, name: &str, limit: Option<usize>) -> anyhow::Result<()> {
    let catalog = ctx.open_catalog()?;
    let rows = school_results(catalog.as_ref(), name, limit)?;
    if ctx.json {
        println!("{}", serde_json::to_string(&json!({ "schools": rows }))?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No results found.");
    }
    for inst in rows {
        println!("{}\t{}\t{}", inst.id, inst.name, inst.location);
    }
    Ok(())
}

fn cmd_professors(
    ctx: &RunContext,
    university: InstitutionId,
    name: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let catalog = ctx.open_catalog()?;
    let res = professor_results(
        catalog.as_ref(),
        university,
        name,
        ctx.settings.name_match,
        limit,
    )?;
    if ctx.json {
        println!("{}", serde_json::to_string(&res)?);
        return Ok(());
    }
    if res.professors.is_empty() {
        println!("No results found.");
    }
    let school = res.university_name.as_deref().unwrap_or("unknown");
    for prof in &res.professors {
        println!("{}\t{}\tUniversity: {school}", prof.id, prof.sort_name());
    }
    Ok(())
}

fn cmd_professor(ctx: &RunContext, id: InstructorId) -> anyhow::Result<()> {
    let catalog = ctx.open_catalog()?;
    let profile = ProfessorProfile::load(catalog.as_ref(), id)?;
    if ctx.json {
        println!("{}", serde_json::to_string(&profile)?);
        return Ok(());
    }
    for line in profile.summary_lines() {
        println!("{line}");
    }
    Ok(())
}

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

fn cmd_resolve(
    ctx: &RunContext,
    school: &str,
    professor: &str,
    pick_school: usize,
    pick_professor: usize,
) -> anyhow::Result<()> {
    if pick_school == 0 || pick_professor == 0 {
        return Err(CliError::usage("--pick-school and --pick-professor are 1-based").into());
    }
    let catalog = ctx.open_catalog()?;
    let navigator = Arc::new(RecordingNavigator::new());
    let mut rt = SearchRuntime::new(ctx.settings, catalog, navigator.clone());
    let min = ctx.settings.min_query_len;
    let short_hint = format!("queries of {min} characters or fewer are not looked up");

    rt.dispatch(SearchMsg::InstitutionQueryChanged(school.to_string()));
    if !rt.settle(LOOKUP_TIMEOUT) {
        return Err(anyhow!("school lookup timed out"));
    }
    let found = rt.state().institution_suggestions().len();
    if pick_school > found {
        let mut err = CliError::not_found(format!(
            "school query `{school}` matched {found} schools; cannot pick #{pick_school}"
        ));
        if school.chars().count() <= min {
            err = err.with_hint(short_hint);
        }
        return Err(err.into());
    }
    rt.dispatch(SearchMsg::SuggestionPicked(pick_school - 1));

    rt.dispatch(SearchMsg::InstructorQueryChanged(professor.to_string()));
    if !rt.settle(LOOKUP_TIMEOUT) {
        return Err(anyhow!("professor lookup timed out"));
    }
    let found = rt.state().instructor_suggestions().len();
    if pick_professor > found {
        let mut err = CliError::not_found(format!(
            "professor query `{professor}` matched {found} professors; cannot pick #{pick_professor}"
        ));
        if professor.chars().count() <= min {
            err = err.with_hint(short_hint);
        }
        return Err(err.into());
    }
    rt.dispatch(SearchMsg::SuggestionPicked(pick_professor - 1));
    rt.dispatch(SearchMsg::SearchSubmitted);

    let route = navigator
        .last()
        .ok_or_else(|| anyhow!("search finished without a navigation"))?;
    info!(%route, "resolved");

    let state = rt.state();
    if ctx.json {
        println!(
            "{}",
            json!({
                "route": route.path(),
                "institution": state.selected_institution(),
                "instructor": state.selected_instructor(),
                "stage": state.stage().as_str(),
            })
        );
    } else {
        println!("{route}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("parse args")
    }

    #[test]
    fn resolve_defaults_pick_first() {
        let cli = parse(&["profsearch", "resolve", "--school", "Sta", "--professor", "Smi"]);
        assert_eq!(
            cli.command,
            Some(Commands::Resolve {
                school: "Sta".into(),
                professor: "Smi".into(),
                pick_school: 1,
                pick_professor: 1,
            })
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["profsearch", "schools", "oxf", "--json", "--name-match", "either"]);
        assert!(cli.json);
        assert_eq!(cli.name_match, Some(NameMatch::Either));
        let cli = parse(&["profsearch", "shell", "--failure-policy", "clear"]);
        assert_eq!(cli.failure_policy, Some(LookupFailurePolicy::Clear));
    }

    #[test]
    fn parse_cli_maps_errors_to_usage() {
        let err = parse_cli(vec!["profsearch".into(), "bogus".into()]).unwrap_err();
        assert_eq!(err.code, 2);
        assert_eq!(err.kind, "usage");
    }

    #[test]
    fn anyhow_errors_keep_their_category() {
        let nf: CliError = anyhow::Error::from(CatalogError::NotFound {
            entity: "professor",
            id: 9,
        })
        .into();
        assert_eq!((nf.code, nf.kind), (3, "not-found"));

        let cfg: CliError = anyhow::Error::from(ConfigError::NoConfigDir).into();
        assert_eq!(cfg.code, 4);

        let passthrough: CliError =
            anyhow::Error::from(CliError::usage("bad").with_hint("try again")).into();
        assert_eq!(passthrough.code, 2);
        assert_eq!(passthrough.hint.as_deref(), Some("try again"));

        let other: CliError = anyhow!("boom").into();
        assert_eq!(other.code, 9);
    }

    #[test]
    fn cli_error_json_shape() {
        let err = CliError::not_found("professor 9 not found");
        let v = err.to_json();
        assert_eq!(v["error"]["code"], 3);
        assert_eq!(v["error"]["kind"], "not-found");
        assert!(v["error"]["hint"].is_null());
    }
}
