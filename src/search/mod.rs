//! School and professor search.
//!
//! [`typeahead`] is the incremental two-stage search, [`runtime`] drives it,
//! and [`results`] backs the full result-list pages.

pub mod results;
pub mod runtime;
pub mod typeahead;

pub use runtime::{LookupExecutor, SearchRuntime};
pub use typeahead::{
    LookupFailurePolicy, SearchCmd, SearchMsg, SearchSettings, Stage, TypeAheadSearch,
};
