//! Terminal front end.

pub mod shell;
