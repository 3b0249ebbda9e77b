//! CLI library surface, split out so integration tests can exercise the
//! command implementations directly.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
