//! Subcommand arguments and handlers

pub mod fallback;
pub mod matching;
pub mod mentor;
pub mod mentorship;
pub mod resource;
pub mod serve;
pub mod simulate;
