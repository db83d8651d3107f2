// Business logic services layer
//
// Matching and side-effect dispatch, shared by the HTTP listener and the CLI.

pub mod dispatch;
pub mod matching;
