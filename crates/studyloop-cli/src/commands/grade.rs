use clap::Subcommand;
use studyloop_core::GradeResponse;

use super::{print_json, CmdResult};

#[derive(Subcommand)]
pub enum GradeAction {
    /// Normalize a raw grader response, falling back on malformed input
    Check {
        /// Raw JSON payload from the grader
        payload: String,
    },
}

pub fn run(action: GradeAction) -> CmdResult {
    match action {
        GradeAction::Check { payload } => print_json(&GradeResponse::from_untrusted(&payload)),
    }
}
