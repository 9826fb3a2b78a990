use chrono::NaiveDate;
use serde::Serialize;
use studyloop_core::Config;

pub mod badges;
pub mod concept;
pub mod config;
pub mod course;
pub mod grade;
pub mod progress;

/// Invocation-wide settings shared by every command.
pub struct Context {
    pub user: String,
    pub today: NaiveDate,
    pub config: Config,
}

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
