use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;
use studyloop_core::{Badge, BadgeDefinition, Database, ReviewPipeline};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum BadgesAction {
    /// Show every badge with its unlock state and progress
    List {
        /// JSON file with badge definitions to use instead of the built-ins
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct BadgeView<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    icon: &'a str,
    color: &'a str,
    unlocked: bool,
    progress_percent: u8,
}

fn load_catalog(path: &Path) -> Result<Vec<Badge>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let defs: Vec<BadgeDefinition> = serde_json::from_str(&raw)?;
    let badges = defs
        .into_iter()
        .map(Badge::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(badges)
}

pub fn run(action: BadgesAction, ctx: &Context) -> CmdResult {
    let db = Database::open()?;

    match action {
        BadgesAction::List { catalog } => {
            let pipeline = match catalog {
                Some(path) => {
                    ReviewPipeline::with_badges(load_catalog(&path)?, ctx.config.rewards.clone())
                }
                None => ReviewPipeline::from_config(&ctx.config),
            };
            let statuses = pipeline.badge_statuses(&db, &ctx.user)?;
            let views: Vec<BadgeView<'_>> = pipeline
                .badges()
                .iter()
                .zip(&statuses)
                .map(|(badge, status)| BadgeView {
                    id: &badge.id,
                    name: &badge.name,
                    description: &badge.description,
                    icon: &badge.icon,
                    color: &badge.color,
                    unlocked: status.unlocked,
                    progress_percent: status.progress_percent,
                })
                .collect();
            print_json(&views)?;
        }
    }
    Ok(())
}
