use clap::Subcommand;
use studyloop_core::{Database, ProgressDelta, ReviewPipeline};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// XP, level, streak and today's minutes
    Show,
    /// Grant XP
    Xp {
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
    /// Mark a lesson complete
    Lesson { lesson_id: String },
    /// Record today's activity for the streak
    Streak,
    /// Log study minutes for today
    Minutes {
        #[arg(allow_negative_numbers = true)]
        minutes: i64,
    },
}

pub fn run(action: ProgressAction, ctx: &Context) -> CmdResult {
    let db = Database::open()?;

    let progress = match action {
        ProgressAction::Show => db.load_progress(&ctx.user)?,
        ProgressAction::Xp { amount } => db.update_progress(&ctx.user, &ProgressDelta::AddXp(amount))?,
        ProgressAction::Lesson { lesson_id } => {
            db.update_progress(&ctx.user, &ProgressDelta::CompleteLesson(lesson_id))?
        }
        ProgressAction::Streak => {
            let update = db.record_daily_activity(&ctx.user, ctx.today)?;
            return print_json(&update);
        }
        ProgressAction::Minutes { minutes } => {
            ReviewPipeline::from_config(&ctx.config).log_minutes(&db, &ctx.user, minutes, ctx.today)?
        }
    };
    print_json(&progress.summary())
}
