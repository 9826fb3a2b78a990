use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;
use studyloop_core::course::CourseProgress;
use studyloop_core::{plan_course, Database, ReviewPipeline, SessionPlanner};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum CourseAction {
    /// Create a course
    Create {
        title: String,
        /// Number of cards in the course
        #[arg(long, allow_negative_numbers = true)]
        cards: i64,
    },
    /// List your courses
    List,
    /// Plan (or re-plan) a course into daily sessions
    Plan {
        course_id: String,
        /// Days to spread the course over
        #[arg(long, allow_negative_numbers = true)]
        days: Option<i64>,
        /// Cards per session
        #[arg(long, allow_negative_numbers = true)]
        daily: Option<i64>,
        /// First session date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// Show a course's session calendar
    Sessions { course_id: String },
    /// Enrol in a course
    Start { course_id: String },
    /// Show your progress through a course
    Status { course_id: String },
    /// Mark a card finished
    Card { course_id: String, index: u32 },
}

#[derive(Serialize)]
struct Status {
    #[serde(flatten)]
    progress: CourseProgress,
    percent_complete: u8,
}

pub fn run(action: CourseAction, ctx: &Context) -> CmdResult {
    let db = Database::open()?;

    match action {
        CourseAction::Create { title, cards } => {
            print_json(&db.create_course(&ctx.user, &title, cards)?)?;
        }
        CourseAction::List => print_json(&db.list_courses(&ctx.user)?)?,
        CourseAction::Plan {
            course_id,
            days,
            daily,
            start,
        } => {
            let planner = SessionPlanner::with_config(ctx.config.planner.clone());
            let sessions = plan_course(
                &db,
                &planner,
                &course_id,
                days,
                daily,
                start.unwrap_or(ctx.today),
            )?;
            print_json(&sessions)?;
        }
        CourseAction::Sessions { course_id } => {
            db.get_course(&course_id)?;
            print_json(&db.list_sessions(&course_id)?)?;
        }
        CourseAction::Start { course_id } => {
            print_json(&db.start_course(&ctx.user, &course_id)?)?;
        }
        CourseAction::Status { course_id } => {
            let course = db.get_course(&course_id)?;
            let progress = db
                .course_progress(&ctx.user, &course_id)?
                .unwrap_or_else(|| CourseProgress::new(&ctx.user, &course_id));
            let percent_complete = progress.percent_complete(course.card_count);
            print_json(&Status {
                progress,
                percent_complete,
            })?;
        }
        CourseAction::Card { course_id, index } => {
            let pipeline = ReviewPipeline::from_config(&ctx.config);
            let outcome =
                pipeline.complete_card(&db, &ctx.user, &course_id, index, ctx.today, Utc::now())?;
            print_json(&outcome)?;
        }
    }
    Ok(())
}
