use clap::Subcommand;
use serde::Serialize;
use studyloop_core::review::preview_intervals;
use studyloop_core::{Database, MemoryConcept, ReviewPipeline, ReviewScheduler};

use super::{print_json, CmdResult, Context};

#[derive(Subcommand)]
pub enum ConceptAction {
    /// Add a concept to review
    Add {
        /// Short title shown on the review card
        title: String,
        /// Body text
        #[arg(long)]
        content: Option<String>,
        /// Course this concept belongs to
        #[arg(long)]
        course: Option<String>,
    },
    /// List all concepts
    List,
    /// List concepts due for review
    Due,
    /// Grade a recall attempt (0 = blackout, 5 = perfect)
    Review {
        id: String,
        #[arg(allow_negative_numbers = true)]
        quality: i64,
    },
    /// Show the interval each grade would produce
    Preview { id: String },
    /// Stop scheduling a concept
    Retire { id: String },
}

#[derive(Serialize)]
struct Preview<'a> {
    concept_id: &'a str,
    intervals: [u32; 6],
}

pub fn run(action: ConceptAction, ctx: &Context) -> CmdResult {
    let db = Database::open()?;

    match action {
        ConceptAction::Add {
            title,
            content,
            course,
        } => {
            let scheduler = ReviewScheduler::with_config(ctx.config.review.clone());
            let mut concept = MemoryConcept::new(&ctx.user, title, ctx.today);
            concept.state = scheduler.initial_state(ctx.today);
            if let Some(content) = content {
                concept = concept.with_content(content);
            }
            if let Some(course) = course {
                concept = concept.in_course(course);
            }
            db.create_concept(&concept)?;
            print_json(&concept)?;
        }
        ConceptAction::List => print_json(&db.list_concepts(&ctx.user)?)?,
        ConceptAction::Due => print_json(&db.due_concepts(&ctx.user, ctx.today)?)?,
        ConceptAction::Review { id, quality } => {
            let pipeline = ReviewPipeline::from_config(&ctx.config);
            let outcome = pipeline.review(&db, &id, quality, ctx.today)?;
            print_json(&outcome)?;
        }
        ConceptAction::Preview { id } => {
            let concept = db.get_concept(&id)?;
            print_json(&Preview {
                concept_id: &concept.id,
                intervals: preview_intervals(&concept.state, ctx.today),
            })?;
        }
        ConceptAction::Retire { id } => {
            db.retire_concept(&id)?;
            println!("retired {id}");
        }
    }
    Ok(())
}
