use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use studyloop_core::Config;

mod commands;
mod logging;

use commands::Context;

#[derive(Parser)]
#[command(name = "studyloop", version, about = "Studyloop CLI")]
struct Cli {
    /// Learner the command acts on
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Evaluate as of this date (YYYY-MM-DD) instead of today
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Memory concepts and spaced-repetition reviews
    Concept {
        #[command(subcommand)]
        action: commands::concept::ConceptAction,
    },
    /// Courses, session plans and card progress
    Course {
        #[command(subcommand)]
        action: commands::course::CourseAction,
    },
    /// XP, level, streak and study minutes
    Progress {
        #[command(subcommand)]
        action: commands::progress::ProgressAction,
    },
    /// Achievement status
    Badges {
        #[command(subcommand)]
        action: commands::badges::BadgesAction,
    },
    /// Answer-grading payloads
    Grade {
        #[command(subcommand)]
        action: commands::grade::GradeAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();
    logging::init_tracing(&config.logging.level);

    let ctx = Context {
        user: cli.user,
        today: cli
            .today
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
        config,
    };
    tracing::debug!(user = %ctx.user, today = %ctx.today, "running command");

    let result = match cli.command {
        Commands::Concept { action } => commands::concept::run(action, &ctx),
        Commands::Course { action } => commands::course::run(action, &ctx),
        Commands::Progress { action } => commands::progress::run(action, &ctx),
        Commands::Badges { action } => commands::badges::run(action, &ctx),
        Commands::Grade { action } => commands::grade::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "studyloop", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
