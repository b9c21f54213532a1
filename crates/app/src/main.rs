use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use travel_sorter_core::{
    normalize_location, plan_placement, Classification, CollisionPolicy, FileOutcome,
    GeminiClient, LopdfExtractor, Organizer, OrganizerConfig, PlacementMode, RunLog,
    UnclassifiedPolicy,
};

#[derive(Parser)]
#[command(name = "travel-sorter", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Root folder of the continent/country/city hierarchy
    #[arg(long, env = "TRAVEL_SORTER_DESTINATION", default_value = "OrganizerPdfs")]
    destination: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Classify every PDF in the source folder and file it by destination.
    Organize(OrganizeArgs),
    /// Print the folder a continent/country/city triple maps to, without calling the model.
    Locate {
        #[arg(long, default_value = "")]
        continent: String,
        #[arg(long, default_value = "")]
        country: String,
        #[arg(long, default_value = "")]
        city: String,
        /// File name to append to the folder.
        #[arg(long, default_value = "document.pdf")]
        file_name: String,
    },
}

#[derive(clap::Args)]
struct OrganizeArgs {
    /// Flat folder holding the PDFs to sort
    #[arg(long, env = "TRAVEL_SORTER_SOURCE", default_value = "PDFsForOrganizer")]
    source: PathBuf,

    /// Folder for general.log, model_raw_responses.log and json_errors.log
    #[arg(long, env = "TRAVEL_SORTER_LOG_DIR", default_value = "Logs")]
    log_dir: PathBuf,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Model name
    #[arg(long, env = "TRAVEL_SORTER_MODEL", default_value = travel_sorter_core::config::DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generateContent API
    #[arg(long, env = "TRAVEL_SORTER_API_BASE_URL", default_value = travel_sorter_core::config::DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Skip files whose name contains any of these words (comma separated)
    #[arg(long, env = "TRAVEL_SORTER_IGNORE", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Number of pages of text sent to the model
    #[arg(long, default_value = "2")]
    page_limit: usize,

    /// Maximum characters of document text in the prompt
    #[arg(long, default_value = "12000")]
    max_prompt_chars: usize,

    /// What to do when the target folder already holds a different file with the same name
    #[arg(long, value_enum, default_value_t = CollisionArg::Rename)]
    on_collision: CollisionArg,

    /// Where files without a usable classification go
    #[arg(long, value_enum, default_value_t = UnclassifiedArg::Leave)]
    unclassified: UnclassifiedArg,

    /// Bucket folder name used with `--unclassified bucket`
    #[arg(long, default_value = travel_sorter_core::config::DEFAULT_UNCLASSIFIED_BUCKET)]
    bucket_name: String,

    /// Copy into every detected destination and keep the source file
    #[arg(long, default_value_t = false)]
    copy_to_all: bool,

    /// Log the planned placements without touching any file
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollisionArg {
    Rename,
    Refuse,
}

#[derive(Clone, Copy, ValueEnum)]
enum UnclassifiedArg {
    Leave,
    Bucket,
}

impl OrganizeArgs {
    fn into_config(self, destination: PathBuf) -> OrganizerConfig {
        OrganizerConfig {
            source_dir: self.source,
            destination_dir: destination,
            log_dir: self.log_dir,
            api_key: self.api_key,
            model: self.model,
            api_base_url: self.api_base_url,
            request_timeout_secs: self.timeout_secs,
            ignore_keywords: self.ignore,
            page_limit: self.page_limit,
            max_prompt_chars: self.max_prompt_chars,
            collision: match self.on_collision {
                CollisionArg::Rename => CollisionPolicy::Rename,
                CollisionArg::Refuse => CollisionPolicy::Refuse,
            },
            unclassified: match self.unclassified {
                UnclassifiedArg::Leave => UnclassifiedPolicy::LeaveInSource,
                UnclassifiedArg::Bucket => UnclassifiedPolicy::MoveToBucket {
                    name: self.bucket_name,
                },
            },
            placement: if self.copy_to_all {
                PlacementMode::CopyToAll
            } else {
                PlacementMode::Move
            },
            dry_run: self.dry_run,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Organize(args) => organize(args, cli.destination),
        Command::Locate {
            continent,
            country,
            city,
            file_name,
        } => {
            let classification = Classification::new(continent, country, city);
            let location = normalize_location(&classification);
            let placement = plan_placement(&cli.destination, &location, &file_name);
            println!("{}", placement.target().display());
            Ok(())
        }
    }
}

fn organize(args: OrganizeArgs, destination: PathBuf) -> anyhow::Result<()> {
    let config = args
        .into_config(destination)
        .validate()
        .context("invalid configuration")?;

    let model = GeminiClient::new(&config).context("cannot create model client")?;
    let extractor = LopdfExtractor {
        page_limit: config.page_limit,
    };
    let mut log = RunLog::open(&config.log_dir)
        .with_context(|| format!("cannot open run logs in {}", config.log_dir.display()))?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        model = %config.model,
        endpoint = model.endpoint(),
        "travel-sorter boot"
    );

    let organizer = Organizer::new(config, extractor, model);
    let report = organizer
        .run(&mut log)
        .context("cannot list the source folder")?;

    for file in &report.files {
        let name = file.path.display();
        match &file.outcome {
            FileOutcome::Ignored { keyword } => println!("{name}: ignored (keyword \"{keyword}\")"),
            FileOutcome::Placed { results, .. } => {
                for result in results {
                    println!("{name}: {} -> {}", result.label(), result.path().display());
                }
            }
            FileOutcome::Unclassified { reason, bucket } => match bucket {
                Some(outcome) => println!(
                    "{name}: unclassified ({reason}), {} -> {}",
                    outcome.label(),
                    outcome.path().display()
                ),
                None => println!("{name}: unclassified ({reason}), left in source"),
            },
            FileOutcome::Failed { stage, reason, .. } => {
                println!("{name}: failed after {stage}: {reason}")
            }
        }
    }

    if report.failed() > 0 {
        warn!(failed = report.failed(), "some files failed; see general.log");
    }
    println!(
        "{} at {}",
        report.summary(),
        Utc::now().to_rfc3339()
    );

    Ok(())
}
