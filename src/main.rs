use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use jobmail::config::{Settings, expand_home};
use jobmail::db::Database;
use jobmail::email::{EmailConfig, EmailFetcher, load_eml};
use jobmail::fixtures::FixtureWriter;
use jobmail::sanitize::PiiPatterns;
use jobmail::{IngestionService, JobExtractionService, Platform};

#[derive(Parser)]
#[command(name = "jobmail")]
#[command(about = "Extract job postings from Indeed and LinkedIn alert emails")]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Fetch job alerts over IMAP and store new postings
    Fetch {
        /// Mailbox address
        #[arg(short, long, env = "JOBMAIL_USERNAME")]
        username: String,

        /// Path to app password file
        #[arg(short, long, default_value = "~/.jobmail.app_password.txt")]
        password_file: String,

        /// IMAP folder
        #[arg(long, default_value = "INBOX")]
        folder: String,

        /// Number of days to look back
        #[arg(short, long, default_value = "1")]
        days: u32,

        /// Only fetch mail from this sender
        #[arg(long)]
        from: Option<String>,

        /// Show what would be added without adding
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract jobs from a saved .eml file and print them as JSON
    Parse {
        /// Path to the message
        file: PathBuf,

        /// UID to record as provenance
        #[arg(long, default_value = "0")]
        uid: u32,
    },

    /// List stored postings
    List {
        /// Filter by platform (indeed, linkedin)
        #[arg(short, long)]
        platform: Option<Platform>,
    },

    /// Remove all generated fixtures
    FixturesClear,
}

fn extraction_service(settings: &Settings) -> Result<JobExtractionService> {
    let service = JobExtractionService::new();
    if !settings.debug {
        return Ok(service);
    }
    let patterns = PiiPatterns::from_identity(&settings.identity)?;
    Ok(service.with_fixtures(FixtureWriter::new(&settings.fixture_dir, patterns)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("jobmail=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings;

    match cli.command {
        Commands::Init => {
            let db = Database::open(&settings.db_path()?)?;
            db.init()?;
            println!("Database initialized at {}", db.path().display());
        }

        Commands::Fetch {
            username,
            password_file,
            folder,
            days,
            from,
            dry_run,
        } => {
            let db = Database::open(&settings.db_path()?)?;
            db.ensure_initialized()?;

            let config = EmailConfig::from_password_file(&username, &expand_home(&password_file), &folder)?;
            tracing::info!(host = %config.provider.host, %username, "Connecting to mailbox");
            let emails = EmailFetcher::new(config).fetch_recent(days, from.as_deref())?;

            let jobs = extraction_service(&settings)?.extract_jobs(&emails)?;

            if dry_run {
                for job in &jobs {
                    println!(
                        "[DRY RUN] {} at {} ({})",
                        job.title,
                        job.company.as_deref().unwrap_or("Unknown"),
                        job.platform
                    );
                }
                println!("\n(Dry run - {} jobs extracted, none stored)", jobs.len());
                return Ok(());
            }

            let (stats, _) = IngestionService::new(&db).ingest_all(&jobs)?;

            println!("\nResults:");
            println!("  Emails fetched: {}", emails.len());
            println!("  Jobs extracted: {}", stats.seen);
            println!("  Jobs added:     {}", stats.created);
            println!("  Duplicates:     {}", stats.duplicates);
        }

        Commands::Parse { file, uid } => {
            let email = load_eml(&file, uid)?
                .ok_or_else(|| anyhow!("{} has no HTML part or no Date header", file.display()))?;
            let jobs = extraction_service(&settings)?.extract_jobs(std::slice::from_ref(&email))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&jobs).context("Failed to serialize jobs")?
            );
        }

        Commands::List { platform } => {
            let db = Database::open(&settings.db_path()?)?;
            db.ensure_initialized()?;
            let postings = db.list_postings(platform)?;
            if postings.is_empty() {
                println!("No postings found.");
            } else {
                println!("{:<6} {:<9} {:<30} {:<20} {:<20}", "ID", "PLATFORM", "TITLE", "COMPANY", "LOCATION");
                println!("{}", "-".repeat(88));
                for posting in postings {
                    println!(
                        "{:<6} {:<9} {:<30} {:<20} {:<20}",
                        posting.id,
                        posting.platform,
                        truncate(&posting.title, 28),
                        truncate(&posting.company.unwrap_or_default(), 18),
                        truncate(&posting.location.unwrap_or_default(), 18)
                    );
                }
            }
        }

        Commands::FixturesClear => {
            let writer = FixtureWriter::new(&settings.fixture_dir, PiiPatterns::default());
            let removed = writer.remove_all()?;
            println!("Removed {} fixture entries from {}", removed, settings.fixture_dir.display());
        }
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
