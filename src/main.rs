// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use jobforge::capabilities::types::{CoverLetterPrefs, Language, LetterLength, Tone};
use jobforge::core::{unified_diff, FsOps, DEFAULT_MAX_READ_BYTES};
use jobforge::utils::make_folder_name;
use jobforge::{run_application_with, PipelineConfig, RunRequest};

#[derive(Parser)]
#[command(name = "jobforge", about = "Job application pipeline", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline for one job application
    Run {
        /// Path to the base LaTeX resume
        #[arg(long, default_value = "")]
        resume: String,
        /// URL of the job posting
        #[arg(long, default_value = "")]
        url: String,
        /// File containing the raw job description text
        #[arg(long)]
        jd_file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        company: String,
        #[arg(long, default_value = "")]
        role: String,
        #[arg(long, default_value = "")]
        location: String,
        /// Cover letter language: en or de
        #[arg(long, default_value = "en")]
        language: String,
        /// Cover letter tone: formal or neutral
        #[arg(long, default_value = "formal")]
        tone: String,
        /// Cover letter length: short or standard
        #[arg(long, default_value = "standard")]
        length: String,
        /// Date the application was sent (marks the tracker row Applied);
        /// "today" resolves to the current date
        #[arg(long, default_value = "")]
        date_applied: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Replace artifacts left by a previous run of the same job
        #[arg(long)]
        overwrite: bool,
    },
    /// Fetch a job posting and print the extracted description text
    Fetch {
        #[arg(long)]
        url: String,
    },
    /// Print the deterministic job folder name for an id and title
    FolderName {
        #[arg(long)]
        job_id: String,
        #[arg(long)]
        title: String,
    },
    /// Print the SHA-256 digest of a file
    Hash {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print a unified diff between two text files
    Diff {
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        to: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-parseable JSON.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            resume,
            url,
            jd_file,
            company,
            role,
            location,
            language,
            tone,
            length,
            date_applied,
            notes,
            overwrite,
        } => {
            let raw_jd_text = match jd_file {
                Some(path) => {
                    let outcome = FsOps::read_text(&path, DEFAULT_MAX_READ_BYTES)
                        .await
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    outcome.content
                }
                None => String::new(),
            };

            let date_applied = if date_applied == "today" {
                chrono::Local::now().format("%Y-%m-%d").to_string()
            } else {
                date_applied
            };

            let request = RunRequest {
                base_resume_path: resume,
                job_url: url,
                raw_jd_text,
                company_name: company,
                role_title: role,
                location,
                prefs: CoverLetterPrefs {
                    language: parse_language(&language)?,
                    tone: parse_tone(&tone)?,
                    length: parse_length(&length)?,
                    include_salary_expectation: false,
                },
                date_applied,
                notes,
            };

            let config = PipelineConfig::load()?.with_overwrite(overwrite);

            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current stage");
                    ctrl_c_cancel.cancel();
                }
            });

            let outcome = run_application_with(config, request, cancel).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_done() {
                std::process::exit(1);
            }
        }
        Commands::Fetch { url } => {
            let fetcher = jobforge::fetch::WebFetcher::new();
            match fetcher.fetch_html(&url).await {
                jobforge::fetch::FetchResult::Success { html, .. } => {
                    println!("{}", jobforge::fetch::WebFetcher::extract_job_text(&html));
                }
                jobforge::fetch::FetchResult::Error { error_message } => {
                    anyhow::bail!("Fetch failed: {}", error_message);
                }
            }
        }
        Commands::FolderName { job_id, title } => {
            println!("{}", make_folder_name(&job_id, &title));
        }
        Commands::Hash { file } => {
            println!("{}", FsOps::sha256(&file).await?);
        }
        Commands::Diff { from, to } => {
            let from_text = FsOps::read_text(&from, DEFAULT_MAX_READ_BYTES).await?;
            let to_text = FsOps::read_text(&to, DEFAULT_MAX_READ_BYTES).await?;
            let outcome = unified_diff(
                &from_text.content,
                &to_text.content,
                &from.display().to_string(),
                &to.display().to_string(),
                3,
            );
            print!("{}", outcome.diff);
            eprintln!("~{} changed lines", outcome.approx_changed_lines);
        }
    }

    Ok(())
}

fn parse_language(s: &str) -> Result<Language> {
    match s.to_lowercase().as_str() {
        "en" => Ok(Language::En),
        "de" => Ok(Language::De),
        other => anyhow::bail!("Unsupported language: {}. Use en or de", other),
    }
}

fn parse_tone(s: &str) -> Result<Tone> {
    match s.to_lowercase().as_str() {
        "formal" => Ok(Tone::Formal),
        "neutral" => Ok(Tone::Neutral),
        other => anyhow::bail!("Unsupported tone: {}. Use formal or neutral", other),
    }
}

fn parse_length(s: &str) -> Result<LetterLength> {
    match s.to_lowercase().as_str() {
        "short" => Ok(LetterLength::Short),
        "standard" => Ok(LetterLength::Standard),
        other => anyhow::bail!("Unsupported length: {}. Use short or standard", other),
    }
}
