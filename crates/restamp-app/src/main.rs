// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Restamp — rewrite the words, keep the page.
//
// Entry point. Initialises logging and services, then runs one subcommand.

mod services;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use restamp_core::error::{RestampError, Result};
use restamp_core::human_errors::humanize_error;
use restamp_core::{AppConfig, DocumentType};

use services::app_services::{AppServices, Requester};
use services::generator::ResponseReader;

#[derive(Parser)]
#[command(name = "restamp")]
#[command(about = "Rewrite the text of a PDF while keeping its layout")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the text of a PDF, one visual line per output line
    Extract {
        /// PDF to read
        input: PathBuf,
    },

    /// Print the prompt that would be sent to the text generator
    Prompt {
        /// PDF to read
        input: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        /// Build the feedback report prompt instead of the rewrite prompt
        #[arg(long)]
        feedback: bool,
    },

    /// Replace the text of a PDF, keeping fonts and positions
    Rewrite {
        /// PDF to rewrite
        input: PathBuf,

        /// Where to write the rewritten PDF
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        response: ResponseArgs,

        #[command(flatten)]
        user: UserArgs,
    },

    /// Render a feedback report on a PDF as a new PDF
    Report {
        /// PDF to review
        input: PathBuf,

        /// Where to write the report PDF
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        job: JobArgs,

        #[command(flatten)]
        response: ResponseArgs,

        #[command(flatten)]
        user: UserArgs,
    },

    /// Show recently processed documents
    History {
        /// Email the documents were processed for
        #[arg(long)]
        email: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the active configuration
    Config {
        /// Write the active configuration to config.json
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct JobArgs {
    /// Job description text
    #[arg(long, required_unless_present = "job_file", conflicts_with = "job_file")]
    job: Option<String>,

    /// File holding the job description
    #[arg(long)]
    job_file: Option<PathBuf>,
}

impl JobArgs {
    fn resolve(&self) -> Result<String> {
        match (&self.job, &self.job_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?),
            (None, None) => Ok(String::new()),
        }
    }
}

#[derive(Args)]
struct ResponseArgs {
    /// File holding the generated text; read from stdin when absent
    #[arg(long)]
    response: Option<PathBuf>,
}

impl ResponseArgs {
    fn reader(&self) -> ResponseReader {
        match &self.response {
            Some(path) => ResponseReader::from_file(path),
            None => ResponseReader::stdin(),
        }
    }
}

#[derive(Args)]
struct UserArgs {
    /// Record this run in the history of this email
    #[arg(long)]
    email: Option<String>,

    /// Name stored alongside the history entry
    #[arg(long, default_value = "")]
    name: String,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            let human = humanize_error(&e);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<()> {
    let services = AppServices::init()?;

    match command {
        Commands::Extract { input } => {
            println!("{}", services.extract_text(&read_pdf(&input)?)?);
        }
        Commands::Prompt { input, job, feedback } => {
            let pdf = read_pdf(&input)?;
            let job = job.resolve()?;
            let prompt = if feedback {
                services.feedback_prompt_for(&pdf, &job)?
            } else {
                services.rewrite_prompt_for(&pdf, &job)?
            };
            println!("{prompt}");
        }
        Commands::Rewrite { input, output, job, response, user } => {
            let requester = requester(&user, &job)?;
            let result = services.rewrite(&read_pdf(&input)?, &requester, &response.reader())?;
            std::fs::write(&output, &result.bytes)?;
            println!("{} ({})", output.display(), result.kind.as_str());
        }
        Commands::Report { input, output, job, response, user } => {
            let requester = requester(&user, &job)?;
            let bytes =
                services.feedback_report(&read_pdf(&input)?, &requester, &response.reader())?;
            std::fs::write(&output, bytes)?;
            println!("{}", output.display());
        }
        Commands::History { email, json } => {
            let records = services.recent_history(&email)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No documents processed for {email}.");
            } else {
                for record in records {
                    println!(
                        "{:>4}  {}  {:<16}  {}",
                        record.id,
                        record.created_at,
                        record.output_kind.as_str(),
                        first_line(&record.job_description),
                    );
                }
            }
        }
        Commands::Config { init } => {
            let config: &AppConfig = services.config();
            if init {
                let path = services.save_config(config)?;
                println!("Wrote {}", path.display());
            } else {
                println!("{}", serde_json::to_string_pretty(config)?);
                println!("# data directory: {}", services.data_dir().display());
            }
        }
    }

    Ok(())
}

/// Read an input document. Files whose extension names another known type
/// are refused before reading; everything else is checked by its header.
fn read_pdf(path: &Path) -> Result<Vec<u8>> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    if let Some(kind) = DocumentType::from_extension(ext)
        && kind != DocumentType::Pdf
    {
        return Err(RestampError::UnsupportedFormat(format!(
            "{} is {}",
            path.display(),
            kind.mime_type()
        )));
    }
    Ok(std::fs::read(path)?)
}

fn requester(user: &UserArgs, job: &JobArgs) -> Result<Requester> {
    Ok(Requester {
        email: user.email.clone(),
        name: user.name.clone(),
        job_description: job.resolve()?,
    })
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn job_text_and_job_file_are_exclusive() {
        assert!(
            Cli::try_parse_from(["restamp", "prompt", "cv.pdf", "--job", "a", "--job-file", "b"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["restamp", "prompt", "cv.pdf"]).is_err());
        assert!(Cli::try_parse_from(["restamp", "prompt", "cv.pdf", "--job", "Rust"]).is_ok());
    }

    #[test]
    fn rewrite_requires_an_output() {
        assert!(Cli::try_parse_from(["restamp", "rewrite", "cv.pdf", "--job", "Rust"]).is_err());
        let cli = Cli::try_parse_from([
            "restamp", "rewrite", "cv.pdf", "--job", "Rust", "-o", "out.pdf", "--email",
            "jane@example.com",
        ])
        .unwrap();
        match cli.command {
            Commands::Rewrite { output, user, .. } => {
                assert_eq!(output, PathBuf::from("out.pdf"));
                assert_eq!(user.email.as_deref(), Some("jane@example.com"));
            }
            _ => panic!("expected rewrite"),
        }
    }

    #[test]
    fn job_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.txt");
        std::fs::write(&path, "Staff engineer\nRust").unwrap();
        let job = JobArgs {
            job: None,
            job_file: Some(path),
        };
        assert_eq!(job.resolve().unwrap(), "Staff engineer\nRust");
    }

    #[test]
    fn text_files_are_refused_as_input() {
        let err = read_pdf(Path::new("cv.md")).unwrap_err();
        assert!(matches!(err, RestampError::UnsupportedFormat(_)));
    }

    #[test]
    fn first_line_of_multiline_jobs() {
        assert_eq!(first_line("Staff engineer\nRust"), "Staff engineer");
        assert_eq!(first_line(""), "");
    }
}
