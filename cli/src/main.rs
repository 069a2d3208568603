//! blockdoc CLI - rebuild documents from analysis block responses

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use blockdoc::provider::{idempotency_token, job_tag, CollectorOptions};
use blockdoc::render::{self, LineMap};
use blockdoc::{
    BuildOptions, CompletionNotification, Document, DocumentBuilder, JsonDirSink, JsonFormat,
    PageSelection, Pipeline, ReplayProvider, ResultCollector, RetryPolicy, TextOptions,
};

#[derive(Parser)]
#[command(name = "blockdoc")]
#[command(version)]
#[command(about = "Rebuild documents from analysis block responses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the detected text
    Text {
        /// Response files, in pagination order
        #[arg(value_name = "FILE", required = true)]
        input: Vec<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Keep one line per row instead of joining with spaces
        #[arg(short = 'n', long)]
        newlines: bool,

        /// Page range (e.g., "1-10", "1,3,5")
        #[arg(long)]
        pages: Option<String>,
    },

    /// Print table rows keyed by header text
    Rows {
        #[arg(value_name = "FILE", required = true)]
        input: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[arg(long)]
        pages: Option<String>,
    },

    /// Print numbered lines per page
    Lines {
        #[arg(value_name = "FILE", required = true)]
        input: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        pages: Option<String>,
    },

    /// Print the rebuilt document as JSON
    Json {
        #[arg(value_name = "FILE", required = true)]
        input: Vec<PathBuf>,

        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        compact: bool,
    },

    /// Show document information
    Info {
        #[arg(value_name = "FILE", required = true)]
        input: Vec<PathBuf>,
    },

    /// Handle completion notifications against recorded responses
    Process {
        /// Notification message or topic delivery event
        #[arg(short = 'N', long, value_name = "FILE")]
        notification: PathBuf,

        /// Recorded response files, in pagination order
        #[arg(value_name = "FILE", required = true)]
        responses: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = "blockdoc_output")]
        output: PathBuf,

        /// Keep one line per row in extracted text
        #[arg(short = 'n', long)]
        newlines: bool,

        /// Base retry interval in seconds
        #[arg(long, env = "retry_interval", default_value = "30")]
        retry_interval: u64,

        /// Maximum attempts per provider call
        #[arg(long, env = "max_retry_attempt", default_value = "5")]
        max_retry_attempt: u32,

        /// Blocks requested per result fragment
        #[arg(long, env = "max_results", default_value = "1000")]
        max_results: u32,
    },

    /// Print the idempotency token and job tag for a document key
    Token {
        /// Document key (e.g., "invoices/march.pdf")
        #[arg(value_name = "KEY")]
        key: String,

        /// Token prefix
        #[arg(long, env = "text_detection_token_prefix", default_value = "blockdoc")]
        prefix: String,
    },

    /// Show version information
    Version,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Text {
            input,
            output,
            newlines,
            pages,
        } => cmd_text(&input, output.as_deref(), newlines, pages.as_deref()),
        Commands::Rows {
            input,
            output,
            compact,
            pages,
        } => cmd_rows(&input, output.as_deref(), compact, pages.as_deref()),
        Commands::Lines {
            input,
            output,
            pages,
        } => cmd_lines(&input, output.as_deref(), pages.as_deref()),
        Commands::Json {
            input,
            output,
            compact,
        } => cmd_json(&input, output.as_deref(), compact),
        Commands::Info { input } => cmd_info(&input),
        Commands::Process {
            notification,
            responses,
            output,
            newlines,
            retry_interval,
            max_retry_attempt,
            max_results,
        } => cmd_process(
            &notification,
            &responses,
            &output,
            newlines,
            RetryPolicy::new()
                .with_base_interval(Duration::from_secs(retry_interval))
                .with_max_attempts(max_retry_attempt),
            CollectorOptions::new().with_max_results(max_results),
        ),
        Commands::Token { key, prefix } => {
            cmd_token(&key, &prefix);
            Ok(())
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn page_selection(pages: Option<&str>) -> Result<PageSelection, Box<dyn std::error::Error>> {
    match pages {
        Some(p) => Ok(PageSelection::parse(p).map_err(|e| format!("Invalid page range: {}", e))?),
        None => Ok(PageSelection::All),
    }
}

fn load_document(input: &[PathBuf], pages: PageSelection) -> blockdoc::Result<Document> {
    let mut fragments = Vec::new();
    for path in input {
        let json = fs::read_to_string(path)?;
        fragments.extend(blockdoc::provider::parse_result_pages(&json)?);
    }
    let options = BuildOptions::new().with_pages(pages);
    DocumentBuilder::with_options(options).build_pages(fragments)
}

fn write_output(output: Option<&Path>, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_text(
    input: &[PathBuf],
    output: Option<&Path>,
    newlines: bool,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = page_selection(pages)?;
    let doc = load_document(input, selection.clone())?;

    let options = TextOptions::new()
        .with_newlines(newlines)
        .with_pages(selection);
    let text = render::to_text(&doc, &options);

    write_output(output, &text)
}

fn cmd_rows(
    input: &[PathBuf],
    output: Option<&Path>,
    compact: bool,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = page_selection(pages)?;
    let doc = load_document(input, selection.clone())?;

    let rows = render::to_rows(&doc, &selection);
    let json = render::to_json_value(&rows, json_format(compact))?;

    write_output(output, &json)
}

fn cmd_lines(
    input: &[PathBuf],
    output: Option<&Path>,
    pages: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = page_selection(pages)?;
    let doc = load_document(input, selection.clone())?;

    let lines = LineMap::from_document(&doc, &selection);
    let json = render::to_json_value(&lines, JsonFormat::Pretty)?;

    write_output(output, &json)
}

fn cmd_json(
    input: &[PathBuf],
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(input, PageSelection::All)?;
    let json = render::to_json(&doc, json_format(compact))?;

    write_output(output, &json)
}

fn json_format(compact: bool) -> JsonFormat {
    if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    }
}

fn cmd_info(input: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let doc = load_document(input, PageSelection::All)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    for path in input {
        println!("{}: {}", "File".bold(), path.display());
    }
    if let Some(ref job_id) = doc.metadata.job_id {
        println!("{}: {}", "Job".bold(), job_id);
    }
    let declared = match doc.metadata.declared_pages {
        0 => "unknown".to_string(),
        n => n.to_string(),
    };
    println!("{}: {}", "Declared pages".bold(), declared);
    println!("{}: {}", "Pages".bold(), doc.metadata.page_count);
    println!("{}: {}", "Blocks".bold(), doc.metadata.block_count);

    println!();
    println!("{}", "Block Types".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for (block_type, count) in doc.index().counts() {
        println!("{}: {}", block_type.bold(), count);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let text = doc.text(false);
    let tables = doc.tables().count();
    let fields: usize = doc.pages.iter().map(|p| p.key_values.len()).sum();

    println!("{}: {}", "Lines".bold(), doc.line_count());
    println!("{}: {}", "Words".bold(), text.split_whitespace().count());
    println!("{}: {}", "Tables".bold(), tables);
    println!("{}: {}", "Form fields".bold(), fields);

    if !doc.diagnostics.is_empty() {
        println!();
        println!("{}", "Skipped Defects".yellow().bold());
        println!("{}", "─".repeat(40).dimmed());
        for diagnostic in &doc.diagnostics {
            println!("  {} {}", "•".yellow(), diagnostic);
        }
    }

    Ok(())
}

fn cmd_process(
    notification: &Path,
    responses: &[PathBuf],
    output: &Path,
    newlines: bool,
    policy: RetryPolicy,
    collector_options: CollectorOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let message = fs::read_to_string(notification)?;
    let notifications = CompletionNotification::parse_any(&message)?;
    let mut sink = JsonDirSink::new(output)?;

    let pb = ProgressBar::new(notifications.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut processed = Vec::new();
    for notification in &notifications {
        pb.set_message(format!("Job {}", notification.job_id));

        let provider = ReplayProvider::from_files(responses)?.with_job_id(&notification.job_id);
        let collector = ResultCollector::new(provider)
            .with_policy(policy.clone())
            .with_options(collector_options.clone());
        let mut pipeline = Pipeline::from_collector(collector)
            .with_text_options(TextOptions::new().with_newlines(newlines));

        match pipeline.process(notification, &mut sink)? {
            Some(job) => processed.push(job),
            None => pb.println(format!(
                "{} job {} ({})",
                "Skipped".yellow(),
                notification.job_id,
                notification.status
            )),
        }
        pb.inc(1);
    }

    pb.finish_with_message("Done!");

    println!("\n{}", "Output files:".green().bold());
    for (i, job) in processed.iter().enumerate() {
        let branch = if i + 1 == processed.len() {
            "└─"
        } else {
            "├─"
        };
        let rows = if job.rows > 0 {
            format!(" (+ {} rows)", job.rows)
        } else {
            String::new()
        };
        println!(
            "  {} {}{}",
            branch.dimmed(),
            sink.text_path(&job.document_name).display(),
            rows
        );
    }

    Ok(())
}

fn cmd_token(key: &str, prefix: &str) {
    let name = key.rsplit('/').next().unwrap_or(key);
    let name = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);

    println!("{}: {}", "Token".bold(), idempotency_token(prefix, key));
    println!("{}: {}", "Job tag".bold(), job_tag(prefix, name));
}

fn cmd_version() {
    println!("{} {}", "blockdoc".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Rebuild documents from analysis block responses");
}
