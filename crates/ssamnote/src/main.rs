//! Refine one observation note from the terminal.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable, or
//! talks to a running `ssamnote-web` with `--server`.
//!
//! # Examples
//!
//! ```sh
//! # Refine a note about one child
//! ssamnote --note "철수가 블록으로 탑을 쌓았다" --student 철수 --tag 자연탐구
//!
//! # Class-wide note, saved and printed as JSON
//! ssamnote --note "다 함께 산책을 다녀왔다" --block tb8 --weather sunny --accept
//!
//! # Show the prompt without calling anything
//! ssamnote --note "영희가 노래를 불렀다" --student 영희 --print-prompt
//!
//! # Use the web service instead of the provider
//! ssamnote --note "점심을 잘 먹었다" --server http://127.0.0.1:3001
//! ```

use std::process;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use ssamnote::prelude::*;
use ssamnote::record::DOMAIN_TAG_NAMES;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Refine an informal classroom note into a formal observation record.
#[derive(Parser)]
#[command(name = "ssamnote")]
struct Cli {
    // ── Note ───────────────────────────────────────────────────
    /// The teacher's informal note
    #[arg(long)]
    note: String,

    /// Child named in the note (repeatable; none means class-wide)
    #[arg(long = "student")]
    students: Vec<String>,

    /// Developmental domain tag (repeatable)
    #[arg(long = "tag")]
    tags: Vec<String>,

    /// Time block id (tb1..tb9)
    #[arg(long, default_value = "tb3")]
    block: String,

    /// Observation date, YYYY-MM-DD (default: today)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Weather: sunny, cloudy, rainy or snowy
    #[arg(long)]
    weather: Option<Weather>,

    // ── Generation ─────────────────────────────────────────────
    /// Model to use (overrides SSAMNOTE_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0 (default 0.3)
    #[arg(long)]
    temperature: Option<f32>,

    /// Base URL of a running ssamnote-web to refine through
    #[arg(long)]
    server: Option<String>,

    // ── Output mode ────────────────────────────────────────────
    /// Print the refinement prompt and exit
    #[arg(long)]
    print_prompt: bool,

    /// Save the draft and print the stored log as JSON
    #[arg(long)]
    accept: bool,
}

// ── Helpers ────────────────────────────────────────────────────────

fn validate_tags(tags: &[String]) -> Result<(), String> {
    match tags.iter().find(|t| !DomainTag::is_known(t)) {
        Some(unknown) => Err(format!(
            "unknown domain tag '{unknown}' (valid tags: {})",
            DOMAIN_TAG_NAMES.join(", ")
        )),
        None => Ok(()),
    }
}

fn validate_block(block: &str) -> Result<(), String> {
    let schedule = TimeBlock::default_schedule();
    if schedule.iter().any(|b| b.id == block) {
        Ok(())
    } else {
        let ids: Vec<_> = schedule.iter().map(|b| b.id.as_str()).collect();
        Err(format!(
            "unknown time block '{block}' (valid blocks: {})",
            ids.join(", ")
        ))
    }
}

/// Build a throwaway roster for the names given on the command line.
fn roster(names: &[String]) -> Vec<Student> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Student::new(format!("s{}", i + 1), "cli", name.clone()))
        .collect()
}

fn build_refiner(cli: &Cli) -> Result<Box<dyn Refiner>, String> {
    if let Some(ref url) = cli.server {
        let client = TransformClient::new(url).map_err(|e| e.to_string())?;
        return Ok(Box::new(client));
    }
    let mut config = RefineConfig::from_env();
    if let Some(ref model) = cli.model {
        config = config.with_model(model.clone());
    }
    if let Some(temperature) = cli.temperature {
        config = config.with_temperature(temperature);
    }
    if !config.is_configured() {
        eprintln!("Warning: OPENROUTER_KEY is not set; the note will be kept as written");
    }
    let generator = OpenRouterGenerator::new(&config).map_err(|e| e.to_string())?;
    Ok(Box::new(RefinementService::new(Arc::new(generator), config)))
}

fn format_draft(draft: &EditableDraft) -> String {
    let mut out = format!("{}\n", draft.refined_content);
    if !draft.interpretation.is_empty() {
        out.push_str(&format!("\n{}\n", draft.interpretation));
    }
    out
}

async fn run(cli: &Cli) -> Result<String, String> {
    validate_tags(&cli.tags)?;
    validate_block(&cli.block)?;

    let date = cli
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let mut session = NoteSession::new(date, cli.block.clone());
    session.set_raw_note(cli.note.clone()).map_err(|e| e.to_string())?;
    for student in roster(&cli.students) {
        session.toggle_student(&student).map_err(|e| e.to_string())?;
    }
    for tag in &cli.tags {
        session.toggle_domain_tag(tag).map_err(|e| e.to_string())?;
    }
    session.set_weather(cli.weather);

    if cli.print_prompt {
        let request = session.begin_submit().map_err(|e| e.to_string())?;
        return Ok(format!("{}\n", request.prompt()));
    }

    let refiner = build_refiner(cli)?;
    let draft = session
        .submit(refiner.as_ref())
        .await
        .map_err(|e| e.to_string())?;
    if draft.is_degraded() {
        eprintln!("Warning: refinement failed; showing the original note");
    }
    let output = format_draft(draft);

    if !cli.accept {
        return Ok(output);
    }

    let store = MemoryLogStore::new();
    let entry = session.save(&store).await.map_err(|e| e.to_string())?;
    serde_json::to_string_pretty(entry)
        .map(|json| format!("{json}\n"))
        .map_err(|e| format!("failed to serialize log: {e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
