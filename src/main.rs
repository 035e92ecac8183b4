use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use biascade::stages::shortlist;
use biascade::{
    parse_recordings_file, segment_transcript, AdjudicatorBackend, AnthropicClient,
    AnthropicConfig, Cascade, CascadeConfig, ContextualAdjudicator, EventReport, HumanReport,
    LexicalScreener, LlmAdjudicator,
};

#[derive(Parser)]
#[command(name = "biascade")]
#[command(author, version, about = "Real-time meeting bias detection cascade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded meetings through the full detection cascade
    Process {
        /// Input recordings file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for bias events and nudges (JSON)
        #[arg(short, long)]
        output: PathBuf,

        /// Output file for the human-readable report (text)
        #[arg(long)]
        report: Option<PathBuf>,

        /// Cascade configuration file (JSON, camelCase keys)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum Stage-1 score to shortlist a candidate
        #[arg(long)]
        shortlist_floor: Option<f64>,

        /// Candidates per segment sent to Stage 2
        #[arg(long)]
        top_k: Option<usize>,

        /// Stage-2 deadline per candidate in milliseconds
        #[arg(long)]
        deadline_ms: Option<u64>,

        /// Confidence at or above which a live nudge is attempted
        #[arg(long)]
        live_threshold: Option<f64>,

        /// Confidence at or above which an event is kept for the report
        #[arg(long)]
        report_threshold: Option<f64>,

        /// Live nudges per participant per meeting
        #[arg(long)]
        max_nudges: Option<u32>,

        /// Adjudicate with the Anthropic API (needs ANTHROPIC_API_KEY)
        #[arg(long)]
        llm: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Segment and screen recordings without routing or nudging
    Screen {
        /// Input recordings file (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cascade configuration file (JSON, camelCase keys)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// CLI threshold flags layered over the config file
struct Overrides {
    shortlist_floor: Option<f64>,
    top_k: Option<usize>,
    deadline_ms: Option<u64>,
    live_threshold: Option<f64>,
    report_threshold: Option<f64>,
    max_nudges: Option<u32>,
}

impl Overrides {
    fn apply(self, config: &mut CascadeConfig) {
        if let Some(v) = self.shortlist_floor {
            config.shortlist_floor = v;
        }
        if let Some(v) = self.top_k {
            config.stage2_top_k = v;
        }
        if let Some(v) = self.deadline_ms {
            config.stage2_deadline_ms = v;
        }
        if let Some(v) = self.live_threshold {
            config.live_nudge_threshold = v;
        }
        if let Some(v) = self.report_threshold {
            config.report_threshold = v;
        }
        if let Some(v) = self.max_nudges {
            config.max_nudges_per_participant_per_session = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            report,
            config,
            shortlist_floor,
            top_k,
            deadline_ms,
            live_threshold,
            report_threshold,
            max_nudges,
            llm,
            verbose,
        } => {
            setup_logging(verbose);
            let mut cascade_config = load_config(config.as_deref())?;
            Overrides {
                shortlist_floor,
                top_k,
                deadline_ms,
                live_threshold,
                report_threshold,
                max_nudges,
            }
            .apply(&mut cascade_config);
            process_meetings(input, output, report, cascade_config, llm).await
        }
        Commands::Screen {
            input,
            config,
            verbose,
        } => {
            setup_logging(verbose);
            let cascade_config = load_config(config.as_deref())?;
            screen_meetings(input, &cascade_config)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn load_config(path: Option<&Path>) -> Result<CascadeConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            CascadeConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration: {:?}", path))
        }
        None => Ok(CascadeConfig::default()),
    }
}

async fn process_meetings(
    input: PathBuf,
    output: PathBuf,
    report_path: Option<PathBuf>,
    config: CascadeConfig,
    use_llm: bool,
) -> Result<()> {
    info!("Loading recordings from {:?}", input);
    let recordings = parse_recordings_file(&input).context("Failed to parse input recordings")?;
    info!("Loaded {} meetings", recordings.meetings.len());

    let adjudicator = if use_llm {
        let client = AnthropicClient::new(AnthropicConfig::from_env()?);
        info!("Stage 2: adjudicating with {}", client.model());
        AdjudicatorBackend::Llm(LlmAdjudicator::new(client))
    } else {
        info!("Stage 2: adjudicating with contextual rules");
        AdjudicatorBackend::Contextual(ContextualAdjudicator::default())
    };

    let cascade = Arc::new(
        Cascade::new(config.clone(), LexicalScreener::default(), adjudicator)
            .context("Invalid cascade configuration")?,
    );

    // Meetings are independent; replay them concurrently
    let mut tasks = JoinSet::new();
    for recording in recordings.meetings {
        let cascade = Arc::clone(&cascade);
        tasks.spawn(async move { cascade.replay_meeting(&recording).await });
    }

    let mut meetings = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let report = joined.context("Meeting replay task failed")??;
        info!(
            "Meeting {}: {} segments, {} events, {} nudges sent",
            report.summary.meeting_id,
            report.summary.segments_processed,
            report.summary.bias_events,
            report.summary.nudges_sent
        );
        meetings.push(report);
    }

    let event_report = EventReport::new(config, meetings);
    event_report
        .write_json(&output)
        .context("Failed to write event output")?;
    info!("Output written to {:?}", output);

    if let Some(path) = &report_path {
        HumanReport::new(&event_report)
            .write_file(path)
            .context("Failed to write human-readable report")?;
        info!("Human-readable report written to {:?}", path);
    }

    info!(
        "Complete: {} meetings, {} bias events, {} nudges sent",
        event_report.meetings.len(),
        event_report.total_events(),
        event_report.total_nudges_sent()
    );

    Ok(())
}

fn screen_meetings(input: PathBuf, config: &CascadeConfig) -> Result<()> {
    info!("Screening recordings from {:?}", input);
    let recordings = parse_recordings_file(&input).context("Failed to parse input recordings")?;
    let screener = LexicalScreener::default();

    for meeting in &recordings.meetings {
        let segments = segment_transcript(&meeting.meeting_id, &meeting.utterances, &config.segmenter);

        println!("Meeting {}", meeting.meeting_id);
        println!("{}", "=".repeat(8 + meeting.meeting_id.len()));
        println!(
            "Participants: {}",
            meeting.participants().into_iter().collect::<Vec<_>>().join(", ")
        );
        println!("Duration: {:.1}s", meeting.duration_seconds());
        println!("Segments: {}", segments.len());
        println!();

        let mut flagged = 0;
        for segment in &segments {
            let scores = screener.score_text(&segment.text);
            let candidates = shortlist(&segment.segment_id, scores, config.shortlist_floor);
            if candidates.is_empty() {
                continue;
            }
            flagged += 1;
            let listed: Vec<String> = candidates
                .iter()
                .map(|c| format!("{} {:.2}", c.bias_type, c.stage1_score))
                .collect();
            println!(
                "  {:>7.1}s  {:<10} {}",
                segment.start_offset_seconds,
                segment.speaker_participant_id,
                listed.join(", ")
            );
        }

        println!();
        println!("Flagged segments: {} of {}", flagged, segments.len());
        println!();
    }

    Ok(())
}
