use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use gridsub_core::{
    DEFAULT_CHUNK_SIZE, PipelineOptions, ProjectLayout, Rewriter, Stage, StageEvent,
    convert_annotation, export_subtitles, merge_rewritten, rewrite_chunks, run_pipeline_with,
    split_subtitles,
};

#[derive(Parser)]
#[command(name = "gridsub")]
#[command(
    about = "Convert TextGrid transcripts to SRT, split them for rewriting, merge the results and export JSON"
)]
struct Cli {
    /// Project name; selects <input-root>/<project> and <output-root>/<project>
    #[arg(long, env = "PROJECT_NAME", default_value = "default", global = true)]
    project: String,

    /// Root directory holding project inputs
    #[arg(long, default_value = "input", global = true)]
    input_root: PathBuf,

    /// Root directory for everything produced
    #[arg(long, default_value = "output", global = true)]
    output_root: PathBuf,

    /// Show debug logs on stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RewriteArgs {
    /// Command each chunk is piped through (stdin -> stdout). Chunks are copied unchanged if omitted.
    #[arg(long, value_parser = parse_rewrite_cmd)]
    rewrite_cmd: Option<Rewriter>,

    /// Rewrite chunks even if a fresh rewritten file exists
    #[arg(short, long)]
    force: bool,
}

fn parse_rewrite_cmd(command_line: &str) -> Result<Rewriter, String> {
    Rewriter::from_command_line(command_line)
        .ok_or_else(|| "rewrite command must not be empty".to_string())
}

impl RewriteArgs {
    fn rewriter(&self) -> Rewriter {
        self.rewrite_cmd.clone().unwrap_or_default()
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run every stage: convert, split, rewrite, merge, export
    Run {
        /// Maximum subtitle entries per chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        #[command(flatten)]
        rewrite: RewriteArgs,
    },
    /// Convert the TextGrid annotation into an SRT file
    Convert {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Split an SRT file into numbered chunk files
    Split {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Pipe each chunk through the rewrite command
    Rewrite {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[command(flatten)]
        rewrite: RewriteArgs,
    },
    /// Merge rewritten chunks (in chunk order) into one SRT file
    Merge {
        #[arg(long)]
        input_dir: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export an SRT file as JSON records
    Export {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one stage behind a spinner; a failure is tagged with its stage
async fn step<T, F>(stage: Stage, msg: &str, fut: F, done: impl FnOnce(&T) -> String) -> Result<T>
where
    F: std::future::Future<Output = gridsub_core::Result<T>>,
{
    let step_start = Instant::now();
    let spinner = create_spinner(msg);
    match fut.await {
        Ok(value) => {
            spinner.finish_with_message(format!(
                "{} {} {}",
                style("✓").green().bold(),
                done(&value),
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            ));
            Ok(value)
        }
        Err(e) => {
            spinner.finish_with_message(format!(
                "{} {} failed",
                style("✗").red().bold(),
                stage
            ));
            Err(e.in_stage(stage).into())
        }
    }
}

fn stage_message(stage: Stage, rewriter: &Rewriter) -> String {
    match stage {
        Stage::Convert => "Converting TextGrid to SRT...".to_string(),
        Stage::Split => "Splitting subtitles...".to_string(),
        Stage::Rewrite => format!("Rewriting chunks with {}...", rewriter.name()),
        Stage::Merge => "Merging rewritten chunks...".to_string(),
        Stage::Export => "Exporting JSON...".to_string(),
    }
}

async fn run_all(layout: &ProjectLayout, chunk_size: usize, rewrite: &RewriteArgs) -> Result<()> {
    let options = PipelineOptions {
        chunk_size,
        rewriter: rewrite.rewriter(),
        force: rewrite.force,
    };

    let total_start = Instant::now();
    let mut current: Option<(ProgressBar, Instant)> = None;

    let summary = run_pipeline_with(layout, &options, |event| match event {
        StageEvent::Started(stage) => {
            current = Some((
                create_spinner(&stage_message(stage, &options.rewriter)),
                Instant::now(),
            ));
        }
        StageEvent::Finished { detail, .. } => {
            if let Some((spinner, step_start)) = current.take() {
                spinner.finish_with_message(format!(
                    "{} {} {}",
                    style("✓").green().bold(),
                    detail,
                    style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
                ));
            }
        }
        StageEvent::Failed(stage) => {
            if let Some((spinner, _)) = current.take() {
                spinner.finish_with_message(format!(
                    "{} {} failed",
                    style("✗").red().bold(),
                    stage
                ));
            }
        }
    })
    .await?;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!("{}", style("─".repeat(60)).dim());
    println!("{} {}", style("SRT:").dim(), style(summary.merged_path.display()).cyan());
    println!("{} {}", style("JSON:").dim(), style(summary.export_path.display()).cyan());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let layout = ProjectLayout::new(&cli.project, &cli.input_root, &cli.output_root);

    println!(
        "\n{}  {}\n",
        style("gridsub").cyan().bold(),
        style(&layout.project).dim()
    );

    let outcome = match &cli.command {
        Command::Run {
            chunk_size,
            rewrite,
        } => run_all(&layout, *chunk_size, rewrite).await,
        Command::Convert { input, output } => {
            let input = input.clone().unwrap_or_else(|| layout.annotation_path());
            let output = output.clone().unwrap_or_else(|| layout.subtitle_path());
            step(
                Stage::Convert,
                "Converting TextGrid to SRT...",
                convert_annotation(&input, &output),
                |n| format!("Converted: {} entries -> {}", n, output.display()),
            )
            .await
            .map(drop)
        }
        Command::Split {
            input,
            output_dir,
            chunk_size,
        } => {
            let input = input.clone().unwrap_or_else(|| layout.subtitle_path());
            let output_dir = output_dir.clone().unwrap_or_else(|| layout.chunk_dir());
            step(
                Stage::Split,
                "Splitting subtitles...",
                split_subtitles(&input, &output_dir, *chunk_size),
                |paths| format!("Split into {} chunks -> {}", paths.len(), output_dir.display()),
            )
            .await
            .map(drop)
        }
        Command::Rewrite {
            input_dir,
            output_dir,
            rewrite,
        } => {
            let rewriter = rewrite.rewriter();
            let input_dir = input_dir.clone().unwrap_or_else(|| layout.chunk_dir());
            let output_dir = output_dir.clone().unwrap_or_else(|| layout.rewritten_dir());
            step(
                Stage::Rewrite,
                &format!("Rewriting chunks with {}...", rewriter.name()),
                rewrite_chunks(&input_dir, &output_dir, &rewriter, rewrite.force),
                |paths| format!("Rewritten: {} chunks -> {}", paths.len(), output_dir.display()),
            )
            .await
            .map(drop)
        }
        Command::Merge { input_dir, output } => {
            let input_dir = input_dir.clone().unwrap_or_else(|| layout.rewritten_dir());
            let output = output.clone().unwrap_or_else(|| layout.merged_path());
            step(
                Stage::Merge,
                "Merging rewritten chunks...",
                merge_rewritten(&input_dir, &output),
                |n| format!("Merged: {} entries -> {}", n, output.display()),
            )
            .await
            .map(drop)
        }
        Command::Export { input, output } => {
            let input = input.clone().unwrap_or_else(|| layout.merged_path());
            let output = output.clone().unwrap_or_else(|| layout.export_path());
            step(
                Stage::Export,
                "Exporting JSON...",
                export_subtitles(&input, &output),
                |n| format!("Exported: {} records -> {}", n, output.display()),
            )
            .await
            .map(drop)
        }
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
