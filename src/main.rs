// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cover_drive::mediapipe_bridge::{MediaPipeSource, OracleFactory, SimulatedPose};
use cover_drive::pipeline::default_landmarks_path;
use cover_drive::video::{FrameSource, VideoFileReader};
use cover_drive::{AnalysisConfig, Analyzer, Category, Settings};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cricket cover-drive technique analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a cover-drive video and write the annotated video and reports.
    Analyze(AnalyzeArgs),
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Input video file.
    video: PathBuf,

    /// Impact detection, phases, grade, benchmark comparison, chart and HTML report.
    #[arg(short, long, default_value_t = false)]
    extended: bool,

    /// Settings document; defaults to ./config.json or built-in values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// MediaPipe landmark dump; defaults to <video>.landmarks.json.
    #[arg(short, long, conflicts_with = "simulate")]
    landmarks: Option<PathBuf>,

    /// Use the built-in synthetic swing instead of a landmark dump.
    #[arg(long, default_value_t = false)]
    simulate: bool,

    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;
    let config = AnalysisConfig {
        settings,
        output_root: args.output_dir,
        enable_extended_scoring: args.extended,
    };

    // Decode up front; containers without a frame count only report it here.
    let mut source = VideoFileReader::new(&args.video)?;
    source.rewind()?;

    let oracles: Box<dyn OracleFactory> = if args.simulate {
        Box::new(SimulatedPose::for_source(&source))
    } else {
        let path = args
            .landmarks
            .unwrap_or_else(|| default_landmarks_path(&args.video));
        Box::new(MediaPipeSource::new(path))
    };

    let outputs = Analyzer::new(config)
        .analyze_source(&mut source, oracles.as_ref())
        .with_context(|| format!("Analysis of {} failed", args.video.display()))?;

    println!("\n=== Analysis Complete ===");
    if let Some(overall) = outputs.evaluation.get(Category::OverallGrade) {
        if let Some(grade) = overall.grade {
            println!("Overall Grade: {} (Avg Score: {})", grade, overall.score);
        }
    }
    for (category, assessment) in outputs.evaluation.iter() {
        if *category == Category::OverallGrade {
            continue;
        }
        println!("  {:<22} {:>4}/10  {}", category.to_string(), assessment.score, assessment.feedback);
    }
    println!("\nAnnotated video: {}", outputs.video_path.display());
    println!("Evaluation:      {}", outputs.report_path.display());
    println!("Frame metrics:   {}", outputs.metrics_csv_path.display());
    if let Some(chart) = &outputs.chart_path {
        println!("Chart:           {}", chart.display());
    }
    if let Some(html) = &outputs.html_report_path {
        println!("HTML report:     {}", html.display());
    }
    Ok(())
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Analyze(args) => run_analyze(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
