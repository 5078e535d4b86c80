use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use gunc_viz::{ingest, report, serve, DrillDownController, Element, HeadlessUi, Mode, UiPort, ViewerOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gunc-viz")]
#[command(author, version, about = "Interactive summary plots and drill-down for GUNC genome quality results")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON file overriding viewer defaults (level, chart height, colors)
    #[arg(long, global = true)]
    options: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a report directory from GUNC results
    Build {
        /// GUNC results: one directory per sample, or a single result
        results: PathBuf,

        /// Report directory to write
        #[arg(short, long, default_value = "gunc-report")]
        output: PathBuf,

        /// Don't serve and open the report once written
        #[arg(long)]
        no_open: bool,

        /// Port to serve the report on
        #[arg(short, long, default_value = "3002")]
        port: u16,

        /// Number of parallel workers (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Serve an existing report for interactive viewing
    Serve {
        /// Report directory written by `build`
        report_dir: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value = "3002")]
        port: u16,

        /// Don't open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Print the summary chart spec for a report as JSON
    Spec {
        /// Report directory written by `build`
        report_dir: PathBuf,

        /// Taxonomic level (default: kingdom, else the broadest present)
        #[arg(long)]
        level: Option<String>,

        /// Restrict to one sample
        #[arg(long)]
        sample: Option<String>,

        /// Passing genomes only
        #[arg(long)]
        pass_only: bool,

        /// Reverse the contamination axis
        #[arg(long)]
        reverse_y: bool,
    },
}

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let args = Args::parse();
    let options = match &args.options {
        Some(path) => ViewerOptions::load(path)
            .with_context(|| format!("failed to read viewer options from {}", path.display()))?,
        None => ViewerOptions::default(),
    };

    match args.command {
        Command::Build { results, output, no_open, port, jobs } => {
            build(&results, &output, jobs)?;
            if !no_open {
                serve::start(port, &output, options, true).context("report server stopped")?;
            }
            Ok(())
        }
        Command::Serve { report_dir, port, no_open } => {
            serve::start(port, &report_dir, options, !no_open).context("report server stopped")
        }
        Command::Spec { report_dir, level, sample, pass_only, reverse_y } => {
            print_spec(&report_dir, options, level, sample, pass_only, reverse_y)
        }
    }
}

fn build(results: &Path, output: &Path, jobs: Option<usize>) -> Result<()> {
    if let Some(jobs) = jobs {
        if let Err(e) = rayon::ThreadPoolBuilder::new().num_threads(jobs).build_global() {
            warn!(error = %e, "could not resize worker pool");
        }
    }

    let samples = ingest::discover(results)
        .with_context(|| format!("failed to read GUNC results in {}", results.display()))?;
    if samples.is_empty() {
        bail!("no GUNC results found in {}", results.display());
    }
    info!(samples = samples.len(), results = %results.display(), "scanning GUNC results");

    let pb = if samples.len() > 1 {
        let pb = ProgressBar::new(samples.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let scanned = ingest::scan(&samples, |sample| {
        if let Some(ref pb) = pb {
            pb.inc(1);
            pb.set_message(sample.sample_id.clone());
        }
    })?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let data = ingest::assemble(&scanned);
    let mode = Mode::detect(&data.groups);
    let index = report::generate(output, &data)
        .with_context(|| format!("failed to write report to {}", output.display()))?;
    let fragments = ingest::copy_fragments(&scanned, output, mode)?;

    let passing = data.records.iter().filter(|r| r.passed).count();
    info!(
        records = data.records.len(),
        passing,
        failing = data.records.len() - passing,
        fragments,
        ?mode,
        "report built"
    );
    eprintln!("\n\x1b[32mReport saved: {}\x1b[0m", index.display());
    Ok(())
}

fn print_spec(
    report_dir: &Path,
    options: ViewerOptions,
    level: Option<String>,
    sample: Option<String>,
    pass_only: bool,
    reverse_y: bool,
) -> Result<()> {
    let data = report::load(report_dir)
        .with_context(|| format!("failed to load report from {}", report_dir.display()))?;

    let mut controller = DrillDownController::new(data, options);
    let mut ui = HeadlessUi::new();
    controller.initialize(&mut ui);

    if let Some(level) = &level {
        if !controller.data().taxonomic_levels().contains(level) {
            warn!(level = %level, "level not present in report");
        }
        ui.set_value(Element::LevelSelect, level);
    }
    ui.set_checked(Element::PassOnlyToggle, pass_only);
    ui.set_checked(Element::ReverseYToggle, reverse_y);
    if let Some(sample) = &sample {
        // The detail view is not needed here; the pending load is dropped
        ui.set_value(Element::SampleSelect, sample);
        controller.sample_changed(&mut ui);
    }

    let plot = controller.filters_changed(&mut ui);
    info!(
        samples = %plot.counts.samples_label(),
        passing = plot.counts.passing,
        failing = plot.counts.failing,
        "summary plot"
    );
    println!("{}", serde_json::to_string_pretty(&plot.spec)?);
    Ok(())
}
