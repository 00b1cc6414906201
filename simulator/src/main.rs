use anyhow::Context;
use chrono::Local;
use clap::Parser;
use generator::profile::{build_batches, GeneratorConfig};
use generator::script::CaptureScript;
use gui_bridge::bridge::{gui_bind_address, GuiBridge};
use rollcore::capture::{CaptureHandle, CaptureSession, QueueSource, TickReport};
use rollcore::CoreResult;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use workflow::config::SessionConfig;
use workflow::runner::Runner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Roll-call session driver for meeting attendance")]
struct Args {
    /// Load a session config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Line-oriented roster file
    #[arg(long)]
    roster: Option<PathBuf>,
    /// Roster spreadsheet exported as CSV
    #[arg(long)]
    roster_csv: Option<PathBuf>,
    /// Shared spreadsheet link to fetch the roster from
    #[arg(long)]
    sheet_url: Option<String>,
    /// YAML file of recorded capture batches
    #[arg(long)]
    script: Option<PathBuf>,
    /// Number of synthetic batches to generate from the roster
    #[arg(long)]
    synthetic: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Replay every batch immediately and print the report
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Keep the HTTP bridge alive until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
    /// Write the text report to this path
    #[arg(long)]
    report: Option<PathBuf>,
    /// Rewrite the --report file after every join or leave
    #[arg(long, default_value_t = false, requires = "report")]
    continuous_save: bool,
    /// Course code for the roll-call summary
    #[arg(long)]
    code: Option<String>,
}

fn session_config(args: &Args) -> anyhow::Result<SessionConfig> {
    let mut config = match &args.workflow {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.matcher.threshold = threshold;
    }
    if let Some(interval_ms) = args.interval_ms {
        config.capture.interval_ms = interval_ms;
    }
    if args.roster.is_some() || args.roster_csv.is_some() || args.sheet_url.is_some() {
        config.roster.file = args.roster.clone();
        config.roster.csv = args.roster_csv.clone();
        config.roster.sheet_url = args.sheet_url.clone();
    }
    if args.code.is_some() {
        config.course_code = args.code.clone();
    }
    if args.continuous_save {
        config.continuous_report = args.report.clone();
    }
    config.validate()?;
    Ok(config)
}

fn capture_batches(args: &Args, runner: &Runner) -> anyhow::Result<Vec<Vec<String>>> {
    if let Some(path) = &args.script {
        return Ok(CaptureScript::load(path)?.batches);
    }
    if let Some(batches) = args.synthetic {
        let generator = GeneratorConfig {
            seed: args.seed,
            batches,
            ..GeneratorConfig::default()
        };
        return Ok(build_batches(&runner.matcher().roster(), &generator));
    }
    Ok(Vec::new())
}

fn finish(args: &Args, runner: &Runner) -> anyhow::Result<()> {
    let report = runner.report();
    println!("{}", report.render_text());

    if let Some(path) = &args.report {
        runner.save_report(path)?;
    }
    if let Some(code) = &runner.config().course_code {
        println!("{}", report.roll_call(Local::now().date_naive(), code));
    }
    Ok(())
}

type CaptureTasks = (
    CaptureHandle,
    JoinHandle<CoreResult<()>>,
    JoinHandle<()>,
);

/// Starts the timed capture loop over `batches`, mirroring ticks into the runner.
fn spawn_capture(
    runner: &Arc<Runner>,
    batches: Vec<Vec<String>>,
    config: &SessionConfig,
) -> anyhow::Result<CaptureTasks> {
    let mut session = CaptureSession::with_pipeline(
        QueueSource::new(batches),
        runner.pipeline().clone(),
        config.capture.clone(),
    )?;
    let handle = session.handle();
    let (tx, mut rx) = mpsc::unbounded_channel::<TickReport>();

    let observer = {
        let runner = runner.clone();
        tokio::spawn(async move {
            while let Some(tick) = rx.recv().await {
                if !tick.delta.is_empty() {
                    log::info!(
                        "tick: +{} -{}",
                        tick.delta.joined.len(),
                        tick.delta.left.len()
                    );
                }
                runner.observe(&tick);
            }
        })
    };
    let capture = tokio::spawn(async move { session.run(Some(tx)).await });
    Ok((handle, capture, observer))
}

async fn run(args: Args, config: SessionConfig) -> anyhow::Result<()> {
    let runner = Arc::new(Runner::new(config.clone())?);
    let loaded = runner.load_roster().await?;
    if config.roster.is_configured() {
        println!("Roster loaded -> {} entries", loaded);
    }
    let batches = capture_batches(&args, &runner)?;

    if args.offline {
        let ticks = runner.replay(&batches);
        println!(
            "Offline replay -> ticks {}, present {}",
            ticks.len(),
            runner.tracker().current().len()
        );
        return finish(&args, &runner);
    }

    let bridge = if args.serve {
        Some(GuiBridge::start(runner.clone(), gui_bind_address())?)
    } else {
        None
    };

    if batches.is_empty() && bridge.is_none() {
        println!("Nothing to capture; pass --script, --synthetic or --serve");
        return finish(&args, &runner);
    }
    let capture = if batches.is_empty() {
        None
    } else {
        Some(spawn_capture(&runner, batches, &config)?)
    };

    if let Some(bridge) = &bridge {
        bridge.publish_status("session running (Ctrl+C to stop)...");
    }
    signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;

    if let Some((handle, capture, observer)) = capture {
        handle.stop();
        capture.await.context("joining capture loop")??;
        observer.await.context("joining tick observer")?;
    }
    if let Some(bridge) = bridge {
        bridge.stop().await?;
    }
    finish(&args, &runner)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = session_config(&args)?;

    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime")?;
    runtime.block_on(run(args, config))
}
