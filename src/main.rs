//! nginx-replay
//!
//! Replays an nginx access log against a target server, reproducing (or
//! proportionally scaling) the recorded inter-request timing, and reports
//! status fidelity, latency, and endpoint frequency statistics.

use anyhow::{bail, Result};
use clap::Parser;
use nginx_replay::access_log::{self, LogFormat, COMBINED_FORMAT};
use nginx_replay::replay::{
    self, build_timeline, DispatchConfig, ReplayOptions, ResultSink, StatsConfig, Timeline,
    DIVIDER,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};

/// Replay an nginx access log against a live target.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
struct Args {
    /// Path of the nginx access log to replay
    #[arg(short = 'f', long)]
    file_path: PathBuf,

    /// Target URL prefix requests are sent to
    #[arg(short = 'p', long)]
    prefix: String,

    /// Acceleration / deceleration rate, eg 2 or 0.5
    #[arg(short = 'r', long, default_value_t = 1.0)]
    ratio: f64,

    /// Format of the nginx access log
    #[arg(long, default_value = COMBINED_FORMAT)]
    format: String,

    /// Show debug messages in the console
    #[arg(short = 'd', long)]
    debug: bool,

    /// Duplicate per-request result lines to this file
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(short = 't', long)]
    timeout: Option<u64>,

    /// Username for basic auth
    #[arg(long)]
    username: Option<String>,

    /// Password for basic auth
    #[arg(long)]
    password: Option<String>,

    /// Spread same-second bursts evenly across their one-second window
    #[arg(long)]
    scale_mode: bool,

    /// Remove pauses between requests. Attention: will hammer the target
    #[arg(long)]
    skip_sleep: bool,

    /// Accept invalid TLS certificates
    #[arg(long)]
    skip_ssl: bool,

    /// Cap on concurrently in-flight requests (unbounded when absent)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Show per-endpoint hit stats after the replay
    #[arg(short = 's', long)]
    stats: bool,

    /// Comma-separated query parameters to drop for stats, eg "page,limit,size"
    #[arg(long, default_value = "")]
    delete_query_stats: String,

    /// Keep only the path component in stats keys
    #[arg(long)]
    stats_only_path: bool,

    /// Hide endpoints with at most this many hits behind a histogram
    #[arg(long, default_value_t = 0)]
    hide_stats_limit: u64,
}

impl Args {
    fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            dispatch: DispatchConfig {
                prefix: self.prefix.clone(),
                timeout: self.timeout.map(Duration::from_millis),
                accept_invalid_certs: self.skip_ssl,
                username: self.username.clone(),
                password: self.password.clone(),
                max_in_flight: self.max_in_flight,
            },
            ratio: self.ratio,
            scale_mode: self.scale_mode,
            skip_sleep: self.skip_sleep,
            stats: self.stats.then(|| StatsConfig {
                prefix: self.prefix.clone(),
                delete_query: StatsConfig::parse_delete_query(&self.delete_query_stats),
                only_path: self.stats_only_path,
                hide_limit: self.hide_stats_limit,
            }),
        }
    }
}

fn init_tracing(debug: bool) {
    let directive = if debug {
        "nginx_replay=debug"
    } else {
        "nginx_replay=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().expect("static directive parses")),
        )
        .init();
}

/// Everything that has to hold before the replay loop may start. Failures
/// here are configuration errors: reported, then the process exits without
/// dispatching anything.
fn prepare(args: &Args) -> Result<(Timeline, ResultSink)> {
    if !args.file_path.exists() {
        bail!("Cannot find file {}", args.file_path.display());
    }
    if let Some(log_file) = &args.log_file {
        if log_file == &args.file_path {
            bail!("the results file can not be equal to the input log file");
        }
    }
    if !(args.ratio > 0.0) {
        bail!("ratio must be positive, got {}", args.ratio);
    }

    let format = LogFormat::compile(&args.format)?;
    let records = access_log::read_records(&args.file_path, &format)?;
    let timeline = build_timeline(records);

    let sink = match &args.log_file {
        Some(path) => ResultSink::with_file(path)?,
        None => ResultSink::stdout_only(),
    };
    Ok((timeline, sink))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    let (timeline, sink) = match prepare(&args) {
        Ok(prepared) => prepared,
        Err(err) => {
            error!("{:#}", err);
            return ExitCode::from(2);
        }
    };
    info!(
        file = %args.file_path.display(),
        prefix = %args.prefix,
        events = timeline.len(),
        skipped_rows = timeline.skipped_rows,
        ratio = args.ratio,
        "timeline ready"
    );

    let options = args.replay_options();
    let output = match replay::run(timeline, &options, sink).await {
        Ok(output) => output,
        Err(err) => {
            error!("{:#}", err);
            return ExitCode::from(3);
        }
    };

    println!("{}", output.summary.render());
    if let Some(stats) = &output.stats {
        println!("{}", DIVIDER);
        println!("Stats results:");
        for line in stats.render() {
            println!("{}", line);
        }
    }

    ExitCode::SUCCESS
}
