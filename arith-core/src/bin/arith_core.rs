use clap::{Args, Parser, Subcommand, ValueEnum};

#[path = "../../benches/profiling.rs"]
mod profiling;
use profiling::{workloads, OpType};

use tracing_chrome::ChromeLayerBuilder;
use tracing_subscriber::{self, fmt::format::FmtSpan, prelude::*, EnvFilter};

/// Runs field and polynomial workloads under a tracing subscriber.
#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Profile(ProfileArgs),
}

#[derive(Args, Debug, Clone)]
struct ProfileArgs {
    /// Output formats
    #[clap(short, long, value_enum)]
    format: Option<Vec<Format>>,

    /// Operation to profile
    #[clap(long, value_enum)]
    name: OpType,

    /// Polynomial size to use (as 2^scale)
    #[clap(short, long, default_value_t = 20)]
    scale: usize,
}

#[derive(Debug, Clone, ValueEnum, PartialEq)]
enum Format {
    Default,
    Chrome,
}

fn main() {
    let cli = Cli::parse();
    match cli.command {
        Commands::Profile(args) => trace(args),
    }
}

fn trace(args: ProfileArgs) {
    let formats = args.format.unwrap_or_default();
    let log_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Span close events carry the per-operation timings.
    let span_events = if formats.contains(&Format::Default) {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_span_events(span_events)
        .with_filter(log_filter);

    let (chrome_layer, guard) = if formats.contains(&Format::Chrome) {
        let (layer, guard) = ChromeLayerBuilder::new().include_args(true).build();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(chrome_layer)
        .init();
    if guard.is_some() {
        tracing::info!("Writing a chrome trace to trace-<timestamp>.json");
    }

    for (span, workload) in workloads(args.name, args.scale) {
        span.in_scope(|| {
            workload();
            tracing::info!(op = ?args.name, scale = args.scale, "workload complete");
        });
    }
}
