//! pmdctl - control plane CLI for a CPU-pinned DPDK poll-mode engine.
//!
//! Plans the engine's cores and reads port state from its telemetry socket.
//! Results go to stdout as JSON, logs go to stderr.

mod commands;

use clap::Parser;
use commands::{Command, Context};
use pmdctl_core::platform;
use pmdctl_core::{CorePlan, CpuId, CpuSet, CpuTopology, TelemetryClient, TelemetryConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pmdctl")]
#[command(about = "Core planning and telemetry for DPDK poll-mode engines")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding one subdirectory per engine instance
    #[arg(long, global = true, default_value = TelemetryConfig::DEFAULT_RUNTIME_DIR)]
    runtime_dir: PathBuf,

    /// Engine instance (file prefix) to query
    #[arg(short, long, global = true, default_value = TelemetryConfig::DEFAULT_INSTANCE)]
    instance: String,

    /// Telemetry socket path (overrides --runtime-dir and --instance)
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Abandon a telemetry call after this many milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Pin the process to the management core before starting
    #[arg(long, global = true)]
    pin: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

impl Args {
    fn client(&self) -> TelemetryClient {
        match &self.socket {
            Some(path) => TelemetryClient::with_socket_path(path),
            None => TelemetryClient::with_runtime_dir(&self.runtime_dir, &self.instance),
        }
    }

    fn context(&self) -> Context {
        Context {
            client: self.client(),
            runtime_dir: self.runtime_dir.clone(),
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Set up logging; --debug wins over RUST_LOG
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    // Must happen before the runtime spawns its workers so they inherit the mask
    if args.pin {
        match pin_to_management_core() {
            Ok((cpu, mask)) => info!("Pinned to management core {} (mask {})", cpu, mask),
            Err(err) => return report(&err),
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let context = args.context();
    let result = runtime.block_on(commands::run(args.command, context));

    // A timed-out telemetry call may still be blocked on its socket
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Pin the calling thread and return the core with the mask read back.
fn pin_to_management_core() -> anyhow::Result<(CpuId, CpuSet)> {
    let plan = CorePlan::detect(&CpuTopology::system())?;
    platform::pin_current_thread(plan.management)?;
    Ok((plan.management, platform::current_affinity()?))
}

fn report(err: &anyhow::Error) -> ExitCode {
    error!("{:#}", err);
    ExitCode::from(commands::exit_code(err))
}
