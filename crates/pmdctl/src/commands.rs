//! Subcommands and how they run.
//!
//! Core calls block, so each one runs on tokio's blocking pool. When a
//! deadline is configured the caller stops waiting once it passes; the
//! blocked thread itself finishes whenever the socket gives up.

use anyhow::{anyhow, Context as _, Result};
use clap::Subcommand;
use pmdctl_core::{
    discover_instances, CorePlan, CpuTopology, PmdError, PortId, PortStats, TelemetryClient,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the management core and the engine's core list
    Cores,
    /// List engine instances under the runtime directory
    Instances,
    /// List port ids
    Ports,
    /// Show link info of one port, or of every port
    Info { port: Option<PortId> },
    /// Show packet counters of one port, or of every port
    Stats { port: Option<PortId> },
    /// Show the MAC address of a port
    Mac { port: PortId },
    /// Print counters of every port periodically until Ctrl-C
    Watch {
        /// Polling period in milliseconds
        #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: u64,
    },
}

/// Everything a command needs besides its own arguments.
#[derive(Debug, Clone)]
pub struct Context {
    pub client: TelemetryClient,
    pub runtime_dir: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Serialize)]
struct CoresOutput<'a> {
    #[serde(flatten)]
    plan: &'a CorePlan,
    core_list: String,
}

pub async fn run(command: Command, ctx: Context) -> Result<()> {
    debug!("Running {:?}", command);

    match command {
        Command::Cores => {
            let plan = blocking(ctx.timeout, "cores", || {
                CorePlan::detect(&CpuTopology::system())
            })
            .await?;
            print_json(&CoresOutput {
                core_list: plan.core_list(),
                plan: &plan,
            })
        }
        Command::Instances => {
            let runtime_dir = ctx.runtime_dir.clone();
            let instances =
                blocking(ctx.timeout, "instances", move || discover_instances(runtime_dir)).await?;
            print_json(&instances)
        }
        Command::Ports => print_json(&query(&ctx, "ports", |c| c.list_ports()).await?),
        Command::Info { port: Some(port) } => {
            print_json(&query(&ctx, "info", move |c| c.port_info(port)).await?)
        }
        Command::Info { port: None } => {
            print_json(&query(&ctx, "info", |c| c.ports_info()).await?)
        }
        Command::Stats { port: Some(port) } => {
            print_json(&query(&ctx, "stats", move |c| c.port_stats(port)).await?)
        }
        Command::Stats { port: None } => {
            print_json(&query(&ctx, "stats", |c| c.ports_stats()).await?)
        }
        Command::Mac { port } => print_json(&query(&ctx, "mac", move |c| c.port_mac(port)).await?),
        Command::Watch { interval_ms } => watch(&ctx, Duration::from_millis(interval_ms)).await,
    }
}

/// Outcome of one `watch` tick.
#[derive(Debug)]
enum Poll {
    Stats(Vec<PortStats>),
    Failed(anyhow::Error),
    /// The previous poll is still blocked on the engine.
    Busy,
}

/// Polls every port's counters with at most one call in flight.
///
/// A call that outlives the deadline is kept rather than dropped, and no new
/// call starts until it finishes, so a stalled engine holds one thread.
struct StatsPoller {
    client: TelemetryClient,
    timeout: Option<Duration>,
    pending: Option<JoinHandle<pmdctl_core::Result<Vec<PortStats>>>>,
}

impl StatsPoller {
    fn new(client: TelemetryClient, timeout: Option<Duration>) -> Self {
        Self {
            client,
            timeout,
            pending: None,
        }
    }

    async fn poll(&mut self) -> Poll {
        if let Some(task) = &self.pending {
            if !task.is_finished() {
                return Poll::Busy;
            }
        }
        self.pending = None;

        let client = self.client.clone();
        let mut task = tokio::task::spawn_blocking(move || client.ports_stats());
        match wait_for(self.timeout, "watch", &mut task).await {
            Ok(stats) => Poll::Stats(stats),
            Err(err) => {
                if !task.is_finished() {
                    self.pending = Some(task);
                }
                Poll::Failed(err)
            }
        }
    }
}

/// Poll every port's counters until Ctrl-C. A failed poll is logged and
/// the next tick tries again on a fresh connection.
async fn watch(ctx: &Context, interval: Duration) -> Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poller = StatsPoller::new(ctx.client.clone(), ctx.timeout);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            biased;
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping watch");
                return Ok(());
            }
            _ = ticker.tick() => {
                match poller.poll().await {
                    Poll::Stats(stats) => println!("{}", serde_json::to_string(&stats)?),
                    Poll::Failed(err) => warn!("Polling port stats failed: {:#}", err),
                    Poll::Busy => warn!("Previous poll is still waiting on the engine, skipping"),
                }
            }
        }
    }
}

/// Run `f` against a clone of the context's client on the blocking pool.
async fn query<T, F>(ctx: &Context, what: &str, f: F) -> Result<T>
where
    F: FnOnce(&TelemetryClient) -> pmdctl_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let client = ctx.client.clone();
    blocking(ctx.timeout, what, move || f(&client)).await
}

async fn blocking<T, F>(timeout: Option<Duration>, what: &str, f: F) -> Result<T>
where
    F: FnOnce() -> pmdctl_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let mut task = tokio::task::spawn_blocking(f);
    wait_for(timeout, what, &mut task).await
}

/// Await a blocking task, leaving it running if the deadline passes.
async fn wait_for<T>(
    timeout: Option<Duration>,
    what: &str,
    task: &mut JoinHandle<pmdctl_core::Result<T>>,
) -> Result<T> {
    let joined = match timeout {
        Some(limit) => tokio::time::timeout(limit, &mut *task)
            .await
            .map_err(|_| anyhow!("'{}' timed out after {} ms", what, limit.as_millis()))?,
        None => task.await,
    };

    let result = joined.with_context(|| format!("'{}' task failed", what))?;
    Ok(result?)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Process exit status for an error: the core's category code, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<PmdError>()
        .and_then(|e| u8::try_from(e.category().exit_code()).ok())
        .unwrap_or(1)
}
