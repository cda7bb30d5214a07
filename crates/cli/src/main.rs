use anyhow::Context;
use clap::Parser;
use config::Config;
use invigilate_rs::{cli::Cli, signals::wait_for_shutdown};
use invigilator::host::LiveProcess;
use invigilator::{Error, Invigilator, ScanSummary, ScannerState, Services, Task, WordTable};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const MIN_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. `INVIGILATE_LOG` can only tune the level per crate,
    // e.g. `INVIGILATE_LOG=invigilator=trace invigilate -v --pid 1`.
    let env_filter = EnvFilter::builder()
        .with_env_var("INVIGILATE_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    let layer = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    // load config
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        _ => {
            let mut candidates = glob::glob("/etc/invigilate/config.d/*.toml")?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            candidates.insert(0, "/etc/invigilate/config.toml".into());
            trace!(?candidates, "config file candidates");
            Config::load_multiple(candidates)?
        }
    };
    if let Some(words) = &cli.words {
        config.words.list = words.clone();
    }
    debug!(?config, ?cli);

    let words = WordTable::from_config(&config.words).install()?;
    info!(count = words.len(), "banned words installed");

    let process = LiveProcess::attach(cli.pid)
        .with_context(|| format!("failed to attach to process {}", cli.pid))?;
    let task = Arc::new(process.task(ScannerState::new(Some(words), config.scan.padding))?);
    let engine = Arc::new(Invigilator::new(&config, Services::live(&config)));

    if cli.watch {
        return watch(process, task, engine, config.scan.interval).await;
    }

    let range = cli.range();
    let summary = tokio::task::spawn_blocking(move || match range {
        Some((addr, size)) => engine.invigilate(&task, addr, size),
        None => engine.invigilate_wholemm(&task),
    })
    .await?;
    log_summary(&summary);
    Ok(())
}

/// Audit the whole address space every `period` until SIGINT or SIGTERM.
async fn watch(
    process: LiveProcess,
    task: Arc<Task>,
    engine: Arc<Invigilator>,
    period: Duration,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let mut signal_handle = tokio::spawn(wait_for_shutdown(
        cancel.clone(),
        task.fatal_signal().clone(),
    ));

    let process = Arc::new(process);
    let mut ticker = time::interval(period.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(?period, "audit interval");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("shutdown requested");
                break;
            }

            // bubble up any errors from the signal handlers
            res = &mut signal_handle => {
                res??;
            }

            _ = ticker.tick() => {
                let (process, task, engine) = (process.clone(), task.clone(), engine.clone());
                let result = tokio::task::spawn_blocking(move || {
                    process.refresh()?;
                    engine.invigilate_wholemm_killable(&task)
                })
                .await?;

                match result {
                    Ok(summary) => log_summary(&summary),
                    Err(Error::Interrupted) => {
                        info!("audit interrupted");
                        break;
                    }
                    Err(Error::Procfs(err)) => {
                        info!(%err, "process is gone");
                        break;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
    }

    cancel.cancel();
    Ok(())
}

fn log_summary(summary: &ScanSummary) {
    info!(
        regions = summary.regions,
        matches = summary.matches,
        reports = summary.reports,
        "audit finished"
    );
}
