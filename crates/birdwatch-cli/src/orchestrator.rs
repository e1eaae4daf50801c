//! Long-running process supervisor.
//!
//! Runs the pipeline stages (capture, vision, enrich) strictly in
//! sequence, each as an isolated child-process invocation of this binary.
//! The first cycle starts immediately; every later cycle is scheduled a
//! uniformly random 60–180 minutes out. The inter-cycle wait polls so a
//! shutdown request is observed within one poll interval, never only at
//! the next cycle boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::process::{Child, Command};
use tokio::sync::Notify;

use birdwatch_core::AppConfig;

/// Jitter bounds for the inter-cycle wait, in minutes.
const MIN_WAIT_MINUTES: u64 = 60;
const MAX_WAIT_MINUTES: u64 = 180;

/// Wait-loop poll interval; shutdown latency during a wait is bounded by
/// this.
const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// How often the wait loop logs the remaining time.
const COUNTDOWN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Grace window an in-flight stage gets to exit on its own during
/// shutdown before being force-killed.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Stage subcommands, in pipeline order.
const STAGES: [&str; 3] = ["capture", "vision", "enrich"];

/// How a launched stage ended.
#[derive(Debug, PartialEq, Eq)]
enum StageOutcome {
    Completed,
    Failed(Option<i32>),
    Interrupted,
}

/// Runs the supervisor until a shutdown signal arrives.
///
/// # Errors
///
/// Stage and dashboard spawn problems are logged, not fatal, so today
/// nothing produces an error; a shutdown request always resolves to `Ok`.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let shutdown = Arc::new(Notify::new());
    spawn_shutdown_listener(Arc::clone(&running), Arc::clone(&shutdown));

    let mut dashboard = spawn_dashboard(&config);

    tracing::info!("starting initial cycle");
    run_cycle(&running, &shutdown).await;

    while running.load(Ordering::SeqCst) {
        let delay = jittered_delay();
        tracing::info!(
            wait = %format_duration(delay),
            "next cycle scheduled"
        );

        wait_for_next_cycle(delay, &running, &shutdown).await;

        if running.load(Ordering::SeqCst) {
            tracing::info!("starting scheduled cycle");
            run_cycle(&running, &shutdown).await;
        }
    }

    if let Some(child) = dashboard.as_mut() {
        tracing::info!("stopping dashboard");
        if let Err(e) = child.start_kill() {
            tracing::warn!(error = %e, "failed to kill dashboard process");
        } else {
            let _ = child.wait().await;
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}

/// Installs the ctrl-c / SIGTERM listener that flips the running flag and
/// wakes any waiting loop.
fn spawn_shutdown_listener(running: Arc<AtomicBool>, shutdown: Arc<Notify>) {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("received shutdown signal, starting graceful shutdown");
        running.store(false, Ordering::SeqCst);
        shutdown.notify_waiters();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Launches the dashboard as an independent side process. Its failure
/// never affects the pipeline.
fn spawn_dashboard(config: &AppConfig) -> Option<Child> {
    match Command::new(&config.dashboard_bin).spawn() {
        Ok(child) => {
            tracing::info!(bin = %config.dashboard_bin, "dashboard started");
            Some(child)
        }
        Err(e) => {
            tracing::error!(
                bin = %config.dashboard_bin,
                error = %e,
                "failed to start dashboard; continuing without it"
            );
            None
        }
    }
}

/// Runs one full cycle. A failed stage aborts the remainder of the cycle;
/// the supervisor itself keeps going.
async fn run_cycle(running: &AtomicBool, shutdown: &Notify) {
    for stage in STAGES {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        match run_stage(stage, running, shutdown).await {
            StageOutcome::Completed => {}
            StageOutcome::Failed(code) => {
                tracing::error!(stage, ?code, "stage failed; aborting the rest of this cycle");
                return;
            }
            StageOutcome::Interrupted => return,
        }
    }
    tracing::info!("cycle complete");
}

/// Launches one stage as a child process and awaits it, staying
/// responsive to shutdown.
async fn run_stage(stage: &str, running: &AtomicBool, shutdown: &Notify) -> StageOutcome {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => {
            tracing::error!(error = %e, "cannot resolve own executable path");
            return StageOutcome::Failed(None);
        }
    };

    tracing::info!(stage, "starting stage");
    let mut child = match Command::new(&exe).arg(stage).spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(stage, error = %e, "failed to launch stage");
            return StageOutcome::Failed(None);
        }
    };

    if !running.load(Ordering::SeqCst) {
        terminate_child(&mut child, stage).await;
        return StageOutcome::Interrupted;
    }

    tokio::select! {
        status = child.wait() => match status {
            Ok(status) if status.success() => {
                tracing::info!(stage, "stage completed");
                StageOutcome::Completed
            }
            Ok(status) => StageOutcome::Failed(status.code()),
            Err(e) => {
                tracing::error!(stage, error = %e, "failed to await stage");
                StageOutcome::Failed(None)
            }
        },
        () = shutdown.notified() => {
            terminate_child(&mut child, stage).await;
            StageOutcome::Interrupted
        }
    }
}

/// Gives an in-flight stage the grace window to exit, then force-kills it.
async fn terminate_child(child: &mut Child, stage: &str) {
    match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
        Ok(_) => tracing::info!(stage, "stage exited during shutdown grace period"),
        Err(_) => {
            tracing::warn!(stage, "stage still running after grace period; killing");
            if let Err(e) = child.kill().await {
                tracing::error!(stage, error = %e, "failed to kill stage");
            }
        }
    }
}

/// Samples the next inter-cycle delay uniformly from the jitter window.
fn jittered_delay() -> Duration {
    let minutes = rand::rng().random_range(MIN_WAIT_MINUTES..=MAX_WAIT_MINUTES);
    Duration::from_secs(minutes * 60)
}

/// Waits out the inter-cycle delay with a shutdown-aware poll, logging
/// the remaining time every few minutes.
async fn wait_for_next_cycle(total: Duration, running: &AtomicBool, shutdown: &Notify) {
    let deadline = tokio::time::Instant::now() + total;
    let mut last_logged = tokio::time::Instant::now();

    while running.load(Ordering::SeqCst) {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return;
        }

        if now.duration_since(last_logged) >= COUNTDOWN_INTERVAL {
            tracing::info!(
                remaining = %format_duration(deadline - now),
                "time until next cycle"
            );
            last_logged = now;
        }

        let sleep_for = POLL_INTERVAL.min(deadline - now);
        tokio::select! {
            () = tokio::time::sleep(sleep_for) => {}
            () = shutdown.notified() => return,
        }
    }
}

/// Renders a duration as "H hours, M minutes".
fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    format!("{hours} hours, {minutes} minutes")
}
