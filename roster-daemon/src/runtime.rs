use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, Instant, MissedTickBehavior};

use roster_core::{Config, Trigger};
use roster_store::Store;
use roster_sync::{hasher_for, run_file, JobReport, SyncContext};

use crate::error::{io_err, DaemonError};

/// Why the processor was woken up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wakeup {
    Interval,
    SourceChanged,
}

impl Wakeup {
    fn as_str(&self) -> &'static str {
        match self {
            Wakeup::Interval => "interval",
            Wakeup::SourceChanged => "source_changed",
        }
    }
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon until ctrl-c or until one of its tasks fails.
///
/// Three tasks feed one processor: an interval ticker, a watcher on the source
/// file and the signal handler. The processor runs one job at a time; triggers
/// that arrive while a job is queued are coalesced into it.
pub async fn run(config: Config) -> Result<(), DaemonError> {
    let source = config.source.clone().ok_or(DaemonError::NoSource)?;
    let config = Arc::new(config);
    tracing::info!(
        source = %source.display(),
        database = %config.database.display(),
        interval_secs = config.schedule.interval().as_secs(),
        "roster daemon started"
    );

    let (wake_tx, wake_rx) = mpsc::channel::<Wakeup>(1);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let ticker_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let period = config.schedule.interval();
        let wake_tx = wake_tx.clone();
        tokio::spawn(async move {
            let result = ticker_task(period, wake_tx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let source = source.clone();
        let window = config.schedule.debounce();
        tokio::spawn(async move {
            let result = watcher_task(source, window, wake_tx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let config = config.clone();
        tokio::spawn(async move {
            let result = processor_task(config, source, wake_rx, shutdown_rx).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(io_err("ctrl-c handler", err)),
                    }
                }
            }
        })
    };

    let (ticker_result, watcher_result, processor_result, signal_result) = tokio::join!(
        ticker_handle,
        watcher_handle,
        processor_handle,
        signal_handle
    );

    handle_join("ticker", ticker_result)?;
    handle_join("watcher", watcher_result)?;
    handle_join("sync_processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("roster daemon stopped");
    Ok(())
}

/// One `scheduled` job over `source`, with the hasher and staleness
/// threshold taken from `config`.
pub fn run_scheduled(config: &Config, source: &Path) -> Result<JobReport, DaemonError> {
    let mut store = Store::open(&config.database)?;
    let mut ctx = SyncContext::new(&mut store)
        .with_hasher(hasher_for(config.credentials))
        .with_stale_after(config.stale_job_after());
    let report = run_file(&mut ctx, source, Trigger::Scheduled)?;
    Ok(report)
}

async fn ticker_task(
    period: Duration,
    wake_tx: mpsc::Sender<Wakeup>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    // First tick completes immediately: the daemon syncs once on startup.
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => request(&wake_tx, Wakeup::Interval),
        }
    }
    Ok(())
}

async fn watcher_task(
    source: PathBuf,
    window: Duration,
    wake_tx: mpsc::Sender<Wakeup>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    // Watch the directory: editors and exporters often replace the file
    // instead of writing it in place.
    let dir = watch_dir(&source);
    let dir = std::fs::canonicalize(&dir).unwrap_or(dir);
    let file_name = source.file_name().map(OsStr::to_os_string);

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::debug!(dir = %dir.display(), "watching source directory");

    let mut debounce = Debounce::new(window);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = sleep_until(debounce.deadline().unwrap_or_else(Instant::now)), if debounce.is_pending() => {
                if debounce.fire(Instant::now()) {
                    tracing::info!(path = %source.display(), "source file changed");
                    request(&wake_tx, Wakeup::SourceChanged);
                }
            }
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }
                if event
                    .paths
                    .iter()
                    .any(|path| is_source_path(path, file_name.as_deref()))
                {
                    debounce.touch(Instant::now());
                }
            }
        }
    }

    Ok(())
}

async fn processor_task(
    config: Arc<Config>,
    source: PathBuf,
    mut wake_rx: mpsc::Receiver<Wakeup>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            wakeup = wake_rx.recv() => {
                let Some(wakeup) = wakeup else { break };
                let started = Instant::now();

                let config = config.clone();
                let source = source.clone();
                let result = tokio::task::spawn_blocking(move || run_scheduled(&config, &source))
                    .await
                    .map_err(|err| DaemonError::Task(format!("sync task join error: {err}")))?;

                match result {
                    Ok(report) => tracing::info!(
                        reason = wakeup.as_str(),
                        job_id = %report.job_id,
                        status = %report.status,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "scheduled sync completed"
                    ),
                    // A failed run must not stop the schedule.
                    Err(err) => tracing::error!(
                        reason = wakeup.as_str(),
                        error = %err,
                        "scheduled sync failed"
                    ),
                }
            }
        }
    }

    Ok(())
}

/// Queue a wakeup unless one is already pending.
fn request(wake_tx: &mpsc::Sender<Wakeup>, wakeup: Wakeup) {
    match wake_tx.try_send(wakeup) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            tracing::debug!(reason = wakeup.as_str(), "sync already pending; trigger coalesced");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {}
    }
}

/// Trailing-edge debounce: fires once the source has been quiet for `window`.
#[derive(Debug)]
struct Debounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per quiet period.
    fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

fn watch_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn is_source_path(path: &Path, file_name: Option<&OsStr>) -> bool {
    file_name.is_some() && path.file_name() == file_name
}

fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Task(format!("{task} task join failure: {err}"))),
    }
}

/// Install the global `fmt` subscriber on stderr (`RUST_LOG`, default `info`).
/// A second call is a no-op.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use roster_core::{JobStatus, OrgUnitType};
    use roster_store::{jobs, org_units};
    use tempfile::TempDir;
    use tokio::time::advance;

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn debounce_coalesces_rapid_events() {
        let mut debounce = Debounce::new(Duration::from_millis(100));
        let mut fired = 0usize;

        for _ in 0..5 {
            debounce.touch(Instant::now());
            advance(Duration::from_millis(10)).await;
            if debounce.fire(Instant::now()) {
                fired += 1;
            }
        }
        assert_eq!(fired, 0, "still inside the quiet window");

        advance(Duration::from_millis(150)).await;
        if debounce.fire(Instant::now()) {
            fired += 1;
        }
        assert!(!debounce.fire(Instant::now()));
        assert_eq!(fired, 1, "rapid saves should collapse to one sync trigger");
        assert!(!debounce.is_pending());
    }

    #[test]
    fn pending_wakeup_absorbs_further_triggers() {
        let (tx, mut rx) = mpsc::channel::<Wakeup>(1);
        request(&tx, Wakeup::Interval);
        request(&tx, Wakeup::SourceChanged);
        request(&tx, Wakeup::SourceChanged);

        assert_eq!(rx.try_recv().ok(), Some(Wakeup::Interval));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn only_the_source_file_name_matches() {
        let name = OsStr::new("people.json");
        assert!(is_source_path(Path::new("/data/people.json"), Some(name)));
        assert!(!is_source_path(Path::new("/data/people.json.tmp"), Some(name)));
        assert!(!is_source_path(Path::new("/data/people.json"), None));
        assert_eq!(watch_dir(Path::new("people.json")), PathBuf::from("."));
    }

    #[tokio::test]
    async fn refuses_to_start_without_source() {
        let home = TempDir::new().expect("home");
        let err = run(Config::default_at(home.path())).await.unwrap_err();
        assert!(matches!(err, DaemonError::NoSource));
    }

    #[test]
    fn scheduled_run_uses_configured_database() {
        let home = TempDir::new().expect("home");
        let mut config = Config::default_at(home.path());
        let source = home.path().join("people.json");
        fs::write(
            &source,
            r#"[{"external_ref": "E1", "email": "e1@corp.test", "company": "Acme", "department": "Ops"}]"#,
        )
        .expect("write payload");

        {
            let store = Store::open(&config.database).expect("open store");
            let acme = org_units::insert(store.conn(), None, OrgUnitType::LegalEntity, "Acme")
                .expect("legal entity");
            org_units::insert(store.conn(), Some(acme), OrgUnitType::Department, "Ops")
                .expect("department");
        }
        config.source = Some(source.clone());

        let report = run_scheduled(&config, &source).expect("scheduled run");
        assert_eq!(report.status, JobStatus::Success);
        assert_eq!(report.summary.created, 1);

        let store = Store::open(&config.database).expect("reopen store");
        let job = jobs::get(store.conn(), report.job_id).expect("job");
        assert_eq!(job.trigger, Trigger::Scheduled);
    }

    #[test]
    fn missing_source_file_is_reported_not_panicked() {
        let home = TempDir::new().expect("home");
        let config = Config::default_at(home.path());
        let err = run_scheduled(&config, &home.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DaemonError::Sync(_)));
    }
}
