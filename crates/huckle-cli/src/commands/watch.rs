use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Args;
use huckle_core::{
    parse_volume, Config, ConnectionSupervisor, Credentials, FeedBackend, FeedingRecord,
    FeedingStore, LogCommand, SystemClock, TimerEngine, Volume, VolumeUnit, WriteError,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::file_backend::FileBackend;
use crate::logging;
use crate::render::{self, CLEAR};

#[derive(Args)]
pub struct WatchArgs {
    /// JSON-lines feed file standing in for the vendor backend
    #[arg(long)]
    pub feed: PathBuf,
    /// Log file (default: huckle.log in the data directory)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq)]
enum Input {
    Log(Volume),
    Refresh,
    Quit,
    Empty,
}

fn parse_input(line: &str, default_unit: VolumeUnit) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    match words.next() {
        None => Ok(Input::Empty),
        Some("log") => {
            let amount = words.collect::<Vec<_>>().join(" ");
            if amount.is_empty() {
                return Err("usage: log <amount>[ml|oz]".into());
            }
            parse_volume(&amount, default_unit)
                .map(Input::Log)
                .map_err(|e| e.to_string())
        }
        Some("refresh") => Ok(Input::Refresh),
        Some("quit" | "exit" | "q") => Ok(Input::Quit),
        Some(other) => Err(format!("unknown command: {other} (log, refresh, quit)")),
    }
}

/// Outcome of a backgrounded `log` command.
type Submitted = (Volume, Result<FeedingRecord, WriteError>);

/// Send a feeding without holding up the render loop. The outcome comes back
/// on `results`.
fn submit_in_background<B: FeedBackend>(
    logger: &Arc<LogCommand<B>>,
    volume: Volume,
    at: DateTime<Utc>,
    results: &mpsc::UnboundedSender<Submitted>,
) {
    let logger = Arc::clone(logger);
    let results = results.clone();
    tokio::spawn(async move {
        let outcome = logger.submit(volume, at).await;
        if results.send((volume, outcome)).is_err() {
            tracing::debug!(%volume, "monitor closed before the feeding was confirmed");
        }
    });
}

fn submitted_notice((volume, outcome): Submitted) -> String {
    match outcome {
        Ok(record) => format!(
            "logged {} at {}",
            record.volume,
            record.timestamp.with_timezone(&Local).format("%H:%M")
        ),
        Err(e) => format!("{volume} kept as pending: {e}"),
    }
}

pub fn run(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let credentials = config.credentials()?;
    let log_path = logging::init(args.log_file)?;
    tracing::info!(
        feed = %args.feed.display(),
        log = %log_path.display(),
        "starting monitor"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(monitor(config, credentials, args.feed))
}

async fn monitor(
    config: Config,
    credentials: Credentials,
    feed: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(FileBackend::new(feed));
    let store = Arc::new(FeedingStore::new());
    let (supervisor, task) = ConnectionSupervisor::spawn(
        Arc::clone(&backend),
        credentials,
        Arc::clone(&store),
        config.supervisor_settings(),
        Arc::new(SystemClock::new()),
    );
    let logger = Arc::new(LogCommand::new(
        backend,
        Arc::clone(&store),
        supervisor.session_slot(),
    ));
    let (results_tx, mut results) = mpsc::unbounded_channel::<Submitted>();
    let engine = TimerEngine::new(config.window_config());
    let default_unit = config.display.default_unit;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.render_interval());
    let mut stdout = tokio::io::stdout();
    let mut notice = String::new();
    let mut seen_revision = store.revision();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = store.snapshot();
                let revision = store.revision();
                if revision != seen_revision {
                    seen_revision = revision;
                    // A confirmed record replaces whatever the last command reported.
                    if current.is_some_and(|r| !r.is_pending()) {
                        notice.clear();
                    }
                }
                let reading = engine.compute(current.as_ref(), Utc::now());
                let body = render::frame(&reading, current.as_ref(), &supervisor.status(), &Local);
                let screen = format!("{CLEAR}{body}\n{notice}\n> ");
                stdout.write_all(screen.as_bytes()).await?;
                stdout.flush().await?;
            }
            line = input.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match parse_input(&line, default_unit) {
                    Ok(Input::Log(volume)) => {
                        submit_in_background(&logger, volume, Utc::now(), &results_tx);
                        notice = format!("sending {volume}");
                    }
                    Ok(Input::Refresh) => {
                        supervisor.manual_refresh();
                        notice = "refreshing connection".into();
                    }
                    Ok(Input::Quit) => break,
                    Ok(Input::Empty) => {}
                    Err(message) => notice = message,
                }
            }
            Some(submitted) = results.recv() => {
                notice = submitted_notice(submitted);
            }
        }
    }

    supervisor.shutdown();
    task.await?;
    tracing::info!("monitor stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use huckle_core::{ConnectionError, ConnectionState, FeedEntry, ListenerSink};

    /// Connects at once; writes never complete.
    struct StalledWrites;

    impl FeedBackend for StalledWrites {
        type Session = ();
        type Subscription = ();

        async fn authenticate(&self, _credentials: &Credentials) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn subscribe(&self, _session: &(), _sink: ListenerSink) -> Result<(), ConnectionError> {
            Ok(())
        }

        async fn unsubscribe(&self, _subscription: ()) {}

        async fn write_feeding(&self, _session: &(), _entry: &FeedEntry) -> Result<(), WriteError> {
            std::future::pending().await
        }
    }

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(
            parse_input("log 90", VolumeUnit::Ml),
            Ok(Input::Log(Volume::ml(90)))
        );
        assert_eq!(
            parse_input("  log 4 oz ", VolumeUnit::Ml),
            Ok(Input::Log(Volume::oz(4)))
        );
        assert_eq!(parse_input("refresh", VolumeUnit::Ml), Ok(Input::Refresh));
        assert_eq!(parse_input("q", VolumeUnit::Ml), Ok(Input::Quit));
        assert_eq!(parse_input("   ", VolumeUnit::Ml), Ok(Input::Empty));
    }

    #[test]
    fn rejects_bad_prompt_input() {
        assert!(parse_input("log", VolumeUnit::Ml).is_err());
        assert!(parse_input("log lots", VolumeUnit::Ml).is_err());
        assert!(parse_input("feed 90", VolumeUnit::Ml)
            .unwrap_err()
            .contains("unknown command"));
    }

    #[tokio::test]
    async fn stalled_write_does_not_block_the_prompt() {
        let backend = Arc::new(StalledWrites);
        let store = Arc::new(FeedingStore::new());
        let (supervisor, _task) = ConnectionSupervisor::spawn(
            Arc::clone(&backend),
            Credentials {
                email: "parent@example.com".into(),
                password: "secret".into(),
            },
            Arc::clone(&store),
            Default::default(),
            Arc::new(SystemClock::new()),
        );
        tokio::time::timeout(Duration::from_secs(5), async {
            while supervisor.current_state() != ConnectionState::Connected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("never connected");

        let logger = Arc::new(LogCommand::new(
            backend,
            Arc::clone(&store),
            supervisor.session_slot(),
        ));
        let (results_tx, mut results) = mpsc::unbounded_channel();
        submit_in_background(&logger, Volume::ml(90), Utc::now(), &results_tx);
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The pending record is on screen while the write is still out.
        let current = store.snapshot().expect("pending record");
        assert!(current.is_pending());
        assert_eq!(current.volume, Volume::ml(90));
        assert!(
            tokio::time::timeout(Duration::from_millis(200), results.recv())
                .await
                .is_err()
        );

        supervisor.shutdown();
    }

    #[test]
    fn notices_report_submission_outcome() {
        let notice = submitted_notice((Volume::ml(90), Err(WriteError::NotConnected)));
        assert!(notice.starts_with("90ml kept as pending"), "{notice}");
    }
}
