use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::fetch::SourceFetcher;
use crate::sync::FetchedSource;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy)]
enum PollerCommand {
    Resync,
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum Trigger {
    Timer,
    Manual,
}

/// Background thread that re-fetches the shader source on a fixed interval.
///
/// Fetches run one at a time on the poller thread. Ticks that elapse while a
/// fetch is in flight are coalesced by the ticker, so a slow server never
/// queues up requests. Every fetched source is handed to `sink` with a
/// monotonically increasing sequence number.
pub struct Poller {
    commands: Sender<PollerCommand>,
    join_handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn spawn<F, S>(fetcher: F, interval: Duration, sink: S) -> io::Result<Self>
    where
        F: SourceFetcher + 'static,
        S: FnMut(FetchedSource) -> bool + Send + 'static,
    {
        let (command_tx, command_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("livefrag-poller".into())
            .spawn(move || run_poller(fetcher, interval, command_rx, sink))?;

        Ok(Self {
            commands: command_tx,
            join_handle: Some(handle),
        })
    }

    /// Returns a cloneable handle that forces an immediate resync.
    pub fn handle(&self) -> ResyncHandle {
        ResyncHandle {
            commands: self.commands.clone(),
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.commands.send(PollerCommand::Shutdown);
            if handle.join().is_err() {
                warn!("shader poller thread panicked");
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Out-of-band trigger for the poller, safe to clone and send across threads.
#[derive(Debug, Clone)]
pub struct ResyncHandle {
    commands: Sender<PollerCommand>,
}

impl ResyncHandle {
    /// Requests a fetch outside the timer cadence. Returns `false` once the
    /// poller has shut down.
    pub fn trigger(&self) -> bool {
        self.commands.send(PollerCommand::Resync).is_ok()
    }
}

fn run_poller<F, S>(fetcher: F, interval: Duration, commands: Receiver<PollerCommand>, mut sink: S)
where
    F: SourceFetcher,
    S: FnMut(FetchedSource) -> bool,
{
    let ticker = tick(interval);
    let mut sequence = 0u64;
    debug!(interval_ms = interval.as_millis() as u64, "shader poller started");

    loop {
        let trigger = select! {
            recv(commands) -> command => match command {
                Ok(PollerCommand::Resync) => Some(Trigger::Manual),
                Ok(PollerCommand::Shutdown) | Err(_) => None,
            },
            recv(ticker) -> _ => Some(Trigger::Timer),
        };
        let Some(trigger) = trigger else {
            break;
        };

        sequence += 1;
        match fetcher.fetch() {
            Ok(text) => {
                if !sink(FetchedSource { sequence, text }) {
                    debug!("shader source receiver closed");
                    break;
                }
            }
            Err(err) => {
                warn!(?trigger, sequence, error = %err, "failed to fetch shader source");
            }
        }
    }

    debug!("shader poller stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crossbeam_channel::bounded;

    use super::*;
    use crate::fetch::FetchError;

    struct CountingFetcher {
        calls: Arc<AtomicUsize>,
    }

    impl SourceFetcher for CountingFetcher {
        fn fetch(&self) -> Result<String, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("source {call}"))
        }
    }

    #[test]
    fn manual_trigger_fetches_before_the_timer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = bounded(8);
        let mut poller = Poller::spawn(
            CountingFetcher {
                calls: calls.clone(),
            },
            Duration::from_secs(3600),
            move |fetched| tx.send(fetched).is_ok(),
        )
        .unwrap();

        assert!(poller.handle().trigger());
        let fetched = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(fetched.sequence, 1);
        assert_eq!(fetched.text, "source 0");

        poller.shutdown();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timer_fetches_with_increasing_sequence() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = bounded(8);
        let poller = Poller::spawn(
            CountingFetcher { calls },
            Duration::from_millis(10),
            move |fetched| tx.send(fetched).is_ok(),
        )
        .unwrap();

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(second.sequence > first.sequence);
        // Closing the receiver unblocks a sink waiting on the bounded channel.
        drop(rx);
        drop(poller);
    }

    #[test]
    fn trigger_reports_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut poller = Poller::spawn(
            CountingFetcher { calls },
            Duration::from_secs(3600),
            |_| true,
        )
        .unwrap();
        let handle = poller.handle();
        poller.shutdown();
        drop(poller);
        assert!(!handle.trigger());
    }
}
