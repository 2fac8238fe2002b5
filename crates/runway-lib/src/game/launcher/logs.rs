/// Bounded log archive with live fan-out to viewers
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Lines kept per process once no viewer is attached
pub const MAX_LOG_ARCHIVED_COUNT: usize = 1000;

/// Viewer delivery tick
pub const VIEWER_TICK: Duration = Duration::from_millis(100);

/// Receives batches of log lines, in production order
pub type LogCallback = Arc<dyn Fn(Vec<String>) + Send + Sync + 'static>;

struct Subscriber {
    sender: mpsc::UnboundedSender<String>,
    token: CancellationToken,
}

struct LogState {
    archive: VecDeque<String>,
    capacity: usize,
    subscribers: Vec<Subscriber>,
    closed: bool,
}

/// Output capture for one process.
///
/// The archive and the live feed are updated under the same lock, so a new
/// subscriber sees every line exactly once: either in its replay snapshot or
/// on its channel.
pub struct LogStreamer {
    state: Mutex<LogState>,
}

impl Default for LogStreamer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogStreamer {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ARCHIVED_COUNT)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: Mutex::new(LogState {
                archive: VecDeque::with_capacity(capacity.min(MAX_LOG_ARCHIVED_COUNT)),
                capacity: capacity.max(1),
                subscribers: Vec::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LogState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a line to the archive and deliver it to every live subscriber
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        let mut state = self.lock();

        state.subscribers.retain(|s| {
            !s.token.is_cancelled() && s.sender.send(line.clone()).is_ok()
        });

        state.archive.push_back(line);
        while state.archive.len() > state.capacity {
            state.archive.pop_front();
        }
    }

    /// Push every line of a possibly multi-line message
    pub fn push_lines(&self, text: &str) {
        for line in text.lines() {
            self.push(line);
        }
    }

    /// Attach a subscriber: archive snapshot plus the live feed from here on.
    /// After [`close`](Self::close) the feed is already finished.
    pub fn subscribe(&self) -> LogSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = CancellationToken::new();

        let mut state = self.lock();
        let replay = state.archive.iter().cloned().collect();
        if !state.closed {
            state.subscribers.push(Subscriber {
                sender,
                token: token.clone(),
            });
        }

        LogSubscription {
            replay,
            receiver,
            token,
        }
    }

    /// Snapshot of the archived lines
    pub fn archive(&self) -> Vec<String> {
        self.lock().archive.iter().cloned().collect()
    }

    /// End the live feed; the archive stays readable
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|s| !s.token.is_cancelled());
        state.subscribers.len()
    }
}

/// One attached viewer's view of a [`LogStreamer`]
pub struct LogSubscription {
    /// Archive contents at attach time
    pub replay: Vec<String>,
    receiver: mpsc::UnboundedReceiver<String>,
    token: CancellationToken,
}

impl LogSubscription {
    /// Next live line; `None` once the stream closed or this subscription was cancelled
    pub async fn next_line(&mut self) -> Option<String> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            line = self.receiver.recv() => line,
        }
    }

    /// Stop following; other subscribers are unaffected
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drive `callback` from a background task: the replay first, then live
    /// lines batched per [`VIEWER_TICK`]
    pub fn into_viewer(self, callback: LogCallback) -> LogViewer {
        let token = self.token.clone();
        let LogSubscription {
            replay,
            mut receiver,
            token: task_token,
        } = self;

        let handle = tokio::spawn(async move {
            if !replay.is_empty() {
                callback(replay);
            }

            let mut interval = tokio::time::interval(VIEWER_TICK);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {
                        let mut batch = Vec::new();
                        let mut finished = false;
                        loop {
                            match receiver.try_recv() {
                                Ok(line) => batch.push(line),
                                Err(TryRecvError::Empty) => break,
                                Err(TryRecvError::Disconnected) => {
                                    finished = true;
                                    break;
                                }
                            }
                        }
                        if !batch.is_empty() {
                            callback(batch);
                        }
                        if finished {
                            break;
                        }
                    }
                }
            }
        });

        LogViewer { token, handle }
    }
}

/// Background delivery task created by [`LogSubscription::into_viewer`]
pub struct LogViewer {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl LogViewer {
    /// Cancel delivery; lines still queued are dropped
    pub fn detach(&self) {
        self.token.cancel();
    }

    /// Wait until the stream closes (or the viewer is detached) and every
    /// queued batch was delivered
    pub async fn finished(self) {
        if let Err(e) = self.handle.await {
            log::warn!("Log viewer task failed: {}", e);
        }
    }
}
