//! Per-request access log: one JSON array on disk, appended by a single
//! writer so concurrent requests never interleave partial writes.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::{ErrorDetail, SharedState};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Request start, RFC 3339.
    pub timestamp: String,
    pub endpoint: String,
    pub method: String,
    pub status_code: u16,
    /// Seconds.
    pub duration: f64,
    pub error: Option<String>,
}

enum Command {
    Append(AccessLogEntry),
    Flush(oneshot::Sender<()>),
}

/// Entries waiting for the writer. Beyond this, new entries are dropped.
pub const QUEUE_CAPACITY: usize = 4096;

/// Handle to the writer task. Cloning shares the same writer.
#[derive(Clone)]
pub struct AccessLog {
    tx: mpsc::Sender<Command>,
}

impl AccessLog {
    /// Validates the existing file (moving it aside if corrupt) and starts
    /// the writer on the blocking pool. The writer exits once every handle
    /// is dropped.
    pub fn spawn(path: PathBuf) -> Self {
        let (log, mut rx) = Self::channel(QUEUE_CAPACITY);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = recover(&path) {
                error!(path = %path.display(), error = %e, "access log recovery failed");
            }
            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    Command::Append(entry) => {
                        if let Err(e) = append_entry(&path, &entry) {
                            error!(path = %path.display(), error = %e, "access log append failed");
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });
        log
    }

    fn channel(capacity: usize) -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queues the entry without waiting. Returns `false` if it was dropped
    /// because the queue is full or the writer is gone.
    pub fn record(&self, entry: AccessLogEntry) -> bool {
        match self.tx.try_send(Command::Append(entry)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("access log queue full; entry dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("access log writer is gone; entry dropped");
                false
            }
        }
    }

    /// Resolves once every entry queued before the call is on disk.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).await.is_ok() {
            let _ = wait.await;
        }
    }
}

/// Appends one entry, splicing it in before the closing bracket.
///
/// A missing or blank file starts a new array. A file that does not end in
/// `]` is moved aside first, so the result is always a valid array.
pub fn append_entry(path: &Path, entry: &AccessLogEntry) -> io::Result<()> {
    let json = serde_json::to_string(entry)?;
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }

    let mut file = OpenOptions::new().read(true).write(true).create(true).open(path)?;
    match tail(&mut file)? {
        Tail::Blank => {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            write!(file, "[\n{json}\n]\n")?;
        }
        Tail::Array { close_at, empty } => {
            file.set_len(close_at)?;
            file.seek(SeekFrom::Start(close_at))?;
            let sep = if empty { "\n" } else { ",\n" };
            write!(file, "{sep}{json}\n]\n")?;
        }
        Tail::Corrupt => {
            drop(file);
            quarantine(path)?;
            fs::write(path, format!("[\n{json}\n]\n"))?;
            return Ok(());
        }
    }
    file.flush()
}

enum Tail {
    Blank,
    /// `close_at` is the offset of the final `]`. For a non-empty array it
    /// is moved back to just after the last entry.
    Array { close_at: u64, empty: bool },
    Corrupt,
}

const TAIL_WINDOW: u64 = 4096;

fn tail(file: &mut File) -> io::Result<Tail> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(Tail::Blank);
    }
    let start = len.saturating_sub(TAIL_WINDOW);
    file.seek(SeekFrom::Start(start))?;
    let mut buf = Vec::with_capacity((len - start) as usize);
    file.read_to_end(&mut buf)?;

    let mut non_ws = buf.iter().enumerate().rev().filter(|(_, b)| !b.is_ascii_whitespace());
    let Some((close, &b']')) = non_ws.next() else {
        return Ok(if start == 0 && buf.iter().all(u8::is_ascii_whitespace) {
            Tail::Blank
        } else {
            Tail::Corrupt
        });
    };
    let tail = match non_ws.next() {
        Some((_, &b'[')) => Tail::Array { close_at: start + close as u64, empty: true },
        Some((prev, &b'}')) => Tail::Array { close_at: start + prev as u64 + 1, empty: false },
        _ => Tail::Corrupt,
    };
    Ok(tail)
}

/// Moves the file to `<file>.corrupt-<unix-ts>`.
fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{ts}"));
    let target = PathBuf::from(name);
    fs::rename(path, &target)?;
    warn!(from = %path.display(), to = %target.display(), "corrupt access log moved aside");
    Ok(target)
}

/// Full parse of the existing file; anything that is not a JSON array is
/// quarantined so the writer starts from a clean state.
fn recover(path: &Path) -> io::Result<()> {
    match read_entries(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::InvalidData => quarantine(path).map(|_| ()),
        Err(e) => Err(e),
    }
}

/// Missing or blank file reads as no entries.
pub fn read_entries(path: &Path) -> io::Result<Vec<AccessLogEntry>> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&bytes).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
}

/// Records method, path, status and duration of every request.
pub async fn log_requests(State(st): State<SharedState>, req: Request, next: Next) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    let started = Instant::now();
    let method = req.method().to_string();
    let endpoint = req.uri().path().to_string();
    info!(%method, uri = %req.uri(), "incoming request");

    let response = next.run(req).await;

    let status = response.status();
    let detail = response.extensions().get::<ErrorDetail>();
    let error = (status != StatusCode::OK).then(|| match detail {
        Some(detail) => detail.0.clone(),
        None => status.canonical_reason().unwrap_or("error").to_string(),
    });
    st.access_log.record(AccessLogEntry {
        timestamp,
        endpoint,
        method,
        status_code: status.as_u16(),
        duration: started.elapsed().as_secs_f64(),
        error,
    });
    info!(status = status.as_u16(), "response status");
    response
}
