//! Streaming reader for Wikidata JSON dumps
//!
//! A dump is a JSON array with one entity per line, optionally compressed.
//! The reader runs one blocking producer that feeds raw lines into a bounded
//! queue, N consumers that parse lines and invoke the caller's handler, and an
//! optional reporter that logs throughput. The bounded queue gives natural
//! backpressure: the producer blocks while the consumers are behind.

use std::fs::File;
use std::future::Future;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{DumpError, DumpResult};

/// How the dump file is compressed, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    Plain,
    Gzip,
    Bzip2,
}

impl Compression {
    fn from_path(path: &Path) -> DumpResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "json" => Ok(Self::Plain),
            "gz" => Ok(Self::Gzip),
            "bz2" => Ok(Self::Bzip2),
            other => Err(DumpError::UnsupportedExtension(other.to_string())),
        }
    }
}

/// Parallel reader over a newline-delimited Wikidata dump
///
/// ```no_run
/// use wikivec_dump::DumpReader;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = DumpReader::new("data/latest-all.json.bz2", 4, 1500, 0);
/// let seen = reader
///     .run(
///         |entity| async move {
///             let _ = entity.get("id");
///         },
///         None,
///         true,
///     )
///     .await?;
/// println!("processed {seen} entities");
/// # Ok(())
/// # }
/// ```
pub struct DumpReader {
    path: PathBuf,
    workers: usize,
    queue_capacity: usize,
    skip_lines: usize,
    report_interval: Duration,
    cancel: CancellationToken,
}

impl DumpReader {
    /// Create a reader over `path` with `workers` consumers and a bounded
    /// queue of `queue_capacity` lines, skipping `skip_lines` lines first.
    pub fn new(
        path: impl Into<PathBuf>,
        workers: usize,
        queue_capacity: usize,
        skip_lines: usize,
    ) -> Self {
        Self {
            path: path.into(),
            workers: workers.max(1),
            queue_capacity: queue_capacity.max(1),
            skip_lines,
            report_interval: Duration::from_secs(3),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the throughput report interval (reporter runs only when
    /// `run` is called with `verbose = true`)
    pub const fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Token that stops the producer when cancelled; consumers drain the
    /// queue and exit
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Read the dump and invoke `handler` for every successfully parsed
    /// entity, in no guaranteed order. Returns once the file is exhausted
    /// (or `max_items` lines were produced), the queue is drained and all
    /// workers are idle.
    ///
    /// Malformed lines are logged and skipped. Returns the number of lines
    /// consumed.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened, the extension is unsupported, or
    /// a worker task dies.
    pub async fn run<F, Fut>(
        &self,
        handler: F,
        max_items: Option<u64>,
        verbose: bool,
    ) -> DumpResult<u64>
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let compression = Compression::from_path(&self.path)?;
        let file = File::open(&self.path)
            .map_err(|e| DumpError::Io(format!("cannot open {}: {e}", self.path.display())))?;

        let (tx, rx) = mpsc::channel::<String>(self.queue_capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let consumed = Arc::new(AtomicU64::new(0));

        info!(
            path = %self.path.display(),
            workers = self.workers,
            queue_capacity = self.queue_capacity,
            "starting dump read"
        );

        let producer = {
            let cancel = self.cancel.clone();
            let skip_lines = self.skip_lines;
            tokio::task::spawn_blocking(move || {
                produce_lines(file, compression, skip_lines, max_items, &tx, &cancel)
            })
        };

        let mut consumers = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let rx = Arc::clone(&rx);
            let consumed = Arc::clone(&consumed);
            let handler = handler.clone();
            consumers.push(tokio::spawn(async move {
                loop {
                    // Hold the lock only for the pop itself so workers can
                    // parse and handle in parallel.
                    let line = { rx.lock().await.recv().await };
                    let Some(line) = line else {
                        debug!(worker_id, "queue closed, consumer exiting");
                        break;
                    };
                    if let Some(entity) = line_to_entity(&line) {
                        handler(entity).await;
                    }
                    consumed.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }

        let reporter_stop = CancellationToken::new();
        let reporter = verbose.then(|| {
            let consumed = Arc::clone(&consumed);
            let stop = reporter_stop.clone();
            let interval = self.report_interval;
            tokio::spawn(report_progress(consumed, interval, stop))
        });

        producer
            .await
            .map_err(|e| DumpError::Worker(format!("producer panicked: {e}")))??;
        for consumer in consumers {
            consumer
                .await
                .map_err(|e| DumpError::Worker(format!("consumer panicked: {e}")))?;
        }

        reporter_stop.cancel();
        if let Some(reporter) = reporter {
            reporter
                .await
                .map_err(|e| DumpError::Worker(format!("reporter panicked: {e}")))?;
        }

        let total = consumed.load(Ordering::Relaxed);
        info!(total, "dump read complete");
        Ok(total)
    }
}

/// Strip array framing and parse one dump line
///
/// Lines carry `[`, `]`, trailing commas and whitespace from the enclosing
/// JSON array; after trimming, empty lines are rejected and JSON errors are
/// logged and skipped.
fn line_to_entity(line: &str) -> Option<serde_json::Value> {
    let trimmed = line.trim_matches(|c| matches!(c, '[' | ']' | ' ' | ',' | '\n' | '\r'));
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str(trimmed) {
        Ok(entity) => Some(entity),
        Err(e) => {
            warn!(error = %e, "failed to parse dump line, skipping");
            None
        }
    }
}

/// Blocking producer body: decompress, skip, enqueue
fn produce_lines(
    file: File,
    compression: Compression,
    skip_lines: usize,
    max_items: Option<u64>,
    tx: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> DumpResult<()> {
    let reader: Box<dyn BufRead + Send> = match compression {
        Compression::Plain => Box::new(BufReader::new(file)),
        Compression::Gzip => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file))),
        Compression::Bzip2 => Box::new(BufReader::new(bzip2::read::MultiBzDecoder::new(file))),
    };

    let mut produced: u64 = 0;
    for (line_number, line) in reader.lines().enumerate() {
        if cancel.is_cancelled() {
            info!(produced, "dump producer cancelled");
            break;
        }
        let line = line.map_err(|e| DumpError::Io(format!("read failed: {e}")))?;
        if line_number < skip_lines {
            continue;
        }
        // blocking_send blocks when the queue is full: backpressure.
        if tx.blocking_send(line).is_err() {
            // All consumers are gone; nothing left to feed.
            break;
        }
        produced += 1;
        if max_items.is_some_and(|max| produced >= max) {
            break;
        }
    }
    // tx drops here, closing the queue: the one-shot "done" signal.
    Ok(())
}

/// Reporter body: periodically log processed count and rate
async fn report_progress(consumed: Arc<AtomicU64>, interval: Duration, stop: CancellationToken) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // first tick fires immediately
    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => {
                let items = consumed.load(Ordering::Relaxed);
                let elapsed = start.elapsed().as_secs_f64();
                let items_per_sec = if elapsed > 0.0 { items as f64 / elapsed } else { 0.0 };
                info!(items, items_per_sec, "processing dump");
            }
        }
    }
    let items = consumed.load(Ordering::Relaxed);
    info!(items, "dump progress final");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    fn write_dump(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("tempfile");
        for line in lines {
            writeln!(file, "{line}").expect("write line");
        }
        file.flush().expect("flush");
        file
    }

    #[test]
    fn line_parsing_strips_array_framing() {
        assert_eq!(line_to_entity("["), None);
        assert_eq!(line_to_entity("]"), None);
        assert_eq!(line_to_entity("   "), None);

        let entity = line_to_entity(r#"{"id":"Q1"},"#).expect("entity");
        assert_eq!(entity["id"], "Q1");
    }

    #[test]
    fn malformed_json_is_skipped() {
        assert_eq!(line_to_entity(r#"{"id": unterminated"#), None);
    }

    #[test]
    fn unknown_extension_is_fatal() {
        let err = Compression::from_path(Path::new("dump.json.xz")).unwrap_err();
        assert!(matches!(err, DumpError::UnsupportedExtension(_)));
    }

    #[tokio::test]
    async fn reads_all_entities_from_plain_file() {
        let file = write_dump(&[
            "[",
            r#"{"id":"Q1"},"#,
            r#"{"id":"Q2"},"#,
            "not json at all,",
            r#"{"id":"Q3"}"#,
            "]",
        ]);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let reader = DumpReader::new(file.path(), 2, 8, 0);
        let sink = Arc::clone(&seen);
        let consumed = reader
            .run(
                move |entity| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let id = entity["id"].as_str().unwrap_or_default().to_string();
                        sink.lock().expect("lock").push(id);
                    }
                },
                None,
                false,
            )
            .await
            .expect("run");

        // Six lines, two of which are framing and one malformed.
        assert_eq!(consumed, 6);
        let mut ids = seen.lock().expect("lock").clone();
        ids.sort();
        assert_eq!(ids, vec!["Q1", "Q2", "Q3"]);
    }

    #[tokio::test]
    async fn gzip_dump_round_trips() {
        let mut file = tempfile::Builder::new()
            .suffix(".json.gz")
            .tempfile()
            .expect("tempfile");
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(b"{\"id\":\"Q5\"}\n{\"id\":\"Q6\"}\n")
            .expect("encode");
        let bytes = encoder.finish().expect("finish");
        file.write_all(&bytes).expect("write");
        file.flush().expect("flush");

        let count = Arc::new(AtomicU64::new(0));
        let reader = DumpReader::new(file.path(), 1, 4, 0);
        let counter = Arc::clone(&count);
        reader
            .run(
                move |_| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::Relaxed);
                    }
                },
                None,
                false,
            )
            .await
            .expect("run");
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn max_items_caps_produced_lines() {
        let file = write_dump(&[r#"{"id":"Q1"}"#, r#"{"id":"Q2"}"#, r#"{"id":"Q3"}"#]);
        let reader = DumpReader::new(file.path(), 1, 4, 0);
        let consumed = reader
            .run(|_| async {}, Some(2), false)
            .await
            .expect("run");
        assert_eq!(consumed, 2);
    }

    #[tokio::test]
    async fn skip_lines_offsets_the_stream() {
        let file = write_dump(&[r#"{"id":"Q1"}"#, r#"{"id":"Q2"}"#, r#"{"id":"Q3"}"#]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reader = DumpReader::new(file.path(), 1, 4, 2);
        let sink = Arc::clone(&seen);
        reader
            .run(
                move |entity| {
                    let sink = Arc::clone(&sink);
                    async move {
                        let id = entity["id"].as_str().unwrap_or_default().to_string();
                        sink.lock().expect("lock").push(id);
                    }
                },
                None,
                false,
            )
            .await
            .expect("run");
        assert_eq!(*seen.lock().expect("lock"), vec!["Q3"]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_producer() {
        let lines: Vec<String> = (0..500).map(|i| format!("{{\"id\":\"Q{i}\"}}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let file = write_dump(&refs);

        let reader = DumpReader::new(file.path(), 1, 2, 0);
        let token = reader.cancellation_token();
        token.cancel();
        let consumed = reader.run(|_| async {}, None, false).await.expect("run");
        // The producer may enqueue up to one queue's worth before noticing.
        assert!(consumed < 500);
    }
}
