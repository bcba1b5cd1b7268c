//! Polling directory watcher.
//!
//! [`DirectoryPoller`] is the [`FileArrival`] for a local input directory. A `notify`
//! [`PollWatcher`] rescans the directory every poll interval and reports created or modified
//! files; the first round lists the directory with `walkdir` so files already present are picked
//! up too. A candidate is yielded once its size is stable across the settle delay and its
//! modification time is newer than the last one processed. [`Watcher`] drives rounds and pushes
//! every yielded file through [`process_bytes`] into an [`OutputSink`].

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, SystemTime};

use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher as _};
use walkdir::WalkDir;

use crate::error::ProcessingResult;
use crate::ingestion::Platform;
use crate::pipeline::{process_bytes, ProcessingOptions};
use crate::storage::{ArrivedFile, FileArrival, OutputSink};

/// Last processed modification time per input path.
pub type SeenFiles = HashMap<PathBuf, SystemTime>;

/// [`FileArrival`] over a local directory.
pub struct DirectoryPoller {
    dir: PathBuf,
    settle_delay: Duration,
    seen: SeenFiles,
    /// Yielded but not yet settled, with the modification time they were read at.
    in_flight: HashMap<PathBuf, SystemTime>,
    /// Paths to look at next round.
    candidates: BTreeSet<PathBuf>,
    /// Paths left in the current round.
    pending: VecDeque<PathBuf>,
    round_open: bool,
    needs_listing: bool,
    events: Receiver<notify::Result<Event>>,
    _watcher: PollWatcher,
}

impl fmt::Debug for DirectoryPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryPoller")
            .field("dir", &self.dir)
            .field("settle_delay", &self.settle_delay)
            .field("seen_len", &self.seen.len())
            .field("candidates_len", &self.candidates.len())
            .finish()
    }
}

impl DirectoryPoller {
    /// Watch `dir` (created if missing), rescanning it every `poll_interval` and waiting
    /// `settle_delay` between the two size reads of the stabilization check.
    pub fn new(
        dir: impl AsRef<Path>,
        poll_interval: Duration,
        settle_delay: Duration,
    ) -> ProcessingResult<Self> {
        Self::with_seen(dir, poll_interval, settle_delay, SeenFiles::new())
    }

    /// Like [`Self::new`], resuming from previously recorded state.
    pub fn with_seen(
        dir: impl AsRef<Path>,
        poll_interval: Duration,
        settle_delay: Duration,
        seen: SeenFiles,
    ) -> ProcessingResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let (tx, events) = mpsc::channel();
        let mut watcher = PollWatcher::new(tx, Config::default().with_poll_interval(poll_interval))?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            dir,
            settle_delay,
            seen,
            in_flight: HashMap::new(),
            candidates: BTreeSet::new(),
            pending: VecDeque::new(),
            round_open: false,
            needs_listing: true,
            events,
            _watcher: watcher,
        })
    }

    /// Watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Recorded state.
    pub fn seen(&self) -> &SeenFiles {
        &self.seen
    }

    fn absorb(&mut self, event: notify::Result<Event>) {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, dir = %self.dir.display(), "watch error; relisting");
                self.needs_listing = true;
                return;
            }
        };
        if event.need_rescan() {
            self.needs_listing = true;
            return;
        }
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any => {
                self.candidates
                    .extend(event.paths.into_iter().filter(|p| Platform::is_supported(p)));
            }
            EventKind::Remove(_) => {
                for p in &event.paths {
                    self.seen.remove(p);
                    self.candidates.remove(p);
                }
            }
            _ => {}
        }
    }

    fn start_round(&mut self) -> ProcessingResult<()> {
        while let Ok(event) = self.events.try_recv() {
            self.absorb(event);
        }
        if self.needs_listing {
            self.candidates.extend(list_supported(&self.dir)?);
            self.needs_listing = false;
        }
        self.pending.extend(std::mem::take(&mut self.candidates));
        Ok(())
    }

    fn is_unchanged(&self, path: &Path, mtime: SystemTime) -> bool {
        self.seen.get(path).is_some_and(|prev| mtime <= *prev)
    }
}

/// Supported regular files directly inside `dir`, sorted by name.
fn list_supported(dir: &Path) -> ProcessingResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && Platform::is_supported(entry.path()) {
            found.push(entry.into_path());
        }
    }
    Ok(found)
}

impl FileArrival for DirectoryPoller {
    /// Yields the next ready file of the current round; `None` closes the round, and the next
    /// call starts a new one from the changes reported since.
    fn next_ready_file(&mut self) -> ProcessingResult<Option<ArrivedFile>> {
        if !self.round_open {
            self.start_round()?;
            self.round_open = true;
        }

        while let Some(path) = self.pending.pop_front() {
            let Ok(meta) = fs::metadata(&path) else {
                self.seen.remove(&path);
                continue;
            };
            if !meta.is_file() || meta.modified().is_ok_and(|m| self.is_unchanged(&path, m)) {
                continue;
            }
            if !is_stable(&path, self.settle_delay) {
                tracing::debug!(path = %path.display(), "still being written; deferred");
                self.candidates.insert(path);
                continue;
            }
            let read = fs::metadata(&path)
                .and_then(|m| m.modified())
                .and_then(|mtime| fs::read(&path).map(|bytes| (mtime, bytes)));
            match read {
                Ok((mtime, bytes)) => {
                    self.in_flight.insert(path.clone(), mtime);
                    return Ok(Some(ArrivedFile {
                        id: path.to_string_lossy().into_owned(),
                        bytes,
                    }));
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not be read; retrying next round");
                    self.candidates.insert(path);
                }
            }
        }

        self.round_open = false;
        Ok(None)
    }

    fn complete(&mut self, file: &ArrivedFile) {
        let path = PathBuf::from(&file.id);
        if let Some(mtime) = self.in_flight.remove(&path) {
            self.seen.insert(path, mtime);
        }
    }

    fn release(&mut self, file: &ArrivedFile) {
        let path = PathBuf::from(&file.id);
        self.in_flight.remove(&path);
        self.candidates.insert(path);
    }

    fn wait(&mut self, timeout: Duration) {
        match self.events.recv_timeout(timeout) {
            Ok(event) => self.absorb(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(timeout),
        }
    }
}

/// `true` when the size of `path` is the same before and after `delay`.
///
/// A file that disappears in between is not stable.
pub fn is_stable(path: &Path, delay: Duration) -> bool {
    let size = |p: &Path| fs::metadata(p).map(|m| m.len()).ok();
    let Some(before) = size(path) else {
        return false;
    };
    if !delay.is_zero() {
        thread::sleep(delay);
    }
    size(path) == Some(before)
}

/// Outcome counts of one poll round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoundSummary {
    /// Files transformed and written.
    pub processed: usize,
    /// Files skipped as unsupported.
    pub skipped: usize,
    /// Files whose processing failed.
    pub failed: usize,
}

/// The polling shell: arrival → [`process_bytes`] → sink, forever.
pub struct Watcher<A, S> {
    arrival: A,
    sink: S,
    options: ProcessingOptions,
    poll_interval: Duration,
}

impl<A: FileArrival, S: OutputSink> Watcher<A, S> {
    /// Create a watcher.
    pub fn new(arrival: A, sink: S, options: ProcessingOptions, poll_interval: Duration) -> Self {
        Self {
            arrival,
            sink,
            options,
            poll_interval,
        }
    }

    /// The arrival source (for inspecting its state).
    pub fn arrival(&self) -> &A {
        &self.arrival
    }

    /// Drain one round of ready files.
    ///
    /// Processing failures are reported through the options' observer. A file is settled as
    /// done once its output is written, or when its failure would repeat on the same content;
    /// transient storage failures hand it back to be retried next round. Only a failure of the
    /// arrival source itself (e.g. the input directory cannot be listed) is returned.
    pub fn poll_once(&mut self) -> ProcessingResult<RoundSummary> {
        let mut summary = RoundSummary::default();
        while let Some(file) = self.arrival.next_ready_file()? {
            let now = chrono::Local::now().naive_local();
            tracing::info!(source = %file.id, "processing");

            let stored = process_bytes(&file.id, &file.bytes, &self.options, now).and_then(|p| {
                self.sink.write(&p.output_name, &p.contents).inspect_err(|e| {
                    tracing::error!(source = %file.id, output = %p.output_name, error = %e, "could not store output");
                })
            });
            match stored {
                Ok(dest) => {
                    tracing::info!(source = %file.id, output = %dest, "saved");
                    self.arrival.complete(&file);
                    summary.processed += 1;
                }
                Err(e) if e.is_unsupported_format() => {
                    self.arrival.complete(&file);
                    summary.skipped += 1;
                }
                Err(e) if e.is_transient() => {
                    tracing::debug!(source = %file.id, "will retry next round");
                    self.arrival.release(&file);
                    summary.failed += 1;
                }
                Err(_) => {
                    self.arrival.complete(&file);
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Poll until `stop` returns `true`, waiting up to the poll interval between rounds.
    ///
    /// A failing round is logged and the loop continues.
    pub fn run_until(&mut self, mut stop: impl FnMut() -> bool) {
        while !stop() {
            if let Err(e) = self.poll_once() {
                tracing::error!(error = %e, "watch iteration failed");
            }
            self.arrival.wait(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(20);

    fn settle_all(poller: &mut DirectoryPoller) -> Vec<ArrivedFile> {
        let mut out = Vec::new();
        while let Some(f) = poller.next_ready_file().unwrap() {
            poller.complete(&f);
            out.push(f);
        }
        out
    }

    #[test]
    fn stable_file_passes_and_missing_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("a.csv");
        fs::write(&p, b"x").unwrap();
        assert!(is_stable(&p, Duration::ZERO));
        assert!(!is_stable(&tmp.path().join("nope.csv"), Duration::ZERO));
    }

    #[test]
    fn first_round_lists_existing_supported_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("b.csv"), b"b").unwrap();
        fs::write(tmp.path().join("a.xlsx"), b"a").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"n").unwrap();

        let mut poller = DirectoryPoller::new(tmp.path(), INTERVAL, Duration::ZERO).unwrap();
        let files = settle_all(&mut poller);
        assert_eq!(files.len(), 2);
        assert!(files[0].id.ends_with("a.xlsx"));
        assert!(files[1].id.ends_with("b.csv"));
        assert_eq!(files[1].bytes, b"b");

        // Next round: nothing changed.
        assert!(poller.next_ready_file().unwrap().is_none());
        assert_eq!(poller.seen().len(), 2);
    }

    #[test]
    fn released_file_is_yielded_next_round() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("loja.csv"), b"v1").unwrap();

        let mut poller = DirectoryPoller::new(tmp.path(), INTERVAL, Duration::ZERO).unwrap();
        let first = poller.next_ready_file().unwrap().unwrap();
        poller.release(&first);
        assert!(poller.next_ready_file().unwrap().is_none());
        assert!(poller.seen().is_empty());

        let again = poller.next_ready_file().unwrap().unwrap();
        assert_eq!(again.id, first.id);
        poller.complete(&again);
        assert_eq!(poller.seen().len(), 1);
    }

    #[test]
    fn modified_file_is_reported_and_yielded_again() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("loja.csv");
        fs::write(&p, b"v1").unwrap();

        let mut poller = DirectoryPoller::new(tmp.path(), INTERVAL, Duration::ZERO).unwrap();
        assert_eq!(settle_all(&mut poller).len(), 1);

        fs::write(&p, b"v2-longer").unwrap();
        fs::File::options()
            .write(true)
            .open(&p)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        let mut again = Vec::new();
        for _ in 0..250 {
            poller.wait(INTERVAL);
            again = settle_all(&mut poller);
            if !again.is_empty() {
                break;
            }
        }
        assert_eq!(again.len(), 1);
        assert_eq!(again[0].bytes, b"v2-longer");
    }

    #[test]
    fn removed_file_is_forgotten() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("loja.csv");
        fs::write(&p, b"v1").unwrap();

        let mut poller = DirectoryPoller::new(tmp.path(), INTERVAL, Duration::ZERO).unwrap();
        let f = poller.next_ready_file().unwrap().unwrap();
        poller.release(&f);
        assert!(poller.next_ready_file().unwrap().is_none());

        fs::remove_file(&p).unwrap();
        assert!(poller.next_ready_file().unwrap().is_none());
        assert!(poller.next_ready_file().unwrap().is_none());
    }
}
