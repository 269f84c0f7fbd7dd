//! Rotating file sinks.
//!
//! # Responsibilities
//! - Hand out a write destination per log file path
//! - Rotate by size and keep a bounded number of backups (via `logroller`)
//! - Delete files of the same sink older than the retention age, when the
//!   sink opens and again at most once per [`PRUNE_INTERVAL`] while it writes
//!
//! # Design Decisions
//! - Opening is lazy: nothing touches the filesystem until the first write
//! - Failures never reach the caller: a failed write is dropped and the
//!   first failure of each sink is reported once on stderr
//! - One `write` call per formatted line, under the sink's mutex

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use logroller::{LogRoller, LogRollerBuilder, Rotation, RotationSize};
use tracing_subscriber::fmt::MakeWriter;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Minimum time between two age-based prunes of a writing sink.
pub const PRUNE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Rotation policy of a file sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkPolicy {
    /// Size in megabytes after which the file is rotated.
    pub max_size_mb: u64,
    /// Number of rotated files kept; older ones are deleted.
    pub max_backups: u64,
    /// Files of this sink older than this are deleted regardless of count.
    pub max_age: Duration,
}

impl Default for SinkPolicy {
    fn default() -> Self {
        Self {
            max_size_mb: 10,
            max_backups: 5,
            max_age: Duration::from_secs(30 * SECS_PER_DAY),
        }
    }
}

impl SinkPolicy {
    /// Build a policy with the retention age given in days.
    pub fn new(max_size_mb: u64, max_backups: u64, max_age_days: u64) -> Self {
        Self {
            max_size_mb,
            max_backups,
            max_age: Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY)),
        }
    }
}

/// A log file that rotates by size, backup count and age.
///
/// Cloning shares the same underlying file.
#[derive(Clone)]
pub struct RotatingSink {
    inner: Arc<SinkInner>,
}

struct SinkInner {
    path: PathBuf,
    policy: SinkPolicy,
    prune_interval: Duration,
    state: Mutex<SinkState>,
}

#[derive(Default)]
struct SinkState {
    roller: Option<LogRoller>,
    last_prune: Option<Instant>,
    reported: bool,
}

/// Open a rotating sink with the default policy.
pub fn make_rotating_sink(path: impl Into<PathBuf>) -> RotatingSink {
    RotatingSink::open(path)
}

impl RotatingSink {
    /// Create a sink for `path` with the default policy.
    ///
    /// The file is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_policy(path, SinkPolicy::default())
    }

    /// Create a sink for `path` with an explicit policy.
    pub fn with_policy(path: impl Into<PathBuf>, policy: SinkPolicy) -> Self {
        Self::with_prune_interval(path, policy, PRUNE_INTERVAL)
    }

    pub(crate) fn with_prune_interval(
        path: impl Into<PathBuf>,
        policy: SinkPolicy,
        prune_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SinkInner {
                path: path.into(),
                policy,
                prune_interval,
                state: Mutex::new(SinkState::default()),
            }),
        }
    }

    /// Path of the active file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn policy(&self) -> &SinkPolicy {
        &self.inner.policy
    }
}

impl std::fmt::Debug for RotatingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingSink")
            .field("path", &self.inner.path)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

impl SinkInner {
    fn write(&self, buf: &[u8]) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.roller.is_none() {
            match self.open() {
                Ok(roller) => state.roller = Some(roller),
                Err(e) => {
                    self.report(&mut state, &e);
                    return;
                }
            }
        }

        // Size rotations happen inside the roller, so retention is
        // re-checked on a timer rather than per rotation.
        let due = state
            .last_prune
            .map_or(true, |at| at.elapsed() >= self.prune_interval);
        if due {
            prune_expired(&self.path, self.policy.max_age);
            state.last_prune = Some(Instant::now());
        }

        let result = match state.roller.as_mut() {
            Some(roller) => roller.write_all(buf),
            None => Ok(()),
        };
        if let Err(e) = result {
            self.report(&mut state, &e);
        }
    }

    fn flush(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(roller) = state.roller.as_mut() {
            let _ = roller.flush();
        }
    }

    fn open(&self) -> io::Result<LogRoller> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = self.path.file_name().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "log path has no file name")
        })?;

        fs::create_dir_all(&dir)?;

        let dir = dir.to_string_lossy();
        let name = name.to_string_lossy();
        LogRollerBuilder::new(&*dir, &*name)
            .rotation(Rotation::SizeBased(RotationSize::MB(self.policy.max_size_mb)))
            .max_keep_files(self.policy.max_backups)
            .build()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn report(&self, state: &mut SinkState, err: &io::Error) {
        if !state.reported {
            state.reported = true;
            eprintln!("ctxlog: cannot write {}: {}", self.path.display(), err);
        }
    }
}

/// Delete files next to `active` that share its stem and are older than `max_age`.
///
/// The active file itself is kept. Errors are ignored.
pub(crate) fn prune_expired(active: &Path, max_age: Duration) -> usize {
    let (Some(stem), Some(active_name)) = (active.file_stem(), active.file_name()) else {
        return 0;
    };
    let stem = stem.to_string_lossy();
    let dir = match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        if name == active_name || !name.to_string_lossy().starts_with(&*stem) {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .is_some_and(|age| age > max_age);
        if expired && fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }
    removed
}

/// Writer handed to `tracing-subscriber` for one formatted record.
pub struct SinkWriter<'a> {
    inner: &'a SinkInner,
}

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush();
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RotatingSink {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { inner: &self.inner }
    }
}

/// In-memory sink capturing every formatted line.
///
/// Used by tests and by embedders that want to assert on their own records.
#[derive(Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Written lines, without the trailing newline.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    pub fn clear(&self) {
        self.buf.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for MemorySink {
    type Writer = MemorySink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_sink_files(dir: &Path, prefix: &str) -> String {
        let mut out = String::new();
        for entry in fs::read_dir(dir).unwrap().flatten() {
            if entry.file_name().to_string_lossy().starts_with(prefix) {
                out.push_str(&fs::read_to_string(entry.path()).unwrap());
            }
        }
        out
    }

    #[test]
    fn test_default_policy() {
        let policy = SinkPolicy::default();
        assert_eq!(policy.max_size_mb, 10);
        assert_eq!(policy.max_backups, 5);
        assert_eq!(policy.max_age, Duration::from_secs(30 * 24 * 3600));
        assert_eq!(SinkPolicy::new(10, 5, 30), policy);
    }

    #[test]
    fn test_opens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("INFO.test.log");
        let sink = make_rotating_sink(&path);

        assert!(!dir.path().join("nested").exists());

        sink.make_writer().write_all(b"hello\n").unwrap();
        assert!(read_sink_files(&dir.path().join("nested"), "INFO.test").contains("hello"));
    }

    #[test]
    fn test_clones_share_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RotatingSink::open(dir.path().join("ERROR.shared.log"));
        let other = sink.clone();

        sink.make_writer().write_all(b"first\n").unwrap();
        other.make_writer().write_all(b"second\n").unwrap();

        let content = read_sink_files(dir.path(), "ERROR.shared");
        assert!(content.contains("first"));
        assert!(content.contains("second"));
    }

    #[test]
    fn test_unwritable_path_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let sink = RotatingSink::open(blocker.join("INFO.log"));
        let mut writer = sink.make_writer();
        assert_eq!(writer.write(b"dropped\n").unwrap(), 8);
        assert!(writer.flush().is_ok());
        // A second failure is still swallowed.
        assert!(sink.make_writer().write_all(b"again\n").is_ok());
    }

    #[test]
    fn test_prune_expired() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("INFO.x.log");
        let old = dir.path().join("INFO.x.log.1");
        let fresh = dir.path().join("INFO.x.log.2");
        let unrelated = dir.path().join("ERROR.x.log.1");
        for p in [&active, &old, &fresh, &unrelated] {
            fs::write(p, b"line\n").unwrap();
        }

        let forty_days_ago = SystemTime::now() - Duration::from_secs(40 * SECS_PER_DAY);
        for p in [&active, &old, &unrelated] {
            fs::File::options()
                .write(true)
                .open(p)
                .unwrap()
                .set_modified(forty_days_ago)
                .unwrap();
        }

        let removed = prune_expired(&active, SinkPolicy::default().max_age);
        assert_eq!(removed, 1);
        assert!(active.exists());
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(unrelated.exists());
    }

    fn age(path: &Path, days: u64) {
        fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(days * SECS_PER_DAY))
            .unwrap();
    }

    #[test]
    fn test_prunes_again_while_writing() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("INFO.long.log");
        let sink = RotatingSink::with_prune_interval(&active, SinkPolicy::default(), Duration::ZERO);

        sink.make_writer().write_all(b"opened\n").unwrap();

        let backup = dir.path().join("INFO.long.log.1");
        fs::write(&backup, b"old\n").unwrap();
        age(&backup, 40);

        sink.make_writer().write_all(b"later\n").unwrap();
        assert!(!backup.exists());
        assert!(read_sink_files(dir.path(), "INFO.long").contains("later"));
    }

    #[test]
    fn test_prune_waits_for_interval() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("INFO.calm.log");
        let sink = RotatingSink::open(&active);

        sink.make_writer().write_all(b"opened\n").unwrap();

        let backup = dir.path().join("INFO.calm.log.1");
        fs::write(&backup, b"old\n").unwrap();
        age(&backup, 40);

        sink.make_writer().write_all(b"later\n").unwrap();
        assert!(backup.exists());
    }

    #[test]
    fn test_memory_sink_lines() {
        let sink = MemorySink::new();
        sink.make_writer().write_all(b"a\nb\n").unwrap();
        assert_eq!(sink.lines(), vec!["a".to_string(), "b".to_string()]);
        sink.clear();
        assert!(sink.contents().is_empty());
    }
}
