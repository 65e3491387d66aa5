//! Log persistence seam.
//!
//! The workflow hands accepted drafts to a [`LogSink`]. [`MemoryLogStore`]
//! is the in-process implementation used by the CLI, the web server, and
//! tests; it also answers the date and student queries the timeline and
//! reports need.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::error::StoreError;
use crate::record::{LogEntry, LogInput};

/// Boxed future returned by [`LogSink::insert`].
pub type SinkFuture<'a> = Pin<Box<dyn Future<Output = Result<LogEntry, StoreError>> + Send + 'a>>;

/// Something that stores accepted logs.
pub trait LogSink: Send + Sync {
    /// Store one log and return it as stored.
    fn insert(&self, input: LogInput) -> SinkFuture<'_>;
}

/// In-memory log store. Ids are assigned as `l1`, `l2`, ...
#[derive(Default)]
pub struct MemoryLogStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store seeded with existing entries. New ids continue after them.
    pub fn with_entries(entries: Vec<LogEntry>) -> Self {
        let next_id = entries.len() as u64;
        Self {
            inner: Mutex::new(StoreInner { entries, next_id }),
        }
    }

    /// Store a log synchronously.
    pub fn insert_now(&self, input: LogInput) -> Result<LogEntry, StoreError> {
        if input.block_id.trim().is_empty() {
            return Err(StoreError::Rejected("missing time block".into()));
        }
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let entry = LogEntry::from_input(format!("l{}", inner.next_id), input, Utc::now());
        debug!("Stored log {} ({} total)", entry.id, inner.entries.len() + 1);
        inner.entries.push(entry.clone());
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored log, oldest first.
    pub fn all(&self) -> Vec<LogEntry> {
        self.select(|_| true)
    }

    pub fn for_date(&self, date: NaiveDate) -> Vec<LogEntry> {
        self.select(|e| e.date == date)
    }

    /// Logs dated within `start..=end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<LogEntry> {
        self.select(|e| e.date >= start && e.date <= end)
    }

    /// Logs that name the student.
    pub fn for_student(&self, student_id: &str) -> Vec<LogEntry> {
        self.select(|e| e.mentions_student(student_id))
    }

    fn select(&self, keep: impl Fn(&LogEntry) -> bool) -> Vec<LogEntry> {
        match self.lock() {
            Ok(inner) => inner.entries.iter().filter(|e| keep(e)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("log store lock poisoned".into()))
    }
}

impl LogSink for MemoryLogStore {
    fn insert(&self, input: LogInput) -> SinkFuture<'_> {
        let result = self.insert_now(input);
        Box::pin(async move { result })
    }
}
