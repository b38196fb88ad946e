use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

pub const DUPLICATE_WINDOW: Duration = Duration::from_secs(3);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    pub company: String,
    pub department: String,
}

impl SubmissionKey {
    pub fn new(company: &str, department: &str) -> Self {
        Self {
            company: company.to_string(),
            department: department.to_string(),
        }
    }
}

/// Short-window guard against double submissions of the same questionnaire.
///
/// Checking and recording are separate calls, so two racing submissions with
/// the same key can both get through.
pub trait SubmissionGuard: Send + Sync {
    fn is_duplicate(&self, key: &SubmissionKey) -> bool;

    /// Remember a submission that was persisted successfully.
    fn record(&self, key: SubmissionKey);
}

/// Process-local guard. State is lost on restart.
pub struct InMemorySubmissionGuard<C: Clock = SystemClock> {
    window: Duration,
    clock: C,
    recent: Mutex<HashMap<SubmissionKey, Instant>>,
}

impl InMemorySubmissionGuard<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(DUPLICATE_WINDOW, SystemClock)
    }
}

impl Default for InMemorySubmissionGuard<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemorySubmissionGuard<C> {
    pub fn with_clock(window: Duration, clock: C) -> Self {
        Self {
            window,
            clock,
            recent: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<SubmissionKey, Instant>> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(&self, entries: &mut HashMap<SubmissionKey, Instant>, now: Instant) {
        entries.retain(|_, at| now.saturating_duration_since(*at) < self.window);
    }
}

impl<C: Clock> SubmissionGuard for InMemorySubmissionGuard<C> {
    fn is_duplicate(&self, key: &SubmissionKey) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries();
        self.prune(&mut entries, now);

        let duplicate = entries.contains_key(key);
        if duplicate {
            debug!(company = %key.company, department = %key.department, "Duplicate submission");
        }
        duplicate
    }

    fn record(&self, key: SubmissionKey) {
        let now = self.clock.now();
        let mut entries = self.entries();
        self.prune(&mut entries, now);
        entries.insert(key, now);
    }
}
