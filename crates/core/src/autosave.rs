//! Debounced autosave between rapid edits and the record store.
//!
//! A [`DebouncedSaver`] holds at most one pending record. Each
//! [`notify`](DebouncedSaver::notify) replaces the pending record and restarts
//! the quiet-period timer; when the timer fires, the last record notified is
//! committed. Intermediate values are never written.
//!
//! Dropping the saver does not cancel a scheduled commit. Call
//! [`flush`](DebouncedSaver::flush) on graceful teardown to commit immediately.

use crate::record::PatientRecord;
use crate::store::PatientStore;
use crate::PatientResult;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// The write a saver performs once the quiet period ends.
pub trait Commit: Send + Sync + 'static {
    fn commit(&self, record: PatientRecord) -> PatientResult<()>;
}

impl Commit for PatientStore {
    fn commit(&self, record: PatientRecord) -> PatientResult<()> {
        self.save(record).map(|_| ())
    }
}

struct Pending {
    generation: u64,
    record: PatientRecord,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct Slot {
    next_generation: u64,
    pending: Option<Pending>,
}

struct Inner<C> {
    target: C,
    delay: Duration,
    slot: Mutex<Slot>,
    /// Held from taking a pending record until its commit returns, so a flush
    /// never overtakes a commit the timer already started.
    committing: Mutex<()>,
}

impl<C> Inner<C> {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn committing(&self) -> MutexGuard<'_, ()> {
        self.committing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Commit> Inner<C> {
    fn commit(&self, record: PatientRecord) -> PatientResult<()> {
        let id = record.id.clone();
        self.target.commit(record).inspect_err(|e| {
            tracing::error!("autosave of patient {} failed: {}", id, e);
        })
    }
}

/// Single-slot trailing debounce in front of a [`Commit`] target.
pub struct DebouncedSaver<C> {
    inner: Arc<Inner<C>>,
}

impl<C> Clone for DebouncedSaver<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Commit> DebouncedSaver<C> {
    pub fn new(target: C, delay: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                target,
                delay,
                slot: Mutex::new(Slot::default()),
                committing: Mutex::new(()),
            }),
        }
    }

    /// Schedules `record` to be committed after the quiet period.
    ///
    /// Supersedes any record still waiting. Returns immediately; a failed
    /// commit is logged, not reported. Must be called within a Tokio runtime.
    pub fn notify(&self, record: PatientRecord) {
        let mut slot = self.inner.slot();
        if let Some(previous) = slot.pending.take() {
            previous.timer.abort();
        }

        slot.next_generation += 1;
        let generation = slot.next_generation;

        let inner = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;

            let _committing = inner.committing();
            let due = {
                let mut slot = inner.slot();
                match slot.pending.take() {
                    Some(p) if p.generation == generation => Some(p.record),
                    other => {
                        slot.pending = other;
                        None
                    }
                }
            };

            if let Some(record) = due {
                // Logged inside; nobody is waiting on the result.
                let _ = inner.commit(record);
            }
        });

        slot.pending = Some(Pending {
            generation,
            record,
            timer,
        });
    }

    /// Commits the pending record now, if there is one.
    ///
    /// If the timer has already started committing, waits for that commit to
    /// finish before returning.
    ///
    /// # Errors
    ///
    /// Returns the commit error; the record is not rescheduled.
    pub fn flush(&self) -> PatientResult<()> {
        let _committing = self.inner.committing();
        let pending = self.inner.slot().pending.take();
        match pending {
            Some(p) => {
                p.timer.abort();
                self.inner.commit(p.record)
            }
            None => Ok(()),
        }
    }

    /// The record waiting to be committed, if any.
    pub fn pending(&self) -> Option<PatientRecord> {
        self.inner.slot().pending.as_ref().map(|p| p.record.clone())
    }

    pub fn is_idle(&self) -> bool {
        self.inner.slot().pending.is_none()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::PatientError;
    use std::path::PathBuf;

    #[derive(Clone, Default)]
    struct Recorder {
        commits: Arc<Mutex<Vec<PatientRecord>>>,
        fail: bool,
    }

    impl Recorder {
        fn commits(&self) -> Vec<PatientRecord> {
            self.commits.lock().expect("recorder lock").clone()
        }
    }

    impl Commit for Recorder {
        fn commit(&self, record: PatientRecord) -> PatientResult<()> {
            if self.fail {
                return Err(PatientError::InvalidInput("refused".into()));
            }
            self.commits.lock().expect("recorder lock").push(record);
            Ok(())
        }
    }

    const DELAY: Duration = Duration::from_millis(1500);

    fn named(first_name: &str) -> PatientRecord {
        let mut record = PatientRecord::template();
        record.id = "p1".into();
        record.identity.first_name = first_name.into();
        record
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_commits_only_the_last() {
        let recorder = Recorder::default();
        let saver = DebouncedSaver::new(recorder.clone(), DELAY);

        saver.notify(named("J"));
        tokio::time::sleep(Duration::from_millis(500)).await;
        saver.notify(named("Ju"));
        tokio::time::sleep(Duration::from_millis(1400)).await;
        saver.notify(named("Juan"));

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert!(recorder.commits().is_empty());
        assert_eq!(
            saver.pending().map(|r| r.identity.first_name),
            Some("Juan".to_string())
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let commits = recorder.commits();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].identity.first_name, "Juan");
        assert!(saver.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_quiet_periods_commit_separately() {
        let recorder = Recorder::default();
        let saver = DebouncedSaver::new(recorder.clone(), DELAY);

        saver.notify(named("A"));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        saver.notify(named("B"));
        tokio::time::sleep(Duration::from_millis(1600)).await;

        let names: Vec<String> = recorder
            .commits()
            .into_iter()
            .map(|r| r.identity.first_name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_saver_does_not_cancel_the_commit() {
        let recorder = Recorder::default();
        let saver = DebouncedSaver::new(recorder.clone(), DELAY);
        saver.notify(named("Final"));
        drop(saver);

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(recorder.commits().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_commits_immediately_and_cancels_the_timer() {
        let recorder = Recorder::default();
        let saver = DebouncedSaver::new(recorder.clone(), DELAY);
        saver.notify(named("Now"));

        saver.flush().expect("flush should commit");
        assert_eq!(recorder.commits().len(), 1);
        saver.flush().expect("flush with nothing pending is a no-op");

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(recorder.commits().len(), 1);
    }

    /// Commits slowly so a flush can arrive while the timer's commit is running.
    #[derive(Clone, Default)]
    struct SlowRecorder {
        commits: Arc<Mutex<Vec<PatientRecord>>>,
    }

    impl Commit for SlowRecorder {
        fn commit(&self, record: PatientRecord) -> PatientResult<()> {
            std::thread::sleep(Duration::from_millis(200));
            self.commits.lock().expect("recorder lock").push(record);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn flush_waits_for_a_commit_already_in_progress() {
        let recorder = SlowRecorder::default();
        let saver = DebouncedSaver::new(recorder.clone(), Duration::from_millis(10));

        saver.notify(named("Late"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        saver.flush().expect("flush should succeed");
        let commits = recorder.commits.lock().expect("recorder lock").clone();
        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].identity.first_name, "Late");
        assert!(saver.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_is_reported_by_flush_only() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let saver = DebouncedSaver::new(recorder.clone(), DELAY);

        saver.notify(named("x"));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(saver.is_idle());

        saver.notify(named("y"));
        assert!(saver.flush().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn edit_names_then_wait_persists_to_store() {
        let cfg = Arc::new(
            CoreConfig::with_data_dir(PathBuf::from("unused")).expect("config should build"),
        );
        let store = PatientStore::in_memory(cfg.clone());
        let created = store.create().expect("create");
        let saver = DebouncedSaver::new(store.clone(), cfg.save_delay());

        let mut edited = created.clone();
        edited.identity.last_name = "Pérez".into();
        saver.notify(edited.clone());
        edited.identity.first_name = "Juan".into();
        saver.notify(edited);

        tokio::time::sleep(cfg.save_delay() + Duration::from_millis(100)).await;

        let all = store.list_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].identity.last_name, "Pérez");
        assert_eq!(all[0].identity.first_name, "Juan");
        assert_eq!(all[0].id, created.id);
        assert_eq!(all[0].created_at, created.created_at);
    }
}
