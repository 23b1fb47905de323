use parking_lot::Mutex;
use repokit_core::{
    DatabaseContext, DatabaseDriver, DatabaseModel, DbError, DbResult, MemoryRepository,
    ModelTranslations, PersistentRepository, Repository, RepositoryDiagnostics, RepositoryEvent,
    RepositoryPolicies,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Note {
    id: u32,
    body: String,
    revision: u64,
}

#[derive(Debug, Clone)]
struct NoteChange {
    key: u32,
    body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NoteRecord {
    key: u32,
    body: String,
    revision: u64,
}

impl DatabaseModel for NoteRecord {
    type Change = NoteChange;
    type MainKey = u32;
}

/// In-memory store that bumps a revision on every write and skips empty bodies.
#[derive(Default)]
struct FakeDriver {
    records: Mutex<Vec<NoteRecord>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_removals: AtomicBool,
    transactions: AtomicUsize,
    gate: Option<Arc<Barrier>>,
}

impl FakeDriver {
    fn with_records(records: Vec<NoteRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    fn gated(gate: Arc<Barrier>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    fn stored_keys(&self) -> Vec<u32> {
        self.records.lock().iter().map(|record| record.key).collect()
    }
}

struct FakeContext<'a> {
    records: &'a mut Vec<NoteRecord>,
    fail_removals: bool,
}

impl DatabaseContext<NoteRecord> for FakeContext<'_> {
    fn upsert(&mut self, changes: &[NoteChange]) -> DbResult<Vec<NoteRecord>> {
        let mut stored = Vec::new();
        for change in changes.iter().filter(|change| !change.body.is_empty()) {
            let record = match self.records.iter_mut().find(|record| record.key == change.key) {
                Some(record) => {
                    record.body = change.body.clone();
                    record.revision += 1;
                    record.clone()
                }
                None => {
                    let record = NoteRecord {
                        key: change.key,
                        body: change.body.clone(),
                        revision: 1,
                    };
                    self.records.push(record.clone());
                    record
                }
            };
            stored.push(record);
        }
        Ok(stored)
    }

    fn object(&mut self, key: &u32) -> DbResult<Option<NoteRecord>> {
        Ok(self.records.iter().find(|record| record.key == *key).cloned())
    }

    fn simple_remove(&mut self, objects: &[NoteRecord]) -> DbResult<bool> {
        if self.fail_removals {
            return Err(DbError::Rejected("removals disabled".to_string()));
        }
        self.records
            .retain(|record| !objects.iter().any(|object| object.key == record.key));
        Ok(true)
    }

    fn remove_all(&mut self) -> DbResult<bool> {
        self.records.clear();
        Ok(true)
    }
}

impl DatabaseDriver<NoteRecord> for FakeDriver {
    fn objects(&self) -> DbResult<Vec<NoteRecord>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(DbError::Rejected("reads disabled".to_string()));
        }
        Ok(self.records.lock().clone())
    }

    fn readwrite<R, F>(&self, transaction: F) -> DbResult<R>
    where
        F: FnOnce(&mut dyn DatabaseContext<NoteRecord>) -> DbResult<R>,
    {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait();
            gate.wait();
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Rejected("writes disabled".to_string()));
        }

        let mut staged = self.records.lock().clone();
        let value = transaction(&mut FakeContext {
            records: &mut staged,
            fail_removals: self.fail_removals.load(Ordering::SeqCst),
        })?;
        *self.records.lock() = staged;
        Ok(value)
    }
}

#[derive(Default)]
struct RecordingDiagnostics {
    events: Mutex<Vec<RepositoryEvent>>,
}

impl RepositoryDiagnostics for RecordingDiagnostics {
    fn report(&self, event: RepositoryEvent) {
        self.events.lock().push(event);
    }
}

type NoteRepository = PersistentRepository<u32, Note, NoteRecord, FakeDriver>;

struct Harness {
    repo: NoteRepository,
    driver: Arc<FakeDriver>,
    batches: Arc<Mutex<Vec<Vec<Note>>>>,
    diagnostics: Arc<RecordingDiagnostics>,
}

fn note(id: u32, body: &str) -> Note {
    Note {
        id,
        body: body.to_string(),
        revision: 0,
    }
}

fn record(key: u32, body: &str, revision: u64) -> NoteRecord {
    NoteRecord {
        key,
        body: body.to_string(),
        revision,
    }
}

fn memory(
    stale: Vec<Note>,
    batches: &Arc<Mutex<Vec<Vec<Note>>>>,
    diagnostics: &Arc<RecordingDiagnostics>,
) -> MemoryRepository<u32, Note> {
    let recorded = Arc::clone(batches);
    MemoryRepository::with_items(
        stale,
        RepositoryPolicies::new(|note: &Note| note.id)
            .with_update_detection(|old: &Note, new: &Note| old != new)
            .with_update_handler(move |notes: &[Note]| recorded.lock().push(notes.to_vec()))
            .with_diagnostics(Arc::clone(diagnostics) as Arc<dyn RepositoryDiagnostics>),
    )
}

fn translations() -> ModelTranslations<u32, Note, NoteRecord> {
    ModelTranslations::new(
        |note: &Note| NoteChange {
            key: note.id,
            body: note.body.clone(),
        },
        |record: &NoteRecord| Note {
            id: record.key,
            body: record.body.clone(),
            revision: record.revision,
        },
        |index: &u32| *index,
    )
}

fn harness_with(driver: FakeDriver, stale: Vec<Note>) -> Harness {
    let driver = Arc::new(driver);
    let batches = Arc::default();
    let diagnostics = Arc::default();
    let repo = PersistentRepository::try_new(
        memory(stale, &batches, &diagnostics),
        Arc::clone(&driver),
        translations(),
    )
    .unwrap();
    Harness {
        repo,
        driver,
        batches,
        diagnostics,
    }
}

fn harness() -> Harness {
    harness_with(FakeDriver::default(), Vec::new())
}

fn all_items(repo: &NoteRepository) -> Vec<Note> {
    let mut items = Vec::new();
    repo.all_items(|all| items = all);
    items
}

fn item(repo: &NoteRepository, id: u32) -> Option<Note> {
    let mut found = None;
    repo.item_by(&id, |item| found = item);
    found
}

fn upsert(repo: &NoteRepository, notes: Vec<Note>) -> Vec<Note> {
    let mut updated = None;
    repo.upsert(notes, |items| updated = Some(items));
    updated.expect("upsert completion should run")
}

#[test]
fn reconciliation_replaces_stale_cache_with_store_contents() {
    let driver = FakeDriver::with_records(vec![record(1, "one", 3), record(2, "two", 1)]);
    let h = harness_with(driver, vec![note(9, "stale"), note(1, "old")]);

    assert_eq!(
        all_items(&h.repo),
        vec![
            Note {
                id: 1,
                body: "one".to_string(),
                revision: 3
            },
            Note {
                id: 2,
                body: "two".to_string(),
                revision: 1
            },
        ]
    );
    assert_eq!(item(&h.repo, 9), None);
    assert_eq!(
        *h.diagnostics.events.lock(),
        vec![RepositoryEvent::StaleCacheDiscarded { discarded: 2 }]
    );
    assert_eq!(h.batches.lock().len(), 1);
    assert_eq!(h.batches.lock()[0].len(), 2);
}

#[test]
fn reconciliation_of_empty_cache_reports_nothing() {
    let h = harness_with(FakeDriver::with_records(vec![record(5, "five", 1)]), Vec::new());

    assert!(h.diagnostics.events.lock().is_empty());
    assert_eq!(all_items(&h.repo).len(), 1);
}

#[test]
fn construction_fails_when_store_cannot_be_read() {
    let driver = FakeDriver::default();
    driver.fail_reads.store(true, Ordering::SeqCst);
    let batches = Arc::default();
    let diagnostics = Arc::default();

    let result = PersistentRepository::try_new(
        memory(Vec::new(), &batches, &diagnostics),
        Arc::new(driver),
        translations(),
    );

    assert!(matches!(result, Err(DbError::Rejected(_))));
    assert!(batches.lock().is_empty());
}

#[test]
fn upsert_mirrors_what_the_store_persisted() {
    let h = harness();

    let updated = upsert(&h.repo, vec![note(1, "draft")]);

    let persisted = Note {
        id: 1,
        body: "draft".to_string(),
        revision: 1,
    };
    assert_eq!(updated, vec![persisted.clone()]);
    assert_eq!(item(&h.repo, 1), Some(persisted));

    let updated = upsert(&h.repo, vec![note(1, "draft")]);
    assert_eq!(updated[0].revision, 2);
    assert_eq!(item(&h.repo, 1).map(|note| note.revision), Some(2));
}

#[test]
fn changes_skipped_by_the_store_never_reach_memory() {
    let h = harness();

    let updated = upsert(&h.repo, vec![note(1, "kept"), note(2, ""), note(3, "also")]);

    assert_eq!(
        updated.iter().map(|note| note.id).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert_eq!(item(&h.repo, 2), None);
    assert_eq!(h.driver.stored_keys(), vec![1, 3]);
}

#[test]
fn failed_upsert_leaves_memory_untouched() {
    let h = harness();
    upsert(&h.repo, vec![note(1, "one")]);
    h.driver.fail_writes.store(true, Ordering::SeqCst);

    let updated = upsert(&h.repo, vec![note(1, "changed"), note(2, "two")]);

    assert!(updated.is_empty());
    assert_eq!(item(&h.repo, 1).map(|note| note.body), Some("one".to_string()));
    assert_eq!(item(&h.repo, 2), None);
}

#[test]
fn update_handler_sees_reconciliation_then_changed_batches() {
    let h = harness();

    upsert(&h.repo, vec![note(1, "one")]);
    h.driver.fail_writes.store(true, Ordering::SeqCst);
    upsert(&h.repo, vec![note(2, "two")]);

    let batches = h.batches.lock();
    assert_eq!(batches.len(), 2);
    assert!(batches[0].is_empty());
    assert_eq!(batches[1][0].id, 1);
}

#[test]
fn remove_item_drops_cache_entry_even_when_store_removal_fails() {
    let h = harness();
    upsert(&h.repo, vec![note(1, "one"), note(2, "two")]);
    h.driver.fail_removals.store(true, Ordering::SeqCst);

    let mut result = None;
    h.repo.remove_item(&1, |succeeded| result = Some(succeeded));

    assert_eq!(result, Some(false));
    assert_eq!(item(&h.repo, 1), None);
    assert_eq!(h.driver.stored_keys(), vec![1, 2]);
}

#[test]
fn remove_item_removes_from_store_and_cache() {
    let h = harness();
    upsert(&h.repo, vec![note(1, "one"), note(2, "two")]);

    let mut result = None;
    h.repo.remove_item(&1, |succeeded| result = Some(succeeded));

    assert_eq!(result, Some(true));
    assert_eq!(h.driver.stored_keys(), vec![2]);
    assert_eq!(
        all_items(&h.repo).iter().map(|note| note.id).collect::<Vec<_>>(),
        vec![2]
    );
}

#[test]
fn remove_all_clears_cache_only_after_store_success() {
    let h = harness();
    upsert(&h.repo, vec![note(1, "one"), note(2, "two")]);

    h.driver.fail_writes.store(true, Ordering::SeqCst);
    let mut result = None;
    h.repo.remove_all(|succeeded| result = Some(succeeded));
    assert_eq!(result, Some(false));
    assert_eq!(all_items(&h.repo).len(), 2);

    h.driver.fail_writes.store(false, Ordering::SeqCst);
    h.repo.remove_all(|succeeded| result = Some(succeeded));
    assert_eq!(result, Some(true));
    assert!(all_items(&h.repo).is_empty());
    assert!(h.driver.stored_keys().is_empty());
}

#[test]
fn readers_are_not_blocked_by_an_open_transaction() {
    let gate = Arc::new(Barrier::new(2));
    let h = harness_with(FakeDriver::gated(Arc::clone(&gate)), Vec::new());

    thread::scope(|scope| {
        let writer = scope.spawn(|| upsert(&h.repo, vec![note(1, "pending")]));

        gate.wait();
        assert_eq!(item(&h.repo, 1), None);
        assert!(all_items(&h.repo).is_empty());
        gate.wait();

        let updated = writer.join().expect("writer thread should not panic");
        assert_eq!(updated.len(), 1);
    });

    assert_eq!(item(&h.repo, 1).map(|note| note.revision), Some(1));
    assert_eq!(h.driver.transactions.load(Ordering::SeqCst), 1);
}
