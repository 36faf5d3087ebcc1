//! Test doubles and common utilities for reconciliation contract tests
//!
//! The doubles are cheap to clone: clones share their counters, so a test
//! can hand one clone to the reconciler and keep another for assertions.

#![allow(dead_code)]

use cfddns_core::error::{Error, Result};
use cfddns_core::traits::{AddressFamily, AddressSource, Notifier, RecordSnapshot, RecordStore, RecordType};
use cfddns_core::{AddressResolver, ReconcileSettings, Reconciler};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const RECORD_NAME: &str = "home.example.com";

/// An AddressSource answering from a fixed table
///
/// A family mapped to `None` fails on every attempt.
#[derive(Clone, Default)]
pub struct StubAddressSource {
    answers: Arc<Mutex<HashMap<AddressFamily, Option<String>>>>,
    calls: Arc<Mutex<HashMap<AddressFamily, usize>>>,
}

impl StubAddressSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `family` lookups with `body`
    pub fn answering(self, family: AddressFamily, body: &str) -> Self {
        self.answers
            .lock()
            .unwrap()
            .insert(family, Some(body.to_string()));
        self
    }

    /// Fail every `family` lookup
    pub fn failing(self, family: AddressFamily) -> Self {
        self.answers.lock().unwrap().insert(family, None);
        self
    }

    /// Number of fetch() calls for `family`
    pub fn calls(&self, family: AddressFamily) -> usize {
        self.calls.lock().unwrap().get(&family).copied().unwrap_or(0)
    }
}

#[async_trait::async_trait]
impl AddressSource for StubAddressSource {
    async fn fetch(&self, family: AddressFamily) -> Result<String> {
        *self.calls.lock().unwrap().entry(family).or_insert(0) += 1;
        match self.answers.lock().unwrap().get(&family) {
            Some(Some(body)) => Ok(body.clone()),
            _ => Err(Error::transport("HTTP 503 Service Unavailable")),
        }
    }

    fn endpoint(&self, family: AddressFamily) -> String {
        format!("stub://{}", family)
    }
}

/// An AddressSource that fails a fixed number of times before answering
#[derive(Clone)]
pub struct FlakyAddressSource {
    failures_left: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
    body: String,
}

impl FlakyAddressSource {
    pub fn new(failures: usize, body: &str) -> Self {
        Self {
            failures_left: Arc::new(AtomicUsize::new(failures)),
            calls: Arc::new(AtomicUsize::new(0)),
            body: body.to_string(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AddressSource for FlakyAddressSource {
    async fn fetch(&self, _family: AddressFamily) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(Error::transport("connection reset"));
        }
        Ok(self.body.clone())
    }

    fn endpoint(&self, _family: AddressFamily) -> String {
        "stub://flaky".to_string()
    }
}

/// A mutation observed by the MockRecordStore
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create {
        name: String,
        record_type: RecordType,
        content: String,
    },
    Update {
        record_id: String,
        name: String,
        record_type: RecordType,
        content: String,
    },
}

/// An in-memory RecordStore that records every call
#[derive(Clone, Default)]
pub struct MockRecordStore {
    records: Arc<Mutex<HashMap<RecordType, RecordSnapshot>>>,
    mutations: Arc<Mutex<Vec<Mutation>>>,
    fetch_calls: Arc<AtomicUsize>,
    failing_fetch: Arc<Mutex<Vec<RecordType>>>,
    malformed_fetch: Arc<Mutex<Vec<RecordType>>>,
    failing_mutations: Arc<Mutex<bool>>,
    next_id: Arc<AtomicUsize>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing record
    pub fn with_record(self, record_type: RecordType, content: &str) -> Self {
        let id = format!("rec-{}", record_type);
        self.records.lock().unwrap().insert(
            record_type,
            RecordSnapshot {
                id,
                name: RECORD_NAME.to_string(),
                record_type,
                content: content.to_string(),
                ttl: Some(1800),
                proxied: Some(false),
            },
        );
        self
    }

    /// Make fetch() for `record_type` fail with a transport error
    pub fn with_failing_fetch(self, record_type: RecordType) -> Self {
        self.failing_fetch.lock().unwrap().push(record_type);
        self
    }

    /// Make fetch() for `record_type` fail with a malformed response
    pub fn with_malformed_fetch(self, record_type: RecordType) -> Self {
        self.malformed_fetch.lock().unwrap().push(record_type);
        self
    }

    /// Make every create()/update() fail
    pub fn with_failing_mutations(self) -> Self {
        *self.failing_mutations.lock().unwrap() = true;
        self
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.mutations.lock().unwrap().clone()
    }

    pub fn create_count(&self) -> usize {
        self.mutations()
            .iter()
            .filter(|m| matches!(m, Mutation::Create { .. }))
            .count()
    }

    pub fn update_count(&self) -> usize {
        self.mutations()
            .iter()
            .filter(|m| matches!(m, Mutation::Update { .. }))
            .count()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn content(&self, record_type: RecordType) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(&record_type)
            .map(|r| r.content.clone())
    }
}

#[async_trait::async_trait]
impl RecordStore for MockRecordStore {
    async fn fetch(&self, name: &str, record_type: RecordType) -> Result<Option<RecordSnapshot>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_fetch.lock().unwrap().contains(&record_type) {
            return Err(Error::transport("HTTP 500 Internal Server Error"));
        }
        if self.malformed_fetch.lock().unwrap().contains(&record_type) {
            return Err(Error::malformed("expected value at line 1 column 1"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&record_type)
            .filter(|r| r.name == name)
            .cloned())
    }

    async fn create(&self, name: &str, record_type: RecordType, content: &str) -> Result<String> {
        self.mutations.lock().unwrap().push(Mutation::Create {
            name: name.to_string(),
            record_type,
            content: content.to_string(),
        });
        if *self.failing_mutations.lock().unwrap() {
            return Err(Error::provider("mock", "creation rejected"));
        }

        let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().insert(
            record_type,
            RecordSnapshot {
                id: id.clone(),
                name: name.to_string(),
                record_type,
                content: content.to_string(),
                ttl: Some(1800),
                proxied: Some(false),
            },
        );
        Ok(id)
    }

    async fn update(
        &self,
        record_id: &str,
        name: &str,
        record_type: RecordType,
        content: &str,
    ) -> Result<()> {
        self.mutations.lock().unwrap().push(Mutation::Update {
            record_id: record_id.to_string(),
            name: name.to_string(),
            record_type,
            content: content.to_string(),
        });
        if *self.failing_mutations.lock().unwrap() {
            return Err(Error::provider("mock", "update rejected"));
        }

        if let Some(record) = self.records.lock().unwrap().get_mut(&record_type) {
            record.content = content.to_string();
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A Notifier that keeps every message
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Settings for `families` with notifications enabled
pub fn settings(families: &[AddressFamily], add_if_missing: bool) -> ReconcileSettings {
    ReconcileSettings {
        record_name: RECORD_NAME.to_string(),
        families: families.to_vec(),
        add_if_missing,
        notify: true,
    }
}

/// Build a reconciler with a 3-attempt, zero-delay resolver
pub fn reconciler<S: AddressSource + 'static>(
    source: S,
    store: MockRecordStore,
    notifier: RecordingNotifier,
    settings: ReconcileSettings,
) -> Reconciler {
    let resolver = AddressResolver::with_policy(Box::new(source), 3, Duration::ZERO);
    Reconciler::new(resolver, Box::new(store), Box::new(notifier), settings)
        .expect("reconciler construction succeeds")
}
