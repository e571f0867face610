//! In-memory doubles for the resolver's capability seams.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use astera::error::{Error, Result};
use astera::record::ModuleRecord;
use astera::resolver::{PrefixPatterns, Resolver};
use astera::store::{InsertOutcome, ModuleRepository};
use astera::upstream::UpstreamFetcher;
use astera::vcs::Vcs;

/// HashMap-backed [`ModuleRepository`] with an insert-attempt counter.
#[derive(Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<(String, String), ModuleRecord>>,
    insert_attempts: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str, version: &str) -> Option<ModuleRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(name.to_string(), version.to_string()))
            .cloned()
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }
}

impl ModuleRepository for MemoryRepository {
    fn insert(&self, record: &ModuleRecord) -> Result<InsertOutcome> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        if record.mod_file.is_empty() {
            return Err(Error::Storage("record without a mod file".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let key = (record.name.clone(), record.version.clone());
        if records.contains_key(&key) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        records.insert(key, record.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn version_list(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
            .collect())
    }

    fn version_info(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        non_empty(self.get(name, version).map(|r| r.info))
    }

    fn mod_file(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        non_empty(self.get(name, version).map(|r| r.mod_file))
    }

    fn module_zip(&self, name: &str, version: &str) -> Result<Vec<u8>> {
        non_empty(self.get(name, version).map(|r| r.zip))
    }

    fn exists(&self, name: &str, version: &str) -> Result<bool> {
        Ok(self.get(name, version).is_some())
    }
}

fn non_empty(slot: Option<Vec<u8>>) -> Result<Vec<u8>> {
    match slot {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(Error::NotFound),
    }
}

/// Scripted [`UpstreamFetcher`] with a call counter and optional delay.
#[derive(Default)]
pub struct ScriptedUpstream {
    responses: Mutex<HashMap<String, Result<Bytes>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_latest(&self, module: &str, response: Result<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{module}/@latest"), response);
    }

    pub fn set_artifact(&self, module: &str, version: &str, suffix: &str, response: Result<Bytes>) {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{module}/@v/{version}{suffix}"), response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, key: String) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or(Err(Error::NotFound))
    }
}

#[async_trait]
impl UpstreamFetcher for ScriptedUpstream {
    async fn fetch_latest(&self, module: &str) -> Result<Bytes> {
        self.respond(format!("{module}/@latest")).await
    }

    async fn fetch_info(&self, module: &str, version: &str) -> Result<Bytes> {
        self.respond(format!("{module}/@v/{version}.info")).await
    }

    async fn fetch_mod(&self, module: &str, version: &str) -> Result<Bytes> {
        self.respond(format!("{module}/@v/{version}.mod")).await
    }

    async fn fetch_zip(&self, module: &str, version: &str) -> Result<Bytes> {
        self.respond(format!("{module}/@v/{version}.zip")).await
    }
}

/// Scripted [`Vcs`] double.
#[derive(Default)]
pub struct StaticVcs {
    tags: Mutex<Vec<String>>,
    record: Mutex<Option<ModuleRecord>>,
    clone_calls: AtomicUsize,
}

impl StaticVcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tags(&self, tags: &[&str]) {
        *self.tags.lock().unwrap() = tags.iter().map(|t| t.to_string()).collect();
    }

    pub fn set_record(&self, record: ModuleRecord) {
        *self.record.lock().unwrap() = Some(record);
    }

    pub fn clone_calls(&self) -> usize {
        self.clone_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Vcs for StaticVcs {
    async fn fetch_tags(&self, _repo: &str) -> Result<Vec<String>> {
        Ok(self.tags.lock().unwrap().clone())
    }

    async fn clone_module(&self, repo: &str, tag: &str) -> Result<ModuleRecord> {
        self.clone_calls.fetch_add(1, Ordering::SeqCst);
        self.record
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Vcs(format!("failed to clone repo {repo} at {tag}")))
    }
}

pub struct Fixture {
    pub repository: Arc<MemoryRepository>,
    pub upstream: Arc<ScriptedUpstream>,
    pub vcs: Arc<StaticVcs>,
    pub resolver: Arc<Resolver>,
}

pub fn fixture(goprivate: &str) -> Fixture {
    fixture_with_upstream(goprivate, ScriptedUpstream::new())
}

pub fn fixture_with_upstream(goprivate: &str, upstream: ScriptedUpstream) -> Fixture {
    let repository = Arc::new(MemoryRepository::new());
    let upstream = Arc::new(upstream);
    let vcs = Arc::new(StaticVcs::new());
    let resolver = Arc::new(Resolver::new(
        Arc::clone(&repository) as Arc<dyn ModuleRepository>,
        Arc::clone(&upstream) as Arc<dyn UpstreamFetcher>,
        Arc::clone(&vcs) as Arc<dyn Vcs>,
        PrefixPatterns::new(goprivate),
    ));
    Fixture {
        repository,
        upstream,
        vcs,
        resolver,
    }
}

/// A fully populated record for direct store seeding.
pub fn record(name: &str, version: &str) -> ModuleRecord {
    ModuleRecord {
        name: name.to_string(),
        version: version.to_string(),
        info: format!(r#"{{"Version":"{version}"}}"#).into_bytes(),
        mod_file: format!("module {name}\n").into_bytes(),
        zip: b"zip bytes".to_vec(),
        zip_hash: "h1:test".to_string(),
    }
}

pub const SAMPLE_INFO: &str = r#"{"Version":"v1.0.0","Time":"2024-01-02T03:04:05Z","Origin":{"VCS":"git","URL":"https://example.com/a","Hash":"h1","Ref":"refs/tags/v1.0.0"}}"#;
