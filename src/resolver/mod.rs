//! Query resolution pipeline.
//!
//! Parses proxy request paths, routes between the durable store, the
//! upstream proxy, and the VCS clone path, and coalesces concurrent
//! identical requests so that a miss triggers exactly one
//! fetch-and-persist followed by a re-read from the store.

pub mod escape;
pub mod import;
pub mod path;
pub mod pattern;
pub mod vercmp;

pub use path::{parse, ArtifactKind, ResourceId};
pub use pattern::PrefixPatterns;

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};
use crate::record::{ModuleRecord, VersionInfo};
use crate::singleflight::SingleFlight;
use crate::store::{InsertOutcome, ModuleRepository};
use crate::upstream::UpstreamFetcher;
use crate::vcs::Vcs;

pub struct Resolver {
    repository: Arc<dyn ModuleRepository>,
    upstream: Arc<dyn UpstreamFetcher>,
    vcs: Arc<dyn Vcs>,
    private: PrefixPatterns,
    flights: SingleFlight,
}

impl Resolver {
    pub fn new(
        repository: Arc<dyn ModuleRepository>,
        upstream: Arc<dyn UpstreamFetcher>,
        vcs: Arc<dyn Vcs>,
        private: PrefixPatterns,
    ) -> Self {
        Self {
            repository,
            upstream,
            vcs,
            private,
            flights: SingleFlight::new(),
        }
    }

    /// Resolve one request path into the response body bytes.
    pub async fn query(&self, request_path: &str) -> Result<Bytes> {
        match path::parse(request_path)? {
            ResourceId::ChecksumProbe => Err(Error::NotFound),
            ResourceId::VersionList { module } => self.version_list(&module).await,
            ResourceId::Latest { module } => self.latest(&module).await,
            ResourceId::Artifact {
                module,
                version,
                kind,
            } => self.artifact(&module, &version, kind).await,
        }
    }

    /// Bulk-import an on-disk module cache, typically before serving.
    pub fn import_cached_modules(&self, root: &Path) -> Result<()> {
        import::import_cached_modules(self.repository.as_ref(), root)
    }

    async fn version_list(&self, module: &str) -> Result<Bytes> {
        let canonical = escape::unescape_path(module)?;

        let mut versions = if self.private.matches(&canonical) {
            self.vcs.fetch_tags(&canonical).await?
        } else {
            self.repository.version_list(&canonical)?
        };

        vercmp::sort(&mut versions);
        Ok(Bytes::from(versions.join("\n")))
    }

    async fn latest(&self, module: &str) -> Result<Bytes> {
        let canonical = escape::unescape_path(module)?;

        if !self.private.matches(&canonical) {
            return self.upstream.fetch_latest(module).await;
        }

        let tags = self.vcs.fetch_tags(&canonical).await?;
        let latest = vercmp::max(&tags).ok_or(Error::NotFound)?;
        let body = serde_json::json!({ "Version": latest });
        Ok(Bytes::from(body.to_string()))
    }

    async fn artifact(&self, module: &str, version: &str, kind: ArtifactKind) -> Result<Bytes> {
        match self.read_from_store(module, version, kind).await {
            Ok(body) => Ok(body),
            Err(Error::NotFound) => {
                self.fetch_and_persist(module, version).await?;
                // The record may legitimately lack this artifact (legacy
                // imports carry no info or zip), so this read can still
                // be NotFound.
                self.read_from_store(module, version, kind).await
            }
            Err(err) => Err(err),
        }
    }

    /// One store read through the single-flight group: a stampede for the
    /// same missing artifact costs one database check.
    async fn read_from_store(
        &self,
        module: &str,
        version: &str,
        kind: ArtifactKind,
    ) -> Result<Bytes> {
        let name = escape::unescape_path(module)?;
        let version = escape::unescape_version(version)?;
        let key = flight_key(&name, &version, kind.suffix());

        let repository = Arc::clone(&self.repository);
        self.flights
            .run(&key, || async move {
                let bytes = match kind {
                    ArtifactKind::Info => repository.version_info(&name, &version)?,
                    ArtifactKind::Mod => repository.mod_file(&name, &version)?,
                    ArtifactKind::Zip => repository.module_zip(&name, &version)?,
                };
                Ok(Bytes::from(bytes))
            })
            .await
    }

    /// Materialize `(module, version)` into the store, at most once per
    /// key in flight across all concurrent callers.
    async fn fetch_and_persist(&self, module: &str, version: &str) -> Result<()> {
        let name = escape::unescape_path(module)?;
        let canonical_version = escape::unescape_version(version)?;
        let key = format!("{name}-{canonical_version}");

        self.flights
            .run(&key, || async move {
                self.persist_missing(module, version).await?;
                Ok(Bytes::new())
            })
            .await?;
        Ok(())
    }

    async fn persist_missing(&self, module: &str, version: &str) -> Result<()> {
        let name = escape::unescape_path(module)?;
        let canonical_version = escape::unescape_version(version)?;

        // Another worker may have won the race before this flight began.
        if self.repository.exists(&name, &canonical_version)? {
            return Ok(());
        }

        let record = if self.private.matches(&name) {
            self.vcs.clone_module(&name, &canonical_version).await?
        } else {
            self.fetch_module(module, version, &name, &canonical_version)
                .await?
        };

        match self.repository.insert(&record)? {
            InsertOutcome::Inserted => {
                debug!(module = %record.name, version = %record.version, "stored module");
            }
            InsertOutcome::AlreadyExists => {}
        }
        Ok(())
    }

    /// Fetch the three artifacts from the upstream proxy. The flight keys
    /// deliberately collide with the read side, so one stampede costs one
    /// fetch per artifact kind.
    async fn fetch_module(
        &self,
        module: &str,
        version: &str,
        name: &str,
        canonical_version: &str,
    ) -> Result<ModuleRecord> {
        let info = self
            .fetch_artifact(module, version, name, canonical_version, ArtifactKind::Info)
            .await?;
        let mod_file = self
            .fetch_artifact(module, version, name, canonical_version, ArtifactKind::Mod)
            .await?;
        let zip = self
            .fetch_artifact(module, version, name, canonical_version, ArtifactKind::Zip)
            .await?;

        let parsed: VersionInfo = serde_json::from_slice(&info)
            .map_err(|e| Error::UpstreamTransport(format!("invalid info payload: {e}")))?;

        Ok(ModuleRecord {
            name: name.to_string(),
            version: canonical_version.to_string(),
            info: info.to_vec(),
            mod_file: mod_file.to_vec(),
            zip: zip.to_vec(),
            zip_hash: parsed.origin.hash,
        })
    }

    async fn fetch_artifact(
        &self,
        module: &str,
        version: &str,
        name: &str,
        canonical_version: &str,
        kind: ArtifactKind,
    ) -> Result<Bytes> {
        let key = flight_key(name, canonical_version, kind.suffix());
        let upstream = Arc::clone(&self.upstream);
        let module = module.to_string();
        let version = version.to_string();

        self.flights
            .run(&key, || async move {
                match kind {
                    ArtifactKind::Info => upstream.fetch_info(&module, &version).await,
                    ArtifactKind::Mod => upstream.fetch_mod(&module, &version).await,
                    ArtifactKind::Zip => upstream.fetch_zip(&module, &version).await,
                }
            })
            .await
    }
}

fn flight_key(module: &str, version: &str, suffix: &str) -> String {
    format!("{module}-{version}{suffix}")
}
