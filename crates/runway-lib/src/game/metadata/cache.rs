use super::fetcher::MetaFetcher;
use super::types::{Component, LoadOutcome, MetaIndex, MetaVersion, PackageVersions, Requirement};
use super::version_file::{expect_typed, TypedVersionFile, VersionFile};
use crate::error::MetadataError;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

const INDEX_FILENAME: &str = "index.json";
const FRESHNESS_DAYS: i64 = 6; // Refresh the catalog at most every 6 days

/// In-memory catalog snapshot. Replaced wholesale, never mutated in place.
#[derive(Debug, Clone, Default)]
struct Catalog {
    index: MetaIndex,
    packages: HashMap<Component, Arc<PackageVersions>>,
    /// Derived membership index, rebuilt whenever `packages` changes
    version_map: HashMap<Component, HashSet<String>>,
}

impl Catalog {
    fn new(index: MetaIndex) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    fn insert_package(&mut self, component: Component, mut versions: PackageVersions) {
        // Ensure versions are sorted (latest first)
        versions
            .versions
            .sort_by(|a, b| b.release_time.cmp(&a.release_time));
        self.version_map.insert(
            component,
            versions.versions.iter().map(|v| v.version.clone()).collect(),
        );
        self.packages.insert(component, Arc::new(versions));
    }

    fn lists_component(&self, component: Component) -> bool {
        self.index
            .packages
            .iter()
            .any(|p| p.component() == Some(component))
    }

    fn is_fresh(&self) -> bool {
        match self.index.last_updated() {
            Some(updated) => Utc::now() - updated < Duration::days(FRESHNESS_DAYS),
            None => false,
        }
    }
}

/// Component catalog with an on-disk cache under `<base>/meta`.
///
/// Version lists and version files are loaded lazily and cached for the life
/// of the store. Version files are keyed by (component, version).
pub struct MetadataStore {
    meta_dir: PathBuf,
    fetcher: MetaFetcher,
    catalog: RwLock<Option<Arc<Catalog>>>,
    files: Mutex<HashMap<(Component, String), Arc<VersionFile>>>,
    refresh_lock: Mutex<()>,
}

impl MetadataStore {
    pub fn new(meta_dir: PathBuf, fetcher: MetaFetcher) -> Self {
        Self {
            meta_dir,
            fetcher,
            catalog: RwLock::new(None),
            files: Mutex::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Load the catalog from disk, refreshing from the network when the cached
    /// index is older than six days or `force` is set.
    ///
    /// A failed refresh keeps whatever catalog was already available and
    /// reports [`LoadOutcome::Stale`]; it is only fatal when there is none.
    pub async fn load(&self, force: bool) -> Result<LoadOutcome, MetadataError> {
        let _guard = self.refresh_lock.lock().await;

        let local = match self.read_local_catalog().await {
            Ok(local) => local,
            Err(e) => {
                log::warn!("Failed to load cached catalog: {:#}", e);
                None
            }
        };

        if let Some(ref cached) = local {
            if !force && cached.is_fresh() {
                log::info!(
                    "Using cached catalog ({} packages)",
                    cached.index.packages.len()
                );
                self.install(cached.clone()).await;
                return Ok(LoadOutcome::Cached);
            }
            log::info!("Cached catalog is stale or refresh was forced, refreshing...");
        } else {
            log::info!("No cached catalog found, fetching fresh...");
        }

        match self.fetch_remote_catalog().await {
            Ok((catalog, documents)) => {
                if let Err(e) = self.persist(&catalog, &documents).await {
                    log::warn!("Failed to save catalog to cache: {:#}", e);
                }
                log::info!(
                    "Catalog refreshed: {} packages, {} version lists",
                    catalog.index.packages.len(),
                    catalog.packages.len()
                );
                self.install(catalog).await;
                // Files are re-read against the new checksums
                self.files.lock().await.clear();
                Ok(LoadOutcome::Refreshed)
            }
            Err(e) => {
                log::error!("Failed to refresh catalog: {:#}", e);

                let has_memory = self.catalog.read().await.is_some();
                if has_memory {
                    log::warn!("Keeping the catalog already in memory");
                    return Ok(LoadOutcome::Stale);
                }
                match local {
                    Some(cached) => {
                        log::warn!("Falling back to stale cached catalog");
                        self.install(cached).await;
                        Ok(LoadOutcome::Stale)
                    }
                    None => Err(MetadataError::NoCatalog),
                }
            }
        }
    }

    /// Force a network refresh
    pub async fn refresh(&self) -> Result<LoadOutcome, MetadataError> {
        self.load(true).await
    }

    pub async fn is_loaded(&self) -> bool {
        self.catalog.read().await.is_some()
    }

    /// Load once; later calls reuse the in-memory catalog
    pub async fn ensure_loaded(&self) -> Result<(), MetadataError> {
        if !self.is_loaded().await {
            self.load(false).await?;
        }
        Ok(())
    }

    /// Versions of a component, newest first
    pub async fn get_versions(&self, component: Component) -> Result<Vec<MetaVersion>, MetadataError> {
        let catalog = self.snapshot().await?;
        if let Some(package) = catalog.packages.get(&component) {
            return Ok(package.versions.clone());
        }
        if !catalog.lists_component(component) {
            log::debug!("Catalog does not list {}", component);
            return Ok(Vec::new());
        }

        let versions = self.load_package(component).await?;

        let mut guard = self.catalog.write().await;
        let mut next = guard.as_deref().cloned().unwrap_or_default();
        next.insert_package(component, versions);
        let result = next
            .packages
            .get(&component)
            .map(|p| p.versions.clone())
            .unwrap_or_default();
        *guard = Some(Arc::new(next));
        Ok(result)
    }

    /// Membership check against the loaded version lists
    pub async fn contains_version(&self, component: Component, version: &str) -> bool {
        self.catalog
            .read()
            .await
            .as_ref()
            .and_then(|c| c.version_map.get(&component))
            .is_some_and(|set| set.contains(version))
    }

    /// A single catalog entry
    pub async fn find_version(
        &self,
        component: Component,
        version: &str,
    ) -> Result<MetaVersion, MetadataError> {
        self.get_versions(component)
            .await?
            .into_iter()
            .find(|v| v.version == version)
            .ok_or_else(|| MetadataError::VersionNotFound {
                component,
                version: version.to_string(),
            })
    }

    /// First recommended version, falling back to the newest
    pub async fn recommended(&self, component: Component) -> Result<Option<MetaVersion>, MetadataError> {
        let versions = self.get_versions(component).await?;
        let recommended = versions.iter().find(|v| v.recommended).cloned();
        Ok(recommended.or_else(|| versions.into_iter().next()))
    }

    /// Select the version a requirement points at: `equals`, else `suggests`,
    /// else the newest version of the referenced component
    pub async fn resolve_requirement(
        &self,
        requirement: &Requirement,
    ) -> Result<(Component, MetaVersion), MetadataError> {
        let component = requirement.component().ok_or_else(|| {
            MetadataError::Other(anyhow::anyhow!("Unknown component uid: {}", requirement.uid))
        })?;
        let versions = self.get_versions(component).await?;

        if let Some(ref exact) = requirement.equals {
            return versions
                .into_iter()
                .find(|v| &v.version == exact)
                .map(|v| (component, v))
                .ok_or_else(|| MetadataError::VersionNotFound {
                    component,
                    version: exact.clone(),
                });
        }

        if let Some(ref suggested) = requirement.suggests {
            if let Some(v) = versions.iter().find(|v| &v.version == suggested) {
                return Ok((component, v.clone()));
            }
            log::warn!(
                "Suggested {} {} is not in the catalog, using the latest version",
                component,
                suggested
            );
        }

        versions
            .into_iter()
            .next()
            .map(|v| (component, v))
            .ok_or_else(|| MetadataError::VersionNotFound {
                component,
                version: "latest".to_string(),
            })
    }

    /// Resolved requirements of one version; a version without requirements
    /// yields an empty list
    pub async fn dependencies(
        &self,
        component: Component,
        version: &str,
    ) -> Result<Vec<(Component, MetaVersion)>, MetadataError> {
        let meta = self.find_version(component, version).await?;
        let mut resolved = Vec::with_capacity(meta.requires.len());
        for requirement in &meta.requires {
            if requirement.component().is_none() {
                log::debug!("Skipping requirement on unknown component {}", requirement.uid);
                continue;
            }
            resolved.push(self.resolve_requirement(requirement).await?);
        }
        Ok(resolved)
    }

    /// The parsed version file of (component, version), loaded once per catalog
    pub async fn get_version_file(
        &self,
        component: Component,
        version: &str,
    ) -> Result<Arc<VersionFile>, MetadataError> {
        let key = (component, version.to_string());
        if let Some(file) = self.files.lock().await.get(&key) {
            return Ok(file.clone());
        }

        let meta = self.find_version(component, version).await?;
        let path = self.version_file_path(component, version);

        if path.exists() {
            match self.read_local_version_file(component, &meta, &path).await {
                Ok(file) => return Ok(self.remember(key, file).await),
                Err(e) => log::warn!(
                    "Cached version file {:?} is unusable ({:#}), fetching again",
                    path,
                    e
                ),
            }
        }

        let relative = format!("{}/{}.json", component.uid(), version);
        let body = self
            .fetcher
            .fetch_text(&relative)
            .await
            .context(format!("Failed to fetch {} {} version file", component, version))?;
        verify_sha256(&path, body.as_bytes(), meta.sha256.as_deref())?;
        let file = VersionFile::parse(component, &body)?;

        if let Err(e) = write_atomic(&path, &body).await {
            log::warn!("Failed to cache version file {:?}: {:#}", path, e);
        }

        Ok(self.remember(key, file).await)
    }

    /// Typed version file, e.g. `get_version_meta::<MinecraftFile>(Component::Minecraft, "1.16.1")`
    pub async fn get_version_meta<T: TypedVersionFile>(
        &self,
        component: Component,
        version: &str,
    ) -> Result<T, MetadataError> {
        let file = self.get_version_file(component, version).await?;
        expect_typed(&file, component)
    }

    fn version_file_path(&self, component: Component, version: &str) -> PathBuf {
        self.meta_dir
            .join(component.uid())
            .join(format!("{}.json", version))
    }

    async fn remember(&self, key: (Component, String), file: VersionFile) -> Arc<VersionFile> {
        let file = Arc::new(file);
        self.files.lock().await.insert(key, file.clone());
        file
    }

    async fn snapshot(&self) -> Result<Arc<Catalog>, MetadataError> {
        self.catalog
            .read()
            .await
            .clone()
            .ok_or(MetadataError::NoCatalog)
    }

    async fn install(&self, catalog: Catalog) {
        *self.catalog.write().await = Some(Arc::new(catalog));
    }

    async fn read_local_catalog(&self) -> Result<Option<Catalog>> {
        let index_path = self.meta_dir.join(INDEX_FILENAME);
        if !index_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&index_path)
            .await
            .context("Failed to read catalog index")?;
        let index: MetaIndex =
            serde_json::from_str(&contents).context("Failed to parse catalog index JSON")?;

        let mut catalog = Catalog::new(index);
        let components: Vec<Component> = catalog
            .index
            .packages
            .iter()
            .filter_map(|p| p.component())
            .collect();

        for component in components {
            let path = self.package_path(component);
            if !path.exists() {
                continue;
            }
            match read_json::<PackageVersions>(&path).await {
                Ok(versions) => catalog.insert_package(component, versions),
                Err(e) => log::warn!("Ignoring unreadable version list {:?}: {:#}", path, e),
            }
        }

        Ok(Some(catalog))
    }

    /// Fetch the index and every known component's version list. Nothing is
    /// returned unless all documents parsed.
    async fn fetch_remote_catalog(&self) -> Result<(Catalog, Vec<(Component, String)>)> {
        log::info!("Getting meta packages...");
        let body = self.fetcher.fetch_text(INDEX_FILENAME).await?;
        let mut index: MetaIndex =
            serde_json::from_str(&body).context("Failed to parse remote catalog index")?;
        index.latest_update = Utc::now().timestamp_millis();

        let mut catalog = Catalog::new(index);
        let mut documents = Vec::new();

        let components: Vec<Component> = catalog
            .index
            .packages
            .iter()
            .filter_map(|p| p.component())
            .collect();

        for component in components {
            let body = self
                .fetcher
                .fetch_text(&format!("{}/{}", component.uid(), INDEX_FILENAME))
                .await?;
            let versions: PackageVersions = serde_json::from_str(&body)
                .context(format!("Failed to parse version list of {}", component))?;
            catalog.insert_package(component, versions);
            documents.push((component, body));
        }

        Ok((catalog, documents))
    }

    /// Write version lists first and the index last, so a torn write never
    /// leaves a fresh-looking index without its lists
    async fn persist(&self, catalog: &Catalog, documents: &[(Component, String)]) -> Result<()> {
        fs::create_dir_all(&self.meta_dir)
            .await
            .context("Failed to create meta directory")?;

        for (component, body) in documents {
            write_atomic(&self.package_path(*component), body).await?;
        }

        let json = serde_json::to_string_pretty(&catalog.index)
            .context("Failed to serialize catalog index")?;
        write_atomic(&self.meta_dir.join(INDEX_FILENAME), &json).await?;

        log::debug!("Saved catalog to {:?}", self.meta_dir);
        Ok(())
    }

    /// Version list of a component not covered by the last load
    async fn load_package(&self, component: Component) -> Result<PackageVersions, MetadataError> {
        let path = self.package_path(component);
        if path.exists() {
            match read_json::<PackageVersions>(&path).await {
                Ok(versions) => return Ok(versions),
                Err(e) => log::warn!("Cached version list {:?} is unusable: {:#}", path, e),
            }
        }

        let body = self
            .fetcher
            .fetch_text(&format!("{}/{}", component.uid(), INDEX_FILENAME))
            .await?;
        let versions: PackageVersions = serde_json::from_str(&body)
            .context(format!("Failed to parse version list of {}", component))?;
        if let Err(e) = write_atomic(&path, &body).await {
            log::warn!("Failed to cache version list {:?}: {:#}", path, e);
        }
        Ok(versions)
    }

    async fn read_local_version_file(
        &self,
        component: Component,
        meta: &MetaVersion,
        path: &Path,
    ) -> Result<VersionFile> {
        let body = fs::read(path)
            .await
            .context(format!("Failed to read {:?}", path))?;
        verify_sha256(path, &body, meta.sha256.as_deref())?;
        let text = String::from_utf8(body).context("Version file is not UTF-8")?;
        VersionFile::parse(component, &text)
    }

    fn package_path(&self, component: Component) -> PathBuf {
        self.meta_dir.join(component.uid()).join(INDEX_FILENAME)
    }
}

fn verify_sha256(path: &Path, bytes: &[u8], expected: Option<&str>) -> Result<(), MetadataError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let actual = format!("{:x}", Sha256::digest(bytes));
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(MetadataError::ChecksumMismatch {
            path: path.to_string_lossy().to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .await
        .context(format!("Failed to read {:?}", path))?;
    serde_json::from_str(&contents).context(format!("Failed to parse {:?}", path))
}

/// Write through a temporary sibling and rename into place
pub(crate) async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create {:?}", parent))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)
        .await
        .context(format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path)
        .await
        .context(format!("Failed to move {:?} into place", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn checksum_verification() {
        let path = Path::new("x.json");
        // sha256("abc")
        let good = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(verify_sha256(path, b"abc", Some(good)).is_ok());
        assert!(verify_sha256(path, b"abc", None).is_ok());
        assert!(matches!(
            verify_sha256(path, b"abd", Some(good)),
            Err(MetadataError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn freshness_window() {
        let mut catalog = Catalog::default();
        assert!(!catalog.is_fresh());
        catalog.index.latest_update = (Utc::now() - Duration::days(5)).timestamp_millis();
        assert!(catalog.is_fresh());
        catalog.index.latest_update = (Utc::now() - Duration::days(7)).timestamp_millis();
        assert!(!catalog.is_fresh());
    }

    #[tokio::test]
    async fn operations_need_a_catalog() {
        let tmp = TempDir::new().unwrap();
        let fetcher = MetaFetcher::new("http://127.0.0.1:9/meta/").unwrap();
        let store = MetadataStore::new(tmp.path().join("meta"), fetcher);
        assert!(matches!(
            store.get_versions(Component::Minecraft).await,
            Err(MetadataError::NoCatalog)
        ));
        assert!(!store.contains_version(Component::Minecraft, "1.16.1").await);
    }
}
