use std::path::{Path, PathBuf};
use std::fs;
use std::io::{self, Cursor};
use std::sync::Arc;
use std::env;
use tokio::sync::Mutex;
use sha2::{Sha256, Digest};

use crate::resources::{LanguageResource, ResourceInfo};

/// Environment variable overriding the cache root
pub const CACHE_ENV_VAR: &str = "DISASTER_CLASSIFIER_DATA";

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),
    #[error("Resource verification failed for {0}")]
    VerificationFailed(String),
    #[error("Hash mismatch: expected {expected}, got {actual} for {resource} package")]
    HashMismatch {
        resource: String,
        expected: String,
        actual: String,
    },
}

#[derive(Clone, Debug)]
pub struct ResourceManager {
    resources_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ResourceManager {
    /// Creates a new ResourceManager with the default resources directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_resources_dir())
    }

    /// Returns the default resources directory path
    pub fn get_default_resources_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var(CACHE_ENV_VAR) {
            return PathBuf::from(path).join("resources");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("disaster-classifier").join("resources");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("disaster-classifier").join("resources");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("disaster-classifier").join("resources")
    }

    pub fn new<P: AsRef<Path>>(resources_dir: P) -> io::Result<Self> {
        let resources_dir = resources_dir.as_ref().to_path_buf();
        fs::create_dir_all(&resources_dir)?;
        Ok(Self {
            resources_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn resources_dir(&self) -> &Path {
        &self.resources_dir
    }

    /// Directory holding the extracted files of a resource
    pub fn get_resource_dir(&self, resource: LanguageResource) -> PathBuf {
        self.resources_dir.join(resource.get_resource_info().name)
    }

    pub fn get_resource_files(&self, resource: LanguageResource) -> Vec<PathBuf> {
        let dir = self.get_resource_dir(resource);
        resource.file_names().into_iter().map(|f| dir.join(f)).collect()
    }

    pub fn is_resource_downloaded(&self, resource: LanguageResource) -> bool {
        let files = self.get_resource_files(resource);
        log::debug!("Checking if resource {:?} is downloaded:", resource);
        for file in &files {
            log::debug!("  {:?} (exists: {})", file, file.exists());
        }
        files.iter().all(|f| f.exists())
    }

    /// Checks that every extracted file of the resource is present and non-empty
    pub fn verify_resource(&self, resource: LanguageResource) -> Result<bool, ResourceError> {
        for file in self.get_resource_files(resource) {
            if !file.exists() {
                log::info!("Resource file {:?} is missing", file);
                return Ok(false);
            }
            if fs::metadata(&file)?.len() == 0 {
                log::warn!("Resource file {:?} is empty", file);
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub async fn download_resource(&self, resource: LanguageResource) -> Result<(), ResourceError> {
        let info = resource.get_resource_info();
        let _lock = self.download_lock.lock().await;

        let result = self.download_and_extract(&info, resource).await;
        if let Err(e) = &result {
            log::error!("Failed to set up resource '{}': {}", info.name, e);
            // Cleanup on failure
            let _ = self.remove_download(resource);
        }
        result
    }

    async fn download_and_extract(
        &self,
        info: &ResourceInfo,
        resource: LanguageResource,
    ) -> Result<(), ResourceError> {
        log::info!("Downloading {} package from {}", info.name, info.url);
        let response = reqwest::get(&info.url).await?.error_for_status()?;
        log::debug!("Download response status: {}", response.status());
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        self.install_package(info, resource, &bytes)
    }

    /// Checks a fetched package, extracts its members and verifies the result
    pub fn install_package(
        &self,
        info: &ResourceInfo,
        resource: LanguageResource,
        archive_bytes: &[u8],
    ) -> Result<(), ResourceError> {
        verify_archive(info, archive_bytes)?;
        self.extract_members(info, resource, archive_bytes)?;

        if !self.verify_resource(resource)? {
            return Err(ResourceError::VerificationFailed(info.name.clone()));
        }
        log::info!("{} package ready", info.name);
        Ok(())
    }

    /// Writes the wanted members of a zip package into the resource directory
    pub fn extract_members(
        &self,
        info: &ResourceInfo,
        resource: LanguageResource,
        archive_bytes: &[u8],
    ) -> Result<(), ResourceError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))?;
        let dir = self.get_resource_dir(resource);
        fs::create_dir_all(&dir)?;

        for (member, target) in info.members.iter().zip(self.get_resource_files(resource)) {
            let mut entry = archive.by_name(member)?;
            log::debug!("Extracting {} to {:?}", member, target);
            let mut out = fs::File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
        }
        Ok(())
    }

    pub fn remove_download(&self, resource: LanguageResource) -> Result<(), ResourceError> {
        for file in self.get_resource_files(resource) {
            if file.exists() {
                fs::remove_file(&file)?;
            }
        }
        Ok(())
    }

    /// Ensures that a resource is present, downloading it when missing or damaged.
    pub async fn ensure_resource_downloaded(&self, resource: LanguageResource) -> Result<(), ResourceError> {
        if !self.is_resource_downloaded(resource) {
            log::info!("Resource {:?} not found, downloading...", resource);
            self.download_resource(resource).await?;
        } else if !self.verify_resource(resource)? {
            log::info!("Resource {:?} verification failed, re-downloading...", resource);
            self.remove_download(resource)?;
            self.download_resource(resource).await?;
        } else {
            log::debug!("Resource {:?} already present", resource);
        }
        Ok(())
    }

    /// Makes every required language resource available. Safe to call repeatedly.
    pub async fn ensure_resources_downloaded(&self, fresh: bool) -> Result<(), ResourceError> {
        for resource in LanguageResource::REQUIRED {
            if fresh {
                log::info!("Fresh download requested - removing {:?}", resource);
                self.remove_download(resource)?;
            }
            self.ensure_resource_downloaded(resource).await?;
        }
        Ok(())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Compares a package with its pinned SHA-256. Packages without a pin pass.
pub fn verify_archive(info: &ResourceInfo, archive_bytes: &[u8]) -> Result<(), ResourceError> {
    let Some(expected) = &info.archive_hash else {
        return Ok(());
    };
    let actual = sha256_hex(archive_bytes);
    if !actual.eq_ignore_ascii_case(expected) {
        log::error!("{} hash mismatch: expected {}, got {}", info.name, expected, actual);
        return Err(ResourceError::HashMismatch {
            resource: info.name.clone(),
            expected: expected.clone(),
            actual,
        });
    }
    log::debug!("{} package hash verified", info.name);
    Ok(())
}
