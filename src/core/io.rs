use async_trait::async_trait;
use anyhow::Result;

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> StorageBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> StorageBounds for T {}

/// Local key-value storage, the counterpart of the browser's `localStorage`.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait Storage: StorageBounds {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;
    async fn set_item(&self, key: &str, value: &str) -> Result<()>;
}

// --- Native Implementation ---

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;

/// One file per key under a root folder.
#[cfg(not(target_arch = "wasm32"))]
pub struct NativeStorage {
    root: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl NativeStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            anyhow::bail!("Invalid storage key: {:?}", key);
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[async_trait]
impl Storage for NativeStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !tokio::fs::try_exists(&path).await? {
            return Ok(None);
        }
        Ok(Some(tokio::fs::read_to_string(&path).await?))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(path, value).await?;
        Ok(())
    }
}

// --- Web Implementation ---

#[cfg(target_arch = "wasm32")]
use anyhow::anyhow;

#[cfg(target_arch = "wasm32")]
pub struct WebStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl WebStorage {
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| anyhow!("No window available"))?;
        let storage = window
            .local_storage()
            .map_err(|e| anyhow!("localStorage error: {:?}", e))?
            .ok_or_else(|| anyhow!("localStorage is not available"))?;
        Ok(Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
#[async_trait(?Send)]
impl Storage for WebStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage
            .get_item(key)
            .map_err(|e| anyhow!("Get error: {:?}", e))
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage
            .set_item(key, value)
            .map_err(|e| anyhow!("Set error: {:?}", e))
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_native_storage_round_trip() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path().join("kv"));

        assert_eq!(storage.get_item("confirmedAnalysisData").await?, None);
        storage.set_item("confirmedAnalysisData", r#"{"race":"asian"}"#).await?;
        assert_eq!(
            storage.get_item("confirmedAnalysisData").await?.as_deref(),
            Some(r#"{"race":"asian"}"#)
        );
        assert!(dir.path().join("kv").join("confirmedAnalysisData.json").exists());

        storage.set_item("confirmedAnalysisData", "{}").await?;
        assert_eq!(storage.get_item("confirmedAnalysisData").await?.as_deref(), Some("{}"));
        Ok(())
    }

    #[tokio::test]
    async fn test_native_storage_rejects_path_keys() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = NativeStorage::new(dir.path());
        assert!(storage.set_item("../escape", "x").await.is_err());
        assert!(storage.get_item("").await.is_err());
        Ok(())
    }
}
