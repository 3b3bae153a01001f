use anyhow::{bail, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::utils::text::strip_data_uri_prefix;

/// Encodes raw image bytes as the bare base64 payload the analysis endpoint expects.
pub fn encode_image(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        bail!("Image is empty");
    }
    Ok(STANDARD.encode(bytes))
}

/// Accepts either a data URI or a bare payload and checks that it decodes.
pub fn normalize_base64_image(value: &str) -> Result<String> {
    let payload = strip_data_uri_prefix(value.trim());
    if payload.is_empty() {
        bail!("Image is empty");
    }
    STANDARD
        .decode(payload)
        .map_err(|e| anyhow::anyhow!("Image is not valid base64: {}", e))?;
    Ok(payload.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
pub async fn encode_image_file(path: &std::path::Path) -> Result<String> {
    use anyhow::Context;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    encode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_image() {
        assert_eq!(encode_image(b"\xff\xd8\xff").unwrap(), "/9j/");
        assert!(encode_image(&[]).is_err());
    }

    #[test]
    fn test_normalize_base64_image() {
        assert_eq!(normalize_base64_image("data:image/jpeg;base64,/9j/").unwrap(), "/9j/");
        assert_eq!(normalize_base64_image(" /9j/ ").unwrap(), "/9j/");
        assert!(normalize_base64_image("data:image/png;base64,").is_err());
        assert!(normalize_base64_image("not base64!").is_err());
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn test_encode_image_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("face.jpg");
        std::fs::write(&path, b"\xff\xd8\xff")?;
        assert_eq!(encode_image_file(&path).await?, "/9j/");
        assert!(encode_image_file(&dir.path().join("missing.jpg")).await.is_err());
        Ok(())
    }
}
