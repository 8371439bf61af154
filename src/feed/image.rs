//! Image attachments as self-contained `data:` URIs

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a supported image file")]
    NotAnImage(PathBuf),
    #[error("{0} is empty")]
    Empty(PathBuf),
}

/// MIME type for an image path, judged by extension.
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => return None,
    };
    Some(mime)
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Read an image file into a `data:` URI.
pub async fn read_data_uri(path: &Path) -> Result<String, ImageError> {
    let mime = mime_for(path).ok_or_else(|| ImageError::NotAnImage(path.to_path_buf()))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ImageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    if bytes.is_empty() {
        return Err(ImageError::Empty(path.to_path_buf()));
    }
    tracing::debug!("Read {} bytes of {} from {}", bytes.len(), mime, path.display());
    Ok(encode_data_uri(mime, &bytes))
}

/// Short label for an image in a terminal, e.g. `image/png, 12.4 KB`.
pub fn describe_data_uri(uri: &str) -> String {
    let Some(rest) = uri.strip_prefix("data:") else {
        return "image".to_string();
    };
    let Some((meta, payload)) = rest.split_once(',') else {
        return "image".to_string();
    };
    let mime = meta.split(';').next().filter(|m| !m.is_empty()).unwrap_or("image");

    let size = if meta.ends_with(";base64") {
        let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
        (payload.len() / 4 * 3).saturating_sub(padding)
    } else {
        payload.len()
    };
    format!("{}, {}", mime, human_size(size))
}

fn human_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for(Path::new("cat.PNG")), Some("image/png"));
        assert_eq!(mime_for(Path::new("a/b.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("no_extension")), None);
    }

    #[test]
    fn test_encode_data_uri() {
        assert_eq!(
            encode_data_uri("image/gif", b"GIF89a"),
            "data:image/gif;base64,R0lGODlh"
        );
    }

    #[test]
    fn test_describe_data_uri() {
        assert_eq!(describe_data_uri("data:image/gif;base64,R0lGODlh"), "image/gif, 6 B");
        assert_eq!(describe_data_uri("data:image/png;base64,AA=="), "image/png, 1 B");
        let big = encode_data_uri("image/png", &vec![0u8; 2048]);
        assert_eq!(describe_data_uri(&big), "image/png, 2.0 KB");
        assert_eq!(describe_data_uri("garbage"), "image");
    }

    #[tokio::test]
    async fn test_read_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let uri = read_data_uri(&path).await.unwrap();
        assert_eq!(uri, encode_data_uri("image/png", b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_read_data_uri_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            read_data_uri(&missing).await,
            Err(ImageError::Read { .. })
        ));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        assert!(matches!(
            read_data_uri(&text).await,
            Err(ImageError::NotAnImage(_))
        ));

        let empty = dir.path().join("empty.gif");
        std::fs::write(&empty, b"").unwrap();
        assert!(matches!(
            read_data_uri(&empty).await,
            Err(ImageError::Empty(_))
        ));
    }
}
