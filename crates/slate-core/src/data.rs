use std::fmt;
use std::path::PathBuf;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::tasks::BlobLoader;

/// Payload of a paste or drop, as handed over by the host.
#[derive(Debug, Default)]
pub struct DataTransfer {
    pub text: Option<String>,
    pub files: Vec<FileBlob>,
}

impl DataTransfer {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            files: Vec::new(),
        }
    }

    pub fn files(files: Vec<FileBlob>) -> Self {
        Self { text: None, files }
    }
}

pub enum BlobSource {
    Bytes(Vec<u8>),
    Deferred(BlobLoader),
}

impl fmt::Debug for BlobSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            BlobSource::Deferred(_) => write!(f, "Deferred"),
        }
    }
}

#[derive(Debug)]
pub struct FileBlob {
    pub name: String,
    pub media_type: String,
    pub source: BlobSource,
}

impl FileBlob {
    pub fn from_bytes(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: BlobSource::Bytes(bytes),
        }
    }

    pub fn deferred(name: impl Into<String>, media_type: impl Into<String>, load: BlobLoader) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: BlobSource::Deferred(load),
        }
    }

    /// A file on disk, read when the blob is consumed. The media type is
    /// guessed from the extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let media_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(media_type_for_extension)
            .unwrap_or("application/octet-stream")
            .to_string();
        Self::deferred(name, media_type, Box::new(move || std::fs::read(path)))
    }

    pub fn top_level_type(&self) -> &str {
        self.media_type.split('/').next().unwrap_or_default()
    }

    pub fn into_loader(self) -> BlobLoader {
        match self.source {
            BlobSource::Bytes(bytes) => Box::new(move || Ok(bytes)),
            BlobSource::Deferred(load) => load,
        }
    }
}

pub fn media_type_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// `data:` URL carrying `bytes` base64-encoded.
pub fn data_url(media_type: &str, bytes: &[u8]) -> String {
    format!("data:{media_type};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_urls_are_base64_encoded() {
        assert_eq!(data_url("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn path_blobs_guess_media_type() {
        let blob = FileBlob::from_path("/tmp/cat.JPG");
        assert_eq!(blob.name, "cat.JPG");
        assert_eq!(blob.media_type, "image/jpeg");
        assert_eq!(blob.top_level_type(), "image");
    }
}
