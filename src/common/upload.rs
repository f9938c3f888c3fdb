use crate::common::response::ApiError;
use axum::extract::{
    multipart::{Field, MultipartError},
    Multipart,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, warn};

static SCRATCH_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No video file found in request")]
    MissingFile,
    #[error("Invalid content type {0}: only video/* allowed")]
    InvalidContentType(String),
    #[error("Uploaded video is empty")]
    Empty,
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::Io(_) => ApiError::internal(err.to_string()),
            // carries 413 when the body limit was hit
            UploadError::Multipart(e) => ApiError(err.to_string(), e.status()),
            _ => ApiError::bad_request(err.to_string()),
        }
    }
}

/// A received upload sitting in the scratch area.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub size: u64,
}

/// Scratch file named after its arrival time, written incrementally.
pub struct ScratchUpload {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
}

impl ScratchUpload {
    pub async fn create(dir: &Path) -> Result<Self, UploadError> {
        Self::open(dir.join(scratch_name())).await
    }

    async fn open(path: PathBuf) -> Result<Self, UploadError> {
        let file = File::create(&path).await?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: Bytes) -> Result<(), UploadError> {
        self.writer.write_all(&chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<StoredUpload, UploadError> {
        if let Err(e) = self.writer.flush().await {
            error!("Upload error: {}", e);
            self.abort().await;
            return Err(e.into());
        }

        if self.written == 0 {
            self.abort().await;
            return Err(UploadError::Empty);
        }

        Ok(StoredUpload {
            path: self.path,
            size: self.written,
        })
    }

    pub async fn abort(self) {
        drop(self.writer);
        if let Err(e) = fs::remove_file(&self.path).await {
            warn!("Failed to remove partial upload {}: {}", self.path.display(), e);
        }
    }
}

fn scratch_name() -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}.webm", millis, seq)
}

pub fn is_accepted_content_type(content_type: Option<&str>) -> bool {
    let Some(raw) = content_type else {
        return true;
    };

    match raw.parse::<mime::Mime>() {
        Ok(m) => m.type_() == mime::VIDEO || m.essence_str() == mime::APPLICATION_OCTET_STREAM.essence_str(),
        Err(_) => false,
    }
}

pub async fn stream_to_disk(mut field: Field<'_>, dir: &Path) -> Result<StoredUpload, UploadError> {
    if !is_accepted_content_type(field.content_type()) {
        let content_type = field.content_type().unwrap_or_default().to_string();
        return Err(UploadError::InvalidContentType(content_type));
    }

    let mut upload = ScratchUpload::create(dir).await?;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(c)) => c,
            Ok(None) => break,
            Err(e) => {
                error!("Stream error: {}", e);
                upload.abort().await;
                return Err(e.into());
            }
        };

        if let Err(e) = upload.write_chunk(chunk).await {
            error!("Upload error: {}", e);
            upload.abort().await;
            return Err(e);
        }
    }

    upload.finish().await
}

/// Pulls the field named `field_name` out of the multipart body and stores it.
pub async fn receive_file(
    multipart: &mut Multipart,
    field_name: &str,
    dir: &Path,
) -> Result<StoredUpload, UploadError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        info!("Receiving upload: {}", file_name);

        return stream_to_disk(field, dir).await;
    }

    Err(UploadError::MissingFile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_video_and_octet_stream() {
        assert!(is_accepted_content_type(None));
        assert!(is_accepted_content_type(Some("video/webm")));
        assert!(is_accepted_content_type(Some("video/mp4; codecs=avc1")));
        assert!(is_accepted_content_type(Some("application/octet-stream")));
        assert!(!is_accepted_content_type(Some("image/png")));
        assert!(!is_accepted_content_type(Some("not a mime")));
    }

    #[tokio::test]
    async fn scratch_upload_writes_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let mut upload = ScratchUpload::create(dir.path()).await.unwrap();
        upload.write_chunk(Bytes::from_static(b"abc")).await.unwrap();
        upload.write_chunk(Bytes::from_static(b"def")).await.unwrap();

        let stored = upload.finish().await.unwrap();

        assert_eq!(stored.size, 6);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"abcdef");
        assert_eq!(stored.path.extension().unwrap(), "webm");
    }

    #[tokio::test]
    async fn empty_scratch_upload_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let upload = ScratchUpload::create(dir.path()).await.unwrap();

        let err = upload.finish().await.unwrap_err();

        assert!(matches!(err, UploadError::Empty));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn failed_flush_removes_scratch_file() {
        let dir = tempfile::tempdir().unwrap();
        // Writes to /dev/full fail with ENOSPC once the buffer is flushed.
        let path = dir.path().join("full.webm");
        std::os::unix::fs::symlink("/dev/full", &path).unwrap();

        let mut upload = ScratchUpload::open(path.clone()).await.unwrap();
        upload.write_chunk(Bytes::from_static(b"abc")).await.unwrap();
        let err = upload.finish().await.unwrap_err();

        assert!(matches!(err, UploadError::Io(_)));
        assert!(std::fs::symlink_metadata(&path).is_err());
        assert!(Path::new("/dev/full").exists());
    }

    #[test]
    fn io_errors_are_server_errors() {
        let err = UploadError::Io(std::io::Error::other("disk gone"));
        assert_eq!(ApiError::from(err).1, axum::http::StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ApiError::from(UploadError::Empty).1, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn scratch_names_do_not_collide() {
        let a = scratch_name();
        let b = scratch_name();
        assert_ne!(a, b);
    }
}
