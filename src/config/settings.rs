use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::env::{self, EnvKey};
use crate::workers::ffmpeg::TranscodeProfile;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub public_dir: PathBuf,
    /// Directory under `public_dir` holding finished videos; doubles as their URL prefix.
    pub video_subdir: String,
    pub max_upload_bytes: usize,
    pub retention: Duration,
    pub sweep_interval: Duration,
    pub failed_job_ttl: Duration,
    pub ffmpeg_bin: String,
    pub transcode_profile: TranscodeProfile,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let transcode_profile = match env::get(EnvKey::TranscodeProfile) {
            Ok(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("Invalid {}", EnvKey::TranscodeProfile.as_str()))?,
            Err(_) => TranscodeProfile::default(),
        };

        Ok(Self {
            server_port: env::get_parsed(EnvKey::ServerPort, 3000),
            upload_dir: PathBuf::from(env::get_or(EnvKey::UploadDir, "uploads")),
            public_dir: PathBuf::from(env::get_or(EnvKey::PublicDir, "public")),
            video_subdir: env::get_or(EnvKey::VideoSubdir, "videos"),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, 500 * 1024 * 1024),
            retention: Duration::from_secs(env::get_parsed(EnvKey::RetentionSecs, 3600)),
            sweep_interval: Duration::from_secs(env::get_parsed(EnvKey::SweepIntervalSecs, 600)),
            failed_job_ttl: Duration::from_secs(env::get_parsed(EnvKey::FailedJobTtlSecs, 3600)),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, "ffmpeg"),
            transcode_profile,
        })
    }

    pub fn video_dir(&self) -> PathBuf {
        self.public_dir.join(self.video_subdir.trim_matches('/'))
    }

    /// Public URL of a finished artifact, relative to the site root.
    pub fn video_url(&self, file_name: &str) -> String {
        format!("/{}/{}", self.video_subdir.trim_matches('/'), file_name)
    }

    /// Creates the scratch and output directories if they are missing.
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.upload_dir.display()))?;
        tokio::fs::create_dir_all(self.video_dir())
            .await
            .with_context(|| format!("Failed to create {}", self.video_dir().display()))?;
        Ok(())
    }
}

#[cfg(test)]
impl AppConfig {
    pub fn for_test(root: &std::path::Path) -> Self {
        Self {
            server_port: 0,
            upload_dir: root.join("uploads"),
            public_dir: root.join("public"),
            video_subdir: "videos".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(600),
            failed_job_ttl: Duration::from_secs(3600),
            ffmpeg_bin: "ffmpeg".to_string(),
            transcode_profile: TranscodeProfile::default(),
        }
    }
}
