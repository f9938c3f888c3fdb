use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    UploadDir,
    PublicDir,
    VideoSubdir,
    MaxUploadBytes,
    RetentionSecs,
    SweepIntervalSecs,
    FailedJobTtlSecs,
    FfmpegBin,
    TranscodeProfile,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::PublicDir => "PUBLIC_DIR",
            EnvKey::VideoSubdir => "VIDEO_SUBDIR",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
            EnvKey::RetentionSecs => "RETENTION_SECS",
            EnvKey::SweepIntervalSecs => "SWEEP_INTERVAL_SECS",
            EnvKey::FailedJobTtlSecs => "FAILED_JOB_TTL_SECS",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::TranscodeProfile => "TRANSCODE_PROFILE",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
