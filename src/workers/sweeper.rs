//! Retention sweeper for finished videos.
//!
//! Each tick rescans the output directory from scratch and deletes every file
//! whose modification time is older than the retention window. It knows nothing
//! about jobs; an artifact lives exactly as long as its mtime allows.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub failed: usize,
}

pub async fn start_retention_sweeper(
    dir: PathBuf,
    retention: Duration,
    every: Duration,
    shutdown: CancellationToken,
) {
    info!(
        "🧹 Starting retention sweeper on {} (retention: {:?}, interval: {:?})",
        dir.display(),
        retention,
        every
    );

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match sweep_expired(&dir, retention).await {
            Ok(report) if report.deleted > 0 || report.failed > 0 => info!(
                "Sweep removed {} of {} files ({} errors)",
                report.deleted, report.scanned, report.failed
            ),
            Ok(report) => debug!("Sweep scanned {} files, nothing expired", report.scanned),
            Err(e) => error!("Sweep failed: {:#}", e),
        }
    }

    info!("🧹 Retention sweeper stopped");
}

/// One full pass over `dir`. Only a failure to list the directory is an error;
/// per-file problems are logged and counted.
pub async fn sweep_expired(dir: &Path, retention: Duration) -> Result<SweepReport> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read {}", dir.display()))?;
    let now = SystemTime::now();
    let mut report = SweepReport::default();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", dir.display(), e);
                report.failed += 1;
                break;
            }
        };
        let path = entry.path();

        let modified = match entry.metadata().await {
            Ok(meta) if !meta.is_file() => continue,
            Ok(meta) => meta.modified(),
            Err(e) => Err(e),
        };
        report.scanned += 1;

        let modified = match modified {
            Ok(t) => t,
            Err(e) => {
                warn!("Failed to stat {}: {}", path.display(), e);
                report.failed += 1;
                continue;
            }
        };

        // mtimes in the future count as fresh
        let expired = now
            .duration_since(modified)
            .is_ok_and(|age| age > retention);
        if !expired {
            continue;
        }

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Deleted expired video {}", path.display());
                report.deleted += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to delete {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    const RETENTION: Duration = Duration::from_secs(3600);

    fn file_aged(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[tokio::test]
    async fn deletes_only_files_past_retention() {
        let dir = tempfile::tempdir().unwrap();
        let old = file_aged(dir.path(), "video_1.mp4", RETENTION + Duration::from_secs(5));
        let young = file_aged(dir.path(), "video_2.mp4", RETENTION - Duration::from_secs(5));

        let report = sweep_expired(dir.path(), RETENTION).await.unwrap();

        assert!(!old.exists());
        assert!(young.exists());
        assert_eq!(report, SweepReport { scanned: 2, deleted: 1, failed: 0 });
    }

    #[tokio::test]
    async fn file_crossing_threshold_goes_on_next_tick() {
        let dir = tempfile::tempdir().unwrap();
        let retention = Duration::from_millis(200);
        let path = file_aged(dir.path(), "video_3.mp4", Duration::ZERO);

        sweep_expired(dir.path(), retention).await.unwrap();
        assert!(path.exists());

        tokio::time::sleep(Duration::from_millis(300)).await;
        sweep_expired(dir.path(), retention).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn skips_directories_and_future_mtimes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let path = dir.path().join("video_4.mp4");
        File::create(&path)
            .unwrap()
            .set_modified(SystemTime::now() + Duration::from_secs(600))
            .unwrap();

        let report = sweep_expired(dir.path(), Duration::ZERO).await.unwrap();

        assert!(path.exists());
        assert!(dir.path().join("nested").is_dir());
        assert_eq!(report.scanned, 1);
        assert_eq!(report.deleted, 0);
    }

    #[tokio::test]
    async fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("absent");

        assert!(sweep_expired(&gone, RETENTION).await.is_err());
    }

    #[tokio::test]
    async fn sweeper_loop_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let old = file_aged(dir.path(), "video_5.mp4", RETENTION * 2);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(start_retention_sweeper(
            dir.path().to_path_buf(),
            RETENTION,
            Duration::from_millis(20),
            shutdown.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        assert!(!old.exists());
    }
}
