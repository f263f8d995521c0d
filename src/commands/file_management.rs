use crate::camera::{ReolinkCam, http_status_error};
use crate::constants::DOWNLOAD_PATH;
use crate::error::{ReolinkError, Result};
use crate::progress::{DownloadProgress, ProgressTracker};
use crate::protocol::{
    ApiCommand, Recording, SearchTime, Session, StreamType, TimeWindow, output_name,
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, info, warn};

/// Outcome of one recording download.
#[derive(Debug)]
pub struct DownloadResult {
    pub path: PathBuf,
    /// Bytes written to `path`, including those of an interrupted transfer.
    pub bytes: u64,
    pub error: Option<ReolinkError>,
}

impl DownloadResult {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

#[async_trait]
pub trait FileManagement: Send + Sync {
    /// List recordings on `channel` whose time range intersects `window`.
    ///
    /// A reply without a `SearchResult` is an empty list; transport and
    /// status failures are errors.
    async fn search_recordings(
        &self,
        session: &Session,
        channel: u8,
        window: &TimeWindow,
    ) -> Result<Vec<Recording>>;

    /// Stream the recording named `source` into `target`, truncating any
    /// existing file. Failures are reported in the result, never raised.
    async fn download_recording(
        &self,
        session: &Session,
        source: &str,
        target: &Path,
        progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
    ) -> DownloadResult;
}

#[async_trait]
impl FileManagement for ReolinkCam {
    async fn search_recordings(
        &self,
        session: &Session,
        channel: u8,
        window: &TimeWindow,
    ) -> Result<Vec<Recording>> {
        let param = json!({
            "Search": {
                "channel": channel,
                "onlyStatus": 0,
                "streamType": StreamType::Main,
                "StartTime": SearchTime::from(window.start),
                "EndTime": SearchTime::from(window.end),
            },
        });

        let value = self
            .send_command(ApiCommand::Search, Some(0), param, Some(session))
            .await?
            .into_value()?
            .ok_or_else(|| {
                ReolinkError::ProtocolError("Search reply carries no value".to_string())
            })?;

        let Some(files) = value.get("SearchResult").and_then(|r| r.get("File")) else {
            debug!(channel, "search reply has no file list");
            return Ok(vec![]);
        };

        let Some(files) = files.as_array() else {
            warn!(channel, "search file list is not an array");
            return Ok(vec![]);
        };

        let recordings: Vec<Recording> =
            files.iter().cloned().map(Recording::from_value).collect();
        info!(channel, count = recordings.len(), "search complete");
        Ok(recordings)
    }

    async fn download_recording(
        &self,
        session: &Session,
        source: &str,
        target: &Path,
        progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
    ) -> DownloadResult {
        let mut written = 0u64;
        let outcome = self
            .fetch_recording(session, source, target, progress, &mut written)
            .await;

        if let Err(e) = &outcome {
            warn!(source, target = %target.display(), error = %e, "download failed");
        }

        DownloadResult {
            path: target.to_path_buf(),
            bytes: written,
            error: outcome.err(),
        }
    }
}

impl ReolinkCam {
    async fn fetch_recording(
        &self,
        session: &Session,
        source: &str,
        target: &Path,
        progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
        written: &mut u64,
    ) -> Result<()> {
        let output = output_name(source).ok_or_else(|| {
            ReolinkError::InvalidRecording(format!("No file name in '{}'", source))
        })?;

        let response = self
            .client
            .get(self.url(DOWNLOAD_PATH))
            .query(&[
                ("cmd", ApiCommand::Download.as_ref()),
                ("source", source),
                ("output", output),
                ("token", session.token()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(http_status_error(status, body));
        }

        let mut tracker = ProgressTracker::new(response.content_length());
        if let Some(callback) = progress {
            callback(DownloadProgress::Started {
                total: tracker.total(),
            });
        }

        // A partial file is left behind if the transfer breaks off.
        let mut file = File::create(target).await?;
        let copied = copy_body(response, &mut file, &mut tracker, progress, written).await;
        file.flush().await?;
        copied?;
        file.sync_all().await?;

        if let Some(callback) = progress {
            callback(DownloadProgress::Finished { bytes: *written });
        }

        info!(source, target = %target.display(), bytes = *written, "download complete");
        Ok(())
    }
}

async fn copy_body(
    response: reqwest::Response,
    file: &mut File,
    tracker: &mut ProgressTracker,
    progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
    written: &mut u64,
) -> Result<()> {
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        *written += chunk.len() as u64;

        if let Some(percent) = tracker.advance(chunk.len() as u64)
            && let Some(callback) = progress
        {
            callback(DownloadProgress::Percent(percent));
        }
    }
    Ok(())
}
