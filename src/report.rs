//! Operator-facing status lines for batch events.

use crate::batch::{BatchEvent, BatchPhase};
use crate::progress::DownloadProgress;
use crate::protocol::Recording;

pub fn megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

/// One line of the recording listing, numbered from 1.
pub fn recording_line(index: usize, recording: &Recording) -> String {
    let name = if recording.name.is_empty() {
        "unknown"
    } else {
        recording.name.as_str()
    };
    let mut line = format!(
        "{}. {} - Size: {}MB",
        index + 1,
        name,
        megabytes(recording.size)
    );
    if let (Some(start), Some(end)) = (recording.start_time, recording.end_time) {
        line.push_str(&format!(", Time: {} to {}", start, end));
    }
    line
}

pub fn status_lines(event: &BatchEvent<'_>) -> Vec<String> {
    match event {
        BatchEvent::Phase(BatchPhase::Authenticated) => {
            vec!["Successfully authenticated.".to_string()]
        }
        BatchEvent::Phase(BatchPhase::Downloading) => {
            vec![String::new(), "===== DOWNLOADING RECORDINGS =====".to_string()]
        }
        BatchEvent::Phase(_) => vec![],
        BatchEvent::Found { recordings } => {
            let mut lines = vec![
                format!("Found {} recordings", recordings.len()),
                String::new(),
                "===== RECORDINGS FOUND =====".to_string(),
            ];
            lines.extend(
                recordings
                    .iter()
                    .enumerate()
                    .map(|(i, r)| recording_line(i, r)),
            );
            lines
        }
        BatchEvent::ListingSaved { path } => {
            vec![format!("Recording listing saved to {}", path.display())]
        }
        BatchEvent::Skipped { index, .. } => {
            vec![format!("Recording {} has no filename, skipping", index + 1)]
        }
        BatchEvent::DownloadStarted {
            index,
            total,
            recording,
            ..
        } => vec![
            String::new(),
            format!(
                "Downloading recording {}/{}: {}",
                index + 1,
                total,
                recording.name
            ),
        ],
        BatchEvent::Progress { progress, .. } => match progress {
            DownloadProgress::Started { total: Some(total) } => {
                vec![format!("File size: {} MB", megabytes(*total))]
            }
            DownloadProgress::Started { total: None } => {
                vec!["File size: unknown".to_string()]
            }
            DownloadProgress::Percent(percent) => vec![format!("Progress: {}%", percent)],
            DownloadProgress::Finished { .. } => vec![],
        },
        BatchEvent::DownloadFinished { result, .. } => match &result.error {
            None => vec![format!("Successfully downloaded {}", result.path.display())],
            Some(e) => vec![format!("Download failed: {}", e)],
        },
    }
}
