//! Sequences login, search and the per-recording downloads of one run.

use crate::commands::{Authentication, DownloadResult, FileManagement};
use crate::constants::DOWNLOAD_PACING;
use crate::error::{ReolinkError, Result};
use crate::listing::save_listing;
use crate::progress::DownloadProgress;
use crate::protocol::{Recording, Session, TimeWindow};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub channel: u8,
    pub window: TimeWindow,
    pub output_dir: PathBuf,
    /// Stop after the listing is written.
    pub list_only: bool,
    /// Wait between two consecutive downloads.
    pub pacing: Duration,
}

impl BatchOptions {
    pub fn new(window: TimeWindow, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            channel: 0,
            window,
            output_dir: output_dir.into(),
            list_only: false,
            pacing: DOWNLOAD_PACING,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Unauthenticated,
    Authenticated,
    Searched,
    Downloading,
    Done,
    Failed,
}

#[derive(Debug)]
pub enum BatchEvent<'a> {
    Phase(BatchPhase),
    Found {
        recordings: &'a [Recording],
    },
    ListingSaved {
        path: &'a Path,
    },
    Skipped {
        index: usize,
        total: usize,
    },
    DownloadStarted {
        index: usize,
        total: usize,
        recording: &'a Recording,
        target: &'a Path,
    },
    Progress {
        index: usize,
        progress: DownloadProgress,
    },
    DownloadFinished {
        index: usize,
        result: &'a DownloadResult,
    },
}

pub type EventCallback<'f> = dyn for<'a> Fn(BatchEvent<'a>) + Send + Sync + 'f;

#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Descriptors returned by the search.
    pub total: usize,
    /// Downloads actually started; skipped descriptors are not counted.
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub results: Vec<DownloadResult>,
}

impl BatchSummary {
    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} downloaded successfully",
            self.succeeded, self.attempted
        )
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    /// The search completed and matched nothing.
    NoRecordings,
    /// The search request itself failed.
    SearchFailed { reason: String },
    /// List-only run: the listing was written, nothing downloaded.
    Listed { recordings: usize, listing: PathBuf },
    Downloaded(BatchSummary),
}

/// Runs one full batch against `cam`.
///
/// Only an authentication failure or a failure to write the listing is
/// returned as `Err`; search and download failures end up in the outcome.
pub async fn run_batch<C>(
    cam: &C,
    username: &str,
    password: &str,
    options: &BatchOptions,
    on_event: &EventCallback<'_>,
) -> Result<BatchOutcome>
where
    C: Authentication + FileManagement,
{
    on_event(BatchEvent::Phase(BatchPhase::Unauthenticated));

    let session = match cam.login(username, password).await {
        Ok(session) => session,
        Err(e) => {
            on_event(BatchEvent::Phase(BatchPhase::Failed));
            return Err(e);
        }
    };
    on_event(BatchEvent::Phase(BatchPhase::Authenticated));

    let recordings = match cam
        .search_recordings(&session, options.channel, &options.window)
        .await
    {
        Ok(recordings) => recordings,
        Err(e) => {
            warn!(error = %e, "search failed");
            on_event(BatchEvent::Phase(BatchPhase::Failed));
            return Ok(BatchOutcome::SearchFailed {
                reason: e.to_string(),
            });
        }
    };

    if recordings.is_empty() {
        info!("no recordings found");
        on_event(BatchEvent::Phase(BatchPhase::Failed));
        return Ok(BatchOutcome::NoRecordings);
    }

    on_event(BatchEvent::Phase(BatchPhase::Searched));
    on_event(BatchEvent::Found {
        recordings: &recordings,
    });

    for recording in recordings.iter().filter(|r| !options.window.overlaps(r)) {
        debug!(name = %recording.name, "recording lies outside the requested window");
    }

    let listing = save_listing(&options.output_dir, &recordings).await?;
    on_event(BatchEvent::ListingSaved { path: &listing });

    if options.list_only {
        on_event(BatchEvent::Phase(BatchPhase::Done));
        return Ok(BatchOutcome::Listed {
            recordings: recordings.len(),
            listing,
        });
    }

    on_event(BatchEvent::Phase(BatchPhase::Downloading));
    let summary = download_all(cam, &session, &recordings, options, on_event).await;
    info!(
        succeeded = summary.succeeded,
        attempted = summary.attempted,
        skipped = summary.skipped,
        "batch complete"
    );
    on_event(BatchEvent::Phase(BatchPhase::Done));

    Ok(BatchOutcome::Downloaded(summary))
}

async fn download_all<C>(
    cam: &C,
    session: &Session,
    recordings: &[Recording],
    options: &BatchOptions,
    on_event: &EventCallback<'_>,
) -> BatchSummary
where
    C: FileManagement,
{
    let total = recordings.len();
    let mut summary = BatchSummary {
        total,
        ..Default::default()
    };

    for (index, recording) in recordings.iter().enumerate() {
        if recording.name.is_empty() {
            warn!(index, "recording has no name, skipping");
            summary.skipped += 1;
            on_event(BatchEvent::Skipped { index, total });
            continue;
        }

        if summary.attempted > 0 && !options.pacing.is_zero() {
            tokio::time::sleep(options.pacing).await;
        }
        summary.attempted += 1;

        let result = match recording.file_name() {
            Some(file_name) => {
                let target = options.output_dir.join(file_name);
                on_event(BatchEvent::DownloadStarted {
                    index,
                    total,
                    recording,
                    target: &target,
                });

                let progress: &(dyn Fn(DownloadProgress) + Send + Sync) =
                    &|progress: DownloadProgress| {
                        on_event(BatchEvent::Progress { index, progress })
                    };
                cam.download_recording(session, &recording.name, &target, Some(progress))
                    .await
            }
            None => DownloadResult {
                path: options.output_dir.clone(),
                bytes: 0,
                error: Some(ReolinkError::InvalidRecording(format!(
                    "No file name in '{}'",
                    recording.name
                ))),
            },
        };

        if result.success() {
            summary.succeeded += 1;
        }
        on_event(BatchEvent::DownloadFinished {
            index,
            result: &result,
        });
        summary.results.push(result);
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parse_timestamp;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    struct FakeCam {
        accept_login: bool,
        search: std::result::Result<Vec<Recording>, String>,
        failing: HashSet<String>,
        downloads: Mutex<Vec<String>>,
        started_at: Mutex<Vec<tokio::time::Instant>>,
        searched: Mutex<bool>,
    }

    impl FakeCam {
        fn new(recordings: serde_json::Value) -> Self {
            Self {
                accept_login: true,
                search: Ok(serde_json::from_value(recordings).unwrap()),
                failing: HashSet::new(),
                downloads: Mutex::new(Vec::new()),
                started_at: Mutex::new(Vec::new()),
                searched: Mutex::new(false),
            }
        }

        fn downloads(&self) -> Vec<String> {
            self.downloads.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Authentication for FakeCam {
        async fn login(&self, _username: &str, _password: &str) -> Result<Session> {
            if self.accept_login {
                Ok(Session::new("token"))
            } else {
                Err(ReolinkError::AuthenticationError("rejected".to_string()))
            }
        }
    }

    #[async_trait]
    impl FileManagement for FakeCam {
        async fn search_recordings(
            &self,
            _session: &Session,
            _channel: u8,
            _window: &TimeWindow,
        ) -> Result<Vec<Recording>> {
            *self.searched.lock().unwrap() = true;
            self.search
                .clone()
                .map_err(ReolinkError::ConnectionError)
        }

        async fn download_recording(
            &self,
            _session: &Session,
            source: &str,
            target: &Path,
            progress: Option<&(dyn Fn(DownloadProgress) + Send + Sync)>,
        ) -> DownloadResult {
            self.downloads.lock().unwrap().push(source.to_string());
            self.started_at
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            let error = if self.failing.contains(source) {
                Some(ReolinkError::HttpStatus {
                    status: 404,
                    body: String::new(),
                })
            } else {
                if let Some(progress) = progress {
                    progress(DownloadProgress::Started { total: Some(4) });
                    progress(DownloadProgress::Percent(100));
                    progress(DownloadProgress::Finished { bytes: 4 });
                }
                None
            };
            DownloadResult {
                path: target.to_path_buf(),
                bytes: if error.is_none() { 4 } else { 0 },
                error,
            }
        }
    }

    fn options(dir: &Path) -> BatchOptions {
        let window = TimeWindow::new(
            parse_timestamp("2024-03-05 00:00:00").unwrap(),
            parse_timestamp("2024-03-05 23:59:59").unwrap(),
        )
        .unwrap();
        let mut options = BatchOptions::new(window, dir);
        options.pacing = Duration::ZERO;
        options
    }

    fn ignore(_: BatchEvent<'_>) {}

    #[tokio::test]
    async fn auth_failure_aborts_before_search() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = FakeCam::new(json!([{"name": "a.mp4"}]));
        cam.accept_login = false;

        let result = run_batch(&cam, "admin", "bad", &options(dir.path()), &ignore).await;

        assert!(matches!(result, Err(ReolinkError::AuthenticationError(_))));
        assert!(!*cam.searched.lock().unwrap());
        assert!(cam.downloads().is_empty());
    }

    #[tokio::test]
    async fn empty_search_never_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let cam = FakeCam::new(json!([]));

        let outcome = run_batch(&cam, "admin", "pw", &options(dir.path()), &ignore)
            .await
            .unwrap();

        assert!(matches!(outcome, BatchOutcome::NoRecordings));
        assert!(cam.downloads().is_empty());
    }

    #[tokio::test]
    async fn search_failure_is_reported_separately() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = FakeCam::new(json!([]));
        cam.search = Err("connection reset".to_string());

        let outcome = run_batch(&cam, "admin", "pw", &options(dir.path()), &ignore)
            .await
            .unwrap();

        match outcome {
            BatchOutcome::SearchFailed { reason } => assert!(reason.contains("connection reset")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(cam.downloads().is_empty());
    }

    #[tokio::test]
    async fn unnamed_recordings_are_skipped_not_attempted() {
        let dir = tempfile::tempdir().unwrap();
        let mut cam = FakeCam::new(json!([
            {"name": "Mp4Record/2024-03-05/a.mp4"},
            {"name": ""},
            {"size": 10},
            {"name": "Mp4Record/2024-03-05/b.mp4"}
        ]));
        cam.failing.insert("Mp4Record/2024-03-05/b.mp4".to_string());

        let outcome = run_batch(&cam, "admin", "pw", &options(dir.path()), &ignore)
            .await
            .unwrap();

        let BatchOutcome::Downloaded(summary) = outcome else {
            panic!("expected downloads");
        };
        assert_eq!(summary.total, 4);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.to_string(), "1 of 2 downloaded successfully");
        assert_eq!(
            cam.downloads(),
            vec!["Mp4Record/2024-03-05/a.mp4", "Mp4Record/2024-03-05/b.mp4"]
        );
        assert!(summary.attempted <= summary.total);
        assert!(summary.succeeded <= summary.attempted);
    }

    #[tokio::test]
    async fn null_name_does_not_stop_its_neighbours() {
        let dir = tempfile::tempdir().unwrap();
        let cam = FakeCam::new(json!([
            {"name": "Mp4Record/2024-03-05/ok.mp4", "size": 1},
            {"name": null, "size": 2},
            {"name": "Mp4Record/2024-03-05/late.mp4", "size": "n/a", "StartTime": {"year": 2024}}
        ]));

        let outcome = run_batch(&cam, "admin", "pw", &options(dir.path()), &ignore)
            .await
            .unwrap();

        let BatchOutcome::Downloaded(summary) = outcome else {
            panic!("expected downloads");
        };
        assert_eq!(summary.total, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(
            cam.downloads(),
            vec![
                "Mp4Record/2024-03-05/ok.mp4",
                "Mp4Record/2024-03-05/late.mp4"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_separates_attempted_downloads_only() {
        let dir = tempfile::tempdir().unwrap();
        let cam = FakeCam::new(json!([
            {"name": "x/a.mp4"},
            {"name": ""},
            {"name": "x/b.mp4"},
            {"name": "x/c.mp4"}
        ]));
        let mut options = options(dir.path());
        options.pacing = Duration::from_secs(1);

        let begin = tokio::time::Instant::now();
        let outcome = run_batch(&cam, "admin", "pw", &options, &ignore)
            .await
            .unwrap();

        let BatchOutcome::Downloaded(summary) = outcome else {
            panic!("expected downloads");
        };
        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.skipped, 1);

        let started = cam.started_at.lock().unwrap().clone();
        assert_eq!(started.len(), 3);
        assert!(started[0] - begin < options.pacing);
        for pair in started.windows(2) {
            assert_eq!(pair[1] - pair[0], options.pacing);
        }
        assert_eq!(started[2] - started[0], options.pacing * 2);
    }

    #[tokio::test]
    async fn list_only_writes_listing_without_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let cam = FakeCam::new(json!([{"name": "a.mp4", "size": 1}]));
        let mut options = options(dir.path());
        options.list_only = true;

        let outcome = run_batch(&cam, "admin", "pw", &options, &ignore)
            .await
            .unwrap();

        match outcome {
            BatchOutcome::Listed {
                recordings,
                listing,
            } => {
                assert_eq!(recordings, 1);
                assert!(listing.exists());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(cam.downloads().is_empty());
    }

    fn collector(log: Arc<Mutex<Vec<String>>>) -> impl Fn(BatchEvent<'_>) + Send + Sync {
        move |event| {
            let line = match event {
                BatchEvent::Phase(phase) => format!("{:?}", phase),
                BatchEvent::Found { recordings } => format!("found {}", recordings.len()),
                BatchEvent::ListingSaved { .. } => "listing".to_string(),
                BatchEvent::Skipped { index, .. } => format!("skip {}", index),
                BatchEvent::DownloadStarted { index, target, .. } => format!(
                    "start {} {}",
                    index,
                    target.file_name().unwrap().to_string_lossy()
                ),
                BatchEvent::Progress { index, progress } => match progress {
                    DownloadProgress::Percent(p) => format!("progress {} {}", index, p),
                    _ => return,
                },
                BatchEvent::DownloadFinished { index, result } => {
                    format!("done {} {}", index, result.success())
                }
            };
            log.lock().unwrap().push(line);
        }
    }

    #[tokio::test]
    async fn events_follow_the_phase_order() {
        let dir = tempfile::tempdir().unwrap();
        let cam = FakeCam::new(json!([{"name": "x/a.mp4"}, {"name": "x/b.mp4"}]));
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = collector(Arc::clone(&log));

        run_batch(&cam, "admin", "pw", &options(dir.path()), &sink)
            .await
            .unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "Unauthenticated",
                "Authenticated",
                "Searched",
                "found 2",
                "listing",
                "Downloading",
                "start 0 a.mp4",
                "progress 0 100",
                "done 0 true",
                "start 1 b.mp4",
                "progress 1 100",
                "done 1 true",
                "Done",
            ]
        );
    }
}
