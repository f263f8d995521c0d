pub mod batch;
pub mod camera;
pub mod commands;
pub mod constants;
pub mod error;
pub mod listing;
pub mod progress;
pub mod protocol;
pub mod report;

pub use batch::{BatchOptions, BatchOutcome, BatchSummary, run_batch};
pub use camera::{Credentials, ReolinkCam, Scheme};
pub use commands::*;
pub use error::{ReolinkError, Result};
pub use progress::DownloadProgress;
pub use protocol::{Recording, Session, TimeWindow};
