pub mod authentication;
pub mod file_management;

pub use authentication::Authentication;
pub use file_management::{DownloadResult, FileManagement};
