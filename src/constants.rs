use std::time::Duration;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const HTTPS_PORT: u16 = 443;

/// Endpoint for JSON commands (Login, Search).
pub const COMMAND_PATH: &str = "/api.cgi";

/// Endpoint serving raw recording files.
pub const DOWNLOAD_PATH: &str = "/cgi-bin/api.cgi";

/// Login payload version marker expected by the firmware.
pub const LOGIN_VERSION: &str = "0";

/// Delay inserted between two consecutive downloads.
pub const DOWNLOAD_PACING: Duration = Duration::from_secs(1);

/// Progress is reported every time this many percentage points are crossed.
pub const PROGRESS_STEP: u8 = 10;

pub const LISTING_FILE: &str = "recordings_info.json";

pub const OK_CODE: i64 = 0;

/// Human readable text for the `rspCode` carried in camera error replies.
pub fn rsp_code_description(rsp_code: i64) -> Option<&'static str> {
    let text = match rsp_code {
        -1 => "missing parameters",
        -2 => "used up memory",
        -3 => "check error",
        -4 => "parameters error",
        -5 => "reached the max session number",
        -6 => "login required",
        -7 => "login error",
        -8 => "operation timeout",
        -9 => "not supported",
        -10 => "protocol error",
        -11 => "failed to read operation",
        -12 => "failed to get configuration",
        -13 => "failed to set configuration",
        -14 => "failed to apply for memory",
        -15 => "failed to create socket",
        -16 => "failed to send data",
        -17 => "failed to receive data",
        -18 => "failed to open file",
        -19 => "failed to read file",
        -20 => "failed to write file",
        _ => return None,
    };
    Some(text)
}
