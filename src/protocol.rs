use crate::constants::{DATE_FORMAT, OK_CODE};
use crate::error::{ReolinkError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use strum_macros::AsRefStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum ApiCommand {
    Login,
    Search,
    Download,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    #[default]
    Main,
    Sub,
}

/// Session token issued by `Login`. Read-only once issued.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("token", &"<redacted>").finish()
    }
}

/// Calendar timestamp in the layout the camera uses for `StartTime`/`EndTime`.
///
/// Field order gives chronological ordering for the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SearchTime {
    pub year: i32,
    pub mon: u32,
    pub day: u32,
    pub hour: u32,
    pub min: u32,
    pub sec: u32,
}

impl SearchTime {
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year, self.mon, self.day)?.and_hms_opt(
            self.hour, self.min, self.sec,
        )
    }
}

impl From<NaiveDateTime> for SearchTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            mon: dt.month(),
            day: dt.day(),
            hour: dt.hour(),
            min: dt.minute(),
            sec: dt.second(),
        }
    }
}

impl fmt::Display for SearchTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.mon, self.day, self.hour, self.min, self.sec
        )
    }
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
        ReolinkError::InvalidArgument(format!("Invalid timestamp '{}' ({}): {}", s, DATE_FORMAT, e))
    })
}

/// Inclusive search bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(ReolinkError::InvalidArgument(format!(
                "End time {} is before start time {}",
                end.format(DATE_FORMAT),
                start.format(DATE_FORMAT)
            )));
        }
        Ok(Self { start, end })
    }

    /// True when the recording's time range intersects this window.
    /// Recordings without a usable time range are assumed to intersect.
    pub fn overlaps(&self, recording: &Recording) -> bool {
        let start = recording.start_time.and_then(|t| t.to_naive());
        let end = recording.end_time.and_then(|t| t.to_naive());
        match (start, end) {
            (Some(start), Some(end)) => start <= self.end && end >= self.start,
            _ => true,
        }
    }
}

/// One stored video segment as reported by `Search`.
///
/// The camera's entry is kept untouched in `raw` and is what gets serialized
/// back. The typed fields are read from it leniently: a missing or malformed
/// value leaves that field empty instead of rejecting the entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub name: String,
    pub size: u64,
    pub start_time: Option<SearchTime>,
    pub end_time: Option<SearchTime>,
    raw: Value,
}

impl Recording {
    pub fn from_value(raw: Value) -> Self {
        let name = raw
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let size = raw.get("size").map(size_field).unwrap_or(0);
        let start_time = raw.get("StartTime").and_then(time_field);
        let end_time = raw.get("EndTime").and_then(time_field);

        Self {
            name,
            size,
            start_time,
            end_time,
            raw,
        }
    }

    /// The entry exactly as the camera sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn file_name(&self) -> Option<&str> {
        output_name(&self.name)
    }
}

impl Serialize for Recording {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Recording {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Recording::from_value)
    }
}

/// Local file name for a server path: its last `/` separated segment.
pub fn output_name(source: &str) -> Option<&str> {
    source.rsplit('/').next().filter(|s| !s.is_empty())
}

/// `size` arrives as a number or a numeric string; anything else counts as 0.
fn size_field(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn time_field(value: &Value) -> Option<SearchTime> {
    SearchTime::deserialize(value).ok()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "rspCode")]
    pub rsp_code: Option<i64>,
    pub detail: Option<String>,
}

/// One element of the JSON array every command replies with.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandResponse {
    #[serde(default)]
    pub cmd: Option<String>,
    pub code: i64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl CommandResponse {
    /// Parses the reply body and returns its first result.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let replies: Vec<CommandResponse> = serde_json::from_slice(body).map_err(|e| {
            ReolinkError::ProtocolError(format!("Malformed command reply: {}", e))
        })?;
        replies
            .into_iter()
            .next()
            .ok_or_else(|| ReolinkError::ProtocolError("Empty response".to_string()))
    }

    /// The `value` of a successful reply, or the camera's error.
    pub fn into_value(self) -> Result<Option<Value>> {
        if self.code != OK_CODE {
            let (rsp_code, detail) = self
                .error
                .map(|e| (e.rsp_code, e.detail))
                .unwrap_or((None, None));
            return Err(ReolinkError::ApiError {
                code: self.code,
                rsp_code,
                detail,
            });
        }
        Ok(self.value)
    }
}
