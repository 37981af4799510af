use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::Task;
use crate::subject::parse_subject;

const EVENT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read events file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode events: {0}")]
    Json(#[from] serde_json::Error),
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("calendar service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("no calendar user named {0}")]
    UnknownUser(String),
    #[error("bad event timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Supplies the tasks recorded for a user between two instants, inclusive.
pub trait EventSource {
    fn read(
        &self,
        user_name: &str,
        from: &DateTime<Local>,
        to: &DateTime<Local>,
    ) -> Result<Vec<Task>, SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "timeZone", default)]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// The wall clock is recorded in UTC.
    pub fn to_utc(&self) -> Result<DateTime<Utc>, SourceError> {
        if let Some(zone) = self.time_zone.as_deref() {
            if !zone.eq_ignore_ascii_case("utc") {
                debug!(zone, "treating event time zone as UTC");
            }
        }

        NaiveDateTime::parse_from_str(&self.date_time, EVENT_TIMESTAMP_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|source| SourceError::Timestamp {
                value: self.date_time.clone(),
                source,
            })
    }
}

/// A calendar event as delivered by the calendar service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub subject: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(default)]
    pub is_all_day: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EventDump {
    Page {
        value: Vec<CalendarEvent>,
    },
    List(Vec<CalendarEvent>),
}

/// Converts raw events into tasks in `zone`.
///
/// Events without a parsable subject, all-day events and events ending before they start are
/// skipped. A malformed timestamp fails the whole batch.
pub fn tasks_from_events<Tz: TimeZone>(
    events: &[CalendarEvent],
    zone: &Tz,
) -> Result<Vec<Task>, SourceError> {
    let mut tasks = Vec::with_capacity(events.len());

    for event in events {
        if event.is_all_day {
            debug!(subject = ?event.subject, "skipping all-day event");
            continue;
        }
        let Some(raw_subject) = event.subject.as_deref() else {
            continue;
        };
        let Some(subject) = parse_subject(raw_subject) else {
            debug!(subject = raw_subject, "skipping event without a project");
            continue;
        };

        let start = event.start.to_utc()?.with_timezone(zone).fixed_offset();
        let end = event.end.to_utc()?.with_timezone(zone).fixed_offset();
        if end < start {
            warn!(subject = raw_subject, %start, %end, "skipping event that ends before it starts");
            continue;
        }

        tasks.push(Task::new(subject, start, end - start));
    }

    Ok(tasks)
}

/// Reads events from a JSON dump of a calendar events response.
///
/// Accepts either the `{"value": [...]}` page shape or a bare array.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<CalendarEvent>, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_events(&raw)
    }
}

pub fn parse_events(raw: &str) -> Result<Vec<CalendarEvent>, SourceError> {
    Ok(match serde_json::from_str(raw)? {
        EventDump::Page { value } => value,
        EventDump::List(events) => events,
    })
}

impl EventSource for JsonFileSource {
    fn read(
        &self,
        user_name: &str,
        from: &DateTime<Local>,
        to: &DateTime<Local>,
    ) -> Result<Vec<Task>, SourceError> {
        let events = self.load()?;
        debug!(path = %self.path.display(), user_name, count = events.len(), "loaded events file");

        let mut in_range = Vec::with_capacity(events.len());
        for event in events {
            let start = event.start.to_utc()?;
            if start >= *from && start <= *to {
                in_range.push(event);
            }
        }

        tasks_from_events(&in_range, &Local)
    }
}
