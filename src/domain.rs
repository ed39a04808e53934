use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, Duration, FixedOffset, Utc, Weekday};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;
pub const MAX_TITLE_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub owner: String,
}

impl TimeEntry {
    pub fn is_open(&self) -> bool {
        self.stop.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    EmptyTitle,
    TitleTooLong { len: usize },
    EntryAlreadyRunning { id: String },
    NoRunningEntry,
    StopBeforeStart,
    EntryNotFound { id: String },
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::EmptyTitle => write!(f, "entry title is empty"),
            DomainError::TitleTooLong { len } => {
                write!(f, "entry title has {len} chars, limit is {MAX_TITLE_LEN}")
            }
            DomainError::EntryAlreadyRunning { id } => {
                write!(f, "an entry is already running: {id}")
            }
            DomainError::NoRunningEntry => write!(f, "no entry is running"),
            DomainError::StopBeforeStart => write!(f, "stop instant is before start"),
            DomainError::EntryNotFound { id } => write!(f, "entry not found: {id}"),
        }
    }
}

impl std::error::Error for DomainError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetHeader {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub owner: String,
    #[serde(default = "default_week_start")]
    pub week_start: String,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

fn default_week_start() -> String {
    "monday".to_string()
}

impl SheetHeader {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            schema_version: 1,
            created_at: Utc::now(),
            owner: owner.into(),
            week_start: default_week_start(),
            utc_offset_minutes: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub header: SheetHeader,
    pub entries: Vec<TimeEntry>,
}

impl Sheet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            header: SheetHeader::new(owner),
            entries: Vec::new(),
        }
    }

    pub fn week_start(&self) -> Weekday {
        parse_week_start(&self.header.week_start).unwrap_or(Weekday::Mon)
    }

    pub fn set_week_start(&mut self, day: Weekday) {
        self.header.week_start = weekday_name(day).to_string();
    }

    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        let minutes = self.header.utc_offset_minutes?;
        FixedOffset::east_opt(minutes * 60)
    }

    pub fn open_entry(&self) -> Option<&TimeEntry> {
        self.entries
            .iter()
            .find(|entry| entry.owner == self.header.owner && entry.is_open())
    }

    pub fn entry(&self, id: &str) -> Option<&TimeEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn start_entry(
        &mut self,
        title: String,
        tags: BTreeSet<String>,
        now: DateTime<Utc>,
    ) -> Result<String, DomainError> {
        validate_title(&title)?;
        if let Some(open) = self.open_entry() {
            return Err(DomainError::EntryAlreadyRunning {
                id: open.id.clone(),
            });
        }

        let id = generate_id();
        self.entries.push(TimeEntry {
            id: id.clone(),
            title,
            tags,
            start: now,
            stop: None,
            owner: self.header.owner.clone(),
        });
        Ok(id)
    }

    pub fn stop_entry(&mut self, now: DateTime<Utc>) -> Result<String, DomainError> {
        let owner = self.header.owner.clone();
        let open = self
            .entries
            .iter_mut()
            .find(|entry| entry.owner == owner && entry.stop.is_none())
            .ok_or(DomainError::NoRunningEntry)?;

        if now < open.start {
            return Err(DomainError::StopBeforeStart);
        }

        open.stop = Some(now);
        Ok(open.id.clone())
    }

    pub fn log_entry(
        &mut self,
        title: String,
        tags: BTreeSet<String>,
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    ) -> Result<String, DomainError> {
        validate_title(&title)?;
        if stop < start {
            return Err(DomainError::StopBeforeStart);
        }

        let id = generate_id();
        self.entries.push(TimeEntry {
            id: id.clone(),
            title,
            tags,
            start,
            stop: Some(stop),
            owner: self.header.owner.clone(),
        });
        Ok(id)
    }

    pub fn retitle_entry(&mut self, id: &str, title: String) -> Result<(), DomainError> {
        validate_title(&title)?;
        let entry = self.entry_mut(id)?;
        entry.title = title;
        Ok(())
    }

    pub fn set_tags(&mut self, id: &str, tags: BTreeSet<String>) -> Result<(), DomainError> {
        let entry = self.entry_mut(id)?;
        entry.tags = tags;
        Ok(())
    }

    pub fn add_tag(&mut self, id: &str, tag: String) -> Result<(), DomainError> {
        let entry = self.entry_mut(id)?;
        entry.tags.insert(tag);
        Ok(())
    }

    pub fn remove_tag(&mut self, id: &str, tag: &str) -> Result<(), DomainError> {
        let entry = self.entry_mut(id)?;
        entry.tags.remove(tag);
        Ok(())
    }

    pub fn delete_entry(&mut self, id: &str) -> Result<TimeEntry, DomainError> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or_else(|| DomainError::EntryNotFound { id: id.to_string() })?;
        Ok(self.entries.remove(index))
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut TimeEntry, DomainError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| DomainError::EntryNotFound { id: id.to_string() })
    }
}

pub trait EntrySource {
    fn list_entries(&self, owner: &str) -> Vec<TimeEntry>;
}

impl EntrySource for Sheet {
    fn list_entries(&self, owner: &str) -> Vec<TimeEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.owner == owner)
            .cloned()
            .collect()
    }
}

fn validate_title(title: &str) -> Result<(), DomainError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyTitle);
    }

    let len = trimmed.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(DomainError::TitleTooLong { len });
    }

    Ok(())
}

pub fn normalize_tags<I, S>(raw: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|tag| {
            let trimmed = tag.as_ref().trim().trim_start_matches('#').to_string();
            if trimmed.is_empty() { None } else { Some(trimmed) }
        })
        .collect()
}

pub fn parse_week_start(raw: &str) -> Option<Weekday> {
    match raw.trim().to_lowercase().as_str() {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}
