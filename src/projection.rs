use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};

use crate::domain::TimeEntry;

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionError {
    NegativeEntry { id: String },
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::NegativeEntry { id } => {
                write!(f, "entry {id} stops before it starts")
            }
        }
    }
}

impl std::error::Error for ProjectionError {}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySlice {
    pub entry_id: String,
    pub day: NaiveDate,
    pub start: DateTime<Utc>,
    pub stop: Option<DateTime<Utc>>,
    pub is_partial_start: bool,
    pub is_partial_end: bool,
    pub is_start_day: bool,
}

impl DaySlice {
    pub fn closed_duration(&self) -> Option<Duration> {
        self.stop.map(|stop| stop - self.start)
    }
}

// Midnight cuts land at local 23:59:59.999 / 00:00:00.000, so per-day sums
// come out one millisecond short per crossed boundary.
pub fn split_entry<Tz: TimeZone>(
    entry: &TimeEntry,
    tz: &Tz,
) -> Result<Vec<DaySlice>, ProjectionError> {
    let start_day = entry.start.with_timezone(tz).date_naive();

    let Some(stop) = entry.stop else {
        return Ok(vec![DaySlice {
            entry_id: entry.id.clone(),
            day: start_day,
            start: entry.start,
            stop: None,
            is_partial_start: false,
            is_partial_end: false,
            is_start_day: true,
        }]);
    };

    if stop < entry.start {
        return Err(ProjectionError::NegativeEntry {
            id: entry.id.clone(),
        });
    }

    // The last touched day keys off the final millisecond, so a stop landing
    // exactly on midnight does not open a zero-length slice on the next day.
    let mut last_day = if stop > entry.start {
        (stop - Duration::milliseconds(1))
            .with_timezone(tz)
            .date_naive()
    } else {
        start_day
    };
    if last_day < start_day {
        last_day = start_day;
    }

    let mut slices = Vec::new();
    let mut day = start_day;
    while day <= last_day {
        let is_first = day == start_day;
        let is_last = day == last_day;
        let slice_start = if is_first {
            entry.start
        } else {
            day_start_instant(day, tz)
        };
        let slice_stop = if is_last {
            stop
        } else {
            day_end_instant(day, tz)
        };

        slices.push(DaySlice {
            entry_id: entry.id.clone(),
            day,
            start: slice_start,
            stop: Some(slice_stop),
            is_partial_start: !is_first,
            is_partial_end: !is_last,
            is_start_day: is_first,
        });

        day = day.succ_opt().expect("next day should exist");
    }

    Ok(slices)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    pub fn days(&self) -> impl DoubleEndedIterator<Item = NaiveDate> {
        let start = self.start;
        (0..7).map(move |offset| start + Duration::days(offset))
    }
}

pub fn resolve_week<Tz: TimeZone>(
    now: DateTime<Utc>,
    tz: &Tz,
    week_start: Weekday,
) -> WeekRange {
    let today = now.with_timezone(tz).date_naive();
    let days_back = (today.weekday().num_days_from_monday() + 7
        - week_start.num_days_from_monday())
        % 7;
    let start = today - Duration::days(days_back as i64);
    WeekRange {
        start,
        end: start + Duration::days(6),
    }
}

const OVERLAP_TOLERANCE_SECONDS: i64 = 1;

// Each flagged entry references exactly one conflicting peer: the first
// partner in the day's (start, id) order that overlaps it by more than the
// tolerance. Open entries neither flag nor get flagged.
pub fn detect_overlaps(day_entries: &[&TimeEntry]) -> HashMap<String, String> {
    let mut closed = day_entries
        .iter()
        .filter_map(|entry| entry.stop.map(|stop| (*entry, stop)))
        .collect::<Vec<_>>();
    closed.sort_by(|left, right| {
        left.0
            .start
            .cmp(&right.0.start)
            .then_with(|| left.0.id.cmp(&right.0.id))
    });

    let tolerance = Duration::seconds(OVERLAP_TOLERANCE_SECONDS);
    let mut annotations = HashMap::new();
    for (entry, stop) in &closed {
        for (peer, peer_stop) in &closed {
            if peer.id == entry.id {
                continue;
            }
            let shared_start = entry.start.max(peer.start);
            let shared_stop = (*stop).min(*peer_stop);
            if shared_stop - shared_start > tolerance {
                annotations.insert(entry.id.clone(), peer.id.clone());
                break;
            }
        }
    }

    annotations
}

pub fn live_duration(entry: &TimeEntry, now: DateTime<Utc>) -> Duration {
    let stop = entry.stop.unwrap_or(now);
    Duration::seconds((stop - entry.start).num_seconds().max(0))
}

pub fn entry_duration(entry: &TimeEntry, now: DateTime<Utc>) -> Duration {
    match entry.stop {
        Some(stop) => stop - entry.start,
        None => live_duration(entry, now),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub title: String,
    pub tags: BTreeSet<String>,
}

impl GroupKey {
    fn of(entry: &TimeEntry) -> Self {
        Self {
            title: entry.title.trim().to_string(),
            tags: entry.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberView {
    pub entry: TimeEntry,
    pub overlap_peer: Option<String>,
    pub ends_on_later_day: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryGroup {
    pub key: GroupKey,
    pub members: Vec<MemberView>,
    pub earliest_start: DateTime<Utc>,
    pub latest_stop: Option<DateTime<Utc>>,
    pub total: Duration,
    pub has_active_member: bool,
    pub position_key: DateTime<Utc>,
}

impl EntryGroup {
    pub fn is_cluster(&self) -> bool {
        self.members.len() >= 2
    }

    // Collapsed rows only surface a warning for singletons; members keep
    // their own annotation for the expanded view.
    pub fn overlap_flag(&self) -> Option<&str> {
        if self.members.len() == 1 {
            self.members[0].overlap_peer.as_deref()
        } else {
            None
        }
    }
}

pub fn group_day<Tz: TimeZone>(
    day_entries: &[&TimeEntry],
    annotations: &HashMap<String, String>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<EntryGroup> {
    let mut order = Vec::new();
    let mut clusters: HashMap<GroupKey, Vec<&TimeEntry>> = HashMap::new();
    for entry in day_entries {
        let key = GroupKey::of(entry);
        if !clusters.contains_key(&key) {
            order.push(key.clone());
        }
        clusters.entry(key).or_default().push(entry);
    }

    let mut groups = order
        .into_iter()
        .map(|key| {
            let members = clusters.remove(&key).expect("cluster must exist");
            build_group(key, members, annotations, now, tz)
        })
        .collect::<Vec<_>>();

    // Stable sort: ties keep the input (query) order.
    groups.sort_by(|left, right| right.position_key.cmp(&left.position_key));
    groups
}

fn build_group<Tz: TimeZone>(
    key: GroupKey,
    cluster: Vec<&TimeEntry>,
    annotations: &HashMap<String, String>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> EntryGroup {
    let earliest_start = cluster
        .iter()
        .map(|entry| entry.start)
        .min()
        .expect("group has at least one member");
    let position_key = cluster
        .iter()
        .map(|entry| entry.start)
        .max()
        .expect("group has at least one member");
    let has_active_member = cluster.iter().any(|entry| entry.stop.is_none());
    let latest_stop = if has_active_member {
        None
    } else {
        cluster.iter().filter_map(|entry| entry.stop).max()
    };
    let total = cluster
        .iter()
        .fold(Duration::zero(), |acc, entry| {
            acc + entry_duration(entry, now)
        });

    let mut members = cluster
        .into_iter()
        .map(|entry| {
            let start_day = entry.start.with_timezone(tz).date_naive();
            let ends_on_later_day = entry
                .stop
                .map(|stop| stop.with_timezone(tz).date_naive() > start_day)
                .unwrap_or(false);
            MemberView {
                overlap_peer: annotations.get(&entry.id).cloned(),
                ends_on_later_day,
                entry: entry.clone(),
            }
        })
        .collect::<Vec<_>>();
    members.sort_by(|left, right| right.entry.start.cmp(&left.entry.start));

    EntryGroup {
        key,
        members,
        earliest_start,
        latest_stop,
        total,
        has_active_member,
        position_key,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    pub day: NaiveDate,
    pub groups: Vec<EntryGroup>,
    pub total: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentEntry {
    pub id: String,
    pub title: String,
    pub tags: BTreeSet<String>,
    pub started: DateTime<Utc>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekView {
    pub range: WeekRange,
    pub today: NaiveDate,
    pub days: Vec<DayBucket>,
    pub weekly_total: Duration,
    pub current: Option<CurrentEntry>,
}

impl WeekView {
    pub fn group_members(&self, day: NaiveDate, key: &GroupKey) -> Option<&[MemberView]> {
        self.days
            .iter()
            .find(|bucket| bucket.day == day)?
            .groups
            .iter()
            .find(|group| &group.key == key)
            .map(|group| group.members.as_slice())
    }
}

pub fn assemble<Tz: TimeZone>(
    entries: &[TimeEntry],
    owner: &str,
    now: DateTime<Utc>,
    tz: &Tz,
    week_start: Weekday,
) -> Result<WeekView, ProjectionError> {
    let range = resolve_week(now, tz, week_start);
    let today = now.with_timezone(tz).date_naive();

    let mut buckets: BTreeMap<NaiveDate, Vec<&TimeEntry>> = BTreeMap::new();
    let mut current = None;
    for entry in entries.iter().filter(|entry| entry.owner == owner) {
        let slices = split_entry(entry, tz)?;
        let start_day = slices
            .first()
            .map(|slice| slice.day)
            .expect("split always yields at least one slice");

        if entry.stop.is_none() {
            current = Some(CurrentEntry {
                id: entry.id.clone(),
                title: entry.title.clone(),
                tags: entry.tags.clone(),
                started: entry.start,
                elapsed: live_duration(entry, now),
            });
        }

        // Entries belong to the week of their start day only; split tails in
        // adjacent weeks never pull an entry into this view.
        if range.contains(start_day) {
            buckets.entry(start_day).or_default().push(entry);
        }
    }

    let mut days = Vec::new();
    let mut weekly_total = Duration::zero();
    for (day, day_entries) in buckets.iter().rev() {
        let annotations = detect_overlaps(day_entries);
        let groups = group_day(day_entries, &annotations, now, tz);
        let total = groups
            .iter()
            .fold(Duration::zero(), |acc, group| acc + group.total);
        weekly_total += total;
        days.push(DayBucket {
            day: *day,
            groups,
            total,
        });
    }

    Ok(WeekView {
        range,
        today,
        days,
        weekly_total,
        current,
    })
}

pub fn day_split_totals<Tz: TimeZone>(
    entries: &[TimeEntry],
    owner: &str,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<BTreeMap<NaiveDate, Duration>, ProjectionError> {
    let mut totals = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.owner == owner) {
        for slice in split_entry(entry, tz)? {
            let amount = match slice.closed_duration() {
                Some(duration) => duration,
                None => live_duration(entry, now),
            };
            *totals.entry(slice.day).or_insert_with(Duration::zero) += amount;
        }
    }
    Ok(totals)
}

fn to_instant<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(instant) => Some(instant.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => Some(first.min(second).with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

fn resolve_local<Tz: TimeZone>(naive: NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    if let Some(instant) = to_instant(naive, tz) {
        return instant;
    }

    // DST gap: scan forward to the first representable local minute.
    let mut cursor = naive + Duration::minutes(1);
    for _ in 0..120 {
        if let Some(instant) = to_instant(cursor, tz) {
            return instant;
        }
        cursor += Duration::minutes(1);
    }

    panic!("local day boundary does not exist");
}

fn day_start_instant<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    resolve_local(day.and_hms_opt(0, 0, 0).expect("midnight must be valid"), tz)
}

fn day_end_instant<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    resolve_local(
        day.and_hms_milli_opt(23, 59, 59, 999)
            .expect("end of day must be valid"),
        tz,
    )
}
