//! Provider archive addressing.
//!
//! Layout: `{SYMBOL}/{YYYY}/{MM}/{DD}/{HH}h_ticks.bi5`, where `MM` is the
//! zero-based month (January is `00`). One file per UTC hour.
//!
//! A requested range is split into whole years, months, days and hours with
//! partial units clipped at both ends, so every hour overlapping the
//! inclusive range `[start, end]` is addressed exactly once, in order.

use crate::error::DataError;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Timelike, Utc};
use std::fmt;

const FILE_SUFFIX: &str = "h_ticks.bi5";

/// Address of one hour file in the provider archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourPath {
    pub symbol: String,
    /// Start of the hour the file covers.
    pub hour: DateTime<Utc>,
}

impl HourPath {
    pub fn new(symbol: impl Into<String>, hour: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            hour,
        }
    }

    /// Archive key, e.g. `EURUSD/2018/06/05/05h_ticks.bi5` for 2018-07-05 05:00 UTC.
    pub fn key(&self) -> String {
        format!(
            "{}/{:04}/{:02}/{:02}/{:02}{FILE_SUFFIX}",
            self.symbol,
            self.hour.year(),
            self.hour.month0(),
            self.hour.day(),
            self.hour.hour()
        )
    }

    pub fn epoch_ms(&self) -> i64 {
        self.hour.timestamp_millis()
    }

    /// Recover symbol and hour from an archive key. Leading directories are ignored.
    pub fn parse(path: &str) -> Result<Self, DataError> {
        let bad = |why: &str| DataError::ValidationError(format!("bad tick path '{path}': {why}"));

        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        if parts.len() < 5 {
            return Err(bad("expected SYMBOL/YYYY/MM/DD/HHh_ticks.bi5"));
        }
        let tail = &parts[parts.len() - 5..];
        let num = |s: &str, what: &str| s.parse::<u32>().map_err(|_| bad(what));

        let symbol = tail[0].to_string();
        let year = tail[1].parse::<i32>().map_err(|_| bad("year"))?;
        let month0 = num(tail[2], "month")?;
        let day = num(tail[3], "day")?;
        let hour = tail[4]
            .strip_suffix(FILE_SUFFIX)
            .ok_or_else(|| bad("file name"))
            .and_then(|h| num(h, "hour"))?;

        let date = NaiveDate::from_ymd_opt(year, month0 + 1, day).ok_or_else(|| bad("date"))?;
        let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| bad("hour"))?;
        Ok(Self::new(symbol, date.and_time(time).and_utc()))
    }
}

impl fmt::Display for HourPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// The hour files of one calendar day that fall inside a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPaths {
    pub day: NaiveDate,
    pub paths: Vec<HourPath>,
}

/// One address per UTC hour overlapping `[start, end]`, ascending.
pub fn hour_paths(
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<HourPath>, DataError> {
    if end <= start {
        return Err(DataError::invalid_range(start, end, "end must be after start"));
    }
    let mut hours = Vec::new();
    expand(Unit::Year, start, end, &mut hours)?;
    Ok(hours
        .into_iter()
        .map(|h| HourPath::new(symbol, h))
        .collect())
}

/// Same addresses as [`hour_paths`], bucketed per calendar day.
pub fn paths_by_day(
    symbol: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<DayPaths>, DataError> {
    let mut days: Vec<DayPaths> = Vec::new();
    for path in hour_paths(symbol, start, end)? {
        let day = path.hour.date_naive();
        match days.last_mut() {
            Some(current) if current.day == day => current.paths.push(path),
            _ => days.push(DayPaths {
                day,
                paths: vec![path],
            }),
        }
    }
    Ok(days)
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Year,
    Month,
    Day,
    Hour,
}

impl Unit {
    fn finer(self) -> Option<Unit> {
        match self {
            Unit::Year => Some(Unit::Month),
            Unit::Month => Some(Unit::Day),
            Unit::Day => Some(Unit::Hour),
            Unit::Hour => None,
        }
    }

    fn floor(self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let date = t.date_naive();
        let midnight = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc();
        match self {
            Unit::Year => date.with_ordinal(1).map(midnight),
            Unit::Month => date.with_day(1).map(midnight),
            Unit::Day => Some(midnight(date)),
            Unit::Hour => date
                .and_hms_opt(t.hour(), 0, 0)
                .map(|naive| naive.and_utc()),
        }
    }

    fn next(self, aligned: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Unit::Year => aligned.checked_add_months(Months::new(12)),
            Unit::Month => aligned.checked_add_months(Months::new(1)),
            Unit::Day => aligned.checked_add_signed(Duration::days(1)),
            Unit::Hour => aligned.checked_add_signed(Duration::hours(1)),
        }
    }
}

/// Walk `unit`-aligned segments touching `[from, to]`, clipping partial
/// segments and descending until whole hours are reached.
fn expand(
    unit: Unit,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    out: &mut Vec<DateTime<Utc>>,
) -> Result<(), DataError> {
    let out_of_range = || DataError::invalid_range(from, to, "date outside supported calendar");
    let mut cursor = unit.floor(from).ok_or_else(out_of_range)?;

    while cursor <= to {
        let next = unit.next(cursor).ok_or_else(out_of_range)?;
        match unit.finer() {
            None => out.push(cursor),
            Some(finer) => {
                let lo = cursor.max(from);
                let hi = (next - Duration::milliseconds(1)).min(to);
                expand(finer, lo, hi, out)?;
            }
        }
        cursor = next;
    }
    Ok(())
}
