use crate::domain::Period;
use crate::error::DataError;
use chrono::{DateTime, Days, NaiveDate, Utc};

/// A validated query range.
///
/// `start` and `end` are floored to the period when one is given, and
/// `days` lists every UTC calendar day the range touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criteria {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub period: Option<Period>,
    pub days: Vec<NaiveDate>,
}

impl Criteria {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        floor: DateTime<Utc>,
        period: Option<Period>,
    ) -> Result<Self, DataError> {
        if end <= start {
            return Err(DataError::invalid_range(start, end, "end must be after start"));
        }
        if start < floor {
            return Err(DataError::invalid_range(
                start,
                end,
                format!("start precedes beginning of time {floor}"),
            ));
        }
        let (start, end) = match period {
            Some(p) => (p.floor(start), p.floor(end)),
            None => (start, end),
        };
        Ok(Self {
            start,
            end,
            period,
            days: days_between(start.date_naive(), end.date_naive()),
        })
    }

    /// Inclusive at both ends.
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

fn days_between(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = Some(first);
    while let Some(d) = day.filter(|d| *d <= last) {
        days.push(d);
        day = d.checked_add_days(Days::new(1));
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::provider_epoch;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 7, d, h, m, 0).unwrap()
    }

    #[test]
    fn rounds_to_period_and_lists_days() {
        let c = Criteria::new(at(5, 5, 7), at(7, 1, 59), provider_epoch(), Some(Period::FiveMinutes))
            .unwrap();
        assert_eq!(c.start, at(5, 5, 5));
        assert_eq!(c.end, at(7, 1, 55));
        assert_eq!(c.days.len(), 3);
        assert_eq!(c.days[0], NaiveDate::from_ymd_opt(2018, 7, 5).unwrap());
        assert!(c.contains(at(7, 1, 55)));
        assert!(!c.contains(at(7, 1, 56)));
    }

    #[test]
    fn without_period_keeps_bounds() {
        let c = Criteria::new(at(5, 5, 7), at(5, 6, 0), provider_epoch(), None).unwrap();
        assert_eq!(c.start, at(5, 5, 7));
        assert_eq!(c.days.len(), 1);
    }

    #[test]
    fn rejects_reversed_and_pre_floor_ranges() {
        assert!(matches!(
            Criteria::new(at(5, 6, 0), at(5, 5, 0), provider_epoch(), None),
            Err(DataError::InvalidRange { .. })
        ));
        assert!(Criteria::new(at(5, 5, 0), at(5, 5, 0), provider_epoch(), None).is_err());
        let early = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            Criteria::new(early, at(5, 5, 0), provider_epoch(), None),
            Err(DataError::InvalidRange { .. })
        ));
    }
}
