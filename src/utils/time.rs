use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

/// Identifies one tumbling window: the calendar day plus the index of the window within it.
/// Keeping the date makes a midnight rollover close the previous window even though the index
/// wraps back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey {
    pub date: NaiveDate,
    pub index: u32,
}

impl WindowKey {
    pub fn containing(moment: NaiveDateTime, width_minutes: u32) -> Self {
        Self {
            date: moment.date(),
            index: window_index(moment.time(), width_minutes),
        }
    }

    /// Local time at which this window starts.
    pub fn start(&self, width_minutes: u32) -> NaiveDateTime {
        self.date.and_time(NaiveTime::MIN)
            + Duration::minutes(i64::from(self.index) * i64::from(width_minutes))
    }
}

/// `(hour * 60 + minute) / width`.
pub fn window_index(time: NaiveTime, width_minutes: u32) -> u32 {
    (time.hour() * 60 + time.minute()) / width_minutes
}

/// This is the standard way of rendering a window start in the journal.
pub fn format_window_start(start: NaiveDateTime) -> String {
    start.format("%a %b %d %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 7, 4)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(h, m, s).unwrap())
    }

    #[test]
    fn index_ignores_seconds() {
        assert_eq!(window_index(at(10, 0, 0).time(), 1), 600);
        assert_eq!(window_index(at(10, 0, 59).time(), 1), 600);
        assert_eq!(window_index(at(10, 1, 0).time(), 1), 601);
    }

    #[test]
    fn wider_windows_group_minutes() {
        assert_eq!(window_index(at(10, 14, 0).time(), 15), 40);
        assert_eq!(window_index(at(10, 15, 0).time(), 15), 41);
        let key = WindowKey::containing(at(10, 14, 30), 15);
        assert_eq!(key.start(15), at(10, 0, 0));
    }

    #[test]
    fn keys_differ_across_midnight() {
        let before = WindowKey::containing(at(0, 5, 0), 1);
        let next_day = WindowKey::containing(at(0, 5, 0) + Duration::days(1), 1);
        assert_eq!(before.index, next_day.index);
        assert_ne!(before, next_day);
        assert!(before < next_day);
    }

    #[test]
    fn window_start_rendering() {
        assert_eq!(format_window_start(at(9, 30, 0)), "Wed Jul 04 09:30:00 2018");
    }
}
