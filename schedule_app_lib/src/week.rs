use anyhow::{Error, format_err};
use derive_more::Into;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, str::FromStr};
use time::{Date, Duration, Weekday};

use stack_string::StackString;

/// First day of the displayed week, default Monday.
#[derive(Into, Debug, PartialEq, Eq, Serialize, Deserialize, Clone, Copy)]
#[serde(into = "StackString", try_from = "StackString")]
pub struct WeekStart(Weekday);

impl WeekStart {
    #[must_use]
    pub fn weekday(self) -> Weekday {
        self.0
    }
}

impl Default for WeekStart {
    fn default() -> Self {
        Self(Weekday::Monday)
    }
}

impl Deref for WeekStart {
    type Target = Weekday;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<WeekStart> for StackString {
    fn from(item: WeekStart) -> Self {
        StackString::from_display(item.0)
    }
}

impl FromStr for WeekStart {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let day = match s.to_lowercase().as_str() {
            "monday" | "mon" => Weekday::Monday,
            "tuesday" | "tue" => Weekday::Tuesday,
            "wednesday" | "wed" => Weekday::Wednesday,
            "thursday" | "thu" => Weekday::Thursday,
            "friday" | "fri" => Weekday::Friday,
            "saturday" | "sat" => Weekday::Saturday,
            "sunday" | "sun" => Weekday::Sunday,
            _ => return Err(format_err!("{s} is not a valid weekday")),
        };
        Ok(Self(day))
    }
}

impl TryFrom<StackString> for WeekStart {
    type Error = Error;
    fn try_from(item: StackString) -> Result<Self, Self::Error> {
        item.as_str().parse()
    }
}

/// Weekday as stored in the database, 0 = Monday .. 6 = Sunday.
#[must_use]
pub fn weekday_number(day: Weekday) -> u8 {
    day.number_days_from_monday()
}

#[must_use]
pub fn weekday_from_number(day: u8) -> Option<Weekday> {
    let day = match day {
        0 => Weekday::Monday,
        1 => Weekday::Tuesday,
        2 => Weekday::Wednesday,
        3 => Weekday::Thursday,
        4 => Weekday::Friday,
        5 => Weekday::Saturday,
        6 => Weekday::Sunday,
        _ => return None,
    };
    Some(day)
}

/// The seven day window containing `reference`, beginning on `week_start`.
/// The window is stable for every weekday of `reference`, including the
/// final day of the window.
#[must_use]
pub fn week_window(reference: Date, week_start: Weekday) -> (Date, Date) {
    let offset = i64::from(
        (7 + reference.weekday().number_days_from_monday()
            - week_start.number_days_from_monday())
            % 7,
    );
    let start = reference - Duration::days(offset);
    (start, start + Duration::days(6))
}

/// Open interval intersection. Ranges that merely touch (one ends exactly
/// when the other starts) do not overlap.
#[must_use]
pub fn time_ranges_overlap<T: PartialOrd>(start_a: T, end_a: T, start_b: T, end_b: T) -> bool {
    start_a < end_b && start_b < end_a
}

#[cfg(test)]
mod tests {
    use time::{
        Weekday,
        macros::{date, time},
    };

    use crate::week::{
        WeekStart, time_ranges_overlap, week_window, weekday_from_number, weekday_number,
    };

    #[test]
    fn test_week_window_mid_week() {
        // 2023-11-15 is a Wednesday
        let (start, end) = week_window(date!(2023 - 11 - 15), Weekday::Monday);
        assert_eq!(start, date!(2023 - 11 - 13));
        assert_eq!(end, date!(2023 - 11 - 19));
    }

    #[test]
    fn test_week_window_on_window_start() {
        let (start, end) = week_window(date!(2023 - 11 - 13), Weekday::Monday);
        assert_eq!(start, date!(2023 - 11 - 13));
        assert_eq!(end, date!(2023 - 11 - 19));
    }

    #[test]
    fn test_week_window_sunday_reference() {
        // A Sunday reference stays in the week that began on the preceding
        // Monday rather than slipping into the following (or previous) week.
        let (start, end) = week_window(date!(2023 - 11 - 19), Weekday::Monday);
        assert_eq!(start, date!(2023 - 11 - 13));
        assert_eq!(end, date!(2023 - 11 - 19));
    }

    #[test]
    fn test_week_window_sunday_start() {
        let (start, end) = week_window(date!(2023 - 11 - 15), Weekday::Sunday);
        assert_eq!(start, date!(2023 - 11 - 12));
        assert_eq!(end, date!(2023 - 11 - 18));

        let (start, end) = week_window(date!(2023 - 11 - 12), Weekday::Sunday);
        assert_eq!(start, date!(2023 - 11 - 12));
        assert_eq!(end, date!(2023 - 11 - 18));
    }

    #[test]
    fn test_week_window_spans_month_boundary() {
        // 2023-12-01 is a Friday
        let (start, end) = week_window(date!(2023 - 12 - 01), Weekday::Monday);
        assert_eq!(start, date!(2023 - 11 - 27));
        assert_eq!(end, date!(2023 - 12 - 03));
    }

    #[test]
    fn test_overlap_basic() {
        assert!(time_ranges_overlap(
            time!(09:00),
            time!(10:00),
            time!(09:30),
            time!(10:30)
        ));
        assert!(!time_ranges_overlap(
            time!(09:00),
            time!(10:00),
            time!(11:00),
            time!(12:00)
        ));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let cases = [
            (time!(09:00), time!(10:00), time!(09:30), time!(10:30)),
            (time!(09:00), time!(10:00), time!(10:00), time!(11:00)),
            (time!(08:00), time!(12:00), time!(09:00), time!(10:00)),
            (time!(00:00), time!(23:59), time!(12:00), time!(12:30)),
        ];
        for (a0, a1, b0, b1) in cases {
            assert_eq!(
                time_ranges_overlap(a0, a1, b0, b1),
                time_ranges_overlap(b0, b1, a0, a1)
            );
        }
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        assert!(!time_ranges_overlap(
            time!(09:00),
            time!(10:00),
            time!(10:00),
            time!(11:00)
        ));
        assert!(!time_ranges_overlap(
            time!(10:00),
            time!(11:00),
            time!(09:00),
            time!(10:00)
        ));
    }

    #[test]
    fn test_contained_range_overlaps() {
        assert!(time_ranges_overlap(
            time!(08:00),
            time!(12:00),
            time!(09:00),
            time!(10:00)
        ));
    }

    #[test]
    fn test_weekday_numbering_round_trip() {
        for number in 0..7 {
            let day = weekday_from_number(number).unwrap();
            assert_eq!(weekday_number(day), number);
        }
        assert!(weekday_from_number(7).is_none());
    }

    #[test]
    fn test_week_start_parsing() {
        let ws: WeekStart = "sunday".parse().unwrap();
        assert_eq!(ws.weekday(), Weekday::Sunday);
        let ws: WeekStart = "Mon".parse().unwrap();
        assert_eq!(ws.weekday(), Weekday::Monday);
        assert!("someday".parse::<WeekStart>().is_err());
    }
}
