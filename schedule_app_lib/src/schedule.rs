use anyhow::{Error, format_err};
use log::warn;
use smallvec::SmallVec;
use stack_string::{StackString, format_sstr};
use std::fmt;
use time::{Date, Duration, Time, Weekday, macros::format_description};
use uuid::Uuid;

use crate::week::{time_ranges_overlap, week_window};

pub const BORDER_ALPHA: u8 = 240;
pub const FILL_ALPHA: u8 = 192;

/// Steel blue, used when a stored color fails to parse.
const FALLBACK_RGB: (u8, u8, u8) = (70, 130, 180);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { r, g, b, a } = self;
        let alpha = f64::from(*a) / 255.0;
        write!(f, "rgba({r}, {g}, {b}, {alpha:.3})")
    }
}

/// Display color stored as `#RRGGBB`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventColor(StackString);

impl EventColor {
    /// # Errors
    /// Returns error unless `hex` is of the form `#RRGGBB`
    pub fn new(hex: &str) -> Result<Self, Error> {
        parse_hex_rgb(hex).map(|_| Self(hex.into()))
    }

    /// Wraps a color already in storage without validating it; a malformed
    /// value falls back to [`FALLBACK_RGB`] at render time.
    #[must_use]
    pub fn from_stored(hex: &str) -> Self {
        Self(hex.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn rgb(&self) -> (u8, u8, u8) {
        parse_hex_rgb(&self.0).unwrap_or_else(|_| {
            warn!("malformed stored color {}", self.0);
            FALLBACK_RGB
        })
    }

    #[must_use]
    pub fn border(&self) -> Rgba {
        let (r, g, b) = self.rgb();
        Rgba {
            r,
            g,
            b,
            a: BORDER_ALPHA,
        }
    }

    #[must_use]
    pub fn fill(&self) -> Rgba {
        let (r, g, b) = self.rgb();
        Rgba {
            r,
            g,
            b,
            a: FILL_ALPHA,
        }
    }
}

impl fmt::Display for EventColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

fn parse_hex_rgb(hex: &str) -> Result<(u8, u8, u8), Error> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format_err!("{hex} is not a #RRGGBB color"));
    }
    let r = u8::from_str_radix(&digits[0..2], 16)?;
    let g = u8::from_str_radix(&digits[2..4], 16)?;
    let b = u8::from_str_radix(&digits[4..6], 16)?;
    Ok((r, g, b))
}

/// A stored schedule entry, either pinned to one calendar date or repeating
/// on a set of weekdays.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleEvent {
    pub id: Uuid,
    pub title: StackString,
    pub notes: Option<StackString>,
    pub start: Time,
    pub end: Time,
    pub color: EventColor,
    pub date: Option<Date>,
    pub days: SmallVec<[Weekday; 7]>,
}

impl ScheduleEvent {
    #[must_use]
    pub fn is_dated(&self) -> bool {
        self.date.is_some() && self.days.is_empty()
    }

    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.date.is_none() && !self.days.is_empty()
    }
}

/// Where a candidate event occurs, one calendar date or at least one weekday.
#[derive(Clone, Debug, PartialEq)]
pub enum EventAnchor {
    Date(Date),
    Days(SmallVec<[Weekday; 7]>),
}

/// First stored event whose time range collides with the candidate, in
/// storage order. Dated candidates are compared against entries on the same
/// date; recurring candidates only against other recurring entries sharing a
/// weekday. Read-only, a hit simply means the insert should be refused.
#[must_use]
pub fn find_conflict<'a>(
    existing: &'a [ScheduleEvent],
    start: Time,
    end: Time,
    anchor: &EventAnchor,
) -> Option<&'a ScheduleEvent> {
    match anchor {
        EventAnchor::Date(date) => existing.iter().find(|event| {
            event.date == Some(*date) && time_ranges_overlap(start, end, event.start, event.end)
        }),
        EventAnchor::Days(days) => existing.iter().find(|event| {
            event.is_recurring()
                && event.days.iter().any(|day| days.contains(day))
                && time_ranges_overlap(start, end, event.start, event.end)
        }),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayAnchor {
    Date(Date),
    Weekday(Weekday),
}

/// One renderable occurrence within the displayed week.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayEvent {
    pub anchor: DisplayAnchor,
    pub start: Time,
    pub end: Time,
    pub title: StackString,
    pub notes: Option<StackString>,
    pub label: StackString,
    pub border: Rgba,
    pub fill: Rgba,
}

fn format_time(t: Time) -> StackString {
    t.format(format_description!("[hour]:[minute]"))
        .map_or_else(|_| "00:00".into(), Into::into)
}

fn display_event(event: &ScheduleEvent, anchor: DisplayAnchor) -> DisplayEvent {
    let label = format_sstr!(
        "{} {}-{}",
        event.title,
        format_time(event.start),
        format_time(event.end)
    );
    DisplayEvent {
        anchor,
        start: event.start,
        end: event.end,
        title: event.title.clone(),
        notes: event.notes.clone(),
        label,
        border: event.color.border(),
        fill: event.color.fill(),
    }
}

/// Resolve stored events against the week containing `reference` into the
/// list of occurrences to draw.
///
/// Dated entries inside the window land in their weekday's bucket; dated
/// entries outside the window are dropped. A recurring entry contributes one
/// occurrence per weekday unless a kept dated entry in that bucket overlaps
/// its time range, in which case the dated entry stands in for it (a
/// specific date is an intentional one-week override of the standing
/// pattern). Entries with neither or both anchors are logged and skipped so
/// one bad row cannot take down the whole week's render. Pure and
/// deterministic for a fixed `reference`.
#[must_use]
pub fn materialize_week(
    events: &[ScheduleEvent],
    reference: Date,
    week_start: Weekday,
) -> Vec<DisplayEvent> {
    let (window_start, window_end) = week_window(reference, week_start);

    let mut dated_buckets: [Vec<&ScheduleEvent>; 7] = Default::default();
    let mut recurring = Vec::new();
    for event in events {
        match (event.date, event.days.is_empty()) {
            (Some(date), true) => {
                if date >= window_start && date <= window_end {
                    let offset = (date - window_start).whole_days() as usize;
                    dated_buckets[offset].push(event);
                }
            }
            (None, false) => recurring.push(event),
            _ => {
                warn!(
                    "event {} has no usable anchor (date {:?}, {} weekdays), skipping",
                    event.id,
                    event.date,
                    event.days.len()
                );
            }
        }
    }

    let mut output = Vec::new();
    for offset in 0..7 {
        let day = window_start + Duration::days(offset as i64);
        let bucket = &dated_buckets[offset];
        for event in bucket {
            output.push(display_event(event, DisplayAnchor::Date(day)));
        }
        for event in &recurring {
            if !event.days.contains(&day.weekday()) {
                continue;
            }
            let overridden = bucket
                .iter()
                .any(|dated| time_ranges_overlap(event.start, event.end, dated.start, dated.end));
            if !overridden {
                output.push(display_event(event, DisplayAnchor::Weekday(day.weekday())));
            }
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use smallvec::{SmallVec, smallvec};
    use time::{
        Date, Time, Weekday,
        macros::{date, time},
    };
    use uuid::Uuid;

    use crate::schedule::{
        BORDER_ALPHA, DisplayAnchor, EventAnchor, EventColor, FILL_ALPHA, ScheduleEvent,
        find_conflict, materialize_week,
    };

    fn dated(title: &str, date: Date, start: Time, end: Time) -> ScheduleEvent {
        ScheduleEvent {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: None,
            start,
            end,
            color: EventColor::new("#0F52BA").unwrap(),
            date: Some(date),
            days: SmallVec::new(),
        }
    }

    fn recurring(title: &str, days: &[Weekday], start: Time, end: Time) -> ScheduleEvent {
        ScheduleEvent {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: None,
            start,
            end,
            color: EventColor::new("#228B22").unwrap(),
            date: None,
            days: days.iter().copied().collect(),
        }
    }

    // Week under test: Monday 2023-11-13 through Sunday 2023-11-19.
    const REFERENCE: Date = date!(2023 - 11 - 16);

    #[test]
    fn test_color_conversion() {
        let color = EventColor::new("#0F52BA").unwrap();
        let border = color.border();
        assert_eq!(
            (border.r, border.g, border.b, border.a),
            (15, 82, 186, BORDER_ALPHA)
        );
        let fill = color.fill();
        assert_eq!((fill.r, fill.g, fill.b, fill.a), (15, 82, 186, FILL_ALPHA));
        assert!(EventColor::new("red").is_err());
        assert!(EventColor::new("#12345").is_err());
    }

    #[test]
    fn test_rgba_css_display() {
        let color = EventColor::new("#0F52BA").unwrap();
        assert_eq!(color.fill().to_string(), "rgba(15, 82, 186, 0.753)");
    }

    #[test]
    fn test_no_conflict_for_disjoint_ranges_same_date() {
        let existing = vec![dated("standup", date!(2023 - 11 - 15), time!(09:00), time!(10:00))];
        let anchor = EventAnchor::Date(date!(2023 - 11 - 15));
        assert!(find_conflict(&existing, time!(10:00), time!(11:00), &anchor).is_none());
        assert!(find_conflict(&existing, time!(07:00), time!(09:00), &anchor).is_none());
    }

    #[test]
    fn test_conflict_for_overlapping_ranges_same_date() {
        let existing = vec![dated("standup", date!(2023 - 11 - 15), time!(09:00), time!(10:00))];
        let anchor = EventAnchor::Date(date!(2023 - 11 - 15));
        let hit = find_conflict(&existing, time!(09:30), time!(10:30), &anchor).unwrap();
        assert_eq!(hit.title.as_str(), "standup");
    }

    #[test]
    fn test_no_conflict_across_different_dates() {
        let existing = vec![dated("standup", date!(2023 - 11 - 15), time!(09:00), time!(10:00))];
        let anchor = EventAnchor::Date(date!(2023 - 11 - 16));
        assert!(find_conflict(&existing, time!(09:00), time!(10:00), &anchor).is_none());
    }

    #[test]
    fn test_recurring_conflict_on_shared_weekday() {
        let existing = vec![recurring(
            "gym",
            &[Weekday::Tuesday, Weekday::Thursday],
            time!(18:00),
            time!(19:00),
        )];
        let days: SmallVec<[Weekday; 7]> = smallvec![Weekday::Thursday];
        let hit =
            find_conflict(&existing, time!(18:30), time!(19:30), &EventAnchor::Days(days)).unwrap();
        assert_eq!(hit.title.as_str(), "gym");

        let days: SmallVec<[Weekday; 7]> = smallvec![Weekday::Friday];
        assert!(
            find_conflict(&existing, time!(18:30), time!(19:30), &EventAnchor::Days(days))
                .is_none()
        );
    }

    #[test]
    fn test_recurring_candidate_ignores_dated_events() {
        // A recurring candidate is only compared against other recurring
        // entries, a dated entry on the matching weekday does not block it.
        let existing = vec![dated("dentist", date!(2023 - 11 - 16), time!(09:00), time!(10:00))];
        let days: SmallVec<[Weekday; 7]> = smallvec![Weekday::Thursday];
        assert!(
            find_conflict(&existing, time!(09:00), time!(10:00), &EventAnchor::Days(days))
                .is_none()
        );
    }

    #[test]
    fn test_conflict_returns_first_in_storage_order() {
        let existing = vec![
            dated("first", date!(2023 - 11 - 15), time!(09:00), time!(10:00)),
            dated("second", date!(2023 - 11 - 15), time!(09:00), time!(10:00)),
        ];
        let anchor = EventAnchor::Date(date!(2023 - 11 - 15));
        let hit = find_conflict(&existing, time!(09:30), time!(10:30), &anchor).unwrap();
        assert_eq!(hit.title.as_str(), "first");
    }

    #[test]
    fn test_touching_ranges_never_conflict() {
        let existing = vec![dated("standup", date!(2023 - 11 - 15), time!(09:00), time!(10:00))];
        let anchor = EventAnchor::Date(date!(2023 - 11 - 15));
        assert!(find_conflict(&existing, time!(10:00), time!(11:00), &anchor).is_none());
    }

    #[test]
    fn test_dated_event_outside_window_is_dropped() {
        let events = vec![
            dated("this week", date!(2023 - 11 - 15), time!(09:00), time!(10:00)),
            dated("next week", date!(2023 - 11 - 22), time!(09:00), time!(10:00)),
            dated("last month", date!(2023 - 10 - 04), time!(09:00), time!(10:00)),
        ];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].title.as_str(), "this week");
        assert_eq!(output[0].anchor, DisplayAnchor::Date(date!(2023 - 11 - 15)));
    }

    #[test]
    fn test_dated_overrides_overlapping_recurring() {
        let events = vec![
            recurring("sync", &[Weekday::Wednesday], time!(09:00), time!(10:00)),
            dated("moved sync", date!(2023 - 11 - 15), time!(09:30), time!(10:30)),
        ];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].title.as_str(), "moved sync");
        assert_eq!(output[0].anchor, DisplayAnchor::Date(date!(2023 - 11 - 15)));
    }

    #[test]
    fn test_non_overlapping_dated_and_recurring_coexist() {
        let events = vec![
            recurring("sync", &[Weekday::Wednesday], time!(09:00), time!(10:00)),
            dated("review", date!(2023 - 11 - 15), time!(11:00), time!(12:00)),
        ];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 2);
        let titles: Vec<_> = output.iter().map(|e| e.title.as_str()).collect();
        assert!(titles.contains(&"sync"));
        assert!(titles.contains(&"review"));
    }

    #[test]
    fn test_recurring_emits_once_per_weekday() {
        let events = vec![recurring(
            "gym",
            &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
            time!(18:00),
            time!(19:00),
        )];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 3);
        let anchors: Vec<_> = output.iter().map(|e| e.anchor).collect();
        assert!(anchors.contains(&DisplayAnchor::Weekday(Weekday::Monday)));
        assert!(anchors.contains(&DisplayAnchor::Weekday(Weekday::Wednesday)));
        assert!(anchors.contains(&DisplayAnchor::Weekday(Weekday::Friday)));
    }

    #[test]
    fn test_override_only_suppresses_matching_weekday() {
        // The Wednesday occurrence is overridden, Monday and Friday stay.
        let events = vec![
            recurring(
                "gym",
                &[Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
                time!(18:00),
                time!(19:00),
            ),
            dated("physio", date!(2023 - 11 - 15), time!(18:00), time!(19:00)),
        ];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 3);
        let suppressed = output
            .iter()
            .any(|e| e.anchor == DisplayAnchor::Weekday(Weekday::Wednesday));
        assert!(!suppressed);
    }

    #[test]
    fn test_materialization_is_idempotent() {
        let events = vec![
            recurring("sync", &[Weekday::Wednesday], time!(09:00), time!(10:00)),
            dated("review", date!(2023 - 11 - 15), time!(11:00), time!(12:00)),
            dated("dentist", date!(2023 - 11 - 17), time!(08:00), time!(09:00)),
        ];
        let first = materialize_week(&events, REFERENCE, Weekday::Monday);
        let second = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(first, second);
    }

    #[test]
    fn test_event_without_anchor_is_skipped() {
        let mut broken = dated("broken", date!(2023 - 11 - 15), time!(09:00), time!(10:00));
        broken.date = None;
        let events = vec![
            broken,
            dated("fine", date!(2023 - 11 - 15), time!(11:00), time!(12:00)),
        ];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].title.as_str(), "fine");
    }

    #[test]
    fn test_event_with_both_anchors_is_skipped() {
        let mut tangled = recurring("tangled", &[Weekday::Monday], time!(09:00), time!(10:00));
        tangled.date = Some(date!(2023 - 11 - 13));
        let output = materialize_week(&[tangled], REFERENCE, Weekday::Monday);
        assert!(output.is_empty());
    }

    #[test]
    fn test_display_label_combines_title_and_times() {
        let events = vec![dated("review", date!(2023 - 11 - 15), time!(11:00), time!(12:30))];
        let output = materialize_week(&events, REFERENCE, Weekday::Monday);
        assert_eq!(output[0].label.as_str(), "review 11:00-12:30");
    }

    #[test]
    fn test_sunday_reference_uses_same_window() {
        let events = vec![dated("review", date!(2023 - 11 - 13), time!(09:00), time!(10:00))];
        let from_sunday = materialize_week(&events, date!(2023 - 11 - 19), Weekday::Monday);
        let from_monday = materialize_week(&events, date!(2023 - 11 - 13), Weekday::Monday);
        assert_eq!(from_sunday, from_monday);
        assert_eq!(from_sunday.len(), 1);
    }
}
