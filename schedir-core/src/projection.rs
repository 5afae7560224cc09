//! Expansion of event templates into concrete per-date occurrences.
//!
//! Two shapes are produced from the same inputs:
//! - [`GridProjection`]: lookup structure for calendar grids and day views
//!   (cycle index -> weekday -> events, plus date -> events).
//! - [`project_for_list`]: a forward chronological agenda grouped by day and
//!   time slot.
//!
//! Both are pure functions of their inputs and can be recomputed freely.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Weekday};

use crate::model::{Event, Recurrence, Schedule};
use crate::recurrence::monday_of;

/// Is `event` placed through the cycle grid (rather than on its own date)?
fn is_grid_bound(recurrence: Option<&Recurrence>, event: &Event) -> bool {
    recurrence.is_some() && event.is_periodic()
}

#[derive(Debug, Clone)]
pub struct GridProjection<Tz: TimeZone> {
    tz: Tz,
    start_date: NaiveDate,
    end_date: NaiveDate,
    recurrence: Option<Recurrence>,
    periodic: HashMap<u32, HashMap<Weekday, Vec<Event>>>,
    dated: HashMap<NaiveDate, Vec<Event>>,
}

/// Bucket the events of `schedule` for grid lookups.
///
/// Periodic templates of a recurring schedule go to `periodic[cycle][weekday]`;
/// everything else (non-recurring schedules, one-off custom events) goes to
/// `dated[local date]`.
pub fn project_for_grid<Tz: TimeZone>(
    schedule: &Schedule,
    events: &[Event],
    tz: &Tz,
) -> GridProjection<Tz> {
    let mut periodic: HashMap<u32, HashMap<Weekday, Vec<Event>>> = HashMap::new();
    let mut dated: HashMap<NaiveDate, Vec<Event>> = HashMap::new();

    for event in events {
        match event.cycle_index {
            Some(cycle) if schedule.recurrence.is_some() => periodic
                .entry(cycle)
                .or_default()
                .entry(event.weekday(tz))
                .or_default()
                .push(event.clone()),
            _ => dated
                .entry(event.local_date(tz))
                .or_default()
                .push(event.clone()),
        }
    }

    GridProjection {
        tz: tz.clone(),
        start_date: schedule.start_date,
        end_date: schedule.end_date,
        recurrence: schedule.recurrence,
        periodic,
        dated,
    }
}

impl<Tz: TimeZone> GridProjection<Tz> {
    pub fn is_empty(&self) -> bool {
        self.periodic.is_empty() && self.dated.is_empty()
    }

    /// Cycle index of `date` for recurring schedules.
    pub fn cycle_index_of(&self, date: NaiveDate) -> Option<u32> {
        self.recurrence
            .map(|r| r.cycle_index_of(date, self.start_date))
    }

    /// Everything scheduled on `date`, ordered by local start time.
    ///
    /// Dates outside the schedule range have no occurrences.
    pub fn events_on(&self, date: NaiveDate) -> Vec<&Event> {
        if date < self.start_date || date > self.end_date {
            return Vec::new();
        }

        let mut events: Vec<&Event> = Vec::new();

        if let Some(cycle) = self.cycle_index_of(date) {
            if let Some(bucket) = self
                .periodic
                .get(&cycle)
                .and_then(|days| days.get(&date.weekday()))
            {
                events.extend(bucket);
            }
        }

        if let Some(bucket) = self.dated.get(&date) {
            events.extend(bucket);
        }

        events.sort_by_key(|e| (e.local_start_time(&self.tz), e.local_end_time(&self.tz)));
        events
    }
}

/// Events sharing one (start, end) interval on one day ("parallel sections").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgendaDay {
    pub date: NaiveDate,
    pub slots: Vec<AgendaSlot>,
}

impl AgendaDay {
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.slots.iter().flat_map(|s| s.events.iter())
    }
}

/// Chronological agenda starting at `reference_date`.
///
/// Periodic templates are materialized for `horizon_weeks` weeks starting
/// with the week of `reference_date`; dated events are listed on their own
/// date. Hidden events, dates before `reference_date` and dates outside the
/// schedule range are left out.
pub fn project_for_list<Tz: TimeZone>(
    schedule: &Schedule,
    events: &[Event],
    tz: &Tz,
    reference_date: NaiveDate,
    horizon_weeks: u32,
) -> Vec<AgendaDay> {
    type Slots = BTreeMap<(NaiveTime, NaiveTime), Vec<Event>>;
    let mut days: BTreeMap<NaiveDate, Slots> = BTreeMap::new();

    let visible = |date: NaiveDate| date >= reference_date && schedule.contains(date);
    let mut push = |date: NaiveDate, event: &Event| {
        days.entry(date)
            .or_default()
            .entry((event.local_start_time(tz), event.local_end_time(tz)))
            .or_default()
            .push(event.clone());
    };

    let recurrence = schedule.recurrence.as_ref();
    let (templates, dated): (Vec<&Event>, Vec<&Event>) = events
        .iter()
        .filter(|e| !e.is_hidden)
        .partition(|e| is_grid_bound(recurrence, e));

    let first_monday = monday_of(reference_date);
    for week in 0..i64::from(horizon_weeks) {
        let Some(monday) = Duration::try_weeks(week).and_then(|w| first_monday.checked_add_signed(w))
        else {
            break;
        };
        if monday > schedule.end_date {
            break;
        }

        for event in &templates {
            let offset = Duration::days(i64::from(event.weekday(tz).num_days_from_monday()));
            let Some(date) = monday.checked_add_signed(offset) else {
                continue;
            };

            if visible(date) && schedule.cycle_index_of(date) == event.cycle_index {
                push(date, event);
            }
        }
    }

    for event in dated {
        let date = event.local_date(tz);
        if visible(date) {
            push(date, event);
        }
    }

    days.into_iter()
        .map(|(date, slots)| AgendaDay {
            date,
            slots: slots
                .into_iter()
                .map(|((start, end), events)| AgendaSlot { start, end, events })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        day.and_hms_opt(hour, minute, 0).unwrap().and_utc()
    }

    fn template(name: &str, day: NaiveDate, hour: u32, cycle: Option<u32>) -> Event {
        let mut event = Event::new(name, "Lecture", at(day, hour, 0), at(day, hour + 1, 30)).unwrap();
        event.cycle_index = cycle;
        event
    }

    /// Biweekly semester starting Monday 2025-09-01.
    fn biweekly() -> Schedule {
        Schedule::new(
            "tt-1",
            date(2025, 9, 1),
            date(2025, 12, 28),
            Some(Recurrence::new(0, 2).unwrap()),
        )
        .unwrap()
    }

    fn biweekly_events() -> Vec<Event> {
        vec![
            template("Algebra", date(2025, 9, 1), 9, Some(1)),
            template("Physics", date(2025, 9, 1), 11, Some(2)),
            template("History", date(2025, 9, 3), 9, Some(1)),
            template("Drawing", date(2025, 9, 5), 14, Some(2)),
        ]
    }

    fn names(events: &[&Event]) -> Vec<String> {
        events.iter().map(|e| e.name.clone()).collect()
    }

    #[test]
    fn grid_lookup_follows_cycle() {
        let grid = project_for_grid(&biweekly(), &biweekly_events(), &Utc);

        assert_eq!(names(&grid.events_on(date(2025, 9, 1))), vec!["Algebra"]);
        assert_eq!(names(&grid.events_on(date(2025, 9, 8))), vec!["Physics"]);
        assert_eq!(names(&grid.events_on(date(2025, 9, 15))), vec!["Algebra"]);
        assert_eq!(names(&grid.events_on(date(2025, 9, 12))), vec!["Drawing"]);
        assert!(grid.events_on(date(2025, 9, 2)).is_empty());
    }

    #[test]
    fn grid_is_empty_outside_range() {
        let grid = project_for_grid(&biweekly(), &biweekly_events(), &Utc);
        assert!(grid.events_on(date(2025, 8, 25)).is_empty());
        assert!(grid.events_on(date(2025, 12, 29)).is_empty());
    }

    #[test]
    fn grid_matches_flat_filter_for_every_day() {
        let schedule = biweekly();
        let events = biweekly_events();
        let grid = project_for_grid(&schedule, &events, &Utc);

        let mut day = schedule.start_date;
        while day <= schedule.end_date {
            let cycle = schedule.cycle_index_of(day);
            let mut expected: Vec<&Event> = events
                .iter()
                .filter(|e| e.cycle_index == cycle && e.weekday(&Utc) == day.weekday())
                .collect();
            expected.sort_by_key(|e| e.start.time());

            assert_eq!(grid.events_on(day), expected, "mismatch on {}", day);
            day += Duration::days(1);
        }
    }

    #[test]
    fn non_periodic_schedule_uses_dates() {
        let schedule = Schedule::new("tt-2", date(2025, 9, 1), date(2025, 9, 30), None).unwrap();
        let events = vec![
            template("Exam", date(2025, 9, 10), 10, None),
            template("Retake", date(2025, 9, 24), 10, None),
        ];
        let grid = project_for_grid(&schedule, &events, &Utc);

        assert_eq!(names(&grid.events_on(date(2025, 9, 10))), vec!["Exam"]);
        assert!(grid.events_on(date(2025, 9, 17)).is_empty());
        assert_eq!(grid.cycle_index_of(date(2025, 9, 10)), None);
    }

    #[test]
    fn custom_one_off_in_periodic_schedule() {
        let mut events = biweekly_events();
        let mut consultation = template("Consultation", date(2025, 9, 8), 8, None);
        consultation.is_custom = true;
        events.push(consultation);

        let grid = project_for_grid(&biweekly(), &events, &Utc);

        assert_eq!(
            names(&grid.events_on(date(2025, 9, 8))),
            vec!["Consultation", "Physics"]
        );
        assert_eq!(names(&grid.events_on(date(2025, 9, 22))), vec!["Physics"]);
    }

    #[test]
    fn empty_schedule_projects_to_nothing() {
        let grid = project_for_grid(&biweekly(), &[], &Utc);
        assert!(grid.is_empty());
        assert!(grid.events_on(date(2025, 9, 1)).is_empty());
        assert!(project_for_list(&biweekly(), &[], &Utc, date(2025, 9, 1), 4).is_empty());
    }

    #[test]
    fn agenda_materializes_matching_weeks() {
        // Wednesday of week 2 (cycle 2)
        let agenda = project_for_list(&biweekly(), &biweekly_events(), &Utc, date(2025, 9, 10), 2);

        let listed: Vec<(NaiveDate, String)> = agenda
            .iter()
            .flat_map(|d| d.events().map(move |e| (d.date, e.name.clone())))
            .collect();

        assert_eq!(
            listed,
            vec![
                (date(2025, 9, 12), "Drawing".to_string()),
                (date(2025, 9, 15), "Algebra".to_string()),
                (date(2025, 9, 17), "History".to_string()),
            ]
        );
    }

    #[test]
    fn agenda_groups_parallel_sections() {
        let mut events = biweekly_events();
        events.push(template("Algebra (section B)", date(2025, 9, 1), 9, Some(1)));

        let agenda = project_for_list(&biweekly(), &events, &Utc, date(2025, 9, 1), 1);
        let monday = &agenda[0];

        assert_eq!(monday.date, date(2025, 9, 1));
        assert_eq!(monday.slots.len(), 1);
        assert_eq!(monday.slots[0].events.len(), 2);
        assert_eq!(monday.slots[0].start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn agenda_skips_hidden_and_stops_at_end_date() {
        let mut events = biweekly_events();
        events[0].is_hidden = true;

        let agenda = project_for_list(&biweekly(), &events, &Utc, date(2025, 12, 15), 4);

        assert!(agenda.iter().all(|d| d.date <= date(2025, 12, 28)));
        assert!(agenda.iter().flat_map(|d| d.events()).all(|e| e.name != "Algebra"));
        assert!(agenda.iter().any(|d| d.events().any(|e| e.name == "History")));
    }

    #[test]
    fn agenda_horizon_is_capped_by_end_date() {
        let schedule = biweekly();
        let events = biweekly_events();

        let capped = project_for_list(&schedule, &events, &Utc, date(2025, 9, 1), u32::MAX);
        let expected = project_for_list(&schedule, &events, &Utc, date(2025, 9, 1), 18);

        assert_eq!(capped, expected);
        assert_eq!(capped.last().map(|d| d.date), Some(date(2025, 12, 24)));
    }

    #[test]
    fn agenda_is_sorted_and_starts_at_reference() {
        let schedule = Schedule::new("tt-2", date(2025, 9, 1), date(2025, 9, 30), None).unwrap();
        let events = vec![
            template("Late", date(2025, 9, 20), 10, None),
            template("Early", date(2025, 9, 12), 10, None),
            template("Past", date(2025, 9, 2), 10, None),
        ];

        let agenda = project_for_list(&schedule, &events, &Utc, date(2025, 9, 10), 1);
        let dates: Vec<NaiveDate> = agenda.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2025, 9, 12), date(2025, 9, 20)]);
    }
}
