// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Timetables: the trips running on a date, as one [`Grouping`] per
//! direction.

pub mod cells;
pub mod grouping;

pub use self::{
    cells::{Cell, ColumnFoot, ColumnHead, Repetition, TimeCell},
    grouping::{Grouping, Row},
};
use crate::{
    calendars::Calendar,
    objects::{Activity, Date, StopDirectory, StopTime, Trip},
};
use chrono::Duration;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::collections::HashSet;
use tracing::debug;

/// Number of days offered after the first date of operation.
const DATE_OPTIONS_DAYS: i64 = 21;

/// Trips of one or several services, selected for a date.
#[derive(Debug, Clone, PartialEq)]
pub struct Timetable {
    /// Calendars of the trips.
    pub calendars: Vec<Calendar>,
    /// End dates of the services, `None` when open-ended.
    pub end_dates: Vec<Option<Date>>,
    /// Date of the timetable, absent when `calendar` describes it.
    pub date: Option<Date>,
    /// The only calendar, when it can be described in words and the
    /// timetable covers all of its days.
    pub calendar: Option<Calendar>,
    /// First day of `calendar`, when in the future.
    pub start_date: Option<Date>,
    /// Outbound and inbound groupings, the one departing first first.
    pub groupings: Vec<Grouping>,
}

impl Timetable {
    /// Select the trips running on `date` and merge them into groupings.
    ///
    /// Without `date`, a single calendar with only days of the week gives a
    /// timetable of all its trips; otherwise the first of the
    /// [`date_options`](Timetable::date_options) is used. Trips without a
    /// calendar never run.
    pub fn new(
        trips: Vec<Trip>,
        calendars: Vec<Calendar>,
        end_dates: Vec<Option<Date>>,
        date: Option<Date>,
        today: Date,
    ) -> Self {
        let calendar_ids: HashSet<&str> = trips.iter().filter_map(|trip| trip.calendar.as_deref()).collect();
        let calendars: Vec<Calendar> = calendars
            .into_iter()
            .filter(|calendar| calendar_ids.contains(calendar.id.as_str()))
            .collect();
        let mut timetable = Timetable {
            calendars,
            end_dates,
            date,
            calendar: None,
            start_date: None,
            groupings: vec![Grouping::build(false, Vec::new()), Grouping::build(true, Vec::new())],
        };
        if trips.is_empty() {
            return timetable;
        }

        if timetable.date.is_none() {
            if let [calendar] = timetable.calendars.as_slice() {
                if calendar.calendar_dates.is_empty() && !calendar.describe().is_empty() {
                    if calendar.start_date > today {
                        timetable.start_date = Some(calendar.start_date);
                    }
                    timetable.calendar = Some(calendar.clone());
                }
            }
        }
        if timetable.calendar.is_none() && timetable.date.is_none() {
            timetable.date = timetable.date_options(today).into_iter().next();
            if timetable.date.is_none() {
                debug!("No date of operation for the timetable");
                return timetable;
            }
        }

        let (inbound, outbound): (Vec<Trip>, Vec<Trip>) = trips
            .into_iter()
            .filter(|trip| timetable.runs(trip))
            .partition(|trip| trip.inbound);
        let mut groupings = vec![Grouping::build(false, outbound), Grouping::build(true, inbound)];
        if groupings.iter().all(|grouping| !grouping.trips.is_empty()) {
            groupings.sort_by_key(Grouping::get_order);
        }
        timetable.groupings = groupings;
        timetable
    }

    fn runs(&self, trip: &Trip) -> bool {
        let calendar_id = match trip.calendar.as_deref() {
            Some(calendar_id) => calendar_id,
            None => return false,
        };
        if let Some(calendar) = &self.calendar {
            return calendar.id == calendar_id;
        }
        match self.date {
            Some(date) => self
                .calendars
                .iter()
                .any(|calendar| calendar.id == calendar_id && calendar.allows(date)),
            None => false,
        }
    }

    /// Dates a timetable can be shown for: the days any calendar allows,
    /// over 21 days from the first date of operation (or `today` if later),
    /// cut at the last service end date. The date of the timetable is
    /// always offered.
    pub fn date_options(&self, today: Date) -> Vec<Date> {
        let start_dates = self.calendars.iter().filter_map(|calendar| {
            let suspension = calendar
                .calendar_dates
                .iter()
                .find(|calendar_date| !calendar_date.operation && calendar_date.contains(today));
            match suspension {
                Some(calendar_date) => calendar_date.end_date,
                None => Some(calendar.start_date),
            }
        });
        let mut date = match start_dates.min() {
            Some(start_date) => today.max(start_date),
            None => today,
        };
        let mut end_date = date + Duration::days(DATE_OPTIONS_DAYS);
        if !self.end_dates.is_empty() {
            if let Some(ends) = self.end_dates.iter().copied().collect::<Option<Vec<Date>>>() {
                if let Some(last) = ends.into_iter().max() {
                    end_date = end_date.min(last);
                }
            }
        }

        let mut options = Vec::new();
        if let Some(own_date) = self.date.filter(|own_date| *own_date < date) {
            options.push(own_date);
        }
        while date <= end_date {
            if self.calendars.iter().any(|calendar| calendar.allows(date)) {
                options.push(date);
            }
            date += Duration::days(1);
        }
        if let Some(own_date) = self.date.filter(|own_date| *own_date > end_date) {
            options.push(own_date);
        }
        options
    }

    /// Whether some trip only sets down passengers at a stop before its
    /// last one.
    pub fn has_set_down_only(&self) -> bool {
        self.groupings
            .iter()
            .flat_map(|grouping| &grouping.rows)
            .flat_map(|row| &row.times)
            .any(|cell| match cell {
                Cell::Time(cell) => !cell.last && cell.stop_time.activity == Some(Activity::SetDown),
                _ => false,
            })
    }

    /// See [`Grouping::apply_stops`].
    pub fn apply_stops<D>(&mut self, stops: &D)
    where
        D: StopDirectory + ?Sized,
    {
        for grouping in &mut self.groupings {
            grouping.apply_stops(stops);
        }
    }
}

/// Every stop used by the trips, outbound then inbound, in an order
/// consistent with all the trips of the direction.
pub fn stop_usages(trips: &[Trip]) -> [Vec<StopTime>; 2] {
    let mut groupings: [Vec<StopTime>; 2] = Default::default();
    for trip in trips {
        let grouping = &mut groupings[if trip.inbound { 1 } else { 0 }];
        let ops = {
            let previous: Vec<&str> = grouping.iter().map(StopTime::get_key).collect();
            let current: Vec<&str> = trip.stop_times.iter().map(StopTime::get_key).collect();
            capture_diff_slices(Algorithm::Myers, &previous, &current)
        };
        let mut y = 0;
        for op in ops {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            if tag != DiffTag::Insert {
                y += old_range.len();
            }
            if tag == DiffTag::Insert || tag == DiffTag::Replace {
                for stop_time in &trip.stop_times[new_range] {
                    grouping.insert(y, stop_time.clone());
                    y += 1;
                }
            }
        }
    }
    groupings
}

/// The distinct sequences of stops of the trips, in order of appearance.
pub fn journey_patterns(trips: &[Trip]) -> Vec<Vec<String>> {
    let mut seen = HashSet::new();
    let mut patterns = Vec::new();
    for trip in trips {
        let pattern: Vec<String> = trip
            .stop_times
            .iter()
            .map(|stop_time| stop_time.get_key().to_string())
            .collect();
        if seen.insert(pattern.clone()) {
            patterns.push(pattern);
        }
    }
    patterns
}
