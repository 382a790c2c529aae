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

//! One direction of a timetable: trips are columns, stops are rows.

use super::cells::{Cell, ColumnFoot, ColumnHead, Repetition, TimeCell};
use crate::objects::{Stop, StopDirectory, StopTime, TimingStatus, Trip};
use chrono::Duration;
use similar::{capture_diff_slices, Algorithm, DiffTag};
use std::{collections::HashSet, fmt};
use tracing::debug;

/// A stop, with a cell for every trip of the grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// The stop.
    pub stop: Stop,
    /// One cell per column.
    pub times: Vec<Cell>,
    /// Timing status of the stop time which created the row.
    pub timing_status: Option<TimingStatus>,
    /// Whether a trip waits at the stop.
    pub has_wait_times: bool,
}

impl Row {
    fn new(stop_time: &StopTime, width: usize) -> Self {
        let mut times = Vec::with_capacity(width + 1);
        times.resize(width, Cell::Empty);
        Row {
            stop: stop_time.stop.clone(),
            times,
            timing_status: stop_time.timing_status,
            has_wait_times: false,
        }
    }

    /// Minor stops may be hidden from the timetable.
    pub fn is_minor(&self) -> bool {
        self.timing_status.map_or(false, TimingStatus::is_minor)
    }

    // arrival and departure are displayed on 2 lines
    fn height(&self) -> usize {
        if self.has_wait_times {
            2
        } else {
            1
        }
    }
}

// Cursor over the rows while a trip is merged into them.
struct RowMerge {
    rows: Vec<Row>,
    // current row
    y: usize,
    // number of columns before the trip
    width: usize,
    first: bool,
    last: Option<usize>,
}

impl RowMerge {
    fn skip(&mut self, count: usize) {
        self.y += count;
    }

    fn insert(&mut self, stop_time: &StopTime) {
        let row = Row::new(stop_time, self.width);
        self.rows.insert(self.y, row);
        self.push(stop_time);
    }

    fn matched(&mut self, stop_time: &StopTime) {
        assert_eq!(self.rows[self.y].stop.atco_code, stop_time.get_key());
        self.push(stop_time);
    }

    fn push(&mut self, stop_time: &StopTime) {
        let mut cell = TimeCell::new(stop_time);
        cell.first = self.first;
        self.first = false;
        self.rows[self.y].times.push(Cell::Time(cell));
        self.last = Some(self.y);
        self.y += 1;
    }

    fn finish(mut self) -> Vec<Row> {
        if let Some(y) = self.last {
            if let Some(Cell::Time(cell)) = self.rows[y].times.last_mut() {
                cell.last = true;
            }
        }
        if self.width > 0 {
            for row in &mut self.rows {
                if row.times.len() == self.width {
                    row.times.push(Cell::Empty);
                }
            }
        }
        self.rows
    }
}

/// Whether two consecutive trips may be summarized by a repetition.
fn journey_patterns_match(trip_a: &Trip, trip_b: &Trip) -> bool {
    match (&trip_a.journey_pattern, &trip_b.journey_pattern) {
        (Some(pattern_a), Some(pattern_b)) => {
            !pattern_a.is_empty()
                && pattern_a == pattern_b
                && trip_a.destination == trip_b.destination
                && trip_a.duration() == trip_b.duration()
        }
        _ => false,
    }
}

/// Replace the `in_a_row + 1` columns before the last one of a run ending
/// just before column `i` with a repetition. Only hourly intervals and
/// intervals up to 30 minutes are summarized.
fn abbreviate(rows: &mut [Vec<Option<Cell>>], i: usize, in_a_row: usize, difference: Option<Duration>) {
    let difference = match difference {
        Some(difference) => difference,
        None => return,
    };
    let seconds = difference.num_seconds();
    if seconds == 0 || (seconds != 3600 && seconds > 1800) {
        return;
    }
    let (first_row, other_rows) = match rows.split_first_mut() {
        Some(split) => split,
        None => return,
    };
    let start = i - in_a_row - 2;
    first_row[start] = Some(Cell::Repetition(Repetition::new(in_a_row + 1, difference)));
    for cell in &mut first_row[start + 1..i - 1] {
        *cell = None;
    }
    for row in other_rows {
        for cell in &mut row[start..i - 1] {
            *cell = None;
        }
    }
}

fn span_sum(heads: &[ColumnHead]) -> usize {
    heads.iter().map(|head| head.span).sum()
}

/// Trips of one direction, merged into rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    /// Direction of the trips.
    pub inbound: bool,
    /// Trips, in column order.
    pub trips: Vec<Trip>,
    /// Rows, in stop order.
    pub rows: Vec<Row>,
    /// Spans of columns of the same service.
    pub heads: Vec<ColumnHead>,
    /// Spans of columns for each note id, in order of appearance.
    pub column_feet: Vec<(String, Vec<ColumnFoot>)>,
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inbound {
            write!(f, "Inbound")
        } else {
            write!(f, "Outbound")
        }
    }
}

impl Grouping {
    /// Sort the trips, merge them into rows, then compute column heads,
    /// feet and repetitions. Trips without stop times are left out.
    pub fn build(inbound: bool, mut trips: Vec<Trip>) -> Self {
        trips.retain(|trip| {
            if trip.stop_times.is_empty() {
                debug!("Trip '{}' has no stop time", trip.id);
                return false;
            }
            true
        });
        trips.sort_by(|a, b| (a.start, a.end, &a.id).cmp(&(b.start, b.end, &b.id)));
        let mut grouping = Grouping {
            inbound,
            ..Default::default()
        };
        for trip in &trips {
            grouping.handle_trip(trip);
        }
        grouping.trips = trips;
        for row in &mut grouping.rows {
            row.has_wait_times = row
                .times
                .iter()
                .any(|cell| matches!(cell, Cell::Time(cell) if cell.wait_time));
        }
        grouping.do_heads_and_feet();
        grouping
    }

    /// First departure, used to order the groupings of a timetable.
    pub fn get_order(&self) -> Option<Duration> {
        self.trips.first().map(|trip| trip.start)
    }

    /// Whether some rows are minor stops.
    pub fn has_minor_stops(&self) -> bool {
        self.rows.iter().any(Row::is_minor)
    }

    /// Visual height of all the rows.
    pub fn rowspan(&self) -> usize {
        self.rows.iter().map(Row::height).sum()
    }

    /// Visual height of the rows which are not minor stops.
    pub fn min_height(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| !row.is_minor())
            .map(Row::height)
            .sum()
    }

    /// Merge the stop times of a trip as a new column. Stops are aligned
    /// with the existing rows using a diff of the stop sequences; stops
    /// unknown so far become new rows at their place.
    pub fn handle_trip(&mut self, trip: &Trip) {
        let rows = std::mem::take(&mut self.rows);
        let width = rows.first().map_or(0, |row| row.times.len());
        let ops = {
            let previous: Vec<&str> = rows.iter().map(|row| row.stop.atco_code.as_str()).collect();
            let current: Vec<&str> = trip.stop_times.iter().map(StopTime::get_key).collect();
            capture_diff_slices(Algorithm::Myers, &previous, &current)
        };
        let mut merge = RowMerge {
            rows,
            y: 0,
            width,
            first: true,
            last: None,
        };
        for op in ops {
            let (tag, old_range, new_range) = op.as_tag_tuple();
            match tag {
                DiffTag::Equal => {
                    for stop_time in &trip.stop_times[new_range] {
                        merge.matched(stop_time);
                    }
                }
                DiffTag::Delete => merge.skip(old_range.len()),
                DiffTag::Insert => {
                    for stop_time in &trip.stop_times[new_range] {
                        merge.insert(stop_time);
                    }
                }
                DiffTag::Replace => {
                    merge.skip(old_range.len());
                    for stop_time in &trip.stop_times[new_range] {
                        merge.insert(stop_time);
                    }
                }
            }
        }
        self.rows = merge.finish();
    }

    /// Compute the column heads (one per run of trips of the same service),
    /// the column feet (one per run of trips sharing a note) and summarize
    /// runs of evenly spaced trips with a [`Repetition`].
    pub fn do_heads_and_feet(&mut self) {
        let mut rows: Vec<Vec<Option<Cell>>> = self
            .rows
            .iter_mut()
            .map(|row| std::mem::take(&mut row.times).into_iter().map(Some).collect())
            .collect();
        let mut heads: Vec<ColumnHead> = Vec::new();
        let mut column_feet: Vec<(String, Vec<ColumnFoot>)> = Vec::new();
        let mut previous: Option<(&Trip, HashSet<&str>)> = None;
        let mut in_a_row = 0;
        let mut prev_difference: Option<Duration> = None;

        for (i, trip) in self.trips.iter().enumerate() {
            let mut difference = None;
            let note_ids: HashSet<&str> = trip.notes.iter().map(|note| note.id.as_str()).collect();
            for note in &trip.notes {
                match column_feet.iter_mut().find(|(id, _)| *id == note.id) {
                    Some((_, feet)) => {
                        let continued = previous
                            .as_ref()
                            .map_or(false, |(_, previous_ids)| previous_ids.contains(note.id.as_str()));
                        match feet.last_mut() {
                            Some(foot) if continued => foot.span += 1,
                            _ => feet.push(ColumnFoot::new(note)),
                        }
                    }
                    None if i > 0 => column_feet.push((
                        note.id.clone(),
                        vec![ColumnFoot::blank(i), ColumnFoot::new(note)],
                    )),
                    None => column_feet.push((note.id.clone(), vec![ColumnFoot::new(note)])),
                }
            }
            for (id, feet) in &mut column_feet {
                if note_ids.contains(id.as_str()) {
                    continue;
                }
                match feet.last_mut() {
                    Some(foot) if foot.notes.is_none() => foot.span += 1,
                    _ => feet.push(ColumnFoot::blank(1)),
                }
            }

            if let Some((previous_trip, previous_ids)) = &previous {
                if previous_trip.service != trip.service {
                    heads.push(ColumnHead {
                        service: previous_trip.service.clone(),
                        span: i - span_sum(&heads),
                    });
                }
                if *previous_ids != note_ids {
                    if in_a_row > 1 {
                        abbreviate(&mut rows, i, in_a_row - 1, prev_difference);
                    }
                    in_a_row = 0;
                } else if journey_patterns_match(previous_trip, trip) {
                    let current = trip.start - previous_trip.start;
                    if Some(current) == prev_difference {
                        in_a_row += 1;
                    } else {
                        if in_a_row > 1 {
                            abbreviate(&mut rows, i, in_a_row - 1, prev_difference);
                        }
                        in_a_row = 0;
                    }
                    difference = Some(current);
                } else {
                    if in_a_row > 1 {
                        abbreviate(&mut rows, i, in_a_row - 1, prev_difference);
                    }
                    in_a_row = 0;
                }
            }

            prev_difference = difference;
            previous = Some((trip, note_ids));
        }

        if let Some((previous_trip, _)) = &previous {
            heads.push(ColumnHead {
                service: previous_trip.service.clone(),
                span: self.trips.len() - span_sum(&heads),
            });
        }
        if in_a_row > 1 {
            abbreviate(&mut rows, self.trips.len(), in_a_row - 1, prev_difference);
        }

        for (row, times) in self.rows.iter_mut().zip(rows) {
            row.times = times.into_iter().flatten().collect();
        }
        self.heads = heads;
        self.column_feet = column_feet;
    }

    /// Replace the stops of the rows with the ones of the directory and drop
    /// the rows of stops permanently suspended for a service of the
    /// grouping. Repetitions are then sized to the remaining rows.
    pub fn apply_stops<D>(&mut self, stops: &D)
    where
        D: StopDirectory + ?Sized,
    {
        for row in &mut self.rows {
            if let Some(stop) = stops.get_stop(&row.stop.atco_code) {
                row.stop = stop.clone();
            }
        }
        let services: HashSet<&str> = self.trips.iter().map(|trip| trip.service.as_str()).collect();
        self.rows.retain(|row| {
            !services
                .iter()
                .any(|service| stops.is_permanently_suspended(&row.stop.atco_code, service))
        });
        let min_height = self.min_height();
        let rowspan = self.rowspan();
        if let Some(row) = self.rows.first_mut() {
            for cell in &mut row.times {
                if let Cell::Repetition(repetition) = cell {
                    repetition.min_height = min_height;
                    repetition.rowspan = rowspan;
                }
            }
        }
    }
}
