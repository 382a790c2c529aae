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

//! Cells of a timetable, and the heads and feet of its columns.

use crate::objects::{format_time, Note, StopTime, Time};
use chrono::Duration;
use std::fmt;

/// A stop time in a timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCell {
    /// The stop time, as found in the trip.
    pub stop_time: StopTime,
    /// Arrival, or departure when there is no arrival.
    pub arrival: Time,
    /// Departure, or arrival when there is no departure.
    pub departure: Time,
    /// Whether the vehicle waits at the stop.
    pub wait_time: bool,
    /// First stop of the trip.
    pub first: bool,
    /// Last stop of the trip.
    pub last: bool,
}

impl TimeCell {
    pub(crate) fn new(stop_time: &StopTime) -> Self {
        let arrival = stop_time.arrival.or(stop_time.departure).unwrap_or_else(Duration::zero);
        let departure = stop_time.departure.or(stop_time.arrival).unwrap_or_else(Duration::zero);
        TimeCell {
            stop_time: stop_time.clone(),
            arrival,
            departure,
            wait_time: stop_time.has_wait_time(),
            first: false,
            last: false,
        }
    }

    /// Departure as `HH:MM`.
    pub fn departure_time(&self) -> String {
        format_time(self.departure)
    }
}

impl fmt::Display for TimeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_time(self.arrival))
    }
}

/// Special cell spanning several columns and every row, replacing a run of
/// evenly spaced trips: "then every 5 minutes until".
#[derive(Debug, Clone, PartialEq)]
pub struct Repetition {
    /// Number of columns replaced.
    pub colspan: usize,
    /// Interval between the trips.
    pub duration: Duration,
    /// Visual height of the major rows, used to choose where lines may break.
    pub min_height: usize,
    /// Visual height of all the rows.
    pub rowspan: usize,
}

impl Repetition {
    pub(crate) fn new(colspan: usize, duration: Duration) -> Self {
        Repetition {
            colspan,
            duration,
            min_height: 0,
            rowspan: 0,
        }
    }
}

const NBSP: &str = "\u{A0}";

impl fmt::Display for Repetition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // seconds within a day
        let seconds = self.duration.num_seconds().rem_euclid(86_400);
        if seconds == 3600 {
            if self.min_height < 3 {
                return write!(f, "then{}hourly until", NBSP);
            }
            return write!(f, "then hourly until");
        }
        let duration = if seconds % 3600 == 0 {
            format!("{} hours", seconds / 3600)
        } else {
            format!("{} minutes", seconds / 60)
        };
        if self.min_height < 3 {
            write!(f, "then{0}every {1}{0}until", NBSP, duration.replace(' ', NBSP))
        } else if self.min_height < 4 {
            write!(f, "then every{}{} until", NBSP, duration.replace(' ', NBSP))
        } else {
            write!(f, "then every {} until", duration)
        }
    }
}

/// A cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The trip does not stop there.
    Empty,
    /// The trip stops there.
    Time(TimeCell),
    /// First row only: a run of trips is summarized.
    Repetition(Repetition),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Time(cell) => cell.fmt(f),
            Cell::Repetition(repetition) => repetition.fmt(f),
        }
    }
}

/// Heading over consecutive columns of the same service.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnHead {
    /// Identifier of the service.
    pub service: String,
    /// Number of columns.
    pub span: usize,
}

/// Footnote under consecutive columns sharing a note. A blank foot has no
/// notes.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFoot {
    /// Text of the note.
    pub notes: Option<String>,
    /// Number of columns.
    pub span: usize,
}

impl ColumnFoot {
    pub(crate) fn new(note: &Note) -> Self {
        ColumnFoot {
            notes: Some(note.text.clone()),
            span: 1,
        }
    }

    pub(crate) fn blank(span: usize) -> Self {
        ColumnFoot { notes: None, span }
    }
}
