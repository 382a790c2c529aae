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

//! Resolution of the arrival and departure times of a vehicle journey, from
//! the run times and wait times of its journey pattern and its own overrides.

use super::{
    journey_patterns::{JourneyPatternTimingLink, StopUsage},
    vehicle_journeys::{VehicleJourney, VehicleJourneyTimingLink},
};
use crate::objects::Time;
use chrono::Duration;
use std::{iter::Peekable, slice};

/// A stop visited by a journey.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell<'a> {
    /// The `From` of the timing link, or the `To` of the last one.
    pub stop_usage: &'a StopUsage,
    /// The timing link the stop belongs to.
    pub timing_link: &'a JourneyPatternTimingLink,
    /// Arrival, as time since midnight.
    pub arrival: Time,
    /// Departure, as time since midnight.
    pub departure: Time,
}

/// Iterator over the stops of a journey, see [`VehicleJourney::times`].
///
/// A journey with N timing links yields N + 1 cells, minus the stops in dead
/// runs. Times still accumulate during dead runs.
pub struct JourneyTimes<'a> {
    journey: &'a VehicleJourney,
    links: Box<dyn Iterator<Item = &'a JourneyPatternTimingLink> + 'a>,
    journey_links: Peekable<slice::Iter<'a, VehicleJourneyTimingLink>>,
    last_link: Option<&'a JourneyPatternTimingLink>,
    time: Time,
    wait_time: Option<Duration>,
    dead_run: bool,
    dead_run_next: bool,
    finished: bool,
}

fn is_some_and_nonzero(wait_time: Option<Duration>) -> Option<Duration> {
    wait_time.filter(|wait_time| *wait_time != Duration::zero())
}

impl<'a> JourneyTimes<'a> {
    pub(crate) fn new(journey: &'a VehicleJourney) -> Self {
        let links: Box<dyn Iterator<Item = &'a JourneyPatternTimingLink> + 'a> =
            match &journey.journey_pattern {
                Some(pattern) => Box::new(pattern.timing_links()),
                None => Box::new(std::iter::empty()),
            };
        JourneyTimes {
            journey,
            links,
            journey_links: journey.timing_links.iter().peekable(),
            last_link: None,
            time: journey.departure_time,
            wait_time: None,
            dead_run: journey.start_dead_run.is_some(),
            dead_run_next: false,
            finished: false,
        }
    }

    // Journey timing links are consumed in order, only when they match.
    fn journey_link(&mut self, link: &JourneyPatternTimingLink) -> Option<&'a VehicleJourneyTimingLink> {
        let matches = match (self.journey_links.peek(), &link.id) {
            (Some(journey_link), Some(id)) => journey_link.journey_pattern_timing_link_ref == *id,
            _ => false,
        };
        if matches {
            self.journey_links.next()
        } else {
            None
        }
    }

    fn is_link(reference: &Option<String>, link: &JourneyPatternTimingLink) -> bool {
        reference.is_some() && *reference == link.id
    }

    fn visit(&mut self, link: &'a JourneyPatternTimingLink) -> Option<Cell<'a>> {
        let journey_link = self.journey_link(link);
        self.last_link = Some(link);
        if self.dead_run && Self::is_link(&self.journey.start_dead_run, link) {
            self.dead_run = false;
        }

        let wait_time = match journey_link.and_then(|journey_link| journey_link.from_wait_time) {
            Some(wait_time) => Some(wait_time),
            None => is_some_and_nonzero(link.origin.wait_time).or(self.wait_time),
        };
        let arrival = self.time;
        if let Some(wait_time) = is_some_and_nonzero(wait_time) {
            self.time = self.time + wait_time;
        }
        let cell = if self.dead_run {
            None
        } else {
            Some(Cell {
                stop_usage: &link.origin,
                timing_link: link,
                arrival,
                departure: self.time,
            })
        };

        let run_time = journey_link
            .and_then(|journey_link| journey_link.run_time)
            .unwrap_or(link.run_time);
        self.time = self.time + run_time;

        if self.dead_run_next {
            self.dead_run = true;
            self.dead_run_next = false;
        } else if Self::is_link(&self.journey.end_dead_run, link) {
            self.dead_run_next = true;
        }

        self.wait_time = journey_link
            .and_then(|journey_link| journey_link.to_wait_time)
            .or(link.destination.wait_time);
        cell
    }
}

impl<'a> Iterator for JourneyTimes<'a> {
    type Item = Cell<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(link) = self.links.next() {
            if let Some(cell) = self.visit(link) {
                return Some(cell);
            }
        }
        if self.finished {
            return None;
        }
        self.finished = true;
        let link = self.last_link?;
        if self.dead_run {
            return None;
        }
        Some(Cell {
            stop_usage: &link.destination,
            timing_link: link,
            arrival: self.time,
            departure: self.time,
        })
    }
}
