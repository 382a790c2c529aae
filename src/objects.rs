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

//! Objects shared by the TransXChange reader, the calendars and the
//! timetables. `Trip` and `StopTime` do not depend on the source format.

use crate::Result;
use anyhow::{anyhow, bail, Context};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

/// Calendar date, without any time zone.
pub type Date = chrono::NaiveDate;

/// A time of day expressed as the duration since midnight. Can exceed 24
/// hours for journeys running after midnight.
pub type Time = Duration;

/// A stop, identified by its ATCO code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// ATCO code of the stop (or the only known reference).
    pub atco_code: String,
    /// Name of the stop.
    pub common_name: Option<String>,
    /// Name of the locality the stop is in.
    pub locality: Option<String>,
}

impl Stop {
    /// A stop known only by its reference.
    pub fn placeholder<S: Into<String>>(atco_code: S) -> Self {
        Stop {
            atco_code: atco_code.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let common_name = self.common_name.as_deref().unwrap_or_default();
        match self.locality.as_deref() {
            Some(locality) if !locality.is_empty() && !common_name.contains(locality) => {
                write!(f, "{} {}", locality, common_name)
            }
            _ if !common_name.is_empty() => write!(f, "{}", common_name),
            _ => write!(f, "{}", self.atco_code),
        }
    }
}

/// Stops known outside of the timetable data, by ATCO code.
pub trait StopDirectory {
    /// The stop, if it exists.
    fn get_stop(&self, atco_code: &str) -> Option<&Stop>;

    /// Whether the stop is withdrawn for good from the service.
    fn is_permanently_suspended(&self, _atco_code: &str, _service: &str) -> bool {
        false
    }

    /// Whether the stop exists.
    fn contains_stop(&self, atco_code: &str) -> bool {
        self.get_stop(atco_code).is_some()
    }
}

impl StopDirectory for HashMap<String, Stop> {
    fn get_stop(&self, atco_code: &str) -> Option<&Stop> {
        self.get(atco_code)
    }
}

/// What passengers may do at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activity {
    /// Passengers may board only.
    PickUp,
    /// Passengers may alight only.
    SetDown,
    /// Passengers may board and alight.
    PickUpAndSetDown,
    /// The vehicle does not stop.
    Pass,
}

impl FromStr for Activity {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<Self> {
        use Activity::*;
        match s {
            "pickUp" => Ok(PickUp),
            "setDown" => Ok(SetDown),
            "pickUpAndSetDown" => Ok(PickUpAndSetDown),
            "pass" => Ok(Pass),
            _ => bail!("Failed to convert '{}' into an Activity", s),
        }
    }
}

/// Whether a stop is a timing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingStatus {
    /// Principal timing point (`PTP`).
    PrincipalTimingPoint,
    /// Time info point (`TIP`).
    TimeInfoPoint,
    /// Principal point (`PPT`).
    PrincipalPoint,
    /// Other point (`OTH`).
    OtherPoint,
}

impl TimingStatus {
    /// Minor stops are not timing points and may be hidden by renderers.
    pub fn is_minor(self) -> bool {
        matches!(self, TimingStatus::TimeInfoPoint | TimingStatus::OtherPoint)
    }
}

impl FromStr for TimingStatus {
    type Err = crate::Error;
    fn from_str(s: &str) -> Result<Self> {
        use TimingStatus::*;
        match s {
            "PTP" | "principalTimingPoint" => Ok(PrincipalTimingPoint),
            "TIP" | "timeInfoPoint" => Ok(TimeInfoPoint),
            "PPT" | "principalPoint" => Ok(PrincipalPoint),
            "OTH" | "otherPoint" => Ok(OtherPoint),
            _ => bail!("Failed to convert '{}' into a TimingStatus", s),
        }
    }
}

/// An inclusive range of dates, open-ended when `end` is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// First day of the range.
    pub start: Date,
    /// Last day of the range.
    pub end: Option<Date>,
}

impl DateRange {
    /// Whether `date` is between `start` and `end` (both included).
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && self.end.map_or(true, |end| date <= end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start.format("%-d %B %Y")),
            Some(end) => write!(f, "{} to {}", self.start, end),
            None => write!(f, "from {}", self.start),
        }
    }
}

/// A note attached to a trip, rendered as a footnote of a timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier.
    pub id: String,
    /// Short code, usually a letter.
    pub code: String,
    /// Text of the note.
    pub text: String,
}

/// A stop visited by a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    /// The stop.
    pub stop: Stop,
    /// Position of the stop in the trip.
    pub sequence: u32,
    /// Arrival, as time since midnight. Absent at the first stop.
    pub arrival: Option<Time>,
    /// Departure, as time since midnight. Absent at the last stop.
    pub departure: Option<Time>,
    /// What passengers can do.
    pub activity: Option<Activity>,
    /// Timing status of the stop.
    pub timing_status: Option<TimingStatus>,
}

impl StopTime {
    /// Key used to align stop times of different trips on the same row.
    pub fn get_key(&self) -> &str {
        &self.stop.atco_code
    }

    /// Whether arrival and departure differ.
    pub fn has_wait_time(&self) -> bool {
        matches!((self.arrival, self.departure), (Some(arrival), Some(departure)) if arrival != departure)
    }
}

/// A scheduled trip, independent of the source format.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// Identifier of the trip.
    pub id: String,
    /// Identifier of the service the trip belongs to.
    pub service: String,
    /// Identifier of the calendar of the trip.
    pub calendar: Option<String>,
    /// Identifier of the journey pattern the trip follows.
    pub journey_pattern: Option<String>,
    /// ATCO code of the last stop.
    pub destination: Option<String>,
    /// Whether the trip runs in the inbound direction.
    pub inbound: bool,
    /// Departure from the first stop.
    pub start: Time,
    /// Arrival at the last stop.
    pub end: Time,
    /// Block number of the vehicle working.
    pub block: Option<String>,
    /// Ticket machine journey code.
    pub ticket_machine_code: Option<String>,
    /// Footnotes.
    pub notes: Vec<Note>,
    /// Ordered stop times.
    pub stop_times: Vec<StopTime>,
}

impl Trip {
    /// Duration between departure from the first stop and arrival at the
    /// last one.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Parse a duration as found in TransXChange files: ISO 8601 (`PT1H30M`,
/// `P1DT2S`, `-PT5M`) or clock-like (`01:30:00`).
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let duration = if let Some(iso) = unsigned.strip_prefix('P') {
        parse_iso_duration(iso)
    } else {
        parse_clock_duration(unsigned)
    }
    .with_context(|| format!("Failed to parse '{}' as a duration", text))?;
    Ok(if negative { -duration } else { duration })
}

fn parse_iso_duration(text: &str) -> Result<Duration> {
    let mut milliseconds = 0f64;
    let mut number = String::new();
    let mut in_time = false;
    let mut has_component = false;
    for c in text.chars() {
        match c {
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            'T' if !in_time && number.is_empty() => in_time = true,
            designator => {
                let value: f64 = number
                    .parse()
                    .map_err(|_| anyhow!("missing number before '{}'", designator))?;
                let unit = match (in_time, designator) {
                    (false, 'W') => 7.0 * 86_400.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => bail!("unsupported designator '{}'", designator),
                };
                milliseconds += value * unit * 1_000.0;
                number.clear();
                has_component = true;
            }
        }
    }
    if !number.is_empty() || !has_component {
        bail!("incomplete duration");
    }
    Ok(Duration::milliseconds(milliseconds.round() as i64))
}

fn parse_clock_duration(text: &str) -> Result<Duration> {
    let parts = text
        .split(':')
        .map(|part| part.parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [hours, minutes, seconds] => Ok(Duration::seconds(hours * 3600 + minutes * 60 + seconds)),
        [minutes, seconds] => Ok(Duration::seconds(minutes * 60 + seconds)),
        [seconds] => Ok(Duration::seconds(*seconds)),
        _ => bail!("too many ':' separators"),
    }
}

/// Format a time of day as `HH:MM`, dropping any whole day (`24:15` is
/// rendered `00:15`).
pub fn format_time(time: Time) -> String {
    let minutes = time.num_minutes().rem_euclid(24 * 60);
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_duration {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn iso_minutes() {
            assert_eq!(Duration::minutes(5), parse_duration("PT5M").unwrap());
        }

        #[test]
        fn iso_full() {
            let duration = parse_duration("P1DT1H2M3S").unwrap();
            assert_eq!(Duration::seconds(86_400 + 3_600 + 120 + 3), duration);
        }

        #[test]
        fn iso_zero() {
            assert_eq!(Duration::zero(), parse_duration("PT0S").unwrap());
        }

        #[test]
        fn iso_fraction() {
            assert_eq!(
                Duration::milliseconds(1_500),
                parse_duration("PT1.5S").unwrap()
            );
        }

        #[test]
        fn negative() {
            assert_eq!(Duration::minutes(-5), parse_duration("-PT5M").unwrap());
        }

        #[test]
        fn clock() {
            assert_eq!(
                Duration::seconds(3_600 + 30 * 60),
                parse_duration("01:30:00").unwrap()
            );
        }

        #[test]
        #[should_panic(expected = "Failed to parse 'PT' as a duration")]
        fn incomplete() {
            parse_duration("PT").unwrap();
        }

        #[test]
        #[should_panic(expected = "Failed to parse 'P5M' as a duration")]
        fn months_are_not_supported() {
            parse_duration("P5M").unwrap();
        }
    }

    mod date_range {
        use super::*;

        fn date(y: i32, m: u32, d: u32) -> Date {
            Date::from_ymd_opt(y, m, d).unwrap()
        }

        #[test]
        fn bounded() {
            let range = DateRange {
                start: date(2020, 1, 1),
                end: Some(date(2020, 1, 31)),
            };
            assert!(!range.contains(date(2019, 12, 31)));
            assert!(range.contains(date(2020, 1, 1)));
            assert!(range.contains(date(2020, 1, 31)));
            assert!(!range.contains(date(2020, 2, 1)));
        }

        #[test]
        fn open_ended() {
            let range = DateRange {
                start: date(2020, 1, 1),
                end: None,
            };
            assert!(!range.contains(date(2019, 12, 31)));
            assert!(range.contains(date(2120, 1, 1)));
        }
    }

    mod stop {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn locality_prefix() {
            let stop = Stop {
                atco_code: String::from("2900W0321"),
                common_name: Some(String::from("Lion Store")),
                locality: Some(String::from("Walpole St Peter")),
            };
            assert_eq!("Walpole St Peter Lion Store", stop.to_string());
        }

        #[test]
        fn locality_in_name() {
            let stop = Stop {
                atco_code: String::from("2900K132"),
                common_name: Some(String::from("King's Lynn Bus Station")),
                locality: Some(String::from("King's Lynn")),
            };
            assert_eq!("King's Lynn Bus Station", stop.to_string());
        }

        #[test]
        fn placeholder() {
            assert_eq!("2900K132", Stop::placeholder("2900K132").to_string());
        }
    }

    #[test]
    fn format_time_after_midnight() {
        use pretty_assertions::assert_eq;
        assert_eq!("09:05", format_time(Duration::minutes(9 * 60 + 5)));
        assert_eq!("00:15", format_time(Duration::minutes(24 * 60 + 15)));
    }
}
