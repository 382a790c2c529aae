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

//! Calendars of operating days, flattened from a service operating period
//! and an operating profile so that they can be stored and evaluated without
//! the TransXChange document.
//!
//! Calendars are stored in 2 files:
//! - `calendar.txt` with the days of the week and the validity period
//! - `calendar_dates.txt` with the date ranges of (non-)operation

use crate::{
    objects::{Date, DateRange},
    serde_utils::*,
    transxchange::{
        bank_holidays::{BankHoliday, BankHolidays},
        operating_profile::OperatingProfile,
    },
    Result,
};
use anyhow::Context;
use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};
use skip_error::skip_error_and_warn;
use std::{
    collections::{BTreeSet, HashMap},
    path,
};
use tracing::{info, warn};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// A range of dates during which a calendar does (or does not) operate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CalendarDate {
    /// Identifier of the calendar
    pub calendar_id: String,
    /// First day of the range
    #[serde(
        deserialize_with = "de_from_date_string",
        serialize_with = "ser_from_naive_date"
    )]
    pub start_date: Date,
    /// Last day of the range, open-ended when absent
    #[serde(
        default,
        deserialize_with = "de_option_date_string",
        serialize_with = "ser_option_naive_date"
    )]
    pub end_date: Option<Date>,
    /// Operates during the range, or not at all
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub operation: bool,
    /// Special days of operation win over the days of the week. A non
    /// special range of operation restricts the calendar to such ranges.
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub special: bool,
}

impl CalendarDate {
    pub(crate) fn contains(&self, date: Date) -> bool {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
        .contains(date)
    }
}

/// Structure to serialize/deserialize the file calendar.txt
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Calendar {
    /// Identifier of the calendar
    #[serde(rename = "calendar_id")]
    pub id: String,
    /// True if active on Mondays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub monday: bool,
    /// True if active on Tuesdays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub tuesday: bool,
    /// True if active on Wednesdays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub wednesday: bool,
    /// True if active on Thursdays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub thursday: bool,
    /// True if active on Fridays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub friday: bool,
    /// True if active on Saturdays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub saturday: bool,
    /// True if active on Sundays
    #[serde(deserialize_with = "de_from_u8", serialize_with = "ser_from_bool")]
    pub sunday: bool,
    /// Active starting from this date
    #[serde(
        deserialize_with = "de_from_date_string",
        serialize_with = "ser_from_naive_date"
    )]
    pub start_date: Date,
    /// Active until this date
    #[serde(
        default,
        deserialize_with = "de_option_date_string",
        serialize_with = "ser_option_naive_date"
    )]
    pub end_date: Option<Date>,
    /// Exceptions, stored in calendar_dates.txt
    #[serde(skip)]
    pub calendar_dates: Vec<CalendarDate>,
}

impl Calendar {
    /// Flatten an operating profile over an operating period. Bank holidays
    /// become single day ranges. Without a profile, every day of the period
    /// is allowed.
    pub fn from_operating_profile(
        id: &str,
        operating_period: DateRange,
        operating_profile: Option<&OperatingProfile>,
        bank_holidays: &BankHolidays,
    ) -> Self {
        let mut calendar = Calendar {
            id: id.to_string(),
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: true,
            start_date: operating_period.start,
            end_date: operating_period.end,
            calendar_dates: Vec::new(),
        };
        let profile = match operating_profile {
            Some(profile) => profile,
            None => return calendar,
        };
        for weekday in WEEKDAYS.iter() {
            *calendar.weekday_mut(*weekday) = profile.regular_days.contains(*weekday);
        }

        let mut push = |range: DateRange, operation: bool, special: bool| {
            calendar.calendar_dates.push(CalendarDate {
                calendar_id: id.to_string(),
                start_date: range.start,
                end_date: range.end,
                operation,
                special,
            })
        };
        let bank_holiday_dates = |holidays: &BTreeSet<BankHoliday>| -> Vec<DateRange> {
            let mut dates: Vec<Date> = Vec::new();
            for holiday in holidays {
                dates.extend(
                    bank_holidays
                        .dates(*holiday)
                        .filter(|date| operating_period.contains(*date)),
                );
            }
            dates.sort();
            dates.dedup();
            dates
                .into_iter()
                .map(|date| DateRange {
                    start: date,
                    end: Some(date),
                })
                .collect()
        };

        for range in &profile.operation_days {
            push(*range, true, true);
        }
        for range in bank_holiday_dates(&profile.operation_bank_holidays) {
            push(range, true, true);
        }
        for range in &profile.non_operation_days {
            push(*range, false, false);
        }
        for range in bank_holiday_dates(&profile.non_operation_bank_holidays) {
            push(range, false, false);
        }
        if let Some(day_type) = &profile.serviced_organisation_day_type {
            for range in day_type.non_operation_ranges() {
                push(range, false, false);
            }
            for range in day_type.operation_ranges() {
                push(range, true, false);
            }
        }
        calendar
    }

    fn weekday_mut(&mut self, weekday: Weekday) -> &mut bool {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }

    /// Whether the calendar is active on this day of the week.
    pub fn has_weekday(&self, weekday: Weekday) -> bool {
        match weekday {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }

    fn get_valid_days(&self) -> Vec<Weekday> {
        WEEKDAYS
            .iter()
            .copied()
            .filter(|weekday| self.has_weekday(*weekday))
            .collect()
    }

    /// Whether the calendar operates on `date`.
    pub fn allows(&self, date: Date) -> bool {
        if date < self.start_date || self.end_date.map_or(false, |end_date| end_date < date) {
            return false;
        }
        if self
            .calendar_dates
            .iter()
            .any(|calendar_date| calendar_date.special && calendar_date.operation && calendar_date.contains(date))
        {
            return true;
        }
        if self
            .calendar_dates
            .iter()
            .any(|calendar_date| !calendar_date.operation && calendar_date.contains(date))
        {
            return false;
        }
        if !self.has_weekday(date.weekday()) {
            return false;
        }
        let mut restrictions = self
            .calendar_dates
            .iter()
            .filter(|calendar_date| calendar_date.operation && !calendar_date.special)
            .peekable();
        restrictions.peek().is_none() || restrictions.any(|calendar_date| calendar_date.contains(date))
    }

    /// Days of the week in words: "Monday to Friday", "Saturdays and
    /// Sundays", "Mondays, Wednesdays and Fridays"...
    pub fn describe(&self) -> String {
        let days = self.get_valid_days();
        let plural = |weekday: &Weekday| format!("{}s", day_name(*weekday));
        match days.as_slice() {
            [] => String::new(),
            [day] => plural(day),
            _ if days.len() == 7 => String::from("Every day"),
            [first, .., last]
                if days.len() > 2
                    && last.num_days_from_monday() - first.num_days_from_monday()
                        == days.len() as u32 - 1 =>
            {
                format!("{} to {}", day_name(*first), day_name(*last))
            }
            [init @ .., last] => format!(
                "{} and {}",
                init.iter().map(plural).collect::<Vec<_>>().join(", "),
                plural(last)
            ),
        }
    }
}

impl Calendar {
    pub(crate) fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        for calendar_date in &mut self.calendar_dates {
            calendar_date.calendar_id = id.to_string();
        }
        self
    }
}

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Write calendar.txt and calendar_dates.txt into a directory
pub fn write_calendars(path: &path::Path, calendars: &[Calendar]) -> Result<()> {
    info!("Writing calendar.txt and calendar_dates.txt");
    let calendar_path = path.join("calendar.txt");
    let mut wtr = csv::Writer::from_path(&calendar_path)
        .with_context(|| format!("Error reading {:?}", calendar_path))?;
    for calendar in calendars {
        wtr.serialize(calendar)
            .with_context(|| format!("Error writing {:?}", calendar_path))?;
    }
    wtr.flush()
        .with_context(|| format!("Error writing {:?}", calendar_path))?;

    let calendar_dates_path = path.join("calendar_dates.txt");
    let mut wtr = csv::Writer::from_path(&calendar_dates_path)
        .with_context(|| format!("Error reading {:?}", calendar_dates_path))?;
    for calendar_date in calendars.iter().flat_map(|calendar| &calendar.calendar_dates) {
        wtr.serialize(calendar_date)
            .with_context(|| format!("Error writing {:?}", calendar_dates_path))?;
    }
    wtr.flush()
        .with_context(|| format!("Error writing {:?}", calendar_dates_path))?;
    Ok(())
}

/// Read calendar.txt and the optional calendar_dates.txt from a directory.
/// Calendar dates of unknown calendars are ignored.
pub fn read_calendars(path: &path::Path) -> Result<Vec<Calendar>> {
    info!("Reading calendar.txt");
    let calendar_path = path.join("calendar.txt");
    let mut calendars: Vec<Calendar> = Vec::new();
    let mut reader = csv::Reader::from_path(&calendar_path)
        .with_context(|| format!("Error reading {:?}", calendar_path))?;
    for calendar in reader.deserialize() {
        let calendar: Calendar =
            calendar.with_context(|| format!("Error reading {:?}", calendar_path))?;
        calendars.push(calendar);
    }
    let indexes: HashMap<String, usize> = calendars
        .iter()
        .enumerate()
        .map(|(index, calendar)| (calendar.id.clone(), index))
        .collect();

    let calendar_dates_path = path.join("calendar_dates.txt");
    if !calendar_dates_path.exists() {
        return Ok(calendars);
    }
    info!("Reading calendar_dates.txt");
    let mut reader = csv::Reader::from_path(&calendar_dates_path)
        .with_context(|| format!("Error reading {:?}", calendar_dates_path))?;
    for calendar_date in reader.deserialize() {
        let calendar_date: CalendarDate = skip_error_and_warn!(calendar_date
            .with_context(|| format!("Error reading {:?}", calendar_dates_path)));
        match indexes.get(&calendar_date.calendar_id) {
            Some(index) => calendars[*index].calendar_dates.push(calendar_date),
            None => warn!(
                "calendar_dates.txt references an unknown calendar '{}'",
                calendar_date.calendar_id
            ),
        }
    }
    Ok(calendars)
}
