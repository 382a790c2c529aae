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

//! Days on which a service or a vehicle journey operates.

use super::{
    bank_holidays::{BankHoliday, BankHolidays},
    serviced_organisations::{ServicedOrganisation, ServicedOrganisations},
};
use crate::{
    configuration::NegatedDays,
    minidom_utils::ChildText,
    objects::{Date, DateRange},
    Result,
};
use anyhow::{anyhow, Context};
use chrono::{Datelike, Weekday};
use minidom::Element;
use std::{
    collections::{BTreeSet, HashSet},
    rc::Rc,
};
use tracing::warn;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Parse a date, ignoring any time part (`2020-06-01T00:00:00`).
pub(crate) fn parse_date(text: &str) -> Result<Date> {
    let text = text.trim();
    let date = text.get(..10).unwrap_or(text);
    date.parse()
        .with_context(|| format!("Failed to parse '{}' as a date", text))
}

/// Parse an element with a mandatory `StartDate` and an optional, possibly
/// empty, `EndDate`.
pub(crate) fn parse_date_range(element: &Element) -> Result<DateRange> {
    let start = parse_date(&element.try_find_text("StartDate")?)?;
    let end = element
        .find_non_empty_text("EndDate")
        .map(|end| parse_date(&end))
        .transpose()?;
    Ok(DateRange { start, end })
}

/// Days of the week in the `RegularDayType` of a profile.
#[derive(Debug, Clone, PartialEq)]
pub enum RegularDays {
    /// No `DaysOfWeek`, or an empty one: every day of the week.
    Unspecified,
    /// Exactly these days. Empty for `HolidaysOnly` profiles.
    Days(HashSet<Weekday>),
}

impl Default for RegularDays {
    fn default() -> Self {
        RegularDays::Unspecified
    }
}

impl RegularDays {
    /// Whether the profile runs on this day of the week.
    pub fn contains(&self, weekday: Weekday) -> bool {
        match self {
            RegularDays::Unspecified => true,
            RegularDays::Days(days) => days.contains(&weekday),
        }
    }

    fn from_days_of_week(days_of_week: &Element, negated_days: NegatedDays) -> Self {
        if days_of_week.children().next().is_none() {
            return RegularDays::Unspecified;
        }
        let mut regular_days = HashSet::new();
        for element in days_of_week.children() {
            let tag = element.name();
            if let Some(weekday) = weekday_from_name(tag) {
                regular_days.insert(weekday);
            } else if tag == "Weekend" {
                regular_days.extend(&[Weekday::Sat, Weekday::Sun]);
            } else if let Some(negated) = tag.strip_prefix("Not").and_then(weekday_from_name) {
                match negated_days {
                    NegatedDays::Lenient => warn!("Tag '{}' in DaysOfWeek is ignored", tag),
                    NegatedDays::Strict => {
                        regular_days.extend(WEEK.iter().filter(|weekday| **weekday != negated))
                    }
                }
            } else if let Some(days) = weekday_range(tag) {
                regular_days.extend(days);
            } else {
                warn!("Tag '{}' is not a valid tag for DaysOfWeek", tag);
            }
        }
        RegularDays::Days(regular_days)
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    use chrono::Weekday::*;
    match name {
        "Monday" => Some(Mon),
        "Tuesday" => Some(Tue),
        "Wednesday" => Some(Wed),
        "Thursday" => Some(Thu),
        "Friday" => Some(Fri),
        "Saturday" => Some(Sat),
        "Sunday" => Some(Sun),
        _ => None,
    }
}

// `MondayToFriday`, `SaturdayToMonday`...
fn weekday_range(tag: &str) -> Option<Vec<Weekday>> {
    let index = tag.find("To")?;
    let first = weekday_from_name(&tag[..index])?;
    let last = weekday_from_name(&tag[index + 2..])?;
    let mut days = vec![first];
    let mut day = first;
    while day != last {
        day = day.succ();
        days.push(day);
    }
    Some(days)
}

/// Serviced organisations whose working days or holidays include or exclude
/// days of operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicedOrganisationDayType {
    /// Runs during the working days of this organisation.
    pub operation_working_days: Option<Rc<ServicedOrganisation>>,
    /// Runs during the holidays of this organisation.
    pub operation_holidays: Option<Rc<ServicedOrganisation>>,
    /// Does not run during the working days of this organisation.
    pub non_operation_working_days: Option<Rc<ServicedOrganisation>>,
    /// Does not run during the holidays of this organisation.
    pub non_operation_holidays: Option<Rc<ServicedOrganisation>>,
}

impl ServicedOrganisationDayType {
    fn from_element(
        element: &Element,
        serviced_organisations: &ServicedOrganisations,
    ) -> Result<Self> {
        let organisation = |path: &str| -> Result<Option<Rc<ServicedOrganisation>>> {
            element
                .find_text(path)
                .map(|code| {
                    serviced_organisations.get(&code).cloned().ok_or_else(|| {
                        anyhow!("ServicedOrganisation '{}' referenced by '{}' is unknown", code, path)
                    })
                })
                .transpose()
        };
        Ok(ServicedOrganisationDayType {
            operation_working_days: organisation(
                "DaysOfOperation/WorkingDays/ServicedOrganisationRef",
            )?,
            operation_holidays: organisation("DaysOfOperation/Holidays/ServicedOrganisationRef")?,
            non_operation_working_days: organisation(
                "DaysOfNonOperation/WorkingDays/ServicedOrganisationRef",
            )?,
            non_operation_holidays: organisation(
                "DaysOfNonOperation/Holidays/ServicedOrganisationRef",
            )?,
        })
    }

    /// Periods of operation. When not empty, the profile only runs during
    /// these periods.
    pub fn operation_ranges(&self) -> Vec<DateRange> {
        let working_days = self
            .operation_working_days
            .iter()
            .flat_map(|organisation| organisation.working_days.iter());
        let holidays = self
            .operation_holidays
            .iter()
            .flat_map(|organisation| organisation.holidays.iter());
        working_days.chain(holidays).copied().collect()
    }

    /// Periods of non-operation.
    pub fn non_operation_ranges(&self) -> Vec<DateRange> {
        let working_days = self
            .non_operation_working_days
            .iter()
            .flat_map(|organisation| organisation.working_days.iter());
        let holidays = self
            .non_operation_holidays
            .iter()
            .flat_map(|organisation| organisation.holidays.iter());
        working_days.chain(holidays).copied().collect()
    }

    fn excludes(&self, date: Date) -> bool {
        self.non_operation_working_days
            .as_ref()
            .map_or(false, |organisation| organisation.is_working_day(date))
            || self
                .non_operation_holidays
                .as_ref()
                .map_or(false, |organisation| organisation.is_holiday(date))
    }

    fn restricts(&self, date: Date) -> bool {
        let ranges = self.operation_ranges();
        !ranges.is_empty() && !ranges.iter().any(|range| range.contains(date))
    }
}

/// Operating profile of a service or a vehicle journey.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatingProfile {
    /// Days of the week.
    pub regular_days: RegularDays,
    /// Special days of operation, they win over everything else.
    pub operation_days: Vec<DateRange>,
    /// Special days of non-operation.
    pub non_operation_days: Vec<DateRange>,
    /// Bank holidays of operation.
    pub operation_bank_holidays: BTreeSet<BankHoliday>,
    /// Bank holidays of non-operation.
    pub non_operation_bank_holidays: BTreeSet<BankHoliday>,
    /// Term time or holiday gating.
    pub serviced_organisation_day_type: Option<ServicedOrganisationDayType>,
}

impl OperatingProfile {
    /// Decode an `OperatingProfile` element. Serviced organisations are
    /// `None` when the document has not declared any (yet).
    pub(crate) fn from_element(
        element: &Element,
        serviced_organisations: Option<&ServicedOrganisations>,
        negated_days: NegatedDays,
    ) -> Result<Self> {
        let regular_day_type = element.find("RegularDayType");
        let regular_days = match (
            regular_day_type.and_then(|regular_day_type| regular_day_type.find("DaysOfWeek")),
            regular_day_type.and_then(|regular_day_type| regular_day_type.find("HolidaysOnly")),
        ) {
            (Some(days_of_week), _) => RegularDays::from_days_of_week(days_of_week, negated_days),
            (None, Some(_)) => RegularDays::Days(HashSet::new()),
            (None, None) => RegularDays::Unspecified,
        };
        let date_ranges = |path: &str| -> Result<Vec<DateRange>> {
            element
                .find_all(path)
                .into_iter()
                .map(parse_date_range)
                .collect()
        };
        let serviced_organisation_day_type = match (
            element.find("ServicedOrganisationDayType"),
            serviced_organisations,
        ) {
            (Some(day_type), Some(serviced_organisations)) => Some(
                ServicedOrganisationDayType::from_element(day_type, serviced_organisations)?,
            ),
            (Some(_), None) => Some(ServicedOrganisationDayType::default()),
            (None, _) => None,
        };
        Ok(OperatingProfile {
            regular_days,
            operation_days: date_ranges("SpecialDaysOperation/DaysOfOperation/DateRange")?,
            non_operation_days: date_ranges("SpecialDaysOperation/DaysOfNonOperation/DateRange")?,
            operation_bank_holidays: bank_holidays(
                element.find("BankHolidayOperation/DaysOfOperation"),
            ),
            non_operation_bank_holidays: bank_holidays(
                element.find("BankHolidayOperation/DaysOfNonOperation"),
            ),
            serviced_organisation_day_type,
        })
    }

    /// Whether the profile allows `date`. Operating periods are checked by
    /// the caller.
    ///
    /// Special days and bank holidays of operation win, then any
    /// non-operation (special days, bank holidays, serviced organisations)
    /// excludes the date, then the day of the week must be a regular day and
    /// finally, serviced organisations of operation restrict the date to their
    /// periods.
    pub fn allows(&self, date: Date, bank_holidays: &BankHolidays) -> bool {
        if self.operation_days.iter().any(|range| range.contains(date))
            || bank_holidays.is_any_of(&self.operation_bank_holidays, date)
        {
            return true;
        }
        if self.non_operation_days.iter().any(|range| range.contains(date))
            || bank_holidays.is_any_of(&self.non_operation_bank_holidays, date)
            || self
                .serviced_organisation_day_type
                .as_ref()
                .map_or(false, |day_type| day_type.excludes(date))
        {
            return false;
        }
        if !self.regular_days.contains(date.weekday()) {
            return false;
        }
        !self
            .serviced_organisation_day_type
            .as_ref()
            .map_or(false, |day_type| day_type.restricts(date))
    }
}

fn bank_holidays(days: Option<&Element>) -> BTreeSet<BankHoliday> {
    let mut bank_holidays = BTreeSet::new();
    for element in days.into_iter().flat_map(Element::children) {
        match BankHoliday::from_tag(element.name()) {
            Some(holidays) => bank_holidays.extend(holidays),
            // `OtherPublicHoliday` carries its own date, not supported
            None => warn!(
                "Tag '{}' is not a valid tag for BankHolidayOperation",
                element.name()
            ),
        }
    }
    bank_holidays
}
