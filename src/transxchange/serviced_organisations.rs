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

//! Schools, colleges or workplaces whose terms gate some journeys.

use super::operating_profile::parse_date_range;
use crate::{
    minidom_utils::ChildText,
    objects::{Date, DateRange},
    Result,
};
use anyhow::Context;
use minidom::Element;
use std::{collections::HashMap, rc::Rc};

/// Serviced organisations of a document, by code.
pub type ServicedOrganisations = HashMap<String, Rc<ServicedOrganisation>>;

/// A school, college or workplace.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicedOrganisation {
    /// Unique code in the document.
    pub code: String,
    /// Name of the organisation.
    pub name: Option<String>,
    /// Periods of work (school terms...).
    pub working_days: Vec<DateRange>,
    /// Periods of holidays.
    pub holidays: Vec<DateRange>,
}

impl ServicedOrganisation {
    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        let code = element.try_find_text("OrganisationCode")?;
        let date_ranges = |path: &str| -> Result<Vec<DateRange>> {
            element
                .find_all(path)
                .into_iter()
                .map(parse_date_range)
                .collect::<Result<_>>()
                .with_context(|| format!("Invalid '{}' in ServicedOrganisation '{}'", path, code))
        };
        Ok(ServicedOrganisation {
            working_days: date_ranges("WorkingDays/DateRange")?,
            holidays: date_ranges("Holidays/DateRange")?,
            name: element.find_non_empty_text("Name"),
            code,
        })
    }

    /// Whether `date` is in one of the working periods.
    pub fn is_working_day(&self, date: Date) -> bool {
        self.working_days.iter().any(|range| range.contains(date))
    }

    /// Whether `date` is in one of the holidays.
    pub fn is_holiday(&self, date: Date) -> bool {
        self.holidays.iter().any(|range| range.contains(date))
    }
}
