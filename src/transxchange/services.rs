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

//! Services, their lines and operators.

use super::{
    journey_patterns::{JourneyPattern, JourneyPatternSections},
    operating_profile::{parse_date_range, OperatingProfile},
    serviced_organisations::ServicedOrganisations,
};
use crate::{
    configuration::ParserConfig,
    minidom_utils::{ChildText, TryAttribute},
    objects::{Date, DateRange},
    Result,
};
use anyhow::Context;
use chrono::Datelike;
use minidom::Element;
use skip_error::skip_error_and_warn;
use std::{collections::HashMap, rc::Rc};
use titlecase::titlecase;
use tracing::warn;

/// Typos found in service descriptions, with their correction.
const DESCRIPTION_CORRECTIONS: [(&str, &str); 18] = [
    ("Stitians", "Stithians"),
    ("Kings Lynn", "King's Lynn"),
    ("Wells - Next - The - Sea", "Wells-next-the-Sea"),
    ("Wells next the Sea", "Wells-next-the-Sea"),
    ("Baasingstoke", "Basingstoke"),
    ("Liskerard", "Liskeard"),
    ("Tauton", "Taunton"),
    ("City Centre,st Stephens Street", "Norwich"),
    ("Charlton Horethore", "Charlton Horethorne"),
    ("Camleford", "Camelford"),
    ("Greenstead Green", "Greensted Green"),
    ("Tinagel", "Tintagel"),
    ("Plymouh City Cerntre", "Plymouth City Centre"),
    ("Winterbourn ", "Winterbourne"),
    ("Exetedr", "Exeter"),
    ("- ", " - "),
    (" -", " - "),
    ("  ", " "),
];

/// Operator of services.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operator {
    /// Identifier in the document.
    pub id: Option<String>,
    /// `OperatorCode`.
    pub code: Option<String>,
    /// `NationalOperatorCode`.
    pub national_code: Option<String>,
    /// `OperatorShortName`.
    pub short_name: Option<String>,
    /// `TradingName`.
    pub trading_name: Option<String>,
}

impl Operator {
    pub(crate) fn from_element(element: &Element) -> Self {
        Operator {
            id: element.attribute("id"),
            code: element.find_non_empty_text("OperatorCode"),
            national_code: element.find_non_empty_text("NationalOperatorCode"),
            short_name: element.find_non_empty_text("OperatorShortName"),
            trading_name: element.find_non_empty_text("TradingName"),
        }
    }

    /// Name for passengers.
    pub fn name(&self) -> Option<&str> {
        self.trading_name
            .as_deref()
            .or_else(|| self.short_name.as_deref())
    }
}

/// A line of a service. `LineName` is `"name|brand"` for some operators.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Identifier, referenced by vehicle journeys.
    pub id: String,
    /// Public name (`"X1"`).
    pub name: String,
    /// Marketing brand, empty if none.
    pub brand: String,
}

impl Line {
    fn from_element(element: &Element) -> Result<Self> {
        let id = element.try_attribute("id")?;
        let line_name = element.find_text("LineName").unwrap_or_default();
        let (name, brand) = match line_name.find('|') {
            Some(index) => (&line_name[..index], &line_name[index + 1..]),
            None => (line_name.as_str(), ""),
        };
        Ok(Line {
            id,
            name: name.to_string(),
            brand: brand.to_string(),
        })
    }
}

/// Period during which a service runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperatingPeriod(pub DateRange);

impl OperatingPeriod {
    /// Whether the service runs at all on `date`.
    pub fn contains(&self, date: Date) -> bool {
        self.0.contains(date)
    }

    /// Human readable period, relative to `today`. End dates are often bogus
    /// so they are only shown when the period is short.
    pub fn describe(&self, today: Date) -> String {
        let DateRange { start, end } = self.0;
        if Some(start) == end {
            return start.format("on %-d %B %Y").to_string();
        }
        if start > today {
            return match end {
                Some(end) if (end - start).num_days() < 14 => {
                    let mut start_format = String::from("%-d");
                    if start.month() != end.month() {
                        start_format.push_str(" %B");
                    }
                    if start.year() != end.year() {
                        start_format.push_str(" %Y");
                    }
                    format!(
                        "from {} to {}",
                        start.format(&start_format),
                        end.format("%-d %B %Y")
                    )
                }
                _ => start.format("from %-d %B %Y").to_string(),
            };
        }
        match end {
            Some(end) if (end - start).num_days() < 7 => end.format("until %-d %B %Y").to_string(),
            _ => String::new(),
        }
    }
}

/// A bus service.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// Unique code of the service.
    pub service_code: String,
    /// `bus`, `coach`, `ferry`...
    pub mode: Option<String>,
    /// `RegisteredOperatorRef`.
    pub operator_ref: Option<String>,
    /// Period during which the service runs.
    pub operating_period: OperatingPeriod,
    /// Default profile of the journeys of the service.
    pub operating_profile: Option<OperatingProfile>,
    /// Marketing name.
    pub marketing_name: Option<String>,
    /// Description, with typos corrected.
    pub description: Option<String>,
    /// Parts of the description (`origin - ... - destination`).
    pub description_parts: Vec<String>,
    /// Trailing `via ...` of the description.
    pub via: Option<String>,
    /// `StandardService/Origin`.
    pub origin: Option<String>,
    /// `StandardService/Destination`.
    pub destination: Option<String>,
    /// `StandardService/Vias`.
    pub vias: Vec<String>,
    /// Lines of the service.
    pub lines: Vec<Line>,
    /// Journey patterns with at least one known section, by id.
    pub journey_patterns: HashMap<String, Rc<JourneyPattern>>,
}

impl Service {
    pub(crate) fn from_element(
        element: &Element,
        serviced_organisations: Option<&ServicedOrganisations>,
        journey_pattern_sections: &JourneyPatternSections,
        config: &ParserConfig,
    ) -> Result<Self> {
        let service_code = element.try_find_text("ServiceCode")?;
        let operating_period = element
            .find("OperatingPeriod")
            .with_context(|| format!("Failed to find 'OperatingPeriod' in Service '{}'", service_code))
            .and_then(parse_date_range)
            .map(OperatingPeriod)?;
        let operating_profile = element
            .find("OperatingProfile")
            .map(|profile| {
                OperatingProfile::from_element(profile, serviced_organisations, config.negated_days)
            })
            .transpose()
            .with_context(|| format!("Invalid OperatingProfile in Service '{}'", service_code))?;
        let mut journey_patterns = HashMap::new();
        for pattern in element.find_all("StandardService/JourneyPattern") {
            let pattern = skip_error_and_warn!(JourneyPattern::from_element(
                pattern,
                journey_pattern_sections
            ));
            if !pattern.sections.is_empty() {
                journey_patterns.insert(pattern.id.clone(), Rc::new(pattern));
            }
        }
        let mut lines = Vec::new();
        for line in element.find_all("Lines/Line") {
            lines.push(skip_error_and_warn!(Line::from_element(line)));
        }
        let mut service = Service {
            mode: element.find_non_empty_text("Mode"),
            operator_ref: element.find_non_empty_text("RegisteredOperatorRef"),
            operating_period,
            operating_profile,
            marketing_name: element.find_non_empty_text("MarketingName"),
            description: None,
            description_parts: Vec::new(),
            via: None,
            origin: standard_service_text(element, "Origin"),
            destination: standard_service_text(element, "Destination"),
            vias: element
                .find_all("StandardService/Vias/Via")
                .into_iter()
                .map(|via| via.text().trim().to_string())
                .collect(),
            lines,
            journey_patterns,
            service_code,
        };
        if let Some(description) = element.find_non_empty_text("Description") {
            service.set_description(&description);
        }
        if service.lines.is_empty() {
            warn!("Service '{}' has no line", service.service_code);
        }
        Ok(service)
    }

    /// Set the description and split it into parts: `"Norwich - Wroxham via
    /// Rackheath"` gives `["Norwich", "Wroxham"]` and a via of `"Rackheath"`.
    pub fn set_description(&mut self, description: &str) {
        let description = if is_upper(description) {
            titlecase(&description.to_lowercase())
        } else {
            match description.find(" via ") {
                Some(index) if is_upper(&description[..index]) => format!(
                    "{}{}",
                    titlecase(&description[..index].to_lowercase()),
                    &description[index..]
                ),
                _ => description.to_string(),
            }
        };
        let description = correct_description(&description);
        let parts: Vec<&str> = if description.contains(" - ") {
            description.split(" - ").collect()
        } else if description.contains(" to ") {
            description.split(" to ").collect()
        } else {
            vec![description.as_str()]
        };
        let mut parts: Vec<String> = parts.into_iter().map(sanitize_description_part).collect();
        self.via = None;
        if let Some(last) = parts.last_mut() {
            if let Some(index) = last.find(" via ") {
                self.via = Some(last[index + " via ".len()..].to_string());
                last.truncate(index);
            }
        }
        self.description_parts = parts;
        self.description = Some(description);
    }
}

fn standard_service_text(element: &Element, name: &str) -> Option<String> {
    element
        .find_non_empty_text(&format!("StandardService/{}", name))
        .map(|text| text.replace('`', "'").trim().to_string())
}

// Like Python's `str.isupper`: at least one cased letter and no lowercase.
fn is_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

fn correct_description(description: &str) -> String {
    DESCRIPTION_CORRECTIONS
        .iter()
        .fold(description.to_string(), |description, (typo, correction)| {
            description.replace(typo, correction)
        })
}

/// `"Bus Station bay 5,Blyth"` gives `"Blyth"`.
fn sanitize_description_part(part: &str) -> String {
    let part = part.trim();
    for (index, _) in part.rmatch_indices(',') {
        let after = &part[index + 1..];
        if index > 0 && !after.starts_with(' ') && after.chars().count() >= 2 {
            return after.to_string();
        }
    }
    part.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    fn service() -> Service {
        Service {
            service_code: String::from("PB0002032:467"),
            mode: None,
            operator_ref: None,
            operating_period: OperatingPeriod(DateRange {
                start: date(2020, 1, 1),
                end: None,
            }),
            operating_profile: None,
            marketing_name: None,
            description: None,
            description_parts: Vec::new(),
            via: None,
            origin: None,
            destination: None,
            vias: Vec::new(),
            lines: Vec::new(),
            journey_patterns: HashMap::new(),
        }
    }

    mod set_description {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn upper_case() {
            let mut service = service();
            service.set_description("NORWICH - WROXHAM");
            assert_eq!(Some(String::from("Norwich - Wroxham")), service.description);
            assert_eq!(vec!["Norwich", "Wroxham"], service.description_parts);
        }

        #[test]
        fn upper_case_before_via() {
            let mut service = service();
            service.set_description("NORWICH - WROXHAM via Rackheath");
            assert_eq!(vec!["Norwich", "Wroxham"], service.description_parts);
            assert_eq!(Some(String::from("Rackheath")), service.via);
        }

        #[test]
        fn typos() {
            let mut service = service();
            service.set_description("Kings Lynn- Wells next the Sea");
            assert_eq!(
                Some(String::from("King's Lynn - Wells-next-the-Sea")),
                service.description
            );
        }

        #[test]
        fn to() {
            let mut service = service();
            service.set_description("Bus Station bay 5,Blyth to Cramlington");
            assert_eq!(vec!["Blyth", "Cramlington"], service.description_parts);
        }

        #[test]
        fn single_part() {
            let mut service = service();
            service.set_description("Town Circular");
            assert_eq!(vec!["Town Circular"], service.description_parts);
            assert_eq!(None, service.via);
        }
    }

    mod operating_period {
        use super::*;
        use pretty_assertions::assert_eq;

        fn operating_period(start: Date, end: Option<Date>) -> OperatingPeriod {
            OperatingPeriod(DateRange { start, end })
        }

        #[test]
        fn single_day() {
            let period = operating_period(date(2020, 6, 1), Some(date(2020, 6, 1)));
            assert_eq!("on 1 June 2020", period.describe(date(2020, 5, 1)));
        }

        #[test]
        fn short_future_period() {
            let period = operating_period(date(2020, 6, 3), Some(date(2020, 6, 9)));
            assert_eq!("from 3 to 9 June 2020", period.describe(date(2020, 5, 1)));
            let period = period_across_years();
            assert_eq!(
                "from 28 December 2020 to 3 January 2021",
                period.describe(date(2020, 5, 1))
            );
        }

        fn period_across_years() -> OperatingPeriod {
            operating_period(date(2020, 12, 28), Some(date(2021, 1, 3)))
        }

        #[test]
        fn long_future_period() {
            let period = operating_period(date(2020, 6, 3), None);
            assert_eq!("from 3 June 2020", period.describe(date(2020, 5, 1)));
        }

        #[test]
        fn started_period() {
            let period = operating_period(date(2020, 6, 3), Some(date(2020, 6, 8)));
            assert_eq!("until 8 June 2020", period.describe(date(2020, 6, 4)));
            let period = operating_period(date(2020, 1, 1), Some(date(2020, 12, 31)));
            assert_eq!("", period.describe(date(2020, 6, 4)));
        }
    }

    mod from_element {
        use super::*;
        use pretty_assertions::assert_eq;

        const SERVICE: &str = r#"<Service>
                <ServiceCode>PB0002032:467</ServiceCode>
                <Lines>
                    <Line id="1"><LineName>X1|Excel</LineName></Line>
                    <Line id="2"><LineName>X2</LineName></Line>
                </Lines>
                <OperatingPeriod><StartDate>2020-06-01</StartDate></OperatingPeriod>
                <OperatingProfile>
                    <RegularDayType><DaysOfWeek><Weekend /></DaysOfWeek></RegularDayType>
                </OperatingProfile>
                <RegisteredOperatorRef>O1</RegisteredOperatorRef>
                <Description>Norwich - Peterborough</Description>
                <Mode>bus</Mode>
                <StandardService>
                    <Origin>Norwich</Origin>
                    <Destination>King`s Lynn </Destination>
                    <Vias><Via>Dereham</Via></Vias>
                    <JourneyPattern id="JP1"><JourneyPatternSectionRefs>JPS1</JourneyPatternSectionRefs></JourneyPattern>
                </StandardService>
            </Service>"#;

        #[test]
        fn service() {
            let root: Element = SERVICE.parse().unwrap();
            let service = Service::from_element(
                &root,
                None,
                &JourneyPatternSections::new(),
                &ParserConfig::default(),
            )
            .unwrap();
            assert_eq!("PB0002032:467", service.service_code);
            assert_eq!(
                vec![
                    Line {
                        id: String::from("1"),
                        name: String::from("X1"),
                        brand: String::from("Excel"),
                    },
                    Line {
                        id: String::from("2"),
                        name: String::from("X2"),
                        brand: String::new(),
                    }
                ],
                service.lines
            );
            assert_eq!(Some(String::from("bus")), service.mode);
            assert_eq!(Some(String::from("King's Lynn")), service.destination);
            assert_eq!(vec!["Dereham"], service.vias);
            assert!(service.operating_profile.is_some());
            // The only section is unknown
            assert!(service.journey_patterns.is_empty());
        }

        #[test]
        #[should_panic(expected = "Failed to find 'OperatingPeriod' in Service 'PB0002032:467'")]
        fn no_operating_period() {
            let root: Element = "<Service><ServiceCode>PB0002032:467</ServiceCode></Service>"
                .parse()
                .unwrap();
            Service::from_element(
                &root,
                None,
                &JourneyPatternSections::new(),
                &ParserConfig::default(),
            )
            .unwrap();
        }
    }

    #[test]
    fn operator_name() {
        let root: Element = r#"<Operator id="O1">
                <OperatorCode>FECS</OperatorCode>
                <OperatorShortName>First Eastern Counties</OperatorShortName>
            </Operator>"#
            .parse()
            .unwrap();
        let operator = Operator::from_element(&root);
        assert_eq!(Some("First Eastern Counties"), operator.name());
        assert_eq!(Some(String::from("O1")), operator.id);
    }
}
