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

//! Vehicle journeys: departures of a journey pattern at a given time.

use super::{
    bank_holidays::BankHolidays,
    journey_patterns::{parse_wait_time, JourneyPattern},
    operating_profile::OperatingProfile,
    serviced_organisations::ServicedOrganisations,
    services::Service,
    times::JourneyTimes,
};
use crate::{
    configuration::ParserConfig,
    minidom_utils::{ChildText, TryAttribute},
    objects::{parse_duration, Date, Note, Time},
    Result,
};
use anyhow::Context;
use chrono::{Duration, NaiveTime, Timelike};
use minidom::Element;
use std::{collections::HashMap, rc::Rc};
use tracing::debug;

/// Journey specific timings of a journey pattern timing link.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleJourneyTimingLink {
    /// Identifier of the link.
    pub id: Option<String>,
    /// The journey pattern timing link this one overrides.
    pub journey_pattern_timing_link_ref: String,
    /// Run time replacing the one of the pattern.
    pub run_time: Option<Duration>,
    /// Wait time at the origin.
    pub from_wait_time: Option<Duration>,
    /// Wait time at the destination.
    pub to_wait_time: Option<Duration>,
}

impl VehicleJourneyTimingLink {
    fn from_element(element: &Element, max_wait_time: Duration) -> Result<Self> {
        let wait_time = |path: &str| -> Result<Option<Duration>> {
            Ok(element
                .find_non_empty_text(path)
                .map(|wait_time| parse_wait_time(&wait_time, max_wait_time))
                .transpose()?
                .flatten())
        };
        Ok(VehicleJourneyTimingLink {
            id: element.attribute("id"),
            journey_pattern_timing_link_ref: element.try_find_text("JourneyPatternTimingLinkRef")?,
            run_time: element
                .find_non_empty_text("RunTime")
                .map(|run_time| parse_duration(&run_time))
                .transpose()?,
            from_wait_time: wait_time("From/WaitTime")?,
            to_wait_time: wait_time("To/WaitTime")?,
        })
    }
}

/// A scheduled journey, happening at most once a day.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleJourney {
    /// Unique code in the document.
    pub code: String,
    /// `PrivateCode`.
    pub private_code: Option<String>,
    /// `SequenceNumber` attribute.
    pub sequence_number: Option<u32>,
    /// `OperatorRef`.
    pub operator_ref: Option<String>,
    /// Code of the service.
    pub service_ref: String,
    /// Identifier of the line in the service.
    pub line_ref: String,
    /// Direct reference to a journey pattern of the service.
    pub journey_pattern_ref: Option<String>,
    /// Reference to another journey whose pattern (and maybe profile) is
    /// used.
    pub vehicle_journey_ref: Option<String>,
    /// The resolved journey pattern.
    pub journey_pattern: Option<Rc<JourneyPattern>>,
    /// Own operating profile, replacing the one of the service.
    pub operating_profile: Option<OperatingProfile>,
    /// Departure from the first stop, as time since midnight.
    pub departure_time: Time,
    /// Timing link where passenger service begins.
    pub start_dead_run: Option<String>,
    /// Timing link after which passenger service ends.
    pub end_dead_run: Option<String>,
    /// `Operational/Block/BlockNumber`.
    pub block: Option<String>,
    /// `Operational/TicketMachine/JourneyCode`.
    pub ticket_machine_code: Option<String>,
    /// Notes, by code in document order.
    pub notes: Vec<Note>,
    /// Journey specific timings.
    pub timing_links: Vec<VehicleJourneyTimingLink>,
}

// Only short workings are handled, positioning links are ignored.
fn dead_run(element: &Element, name: &str) -> Option<String> {
    element.find_non_empty_text(&format!(
        "{}/ShortWorking/JourneyPatternTimingLinkRef",
        name
    ))
}

fn departure_time(element: &Element) -> Result<Time> {
    let text = element.try_find_text("DepartureTime")?;
    let time = NaiveTime::parse_from_str(&text, "%H:%M:%S")
        .with_context(|| format!("Failed to parse '{}' as a departure time", text))?;
    let day_shift: i64 = element
        .find_non_empty_text("DepartureDayShift")
        .map(|shift| shift.parse())
        .transpose()
        .with_context(|| "Failed to parse DepartureDayShift")?
        .unwrap_or_default();
    Ok(Duration::seconds(i64::from(time.num_seconds_from_midnight())) + Duration::days(day_shift))
}

fn notes(element: &Element) -> Vec<Note> {
    let mut notes: Vec<Note> = Vec::new();
    for note in element.find_all("Note") {
        let code = note.find_text("NoteCode").unwrap_or_default();
        let text = note.find_text("NoteText").unwrap_or_default();
        match notes.iter_mut().find(|note| note.code == code) {
            Some(note) => note.text = text,
            None => notes.push(Note {
                id: code.clone(),
                code,
                text,
            }),
        }
    }
    notes
}

impl VehicleJourney {
    /// Decode a `VehicleJourney`. The journey pattern is resolved later, once
    /// the services are known.
    pub(crate) fn from_element(
        element: &Element,
        serviced_organisations: Option<&ServicedOrganisations>,
        config: &ParserConfig,
    ) -> Result<Self> {
        let code = element.try_find_text("VehicleJourneyCode")?;
        let max_wait_time = config.max_wait_time();
        let build = || -> Result<Self> {
            let journey_pattern_ref = element.find_non_empty_text("JourneyPatternRef");
            let vehicle_journey_ref = match journey_pattern_ref {
                Some(_) => None,
                None => Some(element.try_find_text("VehicleJourneyRef")?),
            };
            Ok(VehicleJourney {
                code: code.clone(),
                private_code: element.find_non_empty_text("PrivateCode"),
                sequence_number: element.attribute("SequenceNumber"),
                operator_ref: element.find_non_empty_text("OperatorRef"),
                service_ref: element.try_find_text("ServiceRef")?,
                line_ref: element.try_find_text("LineRef")?,
                journey_pattern_ref,
                vehicle_journey_ref,
                journey_pattern: None,
                operating_profile: element
                    .find("OperatingProfile")
                    .map(|profile| {
                        OperatingProfile::from_element(
                            profile,
                            serviced_organisations,
                            config.negated_days,
                        )
                    })
                    .transpose()?,
                departure_time: departure_time(element)?,
                start_dead_run: dead_run(element, "StartDeadRun"),
                end_dead_run: dead_run(element, "EndDeadRun"),
                block: element.find_non_empty_text("Operational/Block/BlockNumber"),
                ticket_machine_code: element
                    .find_non_empty_text("Operational/TicketMachine/JourneyCode"),
                notes: notes(element),
                timing_links: element
                    .find_all("VehicleJourneyTimingLink")
                    .into_iter()
                    .map(|link| VehicleJourneyTimingLink::from_element(link, max_wait_time))
                    .collect::<Result<_>>()?,
            })
        };
        build().with_context(|| format!("Invalid VehicleJourney '{}'", code))
    }

    /// Stops visited, with their arrival and departure times.
    pub fn times(&self) -> JourneyTimes<'_> {
        JourneyTimes::new(self)
    }

    /// Whether the journey runs on `date`. The profile of the journey
    /// replaces the one of the service; without any profile, every day of
    /// the operating period is allowed.
    pub fn operates_on(&self, date: Date, service: &Service, bank_holidays: &BankHolidays) -> bool {
        if !service.operating_period.contains(date) {
            return false;
        }
        self.operating_profile
            .as_ref()
            .or_else(|| service.operating_profile.as_ref())
            .map_or(true, |profile| profile.allows(date, bank_holidays))
    }
}

/// Resolve the journey pattern of every journey, in two passes: direct
/// references to a pattern of the service first, then references to other
/// journeys (single hop). Journeys without a pattern are dropped; their codes
/// are returned along with the resolved journeys.
pub(crate) fn resolve_journey_patterns(
    mut journeys: Vec<VehicleJourney>,
    services: &HashMap<String, Service>,
) -> (Vec<VehicleJourney>, Vec<String>) {
    for journey in &mut journeys {
        if let Some(pattern_ref) = &journey.journey_pattern_ref {
            journey.journey_pattern = services
                .get(&journey.service_ref)
                .and_then(|service| service.journey_patterns.get(pattern_ref))
                .cloned();
        }
    }
    let resolved: HashMap<String, (Option<Rc<JourneyPattern>>, Option<OperatingProfile>)> =
        journeys
            .iter()
            .filter(|journey| journey.vehicle_journey_ref.is_none())
            .map(|journey| {
                (
                    journey.code.clone(),
                    (
                        journey.journey_pattern.clone(),
                        journey.operating_profile.clone(),
                    ),
                )
            })
            .collect();
    for journey in &mut journeys {
        let referenced = match &journey.vehicle_journey_ref {
            Some(journey_ref) => resolved.get(journey_ref),
            None => continue,
        };
        match referenced {
            Some((pattern, profile)) => {
                if journey.journey_pattern.is_none() {
                    journey.journey_pattern = pattern.clone();
                }
                if journey.operating_profile.is_none() {
                    journey.operating_profile = profile.clone();
                }
            }
            None => debug!(
                "VehicleJourney '{}' references an unknown VehicleJourney {:?}",
                journey.code, journey.vehicle_journey_ref
            ),
        }
    }
    let (kept, dropped): (Vec<_>, Vec<_>) = journeys
        .into_iter()
        .partition(|journey| journey.journey_pattern.is_some());
    let dropped = dropped.into_iter().map(|journey| journey.code).collect();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        objects::DateRange,
        transxchange::{
            journey_patterns::JourneyPatternSection, operating_profile::RegularDays,
            services::OperatingPeriod,
        },
    };

    fn journey(xml: &str) -> VehicleJourney {
        let root: Element = xml.parse().unwrap();
        VehicleJourney::from_element(&root, None, &ParserConfig::default()).unwrap()
    }

    mod from_element {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn full() {
            let journey = journey(
                r#"<VehicleJourney SequenceNumber="3">
                    <PrivateCode>ea-20-X1-A-y08-1</PrivateCode>
                    <Operational>
                        <Block><BlockNumber>42</BlockNumber></Block>
                        <TicketMachine><JourneyCode>0715</JourneyCode></TicketMachine>
                    </Operational>
                    <VehicleJourneyCode>VJ1</VehicleJourneyCode>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <JourneyPatternRef>JP1</JourneyPatternRef>
                    <StartDeadRun><ShortWorking><JourneyPatternTimingLinkRef>JPTL2</JourneyPatternTimingLinkRef></ShortWorking></StartDeadRun>
                    <EndDeadRun><PositioningLink><RunTime>PT5M</RunTime></PositioningLink></EndDeadRun>
                    <DepartureTime>23:50:00</DepartureTime>
                    <DepartureDayShift>1</DepartureDayShift>
                    <Note><NoteCode>SD</NoteCode><NoteText>Schooldays only</NoteText></Note>
                    <Note><NoteCode>SD</NoteCode><NoteText>School days only</NoteText></Note>
                    <VehicleJourneyTimingLink>
                        <JourneyPatternTimingLinkRef>JPTL1</JourneyPatternTimingLinkRef>
                        <RunTime>PT4M</RunTime>
                        <To><WaitTime>PT1M</WaitTime></To>
                    </VehicleJourneyTimingLink>
                </VehicleJourney>"#,
            );
            assert_eq!("VJ1", journey.code);
            assert_eq!(Some(3), journey.sequence_number);
            assert_eq!(Some(String::from("42")), journey.block);
            assert_eq!(Some(String::from("0715")), journey.ticket_machine_code);
            assert_eq!(Some(String::from("JP1")), journey.journey_pattern_ref);
            assert_eq!(None, journey.vehicle_journey_ref);
            assert_eq!(Some(String::from("JPTL2")), journey.start_dead_run);
            assert_eq!(None, journey.end_dead_run);
            assert_eq!(
                Duration::days(1) + Duration::minutes(23 * 60 + 50),
                journey.departure_time
            );
            assert_eq!(
                vec![Note {
                    id: String::from("SD"),
                    code: String::from("SD"),
                    text: String::from("School days only"),
                }],
                journey.notes
            );
            assert_eq!(
                vec![VehicleJourneyTimingLink {
                    id: None,
                    journey_pattern_timing_link_ref: String::from("JPTL1"),
                    run_time: Some(Duration::minutes(4)),
                    from_wait_time: None,
                    to_wait_time: Some(Duration::minutes(1)),
                }],
                journey.timing_links
            );
        }

        #[test]
        fn journey_ref() {
            let journey = journey(
                r#"<VehicleJourney>
                    <VehicleJourneyCode>VJ2</VehicleJourneyCode>
                    <VehicleJourneyRef>VJ1</VehicleJourneyRef>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <DepartureTime>08:00:00</DepartureTime>
                </VehicleJourney>"#,
            );
            assert_eq!(Some(String::from("VJ1")), journey.vehicle_journey_ref);
            assert_eq!(Duration::hours(8), journey.departure_time);
        }

        #[test]
        #[should_panic(expected = "Invalid VehicleJourney 'VJ3'")]
        fn no_pattern_reference() {
            journey(
                r#"<VehicleJourney>
                    <VehicleJourneyCode>VJ3</VehicleJourneyCode>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <DepartureTime>08:00:00</DepartureTime>
                </VehicleJourney>"#,
            );
        }

        #[test]
        #[should_panic(expected = "Failed to parse '8am' as a departure time")]
        fn invalid_departure_time() {
            let root: Element = r#"<VehicleJourney>
                    <VehicleJourneyCode>VJ3</VehicleJourneyCode>
                    <JourneyPatternRef>JP1</JourneyPatternRef>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <DepartureTime>8am</DepartureTime>
                </VehicleJourney>"#
                .parse()
                .unwrap();
            // Debug output of the error shows the whole chain of contexts
            VehicleJourney::from_element(&root, None, &ParserConfig::default()).unwrap();
        }
    }

    mod resolve_journey_patterns {
        use super::*;
        use pretty_assertions::assert_eq;

        fn service() -> Service {
            let pattern = JourneyPattern {
                id: String::from("JP1"),
                sections: vec![Rc::new(JourneyPatternSection {
                    id: String::from("JPS1"),
                    timing_links: Vec::new(),
                })],
                route_ref: None,
                direction: None,
            };
            let mut journey_patterns = HashMap::new();
            journey_patterns.insert(pattern.id.clone(), Rc::new(pattern));
            Service {
                service_code: String::from("S1"),
                mode: None,
                operator_ref: None,
                operating_period: OperatingPeriod(DateRange {
                    start: Date::from_ymd_opt(2020, 1, 1).unwrap(),
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
                journey_patterns,
            }
        }

        fn vehicle_journey(code: &str, pattern_ref: Option<&str>, journey_ref: Option<&str>) -> VehicleJourney {
            VehicleJourney {
                code: code.to_string(),
                private_code: None,
                sequence_number: None,
                operator_ref: None,
                service_ref: String::from("S1"),
                line_ref: String::from("L1"),
                journey_pattern_ref: pattern_ref.map(str::to_string),
                vehicle_journey_ref: journey_ref.map(str::to_string),
                journey_pattern: None,
                operating_profile: None,
                departure_time: Duration::hours(8),
                start_dead_run: None,
                end_dead_run: None,
                block: None,
                ticket_machine_code: None,
                notes: Vec::new(),
                timing_links: Vec::new(),
            }
        }

        #[test]
        fn two_passes() {
            let mut services = HashMap::new();
            services.insert(String::from("S1"), service());
            let mut referenced = vehicle_journey("VJ1", Some("JP1"), None);
            referenced.operating_profile = Some(OperatingProfile {
                regular_days: RegularDays::Days(Default::default()),
                ..Default::default()
            });
            let journeys = vec![
                // references a journey declared after itself
                vehicle_journey("VJ2", None, Some("VJ1")),
                referenced,
                vehicle_journey("VJ3", Some("JP2"), None),
                vehicle_journey("VJ4", None, Some("VJ9")),
            ];
            let (journeys, dropped) = resolve_journey_patterns(journeys, &services);
            let codes: Vec<&str> = journeys.iter().map(|journey| journey.code.as_str()).collect();
            assert_eq!(vec!["VJ2", "VJ1"], codes);
            assert_eq!(vec!["VJ3", "VJ4"], dropped);
            assert_eq!("JP1", journeys[0].journey_pattern.as_ref().unwrap().id);
            assert_eq!(
                journeys[1].operating_profile,
                journeys[0].operating_profile
            );
        }

        #[test]
        fn single_hop() {
            let mut services = HashMap::new();
            services.insert(String::from("S1"), service());
            let journeys = vec![
                vehicle_journey("VJ1", Some("JP1"), None),
                vehicle_journey("VJ2", None, Some("VJ1")),
                vehicle_journey("VJ3", None, Some("VJ2")),
            ];
            let (journeys, dropped) = resolve_journey_patterns(journeys, &services);
            assert_eq!(2, journeys.len());
            assert_eq!(vec!["VJ3"], dropped);
        }
    }

    mod operates_on {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn journey_profile_replaces_service_profile() {
            let root: Element = r#"<Service>
                    <ServiceCode>S1</ServiceCode>
                    <OperatingPeriod><StartDate>2020-07-01</StartDate><EndDate>2020-07-31</EndDate></OperatingPeriod>
                    <OperatingProfile>
                        <RegularDayType><DaysOfWeek><MondayToFriday /></DaysOfWeek></RegularDayType>
                    </OperatingProfile>
                </Service>"#
                .parse()
                .unwrap();
            let service = Service::from_element(
                &root,
                None,
                &Default::default(),
                &ParserConfig::default(),
            )
            .unwrap();
            let mut journey = journey(
                r#"<VehicleJourney>
                    <VehicleJourneyCode>VJ1</VehicleJourneyCode>
                    <JourneyPatternRef>JP1</JourneyPatternRef>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <DepartureTime>08:00:00</DepartureTime>
                </VehicleJourney>"#,
            );
            let bank_holidays = BankHolidays::default();
            let saturday = Date::from_ymd_opt(2020, 7, 4).unwrap();
            let friday = Date::from_ymd_opt(2020, 7, 3).unwrap();
            assert!(journey.operates_on(friday, &service, &bank_holidays));
            assert!(!journey.operates_on(saturday, &service, &bank_holidays));
            journey.operating_profile = Some(OperatingProfile::default());
            assert!(journey.operates_on(saturday, &service, &bank_holidays));
            let outside = Date::from_ymd_opt(2020, 8, 1).unwrap();
            assert!(!journey.operates_on(outside, &service, &bank_holidays));
        }
    }
}
