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

//! Journey patterns: ordered sections of timing links between stops.

use crate::{
    minidom_utils::{ChildText, TryAttribute},
    objects::{parse_duration, Activity, Stop, TimingStatus},
    Result,
};
use anyhow::Context;
use chrono::Duration;
use minidom::Element;
use std::{collections::HashMap, rc::Rc};
use tracing::warn;

/// Stops of a document, by ATCO code.
pub type Stops = HashMap<String, Stop>;

/// Journey pattern sections of a document, by id.
pub type JourneyPatternSections = HashMap<String, Rc<JourneyPatternSection>>;

/// Either end (`From` or `To`) of a timing link.
#[derive(Debug, Clone, PartialEq)]
pub struct StopUsage {
    /// The stop, or a placeholder when the stop is not declared.
    pub stop: Stop,
    /// `SequenceNumber` attribute.
    pub sequence_number: Option<u32>,
    /// What passengers can do at the stop.
    pub activity: Option<Activity>,
    /// Timing status of the stop.
    pub timing_status: Option<TimingStatus>,
    /// Time spent at the stop.
    pub wait_time: Option<Duration>,
}

impl StopUsage {
    fn from_element(element: &Element, stops: &Stops, max_wait_time: Duration) -> Result<Self> {
        let stop_ref = element.try_find_text("StopPointRef")?;
        let stop = match stops.get(&stop_ref) {
            Some(stop) => stop.clone(),
            None => Stop {
                common_name: element.find_non_empty_text("CommonName"),
                locality: element.find_non_empty_text("LocalityName"),
                ..Stop::placeholder(stop_ref)
            },
        };
        let activity = element.find_non_empty_text("Activity").and_then(|activity| {
            activity
                .parse::<Activity>()
                .map_err(|e| warn!("{:?} at stop '{}'", e, stop.atco_code))
                .ok()
        });
        let timing_status = element
            .find_non_empty_text("TimingStatus")
            .and_then(|timing_status| {
                timing_status
                    .parse::<TimingStatus>()
                    .map_err(|e| warn!("{:?} at stop '{}'", e, stop.atco_code))
                    .ok()
            });
        let wait_time = element
            .find_non_empty_text("WaitTime")
            .map(|wait_time| parse_wait_time(&wait_time, max_wait_time))
            .transpose()?
            .flatten();
        Ok(StopUsage {
            sequence_number: element.attribute("SequenceNumber"),
            stop,
            activity,
            timing_status,
            wait_time,
        })
    }
}

/// Parse a wait time, discarding implausible values (bad data in the source
/// rather than actual waits).
pub(crate) fn parse_wait_time(text: &str, max_wait_time: Duration) -> Result<Option<Duration>> {
    let wait_time = parse_duration(text)?;
    if wait_time > max_wait_time || -wait_time > max_wait_time {
        warn!("Wait time '{}' is ignored", text);
        return Ok(None);
    }
    Ok(Some(wait_time))
}

/// Scheduled travel between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyPatternTimingLink {
    /// Identifier of the link, referenced by vehicle journeys.
    pub id: Option<String>,
    /// Departure stop.
    pub origin: StopUsage,
    /// Arrival stop.
    pub destination: StopUsage,
    /// Time to go from origin to destination.
    pub run_time: Duration,
    /// Geometry of the link.
    pub route_link_ref: Option<String>,
}

impl JourneyPatternTimingLink {
    fn from_element(element: &Element, stops: &Stops, max_wait_time: Duration) -> Result<Self> {
        let id: Option<String> = element.attribute("id");
        let stop_usage = |name: &str| -> Result<StopUsage> {
            let stop_usage = element.find(name).with_context(|| {
                format!("Failed to find '{}' in JourneyPatternTimingLink {:?}", name, id)
            })?;
            StopUsage::from_element(stop_usage, stops, max_wait_time)
        };
        let origin = stop_usage("From")?;
        let destination = stop_usage("To")?;
        let run_time = parse_duration(&element.try_find_text("RunTime")?)?;
        Ok(JourneyPatternTimingLink {
            route_link_ref: element.find_non_empty_text("RouteLinkRef"),
            id,
            origin,
            destination,
            run_time,
        })
    }
}

/// An ordered list of timing links.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyPatternSection {
    /// Identifier of the section.
    pub id: String,
    /// Timing links, in order.
    pub timing_links: Vec<JourneyPatternTimingLink>,
}

impl JourneyPatternSection {
    pub(crate) fn from_element(
        element: &Element,
        stops: &Stops,
        max_wait_time: Duration,
    ) -> Result<Self> {
        let id: String = element.try_attribute("id")?;
        let timing_links = element
            .find_all("JourneyPatternTimingLink")
            .into_iter()
            .map(|link| JourneyPatternTimingLink::from_element(link, stops, max_wait_time))
            .collect::<Result<_>>()
            .with_context(|| format!("Invalid JourneyPatternSection '{}'", id))?;
        Ok(JourneyPatternSection { id, timing_links })
    }
}

/// A route variant: sections of timing links, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyPattern {
    /// Identifier of the pattern.
    pub id: String,
    /// Sections, in order.
    pub sections: Vec<Rc<JourneyPatternSection>>,
    /// Reference of the route.
    pub route_ref: Option<String>,
    /// `inbound`, `outbound`, `clockwise`, `antiClockwise`...
    pub direction: Option<String>,
}

impl JourneyPattern {
    /// Decode a pattern, keeping only the sections that are known.
    pub(crate) fn from_element(
        element: &Element,
        sections: &JourneyPatternSections,
    ) -> Result<Self> {
        Ok(JourneyPattern {
            id: element.try_attribute("id")?,
            sections: element
                .find_all("JourneyPatternSectionRefs")
                .into_iter()
                .filter_map(|section_ref| sections.get(section_ref.text().trim()))
                .cloned()
                .collect(),
            route_ref: element.find_non_empty_text("RouteRef"),
            direction: element.find_non_empty_text("Direction"),
        })
    }

    /// All timing links, in order.
    pub fn timing_links(&self) -> impl Iterator<Item = &JourneyPatternTimingLink> {
        self.sections
            .iter()
            .flat_map(|section| section.timing_links.iter())
    }

    /// Whether journeys following this pattern go in the inbound direction.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self.direction.as_deref(),
            Some("inbound") | Some("antiClockwise")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stops() -> Stops {
        let mut stops = Stops::new();
        stops.insert(
            String::from("2900K132"),
            Stop {
                atco_code: String::from("2900K132"),
                common_name: Some(String::from("Bus Station")),
                locality: Some(String::from("King's Lynn")),
            },
        );
        stops
    }

    const SECTION: &str = r#"<JourneyPatternSection id="JPS1">
            <JourneyPatternTimingLink id="JPTL1">
                <From SequenceNumber="1">
                    <Activity>pickUp</Activity>
                    <StopPointRef>2900K132</StopPointRef>
                    <TimingStatus>PTP</TimingStatus>
                </From>
                <To SequenceNumber="2">
                    <StopPointRef>2900W0321</StopPointRef>
                    <TimingStatus>OTH</TimingStatus>
                    <WaitTime>PT2M</WaitTime>
                </To>
                <RouteLinkRef>RL1</RouteLinkRef>
                <RunTime>PT10M</RunTime>
            </JourneyPatternTimingLink>
            <JourneyPatternTimingLink id="JPTL2">
                <From><StopPointRef>2900W0321</StopPointRef><WaitTime>PT5H</WaitTime></From>
                <To><StopPointRef>2900W0322</StopPointRef><Activity>teleport</Activity></To>
                <RunTime>PT3M</RunTime>
            </JourneyPatternTimingLink>
        </JourneyPatternSection>"#;

    mod journey_pattern_section {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn timing_links() {
            let root: Element = SECTION.parse().unwrap();
            let section =
                JourneyPatternSection::from_element(&root, &stops(), Duration::seconds(10_000))
                    .unwrap();
            assert_eq!("JPS1", section.id);
            assert_eq!(2, section.timing_links.len());
            let link = &section.timing_links[0];
            assert_eq!(Some(String::from("JPTL1")), link.id);
            assert_eq!(Duration::minutes(10), link.run_time);
            assert_eq!(Some(String::from("RL1")), link.route_link_ref);
            assert_eq!(
                Some(String::from("Bus Station")),
                link.origin.stop.common_name
            );
            assert_eq!(Some(1), link.origin.sequence_number);
            assert_eq!(Some(Activity::PickUp), link.origin.activity);
            assert_eq!(
                Some(TimingStatus::PrincipalTimingPoint),
                link.origin.timing_status
            );
            assert_eq!(Stop::placeholder("2900W0321"), link.destination.stop);
            assert_eq!(Some(Duration::minutes(2)), link.destination.wait_time);
        }

        #[test]
        fn implausible_values() {
            let root: Element = SECTION.parse().unwrap();
            let section =
                JourneyPatternSection::from_element(&root, &stops(), Duration::seconds(10_000))
                    .unwrap();
            let link = &section.timing_links[1];
            assert_eq!(None, link.origin.wait_time);
            assert_eq!(None, link.destination.activity);
        }

        #[test]
        #[should_panic(expected = "Invalid JourneyPatternSection 'JPS1'")]
        fn missing_run_time() {
            let xml = r#"<JourneyPatternSection id="JPS1">
                    <JourneyPatternTimingLink>
                        <From><StopPointRef>A</StopPointRef></From>
                        <To><StopPointRef>B</StopPointRef></To>
                    </JourneyPatternTimingLink>
                </JourneyPatternSection>"#;
            let root: Element = xml.parse().unwrap();
            JourneyPatternSection::from_element(&root, &stops(), Duration::seconds(10_000))
                .unwrap();
        }
    }

    mod journey_pattern {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn known_sections() {
            let root: Element = SECTION.parse().unwrap();
            let section =
                JourneyPatternSection::from_element(&root, &stops(), Duration::seconds(10_000))
                    .unwrap();
            let mut sections = JourneyPatternSections::new();
            sections.insert(section.id.clone(), Rc::new(section));
            let xml = r#"<JourneyPattern id="JP1">
                    <Direction>antiClockwise</Direction>
                    <RouteRef>R1</RouteRef>
                    <JourneyPatternSectionRefs>JPS1</JourneyPatternSectionRefs>
                    <JourneyPatternSectionRefs>JPS2</JourneyPatternSectionRefs>
                </JourneyPattern>"#;
            let root: Element = xml.parse().unwrap();
            let pattern = JourneyPattern::from_element(&root, &sections).unwrap();
            assert_eq!(1, pattern.sections.len());
            assert_eq!(2, pattern.timing_links().count());
            assert!(pattern.is_inbound());
            assert_eq!(Some(String::from("R1")), pattern.route_ref);
        }
    }
}
