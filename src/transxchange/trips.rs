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

//! Trips and calendars of the vehicle journeys of a document.

use super::{bank_holidays::BankHolidays, vehicle_journeys::VehicleJourney, TransXChange};
use crate::{
    calendars::Calendar,
    objects::{StopDirectory, StopTime, Trip},
    report::{ImportReportCategory, Report},
};
use tracing::debug;

/// Turn a resolved vehicle journey into a [`Trip`]. Stops unknown to the
/// directory are skipped, the time spent reaching them is kept. The first
/// stop has no arrival and the last one no departure, unless there is a
/// single stop. Returns `None` when no stop is left.
pub fn to_trip<D>(journey: &VehicleJourney, calendar: Option<String>, stops: &D) -> Option<Trip>
where
    D: StopDirectory + ?Sized,
{
    let mut stop_times: Vec<StopTime> = Vec::new();
    for cell in journey.times() {
        let atco_code = &cell.stop_usage.stop.atco_code;
        let stop = match stops.get_stop(atco_code) {
            Some(stop) => stop.clone(),
            None => {
                debug!(
                    "Stop '{}' of VehicleJourney '{}' is unknown",
                    atco_code, journey.code
                );
                continue;
            }
        };
        stop_times.push(StopTime {
            stop,
            sequence: stop_times.len() as u32 + 1,
            arrival: Some(cell.arrival),
            departure: Some(cell.departure),
            activity: cell.stop_usage.activity,
            timing_status: cell.stop_usage.timing_status,
        });
    }
    let start = stop_times.first()?.departure;
    let end = stop_times.last()?.arrival;
    let destination = stop_times.last().map(|last| last.stop.atco_code.clone());
    if stop_times.len() > 1 {
        if let Some(first) = stop_times.first_mut() {
            first.arrival = None;
        }
        if let Some(last) = stop_times.last_mut() {
            last.departure = None;
        }
    }

    let pattern = journey.journey_pattern.as_ref();
    Some(Trip {
        id: journey.code.clone(),
        service: journey.service_ref.clone(),
        calendar,
        journey_pattern: pattern.map(|pattern| pattern.id.clone()),
        destination,
        inbound: pattern.map_or(false, |pattern| pattern.is_inbound()),
        start: start.unwrap_or(journey.departure_time),
        end: end.unwrap_or(journey.departure_time),
        block: journey.block.clone(),
        ticket_machine_code: journey.ticket_machine_code.clone(),
        notes: journey.notes.clone(),
        stop_times,
    })
}

/// Trips of every journey of a document, with their calendars. Journeys
/// running on the same days share a calendar. Journeys of an unknown service,
/// or without any known stop, are skipped and reported.
pub fn to_trips<D>(
    transxchange: &TransXChange,
    stops: &D,
    bank_holidays: &BankHolidays,
    report: &mut Report<ImportReportCategory>,
) -> (Vec<Trip>, Vec<Calendar>)
where
    D: StopDirectory + ?Sized,
{
    let mut calendars: Vec<Calendar> = Vec::new();
    let mut trips = Vec::new();
    for journey in &transxchange.journeys {
        let service = match transxchange.services.get(&journey.service_ref) {
            Some(service) => service,
            None => {
                report.add_warning(
                    format!(
                        "VehicleJourney '{}' of {:?} references an unknown Service '{}'",
                        journey.code, transxchange.file_name, journey.service_ref
                    ),
                    ImportReportCategory::TripSkipped,
                );
                continue;
            }
        };
        let operating_profile = journey
            .operating_profile
            .as_ref()
            .or_else(|| service.operating_profile.as_ref());
        let calendar = Calendar::from_operating_profile(
            &format!("{}:{}", service.service_code, calendars.len() + 1),
            service.operating_period.0,
            operating_profile,
            bank_holidays,
        );
        let existing = calendars
            .iter()
            .find(|existing| calendar.clone().with_id(&existing.id) == **existing)
            .map(|existing| existing.id.clone());
        let calendar_id = existing.clone().unwrap_or_else(|| calendar.id.clone());
        match to_trip(journey, Some(calendar_id), stops) {
            Some(trip) => {
                if existing.is_none() {
                    calendars.push(calendar);
                }
                trips.push(trip);
            }
            None => report.add_warning(
                format!(
                    "VehicleJourney '{}' of {:?} has no known stop",
                    journey.code, transxchange.file_name
                ),
                ImportReportCategory::TripSkipped,
            ),
        }
    }
    (trips, calendars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        configuration::ParserConfig,
        objects::Stop,
        transxchange::TransXChange,
    };
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <TransXChange xmlns="http://www.transxchange.org.uk/" CreationDateTime="2020-06-01T12:00:00">
            <JourneyPatternSections>
                <JourneyPatternSection id="JPS1">
                    <JourneyPatternTimingLink id="L1">
                        <From><StopPointRef>A</StopPointRef></From>
                        <To><StopPointRef>B</StopPointRef></To>
                        <RunTime>PT5M</RunTime>
                    </JourneyPatternTimingLink>
                    <JourneyPatternTimingLink id="L2">
                        <From><StopPointRef>B</StopPointRef></From>
                        <To><StopPointRef>C</StopPointRef><Activity>setDown</Activity></To>
                        <RunTime>PT10M</RunTime>
                    </JourneyPatternTimingLink>
                </JourneyPatternSection>
            </JourneyPatternSections>
            <Services>
                <Service>
                    <ServiceCode>S1</ServiceCode>
                    <Lines><Line id="L1"><LineName>1</LineName></Line></Lines>
                    <OperatingPeriod><StartDate>2020-06-01</StartDate></OperatingPeriod>
                    <StandardService>
                        <JourneyPattern id="JP1">
                            <Direction>inbound</Direction>
                            <JourneyPatternSectionRefs>JPS1</JourneyPatternSectionRefs>
                        </JourneyPattern>
                    </StandardService>
                </Service>
            </Services>
            <VehicleJourneys>
                <VehicleJourney>
                    <VehicleJourneyCode>VJ1</VehicleJourneyCode>
                    <ServiceRef>S1</ServiceRef>
                    <LineRef>L1</LineRef>
                    <JourneyPatternRef>JP1</JourneyPatternRef>
                    <DepartureTime>07:30:00</DepartureTime>
                </VehicleJourney>
            </VehicleJourneys>
        </TransXChange>"#;

    fn directory(codes: &[&str]) -> HashMap<String, Stop> {
        codes
            .iter()
            .map(|code| (code.to_string(), Stop::placeholder(*code)))
            .collect()
    }

    #[test]
    fn all_stops_known() {
        let transxchange = TransXChange::from_str(DOCUMENT, &ParserConfig::default()).unwrap();
        let trip = to_trip(
            &transxchange.journeys[0],
            Some(String::from("C1")),
            &directory(&["A", "B", "C"]),
        )
        .unwrap();
        assert_eq!("VJ1", trip.id);
        assert_eq!("S1", trip.service);
        assert!(trip.inbound);
        assert_eq!(Some(String::from("C")), trip.destination);
        assert_eq!(Duration::minutes(450), trip.start);
        assert_eq!(Duration::minutes(465), trip.end);
        assert_eq!(3, trip.stop_times.len());
        assert_eq!(None, trip.stop_times[0].arrival);
        assert_eq!(Some(Duration::minutes(455)), trip.stop_times[1].arrival);
        assert_eq!(None, trip.stop_times[2].departure);
    }

    #[test]
    fn unknown_stop_still_takes_time() {
        let transxchange = TransXChange::from_str(DOCUMENT, &ParserConfig::default()).unwrap();
        let trip = to_trip(&transxchange.journeys[0], None, &directory(&["A", "C"])).unwrap();
        let stops: Vec<&str> = trip.stop_times.iter().map(StopTime::get_key).collect();
        assert_eq!(vec!["A", "C"], stops);
        assert_eq!(2, trip.stop_times[1].sequence);
        assert_eq!(Duration::minutes(465), trip.end);
    }

    #[test]
    fn no_known_stop() {
        let transxchange = TransXChange::from_str(DOCUMENT, &ParserConfig::default()).unwrap();
        assert_eq!(None, to_trip(&transxchange.journeys[0], None, &directory(&[])));
    }

    #[test]
    fn trips_with_calendars() {
        let transxchange = TransXChange::from_str(DOCUMENT, &ParserConfig::default()).unwrap();
        let mut report = Report::default();
        let (trips, calendars) = to_trips(
            &transxchange,
            &directory(&["A", "B", "C"]),
            &BankHolidays::default(),
            &mut report,
        );
        assert!(report.warnings().is_empty());
        assert_eq!(1, trips.len());
        assert_eq!(1, calendars.len());
        assert_eq!(Some(String::from("S1:1")), trips[0].calendar);
        assert_eq!("Every day", calendars[0].describe());

        let (trips, _) = to_trips(
            &transxchange,
            &directory(&[]),
            &BankHolidays::default(),
            &mut report,
        );
        assert!(trips.is_empty());
        assert_eq!(ImportReportCategory::TripSkipped, report.warnings()[0].category);
    }

    #[test]
    fn no_calendar_without_trip() {
        let transxchange = TransXChange::from_str(DOCUMENT, &ParserConfig::default()).unwrap();
        let (trips, calendars) = to_trips(
            &transxchange,
            &directory(&["X"]),
            &BankHolidays::default(),
            &mut Report::default(),
        );
        assert!(trips.is_empty());
        assert!(calendars.is_empty());
    }
}
