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

use super::{
    encoding,
    journey_patterns::{JourneyPatternSection, JourneyPatternSections, Stops},
    operating_profile::parse_date,
    routes::{Route, RouteSection},
    serviced_organisations::{ServicedOrganisation, ServicedOrganisations},
    services::{Operator, Service},
    vehicle_journeys::{resolve_journey_patterns, VehicleJourney},
    xml_stream::{ParseError, SectionReader},
};
use crate::{
    configuration::ParserConfig,
    minidom_utils::{ChildText, TryAttribute},
    objects::{Date, Stop},
    report::{ImportReportCategory, Report},
    Result,
};
use anyhow::{bail, Context};
use encoding_rs::Encoding;
use minidom::Element;
use skip_error::skip_error_and_warn;
use std::{
    collections::HashMap,
    fs::{self, File},
    io::Read,
    path::Path,
    rc::Rc,
};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::ZipArchive;

/// A parsed TransXChange document.
#[derive(Debug, Default)]
pub struct TransXChange {
    /// `FileName` attribute of the root element.
    pub file_name: Option<String>,
    /// Modification date of the document, else its creation date.
    pub transxchange_date: Option<Date>,
    /// Stops declared by the document, by ATCO code.
    pub stops: Stops,
    /// Route sections, by id.
    pub route_sections: HashMap<String, RouteSection>,
    /// Routes, by id.
    pub routes: HashMap<String, Route>,
    /// Journey pattern sections, by id.
    pub journey_pattern_sections: JourneyPatternSections,
    /// Serviced organisations, by code.
    pub serviced_organisations: ServicedOrganisations,
    /// Operators, by id.
    pub operators: HashMap<String, Operator>,
    /// Services, by code.
    pub services: HashMap<String, Service>,
    /// Vehicle journeys with a journey pattern, in document order.
    pub journeys: Vec<VehicleJourney>,
    /// Codes of the vehicle journeys dropped for lack of a journey pattern.
    pub dropped_journeys: Vec<String>,
}

fn is_encoding_related(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<ParseError>()
            .map_or(false, ParseError::is_encoding_related)
    })
}

fn stop_from_element(element: &Element) -> Result<Stop> {
    match element.name() {
        "StopPoint" => Ok(Stop {
            atco_code: element.try_find_text("AtcoCode")?,
            common_name: element.find_non_empty_text("Descriptor/CommonName"),
            locality: element.find_non_empty_text("Place/LocalityName"),
        }),
        _ => Ok(Stop {
            atco_code: element.try_find_text("StopPointRef")?,
            common_name: element.find_non_empty_text("CommonName"),
            locality: element.find_non_empty_text("LocalityName"),
        }),
    }
}

fn check_root(root: Option<&Element>) -> Result<&Element> {
    match root {
        Some(root) if root.name() == "TransXChange" => Ok(root),
        Some(root) => bail!("Root element '{}' is not 'TransXChange'", root.name()),
        None => bail!("Document is empty"),
    }
}

impl TransXChange {
    /// Parse raw bytes. The encoding is found from the byte order mark or the
    /// XML declaration; when the content does not decode or ends too early,
    /// a second attempt is made with a statistically detected encoding.
    pub fn from_bytes(bytes: &[u8], config: &ParserConfig) -> Result<Self> {
        let encoding = encoding::sniff(bytes);
        match Self::parse(bytes, encoding, config) {
            Err(error) if is_encoding_related(&error) => {
                let detected = encoding::detect(bytes);
                if detected == encoding {
                    return Err(error);
                }
                warn!(
                    "Failed to read document as {}, retrying as {}: {}",
                    encoding.name(),
                    detected.name(),
                    error
                );
                Self::parse(bytes, detected, config)
            }
            result => result,
        }
    }

    fn parse(bytes: &[u8], encoding: &'static Encoding, config: &ParserConfig) -> Result<Self> {
        let text = encoding::decode(bytes, encoding)?;
        Self::from_str(&text, config)
    }

    /// Parse a decoded document. Sections are read one at a time, so that
    /// only the section being processed is held as a tree.
    pub fn from_str(text: &str, config: &ParserConfig) -> Result<Self> {
        let mut reader = SectionReader::new(text);
        let mut transxchange = TransXChange::default();
        let mut has_serviced_organisations = false;
        let mut journeys: Vec<VehicleJourney> = Vec::new();
        let mut journey_indexes: HashMap<String, usize> = HashMap::new();
        let max_wait_time = config.max_wait_time();
        let mut root_checked = false;

        while let Some(section) = reader.next_section()? {
            if !root_checked {
                check_root(reader.root())?;
                root_checked = true;
            }
            match section.name() {
                "StopPoints" => {
                    for stop in section.children() {
                        let stop = skip_error_and_warn!(stop_from_element(stop));
                        transxchange.stops.insert(stop.atco_code.clone(), stop);
                    }
                }
                "RouteSections" => {
                    for route_section in section.find_all("RouteSection") {
                        let route_section =
                            skip_error_and_warn!(RouteSection::from_element(route_section));
                        transxchange
                            .route_sections
                            .insert(route_section.id.clone(), route_section);
                    }
                }
                "Routes" => {
                    for route in section.find_all("Route") {
                        let route = skip_error_and_warn!(Route::from_element(route));
                        transxchange.routes.insert(route.id.clone(), route);
                    }
                }
                "JourneyPatternSections" => {
                    for journey_pattern_section in section.find_all("JourneyPatternSection") {
                        let journey_pattern_section =
                            skip_error_and_warn!(JourneyPatternSection::from_element(
                                journey_pattern_section,
                                &transxchange.stops,
                                max_wait_time,
                            ));
                        if journey_pattern_section.timing_links.is_empty() {
                            debug!(
                                "JourneyPatternSection '{}' has no timing link",
                                journey_pattern_section.id
                            );
                            continue;
                        }
                        transxchange.journey_pattern_sections.insert(
                            journey_pattern_section.id.clone(),
                            Rc::new(journey_pattern_section),
                        );
                    }
                }
                "ServicedOrganisations" => {
                    has_serviced_organisations = true;
                    for organisation in section.find_all("ServicedOrganisation") {
                        let organisation =
                            skip_error_and_warn!(ServicedOrganisation::from_element(organisation));
                        transxchange
                            .serviced_organisations
                            .insert(organisation.code.clone(), Rc::new(organisation));
                    }
                }
                "Operators" => {
                    for operator in section.children() {
                        let operator = Operator::from_element(operator);
                        match operator.id.clone().or_else(|| operator.code.clone()) {
                            Some(id) => {
                                transxchange.operators.insert(id, operator);
                            }
                            None => warn!("Operator without id nor code is ignored"),
                        }
                    }
                }
                "Service" => {
                    let serviced_organisations = if has_serviced_organisations {
                        Some(&transxchange.serviced_organisations)
                    } else {
                        None
                    };
                    let service = Service::from_element(
                        &section,
                        serviced_organisations,
                        &transxchange.journey_pattern_sections,
                        config,
                    )?;
                    transxchange
                        .services
                        .insert(service.service_code.clone(), service);
                }
                "VehicleJourneys" => {
                    let serviced_organisations = if has_serviced_organisations {
                        Some(&transxchange.serviced_organisations)
                    } else {
                        None
                    };
                    for journey in section.find_all("VehicleJourney") {
                        let journey =
                            VehicleJourney::from_element(journey, serviced_organisations, config)?;
                        match journey_indexes.get(&journey.code) {
                            Some(&index) => {
                                debug!("VehicleJourney '{}' is declared twice", journey.code);
                                journeys[index] = journey;
                            }
                            None => {
                                journey_indexes.insert(journey.code.clone(), journeys.len());
                                journeys.push(journey);
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let root = check_root(reader.root())?;
        transxchange.file_name = root.attribute("FileName");
        transxchange.transxchange_date = ["CreationDateTime", "ModificationDateTime"]
            .iter()
            .filter_map(|name| root.attr(name))
            .filter_map(|date| parse_date(date).ok())
            .max();

        let (journeys, dropped_journeys) =
            resolve_journey_patterns(journeys, &transxchange.services);
        transxchange.journeys = journeys;
        transxchange.dropped_journeys = dropped_journeys;
        Ok(transxchange)
    }

    /// Journeys of a line of a service, in document order.
    pub fn get_journeys<'a>(
        &'a self,
        service_code: &'a str,
        line_id: &'a str,
    ) -> impl Iterator<Item = &'a VehicleJourney> + 'a {
        self.journeys.iter().filter(move |journey| {
            journey.service_ref == service_code && journey.line_ref == line_id
        })
    }
}

fn is_xml(file_name: &Path) -> bool {
    file_name
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("xml"))
}

fn read_document(
    bytes: &[u8],
    file_name: &str,
    config: &ParserConfig,
    documents: &mut Vec<TransXChange>,
    report: &mut Report<ImportReportCategory>,
) {
    info!("reading TransXChange file {:?}", file_name);
    match TransXChange::from_bytes(bytes, config) {
        Ok(transxchange) => {
            for code in &transxchange.dropped_journeys {
                report.add_warning(
                    format!(
                        "VehicleJourney '{}' of {:?} has no journey pattern",
                        code, file_name
                    ),
                    ImportReportCategory::JourneyDropped,
                );
            }
            documents.push(transxchange);
        }
        Err(error) => {
            warn!("skipping file {:?}: {:?}", file_name, error);
            report.add_error(
                format!("{:?}: {:#}", file_name, error),
                ImportReportCategory::FileSkipped,
            );
        }
    }
}

/// Read every `.xml` file of a ZIP archive. Files that fail to parse are
/// skipped and reported.
pub fn read_from_zip<P>(
    transxchange_path: P,
    config: &ParserConfig,
) -> Result<(Vec<TransXChange>, Report<ImportReportCategory>)>
where
    P: AsRef<Path>,
{
    let transxchange_path = transxchange_path.as_ref();
    let zip_file = File::open(transxchange_path)
        .with_context(|| format!("Error reading {:?}", transxchange_path))?;
    let mut zip_archive = ZipArchive::new(zip_file)?;
    let mut documents = Vec::new();
    let mut report = Report::default();
    for index in 0..zip_archive.len() {
        let mut file = zip_archive.by_index(index)?;
        let file_name = file.name().to_string();
        if !file.is_file() || !is_xml(Path::new(&file_name)) {
            info!("skipping file in zip: {:?}", file_name);
            continue;
        }
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Error reading {:?} in {:?}", file_name, transxchange_path))?;
        read_document(&bytes, &file_name, config, &mut documents, &mut report);
    }
    Ok((documents, report))
}

/// Read every `.xml` file under a directory, in file name order. Files that
/// fail to parse are skipped and reported.
pub fn read_from_path<P>(
    transxchange_path: P,
    config: &ParserConfig,
) -> Result<(Vec<TransXChange>, Report<ImportReportCategory>)>
where
    P: AsRef<Path>,
{
    let mut documents = Vec::new();
    let mut report = Report::default();
    for entry in WalkDir::new(transxchange_path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if !is_xml(path) {
            info!("skipping file: {:?}", path);
            continue;
        }
        let file_name = path.to_string_lossy();
        match fs::read(path) {
            Ok(bytes) => read_document(&bytes, &file_name, config, &mut documents, &mut report),
            Err(error) => {
                warn!("skipping file {:?}: {}", path, error);
                report.add_error(
                    format!("{:?}: {}", file_name, error),
                    ImportReportCategory::FileSkipped,
                );
            }
        }
    }
    Ok((documents, report))
}
