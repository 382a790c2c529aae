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

//! Module to help parsing and reading NaPTAN files
//! https://en.wikipedia.org/wiki/NaPTAN

use crate::{objects::Stop, Result};
use anyhow::Context;
use serde::Deserialize;
use std::{collections::HashMap, fs::File, io::Read, path::Path};
use tracing::info;
use zip::ZipArchive;

#[derive(Debug, Deserialize)]
struct NaptanStop {
    #[serde(rename = "ATCOCode")]
    atco_code: String,
    #[serde(rename = "CommonName")]
    common_name: String,
    #[serde(rename = "LocalityName", default)]
    locality_name: String,
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read the stops of a NaPTAN `Stops.csv`, by ATCO code.
pub fn read_stops<R>(reader: R) -> Result<HashMap<String, Stop>>
where
    R: Read,
{
    csv::ReaderBuilder::new()
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(reader)
        .deserialize()
        .map(|record: csv::Result<NaptanStop>| {
            let stop = record.context("Error parsing the CSV record into a Stop")?;
            Ok((
                stop.atco_code.clone(),
                Stop {
                    atco_code: stop.atco_code,
                    common_name: non_empty(stop.common_name),
                    locality: non_empty(stop.locality_name),
                },
            ))
        })
        .collect()
}

const STOPS_FILENAME: &str = "Stops.csv";

/// Read the NaPTAN stops, either from a ZIP archive containing a
/// `Stops.csv` or from the CSV file itself.
pub fn read_naptan<P>(naptan_path: P) -> Result<HashMap<String, Stop>>
where
    P: AsRef<Path>,
{
    let naptan_path = naptan_path.as_ref();
    let file = File::open(naptan_path)
        .with_context(|| format!("Error reading {:?}", naptan_path))?;
    let is_zip = naptan_path
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("zip"));
    info!("reading NaPTAN file for {}", STOPS_FILENAME);
    let stops = if is_zip {
        let mut zip_archive = ZipArchive::new(file)?;
        let stops = zip_archive
            .by_name(STOPS_FILENAME)
            .with_context(|| format!("Failed to find {} in {:?}", STOPS_FILENAME, naptan_path))?;
        read_stops(stops)?
    } else {
        read_stops(file)?
    };
    info!("{} stops read from {:?}", stops.len(), naptan_path);
    Ok(stops)
}
