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

//! Module to handle TransXChange model
//! http://www.transxchange.org.uk/
//!
//! A document is read section by section (stops, routes, journey pattern
//! sections, serviced organisations, operators, services and vehicle
//! journeys). Journey patterns of vehicle journeys are resolved once the
//! whole document has been read.

pub mod bank_holidays;
mod encoding;
pub mod journey_patterns;
pub mod naptan;
pub mod operating_profile;
mod read;
pub mod routes;
pub mod serviced_organisations;
pub mod services;
pub mod times;
pub mod trips;
pub mod vehicle_journeys;
mod xml_stream;

pub use read::{read_from_path, read_from_zip, TransXChange};
pub use xml_stream::ParseError;
