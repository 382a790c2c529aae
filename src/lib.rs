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

//! The `txc_timetable` crate reads UK bus schedules published as
//! [TransXChange](http://www.transxchange.org.uk/) and turns them into:
//! - calendars of operating days,
//! - ordered stop times for every scheduled trip,
//! - rendering-ready timetables where trips are columns and stops are rows.

#![deny(missing_docs)]

pub mod calendars;
pub mod configuration;
mod minidom_utils;
pub mod objects;
pub mod report;
mod serde_utils;
pub mod timetable;
pub mod transxchange;

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T> = std::result::Result<T, Error>;

pub use crate::timetable::Timetable;
pub use crate::transxchange::TransXChange;
