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

//! Routes of a TransXChange document, with the geometry of their links.

use crate::{
    minidom_utils::{ChildText, TryAttribute},
    Result,
};
use anyhow::Context;
use geo::{Coord, LineString};
use minidom::Element;
use tracing::warn;

/// Geometry of the way between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLink {
    /// Identifier of the link.
    pub id: Option<String>,
    /// Track as WGS84 longitude/latitude points.
    pub track: LineString<f64>,
}

impl RouteLink {
    pub(crate) fn from_element(element: &Element) -> Self {
        let id = element.attribute("id");
        let mut locations = element.find_all("Track/Mapping/Location/Translation");
        if locations.is_empty() {
            locations = element.find_all("Track/Mapping/Location");
        }
        let mut points = Vec::with_capacity(locations.len());
        for location in locations {
            match location_to_coord(location) {
                Ok(coord) => points.push(coord),
                Err(e) => warn!("Location ignored in RouteLink {:?}: {:?}", id, e),
            }
        }
        RouteLink {
            id,
            track: LineString::new(points),
        }
    }
}

fn location_to_coord(location: &Element) -> Result<Coord<f64>> {
    let coordinate = |name: &str| -> Result<f64> {
        let text = location.try_find_text(name)?;
        text.parse()
            .with_context(|| format!("Failed to parse '{}' as a {}", text, name))
    };
    Ok(Coord {
        x: coordinate("Longitude")?,
        y: coordinate("Latitude")?,
    })
}

/// An ordered list of route links.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSection {
    /// Identifier of the section.
    pub id: String,
    /// Route links in order.
    pub links: Vec<RouteLink>,
}

impl RouteSection {
    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        Ok(RouteSection {
            id: element.try_attribute("id")?,
            links: element
                .find_all("RouteLink")
                .into_iter()
                .map(RouteLink::from_element)
                .collect(),
        })
    }
}

/// A route, referencing its sections.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Identifier of the route.
    pub id: String,
    /// Description of the route.
    pub description: Option<String>,
    /// References of the route sections, in order.
    pub route_section_refs: Vec<String>,
}

impl Route {
    pub(crate) fn from_element(element: &Element) -> Result<Self> {
        Ok(Route {
            id: element.try_attribute("id")?,
            description: element.find_non_empty_text("Description"),
            route_section_refs: element
                .find_all("RouteSectionRef")
                .into_iter()
                .map(|section_ref| section_ref.text().trim().to_string())
                .collect(),
        })
    }
}
