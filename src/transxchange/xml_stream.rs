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

//! Pull reader over a TransXChange document. Only the sections of interest
//! are materialized as [Element](minidom::Element), one at a time; the caller
//! drops each of them once it has been decoded.

use minidom::Element;
use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use thiserror::Error;

/// Structural problems found while reading a TransXChange document.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well formed.
    #[error("invalid XML at position {position}: {source}")]
    Xml {
        /// Byte offset in the decoded document.
        position: usize,
        /// Error of the XML reader.
        #[source]
        source: quick_xml::Error,
    },
    /// The bytes cannot be decoded with the given encoding.
    #[error("content is not valid {0}")]
    Encoding(&'static str),
    /// The document ends in the middle of an element.
    #[error("unexpected end of document inside '{0}'")]
    UnexpectedEof(String),
}

impl ParseError {
    /// Whether decoding the same bytes with another encoding may help.
    pub fn is_encoding_related(&self) -> bool {
        match self {
            ParseError::Encoding(_) | ParseError::UnexpectedEof(_) => true,
            ParseError::Xml { source, .. } => matches!(
                source,
                quick_xml::Error::Utf8(_)
                    | quick_xml::Error::UnexpectedEof(_)
                    | quick_xml::Error::EndEventMismatch { .. }
            ),
        }
    }
}

/// Top-level sections extracted from the document. `Services` is not a
/// section by itself: each of its `Service` children is.
pub(crate) const SECTIONS: [&str; 8] = [
    "StopPoints",
    "RouteSections",
    "Routes",
    "JourneyPatternSections",
    "ServicedOrganisations",
    "Operators",
    "Service",
    "VehicleJourneys",
];

pub(crate) struct SectionReader<'a> {
    reader: Reader<&'a [u8]>,
    buf: Vec<u8>,
    root: Option<Element>,
}

impl<'a> SectionReader<'a> {
    pub(crate) fn new(text: &'a str) -> Self {
        let mut reader = Reader::from_str(text);
        reader.trim_text(true);
        SectionReader {
            reader,
            buf: Vec::new(),
            root: None,
        }
    }

    /// The root element, with its attributes but without any child. Only
    /// known once the first section has been requested.
    pub(crate) fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// The next section of interest, in document order.
    pub(crate) fn next_section(&mut self) -> Result<Option<Element>, ParseError> {
        loop {
            let pending = match self.reader.read_event(&mut self.buf) {
                Ok(Event::Start(ref start)) => Some((new_element(start, &self.reader)?, true)),
                Ok(Event::Empty(ref start)) => Some((new_element(start, &self.reader)?, false)),
                Ok(Event::Eof) => return Ok(None),
                Ok(_) => None,
                Err(source) => return Err(xml_error(&self.reader, source)),
            };
            self.buf.clear();
            if let Some((element, has_children)) = pending {
                if self.root.is_none() {
                    self.root = Some(element);
                    continue;
                }
                if SECTIONS.contains(&element.name()) {
                    let element = if has_children {
                        self.read_children(element)?
                    } else {
                        element
                    };
                    return Ok(Some(element));
                }
            }
        }
    }

    fn read_children(&mut self, section: Element) -> Result<Element, ParseError> {
        let mut stack = vec![section];
        let mut buf = Vec::new();
        loop {
            match self.reader.read_event(&mut buf) {
                Ok(Event::Start(ref start)) => stack.push(new_element(start, &self.reader)?),
                Ok(Event::Empty(ref start)) => {
                    let child = new_element(start, &self.reader)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.append_child(child);
                    }
                }
                Ok(Event::Text(ref text)) => {
                    let text = text
                        .unescape_and_decode(&self.reader)
                        .map_err(|source| xml_error(&self.reader, source))?;
                    if let Some(parent) = stack.last_mut() {
                        parent.append_text_node(text);
                    }
                }
                Ok(Event::CData(ref text)) => {
                    let text = String::from_utf8_lossy(text.escaped()).into_owned();
                    if let Some(parent) = stack.last_mut() {
                        parent.append_text_node(text);
                    }
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => {
                                parent.append_child(element);
                            }
                            None => return Ok(element),
                        }
                    }
                }
                Ok(Event::Eof) => {
                    let name = stack
                        .first()
                        .map(|element| element.name().to_string())
                        .unwrap_or_default();
                    return Err(ParseError::UnexpectedEof(name));
                }
                Ok(_) => {}
                Err(source) => return Err(xml_error(&self.reader, source)),
            }
            buf.clear();
        }
    }
}

fn xml_error(reader: &Reader<&[u8]>, source: quick_xml::Error) -> ParseError {
    ParseError::Xml {
        position: reader.buffer_position(),
        source,
    }
}

// Namespaces are dropped: TransXChange documents use a single default
// namespace and elements are looked up by local name.
fn new_element(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<Element, ParseError> {
    let name = String::from_utf8_lossy(start.local_name()).into_owned();
    let mut builder = Element::builder(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|source| xml_error(reader, source))?;
        let key = String::from_utf8_lossy(attribute.key).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let key = match key.rfind(':') {
            Some(index) => key[index + 1..].to_string(),
            None => key,
        };
        let value = attribute
            .unescape_and_decode_value(reader)
            .map_err(|source| xml_error(reader, source))?;
        builder = builder.attr(key, value);
    }
    Ok(builder.build())
}
