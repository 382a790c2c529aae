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

use crate::Result;
use anyhow::bail;
use minidom::Element;

/// Lookups of optional descendants. TransXChange files are lax about
/// repeated elements so the first match wins.
pub trait ChildText {
    /// First descendant following a `/` separated path of element names.
    fn find(&self, path: &str) -> Option<&Self>;

    /// Every descendant matching the last step of a `/` separated path.
    fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Self>;

    /// Trimmed text of the first descendant following a path, absent if the
    /// element is missing.
    fn find_text(&self, path: &str) -> Option<String>;

    /// Like [find_text](ChildText::find_text) but empty texts are absent.
    fn find_non_empty_text(&self, path: &str) -> Option<String> {
        self.find_text(path).filter(|text| !text.is_empty())
    }

    /// Trimmed text of a mandatory descendant.
    fn try_find_text(&self, path: &str) -> Result<String>;
}

impl ChildText for Element {
    fn find(&self, path: &str) -> Option<&Self> {
        path.split('/').try_fold(self, |element, name| {
            element.children().find(|child| child.name() == name)
        })
    }

    fn find_all<'a>(&'a self, path: &str) -> Vec<&'a Self> {
        let mut elements = vec![self];
        for name in path.split('/') {
            elements = elements
                .into_iter()
                .flat_map(|element| element.children().filter(move |child| child.name() == name))
                .collect();
        }
        elements
    }

    fn find_text(&self, path: &str) -> Option<String> {
        self.find(path).map(|element| element.text().trim().to_string())
    }

    fn try_find_text(&self, path: &str) -> Result<String> {
        match self.find_text(path) {
            Some(text) => Ok(text),
            None => bail!("Failed to find '{}' in element '{}'", path, self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod child_text {
        use super::*;
        use pretty_assertions::assert_eq;

        fn operational() -> Element {
            r#"<VehicleJourney>
                <Operational>
                    <Block><BlockNumber> 12 </BlockNumber></Block>
                    <TicketMachine><JourneyCode></JourneyCode></TicketMachine>
                </Operational>
                <Note><NoteCode>A</NoteCode></Note>
                <Note><NoteCode>B</NoteCode></Note>
            </VehicleJourney>"#
                .parse()
                .unwrap()
        }

        #[test]
        fn nested_path() {
            let root = operational();
            assert_eq!(
                Some(String::from("12")),
                root.find_text("Operational/Block/BlockNumber")
            );
        }

        #[test]
        fn missing_path() {
            let root = operational();
            assert_eq!(None, root.find_text("Operational/Garage/GarageCode"));
        }

        #[test]
        fn empty_text() {
            let root = operational();
            assert_eq!(
                Some(String::new()),
                root.find_text("Operational/TicketMachine/JourneyCode")
            );
            assert_eq!(
                None,
                root.find_non_empty_text("Operational/TicketMachine/JourneyCode")
            );
        }

        #[test]
        fn all_matches() {
            let root = operational();
            let codes: Vec<String> = root
                .find_all("Note/NoteCode")
                .into_iter()
                .map(Element::text)
                .collect();
            assert_eq!(vec!["A", "B"], codes);
        }

        #[test]
        #[should_panic(expected = "Failed to find 'LineRef' in element 'VehicleJourney'")]
        fn mandatory() {
            operational().try_find_text("LineRef").unwrap();
        }
    }
}
