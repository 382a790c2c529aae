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

//! Helpers to create a report for faillible processes.
use serde::Serialize;

/// Each report record will be categorized with a type implementing this
/// `ReportCategory` trait.
pub trait ReportCategory: Serialize + PartialEq {}

/// Type of the report of a TransXChange import
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportReportCategory {
    /// A file could not be read or parsed and was skipped.
    FileSkipped,
    /// A vehicle journey whose journey pattern could not be resolved.
    JourneyDropped,
    /// A trip without any known stop.
    TripSkipped,
}

impl ReportCategory for ImportReportCategory {}

/// A report record.
#[derive(Debug, Serialize, PartialEq)]
pub struct ReportRow<R: ReportCategory> {
    /// Kind of problem.
    pub category: R,
    /// Human readable description.
    pub message: String,
}

/// An report is a list of report records with 2 levels of recording: warnings
/// and errors.
#[derive(Debug, Serialize)]
pub struct Report<R: ReportCategory> {
    errors: Vec<ReportRow<R>>,
    warnings: Vec<ReportRow<R>>,
}

impl<R: ReportCategory> Default for Report<R> {
    fn default() -> Self {
        Report {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<R: ReportCategory> Report<R> {
    /// Add a warning report record.
    pub fn add_warning(&mut self, warning: String, warning_type: R) {
        let report_row = ReportRow {
            category: warning_type,
            message: warning,
        };
        if !self.warnings.contains(&report_row) {
            self.warnings.push(report_row);
        }
    }
    /// Add an error report record.
    pub fn add_error(&mut self, error: String, error_type: R) {
        let report_row = ReportRow {
            category: error_type,
            message: error,
        };
        if !self.errors.contains(&report_row) {
            self.errors.push(report_row);
        }
    }
    /// Recorded warnings.
    pub fn warnings(&self) -> &[ReportRow<R>] {
        &self.warnings
    }
    /// Recorded errors.
    pub fn errors(&self) -> &[ReportRow<R>] {
        &self.errors
    }
}
