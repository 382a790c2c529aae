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
//! Settings of the TransXChange reader.

use crate::Result;
use anyhow::Context;
use chrono::Duration;
use serde::Deserialize;
use std::{fs::File, path::Path, path::PathBuf};
use tracing::info;

/// How `NotMonday`, `NotSaturday`... in `DaysOfWeek` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegatedDays {
    /// The token is logged and otherwise ignored.
    Lenient,
    /// `NotX` adds every day of the week except X.
    Strict,
}

impl Default for NegatedDays {
    fn default() -> Self {
        NegatedDays::Lenient
    }
}

fn default_max_wait_time() -> i64 {
    10_000
}

/// Configuration of the TransXChange reader.
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    /// Handling of negated days of the week.
    #[serde(default)]
    pub negated_days: NegatedDays,
    /// Wait times longer than this number of seconds are discarded as bad
    /// data.
    #[serde(default = "default_max_wait_time")]
    pub max_wait_time: i64,
    /// Path to a bank holidays JSON file (as published at
    /// https://www.gov.uk/bank-holidays.json, one region).
    #[serde(default)]
    pub bank_holidays: Option<PathBuf>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            negated_days: NegatedDays::default(),
            max_wait_time: default_max_wait_time(),
            bank_holidays: None,
        }
    }
}

impl ParserConfig {
    /// Longest plausible wait time.
    pub fn max_wait_time(&self) -> Duration {
        Duration::seconds(self.max_wait_time)
    }
}

/// Read a JSON configuration file. Missing fields take their default value
/// and no file at all gives the default configuration.
///
/// Below is an example of this file
/// ```text
/// {
///     "negated_days": "strict",
///     "max_wait_time": 7200,
///     "bank_holidays": "fixtures/bank-holidays.json"
/// }
/// ```
pub fn read_config<P: AsRef<Path>>(config_path: Option<P>) -> Result<ParserConfig> {
    match config_path {
        Some(config_path) => {
            let config_path = config_path.as_ref();
            info!("Reading configuration from {:?}", config_path);
            let json_config_file = File::open(config_path)
                .with_context(|| format!("Error reading {:?}", config_path))?;
            let config = serde_json::from_reader(json_config_file)
                .with_context(|| format!("Error parsing {:?}", config_path))?;
            Ok(config)
        }
        None => Ok(ParserConfig::default()),
    }
}
