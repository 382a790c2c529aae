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

//! Module to handle Bank Holidays in UK
//! The data structure is based on the JSON provided by the UK government at
//! https://www.gov.uk/bank-holidays.json

use crate::{configuration::ParserConfig, objects::Date, Result};
use anyhow::Context;
use chrono::Datelike;
use serde::Deserialize;
use std::{
    collections::{BTreeSet, HashMap},
    fs::File,
    path::Path,
};
use tracing::warn;

#[derive(Debug, Deserialize)]
struct BankHolidayRegion {
    events: Vec<BankHolidayEvent>,
}

fn date_from_string<'de, D>(deserializer: D) -> std::result::Result<Date, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;

    Date::parse_from_str(&s, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

fn bank_holiday_from_string<'de, D>(deserializer: D) -> std::result::Result<BankHoliday, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let title = String::deserialize(deserializer)?;
    use BankHoliday::*;
    // All of the following are equivalent and should be `BankHoliday::EarlyMay`
    // - "Early May bank holiday"
    // - "Early May bank holiday (VE Day)"
    // Therefore, we trim anything that is in parenthesis at the end
    let parenthesis_offset = title.find('(').unwrap_or_else(|| title.len());
    let day = match title[0..parenthesis_offset].trim() {
        "New Year’s Day" => NewYearHoliday,
        "2nd January" => JanuarySecondHoliday,
        "St Patrick’s Day" => SaintPatrick,
        "Good Friday" => GoodFriday,
        "Easter Monday" => EasterMonday,
        "Early May bank holiday" => EarlyMay,
        "Spring bank holiday" => Spring,
        "Battle of the Boyne" => BattleOfTheBoyne,
        "Summer bank holiday" => Summer,
        "St Andrew’s Day" => SaintAndrewsHoliday,
        "Christmas Day" => ChristmasHoliday,
        "Boxing Day" => BoxingDayHoliday,
        title => {
            warn!("'{}' is not a known bank holiday, considered as exceptional", title);
            Exceptional
        }
    };
    Ok(day)
}

#[derive(Debug, Deserialize)]
struct BankHolidayEvent {
    #[serde(deserialize_with = "bank_holiday_from_string")]
    title: BankHoliday,
    #[serde(deserialize_with = "date_from_string")]
    date: Date,
}

/// A bank holiday as named in TransXChange `BankHolidayOperation`.
#[derive(Clone, Copy, Debug, Ord, PartialOrd, PartialEq, Eq, Hash)]
pub enum BankHoliday {
    /// 1st of January
    NewYear,
    /// Bank Holiday for New Year, not necessarily on the 1st of January
    NewYearHoliday,
    /// 2nd of January (Scotland)
    JanuarySecond,
    /// Bank Holiday for January Second, not necessarily on the 2nd of January
    JanuarySecondHoliday,
    /// 17th of March (Northern Ireland)
    SaintPatrick,
    /// Friday before Easter
    GoodFriday,
    /// Monday after Easter
    EasterMonday,
    /// First Monday of May
    EarlyMay,
    /// Last Monday of May
    Spring,
    /// 12th of July (Northern Ireland)
    BattleOfTheBoyne,
    /// First (Scotland) or last Monday of August
    Summer,
    /// 30th of November (Scotland)
    SaintAndrews,
    /// Bank Holiday for Saint Andrews, not necessarily on the 30th of November
    SaintAndrewsHoliday,
    /// 24th of December
    ChristmasEve,
    /// 25th of December
    Christmas,
    /// Bank Holiday for Christmas, not necessarily on the 25th of December
    ChristmasHoliday,
    /// 26th of December
    BoxingDay,
    /// Bank Holiday for Boxing Day, not necessarily on the 26th of December
    BoxingDayHoliday,
    /// 31st of December
    NewYearEve,
    /// One-off bank holidays (jubilees, coronations, state funerals...)
    Exceptional,
}

impl BankHoliday {
    /// Bank holidays designated by a TransXChange element name. Some names
    /// are groups of bank holidays; unknown names give `None`.
    pub fn from_tag(tag: &str) -> Option<Vec<BankHoliday>> {
        use BankHoliday::*;
        let holidays = match tag {
            "AllBankHolidays" => vec![
                NewYear,
                JanuarySecond,
                GoodFriday,
                SaintAndrews,
                EasterMonday,
                EarlyMay,
                Spring,
                Summer,
                Christmas,
                BoxingDay,
                NewYearHoliday,
                JanuarySecondHoliday,
                SaintAndrewsHoliday,
                ChristmasHoliday,
                BoxingDayHoliday,
                Exceptional,
            ],
            "EarlyRunOff" => vec![ChristmasEve, NewYearEve],
            "AllHolidaysExceptChristmas" => vec![
                NewYear,
                JanuarySecond,
                GoodFriday,
                SaintAndrews,
                EasterMonday,
                EarlyMay,
                Spring,
                Summer,
            ],
            "Holidays" => vec![NewYear, JanuarySecond, GoodFriday, SaintAndrews],
            "HolidayMondays" => vec![EasterMonday, EarlyMay, Spring, Summer],
            "Christmas" => vec![Christmas, BoxingDay],
            "DisplacementHolidays" => vec![
                NewYearHoliday,
                JanuarySecondHoliday,
                SaintAndrewsHoliday,
                ChristmasHoliday,
                BoxingDayHoliday,
            ],
            "NewYearsDay" => vec![NewYear],
            "Jan2ndScotland" => vec![JanuarySecond],
            "GoodFriday" => vec![GoodFriday],
            "StAndrewsDay" => vec![SaintAndrews],
            "EasterMonday" => vec![EasterMonday],
            "MayDay" => vec![EarlyMay],
            "SpringBank" => vec![Spring],
            "AugustBankHolidayScotland" | "LateSummerBankHolidayNotScotland" => vec![Summer],
            "ChristmasEve" => vec![ChristmasEve],
            "ChristmasDay" => vec![Christmas],
            "BoxingDay" => vec![BoxingDay],
            "NewYearsEve" => vec![NewYearEve],
            "NewYearsDayHoliday" => vec![NewYearHoliday],
            "Jan2ndScotlandHoliday" => vec![JanuarySecondHoliday],
            "StAndrewsDayHoliday" => vec![SaintAndrewsHoliday],
            "ChristmasDayHoliday" => vec![ChristmasHoliday],
            "BoxingDayHoliday" => vec![BoxingDayHoliday],
            _ => return None,
        };
        Some(holidays)
    }

    fn fixed_day(self) -> Option<(u32, u32)> {
        use BankHoliday::*;
        match self {
            NewYear => Some((1, 1)),
            JanuarySecond => Some((2, 1)),
            SaintAndrews => Some((30, 11)),
            ChristmasEve => Some((24, 12)),
            Christmas => Some((25, 12)),
            BoxingDay => Some((26, 12)),
            NewYearEve => Some((31, 12)),
            _ => None,
        }
    }
}

const FIXED_DAYS: [BankHoliday; 7] = [
    BankHoliday::NewYear,
    BankHoliday::JanuarySecond,
    BankHoliday::SaintAndrews,
    BankHoliday::ChristmasEve,
    BankHoliday::Christmas,
    BankHoliday::BoxingDay,
    BankHoliday::NewYearEve,
];

/// Dates of each bank holiday for one jurisdiction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BankHolidays {
    dates: HashMap<BankHoliday, BTreeSet<Date>>,
}

impl BankHolidays {
    /// Record that `bank_holiday` falls on `date`.
    pub fn insert(&mut self, bank_holiday: BankHoliday, date: Date) {
        self.dates.entry(bank_holiday).or_default().insert(date);
    }

    /// Every known date of a bank holiday.
    pub fn dates(&self, bank_holiday: BankHoliday) -> impl Iterator<Item = Date> + '_ {
        self.dates
            .get(&bank_holiday)
            .into_iter()
            .flat_map(|dates| dates.iter().copied())
    }

    /// Whether `date` is one of the given bank holidays.
    pub fn is_any_of<'a, I>(&self, bank_holidays: I, date: Date) -> bool
    where
        I: IntoIterator<Item = &'a BankHoliday>,
    {
        bank_holidays.into_iter().any(|bank_holiday| {
            self.dates
                .get(bank_holiday)
                .map_or(false, |dates| dates.contains(&date))
        })
    }

    /// Add the bank holidays with a fixed date (Christmas, New Year...) for
    /// every year between `start_date` and `end_date`.
    pub fn add_fixed_days(&mut self, start_date: Date, end_date: Date) {
        for bank_holiday in FIXED_DAYS.iter().copied() {
            if let Some((day, month)) = bank_holiday.fixed_day() {
                for date in get_fixed_days(day, month, start_date, end_date) {
                    self.insert(bank_holiday, date);
                }
            }
        }
    }
}

/// Read the bank holidays of one region from the JSON published by the UK
/// government.
pub fn get_bank_holiday<P: AsRef<Path>>(bank_holiday_path: P) -> Result<BankHolidays> {
    let bank_holiday_path = bank_holiday_path.as_ref();
    let bank_holidays_file = File::open(bank_holiday_path)
        .with_context(|| format!("Error reading {:?}", bank_holiday_path))?;
    let region: BankHolidayRegion = serde_json::from_reader(bank_holidays_file)
        .with_context(|| format!("Error parsing {:?}", bank_holiday_path))?;
    let mut bank_holidays = BankHolidays::default();
    for event in region.events {
        bank_holidays.insert(event.title, event.date);
    }
    Ok(bank_holidays)
}

/// Bank holidays of the configured region, if any, completed with the fixed
/// days between `start_date` and `end_date`.
pub fn read_bank_holidays(
    config: &ParserConfig,
    start_date: Date,
    end_date: Date,
) -> Result<BankHolidays> {
    let mut bank_holidays = match &config.bank_holidays {
        Some(path) => get_bank_holiday(path)?,
        None => BankHolidays::default(),
    };
    bank_holidays.add_fixed_days(start_date, end_date);
    Ok(bank_holidays)
}

// Generate a list of all fixed dates between two dates.
// For example, let's say you want to generate all the Christmas dates between
// the 1st of January 2000 and the 31st December of 2020
// ```
// let dates = get_fixed_days(25, 12, start_date, end_date);
// for year in 2000..=2020 {
//   let date = NaiveDate::from_ymd_opt(year, 12, 25).unwrap();
//   assert!(dates.contains(&date));
// }
// ```
fn get_fixed_days(day: u32, month: u32, start_date: Date, end_date: Date) -> Vec<Date> {
    (start_date.year()..=end_date.year())
        .filter_map(|year| Date::from_ymd_opt(year, month, day))
        .filter(|date| start_date <= *date && *date <= end_date)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd_opt(y, m, d).unwrap()
    }

    mod fixed_years {
        use super::*;

        #[test]
        fn included_limits() {
            let dates = get_fixed_days(25, 12, date(2000, 12, 25), date(2002, 12, 25));
            assert!(dates.contains(&date(2000, 12, 25)));
            assert!(dates.contains(&date(2001, 12, 25)));
            assert!(dates.contains(&date(2002, 12, 25)));
        }

        #[test]
        fn excluded_limits() {
            let dates = get_fixed_days(25, 12, date(2000, 12, 26), date(2002, 12, 24));
            assert_eq!(vec![date(2001, 12, 25)], dates);
        }
    }

    mod from_tag {
        use super::*;
        use BankHoliday::*;

        #[test]
        fn single() {
            assert_eq!(Some(vec![Christmas]), BankHoliday::from_tag("ChristmasDay"));
        }

        #[test]
        fn group() {
            let holidays = BankHoliday::from_tag("DisplacementHolidays").unwrap();
            assert!(holidays.contains(&NewYearHoliday));
            assert!(holidays.contains(&JanuarySecondHoliday));
            assert!(holidays.contains(&SaintAndrewsHoliday));
            assert!(holidays.contains(&ChristmasHoliday));
            assert!(holidays.contains(&BoxingDayHoliday));
        }

        #[test]
        fn unknown() {
            assert_eq!(None, BankHoliday::from_tag("UnknownTag"));
        }
    }

    mod bank_holidays {
        use super::*;
        use std::io::Write;

        #[test]
        fn fixed_days() {
            let mut bank_holidays = BankHolidays::default();
            bank_holidays.add_fixed_days(date(2020, 1, 1), date(2020, 12, 31));
            assert!(bank_holidays.is_any_of(&[BankHoliday::Christmas], date(2020, 12, 25)));
            assert!(!bank_holidays.is_any_of(&[BankHoliday::BoxingDay], date(2020, 12, 25)));
            assert_eq!(
                vec![date(2020, 1, 1)],
                bank_holidays.dates(BankHoliday::NewYear).collect::<Vec<_>>()
            );
        }

        #[test]
        fn from_json() {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(
                file,
                r#"{{"division": "england-and-wales", "events": [
                    {{"title": "Early May bank holiday (VE day)", "date": "2020-05-08", "notes": "", "bunting": true}},
                    {{"title": "Boxing Day", "date": "2020-12-28", "notes": "Substitute day", "bunting": true}},
                    {{"title": "Bank holiday for the coronation of King Charles III", "date": "2023-05-08", "notes": "", "bunting": true}}
                ]}}"#
            )
            .unwrap();
            let bank_holidays = get_bank_holiday(file.path()).unwrap();
            assert!(bank_holidays.is_any_of(&[BankHoliday::EarlyMay], date(2020, 5, 8)));
            assert!(bank_holidays.is_any_of(&[BankHoliday::BoxingDayHoliday], date(2020, 12, 28)));
            assert!(bank_holidays.is_any_of(&[BankHoliday::Exceptional], date(2023, 5, 8)));
        }

        #[test]
        fn without_region_file() {
            let bank_holidays =
                read_bank_holidays(&ParserConfig::default(), date(2020, 6, 1), date(2021, 5, 31))
                    .unwrap();
            assert!(bank_holidays.is_any_of(&[BankHoliday::NewYear], date(2021, 1, 1)));
            assert!(!bank_holidays.is_any_of(&[BankHoliday::EarlyMay], date(2021, 5, 3)));
        }
    }
}
