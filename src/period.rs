use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Time resolution of index tables.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Period {
    #[default]
    Annual,
    Quarterly,
    Monthly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct PeriodKey {
    pub(crate) year: i32,
    pub(crate) quarter: Option<u32>,
    pub(crate) month: Option<u32>,
}

impl Period {
    pub(crate) fn key(self, year: i32, month: u32) -> Result<PeriodKey> {
        let date = first_day(year, month)?;
        Ok(match self {
            Period::Annual => PeriodKey { year, quarter: None, month: None },
            Period::Quarterly => PeriodKey { year, quarter: Some(quarter_of(date)), month: None },
            Period::Monthly => PeriodKey { year, quarter: None, month: Some(month) },
        })
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.quarter, self.month) {
            (Some(quarter), _) => write!(f, "{}-Q{quarter}", self.year),
            (None, Some(month)) => write!(f, "{}-{month:02}", self.year),
            (None, None) => write!(f, "{}", self.year),
        }
    }
}

pub(crate) fn first_day(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::InvalidPeriod { year, month })
}

fn quarter_of(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}
