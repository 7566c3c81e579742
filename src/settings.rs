use std::{collections::BTreeMap, path::Path};

use serde::Deserialize;
use tracing::info;

use crate::{
    error::Result,
    fuel_category::{FuelCategories, FuelCategory},
    period::Period,
};

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    pub(crate) baseline_year: i32,
    pub(crate) period: Period,
    state_fuel_categories: Option<Vec<FuelCategory>>,
    custom_fuel_categories: Option<Vec<FuelCategory>>,
    /// Replaces the default consolidation of emission factors per fuel type.
    pub(crate) emission_factors: Option<BTreeMap<String, f64>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            baseline_year: 2005,
            period: Period::Annual,
            state_fuel_categories: None,
            custom_fuel_categories: None,
            emission_factors: None,
        }
    }
}

impl Settings {
    /// Reads `path` if it exists, otherwise falls back to the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        info!(?path, "loading settings");
        let settings = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        Ok(settings)
    }

    pub(crate) fn state_fuel_categories(&self) -> Result<FuelCategories> {
        match &self.state_fuel_categories {
            Some(categories) => Ok(FuelCategories::new(categories)),
            None => FuelCategories::state_default(),
        }
    }

    pub(crate) fn custom_fuel_categories(&self) -> Result<FuelCategories> {
        match &self.custom_fuel_categories {
            Some(categories) => Ok(FuelCategories::new(categories)),
            None => FuelCategories::custom_default(),
        }
    }
}
