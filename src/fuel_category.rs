use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{error::Result, records::GenFuels};

const STATE_CATEGORIES_JSON: &str = include_str!("../config/fuel_categories_state.json");
const CUSTOM_CATEGORIES_JSON: &str = include_str!("../config/fuel_categories_custom.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct FuelCategory {
    pub(crate) category: String,
    pub(crate) codes: BTreeSet<String>,
}

/// Lookup from a fuel code to the category it is relabeled to.
///
/// Categories are applied in list order, so when a code appears in more than
/// one category the last one wins.
#[derive(Debug, Clone)]
pub(crate) struct FuelCategories {
    lookup: BTreeMap<String, String>,
}

impl FuelCategories {
    pub(crate) fn new(categories: &[FuelCategory]) -> Self {
        let mut lookup = BTreeMap::new();
        for cat in categories {
            for code in &cat.codes {
                if let Some(previous) = lookup.insert(code.clone(), cat.category.clone()) {
                    let category = &cat.category;
                    warn!(%code, %previous, %category, "fuel code in two categories");
                }
            }
        }

        Self { lookup }
    }

    pub(crate) fn from_json(json: &str) -> Result<Self> {
        let categories: Vec<FuelCategory> = serde_json::from_str(json)?;
        Ok(Self::new(&categories))
    }

    /// EIA state-level fuel types keyed by facility-level fuel codes.
    pub(crate) fn state_default() -> Result<Self> {
        Self::from_json(STATE_CATEGORIES_JSON)
    }

    /// Report categories keyed by state-level fuel types.
    pub(crate) fn custom_default() -> Result<Self> {
        Self::from_json(CUSTOM_CATEGORIES_JSON)
    }

    pub(crate) fn category_of(&self, code: &str) -> Option<&str> {
        self.lookup.get(code).map(String::as_str)
    }
}

/// Replaces every row's category with the one its current label maps to.
/// Rows with an unmapped label are dropped.
pub(crate) fn relabel(rows: &[GenFuels], categories: &FuelCategories) -> Vec<GenFuels> {
    let mut unmapped = BTreeSet::new();
    let relabeled: Vec<_> = rows
        .iter()
        .filter_map(|row| match categories.category_of(&row.category) {
            Some(category) => Some(GenFuels { category: category.to_string(), ..row.clone() }),
            None => {
                unmapped.insert(row.category.as_str());
                None
            }
        })
        .collect();

    if !unmapped.is_empty() {
        warn!(
            dropped = rows.len() - relabeled.len(),
            codes = ?unmapped,
            "rows with a fuel code outside every category"
        );
    }

    relabeled
}

/// Relabels rows into coarser categories and sums them per
/// (category, year, month, plant id).
pub(crate) fn group_fuel_cats(rows: &[GenFuels], categories: &FuelCategories) -> Vec<GenFuels> {
    let mut grouped = BTreeMap::<_, GenFuels>::new();

    for row in relabel(rows, categories) {
        let key = (row.category.clone(), row.year, row.month, row.plant_id);
        let empty = || GenFuels::empty(row.category.clone(), row.year, row.month, row.plant_id);
        grouped.entry(key).or_insert_with(empty).add(&row);
    }

    grouped.into_values().collect()
}
