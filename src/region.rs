//! Regional breakdown of facilities. The point-in-polygon lookup itself is left
//! to a GIS capability behind [`RegionLocator`]; everything here joins its
//! answers back by plant id.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    columns::{ELEC_FUEL, FUEL_CATEGORY, GENERATION, PLANT_ID, REGION, STATE, TOTAL_FUEL, YEAR},
    error::Result,
    read_table,
};

pub(crate) trait RegionLocator {
    /// Label of the region containing the point, if any.
    fn locate(&self, lon: f64, lat: f64) -> Option<String>;
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FacilityLocation {
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    pub(crate) lat: Option<f64>,
    pub(crate) lon: Option<f64>,
}

/// A region approximated by its bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RegionBox {
    pub(crate) region: String,
    pub(crate) west: f64,
    pub(crate) south: f64,
    pub(crate) east: f64,
    pub(crate) north: f64,
}

/// The first box containing the point wins.
impl RegionLocator for [RegionBox] {
    fn locate(&self, lon: f64, lat: f64) -> Option<String> {
        self.iter()
            .find(|b| (b.west..=b.east).contains(&lon) && (b.south..=b.north).contains(&lat))
            .map(|b| b.region.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PlantRegion {
    #[serde(rename = "plant id")]
    plant_id: u32,
    region: String,
}

/// Annual generation and fuel use of one fuel category at one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StateFacility {
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    pub(crate) year: i32,
    pub(crate) state: String,
    #[serde(rename = "reporting frequency", default)]
    pub(crate) reporting_frequency: Option<String>,
    #[serde(default)]
    pub(crate) region: Option<String>,
    #[serde(rename = "fuel category")]
    pub(crate) category: String,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
}

pub(crate) const STATE_FACILITY_COLUMNS: &[&str] =
    &[PLANT_ID, YEAR, STATE, FUEL_CATEGORY, GENERATION, TOTAL_FUEL, ELEC_FUEL];

/// Share of a state's generation and fuel use of one fuel category that falls
/// into one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RegionFraction {
    pub(crate) state: String,
    pub(crate) region: String,
    #[serde(rename = "fuel category")]
    pub(crate) category: String,
    #[serde(rename = "% generation")]
    pub(crate) generation: f64,
    #[serde(rename = "% total fuel")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "% elec fuel")]
    pub(crate) elec_fuel: f64,
}

/// Asks `locator` for the region of every distinct plant with coordinates.
pub(crate) fn assign_regions(
    locations: &[FacilityLocation],
    locator: &(impl RegionLocator + ?Sized),
) -> BTreeMap<u32, String> {
    let mut regions = BTreeMap::new();
    for location in locations {
        if regions.contains_key(&location.plant_id) {
            continue;
        }
        let (Some(lat), Some(lon)) = (location.lat, location.lon) else {
            debug!(plant_id = location.plant_id, "no coordinates");
            continue;
        };
        if let Some(region) = locator.locate(lon, lat) {
            regions.insert(location.plant_id, region);
        }
    }

    regions
}

/// Reads plant id → region pairs produced by an external spatial join.
pub(crate) fn load_plant_regions(path: &Path) -> Result<BTreeMap<u32, String>> {
    let rows: Vec<PlantRegion> = read_table(path, &[PLANT_ID, REGION])?;
    Ok(rows.into_iter().map(|r| (r.plant_id, r.region)).collect())
}

pub(crate) fn add_region(
    rows: &[StateFacility],
    regions: &BTreeMap<u32, String>,
) -> Vec<StateFacility> {
    rows.iter()
        .map(|row| StateFacility { region: regions.get(&row.plant_id).cloned(), ..row.clone() })
        .collect()
}

/// Splits each fuel category of `state` across regions. Only annually
/// reporting facilities count when the reporting frequency is known; rows
/// without a region are left out.
pub(crate) fn fraction_state_to_region(
    rows: &[StateFacility],
    state: &str,
) -> Vec<RegionFraction> {
    let mut by_region = BTreeMap::<(&str, &str), (f64, f64, f64)>::new();
    for row in rows.iter().filter(|row| row.state == state) {
        if row.reporting_frequency.as_deref().is_some_and(|freq| freq != "A") {
            continue;
        }
        let Some(region) = row.region.as_deref() else {
            continue;
        };

        let entry = by_region.entry((row.category.as_str(), region)).or_default();
        entry.0 += row.generation;
        entry.1 += row.total_fuel;
        entry.2 += row.elec_fuel;
    }

    let mut fuel_totals = BTreeMap::<&str, (f64, f64, f64)>::new();
    for ((category, _), (generation, total_fuel, elec_fuel)) in &by_region {
        let entry = fuel_totals.entry(*category).or_default();
        entry.0 += generation;
        entry.1 += total_fuel;
        entry.2 += elec_fuel;
    }

    let share = |value: f64, total: f64| if total == 0.0 { 0.0 } else { value / total };

    by_region
        .iter()
        .map(|(&(category, region), &(generation, total_fuel, elec_fuel))| {
            let totals = fuel_totals[category];
            RegionFraction {
                state: state.to_string(),
                region: region.to_string(),
                category: category.to_string(),
                generation: share(generation, totals.0),
                total_fuel: share(total_fuel, totals.1),
                elec_fuel: share(elec_fuel, totals.2),
            }
        })
        .collect()
}
