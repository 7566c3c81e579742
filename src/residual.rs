//! Generation, fuel consumption and CO2 of facilities that only show up in
//! state or national totals.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    records::{EmissionFactor, ExtraCo2, ExtraGenFuel, GenFuels, StateTotal},
};

/// Fuel types of the totals table that do not overlap with each other
/// (e.g. total solar would include both SUN and DPV).
pub(crate) const KEEP_TYPES: &[&str] = &[
    "WWW", "WND", "WAS", "SUN", "DPV", "NUC", "NG", "PEL", "PC", "OTH", "COW", "OOG", "HPS", "HYC",
    "GEO",
];

/// Types whose facility-level generation is folded into another category, so
/// the raw total is used instead of a difference.
pub(crate) const RAW_TOTAL_TYPES: &[&str] = &["HPS", "DPV"];

#[derive(Debug)]
pub(crate) struct Residual {
    pub(crate) gen_fuels: Vec<ExtraGenFuel>,
    pub(crate) co2: Vec<ExtraCo2>,
}

#[derive(Debug, Default, Clone, Copy)]
struct Amounts {
    total_fuel: f64,
    generation: f64,
    elec_fuel: f64,
}

/// Estimates non-reporting facilities as the difference between totals and
/// the facilities at state-level fuel categories, and assigns them CO2 from
/// the reduced emission factors.
pub(crate) fn extra_emissions_gen(
    facility_gen_fuels: &[GenFuels],
    eia_total: &[StateTotal],
    ef: &[EmissionFactor],
    custom_reduce: Option<&BTreeMap<String, f64>>,
) -> Result<Residual> {
    let total_types: BTreeSet<&str> = eia_total.iter().map(|t| t.fuel_type.as_str()).collect();
    let facility_types: BTreeSet<&str> =
        facility_gen_fuels.iter().map(|g| g.category.as_str()).collect();

    let missing: Vec<String> =
        facility_types.difference(&total_types).map(|t| t.to_string()).collect();
    if !missing.is_empty() {
        return Err(Error::FuelCategoryMismatch(missing));
    }

    let mut totals = BTreeMap::<(&str, i32, u32), Amounts>::new();
    for total in eia_total.iter().filter(|t| KEEP_TYPES.contains(&t.fuel_type.as_str())) {
        let entry = totals.entry((total.fuel_type.as_str(), total.year, total.month)).or_default();
        entry.total_fuel += total.total_fuel;
        entry.generation += total.generation;
        entry.elec_fuel += total.elec_fuel;
    }

    let mut facilities = BTreeMap::<(&str, i32, u32), Amounts>::new();
    for row in facility_gen_fuels {
        let entry = facilities.entry((row.category.as_str(), row.year, row.month)).or_default();
        entry.total_fuel += row.total_fuel;
        entry.generation += row.generation;
        entry.elec_fuel += row.elec_fuel;
    }

    // Every fuel type gets a row in every period, even when one side has no data.
    let types: BTreeSet<&str> =
        totals.keys().chain(facilities.keys()).map(|(fuel, _, _)| *fuel).collect();
    let years: BTreeSet<i32> =
        totals.keys().chain(facilities.keys()).map(|(_, year, _)| *year).collect();
    let months: BTreeSet<u32> =
        totals.keys().chain(facilities.keys()).map(|(_, _, month)| *month).collect();

    let fuel_factors = reduce_emission_factors(ef, custom_reduce)?;

    let mut gen_fuels = Vec::new();
    let mut co2 = Vec::new();
    for &fuel_type in &types {
        let factor = fuel_factors.get(fuel_type).copied();
        debug!(fuel_type, ?factor, "residual fuel type");

        for &year in &years {
            for &month in &months {
                let key = (fuel_type, year, month);
                let total = totals.get(&key).copied().unwrap_or_default();
                let facility = facilities.get(&key).copied().unwrap_or_default();

                let extra = if RAW_TOTAL_TYPES.contains(&fuel_type) {
                    total
                } else {
                    Amounts {
                        total_fuel: total.total_fuel - facility.total_fuel,
                        generation: total.generation - facility.generation,
                        elec_fuel: total.elec_fuel - facility.elec_fuel,
                    }
                };

                let factor = factor.unwrap_or(0.0);
                co2.push(ExtraCo2 {
                    fuel_type: fuel_type.to_string(),
                    year,
                    month,
                    all_fuel_co2: extra.total_fuel * factor,
                    elec_fuel_co2: extra.elec_fuel * factor,
                });
                gen_fuels.push(ExtraGenFuel {
                    fuel_type: fuel_type.to_string(),
                    year,
                    month,
                    total_fuel: extra.total_fuel,
                    generation: extra.generation,
                    elec_fuel: extra.elec_fuel,
                });
            }
        }
    }

    info!(rows = gen_fuels.len(), "non-reporting facility residuals");
    Ok(Residual { gen_fuels, co2 })
}

/// Consolidates per-fuel emission factors (kg/mmBtu) to the state-level fuel
/// types. A custom map replaces the default consolidation.
pub(crate) fn reduce_emission_factors(
    ef: &[EmissionFactor],
    custom_reduce: Option<&BTreeMap<String, f64>>,
) -> Result<BTreeMap<String, f64>> {
    let factors: BTreeMap<&str, f64> =
        ef.iter().map(|f| (f.fuel_code.as_str(), f.fossil_factor)).collect();

    if !factors.contains_key("NG") {
        return Err(Error::MissingEmissionFactor("NG".to_string()));
    }

    if let Some(custom) = custom_reduce {
        return Ok(custom.clone());
    }

    let mean = |codes: &[&str]| -> Result<f64> {
        let mut sum = 0.0;
        for code in codes {
            sum += factors
                .get(code)
                .ok_or_else(|| Error::MissingEmissionFactor(code.to_string()))?;
        }
        Ok(sum / codes.len() as f64)
    };

    Ok(BTreeMap::from([
        ("NG".to_string(), mean(&["NG"])?),
        ("PEL".to_string(), mean(&["DFO", "RFO"])?),
        ("PC".to_string(), mean(&["PC"])?),
        ("COW".to_string(), mean(&["BIT", "SUB"])?),
        ("OOG".to_string(), mean(&["OG"])?),
    ]))
}
