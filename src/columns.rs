//! Column vocabulary shared by every table, and the header rewrite that maps the
//! spellings found in EIA and EPA downloads onto it.

use std::{io::Read, path::Path};

use csv::{Reader, StringRecord};
use deunicode::deunicode;

use crate::error::{Error, Result};

pub(crate) const PLANT_ID: &str = "plant id";
pub(crate) const YEAR: &str = "year";
pub(crate) const MONTH: &str = "month";
pub(crate) const FUEL: &str = "fuel";
pub(crate) const TYPE: &str = "type";
pub(crate) const FUEL_CATEGORY: &str = "fuel category";
pub(crate) const STATE: &str = "state";
pub(crate) const REGION: &str = "region";

pub(crate) const TOTAL_FUEL: &str = "total fuel (mmbtu)";
pub(crate) const ELEC_FUEL: &str = "elec fuel (mmbtu)";
pub(crate) const GENERATION: &str = "generation (mwh)";
pub(crate) const ALL_FUEL_FOSSIL_CO2: &str = "all fuel fossil co2 (kg)";
pub(crate) const ELEC_FUEL_FOSSIL_CO2: &str = "elec fuel fossil co2 (kg)";
pub(crate) const ALL_FUEL_TOTAL_CO2: &str = "all fuel total co2 (kg)";
pub(crate) const ELEC_FUEL_TOTAL_CO2: &str = "elec fuel total co2 (kg)";

pub(crate) const CO2_MASS: &str = "co2mass_kg";
pub(crate) const GLOAD: &str = "gload_mwh";
pub(crate) const HEAT_INPUT: &str = "heatinput_mmbtu";

pub(crate) const OP_DATE: &str = "op_date";
pub(crate) const CO2_MASS_TONS: &str = "co2_mass (tons)";

pub(crate) const INDEX: &str = "index (g/kwh)";

pub(crate) const FUEL_CODE: &str = "fuel code";
pub(crate) const FOSSIL_FACTOR: &str = "fossil factor";

pub(crate) const FACILITY_FUEL_COLUMNS: &[&str] = &[
    PLANT_ID,
    YEAR,
    MONTH,
    FUEL,
    TOTAL_FUEL,
    ELEC_FUEL,
    GENERATION,
    ALL_FUEL_FOSSIL_CO2,
    ELEC_FUEL_FOSSIL_CO2,
    ALL_FUEL_TOTAL_CO2,
    ELEC_FUEL_TOTAL_CO2,
];

pub(crate) const CEMS_COLUMNS: &[&str] = &[PLANT_ID, YEAR, MONTH, CO2_MASS, GLOAD, HEAT_INPUT];

pub(crate) const CEMS_HOURLY_COLUMNS: &[&str] =
    &[PLANT_ID, OP_DATE, GLOAD, CO2_MASS_TONS, HEAT_INPUT];

pub(crate) const STATE_TOTAL_COLUMNS: &[&str] =
    &[TYPE, YEAR, MONTH, GENERATION, TOTAL_FUEL, ELEC_FUEL];

pub(crate) const EMISSION_FACTOR_COLUMNS: &[&str] = &[FUEL_CODE, FOSSIL_FACTOR];

/// Lowercases a raw header, strips non-ASCII and folds known aliases onto the
/// canonical column name.
pub(crate) fn normalize_header(raw: &str) -> String {
    let lower = deunicode(raw).to_lowercase();
    let collapsed = lower.split_whitespace().collect::<Vec<_>>().join(" ");

    let canonical = match collapsed.as_str() {
        "plant_id" | "plant code" | "orispl_code" | "orispl" | "facility id" => PLANT_ID,
        "co2_mass (kg)" | "co2 mass (kg)" => CO2_MASS,
        "co2 mass (short tons)" | "co2_mass (short tons)" => CO2_MASS_TONS,
        "date" | "op date" => OP_DATE,
        "gload (mw)" | "gload (mwh)" | "gross load (mw)" => GLOAD,
        "heat_input (mmbtu)" | "heat input (mmbtu)" => HEAT_INPUT,
        "reported fuel type code" | "aer fuel type code" => FUEL,
        "fuel type" => TYPE,
        "plant state" => STATE,
        "nerc" | "nerc region" => REGION,
        "elec fuel consumption mmbtu" => ELEC_FUEL,
        "total fuel consumption mmbtu" => TOTAL_FUEL,
        "net generation (megawatthours)" | "net generation (mwh)" => GENERATION,
        _ => return collapsed,
    };

    canonical.to_string()
}

/// Rewrites the header row of `reader` and checks that every `required` column
/// is present afterwards.
pub(crate) fn normalize_headers<R: Read>(
    reader: &mut Reader<R>,
    path: &Path,
    required: &[&str],
) -> Result<()> {
    let headers: StringRecord = reader.headers()?.iter().map(normalize_header).collect();

    if let Some(missing) = required.iter().find(|col| !headers.iter().any(|h| h == **col)) {
        return Err(Error::MissingColumn {
            path: path.to_path_buf(),
            column: (*missing).to_string(),
        });
    }

    reader.set_headers(headers);
    Ok(())
}
