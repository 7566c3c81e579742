use serde::{Deserialize, Serialize};

/// (year, month, plant id)
pub(crate) type FacilityMonth = (i32, u32, u32);

/// Monthly fuel consumption, generation and calculated CO2 of one fuel at one
/// facility, as reported to EIA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FacilityFuel {
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    pub(crate) year: i32,
    pub(crate) month: u32,
    pub(crate) fuel: String,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "all fuel fossil co2 (kg)")]
    pub(crate) all_fuel_fossil_co2: f64,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "all fuel total co2 (kg)")]
    pub(crate) all_fuel_total_co2: f64,
    #[serde(rename = "elec fuel total co2 (kg)")]
    pub(crate) elec_fuel_total_co2: f64,
}

impl FacilityFuel {
    pub(crate) fn key(&self) -> FacilityMonth {
        (self.year, self.month, self.plant_id)
    }
}

/// Monthly CEMS totals of one facility. Any value can be blank in the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CemsEmission {
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    pub(crate) year: i32,
    pub(crate) month: u32,
    pub(crate) co2mass_kg: Option<f64>,
    pub(crate) gload_mwh: Option<f64>,
    pub(crate) heatinput_mmbtu: Option<f64>,
}

impl CemsEmission {
    pub(crate) fn key(&self) -> FacilityMonth {
        (self.year, self.month, self.plant_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GroupedFacility {
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    #[serde(rename = "all fuel fossil co2 (kg)")]
    pub(crate) all_fuel_fossil_co2: f64,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "all fuel total co2 (kg)")]
    pub(crate) all_fuel_total_co2: f64,
    #[serde(rename = "elec fuel total co2 (kg)")]
    pub(crate) elec_fuel_total_co2: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    /// Electric fossil CO2 over all-fuel total CO2; 0 when there is no total.
    #[serde(rename = "co2 ratio")]
    pub(crate) co2_ratio: f64,
}

impl GroupedFacility {
    pub(crate) fn new((year, month, plant_id): FacilityMonth) -> Self {
        Self {
            year,
            month,
            plant_id,
            all_fuel_fossil_co2: 0.0,
            elec_fuel_fossil_co2: 0.0,
            all_fuel_total_co2: 0.0,
            elec_fuel_total_co2: 0.0,
            generation: 0.0,
            co2_ratio: 0.0,
        }
    }

    pub(crate) fn add_fuel(&mut self, fuel: &FacilityFuel) {
        self.all_fuel_fossil_co2 += fuel.all_fuel_fossil_co2;
        self.elec_fuel_fossil_co2 += fuel.elec_fuel_fossil_co2;
        self.all_fuel_total_co2 += fuel.all_fuel_total_co2;
        self.elec_fuel_total_co2 += fuel.elec_fuel_total_co2;
        self.generation += fuel.generation;
    }

    pub(crate) fn key(&self) -> FacilityMonth {
        (self.year, self.month, self.plant_id)
    }
}

/// A CEMS record joined with the calculated emissions of the same facility-month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AdjustedEmission {
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    pub(crate) year: i32,
    pub(crate) month: u32,
    pub(crate) co2mass_kg: Option<f64>,
    pub(crate) gload_mwh: Option<f64>,
    pub(crate) heatinput_mmbtu: Option<f64>,
    #[serde(rename = "all fuel total co2 (kg)")]
    pub(crate) all_fuel_total_co2: f64,
    #[serde(rename = "co2 ratio")]
    pub(crate) co2_ratio: f64,
    #[serde(rename = "cems index")]
    pub(crate) cems_index: Option<f64>,
    /// `None` marks an implausible CEMS value that gets backfilled later.
    #[serde(rename = "adj co2 (kg)")]
    pub(crate) adj_co2: Option<f64>,
}

impl AdjustedEmission {
    pub(crate) fn key(&self) -> FacilityMonth {
        (self.year, self.month, self.plant_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FacilityCo2 {
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "adj co2 (kg)")]
    pub(crate) adj_co2: Option<f64>,
    #[serde(rename = "final co2 (kg)")]
    pub(crate) final_co2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FinalCo2 {
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "plant id")]
    pub(crate) plant_id: u32,
    #[serde(rename = "final co2 (kg)")]
    pub(crate) final_co2: f64,
}

impl From<&FacilityCo2> for FinalCo2 {
    fn from(co2: &FacilityCo2) -> Self {
        Self { year: co2.year, month: co2.month, plant_id: co2.plant_id, final_co2: co2.final_co2 }
    }
}

/// Generation, fuel and calculated CO2 of one fuel category, optionally per plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct GenFuels {
    #[serde(rename = "fuel category")]
    pub(crate) category: String,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "plant id")]
    pub(crate) plant_id: Option<u32>,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
    #[serde(rename = "all fuel fossil co2 (kg)")]
    pub(crate) all_fuel_fossil_co2: f64,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "all fuel total co2 (kg)")]
    pub(crate) all_fuel_total_co2: f64,
    #[serde(rename = "elec fuel total co2 (kg)")]
    pub(crate) elec_fuel_total_co2: f64,
}

impl GenFuels {
    pub(crate) fn empty(category: String, year: i32, month: u32, plant_id: Option<u32>) -> Self {
        Self {
            category,
            year,
            month,
            plant_id,
            total_fuel: 0.0,
            generation: 0.0,
            elec_fuel: 0.0,
            all_fuel_fossil_co2: 0.0,
            elec_fuel_fossil_co2: 0.0,
            all_fuel_total_co2: 0.0,
            elec_fuel_total_co2: 0.0,
        }
    }

    pub(crate) fn add(&mut self, other: &Self) {
        self.total_fuel += other.total_fuel;
        self.generation += other.generation;
        self.elec_fuel += other.elec_fuel;
        self.all_fuel_fossil_co2 += other.all_fuel_fossil_co2;
        self.elec_fuel_fossil_co2 += other.elec_fuel_fossil_co2;
        self.all_fuel_total_co2 += other.all_fuel_total_co2;
        self.elec_fuel_total_co2 += other.elec_fuel_total_co2;
    }
}

impl From<&FacilityFuel> for GenFuels {
    fn from(fuel: &FacilityFuel) -> Self {
        Self {
            category: fuel.fuel.clone(),
            year: fuel.year,
            month: fuel.month,
            plant_id: Some(fuel.plant_id),
            total_fuel: fuel.total_fuel,
            generation: fuel.generation,
            elec_fuel: fuel.elec_fuel,
            all_fuel_fossil_co2: fuel.all_fuel_fossil_co2,
            elec_fuel_fossil_co2: fuel.elec_fuel_fossil_co2,
            all_fuel_total_co2: fuel.all_fuel_total_co2,
            elec_fuel_total_co2: fuel.elec_fuel_total_co2,
        }
    }
}

/// [`GenFuels`] at state-level fuel types, written with the `type` column of
/// the totals tables.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct StateGenFuels {
    #[serde(rename = "type")]
    pub(crate) fuel_type: String,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "plant id")]
    pub(crate) plant_id: Option<u32>,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
    #[serde(rename = "all fuel fossil co2 (kg)")]
    pub(crate) all_fuel_fossil_co2: f64,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "all fuel total co2 (kg)")]
    pub(crate) all_fuel_total_co2: f64,
    #[serde(rename = "elec fuel total co2 (kg)")]
    pub(crate) elec_fuel_total_co2: f64,
}

impl From<&GenFuels> for StateGenFuels {
    fn from(row: &GenFuels) -> Self {
        Self {
            fuel_type: row.category.clone(),
            year: row.year,
            month: row.month,
            plant_id: row.plant_id,
            total_fuel: row.total_fuel,
            generation: row.generation,
            elec_fuel: row.elec_fuel,
            all_fuel_fossil_co2: row.all_fuel_fossil_co2,
            elec_fuel_fossil_co2: row.elec_fuel_fossil_co2,
            all_fuel_total_co2: row.all_fuel_total_co2,
            elec_fuel_total_co2: row.elec_fuel_total_co2,
        }
    }
}

/// State or national monthly totals of one EIA fuel type, including
/// facilities that do not report individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StateTotal {
    #[serde(rename = "type")]
    pub(crate) fuel_type: String,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
    #[serde(rename = "all fuel co2 (kg)", default)]
    pub(crate) all_fuel_co2: f64,
    #[serde(rename = "elec fuel co2 (kg)", default)]
    pub(crate) elec_fuel_co2: f64,
}

/// kg CO2 per mmBtu of one EIA fuel code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct EmissionFactor {
    #[serde(rename = "fuel code")]
    pub(crate) fuel_code: String,
    #[serde(rename = "fossil factor")]
    pub(crate) fossil_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ExtraGenFuel {
    #[serde(rename = "type")]
    pub(crate) fuel_type: String,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "total fuel (mmbtu)")]
    pub(crate) total_fuel: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "elec fuel (mmbtu)")]
    pub(crate) elec_fuel: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ExtraCo2 {
    #[serde(rename = "type")]
    pub(crate) fuel_type: String,
    pub(crate) year: i32,
    pub(crate) month: u32,
    #[serde(rename = "all fuel co2 (kg)")]
    pub(crate) all_fuel_co2: f64,
    #[serde(rename = "elec fuel co2 (kg)")]
    pub(crate) elec_fuel_co2: f64,
}
