use std::path::PathBuf;

use crate::error::Result;

pub(crate) struct FilePaths {
    data_dir: PathBuf,
    year_dir: PathBuf,
}

impl FilePaths {
    pub(crate) fn new(data_dir: PathBuf, year: i32) -> Result<Self> {
        let year_dir = data_dir.join(year.to_string());

        std::fs::create_dir_all(year_dir.join("output"))?;

        Ok(Self { data_dir, year_dir })
    }

    pub(crate) fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub(crate) fn emission_factors_workbook(&self) -> PathBuf {
        self.data_dir.join("emission_factors.xlsx")
    }

    pub(crate) fn emission_factors_file(&self) -> PathBuf {
        self.data_dir.join("emission_factors.csv")
    }

    /// Directory holding the raw hourly CEMS archives for the year.
    pub(crate) fn cems_dir(&self) -> PathBuf {
        self.year_dir.join("cems")
    }

    pub(crate) fn cems_monthly_file(&self) -> PathBuf {
        self.year_dir.join("cems_monthly.csv")
    }

    pub(crate) fn facility_fuel_file(&self) -> PathBuf {
        self.year_dir.join("facility_fuel.csv")
    }

    pub(crate) fn state_totals_file(&self) -> PathBuf {
        self.year_dir.join("state_totals.csv")
    }

    pub(crate) fn state_facilities_file(&self) -> PathBuf {
        self.year_dir.join("state_facilities.csv")
    }

    pub(crate) fn plant_regions_file(&self) -> PathBuf {
        self.year_dir.join("plant_regions.csv")
    }

    pub(crate) fn plant_locations_file(&self) -> PathBuf {
        self.year_dir.join("plant_locations.csv")
    }

    pub(crate) fn region_boxes_file(&self) -> PathBuf {
        self.data_dir.join("region_boxes.csv")
    }

    pub(crate) fn out_facility_co2_file(&self) -> PathBuf {
        self.year_dir.join("output/facility_co2.csv")
    }

    pub(crate) fn out_gen_fuels_state_file(&self) -> PathBuf {
        self.year_dir.join("output/gen_fuels_state.csv")
    }

    pub(crate) fn out_gen_fuels_file(&self) -> PathBuf {
        self.year_dir.join("output/gen_fuels.csv")
    }

    pub(crate) fn out_extra_gen_fuels_file(&self) -> PathBuf {
        self.year_dir.join("output/extra_gen_fuels.csv")
    }

    pub(crate) fn out_extra_co2_file(&self) -> PathBuf {
        self.year_dir.join("output/extra_co2.csv")
    }

    pub(crate) fn out_index_file(&self) -> PathBuf {
        self.year_dir.join("output/index.csv")
    }

    /// Index table written by an earlier run for `year`.
    pub(crate) fn index_file_of(&self, year: i32) -> PathBuf {
        self.data_dir.join(year.to_string()).join("output/index.csv")
    }

    pub(crate) fn out_fuel_index_file(&self) -> PathBuf {
        self.year_dir.join("output/fuel_index.csv")
    }

    pub(crate) fn out_state_fractions_file(&self, state: &str) -> PathBuf {
        self.year_dir.join(format!("output/state_fractions_{state}.csv"))
    }
}
