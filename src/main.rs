use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, bail};
use csv::{Reader, ReaderBuilder, Trim, Writer};
use file_paths::FilePaths;
use serde::{Serialize, de::DeserializeOwned};
use settings::Settings;
use tracing::{info, warn};

use crate::{
    columns::{CEMS_COLUMNS, EMISSION_FACTOR_COLUMNS, FACILITY_FUEL_COLUMNS, STATE_TOTAL_COLUMNS},
    error::{Error, Result},
    metrics::IndexRow,
    records::{CemsEmission, EmissionFactor, FacilityFuel, StateGenFuels, StateTotal},
    region::{FacilityLocation, RegionBox, STATE_FACILITY_COLUMNS, StateFacility},
};

mod columns;
mod error;
mod facility;
mod file_paths;
mod fuel_category;
mod logging;
mod metrics;
mod period;
mod preprocess;
mod records;
mod region;
mod residual;
mod settings;

fn main() -> anyhow::Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("preprocess") => {
            let year = parse_year(args.next().as_deref(), "preprocess <year>")?;
            let paths = FilePaths::new(PathBuf::from("data"), year)?;

            let cems = preprocess::cems_monthly(year, &paths)
                .with_context(|| format!("reading CEMS archives in {:?}", paths.cems_dir()))?;
            write_table(&paths.cems_monthly_file(), &cems)?;

            let workbook = paths.emission_factors_workbook();
            if workbook.exists() {
                let factors = preprocess::emission_factors(&paths)
                    .with_context(|| format!("reading {workbook:?}"))?;
                write_table(&paths.emission_factors_file(), &factors)?;
            } else {
                warn!(?workbook, "no emission factor workbook, skipping");
            }
        }
        Some("state-fractions") => {
            let year = parse_year(args.next().as_deref(), "state-fractions <year> <STATE>")?;
            let Some(state) = args.next() else {
                bail!("Must specify `state-fractions <year> <STATE>`");
            };
            let paths = FilePaths::new(PathBuf::from("data"), year)?;
            state_fractions(&paths, &state.to_uppercase())?;
        }
        Some(year_str) => {
            let year = parse_year(Some(year_str), "<year>")?;
            let paths = FilePaths::new(PathBuf::from("data"), year)?;
            let settings = Settings::load(&paths.settings_file())
                .with_context(|| format!("reading {:?}", paths.settings_file()))?;
            run(year, &paths, &settings)?;
        }
        None => bail!("Must specify a year to process, `preprocess <year>` or \
                       `state-fractions <year> <STATE>`."),
    }

    Ok(())
}

fn parse_year(arg: Option<&str>, usage: &str) -> anyhow::Result<i32> {
    let Some(arg) = arg else {
        bail!("Must specify `{usage}`");
    };
    arg.parse().with_context(|| format!("Not a valid year: \"{arg}\""))
}

/// Runs the full reconciliation for one year and writes every output table.
fn run(year: i32, paths: &FilePaths, settings: &Settings) -> anyhow::Result<()> {
    let state_categories = settings.state_fuel_categories()?;
    let custom_categories = settings.custom_fuel_categories()?;

    let facility_fuel: Vec<FacilityFuel> =
        read_table(&paths.facility_fuel_file(), FACILITY_FUEL_COLUMNS)?;
    let cems: Vec<CemsEmission> = read_table(&paths.cems_monthly_file(), CEMS_COLUMNS)?;

    let facilities = facility::facility_emission_gen(
        &facility_fuel,
        &cems,
        &state_categories,
        &custom_categories,
    );
    info!(
        matched = facilities.join.matched,
        cems_only = facilities.join.cems_only,
        fuel_only = facilities.join.fuel_only,
        "CEMS join"
    );
    let gen_fuels_state = &facilities.gen_fuels_state;
    let gen_fuels = &facilities.gen_fuels;

    let state_rows: Vec<StateGenFuels> = gen_fuels_state.iter().map(StateGenFuels::from).collect();
    write_table(&paths.out_facility_co2_file(), &facilities.co2)?;
    write_table(&paths.out_gen_fuels_state_file(), &state_rows)?;
    write_table(&paths.out_gen_fuels_file(), gen_fuels)?;

    let totals_file = paths.state_totals_file();
    let factors_file = paths.emission_factors_file();
    if totals_file.exists() && factors_file.exists() {
        let totals: Vec<StateTotal> = read_table(&totals_file, STATE_TOTAL_COLUMNS)?;
        let factors: Vec<EmissionFactor> = read_table(&factors_file, EMISSION_FACTOR_COLUMNS)?;

        info!("Estimating non-reporting facilities");
        let residual = residual::extra_emissions_gen(
            gen_fuels_state,
            &totals,
            &factors,
            settings.emission_factors.as_ref(),
        )?;
        write_table(&paths.out_extra_gen_fuels_file(), &residual.gen_fuels)?;
        write_table(&paths.out_extra_co2_file(), &residual.co2)?;
    } else {
        warn!(?totals_file, ?factors_file, "totals or emission factors missing, no residual");
    }

    info!(period = ?settings.period, "Calculating index");
    let index = metrics::period_index(&facilities.co2, gen_fuels, settings.period)?;
    let index = with_baseline_change(year, paths, settings.baseline_year, index)?;
    let fuel_index = metrics::generation_index(gen_fuels, &index, settings.period)?;

    write_table(&paths.out_index_file(), &index)?;
    write_table(&paths.out_fuel_index_file(), &fuel_index)?;

    Ok(())
}

/// Fills in the change since `baseline_year`. Unless `year` is the baseline
/// itself, the baseline rows come from that year's earlier `index.csv`.
fn with_baseline_change(
    year: i32,
    paths: &FilePaths,
    baseline_year: i32,
    index: Vec<IndexRow>,
) -> anyhow::Result<Vec<IndexRow>> {
    let mut rows = index.clone();
    if year != baseline_year {
        let baseline_file = paths.index_file_of(baseline_year);
        if baseline_file.exists() {
            let baseline: Vec<IndexRow> =
                read_table(&baseline_file, &[columns::YEAR, columns::GENERATION, columns::INDEX])?;
            rows.extend(baseline.into_iter().filter(|row| row.year == baseline_year));
        } else {
            warn!(?baseline_file, "baseline year has not been run yet");
        }
    }

    match metrics::change_since_baseline(&rows, baseline_year) {
        Ok(mut with_change) => {
            with_change.truncate(index.len());
            Ok(with_change)
        }
        Err(Error::MissingBaseline(baseline_year)) => {
            warn!(baseline_year, "baseline year not covered, no change since baseline");
            Ok(index)
        }
        Err(e) => Err(e.into()),
    }
}

/// Splits the facilities of `state` across regions, preferring precomputed
/// plant regions over the bounding-box lookup.
fn state_fractions(paths: &FilePaths, state: &str) -> anyhow::Result<()> {
    let facilities: Vec<StateFacility> =
        read_table(&paths.state_facilities_file(), STATE_FACILITY_COLUMNS)?;

    let regions = if paths.plant_regions_file().exists() {
        region::load_plant_regions(&paths.plant_regions_file())?
    } else {
        info!("No plant regions, locating plants by region boxes");
        let locations: Vec<FacilityLocation> =
            read_table(&paths.plant_locations_file(), &[columns::PLANT_ID])?;
        let boxes: Vec<RegionBox> = read_table(&paths.region_boxes_file(), &[columns::REGION])?;
        region::assign_regions(&locations, boxes.as_slice())
    };

    let rows = region::add_region(&facilities, &regions);
    let fractions = region::fraction_state_to_region(&rows, state);
    if fractions.is_empty() {
        warn!(state, "no facilities with a region");
    }

    write_table(&paths.out_state_fractions_file(state), &fractions)?;
    Ok(())
}

pub(crate) fn load_csv_file(path: &Path, separator: char) -> Result<Reader<File>> {
    Ok(ReaderBuilder::new().delimiter(separator as u8).trim(Trim::All).from_path(path)?)
}

/// Reads a comma-separated table with normalized headers.
pub(crate) fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    info!("Loading {path:?}...");

    let mut csv_reader = load_csv_file(path, ',')?;
    columns::normalize_headers(&mut csv_reader, path, required)?;

    let rows = csv_reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}

pub(crate) fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut csv_writer = Writer::from_path(path)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;

    info!(rows = rows.len(), "Wrote {path:?}");
    Ok(())
}
