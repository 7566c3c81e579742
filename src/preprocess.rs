use std::{collections::BTreeMap, fs::File, path::PathBuf};

use calamine::{DataType, Reader, Xlsx};
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, Trim};
use tracing::{info, warn};
use zip::ZipArchive;

use crate::{
    FilePaths,
    columns::{CEMS_HOURLY_COLUMNS, FOSSIL_FACTOR, FUEL_CODE, normalize_header, normalize_headers},
    error::{Error, Result},
    records::{CemsEmission, EmissionFactor},
};

const KG_PER_SHORT_TON: f64 = 907.18474;

#[derive(Debug, serde::Deserialize)]
struct CemsHour {
    #[serde(rename = "plant id")]
    plant_id: u32,
    op_date: String,
    /// MW over one operating hour
    gload_mwh: Option<f64>,
    #[serde(rename = "co2_mass (tons)")]
    co2_mass_tons: Option<f64>,
    heatinput_mmbtu: Option<f64>,
}

/// Sums the hourly CEMS records of the year's monthly archives
/// (`cems/<year>_<MM>*.zip`) to monthly totals per plant.
pub(crate) fn cems_monthly(year: i32, paths: &FilePaths) -> Result<Vec<CemsEmission>> {
    let cems_dir = paths.cems_dir();
    let mut available: Vec<PathBuf> = std::fs::read_dir(&cems_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("zip")))
        .collect();
    available.sort();

    let mut archives = Vec::new();
    for month in 1..=12 {
        let prefix = format!("{year}_{month:02}");
        let monthly: Vec<&PathBuf> = available
            .iter()
            .filter(|path| {
                path.file_name().and_then(|name| name.to_str()).is_some_and(|name| {
                    name.starts_with(&prefix)
                })
            })
            .collect();

        if monthly.is_empty() {
            warn!(month, ?cems_dir, "no CEMS archive found, skipping month");
        }
        archives.extend(monthly);
    }

    let mut plants = BTreeMap::<(u32, i32, u32), CemsEmission>::new();
    for archive in archives {
        info!("Loading {archive:?}...");

        let mut zip = ZipArchive::new(File::open(archive)?)?;
        for i in 0..zip.len() {
            let file = zip.by_index(i)?;
            if !file.name().to_lowercase().ends_with(".csv") {
                continue;
            }

            let mut csv_reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);
            normalize_headers(&mut csv_reader, archive, CEMS_HOURLY_COLUMNS)?;

            for result in csv_reader.deserialize() {
                let hour: CemsHour = result?;
                let date = parse_op_date(&hour.op_date)?;

                let plant = plants
                    .entry((hour.plant_id, date.year(), date.month()))
                    .or_insert_with(|| CemsEmission {
                        plant_id: hour.plant_id,
                        year: date.year(),
                        month: date.month(),
                        co2mass_kg: None,
                        gload_mwh: None,
                        heatinput_mmbtu: None,
                    });
                let co2_kg = hour.co2_mass_tons.map(|tons| tons * KG_PER_SHORT_TON);
                add_reported(&mut plant.co2mass_kg, co2_kg);
                add_reported(&mut plant.gload_mwh, hour.gload_mwh);
                add_reported(&mut plant.heatinput_mmbtu, hour.heatinput_mmbtu);
            }
        }
    }

    info!(plant_months = plants.len(), "CEMS records aggregated");
    Ok(plants.into_values().collect())
}

/// A blank hour leaves the sum untouched; a month stays blank until some hour
/// reports a value.
fn add_reported(sum: &mut Option<f64>, value: Option<f64>) {
    if let Some(value) = value {
        *sum = Some(sum.unwrap_or(0.0) + value);
    }
}

fn parse_op_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%m-%d-%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| Error::InvalidDate(raw.to_string()))
}

/// Extracts fuel codes and fossil emission factors (kg/mmBtu) from the first
/// sheet of the emission factor workbook.
pub(crate) fn emission_factors(paths: &FilePaths) -> Result<Vec<EmissionFactor>> {
    let path = paths.emission_factors_workbook();
    let missing = |column: &str| Error::MissingColumn { path: path.clone(), column: column.into() };

    let mut excel: Xlsx<_> = calamine::open_workbook(&path)?;
    let worksheets = excel.worksheets();
    let (_, sheet) = worksheets.first().ok_or_else(|| missing(FUEL_CODE))?;

    let header = |row: usize, col: usize| {
        sheet.get((row, col)).and_then(|cell| cell.get_string()).map(normalize_header)
    };
    let header_row = (0..sheet.height().min(100))
        .find(|&row| (0..sheet.width()).any(|col| header(row, col).as_deref() == Some(FUEL_CODE)))
        .ok_or_else(|| missing(FUEL_CODE))?;
    let find_col = |name: &str| {
        (0..sheet.width())
            .find(|&col| header(header_row, col).as_deref() == Some(name))
            .ok_or_else(|| missing(name))
    };
    let code_col = find_col(FUEL_CODE)?;
    let factor_col = find_col(FOSSIL_FACTOR)?;

    let mut factors = Vec::new();
    for row in (header_row + 1)..sheet.height() {
        let code = sheet.get((row, code_col)).and_then(|cell| cell.get_string());
        let factor = sheet.get((row, factor_col)).and_then(|cell| cell.get_float());

        if let (Some(code), Some(fossil_factor)) = (code, factor) {
            factors.push(EmissionFactor { fuel_code: code.trim().to_string(), fossil_factor });
        }
    }

    info!(fuels = factors.len(), "emission factors extracted");
    Ok(factors)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::{ZipWriter, write::FileOptions};

    use super::*;

    const HEADER: &str = "STATE,FACILITY_NAME,ORISPL_CODE,UNITID,OP_DATE,OP_HOUR,GLOAD (MW),\
                          CO2_MASS (tons),HEAT_INPUT (mmBtu)";

    fn write_archive(paths: &FilePaths, name: &str, rows: &[&str]) {
        std::fs::create_dir_all(paths.cems_dir()).unwrap();
        let file = File::create(paths.cems_dir().join(name)).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file("hourly.csv", FileOptions::default()).unwrap();
        writeln!(zip, "{HEADER}").unwrap();
        for row in rows {
            writeln!(zip, "{row}").unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn hourly_records_sum_to_plant_months() {
        let dir = tempfile::tempdir().unwrap();
        let paths = FilePaths::new(dir.path().to_path_buf(), 2019).unwrap();
        write_archive(
            &paths,
            "2019_01_al.zip",
            &[
                "AL,Barry,3,1,01-01-2019,0,100,50,500",
                "AL,Barry,3,2,01-01-2019,0,200,,700",
                "AL,Barry,3,1,01-02-2019,1,100,50,500",
                "AL,Gorgas,8,1,01-01-2019,0,0,,",
            ],
        );
        write_archive(&paths, "2019_02_al.zip", &["AL,Barry,3,1,02-01-2019,0,10,1,20"]);

        let monthly = cems_monthly(2019, &paths).unwrap();

        assert_eq!(monthly.len(), 3);
        let barry_jan = &monthly[0];
        assert_eq!((barry_jan.plant_id, barry_jan.month), (3, 1));
        assert_eq!(barry_jan.gload_mwh, Some(400.0));
        assert_eq!(barry_jan.heatinput_mmbtu, Some(1700.0));
        assert!((barry_jan.co2mass_kg.unwrap() - 100.0 * KG_PER_SHORT_TON).abs() < 1e-9);

        assert_eq!((monthly[1].plant_id, monthly[1].month), (3, 2));

        let gorgas = &monthly[2];
        assert_eq!(gorgas.co2mass_kg, None);
        assert_eq!(gorgas.heatinput_mmbtu, None);
        assert_eq!(gorgas.gload_mwh, Some(0.0));
    }

    #[test]
    fn both_date_formats_parse() {
        assert_eq!(parse_op_date("03-15-2019").unwrap().month(), 3);
        assert_eq!(parse_op_date("2019-03-15").unwrap().month(), 3);
        assert!(matches!(parse_op_date("15.03.2019"), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn missing_cems_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let paths = FilePaths::new(dir.path().to_path_buf(), 2019).unwrap();
        std::fs::create_dir_all(paths.cems_dir()).unwrap();
        let file = File::create(paths.cems_dir().join("2019_05.zip")).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file("hourly.csv", FileOptions::default()).unwrap();
        writeln!(zip, "ORISPL_CODE,OP_DATE\n3,01-01-2019").unwrap();
        zip.finish().unwrap();

        let err = cems_monthly(2019, &paths).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column, .. } if column == "gload_mwh"));
    }
}
