use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    period::{Period, PeriodKey},
    records::{FinalCo2, GenFuels},
};

/// lb/MWh per g/kWh
pub(crate) const G2LB: f64 = 2.2046;

pub(crate) fn g2lb(g_per_kwh: f64) -> f64 {
    g_per_kwh * G2LB
}

/// Emissions intensity of all facilities in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct IndexRow {
    pub(crate) year: i32,
    pub(crate) quarter: Option<u32>,
    pub(crate) month: Option<u32>,
    #[serde(rename = "final co2 (kg)")]
    pub(crate) final_co2: f64,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "index (g/kwh)")]
    pub(crate) index_g_kwh: Option<f64>,
    #[serde(rename = "index (lb/mwh)")]
    pub(crate) index_lb_mwh: Option<f64>,
    #[serde(rename = "change since baseline")]
    pub(crate) change_since_baseline: Option<f64>,
}

impl IndexRow {
    fn key(&self) -> PeriodKey {
        PeriodKey { year: self.year, quarter: self.quarter, month: self.month }
    }
}

/// Emissions intensity of one fuel category in one period, scaled so the
/// categories add up to the period's final CO2.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct FuelIndexRow {
    pub(crate) year: i32,
    pub(crate) quarter: Option<u32>,
    pub(crate) month: Option<u32>,
    #[serde(rename = "fuel category")]
    pub(crate) category: String,
    #[serde(rename = "generation (mwh)")]
    pub(crate) generation: f64,
    #[serde(rename = "elec fuel fossil co2 (kg)")]
    pub(crate) elec_fuel_fossil_co2: f64,
    #[serde(rename = "adjusted co2 (kg)")]
    pub(crate) adjusted_co2: Option<f64>,
    #[serde(rename = "adjusted index (g/kwh)")]
    pub(crate) adjusted_index_g_kwh: Option<f64>,
    #[serde(rename = "adjusted index (lb/mwh)")]
    pub(crate) adjusted_index_lb_mwh: Option<f64>,
}

fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    (denominator != 0.0).then(|| numerator / denominator)
}

/// Total final CO2 over total generation of the facilities, per period.
pub(crate) fn period_index(
    co2: &[FinalCo2],
    gen_fuels: &[GenFuels],
    period: Period,
) -> Result<Vec<IndexRow>> {
    let mut totals = BTreeMap::<PeriodKey, (f64, f64)>::new();
    for row in co2 {
        totals.entry(period.key(row.year, row.month)?).or_default().0 += row.final_co2;
    }
    for row in gen_fuels {
        totals.entry(period.key(row.year, row.month)?).or_default().1 += row.generation;
    }

    Ok(totals
        .into_iter()
        .map(|(key, (final_co2, generation))| {
            let index = ratio(final_co2, generation);
            IndexRow {
                year: key.year,
                quarter: key.quarter,
                month: key.month,
                final_co2,
                generation,
                index_g_kwh: index,
                index_lb_mwh: index.map(g2lb),
                change_since_baseline: None,
            }
        })
        .collect())
}

/// Fractional change of every row's intensity from the generation-weighted
/// intensity of `baseline_year`.
pub(crate) fn change_since_baseline(
    rows: &[IndexRow],
    baseline_year: i32,
) -> Result<Vec<IndexRow>> {
    let (weighted, generation) = rows
        .iter()
        .filter(|row| row.year == baseline_year)
        .filter_map(|row| row.index_g_kwh.map(|index| (index * row.generation, row.generation)))
        .fold((0.0, 0.0), |(w, g), (row_w, row_g)| (w + row_w, g + row_g));

    let baseline = ratio(weighted, generation)
        .filter(|base| *base != 0.0)
        .ok_or(Error::MissingBaseline(baseline_year))?;

    Ok(rows
        .iter()
        .map(|row| IndexRow {
            change_since_baseline: row.index_g_kwh.map(|index| (index - baseline) / baseline),
            ..row.clone()
        })
        .collect())
}

/// Distributes the final CO2 of each period in `index` over fuel categories in
/// proportion to their calculated electric fossil CO2, and derives the
/// resulting intensities.
pub(crate) fn generation_index(
    gen_fuels: &[GenFuels],
    index: &[IndexRow],
    period: Period,
) -> Result<Vec<FuelIndexRow>> {
    let final_co2: BTreeMap<_, _> = index.iter().map(|row| (row.key(), row.final_co2)).collect();

    let mut by_fuel = BTreeMap::<(PeriodKey, &str), (f64, f64)>::new();
    let mut calc_total_co2 = BTreeMap::<PeriodKey, f64>::new();
    for row in gen_fuels {
        let key = period.key(row.year, row.month)?;
        let entry = by_fuel.entry((key, row.category.as_str())).or_default();
        entry.0 += row.generation;
        entry.1 += row.elec_fuel_fossil_co2;
        *calc_total_co2.entry(key).or_default() += row.elec_fuel_fossil_co2;
    }

    by_fuel
        .into_iter()
        .map(|((key, category), (generation, elec_fuel_fossil_co2))| -> Result<FuelIndexRow> {
            let period_co2 =
                *final_co2.get(&key).ok_or_else(|| Error::MissingPeriod(key.to_string()))?;
            let adjusted_co2 = ratio(elec_fuel_fossil_co2, calc_total_co2[&key])
                .map(|share| share * period_co2);
            let adjusted_index = adjusted_co2.and_then(|co2| ratio(co2, generation));

            Ok(FuelIndexRow {
                year: key.year,
                quarter: key.quarter,
                month: key.month,
                category: category.to_string(),
                generation,
                elec_fuel_fossil_co2,
                adjusted_co2,
                adjusted_index_g_kwh: adjusted_index,
                adjusted_index_lb_mwh: adjusted_index.map(g2lb),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    fn gen_row(category: &str, month: u32, generation: f64, co2: f64) -> GenFuels {
        GenFuels {
            generation,
            elec_fuel_fossil_co2: co2,
            ..GenFuels::empty(category.to_string(), 2019, month, None)
        }
    }

    fn index_row(year: i32, generation: f64, index: f64) -> IndexRow {
        IndexRow {
            year,
            quarter: None,
            month: None,
            final_co2: index * generation,
            generation,
            index_g_kwh: Some(index),
            index_lb_mwh: Some(g2lb(index)),
            change_since_baseline: None,
        }
    }

    #[test]
    fn grams_to_pounds() {
        assert!(approx(g2lb(500.0), 1102.3));
    }

    #[test]
    fn period_index_divides_co2_by_generation() {
        let co2 = vec![
            FinalCo2 { year: 2019, month: 1, plant_id: 1, final_co2: 300.0 },
            FinalCo2 { year: 2019, month: 2, plant_id: 1, final_co2: 200.0 },
        ];
        let gen_fuels = vec![gen_row("Coal", 1, 0.5, 0.0), gen_row("Natural Gas", 2, 0.5, 0.0)];

        let annual = period_index(&co2, &gen_fuels, Period::Annual).unwrap();
        assert_eq!(annual.len(), 1);
        assert_eq!(annual[0].final_co2, 500.0);
        assert_eq!(annual[0].index_g_kwh, Some(500.0));
        assert!(approx(annual[0].index_lb_mwh.unwrap(), 1102.3));

        let monthly = period_index(&co2, &gen_fuels, Period::Monthly).unwrap();
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].month, Some(1));
        assert_eq!(monthly[0].index_g_kwh, Some(600.0));
    }

    #[test]
    fn period_without_generation_has_no_index() {
        let co2 = vec![FinalCo2 { year: 2019, month: 1, plant_id: 1, final_co2: 300.0 }];
        let rows = period_index(&co2, &[], Period::Annual).unwrap();
        assert_eq!(rows[0].index_g_kwh, None);
    }

    #[test]
    fn change_is_relative_to_weighted_baseline() {
        let rows = vec![
            index_row(2005, 100.0, 600.0),
            index_row(2005, 300.0, 400.0),
            index_row(2019, 100.0, 225.0),
        ];

        let changed = change_since_baseline(&rows, 2005).unwrap();

        // baseline = (600 * 100 + 400 * 300) / 400 = 450
        assert!(approx(changed[0].change_since_baseline.unwrap(), 150.0 / 450.0));
        assert!(approx(changed[2].change_since_baseline.unwrap(), -0.5));
    }

    #[test]
    fn missing_baseline_year_is_an_error() {
        let rows = vec![index_row(2019, 100.0, 225.0)];
        let err = change_since_baseline(&rows, 2005).unwrap_err();
        assert!(matches!(err, Error::MissingBaseline(2005)));
    }

    #[test]
    fn fuel_intensities_add_up_to_period_co2() {
        let gen_fuels = vec![
            gen_row("Coal", 1, 100.0, 90_000.0),
            gen_row("Coal", 2, 120.0, 100_000.0),
            gen_row("Natural Gas", 1, 200.0, 80_000.0),
            gen_row("Nuclear", 2, 300.0, 0.0),
        ];
        let index = vec![IndexRow {
            final_co2: 250_000.0,
            ..index_row(2019, 720.0, 0.0)
        }];

        let fuels = generation_index(&gen_fuels, &index, Period::Annual).unwrap();

        assert_eq!(fuels.len(), 3);
        let weighted: f64 =
            fuels.iter().map(|f| f.adjusted_index_g_kwh.unwrap() * f.generation).sum();
        assert!(approx(weighted, 250_000.0));

        let coal = &fuels[0];
        assert_eq!(coal.category, "Coal");
        assert!(approx(coal.adjusted_co2.unwrap(), 190_000.0 / 270_000.0 * 250_000.0));
        let coal_index = coal.adjusted_index_g_kwh.unwrap();
        assert!(approx(coal.adjusted_index_lb_mwh.unwrap(), g2lb(coal_index)));
        assert_eq!(fuels[2].adjusted_co2, Some(0.0));
    }

    #[test]
    fn monthly_fuel_index_uses_monthly_totals() {
        let gen_fuels = vec![gen_row("Coal", 1, 100.0, 50.0), gen_row("Coal", 2, 100.0, 50.0)];
        let co2 = vec![
            FinalCo2 { year: 2019, month: 1, plant_id: 1, final_co2: 40.0 },
            FinalCo2 { year: 2019, month: 2, plant_id: 1, final_co2: 60.0 },
        ];
        let index = period_index(&co2, &gen_fuels, Period::Monthly).unwrap();

        let fuels = generation_index(&gen_fuels, &index, Period::Monthly).unwrap();

        assert_eq!(fuels[0].adjusted_co2, Some(40.0));
        assert_eq!(fuels[1].adjusted_co2, Some(60.0));
        assert_eq!(fuels[1].adjusted_index_g_kwh, Some(0.6));
    }

    #[test]
    fn period_missing_from_index_is_an_error() {
        let gen_fuels = vec![gen_row("Coal", 1, 100.0, 50.0)];
        let err = generation_index(&gen_fuels, &[], Period::Annual).unwrap_err();
        assert!(matches!(err, Error::MissingPeriod(period) if period == "2019"));
    }

    #[test]
    fn period_without_calculated_co2_has_no_adjusted_values() {
        let gen_fuels = vec![gen_row("Nuclear", 1, 100.0, 0.0)];
        let index = vec![index_row(2019, 100.0, 0.0)];

        let fuels = generation_index(&gen_fuels, &index, Period::Annual).unwrap();
        assert_eq!(fuels[0].adjusted_co2, None);
        assert_eq!(fuels[0].adjusted_index_g_kwh, None);
    }
}
