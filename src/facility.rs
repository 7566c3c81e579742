//! Reconciliation of CEMS-reported emissions with the CO2 calculated from EIA
//! fuel consumption, one facility-month at a time.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use crate::{
    fuel_category::{FuelCategories, group_fuel_cats},
    records::{
        AdjustedEmission, CemsEmission, FacilityCo2, FacilityFuel, FacilityMonth, FinalCo2,
        GenFuels, GroupedFacility,
    },
};

/// CEMS emissions below this many g CO2 per kWh of gross load are not
/// physically plausible for a fuel-burning facility.
pub(crate) const LOW_INDEX_THRESHOLD: f64 = 300.0;

/// Row counts of the inner join between CEMS records and grouped facilities.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct JoinReport {
    pub(crate) matched: usize,
    pub(crate) cems_only: usize,
    pub(crate) fuel_only: usize,
}

#[derive(Debug)]
pub(crate) struct FacilityOutput {
    pub(crate) co2: Vec<FinalCo2>,
    /// Generation and fuels per state-level fuel type.
    pub(crate) gen_fuels_state: Vec<GenFuels>,
    /// Generation and fuels per custom fuel category.
    pub(crate) gen_fuels: Vec<GenFuels>,
    pub(crate) join: JoinReport,
}

/// Compiles the facilities of one region into final CO2 per facility-month and
/// generation/fuel consumption at both fuel category levels.
pub(crate) fn facility_emission_gen(
    eia_facility: &[FacilityFuel],
    cems: &[CemsEmission],
    state_fuel_cat: &FuelCategories,
    custom_fuel_cat: &FuelCategories,
) -> FacilityOutput {
    info!(rows = eia_facility.len(), "Grouping facilities");
    let grouped = group_facility_data(eia_facility);

    info!(rows = cems.len(), "Adjusting CEMS emissions");
    let (adjusted, join) = adjust_cems_emissions(cems, &grouped);

    info!("Calculating CO2");
    let co2 = facility_co2(&adjusted, &grouped).iter().map(FinalCo2::from).collect();

    info!("Gen/fuels to state categories");
    let facility_rows: Vec<GenFuels> = eia_facility.iter().map(GenFuels::from).collect();
    let gen_fuels_state = group_fuel_cats(&facility_rows, state_fuel_cat);

    info!("Gen/fuels to custom categories");
    let gen_fuels = group_fuel_cats(&gen_fuels_state, custom_fuel_cat);

    FacilityOutput { co2, gen_fuels_state, gen_fuels, join }
}

/// Sums calculated CO2 and generation per facility-month and derives the
/// electric fossil share of total CO2.
pub(crate) fn group_facility_data(eia: &[FacilityFuel]) -> Vec<GroupedFacility> {
    let mut grouped = BTreeMap::<FacilityMonth, GroupedFacility>::new();
    for fuel in eia {
        let key = fuel.key();
        grouped.entry(key).or_insert_with(|| GroupedFacility::new(key)).add_fuel(fuel);
    }

    grouped
        .into_values()
        .map(|mut facility| {
            facility.co2_ratio =
                co2_ratio(facility.elec_fuel_fossil_co2, facility.all_fuel_total_co2);
            facility
        })
        .collect()
}

fn co2_ratio(elec_fossil: f64, all_total: f64) -> f64 {
    let ratio = elec_fossil / all_total;
    if ratio.is_finite() { ratio } else { 0.0 }
}

/// Joins CEMS records with grouped facility data and derives an adjusted CO2
/// value that excludes non-electric (CHP, biomass) emissions.
///
/// Facility-months missing from either side are dropped; the returned report
/// counts them.
pub(crate) fn adjust_cems_emissions(
    cems: &[CemsEmission],
    eia_grouped: &[GroupedFacility],
) -> (Vec<AdjustedEmission>, JoinReport) {
    let by_key: BTreeMap<_, _> = eia_grouped.iter().map(|g| (g.key(), g)).collect();
    let cems_keys: BTreeSet<_> = cems.iter().map(CemsEmission::key).collect();

    let mut report = JoinReport {
        fuel_only: by_key.keys().filter(|key| !cems_keys.contains(*key)).count(),
        ..Default::default()
    };

    let mut adjusted = Vec::with_capacity(cems.len());
    for record in cems {
        let Some(facility) = by_key.get(&record.key()) else {
            report.cems_only += 1;
            continue;
        };
        report.matched += 1;
        adjusted.push(adjust_record(record, facility));
    }

    if report.cems_only > 0 || report.fuel_only > 0 {
        warn!(
            matched = report.matched,
            cems_only = report.cems_only,
            fuel_only = report.fuel_only,
            "facility-months without a counterpart are left out of the adjustment"
        );
    } else {
        info!(matched = report.matched, "all facility-months matched");
    }

    (adjusted, report)
}

fn adjust_record(record: &CemsEmission, facility: &GroupedFacility) -> AdjustedEmission {
    let cems_index = match (record.co2mass_kg, record.gload_mwh) {
        (Some(co2), Some(gload)) if gload != 0.0 => Some(co2 / gload),
        _ => None,
    };

    // Only facilities that burned fuel with calculated emissions can be checked.
    let checkable = record.heatinput_mmbtu.is_some_and(|heat| heat > 0.0)
        && facility.all_fuel_total_co2 > 0.0;

    let mut adj_co2 = record.co2mass_kg;
    if checkable && !record.co2mass_kg.is_some_and(|co2| co2 > 0.0) {
        adj_co2 = None;
    } else if checkable && cems_index.is_some_and(|index| index < LOW_INDEX_THRESHOLD) {
        adj_co2 = None;
    }
    let adj_co2 = adj_co2.map(|co2| co2 * facility.co2_ratio);

    AdjustedEmission {
        plant_id: record.plant_id,
        year: record.year,
        month: record.month,
        co2mass_kg: record.co2mass_kg,
        gload_mwh: record.gload_mwh,
        heatinput_mmbtu: record.heatinput_mmbtu,
        all_fuel_total_co2: facility.all_fuel_total_co2,
        co2_ratio: facility.co2_ratio,
        cems_index,
        adj_co2,
    }
}

/// Left-joins adjusted emissions onto every grouped facility-month. Final CO2
/// falls back to the calculated electric fossil CO2 where no adjusted value
/// exists.
pub(crate) fn facility_co2(
    epa_adj: &[AdjustedEmission],
    eia_grouped: &[GroupedFacility],
) -> Vec<FacilityCo2> {
    let mut adjusted_by_key = BTreeMap::<_, Vec<&AdjustedEmission>>::new();
    for adj in epa_adj {
        adjusted_by_key.entry(adj.key()).or_default().push(adj);
    }

    let row = |facility: &GroupedFacility, adj_co2: Option<f64>| FacilityCo2 {
        year: facility.year,
        month: facility.month,
        plant_id: facility.plant_id,
        elec_fuel_fossil_co2: facility.elec_fuel_fossil_co2,
        generation: facility.generation,
        adj_co2,
        final_co2: adj_co2.unwrap_or(facility.elec_fuel_fossil_co2),
    };

    let mut out = Vec::with_capacity(eia_grouped.len());
    for facility in eia_grouped {
        match adjusted_by_key.get(&facility.key()) {
            Some(matches) => out.extend(matches.iter().map(|adj| row(facility, adj.adj_co2))),
            None => out.push(row(facility, None)),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fuel(
        plant_id: u32,
        month: u32,
        code: &str,
        elec_fossil: f64,
        all_total: f64,
    ) -> FacilityFuel {
        FacilityFuel {
            plant_id,
            year: 2019,
            month,
            fuel: code.to_string(),
            total_fuel: all_total / 50.0,
            elec_fuel: elec_fossil / 50.0,
            generation: 100.0,
            all_fuel_fossil_co2: all_total,
            elec_fuel_fossil_co2: elec_fossil,
            all_fuel_total_co2: all_total,
            elec_fuel_total_co2: elec_fossil,
        }
    }

    fn cems(plant_id: u32, month: u32, co2: f64, gload: f64, heat: f64) -> CemsEmission {
        CemsEmission {
            plant_id,
            year: 2019,
            month,
            co2mass_kg: Some(co2),
            gload_mwh: Some(gload),
            heatinput_mmbtu: Some(heat),
        }
    }

    fn grouped_one(elec_fossil: f64, all_total: f64) -> GroupedFacility {
        group_facility_data(&[fuel(1, 1, "NG", elec_fossil, all_total)]).remove(0)
    }

    #[test]
    fn co2_ratio_is_electric_share() {
        let grouped = grouped_one(50.0, 100.0);
        assert_eq!(grouped.co2_ratio, 0.5);
    }

    #[test]
    fn co2_ratio_without_total_is_zero() {
        assert_eq!(grouped_one(0.0, 0.0).co2_ratio, 0.0);
        assert_eq!(grouped_one(10.0, 0.0).co2_ratio, 0.0);
    }

    #[test]
    fn grouping_sums_fuels_of_one_facility_month() {
        let rows = vec![
            fuel(1, 1, "NG", 40.0, 50.0),
            fuel(1, 1, "DFO", 10.0, 50.0),
            fuel(1, 2, "NG", 5.0, 5.0),
            fuel(2, 1, "BIT", 0.0, 0.0),
        ];

        let grouped = group_facility_data(&rows);

        assert_eq!(grouped.len(), 3);
        let first = &grouped[0];
        assert_eq!(first.key(), (2019, 1, 1));
        assert_eq!(first.elec_fuel_fossil_co2, 50.0);
        assert_eq!(first.all_fuel_total_co2, 100.0);
        assert_eq!(first.generation, 200.0);
        assert_eq!(first.co2_ratio, 0.5);
        for g in &grouped {
            assert!((0.0..=1.0).contains(&g.co2_ratio));
        }
    }

    #[test]
    fn zero_reported_co2_with_heat_input_is_unknown() {
        let grouped = vec![grouped_one(50.0, 100.0)];
        let (adj, _) = adjust_cems_emissions(&[cems(1, 1, 0.0, 10.0, 10.0)], &grouped);

        assert_eq!(adj[0].adj_co2, None);

        let co2 = facility_co2(&adj, &grouped);
        assert_eq!(co2[0].final_co2, 50.0);
    }

    #[test]
    fn missing_reported_co2_with_heat_input_is_unknown() {
        let grouped = vec![grouped_one(50.0, 100.0)];
        let record = CemsEmission { co2mass_kg: None, ..cems(1, 1, 0.0, 10.0, 10.0) };

        let (adj, _) = adjust_cems_emissions(&[record], &grouped);
        assert_eq!(adj[0].adj_co2, None);
        assert_eq!(adj[0].cems_index, None);
    }

    #[test]
    fn low_index_is_unknown() {
        let grouped = vec![grouped_one(100.0, 100.0)];
        // 1000 kg over 10 MWh = 100 g/kWh
        let (adj, _) = adjust_cems_emissions(&[cems(1, 1, 1000.0, 10.0, 5.0)], &grouped);

        assert_eq!(adj[0].cems_index, Some(100.0));
        assert_eq!(adj[0].adj_co2, None);
    }

    #[test]
    fn low_index_without_heat_input_is_kept() {
        let grouped = vec![grouped_one(100.0, 100.0)];
        let (adj, _) = adjust_cems_emissions(&[cems(1, 1, 1000.0, 10.0, 0.0)], &grouped);

        assert_eq!(adj[0].adj_co2, Some(1000.0));
    }

    #[test]
    fn plausible_value_is_scaled_by_ratio() {
        let grouped = vec![grouped_one(50.0, 100.0)];
        // 5000 kg over 10 MWh = 500 g/kWh
        let (adj, report) = adjust_cems_emissions(&[cems(1, 1, 5000.0, 10.0, 5.0)], &grouped);

        assert_eq!(adj[0].adj_co2, Some(2500.0));
        assert_eq!(report, JoinReport { matched: 1, cems_only: 0, fuel_only: 0 });

        let co2 = facility_co2(&adj, &grouped);
        assert_eq!(co2[0].final_co2, 2500.0);
        assert_eq!(co2[0].adj_co2, Some(2500.0));
    }

    #[test]
    fn zero_ratio_zeroes_reported_co2() {
        let grouped = vec![grouped_one(0.0, 0.0)];
        let (adj, _) = adjust_cems_emissions(&[cems(1, 1, 5000.0, 10.0, 5.0)], &grouped);

        assert_eq!(adj[0].adj_co2, Some(0.0));
    }

    #[test]
    fn join_report_counts_unmatched_rows() {
        let grouped =
            group_facility_data(&[fuel(1, 1, "NG", 5.0, 5.0), fuel(2, 1, "NG", 5.0, 5.0)]);
        let records = vec![cems(1, 1, 5000.0, 10.0, 5.0), cems(3, 1, 1.0, 1.0, 1.0)];

        let (adj, report) = adjust_cems_emissions(&records, &grouped);

        assert_eq!(adj.len(), 1);
        assert_eq!(report, JoinReport { matched: 1, cems_only: 1, fuel_only: 1 });
    }

    #[test]
    fn every_facility_month_gets_final_co2() {
        let rows = vec![
            fuel(1, 1, "NG", 40.0, 50.0),
            fuel(2, 1, "BIT", 70.0, 80.0),
            fuel(3, 2, "NG", 0.0, 0.0),
        ];
        let grouped = group_facility_data(&rows);
        let (adj, _) = adjust_cems_emissions(&[cems(1, 1, 0.0, 0.0, 3.0)], &grouped);

        let co2 = facility_co2(&adj, &grouped);

        assert_eq!(co2.len(), 3);
        assert_eq!(co2[0].final_co2, 40.0);
        assert_eq!(co2[1].final_co2, 70.0);
        assert_eq!(co2[1].adj_co2, None);
        assert_eq!(co2[2].final_co2, 0.0);
    }

    #[test]
    fn pipeline_produces_custom_categories() {
        crate::logging::init_test();
        let rows = vec![
            fuel(1, 1, "BIT", 90.0, 100.0),
            fuel(1, 1, "SUB", 10.0, 10.0),
            fuel(2, 1, "NG", 40.0, 40.0),
        ];
        let state = FuelCategories::state_default().unwrap();
        let custom = FuelCategories::custom_default().unwrap();

        let out = facility_emission_gen(
            &rows,
            &[cems(1, 1, 100_000.0, 100.0, 50.0)],
            &state,
            &custom,
        );

        assert_eq!(out.co2.len(), 2);
        // 100000 * (100 / 110)
        assert!((out.co2[0].final_co2 - 100_000.0 * 100.0 / 110.0).abs() < 1e-6);
        assert_eq!(out.co2[1].final_co2, 40.0);
        assert_eq!(out.join, JoinReport { matched: 1, cems_only: 0, fuel_only: 1 });

        let categories: Vec<_> = out.gen_fuels.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Coal", "Natural Gas"]);
        assert_eq!(out.gen_fuels[0].generation, 200.0);

        let state_types: Vec<_> =
            out.gen_fuels_state.iter().map(|g| g.category.as_str()).collect();
        assert_eq!(state_types, vec!["COW", "NG"]);
    }

    #[test]
    fn both_category_levels_keep_totals() {
        let rows = vec![
            fuel(1, 1, "BIT", 90.0, 100.0),
            fuel(1, 1, "SUB", 10.0, 10.0),
            fuel(2, 1, "WAT", 0.0, 0.0),
        ];
        let state = FuelCategories::state_default().unwrap();
        let custom = FuelCategories::custom_default().unwrap();

        let out = facility_emission_gen(&rows, &[], &state, &custom);

        assert_eq!(out.gen_fuels_state.len(), 2);
        assert_eq!(out.gen_fuels_state[0].category, "COW");
        assert_eq!(out.gen_fuels_state[1].category, "HYC");
        assert_eq!(out.gen_fuels[1].category, "Hydro");
        let state_total: f64 = out.gen_fuels_state.iter().map(|g| g.generation).sum();
        let custom_total: f64 = out.gen_fuels.iter().map(|g| g.generation).sum();
        assert_eq!(state_total, custom_total);
        assert_eq!(out.co2[0].final_co2, 100.0);
    }
}
