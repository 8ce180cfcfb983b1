use proptest::prelude::*;
use report_engine::{
    aggregate, filter_rows, next_filter_set, Aggregation, ChartConfig, FilterSet, FilterTarget,
    Row, SeriesKey, SortBy, Value,
};
use std::collections::HashMap;

const CASES: u32 = 256;
const REGIONS: [&str; 4] = ["North", "South", "East", "West"];
const CHANNELS: [&str; 3] = ["web", "email", "sms"];

fn arb_label(labels: &'static [&'static str]) -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => prop::sample::select(labels).prop_map(Value::from),
        1 => Just(Value::Blank),
    ]
}

fn arb_measure() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-1_000i32..1_000).prop_map(Value::from),
        2 => (-1_000.0f64..1_000.0).prop_map(Value::Number),
        1 => "[0-9]{1,3}".prop_map(Value::Text),
        1 => "[a-z]{0,3}".prop_map(Value::Text),
        1 => Just(Value::Blank),
    ]
}

fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (arb_label(&REGIONS), arb_label(&CHANNELS), arb_measure()).prop_map(
            |(region, channel, sales)| {
                Row::from([("region", region), ("channel", channel), ("sales", sales)])
            },
        ),
        0..40,
    )
}

fn arb_filter(labels: &'static [&'static str]) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(labels).prop_map(str::to_string), 0..3)
}

fn config(aggregation: Aggregation, legend: bool) -> ChartConfig {
    ChartConfig {
        x_key: Some("region".to_string()),
        y_key: Some("sales".to_string()),
        legend_key: legend.then(|| "channel".to_string()),
        y_aggregation: aggregation,
        ..ChartConfig::default()
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

type CellKey = (String, String);

fn expected_cells(rows: &[Row]) -> HashMap<CellKey, (f64, usize)> {
    let mut cells: HashMap<CellKey, (f64, usize)> = HashMap::new();
    for row in rows {
        let key = (
            row.value("region").text_or("N/A"),
            row.value("channel").text_or("Other"),
        );
        let cell = cells.entry(key).or_default();
        cell.0 += row.value("sales").coerce_number();
        cell.1 += 1;
    }
    cells
}

fn legend_value(key: &SeriesKey) -> String {
    key.legend_value().unwrap_or_default().to_string()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn sum_matches_row_totals_per_group_and_series(rows in arb_rows()) {
        let out = aggregate(&rows, &config(Aggregation::Sum, true), &[]).unwrap();
        let expected = expected_cells(&rows);
        for agg in &out {
            for series in &agg.series {
                let key = (agg.x_value.clone(), legend_value(&series.key));
                let want = expected.get(&key).map(|c| c.0).unwrap_or(0.0);
                prop_assert!(close(series.value, want), "{key:?}: {} != {want}", series.value);
            }
        }
        let groups: std::collections::HashSet<_> = expected.keys().map(|k| k.0.clone()).collect();
        prop_assert_eq!(out.len(), groups.len());
    }

    #[test]
    fn avg_is_sum_over_count_and_count_ignores_measure(rows in arb_rows()) {
        let sums = aggregate(&rows, &config(Aggregation::Sum, false), &[]).unwrap();
        let counts = aggregate(&rows, &config(Aggregation::Count, false), &[]).unwrap();
        let avgs = aggregate(&rows, &config(Aggregation::Avg, false), &[]).unwrap();
        let unmeasured = ChartConfig { y_key: None, ..config(Aggregation::Count, false) };
        let counts_without_y = aggregate(&rows, &unmeasured, &[]).unwrap();

        prop_assert_eq!(&counts, &counts_without_y);
        for ((sum, count), avg) in sums.iter().zip(&counts).zip(&avgs) {
            prop_assert!(count.primary_value() >= 1.0);
            prop_assert!(close(avg.primary_value(), sum.primary_value() / count.primary_value()));
        }
    }

    #[test]
    fn min_max_are_finite(rows in arb_rows()) {
        for agg in [Aggregation::Min, Aggregation::Max] {
            for row in aggregate(&rows, &config(agg, true), &[]).unwrap() {
                for series in &row.series {
                    prop_assert!(series.value.is_finite());
                }
            }
        }
    }

    #[test]
    fn value_desc_top_n_is_bounded_and_ordered(rows in arb_rows(), top_n in 1usize..6) {
        let all = aggregate(&rows, &config(Aggregation::Sum, false), &[]).unwrap();
        let cfg = ChartConfig {
            sort_by: Some(SortBy::ValueDesc),
            top_n: Some(top_n),
            ..config(Aggregation::Sum, false)
        };
        let out = aggregate(&rows, &cfg, &[]).unwrap();
        prop_assert_eq!(out.len(), top_n.min(all.len()));
        for pair in out.windows(2) {
            prop_assert!(pair[0].primary_value() >= pair[1].primary_value());
        }
    }

    #[test]
    fn filtering_by_a_group_reproduces_it(rows in arb_rows()) {
        let cfg = config(Aggregation::Sum, true);
        for group in aggregate(&rows, &cfg, &[]).unwrap() {
            let filters = FilterSet::empty().with_column_in("region", [group.x_value.clone()]);
            let filtered = filter_rows(&rows, &filters);
            let again = aggregate(filtered.iter().copied(), &cfg, &[]).unwrap();
            prop_assert_eq!(again.len(), 1);
            prop_assert_eq!(&again[0].x_value, &group.x_value);
            prop_assert!(close(again[0].total(), group.total()));
        }
    }

    #[test]
    fn filtering_is_commutative(
        rows in arb_rows(),
        regions in arb_filter(&REGIONS),
        channels in arb_filter(&CHANNELS),
    ) {
        let by_region = FilterSet::empty().with_column_in("region", regions);
        let by_channel = FilterSet::empty().with_column_in("channel", channels.clone());
        let both = by_region.clone().with_column_in("channel", channels);

        let region_then_channel: Vec<&Row> = rows
            .iter()
            .filter(|r| by_region.matches(r))
            .filter(|r| by_channel.matches(r))
            .collect();
        let channel_then_region: Vec<&Row> = rows
            .iter()
            .filter(|r| by_channel.matches(r))
            .filter(|r| by_region.matches(r))
            .collect();

        prop_assert_eq!(&region_then_channel, &channel_then_region);
        prop_assert_eq!(&region_then_channel, &filter_rows(&rows, &both));
    }

    #[test]
    fn toggling_twice_restores_the_selection(
        selected in arb_filter(&REGIONS),
        value in prop::sample::select(REGIONS.to_vec()),
    ) {
        let filters = FilterSet::empty().with_column_in("region", selected);
        let target = FilterTarget { dimension: "region".to_string(), value: value.to_string() };
        let twice = next_filter_set(&next_filter_set(&filters, &target), &target);

        if filters.contains("region", value) {
            let mut before = filters.values("region").to_vec();
            let mut after = twice.values("region").to_vec();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
        } else {
            prop_assert_eq!(twice, filters);
        }
    }
}
