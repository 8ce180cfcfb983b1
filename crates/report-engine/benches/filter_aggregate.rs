use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use report_engine::{
    aggregate, filter_rows, Aggregation, ChartConfig, FieldDescriptor, FieldType, FilterSet, Row,
    SortBy, Value,
};
use std::time::Duration;

const REGIONS: [&str; 12] = [
    "North", "South", "East", "West", "Central", "Coastal", "Highlands", "Islands", "Metro",
    "Rural", "Border", "Valley",
];
const CHANNELS: [&str; 4] = ["web", "email", "sms", "kiosk"];

fn bench_rows() -> usize {
    std::env::var("REPORT_ENGINE_BENCH_ROWS")
        .ok()
        .and_then(|v| v.replace('_', "").parse::<usize>().ok())
        .filter(|&v| (10_000..=2_000_000).contains(&v))
        .unwrap_or(200_000)
}

fn build_rows(rows: usize) -> Vec<Row> {
    (0..rows)
        .map(|i| {
            // Every 50th submission skipped the score question.
            let score = if i % 50 == 0 {
                Value::Blank
            } else {
                Value::from((i % 11) as f64)
            };
            Row::from([
                ("region", Value::from(REGIONS[i % REGIONS.len()])),
                ("channel", Value::from(CHANNELS[(i / 7) % CHANNELS.len()])),
                ("score", score),
            ])
        })
        .collect()
}

fn bench_filter_aggregate(c: &mut Criterion) {
    let rows = bench_rows();
    let data = build_rows(rows);
    let fields = vec![
        FieldDescriptor::new("region", FieldType::Text),
        FieldDescriptor::new("channel", FieldType::Text),
        FieldDescriptor::new("score", FieldType::Number).measure(),
    ];

    let single = ChartConfig {
        x_key: Some("region".to_string()),
        y_key: Some("score".to_string()),
        y_aggregation: Aggregation::Avg,
        sort_by: Some(SortBy::ValueDesc),
        top_n: Some(5),
        ..ChartConfig::default()
    };
    let stacked = ChartConfig {
        legend_key: Some("channel".to_string()),
        sort_by: Some(SortBy::Ascending),
        top_n: None,
        ..single.clone()
    };
    let filters = FilterSet::empty()
        .with_column_in("region", REGIONS[..8].iter().copied())
        .with_column_in("channel", ["web", "email"]);

    let mut group = c.benchmark_group("filter_aggregate");
    group.sample_size(20);
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(rows as u64));

    group.bench_with_input(BenchmarkId::new("single_series", rows), &rows, |b, _| {
        b.iter(|| {
            let filtered = filter_rows(&data, &FilterSet::empty());
            let result = aggregate(filtered.iter().copied(), &single, &fields).unwrap();
            black_box(result);
        })
    });

    group.bench_with_input(BenchmarkId::new("stacked_filtered", rows), &rows, |b, _| {
        b.iter(|| {
            let filtered = filter_rows(&data, &filters);
            let result = aggregate(filtered.iter().copied(), &stacked, &fields).unwrap();
            black_box(result);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_filter_aggregate);
criterion_main!(benches);
