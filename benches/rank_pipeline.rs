// Score + rank latency for one request against the shipped demo artifacts

use std::path::PathBuf;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crop_advisor::{
    AliasTable, CropNameReconciler, FeatureVector, HistoricalCropIndex, HybridRanker, RankerConfig,
    SoilReadings, SuitabilityScorer,
};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(name)
}

fn bench_rank_pipeline(c: &mut Criterion) {
    let scorer = SuitabilityScorer::from_json_file(&data_path("crop_model.json")).unwrap();
    let history = HistoricalCropIndex::from_csv(&data_path("crop_production_sample.csv"), false).unwrap();
    let ranker = HybridRanker::new(
        Arc::new(history),
        Arc::new(CropNameReconciler::new(AliasTable::builtin().unwrap())),
        RankerConfig::default(),
    );

    let readings = SoilReadings {
        nitrogen: 90.0,
        phosphorus: 42.0,
        potassium: 43.0,
        temperature: 20.9,
        humidity: 82.0,
        ph: 6.5,
        rainfall: 202.9,
    };
    let plain = FeatureVector::new(readings, None, None, None).unwrap();
    let located = FeatureVector::new(readings, Some("Kharif"), Some("Maharashtra"), Some("Pune")).unwrap();

    c.bench_function("score", |b| b.iter(|| scorer.score(black_box(&plain)).unwrap()));

    c.bench_function("score_and_rank_probability_only", |b| {
        b.iter(|| {
            let dist = scorer.score(black_box(&plain)).unwrap();
            ranker.rank(&dist, plain.region(), plain.season()).unwrap()
        })
    });

    c.bench_function("score_and_rank_historical", |b| {
        b.iter(|| {
            let dist = scorer.score(black_box(&located)).unwrap();
            ranker.rank(&dist, located.region(), located.season()).unwrap()
        })
    });
}

criterion_group!(benches, bench_rank_pipeline);
criterion_main!(benches);
