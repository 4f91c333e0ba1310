//! Record store dump and reload.

mod common;

use approx::assert_relative_eq;
use basel_core::{
    distribution::ContinuousDistribution,
    engine::{SimEngine, BASEL_PROFILE},
    error::SimError,
    record::{RecordCategory, RecordStore},
};
use common::config;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("basel-records-{}-{name}", std::process::id()))
}

fn finished_engine() -> SimEngine {
    let mut engine = SimEngine::build(
        "dump".into(),
        config(2, 20, 3),
        Box::new(ContinuousDistribution::new(|o| 0.7 + 0.01 * o.day_index as f64)),
    )
    .unwrap();
    engine.run().unwrap();
    engine
}

#[test]
fn dump_then_load_reproduces_every_category() {
    let engine = finished_engine();
    let source = engine.profile(BASEL_PROFILE).unwrap().records();
    let mut reloaded = RecordStore::new(&config(2, 20, 3).sized_records()).unwrap();

    for category in RecordCategory::ALL {
        let path = temp_path(&format!("{}.csv", category.name()));
        source.dump(&path, category, b',').unwrap();
        reloaded.load(&path, category, b',').unwrap();
        std::fs::remove_file(&path).ok();

        let written = source.record(category);
        let restored = reloaded.record(category);
        assert_eq!(written.shape(), restored.shape());
        for (a, b) in written.as_slice().iter().zip(restored.as_slice()) {
            assert_relative_eq!(*a, *b, max_relative = 1e-12);
        }
    }
}

#[test]
fn dump_honours_delimiter_and_layout() {
    let engine = finished_engine();
    let records = engine.profile(BASEL_PROFILE).unwrap().records();
    let path = temp_path("exceedances.tsv");
    records.dump(&path, RecordCategory::Exceedances, b'\t').unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2, "one line per year");
    assert!(lines.iter().all(|l| l.split('\t').count() == 3), "one column per path");
}

#[test]
fn dump_requires_a_file_name() {
    let engine = finished_engine();
    let records = engine.profile(BASEL_PROFILE).unwrap().records();
    let err = records.dump("", RecordCategory::MrcDaily, b',').unwrap_err();
    assert!(matches!(err, SimError::NullInput(_)));
}

#[test]
fn load_rejects_a_mismatched_shape() {
    let engine = finished_engine();
    let records = engine.profile(BASEL_PROFILE).unwrap().records();
    let path = temp_path("mismatch.csv");
    records.dump(&path, RecordCategory::MrcDaily, b',').unwrap();

    let mut narrow = RecordStore::new(&config(2, 20, 2).sized_records()).unwrap();
    let result = narrow.load(&path, RecordCategory::MrcDaily, b',');
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}
