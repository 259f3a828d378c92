//! Tiered cache behaviour seen through the public lake API.

mod common;

use common::*;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use std::sync::Arc;
use ticklake_core::domain::Period;
use ticklake_core::paths::HourPath;
use ticklake_core::sequence::SequenceExt;
use ticklake_core::DataError;

fn hour() -> HourPath {
    HourPath::new(SYMBOL, at(2018, 7, 5, 5, 0, 0))
}

#[test]
fn second_fetch_is_a_disk_hit() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour().key(), minute_hour(116_700));
    let lake = lake(dir.path(), transport.clone());
    let cache = lake.tick_cache();

    let first = cache.get(&hour()).unwrap();
    let second = cache.get(&hour()).unwrap();
    assert_eq!(first, second);
    assert_eq!(transport.calls(), 1);

    let disk = cache.layers()[0].counters();
    assert_eq!((disk.misses, disk.hits), (1, 1));
    for layer in cache.layers() {
        let s = layer.counters();
        assert_eq!(s.hits + s.misses, s.retrieves);
    }
    assert_eq!(cache.fetcher().counters().retrieves, 1);
    assert!(dir.path().join(hour().key()).is_file());
}

#[test]
fn busy_provider_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour().key(), minute_hour(116_700));
    transport.busy_for(hour().key(), 2);
    let lake = lake(dir.path(), transport.clone());

    let ticks = lake
        .search(SYMBOL, at(2018, 7, 5, 5, 0, 0), at(2018, 7, 5, 5, 30, 0), None)
        .unwrap()
        .collect_vec()
        .unwrap();
    assert_eq!(ticks.len(), 31);

    let direct = lake.tick_cache().fetcher().counters();
    assert_eq!(direct.retrieves, 1);
    assert_eq!(direct.retries, 2);
    assert_eq!(transport.calls(), 3);
}

#[test]
fn missing_hour_propagates_and_is_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.missing(hour().key());
    let lake = lake(dir.path(), transport.clone());

    let err = lake
        .search(SYMBOL, at(2018, 7, 5, 5, 0, 0), at(2018, 7, 5, 5, 30, 0), None)
        .unwrap()
        .collect_vec();
    assert!(matches!(err, Err(DataError::HttpStatus { status: 404, .. })));
    assert_eq!(lake.tick_cache().fetcher().counters().retries, 0);
    assert!(!dir.path().join(hour().key()).exists());
}

#[test]
fn object_store_is_shared_between_lakes() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemory::new());
    let transport = ScriptedTransport::new();
    transport.serve(hour().key(), minute_hour(116_700));

    let first_dir = tempfile::tempdir().unwrap();
    let first = lake_with(test_config(first_dir.path()), transport.clone(), store.clone());
    first.tick_cache().get(&hour()).unwrap();
    assert_eq!(transport.calls(), 1);

    let second_dir = tempfile::tempdir().unwrap();
    let second = lake_with(test_config(second_dir.path()), transport.clone(), store);
    second.tick_cache().get(&hour()).unwrap();
    assert_eq!(transport.calls(), 1);

    let layers = second.tick_cache().layers();
    assert_eq!(layers[0].counters().misses, 1);
    assert_eq!(layers[1].counters().hits, 1);
    assert!(second_dir.path().join(hour().key()).is_file());
}

#[test]
fn bar_days_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour().key(), minute_hour(116_700));
    let lake = lake(dir.path(), transport.clone());

    let query = || {
        lake.aggregate_from_ticks(
            SYMBOL,
            Period::OneHour,
            at(2018, 7, 5, 0, 0, 0),
            at(2018, 7, 5, 23, 0, 0),
            None,
            None,
        )
        .unwrap()
        .collect_vec()
        .unwrap()
    };
    let bars = query();
    assert_eq!(bars.len(), 1);
    assert_eq!((bars[0].open, bars[0].close), (116_700, 116_759));
    assert_eq!(transport.calls(), 24);

    assert_eq!(query(), bars);
    assert_eq!(transport.calls(), 24);
    assert_eq!(lake.bar_cache().layers()[0].counters().hits, 1);
    assert!(dir.path().join("bars/1h/EURUSD/2018-07-05.json").is_file());
}

#[test]
fn stats_name_every_tier() {
    let dir = tempfile::tempdir().unwrap();
    let lake = lake(dir.path(), ScriptedTransport::new());
    lake.tick_cache().get(&hour()).unwrap();
    let stats = lake.tick_stats();
    assert!(stats.starts_with("disk: retrieved=1 hits=0 misses=1"));
    assert!(stats.contains("object-store: retrieved=1"));
    assert!(stats.ends_with("direct: retrieved=1 retries=0"));
    assert!(lake.bar_stats().ends_with("aggregate"));
}
