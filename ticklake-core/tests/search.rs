//! Tick search, bar aggregation and bar extension queries.

mod common;

use chrono::Duration;
use common::*;
use object_store::memory::InMemory;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use ticklake_core::codec::TickVisitor;
use ticklake_core::domain::{Period, Source};
use ticklake_core::sequence::{Sequence, SequenceExt};
use ticklake_core::{BarVisitor, DataError};

#[test]
fn search_spans_midnight_inclusively() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour_key(2018, 7, 5, 23), minute_hour(116_000));
    transport.serve(hour_key(2018, 7, 6, 0), minute_hour(117_000));
    let lake = lake(dir.path(), transport.clone());

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let visitor: TickVisitor = Arc::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let start = at(2018, 7, 5, 23, 30, 0);
    let end = at(2018, 7, 6, 0, 29, 0);
    let ticks = lake
        .search(SYMBOL, start, end, Some(visitor))
        .unwrap()
        .collect_vec()
        .unwrap();

    assert_eq!(ticks.len(), 60);
    assert_eq!(ticks.first().unwrap().time, start);
    assert_eq!(ticks.last().unwrap().time, end);
    assert!(ticks.windows(2).all(|w| w[0].time < w[1].time));
    assert!(ticks.iter().all(|t| t.source == Source::Historical));
    assert_eq!(seen.load(Ordering::SeqCst), 60);
    assert_eq!(
        transport.requested(),
        vec![hour_key(2018, 7, 5, 23), hour_key(2018, 7, 6, 0)]
    );
}

#[test]
fn search_is_lazy() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour_key(2018, 7, 5, 5), minute_hour(116_000));
    let lake = lake(dir.path(), transport.clone());

    let mut seq = lake
        .search(SYMBOL, at(2018, 7, 5, 5, 0, 0), at(2018, 7, 5, 9, 0, 0), None)
        .unwrap();
    assert_eq!(transport.calls(), 0);
    assert!(seq.has_next().unwrap());
    assert_eq!(transport.calls(), 1);
    seq.close().unwrap();
    assert_eq!(transport.calls(), 1);
}

#[test]
fn search_rejects_bad_ranges() {
    let dir = tempfile::tempdir().unwrap();
    let lake = lake(dir.path(), ScriptedTransport::new());
    let t = at(2018, 7, 5, 5, 0, 0);
    assert!(matches!(
        lake.search(SYMBOL, t, t, None),
        Err(DataError::InvalidRange { .. })
    ));
    assert!(matches!(
        lake.search(SYMBOL, t, t - Duration::hours(1), None),
        Err(DataError::InvalidRange { .. })
    ));
    assert!(matches!(
        lake.search(SYMBOL, at(2002, 1, 1, 0, 0, 0), t, None),
        Err(DataError::InvalidRange { .. })
    ));
}

#[test]
fn aggregation_trims_boundary_bars() {
    let dir = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new();
    transport.serve(hour_key(2018, 7, 5, 5), minute_hour(116_000));
    let lake = lake(dir.path(), transport.clone());

    let bars_seen = Arc::new(AtomicUsize::new(0));
    let bar_counter = Arc::clone(&bars_seen);
    let bar_visitor: BarVisitor = Arc::new(move |_| {
        bar_counter.fetch_add(1, Ordering::SeqCst);
    });
    let ticks_seen = Arc::new(AtomicUsize::new(0));
    let tick_counter = Arc::clone(&ticks_seen);
    let tick_visitor: TickVisitor = Arc::new(move |_| {
        tick_counter.fetch_add(1, Ordering::SeqCst);
    });

    let bars = lake
        .aggregate_from_ticks(
            SYMBOL,
            Period::FiveMinutes,
            at(2018, 7, 5, 5, 7, 0),
            at(2018, 7, 5, 5, 31, 0),
            Some(bar_visitor),
            Some(tick_visitor),
        )
        .unwrap()
        .collect_vec()
        .unwrap();

    let starts: Vec<_> = bars.iter().map(|b| b.start).collect();
    assert_eq!(starts.first(), Some(&at(2018, 7, 5, 5, 5, 0)));
    assert_eq!(starts.last(), Some(&at(2018, 7, 5, 5, 30, 0)));
    assert_eq!(bars.len(), 6);
    // minute ticks: the 05:05 bucket holds minutes 5..=9
    assert_eq!((bars[0].open, bars[0].close), (116_005, 116_009));
    assert_eq!(bars_seen.load(Ordering::SeqCst), 6);
    // the whole day was rebuilt, so every tick of it was visited
    assert_eq!(ticks_seen.load(Ordering::SeqCst), 60);
}

/// Bars on 2018-07-03 10h and 2018-07-05 05h; 2018-07-04 is empty.
fn sparse_lake(
    dir: &std::path::Path,
    floor_day: Option<u32>,
) -> (ticklake_core::TickLake, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    transport.serve(hour_key(2018, 7, 3, 10), minute_hour(115_000));
    transport.serve(hour_key(2018, 7, 5, 5), minute_hour(116_000));
    let mut config = test_config(dir);
    if let Some(day) = floor_day {
        config.beginning_of_time = at(2018, 7, day, 0, 0, 0);
    }
    let lake = lake_with(config, transport.clone(), Arc::new(InMemory::new()));
    (lake, transport)
}

#[test]
fn bars_before_skips_empty_days() {
    let dir = tempfile::tempdir().unwrap();
    let (lake, _) = sparse_lake(dir.path(), None);

    let bars = lake
        .bars_before(SYMBOL, Period::OneHour, at(2018, 7, 5, 6, 0, 0), 2)
        .unwrap()
        .collect_vec()
        .unwrap();
    let starts: Vec<_> = bars.iter().map(|b| b.start).collect();
    assert_eq!(starts, vec![at(2018, 7, 3, 10, 0, 0), at(2018, 7, 5, 5, 0, 0)]);
}

#[test]
fn bars_before_stops_at_beginning_of_time() {
    let dir = tempfile::tempdir().unwrap();
    let (lake, _) = sparse_lake(dir.path(), Some(3));

    let bars = lake
        .bars_before(SYMBOL, Period::OneHour, at(2018, 7, 5, 6, 0, 0), 5)
        .unwrap()
        .collect_vec()
        .unwrap();
    assert_eq!(bars.len(), 2);
    let unique: HashSet<_> = bars.iter().map(|b| b.start).collect();
    assert_eq!(unique.len(), bars.len());

    assert!(matches!(
        lake.bars_before(SYMBOL, Period::OneHour, at(2018, 7, 1, 0, 0, 0), 1),
        Err(DataError::InvalidRange { .. })
    ));
}

#[test]
fn bars_after_walks_forward_to_horizon() {
    let dir = tempfile::tempdir().unwrap();
    let (lake, _) = sparse_lake(dir.path(), None);

    let bars = lake
        .bars_after(
            SYMBOL,
            Period::FiveMinutes,
            at(2018, 7, 3, 0, 0, 0),
            14,
            at(2018, 7, 6, 0, 0, 0),
        )
        .unwrap()
        .collect_vec()
        .unwrap();
    assert_eq!(bars.len(), 14);
    assert_eq!(bars[0].start, at(2018, 7, 3, 10, 0, 0));
    assert_eq!(bars[11].start, at(2018, 7, 3, 10, 55, 0));
    assert_eq!(bars[12].start, at(2018, 7, 5, 5, 0, 0));
    assert_eq!(bars[13].start, at(2018, 7, 5, 5, 5, 0));
    let unique: HashSet<_> = bars.iter().map(|b| b.start).collect();
    assert_eq!(unique.len(), 14);

    let short = lake
        .bars_after(
            SYMBOL,
            Period::OneHour,
            at(2018, 7, 3, 0, 0, 0),
            5,
            at(2018, 7, 4, 12, 0, 0),
        )
        .unwrap()
        .collect_vec()
        .unwrap();
    assert_eq!(short.len(), 1);
}
