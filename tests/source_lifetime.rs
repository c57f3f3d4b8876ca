//! Source expiry driven by an injected clock

mod common;

use common::builders::ScenarioChain;
use common::manual_clock;
use common::probes::{Hook, ProbeNode};
use pullchain::pipeline::nodes::SyntheticSource;
use pullchain::pipeline::{Chain, Driver, DriverConfig, StopReason};
use pullchain::ChainError;
use std::time::Duration;

#[test]
fn test_lifetime_of_two_seconds() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    let src = chain
        .add_source_with_lifetime(ProbeNode::new("Source"), 2.0)
        .unwrap();

    chain.pull(src).unwrap();
    assert!(chain.is_alive(src).unwrap());

    clock.advance(Duration::from_millis(1999));
    assert!(chain.is_alive(src).unwrap());

    clock.advance(Duration::from_millis(2));
    assert!(!chain.is_alive(src).unwrap());
}

#[test]
fn test_alive_before_first_initialize() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    let src = chain
        .add_source_with_lifetime(ProbeNode::new("Source"), 1.0)
        .unwrap();

    clock.advance(Duration::from_secs(60));
    assert!(chain.is_alive(src).unwrap());
    assert!(chain.slot(src).unwrap().lifetime().unwrap().birth_time().is_none());
}

#[test]
fn test_expired_source_stops_computing() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    let probe = ProbeNode::new("Source");
    let handle = probe.handle();
    let src = chain.add_source_with_lifetime(probe, 1.0).unwrap();
    chain.run_cycle().unwrap();
    handle.clear();

    clock.advance(Duration::from_secs(2));
    chain.run_cycle().unwrap();

    assert!(handle.events().is_empty());
    assert!(chain.output(src).is_none());
    assert_eq!(chain.stats(src).unwrap().expired_pulls, 1);
    assert!(!chain.any_source_alive());
}

#[test]
fn test_failed_initialize_does_not_start_lifetime() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    let probe = ProbeNode::new("Source");
    let handle = probe.handle();
    let src = chain.add_source_with_lifetime(probe, 1.0).unwrap();

    handle.set_fail_initialize(true);
    assert!(chain.run_cycle().is_err());
    assert!(chain.slot(src).unwrap().lifetime().unwrap().birth_time().is_none());

    clock.advance(Duration::from_secs(5));
    handle.set_fail_initialize(false);
    chain.run_cycle().unwrap();

    let birth = chain.slot(src).unwrap().lifetime().unwrap().birth_time();
    assert_eq!(birth, Some(common::epoch() + chrono::Duration::seconds(5)));
    assert!(chain.is_alive(src).unwrap());
    assert_eq!(handle.count(Hook::Initialize), 2);
}

#[test]
fn test_invalid_lifetime_is_rejected() {
    let mut chain = Chain::new();
    for seconds in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = chain
            .add_source_with_lifetime(ProbeNode::new("Source"), seconds)
            .unwrap_err();
        assert!(matches!(err, ChainError::InvalidConfiguration { .. }));
    }
    assert!(chain.is_empty());
}

#[test]
fn test_driver_stops_when_source_expires() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    chain
        .add_source_with_lifetime(ProbeNode::new("Source"), 0.5)
        .unwrap();
    chain.run_cycle().unwrap();
    clock.advance(Duration::from_secs(1));

    let settings = DriverConfig {
        cycle_rate_hz: 0,
        max_cycles: Some(100),
    };
    let report = Driver::new(chain, settings).run().unwrap();
    assert_eq!(report.stop_reason, StopReason::SourcesExpired);
    assert_eq!(report.cycles, 0);
}

#[test]
fn test_source_without_lifetime_never_expires() {
    let clock = manual_clock();
    let mut s = ScenarioChain::with_clock(clock.clone());
    s.settle();
    clock.advance(Duration::from_secs(86_400));
    assert!(s.chain.is_alive(s.source).unwrap());
    assert!(s.chain.any_source_alive());
}

#[test]
fn test_lifetime_beyond_calendar_range_never_expires() {
    let clock = manual_clock();
    let mut chain = Chain::with_clock(clock.clone());
    let src = chain
        .add_source_with_lifetime(SyntheticSource::new(), 1e13)
        .unwrap();

    chain.run_cycle().unwrap();
    assert!(chain.output(src).is_some());

    clock.advance(Duration::from_secs(86_400 * 365));
    chain.run_cycle().unwrap();
    assert!(chain.is_alive(src).unwrap());
    assert!(chain.output(src).is_some());
}
