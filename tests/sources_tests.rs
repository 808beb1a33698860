// Source chain: probing, runtime fallback, timeouts and exhaustion

mod common;

use bwmon::sources::{
    AcquireError, AdapterError, ScriptedSource, Source, SourceChain, SourceFactory,
};
use common::{bytes, secs};
use std::time::Duration;

fn chain(sources: &[&ScriptedSource]) -> SourceChain {
    SourceChain::new(
        sources
            .iter()
            .map(|s| Box::new((*s).clone()) as Box<dyn Source>)
            .collect(),
    )
}

#[test]
fn probe_skips_unavailable_sources() {
    let primary = ScriptedSource::new("primary").fail(AdapterError::unavailable("primary", "no /proc"));
    let secondary = ScriptedSource::new("secondary").sample(secs(0), &[("eth0", bytes(1, 1))]);
    let mut chain = chain(&[&primary, &secondary]);

    let acquisition = chain.probe(Some(Duration::from_millis(100))).unwrap();
    assert_eq!(acquisition.source, "secondary");
    assert_eq!(acquisition.samples.len(), 1);
    assert_eq!(chain.active_name(), Some("secondary"));
}

#[test]
fn runtime_failure_falls_back_to_next_source() {
    let primary = ScriptedSource::new("primary")
        .sample(secs(0), &[("eth0", bytes(1, 1))])
        .fail(AdapterError::malformed("primary", "truncated table"));
    let secondary = ScriptedSource::new("secondary").sample(secs(1), &[("eth0", bytes(7, 7))]);
    let mut chain = chain(&[&primary, &secondary]);

    let first = chain.collect(None).unwrap();
    assert_eq!(first.source, "primary");

    let second = chain.collect(None).unwrap();
    assert_eq!(second.source, "secondary");
    assert_eq!(chain.active_name(), Some("secondary"));
}

#[test]
fn timeout_does_not_fall_back() {
    let primary = ScriptedSource::new("primary")
        .sample(secs(0), &[("eth0", bytes(1, 1))])
        .fail(AdapterError::Timeout {
            source_name: "primary",
            timeout: Duration::from_millis(10),
        })
        .sample(secs(2), &[("eth0", bytes(2, 2))]);
    let secondary = ScriptedSource::new("secondary").sample(secs(1), &[("eth0", bytes(9, 9))]);
    let mut chain = chain(&[&primary, &secondary]);

    chain.collect(None).unwrap();
    let err = chain.collect(None).unwrap_err();
    assert!(matches!(
        err,
        AcquireError::Adapter(AdapterError::Timeout { .. })
    ));
    assert_eq!(chain.active_name(), Some("primary"));
    assert_eq!(secondary.remaining(), 1);

    let third = chain.collect(None).unwrap();
    assert_eq!(third.source, "primary");
}

#[test]
fn exhaustion_collects_every_failure_and_reprobes_later() {
    let primary = ScriptedSource::new("primary").fail(AdapterError::unavailable("primary", "gone"));
    let secondary =
        ScriptedSource::new("secondary").fail(AdapterError::unavailable("secondary", "gone"));
    let mut chain = chain(&[&primary, &secondary]);

    match chain.collect(None) {
        Err(AcquireError::Exhausted(failures)) => {
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].source_name(), "primary");
            assert_eq!(failures[1].source_name(), "secondary");
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
    assert_eq!(chain.active_name(), None);

    secondary.push(bwmon::sources::ScriptStep::Sample {
        offset: secs(3),
        rows: vec![("eth0".to_string(), bytes(3, 3))],
    });
    let acquisition = chain.collect(None).unwrap();
    assert_eq!(acquisition.source, "secondary");
}

#[test]
fn empty_chain_is_exhausted() {
    let mut chain = SourceChain::new(Vec::new());
    let err = chain.probe(None).unwrap_err();
    assert!(err.to_string().contains("no sources configured"));
}

#[test]
fn scripted_samples_carry_offsets_and_width() {
    let source = ScriptedSource::new("scripted")
        .width(bwmon::models::CounterWidth::Bits32)
        .sample(secs(4), &[("eth0", bytes(1, 2))]);
    let mut s = source.clone();
    let samples = s.collect(None).unwrap();
    assert_eq!(samples[0].timestamp, source.base() + secs(4));
    assert_eq!(samples[0].width, bwmon::models::CounterWidth::Bits32);
    assert!(s.collect(None).is_err());
}

#[test]
fn rebuilt_chain_leaves_out_the_stuck_adapter() {
    let primary = ScriptedSource::new("primary");
    let secondary = ScriptedSource::new("secondary").sample(secs(0), &[("eth0", bytes(1, 1))]);
    let (p, s) = (primary.clone(), secondary.clone());
    let factory: SourceFactory = Box::new(move || {
        vec![
            Box::new(p.clone()) as Box<dyn Source>,
            Box::new(s.clone()) as Box<dyn Source>,
        ]
    });

    let chain = SourceChain::rebuilt_without(&factory, "primary").unwrap();
    assert_eq!(chain.names(), vec!["secondary"]);
    assert!(chain.busy().current().is_none());

    let only = ScriptedSource::new("only");
    let factory: SourceFactory = Box::new(move || vec![Box::new(only.clone()) as Box<dyn Source>]);
    assert!(SourceChain::rebuilt_without(&factory, "only").is_none());
}

#[test]
fn busy_names_the_adapter_mid_collect() {
    let slow = ScriptedSource::new("slow").slow_sample(
        Duration::from_millis(300),
        secs(0),
        &[("eth0", bytes(1, 1))],
    );
    let chain = std::sync::Arc::new(std::sync::Mutex::new(self::chain(&[&slow])));
    let busy = chain.lock().unwrap().busy();

    let worker = {
        let chain = chain.clone();
        std::thread::spawn(move || chain.lock().unwrap().collect(None).map(|a| a.source))
    };
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(busy.current(), Some("slow"));

    assert_eq!(worker.join().unwrap().unwrap(), "slow");
    assert_eq!(busy.current(), None);
}
