//! Retry-policy tests for the page store and the poll loop's
//! try-again-next-tick error handling.

use orbdock::behavior::StationBehavior;
use orbdock::config::DockConfig;
use orbdock::link::{MemoryTag, PageStore};
use orbdock::record::{self, StationId, TraitId, ORBS_HEADER};
use orbdock::session::{Lifecycle, OrbApi, OrbSession};
use orbdock::OrbError;

fn fast_config() -> DockConfig {
    DockConfig {
        station: StationId::Generic,
        retry_delay_ms: 0,
        check_interval_ms: 0,
        ..Default::default()
    }
}

// A link failing exactly k times succeeds iff k < max_retries, and
// issues exactly k re-select actions
#[test]
fn test_retry_ceiling() {
    for k in 0..6u32 {
        let mut tag = MemoryTag::new();
        tag.set_present(true);
        tag.set_page(4, *b"ORBS");
        tag.fail_reads(k);

        let mut store = PageStore::new(tag, &fast_config());
        let result = store.read_page(4);

        if k < 4 {
            assert_eq!(result.unwrap(), *b"ORBS", "k={} should succeed", k);
            assert_eq!(store.link().reselect_count(), k as u64);
        } else {
            assert!(
                matches!(result, Err(OrbError::RetriesExhausted { attempts: 4 })),
                "k={} should exhaust the ceiling",
                k
            );
            assert_eq!(store.link().reselect_count(), 3);
        }
    }
}

#[test]
fn test_write_retry_ceiling() {
    let mut tag = MemoryTag::new();
    tag.set_present(true);
    tag.fail_writes(4);

    let mut store = PageStore::new(tag, &fast_config());
    assert!(store.write_page(6, [1, 2, 3, 4]).is_err());

    // The ceiling resets per operation; the next write lands
    assert!(store.write_page(6, [1, 2, 3, 4]).is_ok());
    assert_eq!(store.link().page(6), [1, 2, 3, 4]);
}

/// Counts errors surfaced through the lifecycle callback
#[derive(Default)]
struct ErrorCounter {
    connected: u32,
    errors: Vec<String>,
}

impl StationBehavior for ErrorCounter {
    fn on_orb_connected(&mut self, _orb: &mut dyn OrbApi) {
        self.connected += 1;
    }
    fn on_error(&mut self, _orb: &mut dyn OrbApi, message: &str) {
        self.errors.push(message.to_string());
    }
}

// A header read that exhausts its retries surfaces one error, leaves
// the state unchanged, and the next poll recovers
#[test]
fn test_header_failure_retried_next_poll() {
    let config = fast_config();
    let mut tag = MemoryTag::new();
    tag.set_page(config.page_offset, ORBS_HEADER);
    tag.set_page(
        config.page_offset + record::TRAIT_PAGE,
        record::encode_trait(TraitId::Doubt),
    );
    tag.set_present(true);
    // Exactly one poll's worth of failed attempts
    tag.fail_reads(4);

    let mut session = OrbSession::new(tag, config).unwrap();
    let mut behavior = ErrorCounter::default();

    session.poll(&mut behavior);
    assert_eq!(session.lifecycle(), Lifecycle::NoTag);
    assert_eq!(behavior.errors.len(), 1);
    assert!(behavior.errors[0].contains("orb header"));
    assert_eq!(behavior.connected, 0);

    // Field coupling is back; the same tag connects
    session.poll(&mut behavior);
    assert_eq!(session.lifecycle(), Lifecycle::OrbConnected);
    assert_eq!(behavior.connected, 1);
    assert_eq!(session.trait_id(), TraitId::Doubt);
}

// A mutation whose write exhausts retries reports the failure to the
// caller; the lifecycle is untouched
#[test]
fn test_mutation_failure_returned_to_caller() {
    let config = fast_config();
    let mut tag = MemoryTag::new();
    tag.set_page(config.page_offset, ORBS_HEADER);
    tag.set_page(
        config.page_offset + record::TRAIT_PAGE,
        record::encode_trait(TraitId::None),
    );
    tag.set_present(true);

    let mut session = OrbSession::new(tag, config).unwrap();
    let mut behavior = ErrorCounter::default();
    session.poll(&mut behavior);
    assert_eq!(behavior.connected, 1);

    session.link_mut().fail_writes(4);
    let err = session.add_energy(3).unwrap_err();
    assert!(matches!(err, OrbError::RetriesExhausted { .. }));
    assert_eq!(session.lifecycle(), Lifecycle::OrbConnected);

    // The in-memory record kept the mutation; the next write persists
    // the same value
    assert_eq!(session.energy(), 3);
    session.set_energy(3).unwrap();
    let page = session.link_mut().page(6 + StationId::Generic.ordinal());
    assert_eq!(
        record::decode_station(page, orbdock::EnergyWidth::U16).energy,
        3
    );
}

// Retries are counted in the session stats
#[test]
fn test_retries_reported_in_stats() {
    let config = fast_config();
    let mut tag = MemoryTag::new();
    tag.set_page(config.page_offset, ORBS_HEADER);
    tag.set_page(
        config.page_offset + record::TRAIT_PAGE,
        record::encode_trait(TraitId::None),
    );
    tag.set_present(true);
    tag.fail_reads(2);

    let mut session = OrbSession::new(tag, config).unwrap();
    let mut behavior = ErrorCounter::default();
    session.poll(&mut behavior);

    let stats = session.stats();
    assert_eq!(behavior.connected, 1);
    assert_eq!(stats.retries, 2);
    assert!(stats.pages_read >= 16); // header + 15 stations + trait
}
