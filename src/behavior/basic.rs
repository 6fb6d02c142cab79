/*!
 * Passive logger and visit-tracking behaviors
 */

use tracing::{info, warn};

use super::StationBehavior;
use crate::session::OrbApi;

/// Logs lifecycle events and nothing else
#[derive(Default)]
pub struct LoggerBehavior;

impl StationBehavior for LoggerBehavior {
    fn on_orb_connected(&mut self, orb: &mut dyn OrbApi) {
        info!(
            orb_trait = orb.trait_name(),
            energy = orb.energy(),
            total_energy = orb.total_energy(),
            "orb connected"
        );
    }

    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {
        info!("orb disconnected");
    }

    fn on_error(&mut self, _orb: &mut dyn OrbApi, message: &str) {
        warn!("{}", message);
    }

    fn on_unformatted_nfc(&mut self, _orb: &mut dyn OrbApi) {
        info!("unformatted tag detected");
    }
}

/// Marks the station visited and grants energy on the first visit
pub struct VisitTracker {
    grant: u16,
}

impl VisitTracker {
    pub fn new(grant: u16) -> Self {
        Self { grant }
    }
}

impl Default for VisitTracker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl StationBehavior for VisitTracker {
    fn on_orb_connected(&mut self, orb: &mut dyn OrbApi) {
        if orb.station_record().visited {
            info!("orb already visited this station");
            return;
        }
        if let Err(err) = orb.add_energy(self.grant) {
            warn!("failed to grant visit energy: {}", err);
            return;
        }
        if let Err(err) = orb.set_visited(true) {
            warn!("failed to mark station visited: {}", err);
        }
    }

    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {
        info!("orb disconnected");
    }

    fn on_error(&mut self, _orb: &mut dyn OrbApi, message: &str) {
        warn!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DockConfig;
    use crate::link::MemoryTag;
    use crate::record::{self, StationId, TraitId, ORBS_HEADER, TRAIT_PAGE};
    use crate::session::OrbSession;

    fn connected_session(station: StationId) -> OrbSession<MemoryTag> {
        let config = DockConfig {
            station,
            retry_delay_ms: 0,
            check_interval_ms: 0,
            ..Default::default()
        };
        let mut tag = MemoryTag::new();
        tag.set_page(config.page_offset, ORBS_HEADER);
        tag.set_page(
            config.page_offset + TRAIT_PAGE,
            record::encode_trait(TraitId::None),
        );
        tag.set_present(true);
        OrbSession::new(tag, config).unwrap()
    }

    #[test]
    fn test_visit_tracker_grants_once() {
        let mut session = connected_session(StationId::Forest);
        let mut behavior = VisitTracker::default();

        session.poll(&mut behavior);
        assert_eq!(session.energy(), 1);
        assert!(session.station_record().visited);

        // Remove and re-insert; the slot stays visited so no second
        // grant
        session.link_mut().set_present(false);
        session.poll(&mut behavior);
        session.link_mut().set_present(true);
        session.poll(&mut behavior);
        assert_eq!(session.energy(), 1);
    }
}
