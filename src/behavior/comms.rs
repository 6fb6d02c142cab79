/*!
 * Comms relay behavior: lifecycle hand-off to another node
 *
 * Translates session events into newline-terminated messages on a
 * byte sink (a serial link in the installation; any `io::Write` here).
 */

use std::io::Write;

use tracing::{debug, warn};

use super::StationBehavior;
use crate::session::OrbApi;

/// Relays lifecycle events over a serial-style line protocol
pub struct CommsRelay {
    sink: Box<dyn Write + Send>,
}

impl CommsRelay {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self { sink }
    }

    fn send(&mut self, message: &str) {
        debug!(message, "relaying");
        if let Err(err) = writeln!(self.sink, "{}", message).and_then(|_| self.sink.flush()) {
            warn!("comms send failed: {}", err);
        }
    }
}

impl StationBehavior for CommsRelay {
    fn on_orb_connected(&mut self, orb: &mut dyn OrbApi) {
        self.send("ORB_INSERTED");
        let energy = orb.energy();
        self.send(&format!("ENERGY_LEVEL:{}", energy));
    }

    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {
        self.send("ORB_REMOVED");
    }

    fn on_error(&mut self, _orb: &mut dyn OrbApi, message: &str) {
        self.send(&format!("ERROR:{}", message));
    }

    fn on_unformatted_nfc(&mut self, _orb: &mut dyn OrbApi) {
        self.send("UNFORMATTED_NFC");
    }
}
