/*!
 * Trigger behavior: momentary output pin with auto-reset
 */

use std::time::{Duration, Instant};

use tracing::info;

use super::{OutputPin, StationBehavior};
use crate::session::OrbApi;

/// Raises an output pin while an orb is connected, dropping it after a
/// timeout even if the orb stays on the reader
pub struct TriggerBehavior {
    pin: Box<dyn OutputPin>,
    timeout: Duration,
    raised_at: Option<Instant>,
}

impl TriggerBehavior {
    pub fn new(pin: Box<dyn OutputPin>, timeout: Duration) -> Self {
        Self {
            pin,
            timeout,
            raised_at: None,
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.pin.is_high()
    }
}

impl StationBehavior for TriggerBehavior {
    fn on_orb_connected(&mut self, _orb: &mut dyn OrbApi) {
        info!("trigger raised");
        self.pin.set_high();
        self.raised_at = Some(Instant::now());
    }

    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {
        self.pin.set_low();
        self.raised_at = None;
    }

    fn idle(&mut self, _orb: &mut dyn OrbApi) {
        if let Some(raised_at) = self.raised_at {
            if raised_at.elapsed() >= self.timeout {
                info!("trigger timed out");
                self.pin.set_low();
                self.raised_at = None;
            }
        }
    }
}
