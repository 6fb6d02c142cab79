/*!
 * Casino behavior: player-adjustable energy via four buttons
 */

use crossbeam_channel::Receiver;
use tracing::warn;

use super::{ButtonEvent, StationBehavior, StatusPanel};
use crate::session::OrbApi;

/// Button-driven energy adjustments, rendered to a panel
///
/// Button 1 adds 1 energy, button 2 adds 5, button 3 removes 5,
/// button 4 removes 1. Presses while no orb is connected are dropped.
pub struct CasinoBehavior {
    buttons: Receiver<ButtonEvent>,
    panel: Box<dyn StatusPanel>,
}

impl CasinoBehavior {
    pub fn new(buttons: Receiver<ButtonEvent>, panel: Box<dyn StatusPanel>) -> Self {
        Self { buttons, panel }
    }

    fn render(&mut self, orb: &mut dyn OrbApi) {
        if orb.is_orb_connected() {
            let energy = orb.energy().to_string();
            self.panel.show_lines(&[&energy]);
        } else {
            self.panel.show_lines(&["::"]);
        }
    }

    fn apply(&mut self, orb: &mut dyn OrbApi, button: ButtonEvent) {
        let result = match button {
            ButtonEvent::Button1 => orb.add_energy(1),
            ButtonEvent::Button2 => orb.add_energy(5),
            ButtonEvent::Button3 => orb.remove_energy(5),
            ButtonEvent::Button4 => orb.remove_energy(1),
        };
        if let Err(err) = result {
            warn!("energy adjustment failed: {}", err);
        }
        self.render(orb);
    }
}

impl StationBehavior for CasinoBehavior {
    fn on_orb_connected(&mut self, orb: &mut dyn OrbApi) {
        self.render(orb);
    }

    fn on_orb_disconnected(&mut self, orb: &mut dyn OrbApi) {
        self.render(orb);
    }

    fn on_error(&mut self, orb: &mut dyn OrbApi, message: &str) {
        self.panel.show_error(message);
        self.render(orb);
    }

    fn on_unformatted_nfc(&mut self, orb: &mut dyn OrbApi) {
        self.panel.show_error(":::::");
        self.render(orb);
    }

    fn idle(&mut self, orb: &mut dyn OrbApi) {
        while let Ok(button) = self.buttons.try_recv() {
            if !orb.is_orb_connected() {
                continue;
            }
            self.apply(orb, button);
        }
    }
}
