/*!
 * Configurizer behavior: trait selection, reset, and formatting
 */

use crossbeam_channel::Receiver;
use tracing::{info, warn};

use super::{ButtonEvent, StationBehavior, StatusPanel};
use crate::record::TraitId;
use crate::session::{Lifecycle, OrbApi};

/// Dock that prepares orbs: buttons 1/2 cycle the selected trait,
/// button 3 resets a connected orb, button 4 formats whatever tag is
/// present. An unformatted tag is formatted automatically with the
/// current selection.
pub struct Configurizer {
    buttons: Receiver<ButtonEvent>,
    panel: Box<dyn StatusPanel>,
    selected: TraitId,
}

impl Configurizer {
    pub fn new(buttons: Receiver<ButtonEvent>, panel: Box<dyn StatusPanel>) -> Self {
        Self {
            buttons,
            panel,
            selected: TraitId::Ruminate,
        }
    }

    pub fn selected_trait(&self) -> TraitId {
        self.selected
    }

    fn render(&mut self) {
        self.panel
            .show_lines(&[self.selected.name(), self.selected.color_name()]);
    }

    fn format_with_selection(&mut self, orb: &mut dyn OrbApi) {
        info!(orb_trait = self.selected.name(), "formatting tag");
        if let Err(err) = orb.format_nfc(self.selected) {
            warn!("format failed: {}", err);
            self.panel.show_error("format failed");
        }
    }
}

impl StationBehavior for Configurizer {
    fn on_orb_connected(&mut self, _orb: &mut dyn OrbApi) {
        self.render();
    }

    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {
        self.render();
    }

    fn on_error(&mut self, _orb: &mut dyn OrbApi, message: &str) {
        self.panel.show_error(message);
    }

    fn on_unformatted_nfc(&mut self, orb: &mut dyn OrbApi) {
        self.format_with_selection(orb);
    }

    fn idle(&mut self, orb: &mut dyn OrbApi) {
        while let Ok(button) = self.buttons.try_recv() {
            match button {
                ButtonEvent::Button1 => {
                    self.selected = self.selected.next();
                    info!(orb_trait = self.selected.name(), "next trait");
                    self.render();
                }
                ButtonEvent::Button2 => {
                    self.selected = self.selected.prev();
                    info!(orb_trait = self.selected.name(), "previous trait");
                    self.render();
                }
                ButtonEvent::Button3 => {
                    if orb.is_orb_connected() {
                        if let Err(err) = orb.reset_orb() {
                            warn!("reset failed: {}", err);
                            self.panel.show_error("reset failed");
                        }
                    }
                }
                ButtonEvent::Button4 => {
                    if orb.lifecycle() != Lifecycle::NoTag {
                        self.format_with_selection(orb);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::{button_channel, MemoryPanel};
    use crate::config::DockConfig;
    use crate::link::MemoryTag;
    use crate::record::StationId;
    use crate::session::OrbSession;

    fn configurizer_session() -> OrbSession<MemoryTag> {
        let config = DockConfig {
            station: StationId::Configure,
            retry_delay_ms: 0,
            check_interval_ms: 0,
            ..Default::default()
        };
        OrbSession::new(MemoryTag::new(), config).unwrap()
    }

    #[test]
    fn test_auto_format_on_unformatted_tag() {
        let mut session = configurizer_session();
        session.link_mut().set_present(true);

        let (_tx, rx) = button_channel();
        let mut behavior = Configurizer::new(rx, Box::new(MemoryPanel::default()));

        // Unformatted tag appears; the behavior formats it from inside
        // the callback
        session.poll(&mut behavior);
        assert_eq!(session.lifecycle(), Lifecycle::OrbConnected);
        assert_eq!(session.trait_id(), TraitId::Ruminate);

        // The deferred connect edge lands on the next poll
        session.poll(&mut behavior);
        assert_eq!(session.lifecycle(), Lifecycle::OrbConnected);
    }

    #[test]
    fn test_trait_cycling_buttons() {
        let mut session = configurizer_session();
        let (tx, rx) = button_channel();
        let mut behavior = Configurizer::new(rx, Box::new(MemoryPanel::default()));

        tx.send(ButtonEvent::Button1).unwrap();
        behavior.idle(&mut session);
        assert_eq!(behavior.selected_trait(), TraitId::Shame);

        tx.send(ButtonEvent::Button2).unwrap();
        tx.send(ButtonEvent::Button2).unwrap();
        behavior.idle(&mut session);
        assert_eq!(behavior.selected_trait(), TraitId::None);
    }
}
