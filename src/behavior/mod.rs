/*!
 * Station behaviors
 *
 * A behavior is the per-node policy layered on top of the session: it
 * reacts to lifecycle callbacks and may call back into the session
 * through [`OrbApi`]. Presentation and signaling collaborators hang off
 * small seams here (`StatusPanel`, `OutputPin`, button events); they
 * consume session data and never mutate it directly.
 */

mod basic;
mod casino;
mod comms;
mod configurizer;
mod trigger;

pub use basic::{LoggerBehavior, VisitTracker};
pub use casino::CasinoBehavior;
pub use comms::CommsRelay;
pub use configurizer::Configurizer;
pub use trigger::TriggerBehavior;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::session::OrbApi;

/// Per-node policy over the session lifecycle
///
/// All callbacks default to no-ops; `idle` runs on every loop pass
/// (unthrottled) so behaviors can watch buttons and timeouts.
pub trait StationBehavior {
    fn on_orb_connected(&mut self, _orb: &mut dyn OrbApi) {}
    fn on_orb_disconnected(&mut self, _orb: &mut dyn OrbApi) {}
    fn on_error(&mut self, _orb: &mut dyn OrbApi, _message: &str) {}
    fn on_unformatted_nfc(&mut self, _orb: &mut dyn OrbApi) {}
    fn idle(&mut self, _orb: &mut dyn OrbApi) {}
}

/// One of the four physical buttons on a dock's panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Button1,
    Button2,
    Button3,
    Button4,
}

/// Channel pair feeding button presses into a behavior
pub fn button_channel() -> (Sender<ButtonEvent>, Receiver<ButtonEvent>) {
    unbounded()
}

/// Text panel seam (OLED/segment display stand-in)
pub trait StatusPanel {
    fn show_lines(&mut self, lines: &[&str]);
    fn show_error(&mut self, message: &str);
}

/// Panel that prints to the console
pub struct ConsolePanel;

impl StatusPanel for ConsolePanel {
    fn show_lines(&mut self, lines: &[&str]) {
        for line in lines {
            println!("[panel] {}", line);
        }
    }

    fn show_error(&mut self, message: &str) {
        println!("[panel!] {}", message);
    }
}

/// Panel that records what was shown; for tests and captures
#[derive(Default)]
pub struct MemoryPanel {
    pub lines: Vec<String>,
    pub errors: Vec<String>,
}

impl StatusPanel for MemoryPanel {
    fn show_lines(&mut self, lines: &[&str]) {
        self.lines = lines.iter().map(|s| s.to_string()).collect();
    }

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}

/// Digital output seam
pub trait OutputPin {
    fn set_high(&mut self);
    fn set_low(&mut self);
    fn is_high(&self) -> bool;
}

/// Pin backed by a flag; for tests and the simulator
#[derive(Default)]
pub struct MemoryPin {
    high: bool,
}

impl OutputPin for MemoryPin {
    fn set_high(&mut self) {
        self.high = true;
    }

    fn set_low(&mut self) {
        self.high = false;
    }

    fn is_high(&self) -> bool {
        self.high
    }
}
