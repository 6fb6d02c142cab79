/*!
 * Orb session state machine
 *
 * Owns presence polling, tag classification and the
 * connect/disconnect/error/unformatted lifecycle. Station behaviors
 * receive lifecycle callbacks and talk back through the [`OrbApi`]
 * mutation surface; they never touch the tag link directly.
 */

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::behavior::StationBehavior;
use crate::config::DockConfig;
use crate::error::{OrbError, Result};
use crate::link::{PageStore, TagLink, TAG_PAGES};
use crate::record::{
    self, OrbRecord, StationId, StationRecord, TraitId, HEADER_PAGE, ORBS_HEADER, STATIONS_PAGE,
    TRAIT_PAGE,
};
use crate::stats::SessionStats;

/// Session lifecycle; exactly one state holds at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Nothing in the field
    NoTag,
    /// Tag present but the header does not match
    UnformattedTag,
    /// Tag present, header matches, record loaded
    OrbConnected,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::NoTag => write!(f, "no-tag"),
            Lifecycle::UnformattedTag => write!(f, "unformatted-tag"),
            Lifecycle::OrbConnected => write!(f, "orb-connected"),
        }
    }
}

/// Mutation and snapshot surface handed to station behaviors
///
/// Object-safe so behaviors stay decoupled from the link type. All
/// mutations operate on the currently loaded record and persist only
/// the page(s) they touch; a failed write leaves the in-memory value
/// as mutated until the next successful connect re-reads the tag.
pub trait OrbApi {
    fn lifecycle(&self) -> Lifecycle;
    fn is_orb_connected(&self) -> bool;
    fn station(&self) -> StationId;
    /// This station's slot; default record when not connected
    fn station_record(&self) -> StationRecord;
    fn energy(&self) -> u16;
    fn total_energy(&self) -> u32;
    fn trait_id(&self) -> TraitId;
    fn trait_name(&self) -> &'static str;
    fn stats(&self) -> SessionStats;

    /// Write the trait page; requires a connected orb
    fn set_trait(&mut self, trait_id: TraitId) -> Result<()>;
    /// Mark this station visited or not; requires a connected orb
    fn set_visited(&mut self, visited: bool) -> Result<()>;
    /// Set this station's energy, clamped to the configured width
    fn set_energy(&mut self, energy: u16) -> Result<()>;
    /// Saturating add to this station's energy
    fn add_energy(&mut self, amount: u16) -> Result<()>;
    /// Saturating subtract from this station's energy, flooring at 0
    fn remove_energy(&mut self, amount: u16) -> Result<()>;
    /// Set one of this station's custom bytes (slot 0 or 1)
    fn set_custom(&mut self, slot: usize, value: u8) -> Result<()>;

    /// Zero every station slot, write them all, then re-read the whole
    /// record to confirm. Keeps the trait. Allowed whenever a tag is
    /// present.
    fn reset_orb(&mut self) -> Result<()>;
    /// Format the tag: header page, default stations, then the given
    /// trait. Non-atomic; a failing step aborts and may leave the
    /// header already written. Allowed whenever a tag is present.
    fn format_nfc(&mut self, trait_id: TraitId) -> Result<()>;

    /// Hex dump of the entire tag through the page store
    fn dump_pages(&mut self) -> Result<String>;
}

/// One dock's session over a tag link
pub struct OrbSession<L: TagLink> {
    store: PageStore<L>,
    config: DockConfig,
    lifecycle: Lifecycle,
    record: OrbRecord,
    /// Set on entry into UnformattedTag, cleared on presence loss;
    /// keeps the unformatted callback edge-triggered
    unformatted_latched: bool,
    /// Connect callback deferred out of format_nfc so behaviors are
    /// never re-entered from inside their own callbacks
    connect_pending: bool,
    last_check: Option<Instant>,
    stats: SessionStats,
}

impl<L: TagLink> OrbSession<L> {
    pub fn new(link: L, config: DockConfig) -> Result<Self> {
        config.validate()?;
        let record = OrbRecord::new(config.station_count);
        let store = PageStore::new(link, &config);
        info!(
            station = config.station.name(),
            link = store.link().link_name(),
            "session started"
        );
        Ok(Self {
            store,
            config,
            lifecycle: Lifecycle::NoTag,
            record,
            unformatted_latched: false,
            connect_pending: false,
            last_check: None,
            stats: SessionStats::new(),
        })
    }

    /// Periodic entry point. The presence check self-throttles to the
    /// configured interval; the behavior's `idle` hook runs on every
    /// pass so buttons and timeouts stay responsive.
    pub fn tick(&mut self, behavior: &mut dyn StationBehavior) {
        let interval = Duration::from_millis(self.config.check_interval_ms);
        let due = match self.last_check {
            Some(last) => last.elapsed() >= interval,
            None => true,
        };
        if due {
            self.last_check = Some(Instant::now());
            self.poll(behavior);
        }
        behavior.idle(self);
    }

    /// Run one poll evaluation unconditionally
    pub fn poll(&mut self, behavior: &mut dyn StationBehavior) {
        self.stats.polls += 1;

        if self.connect_pending {
            self.connect_pending = false;
            self.stats.connects += 1;
            behavior.on_orb_connected(self);
            return;
        }

        // While connected, only a cheap liveness check: is the header
        // page still readable?
        if self.lifecycle == Lifecycle::OrbConnected {
            if self.store.read_page(self.header_page()).is_ok() {
                return;
            }
            info!(station = self.config.station.name(), "orb disconnected");
            self.lifecycle = Lifecycle::NoTag;
            self.record = OrbRecord::new(self.config.station_count);
            self.unformatted_latched = false;
            self.stats.disconnects += 1;
            behavior.on_orb_disconnected(self);
            return;
        }

        // Presence probe at the wire layer
        match self.store.detect() {
            Ok(true) => {}
            Ok(false) => {
                self.lifecycle = Lifecycle::NoTag;
                self.unformatted_latched = false;
                return;
            }
            Err(err) => {
                self.emit_error(behavior, &err, "Presence probe failed");
                return;
            }
        }

        // Target detected; classify by header
        let header = match self.store.read_page(self.header_page()) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.emit_error(behavior, &err, "Failed to check orb header");
                return;
            }
        };

        if !record::header_matches(header) {
            self.lifecycle = Lifecycle::UnformattedTag;
            if !self.unformatted_latched {
                self.unformatted_latched = true;
                self.stats.unformatted += 1;
                info!("unformatted tag present");
                behavior.on_unformatted_nfc(self);
            }
            return;
        }

        // Formatted tag: load the full record, then connect
        match self.read_record() {
            Ok(loaded) => {
                self.record = loaded;
                self.lifecycle = Lifecycle::OrbConnected;
                self.unformatted_latched = false;
                self.stats.connects += 1;
                info!(
                    station = self.config.station.name(),
                    orb_trait = self.record.trait_id.name(),
                    total_energy = self.record.total_energy(),
                    "orb connected"
                );
                behavior.on_orb_connected(self);
            }
            Err(err) => {
                // Partial result discarded; state unchanged, retried
                // on the next poll
                self.emit_error(behavior, &err, "Failed to load orb record");
            }
        }
    }

    pub fn config(&self) -> &DockConfig {
        &self.config
    }

    /// The cached record; authoritative only while connected
    pub fn record(&self) -> &OrbRecord {
        &self.record
    }

    pub fn link_mut(&mut self) -> &mut L {
        self.store.link_mut()
    }

    fn emit_error(&mut self, behavior: &mut dyn StationBehavior, err: &OrbError, context: &str) {
        self.stats.errors += 1;
        let message = format!("{}: {}", context, err);
        warn!(
            category = %err.category(),
            transient = err.is_transient(),
            "{}",
            message
        );
        behavior.on_error(self, &message);
    }

    fn header_page(&self) -> u8 {
        self.config.page_offset + HEADER_PAGE
    }

    fn trait_page(&self) -> u8 {
        self.config.page_offset + TRAIT_PAGE
    }

    fn station_page(&self, ordinal: usize) -> u8 {
        self.config.page_offset + STATIONS_PAGE + ordinal as u8
    }

    fn station_index(&self) -> usize {
        self.config.station.ordinal() as usize
    }

    fn energy_cap(&self) -> u16 {
        self.config.energy_width.max_energy()
    }

    fn require_connected(&self) -> Result<()> {
        if self.lifecycle == Lifecycle::OrbConnected {
            Ok(())
        } else {
            Err(OrbError::NotConnected)
        }
    }

    /// A tag must be physically present; when the session has not
    /// classified one yet, ask the wire directly
    fn require_present(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::NoTag {
            return Ok(());
        }
        if self.store.detect()? {
            Ok(())
        } else {
            Err(OrbError::NoTag)
        }
    }

    /// Read trait and every station slot; any page failure discards
    /// the partial result
    fn read_record(&mut self) -> Result<OrbRecord> {
        let mut record = OrbRecord::new(self.config.station_count);
        for ordinal in 0..self.config.station_count {
            let bytes = self.store.read_page(self.station_page(ordinal))?;
            record.stations[ordinal] = record::decode_station(bytes, self.config.energy_width);
        }
        let trait_bytes = self.store.read_page(self.trait_page())?;
        record.trait_id = record::decode_trait(trait_bytes)?;
        debug!(
            orb_trait = record.trait_id.name(),
            total_energy = record.total_energy(),
            "record loaded"
        );
        Ok(record)
    }

    fn write_station_page(&mut self, ordinal: usize) -> Result<()> {
        let bytes = record::encode_station(&self.record.stations[ordinal], self.config.energy_width);
        self.store.write_page(self.station_page(ordinal), bytes)
    }

    fn write_all_stations(&mut self) -> Result<()> {
        for ordinal in 0..self.config.station_count {
            self.write_station_page(ordinal)?;
        }
        Ok(())
    }

    /// Apply a mutation to this station's slot and persist its page
    fn mutate_station(&mut self, f: impl FnOnce(&mut StationRecord, u16)) -> Result<()> {
        self.require_connected()?;
        let cap = self.energy_cap();
        let index = self.station_index();
        f(&mut self.record.stations[index], cap);
        self.write_station_page(index)
    }
}

impl<L: TagLink> OrbApi for OrbSession<L> {
    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn is_orb_connected(&self) -> bool {
        self.lifecycle == Lifecycle::OrbConnected
    }

    fn station(&self) -> StationId {
        self.config.station
    }

    fn station_record(&self) -> StationRecord {
        self.record.stations[self.station_index()]
    }

    fn energy(&self) -> u16 {
        self.station_record().energy
    }

    fn total_energy(&self) -> u32 {
        self.record.total_energy()
    }

    fn trait_id(&self) -> TraitId {
        self.record.trait_id
    }

    fn trait_name(&self) -> &'static str {
        self.record.trait_id.name()
    }

    fn stats(&self) -> SessionStats {
        let tally = self.store.tally();
        SessionStats {
            pages_read: tally.pages_read,
            pages_written: tally.pages_written,
            retries: tally.retries,
            ..self.stats.clone()
        }
    }

    fn set_trait(&mut self, trait_id: TraitId) -> Result<()> {
        self.require_connected()?;
        info!(orb_trait = trait_id.name(), "setting trait");
        self.record.trait_id = trait_id;
        self.store
            .write_page(self.trait_page(), record::encode_trait(trait_id))
    }

    fn set_visited(&mut self, visited: bool) -> Result<()> {
        debug!(
            station = self.config.station.name(),
            visited, "setting visited"
        );
        self.mutate_station(|station, _| station.visited = visited)
    }

    fn set_energy(&mut self, energy: u16) -> Result<()> {
        info!(
            station = self.config.station.name(),
            energy, "setting energy"
        );
        self.mutate_station(|station, cap| station.energy = energy.min(cap))
    }

    fn add_energy(&mut self, amount: u16) -> Result<()> {
        info!(
            station = self.config.station.name(),
            amount, "adding energy"
        );
        self.mutate_station(|station, cap| {
            station.energy = station.energy.saturating_add(amount).min(cap);
        })
    }

    fn remove_energy(&mut self, amount: u16) -> Result<()> {
        info!(
            station = self.config.station.name(),
            amount, "removing energy"
        );
        self.mutate_station(|station, _| {
            station.energy = station.energy.saturating_sub(amount);
        })
    }

    fn set_custom(&mut self, slot: usize, value: u8) -> Result<()> {
        if slot >= 2 {
            return Err(OrbError::Config(format!(
                "custom slot {} out of range (0-1)",
                slot
            )));
        }
        debug!(
            station = self.config.station.name(),
            slot, value, "setting custom byte"
        );
        self.mutate_station(|station, _| station.custom[slot] = value)
    }

    fn reset_orb(&mut self) -> Result<()> {
        self.require_present()?;
        info!("resetting orb to default station information");
        self.record.reset_stations();
        self.write_all_stations()?;
        self.record = self.read_record()?;
        Ok(())
    }

    fn format_nfc(&mut self, trait_id: TraitId) -> Result<()> {
        self.require_present()?;
        info!(orb_trait = trait_id.name(), "formatting tag");

        // Header, default stations, trait; each step can abort and
        // leave the earlier pages written
        self.store.write_page(self.header_page(), ORBS_HEADER)?;
        self.record.reset_stations();
        self.write_all_stations()?;
        self.store
            .write_page(self.trait_page(), record::encode_trait(trait_id))?;

        // Re-evaluate from scratch: adopt the freshly written record,
        // deliver the connect edge on the next poll
        self.record = self.read_record()?;
        if self.lifecycle != Lifecycle::OrbConnected {
            self.connect_pending = true;
        }
        self.lifecycle = Lifecycle::OrbConnected;
        self.unformatted_latched = false;
        Ok(())
    }

    fn dump_pages(&mut self) -> Result<String> {
        self.require_present()?;
        let mut out = String::new();
        for page in 0..TAG_PAGES as u8 {
            let bytes = self.store.read_page(page)?;
            out.push_str(&format!("page {:2}: {}\n", page, hex::encode(bytes)));
        }
        Ok(out)
    }
}
