/*!
 * orbdock CLI
 *
 * Tools around the orb session controller: a tick-driven simulator for
 * the shipped station behaviors, plus inspect/format utilities over
 * raw tag image files.
 */

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use console::style;

use orbdock::{
    behavior::{
        button_channel, ButtonEvent, CasinoBehavior, CommsRelay, Configurizer, ConsolePanel,
        LoggerBehavior, MemoryPin, TriggerBehavior, VisitTracker,
    },
    config::{DockConfig, LogLevel},
    error::{OrbError, Result},
    link::MemoryTag,
    logging,
    record::{self, EnergyWidth, StationId, TraitId},
    session::{Lifecycle, OrbApi, OrbSession},
    StationBehavior,
};

#[derive(Parser)]
#[command(name = "orbdock")]
#[command(version, about = "Orb station session controller and tag tools", long_about = None)]
struct Cli {
    /// Path to a dock configuration TOML file
    #[arg(short = 'C', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevelArg,

    /// Log to file (JSON lines) instead of stdout
    #[arg(long = "log", global = true)]
    log_file: Option<PathBuf>,

    /// Verbose logging (shorthand for --log-level debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a station behavior against a simulated tag
    Simulate {
        /// Station behavior to run
        #[arg(long, value_enum, default_value = "logger")]
        behavior: BehaviorArg,

        /// Station identity for this node
        #[arg(long, value_enum)]
        station: Option<StationArg>,

        /// Energy counter width on the wire
        #[arg(long, value_enum)]
        energy_width: Option<WidthArg>,

        /// Number of loop ticks to run
        #[arg(long, default_value = "20")]
        ticks: u32,

        /// Tick at which the tag is placed on the reader
        #[arg(long, default_value = "2")]
        insert_at: u32,

        /// Tick at which the tag is removed (0 = never)
        #[arg(long, default_value = "0")]
        remove_at: u32,

        /// Start from a blank (unformatted) tag
        #[arg(long)]
        blank: bool,

        /// Tag image file to load, and to save back after the run
        #[arg(long)]
        image: Option<PathBuf>,

        /// Probability that any single page attempt fails
        #[arg(long, default_value = "0.0")]
        flaky: f64,

        /// Seed for the simulated link's fault injection
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Button press schedule, as tick:button pairs (e.g. 5:1,6:2)
        #[arg(long = "press", value_delimiter = ',')]
        presses: Vec<String>,

        /// Emit session stats as JSON
        #[arg(long)]
        json: bool,
    },

    /// Hex dump a tag image and decode its record if formatted
    Inspect {
        /// Tag image file
        image: PathBuf,

        /// Energy counter width on the wire
        #[arg(long, value_enum, default_value = "u16")]
        energy_width: WidthArg,
    },

    /// Format a tag image with a trait and default stations
    Format {
        /// Tag image file (created if missing)
        image: PathBuf,

        /// Trait to write
        #[arg(long = "trait", value_enum, default_value = "none")]
        trait_id: TraitArg,

        /// Energy counter width on the wire
        #[arg(long, value_enum, default_value = "u16")]
        energy_width: WidthArg,
    },

    /// Write a default dock configuration file
    InitConfig {
        /// Output path
        #[arg(default_value = "orbdock.toml")]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BehaviorArg {
    /// Passive logger
    Logger,
    /// Grant energy on first visit
    Visit,
    /// Four-button energy casino
    Casino,
    /// Trait selection and formatting dock
    Configurizer,
    /// Relay lifecycle events as line messages on stdout
    Comms,
    /// Momentary output pin with auto-reset
    Trigger,
}

#[derive(Clone, Copy, ValueEnum)]
enum WidthArg {
    U8,
    U16,
}

impl From<WidthArg> for EnergyWidth {
    fn from(arg: WidthArg) -> Self {
        match arg {
            WidthArg::U8 => EnergyWidth::U8,
            WidthArg::U16 => EnergyWidth::U16,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StationArg {
    Generic,
    Configure,
    Console,
    Distiller,
    Casino,
    Forest,
    Alchemy,
    Pipes,
    Checker,
    Slerp,
    Retoxify,
    Generator,
    Strings,
    Chill,
    Hunt,
}

impl From<StationArg> for StationId {
    fn from(arg: StationArg) -> Self {
        match arg {
            StationArg::Generic => StationId::Generic,
            StationArg::Configure => StationId::Configure,
            StationArg::Console => StationId::Console,
            StationArg::Distiller => StationId::Distiller,
            StationArg::Casino => StationId::Casino,
            StationArg::Forest => StationId::Forest,
            StationArg::Alchemy => StationId::Alchemy,
            StationArg::Pipes => StationId::Pipes,
            StationArg::Checker => StationId::Checker,
            StationArg::Slerp => StationId::Slerp,
            StationArg::Retoxify => StationId::Retoxify,
            StationArg::Generator => StationId::Generator,
            StationArg::Strings => StationId::Strings,
            StationArg::Chill => StationId::Chill,
            StationArg::Hunt => StationId::Hunt,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TraitArg {
    None,
    Ruminate,
    Shame,
    Doubt,
    Discontent,
    Hopeless,
}

impl From<TraitArg> for TraitId {
    fn from(arg: TraitArg) -> Self {
        match arg {
            TraitArg::None => TraitId::None,
            TraitArg::Ruminate => TraitId::Ruminate,
            TraitArg::Shame => TraitId::Shame,
            TraitArg::Doubt => TraitId::Doubt,
            TraitArg::Discontent => TraitId::Discontent,
            TraitArg::Hopeless => TraitId::Hopeless,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => DockConfig::from_file(path)?,
        None => DockConfig::default(),
    };
    config.log_level = cli.log_level.into();
    config.log_file = cli.log_file.clone();
    config.verbose = cli.verbose;

    logging::init_logging(&config)?;

    match cli.command {
        Commands::Simulate {
            behavior,
            station,
            energy_width,
            ticks,
            insert_at,
            remove_at,
            blank,
            image,
            flaky,
            seed,
            presses,
            json,
        } => {
            if let Some(station) = station {
                config.station = station.into();
            }
            if let Some(width) = energy_width {
                config.energy_width = width.into();
            }
            config.validate()?;
            simulate(
                config, behavior, ticks, insert_at, remove_at, blank, image, flaky, seed, presses,
                json,
            )
        }
        Commands::Inspect {
            image,
            energy_width,
        } => inspect(&config, &image, energy_width.into()),
        Commands::Format {
            image,
            trait_id,
            energy_width,
        } => format_image(&mut config, &image, trait_id.into(), energy_width.into()),
        Commands::InitConfig { path } => {
            DockConfig::default().to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

/// One scheduled button press
struct Press {
    tick: u32,
    button: ButtonEvent,
}

fn parse_presses(presses: &[String]) -> Result<Vec<Press>> {
    presses
        .iter()
        .map(|spec| {
            let (tick, button) = spec
                .split_once(':')
                .ok_or_else(|| OrbError::Config(format!("bad press spec '{}'", spec)))?;
            let tick: u32 = tick
                .parse()
                .map_err(|_| OrbError::Config(format!("bad press tick in '{}'", spec)))?;
            let button = match button {
                "1" => ButtonEvent::Button1,
                "2" => ButtonEvent::Button2,
                "3" => ButtonEvent::Button3,
                "4" => ButtonEvent::Button4,
                other => {
                    return Err(OrbError::Config(format!(
                        "bad press button '{}' (expected 1-4)",
                        other
                    )))
                }
            };
            Ok(Press { tick, button })
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    mut config: DockConfig,
    behavior: BehaviorArg,
    ticks: u32,
    insert_at: u32,
    remove_at: u32,
    blank: bool,
    image: Option<PathBuf>,
    flaky: f64,
    seed: u64,
    presses: Vec<String>,
    json: bool,
) -> Result<()> {
    // The simulator drives ticks itself; no wall-clock throttling
    config.check_interval_ms = 0;
    config.retry_delay_ms = 0;

    let mut tag = match image {
        Some(ref path) if path.exists() => MemoryTag::load_image(path)?,
        _ => MemoryTag::new(),
    };
    tag.set_present(false);
    if !blank && image.is_none() {
        // Pre-formatted empty orb so behaviors see a connect
        write_formatted(&mut tag, &config, TraitId::None);
    }
    if flaky > 0.0 {
        tag.set_flakiness(flaky, seed);
    }

    let presses = parse_presses(&presses)?;
    let (buttons_tx, buttons_rx) = button_channel();
    let mut behavior: Box<dyn StationBehavior> = match behavior {
        BehaviorArg::Logger => Box::new(LoggerBehavior),
        BehaviorArg::Visit => Box::new(VisitTracker::default()),
        BehaviorArg::Casino => Box::new(CasinoBehavior::new(buttons_rx, Box::new(ConsolePanel))),
        BehaviorArg::Configurizer => {
            Box::new(Configurizer::new(buttons_rx, Box::new(ConsolePanel)))
        }
        BehaviorArg::Comms => Box::new(CommsRelay::new(Box::new(std::io::stdout()))),
        BehaviorArg::Trigger => Box::new(TriggerBehavior::new(
            Box::new(MemoryPin::default()),
            Duration::from_secs(20),
        )),
    };

    let started = chrono::Local::now();
    println!(
        "{} station {} ({} ticks, insert at {}, remove at {})",
        style("Simulating").cyan().bold(),
        config.station.name(),
        ticks,
        insert_at,
        if remove_at == 0 {
            "never".to_string()
        } else {
            remove_at.to_string()
        },
    );

    let mut session = OrbSession::new(tag, config)?;
    for tick in 0..ticks {
        if tick == insert_at {
            session.link_mut().set_present(true);
        }
        if remove_at != 0 && tick == remove_at {
            session.link_mut().set_present(false);
        }
        for press in presses.iter().filter(|p| p.tick == tick) {
            // Receiver side is owned by the behavior; send never blocks
            let _ = buttons_tx.send(press.button);
        }
        session.tick(behavior.as_mut());
    }

    print_orb_info(&session);

    let stats = session.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!(
            "{} {} (started {})",
            style("Session:").green().bold(),
            stats.summary(),
            started.format("%H:%M:%S"),
        );
    }

    if let Some(ref path) = image {
        session.link_mut().save_image(path)?;
        println!("Saved tag image to {}", path.display());
    }
    Ok(())
}

/// Render the record the way the docks print it on serial
fn print_orb_info(session: &OrbSession<MemoryTag>) {
    if !session.is_orb_connected() {
        println!("{}", style("No orb connected").dim());
        return;
    }

    println!(
        "Trait: {} ({}, #{:06x})  Total energy: {}",
        style(session.trait_name()).magenta().bold(),
        session.trait_id().color_name(),
        session.trait_id().color(),
        session.total_energy(),
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Station", "Visited", "Energy", "Custom"]);
    let record = session.record();
    for (ordinal, station) in record.stations.iter().enumerate() {
        table.add_row(vec![
            Cell::new(StationId::name_for_ordinal(ordinal as u8)),
            Cell::new(if station.visited { "yes" } else { "no" }),
            Cell::new(station.energy),
            Cell::new(format!("{:02x} {:02x}", station.custom[0], station.custom[1])),
        ]);
    }
    println!("{table}");
}

fn inspect(config: &DockConfig, image: &PathBuf, width: EnergyWidth) -> Result<()> {
    let mut config = config.clone();
    config.energy_width = width;
    config.check_interval_ms = 0;
    config.retry_delay_ms = 0;

    // Classify the image through the real session path
    let tag = MemoryTag::load_image(image)?;
    let mut session = OrbSession::new(tag, config)?;
    let mut behavior = LoggerBehavior;
    session.poll(&mut behavior);

    print!("{}", session.dump_pages()?);
    println!("Lifecycle: {}", session.lifecycle());

    match session.lifecycle() {
        Lifecycle::OrbConnected => print_orb_info(&session),
        Lifecycle::UnformattedTag => {
            println!("{}", style("Unformatted tag (no orb header)").yellow())
        }
        Lifecycle::NoTag => {
            println!("{}", style("Tag did not classify; see the log").red())
        }
    }
    Ok(())
}

fn format_image(
    config: &mut DockConfig,
    image: &PathBuf,
    trait_id: TraitId,
    width: EnergyWidth,
) -> Result<()> {
    config.energy_width = width;
    config.retry_delay_ms = 0;

    let mut tag = if image.exists() {
        MemoryTag::load_image(image)?
    } else {
        MemoryTag::new()
    };
    tag.set_present(true);

    // Run the real format path so the image matches what a dock writes
    let mut session = OrbSession::new(tag, config.clone())?;
    session.format_nfc(trait_id)?;
    session.link_mut().save_image(image)?;

    println!(
        "Formatted {} with trait {} ({} stations, {:?} energy)",
        image.display(),
        style(trait_id.name()).magenta().bold(),
        config.station_count,
        config.energy_width,
    );
    Ok(())
}

/// Write a formatted, zeroed orb straight into a tag image
fn write_formatted(tag: &mut MemoryTag, config: &DockConfig, trait_id: TraitId) {
    tag.set_page(config.page_offset, record::ORBS_HEADER);
    tag.set_page(
        config.page_offset + record::TRAIT_PAGE,
        record::encode_trait(trait_id),
    );
    let zero = record::encode_station(&Default::default(), config.energy_width);
    for ordinal in 0..config.station_count {
        tag.set_page(
            config.page_offset + record::STATIONS_PAGE + ordinal as u8,
            zero,
        );
    }
}
