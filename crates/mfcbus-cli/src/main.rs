use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mfcbus_cli::*;
use mfcbus_metrics::BusLabels;
use mfcbus_protocol::{
    ByteChannel, DeviceSession, Tag, TotalizerCommand, TransportSession, GAS_SELECT_MIN,
    UNIT_PERCENT, UNIT_SELECTED,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Talk S-Protocol to mass-flow controllers on an RS-485 bus
#[derive(Parser)]
#[command(name = "mfcbus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Serial port (overrides the config file)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Line speed (overrides the config file)
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Device tag; the last eight characters are used
    #[arg(short, long, global = true)]
    tag: Option<String>,

    /// Device name from the config file
    #[arg(short, long, global = true, conflicts_with = "tag")]
    device: Option<String>,

    /// Wait between writing a command and reading the answer (milliseconds)
    #[arg(long, global = true)]
    settle_ms: Option<u64>,

    /// Attempts per exchange
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Serve Prometheus metrics on this address
    #[cfg(feature = "prometheus")]
    #[arg(long, global = true)]
    metrics_addr: Option<std::net::SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover the device and print its long address
    Discover,

    /// Read the primary variable (flow)
    Read,

    /// Read density, reference conditions and flow range
    Range {
        /// Gas selection code (1-6)
        #[arg(long, default_value_t = GAS_SELECT_MIN)]
        gas: u8,
    },

    /// Read the setpoint
    Setpoint,

    /// Write the setpoint
    SetSetpoint {
        /// Setpoint value
        #[arg(allow_negative_numbers = true)]
        value: f32,

        /// Value is a percentage of full scale instead of the selected unit
        #[arg(long)]
        percent: bool,
    },

    /// Select the flow unit
    Unit {
        /// Unit name (l/min, ml/min, cc/min) or code
        unit: String,

        /// Flow reference code
        #[arg(long, default_value_t = 0)]
        reference: u8,
    },

    /// Totalizer status, count and control
    Totalizer {
        #[arg(value_enum)]
        action: TotalizerAction,
    },

    /// Periodically read full scale, setpoint and flow of every device
    Poll {
        /// Time between cycles (milliseconds)
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        /// Stop after this many cycles
        #[arg(long)]
        count: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TotalizerAction {
    Status,
    Value,
    Start,
    Stop,
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> CliResult<()> {
    let mut config = match &cli.config {
        Some(path) => PollerConfig::load(path)?,
        None => PollerConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.serial.port = Some(port.clone());
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(settle_ms) = cli.settle_ms {
        config.transport.settle_ms = settle_ms;
    }
    if let Some(attempts) = cli.attempts {
        config.transport.max_attempts = attempts;
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_addr {
        mfcbus_metrics::install_prometheus(addr).map_err(|e| CliError::Metrics(e.to_string()))?;
        tracing::info!("Serving metrics on {}", addr);
    }

    let targets = targets(&cli, &config)?;
    let channel = SerialChannel::open(&config.serial)?;
    let port = channel.name().to_string();

    let action = match cli.command {
        Commands::Poll { interval_ms, count } => {
            return poll(channel, &port, &config, &targets, interval_ms, count, cli.json);
        }
        Commands::Discover => Action::Discover,
        Commands::Read => Action::ReadPrimaryVariable,
        Commands::Range { gas } => Action::ReadFlowRange { gas_select: gas },
        Commands::Setpoint => Action::ReadSetpoint,
        Commands::SetSetpoint { value, percent } => Action::WriteSetpoint {
            value,
            unit: if percent { UNIT_PERCENT } else { UNIT_SELECTED },
        },
        Commands::Unit { unit, reference } => Action::SelectFlowUnit {
            unit: parse_unit(&unit)?,
            reference,
        },
        Commands::Totalizer { action } => match action {
            TotalizerAction::Status => Action::TotalizerStatus,
            TotalizerAction::Value => Action::TotalizerValue,
            TotalizerAction::Start => Action::ControlTotalizer(TotalizerCommand::Start),
            TotalizerAction::Stop => Action::ControlTotalizer(TotalizerCommand::Stop),
            TotalizerAction::Reset => Action::ControlTotalizer(TotalizerCommand::Reset),
        },
    };

    let (_, tag) = targets.into_iter().next().ok_or(CliError::NoDevice)?;
    let transport = TransportSession::with_config(channel, config.transport)
        .with_labels(BusLabels::new(port));
    let mut device = DeviceSession::connect(tag, transport)?;
    let report = execute(&mut device, action)?;
    emit(&report, cli.json)
}

/// Devices selected by `--tag`, `--device` or the config file, in that order.
fn targets(cli: &Cli, config: &PollerConfig) -> CliResult<Vec<(String, Tag)>> {
    if let Some(tag) = &cli.tag {
        let tag = Tag::new(tag)?;
        return Ok(vec![(tag.to_string(), tag)]);
    }
    if let Some(name) = &cli.device {
        let device = config.device(name)?;
        return Ok(vec![(device.name.clone(), device.tag.clone())]);
    }
    if config.devices.is_empty() {
        return Err(CliError::NoDevice);
    }
    Ok(config
        .devices
        .iter()
        .map(|d| (d.name.clone(), d.tag.clone()))
        .collect())
}

fn poll<C: ByteChannel>(
    channel: C,
    port: &str,
    config: &PollerConfig,
    targets: &[(String, Tag)],
    interval_ms: u64,
    count: Option<u64>,
    json: bool,
) -> CliResult<()> {
    let bus = SharedBus::new(channel);
    let mut devices = connect_all(&bus, port, config.transport, targets);
    if devices.is_empty() {
        return Err(CliError::NoDevice);
    }

    let interval = Duration::from_millis(interval_ms);
    let mut cycle = 0u64;
    while count.map_or(true, |limit| cycle < limit) {
        if cycle > 0 {
            thread::sleep(interval);
        }
        for device in devices.iter_mut() {
            emit(&device.snapshot(), json)?;
        }
        cycle += 1;
    }
    Ok(())
}

fn emit<T: Serialize + std::fmt::Display>(value: &T, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{value}");
    }
    Ok(())
}
