//! uartio command line
//!
//! `uartio list`, `uartio info <path>` and `uartio probe <path>`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use uartio_core::{device_info, list_ports, Parity, PortSettings, SerialPort, StopBits};

#[derive(Parser, Debug)]
#[command(name = "uartio", version, about = "Inspect and probe serial ports")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available serial ports
    List,
    /// Show USB details for a port
    Info {
        /// Port path or name, e.g. /dev/ttyUSB0 or COM3
        path: String,
    },
    /// Open a port, report pending input and hex-dump what arrives
    Probe(ProbeArgs),
}

#[derive(Args, Debug, Default)]
struct ProbeArgs {
    /// Port path or name
    path: String,

    /// JSON settings file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    baud: Option<u32>,

    /// n, e or o
    #[arg(long)]
    parity: Option<Parity>,

    /// 1 or 2
    #[arg(long)]
    stop_bits: Option<u8>,

    /// Reads wait for data
    #[arg(long, overrides_with = "no_blocking")]
    blocking: bool,

    /// Reads return immediately, even if the config file says otherwise
    #[arg(long, overrides_with = "blocking")]
    no_blocking: bool,

    /// RTS/CTS hardware flow control
    #[arg(long, overrides_with = "no_flow_control")]
    flow_control: bool,

    /// Turn RTS/CTS off, even if the config file enables it
    #[arg(long, overrides_with = "flow_control")]
    no_flow_control: bool,

    /// How long to listen for input
    #[arg(long, default_value_t = 500)]
    listen_ms: u64,
}

/// `--x` / `--no-x` pair; `None` keeps the configured value
fn switch(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn resolve_settings(args: &ProbeArgs) -> Result<PortSettings> {
    let mut settings = match &args.config {
        Some(path) => PortSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => PortSettings::default(),
    };
    if let Some(baud) = args.baud {
        settings.baud_rate = baud;
    }
    if let Some(parity) = args.parity {
        settings.parity = parity;
    }
    if let Some(stop_bits) = args.stop_bits {
        settings.stop_bits = StopBits::try_from(stop_bits)?;
    }
    if let Some(blocking) = switch(args.blocking, args.no_blocking) {
        settings.blocking = blocking;
    }
    if let Some(flow_control) = switch(args.flow_control, args.no_flow_control) {
        settings.flow_control = flow_control;
    }
    settings.validate()?;
    Ok(settings)
}

fn hex_line(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn show(label: &str, value: Option<&str>) {
    println!("{:<14}{}", label, value.unwrap_or("Not Available"));
}

fn run_list() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{}  {:04x}:{:04x}  {}",
                port.name,
                vid,
                pid,
                port.product.as_deref().unwrap_or("")
            ),
            _ => println!("{}", port.name),
        }
    }
}

fn run_info(path: &str) -> Result<()> {
    let Some(info) = device_info(path)? else {
        println!("No device matches {}", path);
        return Ok(());
    };
    show("Manufacturer:", info.manufacturer.as_deref());
    show("Product:", info.product.as_deref());
    show("Model:", info.model.as_deref());
    show("Driver:", info.driver.as_deref());
    show("VID:PID:", info.usb_id().as_deref());
    Ok(())
}

fn run_probe(args: &ProbeArgs) -> Result<()> {
    let settings = resolve_settings(args)?;
    let mut port = SerialPort::open(&args.path, &settings)
        .with_context(|| format!("opening {}", args.path))?;
    println!("Opened {} at {}", port.path(), port.settings());
    println!("Pending input: {} bytes", port.bytes_to_read()?);

    let deadline = Instant::now() + Duration::from_millis(args.listen_ms);
    let mut buf = [0u8; 256];
    while Instant::now() < deadline {
        if !port.poll()? {
            std::thread::sleep(Duration::from_millis(10));
            continue;
        }
        let n = port.read(&mut buf).context("reading from port")?;
        if n > 0 {
            println!("{}", hex_line(&buf[..n]));
        }
    }

    port.close();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::List => run_list(),
        Command::Info { path } => run_info(path)?,
        Command::Probe(args) => run_probe(args)?,
    }
    Ok(())
}
