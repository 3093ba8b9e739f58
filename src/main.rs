use clap::Parser;
use serial_watch::config::{Config, ConfigLoader};
use serial_watch::error::AppError;
use serial_watch::hotplug::{HotplugDispatcher, NusbMonitor};
use serial_watch::identity::DeviceIdentity;
use serial_watch::logging::init_logging;
use serial_watch::port::{SerialBackend, SystemSerialBackend};
use serial_watch::reader::StdoutSink;
use serial_watch::retry::TokioDelay;
use serial_watch::ConnectionManager;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Stream a USB serial device to stdout whenever it is plugged in.",
    long_about = "Watches the USB bus for the device with the given serial number. When it attaches, the matching serial port is opened at 9600 8N1 and everything it sends is written to stdout with LF translated to CRLF. The connection is torn down when any USB device detaches or the stream fails."
)]
struct Args {
    /// USB serial number of the device to watch (case-insensitive).
    #[arg(short = 's', long)]
    serial_number: Option<DeviceIdentity>,

    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds to wait after an attach before looking for the port.
    #[arg(long)]
    settle_delay_ms: Option<u64>,

    /// Increase log verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// List serial ports and USB devices, then exit.
    #[arg(short, long)]
    list: bool,
}

impl Args {
    fn load_config(&self) -> Result<Config, AppError> {
        let loader = match &self.config {
            Some(path) => ConfigLoader::load_from(path)?,
            None => ConfigLoader::load()?,
        };

        let mut config = loader.into_config();
        if let Some(identity) = &self.serial_number {
            config.device.serial_number = identity.as_str().to_string();
        }
        if let Some(ms) = self.settle_delay_ms {
            config.device.settle_delay_ms = ms;
        }
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = match args.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("serial-watch: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging, args.verbose) {
        eprintln!("serial-watch: {e}");
        return ExitCode::FAILURE;
    }

    let result = if args.list {
        list_devices()
    } else {
        watch(&config).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Print what the resolver and the hotplug layer can see.
fn list_devices() -> Result<(), AppError> {
    let ports = SystemSerialBackend::new().available_ports()?;
    println!("Serial ports:");
    if ports.is_empty() {
        println!("  (none)");
    }
    for port in ports {
        match port.serial_number {
            Some(sn) => println!("  {} (serial {sn})", port.path),
            None => println!("  {}", port.path),
        }
    }

    let devices = NusbMonitor::list_devices()?;
    println!("USB devices:");
    if devices.is_empty() {
        println!("  (none)");
    }
    for device in devices {
        println!("  {device}");
    }
    Ok(())
}

async fn watch(config: &Config) -> Result<(), AppError> {
    let identity = config.identity();
    let manager = ConnectionManager::new(
        Arc::new(SystemSerialBackend::new()),
        Arc::new(StdoutSink),
    )
    .with_settings(config.connection_settings())
    .with_delay(Arc::new(TokioDelay));

    let monitor = NusbMonitor::new()?;
    info!(identity = %identity, "Watching for USB device");

    let dispatcher = HotplugDispatcher::new(identity, manager.clone(), monitor);
    tokio::select! {
        _ = dispatcher.run() => warn!("Hotplug monitoring stopped"),
        _ = shutdown_signal() => {}
    }

    manager.stop().await;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, shutting down");
}
