//! mtp-bridge
//!
//! Line-oriented command bridge for still-image devices. Commands are read
//! from stdin (or given once on the command line), results are written to
//! stdout as one JSON object per line, and hotplug events go to stderr.

use anyhow::{Context, Result};
use bridge::config::resolve_registry_path;
use bridge::service::{HotplugConsumer, emit_device_changes, run_commands};
use bridge::usb::{HotplugWatcher, UsbTransport};
use bridge::{Bridge, Registry, SharedBridge};
use clap::Parser;
use common::{create_hotplug_channel, setup_logging};
use tokio::io::BufReader;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "mtp-bridge")]
#[command(author, about = "Line-oriented command bridge for still-image devices")]
#[command(long_about = "
Reads one command per line on stdin and answers with one JSON object per
line on stdout. Device arrival and removal events are written to stderr.

COMMANDS:
    deviceList
    deviceInfo DEVICE-ID
    desc DEVICE-ID PROPERTY
    get DEVICE-ID PROPERTY
    set DEVICE-ID PROPERTY VALUE
    sendConfig DEVICE-ID FILE
    getConfig DEVICE-ID FILE
    firmwareUpdate DEVICE-ID FILE

EXAMPLES:
    # Interactive session
    mtp-bridge

    # One-shot command
    mtp-bridge get 001:004 WhiteBalance

    # Custom property registry
    mtp-bridge --config ~/registry.toml
")]
struct Args {
    /// Path to the property registry document (JSON or TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Print version and supported property names, then exit
    #[arg(short = 'v', long)]
    show_properties: bool,

    /// Run a single command instead of reading stdin
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level).context("Failed to setup logging")?;

    let registry = match resolve_registry_path(args.config.as_deref()) {
        Some(path) => Registry::default().load(&path),
        None => Registry::default(),
    };

    if args.show_properties {
        println!("mtp-bridge version {}", env!("CARGO_PKG_VERSION"));
        println!(
            "    Supported device properties: {}",
            registry.property_names().join(" ")
        );
        return Ok(());
    }

    info!("mtp-bridge v{}", env!("CARGO_PKG_VERSION"));

    let transport = UsbTransport::new().context("Failed to initialize libusb")?;
    let (notifier, receiver) = create_hotplug_channel();
    let watcher = HotplugWatcher::start(transport.context(), notifier).unwrap_or_else(|e| {
        warn!("Hot-plug registration failed, device events disabled: {:#}", e);
        None
    });

    let bridge = SharedBridge::new(Bridge::new(transport, registry));

    // baseline snapshot; devices already present are reported as added
    if let Err(e) = emit_device_changes(&bridge, &mut tokio::io::stderr()).await {
        warn!("Initial device scan failed: {:#}", e);
    }
    let consumer = HotplugConsumer::spawn(bridge.clone(), receiver, tokio::io::stderr());

    let result = if args.command.is_empty() {
        run_commands(
            bridge,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await
    } else {
        let line = args.command.join(" ");
        run_commands(bridge, line.as_bytes(), tokio::io::stdout()).await
    };

    consumer.stop().await;
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    info!("mtp-bridge shutdown complete");

    result
}
