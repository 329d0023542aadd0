//! Command-line front end for the Sonoff cluster codec

mod dry_run;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dry_run::DryRunTransport;
use serde_json::Value;
use sonoff_core::translate::{to_raw, to_semantic};
use sonoff_core::{
    ClusterKind, DeviceVariant, DriverConfig, Endpoint, InchingMode, InchingRequest,
    SonoffDevice, ZigbeeDevice, SONOFF_MANUFACTURER_ID,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use zcl_protocol::{AttributeValue, ClusterAddress, InboundFrame, ZclFrame};

const DEMO_IEEE: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x00, 0x4b, 0x12, 0x00];
const DEMO_NWK: u16 = 0x1234;

#[derive(Parser, Debug)]
#[command(version, about = "Sonoff ZCL extension toolbox", long_about = None)]
struct Args {
    /// JSON file with driver configuration (defaults to SONOFF_* env vars)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print attribute and command tables
    Schema {
        #[arg(long, value_enum, default_value_t = ClusterArg::Sonoff)]
        cluster: ClusterArg,
    },
    /// Encode an inching command payload
    Inching {
        /// Encode with inching disabled
        #[arg(long, default_value_t = false)]
        disable: bool,
        /// Duration in seconds
        #[arg(long, default_value_t = 1.0)]
        time: f64,
        /// latch-open or latch-closed
        #[arg(long, default_value = "latch-open")]
        mode: String,
    },
    /// Handle a frame received from a device, given as hex
    Decode {
        #[arg(long, value_enum, default_value_t = ClusterArg::Sonoff)]
        cluster: ClusterArg,
        /// Device model
        #[arg(long, default_value = "ZBMINIR2")]
        model: String,
        hex: String,
    },
    /// Translate one attribute value between wire and settings form
    Translate {
        /// Attribute name or settings key
        attribute: String,
        /// Raw integer, or settings JSON with --to-raw
        value: String,
        #[arg(long, default_value_t = false)]
        to_raw: bool,
    },
    /// Apply changed settings to a simulated device and print the frames
    Apply {
        #[arg(long, default_value = "ZBMINIR2")]
        model: String,
        /// Settings as a JSON object
        settings: String,
        /// Changed keys (comma separated); all keys when omitted
        #[arg(long, value_delimiter = ',')]
        changed: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ClusterArg {
    OnOff,
    Sonoff,
}

impl From<ClusterArg> for ClusterKind {
    fn from(arg: ClusterArg) -> Self {
        match arg {
            ClusterArg::OnOff => ClusterKind::OnOff,
            ClusterArg::Sonoff => ClusterKind::Sonoff,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DriverConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("Invalid config {}", path.display()))
        }
        None => Ok(DriverConfig::from_env()),
    }
}

fn demo_device(model: &str, config: &DriverConfig) -> (SonoffDevice, Arc<DryRunTransport>) {
    let variant = DeviceVariant::from_model(model);
    let info = ZigbeeDevice::new(DEMO_IEEE, DEMO_NWK)
        .with_model(model)
        .with_endpoint(Endpoint::for_variant(config.endpoint, variant));
    let transport = Arc::new(DryRunTransport::new());
    let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
    let device = SonoffDevice::new(info, transport.clone(), config, event_tx);
    (device, transport)
}

fn print_schema(kind: ClusterKind) {
    let schema = kind.schema();
    println!(
        "{} ({:#06x}) manufacturer {}",
        schema.name,
        schema.id,
        schema
            .manufacturer_code
            .map_or_else(|| "-".to_string(), |code| format!("{code:#06x}"))
    );
    for attr in schema.attributes {
        println!(
            "  {:#06x}  {:<30} {:<8} setting={}",
            attr.id,
            attr.name,
            format!("{:?}", attr.wire_type),
            attr.setting
        );
    }
    for cmd in schema.commands {
        println!(
            "  cmd {:#04x} {:<22} {:?}{}",
            cmd.id,
            cmd.name,
            cmd.direction,
            if cmd.manufacturer_specific {
                " (manufacturer specific)"
            } else {
                ""
            }
        );
    }
}

fn print_inching(disable: bool, time: f64, mode: &str) -> anyhow::Result<()> {
    let mode: InchingMode = mode.parse()?;
    let request = InchingRequest::new(!disable, time, mode)?;
    let command = request.command();
    println!("payload   {}", hex::encode(command.payload.as_bytes()));
    println!("flags     {:#04x}", command.payload.flags());
    println!("units     {} x 0.5 s", command.payload.time_units());
    println!("checksum  {:#04x}", command.payload.checksum());
    println!("mfr       {:#06x}", SONOFF_MANUFACTURER_ID);
    Ok(())
}

fn decode(config: &DriverConfig, cluster: ClusterKind, model: &str, raw: &str) -> anyhow::Result<()> {
    let bytes = hex::decode(raw.trim()).context("Frame is not valid hex")?;
    let frame = ZclFrame::parse(&bytes)?;
    println!(
        "fc={:#04x} mfr={:?} seq={} cmd={:#04x} payload={}",
        frame.frame_control(),
        frame.manufacturer_code(),
        frame.transaction_seq(),
        frame.command_id(),
        hex::encode(frame.payload())
    );

    let (device, _) = demo_device(model, config);
    let inbound = InboundFrame {
        source: ClusterAddress {
            nwk_address: DEMO_NWK,
            endpoint: config.endpoint,
            cluster_id: cluster.schema().id,
        },
        frame,
    };
    match device.handle_frame(&inbound) {
        Ok(handled) => println!("{handled:?}"),
        Err(e) => println!("not handled: {e}"),
    }
    Ok(())
}

fn translate(attribute: &str, value: &str, raw_output: bool) -> anyhow::Result<()> {
    let spec = ClusterKind::Sonoff
        .schema()
        .attribute(attribute)
        .or_else(|_| ClusterKind::OnOff.schema().attribute(attribute))?;

    if raw_output {
        let semantic: Value =
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        let raw = to_raw(spec, &semantic)?;
        let mut encoded = Vec::new();
        raw.encode(&mut encoded)?;
        println!("{raw:?} ({})", hex::encode(encoded));
    } else {
        let number: i64 = value
            .parse()
            .with_context(|| format!("Raw value {value:?} is not an integer"))?;
        let raw = AttributeValue::from_i64(spec.wire_type.data_type(), number)?;
        println!("{}", to_semantic(spec, &raw));
    }
    Ok(())
}

async fn apply(
    config: &DriverConfig,
    model: &str,
    settings: &str,
    changed: &[String],
) -> anyhow::Result<()> {
    let settings: Value = serde_json::from_str(settings).context("Settings must be JSON")?;
    let Value::Object(settings) = settings else {
        bail!("Settings must be a JSON object");
    };
    let changed: Vec<&str> = if changed.is_empty() {
        settings.keys().map(String::as_str).collect()
    } else {
        changed.iter().map(String::as_str).collect()
    };

    let (device, transport) = demo_device(model, config);
    device.apply_settings(&settings, &changed).await?;

    if changed.contains(&"power_on_behavior") {
        // Let the delayed read-back go out
        tokio::time::sleep(config.verify_delay() + Duration::from_millis(50)).await;
    }
    device.teardown();

    tracing::info!("{} frame(s) sent", transport.sent());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sonoff_core=info,sonoff_tool=info,warn".into()),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    tracing::debug!("Using {:?}", config);

    match args.command {
        Command::Schema { cluster } => print_schema(cluster.into()),
        Command::Inching {
            disable,
            time,
            mode,
        } => print_inching(disable, time, &mode)?,
        Command::Decode {
            cluster,
            model,
            hex,
        } => decode(&config, cluster.into(), &model, &hex)?,
        Command::Translate {
            attribute,
            value,
            to_raw,
        } => translate(&attribute, &value, to_raw)?,
        Command::Apply {
            model,
            settings,
            changed,
        } => apply(&config, &model, &settings, &changed).await?,
    }

    Ok(())
}
