use anyhow::Context;
use log::{debug, info, warn};
use structopt::StructOpt;

use pmsx003::{
    Config, DecodeError, Decoder, EventMode, OutputProjection, OutputSlots, SensorVariant,
    StreamSource,
};

#[derive(StructOpt)]
struct PmReader {
    /// Path to serial port to use. On Linux this is something like
    /// `/dev/ttyUSB0`. On Mac, `/dev/tty.somethingorother`.
    serial_port: std::path::PathBuf,

    /// Sensor model: pms5003 (also pms1003/pms7003), pms3003 (also
    /// pms2003), pms5003s, pms5003t, pms5003st, or its number 0-4.
    #[structopt(long, default_value = "pms5003")]
    model: SensorVariant,

    /// Values to print: mass (pm1.0/pm2.5/pm10), env (pm2.5/temp/humidity/
    /// HCHO) or count (particles >1.0/2.5/5/10 um).
    #[structopt(long, default_value = "mass")]
    output: OutputProjection,

    /// Extra named values to log: none, basic or counts.
    #[structopt(long, default_value = "none")]
    events: EventMode,

    /// Prefix for named values.
    #[structopt(long, default_value = "PMSx003")]
    name: String,

    /// Don't log named values, whatever `--events` says.
    #[structopt(long)]
    no_events: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = PmReader::from_args();
    let config = Config {
        variant: args.model,
        projection: args.output,
        event_mode: args.events,
        events_enabled: !args.no_events,
        name: args.name.clone(),
    };
    config.validate()?;

    let mut port = serialport::open(&args.serial_port)
        .with_context(|| format!("opening {}", args.serial_port.display()))?;
    // Device produces output at 1Hz; if we haven't heard anything for 2
    // seconds, something is wrong.
    port.set_timeout(std::time::Duration::from_secs(2))?;
    info!("reading {} on {}", config.variant, args.serial_port.display());

    let mut decoder = Decoder::new(Some(StreamSource::new(port)), config.variant);
    let mut slots = OutputSlots::new();
    let mut events: Vec<String> = Vec::new();
    loop {
        let fresh = match decoder.source_mut() {
            Some(src) => src.fill()?,
            None => 0,
        };
        if fresh == 0 {
            warn!("no data from sensor");
        }

        match decoder.poll(&config, &mut slots, &mut events) {
            Ok(_) => {}
            Err(DecodeError::NotReady) => continue,
            Err(e @ DecodeError::FramingMismatch { .. }) => {
                debug!("{}", e);
                continue;
            }
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        }

        if decoder.check_and_clear_values_received() {
            let v = slots.values();
            // CSV output.
            println!(
                "{},{},{},{},{}",
                chrono::Local::now().to_rfc3339(),
                v[0],
                v[1],
                v[2],
                v[3],
            );
        }
        for event in events.drain(..) {
            info!("{}", event);
        }
    }
}
