//! fodhapticd
//!
//! Daemon driving the under-display fingerprint illumination overlay and the
//! haptic motor through their sysfs control registers, exposed to the system
//! UI over D-Bus.

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use fodhapticd::{
    config::Config,
    dbus::{emit_finger_down, emit_finger_up, init_dbus_service},
    fod::{new_shared_fod_engine, ChannelCallback, FingerEvent},
    vendor::VendorLink,
    vibrator::new_shared_vibrator,
};

/// fodhapticd - FOD dim-alpha and haptic waveform daemon
#[derive(Parser, Debug)]
#[command(name = "fodhapticd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = fodhapticd::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("fodhapticd starting...");

    let config = Config::load_or_default(&args.config);

    // Connect to the vendor fingerprint/display services (optional: the
    // engines degrade to sysfs-only operation without them)
    let vendor = match VendorLink::connect() {
        Ok(link) => {
            info!("Vendor services connected");
            Some(link)
        }
        Err(e) => {
            warn!(error = %e, "Vendor services unavailable (non-fatal)");
            None
        }
    };

    // Construct the engines. The vibrator constructor arms the haptic-audio
    // trigger; everything else is driven by incoming requests.
    let fod = new_shared_fod_engine(config.fod.clone(), vendor);
    let vibrator = new_shared_vibrator();

    // Wire finger detections onto a channel for D-Bus signal emission
    let (finger_tx, finger_rx) = mpsc::channel::<FingerEvent>(32);
    {
        let engine = fod.lock().map_err(|e| format!("FOD engine lock: {}", e))?;
        engine.set_callback(Some(Box::new(ChannelCallback::new(finger_tx))));
    }

    // Register the D-Bus service
    let connection = match init_dbus_service(fod, vibrator).await {
        Ok(conn) => {
            info!("D-Bus service initialized successfully");
            conn
        }
        Err(e) => {
            error!("Failed to initialize D-Bus service: {}", e);
            return Err(e.into());
        }
    };

    // Spawn the finger event emission task
    let signal_connection = connection.clone();
    let finger_handle = tokio::spawn(async move {
        process_finger_events(finger_rx, &signal_connection).await;
    });

    info!("fodhapticd ready");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, exiting...");
        }
        result = finger_handle => {
            if let Err(e) = result {
                error!("Finger event task panicked: {:?}", e);
            }
        }
    }

    Ok(())
}

/// Forward finger detections from the FOD engine to D-Bus signals.
async fn process_finger_events(
    mut finger_rx: mpsc::Receiver<FingerEvent>,
    connection: &zbus::Connection,
) {
    while let Some(event) = finger_rx.recv().await {
        match event {
            FingerEvent::Down => {
                info!("Finger down detected - emitting FingerDown signal");
                if let Err(e) = emit_finger_down(connection).await {
                    error!("Failed to emit FingerDown signal: {}", e);
                }
            }
            FingerEvent::Up => {
                info!("Finger up detected - emitting FingerUp signal");
                if let Err(e) = emit_finger_up(connection).await {
                    error!("Failed to emit FingerUp signal: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_config() {
        let args = Args::parse_from(["fodhapticd"]);
        assert_eq!(args.config, PathBuf::from("/etc/fodhapticd/config.json"));
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_verbose() {
        let args = Args::parse_from(["fodhapticd", "--verbose"]);
        assert!(args.verbose);
    }

    #[tokio::test]
    async fn test_finger_event_channel() {
        let (tx, mut rx) = mpsc::channel::<FingerEvent>(8);

        tx.send(FingerEvent::Down).await.unwrap();
        tx.send(FingerEvent::Up).await.unwrap();

        assert_eq!(rx.recv().await, Some(FingerEvent::Down));
        assert_eq!(rx.recv().await, Some(FingerEvent::Up));
    }
}
