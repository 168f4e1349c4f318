use anyhow::Result;
use chrono::{Local, Utc};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use tokio::time::sleep;

use myo_recorder_rs::device::SimulatedDevice;
use myo_recorder_rs::recorder::{RecorderConfig, TelemetryRecorder};
use myo_recorder_rs::shutdown::ShutdownSignal;
use myo_recorder_rs::sink::{session_filename, summary_filename};

#[derive(Parser, Debug)]
#[command(name = "myo_recorder")]
#[command(about = "Records EMG + IMU telemetry from a Myo armband to CSV", long_about = None)]
struct Args {
    /// Duration in seconds (0 = run until Ctrl-C)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Output row cadence in milliseconds
    #[arg(long, default_value = "10")]
    interval_ms: u64,

    /// Output directory
    #[arg(long, default_value = "myo_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("[{}] Myo Recorder Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Cadence: {} ms", args.interval_ms);
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let shutdown = ShutdownSignal::new();

    // Ctrl-C maps straight onto the cooperative stop flag; the loop
    // notices within one iteration.
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("[{}] Interrupt received, stopping...", ts_now());
            interrupt.request_stop();
        }
    });

    if args.duration > 0 {
        let timer = shutdown.clone();
        let duration = args.duration;
        tokio::spawn(async move {
            sleep(Duration::from_secs(duration)).await;
            println!("[{}] Duration reached, stopping...", ts_now());
            timer.request_stop();
        });
    }

    let started = Local::now();
    let output_path = Path::new(&args.output_dir).join(session_filename(started));
    println!("[{}] Recording to {}", ts_now(), output_path.display());

    let mut config = RecorderConfig::new(&output_path);
    config.interval = Duration::from_millis(args.interval_ms);

    // Hardware transport is out of scope here; the simulated armband
    // stands in behind the same MyoDevice boundary.
    let device = SimulatedDevice::new();
    let mut recorder = TelemetryRecorder::new(Box::new(device), config, shutdown);

    // The device pump and CSV writes are synchronous; keep them off the
    // async executor.
    let summary = tokio::task::spawn_blocking(move || recorder.run()).await??;

    // Summary shares the session timestamp so a later session never
    // overwrites it. The CSV is already closed here, so surfacing a
    // failed save loses no telemetry.
    let summary_path = Path::new(&args.output_dir).join(summary_filename(started));
    summary.save(&summary_path)?;

    println!("\n=== Final Stats ===");
    println!("Rows written: {}", summary.rows_written);
    println!("EMG updates: {}", summary.emg_updates);
    println!("IMU updates: {}", summary.imu_updates);
    println!("Uptime: {} s", summary.uptime_seconds);
    println!("Output: {}", summary.output_file);

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
