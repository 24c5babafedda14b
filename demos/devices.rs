use std::time::Duration;

use clap::Parser;
use script_rehearsal::transport::{AudioConstraints, MediaDevices};
use script_rehearsal::utils;
use script_rehearsal::media::CpalMedia;
use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Lists audio devices and optionally checks the microphone gate.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Capture this many seconds with the microphone enabled.
    #[arg(long, default_value_t = 0)]
    capture_seconds: u64,

    #[arg(long)]
    input: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_timer(ChronoLocal::rfc_3339())
        .init();
    let args = Args::parse();

    println!("Available inputs: {}", utils::device::get_available_inputs()?);
    println!("Available outputs: {}", utils::device::get_available_outputs()?);

    if args.capture_seconds == 0 {
        return Ok(());
    }

    let (frames_tx, mut frames_rx) = tokio::sync::mpsc::channel::<Vec<i16>>(64);
    let mut media = CpalMedia::new(frames_tx);
    if let Some(input) = &args.input {
        media = media.with_input_device(input);
    }
    let tracks = media.open_microphone(&AudioConstraints::default()).await?;
    for track in &tracks {
        track.set_enabled(true);
    }

    let deadline = tokio::time::sleep(Duration::from_secs(args.capture_seconds));
    tokio::pin!(deadline);
    let mut samples = 0usize;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(frame) = frames_rx.recv() => samples += frame.len(),
        }
    }
    for track in &tracks {
        track.stop();
    }
    println!("captured {} samples", samples);
    Ok(())
}
