//! Microphone capture on a dedicated thread.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream is built, played
//! and dropped on its own thread. Captured audio is downmixed to mono, resampled to
//! the requested rate and delivered as PCM16 frames, but only while the capture is
//! enabled. A new capture starts disabled.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use rubato::Resampler;

use crate::{audio, device};

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub device_name: Option<String>,
    pub sample_rate: u32,
    pub channels: u16,
    pub chunk_size: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            sample_rate: audio::PREFERRED_SAMPLE_RATE,
            channels: audio::PREFERRED_CHANNELS,
            chunk_size: 1024,
        }
    }
}

pub struct InputCapture {
    device_name: String,
    sample_rate: u32,
    enabled: Arc<AtomicBool>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl InputCapture {
    /// Opens the input device and starts a disabled capture feeding `frames`.
    pub fn start(config: CaptureConfig, frames: tokio::sync::mpsc::Sender<Vec<i16>>) -> anyhow::Result<Self> {
        let enabled = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<(String, u32)>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let gate = enabled.clone();
        let thread = std::thread::Builder::new()
            .name("rehearsal-capture".to_string())
            .spawn(move || {
                let stream = match build_input_stream(&config, gate, frames) {
                    Ok((stream, name, rate)) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(e.into()));
                            return;
                        }
                        let _ = ready_tx.send(Ok((name, rate)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns once stop() drops the sender.
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("capture stream dropped");
            })?;

        let (device_name, sample_rate) = ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("capture thread exited before opening the device"))??;
        tracing::info!("capturing from {} at {}hz (disabled)", device_name, sample_rate);

        Ok(Self {
            device_name,
            sample_rate,
            enabled,
            stop_tx: Mutex::new(Some(stop_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Stops the stream and joins the capture thread. Later calls do nothing.
    pub fn stop(&self) {
        self.set_enabled(false);
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            stop_tx.take();
        }
        let thread = self.thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("capture thread panicked");
            }
        }
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn preferred_input_config(device: &cpal::Device, rate: u32, channels: u16) -> anyhow::Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(rate);
    let matching = device.supported_input_configs()?.find(|range| {
        range.channels() == channels
            && range.sample_format() == cpal::SampleFormat::F32
            && range.min_sample_rate() <= wanted
            && wanted <= range.max_sample_rate()
    });
    match matching {
        Some(range) => Ok(range.with_sample_rate(wanted)),
        None => {
            tracing::debug!("no input config matches {}ch {}hz, using the device default", channels, rate);
            Ok(device.default_input_config()?)
        }
    }
}

fn build_input_stream(
    config: &CaptureConfig,
    gate: Arc<AtomicBool>,
    frames: tokio::sync::mpsc::Sender<Vec<i16>>,
) -> anyhow::Result<(cpal::Stream, String, u32)> {
    let device = device::get_or_default_input(config.device_name.clone())?;
    let name = device.name()?;
    let supported = preferred_input_config(&device, config.sample_rate, config.channels)?;
    let channels = supported.channels() as usize;
    let device_rate = supported.sample_rate().0;
    let stream_config: cpal::StreamConfig = supported.into();
    tracing::debug!("input: device={:?}, config={:?}", &name, &stream_config);

    let chunk_size = config.chunk_size;
    let mut resampler = if device_rate != config.sample_rate {
        Some(audio::create_resampler(device_rate as f64, config.sample_rate as f64, chunk_size)?)
    } else {
        None
    };
    let mut pending: VecDeque<f32> = VecDeque::with_capacity(chunk_size * 2);

    let data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
        if !gate.load(Ordering::Relaxed) {
            pending.clear();
            return;
        }
        let mono = audio::downmix(data, channels);
        let samples = match resampler.as_mut() {
            None => mono,
            Some(resampler) => {
                pending.extend(mono);
                let mut resampled: Vec<f32> = Vec::new();
                while pending.len() >= chunk_size {
                    let chunk: Vec<f32> = pending.drain(..chunk_size).collect();
                    match resampler.process(&[chunk.as_slice()], None) {
                        Ok(out) => {
                            if let Some(out) = out.first() {
                                resampled.extend_from_slice(out);
                            }
                        }
                        Err(e) => tracing::warn!("failed to resample captured audio: {}", e),
                    }
                }
                resampled
            }
        };
        if samples.is_empty() {
            return;
        }
        if let Err(e) = frames.try_send(audio::to_pcm16(&samples)) {
            tracing::warn!("dropping captured frame: {}", e);
        }
    };

    let stream = device.build_input_stream(
        &stream_config,
        data_fn,
        move |err| tracing::error!("an error occurred on input stream: {}", err),
        None,
    )?;
    Ok((stream, name, config.sample_rate))
}
