use std::sync::{mpsc, Mutex};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, StreamTrait};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapProd;

use crate::{audio, device};

/// Speaker output fed through a ring buffer, played on its own thread.
pub struct OutputPlayback {
    sample_rate: u32,
    producer: Mutex<Option<HeapProd<f32>>>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl OutputPlayback {
    pub fn start(device_name: Option<String>, latency_ms: usize) -> anyhow::Result<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<(u32, HeapProd<f32>)>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("rehearsal-playback".to_string())
            .spawn(move || {
                let stream = match build_output_stream(device_name, latency_ms) {
                    Ok((stream, rate, producer)) => {
                        if let Err(e) = stream.play() {
                            let _ = ready_tx.send(Err(e.into()));
                            return;
                        }
                        let _ = ready_tx.send(Ok((rate, producer)));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("playback stream dropped");
            })?;

        let (sample_rate, producer) = ready_rx
            .recv()
            .map_err(|_| anyhow::anyhow!("playback thread exited before opening the device"))??;

        Ok(Self {
            sample_rate,
            producer: Mutex::new(Some(producer)),
            stop_tx: Mutex::new(Some(stop_tx)),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Queues mono samples at [`Self::sample_rate`]. Returns how many fit.
    pub fn push(&self, samples: &[f32]) -> usize {
        match self.producer.lock() {
            Ok(mut guard) => guard.as_mut().map(|p| p.push_slice(samples)).unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub fn stop(&self) {
        if let Ok(mut producer) = self.producer.lock() {
            producer.take();
        }
        if let Ok(mut stop_tx) = self.stop_tx.lock() {
            stop_tx.take();
        }
        let thread = self.thread.lock().ok().and_then(|mut t| t.take());
        if let Some(thread) = thread {
            if thread.join().is_err() {
                tracing::error!("playback thread panicked");
            }
        }
    }
}

impl Drop for OutputPlayback {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_output_stream(device_name: Option<String>, latency_ms: usize) -> anyhow::Result<(cpal::Stream, u32, HeapProd<f32>)> {
    let output = device::get_or_default_output(device_name)?;
    let output_config: cpal::StreamConfig = output.default_output_config()?.into();
    let channel_count = output_config.channels as usize;
    let sample_rate = output_config.sample_rate.0;
    tracing::debug!("output: device={:?}, config={:?}", output.name().ok(), &output_config);

    let buffer = audio::shared_buffer((sample_rate as usize * latency_ms / 1000).max(1));
    let (producer, mut consumer) = buffer.split();

    let output_data_fn = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let mut sample_index = 0;
        while sample_index < data.len() {
            let sample = consumer.try_pop().unwrap_or(0.0);
            // L channel (ch:0)
            data[sample_index] = sample;
            sample_index += 1;
            // R channel (ch:1)
            if channel_count > 1 && sample_index < data.len() {
                data[sample_index] = sample;
                sample_index += 1;
            }
            // ignore other channels
            sample_index += channel_count.saturating_sub(2);
        }
    };
    let stream = output.build_output_stream(
        &output_config,
        output_data_fn,
        move |err| tracing::error!("an error occurred on output stream: {}", err),
        None,
    )?;
    Ok((stream, sample_rate, producer))
}
