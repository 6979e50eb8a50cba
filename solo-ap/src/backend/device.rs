//! Audio device backend using cpal
//!
//! Each handle gets a playback worker thread that owns the decoder, the
//! converter and a cpal output stream. Decoded samples travel to the audio
//! callback through a lock-free ring buffer; the callback emits silence on
//! underrun.

use super::decode::TrackDecoder;
use super::resample::SampleConverter;
use super::{Control, EndedSignal, Library, MediaBackend, MediaHandle, WorkerHandle};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use solo_common::TrackId;
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Ring buffer length in seconds of device audio
const RING_SECONDS: f32 = 0.5;

/// Sleep between fill attempts while the ring is full or draining
const FILL_INTERVAL: Duration = Duration::from_millis(10);

/// Backend playing local files through an audio output device
pub struct DeviceBackend {
    library: Library,
    device_name: Option<String>,
}

impl DeviceBackend {
    pub fn new(library: Library, device_name: Option<String>) -> Self {
        Self {
            library,
            device_name,
        }
    }
}

impl MediaBackend for DeviceBackend {
    fn start(&mut self, track: &TrackId, on_ended: EndedSignal) -> Result<Box<dyn MediaHandle>> {
        let path = self.library.resolve(track)?;
        // Open on the caller's thread so unplayable files fail the start call
        let decoder = TrackDecoder::open(&path)?;

        let (ctl_tx, ctl_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let device_name = self.device_name.clone();
        let label = track.to_string();

        let worker = thread::Builder::new()
            .name(format!("solo-play-{}", on_ended.handle_id()))
            .spawn(move || {
                let output = match OutputStream::open(device_name.as_deref()) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let converter = match SampleConverter::new(
                    decoder.sample_rate(),
                    decoder.channels(),
                    output.sample_rate,
                    output.channels,
                ) {
                    Ok(converter) => converter,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = output.play() {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                PlaybackWorker {
                    decoder,
                    converter,
                    output,
                    ctl_rx,
                    on_ended: Some(on_ended),
                }
                .run();
            })?;

        ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Playback worker exited during startup".to_string()))??;

        info!("Started {} on audio device", label);
        Ok(Box::new(WorkerHandle::new(label, ctl_tx, worker)))
    }

    fn name(&self) -> &'static str {
        "device"
    }
}

/// Output stream plus the producing end of its ring buffer
struct OutputStream {
    stream: Stream,
    producer: HeapProd<f32>,
    sample_rate: u32,
    channels: usize,
}

impl OutputStream {
    /// Open the named device, falling back to the default device
    fn open(device_name: Option<&str>) -> Result<Self> {
        let device = select_device(device_name)?;
        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}",
            sample_rate, channels, sample_format
        );

        let capacity = ((sample_rate as f32 * RING_SECONDS) as usize * channels).max(channels);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let stream = build_stream(&device, &config, sample_format, consumer)?;

        Ok(Self {
            stream,
            producer,
            sample_rate,
            channels,
        })
    }

    fn play(&self) -> Result<()> {
        self.stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))
    }

    fn pause(&self) {
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause stream: {}", e);
        }
    }
}

fn select_device(device_name: Option<&str>) -> Result<Device> {
    let host = cpal::default_host();

    if let Some(name) = device_name {
        let devices = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

        let mut available = Vec::new();
        for device in devices {
            match device.name() {
                Ok(found) if found == name => {
                    debug!("Using requested audio device: {}", name);
                    return Ok(device);
                }
                Ok(found) => available.push(found),
                Err(_) => {}
            }
        }
        warn!(
            "Requested device '{}' not found (available: {}), falling back to default device",
            name,
            available.join(", ")
        );
    }

    host.default_output_device()
        .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
}

fn stream_error(err: cpal::StreamError) {
    error!("Audio stream error: {}", err);
}

/// Build an output stream draining `consumer`, converting to the device format
fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    mut consumer: HeapCons<f32>,
) -> Result<Stream> {
    let stream = match sample_format {
        SampleFormat::F32 => device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let filled = consumer.pop_slice(data);
                data[filled..].fill(0.0);
            },
            stream_error,
            None,
        ),
        SampleFormat::I16 => device.build_output_stream(
            config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    *sample = consumer
                        .try_pop()
                        .map_or(0, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16);
                }
            },
            stream_error,
            None,
        ),
        SampleFormat::U16 => device.build_output_stream(
            config,
            move |data: &mut [u16], _: &cpal::OutputCallbackInfo| {
                for sample in data.iter_mut() {
                    // [-1.0, 1.0] → [0, 65535], silence at midpoint
                    *sample = consumer
                        .try_pop()
                        .map_or(32768, |s| ((s.clamp(-1.0, 1.0) + 1.0) * 32767.5) as u16);
                }
            },
            stream_error,
            None,
        ),
        other => {
            return Err(Error::AudioOutput(format!(
                "Unsupported sample format: {:?}",
                other
            )));
        }
    };

    stream.map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
}

/// Decode → convert → ring loop for one handle
struct PlaybackWorker {
    decoder: TrackDecoder,
    converter: SampleConverter,
    output: OutputStream,
    ctl_rx: mpsc::Receiver<Control>,
    on_ended: Option<EndedSignal>,
}

impl PlaybackWorker {
    fn run(mut self) {
        let mut pending: Vec<f32> = Vec::new();
        let mut offset = 0;
        let mut decoding = true;
        let mut playing = true;

        loop {
            // Paused workers block until told otherwise
            let message = if playing {
                match self.ctl_rx.try_recv() {
                    Ok(message) => Some(message),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => Some(Control::Release),
                }
            } else {
                Some(self.ctl_rx.recv().unwrap_or(Control::Release))
            };

            match message {
                Some(Control::Resume) => {
                    if !playing {
                        if let Err(e) = self.output.play() {
                            error!("{}", e);
                        }
                        playing = true;
                    }
                    continue;
                }
                Some(Control::Stop(ack)) => {
                    self.output.pause();
                    playing = false;
                    let _ = ack.send(());
                    continue;
                }
                Some(Control::Release) => {
                    self.output.pause();
                    return;
                }
                None => {}
            }

            if offset < pending.len() {
                offset += self.output.producer.push_slice(&pending[offset..]);
                if offset < pending.len() {
                    thread::sleep(FILL_INTERVAL);
                }
                continue;
            }

            pending.clear();
            offset = 0;

            if decoding {
                let result = match self.decoder.next_samples() {
                    Ok(Some(samples)) => self.converter.convert(samples, &mut pending),
                    Ok(None) => {
                        decoding = false;
                        self.converter.finish(&mut pending)
                    }
                    Err(e) => {
                        // Play what is buffered, then end as if the stream finished
                        warn!("Stopping decode early: {}", e);
                        decoding = false;
                        Ok(())
                    }
                };
                if let Err(e) = result {
                    warn!("Sample conversion failed: {}", e);
                    decoding = false;
                }
                continue;
            }

            // Everything decoded and queued; wait for the device to drain the ring
            if self.output.producer.occupied_len() > 0 {
                thread::sleep(FILL_INTERVAL);
                continue;
            }

            self.output.pause();
            if let Some(signal) = self.on_ended.take() {
                signal.fire();
            }
            return;
        }
    }
}
