//! Native audio output for tracks with a direct stream URL: progressive HTTP
//! download, symphonia decoding and a cpal output stream.

mod decoder;
mod stream_source;

use crate::audio::adapter::{BackendFactory, MediaBackend, TelemetrySink};
use crate::error::{AppError, AppResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use decoder::AudioDecoder;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use stream_source::HttpStreamSource;

/// Interleaved samples buffered ahead of the output callback.
const MAX_RING_SAMPLES: usize = 176_400;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);
const NO_SEEK: u64 = u64::MAX;

/// State shared between the backend handle, the decode thread and the cpal callback.
struct Control {
    ring: Mutex<VecDeque<f32>>,
    space: Condvar,
    playing: AtomicBool,
    stop: AtomicBool,
    failed: AtomicBool,
    volume_bits: AtomicU32,
    samples_played: AtomicU64,
    seek_target_ms: AtomicU64,
    sample_rate: AtomicU32,
    channels: AtomicU32,
}

impl Control {
    fn new(volume: f32) -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(MAX_RING_SAMPLES)),
            space: Condvar::new(),
            playing: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            volume_bits: AtomicU32::new(volume.to_bits()),
            samples_played: AtomicU64::new(0),
            seek_target_ms: AtomicU64::new(NO_SEEK),
            sample_rate: AtomicU32::new(44_100),
            channels: AtomicU32::new(2),
        }
    }

    fn ring(&self) -> MutexGuard<'_, VecDeque<f32>> {
        self.ring.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    fn samples_per_second(&self) -> f64 {
        self.sample_rate.load(Ordering::Relaxed) as f64 * self.channels.load(Ordering::Relaxed) as f64
    }

    fn position_seconds(&self) -> f64 {
        let per_second = self.samples_per_second();
        if per_second > 0.0 {
            self.samples_played.load(Ordering::Relaxed) as f64 / per_second
        } else {
            0.0
        }
    }
}

/// Mounts [`NativeAudioBackend`]s for direct stream URLs.
pub struct NativeAudioFactory {
    http: reqwest::Client,
    runtime: tokio::runtime::Handle,
}

impl NativeAudioFactory {
    pub fn new(http: reqwest::Client, runtime: tokio::runtime::Handle) -> Self {
        Self { http, runtime }
    }
}

impl BackendFactory for NativeAudioFactory {
    fn mount(&mut self, url: &str, telemetry: TelemetrySink) -> AppResult<Box<dyn MediaBackend>> {
        let (source, writer) = HttpStreamSource::new();
        self.runtime.spawn(stream_source::download(
            self.http.clone(),
            url.to_string(),
            writer,
        ));

        let control = Arc::new(Control::new(1.0));
        let extension = decoder::extension_hint(url);
        let thread_control = Arc::clone(&control);
        let thread = std::thread::Builder::new()
            .name("native-audio".into())
            .spawn(move || run_output(thread_control, source, extension, telemetry))
            .map_err(AppError::Io)?;

        Ok(Box::new(NativeAudioBackend {
            control,
            thread: Some(thread),
        }))
    }
}

pub struct NativeAudioBackend {
    control: Arc<Control>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl MediaBackend for NativeAudioBackend {
    fn set_playing(&mut self, playing: bool) -> AppResult<()> {
        if playing && self.control.failed.load(Ordering::SeqCst) {
            return Err(AppError::Audio("output is not available".into()));
        }
        self.control.playing.store(playing, Ordering::SeqCst);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.control
            .volume_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    fn seek(&mut self, position: f64) {
        let ms = (position.max(0.0) * 1000.0) as u64;
        self.control.seek_target_ms.store(ms, Ordering::SeqCst);
        let samples = (position.max(0.0) * self.control.samples_per_second()) as u64;
        self.control.samples_played.store(samples, Ordering::SeqCst);
        self.control.space.notify_all();
    }

    fn unmount(&mut self) {
        self.control.stop.store(true, Ordering::SeqCst);
        self.control.playing.store(false, Ordering::SeqCst);
        self.control.space.notify_all();
        // The decode thread may still be probing a slow download; let it exit on its own.
        self.thread.take();
    }
}

impl Drop for NativeAudioBackend {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn build_stream(control: &Arc<Control>, sample_rate: u32, channels: usize) -> AppResult<cpal::Stream> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AppError::Audio("no output device available".into()))?;
    let config = cpal::StreamConfig {
        channels: channels as u16,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let callback_control = Arc::clone(control);
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let control = &callback_control;
                if !control.playing.load(Ordering::Relaxed) {
                    data.fill(0.0);
                    return;
                }
                let volume = control.volume();
                let mut ring = control.ring();
                let available = ring.len().min(data.len());
                for (i, sample) in data.iter_mut().enumerate() {
                    *sample = if i < available {
                        ring.pop_front().unwrap_or(0.0) * volume
                    } else {
                        0.0
                    };
                }
                control
                    .samples_played
                    .fetch_add(available as u64, Ordering::Relaxed);
                control.space.notify_all();
            },
            |err| log::warn!("[native-audio] output error: {}", err),
            None,
        )
        .map_err(|e| AppError::Audio(format!("failed to build output stream: {}", e)))?;
    stream
        .play()
        .map_err(|e| AppError::Audio(format!("failed to start output: {}", e)))?;
    Ok(stream)
}

/// Decode thread body. Owns the cpal stream, which must stay on one thread.
fn run_output(
    control: Arc<Control>,
    source: HttpStreamSource,
    extension: Option<&'static str>,
    telemetry: TelemetrySink,
) {
    let mut decoder = match AudioDecoder::open(source, extension) {
        Ok(decoder) => decoder,
        Err(e) => {
            log::warn!("[native-audio] {}", e);
            control.failed.store(true, Ordering::SeqCst);
            return;
        }
    };
    control
        .sample_rate
        .store(decoder.sample_rate(), Ordering::Relaxed);
    control
        .channels
        .store(decoder.channels() as u32, Ordering::Relaxed);
    telemetry.duration(decoder.duration().unwrap_or(0.0));

    let _stream = match build_stream(&control, decoder.sample_rate(), decoder.channels()) {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("[native-audio] {}", e);
            control.failed.store(true, Ordering::SeqCst);
            return;
        }
    };

    let mut decoded_all = false;
    let mut last_report = Instant::now();
    while !control.stop.load(Ordering::Relaxed) {
        let pending_seek = control.seek_target_ms.swap(NO_SEEK, Ordering::SeqCst);
        if pending_seek != NO_SEEK {
            control.ring().clear();
            if let Err(e) = decoder.seek(pending_seek as f64 / 1000.0) {
                log::warn!("[native-audio] {}", e);
            }
            decoded_all = false;
            continue;
        }

        if last_report.elapsed() >= PROGRESS_INTERVAL {
            telemetry.progress(control.position_seconds());
            last_report = Instant::now();
        }

        {
            let ring = control.ring();
            if decoded_all || ring.len() >= MAX_RING_SAMPLES {
                if decoded_all && ring.is_empty() {
                    drop(ring);
                    telemetry.progress(control.position_seconds());
                    telemetry.ended();
                    break;
                }
                let _ = control.space.wait_timeout(ring, PROGRESS_INTERVAL / 2);
                continue;
            }
        }

        match decoder.decode_next() {
            Ok(Some(samples)) => control.ring().extend(samples),
            Ok(None) => decoded_all = true,
            Err(e) => {
                log::warn!("[native-audio] {}", e);
                decoded_all = true;
            }
        }
    }
    log::debug!("[native-audio] output thread finished");
}
