//
// CPAL-based microphone recorder writing straight to a temp WAV file.
//
// The CPAL stream is not Send, so a dedicated worker thread owns it for the
// whole recording. The audio callback appends samples to the WAV writer and
// publishes amplitude telemetry; the worker loop publishes duration ticks
// and services stop/cancel commands.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat};
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};

use murmur_core::CaptureError;
use murmur_engine::traits::{AudioCapture, TelemetrySink};

use crate::levels::{normalize_amplitude, rms_amplitude};

// Duration ticks ~10/s; amplitude samples capped at ~30/s.
const DURATION_TICK: Duration = Duration::from_millis(100);
const AMPLITUDE_INTERVAL: Duration = Duration::from_millis(33);

const STARTUP_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const CANCEL_TIMEOUT: Duration = Duration::from_secs(2);

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

enum Cmd {
    Stop(mpsc::Sender<Option<PathBuf>>),
    Cancel(mpsc::Sender<()>),
}

enum WorkerMsg {
    Ready,
    Error(String),
}

struct ActiveRecording {
    cmd_tx: mpsc::Sender<Cmd>,
    _worker: std::thread::JoinHandle<()>,
}

/// Records the default input device to a fresh temp file per session.
///
/// The temp file belongs to the caller once `stop` yields it; `cancel`
/// deletes it without handing it over.
pub struct CpalRecorder {
    active: Mutex<Option<ActiveRecording>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    fn temp_wav_path() -> PathBuf {
        std::env::temp_dir().join(format!("murmur-{}.wav", uuid::Uuid::new_v4()))
    }
}

impl Default for CpalRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioCapture for CpalRecorder {
    async fn start(&self, sink: TelemetrySink) -> Result<(), CaptureError> {
        let mut active = lock_or_recover(&self.active);
        if active.is_some() {
            return Err(CaptureError::RecordingFailed("capture already active".into()));
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::MicrophoneNotAvailable)?;
        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::EngineStartFailed(e.to_string()))?;

        let path = Self::temp_wav_path();
        let spec = WavSpec {
            channels: 1,
            sample_rate: supported.sample_rate().0,
            bits_per_sample: 32,
            sample_format: WavSampleFormat::Float,
        };
        let writer: SharedWriter = Arc::new(Mutex::new(Some(
            WavWriter::create(&path, spec)
                .map_err(|e| CaptureError::EngineStartFailed(e.to_string()))?,
        )));

        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = {
            let writer = writer.clone();
            let path = path.clone();
            let sink = sink.clone();
            std::thread::spawn(move || {
                run_worker(device, supported, writer, path, sink, cmd_rx, ready_tx)
            })
        };

        match ready_rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(WorkerMsg::Ready) => {}
            Ok(WorkerMsg::Error(e)) => {
                return Err(CaptureError::EngineStartFailed(e));
            }
            Err(_) => {
                return Err(CaptureError::EngineStartFailed(
                    "audio worker startup timed out".into(),
                ));
            }
        }

        log::info!("recording to {}", path.display());
        *active = Some(ActiveRecording {
            cmd_tx,
            _worker: worker,
        });
        Ok(())
    }

    async fn stop(&self) -> Result<Option<PathBuf>, CaptureError> {
        let recording = lock_or_recover(&self.active).take();
        let Some(recording) = recording else {
            return Err(CaptureError::NotStarted);
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        recording
            .cmd_tx
            .send(Cmd::Stop(reply_tx))
            .map_err(|_| CaptureError::RecordingFailed("audio worker is gone".into()))?;

        // The worker answers within a tick once the stream is torn down.
        reply_rx
            .recv_timeout(STOP_TIMEOUT)
            .map_err(|_| CaptureError::StopTimeout)
    }

    async fn cancel(&self) {
        let recording = lock_or_recover(&self.active).take();
        let Some(recording) = recording else {
            return;
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        if recording.cmd_tx.send(Cmd::Cancel(reply_tx)).is_err() {
            return;
        }
        if reply_rx.recv_timeout(CANCEL_TIMEOUT).is_err() {
            log::warn!("audio worker did not confirm cancel in time");
        }
    }
}

fn run_worker(
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    writer: SharedWriter,
    path: PathBuf,
    sink: TelemetrySink,
    cmd_rx: mpsc::Receiver<Cmd>,
    ready_tx: mpsc::Sender<WorkerMsg>,
) {
    let channels = supported.channels() as usize;
    let config = supported.config();

    let stream = match build_stream(
        &device,
        supported.sample_format(),
        &config,
        channels,
        writer.clone(),
        sink.clone(),
    ) {
        Ok(stream) => stream,
        Err(e) => {
            discard_recording(&writer, &path);
            let _ = ready_tx.send(WorkerMsg::Error(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        discard_recording(&writer, &path);
        let _ = ready_tx.send(WorkerMsg::Error(e.to_string()));
        return;
    }

    let _ = ready_tx.send(WorkerMsg::Ready);
    let started = Instant::now();

    let cmd = loop {
        match cmd_rx.recv_timeout(DURATION_TICK) {
            Ok(cmd) => break Some(cmd),
            Err(RecvTimeoutError::Timeout) => sink.elapsed(started.elapsed()),
            Err(RecvTimeoutError::Disconnected) => break None,
        }
    };

    // Tear the tap down before touching the file so no late callback writes.
    drop(stream);

    match cmd {
        Some(Cmd::Stop(reply)) => {
            let result = finalize_recording(&writer, &path);
            let _ = reply.send(result);
        }
        Some(Cmd::Cancel(reply)) => {
            discard_recording(&writer, &path);
            let _ = reply.send(());
        }
        None => {
            // Recorder handle dropped mid-recording; treat as cancel.
            discard_recording(&writer, &path);
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    format: SampleFormat,
    config: &cpal::StreamConfig,
    channels: usize,
    writer: SharedWriter,
    sink: TelemetrySink,
) -> Result<cpal::Stream, String> {
    match format {
        SampleFormat::F32 => build_stream_for::<f32>(device, config, channels, writer, sink),
        SampleFormat::I16 => build_stream_for::<i16>(device, config, channels, writer, sink),
        SampleFormat::U16 => build_stream_for::<u16>(device, config, channels, writer, sink),
        other => Err(format!("unsupported sample format: {other:?}")),
    }
}

fn build_stream_for<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    writer: SharedWriter,
    sink: TelemetrySink,
) -> Result<cpal::Stream, String>
where
    T: cpal::SizedSample,
    f32: FromSample<T>,
{
    let last_emit = Arc::new(Mutex::new(Instant::now() - AMPLITUDE_INTERVAL));

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                // First channel only; dictation has no use for stereo.
                let mono: Vec<f32> = data
                    .chunks(channels)
                    .filter_map(|frame| frame.first())
                    .map(|s| f32::from_sample(*s))
                    .collect();

                {
                    let mut guard = lock_or_recover(&writer);
                    if let Some(w) = guard.as_mut() {
                        for &s in &mono {
                            if let Err(e) = w.write_sample(s) {
                                log::error!("wav write failed: {e}");
                                break;
                            }
                        }
                    }
                }

                let now = Instant::now();
                let mut last = lock_or_recover(&last_emit);
                if now.duration_since(*last) >= AMPLITUDE_INTERVAL {
                    *last = now;
                    drop(last);
                    sink.amplitude(normalize_amplitude(rms_amplitude(&mono)));
                }
            },
            |e| log::error!("audio input stream error: {e}"),
            None,
        )
        .map_err(|e| e.to_string())
}

fn finalize_recording(writer: &SharedWriter, path: &Path) -> Option<PathBuf> {
    let taken = lock_or_recover(writer).take();
    match taken {
        Some(w) => match w.finalize() {
            Ok(()) => Some(path.to_path_buf()),
            Err(e) => {
                log::error!("failed to finalize wav: {e}");
                let _ = std::fs::remove_file(path);
                None
            }
        },
        None => None,
    }
}

fn discard_recording(writer: &SharedWriter, path: &Path) {
    drop(lock_or_recover(writer).take());
    if let Err(e) = std::fs::remove_file(path) {
        if path.exists() {
            log::warn!("failed to remove partial recording {}: {e}", path.display());
        }
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
