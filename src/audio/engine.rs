// Audio output - CPAL stream rendering scheduled clicks
//
// # Timing
//
// Every callback maps its first output frame onto the host clock:
// `now + (playback instant - callback instant)`. Clicks carry their own host
// timestamp, so the mixer places each one on the exact frame regardless of
// when the scheduler tick that produced it ran.
//
// # Format Support
//
// F32, I16 and U16 devices are supported; mixing is done in f32 and converted
// per frame with CPAL's `FromSample`.
//
// # Threading
//
// The CPAL `Stream` is not `Send` on every platform (CoreAudio), so opening
// the output yields two halves: `AudioOutput` owns the stream and stays on the
// thread that opened it, `CpalClickSink` is the `Send` scheduling end handed
// to the metronome.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info, warn};
use ringbuf::traits::{Consumer, Producer};
use std::sync::{Arc, Mutex};

use crate::audio::AudioError;
use crate::audio::click::ClickBuffer;
use crate::audio::clock::{HostClock, HostTime};
use crate::audio::mixer::{ClickMixer, ScheduledClick};
use crate::audio::sink::AudioSink;
use crate::audio::status::{AtomicSinkStatus, SinkStatus};
use crate::messaging::channels::{
    ClickConsumer, ClickProducer, NotificationProducer, create_click_channel,
};
use crate::messaging::notification::{Notification, NotificationCategory, try_notify};

/// Clicks in flight between the scheduler and the callback
const CLICK_CHANNEL_CAPACITY: usize = 64;

/// Frames rendered per mixer pass; larger device buffers are split
const SCRATCH_FRAMES: usize = 4096;

/// Owns the running CPAL stream; dropping it silences the metronome
pub struct AudioOutput {
    _device: Device,
    _stream: Stream,
    sample_rate: f32,
    channels: usize,
    status: AtomicSinkStatus,
}

impl AudioOutput {
    /// Open the default output device and start rendering
    pub fn open(
        clock: Arc<dyn HostClock>,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<(Self, CpalClickSink), AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;

        info!(
            "Audio device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        info!("Audio config: {:?}", supported_config);

        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let status = AtomicSinkStatus::new(SinkStatus::Starting);
        let (click_tx, click_rx) = create_click_channel(CLICK_CHANNEL_CAPACITY);
        let mixer = ClickMixer::new(sample_rate, clock.timebase());

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream::<f32>(
                &device,
                &config,
                channels,
                clock,
                click_rx,
                mixer,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::I16 => Self::build_stream::<i16>(
                &device,
                &config,
                channels,
                clock,
                click_rx,
                mixer,
                status.clone(),
                notification_tx.clone(),
            ),
            SampleFormat::U16 => Self::build_stream::<u16>(
                &device,
                &config,
                channels,
                clock,
                click_rx,
                mixer,
                status.clone(),
                notification_tx.clone(),
            ),
            other => return Err(AudioError::UnsupportedFormat(format!("{:?}", other))),
        }?;

        stream.play()?;
        status.set(SinkStatus::Ready);

        info!("Audio output started: {} Hz, {} channels", sample_rate, channels);
        try_notify(
            &notification_tx,
            Notification::info(
                NotificationCategory::Audio,
                format!("Audio connected: {} Hz", sample_rate),
            ),
        );

        let sink = CpalClickSink {
            click_tx,
            sample_rate,
            status: status.clone(),
            dropped: 0,
        };

        Ok((
            Self {
                _device: device,
                _stream: stream,
                sample_rate,
                channels,
                status,
            },
            sink,
        ))
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn status(&self) -> SinkStatus {
        self.status.get()
    }

    #[allow(clippy::too_many_arguments)]
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        clock: Arc<dyn HostClock>,
        mut click_rx: ClickConsumer,
        mut mixer: ClickMixer,
        status: AtomicSinkStatus,
        notification_tx: Arc<Mutex<NotificationProducer>>,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        let channels = channels.max(1);
        let timebase = clock.timebase();
        let sample_rate = mixer.sample_rate() as f64;
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                // ========== REAL-TIME ZONE ==========
                // No allocations, no I/O, no blocking locks
                while let Some(click) = click_rx.try_pop() {
                    mixer.enqueue(click);
                }

                let timestamp = info.timestamp();
                let output_latency = timestamp
                    .playback
                    .duration_since(&timestamp.callback)
                    .unwrap_or_default();
                let mut first_frame = timebase.add_seconds(clock.now(), output_latency.as_secs_f64());

                for chunk in data.chunks_mut(SCRATCH_FRAMES * channels) {
                    let frames = chunk.len() / channels;
                    let block = &mut scratch[..frames];
                    mixer.render(first_frame, block);

                    for (frame, &sample) in chunk.chunks_mut(channels).zip(block.iter()) {
                        for channel_sample in frame.iter_mut() {
                            *channel_sample = Sample::from_sample::<f32>(sample);
                        }
                    }

                    first_frame = timebase.add_seconds(first_frame, frames as f64 / sample_rate);
                }
                // ========== REAL-TIME ZONE END ==========
            },
            move |err| {
                // Runs outside the audio callback, I/O is fine here
                error!("Audio stream error: {}", err);
                status.set(SinkStatus::Faulted);
                try_notify(
                    &notification_tx,
                    Notification::error(
                        NotificationCategory::Audio,
                        format!("Audio stream error: {}", err),
                    ),
                );
            },
            None,
        )?;

        Ok(stream)
    }
}

/// Scheduling end of an [`AudioOutput`]
pub struct CpalClickSink {
    click_tx: ClickProducer,
    sample_rate: f32,
    status: AtomicSinkStatus,
    dropped: u64,
}

impl CpalClickSink {
    /// Clicks rejected because the callback fell behind
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn status(&self) -> SinkStatus {
        self.status.get()
    }
}

impl AudioSink for CpalClickSink {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn schedule_click(&mut self, buffer: ClickBuffer, at: HostTime) {
        if self.click_tx.try_push(ScheduledClick { buffer, at }).is_err() {
            self.dropped += 1;
            warn!("Click channel full, dropped click ({} total)", self.dropped);
        }
    }
}
