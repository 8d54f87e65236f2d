use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use crossbeam_channel::{bounded, Sender};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use sonocap_foundation::{CaptureConfig, CaptureError, DeviceError, SampleFormat};

use crate::source::StreamChunkSource;
use crate::stats::CaptureStats;

/// Callback buffers the transport channel can hold before the callback
/// starts dropping.
const CHANNEL_CAPACITY: usize = 64;

/// How long a chunk read may starve before the session is considered dead.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the live cpal stream for one session. `cpal::Stream` is not `Send`,
/// so the handle stays with the controller; dropping it closes the stream
/// and ends the paired `StreamChunkSource`.
pub struct InputStreamHandle {
    _stream: Stream,
}

/// Open the requested input device and start a stream that feeds raw
/// little-endian sample bytes into the returned chunk source.
pub fn open_input(
    config: &CaptureConfig,
    device_name: Option<&str>,
    stats: Arc<CaptureStats>,
) -> Result<(InputStreamHandle, StreamChunkSource), CaptureError> {
    let host = cpal::default_host();

    let device = match device_name {
        Some(name) => host
            .input_devices()
            .map_err(DeviceError::from)?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(DeviceError::NotFound {
                name: Some(name.to_string()),
            })?,
        None => host
            .default_input_device()
            .ok_or(DeviceError::NotFound { name: None })?,
    };

    if let Ok(name) = device.name() {
        tracing::info!(
            device = %name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            format = ?config.sample_format,
            "opening input device"
        );
    }

    let stream_config = StreamConfig {
        channels: config.channels,
        sample_rate: config.sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let (tx, rx) = bounded::<Vec<u8>>(CHANNEL_CAPACITY);
    let stream = build_stream(&device, &stream_config, config.sample_format, tx, stats)?;
    stream.play().map_err(DeviceError::from)?;

    let source = StreamChunkSource::new(rx, config.frame_bytes(), READ_TIMEOUT);
    Ok((InputStreamHandle { _stream: stream }, source))
}

fn build_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    format: SampleFormat,
    tx: Sender<Vec<u8>>,
    stats: Arc<CaptureStats>,
) -> Result<Stream, DeviceError> {
    let err_fn = |err: cpal::StreamError| {
        tracing::error!("audio stream error: {}", err);
    };

    // Forward raw bytes in the session's sample encoding; try_send keeps the
    // audio callback non-blocking and counts drops instead of stalling.
    let forward = move |bytes: Vec<u8>| {
        if tx.try_send(bytes).is_ok() {
            stats.chunks_captured.fetch_add(1, Ordering::Relaxed);
        } else {
            stats.callback_drops.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("transport channel full; dropping callback buffer");
        }
    };

    let stream = match format {
        SampleFormat::I8 => device.build_input_stream(
            config,
            move |data: &[i8], _: &cpal::InputCallbackInfo| {
                forward(data.iter().map(|&s| s as u8).collect());
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                forward(data.iter().flat_map(|s| s.to_le_bytes()).collect());
            },
            err_fn,
            None,
        )?,
        SampleFormat::I32 => device.build_input_stream(
            config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                forward(data.iter().flat_map(|s| s.to_le_bytes()).collect());
            },
            err_fn,
            None,
        )?,
        SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                forward(data.iter().flat_map(|s| s.to_le_bytes()).collect());
            },
            err_fn,
            None,
        )?,
    };

    Ok(stream)
}
