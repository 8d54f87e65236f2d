//! WAV persistence for captured segments.

use std::fs;
use std::path::{Path, PathBuf};

use sonocap_dsp::Signal;
use sonocap_foundation::{CaptureError, SampleFormat};

/// Timestamped filename under `temp/`: `<day_H-M-S>_ch<channels>_id<n>.wav`.
pub fn default_file_name(channels: u16, cycle_id: u64) -> PathBuf {
    let stamp = chrono::Local::now().format("%d_%H-%M-%S");
    PathBuf::from("temp").join(format!("{stamp}_ch{channels}_id{cycle_id}.wav"))
}

/// Write a normalized signal back out in the session's sample encoding.
pub fn write_signal(
    path: &Path,
    signal: &Signal,
    sample_rate: u32,
    format: SampleFormat,
) -> Result<(), CaptureError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(persist)?;
        }
    }

    let spec = hound::WavSpec {
        channels: signal.channels(),
        sample_rate,
        bits_per_sample: (format.bytes_per_sample() * 8) as u16,
        sample_format: match format {
            SampleFormat::F32 => hound::SampleFormat::Float,
            _ => hound::SampleFormat::Int,
        },
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(persist)?;
    match format {
        SampleFormat::I8 => {
            for &s in signal.samples() {
                writer
                    .write_sample((s * 128.0).clamp(-128.0, 127.0) as i8)
                    .map_err(persist)?;
            }
        }
        SampleFormat::I16 => {
            for &s in signal.samples() {
                writer
                    .write_sample((s * 32768.0).clamp(-32768.0, 32767.0) as i16)
                    .map_err(persist)?;
            }
        }
        SampleFormat::I32 => {
            for &s in signal.samples() {
                let scaled = (s as f64 * 2_147_483_648.0).clamp(i32::MIN as f64, i32::MAX as f64);
                writer.write_sample(scaled as i32).map_err(persist)?;
            }
        }
        SampleFormat::F32 => {
            for &s in signal.samples() {
                writer.write_sample(s).map_err(persist)?;
            }
        }
    }
    writer.finalize().map_err(persist)?;

    tracing::debug!(path = %path.display(), frames = signal.frames(), "segment saved");
    Ok(())
}

fn persist(err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Persist(err.to_string())
}
