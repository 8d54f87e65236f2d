//! Raw byte buffer to normalized signal conversion.

use sonocap_foundation::{FormatError, SampleFormat};

use crate::signal::Signal;

/// Decode one raw interleaved chunk into a normalized signal.
///
/// Integer encodings are divided by the encoding's maximum magnitude
/// (128, 32768, 2^31); f32 passes through already normalized. Little-endian
/// byte order, channel-major interleaving.
pub fn decode(raw: &[u8], format: SampleFormat, channels: u16) -> Result<Signal, FormatError> {
    let frame_bytes = channels as usize * format.bytes_per_sample();
    if frame_bytes == 0 || raw.len() % frame_bytes != 0 {
        return Err(FormatError::Misaligned {
            len: raw.len(),
            frame_bytes,
        });
    }

    let samples: Vec<f32> = match format {
        SampleFormat::I8 => raw.iter().map(|&b| b as i8 as f32 / 128.0).collect(),
        SampleFormat::I16 => raw
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect(),
        SampleFormat::I32 => raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f32 / 2_147_483_648.0)
            .collect(),
        SampleFormat::F32 => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    };

    Ok(Signal::from_interleaved(samples, channels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i16_max_magnitude_roundtrip() {
        let raw = i16::MIN.to_le_bytes();
        let sig = decode(&raw, SampleFormat::I16, 1).unwrap();
        assert!((sig.samples()[0] + 1.0).abs() < 1e-4);

        let raw = i16::MAX.to_le_bytes();
        let sig = decode(&raw, SampleFormat::I16, 1).unwrap();
        assert!((sig.samples()[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn i8_and_i32_normalization() {
        let sig = decode(&[0x80], SampleFormat::I8, 1).unwrap();
        assert!((sig.samples()[0] + 1.0).abs() < 1e-4);

        let raw = i32::MAX.to_le_bytes();
        let sig = decode(&raw, SampleFormat::I32, 1).unwrap();
        assert!((sig.samples()[0] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn f32_passes_through() {
        let mut raw = Vec::new();
        for v in [-0.5f32, 0.25] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let sig = decode(&raw, SampleFormat::F32, 1).unwrap();
        assert_eq!(sig.samples(), &[-0.5, 0.25]);
    }

    #[test]
    fn stereo_reshape() {
        let mut raw = Vec::new();
        for v in [1000i16, -1000, 2000, -2000] {
            raw.extend_from_slice(&v.to_le_bytes());
        }
        let sig = decode(&raw, SampleFormat::I16, 2).unwrap();
        assert_eq!(sig.frames(), 2);
        let right: Vec<f32> = sig.channel(1).collect();
        assert!(right.iter().all(|&s| s < 0.0));
    }

    #[test]
    fn misaligned_buffer_rejected() {
        let err = decode(&[0u8; 3], SampleFormat::I16, 2).unwrap_err();
        assert!(matches!(
            err,
            FormatError::Misaligned {
                len: 3,
                frame_bytes: 4,
            }
        ));
    }
}
