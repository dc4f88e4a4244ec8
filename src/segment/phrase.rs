//! Completed phrase audio buffers.

use std::io::Cursor;

/// A completed phrase: the retained frames concatenated into one PCM
/// buffer, tagged with the stream's sample rate and width so downstream
/// consumers can interpret it without the originating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseBuffer {
    /// Raw little-endian signed PCM, frames in arrival order.
    pub data: Vec<u8>,
    pub sample_rate: u32,
    pub sample_width: u16,
}

impl PhraseBuffer {
    pub(crate) fn from_frames<I>(frames: I, sample_rate: u32, sample_width: u16) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        let mut data = Vec::new();
        for frame in frames {
            data.extend_from_slice(&frame);
        }
        Self {
            data,
            sample_rate,
            sample_width,
        }
    }

    /// Audio seconds contained in this phrase.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.sample_width == 0 {
            return 0.0;
        }
        self.data.len() as f64 / (f64::from(self.sample_rate) * f64::from(self.sample_width))
    }

    /// Encode the phrase as a mono WAV container for handoff to
    /// transcription collaborators that expect a standard format.
    pub fn wav_bytes(&self) -> Result<Vec<u8>, hound::Error> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: self.sample_width * 8,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        match self.sample_width {
            1 => {
                for byte in &self.data {
                    writer.write_sample(*byte as i8)?;
                }
            }
            2 => {
                for sample in self.data.chunks_exact(2) {
                    writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
                }
            }
            3 => {
                for sample in self.data.chunks_exact(3) {
                    let value =
                        i32::from_le_bytes([0, sample[0], sample[1], sample[2]]) >> 8;
                    writer.write_sample(value)?;
                }
            }
            4 => {
                for sample in self.data.chunks_exact(4) {
                    writer.write_sample(i32::from_le_bytes([
                        sample[0], sample[1], sample[2], sample[3],
                    ]))?;
                }
            }
            _ => unreachable!("sample widths outside 1..=4 are rejected during validation"),
        }
        writer.finalize()?;
        Ok(cursor.into_inner())
    }
}
