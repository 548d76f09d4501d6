//! Sample buffers — noise tables, captured loops, and their playback.

use std::io::Cursor;
use std::sync::Arc;

use rand::Rng;

use crate::error::DecodeError;

/// An immutable block of mono audio shared between playback sources.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    data: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f32>, sample_rate: u32) -> Self {
        SampleBuffer {
            data: data.into(),
            sample_rate,
        }
    }

    /// White noise: independent uniform samples in `[-peak, peak]`.
    pub fn white_noise<R: Rng>(rng: &mut R, duration: f64, sample_rate: u32, peak: f32) -> Self {
        let len = (duration.max(0.0) * sample_rate as f64).round() as usize;
        let data: Vec<f32> = (0..len).map(|_| rng.gen_range(-1.0_f32..=1.0) * peak).collect();
        Self::new(data, sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length in seconds at the buffer's native rate.
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Read a sample with linear interpolation at a fractional position.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if self.data.is_empty() || position < 0.0 {
            return 0.0;
        }

        let idx = position as usize;
        if idx >= self.data.len() - 1 {
            return self.data.get(idx).copied().unwrap_or(0.0) as f64;
        }

        let frac = position - idx as f64;
        self.data[idx] as f64 * (1.0 - frac) + self.data[idx + 1] as f64 * frac
    }
}

/// Playback cursor over a [`SampleBuffer`], resampling to the graph rate.
#[derive(Debug, Clone)]
pub struct BufferPlayer {
    buffer: SampleBuffer,
    position: f64,
    rate: f64,
    looping: bool,
}

impl BufferPlayer {
    pub fn new(buffer: SampleBuffer, output_rate: f64, looping: bool) -> Self {
        let rate = buffer.sample_rate() as f64 / output_rate;
        BufferPlayer {
            buffer,
            position: 0.0,
            rate,
            looping,
        }
    }

    /// One-shot players are finished once the cursor passes the end.
    pub fn is_finished(&self) -> bool {
        !self.looping && self.position >= self.buffer.len() as f64
    }

    pub fn next_sample(&mut self) -> f64 {
        let len = self.buffer.len() as f64;
        if len == 0.0 || self.is_finished() {
            return 0.0;
        }
        let sample = self.buffer.read_interpolated(self.position);
        self.position += self.rate;
        if self.looping && self.position >= len {
            self.position %= len;
        }
        sample
    }
}

/// Encode mono samples as a 16-bit PCM WAV stream.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Decode a WAV stream into a mono buffer, averaging channels.
pub fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, DecodeError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    let mono: Vec<f32> = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    if mono.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(SampleBuffer::new(mono, spec.sample_rate))
}

/// Convert a float sample to 16-bit PCM.
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16
}
