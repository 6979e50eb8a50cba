//! Sample-rate and channel conversion using rubato
//!
//! Converts decoded audio to the output device's rate and channel count,
//! chunk by chunk as it streams.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

/// Input frames per resampler chunk
const CHUNK_FRAMES: usize = 1024;

/// Streaming converter from source format to device format
pub struct SampleConverter {
    in_channels: usize,
    out_channels: usize,
    resampler: Option<ChunkResampler>,
    remapped: Vec<f32>,
}

impl SampleConverter {
    pub fn new(in_rate: u32, in_channels: usize, out_rate: u32, out_channels: usize) -> Result<Self> {
        let resampler = if in_rate == out_rate {
            debug!("Sample rate already at {}Hz, skipping resample", out_rate);
            None
        } else {
            debug!(
                "Resampling from {}Hz to {}Hz ({} channels)",
                in_rate, out_rate, out_channels
            );
            Some(ChunkResampler::new(in_rate, out_rate, out_channels)?)
        };

        Ok(Self {
            in_channels: in_channels.max(1),
            out_channels: out_channels.max(1),
            resampler,
            remapped: Vec::new(),
        })
    }

    /// Convert interleaved source samples, appending device samples to `out`
    pub fn convert(&mut self, input: &[f32], out: &mut Vec<f32>) -> Result<()> {
        match self.resampler.as_mut() {
            None => {
                remap_channels(input, self.in_channels, self.out_channels, out);
                Ok(())
            }
            Some(resampler) => {
                self.remapped.clear();
                remap_channels(input, self.in_channels, self.out_channels, &mut self.remapped);
                resampler.push(&self.remapped, out)
            }
        }
    }

    /// Flush audio held back by the resampler at end of stream
    pub fn finish(&mut self, out: &mut Vec<f32>) -> Result<()> {
        match self.resampler.as_mut() {
            Some(resampler) => resampler.flush(out),
            None => Ok(()),
        }
    }
}

/// Map interleaved frames from `in_ch` channels to `out_ch` channels
///
/// Mono is duplicated to every output channel, a mono output averages all
/// inputs, and missing channels are silent.
pub fn remap_channels(input: &[f32], in_ch: usize, out_ch: usize, out: &mut Vec<f32>) {
    if in_ch == out_ch {
        out.extend_from_slice(input);
        return;
    }

    out.reserve(input.len() / in_ch * out_ch);
    for frame in input.chunks_exact(in_ch) {
        if out_ch == 1 {
            out.push(frame.iter().sum::<f32>() / in_ch as f32);
        } else if in_ch == 1 {
            out.extend(std::iter::repeat(frame[0]).take(out_ch));
        } else {
            out.extend((0..out_ch).map(|c| frame.get(c).copied().unwrap_or(0.0)));
        }
    }
}

/// Fixed-chunk rubato resampler fed with arbitrary-length input
struct ChunkResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    pending: Vec<Vec<f32>>,
}

impl ChunkResampler {
    fn new(in_rate: u32, out_rate: u32, channels: usize) -> Result<Self> {
        let inner = FastFixedIn::<f32>::new(
            out_rate as f64 / in_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            channels,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        Ok(Self {
            inner,
            channels,
            pending: vec![Vec::with_capacity(CHUNK_FRAMES * 2); channels],
        })
    }

    fn push(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                self.pending[ch].push(*sample);
            }
        }

        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                return Ok(());
            }
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..needed).collect())
                .collect();
            let planar = self
                .inner
                .process(&chunk, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            interleave(&planar, out);
        }
    }

    fn flush(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if !self.pending[0].is_empty() {
            let chunk: Vec<Vec<f32>> = self.pending.iter_mut().map(std::mem::take).collect();
            let planar = self
                .inner
                .process_partial(Some(chunk.as_slice()), None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            interleave(&planar, out);
        }

        // The last output_delay() frames are still inside the resampler
        let delay = self.inner.output_delay();
        let mut drained = 0;
        while drained < delay {
            let planar = self
                .inner
                .process_partial(None::<&[Vec<f32>]>, None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;
            let frames = planar.first().map_or(0, Vec::len);
            if frames == 0 {
                break;
            }
            drained += frames;
            interleave(&planar, out);
        }
        Ok(())
    }
}

fn interleave(planar: &[Vec<f32>], out: &mut Vec<f32>) {
    let frames = planar.first().map_or(0, |ch| ch.len());
    out.reserve(frames * planar.len());
    for i in 0..frames {
        for ch in planar {
            out.push(ch[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_mono_to_stereo() {
        let mut out = Vec::new();
        remap_channels(&[0.1, 0.2], 1, 2, &mut out);
        assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
    }

    #[test]
    fn test_remap_stereo_to_mono_averages() {
        let mut out = Vec::new();
        remap_channels(&[0.2, 0.4, -1.0, 1.0], 2, 1, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!(out[1].abs() < 1e-6);
    }

    #[test]
    fn test_remap_stereo_to_quad_pads_silence() {
        let mut out = Vec::new();
        remap_channels(&[0.5, -0.5], 2, 4, &mut out);
        assert_eq!(out, vec![0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_same_rate_passthrough() {
        let mut converter = SampleConverter::new(48000, 2, 48000, 2).unwrap();
        let input: Vec<f32> = (0..64).map(|i| i as f32 / 64.0).collect();
        let mut out = Vec::new();

        converter.convert(&input, &mut out).unwrap();
        converter.finish(&mut out).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_resample_changes_frame_count_by_ratio() {
        let mut converter = SampleConverter::new(22050, 1, 44100, 2).unwrap();
        let input = vec![0.0f32; 22050];
        let mut out = Vec::new();

        converter.convert(&input, &mut out).unwrap();
        converter.finish(&mut out).unwrap();

        let frames = out.len() / 2;
        // One second in, roughly one second out (resampler delay and chunk padding allowed)
        assert!(frames > 40000 && frames < 48000, "got {} frames", frames);
    }

    #[test]
    fn test_finish_drains_resampler_delay() {
        let mut converter = SampleConverter::new(44100, 1, 48000, 1).unwrap();
        // Exactly two chunks, so nothing is left pending before finish
        let input = vec![0.5f32; 2 * CHUNK_FRAMES];
        let mut out = Vec::new();

        converter.convert(&input, &mut out).unwrap();
        converter.finish(&mut out).unwrap();

        let expected = (input.len() as f64 * 48000.0 / 44100.0) as usize;
        assert!(out.len() > expected + 4, "got {} frames", out.len());
        // Played through to the silence after the last input sample
        let last = *out.last().unwrap();
        assert!(last.abs() < 1e-3, "tail ends at {}", last);
    }
}
