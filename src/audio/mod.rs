//! WAV measurement and concatenation.
//!
//! Durations are always measured from frame counts — subtitle timing
//! downstream is only as correct as these measurements. Concatenation
//! writes requested pauses as zero-amplitude PCM frames at the track's
//! sample rate.

use crate::error::{Result, YomiageError};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Measured properties of a WAV payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WavInfo {
    pub duration_sec: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Measure duration and format of in-memory WAV data.
pub fn measure_wav_bytes(bytes: &[u8]) -> Result<WavInfo> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| YomiageError::AudioProcessing {
        message: format!("failed to parse WAV data: {}", e),
    })?;
    let spec = reader.spec();
    let frames = reader.duration();
    Ok(WavInfo {
        duration_sec: frames as f64 / spec.sample_rate as f64,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// One input to concatenation, with the pauses around it.
#[derive(Debug, Clone)]
pub struct ConcatPiece {
    pub wav_path: PathBuf,
    pub silence_before_sec: f64,
    pub silence_after_sec: f64,
}

/// Result of track concatenation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcatResult {
    /// Measured total track duration (frames written / sample rate).
    pub total_duration_sec: f64,
    pub sample_rate: u32,
}

/// Concatenate chunk WAVs into one track, inserting the requested silences.
///
/// All inputs must share one format (16-bit integer PCM at a single sample
/// rate and channel count); a mismatch is an error, not a resample.
pub fn concat_wavs(pieces: &[ConcatPiece], out_path: &Path) -> Result<ConcatResult> {
    if pieces.is_empty() {
        return Err(YomiageError::AudioProcessing {
            message: "nothing to concatenate".to_string(),
        });
    }

    let first_spec = read_spec(&pieces[0].wav_path)?;
    if first_spec.sample_format != SampleFormat::Int || first_spec.bits_per_sample != 16 {
        return Err(YomiageError::AudioFormatMismatch {
            expected: "16-bit integer PCM".to_string(),
            actual: format!(
                "{}-bit {:?}",
                first_spec.bits_per_sample, first_spec.sample_format
            ),
        });
    }

    let mut writer = WavWriter::create(out_path, first_spec).map_err(|e| {
        YomiageError::AudioProcessing {
            message: format!("failed to create {}: {}", out_path.display(), e),
        }
    })?;
    let mut frames_written: u64 = 0;

    for piece in pieces {
        let mut reader = open_reader(&piece.wav_path)?;
        let spec = reader.spec();
        if spec != first_spec {
            return Err(YomiageError::AudioFormatMismatch {
                expected: format!("{} Hz, {} ch", first_spec.sample_rate, first_spec.channels),
                actual: format!("{} Hz, {} ch", spec.sample_rate, spec.channels),
            });
        }

        frames_written += write_silence(&mut writer, piece.silence_before_sec, &first_spec)?;

        let mut piece_frames: u64 = 0;
        for sample in reader.samples::<i16>() {
            let sample = sample.map_err(|e| YomiageError::AudioProcessing {
                message: format!("failed to read {}: {}", piece.wav_path.display(), e),
            })?;
            writer
                .write_sample(sample)
                .map_err(|e| YomiageError::AudioProcessing {
                    message: format!("failed to write sample: {}", e),
                })?;
            piece_frames += 1;
        }
        frames_written += piece_frames / first_spec.channels as u64;

        frames_written += write_silence(&mut writer, piece.silence_after_sec, &first_spec)?;
    }

    writer
        .finalize()
        .map_err(|e| YomiageError::AudioProcessing {
            message: format!("failed to finalize {}: {}", out_path.display(), e),
        })?;

    Ok(ConcatResult {
        total_duration_sec: frames_written as f64 / first_spec.sample_rate as f64,
        sample_rate: first_spec.sample_rate,
    })
}

fn open_reader(path: &Path) -> Result<WavReader<std::io::BufReader<std::fs::File>>> {
    WavReader::open(path).map_err(|e| YomiageError::AudioProcessing {
        message: format!("failed to open {}: {}", path.display(), e),
    })
}

fn read_spec(path: &Path) -> Result<WavSpec> {
    Ok(open_reader(path)?.spec())
}

/// Write `seconds` of zero-amplitude frames; returns the frame count.
fn write_silence<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    seconds: f64,
    spec: &WavSpec,
) -> Result<u64> {
    if seconds <= 0.0 {
        return Ok(0);
    }
    let frames = (seconds * spec.sample_rate as f64).round() as u64;
    for _ in 0..frames * spec.channels as u64 {
        writer
            .write_sample(0i16)
            .map_err(|e| YomiageError::AudioProcessing {
                message: format!("failed to write silence: {}", e),
            })?;
    }
    Ok(frames)
}
