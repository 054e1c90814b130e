use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use lx_core::error::CoreError;
use lx_core::signal::Signal;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file into a mono [`Signal`] at its native sample rate.
///
/// Supports WAV, MP3, FLAC, OGG, AAC via symphonia. Channels are averaged;
/// no resampling is done, so the extractor must run at the file's rate.
///
/// # Errors
/// Returns an error if the file cannot be opened, probed, or decoded, or if
/// the track declares no sample rate.
///
/// # Example
/// ```no_run
/// use lx_audio::decode::decode_file;
/// let signal = decode_file("speech.wav").unwrap();
/// println!("{} Hz, {:.2} s", signal.sample_rate(), signal.duration());
/// ```
pub fn decode_file(path: impl AsRef<Path>) -> Result<Signal> {
    let path = path.as_ref();
    let mut track = OpenTrack::open(path)?;
    let mut interleaver = Interleaver::default();
    let mut mono = MonoDownmix::default();

    while let Some(packet) = track.next_packet() {
        match track.decoder.decode(&packet) {
            Ok(decoded) => {
                let channels = decoded.spec().channels.count();
                mono.push_interleaved(interleaver.interleave(decoded), channels);
            }
            Err(e) => log::warn!("Trame audio ignorée : {e}"),
        }
    }

    log::info!(
        "Décodé {} échantillons @ {} Hz depuis {}",
        mono.len(),
        track.sample_rate,
        path.display()
    );

    mono.into_signal(track.sample_rate as f32)
        .with_context(|| format!("Taux invalide dans {}", path.display()))
}

/// Piste par défaut d'un fichier, avec son décodeur.
struct OpenTrack {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
}

impl OpenTrack {
    fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
        let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("Format audio non reconnu : {}", path.display()))?;

        let format = probed.format;
        let track = format
            .default_track()
            .context("Aucune piste audio par défaut")?;
        let sample_rate = track
            .codec_params
            .sample_rate
            .context("La piste ne déclare pas de taux d'échantillonnage")?;
        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Décodeur audio indisponible")?;
        let track_id = track.id;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
        })
    }

    /// Prochain paquet de la piste. `None` en fin de flux ou sur erreur de lecture.
    fn next_packet(&mut self) -> Option<Packet> {
        loop {
            match self.format.next_packet() {
                Ok(packet) if packet.track_id() == self.track_id => return Some(packet),
                Ok(_) => {}
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return None;
                }
                Err(e) => {
                    log::warn!("Lecture audio interrompue : {e}");
                    return None;
                }
            }
        }
    }
}

/// Tampon d'entrelacement réutilisé, réalloué seulement si un paquet est plus grand.
#[derive(Default)]
struct Interleaver {
    buffer: Option<SampleBuffer<f32>>,
    max_frames: usize,
}

impl Interleaver {
    fn interleave(&mut self, decoded: AudioBufferRef<'_>) -> &[f32] {
        let spec = *decoded.spec();
        let frames = decoded.capacity();
        if self.buffer.is_none() || frames > self.max_frames {
            self.buffer = Some(SampleBuffer::<f32>::new(frames as u64, spec));
            self.max_frames = frames;
        }
        match self.buffer.as_mut() {
            Some(buffer) => {
                buffer.copy_interleaved_ref(decoded);
                buffer.samples()
            }
            None => &[],
        }
    }
}

/// Accumulateur mono : moyenne des canaux de chaque trame entrelacée.
#[derive(Default)]
struct MonoDownmix {
    samples: Vec<f32>,
}

impl MonoDownmix {
    fn push_interleaved(&mut self, interleaved: &[f32], channels: usize) {
        let channels = channels.max(1);
        let gain = 1.0 / channels as f32;
        self.samples.extend(
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() * gain),
        );
    }

    fn len(&self) -> usize {
        self.samples.len()
    }

    fn into_signal(self, sample_rate: f32) -> Result<Signal, CoreError> {
        Signal::new(self.samples, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let mut mono = MonoDownmix::default();
        mono.push_interleaved(&[0.3, 0.6, 0.9, -1.0, 0.0, 1.0], 3);
        mono.push_interleaved(&[0.5, 0.25], 1);
        // Incomplete trailing frame is ignored
        mono.push_interleaved(&[1.0, 1.0, 1.0], 2);
        assert_eq!(mono.len(), 5);

        let signal = mono.into_signal(8000.0).expect("valid rate");
        let expected = [0.6, 0.0, 0.5, 0.25, 1.0];
        for (got, want) in signal.samples().iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn downmix_with_zero_channels_is_mono() {
        let mut mono = MonoDownmix::default();
        mono.push_interleaved(&[0.1, 0.2], 0);
        assert_eq!(mono.len(), 2);
        assert!(mono.into_signal(0.0).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = decode_file("/nonexistent/tone.wav").expect_err("missing file");
        assert!(err.to_string().contains("/nonexistent/tone.wav"));
    }

    /// Minimal PCM16 WAV writer.
    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
        let data_len = (frames.len() * 2) as u32;
        let mut bytes = Vec::with_capacity(44 + frames.len() * 2);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVEfmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes());
        bytes.extend_from_slice(&channels.to_le_bytes());
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * u32::from(channels) * 2).to_le_bytes());
        bytes.extend_from_slice(&(channels * 2).to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        for s in frames {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, bytes).expect("write wav");
    }

    #[test]
    fn stereo_wav_is_downmixed() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("stereo.wav");
        // Left at half scale, right silent
        let frames: Vec<i16> = (0..200).map(|i| if i % 2 == 0 { 16384 } else { 0 }).collect();
        write_wav(&path, 8000, 2, &frames);

        let signal = decode_file(&path).expect("decodable");
        assert_eq!(signal.len(), 100);
        assert!((signal.sample_rate() - 8000.0).abs() < f32::EPSILON);
        assert!(signal.samples().iter().all(|&s| (s - 0.25).abs() < 1e-3));
    }

    #[test]
    fn garbage_is_not_audio() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a RIFF header").expect("write");
        assert!(decode_file(&path).is_err());
    }
}
