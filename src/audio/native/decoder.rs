use super::stream_source::HttpStreamSource;
use crate::error::{AppError, AppResult};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;

pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: usize,
    duration: Option<f64>,
}

/// Probe hint from the file extension of a stream URL.
pub fn extension_hint(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some("mp3"),
        "m4a" | "aac" | "mp4" => Some("m4a"),
        "flac" => Some("flac"),
        "ogg" | "oga" => Some("ogg"),
        "wav" => Some("wav"),
        _ => None,
    }
}

impl AudioDecoder {
    /// Probes the container. Blocks until enough of the download arrived.
    pub fn open(source: HttpStreamSource, extension: Option<&str>) -> AppResult<Self> {
        let stream = MediaSourceStream::new(Box::new(source), Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AppError::Decode(format!("probe failed: {}", e)))?;
        let reader = probed.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AppError::Decode("no supported audio track".into()))?;

        let track_id = track.id;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);
        let duration = track
            .codec_params
            .n_frames
            .map(|frames| frames as f64 / sample_rate as f64);

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AppError::Decode(format!("no decoder: {}", e)))?;

        log::info!(
            "[decoder] ready: {} Hz, {} ch, duration {:?}",
            sample_rate,
            channels,
            duration
        );
        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn seek(&mut self, seconds: f64) -> AppResult<()> {
        let seconds = seconds.max(0.0);
        let time = Time {
            seconds: seconds.trunc() as u64,
            frac: seconds.fract(),
        };
        self.reader
            .seek(
                SeekMode::Coarse,
                SeekTo::Time {
                    time,
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| AppError::Decode(format!("seek failed: {}", e)))?;
        self.decoder.reset();
        Ok(())
    }

    /// Next block of interleaved samples, `None` at end of stream.
    pub fn decode_next(&mut self) -> AppResult<Option<Vec<f32>>> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return Ok(None);
                }
                Err(e) => return Err(AppError::Decode(format!("read failed: {}", e))),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    log::debug!("[decoder] skipping bad packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(AppError::Decode(format!("decode failed: {}", e))),
            };

            let spec = *decoded.spec();
            let mut samples = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
            samples.copy_interleaved_ref(decoded);
            return Ok(Some(samples.samples().to_vec()));
        }
    }
}
