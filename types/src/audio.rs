mod consts;
mod transcription;

pub use consts::*;
pub use transcription::{AudioTranscriptionConfig, Transcription};

/// Audio data encoded as base64
pub type Base64EncodedAudioBytes = String;

/// A segment of media in wire form: base64 payload plus its MIME type.
///
/// PCM audio carries its sample rate in the MIME parameters,
/// e.g. `audio/pcm;rate=16000`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    mime_type: String,
    data: String,
}

impl Blob {
    pub fn new(mime_type: &str, data: String) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data,
        }
    }

    /// Little-endian PCM16 mono audio at `sample_rate`.
    pub fn pcm(sample_rate: u32, data: Base64EncodedAudioBytes) -> Self {
        Self {
            mime_type: pcm_mime_type(sample_rate),
            data,
        }
    }

    pub fn jpeg(data: String) -> Self {
        Self::new(JPEG_MIME_TYPE, data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn is_audio(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    /// The raw `rate=` MIME parameter, if present.
    pub fn rate_param(&self) -> Option<&str> {
        self.mime_type
            .split(';')
            .skip(1)
            .find_map(|param| param.trim().strip_prefix("rate="))
    }

    /// The `rate=` MIME parameter, if present and numeric.
    pub fn sample_rate(&self) -> Option<u32> {
        self.rate_param().and_then(|rate| rate.parse().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_blob_sample_rate() {
        let blob = Blob::pcm(CAPTURE_SAMPLE_RATE, "AAA=".to_string());
        assert_eq!(blob.mime_type(), "audio/pcm;rate=16000");
        assert_eq!(blob.sample_rate(), Some(16000));
        assert!(blob.is_audio());

        let blob = Blob::new("audio/pcm", String::new());
        assert_eq!(blob.sample_rate(), None);

        let blob = Blob::new("audio/pcm;rate=fast", String::new());
        assert_eq!(blob.rate_param(), Some("fast"));
        assert_eq!(blob.sample_rate(), None);

        let blob = Blob::jpeg("/9j/".to_string());
        assert!(!blob.is_audio());
        assert_eq!(blob.sample_rate(), None);
    }

    #[test]
    fn test_blob_wire_format() {
        let blob = Blob::pcm(PLAYBACK_SAMPLE_RATE, "AQI=".to_string());
        let json = serde_json::to_string(&blob).unwrap();
        assert_eq!(json, r#"{"mimeType":"audio/pcm;rate=24000","data":"AQI="}"#);
    }
}
