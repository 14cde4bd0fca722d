use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Microphone audio sent to the model: 16 kHz mono PCM16.
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;
/// Model speech received for playback: 24 kHz mono PCM16.
pub const PLAYBACK_SAMPLE_RATE: u32 = 24000;

pub const PCM_MIME_TYPE: &str = "audio/pcm";
pub const JPEG_MIME_TYPE: &str = "image/jpeg";

pub fn pcm_mime_type(sample_rate: u32) -> String {
    format!("{};rate={}", PCM_MIME_TYPE, sample_rate)
}

/// Prebuilt voices offered by the native-audio models.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Voice {
    #[default]
    Puck,
    Charon,
    Kore,
    Fenrir,
    Zephyr,
    Custom(String),
}

impl Voice {
    pub const PRESETS: [Voice; 5] = [Voice::Puck, Voice::Charon, Voice::Kore, Voice::Fenrir, Voice::Zephyr];

    pub fn name(&self) -> &str {
        match self {
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Kore => "Kore",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
            Voice::Custom(s) => s,
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Voice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let preset = Voice::PRESETS
            .iter()
            .find(|voice| voice.name().eq_ignore_ascii_case(s))
            .cloned();
        Ok(preset.unwrap_or_else(|| Voice::Custom(s.to_string())))
    }
}

impl<'de> Deserialize<'de> for Voice {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match Voice::from_str(&s) {
            Ok(voice) => Ok(voice),
            Err(never) => match never {},
        }
    }
}
