pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const API_KEY: &str = "API_KEY";

pub const BASE_URL: &str =
    "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-native-audio-dialog";

pub const API_KEY_HEADER: &str = "x-goog-api-key";

pub const DEFAULT_CAPACITY: usize = 1024;
