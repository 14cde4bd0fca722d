use crate::session::history::{Role, Source};
use crate::types::tools::FunctionCall;
use crate::types::{Blob, ServerMessage};

/// What a server message means to the session, one variant per concern.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AudioChunk(Blob),
    FunctionCall(FunctionCall),
    Interrupted,
    Transcript { role: Role, text: String },
    GroundingSources(Vec<Source>),
    TurnComplete,
}

impl SessionEvent {
    /// Splits a server message into events, in the order they must be applied:
    /// sources, audio, function calls, interruption, transcripts, turn end.
    pub fn from_server_message(message: &ServerMessage) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        if let Some(content) = message.server_content() {
            let sources: Vec<Source> = content
                .grounding_metadata()
                .map(|metadata| {
                    metadata
                        .grounding_chunks()
                        .iter()
                        .filter_map(|chunk| chunk.as_web())
                        .filter_map(|web| {
                            let uri = web.uri().filter(|uri| !uri.is_empty())?;
                            Some(Source::new(uri, web.title().filter(|title| !title.is_empty()).unwrap_or(uri)))
                        })
                        .collect()
                })
                .unwrap_or_default();
            if !sources.is_empty() {
                events.push(SessionEvent::GroundingSources(sources));
            }

            if let Some(turn) = content.model_turn() {
                for part in turn.parts() {
                    if let Some(blob) = part.as_inline_data().filter(|blob| blob.is_audio()) {
                        events.push(SessionEvent::AudioChunk(blob.clone()));
                    }
                }
                for part in turn.parts() {
                    if let Some(call) = part.as_function_call() {
                        events.push(SessionEvent::FunctionCall(call.clone()));
                    }
                }
            }
        }

        if let Some(tool_call) = message.tool_call() {
            for call in tool_call.function_calls() {
                events.push(SessionEvent::FunctionCall(call.clone()));
            }
        }

        if let Some(content) = message.server_content() {
            if content.interrupted() {
                events.push(SessionEvent::Interrupted);
            }
            if let Some(transcription) = content.input_transcription() {
                events.push(SessionEvent::Transcript {
                    role: Role::User,
                    text: transcription.text().to_string(),
                });
            }
            if let Some(transcription) = content.output_transcription() {
                events.push(SessionEvent::Transcript {
                    role: Role::Ai,
                    text: transcription.text().to_string(),
                });
            }
            if content.turn_complete() {
                events.push(SessionEvent::TurnComplete);
            }
        }

        events
    }
}
