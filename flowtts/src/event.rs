//! Wire schema for the bidirectional synthesis protocol.
//!
//! Frames are JSON-encoded WebSocket text messages. Outbound frames carry
//! `{Event, ConnectionId, SessionId, MessageId, Data}`; inbound frames carry
//! `{Event, SessionId, Data}` with `Data` varying per event kind. Both
//! directions are modeled as enums tagged on the `Event` discriminator so
//! dispatch is an exhaustive match.

use serde::{Deserialize, Serialize};

use crate::client::generate_message_id;
use crate::error::Result;
use crate::types::VoiceConfig;

// ================== Outbound Frames ==================

/// Control frame sent to the server.
#[derive(Debug, Serialize)]
#[serde(tag = "Event")]
pub(crate) enum ClientFrame {
    /// Opens a synthesis session. `SessionId` is empty; the server assigns
    /// one in the SessionStart reply.
    StartSession {
        #[serde(rename = "ConnectionId")]
        connection_id: String,
        #[serde(rename = "SessionId")]
        session_id: String,
        #[serde(rename = "MessageId")]
        message_id: String,
        #[serde(rename = "Data")]
        data: StartSessionData,
    },
    /// Submits one chunk of input text.
    ContinueSession {
        #[serde(rename = "ConnectionId")]
        connection_id: String,
        #[serde(rename = "SessionId")]
        session_id: String,
        #[serde(rename = "MessageId")]
        message_id: String,
        #[serde(rename = "Data")]
        data: ContinueSessionData,
    },
    /// Signals that no further text will be submitted.
    FinishSession {
        #[serde(rename = "ConnectionId")]
        connection_id: String,
        #[serde(rename = "SessionId")]
        session_id: String,
        #[serde(rename = "MessageId")]
        message_id: String,
        #[serde(rename = "Data")]
        data: EmptyData,
    },
}

impl ClientFrame {
    pub(crate) fn start(connection_id: &str, voice: &VoiceConfig) -> Self {
        ClientFrame::StartSession {
            connection_id: connection_id.to_string(),
            session_id: String::new(),
            message_id: generate_message_id(),
            data: StartSessionData {
                voice: voice.clone(),
            },
        }
    }

    pub(crate) fn continue_text(connection_id: &str, session_id: &str, text: &str) -> Self {
        ClientFrame::ContinueSession {
            connection_id: connection_id.to_string(),
            session_id: session_id.to_string(),
            message_id: generate_message_id(),
            data: ContinueSessionData {
                text: text.to_string(),
            },
        }
    }

    pub(crate) fn finish(connection_id: &str, session_id: &str) -> Self {
        ClientFrame::FinishSession {
            connection_id: connection_id.to_string(),
            session_id: session_id.to_string(),
            message_id: generate_message_id(),
            data: EmptyData {},
        }
    }
}

/// StartSession payload: voice configuration.
#[derive(Debug, Serialize)]
pub(crate) struct StartSessionData {
    #[serde(rename = "Voice")]
    pub(crate) voice: VoiceConfig,
}

/// ContinueSession payload: one text chunk.
#[derive(Debug, Serialize)]
pub(crate) struct ContinueSessionData {
    #[serde(rename = "Text")]
    pub(crate) text: String,
}

/// Empty payload, serialized as `{}`.
#[derive(Debug, Serialize)]
pub(crate) struct EmptyData {}

// ================== Inbound Events ==================

/// Event received from the server, decoded once and dispatched by match.
#[derive(Debug, Deserialize)]
#[serde(tag = "Event")]
pub(crate) enum ServerEvent {
    /// Session acknowledged; carries the server-assigned session id.
    SessionStart {
        #[serde(rename = "SessionId", default)]
        session_id: String,
    },
    /// Synthesized audio for one sentence.
    SentenceAudio {
        #[serde(rename = "Data", default)]
        data: SentenceAudioData,
    },
    /// Session completed; carries aggregate totals.
    SessionEnd {
        #[serde(rename = "Data", default)]
        data: SessionEndData,
    },
    /// Session-scoped fatal error.
    SessionError {
        #[serde(rename = "Data", default)]
        data: ErrorData,
    },
    /// Sentence-scoped non-fatal error.
    SentenceError {
        #[serde(rename = "Data", default)]
        data: ErrorData,
    },
}

/// SentenceAudio payload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SentenceAudioData {
    /// The synthesized text fragment.
    #[serde(rename = "Sentence", default)]
    pub(crate) sentence: String,
    /// Base64-encoded audio for the sentence.
    #[serde(rename = "Audio", default)]
    pub(crate) audio: String,
}

/// SessionEnd payload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SessionEndData {
    #[serde(rename = "TotalSentences", default)]
    pub(crate) total_sentences: u32,
    #[serde(rename = "TotalDuration", default)]
    pub(crate) total_duration: f64,
}

/// SessionError / SentenceError payload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorData {
    #[serde(rename = "ErrorCode", default)]
    pub(crate) code: String,
    #[serde(rename = "ErrorMessage", default)]
    pub(crate) message: String,
}

/// Decodes one inbound text frame.
///
/// Fails on malformed JSON and on unknown event discriminators; the
/// dispatcher logs and skips such frames.
pub(crate) fn decode(text: &str) -> Result<ServerEvent> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_session_start() {
        let event = decode(r#"{"Event":"SessionStart","SessionId":"abc123"}"#).unwrap();
        match event {
            ServerEvent::SessionStart { session_id } => assert_eq!(session_id, "abc123"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_sentence_audio() {
        let event = decode(
            r#"{"Event":"SentenceAudio","SessionId":"abc123","Data":{"Sentence":"今天天气","Audio":"AQID"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::SentenceAudio { data } => {
                assert_eq!(data.sentence, "今天天气");
                assert_eq!(data.audio, "AQID");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_session_end() {
        let event = decode(
            r#"{"Event":"SessionEnd","SessionId":"abc123","Data":{"TotalSentences":5,"TotalDuration":3.2}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::SessionEnd { data } => {
                assert_eq!(data.total_sentences, 5);
                assert_eq!(data.total_duration, 3.2);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_errors() {
        let event = decode(
            r#"{"Event":"SessionError","Data":{"ErrorCode":"AuthFailure","ErrorMessage":"signature expired"}}"#,
        )
        .unwrap();
        assert!(matches!(event, ServerEvent::SessionError { .. }));

        let event = decode(
            r#"{"Event":"SentenceError","Data":{"ErrorCode":"SynthesisFailed","ErrorMessage":"bad input"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::SentenceError { data } => {
                assert_eq!(data.code, "SynthesisFailed");
                assert_eq!(data.message, "bad input");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_event() {
        assert!(decode(r#"{"Event":"SomethingNew","Data":{}}"#).is_err());
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(decode("not json{{{").is_err());
    }

    #[test]
    fn test_start_frame_shape() {
        let voice = VoiceConfig::new("v-male-s5NqE0rZ");
        let frame = ClientFrame::start("conn-1", &voice);
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(value["Event"], "StartSession");
        assert_eq!(value["ConnectionId"], "conn-1");
        assert_eq!(value["SessionId"], "");
        assert_eq!(value["Data"]["Voice"]["VoiceId"], "v-male-s5NqE0rZ");
        // Unset voice knobs stay off the wire.
        assert!(value["Data"]["Voice"].get("Speed").is_none());
        assert!(!value["MessageId"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_continue_frame_shape() {
        let frame = ClientFrame::continue_text("conn-1", "abc123", "真好！");
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(value["Event"], "ContinueSession");
        assert_eq!(value["SessionId"], "abc123");
        assert_eq!(value["Data"]["Text"], "真好！");
    }

    #[test]
    fn test_finish_frame_shape() {
        let frame = ClientFrame::finish("conn-1", "abc123");
        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(value["Event"], "FinishSession");
        assert_eq!(value["Data"], serde_json::json!({}));
    }

    #[test]
    fn test_message_ids_are_fresh() {
        let a = ClientFrame::finish("conn-1", "abc123");
        let b = ClientFrame::finish("conn-1", "abc123");
        let a = serde_json::to_value(&a).unwrap();
        let b = serde_json::to_value(&b).unwrap();
        assert_ne!(a["MessageId"], b["MessageId"]);
    }
}
