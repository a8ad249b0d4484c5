//! Common types for the FlowTTS client.

use serde::{Deserialize, Serialize};

/// Voice selection parameters for a synthesis session.
///
/// Only `voice_id` is required; the remaining knobs are part of the message
/// schema and serialized only when set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Voice ID (e.g., "v-male-s5NqE0rZ").
    #[serde(rename = "VoiceId")]
    pub voice_id: String,

    /// Speed: [0.5, 2.0], default 1.0.
    #[serde(rename = "Speed", skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,

    /// Volume: [0, 10], default 1.0.
    #[serde(rename = "Volume", skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,

    /// Pitch: [-12, 12], default 0.
    #[serde(rename = "Pitch", skip_serializing_if = "Option::is_none")]
    pub pitch: Option<i32>,

    /// Language: zh/en/yue/ja/ko, default auto.
    #[serde(rename = "Language", skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl VoiceConfig {
    /// Creates a voice configuration with only the voice ID set.
    pub fn new(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: voice_id.into(),
            ..Default::default()
        }
    }
}

/// Aggregate statistics reported by the server when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSummary {
    /// Number of sentences synthesized.
    pub total_sentences: u32,
    /// Total audio duration in seconds.
    pub total_duration: f64,
}

/// Result of a complete driven synthesis session.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    /// Concatenated raw audio, one decoded chunk per sentence in arrival
    /// order.
    pub audio: Vec<u8>,
    /// Sentence texts in the order their audio arrived.
    pub sentences: Vec<String>,
    /// Server-reported session totals.
    pub summary: SessionSummary,
}
