//! FlowTTS bidirectional streaming TTS client for Rust.
//!
//! This crate provides a client for the FlowTTS bidirectional synthesis
//! protocol: one WebSocket connection carries one synthesis session, text
//! chunks flow up as they become available, and synthesized audio flows
//! back one sentence at a time.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use flowtts::{Client, VoiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> flowtts::Result<()> {
//!     let client = Client::builder(1300000000)
//!         .secret_id("your-secret-id")
//!         .secret_key("your-secret-key")
//!         .sdk_app_id(1400000000)
//!         .build()?;
//!
//!     let session = client
//!         .stream_tts()
//!         .connect(&VoiceConfig::new("v-male-s5NqE0rZ"))
//!         .await?;
//!
//!     let chunks = ["今天天气", "真好！", "你那边", "怎么样？", "我这边阳光明媚。"];
//!     let synthesis = session
//!         .synthesize(chunks, Duration::from_secs(1))
//!         .await?;
//!
//!     // synthesis.audio holds the raw PCM stream in sentence order.
//!     println!("received {} bytes of audio", synthesis.audio.len());
//!     Ok(())
//! }
//! ```
//!
//! # Incremental feeding
//!
//! The [`BidirectionSession`] API is availability-driven: call
//! [`send_text`](BidirectionSession::send_text) whenever upstream text is
//! ready, [`finish`](BidirectionSession::finish) when there is no more, and
//! drain [`recv`](BidirectionSession::recv) concurrently. The
//! [`synthesize`](BidirectionSession::synthesize) driver wraps this for a
//! predetermined chunk list with fixed pacing.
//!
//! # Errors
//!
//! Fatal and non-fatal conditions are kept apart: a session-scoped error
//! from the server surfaces as [`Error::Session`] and terminates the
//! session, while a sentence-scoped error arrives as
//! [`SessionEvent::SentenceError`] and synthesis continues. Malformed or
//! unrecognized inbound frames are logged and skipped.

mod client;
mod error;
mod event;
mod session;
mod signing;
mod types;

pub use client::{Client, ClientBuilder, DEFAULT_WS_URL, generate_message_id};
pub use error::{Error, Result};
pub use session::{BidirectionSession, SessionEvent, SessionState, StreamTtsService};
pub use types::{SessionSummary, Synthesis, VoiceConfig};
