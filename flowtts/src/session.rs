//! Bidirectional streaming synthesis session.
//!
//! One session owns one WebSocket connection. A spawned dispatcher task
//! reads inbound events for the lifetime of the connection; outbound text
//! is fed independently, synchronized with the dispatcher only through the
//! session-started handoff and the shared session state. Received audio
//! fragments are assembled in arrival order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::ClientConfig;
use crate::error::{Error, Result};
use crate::event::{self, ClientFrame, ServerEvent};
use crate::signing;
use crate::types::{SessionSummary, Synthesis, VoiceConfig};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type WsWriter = SplitSink<WsStream, WsMessage>;
type WsReader = SplitStream<WsStream>;

/// Bound on waiting for the SessionStart acknowledgement.
const START_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the inbound event channel.
const EVENT_CHANNEL_SIZE: usize = 64;

// ================== Session State ==================

/// Session lifecycle state.
///
/// `Disconnected` and `Connecting` cover the period before and during
/// [`StreamTtsService::connect`]; a handshake failure there surfaces as a
/// transport error directly. Once connected, the dispatcher owns all
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport connection.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Connected, session not yet acknowledged.
    Connected,
    /// Session acknowledged; text may be submitted.
    SessionActive,
    /// Finish sent; no further text permitted.
    SessionEnding,
    /// Session ended by the server.
    Terminated,
    /// Transport error or session-scoped fatal error. Absorbing.
    Failed,
}

impl SessionState {
    /// Applies one server event to the current state.
    pub(crate) fn on_server_event(self, event: &ServerEvent) -> SessionState {
        if self.is_terminal() {
            return self;
        }
        match event {
            ServerEvent::SessionStart { .. } => match self {
                SessionState::Connected => SessionState::SessionActive,
                other => other,
            },
            // Sentence-scoped events do not change the lifecycle.
            ServerEvent::SentenceAudio { .. } | ServerEvent::SentenceError { .. } => self,
            ServerEvent::SessionEnd { .. } => SessionState::Terminated,
            ServerEvent::SessionError { .. } => SessionState::Failed,
        }
    }

    /// Returns true if the session has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Terminated | SessionState::Failed)
    }

    fn can_send_text(self) -> bool {
        self == SessionState::SessionActive
    }
}

// ================== Session Events ==================

/// Event surfaced to the caller from an active session.
#[derive(Debug)]
pub enum SessionEvent {
    /// Synthesized audio for one sentence.
    SentenceAudio {
        /// The text fragment this audio corresponds to.
        sentence: String,
        /// Decoded raw audio bytes.
        audio: Vec<u8>,
    },
    /// Non-fatal error scoped to one sentence; the session continues.
    SentenceError {
        /// Vendor error code.
        code: String,
        /// Human-readable description.
        message: String,
    },
    /// The server ended the session.
    Ended(SessionSummary),
}

// ================== Service ==================

/// Streaming TTS service: opens bidirectional synthesis sessions.
pub struct StreamTtsService {
    config: Arc<ClientConfig>,
}

impl StreamTtsService {
    pub(crate) fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// Opens a signed WebSocket connection and starts a synthesis session.
    ///
    /// Resolves once the server has acknowledged the session with a
    /// SessionStart event, so the returned session always carries a
    /// non-empty server-assigned session id.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use flowtts::{Client, VoiceConfig};
    ///
    /// # async fn example() -> flowtts::Result<()> {
    /// let client = Client::builder(1300000000)
    ///     .secret_id("secret-id")
    ///     .secret_key("secret-key")
    ///     .build()?;
    ///
    /// let session = client
    ///     .stream_tts()
    ///     .connect(&VoiceConfig::new("v-male-s5NqE0rZ"))
    ///     .await?;
    ///
    /// session.send_text("今天天气").await?;
    /// session.finish().await?;
    ///
    /// while let Some(event) = session.recv().await {
    ///     match event? {
    ///         flowtts::SessionEvent::SentenceAudio { audio, .. } => {
    ///             // collect audio
    ///             let _ = audio;
    ///         }
    ///         flowtts::SessionEvent::SentenceError { .. } => {}
    ///         flowtts::SessionEvent::Ended(_) => break,
    ///     }
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(&self, voice: &VoiceConfig) -> Result<BidirectionSession> {
        let connection_id = Uuid::new_v4().to_string();
        let url = signing::signed_url(&self.config, &connection_id, signing::unix_timestamp());

        debug!(connection_id = %connection_id, "connecting");
        let (ws_stream, _) = connect_async(url.as_str()).await.map_err(Error::WebSocket)?;
        let (write, read) = ws_stream.split();

        let shared = Arc::new(SessionShared {
            write: Mutex::new(write),
            state: RwLock::new(SessionState::Connected),
            connection_id,
            closed: AtomicBool::new(false),
        });

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let (started_tx, started_rx) = oneshot::channel();

        let dispatcher = tokio::spawn(dispatch_loop(read, shared.clone(), event_tx, started_tx));

        let frame = ClientFrame::start(&shared.connection_id, voice);
        if let Err(e) = shared.send_frame(&frame).await {
            dispatcher.abort();
            return Err(e);
        }

        let session_id = match tokio::time::timeout(START_TIMEOUT, started_rx).await {
            Ok(Ok(id)) => id,
            Ok(Err(_)) => {
                // The dispatcher dropped the handoff: a fatal event or a
                // transport error arrived instead of SessionStart.
                let mut event_rx = event_rx;
                let err = match event_rx.recv().await {
                    Some(Err(e)) => e,
                    _ => Error::Closed,
                };
                dispatcher.abort();
                return Err(err);
            }
            Err(_) => {
                shared.close_transport().await;
                dispatcher.abort();
                return Err(Error::Timeout("waiting for SessionStart".to_string()));
            }
        };

        debug!(session_id = %session_id, "session started");

        Ok(BidirectionSession {
            shared,
            session_id,
            event_rx: Mutex::new(event_rx),
            dispatcher,
        })
    }
}

// ================== Session ==================

/// An active bidirectional synthesis session.
pub struct BidirectionSession {
    shared: Arc<SessionShared>,
    session_id: String,
    event_rx: Mutex<mpsc::Receiver<Result<SessionEvent>>>,
    dispatcher: JoinHandle<()>,
}

impl std::fmt::Debug for BidirectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BidirectionSession")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

impl BidirectionSession {
    /// Returns the server-assigned session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the client-generated connection ID.
    pub fn connection_id(&self) -> &str {
        &self.shared.connection_id
    }

    /// Returns the current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.shared.state().await
    }

    /// Submits one chunk of input text.
    ///
    /// Fails with [`Error::InvalidState`] unless the session is active.
    pub async fn send_text(&self, text: &str) -> Result<()> {
        self.shared.send_continue(&self.session_id, text).await
    }

    /// Signals that no further text will be submitted.
    pub async fn finish(&self) -> Result<()> {
        self.shared.send_finish(&self.session_id).await
    }

    /// Receives the next session event.
    ///
    /// Session-scoped fatal conditions arrive as `Some(Err(_))`; `None`
    /// means the session terminated and all events have been drained.
    /// Takes `&self` so receiving can run concurrently with sends.
    pub async fn recv(&self) -> Option<Result<SessionEvent>> {
        self.event_rx.lock().await.recv().await
    }

    /// Terminates the session and closes the transport. Both the
    /// dispatcher and any pending feeder sends terminate with it.
    pub async fn close(&self) {
        {
            let mut state = self.shared.state.write().await;
            if !state.is_terminal() {
                *state = SessionState::Terminated;
            }
        }
        self.shared.close_transport().await;
    }

    /// Drives a complete session over a predetermined sequence of text
    /// chunks.
    ///
    /// Chunks are submitted one per `pacing` interval to emulate
    /// incremental input, followed by finish-session; concurrently, audio
    /// fragments are accumulated in arrival order. Sentence-scoped errors
    /// are logged and skipped. On a fatal error the accumulated audio is
    /// discarded and the error returned; callers that want partial audio
    /// drive [`recv`](Self::recv) themselves.
    pub async fn synthesize<I, S>(self, chunks: I, pacing: Duration) -> Result<Synthesis>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let chunks: Vec<String> = chunks.into_iter().map(Into::into).collect();
        let feeder = tokio::spawn(feed_chunks(
            self.shared.clone(),
            self.session_id.clone(),
            chunks,
            pacing,
        ));

        let mut synthesis = Synthesis::default();
        let outcome = loop {
            match self.recv().await {
                Some(Ok(SessionEvent::SentenceAudio { sentence, audio })) => {
                    synthesis.audio.extend_from_slice(&audio);
                    synthesis.sentences.push(sentence);
                }
                Some(Ok(SessionEvent::SentenceError { code, message })) => {
                    warn!(code = %code, message = %message, "sentence failed, continuing");
                }
                Some(Ok(SessionEvent::Ended(summary))) => {
                    synthesis.summary = summary;
                    break Ok(());
                }
                Some(Err(e)) => break Err(e),
                None => break Err(Error::Closed),
            }
        };

        match outcome {
            Ok(()) => {
                let _ = feeder.await;
                Ok(synthesis)
            }
            Err(e) => {
                // Abandon pending sends rather than queueing them.
                feeder.abort();
                self.shared.close_transport().await;
                Err(e)
            }
        }
    }
}

impl Drop for BidirectionSession {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

// ================== Shared Connection State ==================

/// State shared between the session handle, the dispatcher task and the
/// feeder. Only the dispatcher writes the lifecycle state; senders read it.
struct SessionShared {
    write: Mutex<WsWriter>,
    state: RwLock<SessionState>,
    connection_id: String,
    closed: AtomicBool,
}

impl SessionShared {
    async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    async fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        let json = serde_json::to_string(frame)?;
        self.write
            .lock()
            .await
            .send(WsMessage::Text(json.into()))
            .await
            .map_err(Error::WebSocket)
    }

    async fn send_continue(&self, session_id: &str, text: &str) -> Result<()> {
        let state = self.state().await;
        if !state.can_send_text() {
            return Err(Error::InvalidState(format!(
                "cannot send text in state {state:?}"
            )));
        }
        self.send_frame(&ClientFrame::continue_text(
            &self.connection_id,
            session_id,
            text,
        ))
        .await
    }

    async fn send_finish(&self, session_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != SessionState::SessionActive {
                return Err(Error::InvalidState(format!(
                    "cannot finish in state {:?}",
                    *state
                )));
            }
            *state = SessionState::SessionEnding;
        }
        self.send_frame(&ClientFrame::finish(&self.connection_id, session_id))
            .await
    }

    async fn close_transport(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut write = self.write.lock().await;
        let _ = write.send(WsMessage::Close(None)).await;
        let _ = write.close().await;
    }
}

// ================== Dispatcher ==================

/// Reads inbound frames for the lifetime of the connection, decodes each
/// into a server event and routes it. Malformed frames are skipped.
async fn dispatch_loop(
    mut read: WsReader,
    shared: Arc<SessionShared>,
    event_tx: mpsc::Sender<Result<SessionEvent>>,
    started_tx: oneshot::Sender<String>,
) {
    let mut started_tx = Some(started_tx);

    loop {
        let msg = match read.next().await {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                if !shared.closed.load(Ordering::SeqCst) {
                    *shared.state.write().await = SessionState::Failed;
                    let _ = event_tx.send(Err(Error::WebSocket(e))).await;
                }
                break;
            }
            None => {
                fail_if_open(&shared, &event_tx).await;
                break;
            }
        };

        let text = match msg {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => {
                fail_if_open(&shared, &event_tx).await;
                break;
            }
            _ => continue,
        };

        let event = match event::decode(&text) {
            Ok(event) => event,
            Err(e) => {
                // Unknown event kinds may appear as the protocol evolves;
                // neither they nor garbage frames terminate the session.
                warn!(error = %e, "skipping undecodable frame");
                continue;
            }
        };

        // Transition before routing so senders observe the new state no
        // later than the caller observes the event.
        {
            let mut state = shared.state.write().await;
            *state = state.on_server_event(&event);
        }

        match event {
            ServerEvent::SessionStart { session_id } => {
                debug!(session_id = %session_id, "SessionStart");
                if let Some(tx) = started_tx.take() {
                    let _ = tx.send(session_id);
                }
            }
            ServerEvent::SentenceAudio { data } => {
                let audio = match BASE64.decode(data.audio.as_bytes()) {
                    Ok(audio) => audio,
                    Err(e) => {
                        warn!(error = %e, "skipping sentence with undecodable audio");
                        continue;
                    }
                };
                debug!(sentence = %data.sentence, bytes = audio.len(), "SentenceAudio");
                let event = SessionEvent::SentenceAudio {
                    sentence: data.sentence,
                    audio,
                };
                if event_tx.send(Ok(event)).await.is_err() {
                    break;
                }
            }
            ServerEvent::SentenceError { data } => {
                warn!(code = %data.code, message = %data.message, "SentenceError");
                let event = SessionEvent::SentenceError {
                    code: data.code,
                    message: data.message,
                };
                if event_tx.send(Ok(event)).await.is_err() {
                    break;
                }
            }
            ServerEvent::SessionEnd { data } => {
                debug!(
                    total_sentences = data.total_sentences,
                    total_duration = data.total_duration,
                    "SessionEnd"
                );
                let summary = SessionSummary {
                    total_sentences: data.total_sentences,
                    total_duration: data.total_duration,
                };
                let _ = event_tx.send(Ok(SessionEvent::Ended(summary))).await;
                shared.close_transport().await;
                break;
            }
            ServerEvent::SessionError { data } => {
                let _ = event_tx
                    .send(Err(Error::Session {
                        code: data.code,
                        message: data.message,
                    }))
                    .await;
                shared.close_transport().await;
                break;
            }
        }
    }
}

/// Marks the session failed if the transport dropped before a terminal
/// event. A close initiated by this side is not a failure.
async fn fail_if_open(shared: &SessionShared, event_tx: &mpsc::Sender<Result<SessionEvent>>) {
    if shared.closed.load(Ordering::SeqCst) {
        return;
    }
    let mut state = shared.state.write().await;
    if !state.is_terminal() {
        *state = SessionState::Failed;
        drop(state);
        let _ = event_tx.send(Err(Error::Closed)).await;
    }
}

// ================== Feeder ==================

/// Submits text chunks one per pacing interval, then finish-session.
///
/// Stops as soon as a send is rejected: once the session has left the
/// active state the remaining chunks are abandoned.
async fn feed_chunks(
    shared: Arc<SessionShared>,
    session_id: String,
    chunks: Vec<String>,
    pacing: Duration,
) {
    let total = chunks.len();
    for (i, text) in chunks.iter().enumerate() {
        tokio::time::sleep(pacing).await;
        match shared.send_continue(&session_id, text).await {
            Ok(()) => debug!(index = i + 1, total, "sent text chunk"),
            Err(e) => {
                debug!(error = %e, "feeder stopping");
                return;
            }
        }
    }
    tokio::time::sleep(pacing).await;
    if let Err(e) = shared.send_finish(&session_id).await {
        debug!(error = %e, "finish not sent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{ErrorData, SentenceAudioData, SessionEndData};

    fn session_start() -> ServerEvent {
        ServerEvent::SessionStart {
            session_id: "abc123".to_string(),
        }
    }

    fn sentence_audio() -> ServerEvent {
        ServerEvent::SentenceAudio {
            data: SentenceAudioData::default(),
        }
    }

    fn sentence_error() -> ServerEvent {
        ServerEvent::SentenceError {
            data: ErrorData::default(),
        }
    }

    fn session_end() -> ServerEvent {
        ServerEvent::SessionEnd {
            data: SessionEndData::default(),
        }
    }

    fn session_error() -> ServerEvent {
        ServerEvent::SessionError {
            data: ErrorData::default(),
        }
    }

    #[test]
    fn test_session_start_activates_connected() {
        let state = SessionState::Connected.on_server_event(&session_start());
        assert_eq!(state, SessionState::SessionActive);
    }

    #[test]
    fn test_sentence_events_keep_state() {
        assert_eq!(
            SessionState::SessionActive.on_server_event(&sentence_audio()),
            SessionState::SessionActive
        );
        assert_eq!(
            SessionState::SessionActive.on_server_event(&sentence_error()),
            SessionState::SessionActive
        );
        assert_eq!(
            SessionState::SessionEnding.on_server_event(&sentence_audio()),
            SessionState::SessionEnding
        );
    }

    #[test]
    fn test_session_end_terminates() {
        assert_eq!(
            SessionState::SessionEnding.on_server_event(&session_end()),
            SessionState::Terminated
        );
        // Server may end a session it has not been asked to finish.
        assert_eq!(
            SessionState::SessionActive.on_server_event(&session_end()),
            SessionState::Terminated
        );
    }

    #[test]
    fn test_session_error_fails_from_any_state() {
        for state in [
            SessionState::Connected,
            SessionState::SessionActive,
            SessionState::SessionEnding,
        ] {
            assert_eq!(state.on_server_event(&session_error()), SessionState::Failed);
        }
    }

    #[test]
    fn test_terminal_states_absorb() {
        for terminal in [SessionState::Terminated, SessionState::Failed] {
            assert!(terminal.is_terminal());
            assert_eq!(terminal.on_server_event(&session_start()), terminal);
            assert_eq!(terminal.on_server_event(&sentence_audio()), terminal);
            assert_eq!(terminal.on_server_event(&session_end()), terminal);
        }
    }

    #[test]
    fn test_text_only_permitted_while_active() {
        assert!(SessionState::SessionActive.can_send_text());
        for state in [
            SessionState::Disconnected,
            SessionState::Connecting,
            SessionState::Connected,
            SessionState::SessionEnding,
            SessionState::Terminated,
            SessionState::Failed,
        ] {
            assert!(!state.can_send_text());
        }
    }
}
