//! Bidirectional streaming synthesis command.

use std::time::Duration;

use clap::Args;
use flowtts::{SessionEvent, VoiceConfig};

use super::{create_client, format_bytes, output_bytes, print_success, print_verbose};
use crate::Cli;

/// Streams text through a bidirectional synthesis session and writes the
/// received PCM audio to the output file.
#[derive(Args)]
pub struct StreamCommand {
    /// Text to synthesize (alternative to -f file)
    #[arg(short = 't', long)]
    text: Option<String>,

    /// File containing the text to synthesize
    #[arg(short = 'f', long = "file")]
    file: Option<String>,

    /// Voice ID (e.g., v-male-s5NqE0rZ)
    #[arg(short = 'V', long)]
    voice: String,

    /// Delay between text chunks in milliseconds
    #[arg(long, default_value_t = 1000)]
    pacing_ms: u64,

    /// Keep audio received before a session error instead of failing
    #[arg(long)]
    keep_partial: bool,
}

impl StreamCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let output_path = cli
            .output
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("output file is required, use -o flag"))?;

        let text = match (&self.text, &self.file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)?,
            (None, None) => anyhow::bail!("text is required, use -t flag or -f file"),
        };

        let chunks = split_sentences(&text);
        if chunks.is_empty() {
            anyhow::bail!("no text to synthesize");
        }

        let client = create_client()?;
        print_verbose(cli, &format!("Voice: {}", self.voice));
        print_verbose(cli, &format!("Text segments: {}", chunks.len()));
        print_verbose(cli, &format!("Streaming to: {}", output_path));

        let session = client
            .stream_tts()
            .connect(&VoiceConfig::new(&self.voice))
            .await?;
        print_verbose(cli, &format!("Session established: {}", session.session_id()));

        let pacing = Duration::from_millis(self.pacing_ms);

        if self.keep_partial {
            // Drive the event loop by hand so audio received before a
            // session error is still written out.
            let feeder_chunks = chunks.clone();
            let (audio, sentences, failure) = {
                let send_session = &session;
                let feeder = async {
                    for chunk in &feeder_chunks {
                        tokio::time::sleep(pacing).await;
                        if send_session.send_text(chunk).await.is_err() {
                            return;
                        }
                    }
                    tokio::time::sleep(pacing).await;
                    let _ = send_session.finish().await;
                };
                tokio::pin!(feeder);

                let mut audio = Vec::new();
                let mut sentences = 0usize;
                let mut failure = None;
                let mut feeding = true;

                loop {
                    tokio::select! {
                        _ = &mut feeder, if feeding => feeding = false,
                        event = session.recv() => match event {
                            Some(Ok(SessionEvent::SentenceAudio { audio: chunk, .. })) => {
                                audio.extend_from_slice(&chunk);
                                sentences += 1;
                            }
                            Some(Ok(SessionEvent::SentenceError { code, message })) => {
                                eprintln!("sentence error ({code}): {message}");
                            }
                            Some(Ok(SessionEvent::Ended(_))) => break,
                            Some(Err(e)) => {
                                failure = Some(e);
                                break;
                            }
                            None => break,
                        },
                    }
                }
                (audio, sentences, failure)
            };

            session.close().await;
            if !audio.is_empty() {
                output_bytes(&audio, output_path)?;
                print_success(&format!(
                    "Audio saved to: {} ({}, {} sentences)",
                    output_path,
                    format_bytes(audio.len()),
                    sentences
                ));
            }
            if let Some(e) = failure {
                anyhow::bail!("session failed after {} sentences: {}", sentences, e);
            }
            return Ok(());
        }

        let synthesis = session.synthesize(chunks, pacing).await?;

        if synthesis.audio.is_empty() {
            anyhow::bail!("no audio data received");
        }

        output_bytes(&synthesis.audio, output_path)?;
        print_success(&format!(
            "Audio saved to: {} ({}, {} sentences, {:.1}s)",
            output_path,
            format_bytes(synthesis.audio.len()),
            synthesis.summary.total_sentences,
            synthesis.summary.total_duration
        ));

        let result = serde_json::json!({
            "audio_size": synthesis.audio.len(),
            "sentences": synthesis.summary.total_sentences,
            "duration_secs": synthesis.summary.total_duration,
            "output_file": output_path,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);

        Ok(())
    }
}

/// Splits input into per-sentence chunks on CJK terminal punctuation,
/// keeping the punctuation with its sentence. Input without terminal
/// punctuation is submitted as a single chunk.
fn split_sentences(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c == '\n' {
            continue;
        }
        current.push(c);
        if matches!(c, '。' | '！' | '？') {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::split_sentences;

    #[test]
    fn test_split_keeps_punctuation() {
        let chunks = split_sentences("今天天气真好！你那边怎么样？");
        assert_eq!(chunks, vec!["今天天气真好！", "你那边怎么样？"]);
    }

    #[test]
    fn test_split_without_terminal_punctuation() {
        let chunks = split_sentences("今天天气");
        assert_eq!(chunks, vec!["今天天气"]);
    }

    #[test]
    fn test_split_trailing_fragment() {
        let chunks = split_sentences("真好！我这边");
        assert_eq!(chunks, vec!["真好！", "我这边"]);
    }
}
