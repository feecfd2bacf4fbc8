//! Line-delimited TCP backends for local development.
//!
//! These stand in for the real ASR and TTS servers so the pipeline can
//! be exercised end-to-end without models: the source turns each line a
//! client sends into a transcription message (a blank line marks end of
//! utterance), and the sink writes refined fragments back to its
//! connected client one per line. One client at a time, no framing
//! beyond newlines; these are development aids, not a protocol.

use crate::error::{PipelineError, Result};
use crate::message::Message;
use crate::tls;
use crate::worker::synthesizer::{SynthesisSink, SynthesizerContext};
use crate::worker::transcriber::{TranscriberContext, TranscriptionSource};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// How often blocked accept/read calls re-check the stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn bind_listener(bind: &str, port: u16) -> Result<TcpListener> {
    let listener =
        TcpListener::bind((bind, port)).map_err(|e| PipelineError::Listener {
            message: format!("failed to bind {bind}:{port}: {e}"),
        })?;
    listener
        .set_nonblocking(true)
        .map_err(|e| PipelineError::Listener {
            message: format!("failed to configure listener: {e}"),
        })?;
    Ok(listener)
}

/// Accepts one connection, polling the stop predicate between attempts.
fn accept_polling(
    listener: &TcpListener,
    should_stop: &dyn Fn() -> bool,
) -> Result<Option<TcpStream>> {
    loop {
        if should_stop() {
            return Ok(None);
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                tracing::debug!(%peer, "client connected");
                stream.set_nonblocking(false)?;
                stream.set_read_timeout(Some(POLL_INTERVAL))?;
                return Ok(Some(stream));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(PipelineError::Listener {
                    message: format!("accept failed: {e}"),
                });
            }
        }
    }
}

/// Development transcription source: one utterance fragment per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStreamSource;

impl TranscriptionSource for LineStreamSource {
    fn serve(&self, ctx: &TranscriberContext) -> Result<()> {
        let listener = bind_listener(&ctx.listener.bind, ctx.listener.port)?;
        ctx.ready.set_ready();
        tracing::info!(
            bind = %ctx.listener.bind,
            port = ctx.listener.port,
            "loopback source listening"
        );

        while !ctx.stop.is_requested() {
            let stream = match accept_polling(&listener, &|| ctx.stop.is_requested())? {
                Some(stream) => stream,
                None => break,
            };
            let stream = tls::maybe_wrap(stream, ctx.tls.as_ref())?;
            let mut reader = BufReader::new(stream);

            let mut line = String::new();
            loop {
                if ctx.stop.is_requested() {
                    return Ok(());
                }
                line.clear();
                match reader.read_line(&mut line) {
                    // EOF: client hung up; close the utterance.
                    Ok(0) => {
                        ctx.out.push(Message::new(vec![], true));
                        break;
                    }
                    Ok(_) => {
                        let text = line.trim_end_matches(['\r', '\n']);
                        if text.is_empty() {
                            ctx.out.push(Message::new(vec![], true));
                        } else {
                            ctx.out.push(Message::single(text, false));
                        }
                    }
                    Err(e)
                        if e.kind() == ErrorKind::WouldBlock
                            || e.kind() == ErrorKind::TimedOut =>
                    {
                        // Read timeout; loop back to check the stop flag.
                    }
                    Err(e) => {
                        tracing::warn!("loopback source read failed: {e}");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loopback-source"
    }
}

/// Development synthesis sink: writes refined fragments to the
/// connected client, one per line, with a blank line at end of
/// utterance.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineStreamSink;

impl SynthesisSink for LineStreamSink {
    fn serve(&self, ctx: &SynthesizerContext) -> Result<()> {
        let listener = bind_listener(&ctx.listener.bind, ctx.listener.port)?;
        ctx.ready.set_ready();
        tracing::info!(
            bind = %ctx.listener.bind,
            port = ctx.listener.port,
            "loopback sink listening"
        );

        let mut client: Option<Box<dyn tls::ReadWriteStream>> = None;

        while let Some(msg) = ctx.input.pull() {
            if ctx.stop.is_requested() {
                break;
            }
            if client.is_none() {
                client = match accept_polling(&listener, &|| ctx.stop.is_requested())? {
                    Some(stream) => Some(tls::maybe_wrap(stream, ctx.tls.as_ref())?),
                    None => break,
                };
            }
            if let Some(stream) = client.as_mut() {
                let mut payload = String::new();
                for fragment in &msg.outputs {
                    payload.push_str(fragment);
                    payload.push('\n');
                }
                if msg.eos {
                    payload.push('\n');
                }
                if let Err(e) = stream.write_all(payload.as_bytes()) {
                    tracing::warn!("loopback sink write failed, dropping client: {e}");
                    client = None;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "loopback-sink"
    }
}
