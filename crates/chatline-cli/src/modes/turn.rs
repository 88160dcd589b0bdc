//! One streamed turn: send, assemble, repaint, close.

use anyhow::{Context, Result};
use chatline_core::client::{ChatClient, FragmentStream};
use chatline_core::conversation::ChatSession;
use chatline_core::interrupt;
use chatline_core::render::{IncrementalRenderer, render};
use chatline_core::stream::{StreamAssembler, StreamFailure};
use chatline_term::{FrameSink, assistant_lines};
use tokio_util::sync::CancellationToken;

/// How a turn ended. The session already holds whatever text arrived.
#[derive(Debug)]
pub enum TurnOutcome {
    Completed,
    /// Ctrl+C stopped the response; received text is kept.
    Cancelled,
    /// The request was refused or the stream broke.
    Failed(anyhow::Error),
}

/// Sends `input` and paints the growing answer into `sink`.
///
/// Backend failures are reported through [`TurnOutcome::Failed`]; only
/// session refusals and terminal write errors are returned as `Err`.
///
/// # Errors
/// Returns an error if the session refuses the turn or painting fails.
pub async fn stream_turn(
    client: &ChatClient,
    session: &mut ChatSession,
    input: &str,
    sink: &mut dyn FrameSink,
    width: usize,
) -> Result<TurnOutcome> {
    let request = session.begin_turn(input)?;

    let token = CancellationToken::new();
    let watcher = interrupt::cancel_on_interrupt(token.clone());

    let opened = tokio::select! {
        biased;
        () = token.cancelled() => None,
        opened = client.stream_chat(&request) => Some(opened),
    };
    let fragments = match opened {
        Some(Ok(fragments)) => fragments,
        Some(Err(e)) => {
            watcher.abort();
            session.fail_turn(String::new());
            return Ok(TurnOutcome::Failed(e));
        }
        None => {
            watcher.abort();
            session.fail_turn(String::new());
            return Ok(TurnOutcome::Cancelled);
        }
    };

    let outcome = assemble_turn(session, fragments, token, sink, width).await;
    watcher.abort();
    outcome
}

/// Consumes the fragments of a turn `session` has already begun, painting
/// each snapshot, then closes the turn with whatever text arrived.
///
/// # Errors
/// Returns an error if painting fails.
async fn assemble_turn(
    session: &mut ChatSession,
    fragments: FragmentStream,
    token: CancellationToken,
    sink: &mut dyn FrameSink,
    width: usize,
) -> Result<TurnOutcome> {
    let mut renderer = IncrementalRenderer::new();
    let mut paint_error = None;
    let result = StreamAssembler::with_cancellation(token)
        .consume(fragments, |buffer| {
            session.apply_update(buffer);
            if paint_error.is_none()
                && let Err(e) = sink.paint(&assistant_lines(&renderer.update(buffer), width, true))
            {
                paint_error = Some(e);
            }
        })
        .await;

    let (text, outcome) = match result {
        Ok(done) if done.was_cancelled() => (done.text, TurnOutcome::Cancelled),
        Ok(done) => (done.text, TurnOutcome::Completed),
        Err(failure) => {
            let partial = failure.partial.clone();
            (partial, TurnOutcome::Failed(anyhow::Error::from(failure)))
        }
    };

    let final_lines = assistant_lines(&render(&text), width, false);
    tracing::info!(
        outcome = outcome_name(&outcome),
        bytes = text.len(),
        "turn finished"
    );
    match &outcome {
        TurnOutcome::Completed => session.complete_turn(text),
        TurnOutcome::Cancelled if !text.is_empty() => session.complete_turn(text),
        TurnOutcome::Cancelled | TurnOutcome::Failed(_) => session.fail_turn(text),
    }

    sink.finish(&final_lines).context("paint response")?;
    if let Some(e) = paint_error {
        return Err(e).context("paint response");
    }
    Ok(outcome)
}

fn outcome_name(outcome: &TurnOutcome) -> &'static str {
    match outcome {
        TurnOutcome::Completed => "completed",
        TurnOutcome::Cancelled => "cancelled",
        TurnOutcome::Failed(_) => "failed",
    }
}

/// User-facing message for a failed turn.
pub fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<StreamFailure>() {
        Some(failure) if !failure.partial.is_empty() => {
            format!("Response interrupted: {}", failure.source)
        }
        _ => format!("{error:#}"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chatline_core::client::ClientConfig;
    use chatline_core::conversation::Role;
    use chatline_term::PlainSink;
    use futures_util::{StreamExt, stream};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    /// Cloneable in-memory writer so the test can read what the sink wrote.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn client_for(server: &MockServer) -> ChatClient {
        ChatClient::new(ClientConfig {
            base_url: server.uri(),
            timeout: Some(Duration::from_secs(5)),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_completed_turn_paints_final_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/stream"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("Hello **there**\n✅ All good"),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = ChatSession::new("mistral", 0.3).unwrap();
        let out = Captured::default();
        let mut sink = PlainSink::new(out.clone());

        let outcome = stream_turn(&client, &mut session, "hi", &mut sink, 40)
            .await
            .unwrap();

        assert!(matches!(outcome, TurnOutcome::Completed));
        assert_eq!(out.text(), "Hello there\n\n▌ ✅ Success\n▌ All good\n");
        assert!(!session.is_busy());
        let last = session.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Hello **there**\n✅ All good");
    }

    #[tokio::test]
    async fn test_refused_request_drops_empty_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/stream"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"detail":"model not loaded"}"#))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = ChatSession::new("mistral", 0.3).unwrap();
        let mut sink = PlainSink::new(Captured::default());

        let outcome = stream_turn(&client, &mut session, "hi", &mut sink, 40)
            .await
            .unwrap();

        let TurnOutcome::Failed(error) = outcome else {
            panic!("expected a failed turn");
        };
        assert!(failure_message(&error).contains("model not loaded"));
        assert!(!session.is_busy());
        assert_eq!(session.conversation().len(), 1);
        assert_eq!(session.conversation().last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_broken_stream_keeps_partial_answer() {
        let mut session = ChatSession::new("mistral", 0.3).unwrap();
        session.begin_turn("hi").unwrap();
        let fragments = stream::iter(vec![
            Ok("Hel".to_string()),
            Ok("lo".to_string()),
            Err(anyhow::anyhow!("connection reset")),
        ])
        .boxed();
        let out = Captured::default();
        let mut sink = PlainSink::new(out.clone());

        let outcome = assemble_turn(
            &mut session,
            fragments,
            CancellationToken::new(),
            &mut sink,
            40,
        )
        .await
        .unwrap();

        let TurnOutcome::Failed(error) = outcome else {
            panic!("expected a failed turn");
        };
        assert_eq!(failure_message(&error), "Response interrupted: connection reset");
        assert_eq!(out.text(), "Hello\n");
        assert!(!session.is_busy());
        assert_eq!(session.conversation().len(), 2);
        let last = session.conversation().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, "Hello");
    }

    #[tokio::test]
    async fn test_cancel_before_any_text_drops_empty_reply() {
        let mut session = ChatSession::new("mistral", 0.3).unwrap();
        session.begin_turn("hi").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let out = Captured::default();
        let mut sink = PlainSink::new(out.clone());

        let fragments = stream::pending::<anyhow::Result<String>>().boxed();

        let outcome = assemble_turn(&mut session, fragments, token, &mut sink, 40)
            .await
            .unwrap();

        assert!(matches!(outcome, TurnOutcome::Cancelled));
        assert_eq!(out.text(), "");
        assert!(!session.is_busy());
        assert_eq!(session.conversation().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_input_is_refused_before_sending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = ChatSession::new("mistral", 0.3).unwrap();
        let mut sink = PlainSink::new(Captured::default());

        let result = stream_turn(&client, &mut session, "   ", &mut sink, 40).await;
        assert!(result.is_err());
        assert!(session.conversation().is_empty());
    }
}
