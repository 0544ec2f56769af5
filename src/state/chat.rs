use super::toast::{Toast, ToastPhase, BACKEND_UNREACHABLE_NOTICE, NO_TOKEN_NOTICE};
use super::transcript::{Applied, Entry, Transcript};
use crate::api::logging::{EventLog, TracingEventLog};
use crate::api::stream::{decode_event, FrameDecoder};
use crate::api::StreamSource;
use crate::auth::SessionProvider;
use crate::error::AskError;
use crate::types::StreamEvent;
use futures::StreamExt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Notifications a front end renders from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    EntryAppended { index: usize, entry: Entry },
    TokenDelta { index: usize, delta: String },
    EntryUpdated { index: usize, entry: Entry },
    Loading(bool),
    Streaming(bool),
    Toast(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyQuery,
    RequestInFlight,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    pub events_decoded: usize,
    pub parse_failures: usize,
    /// Unterminated text left in the buffer when the stream ended.
    pub discarded_tail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(TurnSummary),
    Ignored(SubmitRejection),
}

/// One chat surface: the transcript, the input field and the request flags.
pub struct ChatSession {
    source: Arc<dyn StreamSource>,
    auth: Arc<dyn SessionProvider>,
    event_log: Arc<dyn EventLog>,
    update_tx: Option<mpsc::UnboundedSender<ChatUpdate>>,
    transcript: Transcript,
    input: String,
    loading: bool,
    streaming: bool,
    toast: Option<Toast>,
}

impl ChatSession {
    pub fn new(source: Arc<dyn StreamSource>, auth: Arc<dyn SessionProvider>) -> Self {
        Self {
            source,
            auth,
            event_log: Arc::new(TracingEventLog),
            update_tx: None,
            transcript: Transcript::new(),
            input: String::new(),
            loading: false,
            streaming: false,
            toast: None,
        }
    }

    pub fn with_event_log(mut self, event_log: Arc<dyn EventLog>) -> Self {
        self.event_log = event_log;
        self
    }

    pub fn with_updates(mut self, update_tx: mpsc::UnboundedSender<ChatUpdate>) -> Self {
        self.update_tx = Some(update_tx);
        self
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn clear_expired_toast(&mut self, now: Instant) {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.phase(now) == ToastPhase::Expired)
        {
            self.toast = None;
        }
    }

    /// Sends the current input as a query and folds the streamed answer into
    /// the transcript.
    ///
    /// Whatever was appended before a transport failure stays in the
    /// transcript. The request flags are cleared on every exit path that got
    /// past the guards, including the future being dropped mid-stream.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, AskError> {
        let query = self.input.trim().to_string();
        if query.is_empty() {
            return Ok(SubmitOutcome::Ignored(SubmitRejection::EmptyQuery));
        }
        if self.loading || self.streaming {
            return Ok(SubmitOutcome::Ignored(SubmitRejection::RequestInFlight));
        }

        let session = self.auth.current_session().await;
        let Some(token) = session
            .as_ref()
            .and_then(|session| session.bearer_token())
            .map(ToOwned::to_owned)
        else {
            self.show_toast(NO_TOKEN_NOTICE);
            return Err(AskError::AuthTokenMissing);
        };

        let index = self.transcript.push_user_message(query.clone());
        self.emit_appended(index);
        self.input.clear();

        let mut request = InFlightRequest::begin(self);
        let result = request.stream_answer(&query, &token).await;
        drop(request);

        match result {
            Ok(summary) => Ok(SubmitOutcome::Completed(summary)),
            Err(error) => {
                tracing::error!(%error, "answer stream failed");
                self.show_toast(BACKEND_UNREACHABLE_NOTICE);
                Err(error)
            }
        }
    }

    async fn stream_answer(&mut self, query: &str, token: &str) -> Result<TurnSummary, AskError> {
        let mut stream = self.source.open_stream(query, token).await?;
        let mut decoder = FrameDecoder::new();
        let mut summary = TurnSummary::default();
        let mut first_token_seen = false;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for payload in decoder.push(&chunk) {
                let event = match decode_event(&payload) {
                    Ok(event) => event,
                    Err(failure) => {
                        self.event_log.parse_failure(&failure);
                        summary.parse_failures += 1;
                        continue;
                    }
                };

                let applied = self.transcript.apply(&event);
                if matches!(applied, Applied::TokenAppended { .. }) && !first_token_seen {
                    first_token_seen = true;
                    self.set_loading(false);
                }
                self.emit_applied(applied, &event);
                summary.events_decoded += 1;
            }
        }

        let tail = decoder.finish();
        if !tail.trim().is_empty() {
            self.event_log.discarded_tail(&tail);
            summary.discarded_tail = Some(tail);
        }

        Ok(summary)
    }

    fn emit_applied(&self, applied: Applied, event: &StreamEvent) {
        match applied {
            Applied::TokenAppended {
                index,
                created: true,
            } => self.emit_appended(index),
            Applied::TokenAppended {
                index,
                created: false,
            } => {
                if let StreamEvent::Token {
                    content: Some(delta),
                } = event
                {
                    self.emit(ChatUpdate::TokenDelta {
                        index,
                        delta: delta.clone(),
                    });
                }
            }
            Applied::ToolStarted { index } => self.emit_appended(index),
            Applied::ToolCompleted { indices } => {
                for index in indices {
                    if let Some(entry) = self.transcript.get(index) {
                        self.emit(ChatUpdate::EntryUpdated {
                            index,
                            entry: entry.clone(),
                        });
                    }
                }
            }
            Applied::TokenIgnored | Applied::UnmatchedToolCompletion { .. } | Applied::Ignored => {}
        }
    }

    fn emit_appended(&self, index: usize) {
        if let Some(entry) = self.transcript.get(index) {
            self.emit(ChatUpdate::EntryAppended {
                index,
                entry: entry.clone(),
            });
        }
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.emit(ChatUpdate::Loading(loading));
        }
    }

    fn set_streaming(&mut self, streaming: bool) {
        if self.streaming != streaming {
            self.streaming = streaming;
            self.emit(ChatUpdate::Streaming(streaming));
        }
    }

    fn show_toast(&mut self, message: &str) {
        self.toast = Some(Toast::new(message, Instant::now()));
        self.emit(ChatUpdate::Toast(message.to_string()));
    }

    fn emit(&self, update: ChatUpdate) {
        if let Some(tx) = &self.update_tx {
            let _ = tx.send(update);
        }
    }
}

/// Holds the session busy for one request. Dropping it, on completion or when
/// the `submit` future is cancelled, returns the flags to idle.
struct InFlightRequest<'a> {
    session: &'a mut ChatSession,
}

impl<'a> InFlightRequest<'a> {
    fn begin(session: &'a mut ChatSession) -> Self {
        session.set_loading(true);
        session.set_streaming(true);
        Self { session }
    }
}

impl Deref for InFlightRequest<'_> {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        self.session
    }
}

impl DerefMut for InFlightRequest<'_> {
    fn deref_mut(&mut self) -> &mut ChatSession {
        self.session
    }
}

impl Drop for InFlightRequest<'_> {
    fn drop(&mut self) {
        self.session.set_streaming(false);
        self.session.set_loading(false);
    }
}
