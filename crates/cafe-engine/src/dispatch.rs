//! Executes widget commands on the tokio runtime.
//!
//! Widgets never do I/O. They hand back [`ChatCommand`]s and
//! [`UploadCommand`]s; the [`Dispatcher`] runs each one on its own task and
//! reports a [`Completion`] on a channel the UI loop drains. Feeding a
//! completion back is the only way widget state changes after a submit.

use crate::analysis::AnalysisResult;
use crate::client::CoffeeApi;
use crate::conversation::{ChatCommand, ChatReply, Conversation, RequestId, Resolution};
use crate::error::TransportError;
use crate::upload::{UploadCommand, UploadWidget};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Any command a widget can emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(ChatCommand),
    Upload(UploadCommand),
}

impl From<ChatCommand> for Command {
    fn from(command: ChatCommand) -> Self {
        Self::Chat(command)
    }
}

impl From<UploadCommand> for Command {
    fn from(command: UploadCommand) -> Self {
        Self::Upload(command)
    }
}

/// Outcome of a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Chat {
        request_id: RequestId,
        outcome: Result<ChatReply, TransportError>,
    },
    Upload {
        request_id: RequestId,
        outcome: Result<Option<AnalysisResult>, TransportError>,
    },
    ResetElapsed {
        generation: u64,
    },
}

impl Completion {
    /// Feed this completion to the widget it belongs to.
    ///
    /// Returns a follow-up command when the widget asks for one (the
    /// success reset after an analysis).
    pub fn apply(self, chat: &mut Conversation, upload: &mut UploadWidget) -> Option<Command> {
        match self {
            Self::Chat {
                request_id,
                outcome,
            } => {
                if chat.resolve(request_id, outcome) == Resolution::Stale {
                    debug!(request_id, "chat completion was stale");
                }
                None
            }
            Self::Upload {
                request_id,
                outcome,
            } => upload.resolve(request_id, outcome).map(Command::Upload),
            Self::ResetElapsed { generation } => {
                upload.reset_elapsed(generation);
                None
            }
        }
    }
}

/// Runs commands against a [`CoffeeApi`].
#[derive(Debug)]
pub struct Dispatcher<A> {
    api: Arc<A>,
    tx: mpsc::UnboundedSender<Completion>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            tx: self.tx.clone(),
        }
    }
}

impl<A: CoffeeApi> Dispatcher<A> {
    /// Create a dispatcher and the receiver its completions arrive on.
    pub fn new(api: A) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                api: Arc::new(api),
                tx,
            },
            rx,
        )
    }

    /// Spawn a task for `command`. Must be called inside a tokio runtime.
    pub fn dispatch(&self, command: impl Into<Command>) {
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        let command = command.into();
        let completion = async move {
            match command {
                Command::Chat(ChatCommand::Ask {
                    request_id,
                    request,
                }) => Completion::Chat {
                    request_id,
                    outcome: api.ask(&request).await,
                },
                Command::Chat(ChatCommand::Simulate {
                    request_id,
                    reply,
                    delay,
                }) => {
                    tokio::time::sleep(delay).await;
                    Completion::Chat {
                        request_id,
                        outcome: Ok(ChatReply::answer(reply)),
                    }
                }
                Command::Upload(UploadCommand::Analyze { request_id, file }) => {
                    Completion::Upload {
                        request_id,
                        outcome: api.analyze(&file).await.map(Some),
                    }
                }
                Command::Upload(UploadCommand::Simulate { request_id, delay }) => {
                    tokio::time::sleep(delay).await;
                    Completion::Upload {
                        request_id,
                        outcome: Ok(None),
                    }
                }
                Command::Upload(UploadCommand::ScheduleReset { generation, after }) => {
                    tokio::time::sleep(after).await;
                    Completion::ResetElapsed { generation }
                }
            }
        };
        tokio::spawn(async move {
            // The receiver is gone once the UI has shut down.
            let _ = tx.send(completion.await);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChatMode, UploadMode};
    use crate::conversation::{ChatRequest, ConversationSettings, APOLOGY_REPLY};
    use crate::upload::{PreviewRegistry, SelectedFile, UploadPhase, UploadSettings};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        questions: Mutex<Vec<String>>,
        fail_chat: bool,
    }

    impl CoffeeApi for FakeApi {
        async fn ask(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
            self.questions.lock().unwrap().push(request.question.clone());
            if self.fail_chat {
                return Err(TransportError::Network("refused".into()));
            }
            Ok(ChatReply::answer(format!("re: {}", request.question)))
        }

        async fn analyze(&self, file: &SelectedFile) -> Result<AnalysisResult, TransportError> {
            Ok(serde_json::from_value(serde_json::json!({
                "roast_level": file.name,
                "confidence": 0.5,
            }))?)
        }
    }

    fn png() -> SelectedFile {
        SelectedFile::new("roast.png", "image/png", vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_remote_chat_roundtrip() {
        let (dispatcher, mut rx) = Dispatcher::new(FakeApi::default());
        let mut chat = Conversation::default();
        let mut upload = UploadWidget::default();

        dispatcher.dispatch(chat.submit("espresso ratio?").unwrap());
        let completion = rx.recv().await.unwrap();
        assert!(completion.apply(&mut chat, &mut upload).is_none());

        assert!(!chat.is_sending());
        assert_eq!(chat.messages().last().unwrap().text, "re: espresso ratio?");
    }

    #[tokio::test]
    async fn test_chat_failure_appends_apology() {
        let api = FakeApi {
            fail_chat: true,
            ..FakeApi::default()
        };
        let (dispatcher, mut rx) = Dispatcher::new(api);
        let mut chat = Conversation::default();
        let mut upload = UploadWidget::default();

        dispatcher.dispatch(chat.submit("hi").unwrap());
        rx.recv().await.unwrap().apply(&mut chat, &mut upload);

        assert!(chat.has_error());
        assert_eq!(chat.messages().last().unwrap().text, APOLOGY_REPLY);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canned_reply_waits_for_delay() {
        let (dispatcher, mut rx) = Dispatcher::new(FakeApi::default());
        let mut chat = Conversation::new(ConversationSettings {
            mode: ChatMode::Canned,
            canned_delay: (Duration::from_millis(1500), Duration::from_millis(1500)),
            ..ConversationSettings::default()
        });

        dispatcher.dispatch(chat.submit("how much does it cost?").unwrap());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(rx.try_recv().is_err());

        let completion = rx.recv().await.unwrap();
        assert!(matches!(completion, Completion::Chat { request_id: 1, .. }));
        assert!(dispatcher.api.questions.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_success_schedules_reset() {
        let (dispatcher, mut rx) = Dispatcher::new(FakeApi::default());
        let mut chat = Conversation::default();
        let mut upload = UploadWidget::new(UploadSettings::default(), PreviewRegistry::new());

        upload.select_file(png()).unwrap();
        dispatcher.dispatch(upload.submit().unwrap());

        let follow_up = rx.recv().await.unwrap().apply(&mut chat, &mut upload);
        assert_eq!(upload.phase(), UploadPhase::Succeeded);
        assert_eq!(upload.result().unwrap().roast_level, "roast.png");

        dispatcher.dispatch(follow_up.unwrap());
        let start = tokio::time::Instant::now();
        rx.recv().await.unwrap().apply(&mut chat, &mut upload);
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(upload.phase(), UploadPhase::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_upload() {
        let (dispatcher, mut rx) = Dispatcher::new(FakeApi::default());
        let mut chat = Conversation::default();
        let mut upload = UploadWidget::new(
            UploadSettings {
                mode: UploadMode::Simulated,
                ..UploadSettings::default()
            },
            PreviewRegistry::new(),
        );

        upload.select_file(png()).unwrap();
        dispatcher.dispatch(upload.submit().unwrap());
        let completion = rx.recv().await.unwrap();
        assert_eq!(
            completion,
            Completion::Upload {
                request_id: 1,
                outcome: Ok(None)
            }
        );
        completion.apply(&mut chat, &mut upload);
        assert!(upload.is_success());
        assert!(upload.result().is_none());
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_silent() {
        let (dispatcher, rx) = Dispatcher::new(FakeApi::default());
        drop(rx);
        let mut chat = Conversation::default();
        dispatcher.dispatch(chat.submit("hi").unwrap());
        tokio::task::yield_now().await;
    }
}
