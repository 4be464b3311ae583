//! Hands-free listening loop
//!
//! Runs on its own task. Each cycle waits for speech output to go quiet,
//! opens a recognition session, commits the utterance on trailing silence
//! or session end, hands it to the controller and waits for the controller
//! to finish with it before listening again. The loop never listens while
//! the narrator is speaking, so it does not transcribe its own voice.

use super::debounce::CommandDebouncer;
use super::state::{ListenEvent, ListenState, ListenStateMachine, TransitionResult};
use crate::command::{interpret, VoiceCommand};
use crate::config::ListeningConfig;
use crate::speech::{SpeechInput, SpeechInputError, SpeechInputEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// A committed utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Utterance {
    /// Recognised voice command
    Command {
        command: VoiceCommand,
        transcript: String,
    },
    /// Anything else, answered as a question
    Question { text: String },
}

/// Messages from the listening loop to its owner
#[derive(Debug)]
pub enum ListenerMessage {
    /// Handle the utterance, then drop or fire `done` to let the loop listen
    /// again
    Utterance {
        utterance: Utterance,
        done: oneshot::Sender<()>,
    },
    /// Recognition is unavailable; the loop has stopped
    Failed { error: SpeechInputError },
}

/// Published listening status for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ListenerStatus {
    pub state: ListenState,
    /// Transcript of the session in progress
    pub transcript: String,
    /// Latest microphone level
    pub sound_level: f32,
}

/// Owner's handle on a running listening loop
///
/// Dropping the handle cancels the loop.
pub struct ListenerHandle {
    cancel: CancellationToken,
    status: watch::Receiver<ListenerStatus>,
    task: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Spawn the listening loop. Must be called inside a tokio runtime.
    pub fn spawn(
        input: Arc<dyn SpeechInput>,
        config: ListeningConfig,
        speaking: watch::Receiver<bool>,
        dispatch: mpsc::Sender<ListenerMessage>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(ListenerStatus::default());

        let listen_loop = ListenLoop {
            input,
            debouncer: CommandDebouncer::new(config.command_debounce()),
            config,
            speaking,
            dispatch,
            cancel: cancel.clone(),
            machine: ListenStateMachine::new(),
            status: status_tx,
            sound_level: 0.0,
        };

        Self {
            cancel,
            status: status_rx,
            task: Some(tokio::spawn(listen_loop.run())),
        }
    }

    /// Current status
    pub fn status(&self) -> ListenerStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<ListenerStatus> {
        self.status.clone()
    }

    /// Whether the loop task is still running
    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Stop listening and wait for the loop to wind down
    ///
    /// Cancels pending silence and restart timers, ends the active
    /// recognition session and discards any partial transcript. Safe to call
    /// more than once.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Listening loop ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

enum Flow {
    Continue,
    Exit,
}

enum Collected {
    Utterance(String),
    Nothing,
    Failed(SpeechInputError),
    Cancelled,
}

struct ListenLoop {
    input: Arc<dyn SpeechInput>,
    config: ListeningConfig,
    speaking: watch::Receiver<bool>,
    dispatch: mpsc::Sender<ListenerMessage>,
    cancel: CancellationToken,
    machine: ListenStateMachine,
    debouncer: CommandDebouncer,
    status: watch::Sender<ListenerStatus>,
    sound_level: f32,
}

impl ListenLoop {
    async fn run(mut self) {
        tracing::info!("Hands-free listening started");
        self.publish();

        loop {
            if !self.wait_for_quiet().await {
                break;
            }
            if let Flow::Exit = self.listen_once().await {
                break;
            }
        }

        self.shutdown().await;
        tracing::info!("Hands-free listening stopped");
    }

    fn publish(&self) {
        self.status.send_replace(ListenerStatus {
            state: self.machine.state(),
            transcript: self.machine.transcript().to_string(),
            sound_level: self.sound_level,
        });
    }

    fn apply(&mut self, event: ListenEvent) -> Option<TransitionResult> {
        let result = self.machine.process_event(event);
        if result.is_some() {
            self.publish();
        }
        result
    }

    /// Wait until speech output has been quiet for the restart delay.
    /// Returns false if the loop should exit.
    async fn wait_for_quiet(&mut self) -> bool {
        let cancel = self.cancel.clone();
        let restart_delay = self.config.restart_delay();

        loop {
            let speaking = &mut self.speaking;
            let quiet = async move { speaking.wait_for(|active| !*active).await.map(|_| ()) };
            tokio::select! {
                _ = cancel.cancelled() => return false,
                result = quiet => {
                    if result.is_err() {
                        tracing::debug!("Speech output closed, leaving listening loop");
                        return false;
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = sleep(restart_delay) => {}
            }

            if !*self.speaking.borrow() {
                return true;
            }
        }
    }

    /// One recognition session, from opening to hand-off
    async fn listen_once(&mut self) -> Flow {
        let output_active = *self.speaking.borrow();
        if self.apply(ListenEvent::Start { output_active }).is_none() {
            return Flow::Continue;
        }

        let (events_tx, mut events_rx) = mpsc::channel(64);
        let cancel = self.cancel.clone();
        let started = tokio::select! {
            _ = cancel.cancelled() => return Flow::Exit,
            result = self.input.listen(events_tx) => result,
        };
        if let Err(error) = started {
            return self.on_input_error(error).await;
        }

        let outcome = self.collect(&mut events_rx).await;
        if let Collected::Cancelled = outcome {
            // shutdown ends the session
            return Flow::Exit;
        }
        self.input.stop().await;

        match outcome {
            Collected::Utterance(text) => self.dispatch(text).await,
            Collected::Nothing => {
                if self.machine.state().is_capturing() {
                    self.machine.reset();
                    self.publish();
                }
                Flow::Continue
            }
            Collected::Failed(error) => self.on_input_error(error).await,
            Collected::Cancelled => Flow::Exit,
        }
    }

    /// Gather transcript chunks until the utterance is complete
    async fn collect(&mut self, events: &mut mpsc::Receiver<SpeechInputEvent>) -> Collected {
        let cancel = self.cancel.clone();
        let listen_deadline = Instant::now() + self.config.listen_timeout();
        let silence_threshold = self.config.silence_threshold();
        let mut silence_deadline: Option<Instant> = None;

        loop {
            let silence = async move {
                match silence_deadline {
                    Some(deadline) => sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };
            let speaking = &mut self.speaking;

            tokio::select! {
                _ = cancel.cancelled() => return Collected::Cancelled,
                _ = sleep_until(listen_deadline) => {
                    tracing::debug!("Listening session reached its time limit");
                    return self.commit(ListenEvent::ListenTimeout);
                }
                _ = silence => {
                    self.apply(ListenEvent::SilenceElapsed);
                    return self.commit(ListenEvent::Finalize);
                }
                changed = speaking.changed() => {
                    if changed.is_err() {
                        return Collected::Cancelled;
                    }
                    if *self.speaking.borrow() {
                        tracing::debug!("Speech output started, abandoning listening session");
                        self.apply(ListenEvent::OutputStarted);
                        return Collected::Nothing;
                    }
                }
                event = events.recv() => match event {
                    Some(SpeechInputEvent::Transcript { text, is_final }) => {
                        self.apply(ListenEvent::Transcript { text, is_final });
                        if is_final || silence_deadline.is_some() {
                            silence_deadline = Some(Instant::now() + silence_threshold);
                        }
                    }
                    Some(SpeechInputEvent::SoundLevel(level)) => {
                        self.sound_level = level;
                        self.publish();
                    }
                    Some(SpeechInputEvent::SessionEnded) | None => {
                        return self.commit(ListenEvent::SessionEnded);
                    }
                    Some(SpeechInputEvent::Error(error)) => return Collected::Failed(error),
                },
            }
        }
    }

    fn commit(&mut self, event: ListenEvent) -> Collected {
        match self.apply(event) {
            Some(result) => match result.utterance() {
                Some(text) => Collected::Utterance(text.to_string()),
                None => Collected::Nothing,
            },
            None => Collected::Nothing,
        }
    }

    /// Interpret, debounce and hand the utterance to the owner
    async fn dispatch(&mut self, text: String) -> Flow {
        let command = interpret(&text);
        let utterance = if command.is_known() {
            if !self.debouncer.should_dispatch(command, Instant::now()) {
                self.apply(ListenEvent::Dispatched);
                return Flow::Continue;
            }
            tracing::info!("Heard command '{}'", command);
            Utterance::Command {
                command,
                transcript: text,
            }
        } else {
            tracing::info!("Heard question ({} characters)", text.len());
            Utterance::Question { text }
        };

        let (done_tx, done_rx) = oneshot::channel();
        if !self
            .send(ListenerMessage::Utterance {
                utterance,
                done: done_tx,
            })
            .await
        {
            return Flow::Exit;
        }

        let cancel = self.cancel.clone();
        let dispatch_timeout = self.config.dispatch_timeout();
        tokio::select! {
            _ = cancel.cancelled() => return Flow::Exit,
            result = tokio::time::timeout(dispatch_timeout, done_rx) => {
                if result.is_err() {
                    tracing::warn!(
                        "Utterance not handled within {:?}, listening again",
                        dispatch_timeout
                    );
                }
            }
        }

        self.apply(ListenEvent::Dispatched);
        Flow::Continue
    }

    async fn on_input_error(&mut self, error: SpeechInputError) -> Flow {
        if error.is_permanent() {
            tracing::error!(
                "Speech recognition unavailable, turning hands-free off: {}",
                error
            );
            self.apply(ListenEvent::PermanentError {
                message: error.to_string(),
            });
            self.send(ListenerMessage::Failed { error }).await;
            Flow::Exit
        } else {
            tracing::warn!("Speech recognition error, listening again: {}", error);
            self.apply(ListenEvent::TransientError {
                message: error.to_string(),
            });
            Flow::Continue
        }
    }

    /// Send to the owner unless cancelled. Returns false if not delivered.
    async fn send(&self, message: ListenerMessage) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            result = self.dispatch.send(message) => {
                if result.is_err() {
                    tracing::debug!("Listener owner has gone away");
                }
                result.is_ok()
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.machine.state().is_capturing() {
            self.input.stop().await;
        }
        self.apply(ListenEvent::Stop);
        self.publish();
    }
}
