//! Cook-along session controller
//!
//! Owns the session and everything attached to it. UI requests arrive on the
//! inbox, utterances from the hands-free listener and step timer events on
//! their own channels; [`CookAlongController::run`] handles them one at a
//! time. The same operations are available as methods for callers that
//! drive the controller directly.

use super::events::{SessionEvent, SessionSnapshot};
use super::model::{ChatMessage, CookAlongSession, MessageKind};
use super::script;
use super::state::{PhaseEvent, PhaseTransition, SessionPhase, SessionStateMachine};
use super::SessionError;
use crate::answer::{AnswerService, QuestionContext};
use crate::command::VoiceCommand;
use crate::config::CookAlongConfig;
use crate::handsfree::{ListenerHandle, ListenerMessage, Utterance};
use crate::recipe::Recipe;
use crate::speech::{Narrator, SpeechInput, SpeechInputError, SpeechOutput};
use crate::timers::{describe_duration, detect_duration, StepTimer, StepTimerRegistry, TimerEvent};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

const INBOX_CAPACITY: usize = 32;
const LISTENER_CAPACITY: usize = 8;
const EVENT_CAPACITY: usize = 64;

/// Requests from the presentation layer
#[derive(Debug, Clone)]
pub enum ControlMessage {
    Start(Recipe),
    Command(VoiceCommand),
    Question(String),
    ToggleIngredient(String),
    SetHandsFree(bool),
    Exit,
    End,
}

enum Next {
    Control(ControlMessage),
    Listener(ListenerMessage),
    Timer(TimerEvent),
}

/// Coordinates one cook-along session at a time
pub struct CookAlongController {
    config: CookAlongConfig,
    input: Arc<dyn SpeechInput>,
    narrator: Narrator,
    answers: Arc<dyn AnswerService>,
    machine: SessionStateMachine,
    session: Option<CookAlongSession>,
    timers: StepTimerRegistry,
    timer_events: mpsc::UnboundedReceiver<TimerEvent>,
    listener: Option<ListenerHandle>,
    listener_tx: mpsc::Sender<ListenerMessage>,
    listener_rx: mpsc::Receiver<ListenerMessage>,
    inbox_tx: mpsc::Sender<ControlMessage>,
    inbox_rx: mpsc::Receiver<ControlMessage>,
    events: broadcast::Sender<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    /// Timer announcements speaking in the background
    alerts: Vec<JoinHandle<()>>,
    last_command_at: Option<Instant>,
    exits: u64,
}

impl CookAlongController {
    pub fn new(
        config: CookAlongConfig,
        input: Arc<dyn SpeechInput>,
        output: Arc<dyn SpeechOutput>,
        answers: Arc<dyn AnswerService>,
    ) -> Self {
        let narrator = Narrator::new(output, config.narration.clone());
        let (timers, timer_events) = StepTimerRegistry::new(config.session.timer_tick());
        let (listener_tx, listener_rx) = mpsc::channel(LISTENER_CAPACITY);
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::default());

        Self {
            config,
            input,
            narrator,
            answers,
            machine: SessionStateMachine::new(),
            session: None,
            timers,
            timer_events,
            listener: None,
            listener_tx,
            listener_rx,
            inbox_tx,
            inbox_rx,
            events,
            snapshot_tx,
            alerts: Vec::new(),
            last_command_at: None,
            exits: 0,
        }
    }

    pub fn config(&self) -> &CookAlongConfig {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    pub fn session(&self) -> Option<&CookAlongSession> {
        self.session.as_ref()
    }

    pub fn current_step_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.current_step_index())
    }

    pub fn is_hands_free(&self) -> bool {
        self.listener.is_some()
    }

    pub fn is_speaking(&self) -> bool {
        self.narrator.is_speaking()
    }

    pub fn narrator(&self) -> &Narrator {
        &self.narrator
    }

    /// Every timer of the session, including finished ones
    pub fn timers(&self) -> Vec<StepTimer> {
        self.timers.timers()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.as_ref().map(|s| s.messages()).unwrap_or(&[])
    }

    /// Sender for UI requests handled by [`run`](Self::run)
    pub fn inbox(&self) -> mpsc::Sender<ControlMessage> {
        self.inbox_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Watch the snapshot, updated after every change
    pub fn watch_snapshot(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = SessionSnapshot {
            phase: self.phase(),
            hands_free: self.is_hands_free(),
            listener: self.listener.as_ref().map(|l| l.status()),
            is_speaking: self.narrator.is_speaking(),
            timers: self.timers.snapshots(),
            ..Default::default()
        };

        if let Some(session) = &self.session {
            snapshot.recipe_title = Some(session.recipe.title.clone());
            snapshot.step_index = Some(session.current_step_index());
            snapshot.step_count = session.step_count();
            snapshot.step_text = session.current_step_text().map(str::to_string);
            snapshot.progress = session.progress();
            snapshot.is_paused = session.is_paused;
            snapshot.is_completed = session.is_completed;
            snapshot.checked_ingredients = session.checked_ingredients();
            snapshot.message_count = session.messages().len();
        }

        snapshot
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Handle inbox, listener and timer messages until the session exits
    pub async fn run(&mut self) {
        let exits = self.exits;
        tracing::info!("Cook-along controller running");

        while self.exits == exits {
            let next = tokio::select! {
                Some(message) = self.inbox_rx.recv() => Next::Control(message),
                Some(message) = self.listener_rx.recv() => Next::Listener(message),
                Some(event) = self.timer_events.recv() => Next::Timer(event),
                else => break,
            };
            self.handle(next).await;
        }

        tracing::info!("Cook-along controller stopped");
    }

    /// Handle messages that are already waiting, without blocking
    ///
    /// For callers that drive the controller themselves instead of using
    /// [`run`](Self::run). Returns the number of messages handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = if let Ok(message) = self.listener_rx.try_recv() {
                Next::Listener(message)
            } else if let Ok(event) = self.timer_events.try_recv() {
                Next::Timer(event)
            } else if let Ok(message) = self.inbox_rx.try_recv() {
                Next::Control(message)
            } else {
                break;
            };
            self.handle(next).await;
            handled += 1;
        }
        handled
    }

    async fn handle(&mut self, next: Next) {
        match next {
            Next::Control(message) => self.handle_control(message).await,
            Next::Listener(ListenerMessage::Utterance { utterance, done }) => {
                match utterance {
                    Utterance::Command {
                        command,
                        transcript,
                    } => {
                        tracing::debug!("Voice command '{}' from \"{}\"", command, transcript);
                        self.handle_command(command).await;
                    }
                    Utterance::Question { text } => {
                        if let Err(e) = self.ask_question(&text).await {
                            tracing::warn!("Question not handled: {}", e);
                        }
                    }
                }
                // The listener may already be gone
                let _ = done.send(());
            }
            Next::Listener(ListenerMessage::Failed { error }) => {
                self.on_listener_failed(error).await
            }
            Next::Timer(event) => self.on_timer_event(event),
        }
    }

    async fn handle_control(&mut self, message: ControlMessage) {
        match message {
            ControlMessage::Start(recipe) => {
                if let Err(e) = self.start_session(recipe).await {
                    tracing::warn!("Could not start cook-along: {}", e);
                }
            }
            ControlMessage::Command(command) => {
                self.handle_command(command).await;
            }
            ControlMessage::Question(text) => {
                if let Err(e) = self.ask_question(&text).await {
                    tracing::warn!("Question not handled: {}", e);
                }
            }
            ControlMessage::ToggleIngredient(id) => {
                if let Err(e) = self.toggle_ingredient(&id) {
                    tracing::warn!("Could not toggle ingredient: {}", e);
                }
            }
            ControlMessage::SetHandsFree(true) => {
                self.enable_hands_free().await;
            }
            ControlMessage::SetHandsFree(false) => self.disable_hands_free().await,
            ControlMessage::Exit => self.exit_gracefully().await,
            ControlMessage::End => self.end_session().await,
        }
    }

    fn session_mut(&mut self) -> Result<&mut CookAlongSession, SessionError> {
        self.session.as_mut().ok_or(SessionError::NoActiveSession)
    }

    fn require_session(&self) -> Result<(), SessionError> {
        match self.session {
            Some(_) => Ok(()),
            None => Err(SessionError::NoActiveSession),
        }
    }

    fn require_phase(&self, action: &'static str, phase: SessionPhase) -> Result<(), SessionError> {
        self.require_session()?;
        let current = self.phase();
        if current != phase {
            return Err(SessionError::InvalidTransition {
                action,
                phase: current,
            });
        }
        Ok(())
    }

    fn transition(&mut self, event: PhaseEvent) -> Result<PhaseTransition, SessionError> {
        let transition =
            self.machine
                .process_event(event)
                .ok_or(SessionError::InvalidTransition {
                    action: event.as_str(),
                    phase: self.machine.phase(),
                })?;

        self.emit(SessionEvent::StateChanged {
            from: transition.from,
            to: transition.to,
            event,
        });
        self.publish();
        Ok(transition)
    }

    /// Record an assistant message and speak it
    async fn say(&mut self, text: &str, kind: MessageKind) {
        if let Some(session) = self.session.as_mut() {
            session.push_message(ChatMessage::assistant(kind, text));
        }
        self.publish();
        self.narrator.narrate(text).await;
    }

    /// Start a cook-along for `recipe`
    ///
    /// Ends any session in progress, speaks the welcome and turns on
    /// hands-free listening if configured. The first step is narrated once
    /// the cook says "start".
    pub async fn start_session(&mut self, recipe: Recipe) -> Result<(), SessionError> {
        let session = CookAlongSession::new(recipe)?;
        if self.session.is_some() {
            tracing::info!("Replacing the active cook-along session");
            self.end_session().await;
        }

        tracing::info!(
            "Starting cook-along for '{}' ({} steps)",
            session.recipe.title,
            session.step_count()
        );
        let welcome = script::welcome(&session.recipe);
        self.session = Some(session);
        self.transition(PhaseEvent::Begin)?;

        if let Err(e) = self.narrator.configure(&self.config.voice).await {
            tracing::warn!("Could not apply voice settings: {}", e);
        }
        self.say(&welcome, MessageKind::SystemNotification).await;
        self.transition(PhaseEvent::WelcomeFinished)?;

        if self.config.listening.hands_free {
            self.enable_hands_free().await;
        }
        self.publish();
        Ok(())
    }

    /// Narrate the first step
    pub async fn start_first_step(&mut self) -> Result<(), SessionError> {
        self.require_session()?;
        self.transition(PhaseEvent::StartCooking)?;
        self.session_mut()?.go_to(0)?;
        self.narrate_current_step().await;
        Ok(())
    }

    /// Move to the next step, or complete the recipe after the last one
    pub async fn next_step(&mut self) -> Result<(), SessionError> {
        self.require_phase("go to the next step", SessionPhase::StepInProgress)?;
        if !self.session_mut()?.advance() {
            return self.complete_session().await;
        }
        self.narrate_current_step().await;
        Ok(())
    }

    /// Move to the previous step
    pub async fn previous_step(&mut self) -> Result<(), SessionError> {
        self.require_phase("go back", SessionPhase::StepInProgress)?;
        if !self.session_mut()?.go_back() {
            self.narrator.interrupt().await;
            self.say(script::ALREADY_FIRST_STEP, MessageKind::SystemNotification)
                .await;
            return Ok(());
        }
        self.narrate_current_step().await;
        Ok(())
    }

    /// Read the current step again
    pub async fn repeat_step(&mut self) -> Result<(), SessionError> {
        self.require_phase("repeat the step", SessionPhase::StepInProgress)?;
        self.narrate_current_step().await;
        Ok(())
    }

    /// Pause cooking and every running timer
    pub async fn pause_session(&mut self) -> Result<(), SessionError> {
        self.require_session()?;
        self.transition(PhaseEvent::Pause)?;
        let paused = self.timers.pause_all();
        self.session_mut()?.is_paused = true;
        tracing::info!("Cook-along paused ({} timers paused)", paused);

        self.narrator.interrupt().await;
        self.say(script::PAUSED, MessageKind::SystemNotification).await;
        Ok(())
    }

    /// Resume paused timers and read the current step again
    pub async fn resume_session(&mut self) -> Result<(), SessionError> {
        self.require_session()?;
        self.transition(PhaseEvent::Resume)?;
        let resumed = self.timers.resume_all();
        self.session_mut()?.is_paused = false;
        tracing::info!("Cook-along resumed ({} timers resumed)", resumed);

        self.narrate_current_step().await;
        Ok(())
    }

    /// Mark the recipe as finished
    ///
    /// The session stays until the cook exits so "exit" still works.
    pub async fn complete_session(&mut self) -> Result<(), SessionError> {
        self.require_session()?;
        self.transition(PhaseEvent::Finish)?;
        let cancelled = self.timers.cancel_all();

        let session = self.session_mut()?;
        session.is_completed = true;
        session.is_paused = false;
        let text = script::completion(&session.recipe);
        tracing::info!("Cook-along completed ({} timers cancelled)", cancelled);

        self.narrator.interrupt().await;
        self.say(&text, MessageKind::SystemNotification).await;
        Ok(())
    }

    /// Speak the available commands
    pub async fn help(&mut self) -> Result<(), SessionError> {
        self.require_session()?;
        self.narrator.interrupt().await;
        self.say(script::HELP, MessageKind::SystemNotification).await;
        Ok(())
    }

    /// Ask the answer service and speak its reply
    ///
    /// Answer failures and timeouts are logged; the cook simply hears no
    /// reply.
    pub async fn ask_question(&mut self, question: &str) -> Result<(), SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Ok(());
        }

        let history_limit = self.config.assistant.history_limit;
        let session = self.session_mut()?;
        let context = QuestionContext {
            question: question.to_string(),
            recipe: session.recipe.clone(),
            step_index: session.current_step_index(),
            history: session.recent_messages(history_limit),
        };
        session.push_message(ChatMessage::user(question));
        self.publish();
        tracing::info!("Answering a question during step {}", context.step_index + 1);

        let answer_timeout = self.config.assistant.answer_timeout();
        let outcome = timeout(answer_timeout, self.answers.answer(&context)).await;
        match outcome {
            Ok(Ok(reply)) if !reply.trim().is_empty() => {
                self.say(reply.trim(), MessageKind::Text).await;
            }
            Ok(Ok(_)) => tracing::warn!("Answer service returned an empty reply"),
            Ok(Err(e)) => tracing::warn!("Answer service failed: {:#}", e),
            Err(_) => tracing::warn!("No answer within {:?}", answer_timeout),
        }
        Ok(())
    }

    /// Check or uncheck an ingredient. Returns whether it is now checked.
    pub fn toggle_ingredient(&mut self, id: &str) -> Result<bool, SessionError> {
        let checked = self.session_mut()?.toggle_ingredient(id)?;
        tracing::debug!("Ingredient '{}' checked: {}", id, checked);
        self.publish();
        Ok(checked)
    }

    /// Handle a command from voice or the UI
    ///
    /// Commands arriving within the guard window after the previous one
    /// finished are ignored. Returns whether the command was handled.
    pub async fn handle_command(&mut self, command: VoiceCommand) -> bool {
        if command == VoiceCommand::Unknown {
            return false;
        }

        let guard = self.config.session.command_guard();
        if let Some(last) = self.last_command_at {
            if last.elapsed() < guard {
                tracing::debug!(
                    "Ignoring '{}' command, previous one finished {:?} ago",
                    command,
                    last.elapsed()
                );
                return false;
            }
        }

        tracing::info!("Handling '{}' command while {}", command, self.phase());
        if let Err(e) = self.dispatch_command(command).await {
            tracing::warn!("Command '{}' not handled: {}", command, e);
        }
        self.last_command_at = Some(Instant::now());
        self.publish();
        true
    }

    async fn dispatch_command(&mut self, command: VoiceCommand) -> Result<(), SessionError> {
        use SessionPhase as P;
        use VoiceCommand as C;

        let phase = self.phase();
        if self.session.is_none() || matches!(phase, P::NotStarted | P::Exiting) {
            return Err(SessionError::NoActiveSession);
        }

        match (phase, command) {
            (_, C::Exit) => {
                self.exit_gracefully().await;
                Ok(())
            }
            (_, C::Help) => self.help().await,
            (_, C::StopListening) => {
                self.disable_hands_free().await;
                self.say(script::HANDS_FREE_OFF, MessageKind::SystemNotification)
                    .await;
                Ok(())
            }

            (P::WelcomePlaying | P::AwaitingStart, C::Start | C::Next) => {
                self.start_first_step().await
            }
            (P::WelcomePlaying | P::AwaitingStart, _) => {
                self.say(script::START_HINT, MessageKind::SystemNotification)
                    .await;
                Ok(())
            }

            (P::StepInProgress | P::Paused, C::Complete) => self.complete_session().await,
            (P::StepInProgress, C::Next) => self.next_step().await,
            (P::StepInProgress, C::Back) => self.previous_step().await,
            (P::StepInProgress, C::Repeat) => self.repeat_step().await,
            (P::StepInProgress, C::Pause) => self.pause_session().await,
            (P::StepInProgress, C::Start | C::Resume | C::Unknown) => Ok(()),

            (P::Paused, C::Resume | C::Start) => self.resume_session().await,
            (P::Paused, _) => {
                self.say(script::RESUME_HINT, MessageKind::SystemNotification)
                    .await;
                Ok(())
            }

            (P::Completed, C::Repeat) => {
                let text = match &self.session {
                    Some(session) => script::completion(&session.recipe),
                    None => return Err(SessionError::NoActiveSession),
                };
                self.say(&text, MessageKind::SystemNotification).await;
                Ok(())
            }
            (P::Completed, _) => {
                self.say(script::COMPLETED_HINT, MessageKind::SystemNotification)
                    .await;
                Ok(())
            }

            (P::NotStarted | P::Exiting, _) => Err(SessionError::NoActiveSession),
        }
    }

    /// Say goodbye, tear the session down and emit [`SessionEvent::Exited`]
    ///
    /// The goodbye is cut off after the configured exit delay. Calling this
    /// without a session, or while already exiting, does nothing.
    pub async fn exit_gracefully(&mut self) {
        if self.session.is_none() || self.phase() == SessionPhase::Exiting {
            tracing::debug!("Exit requested with no session to leave");
            return;
        }

        if let Err(e) = self.transition(PhaseEvent::Exit) {
            tracing::warn!("Exiting from an unexpected phase: {}", e);
        }
        if let Some(mut listener) = self.listener.take() {
            listener.stop().await;
        }
        self.narrator.interrupt().await;

        if let Some(session) = self.session.as_mut() {
            session.push_message(ChatMessage::assistant(
                MessageKind::SystemNotification,
                script::GOODBYE,
            ));
        }
        let exit_delay = self.config.session.exit_delay();
        if timeout(exit_delay, self.narrator.narrate(script::GOODBYE))
            .await
            .is_err()
        {
            tracing::debug!("Goodbye cut short after {:?}", exit_delay);
        }

        self.teardown(true).await;
    }

    /// Tear the session down immediately, without a goodbye
    pub async fn end_session(&mut self) {
        if self.session.is_none() {
            return;
        }
        tracing::info!("Ending cook-along session");
        self.teardown(false).await;
    }

    async fn teardown(&mut self, graceful: bool) {
        if let Some(mut listener) = self.listener.take() {
            listener.stop().await;
        }
        for alert in self.alerts.drain(..) {
            alert.abort();
        }
        self.narrator.stop().await;

        let cancelled = self.timers.cancel_all();
        self.timers.clear();
        while self.listener_rx.try_recv().is_ok() {}
        while self.timer_events.try_recv().is_ok() {}
        self.last_command_at = None;

        let session = self.session.take();
        if self.machine.phase().has_session() {
            if let Err(e) = self.transition(PhaseEvent::Ended) {
                tracing::warn!("Resetting session phase: {}", e);
                self.machine.reset();
            }
        }

        if let Some(session) = session {
            tracing::info!(
                "Cook-along for '{}' ended after {} minutes ({} timers cancelled)",
                session.recipe.title,
                (Utc::now() - session.started_at).num_minutes(),
                cancelled
            );
            self.emit(SessionEvent::Exited {
                recipe_id: session.recipe.id,
                graceful,
            });
            self.exits += 1;
        }
        self.publish();
    }

    /// Start hands-free listening. Returns whether it is now on.
    pub async fn enable_hands_free(&mut self) -> bool {
        if self.session.is_none() {
            tracing::warn!("Hands-free mode needs an active session");
            return false;
        }
        if self.listener.is_some() {
            return true;
        }

        match self.input.initialize().await {
            Ok(true) => {}
            Ok(false) => {
                self.hands_free_unavailable("speech recognition is not available".to_string());
                return false;
            }
            Err(e) => {
                self.hands_free_unavailable(e.to_string());
                return false;
            }
        }

        self.listener = Some(ListenerHandle::spawn(
            self.input.clone(),
            self.config.listening.clone(),
            self.narrator.subscribe_speaking(),
            self.listener_tx.clone(),
        ));
        tracing::info!("Hands-free listening enabled");
        self.publish();
        true
    }

    /// Stop hands-free listening; the session continues in manual mode
    pub async fn disable_hands_free(&mut self) {
        if let Some(mut listener) = self.listener.take() {
            listener.stop().await;
            tracing::info!("Hands-free listening disabled");
            self.emit(SessionEvent::HandsFreeDisabled {
                reason: "turned off".to_string(),
            });
        }
        self.publish();
    }

    fn hands_free_unavailable(&mut self, reason: String) {
        tracing::warn!("Hands-free mode unavailable: {}", reason);
        self.emit(SessionEvent::HandsFreeDisabled { reason });
        self.publish();
    }

    async fn on_listener_failed(&mut self, error: SpeechInputError) {
        let Some(mut listener) = self.listener.take() else {
            return;
        };
        listener.stop().await;
        tracing::warn!("Speech recognition failed, continuing without hands-free: {}", error);
        self.emit(SessionEvent::HandsFreeDisabled {
            reason: error.to_string(),
        });
        self.say(script::LISTENING_UNAVAILABLE, MessageKind::SystemNotification)
            .await;
    }

    fn on_timer_event(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick {
                id,
                step_number,
                remaining,
            } => {
                self.emit(SessionEvent::TimerTick {
                    id,
                    step_number,
                    remaining_seconds: remaining.as_secs_f64().ceil() as u64,
                });
                self.publish();
            }
            TimerEvent::Finished {
                id,
                step_number,
                description,
            } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                tracing::info!("Timer for step {} finished", step_number);
                let text = script::timer_finished(step_number);
                session.push_message(ChatMessage::assistant(MessageKind::TimerAlert, text.clone()));
                self.emit(SessionEvent::TimerFinished {
                    id,
                    step_number,
                    description,
                });

                // Queues behind any narration in progress
                self.alerts.retain(|alert| !alert.is_finished());
                let narrator = self.narrator.clone();
                self.alerts
                    .push(tokio::spawn(async move { narrator.narrate(&text).await }));
                self.publish();
            }
        }
    }

    async fn narrate_current_step(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let index = session.current_step_index();
        let count = session.step_count();
        let Some(text) = session.current_step_text().map(str::to_string) else {
            return;
        };

        tracing::info!("Narrating step {} of {}", index + 1, count);
        self.narrator.interrupt().await;
        self.say(&script::step(index, count, &text), MessageKind::StepNavigation)
            .await;
        self.start_step_timer(index + 1, &text).await;
    }

    /// Start a timer if the step mentions a duration and has none yet
    async fn start_step_timer(&mut self, step_number: usize, text: &str) {
        let Some(duration) = detect_duration(text) else {
            return;
        };
        if self.timers.has_timer_for_step(step_number) {
            tracing::debug!("Step {} already has a timer", step_number);
            return;
        }

        let id = self.timers.start(step_number, duration, text.to_string());
        if let Some(session) = self.session.as_mut() {
            session.record_timer(id);
        }
        tracing::info!(
            "Started {} timer for step {}",
            describe_duration(duration),
            step_number
        );

        if self.config.session.announce_timers {
            self.say(&script::timer_started(duration), MessageKind::TimerAlert)
                .await;
        }
        self.publish();
    }
}

impl Drop for CookAlongController {
    fn drop(&mut self) {
        for alert in &self.alerts {
            alert.abort();
        }
    }
}
