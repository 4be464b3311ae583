//! Cook along with a recipe in the terminal
//!
//! Usage: cookalong <recipe.json>
//!
//! Each line typed on stdin is treated as something the cook said: a voice
//! command such as "next" or "pause", or a question for the assistant.
//! Narration is printed with a `[voice]` prefix and running timers report
//! the time left once a minute.

use anyhow::Context;
use cookalong_lib::answer::OllamaAnswerService;
use cookalong_lib::logging::{default_log_dir, init_logging};
use cookalong_lib::speech::{ConsoleSpeechInput, ConsoleSpeechOutput};
use cookalong_lib::timers::format_clock;
use cookalong_lib::{ConfigStore, ControlMessage, CookAlongController, Recipe, SessionEvent};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Simulated speaking time per character
const CONSOLE_PER_CHAR: Duration = Duration::from_millis(15);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: cookalong <recipe.json>");
        std::process::exit(1);
    }

    init_logging(&default_log_dir());

    let path = PathBuf::from(&args[1]);
    let recipe =
        Recipe::load(&path).with_context(|| format!("Could not load recipe {:?}", path))?;

    let mut config = ConfigStore::default().load_or_default();
    // Typed lines are the only way to drive the session
    config.listening.hands_free = true;
    let answers = OllamaAnswerService::from_config(&config.assistant)?;
    if !answers.is_available().await {
        tracing::warn!(
            "Ollama is not reachable at {}; questions will go unanswered",
            config.assistant.base_url
        );
    }

    let mut controller = CookAlongController::new(
        config,
        Arc::new(ConsoleSpeechInput::new()),
        Arc::new(ConsoleSpeechOutput::new(CONSOLE_PER_CHAR)),
        Arc::new(answers),
    );

    let inbox = controller.inbox();
    let mut events = controller.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                // Once a minute is enough on a terminal
                SessionEvent::TimerTick {
                    step_number,
                    remaining_seconds,
                    ..
                } if remaining_seconds % 60 == 0 => println!(
                    "[timer] Step {}: {} left",
                    step_number,
                    format_clock(Duration::from_secs(remaining_seconds))
                ),
                SessionEvent::TimerFinished {
                    step_number,
                    description,
                    ..
                } => println!("[timer] Step {} finished: {}", step_number, description),
                SessionEvent::HandsFreeDisabled { reason } => {
                    // Nothing else can drive the session without stdin
                    println!("[session] Listening stopped: {}", reason);
                    let _ = inbox.send(ControlMessage::End).await;
                }
                SessionEvent::Exited { .. } => break,
                _ => {}
            }
        }
    });

    let interrupt = controller.inbox();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = interrupt.send(ControlMessage::Exit).await;
        }
    });

    controller.start_session(recipe).await?;
    controller.run().await;
    Ok(())
}
