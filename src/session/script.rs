//! What the assistant says

use crate::recipe::Recipe;
use crate::timers::describe_duration;
use std::time::Duration;

pub const HELP: &str = "You can say next, back, repeat, pause or resume. \
    Ask me anything about the recipe and I'll do my best to answer. \
    Say stop listening to turn off hands-free mode, or exit when you're done.";

pub const PAUSED: &str = "Paused. Say resume when you're ready to carry on.";

pub const GOODBYE: &str = "Happy cooking, goodbye!";

pub const ALREADY_FIRST_STEP: &str = "You're already at the first step.";

pub const START_HINT: &str = "Say start when you're ready to begin.";

pub const RESUME_HINT: &str = "We're paused. Say resume to carry on.";

pub const COMPLETED_HINT: &str = "The recipe is finished. Say exit when you're done.";

pub const HANDS_FREE_OFF: &str = "Hands-free listening is off.";

pub const LISTENING_UNAVAILABLE: &str =
    "I can't hear you right now, so hands-free mode is off. You can still control the session manually.";

/// Greeting spoken when a session starts
pub fn welcome(recipe: &Recipe) -> String {
    let steps = match recipe.step_count() {
        1 => "There's one step".to_string(),
        n => format!("There are {} steps", n),
    };
    let mut text = format!("Welcome! Let's cook {}. {}", recipe.title, steps);
    if let Some(servings) = recipe.servings {
        text.push_str(&format!(" and it serves {}", servings));
    }
    text.push('.');

    if !recipe.ingredients.is_empty() {
        let lines: Vec<String> = recipe.ingredients.iter().map(|i| i.display_line()).collect();
        text.push_str(&format!(" You'll need {}.", join_spoken(&lines)));
    }

    text.push_str(" Say start when you're ready, or help to hear what I can do.");
    text
}

/// Narration for a step at a 0-based index
pub fn step(index: usize, count: usize, text: &str) -> String {
    if index + 1 == count && count > 1 {
        format!("Last step. {}", text.trim())
    } else {
        format!("Step {} of {}. {}", index + 1, count, text.trim())
    }
}

pub fn timer_started(duration: Duration) -> String {
    format!("I've started a timer for {}.", describe_duration(duration))
}

pub fn timer_finished(step_number: usize) -> String {
    format!("Time's up! The timer for step {} has finished.", step_number)
}

pub fn completion(recipe: &Recipe) -> String {
    format!(
        "That's everything. Your {} is ready, enjoy! Say exit when you're finished.",
        recipe.title
    )
}

/// "a, b and c"
fn join_spoken(items: &[String]) -> String {
    match items.len() {
        0 => String::new(),
        1 => items[0].clone(),
        n => format!("{} and {}", items[..n - 1].join(", "), items[n - 1]),
    }
}
