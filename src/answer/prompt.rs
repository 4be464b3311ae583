//! Prompt construction for recipe questions

use super::QuestionContext;
use crate::session::MessageRole;
use regex::Regex;
use std::sync::LazyLock;

/// Markdown emphasis, headings and code marks that should not be read aloud
static MARKDOWN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_#`]+").unwrap());

/// Role labels some models echo back at the start of a reply
static ROLE_PREFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(assistant|answer)\s*:\s*").unwrap());

const INSTRUCTIONS: &str = "You are a friendly cooking assistant helping someone cook hands-free. \
Your replies are read aloud, so answer in one to three short sentences of plain text. \
Do not use lists, headings or markdown. \
If the question is not about cooking, answer briefly and steer back to the recipe.";

/// System prompt carrying the recipe and the cook's progress
pub fn build_system_prompt(context: &QuestionContext) -> String {
    let recipe = &context.recipe;
    let mut prompt = format!("{}\n\nRecipe: {}\n", INSTRUCTIONS, recipe.title);

    if let Some(servings) = recipe.servings {
        prompt.push_str(&format!("Serves: {}\n", servings));
    }

    if !recipe.ingredients.is_empty() {
        prompt.push_str("Ingredients:\n");
        for ingredient in &recipe.ingredients {
            prompt.push_str(&format!("- {}\n", ingredient.display_line()));
        }
    }

    prompt.push_str("Steps:\n");
    for (i, step) in recipe.steps.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, step));
    }

    if let Some(step) = context.current_step() {
        prompt.push_str(&format!(
            "\nThe cook is on step {} of {}: {}\n",
            context.step_index + 1,
            recipe.step_count(),
            step
        ));
    }

    prompt
}

/// Conversation transcript ending with the question
pub fn build_user_prompt(context: &QuestionContext) -> String {
    let mut prompt = String::new();
    for message in &context.history {
        let speaker = match message.role {
            MessageRole::User => "Cook",
            MessageRole::Assistant => "Assistant",
            MessageRole::System => continue,
        };
        prompt.push_str(&format!("{}: {}\n", speaker, message.content.trim()));
    }
    prompt.push_str(&format!("Cook: {}\nAssistant:", context.question.trim()));
    prompt
}

/// Make a model reply fit for speech
pub fn clean_answer(text: &str) -> String {
    let text = ROLE_PREFIX_PATTERN.replace(text.trim(), "");
    let text = MARKDOWN_PATTERN.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
