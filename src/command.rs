//! Voice command interpretation
//!
//! Maps a transcript to one of a fixed set of voice commands using ordered
//! keyword groups matched on word boundaries. The first group that matches
//! wins, so the group order below is part of the behaviour:
//!
//! complete → start → next → repeat → back → pause → resume → help →
//! stop listening → exit → unknown

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// A command recognised from a spoken transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCommand {
    Next,
    Repeat,
    Back,
    Pause,
    Resume,
    Help,
    StopListening,
    Start,
    Complete,
    Exit,
    /// Nothing matched; the transcript is treated as a question
    Unknown,
}

impl VoiceCommand {
    /// Stable identifier used in logs and for debouncing
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceCommand::Next => "next",
            VoiceCommand::Repeat => "repeat",
            VoiceCommand::Back => "back",
            VoiceCommand::Pause => "pause",
            VoiceCommand::Resume => "resume",
            VoiceCommand::Help => "help",
            VoiceCommand::StopListening => "stop_listening",
            VoiceCommand::Start => "start",
            VoiceCommand::Complete => "complete",
            VoiceCommand::Exit => "exit",
            VoiceCommand::Unknown => "unknown",
        }
    }

    /// Returns whether this is a recognised command
    pub fn is_known(&self) -> bool {
        !matches!(self, VoiceCommand::Unknown)
    }
}

impl fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest utterance in which a bare keyword still counts as a command
const MAX_BARE_WORDS: usize = 3;

/// Keywords of one command group
///
/// Every keyword matches on word boundaries, so "quit" is not found in
/// "quite". Bare keywords are words that also turn up in cooking questions
/// ("how long should I wait"); they only count in short utterances.
struct Keywords {
    anywhere: &'static [&'static str],
    bare: &'static [&'static str],
}

impl Keywords {
    fn matches(&self, padded: &str, word_count: usize) -> bool {
        let found = |keywords: &[&str]| keywords.iter().any(|k| contains_phrase(padded, k));
        found(self.anywhere) || (word_count <= MAX_BARE_WORDS && found(self.bare))
    }
}

/// `padded` is the normalised text with a space on each side
fn contains_phrase(padded: &str, phrase: &str) -> bool {
    padded
        .match_indices(phrase)
        .any(|(i, _)| padded[..i].ends_with(' ') && padded[i + phrase.len()..].starts_with(' '))
}

/// Keyword groups in priority order
const GROUPS: &[(VoiceCommand, Keywords)] = &[
    (
        VoiceCommand::Complete,
        Keywords {
            anywhere: &[
                "all done",
                "i'm done",
                "im done",
                "we're done",
                "done cooking",
                "finished cooking",
            ],
            bare: &["finish", "finished", "complete", "done"],
        },
    ),
    (
        VoiceCommand::Start,
        Keywords {
            anywhere: &["start", "begin", "let's cook", "lets cook"],
            bare: &[],
        },
    ),
    (
        VoiceCommand::Next,
        Keywords {
            anywhere: &["next", "go on", "move on", "next step", "proceed"],
            bare: &["forward", "skip"],
        },
    ),
    (
        VoiceCommand::Repeat,
        Keywords {
            anywhere: &[
                "repeat",
                "say that",
                "what was that",
                "pardon",
                "one more time",
            ],
            bare: &["again"],
        },
    ),
    (
        VoiceCommand::Back,
        Keywords {
            anywhere: &["go back", "previous", "last step", "step back"],
            bare: &["back"],
        },
    ),
    (
        VoiceCommand::Pause,
        Keywords {
            anywhere: &["pause", "hold on", "hang on", "wait a minute", "wait a second"],
            bare: &["wait"],
        },
    ),
    (
        VoiceCommand::Resume,
        Keywords {
            anywhere: &["resume", "carry on", "i'm ready", "im ready"],
            bare: &["continue"],
        },
    ),
    (
        VoiceCommand::Help,
        Keywords {
            anywhere: &["what can i say", "commands"],
            bare: &["help"],
        },
    ),
    (
        VoiceCommand::StopListening,
        Keywords {
            anywhere: &["stop listening", "stop the microphone", "be quiet"],
            bare: &["mute"],
        },
    ),
    (
        VoiceCommand::Exit,
        Keywords {
            anywhere: &[
                "exit",
                "quit",
                "goodbye",
                "good bye",
                "end session",
                "stop cooking",
            ],
            bare: &[],
        },
    ),
];

/// Anything that is not a letter, digit, apostrophe or whitespace
static STRIP_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9'\s]").unwrap());

/// Lowercase, fold typographic apostrophes, drop punctuation and collapse
/// whitespace
pub fn normalise_transcript(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
    let stripped = STRIP_PATTERN.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Interpret a transcript as a voice command
///
/// Total and side-effect free: any input, including the empty string,
/// yields a command (`Unknown` when nothing matches).
pub fn interpret(text: &str) -> VoiceCommand {
    let normalised = normalise_transcript(text);
    if normalised.is_empty() {
        return VoiceCommand::Unknown;
    }

    let padded = format!(" {} ", normalised);
    let word_count = normalised.split(' ').count();
    GROUPS
        .iter()
        .find(|(_, keywords)| keywords.matches(&padded, word_count))
        .map(|(command, _)| *command)
        .unwrap_or(VoiceCommand::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(interpret(""), VoiceCommand::Unknown);
        assert_eq!(interpret("   "), VoiceCommand::Unknown);
        assert_eq!(interpret("?!"), VoiceCommand::Unknown);
    }

    #[test]
    fn test_basic_commands() {
        assert_eq!(interpret("next please"), VoiceCommand::Next);
        assert_eq!(interpret("let's start cooking"), VoiceCommand::Start);
        assert_eq!(interpret("i'm all done"), VoiceCommand::Complete);
        assert_eq!(interpret("Can you repeat that?"), VoiceCommand::Repeat);
        assert_eq!(interpret("go back"), VoiceCommand::Back);
        assert_eq!(interpret("pause"), VoiceCommand::Pause);
        assert_eq!(interpret("OK, resume"), VoiceCommand::Resume);
        assert_eq!(interpret("help"), VoiceCommand::Help);
        assert_eq!(interpret("stop listening"), VoiceCommand::StopListening);
        assert_eq!(interpret("exit"), VoiceCommand::Exit);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        assert_eq!(interpret("NEXT!"), VoiceCommand::Next);
        assert_eq!(interpret("I\u{2019}m done."), VoiceCommand::Complete);
        assert_eq!(interpret("Start."), VoiceCommand::Start);
    }

    #[test]
    fn test_complete_wins_over_later_groups() {
        // "finish" would otherwise fall through to nothing; "done with the
        // next bit" style phrases must not become navigation
        assert_eq!(interpret("we're done, go back"), VoiceCommand::Complete);
        assert_eq!(interpret("finished, next"), VoiceCommand::Complete);
    }

    #[test]
    fn test_keywords_require_whole_words() {
        assert_eq!(interpret("restart the timer"), VoiceCommand::Unknown);
        assert_eq!(interpret("starter"), VoiceCommand::Unknown);
        assert_eq!(interpret("start"), VoiceCommand::Start);
        assert_eq!(interpret("is the sauce quite thick enough?"), VoiceCommand::Unknown);
        assert_eq!(interpret("what about the backing paper?"), VoiceCommand::Unknown);
        assert_eq!(interpret("how much nutmeg is excessive"), VoiceCommand::Unknown);
        assert_eq!(interpret("quit"), VoiceCommand::Exit);
    }

    #[test]
    fn test_bare_keywords_only_in_short_utterances() {
        assert_eq!(
            interpret("how long should I wait for the onions?"),
            VoiceCommand::Unknown
        );
        assert_eq!(interpret("can I skip the white wine"), VoiceCommand::Unknown);
        assert_eq!(interpret("should I stir it again later"), VoiceCommand::Unknown);
        assert_eq!(interpret("put the lid back on the pan"), VoiceCommand::Unknown);
        assert_eq!(interpret("how do I finish the sauce"), VoiceCommand::Unknown);

        assert_eq!(interpret("OK wait"), VoiceCommand::Pause);
        assert_eq!(interpret("back please"), VoiceCommand::Back);
        assert_eq!(interpret("skip"), VoiceCommand::Next);
        assert_eq!(interpret("say it again"), VoiceCommand::Repeat);
        assert_eq!(interpret("wait a minute, the pan is smoking"), VoiceCommand::Pause);
        assert_eq!(interpret("can we go back to the roux"), VoiceCommand::Back);
    }

    #[test]
    fn test_group_order_resolves_overlap() {
        // pause is checked before resume
        assert_eq!(interpret("wait, then resume"), VoiceCommand::Pause);
        // next is checked before back
        assert_eq!(interpret("next, not back"), VoiceCommand::Next);
    }

    #[test]
    fn test_questions_are_unknown() {
        assert_eq!(
            interpret("how much salt should I add"),
            VoiceCommand::Unknown
        );
        assert_eq!(interpret("what temperature is the oven"), VoiceCommand::Unknown);
    }

    #[test]
    fn test_normalise_transcript() {
        assert_eq!(normalise_transcript("  Next,   PLEASE!  "), "next please");
        assert_eq!(normalise_transcript("I\u{2019}m"), "i'm");
    }

    #[test]
    fn test_display_and_known() {
        assert_eq!(VoiceCommand::StopListening.to_string(), "stop_listening");
        assert!(VoiceCommand::Next.is_known());
        assert!(!VoiceCommand::Unknown.is_known());
    }
}
