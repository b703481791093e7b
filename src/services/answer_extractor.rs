use regex::Regex;
use std::sync::OnceLock;

use crate::models::question::AnswerLetter;

static ANSWER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn answer_pattern() -> &'static Regex {
    ANSWER_PATTERN.get_or_init(|| {
        // `regex` has no lookahead: the trailing group stands in for `(?=:|$)`.
        Regex::new(r"^(?:Option\s)?([A-D])(?::|$)").expect("answer pattern is valid")
    })
}

/// Reads the answer letter at the start of a completion.
///
/// Accepts `B`, `B: ...` and `Option B`/`Option B: ...` after trimming.
/// Anything else (lowercase, extra leading words, no letter) is `None`.
pub fn extract_answer(completion: &str) -> Option<AnswerLetter> {
    let caps = answer_pattern().captures(completion.trim())?;
    caps.get(1)?.as_str().parse().ok()
}
