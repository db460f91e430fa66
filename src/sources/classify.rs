//! Rule-based conversation-type classifier (§4.4, comprehensive mode
//! only). A pure function of message content; ties resolve by the fixed
//! priority order in [`PRIORITY_ORDER`].

use crate::types::{ConversationType, Message};

const PRIORITY_ORDER: &[ConversationType] = &[
    ConversationType::Architecture,
    ConversationType::Debugging,
    ConversationType::ProblemSolving,
    ConversationType::CodeDiscussion,
    ConversationType::Technical,
];

const KEYWORDS: &[(ConversationType, &[&str])] = &[
    (
        ConversationType::Architecture,
        &["architecture", "design pattern", "system design", "microservice", "scalability", "module boundary"],
    ),
    (
        ConversationType::Debugging,
        &["bug", "error", "exception", "stack trace", "crash", "traceback", "doesn't work", "not working", "fails"],
    ),
    (
        ConversationType::ProblemSolving,
        &["how do i", "how can i", "what's the best way", "approach", "solve", "figure out"],
    ),
    (
        ConversationType::CodeDiscussion,
        &["refactor", "function", "class", "variable", "implementation", "code review"],
    ),
    (
        ConversationType::Technical,
        &["algorithm", "performance", "optimization", "database", "api", "protocol"],
    ),
];

/// Classifies a conversation's messages into a [`ConversationType`],
/// scanning for keyword sets and breaking ties by [`PRIORITY_ORDER`].
/// Returns [`ConversationType::General`] when nothing matches.
#[must_use]
pub fn classify(messages: &[Message]) -> ConversationType {
    let text = messages
        .iter()
        .map(|m| m.content.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut scores: Vec<(ConversationType, usize)> = KEYWORDS
        .iter()
        .map(|(kind, keywords)| {
            let hits = keywords.iter().filter(|kw| text.contains(*kw)).count();
            (*kind, hits)
        })
        .collect();

    scores.retain(|(_, hits)| *hits > 0);
    if scores.is_empty() {
        return ConversationType::General;
    }

    let max_hits = scores.iter().map(|(_, hits)| *hits).max().unwrap_or(0);
    scores.retain(|(_, hits)| *hits == max_hits);

    for kind in PRIORITY_ORDER {
        if scores.iter().any(|(k, _)| k == kind) {
            return *kind;
        }
    }
    scores.first().map_or(ConversationType::General, |(k, _)| *k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn msg(content: &str) -> Message {
        Message { role: Role::User, content: content.to_string(), timestamp: None, metadata: Default::default() }
    }

    #[test]
    fn classifies_debugging_conversation() {
        let messages = vec![msg("I'm getting a stack trace when the server crashes")];
        assert_eq!(classify(&messages), ConversationType::Debugging);
    }

    #[test]
    fn classifies_architecture_conversation() {
        let messages = vec![msg("What's a good system design for this microservice?")];
        assert_eq!(classify(&messages), ConversationType::Architecture);
    }

    #[test]
    fn falls_back_to_general_with_no_keyword_matches() {
        let messages = vec![msg("thanks, that helps a lot")];
        assert_eq!(classify(&messages), ConversationType::General);
    }

    #[test]
    fn ties_break_by_priority_order() {
        // "error" hits Debugging once; "refactor" hits CodeDiscussion once — tie.
        let messages = vec![msg("error while trying to refactor this function")];
        assert_eq!(classify(&messages), ConversationType::Debugging);
    }
}
