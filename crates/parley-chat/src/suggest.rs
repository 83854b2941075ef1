//! Follow-up suggestion generation.
//!
//! Maps a query to a fixed three-item suggestion list by substring-testing
//! an ordered set of topic keywords; first matching topic wins. Suggestions
//! are attached to the assistant message once and never mutated afterwards.

/// Ordered topic keywords with their suggestion lists.
const TOPIC_SUGGESTIONS: &[(&str, [&str; 3])] = &[
    (
        "country",
        [
            "Show me users by country",
            "Which country has the most users?",
            "How many countries do we have users in?",
        ],
    ),
    (
        "department",
        [
            "Show me users by department",
            "Which department has the most users?",
            "How many departments are there?",
        ],
    ),
    (
        "license",
        [
            "How many licensed users do we have?",
            "Show me users with Microsoft 365 licenses",
            "Which licenses are unassigned?",
        ],
    ),
    (
        "active",
        [
            "How many active users do we have?",
            "Show me inactive users",
            "What percentage of users are active?",
        ],
    ),
];

/// Suggestions shown when no topic keyword matches.
const DEFAULT_SUGGESTIONS: [&str; 3] = [
    "Show me users from India",
    "How many active users do we have?",
    "Show me users by department",
];

/// Suggestions attached to a synthesized error reply, guiding the user
/// toward question shapes the backend understands.
const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "How many users are there?",
    "Show me users by department",
    "Which countries have the most users?",
];

/// Produce the three follow-up suggestions for a query.
pub fn suggestions_for(query: &str) -> Vec<String> {
    let q = query.to_lowercase();
    for (topic, suggestions) in TOPIC_SUGGESTIONS {
        if q.contains(topic) {
            return suggestions.iter().map(|s| s.to_string()).collect();
        }
    }
    DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// The fixed suggestion list for error replies.
pub fn fallback_suggestions() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}
