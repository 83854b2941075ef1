//! Query classification and artifact eligibility.
//!
//! Maps raw query text to a presentation behavior by substring matching
//! against three ordered phrase sets. The check order is part of the
//! contract: a query matching more than one set is classified by whichever
//! set is checked first.

use parley_core::types::BehaviorClass;

/// Simple/count phrases. Checked first; the answer text alone suffices.
const SIMPLE_PHRASES: &[&str] = &[
    "how many",
    "is there",
    "are there",
    "do we have",
    "what percentage",
    "what's the count",
    "total number",
];

/// Superlative/identity phrases. Checked second; the panel opens briefly.
const BRIEF_PHRASES: &[&str] = &[
    "who is",
    "which",
    "has the most",
    "most users",
    "highest",
    "lowest",
    "cheapest",
    "top ",
];

/// Listing/analysis phrases. Checked last; the panel opens and stays.
const LISTING_PHRASES: &[&str] = &[
    "show me",
    "list",
    "find",
    "all users",
    "give me",
    "breakdown",
    "by department",
    "by country",
    "compare",
    "distribution",
];

/// Keywords that make a reply artifact-eligible regardless of size.
const ARTIFACT_KEYWORDS: &[&str] = &["export", "download", "report", "csv", "full list"];

/// Result sets larger than this are artifact-eligible regardless of keywords.
const ARTIFACT_ROW_THRESHOLD: usize = 50;

/// Classify a raw query into its presentation behavior.
///
/// First match wins across the three phrase sets in fixed precedence:
/// simple/count, then superlative/identity, then listing/analysis.
/// A query matching none of them is `AutoDecide`, resolved later by
/// result-row count.
pub fn classify(query: &str) -> BehaviorClass {
    let q = query.to_lowercase();

    if SIMPLE_PHRASES.iter().any(|p| q.contains(p)) {
        return BehaviorClass::NoSidebar;
    }
    if BRIEF_PHRASES.iter().any(|p| q.contains(p)) {
        return BehaviorClass::BriefShow;
    }
    if LISTING_PHRASES.iter().any(|p| q.contains(p)) {
        return BehaviorClass::ShowSidebar;
    }
    BehaviorClass::AutoDecide
}

/// Whether a reply qualifies for artifact mode (full set + export).
///
/// True when the query carries an export/download/report keyword, or the
/// result set exceeds [`ARTIFACT_ROW_THRESHOLD`] rows. Computed alongside,
/// and independently of, the behavior class.
pub fn artifact_eligible(query: &str, row_count: usize) -> bool {
    if row_count > ARTIFACT_ROW_THRESHOLD {
        return true;
    }
    let q = query.to_lowercase();
    ARTIFACT_KEYWORDS.iter().any(|k| q.contains(k))
}

/// Resolve whether a behavior class shows the panel for a given row count.
///
/// `AutoDecide` falls back to the row-count threshold: small result sets
/// behave as visible, larger ones stay hidden.
pub fn panel_visible(behavior: BehaviorClass, row_count: usize, auto_decide_threshold: usize) -> bool {
    match behavior {
        BehaviorClass::NoSidebar => false,
        BehaviorClass::BriefShow | BehaviorClass::ShowSidebar => true,
        BehaviorClass::AutoDecide => row_count <= auto_decide_threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Simple/count ----

    #[test]
    fn test_how_many_is_no_sidebar() {
        assert_eq!(
            classify("How many users do we have?"),
            BehaviorClass::NoSidebar
        );
    }

    #[test]
    fn test_percentage_is_no_sidebar() {
        assert_eq!(
            classify("What percentage of users are active?"),
            BehaviorClass::NoSidebar
        );
    }

    #[test]
    fn test_is_there_is_no_sidebar() {
        assert_eq!(
            classify("Is there anyone in the Paris office?"),
            BehaviorClass::NoSidebar
        );
    }

    // ---- Superlative/identity ----

    #[test]
    fn test_which_most_is_brief_show() {
        assert_eq!(
            classify("Which country has the most users"),
            BehaviorClass::BriefShow
        );
    }

    #[test]
    fn test_who_is_brief_show() {
        assert_eq!(classify("Who is the newest hire?"), BehaviorClass::BriefShow);
    }

    #[test]
    fn test_highest_is_brief_show() {
        assert_eq!(
            classify("highest license utilization by team"),
            BehaviorClass::BriefShow
        );
    }

    // ---- Listing/analysis ----

    #[test]
    fn test_show_me_is_show_sidebar() {
        assert_eq!(
            classify("Show me users from India"),
            BehaviorClass::ShowSidebar
        );
    }

    #[test]
    fn test_breakdown_is_show_sidebar() {
        assert_eq!(
            classify("breakdown by department"),
            BehaviorClass::ShowSidebar
        );
    }

    // ---- Precedence: first match wins ----

    #[test]
    fn test_count_phrase_beats_brief_phrase() {
        // Matches both "how many" (simple) and "which" (brief); the simple
        // set is checked first.
        assert_eq!(
            classify("How many users are in which country?"),
            BehaviorClass::NoSidebar
        );
    }

    #[test]
    fn test_brief_phrase_beats_listing_phrase() {
        // Matches both "which" (brief) and "list" (listing).
        assert_eq!(
            classify("which license list is unassigned"),
            BehaviorClass::BriefShow
        );
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("HOW MANY USERS?"), BehaviorClass::NoSidebar);
        assert_eq!(classify("SHOW ME everyone"), BehaviorClass::ShowSidebar);
    }

    // ---- Fallback ----

    #[test]
    fn test_unmatched_query_is_auto_decide() {
        assert_eq!(classify("users in engineering"), BehaviorClass::AutoDecide);
    }

    // ---- Artifact eligibility ----

    #[test]
    fn test_export_keyword_is_eligible() {
        assert!(artifact_eligible("export full list", 3));
        assert!(artifact_eligible("can I download this", 1));
        assert!(artifact_eligible("build a report of users", 0));
    }

    #[test]
    fn test_large_result_is_eligible_without_keyword() {
        assert!(artifact_eligible("users in engineering", 51));
        assert!(artifact_eligible("users in engineering", 200));
    }

    #[test]
    fn test_fifty_rows_is_not_eligible() {
        // Strictly greater than 50
        assert!(!artifact_eligible("users in engineering", 50));
    }

    #[test]
    fn test_small_result_without_keyword_not_eligible() {
        assert!(!artifact_eligible("show me users from India", 12));
    }

    // ---- Panel visibility ----

    #[test]
    fn test_no_sidebar_never_visible() {
        assert!(!panel_visible(BehaviorClass::NoSidebar, 1, 10));
        assert!(!panel_visible(BehaviorClass::NoSidebar, 100, 10));
    }

    #[test]
    fn test_visible_classes_always_visible() {
        assert!(panel_visible(BehaviorClass::BriefShow, 0, 10));
        assert!(panel_visible(BehaviorClass::ShowSidebar, 500, 10));
    }

    #[test]
    fn test_auto_decide_uses_row_threshold() {
        assert!(panel_visible(BehaviorClass::AutoDecide, 10, 10));
        assert!(!panel_visible(BehaviorClass::AutoDecide, 11, 10));
    }
}
