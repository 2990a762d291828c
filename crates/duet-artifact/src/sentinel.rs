//! Sentinel phrases recognized in completion text

/// Reviewer phrase that accepts the code
pub const ACCEPTANCE_PHRASE: &str = "the code is correct";

/// Test-command phrase that opts out of execution
pub const NOT_APPLICABLE_PHRASE: &str = "cannot unit-test";

/// Whether a review accepts the code
///
/// Case-insensitive substring match, so a sentence such as
/// "I believe the code is correct, but..." still counts.
#[inline]
#[must_use]
pub fn is_accepted(review: &str) -> bool {
    contains_phrase(review, ACCEPTANCE_PHRASE)
}

/// Whether a test-command response declines to test
#[inline]
#[must_use]
pub fn is_not_applicable(response: &str) -> bool {
    contains_phrase(response, NOT_APPLICABLE_PHRASE)
}

fn contains_phrase(text: &str, phrase: &str) -> bool {
    text.to_lowercase().contains(phrase)
}
