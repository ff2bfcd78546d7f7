//! Answer grading.

use lingoforge_protocol::{Card, Direction};

/// Canonical form used for comparison: trimmed, lowercased, inner
/// whitespace collapsed to single spaces, trailing `.`, `!` and `?` dropped.
pub fn normalize_answer(text: &str) -> String {
    let collapsed = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['.', '!', '?'])
        .trim_end()
        .to_string()
}

/// Whether `response` is an accepted answer for `card` in `direction`.
///
/// The expected side may list alternatives separated by `/` or `;`
/// (`"hello / hi"`); matching any one of them counts. The whole text is
/// also accepted, so answers with a literal slash (`"24/7"`) still match.
pub fn grade(card: &Card, direction: Direction, response: &str) -> bool {
    let given = normalize_answer(response);
    if given.is_empty() {
        return false;
    }
    let expected = card.expected(direction);
    if normalize_answer(expected) == given {
        return true;
    }
    expected
        .split(['/', ';'])
        .map(normalize_answer)
        .any(|alt| !alt.is_empty() && alt == given)
}
