use std::collections::HashSet;

use crate::engine::ModelKind;
use crate::models::IgnoredKeys;

use super::normalizer::KeyNormalizer;

/// Marker line that opens the re-ranked section in model C output.
pub const MODEL_C_MARKER: &str = "LLM re-ranked recommendations:";

/// Maximum number of candidates accepted from the model C section.
pub const MODEL_C_MAX_RESULTS: usize = 8;

/// Extracts the prediction set for the given model variant.
///
/// Candidates are normalized, candidates equal to an ignored metadata key
/// are dropped, and the result is ordered by first occurrence with
/// duplicates removed. Output that contains no recognizable
/// recommendations yields an empty set, never an error; the record is still
/// scored against the empty prediction.
pub fn extract(model: ModelKind, output: &str, ignored: &IgnoredKeys) -> Vec<String> {
    match model {
        ModelKind::A => extract_model_a(output, ignored),
        ModelKind::C => extract_model_c(output, ignored),
    }
}

/// Model A: every line carrying a `[<index>] <tag>` entry contributes the
/// full remainder of the line, trimmed. The count is unbounded.
pub fn extract_model_a(output: &str, ignored: &IgnoredKeys) -> Vec<String> {
    let mut predictions = Vec::new();
    let mut seen = HashSet::new();

    for line in output.lines() {
        let Some(rest) = after_rank_marker(line).and_then(|r| r.strip_prefix(' ')) else {
            continue;
        };
        let key = KeyNormalizer::normalize(rest);
        if !key.is_empty() && !ignored.contains(&key) && seen.insert(key.clone()) {
            predictions.push(key);
        }
    }

    predictions
}

/// Scanning state for the model C output walk.
enum ScanState {
    BeforeMarker,
    InSection,
}

/// Model C: only lines after the literal marker line are considered. Each
/// `[<index>]` line in the section contributes its first
/// whitespace-delimited token; the scan stops after
/// [`MODEL_C_MAX_RESULTS`] accepted candidates or at the first blank line
/// inside the section. A missing marker yields an empty set.
pub fn extract_model_c(output: &str, ignored: &IgnoredKeys) -> Vec<String> {
    let mut state = ScanState::BeforeMarker;
    let mut predictions = Vec::new();
    let mut seen = HashSet::new();

    for line in output.lines() {
        match state {
            ScanState::BeforeMarker => {
                if line.contains(MODEL_C_MARKER) {
                    state = ScanState::InSection;
                }
            }
            ScanState::InSection => {
                if predictions.len() >= MODEL_C_MAX_RESULTS {
                    break;
                }
                if let Some(rest) = after_rank_marker(line) {
                    let Some(token) = rest.split_whitespace().next() else {
                        continue;
                    };
                    let key = KeyNormalizer::normalize(token);
                    if !key.is_empty() && !ignored.contains(&key) && seen.insert(key.clone()) {
                        predictions.push(key);
                    }
                } else if line.trim().is_empty() {
                    break;
                }
            }
        }
    }

    predictions
}

/// Finds the first `[<index>]` marker in the line and returns the text that
/// follows it. The index may carry leading spaces inside the brackets
/// (`[ 3]`), matching the engine's ranked-list format.
fn after_rank_marker(line: &str) -> Option<&str> {
    let mut search = line;
    while let Some(open) = search.find('[') {
        let inside = &search[open + 1..];
        let digits_on = inside.trim_start_matches(' ');
        let digit_count = digits_on.chars().take_while(char::is_ascii_digit).count();
        if digit_count > 0
            && let Some(rest) = digits_on[digit_count..].strip_prefix(']')
        {
            return Some(rest);
        }
        search = inside;
    }
    None
}
