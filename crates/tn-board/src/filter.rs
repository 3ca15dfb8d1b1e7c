//! Task filtering
//!
//! Pure functions applied to the freshly loaded task set on every
//! reconciliation pass, before grouping and sorting.

use tn_core::Task;

/// Sentinel category selection meaning "no filtering"
pub const CATEGORY_ALL: &str = "all";

/// Sentinel category selection matching tasks without a category
pub const CATEGORY_NONE: &str = "none";

/// Apply the category filter
///
/// An empty selection or one containing [`CATEGORY_ALL`] passes everything.
/// Otherwise a task passes if any of its comma-separated category ids is
/// selected, or if it has no category at all and [`CATEGORY_NONE`] is
/// selected.
#[must_use]
pub fn filter_by_categories(tasks: Vec<Task>, selected: &[String]) -> Vec<Task> {
    if selected.is_empty() || selected.iter().any(|s| s == CATEGORY_ALL) {
        return tasks;
    }

    tasks
        .into_iter()
        .filter(|task| {
            let ids: Vec<&str> = task
                .category_id
                .as_deref()
                .unwrap_or_default()
                .split(',')
                .filter(|id| !id.is_empty())
                .collect();
            if ids.is_empty() {
                selected.iter().any(|s| s == CATEGORY_NONE)
            } else {
                ids.iter().any(|id| selected.iter().any(|s| s == id))
            }
        })
        .collect()
}

/// Apply the keyword search
///
/// The keyword is split on whitespace; a task passes only if **every** term
/// is a case-insensitive substring of its title and note combined (AND
/// semantics across terms). An empty keyword passes everything.
#[must_use]
pub fn filter_by_search(tasks: Vec<Task>, keyword: &str) -> Vec<Task> {
    let terms: Vec<String> = keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();
    if terms.is_empty() {
        return tasks;
    }

    tasks
        .into_iter()
        .filter(|task| {
            let haystack = format!(
                "{} {}",
                task.title,
                task.note.as_deref().unwrap_or_default()
            )
            .to_lowercase();
            terms.iter().all(|term| haystack.contains(term))
        })
        .collect()
}
