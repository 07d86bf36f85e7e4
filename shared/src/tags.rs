//! Multi-select chip behaviour for "pick N options" fields.

use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("at most {max} options can be selected")]
    LimitReached { max: usize },
}

/// Adds `item` when absent, otherwise removes its first occurrence.
#[must_use]
pub fn toggle(list: &[String], item: &str) -> Vec<String> {
    match list.iter().position(|existing| existing == item) {
        Some(index) => {
            let mut next = Vec::with_capacity(list.len() - 1);
            next.extend_from_slice(&list[..index]);
            next.extend_from_slice(&list[index + 1..]);
            next
        }
        None => {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.extend_from_slice(list);
            next.push(item.to_owned());
            next
        }
    }
}

/// Like [`toggle`], but refuses to grow the selection beyond `max`.
/// Deselecting always succeeds.
pub fn toggle_bounded(list: &[String], item: &str, max: usize) -> Result<Vec<String>, SelectionError> {
    let selected = list.iter().any(|existing| existing == item);
    if !selected && list.len() >= max {
        return Err(SelectionError::LimitReached { max });
    }
    Ok(toggle(list, item))
}

#[must_use]
pub fn is_selected(list: &[String], item: &str) -> bool {
    list.iter().any(|existing| existing == item)
}

/// Drops repeated entries, keeping the first occurrence of each.
#[must_use]
pub fn dedup(list: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(list.len());
    list.iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Restores tag-set form on a list written wholesale: duplicates collapse to
/// their first occurrence, then the result must fit within `max`.
pub fn normalize(list: &mut Vec<String>, max: Option<usize>) -> Result<(), SelectionError> {
    let unique = dedup(list);
    if let Some(max) = max.filter(|&max| unique.len() > max) {
        return Err(SelectionError::LimitReached { max });
    }
    *list = unique;
    Ok(())
}
