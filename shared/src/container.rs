//! Typed state holder shared by every feature screen.
//!
//! Screens bind form fields by dotted path; the container routes those writes
//! through [`crate::path`] and back into the screen's typed state, so a bad
//! path or a value of the wrong shape is reported instead of corrupting it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::path::{self, FieldPath, PathError};
use crate::tags::{self, SelectionError};
use crate::UnixTimeMs;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("value at `{path}` does not fit the state shape: {source}")]
    Shape {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{path}` is not a field of this state")]
    Unmapped { path: String },

    #[error("`{path}` is not a list of strings")]
    NotAStringList { path: String },

    #[error("state could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateContainer<T> {
    state: T,
    initial: T,
    revision: u64,
}

impl<T: Default + Clone> Default for StateContainer<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> StateContainer<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            state: initial.clone(),
            initial,
            revision: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> &T {
        &self.state
    }

    /// Bumped once per successful mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    pub fn replace(&mut self, state: T) {
        self.state = state;
        self.revision += 1;
    }

    /// Typed mutation for operations that are not plain field writes
    /// (adding list entries, committing drafts).
    pub fn modify<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let out = f(&mut self.state);
        self.revision += 1;
        out
    }

    /// Runs a fallible edit against a copy; the state and revision change only
    /// when `f` succeeds.
    pub fn try_modify<R, E>(&mut self, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E> {
        let mut draft = self.state.clone();
        let out = f(&mut draft)?;
        self.replace(draft);
        Ok(out)
    }

    /// Restores the state the container was created with.
    pub fn reset(&mut self) {
        self.state = self.initial.clone();
        self.revision += 1;
    }
}

impl<T> StateContainer<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn snapshot(&self) -> Result<Value, StateError> {
        serde_json::to_value(&self.state).map_err(StateError::Encode)
    }

    pub fn get(&self, path: &str) -> Result<Option<Value>, StateError> {
        let path = FieldPath::parse(path)?;
        Ok(path::get(&self.snapshot()?, &path).cloned())
    }

    pub fn update(&mut self, path: &str, value: impl Serialize) -> Result<(), StateError> {
        self.update_at(path, value, UnixTimeMs::now())
    }

    /// Writes `value` at `path`. The state is replaced only if the new tree
    /// deserializes into `T` and the written value survives the round trip.
    pub fn update_at(
        &mut self,
        path: &str,
        value: impl Serialize,
        now: UnixTimeMs,
    ) -> Result<(), StateError> {
        let state = self.write(path, value, now)?;
        self.replace(state);
        Ok(())
    }

    /// Like [`update`](Self::update), but `normalize` sees the written state
    /// before it is committed and may repair it or reject the write.
    pub fn update_normalized(
        &mut self,
        path: &str,
        value: impl Serialize,
        normalize: impl FnOnce(&mut T) -> Result<(), StateError>,
    ) -> Result<(), StateError> {
        let mut state = self.write(path, value, UnixTimeMs::now())?;
        normalize(&mut state)?;
        self.replace(state);
        Ok(())
    }

    fn write(&self, path: &str, value: impl Serialize, now: UnixTimeMs) -> Result<T, StateError> {
        let path = FieldPath::parse(path)?;
        let value = serde_json::to_value(value).map_err(StateError::Encode)?;

        let next = path::set(&self.snapshot()?, &path, value.clone(), now)?;
        let state: T = serde_json::from_value(next).map_err(|source| StateError::Shape {
            path: path.to_string(),
            source,
        })?;

        let committed = serde_json::to_value(&state).map_err(StateError::Encode)?;
        if !path::get(&committed, &path).is_some_and(|stored| same_value(stored, &value)) {
            return Err(StateError::Unmapped {
                path: path.to_string(),
            });
        }
        Ok(state)
    }

    /// Toggles `item` in the string list at `path`; a missing list counts as
    /// empty and duplicates written through `update` are collapsed first.
    /// Returns whether `item` is selected afterwards.
    pub fn toggle_list_field(&mut self, path: &str, item: &str) -> Result<bool, StateError> {
        let current = self.string_list(path)?;
        let next = tags::toggle(&current, item);
        let selected = tags::is_selected(&next, item);
        self.update(path, next)?;
        Ok(selected)
    }

    pub fn toggle_list_field_bounded(
        &mut self,
        path: &str,
        item: &str,
        max: usize,
    ) -> Result<bool, StateError> {
        let current = self.string_list(path)?;
        let next = tags::toggle_bounded(&current, item, max)?;
        let selected = tags::is_selected(&next, item);
        self.update(path, next)?;
        Ok(selected)
    }

    fn string_list(&self, path: &str) -> Result<Vec<String>, StateError> {
        match self.get(path)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    _ => Err(StateError::NotAStringList {
                        path: path.to_owned(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|list| tags::dedup(&list)),
            Some(_) => Err(StateError::NotAStringList {
                path: path.to_owned(),
            }),
        }
    }
}

/// Structural equality that treats `150` and `150.0` as the same number, since
/// typed numeric fields re-encode integers written into floats.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_value(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| same_value(x, y)))
        }
        _ => a == b,
    }
}
