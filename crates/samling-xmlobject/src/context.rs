#![forbid(unsafe_code)]

//! Parse state threaded from an element to its descendants.

use std::collections::HashMap;

/// A stack of key/value frames, one per element being unmarshalled.
///
/// A value inserted while an element is being built is visible to that
/// element's descendants and disappears once the element is finished.
#[derive(Debug, Default)]
pub struct ContextMap {
    frames: Vec<HashMap<String, String>>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.frames.pop();
    }

    /// The innermost value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(key))
            .map(String::as_str)
    }

    /// Store `value` in the current scope.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(key.into(), value.into());
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
