//! Label encoding for categorical columns
//!
//! Codes follow sorted (byte-wise lexicographic) order of the distinct
//! values, so fitting the same set twice always yields the same codes.

use std::collections::{BTreeMap, BTreeSet};

use crate::errors::UnknownCategoryError;

/// Bidirectional mapping between category strings and dense codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    category: String,
    classes: Vec<String>,
    index: BTreeMap<String, u32>,
}

impl LabelEncoder {
    /// Fit on every value; duplicates collapse to one class.
    pub fn fit<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();

        let classes: Vec<String> = distinct.into_iter().collect();
        let index = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as u32))
            .collect();

        Self {
            category: "category".to_string(),
            classes,
            index,
        }
    }

    /// Name used in error messages, e.g. "soil type"
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Code for a value seen during fit (exact, case-sensitive match)
    pub fn encode(&self, value: &str) -> Result<u32, UnknownCategoryError> {
        self.index
            .get(value)
            .copied()
            .ok_or_else(|| UnknownCategoryError {
                category: self.category.clone(),
                value: value.to_string(),
            })
    }

    /// Value for a code
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.classes.get(code as usize).map(String::as_str)
    }

    /// Vocabulary in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
