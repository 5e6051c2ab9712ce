//! Categorical encoding
//!
//! `fit` collects the distinct values and assigns codes in sorted order;
//! `apply` looks a value up. Missing and unseen values share [`UNKNOWN_CODE`].

use serde::Serialize;
use std::collections::BTreeMap;

/// Code used for missing values and values not seen by `fit`
pub const UNKNOWN_CODE: i64 = -1;

/// Deterministic string to integer encoder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoricalEncoder {
    codes: BTreeMap<String, i64>,
}

impl CategoricalEncoder {
    /// Learn the code table from a column of optional values
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut codes: BTreeMap<String, i64> = values
            .into_iter()
            .flatten()
            .map(|v| (v.to_string(), 0))
            .collect();

        for (code, slot) in codes.values_mut().enumerate() {
            *slot = code as i64;
        }

        Self { codes }
    }

    /// Encode one value
    pub fn apply(&self, value: Option<&str>) -> i64 {
        value
            .and_then(|v| self.codes.get(v).copied())
            .unwrap_or(UNKNOWN_CODE)
    }

    /// Reverse lookup of a code
    pub fn label(&self, code: i64) -> Option<&str> {
        self.codes
            .iter()
            .find(|(_, c)| **c == code)
            .map(|(label, _)| label.as_str())
    }

    /// The learned mapping, ordered by label
    pub fn mapping(&self) -> &BTreeMap<String, i64> {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
