//! Integer encoding of biscuit labels.

use crate::error::{Error, Result};

/// Bijection between a closed label set and `0..n`.
///
/// # Invariants
///
/// - `classes` has no duplicates.
/// - `decode(encode(x)) == x` for every label in the set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Encodes labels by their position in the sorted unique label list.
    ///
    /// Fitting twice on the same labels (in any order) yields the same
    /// integers.
    ///
    /// # Examples
    ///
    /// ```
    /// use dunk_analytics::classify::LabelEncoder;
    ///
    /// let enc = LabelEncoder::fit(&["Rich Tea", "Digestive", "Hobnob", "Digestive"]);
    /// assert_eq!(enc.encode("Digestive").unwrap(), 0);
    /// assert_eq!(enc.encode("Rich Tea").unwrap(), 2);
    /// assert_eq!(enc.decode(1).unwrap(), "Hobnob");
    /// ```
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut classes: Vec<String> = labels.iter().map(|s| s.as_ref().to_string()).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encodes labels by their position in an explicit ordering.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the ordering repeats a label.
    pub fn with_order<S: AsRef<str>>(order: &[S]) -> Result<Self> {
        let classes: Vec<String> = order.iter().map(|s| s.as_ref().to_string()).collect();
        for (i, c) in classes.iter().enumerate() {
            if classes[..i].contains(c) {
                return Err(Error::Config(format!("label '{c}' appears twice in ordering")));
            }
        }
        Ok(Self { classes })
    }

    /// Labels in code order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns `true` if there are no classes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Code for one label.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownLabel`] if the label is not in the set.
    pub fn encode(&self, label: &str) -> Result<usize> {
        self.classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| Error::UnknownLabel {
                label: label.to_string(),
                known: self.classes.clone(),
            })
    }

    /// Codes for a column of labels.
    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Label for one code.
    pub fn decode(&self, code: usize) -> Result<&str> {
        self.classes
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| Error::invalid(format!("label code {code} out of range 0..{}", self.len())))
    }

    /// Labels for a column of codes.
    pub fn decode_all(&self, codes: &[usize]) -> Result<Vec<String>> {
        codes
            .iter()
            .map(|&c| self.decode(c).map(str::to_string))
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn encode_decode_round_trip(
            labels in proptest::collection::vec("[a-e]{1,3}", 1..=40)
        ) {
            let enc = LabelEncoder::fit(&labels);
            let codes = enc.encode_all(&labels).expect("all labels known");
            for &c in &codes {
                prop_assert!(c < enc.len());
            }
            let decoded = enc.decode_all(&codes).expect("codes in range");
            prop_assert_eq!(decoded, labels.clone());

            // re-deriving reproduces the same integers
            let again = LabelEncoder::fit(&labels).encode_all(&labels).expect("known");
            prop_assert_eq!(again, codes);
        }

        #[test]
        fn codes_are_a_bijection(
            labels in proptest::collection::btree_set("[a-z]{1,4}", 1..=10)
        ) {
            let labels: Vec<String> = labels.into_iter().collect();
            let enc = LabelEncoder::fit(&labels);
            let mut codes = enc.encode_all(&labels).expect("known");
            codes.sort_unstable();
            prop_assert_eq!(codes, (0..labels.len()).collect::<Vec<_>>());
        }
    }
}
