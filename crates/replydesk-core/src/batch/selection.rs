//! Bounded, ordered message selection.

use crate::message::MessageId;
use crate::validation::ValidationError;

/// Maximum number of messages selected for one batch.
pub const MAX_SELECTION: usize = 5;

/// Messages picked for batch generation, in the order they were picked.
///
/// The bound is enforced here: selecting past it is rejected and the
/// selection stays as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<MessageId>,
    limit: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    /// Creates an empty selection bounded by [`MAX_SELECTION`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_limit(MAX_SELECTION)
    }

    /// Creates an empty selection with a custom bound.
    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            ids: Vec::new(),
            limit,
        }
    }

    /// Adds `message_id`. Returns false if it was already selected.
    ///
    /// # Errors
    ///
    /// Returns `SelectionFull` if the bound was reached.
    pub fn select(&mut self, message_id: MessageId) -> Result<bool, ValidationError> {
        if self.contains(&message_id) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(ValidationError::SelectionFull { limit: self.limit });
        }
        self.ids.push(message_id);
        Ok(true)
    }

    /// Removes `message_id`. Returns false if it was not selected.
    pub fn deselect(&mut self, message_id: &MessageId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != message_id);
        self.ids.len() != before
    }

    /// Flips `message_id`. Returns whether it is selected afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SelectionFull` when selecting past the bound.
    pub fn toggle(&mut self, message_id: MessageId) -> Result<bool, ValidationError> {
        if self.deselect(&message_id) {
            Ok(false)
        } else {
            self.select(message_id)
        }
    }

    /// Returns true if `message_id` is selected.
    #[must_use]
    pub fn contains(&self, message_id: &MessageId) -> bool {
        self.ids.contains(message_id)
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[MessageId] {
        &self.ids
    }

    /// Number of selected messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns true if no more messages can be selected.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.ids.len() >= self.limit
    }

    /// The bound.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Deselects everything.
    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sixth_selection_is_rejected() {
        let mut selection = Selection::new();
        for n in 1..=5 {
            assert!(selection.select(MessageId::new(format!("m{n}"))).unwrap());
        }

        let err = selection.select("m6".into()).unwrap_err();
        assert_eq!(err, ValidationError::SelectionFull { limit: 5 });
        assert_eq!(selection.len(), 5);
        assert!(!selection.contains(&"m6".into()));
    }

    #[test]
    fn test_reselecting_is_a_no_op() {
        let mut selection = Selection::with_limit(1);
        assert!(selection.select("m1".into()).unwrap());
        assert!(!selection.select("m1".into()).unwrap());
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn test_order_is_kept() {
        let mut selection = Selection::new();
        for id in ["m3", "m1", "m2"] {
            selection.select(id.into()).unwrap();
        }
        selection.deselect(&"m1".into());
        selection.select("m0".into()).unwrap();

        let ids: Vec<&str> = selection.ids().iter().map(MessageId::as_str).collect();
        assert_eq!(ids, ["m3", "m2", "m0"]);
    }

    #[test]
    fn test_toggle() {
        let mut selection = Selection::new();
        assert!(selection.toggle("m1".into()).unwrap());
        assert!(!selection.toggle("m1".into()).unwrap());
        assert!(selection.is_empty());
    }

    proptest! {
        #[test]
        fn prop_selection_never_exceeds_bound(
            ops in proptest::collection::vec((0_u8..12, any::<bool>()), 0..60),
        ) {
            let mut selection = Selection::new();
            for (n, select) in ops {
                let id = MessageId::new(format!("m{n}"));
                if select {
                    let was_full = selection.is_full();
                    let result = selection.select(id.clone());
                    if was_full && result.is_err() {
                        prop_assert!(!selection.contains(&id));
                    }
                } else {
                    selection.deselect(&id);
                }
                prop_assert!(selection.len() <= MAX_SELECTION);
            }
        }
    }
}
