//! Sequential generation over a selection.

use tracing::{info, warn};

use super::selection::Selection;
use crate::backend::DraftBackend;
use crate::draft::DraftController;
use crate::error::Result;
use crate::message::{DraftId, MessageId};
use crate::validation::ValidationError;

/// Outcome for one selected message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Message the draft was generated for.
    pub message_id: MessageId,
    /// The new draft id, or why generation failed.
    pub result: std::result::Result<DraftId, String>,
}

impl BatchItem {
    /// Returns true if a draft was generated.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-item results of one batch, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// One entry per selected message.
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    /// Number of drafts generated.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_success()).count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn fail_count(&self) -> usize {
        self.items.len() - self.success_count()
    }

    /// Failed items.
    pub fn failures(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().filter(|item| !item.is_success())
    }

    /// One-line summary for the user.
    #[must_use]
    pub fn summary(&self) -> String {
        match (self.success_count(), self.fail_count()) {
            (ok, 0) => format!("Generated {ok} draft(s)"),
            (0, failed) => format!("All {failed} draft(s) failed"),
            (ok, failed) => format!("Generated {ok} draft(s), {failed} failed"),
        }
    }
}

/// Runs generation for every selected message.
///
/// Items run one after another in selection order. A failing item is
/// recorded and the rest still run; earlier successes are never rolled
/// back.
#[derive(Debug)]
pub struct BatchCoordinator<'a, B> {
    controller: &'a DraftController<B>,
}

impl<'a, B: DraftBackend> BatchCoordinator<'a, B> {
    /// Creates a coordinator driving `controller`.
    #[must_use]
    pub const fn new(controller: &'a DraftController<B>) -> Self {
        Self { controller }
    }

    /// Generates a draft for each selected message, then clears the selection.
    ///
    /// # Errors
    ///
    /// Returns `EmptySelection` if nothing is selected. Item failures are
    /// reported in the result, not as an error.
    pub async fn run(&self, selection: &mut Selection) -> Result<BatchReport> {
        if selection.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }

        let ids = selection.ids().to_vec();
        info!(count = ids.len(), "Starting batch generation");

        let mut report = BatchReport {
            items: Vec::with_capacity(ids.len()),
        };
        for message_id in ids {
            let result = match self.controller.generate(&message_id).await {
                Ok(draft) => draft
                    .draft_id
                    .ok_or_else(|| "no draft id returned".to_string()),
                Err(e) => {
                    warn!(%message_id, error = %e, "Batch item failed");
                    Err(e.to_string())
                }
            };
            report.items.push(BatchItem { message_id, result });
        }

        selection.clear();
        info!(
            success = report.success_count(),
            failed = report.fail_count(),
            "Batch generation finished"
        );
        Ok(report)
    }
}
