//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use studystage_chat::{DocumentDigitizer, StudyAssistant};
use studystage_core::config::StudyConfig;
use studystage_vector::SimilarityIndex;

/// Shared application state.
///
/// Every field is behind an `Arc`, so cloning per request is cheap. The
/// index is the same instance the assistant searches.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StudyConfig>,
    pub index: Arc<SimilarityIndex>,
    pub assistant: Arc<StudyAssistant>,
    /// Converts uploaded binary documents to text.
    pub digitizer: Arc<dyn DocumentDigitizer>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        config: StudyConfig,
        assistant: StudyAssistant,
        digitizer: Arc<dyn DocumentDigitizer>,
    ) -> Self {
        let index = Arc::clone(assistant.index());
        Self {
            config: Arc::new(config),
            index,
            assistant: Arc::new(assistant),
            digitizer,
            start_time: Instant::now(),
        }
    }
}
