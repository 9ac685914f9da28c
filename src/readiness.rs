use crate::{Error, Result, segmenter::Segmenter};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessState {
    Loading,
    Ok,
}

/// Process-wide model slot. Starts empty while the model loads and is filled
/// exactly once; every later read is lock-free.
pub struct ModelGate {
    model: String,
    segmenter: OnceLock<Arc<dyn Segmenter>>,
}

impl ModelGate {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            segmenter: OnceLock::new(),
        }
    }

    /// Gate that is ready from the start.
    pub fn ready(segmenter: Arc<dyn Segmenter>) -> Self {
        let gate = Self::new(segmenter.name());
        // A freshly created cell is always empty.
        let _ = gate.segmenter.set(segmenter);
        gate
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn install(&self, segmenter: Arc<dyn Segmenter>) -> Result<()> {
        self.segmenter
            .set(segmenter)
            .map_err(|_| Error::AlreadyLoaded {
                model: self.model.clone(),
            })
    }

    pub fn segmenter(&self) -> Option<Arc<dyn Segmenter>> {
        self.segmenter.get().cloned()
    }

    pub fn state(&self) -> ReadinessState {
        if self.segmenter.get().is_some() {
            ReadinessState::Ok
        } else {
            ReadinessState::Loading
        }
    }
}
