//! Per-request orchestration metadata
//!
//! Metadata is assembled while the routing state machine runs and frozen when
//! it reaches its terminal state. Callers read it through accessors or match on
//! [`Outcome`] directly.

use crate::carbon_aware::CarbonReading;
use crate::forecast::backend::{BackendError, ErrorKind};
use serde::{Serialize, Serializer};

/// Name reported as the selected backend when the synthetic series is served
pub const EMERGENCY_BACKEND: &str = "emergency";

/// One failed backend attempt
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedAttempt {
    pub backend: String,
    pub kind: ErrorKind,
    pub detail: String,
}

/// Ordered record of failed backend attempts
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorChain(Vec<FailedAttempt>);

impl ErrorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, backend: &str, error: &BackendError) {
        self.0.push(FailedAttempt {
            backend: backend.to_string(),
            kind: error.kind(),
            detail: error.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[FailedAttempt] {
        &self.0
    }

    /// `name (kind), name (kind)`
    pub fn summary(&self) -> String {
        self.0
            .iter()
            .map(|a| format!("{} ({})", a.backend, a.kind))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrchestrationStatus {
    Ok,
    Degraded,
}

/// How a request was ultimately answered
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A real backend answered
    Served {
        backend: String,
        footprint_kg: f64,
        /// True when the secondary rescued a failed primary
        rescued: bool,
    },
    /// Both backends failed; the emergency series was served
    Degraded { reason: String },
}

/// Frozen description of how a forecast was produced
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestrationMetadata {
    carbon_context: CarbonReading,
    outcome: Outcome,
    error_chain: ErrorChain,
}

impl OrchestrationMetadata {
    pub(crate) fn served(
        carbon_context: CarbonReading,
        error_chain: ErrorChain,
        backend: &str,
        footprint_kg: f64,
    ) -> Self {
        let rescued = !error_chain.is_empty();
        Self {
            carbon_context,
            outcome: Outcome::Served {
                backend: backend.to_string(),
                footprint_kg: footprint_kg.max(0.0),
                rescued,
            },
            error_chain,
        }
    }

    pub(crate) fn degraded(
        carbon_context: CarbonReading,
        error_chain: ErrorChain,
        reason: String,
    ) -> Self {
        Self {
            carbon_context,
            outcome: Outcome::Degraded { reason },
            error_chain,
        }
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn carbon_context(&self) -> &CarbonReading {
        &self.carbon_context
    }

    pub fn error_chain(&self) -> &ErrorChain {
        &self.error_chain
    }

    pub fn selected_backend(&self) -> &str {
        match &self.outcome {
            Outcome::Served { backend, .. } => backend,
            Outcome::Degraded { .. } => EMERGENCY_BACKEND,
        }
    }

    pub fn status(&self) -> OrchestrationStatus {
        match self.outcome {
            Outcome::Served { .. } => OrchestrationStatus::Ok,
            Outcome::Degraded { .. } => OrchestrationStatus::Degraded,
        }
    }

    pub fn execution_footprint_kg(&self) -> f64 {
        match self.outcome {
            Outcome::Served { footprint_kg, .. } => footprint_kg,
            Outcome::Degraded { .. } => 0.0,
        }
    }

    /// True when the answer did not come from the preferred backend
    pub fn is_fallback(&self) -> bool {
        match self.outcome {
            Outcome::Served { rescued, .. } => rescued,
            Outcome::Degraded { .. } => true,
        }
    }
}

#[derive(Serialize)]
struct MetadataView<'a> {
    selected_backend: &'a str,
    status: OrchestrationStatus,
    fallback: bool,
    execution_footprint_kg: f64,
    carbon_context: &'a CarbonReading,
    error_chain: &'a ErrorChain,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

impl Serialize for OrchestrationMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let reason = match &self.outcome {
            Outcome::Degraded { reason } => Some(reason.as_str()),
            Outcome::Served { .. } => None,
        };
        MetadataView {
            selected_backend: self.selected_backend(),
            status: self.status(),
            fallback: self.is_fallback(),
            execution_footprint_kg: self.execution_footprint_kg(),
            carbon_context: &self.carbon_context,
            error_chain: &self.error_chain,
            reason,
        }
        .serialize(serializer)
    }
}
