//! Forecast orchestration
//!
//! Two interchangeable prediction backends sit behind one entry point,
//! [`Orchestrator::get_optimized_forecast`]. The carbon sensor decides which
//! backend is tried first; the other one is the fallback, and a synthetic
//! series covers the case where neither answers.

pub mod backend;
pub mod contract;
pub mod emergency;
pub mod metadata;
pub mod orchestrator;
pub mod types;

pub use backend::{BackendClient, BackendDescriptor, BackendError, BackendRole, ErrorKind};
pub use contract::BackendPayload;
pub use emergency::EmergencyGenerator;
pub use metadata::{
    ErrorChain, FailedAttempt, OrchestrationMetadata, OrchestrationStatus, Outcome,
    EMERGENCY_BACKEND,
};
pub use orchestrator::{CancelHandle, Orchestrator};
pub use types::{ForecastResult, ForecastRow};
