//! Domain models for Stratagate.
//!
//! Canonical definitions for the core entities:
//! - `EntitySnapshot`: kind-independent view of a validation target
//! - `LayerResult`: one layer's bounded score plus diagnostics
//! - `ValidationRecord`: immutable outcome of a validation run
//! - `StageGateResult`: latest outcome of a Gate 0/1/2 evaluation

pub mod error;
pub mod layer;
pub mod record;
pub mod request;
pub mod snapshot;
pub mod stage_gate;

pub use error::{Result, ValidateError};
pub use layer::{clamp_score, Diagnostic, LayerName, LayerResult, Severity};
pub use record::{
    BlockedRejection, GateId, GateState, HardStop, HardStopSeverity, QualityGateStatus,
    ValidationRecord, ValidationStatus,
};
pub use request::{ValidationRequest, ValidationResponse, ValidationTarget, ANONYMOUS_ACTOR};
pub use snapshot::{DataSource, DeliverableRef, EntitySnapshot, Milestone};
pub use stage_gate::{
    DeliverableInput, GateNumber, StageGateRequest, StageGateResponse, StageGateResult,
};
