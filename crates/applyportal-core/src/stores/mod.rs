//! Persisted application state.
//!
//! Each wizard section lives in its own `SectionStore`, written through to
//! storage on every change. Every store registers with a `ResetRegistry`
//! so ending the session returns all of them to their defaults.

pub mod persisted;
pub mod registry;
pub mod sections;
pub mod stepper;

pub use persisted::{Section, SectionStore, StoreError};
pub use registry::ResetRegistry;
pub use sections::{ApplicationStores, SectionKind, SUBMISSION_STEP, TOTAL_STEPS};
pub use stepper::{NextGate, StepperPosition, StepperStore};
