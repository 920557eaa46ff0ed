//! Login state and its transitions.

mod machine;
mod model;

pub use machine::{AuthStateMachine, Directive, LocationKind};
pub use model::{AuthState, AuthTimings, Credentials, FailureReason, VerificationLock};
