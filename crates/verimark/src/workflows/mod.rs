//! Workflow engines powering the operator console.

pub mod verification;
