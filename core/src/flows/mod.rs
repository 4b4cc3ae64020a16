//! End-to-end conformance flows

pub mod client_credentials;

pub use client_credentials::{ClientCredentialsFlow, FlowOutcome, FlowResult, FlowStage};
