//! The SOS lifecycle engine: broadcast hub and emergency coordinator.
//!
//! The coordinator is the only entry point for the trigger / report /
//! resolve operations. The registry and trail never publish events
//! themselves; publishing happens here, synchronously with the mutation
//! that caused the event, which is what keeps a single emergency's events
//! ordered for every observer.

pub mod coordinator;
pub mod hub;

pub use coordinator::{
  SosCoordinator, SosSummary, SosView, TriggerOutcome, TriggerReceipt,
};
pub use hub::EventHub;
