//! # DENM Reaction
//!
//! Maps a relevant alert to a vehicle control action. Actuation goes through
//! the `VehicleController` boundary; the policy never owns the vehicle.

pub mod policy;

pub use policy::{ReactionAction, ReactionOutcome, ReactionPolicy, ReactionState};
