//! # denm-core
//!
//! Foundation layer shared by every DENM service: station identities, flat and
//! geographic positions, the virtual clock and the bounded event bus.
//!
//! ### Key Submodules:
//! - `events`: bounded event bus on crossbeam's segmented queue
//! - `geo`: flat positions, WGS84 approximations and broadcast areas
//! - `identity`: mobility id to station id registry shared across vehicles
//! - `time`: `VirtualClock` using atomic counters
//! - `vehicle`: state and actuation boundary towards the mobility model
//!
//! ### Future:
//! - Geodesic distance for large-area relays

pub mod error;
pub mod events;
pub mod geo;
pub mod identity;
pub mod station;
pub mod time;
pub mod vehicle;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::geo::*;
    pub use crate::identity::*;
    pub use crate::station::*;
    pub use crate::time::*;
    pub use crate::vehicle::*;
}

pub use error::IdentityError;
