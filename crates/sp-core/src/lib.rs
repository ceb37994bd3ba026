//! `sp-core` — foundational types for the `rust_spill` release subsystem.
//!
//! This crate is a dependency of every other `sp-*` crate.  It intentionally
//! has no `sp-*` dependencies and minimal external ones (only `rand` and
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`geo`]         | `WorldPoint` (lon, lat, z), lerp, geographic bounds   |
//! | [`time`]        | `SimTime`, `SimClock`, `DriverConfig`                 |
//! | [`rng`]         | `ReleaseRng` (explicit, seedable random source)       |
//! | [`error`]       | `CoreError`, `CoreResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use geo::WorldPoint;
pub use rng::ReleaseRng;
pub use time::{DriverConfig, SimClock, SimTime};
