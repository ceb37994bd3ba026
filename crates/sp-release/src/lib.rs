//! `sp-release` — release schedules and release kinds.
//!
//! # Crate layout
//!
//! | Module           | Contents                                                      |
//! |------------------|---------------------------------------------------------------|
//! | [`release`]      | `Release` trait: the driver-facing lifecycle                  |
//! | [`timeseries`]   | `Timeseries<V>` linear interpolation with flat extrapolation  |
//! | [`schedule`]     | `ReleaseSchedule`, `ScheduleBuilder`, `PreparedSchedule`      |
//! | [`scheduler`]    | `ReleaseScheduler`: base release from custom positions        |
//! | [`point_line`]   | `PointLineRelease`: fixed or moving point source              |
//! | [`spatial`]      | `SpatialRelease`: weighted sampling inside polygons           |
//! | [`nesdis`]       | `NesdisRelease`: NESDIS satellite oil analysis ingestion      |
//! | [`plume`]        | `PlumeGenerator`, `PlumeRelease`                              |
//! | [`continuous`]   | `ContinuousPointsRelease`: round-robin over fixed points      |
//! | [`snapshot`]     | `ElementSnapshot` CSV persistence and selection               |
//! | [`file_replay`]  | `FileReplayRelease`: replay a saved snapshot                  |
//! | [`loader`]       | Grid, splot and position-CSV helpers                          |
//! | [`error`]        | `ReleaseError`, `ReleaseResult<T>`                            |
//!
//! Every release keeps its configuration immutable and caches what
//! `prepare_for_model_run` derives in an `Option`, cleared by `rewind`.

pub mod continuous;
pub mod error;
pub mod file_replay;
pub mod loader;
pub mod nesdis;
pub mod plume;
pub mod point_line;
pub mod release;
pub mod schedule;
pub mod scheduler;
pub mod snapshot;
pub mod spatial;
pub mod timeseries;

#[cfg(test)]
mod tests;

pub use continuous::ContinuousPointsRelease;
pub use error::{ReleaseError, ReleaseResult};
pub use file_replay::FileReplayRelease;
pub use loader::{grid_release, load_positions_csv, load_positions_reader, release_from_splot_data};
pub use nesdis::{NesdisMetadata, NesdisRelease, load_nesdis};
pub use plume::{PlumeGenerator, PlumeRelease, VerticalPlumeGenerator};
pub use point_line::PointLineRelease;
pub use release::Release;
pub use schedule::{ElementCount, PreparedSchedule, ReleaseSchedule, ScheduleBuilder};
pub use scheduler::ReleaseScheduler;
pub use snapshot::{
    ElementSnapshot, SnapshotSelector, read_snapshot_csv, read_snapshot_reader, write_snapshot_csv,
    write_snapshot_writer,
};
pub use spatial::{SpatialRelease, SpatialReleaseBuilder};
pub use timeseries::{PositionTimeseries, ReleaseTimeseries, Timeseries};
