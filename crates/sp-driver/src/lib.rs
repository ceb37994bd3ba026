//! `sp-driver` — stepping loop for the rust_spill release subsystem.
//!
//! # Step loop
//!
//! ```text
//! prepare:  Release::prepare_for_model_run(time_step) for every release
//! for step in 0..config.num_steps:
//!   t = clock.current_time()
//!   for (index, release) in releases:
//!     ① n = release.num_elements_to_release(t, dt, released[index])
//!     ② ElementData::append(n)
//!     ③ release.initialize_elements(n, elements, t, dt, rng)
//!     ④ spill_num[new rows] = index
//!   observer.on_step_end(step, t, elements)
//! ```
//!
//! Releases run in the order they were added, so a seeded run is fully
//! reproducible.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use sp_core::{DriverConfig, WorldPoint};
//! use sp_driver::{DriverBuilder, NoopObserver};
//! use sp_release::{PointLineRelease, ScheduleBuilder};
//!
//! let schedule = ScheduleBuilder::new(config.start_time).num_elements(100).build()?;
//! let mut driver = DriverBuilder::new(config)
//!     .release(PointLineRelease::point(schedule, WorldPoint::surface(-70.0, 41.0)))
//!     .build()?;
//! driver.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod driver;
pub mod error;
pub mod observer;


pub use builder::DriverBuilder;
pub use driver::{ReleaseDriver, SPILL_NUM};
pub use error::{DriverError, DriverResult};
pub use observer::{NoopObserver, SnapshotRecorder, StepObserver};
