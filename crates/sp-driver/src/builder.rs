//! Fluent builder for constructing a [`ReleaseDriver`].

use sp_core::{DriverConfig, ReleaseRng};
use sp_elements::{ArrayKind, ElementDataBuilder};
use sp_release::Release;

use crate::driver::SPILL_NUM;
use crate::{DriverError, DriverResult, ReleaseDriver};

/// Fluent builder for [`ReleaseDriver`].
///
/// # Required inputs
///
/// - [`DriverConfig`]: start time, time step, step count, seed
/// - at least one [`Release`]
///
/// # Optional inputs
///
/// | Method              | Default                        |
/// |---------------------|--------------------------------|
/// | `.with_array(n, k)` | only built-ins and `spill_num` |
///
/// # Example
///
/// ```rust,ignore
/// let mut driver = DriverBuilder::new(config)
///     .release(point_release)
///     .release(spatial_release)
///     .with_array("windage", ArrayKind::Scalar)
///     .build()?;
/// ```
pub struct DriverBuilder {
    config:   DriverConfig,
    releases: Vec<Box<dyn Release>>,
    arrays:   Vec<(String, ArrayKind)>,
}

impl DriverBuilder {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            releases: Vec::new(),
            arrays:   Vec::new(),
        }
    }

    /// Add a release; its index in `spill_num` is the order of addition.
    pub fn release(mut self, release: impl Release + 'static) -> Self {
        self.releases.push(Box::new(release));
        self
    }

    pub fn boxed_release(mut self, release: Box<dyn Release>) -> Self {
        self.releases.push(release);
        self
    }

    /// Register an extra per-element array.  File replay copies into any
    /// array registered here that its snapshot also carries.
    pub fn with_array(mut self, name: &str, kind: ArrayKind) -> Self {
        self.arrays.push((name.to_owned(), kind));
        self
    }

    /// Validate the configuration, register arrays, and return a
    /// ready-to-run [`ReleaseDriver`].
    pub fn build(self) -> DriverResult<ReleaseDriver> {
        self.config.validate()?;
        if self.releases.is_empty() {
            return Err(DriverError::Config("at least one release is required".into()));
        }

        let mut elements = self
            .arrays
            .iter()
            .fold(ElementDataBuilder::new(), |b, (name, kind)| b.with_array(name, *kind))
            .with_array(SPILL_NUM, ArrayKind::Integer)
            .build()?;
        for (index, release) in self.releases.iter().enumerate() {
            release
                .register_arrays(&mut elements)
                .map_err(|source| DriverError::Release { index, source })?;
        }

        Ok(ReleaseDriver {
            clock:    self.config.make_clock(),
            rng:      ReleaseRng::new(self.config.seed),
            released: vec![0; self.releases.len()],
            prepared: false,
            config:   self.config,
            elements,
            releases: self.releases,
        })
    }
}
