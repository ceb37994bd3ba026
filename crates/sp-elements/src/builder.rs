//! Fluent builder for `ElementData`.
//!
//! # Usage
//!
//! ```rust
//! use sp_elements::{ArrayKind, ElementDataBuilder};
//!
//! let mut data = ElementDataBuilder::new()
//!     .with_array("spill_num", ArrayKind::Integer)
//!     .with_array("windage_range", ArrayKind::Scalar)
//!     .build()
//!     .unwrap();
//!
//! let rows = data.append(10);
//! assert_eq!(rows, 0..10);
//! assert_eq!(data.len(), 10);
//! ```

use crate::array::{ArrayKind, ArrayMap};
use crate::{ElementData, ElementsResult};

/// Collects array registrations, then builds an empty [`ElementData`].
///
/// Registration errors (one name requested with two kinds) surface from
/// [`build`](Self::build).
#[derive(Default)]
pub struct ElementDataBuilder {
    arrays: Vec<(String, ArrayKind)>,
}

impl ElementDataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a release-specific array.
    ///
    /// Calling this twice with the same name and kind is harmless.
    pub fn with_array(mut self, name: &str, kind: ArrayKind) -> Self {
        self.arrays.push((name.to_owned(), kind));
        self
    }

    pub fn build(self) -> ElementsResult<ElementData> {
        let mut data = ElementData::with_arrays(ArrayMap::new());
        for (name, kind) in &self.arrays {
            data.register(name, *kind)?;
        }
        Ok(data)
    }
}
