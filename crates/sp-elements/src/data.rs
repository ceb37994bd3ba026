//! Core element storage: `ElementData`.
//!
//! # Why typed fields *and* a name map?
//!
//! Every release writes `positions`, `mass` and `init_mass`, so those live in
//! typed `Vec`s exposed as slices for direct indexed access.  Only
//! [`ElementData::append`] changes their length.  Everything else is
//! release-specific and lives in an [`ArrayMap`].  [`ElementData::column_mut`]
//! unifies both behind one name-based lookup for code (file replay) that
//! only knows array names at runtime.

use std::ops::Range;

use sp_core::WorldPoint;

use crate::array::{ArrayKind, ArrayMap, Column, ColumnMut};
use crate::{ElementsError, ElementsResult};

/// Name of the built-in position array.
pub const POSITIONS: &str = "positions";
/// Name of the built-in mass array.
pub const MASS: &str = "mass";
/// Name of the built-in initial-mass array.
pub const INIT_MASS: &str = "init_mass";

/// Structure-of-Arrays storage for all released elements.
///
/// Every `Vec` has exactly `len()` elements; the row index is the element
/// index into all of them.  Owned by the driver; releases only ever write
/// the rows returned by [`tail`](Self::tail).
#[derive(Clone, Debug, Default)]
pub struct ElementData {
    count: usize,

    positions: Vec<WorldPoint>,
    mass: Vec<f64>,
    init_mass: Vec<f64>,

    extra: ArrayMap,
}

impl ElementData {
    /// Empty storage with only the built-in arrays.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_arrays(extra: ArrayMap) -> Self {
        Self { extra, ..Self::default() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// (lon, lat, z) of each element.
    #[inline]
    pub fn positions(&self) -> &[WorldPoint] {
        &self.positions
    }

    #[inline]
    pub fn positions_mut(&mut self) -> &mut [WorldPoint] {
        &mut self.positions
    }

    /// Current mass of each element in kilograms.
    #[inline]
    pub fn mass(&self) -> &[f64] {
        &self.mass
    }

    #[inline]
    pub fn mass_mut(&mut self) -> &mut [f64] {
        &mut self.mass
    }

    /// Mass at release time.
    #[inline]
    pub fn init_mass(&self) -> &[f64] {
        &self.init_mass
    }

    #[inline]
    pub fn init_mass_mut(&mut self) -> &mut [f64] {
        &mut self.init_mass
    }

    /// Grow every array by `n` zero-valued rows and return the new row range.
    pub fn append(&mut self, n: usize) -> Range<usize> {
        let start = self.count;
        self.count += n;
        self.positions.resize(self.count, WorldPoint::ORIGIN);
        self.mass.resize(self.count, 0.0);
        self.init_mass.resize(self.count, 0.0);
        self.extra.grow_all(n);
        start..self.count
    }

    /// Row range of the most recently appended `count` elements.
    pub fn tail(&self, count: usize) -> ElementsResult<Range<usize>> {
        if count > self.count {
            return Err(ElementsError::TailOutOfRange {
                requested: count,
                available: self.count,
            });
        }
        Ok(self.count - count..self.count)
    }

    /// Drop all rows; registered arrays stay registered.
    pub fn clear(&mut self) {
        self.count = 0;
        self.positions.clear();
        self.mass.clear();
        self.init_mass.clear();
        self.extra.clear_all();
    }

    /// Set `mass` and `init_mass` of `rows` to `mass_per_element`.
    pub fn fill_mass(&mut self, rows: Range<usize>, mass_per_element: f64) {
        self.mass[rows.clone()].fill(mass_per_element);
        self.init_mass[rows].fill(mass_per_element);
    }

    /// Sum of `mass` over all rows.
    pub fn total_mass(&self) -> f64 {
        self.mass.iter().sum()
    }

    // ── Named access ──────────────────────────────────────────────────────

    /// Register a release-specific array, zero-filled for existing rows.
    ///
    /// Built-in names are accepted when the kind matches.
    pub fn register(&mut self, name: &str, kind: ArrayKind) -> ElementsResult<()> {
        if let Some(existing) = builtin_kind(name) {
            if existing != kind {
                return Err(ElementsError::KindMismatch {
                    name: name.to_owned(),
                    existing,
                    requested: kind,
                });
            }
            return Ok(());
        }
        self.extra.register(name, kind, self.count)
    }

    /// `true` if `name` is a built-in or registered array.
    pub fn contains(&self, name: &str) -> bool {
        builtin_kind(name).is_some() || self.extra.contains(name)
    }

    /// All array names: built-ins first, then registered arrays in order.
    pub fn array_names(&self) -> impl Iterator<Item = &str> {
        [POSITIONS, MASS, INIT_MASS].into_iter().chain(self.extra.names())
    }

    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        match name {
            POSITIONS => Some(Column::Point(&self.positions)),
            MASS => Some(Column::Scalar(&self.mass)),
            INIT_MASS => Some(Column::Scalar(&self.init_mass)),
            _ => self.extra.get(name).map(|a| a.as_column()),
        }
    }

    pub fn column_mut(&mut self, name: &str) -> Option<ColumnMut<'_>> {
        match name {
            POSITIONS => Some(ColumnMut::Point(&mut self.positions)),
            MASS => Some(ColumnMut::Scalar(&mut self.mass)),
            INIT_MASS => Some(ColumnMut::Scalar(&mut self.init_mass)),
            _ => self.extra.get_mut(name).map(|a| a.as_column_mut()),
        }
    }

    /// Release-specific arrays only.
    pub fn arrays(&self) -> &ArrayMap {
        &self.extra
    }
}

fn builtin_kind(name: &str) -> Option<ArrayKind> {
    match name {
        POSITIONS => Some(ArrayKind::Point),
        MASS | INIT_MASS => Some(ArrayKind::Scalar),
        _ => None,
    }
}
