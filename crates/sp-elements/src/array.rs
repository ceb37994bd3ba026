//! Named, typed per-element arrays.
//!
//! # Design
//!
//! Release-specific state (windage, droplet size, spill index, …) is stored
//! as one `ElementArray` per name in an [`ArrayMap`].  Arrays are looked up
//! by *name* rather than by Rust type because file replay copies arrays by
//! the names found in a snapshot file.  All arrays in one `ElementData` are
//! kept the same length as its element count at all times.

use std::collections::BTreeMap;
use std::ops::Range;

use sp_core::WorldPoint;

use crate::{ElementsError, ElementsResult};

// ── ArrayKind ─────────────────────────────────────────────────────────────────

/// Element type of an [`ElementArray`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArrayKind {
    /// One `f64` per element.
    Scalar,
    /// One (lon, lat, z) per element.
    Point,
    /// One `i64` per element.
    Integer,
}

// ── ElementArray ──────────────────────────────────────────────────────────────

/// An owned per-element array of one [`ArrayKind`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ElementArray {
    Scalar(Vec<f64>),
    Point(Vec<WorldPoint>),
    Integer(Vec<i64>),
}

impl ElementArray {
    /// A zero-filled array of `len` elements.
    pub fn zeros(kind: ArrayKind, len: usize) -> Self {
        match kind {
            ArrayKind::Scalar => ElementArray::Scalar(vec![0.0; len]),
            ArrayKind::Point => ElementArray::Point(vec![WorldPoint::ORIGIN; len]),
            ArrayKind::Integer => ElementArray::Integer(vec![0; len]),
        }
    }

    pub fn kind(&self) -> ArrayKind {
        match self {
            ElementArray::Scalar(_) => ArrayKind::Scalar,
            ElementArray::Point(_) => ArrayKind::Point,
            ElementArray::Integer(_) => ArrayKind::Integer,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ElementArray::Scalar(v) => v.len(),
            ElementArray::Point(v) => v.len(),
            ElementArray::Integer(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `n` zero-valued elements.
    pub(crate) fn grow(&mut self, n: usize) {
        match self {
            ElementArray::Scalar(v) => v.resize(v.len() + n, 0.0),
            ElementArray::Point(v) => v.resize(v.len() + n, WorldPoint::ORIGIN),
            ElementArray::Integer(v) => v.resize(v.len() + n, 0),
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            ElementArray::Scalar(v) => v.clear(),
            ElementArray::Point(v) => v.clear(),
            ElementArray::Integer(v) => v.clear(),
        }
    }

    pub fn as_column(&self) -> Column<'_> {
        match self {
            ElementArray::Scalar(v) => Column::Scalar(v),
            ElementArray::Point(v) => Column::Point(v),
            ElementArray::Integer(v) => Column::Integer(v),
        }
    }

    pub fn as_column_mut(&mut self) -> ColumnMut<'_> {
        match self {
            ElementArray::Scalar(v) => ColumnMut::Scalar(v),
            ElementArray::Point(v) => ColumnMut::Point(v),
            ElementArray::Integer(v) => ColumnMut::Integer(v),
        }
    }
}

// ── Borrowed views ────────────────────────────────────────────────────────────

/// Shared view of one named array, regardless of where it is stored.
#[derive(Copy, Clone, Debug)]
pub enum Column<'a> {
    Scalar(&'a [f64]),
    Point(&'a [WorldPoint]),
    Integer(&'a [i64]),
}

impl Column<'_> {
    pub fn kind(&self) -> ArrayKind {
        match self {
            Column::Scalar(_) => ArrayKind::Scalar,
            Column::Point(_) => ArrayKind::Point,
            Column::Integer(_) => ArrayKind::Integer,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Scalar(v) => v.len(),
            Column::Point(v) => v.len(),
            Column::Integer(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutable view of one named array.
#[derive(Debug)]
pub enum ColumnMut<'a> {
    Scalar(&'a mut [f64]),
    Point(&'a mut [WorldPoint]),
    Integer(&'a mut [i64]),
}

impl ColumnMut<'_> {
    pub fn kind(&self) -> ArrayKind {
        match self {
            ColumnMut::Scalar(_) => ArrayKind::Scalar,
            ColumnMut::Point(_) => ArrayKind::Point,
            ColumnMut::Integer(_) => ArrayKind::Integer,
        }
    }

    /// Overwrite `rows` with the contents of `src`.
    ///
    /// Kinds must match and `src.len()` must equal `rows.len()`.  Integer
    /// sources may be written into scalar arrays (widened to `f64`).
    pub fn fill_from(&mut self, name: &str, rows: Range<usize>, src: Column<'_>) -> ElementsResult<()> {
        if src.len() != rows.len() {
            return Err(ElementsError::LengthMismatch {
                name:     name.to_owned(),
                expected: rows.len(),
                got:      src.len(),
            });
        }
        match (self, src) {
            (ColumnMut::Scalar(dst), Column::Scalar(s)) => dst[rows].copy_from_slice(s),
            (ColumnMut::Scalar(dst), Column::Integer(s)) => {
                for (d, &v) in dst[rows].iter_mut().zip(s) {
                    *d = v as f64;
                }
            }
            (ColumnMut::Point(dst), Column::Point(s)) => dst[rows].copy_from_slice(s),
            (ColumnMut::Integer(dst), Column::Integer(s)) => dst[rows].copy_from_slice(s),
            (dst, src) => {
                return Err(ElementsError::KindMismatch {
                    name:      name.to_owned(),
                    existing:  dst.kind(),
                    requested: src.kind(),
                });
            }
        }
        Ok(())
    }
}

// ── ArrayMap ──────────────────────────────────────────────────────────────────

/// Registry of release-specific arrays, keyed by name.
///
/// A `BTreeMap` keeps iteration order stable so snapshot output and replay
/// are deterministic.
#[derive(Clone, Debug, Default)]
pub struct ArrayMap {
    map: BTreeMap<String, ElementArray>,
}

impl ArrayMap {
    pub fn new() -> Self {
        Self { map: BTreeMap::new() }
    }

    /// Register array `name`, pre-filling `current_count` zeros.
    ///
    /// Registering an existing name with the same kind is a no-op — existing
    /// data is not disturbed.  A different kind is an error.
    pub fn register(&mut self, name: &str, kind: ArrayKind, current_count: usize) -> ElementsResult<()> {
        if let Some(existing) = self.map.get(name) {
            if existing.kind() != kind {
                return Err(ElementsError::KindMismatch {
                    name:      name.to_owned(),
                    existing:  existing.kind(),
                    requested: kind,
                });
            }
            return Ok(());
        }
        self.map.insert(name.to_owned(), ElementArray::zeros(kind, current_count));
        Ok(())
    }

    pub(crate) fn grow_all(&mut self, n: usize) {
        for arr in self.map.values_mut() {
            arr.grow(n);
        }
    }

    pub(crate) fn clear_all(&mut self) {
        for arr in self.map.values_mut() {
            arr.clear();
        }
    }

    pub fn get(&self, name: &str) -> Option<&ElementArray> {
        self.map.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ElementArray> {
        self.map.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
