//! `sp-elements` — Structure-of-Arrays element storage.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                      |
//! |-------------|---------------------------------------------------------------|
//! | [`array`]   | `ArrayKind`, `ElementArray`, `ArrayMap` (name → array)        |
//! | [`data`]    | `ElementData` (positions / mass / init_mass + extra arrays)   |
//! | [`builder`] | `ElementDataBuilder` (fluent construction)                    |
//! | [`error`]   | `ElementsError`, `ElementsResult<T>`                          |
//!
//! # Row model
//!
//! The driver owns an `ElementData` and grows it with
//! [`ElementData::append`].  A release then fills the *last* `count` rows —
//! [`ElementData::tail`] returns that row range and rejects requests larger
//! than the storage.

pub mod array;
pub mod builder;
pub mod data;
pub mod error;


pub use array::{ArrayKind, ArrayMap, Column, ColumnMut, ElementArray};
pub use builder::ElementDataBuilder;
pub use data::{ElementData, INIT_MASS, MASS, POSITIONS};
pub use error::{ElementsError, ElementsResult};
