//! JSON Data Shaping
//!
//! Turns arbitrary fetched documents into addressable fields:
//!
//! - **flatten**: walk a document into `(path, value, type)` leaves
//! - **path**: resolve a dotted path against a document
//! - **explorer**: search flattened leaves and toggle field selections
//!
//! # Paths
//!
//! ```text
//! {"data": {"rates": {"USD": 1.0}, "tags": ["a", "b"]}}
//!
//!   data.rates.USD   number
//!   data.tags        array   (arrays are leaves, never recursed into)
//! ```

pub mod explorer;
pub mod flatten;
pub mod path;

pub use explorer::{preview, search, toggle_field};
pub use flatten::{flatten, FieldType, FlattenedField};
pub use path::resolve;
