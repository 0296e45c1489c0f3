#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Shared models for the Pixel to Plate recipe client.

pub mod api;
pub mod filter;
pub mod ids;
pub mod model;

mod quantities;

pub use api::*;
pub use filter::*;
pub use ids::*;
pub use model::*;
pub use quantities::{DuplicateEntry, Quantities};
