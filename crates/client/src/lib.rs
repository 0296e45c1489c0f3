#![forbid(unsafe_code)]

//! Client side of the Pixel to Plate recipe finder.
//!
//! - [`gateway`]: HTTP calls to the recipe backend.
//! - [`media`]: permission negotiation and photo pickers, normalized into an
//!   [`media::ImageHandle`].
//! - [`workflow`]: the capture -> upload -> navigate state machine.
//! - [`routes`] and [`views`]: what the screens consume.

pub mod config;
pub mod fakes;
pub mod gateway;
pub mod media;
pub mod routes;
pub mod views;
pub mod workflow;

pub use config::*;
pub use gateway::*;
pub use media::*;
pub use routes::*;
pub use views::*;
pub use workflow::*;
