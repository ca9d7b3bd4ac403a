//! Shared data models for the bridge

mod descriptor;
mod directive;
mod event;

pub use descriptor::*;
pub use directive::*;
pub use event::*;
