//! Game-facing data model
//!
//! Screen geometry shared by every stage of the pipeline and the operator
//! selectable measurement modes.

pub mod geometry;
pub mod mode;

pub use geometry::{PixelScale, Point, Region};
pub use mode::Mode;
