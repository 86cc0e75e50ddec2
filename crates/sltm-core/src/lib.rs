//! sltm-core: shared foundation for the static link transmission model.
//!
//! Contains:
//! - units (uom flow-rate/length types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs for nodes and link segments)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{SltmError, SltmResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
