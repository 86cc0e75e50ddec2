//! sltm-network: physical/virtual transport network for static loading.
//!
//! Provides:
//! - Core network data structures (Node, LinkSegment, Network)
//! - Incremental network builder with validation
//!
//! Link segment ids are dense (0..N) and double as offsets into every
//! loading buffer.
//!
//! # Example
//!
//! ```
//! use sltm_core::{km, pcu_per_hour};
//! use sltm_network::NetworkBuilder;
//!
//! let mut builder = NetworkBuilder::new();
//! let a = builder.add_node("A");
//! let b = builder.add_node("B");
//! let ab = builder.add_link_segment("A-B", a, b, pcu_per_hour(1800.0), km(1.0));
//! let network = builder.build().unwrap();
//!
//! assert_eq!(network.nodes().len(), 2);
//! assert!((network.link_segment(ab).unwrap().capacity_pcu_h - 1800.0).abs() < 1e-9);
//! ```

pub mod builder;
pub mod error;
pub mod network;
pub(crate) mod validate;

pub use builder::NetworkBuilder;
pub use error::{NetworkError, NetworkResult};
pub use network::{LinkSegment, Network, Node};
