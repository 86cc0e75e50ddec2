//! Static network loading with point-queue capacity constraints.
//!
//! Given a network and a route-choice structure (paths or origin bushes), this
//! crate computes link inflows, outflows, sending and receiving flows that
//! respect bottleneck capacities. Conflicts at potentially blocking nodes are
//! resolved by a first-order node model; a fixed-point iteration on flow
//! acceptance factors ties the local solutions together, escalating to a
//! stricter solution scheme when progress stalls.

pub mod adapter;
pub mod buffers;
pub mod convergence;
pub mod error;
pub mod flow_update;
pub mod gap;
pub mod loading;
pub mod node_model;
pub mod results;
pub mod scheme;
pub mod settings;
pub mod splitting;

pub use adapter::{NodeModelAdapter, NodeModelSolution};
pub use buffers::{DoubleBuffer, LoadingBuffers, Slot};
pub use convergence::ConvergenceAnalyser;
pub use error::{LoadingError, LoadingResult};
pub use flow_update::{
    BushFlowUpdate, FlowUpdate, FlowUpdateMode, FlowUpdateOutput, FlowUpdateStrategy,
    FlowVisitor, OriginBush, Path, PathFlowUpdate, TurnFlows,
};
pub use gap::NormBasedGapFunction;
pub use loading::NetworkLoading;
pub use node_model::{NodeModel, NodeModelError, NodeModelInput, NodeModelResult, TampereNodeModel};
pub use results::{LoadingOutcome, LoadingResults};
pub use scheme::{SolutionScheme, TrackingScope};
pub use settings::{ConvergenceSettings, GapNorm, GapSettings, StaticLtmSettings};
pub use splitting::{
    CompleteSplittingRates, PartialSplittingRates, SplittingRateStore,
    create_splitting_rate_store,
};
