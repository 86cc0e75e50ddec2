//! Static network loading driver.
//!
//! A [`NetworkLoading`] owns every piece of mutable loading state (buffers,
//! splitting rates, gap functions, convergence analyser) for one network and
//! one route-choice structure. The solution procedure is split into steps so a
//! caller (for example an assignment loop) can drive it directly:
//!
//! 0. [`NetworkLoading::initialise`]: pick the scheme, load the network
//!    unconstrained, activate node tracking
//! 1. splitting-rate update from accepted turn flows
//! 2. inflow/sending-flow update at potentially blocking nodes
//! 3. splitting-rate refinement (physical queues only)
//! 4. outflow/receiving-flow update at potentially blocking nodes
//! 5. flow acceptance factor update and global convergence check
//! 6. finalisation of all link flows for persistence
//!
//! [`NetworkLoading::run`] chains the steps with scheme escalation.

use crate::adapter::NodeModelAdapter;
use crate::buffers::{LoadingBuffers, Slot};
use crate::convergence::ConvergenceAnalyser;
use crate::error::{LoadingError, LoadingResult};
use crate::flow_update::{FlowUpdate, FlowUpdateMode, TurnFlows};
use crate::gap::NormBasedGapFunction;
use crate::node_model::NodeModel;
use crate::results::{LoadingOutcome, LoadingResults};
use crate::scheme::{SolutionScheme, TrackingScope};
use crate::settings::StaticLtmSettings;
use crate::splitting::{SplittingRateStore, create_splitting_rate_store};
use sltm_core::{NEGLIGIBLE_FLOW, NodeId, Real, ensure_finite, safe_ratio};
use sltm_network::Network;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};

/// Register potentially blocking nodes for the given link inflows.
///
/// Partial tracking registers the upstream node of every segment whose inflow
/// exceeds its capacity (the downstream node when the upstream one is a
/// centroid). Complete tracking registers every endpoint of a segment that
/// carries flow. Returns the number of newly registered nodes.
fn activate_tracking(
    network: &Network,
    store: &mut dyn SplittingRateStore,
    inflows: &[Real],
    detailed: bool,
) -> usize {
    let mut activated = 0;
    for segment in network.link_segments() {
        let inflow = inflows.get(segment.id.idx()).copied().unwrap_or(0.0);
        let candidates = match store.tracking_scope() {
            TrackingScope::Partial => {
                if inflow <= segment.capacity_pcu_h {
                    continue;
                }
                match network.upstream_node(segment.id) {
                    Some(up) if !up.centroid => vec![up],
                    _ => network.downstream_node(segment.id).into_iter().collect(),
                }
            }
            TrackingScope::Complete => {
                if inflow <= NEGLIGIBLE_FLOW {
                    continue;
                }
                network
                    .upstream_node(segment.id)
                    .into_iter()
                    .chain(network.downstream_node(segment.id))
                    .collect()
            }
        };
        for node in candidates {
            if store.register_potentially_blocking_node(node) {
                activated += 1;
                if detailed {
                    debug!(node = %node.id, name = %node.name, segment = %segment.id, inflow,
                        "potentially blocking node registered");
                }
            }
        }
    }
    activated
}

/// One static network loading session.
pub struct NetworkLoading {
    network: Network,
    flow_update: Box<dyn FlowUpdate>,
    node_model: Box<dyn NodeModel>,
    settings: StaticLtmSettings,

    scheme: SolutionScheme,
    buffers: LoadingBuffers,
    store: Box<dyn SplittingRateStore>,
    analyser: ConvergenceAnalyser,
    acceptance_gap: NormBasedGapFunction,
    sending_gap: NormBasedGapFunction,
    receiving_gap: NormBasedGapFunction,
    capacities: Vec<Real>,

    iteration: usize,
    initialised: bool,
    converged: bool,
    escalation_exhausted: bool,
    reported_unimplemented: BTreeSet<&'static str>,
}

impl std::fmt::Debug for NetworkLoading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkLoading")
            .field("flow_update", &self.flow_update.name())
            .field("node_model", &self.node_model.name())
            .field("scheme", &self.scheme)
            .field("iteration", &self.iteration)
            .field("initialised", &self.initialised)
            .field("converged", &self.converged)
            .finish()
    }
}

impl NetworkLoading {
    pub fn new(
        network: Network,
        flow_update: impl FlowUpdate + 'static,
        node_model: impl NodeModel + 'static,
        settings: StaticLtmSettings,
    ) -> Self {
        let n = network.link_segment_count();
        let scheme = settings.initial_scheme;
        Self {
            flow_update: Box::new(flow_update),
            node_model: Box::new(node_model),
            scheme,
            buffers: LoadingBuffers::new(n),
            store: create_splitting_rate_store(scheme, &network),
            analyser: ConvergenceAnalyser::new(settings.convergence.clone()),
            acceptance_gap: NormBasedGapFunction::new(settings.flow_acceptance_gap.clone()),
            sending_gap: NormBasedGapFunction::new(settings.sending_flow_gap.clone()),
            receiving_gap: NormBasedGapFunction::new(settings.receiving_flow_gap.clone()),
            capacities: network.capacities(),
            iteration: 0,
            initialised: false,
            converged: false,
            escalation_exhausted: false,
            reported_unimplemented: BTreeSet::new(),
            network,
            settings,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn settings(&self) -> &StaticLtmSettings {
        &self.settings
    }

    pub fn scheme(&self) -> SolutionScheme {
        self.scheme
    }

    pub fn buffers(&self) -> &LoadingBuffers {
        &self.buffers
    }

    pub fn splitting_rates(&self) -> &dyn SplittingRateStore {
        self.store.as_ref()
    }

    pub fn analyser(&self) -> &ConvergenceAnalyser {
        &self.analyser
    }

    /// Completed outer iterations since initialisation.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Last global flow acceptance gap.
    pub fn acceptance_gap(&self) -> Real {
        self.acceptance_gap.gap()
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Replace the route-choice structure, for example between assignment
    /// iterations. The loading must be initialised again afterwards.
    pub fn set_flow_update(&mut self, flow_update: impl FlowUpdate + 'static) {
        self.flow_update = Box::new(flow_update);
        self.initialised = false;
    }

    /// Check settings and the route-choice structure against the network.
    pub fn validate(&self) -> LoadingResult<()> {
        let result = self.check_configuration();
        if let Err(err) = &result {
            error!(error = %err, "network loading is not configured correctly");
        }
        result
    }

    fn check_configuration(&self) -> LoadingResult<()> {
        self.settings.check().map_err(LoadingError::configuration)?;
        if self.network.link_segment_count() == 0 {
            return Err(LoadingError::configuration("network has no link segments"));
        }
        SolutionScheme::select_initial(
            self.settings.initial_scheme,
            self.settings.enforce_storage_constraints,
        )
        .map_err(LoadingError::configuration)?;
        self.flow_update.validate(&self.network)
    }

    fn ensure_initialised(&self) -> LoadingResult<()> {
        if self.initialised {
            Ok(())
        } else {
            Err(LoadingError::InvalidState {
                what: "network loading used before initialise()".to_string(),
            })
        }
    }

    fn detailed(&self) -> bool {
        self.settings.detailed_logging
    }

    fn report_unimplemented(&mut self, what: &'static str) {
        if self.reported_unimplemented.insert(what) {
            error!(scheme = %self.scheme, "{what} is not implemented for physical queues, using point queue behaviour");
        }
    }

    /// Entry segments of tracked nodes, as buffer offsets.
    fn tracked_entry_segments(&self) -> Vec<usize> {
        self.store
            .tracked_nodes()
            .into_iter()
            .filter_map(|id| self.network.node(id))
            .flat_map(|node| node.entry_segments().iter().map(|s| s.idx()))
            .collect()
    }

    /// Forget all loading state. The next use must call `initialise`.
    pub fn reset_iteration(&mut self) {
        self.buffers.reset();
        self.store.reset();
        self.analyser.reset();
        self.acceptance_gap.reset();
        self.sending_gap.reset();
        self.receiving_gap.reset();
        self.iteration = 0;
        self.initialised = false;
        self.converged = false;
        self.escalation_exhausted = false;
    }

    /// Step 0: select the scheme, load unconstrained, activate tracking and
    /// initialise sending and receiving flows.
    pub fn initialise(&mut self) -> LoadingResult<()> {
        self.validate()?;
        self.reset_iteration();
        self.scheme = SolutionScheme::select_initial(
            self.settings.initial_scheme,
            self.settings.enforce_storage_constraints,
        )
        .map_err(LoadingError::configuration)?;

        let n = self.network.link_segment_count();
        self.buffers = LoadingBuffers::new(n);
        self.store = create_splitting_rate_store(self.scheme, &self.network);
        self.capacities = self.network.capacities();

        let unconstrained = vec![1.0; n];
        let out = self.flow_update.update(
            &self.network,
            &unconstrained,
            self.store.as_ref(),
            FlowUpdateMode::SendingFlows,
        )?;
        self.buffers.inflow.assign(Slot::Current, &out.inflows);
        self.buffers.sending.assign(Slot::Current, &out.inflows);

        let activated = activate_tracking(
            &self.network,
            self.store.as_mut(),
            &out.inflows,
            self.settings.detailed_logging,
        );
        self.buffers
            .sending
            .limit_to_capacity(Slot::Current, &self.capacities);

        if self.scheme.is_physical_queue() {
            // Storage-based receiving flows are not derived yet; capacity stands in.
            self.report_unimplemented("receiving flow initialisation");
        }
        self.buffers
            .receiving
            .assign(Slot::Current, &self.capacities);

        for buffer in [
            &mut self.buffers.sending,
            &mut self.buffers.receiving,
            &mut self.buffers.inflow,
            &mut self.buffers.outflow,
            &mut self.buffers.flow_acceptance,
            &mut self.buffers.flow_capacity,
            &mut self.buffers.storage_capacity,
        ] {
            buffer.copy(Slot::Current, Slot::Next);
        }

        self.initialised = true;
        info!(
            scheme = %self.scheme,
            flow_update = self.flow_update.name(),
            potentially_blocking = activated,
            "network loading initialised"
        );
        Ok(())
    }

    /// Recompute splitting rates of tracked nodes as turn-flow proportions.
    fn update_splitting_rates(&mut self, turn_flows: &TurnFlows) {
        for id in self.store.tracked_nodes() {
            let Some(node) = self.network.node(id) else {
                continue;
            };
            for &entry in node.entry_segments() {
                let total: Real = node
                    .exit_segments()
                    .iter()
                    .map(|&exit| turn_flows.get(entry, exit))
                    .sum();
                let Some(rates) = self.store.splitting_rates_mut(entry) else {
                    continue;
                };
                for (rate, &exit) in rates.iter_mut().zip(node.exit_segments()) {
                    *rate = if total <= NEGLIGIBLE_FLOW {
                        1.0
                    } else {
                        turn_flows.get(entry, exit) / total
                    };
                }
            }
        }
    }

    /// Step 1: splitting rates from turn flows accepted under the current
    /// flow acceptance factors.
    pub fn step_one_splitting_rates_update(&mut self) -> LoadingResult<()> {
        self.ensure_initialised()?;
        let out = self.flow_update.update(
            &self.network,
            self.buffers.flow_acceptance.current(),
            self.store.as_ref(),
            FlowUpdateMode::TurnFlows,
        )?;
        self.update_splitting_rates(&out.turn_flows);
        Ok(())
    }

    /// Step 2: resolve exit inflows at potentially blocking nodes and derive
    /// sending flows, then update storage capacity factors.
    pub fn step_two_inflow_sending_flow_update(&mut self) -> LoadingResult<()> {
        self.ensure_initialised()?;
        let single_pass = !self.scheme.iterates_inner_loops();
        self.inflow_sending_flow_update(single_pass, single_pass)
    }

    fn inflow_sending_flow_update(&mut self, refresh: bool, single_pass: bool) -> LoadingResult<()> {
        let n = self.network.link_segment_count();
        if refresh {
            let out = self.flow_update.update(
                &self.network,
                self.buffers.flow_acceptance.current(),
                self.store.as_ref(),
                FlowUpdateMode::SendingFlows,
            )?;
            self.buffers.inflow.assign(Slot::Current, &out.inflows);
            self.buffers.sending.assign(Slot::Current, &out.inflows);
            self.buffers
                .sending
                .limit_to_capacity(Slot::Current, &self.capacities);
        }

        let blocking = self.store.potentially_blocking_nodes();
        let adapter = NodeModelAdapter::new(&self.network, self.node_model.as_ref());
        let mut pass = 0;
        loop {
            self.buffers.inflow.copy(Slot::Current, Slot::Next);
            for &id in &blocking {
                let Some(node) = self.network.node(id) else {
                    continue;
                };
                let Some(solution) = adapter.solve(
                    node,
                    self.buffers.sending.current(),
                    self.buffers.receiving.current(),
                    self.store.as_ref(),
                ) else {
                    continue;
                };
                let next = self.buffers.inflow.next_mut();
                for (j, exit) in solution.exits.iter().enumerate() {
                    next[exit.idx()] = solution.exit_inflow(j);
                }
            }
            self.buffers
                .sending
                .assign(Slot::Next, self.buffers.inflow.next());
            self.buffers
                .sending
                .limit_to_capacity(Slot::Next, &self.capacities);

            let gap = self.sending_gap.measure(
                self.buffers.sending.current(),
                self.buffers.sending.next(),
                0..n,
            );
            self.buffers.inflow.swap();
            self.buffers.sending.swap();
            if self.settings.detailed_logging {
                debug!(iteration = self.iteration, pass, gap, "sending flow update");
            }
            if single_pass
                || self.sending_gap.has_converged()
                || self.sending_gap.max_iterations_reached(pass)
            {
                break;
            }
            pass += 1;
        }

        // gamma = inflow / receiving flow
        self.buffers
            .storage_capacity
            .copy(Slot::Current, Slot::Next);
        let inflow = self.buffers.inflow.current();
        let receiving = self.buffers.receiving.current();
        let gamma = self.buffers.storage_capacity.next_mut();
        for node in blocking.iter().filter_map(|&id| self.network.node(id)) {
            for entry in node.entry_segments() {
                let e = entry.idx();
                gamma[e] = safe_ratio(inflow[e], receiving[e], 1.0);
            }
        }
        self.buffers.storage_capacity.swap();
        Ok(())
    }

    /// Step 3: splitting-rate refinement under intermediate flow acceptance
    /// factors. No-op for point queue schemes.
    pub fn step_three_splitting_rate_update(&mut self) -> LoadingResult<()> {
        self.ensure_initialised()?;
        if self.scheme.is_point_queue() {
            return Ok(());
        }
        let mut intermediate = self.buffers.flow_acceptance.current().to_vec();
        let beta = self.buffers.flow_capacity.current();
        let gamma = self.buffers.storage_capacity.current();
        for e in self.tracked_entry_segments() {
            intermediate[e] = safe_ratio(beta[e], gamma[e], 1.0).clamp(0.0, 1.0);
        }
        let out = self.flow_update.update(
            &self.network,
            &intermediate,
            self.store.as_ref(),
            FlowUpdateMode::TurnFlows,
        )?;
        self.update_splitting_rates(&out.turn_flows);
        Ok(())
    }

    /// Step 4: resolve entry outflows at potentially blocking nodes and
    /// update flow capacity factors.
    pub fn step_four_outflow_receiving_flow_update(&mut self) -> LoadingResult<()> {
        self.ensure_initialised()?;
        self.outflow_receiving_flow_update();
        Ok(())
    }

    fn outflow_receiving_flow_update(&mut self) {
        let blocking = self.store.potentially_blocking_nodes();
        let adapter = NodeModelAdapter::new(&self.network, self.node_model.as_ref());

        self.buffers.outflow.copy(Slot::Current, Slot::Next);
        for &id in &blocking {
            let Some(node) = self.network.node(id) else {
                continue;
            };
            let Some(solution) = adapter.solve(
                node,
                self.buffers.sending.current(),
                self.buffers.receiving.current(),
                self.store.as_ref(),
            ) else {
                continue;
            };
            let next = self.buffers.outflow.next_mut();
            for (i, entry) in solution.entries.iter().enumerate() {
                next[entry.idx()] = solution.entry_outflow(i);
            }
        }
        self.buffers.outflow.swap();

        if self.scheme.is_physical_queue() {
            // Receiving flows stay at capacity until storage-bounded targets exist.
            self.report_unimplemented("receiving flow update");
            self.receiving_gap.measure(
                self.buffers.receiving.current(),
                self.buffers.receiving.current(),
                0..self.capacities.len(),
            );
        }

        // beta = min(1, outflow / receiving flow)
        self.buffers.flow_capacity.copy(Slot::Current, Slot::Next);
        let outflow = self.buffers.outflow.current();
        let receiving = self.buffers.receiving.current();
        let beta = self.buffers.flow_capacity.next_mut();
        for node in blocking.iter().filter_map(|&id| self.network.node(id)) {
            for entry in node.entry_segments() {
                let e = entry.idx();
                beta[e] = safe_ratio(outflow[e], receiving[e], 1.0).min(1.0);
            }
        }
        self.buffers.flow_capacity.swap();
    }

    /// Step 5: new flow acceptance factors `alpha = beta / gamma` for every
    /// tracked entry segment. Returns true once the global gap is below its
    /// epsilon.
    pub fn step_five_check_convergence(&mut self) -> LoadingResult<bool> {
        self.ensure_initialised()?;
        let tracked = self.tracked_entry_segments();

        self.buffers
            .flow_acceptance
            .copy(Slot::Current, Slot::Next);
        {
            let inflow = self.buffers.inflow.current();
            let beta = self.buffers.flow_capacity.current();
            let gamma = self.buffers.storage_capacity.current();
            let alpha = self.buffers.flow_acceptance.next_mut();
            for &e in &tracked {
                alpha[e] = if inflow[e] <= NEGLIGIBLE_FLOW {
                    1.0
                } else {
                    safe_ratio(beta[e], gamma[e], 1.0).clamp(0.0, 1.0)
                };
            }
        }
        let gap = self.acceptance_gap.measure(
            self.buffers.flow_acceptance.current(),
            self.buffers.flow_acceptance.next(),
            tracked.iter().copied(),
        );
        let gap = ensure_finite(gap, "flow acceptance gap").map_err(|e| LoadingError::Numeric {
            what: format!("{e} at iteration {}", self.iteration),
        })?;
        self.analyser.register_gap(gap);
        self.buffers.flow_acceptance.swap();
        self.iteration += 1;
        self.converged = self.acceptance_gap.has_converged();

        if self.detailed() {
            debug!(
                iteration = self.iteration,
                gap,
                tracked_entries = tracked.len(),
                "flow acceptance update"
            );
        }
        Ok(self.converged)
    }

    /// Steps 1 to 5. Returns true when converged.
    pub fn iterate(&mut self) -> LoadingResult<bool> {
        self.step_one_splitting_rates_update()?;
        self.step_two_inflow_sending_flow_update()?;
        self.step_three_splitting_rate_update()?;
        self.step_four_outflow_receiving_flow_update()?;
        self.step_five_check_convergence()
    }

    /// Switch to the next, stricter scheme. Returns false when no further
    /// scheme exists; the current scheme is kept.
    pub fn escalate_solution_scheme(&mut self) -> bool {
        let Some(next) = self.scheme.escalate() else {
            self.escalation_exhausted = true;
            if self.detailed() {
                debug!(scheme = %self.scheme, "no further solution scheme available");
            }
            return false;
        };

        let previously_blocking = self.store.potentially_blocking_nodes();
        let mut store = create_splitting_rate_store(next, &self.network);
        for node in previously_blocking
            .iter()
            .filter_map(|&id| self.network.node(id))
        {
            store.register_potentially_blocking_node(node);
        }
        activate_tracking(
            &self.network,
            store.as_mut(),
            self.buffers.inflow.current(),
            self.settings.detailed_logging,
        );
        self.store = store;

        let previous = self.scheme;
        self.scheme = next;
        self.analyser
            .set_iteration_offset(self.analyser.registered_iterations());
        info!(
            from = %previous,
            to = %next,
            iteration = self.iteration,
            tracked_nodes = self.store.tracked_nodes().len(),
            "solution scheme escalated"
        );
        true
    }

    /// Step 6: consistent link flows for every segment.
    ///
    /// Partially tracked loadings first run one pass of steps 1 to 4 with every
    /// used node tracked. Flow acceptance factors are left untouched, so
    /// calling this twice yields the same results.
    pub fn step_six_finalise_for_persistence(&mut self) -> LoadingResult<LoadingResults> {
        self.ensure_initialised()?;

        if self.scheme.tracking_scope() == TrackingScope::Partial {
            let mut full = create_splitting_rate_store(SolutionScheme::PointQueueAdvanced, &self.network);
            for id in self.store.potentially_blocking_nodes() {
                if let Some(node) = self.network.node(id) {
                    full.register_potentially_blocking_node(node);
                }
            }
            activate_tracking(
                &self.network,
                full.as_mut(),
                self.buffers.inflow.current(),
                false,
            );
            let partial = std::mem::replace(&mut self.store, full);
            let pass = self.single_pass_update();
            self.store = partial;
            pass?;
        }

        let out = self.flow_update.update(
            &self.network,
            self.buffers.flow_acceptance.current(),
            self.store.as_ref(),
            FlowUpdateMode::SendingAndOutflows,
        )?;
        self.buffers.inflow.assign(Slot::Current, &out.inflows);
        self.buffers.sending.assign(Slot::Current, &out.inflows);
        self.buffers.outflow.assign(Slot::Current, &out.outflows);
        self.buffers
            .sending
            .limit_to_capacity(Slot::Current, &self.capacities);
        self.buffers
            .outflow
            .limit_to_capacity(Slot::Current, &self.capacities);
        for buffer in [
            &mut self.buffers.inflow,
            &mut self.buffers.sending,
            &mut self.buffers.outflow,
        ] {
            buffer.copy(Slot::Current, Slot::Next);
        }

        Ok(LoadingResults {
            scheme: self.scheme,
            iterations: self.iteration,
            converged: self.converged,
            inflow: self.buffers.inflows().to_vec(),
            outflow: self.buffers.outflows().to_vec(),
            sending: self.buffers.sending_flows().to_vec(),
            receiving: self.buffers.receiving_flows().to_vec(),
            flow_acceptance: self.buffers.flow_acceptance_factors().to_vec(),
            flow_capacity: self.buffers.flow_capacity_factors().to_vec(),
            storage_capacity: self.buffers.storage_capacity_factors().to_vec(),
        })
    }

    fn single_pass_update(&mut self) -> LoadingResult<()> {
        self.step_one_splitting_rates_update()?;
        self.inflow_sending_flow_update(true, true)?;
        self.step_three_splitting_rate_update()?;
        self.outflow_receiving_flow_update();
        Ok(())
    }

    /// Initialise, iterate until converged or the iteration cap is hit
    /// (escalating once progress stalls), then finalise.
    pub fn run(&mut self) -> LoadingResult<LoadingOutcome> {
        self.initialise()?;
        let max_iterations = self.settings.flow_acceptance_gap.max_iterations;

        while self.iteration < max_iterations {
            if self.iterate()? {
                break;
            }
            if !self.analyser.is_improving()
                && !self.escalation_exhausted
                && !self.settings.disable_escalation
            {
                self.escalate_solution_scheme();
            }
        }

        if self.converged {
            info!(
                iterations = self.iteration,
                gap = self.acceptance_gap.gap(),
                scheme = %self.scheme,
                "network loading converged"
            );
        } else {
            warn!(
                iterations = self.iteration,
                gap = self.acceptance_gap.gap(),
                scheme = %self.scheme,
                "network loading did not converge"
            );
        }

        let results = self.step_six_finalise_for_persistence()?;
        Ok(LoadingOutcome {
            converged: self.converged,
            iterations: self.iteration,
            final_gap: self.acceptance_gap.gap(),
            scheme: self.scheme,
            results,
        })
    }

    /// Nodes currently flagged potentially blocking.
    pub fn potentially_blocking_nodes(&self) -> Vec<NodeId> {
        self.store.potentially_blocking_nodes()
    }
}
