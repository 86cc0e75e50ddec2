use sltm_loading::{NetworkLoading, SolutionScheme, TampereNodeModel};
use std::path::{Path, PathBuf};

fn scenarios_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
}

#[test]
fn scenarios_load_and_compile() {
    let scenarios = [
        "01_single_bottleneck.yaml",
        "02_merge_advanced.yaml",
        "03_diverge_bush.yaml",
    ];

    for name in scenarios {
        let path = scenarios_dir().join(name);
        let scenario = sltm_scenario::load_yaml(&path)
            .unwrap_or_else(|e| panic!("Failed to load {}: {}", name, e));
        sltm_scenario::compile(&scenario)
            .unwrap_or_else(|e| panic!("Failed to compile {}: {}", name, e));
    }
}

fn run(name: &str) -> (sltm_scenario::CompiledScenario, sltm_loading::LoadingOutcome) {
    let scenario = sltm_scenario::load_yaml(&scenarios_dir().join(name)).unwrap();
    let compiled = sltm_scenario::compile(&scenario).unwrap();
    let mut loading = NetworkLoading::new(
        compiled.network.clone(),
        compiled.flow_update.clone(),
        TampereNodeModel,
        compiled.settings.clone(),
    );
    let outcome = loading.run().unwrap();
    (compiled, outcome)
}

#[test]
fn single_bottleneck_scenario() {
    let (compiled, outcome) = run("01_single_bottleneck.yaml");
    assert!(outcome.converged);
    let ab = compiled.segment_id("A-B").unwrap();
    assert!((outcome.results.outflow(ab) - 1000.0).abs() < 1e-6);
}

#[test]
fn merge_scenario_uses_requested_scheme() {
    let (compiled, outcome) = run("02_merge_advanced.yaml");
    assert!(outcome.converged);
    assert_eq!(outcome.scheme, SolutionScheme::PointQueueAdvanced);
    assert_eq!(compiled.settings.convergence.max_iteration_threshold, 8);
    let a1m = compiled.segment_id("A1-M").unwrap();
    let mx = compiled.segment_id("M-X").unwrap();
    assert!((outcome.results.outflow(a1m) - 1000.0).abs() < 1e-6);
    assert!((outcome.results.inflow(mx) - 2000.0).abs() < 1e-6);
}

#[test]
fn diverge_bush_scenario() {
    let (compiled, outcome) = run("03_diverge_bush.yaml");
    assert!(outcome.converged);
    let ax = compiled.segment_id("A-X").unwrap();
    let ay = compiled.segment_id("A-Y").unwrap();
    assert!((outcome.results.inflow(ax) - 1000.0).abs() < 1e-6);
    assert!((outcome.results.inflow(ay) - 500.0).abs() < 1e-6);
}
