use trapsim::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn nanorod() -> ParameterSet {
    ParameterSet::nanorod(300.0, 1.0).unwrap()
}

fn kicked() -> State {
    State {
        z: 0.01,
        px: 0.05,
        alpha: 0.02,
        ..State::trap_minimum()
    }
}

// H0: Same seed produces different trajectories across runs
// Falsification: Integrate twice with seed=42; compare bitwise
#[test]
fn h0_1_same_seed_produces_identical_trajectories() {
    init_tracing();
    let params = nanorod();
    let span = TimeSpan::new(0.0, 5.0).unwrap();

    let first = integrate(&kicked(), &params, span, 1e-4, 42).unwrap();
    for _ in 0..5 {
        let again = integrate(&kicked(), &params, span, 1e-4, 42).unwrap();
        assert_eq!(first.times(), again.times(), "step sequence diverged");
        assert_eq!(first.states(), again.states(), "states diverged");
        assert_eq!(first.stats(), again.stats());
    }
}

// H0: Different seeds produce identical trajectories
// Falsification: Integrate with seeds 42, 43, 44; compare final states
#[test]
fn h0_2_different_seeds_produce_different_trajectories() {
    let params = nanorod();
    let span = TimeSpan::new(0.0, 5.0).unwrap();

    let finals: Vec<State> = [42, 43, 44]
        .into_iter()
        .map(|seed| {
            *integrate(&kicked(), &params, span, 1e-4, seed)
                .unwrap()
                .final_state()
                .unwrap()
        })
        .collect();

    assert_ne!(finals[0], finals[1], "Seed 42 and 43 produced identical output");
    assert_ne!(finals[1], finals[2], "Seed 43 and 44 produced identical output");
    assert_ne!(finals[0], finals[2], "Seed 42 and 44 produced identical output");
}

// H0: Ensemble statistics depend on the number of worker threads
// Falsification: Run the same ensemble on 1, 2 and 8 workers; compare JSON
#[test]
fn h0_3_ensemble_is_thread_count_invariant() {
    init_tracing();
    let params = nanorod();
    let span = TimeSpan::new(0.0, 3.0).unwrap();
    let grid = span.grid(7);

    let outputs: Vec<String> = [1, 2, 8]
        .into_iter()
        .map(|workers| {
            let config = SimConfig::builder()
                .seed(2024)
                .tolerance(1e-3)
                .trajectory_count(12)
                .workers(workers)
                .build();
            EnsembleRunner::new(&params, config)
                .unwrap()
                .run(&kicked(), span, &grid)
                .unwrap()
                .to_json()
                .unwrap()
        })
        .collect();

    assert_eq!(outputs[0], outputs[1], "1 vs 2 workers differ");
    assert_eq!(outputs[0], outputs[2], "1 vs 8 workers differ");
}

// H0: Trajectory i of an ensemble is not the trajectory of stream seed i
// Falsification: A one-trajectory ensemble reproduces integrate() exactly
#[test]
fn h0_4_ensemble_member_matches_stream_seed() {
    let params = nanorod();
    let span = TimeSpan::new(0.0, 2.0).unwrap();
    let grid = span.grid(5);
    let master = 77;

    let config = SimConfig::builder()
        .seed(master)
        .tolerance(1e-4)
        .trajectory_count(1)
        .build();
    let summary = EnsembleRunner::new(&params, config.clone())
        .unwrap()
        .run(&kicked(), span, &grid)
        .unwrap();

    let single = SdeIntegrator::new(&params, config.integrator)
        .unwrap()
        .run(
            &kicked(),
            span,
            SimRng::stream_seed(master, 0),
            &SaveMode::At(grid.clone()),
        )
        .unwrap();

    for component in StateComponent::ALL {
        let series = summary.component(component).unwrap();
        let expected = single.component(component);
        assert_eq!(series.mean, expected, "{component} mean differs");
        assert_eq!(series.lower, expected, "{component} lower differs");
        assert_eq!(series.upper, expected, "{component} upper differs");
    }
}

// H0: Repeated ensemble runs with one seed disagree
// Falsification: Run twice; compare summaries
#[test]
fn h0_5_ensemble_rerun_is_identical() {
    let params = nanorod();
    let span = TimeSpan::new(0.0, 2.0).unwrap();
    let grid = span.grid(3);
    let run = || {
        run_ensemble(&kicked(), &params, span, 1e-3, 6, &grid)
            .unwrap()
            .to_json()
            .unwrap()
    };
    assert_eq!(run(), run());
}
