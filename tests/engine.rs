//! Stepping engine behaviour, driven through the CPU backend and a recording
//! backend.

mod common;

use common::{Call, RecordingBackend};
use flowlab::prelude::*;
use rand::Rng;

fn cpu_engine(nx: u32, ny: u32, substeps: u32) -> SteppingEngine<CpuBackend> {
    let config = EngineConfig::new(nx, ny, substeps, SimParams::default());
    SteppingEngine::new(CpuBackend::new(), &config).unwrap()
}

fn bits(values: &[f32]) -> Vec<u32> {
    values.iter().map(|v| v.to_bits()).collect()
}

#[test]
fn test_buffer_sizes_after_construction() {
    let engine = cpu_engine(48, 20, 1);
    let cells = 48 * 20;

    assert_eq!(engine.read_distribution(Parity::Even).unwrap().len(), 9 * cells);
    assert_eq!(engine.read_distribution(Parity::Odd).unwrap().len(), 9 * cells);
    assert_eq!(engine.read_speed().unwrap().len(), cells);
    assert_eq!(engine.read_solid_mask().unwrap().len(), cells);

    let backend = engine.backend();
    assert_eq!(backend.buffer_size(engine.speed_buffer()), 4 * cells as u64);
    assert_eq!(backend.buffer_size(engine.solid_mask_buffer()), 4 * cells as u64);
    for buffer in engine.distribution_buffers() {
        assert_eq!(backend.buffer_size(buffer), 36 * cells as u64);
    }
}

#[test]
fn test_construction_leaves_engine_ready_at_step_zero() {
    let engine = cpu_engine(32, 32, 3);
    assert_eq!(engine.state(), EngineState::Ready);
    assert_eq!(engine.step_index(), 0);
    assert_eq!(engine.generation(), 0);
    assert_eq!(engine.substeps(), 3);
    assert_eq!(engine.current_parity(), Parity::Even);
}

#[test]
fn test_reset_initializes_both_distributions_identically() {
    let mut engine = cpu_engine(40, 24, 2);
    engine.advance(Some(5));
    engine.reset();

    assert_eq!(engine.step_index(), 0);
    let even = bits(&engine.read_distribution(Parity::Even).unwrap());
    let odd = bits(&engine.read_distribution(Parity::Odd).unwrap());
    assert_eq!(even, odd);
}

#[test]
fn test_reset_is_idempotent() {
    let mut engine = cpu_engine(40, 24, 2);
    engine.advance(None);
    engine.reset();
    let first = (
        bits(&engine.read_distribution(Parity::Even).unwrap()),
        engine.read_solid_mask().unwrap(),
    );

    engine.reset();
    let second = (
        bits(&engine.read_distribution(Parity::Even).unwrap()),
        engine.read_solid_mask().unwrap(),
    );
    assert_eq!(first, second);
    assert_eq!(engine.step_index(), 0);
}

#[test]
fn test_airfoil_is_rasterized_on_reset() {
    let engine = cpu_engine(128, 64, 1);
    let mask = engine.read_solid_mask().unwrap();
    let solid = mask.iter().filter(|s| **s).count();
    assert!(solid > 0);

    let mesh = engine.mesh();
    for x in 0..mesh.nx {
        assert!(!mask[mesh.index(x, 0)]);
        assert!(!mask[mesh.index(x, mesh.ny - 1)]);
    }
}

#[test]
fn test_parity_follows_step_index() {
    let mut engine = cpu_engine(16, 16, 1);
    for k in 0..6u64 {
        assert_eq!(engine.step_index(), k);
        let expected = if k % 2 == 0 { Parity::Even } else { Parity::Odd };
        assert_eq!(engine.current_parity(), expected);
        assert!(engine
            .input_buffer()
            .same_allocation(&engine.distribution_buffers()[expected.index()]));
        engine.advance(Some(1));
    }
}

#[test]
fn test_zero_substeps_behaves_like_one() {
    let mut zero = cpu_engine(24, 24, 1);
    let mut one = cpu_engine(24, 24, 1);

    assert_eq!(zero.advance(Some(0)), 1);
    assert_eq!(one.advance(Some(1)), 1);
    assert_eq!(zero.step_index(), 1);

    assert_eq!(
        bits(&zero.read_distribution(Parity::Odd).unwrap()),
        bits(&one.read_distribution(Parity::Odd).unwrap())
    );
    assert_eq!(bits(&zero.read_speed().unwrap()), bits(&one.read_speed().unwrap()));
}

#[test]
fn test_set_substeps_clamps_to_one() {
    let mut engine = cpu_engine(16, 16, 4);
    engine.set_substeps(0);
    assert_eq!(engine.substeps(), 1);
    assert_eq!(engine.advance(None), 1);
}

#[test]
fn test_resize_matches_fresh_engine() {
    let mut resized = cpu_engine(64, 48, 3);
    resized.advance(None);
    resized.advance(Some(2));
    resized.resize(40, 72).unwrap();

    let fresh = cpu_engine(40, 72, 3);

    assert_eq!(resized.mesh(), fresh.mesh());
    assert_eq!(resized.plan(), fresh.plan());
    assert_eq!(resized.step_index(), 0);
    assert_eq!(resized.generation(), 1);
    for parity in [Parity::Even, Parity::Odd] {
        assert_eq!(
            bits(&resized.read_distribution(parity).unwrap()),
            bits(&fresh.read_distribution(parity).unwrap())
        );
    }
    assert_eq!(resized.read_solid_mask().unwrap(), fresh.read_solid_mask().unwrap());
    assert_eq!(bits(&resized.read_speed().unwrap()), bits(&fresh.read_speed().unwrap()));
}

#[test]
fn test_resize_clamps_zero_dimensions() {
    let mut engine = cpu_engine(16, 16, 1);
    engine.resize(0, 7).unwrap();
    assert_eq!(engine.mesh(), Mesh::new(1, 7));
    assert_eq!(engine.read_speed().unwrap().len(), 7);
    assert_eq!(engine.advance(None), 1);
}

#[test]
fn test_old_handles_survive_resize() {
    let mut engine = cpu_engine(32, 32, 1);
    let old_speed = engine.speed_buffer().clone();
    engine.resize(64, 64).unwrap();

    assert!(!old_speed.same_allocation(engine.speed_buffer()));
    assert_eq!(old_speed.len(), 32 * 32);
}

#[test]
fn test_set_parameters_keeps_sizes_and_step() {
    let mut engine = cpu_engine(32, 16, 2);
    engine.advance(None);
    let mesh = engine.mesh();

    let params = SimParams::new(0.52, 0.05, -12.0, 0.2, 0.04);
    engine.set_parameters(params);

    assert_eq!(engine.params(), params);
    assert_eq!(engine.mesh(), mesh);
    assert_eq!(engine.step_index(), 2);
    assert_eq!(engine.read_speed().unwrap().len(), 32 * 16);
}

#[test]
fn test_set_parameters_does_not_rebuild_mask_until_reset() {
    let mut engine = cpu_engine(96, 64, 1);
    let before = engine.read_solid_mask().unwrap();

    engine.set_parameters(SimParams::new(0.6, 0.09, 25.0, 0.45, 0.15));
    assert_eq!(engine.read_solid_mask().unwrap(), before);

    engine.reset();
    assert_ne!(engine.read_solid_mask().unwrap(), before);
}

#[test]
fn test_end_to_end_small_lattice() {
    let config = EngineConfig::new(64, 64, 4, SimParams::default());
    let mut engine = SteppingEngine::new(CpuBackend::new(), &config).unwrap();

    assert_eq!(engine.advance(None), 4);
    assert_eq!(engine.step_index(), 4);

    let speed = engine.read_speed().unwrap();
    assert_eq!(speed.len(), 4096);
    assert!(speed.iter().all(|s| s.is_finite()));

    let mask = engine.read_solid_mask().unwrap();
    for (s, solid) in speed.iter().zip(&mask) {
        if *solid {
            assert_eq!(*s, 0.0);
        }
    }
    assert!(engine
        .read_distribution(engine.current_parity())
        .unwrap()
        .iter()
        .all(|f| f.is_finite()));
}

#[test]
fn test_free_stream_speed_without_obstacle() {
    let params = SimParams::new(0.6, 0.09, 0.0, 0.0, 0.15);
    let config = EngineConfig::new(32, 16, 10, params);
    let mut engine = SteppingEngine::new(CpuBackend::new(), &config).unwrap();
    engine.advance(None);

    let u0 = params.inlet_speed();
    assert!(engine.read_solid_mask().unwrap().iter().all(|s| !s));
    assert!(engine
        .read_speed()
        .unwrap()
        .iter()
        .all(|s| (s - u0).abs() < 1e-4));
}

#[test]
fn test_dispatch_plan_for_default_grid() {
    let engine = cpu_engine(256, 256, 1);
    assert_eq!(engine.plan().group_count, 256);
    assert_eq!(engine.plan().group_size, 256);
}

#[test]
fn test_random_meshes_are_sized_consistently() {
    let mut rng = rand::rng();
    for _ in 0..8 {
        let nx = rng.random_range(1..=80);
        let ny = rng.random_range(1..=80);
        let mut engine = cpu_engine(nx, ny, 1);
        let cells = (nx * ny) as usize;

        assert_eq!(engine.read_speed().unwrap().len(), cells);
        assert_eq!(engine.read_distribution(Parity::Odd).unwrap().len(), 9 * cells);
        assert!(engine.plan().invocations() >= cells as u64);
        assert!(engine.plan().invocations() < cells as u64 + 256);

        engine.advance(Some(2));
        assert!(engine.read_speed().unwrap().iter().all(|s| s.is_finite()));
    }
}

#[test]
fn test_reset_records_initialization_then_mask() {
    let engine = SteppingEngine::new(RecordingBackend::new(), &EngineConfig::default()).unwrap();
    let backend = engine.backend();

    // allocation order: mask, even, odd, speed
    assert_eq!(backend.allocations().len(), 4);
    assert_eq!(
        backend.take_calls(),
        vec![
            Call::Initialize { dist_out: 1 },
            Call::Initialize { dist_out: 2 },
            Call::SolidMask { mask_out: 0 },
        ]
    );
    assert_eq!(backend.waits(), 1);
}

#[test]
fn test_steps_alternate_buffers() {
    let mut engine =
        SteppingEngine::new(RecordingBackend::new(), &EngineConfig::default()).unwrap();
    engine.backend().take_calls();

    engine.advance(Some(3));
    assert_eq!(
        engine.backend().take_calls(),
        vec![
            Call::CollideStream { dist_in: 1, mask_in: 0, dist_out: 2, speed_out: 3 },
            Call::Boundary { dist: 2 },
            Call::CollideStream { dist_in: 2, mask_in: 0, dist_out: 1, speed_out: 3 },
            Call::Boundary { dist: 1 },
            Call::CollideStream { dist_in: 1, mask_in: 0, dist_out: 2, speed_out: 3 },
            Call::Boundary { dist: 2 },
        ]
    );
    assert_eq!(engine.step_index(), 3);
    // advance never blocks
    assert_eq!(engine.backend().waits(), 1);
}

#[test]
fn test_steps_see_latest_parameters() {
    let mut engine =
        SteppingEngine::new(RecordingBackend::new(), &EngineConfig::default()).unwrap();
    let params = SimParams::new(0.55, 0.02, 3.0, 0.3, 0.15);
    engine.set_parameters(params);
    engine.advance(None);

    let args = engine.backend().last_args().unwrap();
    assert_eq!(args.params, params);
    assert_eq!(args.mesh, engine.mesh());
}

#[test]
fn test_allocation_failure_aborts_construction() {
    let result = SteppingEngine::new(RecordingBackend::failing_on(2), &EngineConfig::default());
    assert!(matches!(result, Err(EngineError::Allocation { .. })));

    let result = SteppingEngine::new(
        CpuBackend::with_buffer_limit(1024),
        &EngineConfig::default(),
    );
    assert!(matches!(result, Err(EngineError::Allocation { .. })));
}

#[test]
fn test_failed_resize_keeps_previous_lattice() {
    let config = EngineConfig::default().with_grid(64, 64);
    let mut engine = SteppingEngine::new(RecordingBackend::failing_on(6), &config).unwrap();
    engine.advance(Some(3));
    engine.backend().take_calls();

    let err = engine.resize(128, 128).unwrap_err();
    assert!(matches!(err, EngineError::Allocation { .. }));
    assert_eq!(engine.mesh(), Mesh::new(64, 64));
    assert_eq!(engine.step_index(), 3);
    assert_eq!(engine.generation(), 0);
    assert_eq!(engine.state(), EngineState::Ready);
    assert!(engine.backend().take_calls().is_empty());

    engine.advance(Some(1));
    assert_eq!(
        engine.backend().take_calls()[0],
        Call::CollideStream { dist_in: 2, mask_in: 0, dist_out: 1, speed_out: 3 }
    );
}

#[test]
fn test_cpu_resize_beyond_limit_keeps_running() {
    let config = EngineConfig::new(32, 32, 2, SimParams::default());
    let mut engine = SteppingEngine::new(CpuBackend::with_buffer_limit(64 * 1024), &config).unwrap();

    assert!(engine.resize(256, 256).is_err());
    assert_eq!(engine.mesh(), Mesh::new(32, 32));
    assert_eq!(engine.advance(None), 2);
    assert!(engine.read_speed().unwrap().iter().all(|s| s.is_finite()));
}

#[test]
fn test_resize_rejects_unaddressable_mesh() {
    let mut engine =
        SteppingEngine::new(RecordingBackend::new(), &EngineConfig::default()).unwrap();
    let err = engine.resize(u32::MAX, u32::MAX).unwrap_err();
    assert!(matches!(err, EngineError::CapacityOverflow { .. }));
    assert_eq!(engine.mesh(), Mesh::new(256, 256));
}
