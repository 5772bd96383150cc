//! Marker/grid transfer tests
//!
//! Interpolation exactness, spread conservation, and agreement between the
//! atomic and privatized spreading strategies.

use glam::Vec3;
use ibm3d::transfer::{interpolate_velocities, spread_forces, TransferBuffers};
use ibm3d::{BodyId, BodyRecord, BodySet, Field3D, Markers, SpreadStrategy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn field(components: usize) -> Field3D {
    Field3D::new(Vec3::ZERO, 0.1, [10, 10, 10], 2, components).unwrap()
}

fn body_with_volume(dv: f32, count: usize) -> BodySet {
    let mut bodies = BodySet::new();
    bodies.insert(BodyRecord {
        location: Vec3::splat(0.5),
        velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
        orientation: Vec3::ZERO,
        radius: 0.2,
        density: 3.0,
        first_marker_id: 0,
        marker_count: count,
        marker_volume: dv,
    });
    bodies
}

fn random_markers(rng: &mut StdRng, count: usize) -> Markers {
    let mut markers = Markers::new();
    for _ in 0..count {
        let pos = Vec3::new(
            rng.gen_range(0.1..0.9),
            rng.gen_range(0.1..0.9),
            rng.gen_range(0.1..0.9),
        );
        markers.spawn(BodyId(0), pos, Vec3::ZERO);
    }
    markers
}

/// Constant fields are interpolated exactly at every marker
#[test]
fn test_interpolation_of_constant_field() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut f = field(3);
    let c = Vec3::new(0.7, -1.5, 2.25);
    f.fill_vector(0, c);
    let mut markers = random_markers(&mut rng, 64);

    interpolate_velocities(&f, 0, &mut markers, &body_with_volume(1e-3, 64)).unwrap();

    for m in markers.iter() {
        assert!(
            (m.velocity - c).length() < 1e-4,
            "Marker {} got {:?}, expected {:?}",
            m.id,
            m.velocity,
            c
        );
    }
}

/// Linear fields are reproduced because the kernel's first moment vanishes
#[test]
fn test_interpolation_of_linear_field() {
    let mut rng = StdRng::seed_from_u64(2);
    let mut f = field(3);
    let linear = |p: Vec3| Vec3::new(1.0 + 2.0 * p.x, -p.y + 0.5 * p.z, 3.0 * p.x - p.z);
    f.fill_vector_with(0, linear);
    let mut markers = random_markers(&mut rng, 64);

    interpolate_velocities(&f, 0, &mut markers, &body_with_volume(1e-3, 64)).unwrap();

    for m in markers.iter() {
        let expected = linear(m.position);
        assert!(
            (m.velocity - expected).length() < 1e-3,
            "Marker at {:?}: got {:?}, expected {:?}",
            m.position,
            m.velocity,
            expected
        );
    }
}

/// Interpolation never writes the field
#[test]
fn test_interpolation_leaves_field_untouched() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut f = field(3);
    f.fill_vector_with(0, |p| p * 2.0);
    let before: Vec<f32> = f.channel(1).to_vec();
    let mut markers = random_markers(&mut rng, 16);

    interpolate_velocities(&f, 0, &mut markers, &body_with_volume(1e-3, 16)).unwrap();

    assert_eq!(f.channel(1), &before[..]);
}

/// Spread force integrates to F * dv for any sub-cell offset
#[test]
fn test_spread_conservation_random_offsets() {
    let mut rng = StdRng::seed_from_u64(4);
    let dv = 3.5e-4;
    let bodies = body_with_volume(dv, 1);

    for _ in 0..20 {
        let mut f = field(3);
        let buffers = TransferBuffers::new(&f);
        let mut markers = random_markers(&mut rng, 1);
        let force = Vec3::new(
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
            rng.gen_range(-5.0..5.0),
        );
        markers.list[0].force = force;

        spread_forces(&mut f, 0, &markers, &bodies, SpreadStrategy::Atomic, &buffers).unwrap();

        let total = f.integrate_vector(0);
        assert!(
            (total - force * dv).length() < 1e-5,
            "Spread total {:?}, expected {:?}",
            total,
            force * dv
        );
    }
}

/// Atomic and privatized spreading give the same field
#[test]
fn test_spread_strategies_agree() {
    let mut rng = StdRng::seed_from_u64(5);
    let bodies = body_with_volume(1e-3, 500);
    let mut markers = random_markers(&mut rng, 500);
    for m in markers.list.iter_mut() {
        m.force = Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
        );
    }

    let mut atomic = field(3);
    let mut private = field(3);
    let buffers = TransferBuffers::new(&atomic);
    spread_forces(&mut atomic, 0, &markers, &bodies, SpreadStrategy::Atomic, &buffers).unwrap();
    spread_forces(&mut private, 0, &markers, &bodies, SpreadStrategy::Privatized, &buffers)
        .unwrap();

    for c in 0..3 {
        for (a, p) in atomic.channel(c).iter().zip(private.channel(c)) {
            assert!((a - p).abs() < 1e-3, "Atomic {} vs privatized {}", a, p);
        }
    }
}

/// Spreading twice replaces rather than accumulates
#[test]
fn test_spread_resets_force_channels() {
    let bodies = body_with_volume(1e-3, 1);
    let mut markers = Markers::new();
    markers.spawn(BodyId(0), Vec3::new(0.52, 0.47, 0.5), Vec3::ZERO);
    markers.list[0].force = Vec3::new(2.0, 0.0, -1.0);

    let mut f = field(3);
    let buffers = TransferBuffers::new(&f);
    spread_forces(&mut f, 0, &markers, &bodies, SpreadStrategy::Atomic, &buffers).unwrap();
    let once = f.integrate_vector(0);
    spread_forces(&mut f, 0, &markers, &bodies, SpreadStrategy::Atomic, &buffers).unwrap();
    let twice = f.integrate_vector(0);

    assert!((once - twice).length() < 1e-7, "{:?} vs {:?}", once, twice);
}

/// Velocity and force can share one field on disjoint channels
#[test]
fn test_combined_field_channels() {
    let bodies = body_with_volume(1e-3, 1);
    let mut markers = Markers::new();
    markers.spawn(BodyId(0), Vec3::splat(0.5), Vec3::ZERO);
    markers.list[0].force = Vec3::X;

    let mut f = field(6);
    f.fill_vector(0, Vec3::new(1.0, 0.0, 0.0));
    let buffers = TransferBuffers::new(&f);

    interpolate_velocities(&f, 0, &mut markers, &bodies).unwrap();
    spread_forces(&mut f, 3, &markers, &bodies, SpreadStrategy::Atomic, &buffers).unwrap();

    assert!((markers.list[0].velocity - Vec3::X).length() < 1e-4);
    // Velocity channels untouched by the spread
    assert!(f.channel(0).iter().all(|&u| u == 1.0));
    assert!((f.integrate_vector(3) - Vec3::X * 1e-3).length() < 1e-7);
}

/// Channel ranges past the component count are rejected
#[test]
fn test_channel_out_of_range() {
    let f = field(3);
    let mut markers = Markers::new();
    markers.spawn(BodyId(0), Vec3::splat(0.5), Vec3::ZERO);
    let bodies = body_with_volume(1e-3, 1);
    assert!(interpolate_velocities(&f, 1, &mut markers, &bodies).is_err());
}

/// Markers of unknown bodies are neither stencil-checked nor interpolated
#[test]
fn test_orphan_markers_skip_interpolation() {
    let mut f = field(3);
    f.fill_vector(0, Vec3::new(0.0, 1.0, 0.0));
    let bodies = body_with_volume(1e-3, 1);
    let mut markers = Markers::new();
    markers.spawn(BodyId(0), Vec3::splat(0.5), Vec3::ZERO);
    // Far outside the stored region
    markers.spawn(BodyId(9), Vec3::new(5.0, 0.5, 0.5), Vec3::ZERO);
    markers.list[1].velocity = Vec3::new(7.0, 0.0, 0.0);

    interpolate_velocities(&f, 0, &mut markers, &bodies).unwrap();

    assert!((markers.list[0].velocity - Vec3::Y).length() < 1e-4);
    assert_eq!(markers.list[1].velocity, Vec3::new(7.0, 0.0, 0.0));
}
