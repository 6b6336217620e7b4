use std::sync::Arc;

use glam::Vec2;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sprite_particles::{
    Animation, Emitter, EmitterShape, ParticleBatch, PixelFormat, SimdBackend, Surface,
};

fn animation(frames: usize) -> Arc<Animation> {
    let format = PixelFormat::Xrgb8888;
    let mut frame = Surface::new(3, 3, format);
    frame.fill(format.pack(20, 20, 20, 0xFF));
    Arc::new(Animation::new(vec![frame; frames]).unwrap())
}

fn emitter(count: usize, lifetime: (f32, f32), accel: bool) -> Emitter {
    let e = Emitter::new(EmitterShape::Point, count, animation(4), lifetime)
        .with_speed_x((-50.0f32, 50.0f32))
        .with_speed_y((-50.0f32, 50.0f32));
    if accel {
        e.with_acceleration_x((-3.0f32, 3.0f32)).with_acceleration_y(9.8f32)
    } else {
        e
    }
}

fn spawn(emitter: &Emitter, backend: SimdBackend, seed: u64) -> ParticleBatch {
    ParticleBatch::spawn_with_backend(emitter, Vec2::new(32.0, 32.0), backend, &mut StdRng::seed_from_u64(seed))
        .unwrap()
}

proptest! {
    #[test]
    fn prop_lifetimes_stay_sorted(
        count in 0usize..200,
        seed in any::<u64>(),
        dts in prop::collection::vec(0.0f32..0.5, 0..12),
    ) {
        let mut batch = spawn(&emitter(count, (0.1, 3.0), false), SimdBackend::Scalar, seed);
        for dt in dts {
            batch.tick(dt);
            let lifetimes = batch.buffers().lifetimes();
            prop_assert!(lifetimes.windows(2).all(|w| w[0] >= w[1]));
            prop_assert_eq!(batch.buffers().max_lifetimes().len(), lifetimes.len());
        }
    }

    #[test]
    fn prop_culling_removes_exactly_expired(
        count in 1usize..200,
        seed in any::<u64>(),
        dt in 0.01f32..2.0,
    ) {
        let mut batch = spawn(&emitter(count, (0.1, 2.0), false), SimdBackend::Scalar, seed);
        let expected_live = batch
            .buffers()
            .lifetimes()
            .iter()
            .filter(|&&t| t - dt > 0.0)
            .count();

        batch.tick(dt);
        prop_assert_eq!(batch.live_count(), expected_live);
        prop_assert_eq!(batch.is_ended(), expected_live == 0);
        prop_assert!(batch.buffers().lifetimes().iter().all(|&t| t > 0.0));
    }

    #[test]
    fn prop_best_backend_matches_scalar(
        count in 0usize..150,
        seed in any::<u64>(),
        accel in any::<bool>(),
        ticks in 1usize..15,
    ) {
        let e = emitter(count, (0.5, 3.0), accel);
        let mut scalar = spawn(&e, SimdBackend::Scalar, seed);
        let mut best = spawn(&e, SimdBackend::best_available(), seed);
        for _ in 0..ticks {
            scalar.tick(1.0 / 30.0);
            best.tick(1.0 / 30.0);
        }

        prop_assert_eq!(scalar.live_count(), best.live_count());
        let (a, b) = (scalar.buffers(), best.buffers());
        for (x, y) in a.positions_x().iter().zip(b.positions_x()) {
            prop_assert!((x - y).abs() <= 1e-4);
        }
        for (x, y) in a.positions_y().iter().zip(b.positions_y()) {
            prop_assert!((x - y).abs() <= 1e-4);
        }
        prop_assert!(a.velocities_y().is_some() && b.velocities_y().is_some());
        let (va, vb) = (a.velocities_y().unwrap_or_default(), b.velocities_y().unwrap_or_default());
        for (x, y) in va.iter().zip(vb) {
            prop_assert!((x - y).abs() <= 1e-4);
        }
    }

    #[test]
    fn prop_fragments_partition_live_particles(
        count in 0usize..200,
        seed in any::<u64>(),
        elapsed in 0.0f32..1.0,
    ) {
        let pooled = emitter(count, (0.5, 2.0), true).with_animation(animation(4));
        let mut batch = spawn(&pooled, SimdBackend::Scalar, seed);
        batch.tick(elapsed);

        let mut screen = Surface::new(64, 64, PixelFormat::Xrgb8888);
        batch.draw(&mut screen).unwrap();

        let map = batch.fragments();
        let runs: i32 = map.fragments().iter().map(|f| f.run_length).sum();
        prop_assert_eq!(runs as usize, map.destinations().len());

        let frames = batch.buffers().frame_indices();
        let animations = batch.buffers().animation_indices();
        let mut next = 0;
        for fragment in map.fragments() {
            prop_assert_eq!(fragment.start, next);
            prop_assert!(fragment.span > 0);
            prop_assert!(fragment.run_length >= 0 && fragment.run_length as usize <= fragment.span);
            prop_assert!((0..4).contains(&fragment.frame_index));
            let range = fragment.start..fragment.start + fragment.span;
            prop_assert!(frames[range.clone()].iter().all(|&f| f == fragment.frame_index));
            prop_assert!(animations[range].iter().all(|&a| a == fragment.animation_index));
            next += fragment.span;
        }
        prop_assert_eq!(next, batch.live_count());
    }

    #[test]
    fn prop_zero_dt_changes_nothing(
        count in 0usize..100,
        seed in any::<u64>(),
        warmup in 0.0f32..1.0,
    ) {
        let mut batch = spawn(&emitter(count, (0.5, 2.0), true), SimdBackend::best_available(), seed);
        batch.tick(warmup);
        let before = batch.buffers().clone();
        let ended = batch.is_ended();

        batch.tick(0.0);
        prop_assert_eq!(batch.buffers(), &before);
        prop_assert_eq!(batch.is_ended(), ended);
    }
}
