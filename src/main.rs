//! 粒子演示程序
//!
//! 在320x240的画面中心生成两个发射器组成的特效，推进若干帧后把结果写入PNG。

use std::error::Error;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use sprite_particles::{
    configure_backend, Animation, BlendMode, Emitter, EmitterShape, ParticleConfig,
    ParticleEffect, PixelFormat, Surface,
};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const DT: f32 = 1.0 / 30.0;
const FRAMES: usize = 24;
const OUTPUT: &str = "particles.png";

fn main() {
    if let Err(e) = run() {
        eprintln!("Particle demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let mut config = ParticleConfig::load_or_default();
    config.apply_env_overrides();
    config.validate()?;
    config.logging.init_tracing();
    let backend = configure_backend(&config.simd);

    let sparks = Arc::new(fading_sprite(3, 4, [255, 200, 80])?);
    let embers = Arc::new(fading_sprite(2, 4, [255, 110, 40])?);
    let smoke = Arc::new(fading_sprite(5, 6, [60, 90, 160])?);

    let effect = ParticleEffect::new(vec![
        Emitter::new(EmitterShape::Point, 400, sparks, (0.3f32, 0.8f32))
            .with_speed_x((-120.0f32, 120.0f32))
            .with_speed_y((-160.0f32, 40.0f32))
            .with_acceleration_y(240.0f32)
            .with_animation(embers),
        Emitter::new(EmitterShape::Point, 150, smoke, (0.5f32, 1.0f32))
            .with_speed_x((-30.0f32, 30.0f32))
            .with_speed_y((-60.0f32, -20.0f32))
            .with_blend_mode(BlendMode::Additive),
    ]);

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let center = glam::Vec2::new(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0);
    let mut instance = effect.spawn(center, &mut rng)?;
    let mut screen = Surface::new(WIDTH, HEIGHT, PixelFormat::Xrgb8888);

    for frame in 0..FRAMES {
        instance.update(DT);
        if instance.is_ended() {
            tracing::info!(target: "demo", frame, "Effect ended early");
            break;
        }
        instance.draw(&mut screen)?;
    }

    tracing::info!(
        target: "demo",
        backend = %backend,
        live = instance.live_particles(),
        state = ?instance.state(),
        "Simulation finished"
    );

    let rgba = screen.to_rgba8().ok_or("screen surface has no pixels")?;
    let image = image::RgbaImage::from_raw(WIDTH, HEIGHT, rgba)
        .ok_or("pixel buffer does not match image size")?;
    image.save(OUTPUT)?;
    tracing::info!(target: "demo", path = OUTPUT, "Frame written");
    Ok(())
}

/// 生成 `frames` 帧边长为 `size` 的方形精灵，亮度逐帧递减
fn fading_sprite(size: u32, frames: u32, rgb: [u8; 3]) -> Result<Animation, Box<dyn Error>> {
    let format = PixelFormat::Xrgb8888;
    let surfaces = (0..frames)
        .map(|i| {
            let scale = (frames - i) as f32 / frames as f32 * 0.25;
            let [r, g, b] = rgb.map(|c| (c as f32 * scale) as u8);
            let mut surface = Surface::new(size, size, format);
            surface.fill(format.pack(r, g, b, 0xFF));
            surface
        })
        .collect();
    Ok(Animation::new(surfaces)?)
}
