/// 粒子特效
///
/// `ParticleEffect` 是发射器列表组成的模板；`EffectInstance` 是模板在某个位置
/// 生成的实例，每个发射器对应一个粒子批次。
use std::fmt;

use glam::Vec2;
use rand::Rng;
use sprite_particles_simd::SimdBackend;

use crate::batch::ParticleBatch;
use crate::dispatch::active_backend;
use crate::emitter::Emitter;
use crate::error::ParticleResult;
use crate::surface::Surface;

/// 特效模板
#[derive(Debug, Clone, Default)]
pub struct ParticleEffect {
    emitters: Vec<Emitter>,
}

impl ParticleEffect {
    pub fn new(emitters: Vec<Emitter>) -> Self {
        Self { emitters }
    }

    pub fn add_emitter(&mut self, emitter: Emitter) {
        self.emitters.push(emitter);
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    /// 在 `position` 处生成实例
    pub fn spawn<R: Rng + ?Sized>(&self, position: Vec2, rng: &mut R) -> ParticleResult<EffectInstance> {
        EffectInstance::spawn(self, position, rng)
    }
}

impl fmt::Display for ParticleEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticleEffect(emitters={})", self.emitters.len())
    }
}

/// 实例生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectState {
    /// 粒子已生成，尚未推进
    Spawning,
    /// 至少一个批次仍有存活粒子
    Active,
    /// 所有批次都已结束，可以被回收
    Ended,
}

/// 特效实例
#[derive(Debug, Clone)]
pub struct EffectInstance {
    batches: Vec<ParticleBatch>,
    position: Vec2,
    state: EffectState,
}

impl EffectInstance {
    /// 为模板中的每个发射器生成一个批次，任意一个失败则整体失败
    pub fn spawn<R: Rng + ?Sized>(
        effect: &ParticleEffect,
        position: Vec2,
        rng: &mut R,
    ) -> ParticleResult<Self> {
        Self::spawn_with_backend(effect, position, active_backend(), rng)
    }

    pub fn spawn_with_backend<R: Rng + ?Sized>(
        effect: &ParticleEffect,
        position: Vec2,
        backend: SimdBackend,
        rng: &mut R,
    ) -> ParticleResult<Self> {
        let batches = effect
            .emitters()
            .iter()
            .map(|emitter| ParticleBatch::spawn_with_backend(emitter, position, backend, rng))
            .collect::<ParticleResult<Vec<_>>>()?;

        let state = if batches.iter().all(ParticleBatch::is_ended) {
            EffectState::Ended
        } else {
            EffectState::Spawning
        };

        tracing::debug!(
            target: "particles",
            batches = batches.len(),
            x = position.x,
            y = position.y,
            state = ?state,
            "Effect instance spawned"
        );

        Ok(Self {
            batches,
            position,
            state,
        })
    }

    /// 推进所有未结束的批次
    pub fn update(&mut self, dt: f32) {
        if self.state == EffectState::Ended {
            return;
        }

        let mut active = 0;
        for batch in self.batches.iter_mut().filter(|b| !b.is_ended()) {
            batch.tick(dt);
            if !batch.is_ended() {
                active += 1;
            }
        }

        self.state = if active == 0 {
            tracing::debug!(target: "particles", "Effect instance ended");
            EffectState::Ended
        } else {
            EffectState::Active
        };
    }

    /// 按发射器顺序绘制各批次，遇到第一个错误即返回
    pub fn draw(&mut self, dest: &mut Surface) -> ParticleResult<()> {
        for batch in self.batches.iter_mut().filter(|b| !b.is_ended()) {
            batch.draw(dest)?;
        }
        Ok(())
    }

    pub fn state(&self) -> EffectState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state == EffectState::Ended
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn batches(&self) -> &[ParticleBatch] {
        &self.batches
    }

    /// 所有批次的存活粒子总数
    pub fn live_particles(&self) -> usize {
        self.batches.iter().map(ParticleBatch::live_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Animation;
    use crate::emitter::EmitterShape;
    use crate::error::ParticleError;
    use crate::surface::PixelFormat;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    fn animation() -> Arc<Animation> {
        let frame = Surface::new(2, 2, PixelFormat::Xrgb8888);
        Arc::new(Animation::new(vec![frame; 2]).unwrap())
    }

    fn emitter(count: usize, lifetime: f32) -> Emitter {
        Emitter::new(EmitterShape::Point, count, animation(), lifetime)
    }

    #[test]
    fn test_display() {
        let effect = ParticleEffect::new(vec![emitter(1, 1.0), emitter(2, 1.0)]);
        assert_eq!(effect.to_string(), "ParticleEffect(emitters=2)");
        assert_eq!(ParticleEffect::default().to_string(), "ParticleEffect(emitters=0)");
    }

    #[test]
    fn test_lifecycle() {
        let effect = ParticleEffect::new(vec![emitter(10, 1.0), emitter(5, 2.0)]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut instance = effect.spawn(Vec2::new(5.0, 5.0), &mut rng).unwrap();

        assert_eq!(instance.state(), EffectState::Spawning);
        assert_eq!(instance.batches().len(), 2);
        assert_eq!(instance.live_particles(), 15);

        instance.update(1.0);
        assert_eq!(instance.state(), EffectState::Active);
        assert!(instance.batches()[0].is_ended());
        assert_eq!(instance.live_particles(), 5);

        instance.update(1.0);
        assert!(instance.is_ended());
        assert_eq!(instance.live_particles(), 0);

        instance.update(1.0);
        assert!(instance.is_ended());
    }

    #[test]
    fn test_zero_count_emitters_end_immediately() {
        let effect = ParticleEffect::new(vec![emitter(0, 1.0)]);
        let instance = effect.spawn(Vec2::ZERO, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(instance.is_ended());

        let empty = ParticleEffect::default().spawn(Vec2::ZERO, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(empty.is_ended());
    }

    #[test]
    fn test_any_failing_emitter_fails_spawn() {
        let mut effect = ParticleEffect::new(vec![emitter(3, 1.0)]);
        effect.add_emitter(Emitter::new(EmitterShape::Circle, 3, animation(), 1.0f32));
        assert!(matches!(
            effect.spawn(Vec2::ZERO, &mut StdRng::seed_from_u64(1)),
            Err(ParticleError::UnsupportedShape(_))
        ));
    }

    #[test]
    fn test_draw_stops_at_first_error() {
        let unloaded = Arc::new(Animation::new(vec![Surface::unloaded(2, 2, PixelFormat::Xrgb8888)]).unwrap());
        let effect = ParticleEffect::new(vec![
            emitter(1, 1.0),
            Emitter::new(EmitterShape::Point, 1, unloaded, 1.0f32),
        ]);
        let mut instance = effect.spawn(Vec2::new(4.0, 4.0), &mut StdRng::seed_from_u64(1)).unwrap();

        let mut dest = Surface::new(8, 8, PixelFormat::Xrgb8888);
        assert_eq!(instance.draw(&mut dest), Err(ParticleError::UnloadedSurface { animation: 0, frame: 0 }));
        // 第一个批次在出错前已经绘制
        assert_eq!(instance.batches()[0].fragments().destinations().len(), 1);
    }
}
