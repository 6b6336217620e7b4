//! 粒子批次
//!
//! 一次发射产生的全部粒子，以结构数组形式存储。
//!
//! ## 不变量
//!
//! - 所有数组长度等于容量（发射数量），`live_count <= capacity`
//! - `lifetimes[..live_count]` 始终非递增：生成时降序排序，之后每次更新
//!   对所有元素减去同一个 `dt`
//! - 速度和加速度数组按轴分配：该轴的速度和加速度都未设置时不分配速度，
//!   加速度未设置时不分配加速度
//! - `animation_indices` 取值于发射器动画池的下标范围
//!
//! 每帧流程：积分内核 → 二分剔除 → 帧索引计算；绘制时重建分段映射并合成。

pub mod culling;

use std::collections::TryReserveError;
use std::sync::Arc;

use glam::Vec2;
use rand::Rng;
use sprite_particles_simd::{
    AxisMotion, BlendKernel, FrameKernel, Motion, SimdBackend, UpdateKernel, UpdateSlices,
    UpdateVariant,
};

use crate::animation::Animation;
use crate::blit;
use crate::dispatch::active_backend;
use crate::emitter::{BlendMode, Emitter, EmitterShape};
use crate::error::{ParticleError, ParticleResult};
use crate::fragment::{DestinationGeometry, FragmentationMap, ParticleView};
use crate::generator::Generator;
use crate::surface::Surface;

pub use culling::Expiration;

/// 粒子数据的结构数组存储
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleBuffers {
    positions_x: Vec<f32>,
    positions_y: Vec<f32>,
    velocities_x: Option<Vec<f32>>,
    velocities_y: Option<Vec<f32>>,
    accelerations_x: Option<Vec<f32>>,
    accelerations_y: Option<Vec<f32>>,
    lifetimes: Vec<f32>,
    max_lifetimes: Vec<f32>,
    animation_indices: Vec<u32>,
    frame_indices: Vec<i32>,
    live_count: usize,
}

impl ParticleBuffers {
    /// 总容量（发射数量）
    pub fn capacity(&self) -> usize {
        self.lifetimes.len()
    }

    pub fn live_count(&self) -> usize {
        self.live_count
    }

    fn live<'a, T>(&self, values: &'a [T]) -> &'a [T] {
        &values[..self.live_count]
    }

    pub fn positions_x(&self) -> &[f32] {
        self.live(&self.positions_x)
    }

    pub fn positions_y(&self) -> &[f32] {
        self.live(&self.positions_y)
    }

    /// X轴速度；该轴既无速度也无加速度时为 `None`
    pub fn velocities_x(&self) -> Option<&[f32]> {
        self.velocities_x.as_deref().map(|v| self.live(v))
    }

    pub fn velocities_y(&self) -> Option<&[f32]> {
        self.velocities_y.as_deref().map(|v| self.live(v))
    }

    /// X轴加速度；该轴未启用时为 `None`
    pub fn accelerations_x(&self) -> Option<&[f32]> {
        self.accelerations_x.as_deref().map(|a| self.live(a))
    }

    pub fn accelerations_y(&self) -> Option<&[f32]> {
        self.accelerations_y.as_deref().map(|a| self.live(a))
    }

    pub fn lifetimes(&self) -> &[f32] {
        self.live(&self.lifetimes)
    }

    pub fn max_lifetimes(&self) -> &[f32] {
        self.live(&self.max_lifetimes)
    }

    /// 动画池下标（单动画发射器时全为0）
    pub fn animation_indices(&self) -> &[u32] {
        self.live(&self.animation_indices)
    }

    /// 最近一次计算的帧索引
    pub fn frame_indices(&self) -> &[i32] {
        self.live(&self.frame_indices)
    }

    /// 存活前缀对应的积分切片
    fn update_slices(&mut self) -> UpdateSlices<'_> {
        let n = self.live_count;
        UpdateSlices {
            positions_x: &mut self.positions_x[..n],
            positions_y: &mut self.positions_y[..n],
            velocities_x: self.velocities_x.as_deref_mut().map(|v| &mut v[..n]).unwrap_or_default(),
            velocities_y: self.velocities_y.as_deref_mut().map(|v| &mut v[..n]).unwrap_or_default(),
            accelerations_x: self.accelerations_x.as_deref().map(|a| &a[..n]).unwrap_or_default(),
            accelerations_y: self.accelerations_y.as_deref().map(|a| &a[..n]).unwrap_or_default(),
            lifetimes: &mut self.lifetimes[..n],
        }
    }
}

fn try_filled<T: Clone>(count: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(count)?;
    v.resize(count, value);
    Ok(v)
}

/// 按轴的运动方式采样速度；只有加速度的轴速度从0开始
fn try_velocities<R: Rng + ?Sized>(
    motion: AxisMotion,
    count: usize,
    speed: &Generator,
    rng: &mut R,
) -> Result<Option<Vec<f32>>, TryReserveError> {
    if motion.has_velocity() {
        try_sampled(count, speed, rng).map(Some)
    } else {
        Ok(None)
    }
}

fn try_accelerations<R: Rng + ?Sized>(
    motion: AxisMotion,
    count: usize,
    acceleration: &Generator,
    rng: &mut R,
) -> Result<Option<Vec<f32>>, TryReserveError> {
    if motion.has_acceleration() {
        try_sampled(count, acceleration, rng).map(Some)
    } else {
        Ok(None)
    }
}

fn try_sampled<R: Rng + ?Sized>(
    count: usize,
    g: &Generator,
    rng: &mut R,
) -> Result<Vec<f32>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(count)?;
    v.extend((0..count).map(|_| g.sample(rng)));
    Ok(v)
}

/// 一次发射的粒子批次
#[derive(Debug, Clone)]
pub struct ParticleBatch {
    buffers: ParticleBuffers,
    ended: bool,
    blend_mode: BlendMode,
    animations: Vec<Arc<Animation>>,
    sprite_sizes: Vec<(u32, u32)>,
    num_frames: usize,
    update: UpdateKernel,
    frames: FrameKernel,
    blend: BlendKernel,
    fragments: FragmentationMap,
}

impl ParticleBatch {
    /// 在 `origin` 处按发射器生成粒子，内核后端使用进程级配置
    pub fn spawn<R: Rng + ?Sized>(
        emitter: &Emitter,
        origin: Vec2,
        rng: &mut R,
    ) -> ParticleResult<Self> {
        Self::spawn_with_backend(emitter, origin, active_backend(), rng)
    }

    /// 使用指定后端生成；CPU不支持时退回标量实现
    pub fn spawn_with_backend<R: Rng + ?Sized>(
        emitter: &Emitter,
        origin: Vec2,
        backend: SimdBackend,
        rng: &mut R,
    ) -> ParticleResult<Self> {
        emitter.validate()?;
        let count = emitter.emission_number();
        let motion = Self::motion_of(emitter);
        let buffers = Self::allocate(emitter, motion, origin, rng)
            .map_err(|_| ParticleError::Allocation { count })?;

        let animations = emitter.animations().to_vec();
        let mut batch = Self {
            ended: buffers.live_count == 0,
            buffers,
            blend_mode: emitter.blend_mode(),
            sprite_sizes: animations.iter().map(|a| a.frame_size()).collect(),
            num_frames: emitter.num_frames(),
            animations,
            update: UpdateKernel::new(motion, backend),
            frames: FrameKernel::new(backend),
            blend: BlendKernel::new(backend),
            fragments: FragmentationMap::new(),
        };
        batch.compute_frame_indices();

        tracing::debug!(
            target: "particles",
            count,
            motion = ?motion,
            backend = %batch.update.backend(),
            frames = batch.num_frames,
            pool = batch.animations.len(),
            "Particle batch spawned"
        );
        Ok(batch)
    }

    /// 每个轴的运动方式由该轴的速度和加速度是否设置决定
    fn motion_of(emitter: &Emitter) -> Motion {
        Motion::new(
            AxisMotion::from_activity(
                emitter.speed_x().is_active(),
                emitter.acceleration_x().is_active(),
            ),
            AxisMotion::from_activity(
                emitter.speed_y().is_active(),
                emitter.acceleration_y().is_active(),
            ),
        )
    }

    fn allocate<R: Rng + ?Sized>(
        emitter: &Emitter,
        motion: Motion,
        origin: Vec2,
        rng: &mut R,
    ) -> Result<ParticleBuffers, TryReserveError> {
        let n = emitter.emission_number();

        let (positions_x, positions_y) = match emitter.shape() {
            EmitterShape::Point => (try_filled(n, origin.x)?, try_filled(n, origin.y)?),
            // validate() 已拒绝其他形状
            EmitterShape::Circle | EmitterShape::Rectangle => (Vec::new(), Vec::new()),
        };

        let velocities_x = try_velocities(motion.x, n, emitter.speed_x(), rng)?;
        let velocities_y = try_velocities(motion.y, n, emitter.speed_y(), rng)?;
        let accelerations_x = try_accelerations(motion.x, n, emitter.acceleration_x(), rng)?;
        let accelerations_y = try_accelerations(motion.y, n, emitter.acceleration_y(), rng)?;

        let mut lifetimes = try_sampled(n, emitter.lifetime(), rng)?;
        lifetimes.sort_unstable_by(|a, b| b.total_cmp(a));
        let mut max_lifetimes = Vec::new();
        max_lifetimes.try_reserve_exact(n)?;
        max_lifetimes.extend_from_slice(&lifetimes);

        // 单动画时不消耗随机数
        let pool = emitter.animations().len();
        let animation_indices = if pool > 1 {
            let mut v = Vec::new();
            v.try_reserve_exact(n)?;
            v.extend((0..n).map(|_| rng.gen_range(0..pool) as u32));
            v
        } else {
            try_filled(n, 0)?
        };

        Ok(ParticleBuffers {
            positions_x,
            positions_y,
            velocities_x,
            velocities_y,
            accelerations_x,
            accelerations_y,
            lifetimes,
            max_lifetimes,
            animation_indices,
            frame_indices: try_filled(n, 0)?,
            live_count: n,
        })
    }

    /// 推进 `dt` 秒并剔除过期粒子
    ///
    /// 已结束的批次和 `dt == 0` 时不做任何修改。
    pub fn tick(&mut self, dt: f32) {
        if self.ended || dt == 0.0 {
            return;
        }

        self.update.run(self.buffers.update_slices(), dt);

        match culling::expire(self.buffers.lifetimes()) {
            Expiration::Unchanged => {}
            Expiration::Shrunk(live) => self.buffers.live_count = live,
            Expiration::Ended => {
                self.buffers.live_count = 0;
                self.ended = true;
                tracing::trace!(target: "particles", "Particle batch ended");
                return;
            }
        }

        self.compute_frame_indices();
    }

    fn compute_frame_indices(&mut self) {
        let n = self.buffers.live_count;
        let b = &mut self.buffers;
        self.frames.compute(
            &b.lifetimes[..n],
            &b.max_lifetimes[..n],
            self.num_frames,
            &mut b.frame_indices[..n],
        );
    }

    /// 用批次自身的混合模式绘制
    pub fn draw(&mut self, dest: &mut Surface) -> ParticleResult<()> {
        self.draw_with(dest, self.blend_mode)
    }

    /// 用指定混合模式绘制到 `dest`
    pub fn draw_with(&mut self, dest: &mut Surface, mode: BlendMode) -> ParticleResult<()> {
        let geometry = DestinationGeometry {
            clip: dest.clip_rect(),
            pitch: dest.pitch(),
        };
        let b = &self.buffers;
        let particles = ParticleView {
            animation_indices: b.animation_indices(),
            frame_indices: b.frame_indices(),
            positions_x: b.positions_x(),
            positions_y: b.positions_y(),
        };
        self.fragments
            .rebuild(particles, self.num_frames, &self.sprite_sizes, geometry);
        blit::composite(&self.fragments, &self.animations, dest, mode, &self.blend)
    }

    pub fn buffers(&self) -> &ParticleBuffers {
        &self.buffers
    }

    pub fn live_count(&self) -> usize {
        self.buffers.live_count
    }

    pub fn capacity(&self) -> usize {
        self.buffers.capacity()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// 发射器的动画池
    pub fn animations(&self) -> &[Arc<Animation>] {
        &self.animations
    }

    pub fn motion(&self) -> Motion {
        self.update.motion()
    }

    pub fn variant(&self) -> UpdateVariant {
        self.update.variant()
    }

    pub fn backend(&self) -> SimdBackend {
        self.update.backend()
    }

    /// 最近一次绘制使用的分段映射
    pub fn fragments(&self) -> &FragmentationMap {
        &self.fragments
    }
}
