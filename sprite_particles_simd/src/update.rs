/// 粒子积分内核
///
/// 对结构数组布局的粒子数据执行一次时间步：
/// 加速度（仅对启用的轴）→ 速度 → 位置（仅对运动的轴），然后生命周期减去 `dt`。
/// 每个轴的运动方式 × 各后端宽度由同一个泛型循环体实例化。

use crate::lanes::{F32Lanes, ScalarLanes};
use crate::SimdBackend;

#[cfg(target_arch = "x86_64")]
use crate::lanes::{Avx2Lanes, Sse2Lanes};

#[cfg(target_arch = "aarch64")]
use crate::lanes::NeonLanes;

/// 加速度启用情况，决定内核读写哪些数组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateVariant {
    /// 无加速度
    NoAcceleration,
    /// 仅X轴加速度
    AccelerationX,
    /// 仅Y轴加速度
    AccelerationY,
    /// 两个轴都有加速度
    AccelerationXY,
}

impl UpdateVariant {
    /// 根据两个轴的加速度是否启用选择变体
    pub fn from_axes(accel_x: bool, accel_y: bool) -> Self {
        match (accel_x, accel_y) {
            (false, false) => Self::NoAcceleration,
            (true, false) => Self::AccelerationX,
            (false, true) => Self::AccelerationY,
            (true, true) => Self::AccelerationXY,
        }
    }

    pub fn uses_acceleration_x(&self) -> bool {
        matches!(self, Self::AccelerationX | Self::AccelerationXY)
    }

    pub fn uses_acceleration_y(&self) -> bool {
        matches!(self, Self::AccelerationY | Self::AccelerationXY)
    }
}

/// 单个轴的运动方式
///
/// 没有速度也没有加速度的轴不分配数组，内核也不会读写它。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisMotion {
    /// 位置不变
    Fixed,
    /// 匀速
    Velocity,
    /// 有加速度，速度每步更新
    Accelerated,
}

impl AxisMotion {
    /// 加速度启用时速度数组也必须存在（速度未设置时为0）
    pub fn from_activity(velocity: bool, acceleration: bool) -> Self {
        match (velocity, acceleration) {
            (_, true) => Self::Accelerated,
            (true, false) => Self::Velocity,
            (false, false) => Self::Fixed,
        }
    }

    pub fn has_velocity(&self) -> bool {
        !matches!(self, Self::Fixed)
    }

    pub fn has_acceleration(&self) -> bool {
        matches!(self, Self::Accelerated)
    }
}

/// 两个轴的运动方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Motion {
    pub x: AxisMotion,
    pub y: AxisMotion,
}

impl Motion {
    pub fn new(x: AxisMotion, y: AxisMotion) -> Self {
        Self { x, y }
    }

    /// 对应的加速度变体
    pub fn variant(&self) -> UpdateVariant {
        UpdateVariant::from_axes(self.x.has_acceleration(), self.y.has_acceleration())
    }

    /// 两个轴都不动，只推进生命周期
    pub fn is_stationary(&self) -> bool {
        self.x == AxisMotion::Fixed && self.y == AxisMotion::Fixed
    }
}

/// 两个轴都有速度，加速度按变体启用
impl From<UpdateVariant> for Motion {
    fn from(variant: UpdateVariant) -> Self {
        Self {
            x: AxisMotion::from_activity(true, variant.uses_acceleration_x()),
            y: AxisMotion::from_activity(true, variant.uses_acceleration_y()),
        }
    }
}

/// 一次积分所需的数组切片
///
/// 处理的粒子数由 `lifetimes.len()` 决定；固定轴的速度切片和未启用轴的
/// 加速度切片可以为空。
pub struct UpdateSlices<'a> {
    pub positions_x: &'a mut [f32],
    pub positions_y: &'a mut [f32],
    pub velocities_x: &'a mut [f32],
    pub velocities_y: &'a mut [f32],
    pub accelerations_x: &'a [f32],
    pub accelerations_y: &'a [f32],
    pub lifetimes: &'a mut [f32],
}

impl UpdateSlices<'_> {
    /// 本次处理的粒子数
    pub fn len(&self) -> usize {
        self.lifetimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lifetimes.is_empty()
    }

    fn check(&self, motion: Motion) {
        let n = self.len();
        assert!(
            self.positions_x.len() >= n && self.positions_y.len() >= n,
            "position slices shorter than lifetimes ({})",
            n
        );
        if motion.x.has_velocity() {
            assert!(self.velocities_x.len() >= n, "velocity_x slice too short");
        }
        if motion.y.has_velocity() {
            assert!(self.velocities_y.len() >= n, "velocity_y slice too short");
        }
        if motion.x.has_acceleration() {
            assert!(self.accelerations_x.len() >= n, "acceleration_x slice too short");
        }
        if motion.y.has_acceleration() {
            assert!(self.accelerations_y.len() >= n, "acceleration_y slice too short");
        }
    }
}

/// 选定后的积分内核
///
/// 运动方式和后端在创建时确定，之后不再改变。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateKernel {
    motion: Motion,
    backend: SimdBackend,
}

impl UpdateKernel {
    /// 创建内核；当前CPU不支持的后端会退回标量实现
    pub fn new(motion: Motion, backend: SimdBackend) -> Self {
        let resolved = backend.supported_or_scalar();
        if resolved != backend {
            tracing::warn!(
                target: "simd",
                requested = %backend,
                "Update kernel backend not supported on this CPU, using scalar"
            );
        }
        Self {
            motion,
            backend: resolved,
        }
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn variant(&self) -> UpdateVariant {
        self.motion.variant()
    }

    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    /// 对切片中的全部粒子执行一次积分
    pub fn run(&self, mut slices: UpdateSlices<'_>, dt: f32) {
        slices.check(self.motion);
        if slices.is_empty() {
            return;
        }

        // SAFETY: 切片长度已校验；后端在构造时已确认被当前CPU支持
        unsafe {
            match self.backend {
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Avx2 => run_avx2(self.motion, &mut slices, dt),
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Sse2 => run_sse2(self.motion, &mut slices, dt),
                #[cfg(target_arch = "aarch64")]
                SimdBackend::Neon => run_neon(self.motion, &mut slices, dt),
                _ => dispatch::<ScalarLanes>(self.motion, &mut slices, dt),
            }
        }
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn run_avx2(motion: Motion, s: &mut UpdateSlices<'_>, dt: f32) {
    dispatch::<Avx2Lanes>(motion, s, dt)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn run_sse2(motion: Motion, s: &mut UpdateSlices<'_>, dt: f32) {
    dispatch::<Sse2Lanes>(motion, s, dt)
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn run_neon(motion: Motion, s: &mut UpdateSlices<'_>, dt: f32) {
    dispatch::<NeonLanes>(motion, s, dt)
}

const FIXED: u8 = 0;
const VELOCITY: u8 = 1;
const ACCELERATED: u8 = 2;

#[inline(always)]
unsafe fn dispatch<L: F32Lanes>(motion: Motion, s: &mut UpdateSlices<'_>, dt: f32) {
    match motion.x {
        AxisMotion::Fixed => dispatch_y::<L, { FIXED }>(motion.y, s, dt),
        AxisMotion::Velocity => dispatch_y::<L, { VELOCITY }>(motion.y, s, dt),
        AxisMotion::Accelerated => dispatch_y::<L, { ACCELERATED }>(motion.y, s, dt),
    }
}

#[inline(always)]
unsafe fn dispatch_y<L: F32Lanes, const MX: u8>(y: AxisMotion, s: &mut UpdateSlices<'_>, dt: f32) {
    match y {
        AxisMotion::Fixed => integrate::<L, MX, { FIXED }>(s, dt),
        AxisMotion::Velocity => integrate::<L, MX, { VELOCITY }>(s, dt),
        AxisMotion::Accelerated => integrate::<L, MX, { ACCELERATED }>(s, dt),
    }
}

struct Columns {
    px: *mut f32,
    py: *mut f32,
    vx: *mut f32,
    vy: *mut f32,
    ax: *const f32,
    ay: *const f32,
    t: *mut f32,
}

#[inline(always)]
unsafe fn integrate<L: F32Lanes, const MX: u8, const MY: u8>(
    s: &mut UpdateSlices<'_>,
    dt: f32,
) {
    let n = s.len();
    let c = Columns {
        px: s.positions_x.as_mut_ptr(),
        py: s.positions_y.as_mut_ptr(),
        vx: s.velocities_x.as_mut_ptr(),
        vy: s.velocities_y.as_mut_ptr(),
        ax: s.accelerations_x.as_ptr(),
        ay: s.accelerations_y.as_ptr(),
        t: s.lifetimes.as_mut_ptr(),
    };
    let dt_v = L::splat(dt);

    let full = n - n % L::LANES;
    let mut i = 0;
    while i < full {
        step::<L, MX, MY, true>(&c, i, L::LANES, dt_v);
        i += L::LANES;
    }
    if full < n {
        step::<L, MX, MY, false>(&c, full, n - full, dt_v);
    }
}

#[inline(always)]
unsafe fn load<L: F32Lanes, const FULL: bool>(ptr: *const f32, count: usize) -> L::V {
    if FULL {
        L::load(ptr)
    } else {
        L::load_partial(ptr, count)
    }
}

#[inline(always)]
unsafe fn store<L: F32Lanes, const FULL: bool>(ptr: *mut f32, count: usize, v: L::V) {
    if FULL {
        L::store(ptr, v)
    } else {
        L::store_partial(ptr, count, v)
    }
}

#[inline(always)]
unsafe fn step<L: F32Lanes, const MX: u8, const MY: u8, const FULL: bool>(
    c: &Columns,
    i: usize,
    count: usize,
    dt_v: L::V,
) {
    advance::<L, MX, FULL>(c.px, c.vx, c.ax, i, count, dt_v);
    advance::<L, MY, FULL>(c.py, c.vy, c.ay, i, count, dt_v);

    let t = L::sub(load::<L, FULL>(c.t.add(i), count), dt_v);
    store::<L, FULL>(c.t.add(i), count, t);
}

/// 推进一个轴；固定轴的指针可能悬空，不能解引用
#[inline(always)]
unsafe fn advance<L: F32Lanes, const M: u8, const FULL: bool>(
    p: *mut f32,
    v: *mut f32,
    a: *const f32,
    i: usize,
    count: usize,
    dt_v: L::V,
) {
    if M == FIXED {
        return;
    }
    let mut vel = load::<L, FULL>(v.add(i), count);
    if M == ACCELERATED {
        vel = L::add(vel, L::mul(load::<L, FULL>(a.add(i), count), dt_v));
        store::<L, FULL>(v.add(i), count, vel);
    }
    let pos = L::add(load::<L, FULL>(p.add(i), count), L::mul(vel, dt_v));
    store::<L, FULL>(p.add(i), count, pos);
}
