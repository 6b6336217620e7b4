/// 动画帧索引内核
///
/// `frame = trunc(clamp((1 - lifetime / max_lifetime) * num_frames, 0, num_frames - 1))`
///
/// 钳制在浮点域完成，截断发生在钳制之后，因此结果等价于向下取整。

use crate::lanes::{F32Lanes, ScalarLanes};
use crate::SimdBackend;

#[cfg(target_arch = "x86_64")]
use crate::lanes::{Avx2Lanes, Sse2Lanes};

#[cfg(target_arch = "aarch64")]
use crate::lanes::NeonLanes;

/// 帧索引计算内核
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameKernel {
    backend: SimdBackend,
}

impl FrameKernel {
    pub fn new(backend: SimdBackend) -> Self {
        Self {
            backend: backend.supported_or_scalar(),
        }
    }

    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    /// 为 `lifetimes` 中每个粒子写出帧索引
    ///
    /// `max_lifetimes` 与 `out` 至少与 `lifetimes` 等长；`num_frames` 必须大于0。
    pub fn compute(&self, lifetimes: &[f32], max_lifetimes: &[f32], num_frames: usize, out: &mut [i32]) {
        let n = lifetimes.len();
        assert!(
            max_lifetimes.len() >= n && out.len() >= n,
            "max_lifetimes/out slices shorter than lifetimes ({})",
            n
        );
        assert!(num_frames > 0, "animation must have at least one frame");
        if n == 0 {
            return;
        }

        let frames = num_frames as f32;
        let last = (num_frames - 1) as f32;
        let cols = FrameColumns {
            life: lifetimes.as_ptr(),
            max: max_lifetimes.as_ptr(),
            out: out.as_mut_ptr(),
        };

        // SAFETY: 长度已校验；后端在构造时已确认被当前CPU支持
        unsafe {
            match self.backend {
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Avx2 => frames_avx2(&cols, n, frames, last),
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Sse2 => frames_sse2(&cols, n, frames, last),
                #[cfg(target_arch = "aarch64")]
                SimdBackend::Neon => frames_neon(&cols, n, frames, last),
                _ => compute_frames::<ScalarLanes>(&cols, n, frames, last),
            }
        }
    }
}

struct FrameColumns {
    life: *const f32,
    max: *const f32,
    out: *mut i32,
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn frames_avx2(c: &FrameColumns, n: usize, frames: f32, last: f32) {
    compute_frames::<Avx2Lanes>(c, n, frames, last)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn frames_sse2(c: &FrameColumns, n: usize, frames: f32, last: f32) {
    compute_frames::<Sse2Lanes>(c, n, frames, last)
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn frames_neon(c: &FrameColumns, n: usize, frames: f32, last: f32) {
    compute_frames::<NeonLanes>(c, n, frames, last)
}

#[inline(always)]
unsafe fn compute_frames<L: F32Lanes>(c: &FrameColumns, n: usize, frames: f32, last: f32) {
    let one = L::splat(1.0);
    let zero = L::splat(0.0);
    let frames_v = L::splat(frames);
    let last_v = L::splat(last);

    let full = n - n % L::LANES;
    let mut i = 0;
    while i < full {
        let v = frame_of::<L>(L::load(c.life.add(i)), L::load(c.max.add(i)), one, zero, frames_v, last_v);
        L::store_i32_trunc(c.out.add(i), v);
        i += L::LANES;
    }
    if full < n {
        let count = n - full;
        let v = frame_of::<L>(
            L::load_partial(c.life.add(full), count),
            L::load_partial(c.max.add(full), count),
            one,
            zero,
            frames_v,
            last_v,
        );
        L::store_i32_trunc_partial(c.out.add(full), count, v);
    }
}

#[inline(always)]
unsafe fn frame_of<L: F32Lanes>(life: L::V, max: L::V, one: L::V, zero: L::V, frames: L::V, last: L::V) -> L::V {
    let elapsed = L::sub(one, L::div(life, max));
    L::min(L::max(L::mul(elapsed, frames), zero), last)
}
