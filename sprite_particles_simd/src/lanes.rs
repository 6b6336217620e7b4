//! 宽度泛型的f32通道抽象
//!
//! 内核循环体只针对 `F32Lanes` 编写一次，再由各后端的
//! `#[target_feature]` 入口以具体宽度实例化。所有方法都是
//! `#[inline(always)]`，以便在目标特性函数内展开为对应指令。

/// 尾部缓冲区的最大通道数
const MAX_LANES: usize = 16;

pub(crate) trait F32Lanes {
    type V: Copy;
    const LANES: usize;

    unsafe fn splat(x: f32) -> Self::V;
    unsafe fn load(ptr: *const f32) -> Self::V;
    unsafe fn store(ptr: *mut f32, v: Self::V);
    unsafe fn add(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn sub(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn mul(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn div(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn min(a: Self::V, b: Self::V) -> Self::V;
    unsafe fn max(a: Self::V, b: Self::V) -> Self::V;
    /// 向零截断转换为i32并写出
    unsafe fn store_i32_trunc(ptr: *mut i32, v: Self::V);

    /// 读取不足一个向量宽度的尾部，未使用的通道填0
    #[inline(always)]
    unsafe fn load_partial(ptr: *const f32, count: usize) -> Self::V {
        debug_assert!(count < Self::LANES && Self::LANES <= MAX_LANES);
        let mut buf = [0.0f32; MAX_LANES];
        std::ptr::copy_nonoverlapping(ptr, buf.as_mut_ptr(), count);
        Self::load(buf.as_ptr())
    }

    /// 只写回前 `count` 个通道
    #[inline(always)]
    unsafe fn store_partial(ptr: *mut f32, count: usize, v: Self::V) {
        debug_assert!(count < Self::LANES && Self::LANES <= MAX_LANES);
        let mut buf = [0.0f32; MAX_LANES];
        Self::store(buf.as_mut_ptr(), v);
        std::ptr::copy_nonoverlapping(buf.as_ptr(), ptr, count);
    }

    #[inline(always)]
    unsafe fn store_i32_trunc_partial(ptr: *mut i32, count: usize, v: Self::V) {
        debug_assert!(count < Self::LANES && Self::LANES <= MAX_LANES);
        let mut buf = [0i32; MAX_LANES];
        Self::store_i32_trunc(buf.as_mut_ptr(), v);
        std::ptr::copy_nonoverlapping(buf.as_ptr(), ptr, count);
    }
}

/// 标量“单通道”实现，与向量实现共享同一循环体
pub(crate) struct ScalarLanes;

impl F32Lanes for ScalarLanes {
    type V = f32;
    const LANES: usize = 1;

    #[inline(always)]
    unsafe fn splat(x: f32) -> f32 {
        x
    }
    #[inline(always)]
    unsafe fn load(ptr: *const f32) -> f32 {
        *ptr
    }
    #[inline(always)]
    unsafe fn store(ptr: *mut f32, v: f32) {
        *ptr = v;
    }
    #[inline(always)]
    unsafe fn add(a: f32, b: f32) -> f32 {
        a + b
    }
    #[inline(always)]
    unsafe fn sub(a: f32, b: f32) -> f32 {
        a - b
    }
    #[inline(always)]
    unsafe fn mul(a: f32, b: f32) -> f32 {
        a * b
    }
    #[inline(always)]
    unsafe fn div(a: f32, b: f32) -> f32 {
        a / b
    }
    #[inline(always)]
    unsafe fn min(a: f32, b: f32) -> f32 {
        a.min(b)
    }
    #[inline(always)]
    unsafe fn max(a: f32, b: f32) -> f32 {
        a.max(b)
    }
    #[inline(always)]
    unsafe fn store_i32_trunc(ptr: *mut i32, v: f32) {
        *ptr = v as i32;
    }
}

#[cfg(target_arch = "x86_64")]
pub(crate) use x86::{Avx2Lanes, Sse2Lanes};

#[cfg(target_arch = "x86_64")]
mod x86 {
    use super::F32Lanes;
    use std::arch::x86_64::*;

    /// SSE2，4通道
    pub(crate) struct Sse2Lanes;

    impl F32Lanes for Sse2Lanes {
        type V = __m128;
        const LANES: usize = 4;

        #[inline(always)]
        unsafe fn splat(x: f32) -> __m128 {
            _mm_set1_ps(x)
        }
        #[inline(always)]
        unsafe fn load(ptr: *const f32) -> __m128 {
            _mm_loadu_ps(ptr)
        }
        #[inline(always)]
        unsafe fn store(ptr: *mut f32, v: __m128) {
            _mm_storeu_ps(ptr, v)
        }
        #[inline(always)]
        unsafe fn add(a: __m128, b: __m128) -> __m128 {
            _mm_add_ps(a, b)
        }
        #[inline(always)]
        unsafe fn sub(a: __m128, b: __m128) -> __m128 {
            _mm_sub_ps(a, b)
        }
        #[inline(always)]
        unsafe fn mul(a: __m128, b: __m128) -> __m128 {
            _mm_mul_ps(a, b)
        }
        #[inline(always)]
        unsafe fn div(a: __m128, b: __m128) -> __m128 {
            _mm_div_ps(a, b)
        }
        #[inline(always)]
        unsafe fn min(a: __m128, b: __m128) -> __m128 {
            _mm_min_ps(a, b)
        }
        #[inline(always)]
        unsafe fn max(a: __m128, b: __m128) -> __m128 {
            _mm_max_ps(a, b)
        }
        #[inline(always)]
        unsafe fn store_i32_trunc(ptr: *mut i32, v: __m128) {
            _mm_storeu_si128(ptr as *mut __m128i, _mm_cvttps_epi32(v))
        }
    }

    /// AVX2，8通道；尾部使用掩码读写而不是缓冲区
    pub(crate) struct Avx2Lanes;

    #[inline(always)]
    unsafe fn tail_mask(count: usize) -> __m256i {
        let lane = |k: usize| if count > k { -1 } else { 0 };
        _mm256_setr_epi32(lane(0), lane(1), lane(2), lane(3), lane(4), lane(5), lane(6), 0)
    }

    impl F32Lanes for Avx2Lanes {
        type V = __m256;
        const LANES: usize = 8;

        #[inline(always)]
        unsafe fn splat(x: f32) -> __m256 {
            _mm256_set1_ps(x)
        }
        #[inline(always)]
        unsafe fn load(ptr: *const f32) -> __m256 {
            _mm256_loadu_ps(ptr)
        }
        #[inline(always)]
        unsafe fn store(ptr: *mut f32, v: __m256) {
            _mm256_storeu_ps(ptr, v)
        }
        #[inline(always)]
        unsafe fn add(a: __m256, b: __m256) -> __m256 {
            _mm256_add_ps(a, b)
        }
        #[inline(always)]
        unsafe fn sub(a: __m256, b: __m256) -> __m256 {
            _mm256_sub_ps(a, b)
        }
        #[inline(always)]
        unsafe fn mul(a: __m256, b: __m256) -> __m256 {
            _mm256_mul_ps(a, b)
        }
        #[inline(always)]
        unsafe fn div(a: __m256, b: __m256) -> __m256 {
            _mm256_div_ps(a, b)
        }
        #[inline(always)]
        unsafe fn min(a: __m256, b: __m256) -> __m256 {
            _mm256_min_ps(a, b)
        }
        #[inline(always)]
        unsafe fn max(a: __m256, b: __m256) -> __m256 {
            _mm256_max_ps(a, b)
        }
        #[inline(always)]
        unsafe fn store_i32_trunc(ptr: *mut i32, v: __m256) {
            _mm256_storeu_si256(ptr as *mut __m256i, _mm256_cvttps_epi32(v))
        }

        #[inline(always)]
        unsafe fn load_partial(ptr: *const f32, count: usize) -> __m256 {
            _mm256_maskload_ps(ptr, tail_mask(count))
        }
        #[inline(always)]
        unsafe fn store_partial(ptr: *mut f32, count: usize, v: __m256) {
            _mm256_maskstore_ps(ptr, tail_mask(count), v)
        }
        #[inline(always)]
        unsafe fn store_i32_trunc_partial(ptr: *mut i32, count: usize, v: __m256) {
            _mm256_maskstore_epi32(ptr, tail_mask(count), _mm256_cvttps_epi32(v))
        }
    }
}

#[cfg(target_arch = "aarch64")]
pub(crate) use arm::NeonLanes;

#[cfg(target_arch = "aarch64")]
mod arm {
    use super::F32Lanes;
    use std::arch::aarch64::*;

    /// ARM NEON，4通道
    pub(crate) struct NeonLanes;

    impl F32Lanes for NeonLanes {
        type V = float32x4_t;
        const LANES: usize = 4;

        #[inline(always)]
        unsafe fn splat(x: f32) -> float32x4_t {
            vdupq_n_f32(x)
        }
        #[inline(always)]
        unsafe fn load(ptr: *const f32) -> float32x4_t {
            vld1q_f32(ptr)
        }
        #[inline(always)]
        unsafe fn store(ptr: *mut f32, v: float32x4_t) {
            vst1q_f32(ptr, v)
        }
        #[inline(always)]
        unsafe fn add(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vaddq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn sub(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vsubq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn mul(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vmulq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn div(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vdivq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn min(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vminq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn max(a: float32x4_t, b: float32x4_t) -> float32x4_t {
            vmaxq_f32(a, b)
        }
        #[inline(always)]
        unsafe fn store_i32_trunc(ptr: *mut i32, v: float32x4_t) {
            vst1q_s32(ptr, vcvtq_s32_f32(v))
        }
    }
}
