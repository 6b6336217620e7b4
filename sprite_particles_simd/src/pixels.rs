/// 像素行合成内核
///
/// 像素为32位打包值（每通道8位）。复制直接覆盖；加法混合对源像素先按
/// `rgb_mask` 屏蔽掉非颜色通道，再与目标逐字节饱和相加，目标的其余通道保持不变。

use crate::SimdBackend;

/// 单个像素的饱和加法
///
/// # 示例
///
/// ```rust
/// use sprite_particles_simd::add_pixel_saturating;
///
/// let out = add_pixel_saturating(0x00C8_C8C8, 0xFFC8_C8C8, 0x00FF_FFFF);
/// assert_eq!(out, 0x00FF_FFFF);
/// ```
#[inline]
pub fn add_pixel_saturating(dst: u32, src: u32, rgb_mask: u32) -> u32 {
    let d = dst.to_ne_bytes();
    let s = (src & rgb_mask).to_ne_bytes();
    u32::from_ne_bytes([
        d[0].saturating_add(s[0]),
        d[1].saturating_add(s[1]),
        d[2].saturating_add(s[2]),
        d[3].saturating_add(s[3]),
    ])
}

/// 复制一行像素，长度取两者较短者
#[inline]
pub fn copy_row(dst: &mut [u32], src: &[u32]) {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
}

/// 加法混合内核
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendKernel {
    backend: SimdBackend,
}

impl BlendKernel {
    pub fn new(backend: SimdBackend) -> Self {
        Self {
            backend: backend.supported_or_scalar(),
        }
    }

    pub fn backend(&self) -> SimdBackend {
        self.backend
    }

    /// 将 `src` 一行加到 `dst` 上，长度取两者较短者
    #[inline]
    pub fn add_row(&self, dst: &mut [u32], src: &[u32], rgb_mask: u32) {
        let n = dst.len().min(src.len());
        let (dst, src) = (&mut dst[..n], &src[..n]);

        // SAFETY: 两个切片都截到了n；后端在构造时已确认被当前CPU支持
        let done = unsafe {
            match self.backend {
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Avx2 => x86::add_avx2(dst, src, rgb_mask),
                #[cfg(target_arch = "x86_64")]
                SimdBackend::Sse2 => x86::add_sse2(dst, src, rgb_mask),
                #[cfg(target_arch = "aarch64")]
                SimdBackend::Neon => arm::add_neon(dst, src, rgb_mask),
                _ => 0,
            }
        };

        for (d, &s) in dst[done..].iter_mut().zip(&src[done..]) {
            *d = add_pixel_saturating(*d, s, rgb_mask);
        }
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use std::arch::x86_64::*;

    /// 处理完整的4像素组，返回已处理的像素数
    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn add_sse2(dst: &mut [u32], src: &[u32], rgb_mask: u32) -> usize {
        let full = dst.len() - dst.len() % 4;
        let mask = _mm_set1_epi32(rgb_mask as i32);
        let mut i = 0;
        while i < full {
            let d = _mm_loadu_si128(dst.as_ptr().add(i) as *const __m128i);
            let s = _mm_and_si128(_mm_loadu_si128(src.as_ptr().add(i) as *const __m128i), mask);
            _mm_storeu_si128(dst.as_mut_ptr().add(i) as *mut __m128i, _mm_adds_epu8(d, s));
            i += 4;
        }
        full
    }

    /// 处理完整的8像素组，返回已处理的像素数
    #[target_feature(enable = "avx2")]
    pub(super) unsafe fn add_avx2(dst: &mut [u32], src: &[u32], rgb_mask: u32) -> usize {
        let full = dst.len() - dst.len() % 8;
        let mask = _mm256_set1_epi32(rgb_mask as i32);
        let mut i = 0;
        while i < full {
            let d = _mm256_loadu_si256(dst.as_ptr().add(i) as *const __m256i);
            let s = _mm256_and_si256(_mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i), mask);
            _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, _mm256_adds_epu8(d, s));
            i += 8;
        }
        // 剩余不足8个时再用一次SSE2
        if dst.len() - full >= 4 {
            full + add_sse2(&mut dst[full..], &src[full..], rgb_mask)
        } else {
            full
        }
    }
}

#[cfg(target_arch = "aarch64")]
mod arm {
    use std::arch::aarch64::*;

    /// 处理完整的4像素组，返回已处理的像素数
    #[target_feature(enable = "neon")]
    pub(super) unsafe fn add_neon(dst: &mut [u32], src: &[u32], rgb_mask: u32) -> usize {
        let full = dst.len() - dst.len() % 4;
        let mask = vreinterpretq_u8_u32(vdupq_n_u32(rgb_mask));
        let mut i = 0;
        while i < full {
            let d = vld1q_u8(dst.as_ptr().add(i) as *const u8);
            let s = vandq_u8(vld1q_u8(src.as_ptr().add(i) as *const u8), mask);
            vst1q_u8(dst.as_mut_ptr().add(i) as *mut u8, vqaddq_u8(d, s));
            i += 4;
        }
        full
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const RGB: u32 = 0x00FF_FFFF;

    fn rgb(r: u8, g: u8, b: u8) -> u32 {
        (r as u32) << 16 | (g as u32) << 8 | b as u32
    }

    #[test]
    fn test_additive_saturates() {
        let out = add_pixel_saturating(rgb(200, 200, 200), rgb(200, 200, 200), RGB);
        assert_eq!(out, rgb(255, 255, 255));
    }

    #[test]
    fn test_additive_ignores_masked_channel() {
        let dst = 0x1000_0000 | rgb(1, 2, 3);
        let src = 0xFF00_0000 | rgb(10, 20, 30);
        assert_eq!(add_pixel_saturating(dst, src, RGB), 0x1000_0000 | rgb(11, 22, 33));
    }

    #[test]
    fn test_copy_row_uses_shorter_length() {
        let mut dst = [0u32; 4];
        copy_row(&mut dst, &[1, 2, 3]);
        assert_eq!(dst, [1, 2, 3, 0]);
    }

    #[test]
    fn test_add_row_every_backend_and_width() {
        for backend in SimdBackend::supported() {
            let kernel = BlendKernel::new(backend);
            for n in 0..=21usize {
                let src: Vec<u32> = (0..n as u32).map(|i| rgb(200, (i * 13) as u8, 7)).collect();
                let mut dst: Vec<u32> = (0..n as u32).map(|i| 0xAB00_0000 | rgb(100, 250, (i * 9) as u8)).collect();
                let expected: Vec<u32> = dst.iter().zip(&src).map(|(&d, &s)| add_pixel_saturating(d, s, RGB)).collect();
                kernel.add_row(&mut dst, &src, RGB);
                assert_eq!(dst, expected, "{} n={}", backend, n);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_vector_add_matches_scalar(
            pixels in prop::collection::vec((any::<u32>(), any::<u32>()), 0..64),
            mask in prop_oneof![Just(0x00FF_FFFFu32), Just(0xFFFF_FF00u32)],
        ) {
            let src: Vec<u32> = pixels.iter().map(|p| p.1).collect();
            let mut scalar: Vec<u32> = pixels.iter().map(|p| p.0).collect();
            let mut vector = scalar.clone();

            BlendKernel::new(SimdBackend::Scalar).add_row(&mut scalar, &src, mask);
            BlendKernel::new(SimdBackend::best_available()).add_row(&mut vector, &src, mask);
            prop_assert_eq!(scalar, vector);
        }
    }
}
