//! # sprite_particles_simd
//!
//! 粒子模拟与像素合成的SIMD内核库，提供运行时CPU特性检测和按向量宽度实例化的内核。
//!
//! ## 特性
//!
//! - **运行时检测**: 启动时探测一次CPU特性，之后作为进程级不可变配置使用
//! - **宽度泛型**: 同一份循环体在标量、SSE2、AVX2、NEON宽度上实例化
//! - **三组内核**: 粒子积分、动画帧索引计算、像素行复制/饱和加法
//!
//! ## 快速开始
//!
//! ```rust
//! use sprite_particles_simd::{SimdBackend, UpdateKernel, UpdateSlices, UpdateVariant};
//!
//! let backend = SimdBackend::best_available();
//! let kernel = UpdateKernel::new(UpdateVariant::NoAcceleration.into(), backend);
//!
//! let mut px = vec![0.0f32; 10];
//! let mut py = vec![0.0f32; 10];
//! let mut vx = vec![1.0f32; 10];
//! let mut vy = vec![2.0f32; 10];
//! let mut life = vec![1.0f32; 10];
//!
//! kernel.run(
//!     UpdateSlices {
//!         positions_x: &mut px,
//!         positions_y: &mut py,
//!         velocities_x: &mut vx,
//!         velocities_y: &mut vy,
//!         accelerations_x: &[],
//!         accelerations_y: &[],
//!         lifetimes: &mut life,
//!     },
//!     0.5,
//! );
//!
//! assert_eq!(px[9], 0.5);
//! assert_eq!(life[0], 0.5);
//! ```
//!
//! ## 模块
//!
//! - [`cpu_detect`]: CPU特性检测
//! - [`update`]: 粒子位置/速度/生命周期积分内核
//! - [`frames`]: 动画帧索引内核
//! - [`pixels`]: 像素行复制与饱和加法内核

pub mod cpu_detect;
mod lanes;
pub mod frames;
pub mod pixels;
pub mod update;

// 重新导出主要类型
pub use cpu_detect::{detect_cpu_features, log_cpu_info, CpuFeatures, CpuVendor};
pub use frames::FrameKernel;
pub use pixels::{add_pixel_saturating, copy_row, BlendKernel};
pub use update::{AxisMotion, Motion, UpdateKernel, UpdateSlices, UpdateVariant};

use std::fmt;

/// SIMD后端类型
///
/// 表示可用的内核实现，每个后端对应一种f32通道宽度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdBackend {
    /// 标量回退实现（无SIMD）
    Scalar,
    /// SSE2 (x86_64基线，4通道)
    Sse2,
    /// AVX2 (8通道，带掩码尾部读写)
    Avx2,
    /// ARM NEON (4通道)
    Neon,
}

impl SimdBackend {
    /// 所有后端，按优先级从低到高排列
    pub const ALL: [SimdBackend; 4] = [Self::Scalar, Self::Sse2, Self::Neon, Self::Avx2];

    /// 获取当前平台最优的SIMD后端
    ///
    /// 根据运行时检测的CPU特性，返回当前平台支持的最高性能后端。
    /// 如果平台不支持任何已知指令集则返回`Scalar`。
    ///
    /// # 示例
    ///
    /// ```rust
    /// use sprite_particles_simd::SimdBackend;
    ///
    /// let backend = SimdBackend::best_available();
    /// assert!(backend.is_supported());
    /// ```
    pub fn best_available() -> Self {
        let features = detect_cpu_features();

        if features.avx2 && features.avx {
            return Self::Avx2;
        }
        if features.sse2 {
            return Self::Sse2;
        }
        if features.neon {
            return Self::Neon;
        }

        Self::Scalar
    }

    /// 当前CPU是否可以执行该后端的内核
    pub fn is_supported(&self) -> bool {
        let features = detect_cpu_features();
        match self {
            Self::Scalar => true,
            Self::Sse2 => cfg!(target_arch = "x86_64") && features.sse2,
            Self::Avx2 => cfg!(target_arch = "x86_64") && features.avx && features.avx2,
            Self::Neon => cfg!(target_arch = "aarch64") && features.neon,
        }
    }

    /// 不受支持时退回标量后端
    pub fn supported_or_scalar(self) -> Self {
        if self.is_supported() {
            self
        } else {
            Self::Scalar
        }
    }

    /// 当前CPU支持的全部后端
    pub fn supported() -> Vec<Self> {
        Self::ALL.iter().copied().filter(Self::is_supported).collect()
    }

    /// 获取可以并行处理的f32数量
    ///
    /// # 示例
    ///
    /// ```rust
    /// use sprite_particles_simd::SimdBackend;
    ///
    /// assert_eq!(SimdBackend::Scalar.f32_lanes(), 1);
    /// assert_eq!(SimdBackend::Sse2.f32_lanes(), 4);
    /// assert_eq!(SimdBackend::Avx2.f32_lanes(), 8);
    /// ```
    pub fn f32_lanes(&self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Sse2 | Self::Neon => 4,
            Self::Avx2 => 8,
        }
    }

    /// 配置文件中使用的名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Sse2 => "sse2",
            Self::Avx2 => "avx2",
            Self::Neon => "neon",
        }
    }

    /// 从配置名称解析（不区分大小写）
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }
}

impl fmt::Display for SimdBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
