//! 错误处理模块
//!
//! 粒子系统的统一错误类型
//!
//! ## 错误分类
//!
//! - **构造错误**: 发射器/动画校验失败、内存分配失败，粒子批次不会被创建
//! - **绘制错误**: 引用的精灵帧或目标表面没有像素数据，当次绘制中止
//!
//! 被裁剪为空的粒子和缺少SIMD支持的CPU都不算错误。

use thiserror::Error;

use crate::surface::PixelFormat;

/// 粒子系统错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParticleError {
    #[error("Unsupported spawn shape: {0}")]
    UnsupportedShape(String),

    #[error("Animation must contain at least one frame")]
    EmptyAnimation,

    #[error("Animation frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        index: usize,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Animation frame {index} has pixel format {actual:?}, expected {expected:?}")]
    FrameFormatMismatch {
        index: usize,
        expected: PixelFormat,
        actual: PixelFormat,
    },

    #[error("Unsupported pixel format for frame {index}: {reason}")]
    UnsupportedPixelFormat { index: usize, reason: String },

    #[error("Pooled animation {index} is incompatible: {reason}")]
    AnimationPoolMismatch { index: usize, reason: String },

    #[error("Invalid generator '{name}': {reason}")]
    InvalidGenerator { name: &'static str, reason: String },

    #[error("Invalid blend mode flag: {0} (expected 0 for copy or 1 for additive)")]
    InvalidBlendMode(u32),

    #[error("Invalid pixel buffer: {0}")]
    InvalidPixelBuffer(String),

    #[error("Failed to allocate particle buffers for {count} particles")]
    Allocation { count: usize },

    #[error("Animation {animation} frame {frame} has no pixel data loaded")]
    UnloadedSurface { animation: usize, frame: usize },

    #[error("Destination surface has no pixel data loaded")]
    UnloadedDestination,

    #[error("Sprite pixel format {sprite:?} does not match destination format {destination:?}")]
    FormatMismatch {
        sprite: PixelFormat,
        destination: PixelFormat,
    },
}

/// 结果类型别名
pub type ParticleResult<T> = Result<T, ParticleError>;
