/// 数值生成器
///
/// 三种状态：未设置、固定值、随机区间。随机数源由调用方显式传入，
/// 使用固定种子的 `StdRng` 即可得到可复现的结果。
use std::fmt;

use rand::Rng;

use crate::error::{ParticleError, ParticleResult};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Generator {
    /// 未设置，采样为0
    #[default]
    Unset,
    /// 固定值
    Value(f32),
    /// `[min, max]` 区间内均匀分布
    Range { min: f32, max: f32 },
}

impl Generator {
    pub fn fixed(value: f32) -> Self {
        Self::Value(value)
    }

    /// 随机区间；`a > b` 时自动交换
    pub fn range(a: f32, b: f32) -> Self {
        if a <= b {
            Self::Range { min: a, max: b }
        } else {
            Self::Range { min: b, max: a }
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    pub fn is_randomized(&self) -> bool {
        matches!(self, Self::Range { .. })
    }

    /// 规范化后的下界（未设置时为0）
    pub fn min(&self) -> f32 {
        self.bounds().0
    }

    /// 规范化后的上界（未设置时为0）
    pub fn max(&self) -> f32 {
        self.bounds().1
    }

    fn bounds(&self) -> (f32, f32) {
        match *self {
            Self::Unset => (0.0, 0.0),
            Self::Value(v) => (v, v),
            Self::Range { min, max } if min <= max => (min, max),
            Self::Range { min, max } => (max, min),
        }
    }

    /// 采样一次
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        match self {
            Self::Unset => 0.0,
            Self::Value(v) => *v,
            Self::Range { .. } => {
                let (min, max) = self.bounds();
                (min + (max - min) * rng.gen::<f32>()).clamp(min, max)
            }
        }
    }

    /// 检查边界是有限值
    pub fn validate(&self, name: &'static str) -> ParticleResult<()> {
        let (min, max) = self.bounds();
        if !min.is_finite() || !max.is_finite() {
            return Err(ParticleError::InvalidGenerator {
                name,
                reason: format!("bounds must be finite, got {} to {}", min, max),
            });
        }
        Ok(())
    }
}

impl From<f32> for Generator {
    fn from(value: f32) -> Self {
        Self::Value(value)
    }
}

impl From<(f32, f32)> for Generator {
    fn from((a, b): (f32, f32)) -> Self {
        Self::range(a, b)
    }
}

impl fmt::Display for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rng = if self.is_randomized() { "yes" } else { "no" };
        write!(f, "{:?} to {:?}   rng: {}", self.min(), self.max(), rng)
    }
}
