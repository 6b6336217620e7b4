/// 发射器
///
/// 描述一次发射：生成形状、粒子数量、动画池、各物理量的生成器以及混合模式。
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::error::{ParticleError, ParticleResult};
use crate::generator::Generator;

/// 粒子生成区域形状，目前只实现了点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmitterShape {
    Point,
    Circle,
    Rectangle,
}

impl EmitterShape {
    /// 从整数标志解析（0 点，1 圆，2 矩形）
    pub fn from_flag(flag: i32) -> ParticleResult<Self> {
        match flag {
            0 => Ok(Self::Point),
            1 => Ok(Self::Circle),
            2 => Ok(Self::Rectangle),
            other => Err(ParticleError::UnsupportedShape(format!("flag {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Point => "POINT",
            Self::Circle => "CIRCLE",
            Self::Rectangle => "RECTANGLE",
        }
    }
}

/// 合成时的混合模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// 直接覆盖
    Copy,
    /// 逐通道饱和相加
    #[default]
    Additive,
}

impl BlendMode {
    /// 0 为复制，1 为加法
    pub fn from_flag(flag: u32) -> ParticleResult<Self> {
        match flag {
            0 => Ok(Self::Copy),
            1 => Ok(Self::Additive),
            other => Err(ParticleError::InvalidBlendMode(other)),
        }
    }

    pub fn flag(&self) -> u32 {
        match self {
            Self::Copy => 0,
            Self::Additive => 1,
        }
    }
}

/// 发射参数
#[derive(Debug, Clone)]
pub struct Emitter {
    shape: EmitterShape,
    emission_number: usize,
    animations: Vec<Arc<Animation>>,
    lifetime: Generator,
    speed_x: Generator,
    speed_y: Generator,
    acceleration_x: Generator,
    acceleration_y: Generator,
    blend_mode: BlendMode,
}

impl Emitter {
    /// 创建只使用一个动画的发射器
    ///
    /// 速度和加速度默认未设置，混合模式默认为加法。
    pub fn new(
        shape: EmitterShape,
        emission_number: usize,
        animation: Arc<Animation>,
        lifetime: impl Into<Generator>,
    ) -> Self {
        Self {
            shape,
            emission_number,
            animations: vec![animation],
            lifetime: lifetime.into(),
            speed_x: Generator::Unset,
            speed_y: Generator::Unset,
            acceleration_x: Generator::Unset,
            acceleration_y: Generator::Unset,
            blend_mode: BlendMode::default(),
        }
    }

    /// 向动画池追加一个动画，生成时每个粒子均匀随机地选择其中之一
    pub fn with_animation(mut self, animation: Arc<Animation>) -> Self {
        self.animations.push(animation);
        self
    }

    pub fn with_speed_x(mut self, g: impl Into<Generator>) -> Self {
        self.speed_x = g.into();
        self
    }

    pub fn with_speed_y(mut self, g: impl Into<Generator>) -> Self {
        self.speed_y = g.into();
        self
    }

    pub fn with_acceleration_x(mut self, g: impl Into<Generator>) -> Self {
        self.acceleration_x = g.into();
        self
    }

    pub fn with_acceleration_y(mut self, g: impl Into<Generator>) -> Self {
        self.acceleration_y = g.into();
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    /// 校验发射参数
    ///
    /// 形状必须为点；动画帧必须可直接按32位复制，池中的动画像素格式和帧数一致；
    /// 生命周期必须设置且为正；所有生成器的边界必须是有限值。
    pub fn validate(&self) -> ParticleResult<()> {
        if self.shape != EmitterShape::Point {
            return Err(ParticleError::UnsupportedShape(self.shape.name().to_string()));
        }

        self.check_animation_pool()?;

        for (name, g) in self.generators() {
            g.validate(name)?;
        }

        if !self.lifetime.is_active() {
            return Err(ParticleError::InvalidGenerator {
                name: "lifetime",
                reason: "particle lifetime must be set".to_string(),
            });
        }
        if self.lifetime.min() <= 0.0 {
            return Err(ParticleError::InvalidGenerator {
                name: "lifetime",
                reason: format!("lifetime must be positive, got {}", self.lifetime.min()),
            });
        }

        Ok(())
    }

    fn check_animation_pool(&self) -> ParticleResult<()> {
        let first = self.animations.first().ok_or(ParticleError::EmptyAnimation)?;
        for (index, animation) in self.animations.iter().enumerate() {
            animation.check_blittable()?;
            if animation.format() != first.format() {
                return Err(ParticleError::AnimationPoolMismatch {
                    index,
                    reason: format!(
                        "pixel format {:?} differs from {:?}",
                        animation.format(),
                        first.format()
                    ),
                });
            }
            if animation.num_frames() != first.num_frames() {
                return Err(ParticleError::AnimationPoolMismatch {
                    index,
                    reason: format!(
                        "{} frames, expected {}",
                        animation.num_frames(),
                        first.num_frames()
                    ),
                });
            }
        }
        Ok(())
    }

    fn generators(&self) -> [(&'static str, &Generator); 5] {
        [
            ("lifetime", &self.lifetime),
            ("speed_x", &self.speed_x),
            ("speed_y", &self.speed_y),
            ("acceleration_x", &self.acceleration_x),
            ("acceleration_y", &self.acceleration_y),
        ]
    }

    pub fn shape(&self) -> EmitterShape {
        self.shape
    }

    pub fn emission_number(&self) -> usize {
        self.emission_number
    }

    /// 动画池，至少包含一个动画
    pub fn animations(&self) -> &[Arc<Animation>] {
        &self.animations
    }

    /// 每个动画的帧数（池中一致）
    pub fn num_frames(&self) -> usize {
        self.animations.first().map_or(0, |a| a.num_frames())
    }

    pub fn lifetime(&self) -> &Generator {
        &self.lifetime
    }

    pub fn speed_x(&self) -> &Generator {
        &self.speed_x
    }

    pub fn speed_y(&self) -> &Generator {
        &self.speed_y
    }

    pub fn acceleration_x(&self) -> &Generator {
        &self.acceleration_x
    }

    pub fn acceleration_y(&self) -> &Generator {
        &self.acceleration_y
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }
}

impl fmt::Display for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Emitter(")?;
        writeln!(f, "    spawn_shape:      {}", self.shape.name())?;
        writeln!(f, "    emission_number:  {}", self.emission_number)?;
        writeln!(f, "    animation:        {} images,", self.num_frames())?;
        if self.animations.len() > 1 {
            writeln!(f, "    animation_pool:   {} sequences,", self.animations.len())?;
        }
        for (name, g) in self.generators() {
            writeln!(f, "    {:<18}{}", format!("{}:", name), g)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{PixelFormat, Surface};

    fn animation() -> Arc<Animation> {
        let frame = Surface::new(2, 2, PixelFormat::Xrgb8888);
        Arc::new(Animation::new(vec![frame; 3]).unwrap())
    }

    #[test]
    fn test_defaults() {
        let e = Emitter::new(EmitterShape::Point, 10, animation(), 1.0f32);
        assert_eq!(e.blend_mode(), BlendMode::Additive);
        assert!(!e.speed_x().is_active());
        assert!(!e.acceleration_y().is_active());
        assert!(e.validate().is_ok());
    }

    #[test]
    fn test_shape_must_be_point() {
        let e = Emitter::new(EmitterShape::Circle, 10, animation(), 1.0f32);
        assert_eq!(
            e.validate(),
            Err(ParticleError::UnsupportedShape("CIRCLE".to_string()))
        );
        assert!(EmitterShape::from_flag(7).is_err());
        assert_eq!(EmitterShape::from_flag(0), Ok(EmitterShape::Point));
    }

    #[test]
    fn test_blend_mode_flags() {
        assert_eq!(BlendMode::from_flag(0), Ok(BlendMode::Copy));
        assert_eq!(BlendMode::from_flag(1), Ok(BlendMode::Additive));
        assert_eq!(BlendMode::from_flag(2), Err(ParticleError::InvalidBlendMode(2)));
        assert_eq!(BlendMode::Copy.flag(), 0);
    }

    #[test]
    fn test_lifetime_must_be_set_and_positive() {
        let unset = Emitter::new(EmitterShape::Point, 1, animation(), Generator::Unset);
        assert!(matches!(
            unset.validate(),
            Err(ParticleError::InvalidGenerator { name: "lifetime", .. })
        ));

        let negative = Emitter::new(EmitterShape::Point, 1, animation(), (-1.0f32, 2.0f32));
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_non_finite_speed_rejected() {
        let e = Emitter::new(EmitterShape::Point, 1, animation(), 1.0f32)
            .with_speed_y((0.0f32, f32::INFINITY));
        assert!(matches!(
            e.validate(),
            Err(ParticleError::InvalidGenerator { name: "speed_y", .. })
        ));
    }

    #[test]
    fn test_rejects_color_keyed_frames() {
        let frame = Surface::new(2, 2, PixelFormat::Xrgb8888).with_color_key(0);
        let anim = Arc::new(Animation::new(vec![frame]).unwrap());
        let e = Emitter::new(EmitterShape::Point, 1, anim, 1.0f32);
        assert!(matches!(
            e.validate(),
            Err(ParticleError::UnsupportedPixelFormat { index: 0, .. })
        ));
    }

    #[test]
    fn test_animation_pool() {
        let other = Arc::new(Animation::new(vec![Surface::new(4, 4, PixelFormat::Xrgb8888); 3]).unwrap());
        let e = Emitter::new(EmitterShape::Point, 10, animation(), 1.0f32).with_animation(other);
        assert_eq!(e.animations().len(), 2);
        assert_eq!(e.num_frames(), 3);
        assert!(e.validate().is_ok());
        assert!(e.to_string().contains("animation_pool:   2 sequences,"));
    }

    #[test]
    fn test_animation_pool_must_match() {
        let short = Arc::new(Animation::new(vec![Surface::new(2, 2, PixelFormat::Xrgb8888)]).unwrap());
        let e = Emitter::new(EmitterShape::Point, 10, animation(), 1.0f32).with_animation(short);
        assert!(matches!(
            e.validate(),
            Err(ParticleError::AnimationPoolMismatch { index: 1, .. })
        ));

        let bgr = Arc::new(Animation::new(vec![Surface::new(2, 2, PixelFormat::Xbgr8888); 3]).unwrap());
        let e = Emitter::new(EmitterShape::Point, 10, animation(), 1.0f32).with_animation(bgr);
        assert!(matches!(
            e.validate(),
            Err(ParticleError::AnimationPoolMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_display() {
        let e = Emitter::new(EmitterShape::Point, 25, animation(), (0.5f32, 1.5f32))
            .with_speed_x(3.0f32);
        let text = e.to_string();
        assert!(text.starts_with("Emitter(\n    spawn_shape:      POINT"));
        assert!(text.contains("emission_number:  25"));
        assert!(text.contains("animation:        3 images,"));
        assert!(text.contains("lifetime:         0.5 to 1.5   rng: yes"));
        assert!(text.contains("speed_x:          3.0 to 3.0   rng: no"));
        assert!(text.ends_with(')'));
    }
}
