//! # Sprite Particles
//!
//! 面向软件渲染的2D精灵粒子系统：结构数组存储、运行时选择的SIMD积分内核、
//! O(log n) 的过期剔除，以及按帧索引分段批量合成到32位像素缓冲区。
//!
//! ## 特性
//!
//! - **结构数组**: 位置/速度/加速度/寿命分别连续存储，静止的轴不分配速度，未使用的加速度轴不分配
//! - **运行时内核选择**: 进程启动时探测一次CPU，选择标量、SSE2、AVX2或NEON实现
//! - **二分剔除**: 寿命在生成时降序排列，过期粒子总是尾部后缀
//! - **分段合成**: 动画和帧索引相同的连续粒子合并成段，批量复制或饱和相加
//!
//! ## 快速开始
//!
//! ```rust
//! use std::sync::Arc;
//! use glam::Vec2;
//! use rand::{rngs::StdRng, SeedableRng};
//! use sprite_particles::{Animation, Emitter, EmitterShape, ParticleBatch, PixelFormat, Surface};
//!
//! let frame = Surface::new(3, 3, PixelFormat::Xrgb8888);
//! let animation = Arc::new(Animation::new(vec![frame; 4]).unwrap());
//! let emitter = Emitter::new(EmitterShape::Point, 100, animation, 2.0f32)
//!     .with_speed_x((-10.0f32, 10.0f32));
//!
//! let mut rng = StdRng::seed_from_u64(1);
//! let mut batch = ParticleBatch::spawn(&emitter, Vec2::new(50.0, 50.0), &mut rng).unwrap();
//! let mut screen = Surface::new(100, 100, PixelFormat::Xrgb8888);
//!
//! batch.tick(0.5);
//! batch.draw(&mut screen).unwrap();
//! assert_eq!(batch.live_count(), 100);
//! ```
//!
//! ## 模块
//!
//! - [`generator`]: 固定值/随机区间数值源
//! - [`emitter`]: 发射参数与校验
//! - [`batch`]: 粒子批次（生成、推进、剔除、绘制）
//! - [`fragment`]: 分段映射
//! - [`blit`]: 合成驱动
//! - [`effect`]: 特效模板与实例
//! - [`config`]: 配置系统

#[macro_use]
pub mod macros;

pub mod animation;
pub mod batch;
pub mod blit;
pub mod config;
pub mod dispatch;
pub mod effect;
pub mod emitter;
pub mod error;
pub mod fragment;
pub mod generator;
pub mod surface;

pub use animation::Animation;
pub use batch::{Expiration, ParticleBatch, ParticleBuffers};
pub use config::{ConfigError, ConfigResult, LogLevel, LoggingConfig, ParticleConfig, SimdConfig};
pub use dispatch::{active_backend, configure_backend};
pub use effect::{EffectInstance, EffectState, ParticleEffect};
pub use emitter::{BlendMode, Emitter, EmitterShape};
pub use error::{ParticleError, ParticleResult};
pub use blit::composite;
pub use fragment::{BlitDestination, DestinationGeometry, Fragment, FragmentationMap, ParticleView};
pub use generator::Generator;
pub use surface::{PixelFormat, Rect, Surface};

pub use sprite_particles_simd::{AxisMotion, CpuFeatures, Motion, SimdBackend};
