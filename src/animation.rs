/// 精灵动画
///
/// 一组尺寸和像素格式相同的帧。由宿主持有，粒子批次通过 `Arc` 共享引用。
use crate::error::{ParticleError, ParticleResult};
use crate::surface::{PixelFormat, Surface};

#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    frames: Vec<Surface>,
}

impl Animation {
    /// 创建动画，要求至少一帧且所有帧尺寸、格式一致
    pub fn new(frames: Vec<Surface>) -> ParticleResult<Self> {
        let first = frames.first().ok_or(ParticleError::EmptyAnimation)?;
        let (w, h, format) = (first.width(), first.height(), first.format());

        for (index, frame) in frames.iter().enumerate().skip(1) {
            if frame.width() != w || frame.height() != h {
                return Err(ParticleError::FrameSizeMismatch {
                    index,
                    expected_width: w,
                    expected_height: h,
                    actual_width: frame.width(),
                    actual_height: frame.height(),
                });
            }
            if frame.format() != format {
                return Err(ParticleError::FrameFormatMismatch {
                    index,
                    expected: format,
                    actual: frame.format(),
                });
            }
        }

        Ok(Self { frames })
    }

    /// 检查每一帧都能直接按32位像素复制/相加
    ///
    /// 不接受颜色键、RLE加速、逐像素alpha以及非255的alpha调制。
    pub fn check_blittable(&self) -> ParticleResult<()> {
        for (index, frame) in self.frames.iter().enumerate() {
            let reason = if frame.format().bits_per_pixel() != 32 {
                Some("only 32-bit surfaces are supported".to_string())
            } else if frame.color_key().is_some() {
                Some("surfaces with a color key are not supported".to_string())
            } else if frame.is_rle() {
                Some("RLE accelerated surfaces are not supported".to_string())
            } else if frame.format().has_alpha() {
                Some(format!(
                    "per-pixel alpha format {:?} is not supported",
                    frame.format()
                ))
            } else if frame.alpha_mod() != 255 {
                Some(format!("alpha modulation {} is not supported", frame.alpha_mod()))
            } else {
                None
            };

            if let Some(reason) = reason {
                return Err(ParticleError::UnsupportedPixelFormat { index, reason });
            }
        }
        Ok(())
    }

    pub fn frames(&self) -> &[Surface] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&Surface> {
        self.frames.get(index)
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// 帧尺寸（宽, 高）
    pub fn frame_size(&self) -> (u32, u32) {
        (self.frames[0].width(), self.frames[0].height())
    }

    pub fn format(&self) -> PixelFormat {
        self.frames[0].format()
    }
}
