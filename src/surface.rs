/// 像素表面
///
/// 32位打包像素缓冲区：精灵帧和合成目标都使用这个类型。
/// 像素数据可以缺失（未加载），此时绘制会返回错误而不是崩溃。
use serde::{Deserialize, Serialize};

use crate::error::{ParticleError, ParticleResult};

/// 32位像素布局
///
/// 名称按打包值从高位到低位的通道顺序，例如 `Argb8888` 中A位于最高字节。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Argb8888,
    Rgba8888,
    Abgr8888,
    Bgra8888,
    Xrgb8888,
    Rgbx8888,
    Xbgr8888,
    Bgrx8888,
}

impl PixelFormat {
    pub const ALL: [PixelFormat; 8] = [
        Self::Argb8888,
        Self::Rgba8888,
        Self::Abgr8888,
        Self::Bgra8888,
        Self::Xrgb8888,
        Self::Rgbx8888,
        Self::Xbgr8888,
        Self::Bgrx8888,
    ];

    pub fn bits_per_pixel(&self) -> u32 {
        32
    }

    /// 是否带逐像素alpha通道
    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            Self::Argb8888 | Self::Rgba8888 | Self::Abgr8888 | Self::Bgra8888
        )
    }

    /// R、G、B以及第四字节（alpha或填充）的位移
    fn shifts(&self) -> [u32; 4] {
        match self {
            Self::Argb8888 | Self::Xrgb8888 => [16, 8, 0, 24],
            Self::Rgba8888 | Self::Rgbx8888 => [24, 16, 8, 0],
            Self::Abgr8888 | Self::Xbgr8888 => [0, 8, 16, 24],
            Self::Bgra8888 | Self::Bgrx8888 => [8, 16, 24, 0],
        }
    }

    /// 三个颜色通道的掩码，加法混合只作用于这些位
    pub fn rgb_mask(&self) -> u32 {
        let [r, g, b, _] = self.shifts();
        (0xFF << r) | (0xFF << g) | (0xFF << b)
    }

    /// alpha通道掩码，无alpha的格式返回0
    pub fn alpha_mask(&self) -> u32 {
        if self.has_alpha() {
            0xFF << self.shifts()[3]
        } else {
            0
        }
    }

    /// 打包RGBA分量；无alpha的格式把填充字节置为0xFF
    pub fn pack(&self, r: u8, g: u8, b: u8, a: u8) -> u32 {
        let [rs, gs, bs, xs] = self.shifts();
        let a = if self.has_alpha() { a } else { 0xFF };
        (r as u32) << rs | (g as u32) << gs | (b as u32) << bs | (a as u32) << xs
    }

    /// 解包为 `[r, g, b, a]`；无alpha的格式总是返回不透明
    pub fn unpack(&self, pixel: u32) -> [u8; 4] {
        let [rs, gs, bs, xs] = self.shifts();
        let a = if self.has_alpha() {
            (pixel >> xs) as u8
        } else {
            0xFF
        };
        [(pixel >> rs) as u8, (pixel >> gs) as u8, (pixel >> bs) as u8, a]
    }
}

/// 整数矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// 求交集，不相交时返回 `None`
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let rect = Rect::new(x, y, right - x, bottom - y);
        (!rect.is_empty()).then_some(rect)
    }
}

/// 32位像素表面
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    /// 行跨度（像素）
    pitch: usize,
    format: PixelFormat,
    clip: Rect,
    pixels: Option<Vec<u32>>,
    color_key: Option<u32>,
    rle: bool,
    alpha_mod: u8,
}

impl Surface {
    /// 创建填充为0的表面
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = width as usize * height as usize;
        Self::build(width, height, width as usize, format, Some(vec![0; len]))
    }

    /// 使用已有像素创建表面，`pixels.len()` 必须等于 `width * height`
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u32>,
    ) -> ParticleResult<Self> {
        Self::with_pitch(width, height, width as usize, format, pixels)
    }

    /// 使用带行跨度的像素创建表面，`pixels.len()` 必须等于 `pitch * height`
    pub fn with_pitch(
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
        pixels: Vec<u32>,
    ) -> ParticleResult<Self> {
        if pitch < width as usize {
            return Err(ParticleError::InvalidPixelBuffer(format!(
                "pitch {} is smaller than width {}",
                pitch, width
            )));
        }
        let expected = pitch * height as usize;
        if pixels.len() != expected {
            return Err(ParticleError::InvalidPixelBuffer(format!(
                "expected {} pixels for {}x{} (pitch {}), got {}",
                expected,
                width,
                height,
                pitch,
                pixels.len()
            )));
        }
        Ok(Self::build(width, height, pitch, format, Some(pixels)))
    }

    /// 从RGBA8字节创建表面，并转换为目标布局
    pub fn from_rgba8(
        width: u32,
        height: u32,
        format: PixelFormat,
        rgba: &[u8],
    ) -> ParticleResult<Self> {
        let texels: &[[u8; 4]] = bytemuck::try_cast_slice(rgba)
            .map_err(|e| ParticleError::InvalidPixelBuffer(e.to_string()))?;
        let pixels = texels
            .iter()
            .map(|&[r, g, b, a]| format.pack(r, g, b, a))
            .collect();
        Self::from_pixels(width, height, format, pixels)
    }

    /// 只有尺寸和格式、没有像素数据的表面
    pub fn unloaded(width: u32, height: u32, format: PixelFormat) -> Self {
        Self::build(width, height, width as usize, format, None)
    }

    fn build(
        width: u32,
        height: u32,
        pitch: usize,
        format: PixelFormat,
        pixels: Option<Vec<u32>>,
    ) -> Self {
        Self {
            width,
            height,
            pitch,
            format,
            clip: Rect::new(0, 0, width as i32, height as i32),
            pixels,
            color_key: None,
            rle: false,
            alpha_mod: 255,
        }
    }

    pub fn with_color_key(mut self, key: u32) -> Self {
        self.color_key = Some(key);
        self
    }

    pub fn with_rle(mut self, rle: bool) -> Self {
        self.rle = rle;
        self
    }

    pub fn with_alpha_mod(mut self, alpha: u8) -> Self {
        self.alpha_mod = alpha;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn color_key(&self) -> Option<u32> {
        self.color_key
    }

    pub fn is_rle(&self) -> bool {
        self.rle
    }

    pub fn alpha_mod(&self) -> u8 {
        self.alpha_mod
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn clip_rect(&self) -> Rect {
        self.clip
    }

    /// 设置裁剪矩形，会被限制在表面范围内；`None` 恢复为整个表面
    pub fn set_clip_rect(&mut self, clip: Option<Rect>) {
        let bounds = self.bounds();
        self.clip = match clip {
            Some(rect) => bounds
                .intersect(&rect)
                .unwrap_or(Rect::new(0, 0, 0, 0)),
            None => bounds,
        };
    }

    pub fn is_loaded(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn pixels(&self) -> Option<&[u32]> {
        self.pixels.as_deref()
    }

    pub fn pixels_mut(&mut self) -> Option<&mut [u32]> {
        self.pixels.as_deref_mut()
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels()
            .map(|p| p[y as usize * self.pitch + x as usize])
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = y as usize * self.pitch + x as usize;
        if let Some(p) = self.pixels_mut() {
            p[idx] = pixel;
        }
    }

    /// 用同一个像素值填充整个表面
    pub fn fill(&mut self, pixel: u32) {
        if let Some(p) = self.pixels_mut() {
            p.fill(pixel);
        }
    }

    /// 转换为紧密排列的RGBA8字节
    pub fn to_rgba8(&self) -> Option<Vec<u8>> {
        let pixels = self.pixels()?;
        let mut texels = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in pixels.chunks(self.pitch).take(self.height as usize) {
            texels.extend(
                row[..self.width as usize]
                    .iter()
                    .map(|&p| self.format.unpack(p)),
            );
        }
        Some(bytemuck::cast_slice::<[u8; 4], u8>(&texels).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_every_format() {
        for format in PixelFormat::ALL {
            let px = format.pack(10, 20, 30, 40);
            let [r, g, b, a] = format.unpack(px);
            assert_eq!((r, g, b), (10, 20, 30), "{:?}", format);
            if format.has_alpha() {
                assert_eq!(a, 40);
            } else {
                assert_eq!(a, 0xFF);
            }
            assert_eq!(format.rgb_mask().count_ones(), 24);
            assert_eq!(format.rgb_mask() & format.alpha_mask(), 0);
        }
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.intersect(&Rect::new(5, -3, 10, 5)), Some(Rect::new(5, 0, 5, 2)));
        assert_eq!(a.intersect(&Rect::new(10, 0, 4, 4)), None);
        assert_eq!(a.intersect(&Rect::new(-8, -8, 4, 4)), None);
    }

    #[test]
    fn test_clip_rect_is_clamped() {
        let mut s = Surface::new(8, 6, PixelFormat::Xrgb8888);
        s.set_clip_rect(Some(Rect::new(-2, 2, 20, 2)));
        assert_eq!(s.clip_rect(), Rect::new(0, 2, 8, 2));
        s.set_clip_rect(None);
        assert_eq!(s.clip_rect(), s.bounds());
        s.set_clip_rect(Some(Rect::new(50, 50, 2, 2)));
        assert!(s.clip_rect().is_empty());
    }

    #[test]
    fn test_pixel_buffer_validation() {
        assert!(Surface::from_pixels(2, 2, PixelFormat::Argb8888, vec![0; 4]).is_ok());
        assert!(matches!(
            Surface::from_pixels(2, 2, PixelFormat::Argb8888, vec![0; 3]),
            Err(ParticleError::InvalidPixelBuffer(_))
        ));
        assert!(matches!(
            Surface::with_pitch(4, 2, 3, PixelFormat::Argb8888, vec![0; 6]),
            Err(ParticleError::InvalidPixelBuffer(_))
        ));
    }

    #[test]
    fn test_rgba_round_trip_with_pitch() {
        let format = PixelFormat::Bgra8888;
        let pixels = vec![
            format.pack(1, 2, 3, 4),
            format.pack(5, 6, 7, 8),
            0xDEAD_BEEF,
            format.pack(9, 10, 11, 12),
            format.pack(13, 14, 15, 16),
            0xDEAD_BEEF,
        ];
        let s = Surface::with_pitch(2, 2, 3, format, pixels).unwrap();
        let rgba = s.to_rgba8().unwrap();
        assert_eq!(rgba, (1..=16).collect::<Vec<u8>>());

        let back = Surface::from_rgba8(2, 2, format, &rgba).unwrap();
        assert_eq!(back.get_pixel(1, 1), s.get_pixel(1, 1));
    }

    #[test]
    fn test_unloaded_surface() {
        let mut s = Surface::unloaded(4, 4, PixelFormat::Xrgb8888);
        assert!(!s.is_loaded());
        assert_eq!(s.get_pixel(0, 0), None);
        s.fill(1);
        assert!(s.to_rgba8().is_none());
    }
}
