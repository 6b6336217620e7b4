/// 合成内核驱动
///
/// 按分段映射把精灵帧复制或加到目标缓冲区，每段从自己的动画中取帧。1×1到5×5的未裁剪小矩形走
/// 固定尺寸路径，其余按行处理，行内使用向量化的复制/加法。
use std::sync::Arc;

use sprite_particles_simd::{add_pixel_saturating, copy_row, BlendKernel};

use crate::animation::Animation;
use crate::emitter::BlendMode;
use crate::error::{ParticleError, ParticleResult};
use crate::fragment::{BlitDestination, FragmentationMap};
use crate::surface::Surface;

/// 把分段映射中的全部粒子绘制到 `dest`
///
/// `animations` 是发射器的动画池，分段的 `animation_index` 是其下标。
/// 遇到没有像素数据的帧时立即返回错误，已绘制的部分保留。
pub fn composite(
    map: &FragmentationMap,
    animations: &[Arc<Animation>],
    dest: &mut Surface,
    mode: BlendMode,
    kernel: &BlendKernel,
) -> ParticleResult<()> {
    if animations.is_empty() {
        return Err(ParticleError::EmptyAnimation);
    }
    if let Some(animation) = animations.iter().find(|a| a.format() != dest.format()) {
        return Err(ParticleError::FormatMismatch {
            sprite: animation.format(),
            destination: dest.format(),
        });
    }

    let rgb_mask = dest.format().rgb_mask();
    let dest_pitch = dest.pitch();
    let dst = dest.pixels_mut().ok_or(ParticleError::UnloadedDestination)?;

    for (fragment, targets) in map.iter() {
        let (pooled, index) = (fragment.animation_index as usize, fragment.frame_index as usize);
        let missing = ParticleError::UnloadedSurface {
            animation: pooled,
            frame: index,
        };
        let frame = match animations.get(pooled).and_then(|a| a.frame(index)) {
            Some(frame) => frame,
            None => return Err(missing),
        };
        let src = frame.pixels().ok_or(missing)?;
        let sprite = Sprite {
            pixels: src,
            pitch: frame.pitch(),
            width: frame.width() as usize,
            height: frame.height() as usize,
        };

        match mode {
            BlendMode::Copy => blit_all::<CopyOp>(dst, dest_pitch, &sprite, targets, rgb_mask, kernel),
            BlendMode::Additive => blit_all::<AddOp>(dst, dest_pitch, &sprite, targets, rgb_mask, kernel),
        }
    }

    Ok(())
}

struct Sprite<'a> {
    pixels: &'a [u32],
    pitch: usize,
    width: usize,
    height: usize,
}

/// 混合操作，按模式在编译期选定
trait PixelOp {
    fn pixel(dst: u32, src: u32, rgb_mask: u32) -> u32;
    fn row(dst: &mut [u32], src: &[u32], rgb_mask: u32, kernel: &BlendKernel);
}

struct CopyOp;

impl PixelOp for CopyOp {
    #[inline(always)]
    fn pixel(_dst: u32, src: u32, _rgb_mask: u32) -> u32 {
        src
    }

    #[inline(always)]
    fn row(dst: &mut [u32], src: &[u32], _rgb_mask: u32, _kernel: &BlendKernel) {
        copy_row(dst, src);
    }
}

struct AddOp;

impl PixelOp for AddOp {
    #[inline(always)]
    fn pixel(dst: u32, src: u32, rgb_mask: u32) -> u32 {
        add_pixel_saturating(dst, src, rgb_mask)
    }

    #[inline(always)]
    fn row(dst: &mut [u32], src: &[u32], rgb_mask: u32, kernel: &BlendKernel) {
        kernel.add_row(dst, src, rgb_mask);
    }
}

fn blit_all<Op: PixelOp>(
    dst: &mut [u32],
    dst_pitch: usize,
    sprite: &Sprite<'_>,
    targets: &[BlitDestination],
    rgb_mask: u32,
    kernel: &BlendKernel,
) {
    // 未裁剪的小精灵：每个粒子都是同样大小的正方形
    let square = sprite.width == sprite.height;
    for d in targets {
        let whole = square && d.width == sprite.width && d.rows == sprite.height;
        match (whole, d.width) {
            (true, 1) => blit_fixed::<Op, 1>(dst, dst_pitch, sprite, d, rgb_mask),
            (true, 2) => blit_fixed::<Op, 2>(dst, dst_pitch, sprite, d, rgb_mask),
            (true, 3) => blit_fixed::<Op, 3>(dst, dst_pitch, sprite, d, rgb_mask),
            (true, 4) => blit_fixed::<Op, 4>(dst, dst_pitch, sprite, d, rgb_mask),
            (true, 5) => blit_fixed::<Op, 5>(dst, dst_pitch, sprite, d, rgb_mask),
            _ => blit_rows::<Op>(dst, dst_pitch, sprite, d, rgb_mask, kernel),
        }
    }
}

/// N×N 固定尺寸路径，循环次数在编译期已知
#[inline(always)]
fn blit_fixed<Op: PixelOp, const N: usize>(
    dst: &mut [u32],
    dst_pitch: usize,
    sprite: &Sprite<'_>,
    d: &BlitDestination,
    rgb_mask: u32,
) {
    for r in 0..N {
        let s = r * sprite.pitch;
        let o = d.dest_offset + r * dst_pitch;
        let src: &[u32; N] = match sprite.pixels[s..s + N].try_into() {
            Ok(row) => row,
            Err(_) => return,
        };
        let out: &mut [u32; N] = match (&mut dst[o..o + N]).try_into() {
            Ok(row) => row,
            Err(_) => return,
        };
        for (px, &s) in out.iter_mut().zip(src) {
            *px = Op::pixel(*px, s, rgb_mask);
        }
    }
}

/// 通用路径：逐行调用行内核
fn blit_rows<Op: PixelOp>(
    dst: &mut [u32],
    dst_pitch: usize,
    sprite: &Sprite<'_>,
    d: &BlitDestination,
    rgb_mask: u32,
    kernel: &BlendKernel,
) {
    for r in 0..d.rows {
        let s = (d.src_row + r) * sprite.pitch + d.src_col;
        let o = d.dest_offset + r * dst_pitch;
        Op::row(&mut dst[o..o + d.width], &sprite.pixels[s..s + d.width], rgb_mask, kernel);
    }
}
