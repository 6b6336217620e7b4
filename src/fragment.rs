/// 分段映射
///
/// 粒子按生成时的寿命降序存储，帧索引随已过寿命单调变化，
/// 所以帧索引相同的粒子在存储顺序上是连续的。这里把动画和帧索引都相同的
/// 连续粒子合并成段，并为每个未被裁剪掉的粒子生成一个目标描述，
/// 供合成内核按段批量处理。
use crate::surface::Rect;

/// 一段动画和帧索引都相同的连续粒子
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    /// 钳制到动画池范围内的动画下标
    pub animation_index: u32,
    /// 钳制到 `[0, num_frames - 1]` 的帧索引
    pub frame_index: i32,
    /// 裁剪后剩余的粒子数，等于本段的目标描述数
    pub run_length: i32,
    /// 本段第一个粒子的下标
    pub start: usize,
    /// 裁剪前本段的粒子数
    pub span: usize,
}

/// 单个粒子的裁剪后目标区域（单位均为像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitDestination {
    /// 目标缓冲区中左上角像素的下标
    pub dest_offset: usize,
    pub width: usize,
    pub rows: usize,
    /// 精灵内被裁剪掉的左侧列数
    pub src_col: usize,
    /// 精灵内被裁剪掉的顶部行数
    pub src_row: usize,
}

/// 目标表面的几何信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestinationGeometry {
    pub clip: Rect,
    /// 行跨度（像素）
    pub pitch: usize,
}

/// 重建分段映射所需的存活粒子数据
///
/// `frame_indices` 的长度即存活粒子数；其余切片至少同样长。
#[derive(Debug, Clone, Copy)]
pub struct ParticleView<'a> {
    pub animation_indices: &'a [u32],
    pub frame_indices: &'a [i32],
    pub positions_x: &'a [f32],
    pub positions_y: &'a [f32],
}

// 超出这个范围的坐标一定在任何表面之外，限制后避免矩形运算溢出
const COORD_LIMIT: f32 = (1 << 28) as f32;

/// 分段映射，缓冲区在多次重建之间复用
#[derive(Debug, Clone, Default)]
pub struct FragmentationMap {
    fragments: Vec<Fragment>,
    destinations: Vec<BlitDestination>,
}

impl FragmentationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按当前存活粒子重建
    ///
    /// `sprite_sizes[a]` 是动画池中第 `a` 个动画的帧尺寸。
    pub fn rebuild(
        &mut self,
        particles: ParticleView<'_>,
        num_frames: usize,
        sprite_sizes: &[(u32, u32)],
        dest: DestinationGeometry,
    ) {
        self.fragments.clear();
        self.destinations.clear();

        let last_frame = num_frames.saturating_sub(1) as i32;
        let last_animation = sprite_sizes.len().saturating_sub(1) as u32;
        let key = |i: usize| {
            (
                particles.animation_indices[i].min(last_animation),
                particles.frame_indices[i].clamp(0, last_frame),
            )
        };

        let live = particles.frame_indices.len();
        let mut start = 0;
        while start < live {
            let (animation_index, frame_index) = key(start);
            let span = (start..live)
                .take_while(|&i| key(i) == (animation_index, frame_index))
                .count();
            self.fragments.push(Fragment {
                animation_index,
                frame_index,
                run_length: span as i32,
                start,
                span,
            });
            start += span;
        }

        for fragment in &mut self.fragments {
            let (sw, sh) = sprite_sizes
                .get(fragment.animation_index as usize)
                .copied()
                .unwrap_or((0, 0));
            let (w, h) = (sw as i32, sh as i32);
            let (half_w, half_h) = (sw as f32 / 2.0, sh as f32 / 2.0);

            for i in fragment.start..fragment.start + fragment.span {
                let x0 = (particles.positions_x[i] - half_w)
                    .floor()
                    .clamp(-COORD_LIMIT, COORD_LIMIT) as i32;
                let y0 = (particles.positions_y[i] - half_h)
                    .floor()
                    .clamp(-COORD_LIMIT, COORD_LIMIT) as i32;

                match Rect::new(x0, y0, w, h).intersect(&dest.clip) {
                    Some(r) => self.destinations.push(BlitDestination {
                        dest_offset: r.y as usize * dest.pitch + r.x as usize,
                        width: r.w as usize,
                        rows: r.h as usize,
                        src_col: (r.x - x0) as usize,
                        src_row: (r.y - y0) as usize,
                    }),
                    None => fragment.run_length -= 1,
                }
            }
        }
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn destinations(&self) -> &[BlitDestination] {
        &self.destinations
    }

    /// 逐段迭代，附带本段的目标描述
    pub fn iter(&self) -> impl Iterator<Item = (&Fragment, &[BlitDestination])> + '_ {
        let mut offset = 0;
        self.fragments.iter().map(move |fragment| {
            let len = fragment.run_length as usize;
            let dests = &self.destinations[offset..offset + len];
            offset += len;
            (fragment, dests)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(w: i32, h: i32) -> DestinationGeometry {
        DestinationGeometry {
            clip: Rect::new(0, 0, w, h),
            pitch: w as usize,
        }
    }

    /// 单动画的粒子集合
    fn rebuild(
        map: &mut FragmentationMap,
        frames: &[i32],
        num_frames: usize,
        xs: &[f32],
        ys: &[f32],
        size: (u32, u32),
        dest: DestinationGeometry,
    ) {
        let animations = vec![0; frames.len()];
        let view = ParticleView {
            animation_indices: &animations,
            frame_indices: frames,
            positions_x: xs,
            positions_y: ys,
        };
        map.rebuild(view, num_frames, &[size], dest);
    }

    #[test]
    fn test_runs_are_grouped() {
        let mut map = FragmentationMap::new();
        let frames = [0, 0, 1, 1, 1, 3];
        let xs = [10.0; 6];
        let ys = [10.0; 6];
        rebuild(&mut map, &frames, 4, &xs, &ys, (2, 2), geometry(32, 32));

        let runs: Vec<(i32, i32, usize, usize)> = map
            .fragments()
            .iter()
            .map(|f| (f.frame_index, f.run_length, f.start, f.span))
            .collect();
        assert_eq!(runs, vec![(0, 2, 0, 2), (1, 3, 2, 3), (3, 1, 5, 1)]);
        assert_eq!(map.destinations().len(), 6);
    }

    #[test]
    fn test_runs_split_on_animation_change() {
        let mut map = FragmentationMap::new();
        let view = ParticleView {
            animation_indices: &[0, 0, 1, 1, 0, 5],
            frame_indices: &[2, 2, 2, 2, 2, 2],
            positions_x: &[8.0; 6],
            positions_y: &[8.0; 6],
        };
        map.rebuild(view, 3, &[(2, 2), (4, 4)], geometry(16, 16));

        let runs: Vec<(u32, i32, usize, usize)> = map
            .fragments()
            .iter()
            .map(|f| (f.animation_index, f.frame_index, f.start, f.span))
            .collect();
        // 越界的动画下标被钳制到池中最后一个
        assert_eq!(
            runs,
            vec![(0, 2, 0, 2), (1, 2, 2, 2), (0, 2, 4, 1), (1, 2, 5, 1)]
        );
        assert_eq!(map.destinations().len(), 6);
    }

    #[test]
    fn test_each_animation_uses_its_sprite_size() {
        let mut map = FragmentationMap::new();
        let view = ParticleView {
            animation_indices: &[0, 1],
            frame_indices: &[0, 0],
            positions_x: &[8.0, 8.0],
            positions_y: &[8.0, 8.0],
        };
        map.rebuild(view, 1, &[(2, 2), (4, 4)], geometry(16, 16));

        let d = map.destinations();
        assert_eq!((d[0].width, d[0].rows, d[0].dest_offset), (2, 2, 7 * 16 + 7));
        assert_eq!((d[1].width, d[1].rows, d[1].dest_offset), (4, 4, 6 * 16 + 6));
    }

    #[test]
    fn test_destination_is_centered() {
        let mut map = FragmentationMap::new();
        rebuild(&mut map, &[0], 1, &[10.0], &[20.0], (4, 2), geometry(64, 64));
        assert_eq!(
            map.destinations()[0],
            BlitDestination {
                dest_offset: 19 * 64 + 8,
                width: 4,
                rows: 2,
                src_col: 0,
                src_row: 0,
            }
        );
    }

    #[test]
    fn test_partial_clip_offsets_source() {
        let mut map = FragmentationMap::new();
        // 精灵左上角在 (-1, -2)
        rebuild(&mut map, &[0], 1, &[1.5], &[0.5], (5, 5), geometry(16, 16));
        let d = map.destinations()[0];
        assert_eq!((d.width, d.rows, d.src_col, d.src_row), (4, 3, 1, 2));
        assert_eq!(d.dest_offset, 0);
    }

    #[test]
    fn test_fully_clipped_particles_are_dropped() {
        let mut map = FragmentationMap::new();
        let frames = [0, 0, 0, 2, 2];
        let xs = [5.0, -100.0, 5.0, 500.0, 1e30];
        let ys = [5.0; 5];
        rebuild(&mut map, &frames, 3, &xs, &ys, (3, 3), geometry(16, 16));

        let f = map.fragments();
        assert_eq!(f.len(), 2);
        assert_eq!((f[0].run_length, f[0].span), (2, 3));
        assert_eq!((f[1].run_length, f[1].span), (0, 2));
        assert_eq!(map.destinations().len(), 2);

        let per_fragment: Vec<usize> = map.iter().map(|(_, d)| d.len()).collect();
        assert_eq!(per_fragment, vec![2, 0]);
    }

    #[test]
    fn test_frame_index_is_clamped() {
        let mut map = FragmentationMap::new();
        rebuild(&mut map, &[7, -2], 4, &[1.0, 1.0], &[1.0, 1.0], (1, 1), geometry(4, 4));
        let idx: Vec<i32> = map.fragments().iter().map(|f| f.frame_index).collect();
        assert_eq!(idx, vec![3, 0]);
    }

    #[test]
    fn test_clip_rect_respected() {
        let mut map = FragmentationMap::new();
        let dest = DestinationGeometry {
            clip: Rect::new(4, 4, 4, 4),
            pitch: 16,
        };
        rebuild(&mut map, &[0, 0], 1, &[5.0, 1.0], &[5.0, 1.0], (2, 2), dest);
        assert_eq!(map.destinations().len(), 1);
        assert_eq!(map.destinations()[0].dest_offset, 4 * 16 + 4);
        assert_eq!(map.fragments()[0].run_length, 1);
    }

    #[test]
    fn test_empty_rebuild_clears() {
        let mut map = FragmentationMap::new();
        rebuild(&mut map, &[0], 1, &[1.0], &[1.0], (1, 1), geometry(4, 4));
        rebuild(&mut map, &[], 1, &[], &[], (1, 1), geometry(4, 4));
        assert!(map.fragments().is_empty());
        assert!(map.destinations().is_empty());
    }
}
