//! 过期粒子剔除
//!
//! 生命周期数组在生成时按降序排列，每次更新所有元素减去同一个 `dt`，
//! 顺序保持不变，因此死亡粒子总是存活前缀之后的后缀，可以用二分查找定位。

/// 一次剔除的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// 没有粒子过期
    Unchanged,
    /// 存活数缩减到给定值
    Shrunk(usize),
    /// 第一个粒子已过期，整个批次结束
    Ended,
}

/// 第一个 `lifetime <= 0` 的下标，没有时返回 `lifetimes.len()`
///
/// `lifetimes` 必须非递增。
#[inline]
pub fn first_expired(lifetimes: &[f32]) -> usize {
    debug_assert!(is_non_increasing(lifetimes));
    lifetimes.partition_point(|&t| t > 0.0)
}

/// 根据当前存活前缀计算剔除结果
pub fn expire(lifetimes: &[f32]) -> Expiration {
    match first_expired(lifetimes) {
        0 => Expiration::Ended,
        n if n == lifetimes.len() => Expiration::Unchanged,
        n => Expiration::Shrunk(n),
    }
}

pub fn is_non_increasing(values: &[f32]) -> bool {
    values.windows(2).all(|w| w[0] >= w[1])
}
