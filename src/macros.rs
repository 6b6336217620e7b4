//! 公共宏定义

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use sprite_particles::impl_default;
///
/// struct Limits {
///     max_batches: usize,
///     label: String,
/// }
///
/// impl_default!(Limits {
///     max_batches: 64,
///     label: String::from("default"),
/// });
///
/// assert_eq!(Limits::default().max_batches, 64);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
