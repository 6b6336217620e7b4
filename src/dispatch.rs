/// 进程级内核后端选择
///
/// 第一次调用 `configure_backend` 或 `active_backend` 时确定后端，之后不再改变。
use std::sync::OnceLock;

use sprite_particles_simd::{log_cpu_info, SimdBackend};

use crate::config::SimdConfig;

static ACTIVE_BACKEND: OnceLock<SimdBackend> = OnceLock::new();

/// 按配置确定后端；已经确定过时返回之前的结果
pub fn configure_backend(config: &SimdConfig) -> SimdBackend {
    let backend = *ACTIVE_BACKEND.get_or_init(|| select(config));
    if config.resolve_backend() != backend {
        tracing::debug!(
            target: "simd",
            active = %backend,
            "Kernel backend already fixed for this process, ignoring new configuration"
        );
    }
    backend
}

/// 当前进程使用的后端
///
/// 尚未配置时按默认配置加环境变量覆盖确定。
pub fn active_backend() -> SimdBackend {
    *ACTIVE_BACKEND.get_or_init(|| {
        let mut config = SimdConfig::default();
        config.apply_env_overrides();
        select(&config)
    })
}

fn select(config: &SimdConfig) -> SimdBackend {
    log_cpu_info();
    let backend = config.resolve_backend();
    tracing::info!(
        target: "simd",
        backend = %backend,
        lanes = backend.f32_lanes(),
        "Particle kernel backend selected"
    );
    backend
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_is_fixed_once() {
        let first = active_backend();
        assert!(first.is_supported());

        let other = SimdConfig {
            enabled: first == SimdBackend::Scalar,
            force_instruction_set: None,
        };
        assert_eq!(configure_backend(&other), first);
        assert_eq!(active_backend(), first);
    }
}
