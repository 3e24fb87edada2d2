//! # Configuration Injection
//!
//! 생성 직후의 빈에 설정값을 주입하는 선택적 단계입니다.
//!
//! Java라면 리플렉션으로 필드를 순회하겠지만, Rust에는 필드 리플렉션이
//! 없으므로 빈이 [`ConfigInjectable`]을 구현해 자신의 배선 지점을 직접
//! 순회합니다. 디스크립터 빌더의 `as_config()`가 이 trait 구현을 훅으로
//! 캡처해 공급자 체인의 마지막 단계로 감쌉니다.
//!
//! 값 강제 변환은 레지스트리에서 기회주의적으로 조회한
//! [`ConverterManager`]를 우선 사용하고, 등록된 변환이 없으면 serde
//! 역직렬화로 폴백합니다.

use std::any::Any;

use serde::de::DeserializeOwned;

use crate::config::source::ConfigurationSource;
use crate::core::errors::RegistryError;
use crate::utils::convert::ConverterManager;

/// 설정 주입을 받을 수 있는 빈의 능력
///
/// 구현체는 자신의 배선 지점(설정 키 목록)을 알고 있으며,
/// [`inject_value`]로 키를 하나씩 당겨옵니다. 주입은 싱글톤 캐시 히트
/// 시에도 매번 다시 실행되므로, 변경 가능한 상태가 필요하면 내부
/// 가변성(`RwLock`, `OnceLock` 등)을 사용해야 합니다.
///
/// # Examples
///
/// ```rust,ignore
/// struct ServerSettings {
///     port: std::sync::atomic::AtomicU16,
/// }
///
/// impl ConfigInjectable for ServerSettings {
///     fn inject_config(
///         &self,
///         config: &dyn ConfigurationSource,
///         converter: Option<&ConverterManager>,
///     ) -> Result<(), RegistryError> {
///         if let Some(port) = inject_value::<u16>(config, converter, "server.port")? {
///             self.port.store(port, std::sync::atomic::Ordering::Relaxed);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ConfigInjectable: Any + Send + Sync {
    /// 자신의 배선 지점을 순회하며 일치하는 설정 키를 당겨옵니다.
    fn inject_config(
        &self,
        config: &dyn ConfigurationSource,
        converter: Option<&ConverterManager>,
    ) -> Result<(), RegistryError>;
}

/// 설정 키 하나를 대상 타입으로 강제 변환해 가져옵니다.
///
/// 키가 없으면 `Ok(None)`. 값이 있으나 어느 경로로도 변환되지 않으면
/// 키 컨텍스트가 붙은 [`RegistryError::InjectionFailed`]를 반환합니다.
pub fn inject_value<T>(
    config: &dyn ConfigurationSource,
    converter: Option<&ConverterManager>,
    key: &str,
) -> Result<Option<T>, RegistryError>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    let Some(value) = config.get(key) else {
        return Ok(None);
    };

    // 등록된 컨버터 우선, 실패하면 serde 폴백
    if let Some(converter) = converter {
        if let Some(converted) = converter.convert::<T>(&value) {
            return Ok(Some(converted));
        }
    }

    serde_json::from_value::<T>(value).map(Some).map_err(|err| {
        RegistryError::injection(format!("config key `{}`: {}", key, err), None)
    })
}
