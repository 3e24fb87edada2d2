//! # Value Converter
//!
//! 설정 저장소의 값(`serde_json::Value`)을 대상 타입으로 강제 변환하는
//! 선택적 능력입니다. 레지스트리에 평범한 빈으로 등록해 두면 설정 주입
//! 단계가 레지스트리를 통해 조회해서 사용합니다. 등록되어 있지 않으면
//! 주입은 serde 역직렬화만으로 동작합니다.
//!
//! 기본 생성 시 숫자/불리언/문자열 원시 변환이 미리 등록되며, 문자열로
//! 인코딩된 숫자(`"8080"`)도 허용합니다. 추가 변환은 대상 타입의
//! `TypeId`를 키로 [`ConverterManager::register`]에 등록합니다.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::source::ConfigValue;

type ConverterFn = Arc<dyn Fn(&ConfigValue) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 타입별 값 변환 관리자
///
/// 대상 타입의 `TypeId`를 키로 변환 함수를 보관합니다. 같은 타입에 다시
/// 등록하면 기존 변환을 교체합니다.
///
/// # Examples
///
/// ```rust,ignore
/// use service_registry::{BeanDescriptorBuilder, ConverterManager};
///
/// // 컨버터를 빈으로 등록해 두면 설정 주입이 자동으로 사용한다
/// registry.register(
///     BeanDescriptorBuilder::<ConverterManager>::new("converter_manager")
///         .instance(ConverterManager::new())
///         .build()?,
/// )?;
/// ```
pub struct ConverterManager {
    converters: RwLock<HashMap<TypeId, ConverterFn>>,
}

impl ConverterManager {
    /// 원시 변환이 등록된 관리자를 만듭니다.
    pub fn new() -> Self {
        let manager = ConverterManager {
            converters: RwLock::new(HashMap::new()),
        };

        // 원시 타입 변환. 문자열로 인코딩된 숫자/불리언도 허용한다.
        manager.register::<i64, _>(|value| {
            value.as_i64().or_else(|| value.as_str()?.trim().parse().ok())
        });
        manager.register::<u64, _>(|value| {
            value.as_u64().or_else(|| value.as_str()?.trim().parse().ok())
        });
        manager.register::<f64, _>(|value| {
            value.as_f64().or_else(|| value.as_str()?.trim().parse().ok())
        });
        manager.register::<bool, _>(|value| {
            value.as_bool().or_else(|| value.as_str()?.trim().parse().ok())
        });
        manager.register::<String, _>(|value| match value {
            ConfigValue::String(s) => Some(s.clone()),
            ConfigValue::Number(n) => Some(n.to_string()),
            ConfigValue::Bool(b) => Some(b.to_string()),
            _ => None,
        });

        manager
    }

    /// 대상 타입 `T`의 변환 함수를 등록합니다. 기존 등록은 교체됩니다.
    pub fn register<T, F>(&self, convert: F)
    where
        T: Any + Send + Sync,
        F: Fn(&ConfigValue) -> Option<T> + Send + Sync + 'static,
    {
        let erased: ConverterFn = Arc::new(move |value| {
            convert(value).map(|v| Box::new(v) as Box<dyn Any + Send + Sync>)
        });
        self.converters.write().insert(TypeId::of::<T>(), erased);
    }

    /// 값을 대상 타입 `T`로 변환합니다. 등록된 변환이 없거나 변환이
    /// 실패하면 `None`.
    pub fn convert<T: Any + Send + Sync>(&self, value: &ConfigValue) -> Option<T> {
        let converter = self.converters.read().get(&TypeId::of::<T>()).cloned()?;
        let boxed = (*converter)(value)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// `T`에 대한 변환이 등록되어 있는지 여부
    pub fn supports<T: Any + Send + Sync>(&self) -> bool {
        self.converters.read().contains_key(&TypeId::of::<T>())
    }
}

impl Default for ConverterManager {
    fn default() -> Self {
        Self::new()
    }
}
