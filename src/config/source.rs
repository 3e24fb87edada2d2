//! # Configuration Sources
//!
//! 설정 저장소 계약과 세 가지 구현을 제공합니다. 저장소 자체는 외부
//! 협력자이며, 레지스트리 코어는 `get` / `contains` / `len` / `set`의
//! 최소 계약만 사용합니다. 텍스트 설정 파일의 해석은 이 크레이트의
//! 범위 밖입니다.
//!
//! | 구현 | 용도 |
//! |------|------|
//! | [`MapConfiguration`] | 쓰기 가능한 기본 저장소. 레지스트리 생성 시 기본값 |
//! | [`EmptyConfiguration`] | `close()` 이후 설치되는 저장소. 쓰기를 거부 |
//! | [`MergedConfiguration`] | `merge_config`와 함께 쓰는 2-소스 오버레이 |
//!
//! 값 타입은 `serde_json::Value`입니다. 중첩 JSON 문서는
//! [`MapConfiguration::from_json`]으로 점 구분 키(`server.port`)로
//! 평탄화해 적재할 수 있습니다.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::core::errors::RegistryError;

/// 설정 저장소의 값 타입
pub type ConfigValue = serde_json::Value;

/// 설정 저장소 계약
///
/// 키 → 값 조회와 쓰기만 정의합니다. 구현은 스레드 안전해야 합니다.
pub trait ConfigurationSource: Send + Sync {
    /// 키에 해당하는 값을 가져옵니다.
    fn get(&self, key: &str) -> Option<ConfigValue>;

    /// 키 존재 여부
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 저장된 항목 수
    fn len(&self) -> usize;

    /// 비어 있는지 여부
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 값을 기록합니다. 구현에 따라 거부될 수 있습니다.
    fn set(&self, key: &str, value: ConfigValue) -> Result<(), RegistryError>;
}

/// 쓰기 가능한 맵 기반 설정 저장소
///
/// 레지스트리 생성 시의 기본 설정 구현입니다.
pub struct MapConfiguration {
    values: RwLock<HashMap<String, ConfigValue>>,
}

impl MapConfiguration {
    /// 빈 저장소를 만듭니다.
    pub fn new() -> Self {
        MapConfiguration {
            values: RwLock::new(HashMap::new()),
        }
    }

    /// JSON 문서를 점 구분 키로 평탄화해 적재합니다.
    ///
    /// ```rust,ignore
    /// let config = MapConfiguration::from_json(&serde_json::json!({
    ///     "server": { "host": "0.0.0.0", "port": 8080 }
    /// }));
    /// assert_eq!(config.get("server.port"), Some(serde_json::json!(8080)));
    /// ```
    pub fn from_json(document: &ConfigValue) -> Self {
        let mut values = HashMap::new();
        Self::flatten("", document, &mut values);
        MapConfiguration {
            values: RwLock::new(values),
        }
    }

    fn flatten(prefix: &str, value: &ConfigValue, out: &mut HashMap<String, ConfigValue>) {
        match value {
            ConfigValue::Object(map) => {
                for (key, nested) in map {
                    let full = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    Self::flatten(&full, nested, out);
                }
            }
            other => {
                if !prefix.is_empty() {
                    out.insert(prefix.to_string(), other.clone());
                }
            }
        }
    }
}

impl Default for MapConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationSource for MapConfiguration {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.values.read().get(key).cloned()
    }

    fn len(&self) -> usize {
        self.values.read().len()
    }

    fn set(&self, key: &str, value: ConfigValue) -> Result<(), RegistryError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// 항상 비어 있고 쓰기를 거부하는 설정 저장소
///
/// 레지스트리 `close()`가 설정 참조를 이 구현으로 교체합니다.
/// close 이후의 조회는 빈 상태로 동작하고, 쓰기 시도는
/// [`RegistryError::ConfigRejected`]로 거부됩니다.
pub struct EmptyConfiguration;

impl ConfigurationSource for EmptyConfiguration {
    fn get(&self, _key: &str) -> Option<ConfigValue> {
        None
    }

    fn len(&self) -> usize {
        0
    }

    fn set(&self, key: &str, _value: ConfigValue) -> Result<(), RegistryError> {
        Err(RegistryError::ConfigRejected(key.to_string()))
    }
}

/// 두 저장소를 겹친 오버레이
///
/// 조회는 primary 우선, 미스일 때 fallback. 쓰기는 primary로 갑니다.
/// `merge_config`로 기존 설정 위에 새 설정을 얹을 때 사용합니다:
///
/// ```rust,ignore
/// registry.merge_config(|current| {
///     Arc::new(MergedConfiguration::new(Arc::new(overrides), current))
/// });
/// ```
pub struct MergedConfiguration {
    primary: Arc<dyn ConfigurationSource>,
    fallback: Arc<dyn ConfigurationSource>,
}

impl MergedConfiguration {
    /// primary가 fallback을 가리는 오버레이를 만듭니다.
    pub fn new(primary: Arc<dyn ConfigurationSource>, fallback: Arc<dyn ConfigurationSource>) -> Self {
        MergedConfiguration { primary, fallback }
    }
}

impl ConfigurationSource for MergedConfiguration {
    fn get(&self, key: &str) -> Option<ConfigValue> {
        self.primary.get(key).or_else(|| self.fallback.get(key))
    }

    fn contains(&self, key: &str) -> bool {
        self.primary.contains(key) || self.fallback.contains(key)
    }

    // 키 집합을 열거할 수 없으므로 두 저장소 항목 수의 합을 보고한다.
    // 겹치는 키는 중복 집계될 수 있다.
    fn len(&self) -> usize {
        self.primary.len() + self.fallback.len()
    }

    fn set(&self, key: &str, value: ConfigValue) -> Result<(), RegistryError> {
        self.primary.set(key, value)
    }
}
