//! # Bean Factory Lookup Surface
//!
//! 레지스트리가 노출하는 조회 계약을 정의하는 모듈입니다.
//! Spring의 `BeanFactory` 인터페이스에 해당하며, 부모 레지스트리 참조도
//! 이 trait 객체(`Arc<dyn BeanFactory>`)로 전달됩니다.
//!
//! ## 타입 소거 모델
//!
//! Rust에는 런타임 리플렉션이 없으므로, 모든 인스턴스는
//! `Arc<dyn Any + Send + Sync>`([`BeanInstance`])로 소거되어 저장되고
//! 타입이 있는 조회는 `TypeId` 기반 다운캐스트로 복원됩니다.
//! 객체 안전한 핵심 계약([`BeanFactory`])은 소거된 형태만 다루고,
//! 제네릭 편의 표면([`BeanFactoryExt`])이 블랭킷 구현으로 얹힙니다.
//!
//! | Spring | 이 시스템 |
//! |--------|-----------|
//! | `getBean(Class<T>)` | `BeanFactoryExt::get::<T>()` |
//! | `getBean(String)` | `BeanFactoryExt::get_by_name()` |
//! | `getBean(String, Class<T>)` | `BeanFactoryExt::get_named::<T>()` |
//! | `ObjectProvider#getIfAvailable` | `BeanFactoryExt::get_or_null::<T>()` |

use std::any::{Any, TypeId};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::errors::RegistryError;

/// 소거된 빈 인스턴스
///
/// 페이로드는 디스크립터가 선언한 타입 `T`이며, 타입이 있는 조회는
/// `Arc::downcast::<T>()`로 복원합니다. trait 객체로 노출되는 빈은
/// 핸들 타입(예: `Arc<dyn Greeter>`)을 페이로드로 싣습니다.
pub type BeanInstance = Arc<dyn Any + Send + Sync>;

/// 인스턴스의 소거된 페이로드 타입 ID
pub(crate) fn instance_type_id(instance: &BeanInstance) -> TypeId {
    (**instance).type_id()
}

/// 타입 기반 조회의 키
///
/// `TypeId`에 사람이 읽을 수 있는 타입 이름을 더한 값입니다.
/// 이름은 에러 메시지와 로그에만 사용되며 동등성 비교는 `id`로만 수행합니다.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    /// 비교에 사용되는 타입 ID
    pub id: TypeId,
    /// 진단용 타입 이름 (`std::any::type_name`)
    pub name: &'static str,
}

impl TypeKey {
    /// 타입 `T`에 대한 키를 만듭니다.
    pub fn of<T: Any + Send + Sync>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

/// 의존성 빈 팩토리 계약
///
/// 레지스트리가 구현하는 객체 안전한 조회 표면입니다. 부모 위임 체인은
/// 이 trait 객체로 연결되므로, 어떤 구현이든 (다른 레지스트리, 합성 팩토리,
/// 테스트 스텁) 부모 자리에 끼울 수 있습니다.
///
/// 세 가지 조회 키(타입 / 이름 / 타입+이름)는 모두 "던지는" 형태로만
/// 정의되어 있습니다. or-null과 or-throw-custom 정책은
/// [`BeanFactoryExt`]에서 이 메서드들 위에 파생됩니다.
pub trait BeanFactory: Send + Sync {
    /// 타입 키로 인스턴스를 해석합니다.
    ///
    /// 반환되는 인스턴스의 페이로드 타입은 요청 키와 일치해야 합니다.
    fn instance_by_type(&self, key: TypeKey) -> Result<BeanInstance, RegistryError>;

    /// 이름으로 인스턴스를 해석합니다.
    fn instance_by_name(&self, name: &str) -> Result<BeanInstance, RegistryError>;

    /// 이름을 우선 키로 해석한 뒤 요청 타입과의 일치를 검사합니다.
    ///
    /// 타입 불일치는 전체 호출의 실패입니다.
    fn instance_named(&self, key: TypeKey, name: &str) -> Result<BeanInstance, RegistryError>;

    /// 현재 존재하는 모든 빈의 이름 (부모와의 합집합)
    fn all_beans(&self) -> BTreeSet<String>;

    /// 이름에 해당하는 빈의 선언 타입. 부모 우선.
    fn type_of(&self, name: &str) -> Option<TypeKey>;
}

/// 타입이 있는 조회 편의 표면
///
/// 모든 [`BeanFactory`] 구현에 블랭킷으로 제공됩니다. 세 가지 실패 정책을
/// 노출합니다:
///
/// - **던지기**: `get`, `get_by_name`, `get_named`
/// - **or-null**: `get_or_null`, `get_by_name_or_null`, `get_named_or_null`.
///   부모 측 에러를 포함한 모든 실패를 `None`으로 삼킵니다.
/// - **or-throw-custom**: `get_or_throw`, `get_by_name_or_throw`.
///   호출자가 not-found 에러를 도메인 에러로 변환합니다.
///
/// # Examples
///
/// ```rust,ignore
/// use service_registry::{BeanFactoryExt, ServiceRegistry};
///
/// let registry = ServiceRegistry::new();
/// let service = registry.get::<UserService>()?;
/// let maybe = registry.get_or_null::<CacheService>();
/// let typed = registry.get_named::<UserService>("user_service")?;
/// ```
pub trait BeanFactoryExt: BeanFactory {
    /// 타입으로 의존성을 가져옵니다. 없으면 `NoSuchBean`.
    fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, RegistryError> {
        let key = TypeKey::of::<T>();
        let instance = self.instance_by_type(key)?;
        instance
            .downcast::<T>()
            .map_err(|_| RegistryError::no_such(key.name, None))
    }

    /// 이름으로 소거된 의존성을 가져옵니다. 없으면 `NoSuchBean`.
    fn get_by_name(&self, name: &str) -> Result<BeanInstance, RegistryError> {
        self.instance_by_name(name)
    }

    /// 이름을 우선 키로 가져와 타입 `T`로 복원합니다. 불일치는 `NoSuchBean`.
    fn get_named<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, RegistryError> {
        let key = TypeKey::of::<T>();
        let instance = self.instance_named(key, name)?;
        instance
            .downcast::<T>()
            .map_err(|_| RegistryError::no_such(format!("`{}` as {}", name, key.name), None))
    }

    /// 타입으로 가져오되, 모든 실패를 `None`으로 삼킵니다.
    fn get_or_null<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get::<T>().ok()
    }

    /// 이름으로 가져오되, 모든 실패를 `None`으로 삼킵니다.
    fn get_by_name_or_null(&self, name: &str) -> Option<BeanInstance> {
        self.instance_by_name(name).ok()
    }

    /// 이름+타입으로 가져오되, 모든 실패를 `None`으로 삼킵니다.
    fn get_named_or_null<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get_named::<T>(name).ok()
    }

    /// 타입으로 가져오되, 실패 시 호출자가 변환한 도메인 에러를 반환합니다.
    fn get_or_throw<T, E, F>(&self, exception_compute: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce(RegistryError) -> E,
    {
        self.get::<T>().map_err(exception_compute)
    }

    /// 이름으로 가져오되, 실패 시 호출자가 변환한 도메인 에러를 반환합니다.
    fn get_by_name_or_throw<E, F>(&self, name: &str, exception_compute: F) -> Result<BeanInstance, E>
    where
        F: FnOnce(RegistryError) -> E,
    {
        self.instance_by_name(name).map_err(exception_compute)
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// 여러 팩토리를 순서대로 합성한 팩토리
///
/// 앞선 팩토리부터 차례로 조회하고, 처음 성공한 결과를 반환합니다.
/// 모두 실패하면 마지막 실패를 원인으로 하는 `NoSuchBean`을 돌려줍니다.
/// `merge_parent`와 함께 쓰면 부모를 여러 겹으로 쌓을 수 있습니다.
///
/// ```rust,ignore
/// registry.merge_parent(|old| {
///     let mut factories: Vec<Arc<dyn BeanFactory>> = vec![Arc::new(extra)];
///     factories.extend(old);
///     Some(Arc::new(CombinedBeanFactory::new(factories)))
/// });
/// ```
pub struct CombinedBeanFactory {
    factories: Vec<Arc<dyn BeanFactory>>,
}

impl CombinedBeanFactory {
    /// 주어진 순서의 팩토리 목록으로 합성 팩토리를 만듭니다.
    pub fn new(factories: Vec<Arc<dyn BeanFactory>>) -> Self {
        CombinedBeanFactory { factories }
    }
}

impl BeanFactory for CombinedBeanFactory {
    fn instance_by_type(&self, key: TypeKey) -> Result<BeanInstance, RegistryError> {
        let mut last: Option<RegistryError> = None;
        for factory in &self.factories {
            match factory.instance_by_type(key) {
                Ok(instance) => return Ok(instance),
                Err(err) => last = Some(err),
            }
        }
        Err(RegistryError::no_such(key.name, last))
    }

    fn instance_by_name(&self, name: &str) -> Result<BeanInstance, RegistryError> {
        let mut last: Option<RegistryError> = None;
        for factory in &self.factories {
            match factory.instance_by_name(name) {
                Ok(instance) => return Ok(instance),
                Err(err) => last = Some(err),
            }
        }
        Err(RegistryError::no_such(name, last))
    }

    fn instance_named(&self, key: TypeKey, name: &str) -> Result<BeanInstance, RegistryError> {
        let mut last: Option<RegistryError> = None;
        for factory in &self.factories {
            match factory.instance_named(key, name) {
                Ok(instance) => return Ok(instance),
                Err(err) => last = Some(err),
            }
        }
        Err(RegistryError::no_such(name, last))
    }

    fn all_beans(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for factory in &self.factories {
            names.extend(factory.all_beans());
        }
        names
    }

    fn type_of(&self, name: &str) -> Option<TypeKey> {
        self.factories.iter().find_map(|f| f.type_of(name))
    }
}
