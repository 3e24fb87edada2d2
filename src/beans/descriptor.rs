//! # Bean Descriptor & Instance Supplier
//!
//! 등록 가능한 단위 하나를 표현하는 불변 메타데이터와, 인스턴스를 생성하는
//! 공급자 능력을 정의하는 모듈입니다. Spring의 `BeanDefinition` +
//! `ObjectFactory` 조합에 해당합니다.
//!
//! ## 공급자 데코레이터 체인
//!
//! 공급자는 고정된 순서의 데코레이터 체인으로 합성됩니다:
//!
//! ```text
//! raw 생성 (필드/파라미터 배선 포함)
//!   → 싱글톤 메모이제이션 (single = true 인 경우)
//!     → 설정 주입 (as_config = true 인 경우)
//! ```
//!
//! 설정 주입이 싱글톤 캐시 *바깥*에 감기므로, 캐시된 싱글톤을 돌려줄 때도
//! 설정 주입 단계는 매번 다시 실행됩니다. 이 순서는 바뀌면 안 됩니다.
//!
//! ## 타입 호환성 (assignable)
//!
//! Rust에는 런타임 서브타입 검사가 없으므로, 디스크립터가 자신이 어떤
//! 타입 키로도 조회될 수 있는지를 업캐스트 함수와 함께 명시적으로
//! 선언합니다. trait 객체로 노출할 때의 관례는 핸들 타입
//! `Arc<dyn Trait>`를 별칭 키로 쓰는 것입니다:
//!
//! ```rust,ignore
//! let descriptor = BeanDescriptorBuilder::<MyGreeter>::new("my_greeter")
//!     .supplier(|_| Ok(MyGreeter::default()))
//!     .assignable_to::<Arc<dyn Greeter>, _>(|concrete| concrete as Arc<dyn Greeter>)
//!     .build()?;
//! ```

use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::config::inject::ConfigInjectable;
use crate::config::source::ConfigurationSource;
use crate::core::errors::RegistryError;
use crate::core::factory::{BeanFactoryExt, BeanInstance, TypeKey};
use crate::core::registry::{ServiceRegistry, SingletonCache};
use crate::utils::convert::ConverterManager;

/// 메타데이터가 생략한 경우의 기본 우선순위
pub const DEFAULT_PRIORITY: i32 = 90;

type SupplierFn = dyn Fn(&ServiceRegistry) -> Result<BeanInstance, RegistryError> + Send + Sync;

/// 설정 주입 훅: 소거된 인스턴스를 선언 타입으로 복원해 주입을 수행한다
pub(crate) type ConfigHook = Arc<
    dyn Fn(&BeanInstance, &dyn ConfigurationSource, Option<&ConverterManager>) -> Result<(), RegistryError>
        + Send
        + Sync,
>;

/// close 훅: teardown 시점에 인스턴스의 정리 능력을 호출한다
pub(crate) type CloseHook = Arc<dyn Fn(&BeanInstance) -> Result<(), RegistryError> + Send + Sync>;

type Caster = Arc<dyn Fn(&BeanInstance) -> Option<BeanInstance> + Send + Sync>;

/// teardown 시점에 정리가 필요한 빈이 구현하는 능력
///
/// 디스크립터 빌더의 [`BeanDescriptorBuilder::closeable`]로 기록해 두면
/// 레지스트리 `close()`가 실현된 싱글톤에 대해 호출합니다.
/// 실패는 로깅만 되고 나머지 teardown을 중단하지 않습니다.
pub trait Closeable: Send + Sync {
    /// 보유한 리소스를 정리합니다.
    fn close(&self) -> Result<(), RegistryError>;
}

/// 인스턴스 공급자
///
/// 레지스트리를 받아 소거된 인스턴스를 생성하는 단일 능력입니다.
/// 데코레이터 메서드로 싱글톤 캐시와 설정 주입을 겹겹이 감쌀 수 있으며,
/// 합성은 레지스트리가 등록 시점에 수행합니다.
#[derive(Clone)]
pub struct InstanceSupplier {
    inner: Arc<SupplierFn>,
}

impl InstanceSupplier {
    /// 클로저로 공급자를 만듭니다.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<BeanInstance, RegistryError> + Send + Sync + 'static,
    {
        InstanceSupplier { inner: Arc::new(f) }
    }

    /// 공급자를 실행합니다.
    pub fn call(&self, registry: &ServiceRegistry) -> Result<BeanInstance, RegistryError> {
        (*self.inner)(registry)
    }

    /// 싱글톤 메모이제이션 데코레이터
    ///
    /// 이름당 최대 한 번의 생성을 보장합니다. 빠른 경로는 공유 읽기,
    /// 미스일 때만 재진입 가능한 생성 락 아래에서 재확인 후 생성합니다.
    pub(crate) fn with_singleton_cache(self, name: &str, cache: Arc<SingletonCache>) -> InstanceSupplier {
        let name = name.to_string();
        let inner = self;
        InstanceSupplier::new(move |registry| {
            cache.get_or_create(&name, || inner.call(registry))
        })
    }

    /// 설정 주입 데코레이터
    ///
    /// 인스턴스 생성(또는 캐시 조회) 후, 레지스트리의 현재 설정 저장소와
    /// 레지스트리에서 조회한 컨버터(없으면 None)를 넘겨 주입 훅을 실행합니다.
    pub(crate) fn with_config_injection(self, bean_name: &str, hook: ConfigHook) -> InstanceSupplier {
        let bean_name = bean_name.to_string();
        let inner = self;
        InstanceSupplier::new(move |registry| {
            let instance = inner.call(registry)?;
            let configuration = registry.configuration();
            // 컨버터는 레지스트리 자신을 통해 기회주의적으로 조회한다
            let converter = registry.get_or_null::<ConverterManager>();
            (*hook)(&instance, configuration.as_ref(), converter.as_deref()).map_err(|err| {
                RegistryError::injection(format!("configuration of bean `{}`", bean_name), Some(err))
            })?;
            Ok(instance)
        })
    }
}

struct AssignableKey {
    key: TypeKey,
    cast: Caster,
}

/// 등록 가능한 단위 하나의 불변 메타데이터
///
/// 이름, 선언 타입, 싱글톤/초기화 플래그, 우선순위, 그리고 완전히 합성된
/// 인스턴스 공급자를 담습니다. 등록 시점에 만들어지고, `init()`과 이후의
/// 모든 조회에서 읽히며, 개별적으로 파기되지 않고 `close()`에서 일괄
/// 제거됩니다. `name`은 정확히 한 번 부여되고 변경되지 않습니다.
pub struct BeanDescriptor {
    name: String,
    type_key: TypeKey,
    assignable: Vec<AssignableKey>,
    single: bool,
    needs_init: bool,
    priority: i32,
    as_config: bool,
    supplier: InstanceSupplier,
    config_hook: Option<ConfigHook>,
    close_hook: Option<CloseHook>,
}

impl BeanDescriptor {
    /// 빈 이름
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 선언 타입 키
    pub fn type_key(&self) -> &TypeKey {
        &self.type_key
    }

    /// 싱글톤 여부
    pub fn single(&self) -> bool {
        self.single
    }

    /// `init()` 시점의 선행 실현이 필요한지 여부
    pub fn needs_init(&self) -> bool {
        self.needs_init
    }

    /// 해석 우선순위. 낮을수록 먼저.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// 설정 주입 대상 여부
    pub fn as_config(&self) -> bool {
        self.as_config
    }

    /// 요청 타입 키로 이 빈이 조회될 수 있는지
    pub fn is_assignable_to(&self, type_id: TypeId) -> bool {
        self.type_key.id == type_id || self.assignable.iter().any(|a| a.key.id == type_id)
    }

    /// 별칭 키에 대한 업캐스트 함수
    pub(crate) fn caster_for(&self, type_id: TypeId) -> Option<&Caster> {
        self.assignable
            .iter()
            .find(|a| a.key.id == type_id)
            .map(|a| &a.cast)
    }

    pub(crate) fn config_hook(&self) -> Option<&ConfigHook> {
        self.config_hook.as_ref()
    }

    pub(crate) fn close_hook(&self) -> Option<&CloseHook> {
        self.close_hook.as_ref()
    }

    /// 합성된 공급자를 실행해 인스턴스를 실현합니다.
    pub fn supply(&self, registry: &ServiceRegistry) -> Result<BeanInstance, RegistryError> {
        self.supplier.call(registry)
    }

    pub(crate) fn raw_supplier(&self) -> &InstanceSupplier {
        &self.supplier
    }

    /// 공급자를 교체한 사본을 만듭니다. 레지스트리가 데코레이터 체인을
    /// 합성할 때 사용합니다.
    pub(crate) fn with_supplier(self, supplier: InstanceSupplier) -> Self {
        BeanDescriptor { supplier, ..self }
    }
}

/// [`BeanDescriptor`]의 타입이 있는 빌더
///
/// `T`는 공급자가 생산하는 선언 타입입니다. 기본값은 원본 메타데이터의
/// 기본값을 따릅니다: 싱글톤 = true, 초기화 필요 = false, 우선순위 = 90.
///
/// # Examples
///
/// ```rust,ignore
/// use service_registry::{BeanDescriptorBuilder, BeanFactoryExt};
///
/// let descriptor = BeanDescriptorBuilder::<UserService>::new("user_service")
///     .needs_init(true)
///     .supplier(|registry| {
///         Ok(UserService::new(registry.get::<UserRepository>()?))
///     })
///     .build()?;
/// ```
pub struct BeanDescriptorBuilder<T> {
    name: String,
    single: bool,
    needs_init: bool,
    priority: i32,
    as_config: bool,
    supplier: Option<InstanceSupplier>,
    assignable: Vec<AssignableKey>,
    config_hook: Option<ConfigHook>,
    close_hook: Option<CloseHook>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> BeanDescriptorBuilder<T> {
    /// 주어진 이름의 빌더를 만듭니다.
    pub fn new(name: impl Into<String>) -> Self {
        BeanDescriptorBuilder {
            name: name.into(),
            single: true,
            needs_init: false,
            priority: DEFAULT_PRIORITY,
            as_config: false,
            supplier: None,
            assignable: Vec::new(),
            config_hook: None,
            close_hook: None,
            _marker: std::marker::PhantomData,
        }
    }

    /// 싱글톤 여부를 지정합니다. 기본값 true.
    pub fn single(mut self, single: bool) -> Self {
        self.single = single;
        self
    }

    /// `init()` 시점 선행 실현 여부를 지정합니다. 기본값 false.
    pub fn needs_init(mut self, needs_init: bool) -> Self {
        self.needs_init = needs_init;
        self
    }

    /// 해석 우선순위를 지정합니다. 낮을수록 먼저. 기본값 90.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// raw 생성 함수를 지정합니다. 다른 빈에 대한 배선은 이 클로저 안에서
    /// 레지스트리 조회로 수행합니다.
    pub fn supplier<F>(mut self, f: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<T, RegistryError> + Send + Sync + 'static,
    {
        self.supplier = Some(InstanceSupplier::new(move |registry| {
            f(registry).map(|value| Arc::new(value) as BeanInstance)
        }));
        self
    }

    /// 미리 만들어 둔 값을 그대로 공급하는 공급자를 지정합니다.
    pub fn instance(mut self, value: T) -> Self {
        let shared = Arc::new(value);
        self.supplier = Some(InstanceSupplier::new(move |_| {
            Ok(Arc::clone(&shared) as BeanInstance)
        }));
        self
    }

    /// 이 빈이 타입 `I`로도 조회될 수 있음을 선언합니다.
    ///
    /// `cast`는 실현된 구체 인스턴스를 요청 핸들 타입으로 변환합니다.
    /// trait 객체 노출이 전형적인 용도입니다:
    /// `.assignable_to::<Arc<dyn Greeter>, _>(|c| c as Arc<dyn Greeter>)`
    pub fn assignable_to<I, F>(mut self, cast: F) -> Self
    where
        I: Any + Send + Sync,
        F: Fn(Arc<T>) -> I + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: &BeanInstance| {
            Arc::clone(instance)
                .downcast::<T>()
                .ok()
                .map(|concrete| Arc::new(cast(concrete)) as BeanInstance)
        });
        self.assignable.push(AssignableKey {
            key: TypeKey::of::<I>(),
            cast: caster,
        });
        self
    }

    /// 생성 후 설정 주입을 수행하도록 표시합니다.
    ///
    /// 주입은 싱글톤 캐시 바깥에 감기므로 캐시 히트 시에도 매번 실행됩니다.
    pub fn as_config(mut self) -> Self
    where
        T: ConfigInjectable,
    {
        self.config_hook = Some(Arc::new(
            |instance: &BeanInstance,
             config: &dyn ConfigurationSource,
             converter: Option<&ConverterManager>| {
                match Arc::clone(instance).downcast::<T>() {
                    Ok(typed) => typed.inject_config(config, converter),
                    Err(_) => Err(RegistryError::injection(
                        "configuration target type mismatch",
                        None,
                    )),
                }
            },
        ));
        self.as_config = true;
        self
    }

    /// teardown 시점에 [`Closeable::close`]가 호출되도록 표시합니다.
    pub fn closeable(mut self) -> Self
    where
        T: Closeable,
    {
        self.close_hook = Some(Arc::new(|instance: &BeanInstance| {
            match Arc::clone(instance).downcast::<T>() {
                Ok(typed) => typed.close(),
                Err(_) => Ok(()),
            }
        }));
        self
    }

    /// 디스크립터를 빌드합니다.
    ///
    /// # Errors
    ///
    /// 이름이 공백이거나 공급자가 지정되지 않은 경우
    /// [`RegistryError::IllegalDescriptor`]를 반환합니다.
    pub fn build(self) -> Result<BeanDescriptor, RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::IllegalDescriptor(
                "bean name must not be blank".to_string(),
            ));
        }
        let supplier = self.supplier.ok_or_else(|| {
            RegistryError::IllegalDescriptor(format!(
                "bean `{}` has no instance supplier",
                self.name
            ))
        })?;
        Ok(BeanDescriptor {
            name: self.name,
            type_key: TypeKey::of::<T>(),
            assignable: self.assignable,
            single: self.single,
            needs_init: self.needs_init,
            priority: self.priority,
            as_config: self.as_config,
            supplier,
            config_hook: self.config_hook,
            close_hook: self.close_hook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        label: &'static str,
    }

    trait Labeled: Send + Sync {
        fn label(&self) -> &'static str;
    }

    impl Labeled for Sample {
        fn label(&self) -> &'static str {
            self.label
        }
    }

    #[test]
    fn test_builder_defaults_follow_metadata_defaults() {
        let descriptor = BeanDescriptorBuilder::<Sample>::new("sample")
            .supplier(|_| Ok(Sample { label: "s" }))
            .build()
            .unwrap();

        assert!(descriptor.single());
        assert!(!descriptor.needs_init());
        assert_eq!(descriptor.priority(), DEFAULT_PRIORITY);
        assert!(!descriptor.as_config());
        assert_eq!(descriptor.type_key(), &TypeKey::of::<Sample>());
    }

    #[test]
    fn test_blank_name_is_illegal() {
        let result = BeanDescriptorBuilder::<Sample>::new("   ")
            .supplier(|_| Ok(Sample::default()))
            .build();
        assert!(matches!(result, Err(RegistryError::IllegalDescriptor(_))));
    }

    #[test]
    fn test_missing_supplier_is_illegal() {
        let result = BeanDescriptorBuilder::<Sample>::new("sample").build();
        assert!(matches!(result, Err(RegistryError::IllegalDescriptor(_))));
    }

    #[test]
    fn test_assignable_caster_produces_trait_handle() {
        let descriptor = BeanDescriptorBuilder::<Sample>::new("sample")
            .supplier(|_| Ok(Sample { label: "casted" }))
            .assignable_to::<Arc<dyn Labeled>, _>(|concrete| concrete as Arc<dyn Labeled>)
            .build()
            .unwrap();

        assert!(descriptor.is_assignable_to(TypeId::of::<Sample>()));
        assert!(descriptor.is_assignable_to(TypeId::of::<Arc<dyn Labeled>>()));
        assert!(!descriptor.is_assignable_to(TypeId::of::<String>()));

        // 업캐스트 함수가 핸들 타입 페이로드를 만드는지 확인
        let instance: BeanInstance = Arc::new(Sample { label: "casted" });
        let cast = descriptor
            .caster_for(TypeId::of::<Arc<dyn Labeled>>())
            .unwrap();
        let handle = (**cast)(&instance).unwrap();
        let labeled = handle.downcast::<Arc<dyn Labeled>>().unwrap();
        assert_eq!(labeled.label(), "casted");
    }

    #[test]
    fn test_instance_supplier_returns_shared_value() {
        let registry = ServiceRegistry::new();
        let descriptor = BeanDescriptorBuilder::<Sample>::new("sample")
            .instance(Sample { label: "pre-built" })
            .build()
            .unwrap();

        let first = descriptor.supply(&registry).unwrap();
        let second = descriptor.supply(&registry).unwrap();
        // 미리 만들어 둔 값은 공급자 수준에서 이미 공유된다
        assert!(Arc::ptr_eq(&first, &second));
    }
}
