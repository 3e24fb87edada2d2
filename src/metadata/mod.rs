//! # Bean Metadata Provider
//!
//! 타입에서 디스크립터를 얻는 메타데이터 공급 계약과, `inventory` 기반의
//! 기본 구현을 제공하는 모듈입니다. 레지스트리 코어는 메타데이터가 어떻게
//! 선언되었는지 모르고, `(이름, 타입, 플래그, 공급자)` 튜플을 돌려주는
//! 불투명한 조회로만 취급합니다.
//!
//! ## 동작 원리
//!
//! ```text
//! 1. 컴파일/링크 타임 (Component Scanning)
//!    ├─ inventory::submit! → BeanRegistration 정적 수집
//!    └─ 링커가 모든 등록을 하나의 컬렉션으로 모음
//!
//! 2. 첫 조회 시 (Lazy)
//!    └─ TypeId → 등록 매핑 캐시 구성, 이후 O(1) 조회
//!
//! 3. 런타임 등록
//!    ├─ registry.register_type::<T>() → 타입 하나
//!    └─ registry.register_collected() → 수집된 전체
//! ```
//!
//! | Spring | 이 시스템 |
//! |--------|-----------|
//! | `@ComponentScan` | `inventory::collect!` / 링커 수집 |
//! | `@Component` 선언 | `inventory::submit! { BeanRegistration { .. } }` |
//! | `BeanDefinitionRegistry` | [`MetadataProvider`] |
//!
//! # Examples
//!
//! ```rust,ignore
//! use service_registry::{BeanDescriptorBuilder, BeanRegistration, TypeKey};
//!
//! fn user_service_descriptor() -> BeanDescriptor {
//!     BeanDescriptorBuilder::<UserService>::new("user_service")
//!         .needs_init(true)
//!         .supplier(|reg| Ok(UserService::new(reg.get::<UserRepository>()?)))
//!         .build()
//!         .expect("static descriptor must be well-formed")
//! }
//!
//! inventory::submit! {
//!     BeanRegistration {
//!         name: "user_service",
//!         type_key: TypeKey::of::<UserService>,
//!         descriptor: user_service_descriptor,
//!     }
//! }
//! ```

use std::any::TypeId;
use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::beans::descriptor::BeanDescriptor;
use crate::core::factory::TypeKey;

/// 정적으로 수집되는 빈 등록 정보
///
/// `inventory::submit!`으로 제출하면 링크 타임에 수집됩니다.
/// `descriptor`는 호출될 때마다 새 디스크립터를 만들어야 합니다
/// (등록은 디스크립터를 소비하므로).
pub struct BeanRegistration {
    /// 진단용 등록 이름
    pub name: &'static str,
    /// 선언 타입의 키
    pub type_key: fn() -> TypeKey,
    /// 디스크립터 생성 함수
    pub descriptor: fn() -> BeanDescriptor,
}

inventory::collect!(BeanRegistration);

/// 타입 → 등록 매핑 캐시. 첫 접근 시 한 번만 구성된다.
static REGISTRATION_CACHE: Lazy<HashMap<TypeId, &'static BeanRegistration>> = Lazy::new(|| {
    let mut cache = HashMap::new();
    for registration in inventory::iter::<BeanRegistration> {
        cache.insert((registration.type_key)().id, registration);
    }
    log::debug!("collected {} bean registrations", cache.len());
    cache
});

/// 메타데이터 공급 계약
///
/// 레지스트리의 `register_type::<T>()`와 `register_collected()`가
/// 사용합니다. 기본 구현은 [`CollectedMetadata`]이며, 테스트나 특수한
/// 환경에서는 다른 공급자로 교체할 수 있습니다
/// (`ServiceRegistry::with_metadata`).
pub trait MetadataProvider: Send + Sync {
    /// 타입에 대한 디스크립터를 돌려주거나, 없음을 알립니다.
    fn descriptor_for(&self, type_id: TypeId) -> Option<BeanDescriptor>;

    /// 공급자가 알고 있는 모든 디스크립터
    fn all_descriptors(&self) -> Vec<BeanDescriptor> {
        Vec::new()
    }
}

/// `inventory` 수집 기반의 기본 메타데이터 공급자
pub struct CollectedMetadata;

impl MetadataProvider for CollectedMetadata {
    fn descriptor_for(&self, type_id: TypeId) -> Option<BeanDescriptor> {
        REGISTRATION_CACHE
            .get(&type_id)
            .map(|registration| (registration.descriptor)())
    }

    fn all_descriptors(&self) -> Vec<BeanDescriptor> {
        inventory::iter::<BeanRegistration>
            .into_iter()
            .map(|registration| (registration.descriptor)())
            .collect()
    }
}
