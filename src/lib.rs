//! 싱글톤 의존성 주입 레지스트리 코어
//!
//! 선언적 빈 디스크립터를 완전히 배선된 인스턴스로 바꾸고, 생명주기
//! (싱글톤/트랜지언트)를 관리하며, 일회성 초기화 작업을 우선순위로
//! 정렬하고, 자식 레지스트리가 부모에게 조회를 위임할 수 있게 하는
//! 의존성 해석 런타임입니다.
//!
//! # Features
//!
//! - **디스크립터 기반 등록**: `(이름, 타입, 플래그, 공급자)` 메타데이터
//! - **싱글톤 관리**: 이름당 정확히 한 번, 첫 접근 시 지연 생성
//! - **2단계 초기화**: pre-pass → 빈 실현 → post-pass 파이프라인
//! - **부모 위임**: 부모 우선 조회와 원인 체인 전파
//! - **설정 주입**: 생성 직후 선택적 key/value 주입 + 값 변환
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │   BeanDescriptor     │ ← 불변 메타데이터 + raw 공급자
//! └──────────────────────┘
//!            │ register() 시 데코레이터 합성
//!            ▼
//! ┌──────────────────────┐
//! │  InstanceSupplier    │ ← raw → 싱글톤 캐시 → 설정 주입
//! └──────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐      parent
//! │   ServiceRegistry    │ ──────────────▶ Arc<dyn BeanFactory>
//! └──────────────────────┘
//!            │ get::<T>() / get_by_name()
//!            ▼
//! ┌──────────────────────┐
//! │     BeanInstance     │ ← Arc<dyn Any + Send + Sync>
//! └──────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use service_registry::{
//!     BeanDescriptorBuilder, BeanFactoryExt, FnPass, ServiceRegistry,
//! };
//!
//! let registry = ServiceRegistry::new();
//!
//! registry.register(
//!     BeanDescriptorBuilder::<UserRepository>::new("user_repository")
//!         .supplier(|_| Ok(UserRepository::connect()))
//!         .build()?,
//! )?;
//!
//! registry.register_pass(
//!     Arc::new(FnPass::with_priority(1, |reg| {
//!         log::info!("beans: {:?}", reg.all_beans());
//!         Ok(())
//!     })),
//!     false,
//!     true,
//! )?;
//!
//! registry.init()?;
//! let repository = registry.get::<UserRepository>()?;
//! ```

pub mod beans;
pub mod config;
pub mod core;
pub mod metadata;
pub mod utils;

pub use crate::beans::descriptor::{
    BeanDescriptor, BeanDescriptorBuilder, Closeable, DEFAULT_PRIORITY, InstanceSupplier,
};
pub use crate::beans::lifecycle::{DEFAULT_PASS_PRIORITY, FnPass, LifecyclePass};
pub use crate::config::inject::{ConfigInjectable, inject_value};
pub use crate::config::source::{
    ConfigValue, ConfigurationSource, EmptyConfiguration, MapConfiguration, MergedConfiguration,
};
pub use crate::core::errors::RegistryError;
pub use crate::core::factory::{
    BeanFactory, BeanFactoryExt, BeanInstance, CombinedBeanFactory, TypeKey,
};
pub use crate::core::registry::ServiceRegistry;
pub use crate::metadata::{BeanRegistration, CollectedMetadata, MetadataProvider};
pub use crate::utils::convert::ConverterManager;
