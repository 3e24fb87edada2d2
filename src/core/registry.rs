//! # Service Registry - 싱글톤 의존성 주입 레지스트리 코어
//!
//! 선언적 빈 디스크립터를 완전히 배선된 인스턴스로 바꾸는 의존성 해석
//! 런타임의 중심 모듈입니다. Spring Framework의 ApplicationContext와
//! BeanFactory 역할을 인스턴스 기반으로 구현한 것으로, 부모 레지스트리
//! 위임 체인을 지원합니다.
//!
//! ## Spring Framework와의 비교
//!
//! | Spring 개념 | 이 시스템 | 비고 |
//! |-------------|-----------|------|
//! | `ApplicationContext` | `ServiceRegistry` | 인스턴스 기반, 전역 아님 |
//! | `BeanDefinition` | `BeanDescriptor` | 불변 메타데이터 + 공급자 |
//! | `getBean(Class<T>)` | `get::<T>()` | 타입 안전성 보장 |
//! | `@Lazy` | 기본 동작 | 싱글톤은 첫 접근 시 생성 |
//! | 부모 `ApplicationContext` | `parent: Arc<dyn BeanFactory>` | 부모 우선 조회 |
//! | `BeanFactoryPostProcessor` | pre-init `LifecyclePass` | 우선순위 오름차순 |
//! | `SmartInitializingSingleton` | post-init `LifecyclePass` | 우선순위 오름차순 |
//! | `ConfigurableApplicationContext#close` | `close()` | 빈 상태로 격하 |
//!
//! ## 초기화 파이프라인
//!
//! `init()`은 단 한 번, 끼어들기 없이 다음 순서로 진행됩니다:
//!
//! ```text
//! 1. pre-init 패스 드레인   (우선순위 오름차순, 동률은 FIFO)
//! 2. 대기 중인 빈 실현      (needs_init 디스크립터, 우선순위 오름차순)
//! 3. post-init 패스 드레인  (1과 동일)
//! 4. 세 큐 해제 후 initialized 플래그 전환 (드레인과 같은 락 안에서)
//! ```
//!
//! 플래그 전환이 드레인과 같은 락 안에서 일어나므로, 경합 중인 등록은
//! 큐에 합류하거나(초기화 전) 즉시 실행/실현되며(초기화 후) 유실되지
//! 않습니다.
//!
//! ## 해석 알고리즘 (타입 기준)
//!
//! 1. 부모가 있으면 부모 먼저. 부모 성공은 전체를 단락시키고, 부모 실패는
//!    캡처만 해 둔다.
//! 2. 해석 캐시 조회. 미스면 로컬 디스크립터 전체를 스캔해 호환 후보를
//!    우선순위 오름차순으로 정렬한다. 0건 → "없음"을 캐시. 1건 → 이름
//!    캐시. 동률 최저 2건 이상 → 모호성 에러 (캐시하지 않음). 서로 다른
//!    최저 → 최저를 캐시.
//! 3. 해석된 디스크립터의 공급자를 레지스트리 전체에 대해 실행하거나,
//!    디스크립터 경로 밖에서 등록된 싱글톤을 런타임 타입으로 스캔한다.
//! 4. 모두 실패하면 호출자의 실패 정책을 적용한다.
//!
//! ## 동시성 모델
//!
//! - `init()` / `close()`: 전용 락 + 멱등 플래그의 더블 체크
//! - 싱글톤 실현: 공유 읽기 빠른 경로 → 재진입 생성 락 아래 재확인 후 생성.
//!   이름당 정확히 한 번의 생성을 보장하되, 생성은 레지스트리 전역으로
//!   직렬화된다 (거칠지만 단순한 정확성 보장)
//! - 해석 캐시: 계산은 락 밖에서 수행해 서로 다른 타입의 최초 해석이
//!   서로를 막지 않는다
//! - 이름 맵은 close 전까지 append-only
//!
//! 순환 의존(A의 공급자가 B를 요구하고 B가 다시 A를 요구)은 감지하지
//! 않으며, 실현 시점의 무한 재귀로 나타납니다. 알려진 한계입니다.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::beans::descriptor::BeanDescriptor;
use crate::beans::lifecycle::LifecyclePass;
use crate::config::source::{ConfigurationSource, EmptyConfiguration, MapConfiguration};
use crate::core::errors::RegistryError;
use crate::core::factory::{BeanFactory, BeanInstance, TypeKey, instance_type_id};
use crate::metadata::{CollectedMetadata, MetadataProvider};

/// 싱글톤 인스턴스 캐시
///
/// 이름당 write-once. 빠른 경로는 공유 읽기이고, 미스일 때만 재진입
/// 가능한 생성 락 아래에서 재확인 후 생성합니다. 생성 락이 재진입
/// 가능하므로 공급자가 생성 도중 다른 싱글톤을 이행적으로 실현할 수
/// 있습니다.
pub(crate) struct SingletonCache {
    instances: RwLock<HashMap<String, BeanInstance>>,
    construct: ReentrantMutex<()>,
}

impl SingletonCache {
    fn new() -> Self {
        SingletonCache {
            instances: RwLock::new(HashMap::new()),
            construct: ReentrantMutex::new(()),
        }
    }

    fn get(&self, name: &str) -> Option<BeanInstance> {
        self.instances.read().get(name).cloned()
    }

    /// 더블 체크 패턴의 조회-또는-생성. 이름당 최대 한 번의 생성을
    /// 보장합니다.
    pub(crate) fn get_or_create(
        &self,
        name: &str,
        create: impl FnOnce() -> Result<BeanInstance, RegistryError>,
    ) -> Result<BeanInstance, RegistryError> {
        if let Some(found) = self.instances.read().get(name) {
            return Ok(Arc::clone(found));
        }
        let _guard = self.construct.lock();
        if let Some(found) = self.instances.read().get(name) {
            return Ok(Arc::clone(found));
        }
        let created = create()?;
        self.instances
            .write()
            .insert(name.to_string(), Arc::clone(&created));
        Ok(created)
    }

    fn insert_new(&self, name: &str, instance: BeanInstance) -> Result<(), RegistryError> {
        let _guard = self.construct.lock();
        let mut instances = self.instances.write();
        if instances.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        instances.insert(name.to_string(), instance);
        Ok(())
    }

    fn find_by_type(&self, type_id: TypeId) -> Option<BeanInstance> {
        self.instances
            .read()
            .values()
            .find(|instance| instance_type_id(instance) == type_id)
            .cloned()
    }

    fn names(&self) -> Vec<String> {
        self.instances.read().keys().cloned().collect()
    }

    fn clear(&self) {
        self.instances.write().clear();
    }
}

/// 초기화 대기 중인 빈. 우선순위 오름차순, 동률은 등록 순서.
struct PendingBean {
    priority: i32,
    seq: u64,
    descriptor: Arc<BeanDescriptor>,
}

impl PartialEq for PendingBean {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for PendingBean {}

impl PartialOrd for PendingBean {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingBean {
    // BinaryHeap은 최대 힙이므로 비교를 뒤집어 (priority, seq) 최소를
    // 먼저 꺼낸다
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// 큐잉된 라이프사이클 패스. 정렬 규칙은 [`PendingBean`]과 동일.
struct QueuedPass {
    priority: i32,
    seq: u64,
    pass: Arc<dyn LifecyclePass>,
}

impl PartialEq for QueuedPass {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedPass {}

impl PartialOrd for QueuedPass {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedPass {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// 일회용 라이프사이클 큐. `init()` 완료 시 모두 해제된다.
struct LifecycleQueues {
    pre: Option<BinaryHeap<QueuedPass>>,
    pending: Option<BinaryHeap<PendingBean>>,
    post: Option<BinaryHeap<QueuedPass>>,
}

impl LifecycleQueues {
    fn new() -> Self {
        LifecycleQueues {
            pre: Some(BinaryHeap::new()),
            pending: Some(BinaryHeap::new()),
            post: Some(BinaryHeap::new()),
        }
    }

    fn release(&mut self) {
        self.pre = None;
        self.pending = None;
        self.post = None;
    }
}

enum PassPhase {
    Pre,
    Post,
}

/// 싱글톤 의존성 주입 레지스트리
///
/// 이름 → 디스크립터 맵, 싱글톤 캐시, 타입 해석 캐시, 세 개의
/// 라이프사이클 큐, 선택적 부모 참조를 소유합니다. 등록과 세 가지 조회
/// 전략(타입 / 이름 / 타입+이름)을 각각 세 가지 실패 정책(던지기 / null /
/// 호출자 제공 에러)으로 노출합니다.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use service_registry::{
///     BeanDescriptorBuilder, BeanFactoryExt, FnPass, ServiceRegistry,
/// };
///
/// let registry = ServiceRegistry::new();
///
/// registry.register(
///     BeanDescriptorBuilder::<UserRepository>::new("user_repository")
///         .supplier(|_| Ok(UserRepository::connect()))
///         .build()?,
/// )?;
/// registry.register(
///     BeanDescriptorBuilder::<UserService>::new("user_service")
///         .needs_init(true)
///         .supplier(|reg| Ok(UserService::new(reg.get::<UserRepository>()?)))
///         .build()?,
/// )?;
///
/// registry.init()?;
///
/// let service = registry.get::<UserService>()?;
/// ```
pub struct ServiceRegistry {
    /// 이름 → 디스크립터. close 전까지 append-only.
    descriptors: RwLock<HashMap<String, Arc<BeanDescriptor>>>,
    /// 싱글톤 캐시. 공급자 데코레이터가 Arc로 공유한다.
    singletons: Arc<SingletonCache>,
    /// 타입 → 해석된 이름 (None = "매칭 없음"도 캐시). close로만 무효화.
    resolved_types: RwLock<HashMap<TypeId, Option<String>>>,
    /// 세 라이프사이클 큐. 락이 재진입 가능하므로 드레인 중의 등록이
    /// 데드락 없이 합류한다.
    lifecycle: ReentrantMutex<RefCell<LifecycleQueues>>,
    parent: RwLock<Option<Arc<dyn BeanFactory>>>,
    configuration: RwLock<Arc<dyn ConfigurationSource>>,
    metadata: Arc<dyn MetadataProvider>,
    initialized: AtomicBool,
    closed: AtomicBool,
    close_lock: Mutex<()>,
    seq: AtomicU64,
}

impl ServiceRegistry {
    /// 빈 레지스트리를 만듭니다. 설정은 쓰기 가능한
    /// [`MapConfiguration`], 메타데이터는 `inventory` 수집 기반이
    /// 기본값입니다.
    pub fn new() -> Self {
        ServiceRegistry {
            descriptors: RwLock::new(HashMap::new()),
            singletons: Arc::new(SingletonCache::new()),
            resolved_types: RwLock::new(HashMap::new()),
            lifecycle: ReentrantMutex::new(RefCell::new(LifecycleQueues::new())),
            parent: RwLock::new(None),
            configuration: RwLock::new(Arc::new(MapConfiguration::new())),
            metadata: Arc::new(CollectedMetadata),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            close_lock: Mutex::new(()),
            seq: AtomicU64::new(0),
        }
    }

    /// 부모 팩토리를 지정합니다. 모든 조회는 부모를 먼저 시도합니다.
    pub fn with_parent(self, parent: Arc<dyn BeanFactory>) -> Self {
        *self.parent.write() = Some(parent);
        self
    }

    /// 설정 저장소를 지정합니다.
    pub fn with_configuration(self, configuration: Arc<dyn ConfigurationSource>) -> Self {
        *self.configuration.write() = configuration;
        self
    }

    /// 메타데이터 공급자를 교체합니다.
    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = metadata;
        self
    }

    /// 현재 설정 저장소
    pub fn configuration(&self) -> Arc<dyn ConfigurationSource> {
        Arc::clone(&self.configuration.read())
    }

    /// `init()`이 완료되었는지 여부
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// `close()`가 완료되었는지 여부
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 부모 참조를 락 아래에서 원자적으로 교체합니다.
    pub fn merge_parent<F>(&self, merger: F)
    where
        F: FnOnce(Option<Arc<dyn BeanFactory>>) -> Option<Arc<dyn BeanFactory>>,
    {
        let mut parent = self.parent.write();
        let current = parent.take();
        *parent = merger(current);
    }

    /// 설정 참조를 락 아래에서 원자적으로 교체합니다.
    pub fn merge_config<F>(&self, merger: F)
    where
        F: FnOnce(Arc<dyn ConfigurationSource>) -> Arc<dyn ConfigurationSource>,
    {
        let mut configuration = self.configuration.write();
        let current = Arc::clone(&configuration);
        *configuration = merger(current);
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn descriptor(&self, name: &str) -> Option<Arc<BeanDescriptor>> {
        self.descriptors.read().get(name).cloned()
    }

    // ==========================================================================
    // 등록
    // ==========================================================================

    /// 디스크립터를 등록합니다.
    ///
    /// 공급자는 여기서 고정 순서의 데코레이터 체인으로 합성됩니다:
    /// raw → 싱글톤 캐시 → 설정 주입. 이름 충돌은
    /// [`RegistryError::DuplicateName`]으로 거부되고 기존 상태는 변하지
    /// 않습니다.
    ///
    /// `needs_init` 디스크립터는 초기화 전이면 대기 큐에 들어가고,
    /// 이미 초기화된 뒤라면 즉시 실현되므로, 두 번째 `init()` 호출은
    /// 필요하지 않습니다.
    pub fn register(&self, descriptor: BeanDescriptor) -> Result<(), RegistryError> {
        let name = descriptor.name().to_string();

        // 공급자 합성: raw → 싱글톤 캐시 → 설정 주입 (순서 고정)
        let mut supplier = descriptor.raw_supplier().clone();
        if descriptor.single() {
            supplier = supplier.with_singleton_cache(&name, Arc::clone(&self.singletons));
        }
        if let Some(hook) = descriptor.config_hook() {
            supplier = supplier.with_config_injection(&name, Arc::clone(hook));
        }
        let descriptor = Arc::new(descriptor.with_supplier(supplier));

        {
            let mut descriptors = self.descriptors.write();
            if descriptors.contains_key(&name) {
                return Err(RegistryError::DuplicateName(name));
            }
            descriptors.insert(name.clone(), Arc::clone(&descriptor));
        }
        log::debug!(
            "registered bean `{}` ({})",
            name,
            descriptor.type_key().name
        );

        if descriptor.needs_init() {
            if self.initialized.load(Ordering::Acquire) {
                // init 이후의 등록은 즉시 실현한다
                descriptor.supply(self)?;
            } else {
                let guard = self.lifecycle.lock();
                if self.initialized.load(Ordering::Acquire) {
                    drop(guard);
                    descriptor.supply(self)?;
                } else {
                    let seq = self.next_seq();
                    if let Some(pending) = guard.borrow_mut().pending.as_mut() {
                        pending.push(PendingBean {
                            priority: descriptor.priority(),
                            seq,
                            descriptor: Arc::clone(&descriptor),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// 메타데이터 공급자에서 타입 `T`의 디스크립터를 얻어 등록합니다.
    ///
    /// # Errors
    ///
    /// 타입에 대한 메타데이터가 없으면
    /// [`RegistryError::IllegalDescriptor`].
    pub fn register_type<T: Any + Send + Sync>(&self) -> Result<(), RegistryError> {
        let key = TypeKey::of::<T>();
        let descriptor = self.metadata.descriptor_for(key.id).ok_or_else(|| {
            RegistryError::IllegalDescriptor(format!(
                "no bean metadata registered for type `{}`",
                key.name
            ))
        })?;
        self.register(descriptor)
    }

    /// 메타데이터 공급자가 알고 있는 모든 디스크립터를 등록하고 등록된
    /// 개수를 돌려줍니다.
    pub fn register_collected(&self) -> Result<usize, RegistryError> {
        let descriptors = self.metadata.all_descriptors();
        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        log::debug!("registered {} collected beans", count);
        Ok(count)
    }

    /// 미리 만들어진 인스턴스를 디스크립터 없이 싱글톤 캐시에 직접
    /// 등록합니다.
    ///
    /// 타입 조회의 런타임 타입 스캔 폴백과 이름 조회 양쪽에서 도달
    /// 가능합니다. 이름당 write-once이며 중복은 거부됩니다.
    pub fn register_singleton<T: Any + Send + Sync>(
        &self,
        name: &str,
        instance: Arc<T>,
    ) -> Result<(), RegistryError> {
        log::debug!("registered singleton instance `{}`", name);
        self.singletons.insert_new(name, instance as BeanInstance)
    }

    /// 라이프사이클 패스를 등록합니다.
    ///
    /// `pre_init` / `post_init` 플래그에 따라 해당 큐에 들어갑니다 (둘 다
    /// 지정 가능). 레지스트리가 이미 초기화되었다면 큐잉 없이 즉시 동기
    /// 실행됩니다. 패스는 절대 조용히 버려지지 않습니다.
    pub fn register_pass(
        &self,
        pass: Arc<dyn LifecyclePass>,
        pre_init: bool,
        post_init: bool,
    ) -> Result<(), RegistryError> {
        if pre_init {
            self.register_phase_pass(Arc::clone(&pass), PassPhase::Pre)?;
        }
        if post_init {
            self.register_phase_pass(pass, PassPhase::Post)?;
        }
        Ok(())
    }

    fn register_phase_pass(
        &self,
        pass: Arc<dyn LifecyclePass>,
        phase: PassPhase,
    ) -> Result<(), RegistryError> {
        if self.initialized.load(Ordering::Acquire) {
            return pass.run(self);
        }
        let guard = self.lifecycle.lock();
        if self.initialized.load(Ordering::Acquire) {
            drop(guard);
            return pass.run(self);
        }
        let seq = self.next_seq();
        let mut queues = guard.borrow_mut();
        let queue = match phase {
            PassPhase::Pre => queues.pre.as_mut(),
            PassPhase::Post => queues.post.as_mut(),
        };
        if let Some(queue) = queue {
            queue.push(QueuedPass {
                priority: pass.priority(),
                seq,
                pass,
            });
        }
        Ok(())
    }

    // ==========================================================================
    // 초기화 / 종료
    // ==========================================================================

    /// 초기화 파이프라인을 실행합니다. 멱등이며, 동시 호출은 직렬화되고
    /// 두 번째 이후 호출은 no-op입니다.
    ///
    /// 패스나 공급자의 실패는 그대로 전파되고, 그 경우 initialized
    /// 플래그는 전환되지 않습니다.
    pub fn init(&self) -> Result<(), RegistryError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        let guard = self.lifecycle.lock();
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }

        log::debug!("initializing service registry");

        // 1. pre-init 패스 드레인. 한 번에 하나씩 꺼내 실행하므로 패스가
        //    등록하는 추가 패스/빈도 같은 드레인에 합류한다.
        loop {
            let next = guard.borrow_mut().pre.as_mut().and_then(|q| q.pop());
            match next {
                Some(queued) => queued.pass.run(self)?,
                None => break,
            }
        }

        // 2. 대기 중인 빈 실현 (싱글톤 생성 강제)
        loop {
            let next = guard.borrow_mut().pending.as_mut().and_then(|q| q.pop());
            match next {
                Some(pending) => {
                    pending.descriptor.supply(self)?;
                }
                None => break,
            }
        }

        // 3. post-init 패스 드레인
        loop {
            let next = guard.borrow_mut().post.as_mut().and_then(|q| q.pop());
            match next {
                Some(queued) => queued.pass.run(self)?,
                None => break,
            }
        }

        // 4. 큐 해제 후 플래그 전환. 같은 락 안이므로 경합 등록이 유실되지
        //    않는다.
        guard.borrow_mut().release();
        self.initialized.store(true, Ordering::Release);

        log::debug!("service registry initialized");
        Ok(())
    }

    /// 레지스트리를 빈 상태로 격하합니다. 멱등.
    ///
    /// 실현된 싱글톤 중 close 능력이 기록된 것들을 정리하고 (개별 실패는
    /// 로깅만), 이름 맵 / 싱글톤 캐시 / 해석 캐시를 비우고, 부모를
    /// 내려놓고, 설정을 쓰기를 거부하는 빈 구현으로 교체합니다.
    ///
    /// close 이후의 조회는 "닫힘" 에러가 아니라 빈 맵에 대한 일반적인
    /// [`RegistryError::NoSuchBean`]으로 동작합니다. 일반적으로 shutdown
    /// hook에서 호출합니다.
    pub fn close(&self) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let _guard = self.close_lock.lock();
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let descriptors: Vec<Arc<BeanDescriptor>> =
            self.descriptors.read().values().cloned().collect();
        for descriptor in descriptors {
            let Some(hook) = descriptor.close_hook() else {
                continue;
            };
            // 실현된 적 없는 싱글톤은 정리할 것도 없다
            let Some(instance) = self.singletons.get(descriptor.name()) else {
                continue;
            };
            if let Err(err) = (**hook)(&instance) {
                log::warn!("failed to close bean `{}`: {}", descriptor.name(), err);
            }
        }

        self.descriptors.write().clear();
        self.singletons.clear();
        self.resolved_types.write().clear();
        *self.parent.write() = None;
        *self.configuration.write() = Arc::new(EmptyConfiguration);
        self.lifecycle.lock().borrow_mut().release();

        self.closed.store(true, Ordering::Release);
        log::debug!("service registry closed");
    }

    // ==========================================================================
    // 해석
    // ==========================================================================

    /// 타입 키를 로컬 디스크립터 이름으로 해석합니다. 결과("없음" 포함)는
    /// 캐시되고, 모호성만 캐시 없이 에러로 전파됩니다.
    fn resolve_type_local(&self, key: TypeKey) -> Result<Option<String>, RegistryError> {
        if let Some(cached) = self.resolved_types.read().get(&key.id) {
            return Ok(cached.clone());
        }

        // 캐시 미스: 쓰기 락 밖에서 스캔해 서로 다른 타입의 최초 해석이
        // 서로를 막지 않게 한다
        let computed: Option<String> = {
            let descriptors = self.descriptors.read();
            let mut matches: Vec<&Arc<BeanDescriptor>> = descriptors
                .values()
                .filter(|d| d.is_assignable_to(key.id))
                .collect();
            matches.sort_by_key(|d| d.priority());

            match matches.len() {
                0 => None,
                1 => Some(matches[0].name().to_string()),
                _ if matches[0].priority() == matches[1].priority() => {
                    // 모호성은 캐시하지 않는다: 등록이 바뀌면 다음 호출에서
                    // 다시 평가된다
                    return Err(RegistryError::AmbiguousBean {
                        type_name: key.name.to_string(),
                        priority: matches[0].priority(),
                    });
                }
                _ => Some(matches[0].name().to_string()),
            }
        };

        // 첫 기록이 승리한다: 같은 타입의 동시 해석은 멱등이다
        let mut cache = self.resolved_types.write();
        let entry = cache.entry(key.id).or_insert(computed);
        Ok(entry.clone())
    }

    /// 디스크립터를 실현하고, 요청 키가 별칭이면 업캐스트합니다.
    fn realize(
        &self,
        descriptor: &Arc<BeanDescriptor>,
        key: TypeKey,
    ) -> Result<BeanInstance, RegistryError> {
        let instance = descriptor.supply(self)?;
        if descriptor.type_key().id == key.id || instance_type_id(&instance) == key.id {
            return Ok(instance);
        }
        match descriptor.caster_for(key.id) {
            Some(cast) => (**cast)(&instance).ok_or_else(|| {
                RegistryError::injection(
                    format!("cast of bean `{}` to {}", descriptor.name(), key.name),
                    None,
                )
            }),
            None => Err(RegistryError::no_such(
                format!("`{}` as {}", descriptor.name(), key.name),
                None,
            )),
        }
    }

    /// 타입에 호환되는 로컬 빈을 전부 실현합니다. 부모는 조회하지
    /// 않습니다.
    pub fn all_of_type<T: Any + Send + Sync>(&self) -> Result<Vec<Arc<T>>, RegistryError> {
        let key = TypeKey::of::<T>();
        let matched: Vec<Arc<BeanDescriptor>> = self
            .descriptors
            .read()
            .values()
            .filter(|d| d.is_assignable_to(key.id))
            .cloned()
            .collect();

        let mut instances = Vec::with_capacity(matched.len());
        for descriptor in matched {
            let instance = self.realize(&descriptor, key)?;
            let typed = instance
                .downcast::<T>()
                .map_err(|_| RegistryError::no_such(key.name, None))?;
            instances.push(typed);
        }
        Ok(instances)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BeanFactory for ServiceRegistry {
    fn instance_by_type(&self, key: TypeKey) -> Result<BeanInstance, RegistryError> {
        // 1. 부모 우선. 부모 성공은 로컬을 아예 조회하지 않는다. 부모
        //    실패는 캡처해 두었다가 로컬까지 실패할 때만 원인으로 쓴다.
        let parent = self.parent.read().clone();
        let mut parent_err: Option<RegistryError> = None;
        if let Some(parent) = parent {
            match parent.instance_by_type(key) {
                Ok(instance) => return Ok(instance),
                Err(err) => parent_err = Some(err),
            }
        }

        // 2. 로컬 해석. 모호성은 즉시 전파된다.
        if let Some(name) = self.resolve_type_local(key)? {
            if let Some(descriptor) = self.descriptor(&name) {
                return self.realize(&descriptor, key);
            }
        }

        // 3. 디스크립터 경로 밖에서 등록된 싱글톤의 런타임 타입 스캔
        if let Some(instance) = self.singletons.find_by_type(key.id) {
            return Ok(instance);
        }

        Err(RegistryError::no_such(key.name, parent_err))
    }

    fn instance_by_name(&self, name: &str) -> Result<BeanInstance, RegistryError> {
        let parent = self.parent.read().clone();
        let mut parent_err: Option<RegistryError> = None;
        if let Some(parent) = parent {
            match parent.instance_by_name(name) {
                Ok(instance) => return Ok(instance),
                Err(err) => parent_err = Some(err),
            }
        }

        if let Some(descriptor) = self.descriptor(name) {
            return descriptor.supply(self);
        }
        // 디스크립터 없이 직접 등록된 싱글톤
        if let Some(instance) = self.singletons.get(name) {
            return Ok(instance);
        }

        Err(RegistryError::no_such(name, parent_err))
    }

    fn instance_named(&self, key: TypeKey, name: &str) -> Result<BeanInstance, RegistryError> {
        // 이름이 1차 키. 타입 불일치는 전체 호출의 실패다.
        let instance = self.instance_by_name(name)?;
        if instance_type_id(&instance) == key.id {
            return Ok(instance);
        }
        if let Some(descriptor) = self.descriptor(name) {
            if let Some(cast) = descriptor.caster_for(key.id) {
                if let Some(converted) = (**cast)(&instance) {
                    return Ok(converted);
                }
            }
        }
        Err(RegistryError::no_such(
            format!("`{}` as {}", name, key.name),
            None,
        ))
    }

    fn all_beans(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.descriptors.read().keys().cloned().collect();
        names.extend(self.singletons.names());
        if let Some(parent) = self.parent.read().clone() {
            names.extend(parent.all_beans());
        }
        names
    }

    fn type_of(&self, name: &str) -> Option<TypeKey> {
        if let Some(parent) = self.parent.read().clone() {
            if let Some(found) = parent.type_of(name) {
                return Some(found);
            }
        }
        self.descriptor(name).map(|d| *d.type_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beans::descriptor::{BeanDescriptorBuilder, Closeable};
    use crate::beans::lifecycle::FnPass;
    use crate::core::factory::BeanFactoryExt;
    use parking_lot::Mutex as PlMutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug)]
    struct Repo {
        id: usize,
    }

    struct Service {
        repo: Arc<Repo>,
    }

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> &'static str;
    }

    #[derive(Debug)]
    struct GreeterB;
    #[derive(Debug)]
    struct GreeterC;

    impl Greeter for GreeterB {
        fn greet(&self) -> &'static str {
            "b"
        }
    }

    impl Greeter for GreeterC {
        fn greet(&self) -> &'static str {
            "c"
        }
    }

    fn greeter_b(priority: i32) -> BeanDescriptor {
        BeanDescriptorBuilder::<GreeterB>::new("greeter_b")
            .single(false)
            .priority(priority)
            .supplier(|_| Ok(GreeterB))
            .assignable_to::<Arc<dyn Greeter>, _>(|c| c as Arc<dyn Greeter>)
            .build()
            .unwrap()
    }

    fn greeter_c(priority: i32) -> BeanDescriptor {
        BeanDescriptorBuilder::<GreeterC>::new("greeter_c")
            .single(false)
            .priority(priority)
            .supplier(|_| Ok(GreeterC))
            .assignable_to::<Arc<dyn Greeter>, _>(|c| c as Arc<dyn Greeter>)
            .build()
            .unwrap()
    }

    // P1: 이름 중복은 거부되고 기존 상태는 변하지 않는다
    #[test]
    fn test_duplicate_name_rejected_and_state_untouched() {
        let registry = ServiceRegistry::new();
        registry
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| Ok(Repo { id: 1 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let before = registry.all_beans();
        let result = registry.register(
            BeanDescriptorBuilder::<Service>::new("repo")
                .supplier(|_| {
                    Ok(Service {
                        repo: Arc::new(Repo { id: 2 }),
                    })
                })
                .build()
                .unwrap(),
        );

        assert!(matches!(result, Err(RegistryError::DuplicateName(_))));
        assert_eq!(registry.all_beans(), before);
        // 기존 빈은 그대로 동작한다
        assert_eq!(registry.get::<Repo>().unwrap().id, 1);
    }

    // P2: 싱글톤은 동시 접근에서도 정확히 한 번 생성된다
    #[test]
    fn test_singleton_constructed_once_under_concurrency() {
        static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| {
                        CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
                        Ok(Repo { id: 7 })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let mut results = Vec::new();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    scope.spawn(move || registry.get::<Repo>().unwrap())
                })
                .collect();
            for handle in handles {
                results.push(handle.join().unwrap());
            }
        });

        assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
        for instance in &results[1..] {
            assert!(Arc::ptr_eq(&results[0], instance));
        }
    }

    #[test]
    fn test_transient_constructs_each_time() {
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(1)).unwrap();

        let first = registry.get::<GreeterB>().unwrap();
        let second = registry.get::<GreeterB>().unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    // 싱글톤 공급자가 다른 싱글톤을 이행적으로 실현해도 데드락이 없다
    #[test]
    fn test_nested_singleton_realization() {
        let registry = ServiceRegistry::new();
        registry
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| Ok(Repo { id: 3 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                BeanDescriptorBuilder::<Service>::new("service")
                    .supplier(|reg| {
                        Ok(Service {
                            repo: reg.get::<Repo>()?,
                        })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let service = registry.get::<Service>().unwrap();
        assert_eq!(service.repo.id, 3);
        // 내부에서 실현된 싱글톤은 캐시를 공유한다
        assert!(Arc::ptr_eq(&service.repo, &registry.get::<Repo>().unwrap()));
    }

    // P3: 부모가 만족시킬 수 있으면 자식의 공급자는 호출되지 않는다
    #[test]
    fn test_parent_precedence_short_circuits_child() {
        static CHILD_SUPPLIED: AtomicUsize = AtomicUsize::new(0);

        let parent = Arc::new(ServiceRegistry::new());
        parent
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| Ok(Repo { id: 100 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let child = ServiceRegistry::new().with_parent(parent.clone() as Arc<dyn BeanFactory>);
        child
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| {
                        CHILD_SUPPLIED.fetch_add(1, Ordering::SeqCst);
                        Ok(Repo { id: 200 })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(child.get::<Repo>().unwrap().id, 100);
        assert_eq!(child.get_by_name("repo").is_ok(), true);
        assert_eq!(CHILD_SUPPLIED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_parent_failure_attached_as_cause() {
        use std::error::Error;

        let parent = Arc::new(ServiceRegistry::new());
        let child = ServiceRegistry::new().with_parent(parent as Arc<dyn BeanFactory>);

        let err = child.get::<Repo>().unwrap_err();
        // 로컬도 실패했으므로 부모 측 실패가 원인으로 연결된다
        assert!(err.source().is_some());
    }

    // P4: 타입 해석은 한 번 캐시되면 새 등록으로 무효화되지 않는다
    #[test]
    fn test_resolution_cache_is_permanent() {
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(90)).unwrap();

        let first = registry.get::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(first.greet(), "b");

        // 더 낮은 우선순위(= 더 우선)의 매칭을 등록해도 캐시는 그대로
        registry.register(greeter_c(1)).unwrap();
        let second = registry.get::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(second.greet(), "b");
    }

    #[test]
    fn test_resolution_before_first_lookup_sees_new_registration() {
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(90)).unwrap();
        // 첫 해석 전의 등록은 결과에 반영된다
        registry.register(greeter_c(1)).unwrap();

        let resolved = registry.get::<Arc<dyn Greeter>>().unwrap();
        assert_eq!(resolved.greet(), "c");
    }

    // P5 + 시나리오: 동률 모호성은 매번 에러, 우선순위를 바꾸면 결정적
    #[test]
    fn test_ambiguity_raised_every_time_until_reprioritized() {
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(1)).unwrap();
        registry.register(greeter_c(1)).unwrap();

        for _ in 0..2 {
            let err = registry.get::<Arc<dyn Greeter>>().unwrap_err();
            assert!(matches!(err, RegistryError::AmbiguousBean { priority: 1, .. }));
        }

        // 우선순위가 구분되는 레지스트리에서는 B가 결정적으로 선택된다
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(1)).unwrap();
        registry.register(greeter_c(2)).unwrap();
        assert_eq!(registry.get::<Arc<dyn Greeter>>().unwrap().greet(), "b");
    }

    // P6: pre → 빈 실현 → post, 각각 우선순위 오름차순
    #[test]
    fn test_init_ordering() {
        let order: Arc<PlMutex<Vec<String>>> = Arc::new(PlMutex::new(Vec::new()));
        let registry = ServiceRegistry::new();

        for priority in [3, 1, 2] {
            let order = Arc::clone(&order);
            registry
                .register_pass(
                    Arc::new(FnPass::with_priority(priority, move |_| {
                        order.lock().push(format!("pre{}", priority));
                        Ok(())
                    })),
                    true,
                    false,
                )
                .unwrap();
        }

        for (name, priority) in [("bean5", 5), ("bean2", 2)] {
            let order = Arc::clone(&order);
            registry
                .register(
                    BeanDescriptorBuilder::<Repo>::new(name)
                        .needs_init(true)
                        .priority(priority)
                        .supplier(move |_| {
                            order.lock().push(format!("bean{}", priority));
                            Ok(Repo { id: priority as usize })
                        })
                        .build()
                        .unwrap(),
                )
                .unwrap();
        }

        for priority in [2, 1] {
            let order = Arc::clone(&order);
            registry
                .register_pass(
                    Arc::new(FnPass::with_priority(priority, move |_| {
                        order.lock().push(format!("post{}", priority));
                        Ok(())
                    })),
                    false,
                    true,
                )
                .unwrap();
        }

        registry.init().unwrap();

        assert_eq!(
            *order.lock(),
            vec!["pre1", "pre2", "pre3", "bean2", "bean5", "post1", "post2"]
        );
    }

    #[test]
    fn test_equal_priority_passes_run_in_fifo_order() {
        let order: Arc<PlMutex<Vec<&'static str>>> = Arc::new(PlMutex::new(Vec::new()));
        let registry = ServiceRegistry::new();

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry
                .register_pass(
                    Arc::new(FnPass::with_priority(10, move |_| {
                        order.lock().push(label);
                        Ok(())
                    })),
                    true,
                    false,
                )
                .unwrap();
        }

        registry.init().unwrap();
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_init_is_idempotent() {
        static PRE_RUNS: AtomicUsize = AtomicUsize::new(0);

        let registry = ServiceRegistry::new();
        registry
            .register_pass(
                Arc::new(FnPass::new(|_| {
                    PRE_RUNS.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })),
                true,
                false,
            )
            .unwrap();

        registry.init().unwrap();
        registry.init().unwrap();
        assert_eq!(PRE_RUNS.load(Ordering::SeqCst), 1);
        assert!(registry.is_initialized());
    }

    // init 이후의 등록은 두 번째 init 없이 즉시 실현/실행된다
    #[test]
    fn test_late_registration_realizes_immediately() {
        static LATE_BEAN: AtomicUsize = AtomicUsize::new(0);
        static LATE_PASS: AtomicUsize = AtomicUsize::new(0);

        let registry = ServiceRegistry::new();
        registry.init().unwrap();

        registry
            .register(
                BeanDescriptorBuilder::<Repo>::new("late")
                    .needs_init(true)
                    .supplier(|_| {
                        LATE_BEAN.fetch_add(1, Ordering::SeqCst);
                        Ok(Repo { id: 9 })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        assert_eq!(LATE_BEAN.load(Ordering::SeqCst), 1);

        registry
            .register_pass(
                Arc::new(FnPass::new(|_| {
                    LATE_PASS.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })),
                true,
                true,
            )
            .unwrap();
        // pre와 post 양쪽으로 등록했으므로 두 번 즉시 실행된다
        assert_eq!(LATE_PASS.load(Ordering::SeqCst), 2);
    }

    // 패스가 드레인 도중 빈을 등록해도 유실되지 않는다
    #[test]
    fn test_pass_registering_bean_mid_drain() {
        static MID_BEAN: AtomicUsize = AtomicUsize::new(0);

        let registry = ServiceRegistry::new();
        registry
            .register_pass(
                Arc::new(FnPass::new(|reg: &ServiceRegistry| {
                    reg.register(
                        BeanDescriptorBuilder::<Repo>::new("mid-drain")
                            .needs_init(true)
                            .supplier(|_| {
                                MID_BEAN.fetch_add(1, Ordering::SeqCst);
                                Ok(Repo { id: 11 })
                            })
                            .build()
                            .unwrap(),
                    )
                })),
                true,
                false,
            )
            .unwrap();

        registry.init().unwrap();
        assert_eq!(MID_BEAN.load(Ordering::SeqCst), 1);
    }

    struct ClosingRepo {
        closes: Arc<AtomicUsize>,
    }

    impl Closeable for ClosingRepo {
        fn close(&self) -> Result<(), RegistryError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    // 시나리오: close 두 번 → 두 번째는 no-op, 이후 조회는 NoSuchBean
    #[test]
    fn test_close_is_idempotent_and_degrades_to_empty() {
        let closes = Arc::new(AtomicUsize::new(0));
        let registry = ServiceRegistry::new();

        let closes_for_bean = Arc::clone(&closes);
        registry
            .register(
                BeanDescriptorBuilder::<ClosingRepo>::new("a")
                    .needs_init(true)
                    .supplier(move |_| {
                        Ok(ClosingRepo {
                            closes: Arc::clone(&closes_for_bean),
                        })
                    })
                    .closeable()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry.init().unwrap();

        registry.close();
        registry.close();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(registry.is_closed());

        // "닫힘" 에러가 아니라 빈 맵에 대한 NoSuchBean
        let err = registry.get_by_name("a").unwrap_err();
        assert!(matches!(err, RegistryError::NoSuchBean { .. }));
        assert!(registry.all_beans().is_empty());
        // close 이후 설정은 쓰기를 거부한다
        assert!(registry.configuration().set("k", serde_json::json!(1)).is_err());
    }

    #[test]
    fn test_close_failure_does_not_abort_teardown() {
        struct FailingClose;
        impl Closeable for FailingClose {
            fn close(&self) -> Result<(), RegistryError> {
                Err(RegistryError::injection("resource", None))
            }
        }

        let registry = ServiceRegistry::new();
        registry
            .register(
                BeanDescriptorBuilder::<FailingClose>::new("failing")
                    .needs_init(true)
                    .supplier(|_| Ok(FailingClose))
                    .closeable()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry.init().unwrap();

        // 실패는 로깅만 되고 teardown은 완료된다
        registry.close();
        assert!(registry.is_closed());
        assert!(registry.all_beans().is_empty());
    }

    #[test]
    fn test_register_singleton_reachable_by_name_and_type_scan() {
        let registry = ServiceRegistry::new();
        registry
            .register_singleton("prebuilt", Arc::new(Repo { id: 55 }))
            .unwrap();

        // 이름 조회
        assert_eq!(registry.get_named::<Repo>("prebuilt").unwrap().id, 55);
        // 디스크립터가 없으므로 런타임 타입 스캔 폴백으로 도달한다
        assert_eq!(registry.get::<Repo>().unwrap().id, 55);
        // write-once: 같은 이름은 거부
        assert!(
            registry
                .register_singleton("prebuilt", Arc::new(Repo { id: 56 }))
                .is_err()
        );
    }

    #[test]
    fn test_named_lookup_type_mismatch_fails_whole_call() {
        let registry = ServiceRegistry::new();
        registry
            .register(
                BeanDescriptorBuilder::<Repo>::new("repo")
                    .supplier(|_| Ok(Repo { id: 1 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert!(registry.get_named::<Service>("repo").is_err());
        assert!(registry.get_named_or_null::<Service>("repo").is_none());
        assert!(registry.get_named::<Repo>("repo").is_ok());
    }

    #[test]
    fn test_type_of_and_all_beans_union_with_parent() {
        let parent = Arc::new(ServiceRegistry::new());
        parent
            .register(
                BeanDescriptorBuilder::<Repo>::new("parent_repo")
                    .supplier(|_| Ok(Repo { id: 1 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let child = ServiceRegistry::new().with_parent(parent as Arc<dyn BeanFactory>);
        child
            .register(
                BeanDescriptorBuilder::<Service>::new("child_service")
                    .supplier(|reg| {
                        Ok(Service {
                            repo: reg.get::<Repo>()?,
                        })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let beans = child.all_beans();
        assert!(beans.contains("parent_repo"));
        assert!(beans.contains("child_service"));

        assert_eq!(
            child.type_of("parent_repo").unwrap(),
            TypeKey::of::<Repo>()
        );
        assert_eq!(
            child.type_of("child_service").unwrap(),
            TypeKey::of::<Service>()
        );
        assert!(child.type_of("missing").is_none());
    }

    #[test]
    fn test_all_of_type_realizes_every_match() {
        let registry = ServiceRegistry::new();
        registry.register(greeter_b(1)).unwrap();
        registry.register(greeter_c(2)).unwrap();

        let greeters = registry.all_of_type::<Arc<dyn Greeter>>().unwrap();
        let mut labels: Vec<&'static str> = greeters.iter().map(|g| g.greet()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["b", "c"]);
    }

    // 설정 주입은 공급자 체인의 마지막 단계로, 컨버터를 레지스트리에서
    // 조회해 사용한다
    #[test]
    fn test_config_injection_through_supplier_chain() {
        use crate::config::inject::{ConfigInjectable, inject_value};
        use crate::utils::convert::ConverterManager;
        use serde_json::json;

        struct ServerSettings {
            port: AtomicUsize,
        }

        impl ConfigInjectable for ServerSettings {
            fn inject_config(
                &self,
                config: &dyn ConfigurationSource,
                converter: Option<&ConverterManager>,
            ) -> Result<(), RegistryError> {
                if let Some(port) = inject_value::<u64>(config, converter, "server.port")? {
                    self.port.store(port as usize, Ordering::SeqCst);
                }
                Ok(())
            }
        }

        let registry = ServiceRegistry::new();
        registry
            .configuration()
            .set("server.port", json!("8080"))
            .unwrap();

        // 문자열 "8080" → u64 변환은 컨버터가 담당한다
        registry
            .register(
                BeanDescriptorBuilder::<ConverterManager>::new("converter_manager")
                    .instance(ConverterManager::new())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                BeanDescriptorBuilder::<ServerSettings>::new("server_settings")
                    .supplier(|_| {
                        Ok(ServerSettings {
                            port: AtomicUsize::new(0),
                        })
                    })
                    .as_config()
                    .build()
                    .unwrap(),
            )
            .unwrap();

        let settings = registry.get::<ServerSettings>().unwrap();
        assert_eq!(settings.port.load(Ordering::SeqCst), 8080);
    }

    // 메타데이터 공급자 경로: register_type은 불투명한 조회로만 동작한다
    #[test]
    fn test_register_type_through_metadata_provider() {
        use crate::metadata::MetadataProvider;

        struct FixtureMetadata;

        impl MetadataProvider for FixtureMetadata {
            fn descriptor_for(&self, type_id: TypeId) -> Option<BeanDescriptor> {
                (type_id == TypeId::of::<Repo>()).then(|| {
                    BeanDescriptorBuilder::<Repo>::new("metadata_repo")
                        .supplier(|_| Ok(Repo { id: 42 }))
                        .build()
                        .unwrap()
                })
            }

            fn all_descriptors(&self) -> Vec<BeanDescriptor> {
                self.descriptor_for(TypeId::of::<Repo>())
                    .into_iter()
                    .collect()
            }
        }

        let registry = ServiceRegistry::new().with_metadata(Arc::new(FixtureMetadata));
        registry.register_type::<Repo>().unwrap();
        assert_eq!(registry.get::<Repo>().unwrap().id, 42);

        // 메타데이터가 없는 타입은 IllegalDescriptor
        let err = registry.register_type::<Service>().unwrap_err();
        assert!(matches!(err, RegistryError::IllegalDescriptor(_)));

        // 일괄 등록은 중복 이름으로 거부된다 (이미 등록했으므로)
        assert!(registry.register_collected().is_err());
    }

    #[test]
    fn test_merge_parent_and_merge_config() {
        use crate::config::source::{ConfigurationSource, MapConfiguration, MergedConfiguration};
        use serde_json::json;

        let registry = ServiceRegistry::new();
        registry
            .configuration()
            .set("base", json!("base-value"))
            .unwrap();

        // 오버레이를 얹는다
        registry.merge_config(|current| {
            let overrides = Arc::new(MapConfiguration::new());
            overrides.set("extra", json!("extra-value")).unwrap();
            Arc::new(MergedConfiguration::new(overrides, current))
        });

        assert_eq!(registry.configuration().get("base"), Some(json!("base-value")));
        assert_eq!(registry.configuration().get("extra"), Some(json!("extra-value")));

        // 부모 교체
        let parent = Arc::new(ServiceRegistry::new());
        parent
            .register(
                BeanDescriptorBuilder::<Repo>::new("merged_parent_repo")
                    .supplier(|_| Ok(Repo { id: 77 }))
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry.merge_parent(|old| {
            assert!(old.is_none());
            Some(parent as Arc<dyn BeanFactory>)
        });
        assert_eq!(registry.get::<Repo>().unwrap().id, 77);
    }
}
