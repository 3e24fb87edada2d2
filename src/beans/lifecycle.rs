//! # Lifecycle Pass
//!
//! 초기화 파이프라인의 예약된 지점(pre-init / post-init)에서 정확히 한 번
//! 실행되는 일회성 능력을 정의합니다. Spring의 `BeanFactoryPostProcessor` /
//! `SmartInitializingSingleton`에 대응하는 역할입니다.
//!
//! 같은 단계의 패스는 우선순위 오름차순으로 실행되고, 우선순위가 같으면
//! 등록 순서(FIFO)를 유지합니다. 빈 해석과 달리 동률은 에러가 아닙니다.
//! 레지스트리가 이미 초기화된 뒤에 등록된 패스는 큐잉 없이 즉시 동기
//! 실행됩니다. 패스는 절대 조용히 버려지지 않습니다.

use crate::core::errors::RegistryError;
use crate::core::registry::ServiceRegistry;

/// 패스 우선순위의 기본값. 가장 먼저 실행되도록 최솟값을 사용합니다.
pub const DEFAULT_PASS_PRIORITY: i32 = i32::MIN;

/// 초기화 파이프라인에서 한 번 실행되는 능력
///
/// 패스 안에서 수행하는 조회는 다른 호출자와 동일한 해석 알고리즘을
/// 따릅니다. 패스가 레지스트리에 빈이나 패스를 추가로 등록하는 것도
/// 허용됩니다 (드레인 중이면 같은 큐에 합류합니다).
pub trait LifecyclePass: Send + Sync {
    /// 패스를 실행합니다.
    fn run(&self, registry: &ServiceRegistry) -> Result<(), RegistryError>;

    /// 같은 단계 안에서의 실행 순서. 낮을수록 먼저.
    fn priority(&self) -> i32 {
        DEFAULT_PASS_PRIORITY
    }
}

/// 클로저를 [`LifecyclePass`]로 감싸는 어댑터
///
/// ```rust,ignore
/// registry.register_pass(
///     Arc::new(FnPass::with_priority(2, |reg| {
///         log::info!("beans: {:?}", reg.all_beans());
///         Ok(())
///     })),
///     true,
///     false,
/// )?;
/// ```
pub struct FnPass<F> {
    f: F,
    priority: i32,
}

impl<F> FnPass<F>
where
    F: Fn(&ServiceRegistry) -> Result<(), RegistryError> + Send + Sync,
{
    /// 기본 우선순위의 패스를 만듭니다.
    pub fn new(f: F) -> Self {
        FnPass {
            f,
            priority: DEFAULT_PASS_PRIORITY,
        }
    }

    /// 지정한 우선순위의 패스를 만듭니다.
    pub fn with_priority(priority: i32, f: F) -> Self {
        FnPass { f, priority }
    }
}

impl<F> LifecyclePass for FnPass<F>
where
    F: Fn(&ServiceRegistry) -> Result<(), RegistryError> + Send + Sync,
{
    fn run(&self, registry: &ServiceRegistry) -> Result<(), RegistryError> {
        (self.f)(registry)
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}
