//! Graceful Shutdown

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Shutdown 控制器
///
/// 后台任务（定时检测等）持有子 token，HTTP 服务退出时统一取消；
/// 通过 [`tracker`](Self::tracker) 登记的任务会在进程退出前被等待完成。
#[derive(Clone, Default)]
pub struct ShutdownController {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 触发关闭
    pub fn shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Triggering shutdown");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// 派生一个随关闭而取消的子 token
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// 需要在退出前完成的后台任务都从这里 spawn
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(task)
    }

    /// 等待关闭
    pub fn wait(&self) -> impl Future<Output = ()> + Send + 'static {
        let token = self.token.clone();
        async move { token.cancelled().await }
    }

    /// 不再接受新任务，等待已登记的任务结束；超时返回 false
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        if self.tracker.is_empty() {
            return true;
        }

        info!(tasks = self.tracker.len(), "Waiting for background tasks");
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    tasks = self.tracker.len(),
                    timeout_secs = timeout.as_secs(),
                    "Background tasks still running at shutdown"
                );
                false
            }
        }
    }
}
