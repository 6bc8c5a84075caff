//! 定时触发

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use super::commands::RunDetectorCommand;
use super::handler::ServiceHandler;

/// 按固定间隔运行检测，`interval` 为零时只运行一次
pub struct DetectorScheduler {
    handler: Arc<ServiceHandler>,
    interval: Duration,
}

impl DetectorScheduler {
    pub fn new(handler: Arc<ServiceHandler>, interval: Duration) -> Self {
        Self { handler, interval }
    }

    /// 在 `tracker` 上启动后台任务，处理器的取消 token 被取消后退出
    ///
    /// 取消时正在进行的运行会完成已开始的组合，等待 `tracker` 即可确保告警写入记录。
    pub fn start(self, tracker: &TaskTracker) -> JoinHandle<()> {
        tracker.spawn(async move {
            let token = self.handler.cancel_token().clone();

            if self.interval.is_zero() {
                info!("Running detector once");
                self.handler.run_detector(RunDetectorCommand::default()).await;
                return;
            }

            info!(interval_secs = self.interval.as_secs(), "Detector scheduler started");
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Detector scheduler stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.handler.run_detector(RunDetectorCommand::default()).await;
                    }
                }
            }
        })
    }
}
