//! # 窗口几何持久化服务
//!
//! 跨次启动恢复窗口的尺寸与位置。磁盘格式与旧版（Electron 实现）
//! 保持逐字段兼容，升级后可直接复用既有的状态文件。
//!
//! ## 防抖状态机
//! 连续的 resize / move 事件经一个显式状态机合并：
//! `Idle ⇄ Pending { deadline, geometry }`，每次 `schedule` 以"最新几何 +
//! 250ms 后的新 deadline"覆盖旧的待写任务（last-write-wins），
//! 到期后一次性落盘。状态机以注入的时间点驱动，不依赖真实定时器，
//! 可用逻辑时钟独立测试；真实的定时等待由一个异步驱动任务完成。
//!
//! ## 崩溃安全
//! - `load` 的所有失败路径（文件缺失、JSON 损坏、宽高非正数）一律
//!   退回固定的回退几何，绝不向上抛错
//! - `flush` 在窗口关闭时同步写盘：先取消待写任务再落盘，
//!   防抖定时器不可能与关闭写入竞争或覆盖其结果

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::geometry::WindowGeometry;

/// 持久化文件名（位于应用数据目录下）
const WINDOW_STATE_FILE: &str = "window-state.json";

/// 防抖静默窗口：一串连续事件结束后多久才真正写盘
const SAVE_DEBOUNCE: Duration = Duration::from_millis(250);

/// 防抖状态机：每个窗口同一时刻至多一个待写任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebounceState {
    /// 无待写任务
    Idle,
    /// 有一个待写任务：到 `deadline` 时写入 `geometry`
    Pending {
        deadline: Instant,
        geometry: WindowGeometry,
    },
}

impl DebounceState {
    pub fn new() -> Self {
        DebounceState::Idle
    }

    /// 安排（或重新安排）一次防抖写入
    ///
    /// 无条件用最新几何与 `now + 250ms` 的新 deadline 覆盖当前状态。
    ///
    /// # 返回值
    /// 此前是否处于 `Idle`：是则说明没有驱动任务在等待，调用方需要新起一个
    pub fn schedule(&mut self, geometry: WindowGeometry, now: Instant) -> bool {
        let was_idle = matches!(self, DebounceState::Idle);
        *self = DebounceState::Pending {
            deadline: now + SAVE_DEBOUNCE,
            geometry,
        };
        was_idle
    }

    /// 当前待写任务的 deadline（Idle 时为 None）
    pub fn deadline(&self) -> Option<Instant> {
        match self {
            DebounceState::Idle => None,
            DebounceState::Pending { deadline, .. } => Some(*deadline),
        }
    }

    /// 若待写任务已到期则取出其几何并转入 `Idle`
    ///
    /// 未到期（deadline 被后续 `schedule` 推后）或无任务时返回 None。
    pub fn due(&mut self, now: Instant) -> Option<WindowGeometry> {
        match self {
            DebounceState::Pending { deadline, geometry } if now >= *deadline => {
                let geometry = *geometry;
                *self = DebounceState::Idle;
                Some(geometry)
            }
            _ => None,
        }
    }

    /// 取消待写任务，返回其中尚未落盘的几何（若有）
    pub fn cancel(&mut self) -> Option<WindowGeometry> {
        match std::mem::replace(self, DebounceState::Idle) {
            DebounceState::Idle => None,
            DebounceState::Pending { geometry, .. } => Some(geometry),
        }
    }
}

impl Default for DebounceState {
    fn default() -> Self {
        Self::new()
    }
}

/// 窗口几何存储：加载、防抖保存、关闭时同步落盘
///
/// 每个窗口持有一个实例；多个实例写同一个持久化文件
/// （固定的单安装路径），最后关闭的窗口胜出。
pub struct WindowStateStore {
    /// 持久化文件的绝对路径
    state_path: PathBuf,

    /// 防抖状态机，驱动任务与事件线程共享
    debounce: Arc<Mutex<DebounceState>>,
}

impl WindowStateStore {
    /// 创建指向 `<data_dir>/window-state.json` 的存储实例
    pub fn new(data_dir: &Path) -> Self {
        Self {
            state_path: data_dir.join(WINDOW_STATE_FILE),
            debounce: Arc::new(Mutex::new(DebounceState::new())),
        }
    }

    /// 加载持久化的窗口几何
    ///
    /// 文件缺失、JSON 解析失败或宽高非正数时返回回退几何（360×640）。
    /// 永不返回错误。
    pub fn load(&self) -> WindowGeometry {
        if !self.state_path.exists() {
            return WindowGeometry::FALLBACK;
        }

        let content = match std::fs::read_to_string(&self.state_path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("读取窗口状态文件失败，使用回退几何: {}", e);
                return WindowGeometry::FALLBACK;
            }
        };

        match serde_json::from_str::<WindowGeometry>(&content) {
            Ok(geometry) if geometry.is_valid() => geometry,
            Ok(_) => {
                log::warn!("窗口状态文件中的宽高非正数，使用回退几何");
                WindowGeometry::FALLBACK
            }
            Err(e) => {
                log::warn!("解析窗口状态文件失败，使用回退几何: {}", e);
                WindowGeometry::FALLBACK
            }
        }
    }

    /// 安排一次防抖写入
    ///
    /// 连续调用会合并为静默期后的一次磁盘写入，最新几何胜出。
    /// 非法几何（最小化时上报的 0 尺寸快照）直接丢弃，不进入状态机。
    pub fn schedule_save(&self, geometry: WindowGeometry) {
        if !geometry.is_valid() {
            return;
        }

        let Ok(mut state) = self.debounce.lock() else {
            return;
        };
        let was_idle = state.schedule(geometry, Instant::now());
        drop(state);

        if was_idle {
            self.spawn_driver();
        }
    }

    /// 取消待写任务并同步写入给定几何
    ///
    /// 在窗口关闭路径上恰好调用一次；同步写盘保证最终几何不会
    /// 因防抖窗口未到期而丢失。先取消再写入，到期的驱动任务
    /// 不可能覆盖这次写入。
    pub fn flush(&self, geometry: WindowGeometry) {
        if let Ok(mut state) = self.debounce.lock() {
            state.cancel();
        }

        if geometry.is_valid() {
            self.write_sync(&geometry);
        }
    }

    /// 仅把未落盘的待写几何同步写出（若有）
    ///
    /// 窗口销毁事件晚于关闭事件到达、且此时已无法再查询窗口几何，
    /// 此方法兜底写出状态机中残留的最后快照。
    pub fn flush_pending(&self) {
        let pending = match self.debounce.lock() {
            Ok(mut state) => state.cancel(),
            Err(_) => None,
        };

        if let Some(geometry) = pending {
            self.write_sync(&geometry);
        }
    }

    /// 启动防抖驱动任务：等到 deadline 后落盘并退出
    ///
    /// deadline 被后续 `schedule` 推后时继续等待新的 deadline；
    /// 状态机被 `cancel` 清空时直接退出，不写盘。
    fn spawn_driver(&self) {
        let debounce = Arc::clone(&self.debounce);
        let state_path = self.state_path.clone();

        tauri::async_runtime::spawn(async move {
            loop {
                let deadline = {
                    let Ok(state) = debounce.lock() else { return };
                    match state.deadline() {
                        Some(deadline) => deadline,
                        None => return,
                    }
                };

                tokio::time::sleep_until(deadline).await;

                let due = {
                    let Ok(mut state) = debounce.lock() else { return };
                    state.due(Instant::now())
                };

                if let Some(geometry) = due {
                    if let Some(content) = encode_geometry(&geometry) {
                        if let Err(e) = tokio::fs::write(&state_path, content).await {
                            log::warn!("写入窗口状态文件失败: {}", e);
                        }
                    }
                    return;
                }
            }
        });
    }

    /// 同步写盘（flush 路径专用）
    fn write_sync(&self, geometry: &WindowGeometry) {
        if let Some(content) = encode_geometry(geometry) {
            if let Err(e) = std::fs::write(&self.state_path, content) {
                log::warn!("关闭时写入窗口状态文件失败: {}", e);
            }
        }
    }
}

/// 序列化几何为 JSON；失败时记录日志并返回 None
fn encode_geometry(geometry: &WindowGeometry) -> Option<String> {
    match serde_json::to_string(geometry) {
        Ok(content) => Some(content),
        Err(e) => {
            log::warn!("序列化窗口几何失败: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32) -> WindowGeometry {
        WindowGeometry {
            width,
            height,
            x: Some(10),
            y: Some(20),
        }
    }

    // ======== 防抖状态机（逻辑时钟） ========

    #[test]
    fn test_rapid_schedules_coalesce_into_single_write() {
        let mut state = DebounceState::new();
        let t0 = Instant::now();

        // 连续十次 schedule，全部落在防抖窗口内
        for i in 0..10u32 {
            let now = t0 + Duration::from_millis(u64::from(i) * 10);
            state.schedule(geometry(300 + i, 600), now);
            // 中途任何时刻都不到期
            assert_eq!(state.due(now), None);
        }

        // 最后一次 schedule 的 deadline 到期后，恰好取出一次、且是最后的几何
        let last_deadline = state.deadline().expect("pending write must exist");
        assert_eq!(state.due(last_deadline), Some(geometry(309, 600)));
        // 再次查询不产生第二次写入
        assert_eq!(state.due(last_deadline + Duration::from_secs(1)), None);
        assert_eq!(state.deadline(), None);
    }

    #[test]
    fn test_schedule_reports_idle_transition() {
        let mut state = DebounceState::new();
        let t0 = Instant::now();

        // 首次 schedule 需要启动驱动任务，后续覆盖不需要
        assert!(state.schedule(geometry(400, 700), t0));
        assert!(!state.schedule(geometry(410, 700), t0 + Duration::from_millis(50)));
    }

    #[test]
    fn test_cancel_takes_pending_geometry() {
        let mut state = DebounceState::new();
        let t0 = Instant::now();

        state.schedule(geometry(500, 800), t0);
        assert_eq!(state.cancel(), Some(geometry(500, 800)));
        // 取消后到期也不再产生写入
        assert_eq!(state.due(t0 + Duration::from_secs(1)), None);
        assert_eq!(state.cancel(), None);
    }

    // ======== 加载回退路径 ========

    #[test]
    fn test_load_missing_file_returns_fallback() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = WindowStateStore::new(dir.path());
        assert_eq!(store.load(), WindowGeometry::FALLBACK);
    }

    #[test]
    fn test_load_corrupted_file_returns_fallback() {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::write(dir.path().join(WINDOW_STATE_FILE), "{not json!").expect("write fixture");

        let store = WindowStateStore::new(dir.path());
        assert_eq!(store.load(), WindowGeometry::FALLBACK);
    }

    #[test]
    fn test_load_rejects_non_positive_dimensions() {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::write(
            dir.path().join(WINDOW_STATE_FILE),
            r#"{"width":0,"height":640}"#,
        )
        .expect("write fixture");

        let store = WindowStateStore::new(dir.path());
        assert_eq!(store.load(), WindowGeometry::FALLBACK);

        // 负数宽度无法反序列化为 u32，同样走回退路径
        std::fs::write(
            dir.path().join(WINDOW_STATE_FILE),
            r#"{"width":-5,"height":640}"#,
        )
        .expect("write fixture");
        assert_eq!(store.load(), WindowGeometry::FALLBACK);
    }

    #[test]
    fn test_flush_then_load_round_trip() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = WindowStateStore::new(dir.path());

        store.flush(geometry(420, 760));
        assert_eq!(store.load(), geometry(420, 760));
    }

    // ======== 异步驱动与 flush 的协作 ========

    #[tokio::test]
    async fn test_debounced_save_writes_last_geometry() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = WindowStateStore::new(dir.path());

        store.schedule_save(geometry(400, 700));
        store.schedule_save(geometry(480, 720));

        // 静默期过后驱动任务应已落盘最后一次的几何
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.load(), geometry(480, 720));
    }

    #[tokio::test]
    async fn test_flush_cancels_pending_timer() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = WindowStateStore::new(dir.path());

        store.schedule_save(geometry(400, 700));
        store.flush(geometry(360, 640));

        // 防抖窗口过去之后，文件内容仍是 flush 写入的几何，
        // 说明待写任务确实被取消、没有发生覆盖
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.load(), geometry(360, 640));
    }
}
