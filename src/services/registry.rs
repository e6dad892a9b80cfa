//! # 窗口注册表服务
//!
//! 以窗口 label 为键管理每个外壳窗口的会话期状态：
//! 几何存储实例与页面缩放倍率。不设全局可变的"当前主窗口"引用，
//! 多窗口与测试不共享任何隐藏状态。
//!
//! 生命周期约定：窗口创建时 `register`，销毁事件到达时 `unregister`，
//! 注册表里不会残留已销毁窗口的条目。
//!
//! ## 线程安全
//! 内部使用 `std::sync::RwLock` 包装，窗口事件与菜单事件可能来自
//! 不同线程；读多写少，RwLock 允许并发读取。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crate::services::window_state::WindowStateStore;

/// 缩放倍率的单步增量
const ZOOM_STEP: f64 = 0.1;

/// 缩放倍率下限
const ZOOM_MIN: f64 = 0.3;

/// 缩放倍率上限
const ZOOM_MAX: f64 = 3.0;

/// 单个窗口的会话期状态
struct WindowEntry {
    /// 该窗口的几何存储（共享给事件处理闭包）
    store: Arc<WindowStateStore>,

    /// 当前页面缩放倍率（1.0 为原始大小）
    zoom: f64,
}

/// 窗口注册表
///
/// 通过 Tauri 的 `manage()` 注册为应用状态，
/// 事件处理与菜单分发通过 `State<WindowRegistry>` 访问。
pub struct WindowRegistry {
    /// label → 窗口状态映射
    windows: RwLock<HashMap<String, WindowEntry>>,

    /// 已分配的窗口序号（label 唯一性来源）
    counter: AtomicU32,

    /// 应用数据目录：每个窗口的几何存储都指向这里的同一个状态文件
    data_dir: PathBuf,
}

impl WindowRegistry {
    /// 创建空注册表
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            counter: AtomicU32::new(0),
            data_dir,
        }
    }

    /// 分配下一个窗口 label（"main"、"main-1"、"main-2"…）
    pub fn next_label(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            "main".to_string()
        } else {
            format!("main-{}", n)
        }
    }

    /// 注册一个新窗口，返回其几何存储实例
    pub fn register(&self, label: &str) -> Arc<WindowStateStore> {
        let store = Arc::new(WindowStateStore::new(&self.data_dir));
        if let Ok(mut windows) = self.windows.write() {
            windows.insert(
                label.to_string(),
                WindowEntry {
                    store: Arc::clone(&store),
                    zoom: 1.0,
                },
            );
        }
        store
    }

    /// 注销窗口，丢弃其会话期状态
    pub fn unregister(&self, label: &str) {
        if let Ok(mut windows) = self.windows.write() {
            windows.remove(label);
        }
    }

    /// 查询窗口的几何存储（未注册时返回 None）
    pub fn store_for(&self, label: &str) -> Option<Arc<WindowStateStore>> {
        let windows = self.windows.read().ok()?;
        windows.get(label).map(|entry| Arc::clone(&entry.store))
    }

    /// 调整窗口的缩放倍率，返回调整后的值
    ///
    /// 结果被夹在 [0.3, 3.0] 区间内；未注册的 label 返回 None。
    pub fn zoom_step(&self, label: &str, delta_steps: i32) -> Option<f64> {
        let mut windows = self.windows.write().ok()?;
        let entry = windows.get_mut(label)?;
        entry.zoom = (entry.zoom + f64::from(delta_steps) * ZOOM_STEP).clamp(ZOOM_MIN, ZOOM_MAX);
        Some(entry.zoom)
    }
}
