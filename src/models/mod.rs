//! # 数据模型模块
//!
//! 定义需要落盘或跨层传递的 Rust 数据结构。
//! 所有结构体均派生 `Serialize`/`Deserialize`，字段名使用 camelCase，
//! 与旧版（Electron 实现）写入磁盘的 JSON 格式逐字段兼容，升级后可直接复用既有状态文件。
//! - `geometry` - 窗口几何（`window-state.json`）
//! - `update` - 更新检查缓存与结果（`update-check.json`）

pub mod geometry;
pub mod update;
