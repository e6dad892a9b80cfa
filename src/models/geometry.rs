//! # 窗口几何数据模型
//!
//! 定义窗口尺寸与位置的持久化结构 `WindowGeometry`，
//! 对应磁盘上的 `window-state.json` 文件内容。
//!
//! 对应旧版（Electron 实现）的 TypeScript 类型：
//! ```typescript
//! type WindowState = {
//!   width: number;
//!   height: number;
//!   x?: number;
//!   y?: number;
//! };
//! ```

use serde::{Deserialize, Serialize};

/// 窗口几何（逻辑像素）
///
/// 宽高必须为正数；`x`/`y` 在窗口从未移动过（首次启动）时缺省。
/// 序列化时缺省坐标直接省略字段，与旧版的 `JSON.stringify` 输出保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowGeometry {
    /// 窗口内容区宽度（逻辑像素，> 0）
    pub width: u32,

    /// 窗口内容区高度（逻辑像素，> 0）
    pub height: u32,

    /// 窗口左上角横坐标：None 表示交给窗口系统决定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,

    /// 窗口左上角纵坐标：None 表示交给窗口系统决定
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl WindowGeometry {
    /// 固定回退几何：持久化记录缺失或损坏时使用（360×640，居中交给系统）
    pub const FALLBACK: WindowGeometry = WindowGeometry {
        width: 360,
        height: 640,
        x: None,
        y: None,
    };

    /// 宽高是否均为正数
    ///
    /// 最小化等瞬态状态下窗口可能上报 0 尺寸，这类快照不允许进入持久化。
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
