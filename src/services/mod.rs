//! # 核心业务逻辑服务模块
//!
//! 包含导航安全与会话生命周期的全部决策逻辑，与 Tauri 接线层解耦：
//! - `policy` - URL 信任策略（域集合匹配 + 外部打开 scheme 白名单）
//! - `navigation` - 导航策略执行器：每次导航/开窗请求的路由裁决
//! - `shortcuts` - 快捷键分发表：按键描述 → 应用动作（平台门控）
//! - `registry` - 窗口注册表：label → 几何存储与缩放状态
//! - `window_state` - 窗口几何持久化（防抖写入 + 关闭时同步落盘）
//! - `update` - 时间门控的更新检查（GitHub Releases + 本地缓存）

pub mod navigation;
pub mod policy;
pub mod registry;
pub mod shortcuts;
pub mod update;
pub mod window_state;
