//! # 导航策略执行器
//!
//! 嵌入页面的每一次导航或新窗口请求都在这里同步裁决。
//!
//! 决策矩阵：
//!
//! | URL 受信任 | 请求类型        | 结果 |
//! |-----------|----------------|------|
//! | 是        | OpenNewTarget  | `Redirect`：原地导航当前页面，拒绝开新窗口 |
//! | 是        | InPlaceNavigate| `Continue`：放行 |
//! | 否        | 任意（scheme 安全）| `OpenExternally`：移交系统浏览器，应用内拒绝 |
//! | 否        | 任意（scheme 不安全）| `Block`：静默拦截，不做任何后续动作 |
//!
//! 裁决本身是输入 URL 与静态信任集合的纯函数；副作用（取消默认行为、
//! 调起系统浏览器、改写当前页面）由 `window` 模块的接线层执行。
//! 被拦截的导航不向用户弹任何提示：页面内容保持不变即是全部反馈。

use crate::services::policy;

/// 导航请求的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    /// 当前页面内的跳转（地址变更、链接点击、重定向）
    InPlaceNavigate,
    /// 请求打开新窗口 / 新标签（`window.open`、`target="_blank"`）
    OpenNewTarget,
}

/// 对单次导航请求的路由决定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    /// 放行：在当前页面中正常继续
    Continue,
    /// 拒绝新窗口请求，改为在当前页面中加载该 URL
    Redirect(String),
    /// 应用内拒绝，移交系统默认浏览器打开
    OpenExternally(String),
    /// 静默拦截，不产生任何后续动作
    Block,
}

/// 对一次导航 / 新窗口请求做出路由决定
///
/// 同步执行，无 I/O；调用方必须在嵌入层的事件回调返回之前
/// 按照返回值完成对默认行为的放行或取消。
///
/// # 参数
/// - `kind` - 请求类型（页面内跳转 / 新窗口）
/// - `url` - 目标 URL 原文
pub fn decide(kind: AttemptKind, url: &str) -> NavigationDecision {
    if policy::is_trusted_url(url) {
        return match kind {
            // 受信任的新窗口请求（如登录弹窗）收敛为当前页面的原地导航，
            // 避免可信窗口无限增殖，同时保住登录等内联流程
            AttemptKind::OpenNewTarget => NavigationDecision::Redirect(url.to_string()),
            AttemptKind::InPlaceNavigate => NavigationDecision::Continue,
        };
    }

    if policy::is_safe_external_url(url) {
        NavigationDecision::OpenExternally(url.to_string())
    } else {
        NavigationDecision::Block
    }
}
