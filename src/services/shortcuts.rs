//! # 快捷键分发表
//!
//! 将原始按键描述（键名 + 修饰键组合）映射为固定的应用动作集合。
//!
//! 仅在以 Command 为主修饰键的平台（macOS）上生效：其余平台的
//! 加速键由原生菜单系统处理，这张表返回 `None` 即可。
//!
//! 分发器只产出动作描述，绝不直接操作窗口或几何状态；
//! 动作的执行（建窗口、关窗口、调缩放）是调用方的职责。

/// 应用动作：快捷键与菜单项共用的目标集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// 打开一个新的外壳窗口
    NewWindow,
    /// 在当前窗口中开始新会话
    NewChat,
    /// 关闭当前窗口
    CloseWindow,
    /// 放大页面
    ZoomIn,
    /// 缩小页面
    ZoomOut,
    /// 开关开发者工具（仅调试构建）
    ToggleDevTools,
    /// 开关侧边栏（仅菜单可达，无键位映射）
    ToggleSidebar,
}

/// 原始按键描述：键名与四个修饰键的瞬时状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardInput {
    /// 键名（如 "n"、"w"、"-"、"="），匹配前统一转小写
    pub key: String,
    /// 主修饰键（macOS 的 Command）
    pub meta: bool,
    /// 次修饰键（Control）
    pub control: bool,
    pub alt: bool,
    pub shift: bool,
}

/// 运行平台标识
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// 当前编译目标对应的平台
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }
}

/// 将一次按键映射为应用动作
///
/// 匹配按以下优先级进行，首个命中即返回：
/// 1. `meta + alt + L` → 开关开发者工具
/// 2. `meta`（无 control / alt）+ `-`/`_` → 缩小；`=`/`+` → 放大
/// 3. 仅 `meta`（无 control / alt）时：`w` → 关窗口；
///    `n + shift` → 新会话；`n` → 新窗口
///
/// 未命中任何组合、或平台不以 Command 为主修饰键时返回 `None`。
pub fn dispatch(input: &KeyboardInput, platform: Platform) -> Option<ShortcutAction> {
    if platform != Platform::MacOs {
        return None;
    }

    let key = input.key.to_lowercase();

    if input.meta && input.alt && key == "l" {
        return Some(ShortcutAction::ToggleDevTools);
    }

    if input.meta && !input.control && !input.alt {
        if key == "-" || key == "_" {
            return Some(ShortcutAction::ZoomOut);
        }
        if key == "=" || key == "+" {
            return Some(ShortcutAction::ZoomIn);
        }
    }

    if !input.meta || input.control || input.alt {
        return None;
    }

    if key == "w" {
        return Some(ShortcutAction::CloseWindow);
    }

    if key == "n" && input.shift {
        return Some(ShortcutAction::NewChat);
    }

    if key == "n" && !input.shift {
        return Some(ShortcutAction::NewWindow);
    }

    None
}
