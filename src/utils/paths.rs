//! # 路径工具函数
//!
//! 解析本应用的安装级数据目录。窗口几何（`window-state.json`）与
//! 更新检查缓存（`update-check.json`）都存放在这里。

use std::path::PathBuf;

use tauri::{AppHandle, Manager};

/// 获取（并确保存在）应用数据目录的绝对路径
///
/// 使用 Tauri 的 `PathResolver` 解析平台约定的应用数据位置：
/// - Windows: `%APPDATA%\com.es-studio.chatgpt-lite`
/// - macOS: `~/Library/Application Support/com.es-studio.chatgpt-lite`
/// - Linux: `~/.local/share/com.es-studio.chatgpt-lite`
///
/// # 错误
/// 无法解析数据目录或目录创建失败时返回错误信息。
pub fn app_data_dir(app: &AppHandle) -> Result<PathBuf, String> {
    let dir = app
        .path()
        .app_data_dir()
        .map_err(|e| format!("无法获取应用数据目录: {}", e))?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| format!("创建应用数据目录失败: {}", e))?;
    }

    Ok(dir)
}
