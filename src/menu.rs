//! # 应用菜单
//!
//! 构建 macOS 的原生应用菜单。菜单只在以 Command 为主修饰键的
//! 平台上安装（`lib.rs` 中门控），其余平台没有应用菜单，
//! 窗口行为交由系统默认处理。
//!
//! 菜单同时承担两个职责：
//! 1. **快捷键落点**：File / View 子菜单的加速键以原生
//!    key equivalent 的形式生效，webview 持有焦点时同样响应
//! 2. **更新提醒**："Check for Updates…" 项在检测到新版本后改写
//!    标题展示版本号，点击时打开发布页
//!
//! 菜单事件统一映射为 `ShortcutAction`，交给 `window::execute_action`。

use tauri::menu::{
    Menu, MenuBuilder, MenuEvent, MenuItem, MenuItemBuilder, MenuItemKind, SubmenuBuilder,
};
use tauri::{AppHandle, Wry};
use tauri_plugin_opener::OpenerExt;

use crate::models::update::UpdateInfo;
use crate::services::shortcuts::ShortcutAction;
use crate::services::update::UpdateChecker;
use crate::utils::paths;
use crate::window;

// ======== 菜单项 ID ========

const MENU_ID_NEW_WINDOW: &str = "new-window";
const MENU_ID_NEW_CHAT: &str = "new-chat";
const MENU_ID_ZOOM_IN: &str = "zoom-in";
const MENU_ID_ZOOM_OUT: &str = "zoom-out";
const MENU_ID_TOGGLE_SIDEBAR: &str = "toggle-sidebar";
const MENU_ID_TOGGLE_DEVTOOLS: &str = "toggle-devtools";
const MENU_ID_CHECK_UPDATES: &str = "check-updates";

/// 构建并安装应用菜单
///
/// # 错误
/// 菜单项创建或安装失败时返回 Tauri 错误。
pub fn install(app: &AppHandle) -> tauri::Result<()> {
    let check_updates =
        MenuItemBuilder::with_id(MENU_ID_CHECK_UPDATES, "Check for Updates…").build(app)?;

    let app_menu = SubmenuBuilder::new(app, "ChatGPT-Lite")
        .about(None)
        .separator()
        .item(&check_updates)
        .separator()
        .services()
        .separator()
        .hide()
        .hide_others()
        .show_all()
        .separator()
        .quit()
        .build()?;

    let edit_menu = SubmenuBuilder::new(app, "Edit")
        .undo()
        .redo()
        .separator()
        .cut()
        .copy()
        .paste()
        .separator()
        .select_all()
        .build()?;

    let new_window = MenuItemBuilder::with_id(MENU_ID_NEW_WINDOW, "New Window")
        .accelerator("CmdOrCtrl+N")
        .build(app)?;
    let new_chat = MenuItemBuilder::with_id(MENU_ID_NEW_CHAT, "New Chat")
        .accelerator("CmdOrCtrl+Shift+N")
        .build(app)?;
    let file_menu = SubmenuBuilder::new(app, "File")
        .item(&new_window)
        .item(&new_chat)
        .separator()
        .close_window()
        .build()?;

    let zoom_in = MenuItemBuilder::with_id(MENU_ID_ZOOM_IN, "Zoom In")
        .accelerator("CmdOrCtrl+=")
        .build(app)?;
    let zoom_out = MenuItemBuilder::with_id(MENU_ID_ZOOM_OUT, "Zoom Out")
        .accelerator("CmdOrCtrl+-")
        .build(app)?;
    let toggle_sidebar =
        MenuItemBuilder::with_id(MENU_ID_TOGGLE_SIDEBAR, "Toggle Sidebar").build(app)?;

    let mut view_builder = SubmenuBuilder::new(app, "View")
        .item(&zoom_in)
        .item(&zoom_out)
        .separator()
        .item(&toggle_sidebar);

    // 开发者工具仅在调试构建的菜单中出现
    if cfg!(debug_assertions) {
        let toggle_devtools = MenuItemBuilder::with_id(MENU_ID_TOGGLE_DEVTOOLS, "Toggle Developer Tools")
            .accelerator("Alt+CmdOrCtrl+L")
            .build(app)?;
        view_builder = view_builder.separator().item(&toggle_devtools);
    }
    let view_menu = view_builder.build()?;

    let menu = MenuBuilder::new(app)
        .item(&app_menu)
        .item(&edit_menu)
        .item(&file_menu)
        .item(&view_menu)
        .build()?;

    let _ = app.set_menu(menu)?;
    Ok(())
}

/// 菜单事件分发：菜单项 ID → 应用动作
pub fn handle_menu_event(app: &AppHandle, event: MenuEvent) {
    let action = match event.id().as_ref() {
        MENU_ID_NEW_WINDOW => Some(ShortcutAction::NewWindow),
        MENU_ID_NEW_CHAT => Some(ShortcutAction::NewChat),
        MENU_ID_ZOOM_IN => Some(ShortcutAction::ZoomIn),
        MENU_ID_ZOOM_OUT => Some(ShortcutAction::ZoomOut),
        MENU_ID_TOGGLE_SIDEBAR => Some(ShortcutAction::ToggleSidebar),
        MENU_ID_TOGGLE_DEVTOOLS => Some(ShortcutAction::ToggleDevTools),
        MENU_ID_CHECK_UPDATES => {
            trigger_manual_check(app);
            None
        }
        _ => None,
    };

    if let Some(action) = action {
        window::execute_action(app, action);
    }
}

/// 在菜单上展示"有新版本可用"
///
/// 菜单操作必须发生在主线程，后台检查任务经 `run_on_main_thread`
/// 切换后改写菜单项标题。非 macOS 平台没有菜单，直接返回。
pub fn show_update_available(app: &AppHandle, info: &UpdateInfo) {
    let handle = app.clone();
    let info = info.clone();

    let result = app.run_on_main_thread(move || {
        let Some(menu) = handle.menu() else {
            return;
        };
        let Some(item) = find_menu_item(&menu, MENU_ID_CHECK_UPDATES) else {
            return;
        };

        let title = format!("Update Available: v{}", info.latest_version);
        if let Err(e) = item.set_text(title) {
            log::warn!("更新菜单项标题失败: {}", e);
        }
    });

    if let Err(e) = result {
        log::warn!("切换到主线程更新菜单失败: {}", e);
    }
}

/// 手动触发一次更新检查（点击 "Check for Updates…"）
///
/// 后台执行；发现新版本时更新菜单标题并直接打开发布页，
/// 没有更新或检查失败时静默（仅日志）。
fn trigger_manual_check(app: &AppHandle) {
    let app = app.clone();

    tauri::async_runtime::spawn(async move {
        let data_dir = match paths::app_data_dir(&app) {
            Ok(dir) => dir,
            Err(e) => {
                log::warn!("更新检查无法解析数据目录: {}", e);
                return;
            }
        };

        let checker = UpdateChecker::new(&data_dir);
        let current = app.package_info().version.to_string();
        let info = checker.check(&current).await;

        if info.has_update {
            log::info!("发现新版本: v{}", info.latest_version);
            show_update_available(&app, &info);
            if let Err(e) = app.opener().open_url(info.release_url.as_str(), None::<&str>) {
                log::warn!("打开发布页失败: {}", e);
            }
        } else {
            log::info!("当前已是最新版本: v{}", current);
        }
    });
}

/// 在菜单树中按 ID 查找普通菜单项（顶层与一级子菜单）
fn find_menu_item(menu: &Menu<Wry>, id: &str) -> Option<MenuItem<Wry>> {
    for kind in menu.items().ok()? {
        match kind {
            MenuItemKind::MenuItem(item) => {
                if item.id().as_ref() == id {
                    return Some(item);
                }
            }
            MenuItemKind::Submenu(submenu) => {
                for kind in submenu.items().ok()? {
                    if let MenuItemKind::MenuItem(item) = kind {
                        if item.id().as_ref() == id {
                            return Some(item);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}
