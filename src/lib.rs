//! # ChatGPT-Lite - Tauri 应用核心初始化模块
//!
//! 本模块负责 Tauri 应用的完整初始化流程，包括：
//! - 注册 Tauri 官方插件（外部链接打开、日志）
//! - 初始化应用全局状态（窗口注册表）
//! - 安装应用菜单（仅 macOS）并创建首个外壳窗口
//! - 启动后台更新检查任务
//! - 处理应用级运行事件（macOS 常驻与 Dock 重新激活）
//!
//! ## 架构说明
//! 通过将核心逻辑放在 `lib.rs` 而非 `main.rs` 中，
//! Tauri 可以在桌面端（`main.rs`）和移动端入口之间共享此初始化代码。
//!
//! ## 模块结构
//! - `menu` - macOS 应用菜单与菜单事件分发
//! - `window` - 外壳窗口创建、导航策略接线、动作执行
//! - `models/` - 持久化数据模型（窗口几何、更新缓存）
//! - `services/` - 核心决策逻辑（信任策略、导航裁决、快捷键表、
//!   几何持久化、更新检查、窗口注册表）
//! - `utils/` - 通用工具函数

mod menu;
pub mod models;
pub mod services;
mod utils;
mod window;

use std::time::Duration;

use tauri::Manager;

use services::registry::WindowRegistry;
use services::update::UpdateChecker;
use utils::paths;

/// 后台更新任务的轮询节拍
///
/// 每小时醒来一次做廉价预检；真正的远程查询仍由 24 小时间隔门控。
const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

// `#[cfg_attr(mobile, tauri::mobile_entry_point)]`：条件编译属性
// 当目标平台为移动端时将 `run()` 标记为移动端入口点；
// 桌面端编译时此属性不生效，`run()` 由 `main.rs` 直接调用。
#[cfg_attr(mobile, tauri::mobile_entry_point)]
/// Tauri 应用启动函数
///
/// 构建并运行 Tauri 应用实例。该函数完成以下工作：
/// 1. 注册所需的 Tauri 插件（外部链接打开）
/// 2. 在 `setup` 钩子中按需注册调试专用插件（日志）
/// 3. 初始化窗口注册表并注册为 managed state
/// 4. 安装应用菜单（仅 macOS）、创建首个外壳窗口
/// 5. 启动后台更新检查任务
/// 6. 进入主事件循环并处理应用级运行事件
///
/// # Panics
/// 如果 Tauri 应用构建失败（例如配置文件缺失或窗口创建失败），
/// 将通过 `.expect()` 触发 panic 并输出错误信息。
pub fn run() {
    tauri::Builder::default()
        // === 官方插件注册 ===
        // Opener 插件：不受信任的导航经安全校验后交给系统默认浏览器
        .plugin(tauri_plugin_opener::init())
        // `setup` 闭包：在事件循环启动之前执行的初始化钩子
        .setup(|app| {
            // 仅在开发调试模式下启用日志插件
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            // === 应用全局状态初始化 ===
            // 窗口注册表取代全局可变的"当前主窗口"引用：
            // 每个外壳窗口的几何存储与缩放状态都以 label 为键登记，
            // 事件处理与菜单分发通过 `State<WindowRegistry>` 访问
            let data_dir = paths::app_data_dir(app.handle())?;
            app.manage(WindowRegistry::new(data_dir));

            // 应用菜单仅在以 Command 为主修饰键的平台上安装，
            // 其余平台依赖系统默认行为
            if cfg!(target_os = "macos") {
                menu::install(app.handle())?;
            }
            app.on_menu_event(menu::handle_menu_event);

            // 创建首个外壳窗口（策略接线在窗口 build 之前完成）
            {
                let registry = app.state::<WindowRegistry>();
                window::create_shell_window(app.handle(), &registry, None)?;
            }

            // 后台更新检查：不阻塞窗口创建，失败静默吸收
            spawn_update_watcher(app.handle().clone());

            Ok(())
        })
        // 窗口事件统一入口：几何持久化与注册表生命周期
        .on_window_event(window::handle_window_event)
        // `tauri::generate_context!()` 宏：在编译时读取 `tauri.conf.json`，
        // 生成包含应用名称、安全策略等信息的上下文对象
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(handle_run_event);
}

/// 应用级运行事件处理
///
/// - `ExitRequested`：macOS 上最后一个窗口关闭后保持进程常驻，
///   显式退出不拦截
/// - `Reopen`（仅 macOS）：Dock 图标重新激活且没有窗口时新建一个
fn handle_run_event(app: &tauri::AppHandle, event: tauri::RunEvent) {
    #[cfg(not(target_os = "macos"))]
    let _ = app;

    match event {
        tauri::RunEvent::ExitRequested { code, api, .. } => {
            if code.is_none() && cfg!(target_os = "macos") {
                api.prevent_exit();
            }
        }
        #[cfg(target_os = "macos")]
        tauri::RunEvent::Reopen { .. } => {
            if app.webview_windows().is_empty() {
                let registry = app.state::<WindowRegistry>();
                if let Err(e) = window::create_shell_window(app, &registry, None) {
                    log::warn!("重新激活时创建窗口失败: {}", e);
                }
            }
        }
        _ => {}
    }
}

/// 启动后台更新检查任务
///
/// 启动后的首次 tick 无条件执行一次 `check`（缓存命中时不触网，
/// 只为尽快点亮菜单上的更新提醒）；之后每个节拍用 `should_check`
/// 预检 24 小时间隔是否已过，到期才发起真正的远程查询。
fn spawn_update_watcher(app: tauri::AppHandle) {
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

        let mut ticker = tokio::time::interval(UPDATE_POLL_INTERVAL);
        let mut first_tick = true;

        loop {
            ticker.tick().await;

            let due = first_tick || checker.should_check().await;
            first_tick = false;
            if !due {
                continue;
            }

            let info = checker.check(&current).await;
            if info.has_update {
                log::info!("发现新版本: v{}", info.latest_version);
                menu::show_update_available(&app, &info);
            }
        }
    });
}
