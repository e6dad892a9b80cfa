//! # 外壳窗口管理
//!
//! 创建承载 ChatGPT 页面的外壳窗口，并在创建时完成全部策略接线：
//! - 导航策略：`on_navigation` 在 builder 上注册，结构上先于
//!   首次导航生效（不存在"页面先加载、策略后注册"的竞态窗口）
//! - 新窗口请求收敛：注入的初始化脚本把 `window.open` 与
//!   `target="_blank"` 点击改写为当前页面的原地导航，
//!   再由同一个导航钩子统一裁决
//! - 空白页引导：占位页（about:blank）首次加载完成后一次性
//!   导航到入口 URL
//! - 几何持久化：resize / move 事件触发防抖保存，关闭时同步落盘
//!
//! 动作执行也集中在本模块：菜单事件产出的 `ShortcutAction`
//! 经 `execute_action` 作用到当前聚焦的窗口上。

use tauri::webview::PageLoadEvent;
use tauri::{
    AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder, Window, WindowEvent,
};
use tauri_plugin_opener::OpenerExt;
use url::Url;

use crate::models::geometry::WindowGeometry;
use crate::services::navigation::{self, AttemptKind, NavigationDecision};
use crate::services::registry::WindowRegistry;
use crate::services::shortcuts::{Platform, ShortcutAction};

/// 受信任来源的规范入口 URL
const ENTRY_URL: &str = "https://chatgpt.com/";

/// 窗口标题
const WINDOW_TITLE: &str = "ChatGPT-Lite";

/// 窗口内容区的最小尺寸（逻辑像素）
const MIN_WIDTH: f64 = 360.0;
const MIN_HEIGHT: f64 = 640.0;

/// 从既有窗口派生新窗口时的位置偏移（逻辑像素）
const NEW_WINDOW_OFFSET: i32 = 30;

/// 注入每个外壳页面的初始化脚本
///
/// 把新窗口请求收敛为当前页面的原地导航：受信任的 URL（如登录弹窗
/// 的回跳）得以内联继续，不受信任的 URL 则落入导航钩子的
/// 移交/拦截分支。脚本在文档建立前执行，页面脚本无法抢先开窗。
const NEW_TARGET_FUNNEL_SCRIPT: &str = r#"
(function () {
  if (window.__shellNewTargetFunnel) { return; }
  window.__shellNewTargetFunnel = true;

  window.open = function (url) {
    if (typeof url === 'string' && url.length > 0) {
      window.location.assign(url);
    }
    return null;
  };

  document.addEventListener('click', function (event) {
    var anchor = event.target && event.target.closest
      ? event.target.closest('a[target="_blank"]')
      : null;
    if (anchor && anchor.href) {
      event.preventDefault();
      window.location.assign(anchor.href);
    }
  }, true);
})();
"#;

/// 入口 URL 的解析结果
///
/// 入口是编译期常量，解析失败属于程序缺陷而非运行时故障。
fn entry_url() -> Url {
    Url::parse(ENTRY_URL).expect("内置入口 URL 必须合法")
}

/// 创建一个新的外壳窗口并完成全部策略接线
///
/// 几何来源：
/// - 从既有窗口派生（菜单/快捷键新建）时，继承其尺寸并偏移 30px
/// - 否则从持久化存储加载，存储损坏时退回固定回退几何
///
/// # 参数
/// - `app` - 应用句柄
/// - `registry` - 窗口注册表（新窗口在 build 之前注册）
/// - `source` - 派生来源窗口（首个窗口为 None）
pub fn create_shell_window(
    app: &AppHandle,
    registry: &WindowRegistry,
    source: Option<&WebviewWindow>,
) -> tauri::Result<WebviewWindow> {
    let label = registry.next_label();
    let store = registry.register(&label);

    let geometry = source
        .and_then(source_geometry)
        .unwrap_or_else(|| store.load());

    let mut builder =
        WebviewWindowBuilder::new(app, label.as_str(), WebviewUrl::External(entry_url()))
            .title(WINDOW_TITLE)
            .inner_size(f64::from(geometry.width), f64::from(geometry.height))
            .min_inner_size(MIN_WIDTH, MIN_HEIGHT)
            .initialization_script(NEW_TARGET_FUNNEL_SCRIPT)
            .on_navigation({
                let app = app.clone();
                move |url| handle_navigation(&app, url)
            })
            .on_page_load(|mut webview, payload| {
                // 空白占位页一次性引导到入口 URL，新表面无需用户动作即进入受信任内容
                if matches!(payload.event(), PageLoadEvent::Finished)
                    && payload.url().as_str() == "about:blank"
                {
                    log::info!("空白占位页引导到入口 URL");
                    if let Err(e) = webview.navigate(entry_url()) {
                        log::warn!("占位页引导导航失败: {}", e);
                    }
                }
            });

    if let (Some(x), Some(y)) = (geometry.x, geometry.y) {
        builder = builder.position(f64::from(x), f64::from(y));
    }

    #[cfg(target_os = "macos")]
    {
        builder = builder.title_bar_style(tauri::TitleBarStyle::Overlay);
    }

    match builder.build() {
        Ok(window) => {
            log::info!("外壳窗口已创建: {}", label);
            Ok(window)
        }
        Err(e) => {
            // 创建失败时回收注册表条目，不残留幽灵窗口状态
            registry.unregister(&label);
            Err(e)
        }
    }
}

/// 导航钩子：每次导航请求在此同步裁决
///
/// 返回 `false` 即显式取消嵌入层的默认导航行为；
/// 对不受信任的请求，"拒绝"永远不是 no-op。
fn handle_navigation(app: &AppHandle, url: &Url) -> bool {
    match navigation::decide(AttemptKind::InPlaceNavigate, url.as_str()) {
        NavigationDecision::Continue => true,
        // 新窗口请求已被初始化脚本收敛为原地导航，Redirect 在此等同放行
        NavigationDecision::Redirect(_) => true,
        NavigationDecision::OpenExternally(target) => {
            log::info!("不受信任的导航移交系统浏览器: {}", target);
            if let Err(e) = app.opener().open_url(target.as_str(), None::<&str>) {
                log::warn!("调起系统浏览器失败: {}", e);
            }
            false
        }
        NavigationDecision::Block => {
            log::warn!("已静默拦截不安全的导航请求: {}", url);
            false
        }
    }
}

/// 窗口事件处理：几何持久化与注册表生命周期
///
/// 在 `tauri::Builder::on_window_event` 上全局注册，对主窗口与
/// 后续派生的每个窗口统一生效。
pub fn handle_window_event(window: &Window, event: &WindowEvent) {
    let registry = window.state::<WindowRegistry>();

    match event {
        WindowEvent::Resized(_) | WindowEvent::Moved(_) => {
            if let Some(store) = registry.store_for(window.label()) {
                if let Some(geometry) = snapshot_geometry(window) {
                    store.schedule_save(geometry);
                }
            }
        }
        WindowEvent::CloseRequested { .. } => {
            // 关闭路径：取消防抖定时器并同步落盘最终几何
            if let Some(store) = registry.store_for(window.label()) {
                match snapshot_geometry(window) {
                    Some(geometry) => store.flush(geometry),
                    None => store.flush_pending(),
                }
            }
        }
        WindowEvent::Destroyed => {
            // 销毁晚于关闭到达；兜底写出残留快照后注销，不泄漏注册表条目
            if let Some(store) = registry.store_for(window.label()) {
                store.flush_pending();
            }
            registry.unregister(window.label());
        }
        _ => {}
    }
}

/// 执行一个应用动作（菜单事件与快捷键分发的共同汇点）
pub fn execute_action(app: &AppHandle, action: ShortcutAction) {
    match action {
        ShortcutAction::NewWindow => {
            let registry = app.state::<WindowRegistry>();
            let source = focused_window(app);
            if let Err(e) = create_shell_window(app, &registry, source.as_ref()) {
                log::warn!("创建新窗口失败: {}", e);
            }
        }
        ShortcutAction::NewChat => {
            if let Some(window) = focused_window(app) {
                let mut window = window;
                if let Err(e) = window.navigate(entry_url()) {
                    log::warn!("打开新会话失败: {}", e);
                }
            }
        }
        ShortcutAction::CloseWindow => {
            if let Some(window) = focused_window(app) {
                if let Err(e) = window.close() {
                    log::warn!("关闭窗口失败: {}", e);
                }
            }
        }
        ShortcutAction::ZoomIn => apply_zoom(app, 1),
        ShortcutAction::ZoomOut => apply_zoom(app, -1),
        ShortcutAction::ToggleDevTools => toggle_devtools(app),
        ShortcutAction::ToggleSidebar => toggle_sidebar(app),
    }
}

/// 当前聚焦的外壳窗口
fn focused_window(app: &AppHandle) -> Option<WebviewWindow> {
    app.webview_windows()
        .into_values()
        .find(|window| window.is_focused().unwrap_or(false))
}

/// 读取窗口当前几何（逻辑像素快照）
///
/// 任一查询失败（窗口已进入销毁流程等）返回 None。
fn snapshot_geometry(window: &Window) -> Option<WindowGeometry> {
    let scale = window.scale_factor().ok()?;
    let size = window.inner_size().ok()?.to_logical::<f64>(scale);
    let position = window.outer_position().ok()?.to_logical::<f64>(scale);

    Some(WindowGeometry {
        width: size.width.round() as u32,
        height: size.height.round() as u32,
        x: Some(position.x.round() as i32),
        y: Some(position.y.round() as i32),
    })
}

/// 从来源窗口派生新窗口几何：同尺寸，位置偏移 30px
fn source_geometry(source: &WebviewWindow) -> Option<WindowGeometry> {
    let scale = source.scale_factor().ok()?;
    let size = source.inner_size().ok()?.to_logical::<f64>(scale);
    let position = source.outer_position().ok()?.to_logical::<f64>(scale);

    Some(WindowGeometry {
        width: size.width.round() as u32,
        height: size.height.round() as u32,
        x: Some(position.x.round() as i32 + NEW_WINDOW_OFFSET),
        y: Some(position.y.round() as i32 + NEW_WINDOW_OFFSET),
    })
}

/// 调整聚焦窗口的页面缩放
fn apply_zoom(app: &AppHandle, delta_steps: i32) {
    let Some(window) = focused_window(app) else {
        return;
    };

    let registry = app.state::<WindowRegistry>();
    if let Some(factor) = registry.zoom_step(window.label(), delta_steps) {
        if let Err(e) = window.set_zoom(factor) {
            log::warn!("调整页面缩放失败: {}", e);
        }
    }
}

/// 开关聚焦窗口的开发者工具（仅调试构建）
fn toggle_devtools(app: &AppHandle) {
    #[cfg(debug_assertions)]
    if let Some(window) = focused_window(app) {
        if window.is_devtools_open() {
            window.close_devtools();
        } else {
            window.open_devtools();
        }
    }

    #[cfg(not(debug_assertions))]
    let _ = app;
}

/// 开关 ChatGPT 页面的侧边栏
///
/// 外壳没有本地渲染层可供转发消息，改为向页面派发 ChatGPT
/// 自身的侧边栏快捷键事件，由页面脚本完成实际开关。
fn toggle_sidebar(app: &AppHandle) {
    let Some(window) = focused_window(app) else {
        return;
    };

    let (meta, ctrl) = match Platform::current() {
        Platform::MacOs => ("true", "false"),
        _ => ("false", "true"),
    };
    let script = format!(
        "document.dispatchEvent(new KeyboardEvent('keydown', {{ key: 's', code: 'KeyS', metaKey: {}, ctrlKey: {}, shiftKey: true, bubbles: true }}));",
        meta, ctrl
    );

    if let Err(e) = window.eval(&script) {
        log::warn!("切换侧边栏失败: {}", e);
    }
}
