//! # ChatGPT-Lite - Tauri 桌面应用原生入口点
//!
//! 本文件是整个桌面应用程序的原生入口点（native entry point）。
//! Rust 编译器从此处的 `main()` 函数开始执行，随后调用 `app_lib::run()`
//! 完成 Tauri 引擎的初始化与事件循环启动。
//!
//! 在 Tauri 架构中，`main.rs` 仅负责启动应用，核心逻辑位于 `lib.rs` 中，
//! 以便在桌面端和移动端入口之间共享代码。

// Prevents additional console window on Windows in release, DO NOT REMOVE!!
// 在 Windows 平台的 Release 构建中隐藏控制台窗口，请勿移除此属性！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

fn main() {
  app_lib::run();
}
