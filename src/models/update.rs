//! # 更新检查数据模型
//!
//! 定义更新检查的持久化缓存（`UpdateCheckState`）、对外结果
//! （`UpdateInfo`）以及 GitHub Releases API 的响应线格式
//! （`LatestRelease`）。
//!
//! 对应旧版（Electron 实现）的 TypeScript 类型：
//! ```typescript
//! type UpdateCheckState = {
//!   lastCheck: number;
//!   latestVersion?: string;
//!   releaseUrl?: string;
//! };
//! export type UpdateInfo = {
//!   hasUpdate: boolean;
//!   latestVersion: string;
//!   releaseUrl: string;
//! };
//! ```

use serde::{Deserialize, Serialize};

/// 更新检查的持久化缓存
///
/// 写入安装目录下的 `update-check.json`。
/// 不变式：`last_check` 随每次写入单调不减（同一安装内）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckState {
    /// 最近一次检查的时间戳（Unix epoch 毫秒）
    pub last_check: i64,

    /// 已知的最新版本号（去除前缀 v 后的形式，如 "0.1.2"）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_version: Option<String>,

    /// 对应版本的发布页 URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
}

/// 一次更新检查的对外结果（派生值，不持久化）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// 最新版本是否比当前运行版本更新
    pub has_update: bool,

    /// 最新版本号
    pub latest_version: String,

    /// 发布页 URL（供菜单点击后在系统浏览器中打开）
    pub release_url: String,
}

/// GitHub Releases API `releases/latest` 响应中本应用关心的字段
///
/// 两个字段缺一不可：缺失或为空均按查询失败处理。
#[derive(Debug, Clone, Deserialize)]
pub struct LatestRelease {
    /// 版本标签（可能带前缀 v，如 "v0.1.2"）
    pub tag_name: String,

    /// 发布页 URL
    pub html_url: String,
}
