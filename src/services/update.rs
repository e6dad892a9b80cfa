//! # 更新检查服务
//!
//! 基于 GitHub Releases 的时间门控版本检查。
//! 每 24 小时最多发起一次远程查询，
//! 结果缓存到安装目录下的 `update-check.json`。
//!
//! ## 状态机
//! 以"缓存距今是否超过检查间隔"为唯一判据在两个状态间流转：
//! - **Fresh**（无缓存或已过期）：发起一次远程查询。无论成败都把
//!   `lastCheck` 推进到当前时刻再持久化，失败的调用同样被间隔节流，
//!   不会在故障端点上热循环
//! - **Cached**（缓存在间隔内）：不触网，直接用缓存的最新版本号
//!   与当前运行版本比较
//!
//! 任何失败（网络错误、非 2xx 状态、响应缺字段）都静默降级为
//! "没有更新"，绝不向用户暴露错误。

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::models::update::{LatestRelease, UpdateCheckState, UpdateInfo};

/// 最新 release 查询端点
const GITHUB_RELEASES_API: &str =
    "https://api.github.com/repos/es-studio/ChatGPT-Lite/releases/latest";

/// 发布列表页：响应缺少发布页 URL 时的兜底跳转目标
const GITHUB_RELEASES_PAGE: &str = "https://github.com/es-studio/ChatGPT-Lite/releases";

/// 检查间隔：24 小时
const CHECK_INTERVAL_MS: i64 = 24 * 60 * 60 * 1000;

/// 持久化缓存文件名（位于应用数据目录下）
const UPDATE_STATE_FILE: &str = "update-check.json";

/// 远程查询超时
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// 更新检查器
///
/// 每个实例绑定一个安装目录；远程查询共享同一个 HTTP 客户端。
pub struct UpdateChecker {
    /// 缓存文件的绝对路径
    state_path: PathBuf,

    /// 查询端点（常量，测试中可替换为本地不可达地址以演练失败路径）
    api_url: String,

    client: reqwest::Client,
}

impl UpdateChecker {
    /// 创建指向 `<data_dir>/update-check.json` 的检查器
    pub fn new(data_dir: &Path) -> Self {
        // GitHub API 要求显式 User-Agent，匿名请求会被直接拒绝
        let client = reqwest::Client::builder()
            .user_agent(format!("chatgpt-lite/{}", env!("CARGO_PKG_VERSION")))
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            state_path: data_dir.join(UPDATE_STATE_FILE),
            api_url: GITHUB_RELEASES_API.to_string(),
            client,
        }
    }

    /// 是否需要发起新一轮检查（距上次检查已超过间隔）
    ///
    /// 廉价的预检：只读缓存文件，不触网。缓存缺失或损坏视为需要检查。
    pub async fn should_check(&self) -> bool {
        should_check_at(self.load_state().await.as_ref(), now_epoch_ms())
    }

    /// 执行一次更新检查
    ///
    /// 缓存在间隔内时不触网；否则查询远程端点并把结果
    /// （或失败时的降级值）连同推进后的 `lastCheck` 一并持久化。
    ///
    /// # 参数
    /// - `current_version` - 当前运行的应用版本号
    pub async fn check(&self, current_version: &str) -> UpdateInfo {
        self.check_at(current_version, now_epoch_ms()).await
    }

    /// `check` 的时钟注入版本（测试以模拟时钟驱动状态机流转）
    async fn check_at(&self, current_version: &str, now_ms: i64) -> UpdateInfo {
        let state = self.load_state().await;

        // Cached：缓存在间隔内且有版本号，直接比较，不触网
        if let Some(cached) = &state {
            if now_ms - cached.last_check < CHECK_INTERVAL_MS {
                if let Some(latest) = &cached.latest_version {
                    return UpdateInfo {
                        has_update: is_newer_version(current_version, latest),
                        latest_version: latest.clone(),
                        release_url: cached
                            .release_url
                            .clone()
                            .unwrap_or_else(|| GITHUB_RELEASES_PAGE.to_string()),
                    };
                }
            }
        }

        // Fresh：发起远程查询。失败时退回已缓存的版本信息（若有），
        // 否则把当前版本当作最新版本上报，即"没有更新"
        let release = self.fetch_latest_release().await;
        let (latest_version, release_url) = match release {
            Some(release) => (
                strip_version_prefix(&release.tag_name).to_string(),
                release.html_url,
            ),
            None => (
                state
                    .as_ref()
                    .and_then(|s| s.latest_version.clone())
                    .unwrap_or_else(|| current_version.to_string()),
                state
                    .as_ref()
                    .and_then(|s| s.release_url.clone())
                    .unwrap_or_else(|| GITHUB_RELEASES_PAGE.to_string()),
            ),
        };

        // lastCheck 单调不减：时钟回拨时保持旧值
        let last_check = state.as_ref().map_or(now_ms, |s| s.last_check.max(now_ms));

        self.save_state(&UpdateCheckState {
            last_check,
            latest_version: Some(latest_version.clone()),
            release_url: Some(release_url.clone()),
        })
        .await;

        UpdateInfo {
            has_update: is_newer_version(current_version, &latest_version),
            latest_version,
            release_url,
        }
    }

    /// 从 GitHub API 获取最新 release 信息
    ///
    /// 网络错误、非 2xx 状态、响应缺字段或字段为空均返回 None。
    async fn fetch_latest_release(&self) -> Option<LatestRelease> {
        let response = self
            .client
            .get(&self.api_url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            log::info!("更新检查返回非成功状态: {}", response.status());
            return None;
        }

        let release = response.json::<LatestRelease>().await.ok()?;
        if release.tag_name.is_empty() || release.html_url.is_empty() {
            return None;
        }
        Some(release)
    }

    /// 读取持久化缓存；缺失、不可读或格式非法时返回 None
    async fn load_state(&self) -> Option<UpdateCheckState> {
        if !self.state_path.exists() {
            return None;
        }
        let content = tokio::fs::read_to_string(&self.state_path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    /// 写入持久化缓存；失败只记日志，不向上抛错
    async fn save_state(&self, state: &UpdateCheckState) {
        let content = match serde_json::to_string(state) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("序列化更新检查缓存失败: {}", e);
                return;
            }
        };
        if let Err(e) = tokio::fs::write(&self.state_path, content).await {
            log::warn!("写入更新检查缓存失败: {}", e);
        }
    }

    /// 测试辅助：把查询端点替换为指定地址
    #[cfg(test)]
    fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.to_string();
        self
    }
}

/// `latest` 是否为比 `current` 更新的版本
///
/// 比较规则：去掉可选的前缀 `v`/`V`，按 `.` 切分后逐段以整数比较，
/// 非数字或缺失的段按 0 处理；首个不同的段决定大小，全部相等则不算更新。
pub fn is_newer_version(current: &str, latest: &str) -> bool {
    let current = version_components(current);
    let latest = version_components(latest);

    for i in 0..current.len().max(latest.len()) {
        let a = current.get(i).copied().unwrap_or(0);
        let b = latest.get(i).copied().unwrap_or(0);
        if b > a {
            return true;
        }
        if b < a {
            return false;
        }
    }
    false
}

/// 版本号按 `.` 切分为整数段
fn version_components(version: &str) -> Vec<u64> {
    strip_version_prefix(version)
        .split('.')
        .map(|component| component.parse::<u64>().unwrap_or(0))
        .collect()
}

/// 去掉版本标签的可选前缀字母（"v0.1.1" → "0.1.1"）
fn strip_version_prefix(tag: &str) -> &str {
    tag.strip_prefix(['v', 'V']).unwrap_or(tag)
}

/// 当前 Unix epoch 毫秒时间戳
fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// 是否需要发起新一轮检查（纯函数，时钟注入）
fn should_check_at(state: Option<&UpdateCheckState>, now_ms: i64) -> bool {
    match state {
        Some(state) => now_ms - state.last_check >= CHECK_INTERVAL_MS,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ======== 版本比较 ========

    #[test]
    fn test_newer_patch_version_detected() {
        assert!(is_newer_version("0.1.0", "0.1.1"));
    }

    #[test]
    fn test_version_prefix_is_ignored() {
        assert!(!is_newer_version("v1.2.0", "1.2.0"));
        assert!(!is_newer_version("1.2.0", "v1.2.0"));
        assert!(is_newer_version("v0.9.0", "V1.0.0"));
    }

    #[test]
    fn test_components_compare_numerically_not_lexically() {
        // "10" > "9" 按整数比较成立，按字典序会误判
        assert!(is_newer_version("1.9.0", "1.10.0"));
        assert!(!is_newer_version("1.10.0", "1.9.0"));
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert!(!is_newer_version("1.2.0", "1.2"));
        assert!(is_newer_version("1.2", "1.2.1"));
    }

    #[test]
    fn test_non_numeric_components_are_zero() {
        assert!(!is_newer_version("1.2.0", "1.2.beta"));
        assert!(is_newer_version("1.beta.0", "1.1.0"));
    }

    #[test]
    fn test_equal_versions_are_not_newer() {
        assert!(!is_newer_version("1.2.3", "1.2.3"));
    }

    // ======== 时间门控（模拟时钟） ========

    #[test]
    fn test_should_check_with_no_state() {
        assert!(should_check_at(None, 1_000));
    }

    #[test]
    fn test_should_check_respects_interval() {
        let state = UpdateCheckState {
            last_check: 1_000,
            latest_version: Some("0.1.0".to_string()),
            release_url: None,
        };

        // 间隔内不检查，到期后恢复检查
        assert!(!should_check_at(Some(&state), 1_000));
        assert!(!should_check_at(Some(&state), 1_000 + CHECK_INTERVAL_MS - 1));
        assert!(should_check_at(Some(&state), 1_000 + CHECK_INTERVAL_MS));
    }

    // ======== 状态机流转（落盘 fixture + 不可达端点） ========

    /// 不可达端点：指向本机 discard 端口，连接立即失败，
    /// 用于在测试中确定性地走 Fresh 状态的失败分支
    const UNREACHABLE_API: &str = "http://127.0.0.1:9/releases/latest";

    #[tokio::test]
    async fn test_cached_state_is_served_without_network() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let now = 5_000_000;
        std::fs::write(
            dir.path().join(UPDATE_STATE_FILE),
            format!(
                r#"{{"lastCheck":{},"latestVersion":"0.2.0","releaseUrl":"https://github.com/es-studio/ChatGPT-Lite/releases/tag/v0.2.0"}}"#,
                now - 1_000
            ),
        )
        .expect("write fixture");

        // 端点不可达也无妨：Cached 路径根本不触网
        let checker = UpdateChecker::new(dir.path()).with_api_url(UNREACHABLE_API);
        let info = checker.check_at("0.1.0", now).await;

        assert!(info.has_update);
        assert_eq!(info.latest_version, "0.2.0");
        assert_eq!(
            info.release_url,
            "https://github.com/es-studio/ChatGPT-Lite/releases/tag/v0.2.0"
        );
    }

    #[tokio::test]
    async fn test_failed_fresh_check_degrades_and_advances_cache() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let checker = UpdateChecker::new(dir.path()).with_api_url(UNREACHABLE_API);
        let now = 9_000_000;

        let info = checker.check_at("0.1.0", now).await;

        // 无历史缓存的失败检查：最新版本降级为当前版本，即"没有更新"
        assert!(!info.has_update);
        assert_eq!(info.latest_version, "0.1.0");
        assert_eq!(info.release_url, GITHUB_RELEASES_PAGE);

        // lastCheck 已推进：失败的调用同样被间隔节流
        let persisted = checker.load_state().await.expect("state must be persisted");
        assert_eq!(persisted.last_check, now);
        assert_eq!(persisted.latest_version.as_deref(), Some("0.1.0"));

        // 紧接着的第二次检查落在间隔内，走 Cached 路径，结论不变
        let again = checker.check_at("0.1.0", now + 1).await;
        assert!(!again.has_update);
    }

    #[tokio::test]
    async fn test_failed_check_preserves_previous_cache_values() {
        let dir = tempfile::tempdir().expect("create tempdir");
        let stale = 1_000_000;
        std::fs::write(
            dir.path().join(UPDATE_STATE_FILE),
            format!(
                r#"{{"lastCheck":{},"latestVersion":"0.3.0","releaseUrl":"https://example.com/rel"}}"#,
                stale
            ),
        )
        .expect("write fixture");

        let checker = UpdateChecker::new(dir.path()).with_api_url(UNREACHABLE_API);
        let now = stale + CHECK_INTERVAL_MS + 1;
        let info = checker.check_at("0.1.0", now).await;

        // 查询失败但已有缓存：沿用缓存里的版本与发布页
        assert!(info.has_update);
        assert_eq!(info.latest_version, "0.3.0");
        assert_eq!(info.release_url, "https://example.com/rel");

        let persisted = checker.load_state().await.expect("state must be persisted");
        assert_eq!(persisted.last_check, now);
    }

    #[tokio::test]
    async fn test_last_check_is_monotonic_under_clock_regression() {
        let dir = tempfile::tempdir().expect("create tempdir");
        // 缓存只有时间戳没有版本号，时钟回拨后仍会走 Fresh 分支
        std::fs::write(
            dir.path().join(UPDATE_STATE_FILE),
            r#"{"lastCheck":10000000}"#,
        )
        .expect("write fixture");

        let checker = UpdateChecker::new(dir.path()).with_api_url(UNREACHABLE_API);
        checker.check_at("0.1.0", 9_000_000).await;

        // 写回的 lastCheck 保持旧值，不随回拨的时钟倒退
        let persisted = checker.load_state().await.expect("state must be persisted");
        assert_eq!(persisted.last_check, 10_000_000);
    }
}
