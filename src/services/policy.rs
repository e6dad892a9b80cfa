//! # URL 信任策略服务
//!
//! 两个纯谓词，构成导航安全的决策基础：
//! - `is_trusted_url` - URL 是否属于受信任的域集合（允许在应用内加载）
//! - `is_safe_external_url` - URL 是否可以安全移交给系统默认浏览器
//!
//! ## 安全边界
//! `is_trusted_url` 的误报（false positive）是本应用最主要的攻击面：
//! 一旦钓鱼域被误判为受信任，嵌入页面就可能被替换成凭据收割页。
//! 因此 host 匹配只接受"完全相等"或"以 `.根域` 结尾"两种形式，
//! 绝不做子串包含匹配（`evilchatgpt.com` 不得匹配 `chatgpt.com`）。
//!
//! 两个函数均无状态、无副作用、不访问网络，任何解析失败一律返回 `false`。

use url::Url;

/// 受信任的根域集合
///
/// ChatGPT 自身域名，加上登录与静态资源所依赖的联合认证 / CDN 域。
/// 进程启动时即固定，运行期间不可变。
const ALLOWED_ROOT_HOSTS: [&str; 8] = [
    "chatgpt.com",
    "openai.com",
    "oaistatic.com",
    "oaiusercontent.com",
    "auth0.com",
    "google.com",
    "gstatic.com",
    "apple.com",
];

/// 判断 URL 是否属于受信任的域集合
///
/// 规则：
/// 1. 必须能解析为绝对 URL，否则 `false`
/// 2. scheme 必须是 `https`（加密传输），否则 `false`
/// 3. host 小写后与根域完全相等，或以 `.根域` 结尾（点边界后缀匹配）
///
/// # 参数
/// - `raw_url` - 待判定的原始 URL 字符串
pub fn is_trusted_url(raw_url: &str) -> bool {
    let Ok(parsed) = Url::parse(raw_url) else {
        return false;
    };

    if parsed.scheme() != "https" {
        return false;
    }

    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    ALLOWED_ROOT_HOSTS
        .iter()
        .any(|root| host_matches_root(&host, root))
}

/// 判断 URL 是否可以安全地交给系统默认浏览器打开
///
/// 仅允许 `http` 与 `https` 两种 web 传输 scheme。
/// `javascript:`、`file:`、`data:` 等 scheme 是沙箱内容逃逸的已知途径，
/// 绝不允许移交给外部程序。
pub fn is_safe_external_url(raw_url: &str) -> bool {
    match Url::parse(raw_url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// host 是否命中某个根域：完全相等，或以 `.根域` 结尾
///
/// 后缀匹配必须落在标签边界（点）上，子串包含不算命中。
fn host_matches_root(host: &str, root: &str) -> bool {
    host == root
        || host
            .strip_suffix(root)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_chatgpt_root_and_subdomains() {
        assert!(is_trusted_url("https://chatgpt.com"));
        assert!(is_trusted_url("https://chatgpt.com/c/some-chat"));
        assert!(is_trusted_url("https://sub.chatgpt.com/path"));
    }

    #[test]
    fn test_allows_auth_related_domains() {
        // ChatGPT 登录流程依赖的联合认证与 CDN 域
        assert!(is_trusted_url("https://openai.com"));
        assert!(is_trusted_url("https://auth.openai.com"));
        assert!(is_trusted_url("https://accounts.google.com"));
        assert!(is_trusted_url("https://cdn.auth0.com"));
        assert!(is_trusted_url("https://cdn.oaistatic.com"));
    }

    #[test]
    fn test_blocks_unrelated_domains() {
        assert!(!is_trusted_url("https://google-analytics.com"));
        assert!(!is_trusted_url("https://example.com"));
    }

    #[test]
    fn test_no_substring_false_positives() {
        // 子串包含不是标签边界匹配，必须全部拒绝
        assert!(!is_trusted_url("https://evil-chatgpt.com"));
        assert!(!is_trusted_url("https://evilchatgpt.com"));
        assert!(!is_trusted_url("https://chatgptx.com"));
        assert!(!is_trusted_url("https://chatgpt.com.evil.example"));
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        assert!(is_trusted_url("https://ChatGPT.com"));
        assert!(is_trusted_url("https://SUB.CHATGPT.COM"));
    }

    #[test]
    fn test_blocks_unsafe_schemes() {
        assert!(!is_trusted_url("javascript:alert(1)"));
        assert!(!is_trusted_url("file:///tmp/index.html"));
        assert!(!is_trusted_url("data:text/html,<h1>hi</h1>"));
        // 未加密的 http 也不允许在应用内加载
        assert!(!is_trusted_url("http://chatgpt.com"));
    }

    #[test]
    fn test_malformed_input_returns_false() {
        assert!(!is_trusted_url("not a url"));
        assert!(!is_trusted_url(""));
        assert!(!is_safe_external_url("not a url"));
        assert!(!is_safe_external_url(""));
    }

    #[test]
    fn test_external_guard_allows_plain_web_schemes() {
        assert!(is_safe_external_url("https://example.com/"));
        assert!(is_safe_external_url("http://example.com/"));
    }

    #[test]
    fn test_external_guard_blocks_escape_vector_schemes() {
        assert!(!is_safe_external_url("javascript:alert(1)"));
        assert!(!is_safe_external_url("file:///etc/passwd"));
        assert!(!is_safe_external_url("data:text/html,x"));
    }
}
