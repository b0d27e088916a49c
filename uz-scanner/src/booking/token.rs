//! Token recovery: extraction from the landing page, staleness tracking,
//! and the browser fingerprint pool.
//!
//! The site issues its `gv-token` only through an obfuscated script on
//! the landing page. The fragment sits between the `_trackPageview`
//! beacon and a trailing `(function`; once decoded it stores the token
//! with `localStorage.setItem("gv-token", ...)`.

use std::future::Future;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tokio::sync::{Mutex, RwLock};

use crate::jjdecode;

use super::error::ClientError;

/// Tokens older than this are stale and must be refreshed before use.
pub const TOKEN_MAX_AGE: Duration = Duration::from_secs(600);

static JJ_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r";_gaq\.push\(\['_trackPageview'\]\);(.+)\(function")
        .expect("fragment pattern compiles")
});

static TOKEN_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"localStorage\.setItem\("gv-token", "(\w+)"\);"#)
        .expect("token pattern compiles")
});

/// Pull the token out of a landing page.
///
/// Returns `None` when the obfuscated fragment is missing, fails to
/// decode, or the decoded script carries no token literal. The caller
/// must treat all of these as "token not obtainable", never as an empty
/// token.
pub fn extract_token(page: &str) -> Option<String> {
    let fragment = JJ_FRAGMENT.captures(page)?.get(1)?.as_str();
    let script = jjdecode::decode(fragment).ok()?;
    let captures = TOKEN_LITERAL.captures(&script)?;
    Some(captures.get(1)?.as_str().to_string())
}

/// Browser fingerprints rotated on every token refresh.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.102 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_5) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.102 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/50.0.2661.94 Safari/537.36",
    "Mozilla/5.0 (Windows NT 6.1; WOW64; rv:46.0) Gecko/20100101 Firefox/46.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_5) AppleWebKit/601.6.17 (KHTML, like Gecko) Version/9.1.1 Safari/601.6.17",
    "Mozilla/5.0 (Windows NT 10.0; WOW64; Trident/7.0; rv:11.0) like Gecko",
];

/// Pick a fingerprint for a new session identity.
pub fn random_user_agent() -> &'static str {
    use rand::seq::IndexedRandom;
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

struct IssuedToken {
    value: String,
    issued_at: Instant,
}

/// The client's token slot: staleness tracking plus a double-checked
/// refresh lock so concurrent stale callers trigger exactly one refresh.
pub struct TokenCell {
    max_age: Duration,
    refresh_lock: Mutex<()>,
    state: RwLock<Option<IssuedToken>>,
}

impl TokenCell {
    /// Create an empty cell; the first caller will refresh.
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            refresh_lock: Mutex::new(()),
            state: RwLock::new(None),
        }
    }

    /// Return the current token, running `refresh` if it is absent or
    /// older than `max_age`.
    ///
    /// Staleness is re-tested after the refresh lock is acquired, so
    /// callers that queued behind an in-flight refresh reuse its result
    /// instead of refreshing again.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, ClientError>>,
    {
        if let Some(token) = self.current().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(token) = self.current().await {
            return Ok(token);
        }

        let value = refresh().await?;
        *self.state.write().await = Some(IssuedToken {
            value: value.clone(),
            issued_at: Instant::now(),
        });
        Ok(value)
    }

    async fn current(&self) -> Option<String> {
        let state = self.state.read().await;
        state
            .as_ref()
            .filter(|token| token.issued_at.elapsed() <= self.max_age)
            .map(|token| token.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jjdecode::test_support::jjencode;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn landing_page(script: &str) -> String {
        format!(
            "<html><head><script>var _gaq=_gaq||[];_gaq.push(['_trackPageview']);{}(function(i,s,o){{}})();</script></head><body></body></html>",
            jjencode("$", script)
        )
    }

    #[test]
    fn extracts_token_from_page() {
        let page = landing_page(
            r#"localStorage.setItem("gv-token", "d25a4d2d6d06e35b1a37b44b4ca2f1b3");"#,
        );
        assert_eq!(
            extract_token(&page).as_deref(),
            Some("d25a4d2d6d06e35b1a37b44b4ca2f1b3")
        );
    }

    #[test]
    fn no_fragment_means_no_token() {
        assert_eq!(extract_token("<html><body>plain page</body></html>"), None);
    }

    #[test]
    fn decoded_script_without_token_literal() {
        let page = landing_page("alert('no token here');");
        assert_eq!(extract_token(&page), None);
    }

    #[test]
    fn garbage_fragment_is_not_a_token() {
        let page =
            "<html>;_gaq.push(['_trackPageview']);not-jjencode-at-all(function(){})();</html>";
        assert_eq!(extract_token(page), None);
    }

    #[test]
    fn user_agent_pool_is_non_empty() {
        let ua = random_user_agent();
        assert!(USER_AGENTS.contains(&ua));
    }

    #[tokio::test]
    async fn fresh_token_is_not_refetched() {
        let cell = TokenCell::new(TOKEN_MAX_AGE);
        let count = AtomicUsize::new(0);

        let first = cell
            .get_or_refresh(|| async {
                count.fetch_add(1, Ordering::SeqCst);
                Ok("t1".to_string())
            })
            .await
            .unwrap();
        let second = cell
            .get_or_refresh(|| async {
                count.fetch_add(1, Ordering::SeqCst);
                Ok("t2".to_string())
            })
            .await
            .unwrap();

        assert_eq!(first, "t1");
        assert_eq!(second, "t1");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_token_is_refetched() {
        let cell = TokenCell::new(Duration::from_millis(20));
        cell.get_or_refresh(|| async { Ok("t1".to_string()) })
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        let refreshed = cell
            .get_or_refresh(|| async { Ok("t2".to_string()) })
            .await
            .unwrap();
        assert_eq!(refreshed, "t2");
    }

    #[tokio::test]
    async fn concurrent_stale_callers_refresh_exactly_once() {
        let cell = Arc::new(TokenCell::new(TOKEN_MAX_AGE));
        let count = Arc::new(AtomicUsize::new(0));

        let callers = (0..8).map(|_| {
            let cell = cell.clone();
            let count = count.clone();
            async move {
                cell.get_or_refresh(|| async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    // hold the refresh long enough for every caller to queue
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok("tok".to_string())
                })
                .await
            }
        });

        let results = futures::future::join_all(callers).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "tok");
        }
    }

    #[tokio::test]
    async fn expired_token_with_concurrent_callers_refreshes_once() {
        let cell = Arc::new(TokenCell::new(Duration::from_millis(20)));
        let count = Arc::new(AtomicUsize::new(0));

        cell.get_or_refresh(|| async { Ok("t1".to_string()) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;

        let callers = (0..8).map(|_| {
            let cell = cell.clone();
            let count = count.clone();
            async move {
                cell.get_or_refresh(|| async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok("t2".to_string())
                })
                .await
            }
        });
        let results = futures::future::join_all(callers).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), "t2");
        }
    }

    #[tokio::test]
    async fn failed_refresh_leaves_cell_empty() {
        let cell = TokenCell::new(TOKEN_MAX_AGE);

        let result = cell
            .get_or_refresh(|| async { Err(ClientError::TokenUnavailable) })
            .await;
        assert!(matches!(result, Err(ClientError::TokenUnavailable)));

        let recovered = cell
            .get_or_refresh(|| async { Ok("t2".to_string()) })
            .await
            .unwrap();
        assert_eq!(recovered, "t2");
    }
}
