//! Cookies 管理
//!
//! 登录态保存在 `cookie_store` 里，由 reqwest 自动收发 `Set-Cookie` / `Cookie`，
//! 过期与删除也按标准处理。导出时压平成 名称→值 表写入 `cookies.json`。

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, MutexGuard};

use cookie_store::{CookieStore, RawCookie};
use reqwest::Url;
use reqwest_cookie_store::CookieStoreMutex;
use tracing::debug;

use crate::errors::Result;

/// CSRF 校验使用的 cookie 名
pub const CSRF_COOKIE: &str = "bili_jct";

/// 登录跳转链接中携带的登录态
const LOGIN_COOKIES: [&str; 4] = ["DedeUserID", "DedeUserID__ckMd5", "SESSDATA", "bili_jct"];

#[derive(Clone)]
pub struct CookieJar {
    store: Arc<CookieStoreMutex>,
    /// 导入 cookies 时作用的站点
    origins: Vec<Url>,
}

impl CookieJar {
    pub fn new(origins: Vec<Url>) -> Self {
        Self {
            store: Arc::new(CookieStoreMutex::new(CookieStore::default())),
            origins,
        }
    }

    /// 交给 reqwest 作为 cookie provider
    pub fn provider(&self) -> Arc<CookieStoreMutex> {
        self.store.clone()
    }

    /// 从登录成功跳转链接的查询串中补齐登录态
    pub fn absorb_query(&self, url: &str) {
        let Ok(url) = Url::parse(url) else {
            debug!("login redirect is not a valid url");
            return;
        };
        let present = self.export();
        let missing: HashMap<String, String> = url
            .query_pairs()
            .filter(|(name, value)| LOGIN_COOKIES.contains(&name.as_ref()) && !value.is_empty())
            .filter(|(name, _)| !present.contains_key(name.as_ref()))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        self.import(missing);
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.lock()
            .iter_unexpired()
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }

    /// 未过期的 cookies，同名只保留一个
    pub fn export(&self) -> HashMap<String, String> {
        self.lock()
            .iter_unexpired()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect()
    }

    /// 导入 cookies，写入每个业务站点
    pub fn import(&self, cookies: HashMap<String, String>) {
        let mut store = self.lock();
        for (name, value) in cookies {
            for origin in &self.origins {
                let mut cookie = RawCookie::new(name.clone(), value.clone());
                cookie.set_path("/");
                if let Err(e) = store.insert_raw(&cookie, origin) {
                    debug!("cookie {} rejected for {}: {}", name, origin, e);
                }
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, CookieStore> {
        // 持锁期间不会 panic，中毒时直接沿用内部数据
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for CookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.export().into_keys().collect();
        names.sort();
        f.debug_struct("CookieJar").field("cookies", &names).finish()
    }
}

/// 读取 cookies 文件
pub async fn load_cookie_file(path: &Path) -> Result<HashMap<String, String>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// 保存 cookies 文件
pub async fn save_cookie_file(path: &Path, cookies: &HashMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, serde_json::to_string_pretty(cookies)?).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore as _;
    use reqwest::header::HeaderValue;

    fn jar() -> CookieJar {
        CookieJar::new(vec![
            Url::parse("https://api.bilibili.com/").unwrap(),
            Url::parse("https://api.vc.bilibili.com/").unwrap(),
        ])
    }

    fn set_cookies(jar: &CookieJar, url: &str, headers: &[&'static str]) {
        let values: Vec<HeaderValue> = headers.iter().map(|h| HeaderValue::from_static(*h)).collect();
        jar.provider()
            .set_cookies(&mut values.iter(), &Url::parse(url).unwrap());
    }

    #[test]
    fn test_set_cookie_domain_is_shared() {
        let jar = jar();
        set_cookies(
            &jar,
            "https://passport.bilibili.com/x/passport-login/web/qrcode/poll",
            &["SESSDATA=abc%2C123; Path=/; Domain=bilibili.com; HttpOnly", "bili_jct=csrf42; Path=/; Domain=bilibili.com"],
        );
        assert_eq!(jar.get("SESSDATA").as_deref(), Some("abc%2C123"));
        assert_eq!(jar.get(CSRF_COOKIE).as_deref(), Some("csrf42"));

        let header = jar
            .provider()
            .cookies(&Url::parse("https://api.vc.bilibili.com/web_im/v1/web_im/send_msg").unwrap())
            .unwrap();
        assert!(header.to_str().unwrap().contains("bili_jct=csrf42"));
    }

    #[test]
    fn test_max_age_zero_deletes_cookie() {
        let jar = jar();
        let url = "https://api.bilibili.com/x/member/web/account";
        set_cookies(&jar, url, &["SESSDATA=abc; Path=/"]);
        assert!(jar.export().contains_key("SESSDATA"));

        set_cookies(&jar, url, &["SESSDATA=; Path=/; Max-Age=0"]);
        assert!(!jar.export().contains_key("SESSDATA"));
        assert_eq!(jar.get("SESSDATA"), None);
    }

    #[test]
    fn test_absorb_query() {
        let jar = jar();
        jar.absorb_query(
            "https://passport.biligame.com/x/passport-login/web/crossDomain?DedeUserID=42&SESSDATA=s%2C1&bili_jct=j&gourl=x#frag",
        );
        assert_eq!(jar.get("DedeUserID").as_deref(), Some("42"));
        assert_eq!(jar.get("SESSDATA").as_deref(), Some("s,1"));
        assert_eq!(jar.get(CSRF_COOKIE).as_deref(), Some("j"));
        assert_eq!(jar.get("gourl"), None);
    }

    #[test]
    fn test_absorb_query_keeps_existing_cookie() {
        let jar = jar();
        jar.import(HashMap::from([(CSRF_COOKIE.to_string(), "from-header".to_string())]));
        jar.absorb_query("https://passport.biligame.com/crossDomain?bili_jct=from-query");
        assert_eq!(jar.get(CSRF_COOKIE).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_import_reaches_every_origin() {
        let jar = jar();
        jar.import(HashMap::from([("SESSDATA".to_string(), "x".to_string())]));

        for url in ["https://api.bilibili.com/x/relation/stat", "https://api.vc.bilibili.com/session_svr"] {
            let header = jar.provider().cookies(&Url::parse(url).unwrap()).unwrap();
            assert_eq!(header.to_str().unwrap(), "SESSDATA=x");
        }
        assert_eq!(jar.export().len(), 1);
    }

    #[tokio::test]
    async fn test_cookie_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let cookies = HashMap::from([("SESSDATA".to_string(), "x".to_string())]);
        save_cookie_file(&path, &cookies).await.unwrap();
        assert_eq!(load_cookie_file(&path).await.unwrap(), cookies);
    }
}
