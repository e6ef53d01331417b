//! B站 HTTP 客户端
//!
//! 所有接口都返回 `{code, message, data}` 信封，`code != 0` 视为业务错误。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::header::{REFERER, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::core::api::{BiliApi, NewFollowerStatus};
use crate::domain::{Account, Follower, LoginPoll, QrLogin, Session, VideoStats};
use crate::errors::{BiliMateError, Result};
use crate::infrastructure::cookies::{CookieJar, CSRF_COOKIE};

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// 每条自动回复末尾附加的标识
pub const REPLY_TAIL: &str = "\n____________________\n「BiliMate」自动回复";

/// 各业务域名，测试时可指向本地模拟服务
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub passport: String,
    pub api: String,
    pub vc: String,
    pub member: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            passport: "https://passport.bilibili.com".to_string(),
            api: "https://api.bilibili.com".to_string(),
            vc: "https://api.vc.bilibili.com".to_string(),
            member: "https://member.bilibili.com".to_string(),
        }
    }
}

impl Endpoints {
    /// 去重后的各站点地址，导入 cookies 时逐个写入
    pub fn origins(&self) -> Result<Vec<Url>> {
        let mut origins: Vec<Url> = Vec::new();
        for base in [&self.passport, &self.api, &self.vc, &self.member] {
            let url = Url::parse(base)
                .map_err(|e| BiliMateError::ConfigError(format!("invalid endpoint {}: {}", base, e)))?;
            if !origins.contains(&url) {
                origins.push(url);
            }
        }
        Ok(origins)
    }

    /// 所有域名指向同一个地址
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            passport: base.clone(),
            api: base.clone(),
            vc: base.clone(),
            member: base,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default, alias = "msg")]
    message: String,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn validate(self) -> Result<Option<T>> {
        if self.code != 0 {
            return Err(BiliMateError::api(self.code, self.message));
        }
        Ok(self.data)
    }

    fn into_data(self) -> Result<T> {
        self.validate()?
            .ok_or_else(|| BiliMateError::DecodeError("response carries no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct PollData {
    code: i64,
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct RelationStat {
    #[serde(default)]
    follower: u64,
}

#[derive(Debug, Deserialize)]
struct FollowerPage {
    #[serde(default)]
    list: Vec<Follower>,
}

#[derive(Debug, Deserialize)]
struct SessionPage {
    #[serde(default)]
    session_list: Option<Vec<Session>>,
}

#[derive(Debug, Deserialize)]
struct UserCard {
    card: CardInfo,
}

#[derive(Debug, Deserialize)]
struct CardInfo {
    name: String,
}

/// B站客户端
#[derive(Debug)]
pub struct BiliClient {
    http: reqwest::Client,
    cookies: CookieJar,
    endpoints: Endpoints,
    /// 最近一次查询到的本人 mid，发私信时作为 sender_uid
    my_mid: AtomicU64,
}

impl BiliClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoints(Endpoints::default())
    }

    pub fn with_endpoints(endpoints: Endpoints) -> Result<Self> {
        let cookies = CookieJar::new(endpoints.origins()?);
        let http = reqwest::Client::builder()
            .cookie_provider(cookies.provider())
            .build()?;
        Ok(Self {
            http,
            cookies,
            endpoints,
            my_mid: AtomicU64::new(0),
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: String, query: &[(&str, String)]) -> Result<Envelope<T>> {
        let res = self
            .http
            .get(&url)
            .header(USER_AGENT, BROWSER_UA)
            .header(REFERER, "https://www.bilibili.com/")
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        debug!("GET {} -> {}", url, res.status());
        Ok(res.json::<Envelope<T>>().await?)
    }

    fn csrf(&self) -> Result<String> {
        self.cookies
            .get(CSRF_COOKIE)
            .ok_or_else(|| BiliMateError::LoginError("missing bili_jct cookie".to_string()))
    }
}

#[async_trait]
impl BiliApi for BiliClient {
    async fn generate_login_qrcode(&self) -> Result<QrLogin> {
        let url = format!("{}/x/passport-login/web/qrcode/generate", self.endpoints.passport);
        self.get::<QrLogin>(url, &[]).await?.into_data()
    }

    async fn poll_login(&self, qrcode_key: &str) -> Result<LoginPoll> {
        let url = format!("{}/x/passport-login/web/qrcode/poll", self.endpoints.passport);
        let data: PollData = self
            .get(url, &[("qrcode_key", qrcode_key.to_string())])
            .await?
            .into_data()?;
        let poll = LoginPoll::from_code(data.code);
        if poll == LoginPoll::Success {
            self.cookies.absorb_query(&data.url);
        }
        Ok(poll)
    }

    async fn account_info(&self) -> Result<Account> {
        let url = format!("{}/x/member/web/account", self.endpoints.api);
        let account: Account = self.get(url, &[]).await?.into_data()?;
        self.my_mid.store(account.mid, Ordering::Relaxed);
        Ok(account)
    }

    async fn follower_count(&self, mid: u64) -> Result<u64> {
        let url = format!("{}/x/relation/stat", self.endpoints.api);
        let stat: RelationStat = self
            .get(url, &[("vmid", mid.to_string())])
            .await?
            .into_data()?;
        Ok(stat.follower)
    }

    async fn followers_page(&self, mid: u64, page: u64, size: u64) -> Result<Vec<Follower>> {
        let url = format!("{}/x/relation/followers", self.endpoints.api);
        let query = [
            ("vmid", mid.to_string()),
            ("pn", page.to_string()),
            ("ps", size.to_string()),
        ];
        let page: FollowerPage = self.get(url, &query).await?.into_data()?;
        Ok(page.list)
    }

    async fn new_follower_status(&self) -> Result<NewFollowerStatus> {
        let url = format!("{}/x/relation/followers/unread/count", self.endpoints.api);
        Ok(self
            .get::<NewFollowerStatus>(url, &[])
            .await?
            .validate()?
            .unwrap_or_default())
    }

    async fn new_followers(&self, mid: u64, count: u64, last_access_ts: i64) -> Result<Vec<Follower>> {
        let url = format!("{}/x/relation/followers", self.endpoints.api);
        let query = [
            ("vmid", mid.to_string()),
            ("pn", "1".to_string()),
            ("ps", count.to_string()),
            ("last_access_ts", last_access_ts.to_string()),
        ];
        let page: FollowerPage = self.get(url, &query).await?.into_data()?;
        Ok(page.list)
    }

    async fn sessions_between(&self, begin_ts: i64, end_ts: i64) -> Result<Vec<Session>> {
        let url = format!("{}/session_svr/v1/session_svr/new_sessions", self.endpoints.vc);
        let query = [
            ("begin_ts", begin_ts.to_string()),
            ("end_ts", end_ts.to_string()),
            ("build", "0".to_string()),
            ("mobi_app", "web".to_string()),
        ];
        let page = self.get::<SessionPage>(url, &query).await?.validate()?;
        Ok(page.and_then(|p| p.session_list).unwrap_or_default())
    }

    async fn user_name(&self, mid: u64) -> Result<String> {
        let url = format!("{}/x/web-interface/card", self.endpoints.api);
        let card: UserCard = self
            .get(url, &[("mid", mid.to_string())])
            .await?
            .into_data()?;
        Ok(card.card.name)
    }

    async fn video_stats(&self) -> Result<VideoStats> {
        let url = format!("{}/x/web/index/stat", self.endpoints.member);
        self.get::<VideoStats>(url, &[]).await?.into_data()
    }

    async fn send_message(&self, receiver: u64, text: &str) -> Result<()> {
        let url = format!("{}/web_im/v1/web_im/send_msg", self.endpoints.vc);
        let csrf = self.csrf()?;
        let sender = match self.my_mid.load(Ordering::Relaxed) {
            0 => self.cookies.get("DedeUserID").unwrap_or_default(),
            mid => mid.to_string(),
        };
        let content = serde_json::json!({ "content": format!("{}{}", text, REPLY_TAIL) }).to_string();

        let form = [
            ("msg[sender_uid]", sender),
            ("msg[receiver_id]", receiver.to_string()),
            ("msg[receiver_type]", "1".to_string()),
            ("msg[msg_type]", "1".to_string()),
            ("msg[msg_status]", "0".to_string()),
            ("msg[content]", content),
            ("msg[dev_id]", uuid::Uuid::new_v4().to_string().to_uppercase()),
            ("msg[new_face_version]", "0".to_string()),
            ("msg[timestamp]", chrono::Utc::now().timestamp().to_string()),
            ("from_filework", "0".to_string()),
            ("build", "0".to_string()),
            ("mobi_app", "web".to_string()),
            ("csrf", csrf.clone()),
            ("csrf_token", csrf),
        ];

        self.http
            .post(&url)
            .header(USER_AGENT, BROWSER_UA)
            .header(REFERER, "https://message.bilibili.com/")
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json::<Envelope<serde_json::Value>>()
            .await?
            .validate()?;
        Ok(())
    }

    fn export_cookies(&self) -> HashMap<String, String> {
        self.cookies.export()
    }

    fn import_cookies(&self, cookies: HashMap<String, String>) {
        self.cookies.import(cookies);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_error_code() {
        let env: Envelope<Account> =
            serde_json::from_str(r#"{"code": -101, "message": "账号未登录", "data": null}"#).unwrap();
        match env.into_data() {
            Err(BiliMateError::ApiError { code, message }) => {
                assert_eq!(code, -101);
                assert_eq!(message, "账号未登录");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_msg_alias() {
        let env: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"code": 21046, "msg": "发送频率过快"}"#).unwrap();
        assert!(matches!(env.validate(), Err(BiliMateError::ApiError { code: 21046, .. })));
    }

    #[test]
    fn test_follower_page_ignores_extra_fields() {
        let json_str = r#"{"list": [{"mid": 7, "uname": "小明", "face": "x", "mtime": 1}], "total": 1}"#;
        let page: FollowerPage = serde_json::from_str(json_str).unwrap();
        assert_eq!(page.list, vec![Follower::new("小明", 7)]);
    }

    #[test]
    fn test_reply_tail() {
        assert!(REPLY_TAIL.starts_with('\n'));
        assert_eq!(REPLY_TAIL.matches('_').count(), 20);
        assert!(REPLY_TAIL.ends_with("「BiliMate」自动回复"));
    }

    #[test]
    fn test_default_origins_are_distinct_hosts() {
        let origins = Endpoints::default().origins().unwrap();
        assert_eq!(origins.len(), 4);
        assert!(Endpoints::single_host("http://127.0.0.1:9000").origins().unwrap().len() == 1);
    }

    #[test]
    fn test_single_host_trims_slash() {
        let endpoints = Endpoints::single_host("http://127.0.0.1:9000/");
        assert_eq!(endpoints.vc, "http://127.0.0.1:9000");
    }
}
