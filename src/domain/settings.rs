//! 自动回复设置
//!
//! 设置以扁平 JSON 存放在数据目录的 `settings.json` 中，
//! 字段名与面板保持一致。缺失的字段取默认值。
//! 回复词典保持文件中的书写顺序，关键字匹配按这个顺序取第一个。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const MIN_INTERVAL_SECONDS: u64 = 1;
pub const MAX_INTERVAL_SECONDS: u64 = 300;
pub const MAX_REPEAT_PROTECT_TIMES: u32 = 10;

/// 触发词 → 回复，按插入顺序
pub type ReplyDict = IndexMap<String, String>;

/// 消息对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    /// 刚关注、尚未打过招呼
    NewFan,
    Fan,
    NonFan,
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::NewFan => write!(f, "新粉丝"),
            Audience::Fan => write!(f, "粉丝"),
            Audience::NonFan => write!(f, "非粉丝"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_new_fans_reply")]
    pub new_fans_reply: String,

    #[serde(default = "default_non_fans_complete")]
    pub non_fans_complete_dict: ReplyDict,
    #[serde(default = "default_non_fans_keyword")]
    pub non_fans_keyword_dict: ReplyDict,
    #[serde(default = "default_non_fans_other")]
    pub non_fans_other_reply: String,

    #[serde(default = "default_fans_complete")]
    pub fans_complete_dict: ReplyDict,
    #[serde(default = "default_fans_keyword")]
    pub fans_keyword_dict: ReplyDict,
    #[serde(default = "default_fans_other")]
    pub fans_other_reply: String,

    /// 面板访问口令，留空则不设口令
    #[serde(default = "default_token_key")]
    pub token_key: String,
    #[serde(default = "default_true")]
    pub login_remember: bool,
    /// 连续相同回复的保护次数，0 表示不保护
    #[serde(default = "default_repeat_protect", alias = "repet_protect_times")]
    pub repeat_protect_times: u32,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

/// 某一类对象的回复规则
#[derive(Debug, Clone, Copy)]
pub struct ReplyRules<'a> {
    pub complete: &'a ReplyDict,
    pub keyword: &'a ReplyDict,
    pub fallback: &'a str,
}

impl Settings {
    /// 把可调参数限制在面板允许的范围内
    pub fn normalized(mut self) -> Self {
        self.interval_seconds = self
            .interval_seconds
            .clamp(MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS);
        self.repeat_protect_times = self.repeat_protect_times.min(MAX_REPEAT_PROTECT_TIMES);
        self
    }

    /// 粉丝 / 非粉丝的回复规则；新粉丝没有匹配规则
    pub fn rules(&self, audience: Audience) -> Option<ReplyRules<'_>> {
        match audience {
            Audience::NewFan => None,
            Audience::Fan => Some(ReplyRules {
                complete: &self.fans_complete_dict,
                keyword: &self.fans_keyword_dict,
                fallback: &self.fans_other_reply,
            }),
            Audience::NonFan => Some(ReplyRules {
                complete: &self.non_fans_complete_dict,
                keyword: &self.non_fans_keyword_dict,
                fallback: &self.non_fans_other_reply,
            }),
        }
    }

    /// 面板是否需要口令
    pub fn requires_token(&self) -> bool {
        !self.token_key.is_empty()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            new_fans_reply: default_new_fans_reply(),
            non_fans_complete_dict: default_non_fans_complete(),
            non_fans_keyword_dict: default_non_fans_keyword(),
            non_fans_other_reply: default_non_fans_other(),
            fans_complete_dict: default_fans_complete(),
            fans_keyword_dict: default_fans_keyword(),
            fans_other_reply: default_fans_other(),
            token_key: default_token_key(),
            login_remember: true,
            repeat_protect_times: default_repeat_protect(),
            interval_seconds: default_interval(),
        }
    }
}

fn single(key: &str, value: &str) -> ReplyDict {
    ReplyDict::from([(key.to_string(), value.to_string())])
}

fn default_new_fans_reply() -> String {
    "感谢关注，眼光不错哟".to_string()
}

fn default_non_fans_complete() -> ReplyDict {
    single("hello", "Hi，给个关注呗")
}

fn default_non_fans_keyword() -> ReplyDict {
    single("你好", "你好吖，给个关注呗")
}

fn default_non_fans_other() -> String {
    "给个关注呗".to_string()
}

fn default_fans_complete() -> ReplyDict {
    single("hello", "Hi，感谢您的支持")
}

fn default_fans_keyword() -> ReplyDict {
    single("你好", "你好吖，感谢您的支持")
}

fn default_fans_other() -> String {
    "你好，不知道说啥，但不能啥都不回吖\n [doge] ".to_string()
}

fn default_token_key() -> String {
    "BiliMate".to_string()
}

fn default_true() -> bool {
    true
}

fn default_repeat_protect() -> u32 {
    3
}

fn default_interval() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"interval_seconds": 9}"#).unwrap();
        assert_eq!(settings.interval_seconds, 9);
        assert_eq!(settings.token_key, "BiliMate");
        assert_eq!(settings.fans_keyword_dict.get("你好").unwrap(), "你好吖，感谢您的支持");
    }

    #[test]
    fn test_dict_keeps_file_order() {
        let settings: Settings =
            serde_json::from_str(r#"{"fans_keyword_dict": {"价格": "a", "包邮": "b", "价": "c"}}"#).unwrap();
        let keys: Vec<&str> = settings.fans_keyword_dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["价格", "包邮", "价"]);

        let text = serde_json::to_string(&settings.fans_keyword_dict).unwrap();
        assert_eq!(text, r#"{"价格":"a","包邮":"b","价":"c"}"#);
    }

    #[test]
    fn test_legacy_repeat_key() {
        let settings: Settings = serde_json::from_str(r#"{"repet_protect_times": 0}"#).unwrap();
        assert_eq!(settings.repeat_protect_times, 0);
    }

    #[test]
    fn test_normalized_clamps() {
        let settings = Settings {
            interval_seconds: 0,
            repeat_protect_times: 99,
            ..Default::default()
        }
        .normalized();
        assert_eq!(settings.interval_seconds, MIN_INTERVAL_SECONDS);
        assert_eq!(settings.repeat_protect_times, MAX_REPEAT_PROTECT_TIMES);

        let slow = Settings {
            interval_seconds: 3600,
            ..Default::default()
        }
        .normalized();
        assert_eq!(slow.interval_seconds, MAX_INTERVAL_SECONDS);
    }

    #[test]
    fn test_rules_by_audience() {
        let settings = Settings::default();
        assert!(settings.rules(Audience::NewFan).is_none());
        assert_eq!(settings.rules(Audience::NonFan).unwrap().fallback, "给个关注呗");
    }
}
