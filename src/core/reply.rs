//! 回复选择
//!
//! 匹配顺序：完全匹配 → 关键字匹配 → 兜底回复，均忽略大小写。
//! 新粉丝直接使用欢迎语。

use crate::domain::{Audience, ReplyRules, Settings};

/// 回复命中的规则类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Greeting,
    Complete,
    Keyword,
    Fallback,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchKind::Greeting => write!(f, "欢迎语"),
            MatchKind::Complete => write!(f, "完全匹配"),
            MatchKind::Keyword => write!(f, "关键字匹配"),
            MatchKind::Fallback => write!(f, "兜底回复"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyChoice {
    pub text: String,
    pub matched: MatchKind,
}

/// 为一条消息选出回复；选中的回复为空时不回复
pub fn select_reply(settings: &Settings, audience: Audience, message: &str) -> Option<ReplyChoice> {
    let (text, matched) = match settings.rules(audience) {
        None => (settings.new_fans_reply.as_str(), MatchKind::Greeting),
        Some(rules) => match_rules(rules, message),
    };

    if text.trim().is_empty() {
        return None;
    }
    Some(ReplyChoice {
        text: text.to_string(),
        matched,
    })
}

fn match_rules<'a>(rules: ReplyRules<'a>, message: &str) -> (&'a str, MatchKind) {
    let lowered = message.trim().to_lowercase();

    if let Some(reply) = rules
        .complete
        .iter()
        .find(|(key, _)| key.trim().to_lowercase() == lowered)
        .map(|(_, reply)| reply)
    {
        return (reply, MatchKind::Complete);
    }

    // 多个关键字同时命中时取词典中靠前的那个
    if let Some(reply) = rules
        .keyword
        .iter()
        .find(|(key, _)| !key.is_empty() && lowered.contains(&key.to_lowercase()))
        .map(|(_, reply)| reply)
    {
        return (reply, MatchKind::Keyword);
    }

    (rules.fallback, MatchKind::Fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fan_gets_greeting_regardless_of_message() {
        let settings = Settings::default();
        let choice = select_reply(&settings, Audience::NewFan, "hello").unwrap();
        assert_eq!(choice.text, "感谢关注，眼光不错哟");
        assert_eq!(choice.matched, MatchKind::Greeting);
    }

    #[test]
    fn test_complete_match_ignores_case() {
        let settings = Settings::default();
        let choice = select_reply(&settings, Audience::Fan, "HeLLo").unwrap();
        assert_eq!(choice.text, "Hi，感谢您的支持");
        assert_eq!(choice.matched, MatchKind::Complete);
    }

    #[test]
    fn test_keyword_match() {
        let settings = Settings::default();
        let choice = select_reply(&settings, Audience::NonFan, "up主你好呀").unwrap();
        assert_eq!(choice.text, "你好吖，给个关注呗");
        assert_eq!(choice.matched, MatchKind::Keyword);
    }

    #[test]
    fn test_first_keyword_in_dict_order_wins() {
        let mut settings = Settings::default();
        settings.fans_keyword_dict.clear();
        settings.fans_keyword_dict.insert("价格".into(), "看简介".into());
        settings.fans_keyword_dict.insert("价".into(), "short".into());
        settings.fans_keyword_dict.insert("价格多少".into(), "long".into());

        let choice = select_reply(&settings, Audience::Fan, "请问价格多少").unwrap();
        assert_eq!(choice.text, "看简介");

        settings.fans_keyword_dict.shift_remove("价格");
        let choice = select_reply(&settings, Audience::Fan, "请问价格多少").unwrap();
        assert_eq!(choice.text, "short");
    }

    #[test]
    fn test_fallback() {
        let settings = Settings::default();
        let choice = select_reply(&settings, Audience::NonFan, "在吗").unwrap();
        assert_eq!(choice.text, "给个关注呗");
        assert_eq!(choice.matched, MatchKind::Fallback);
    }

    #[test]
    fn test_empty_reply_means_no_reply() {
        let settings = Settings {
            fans_other_reply: "  ".into(),
            ..Default::default()
        };
        assert!(select_reply(&settings, Audience::Fan, "在吗").is_none());
    }

    #[test]
    fn test_hello_in_sentence_is_not_complete_match() {
        let settings = Settings::default();
        let choice = select_reply(&settings, Audience::Fan, "hello there").unwrap();
        assert_eq!(choice.matched, MatchKind::Fallback);
    }
}
