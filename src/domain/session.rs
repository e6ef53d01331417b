//! 私信会话模型

use serde::{Deserialize, Serialize};

/// 文本消息类型
pub const TEXT_MSG_TYPE: i64 = 1;

/// 会话列表中的一项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub talker_id: u64,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub last_msg: Option<LastMessage>,
}

/// 会话的最后一条消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    #[serde(default)]
    pub sender_uid: u64,
    #[serde(default)]
    pub msg_type: i64,
    /// 文本消息时为 `{"content": "..."}` 形式的 JSON 字符串
    #[serde(default)]
    pub content: String,
}

impl LastMessage {
    /// 解出消息文本；非文本消息返回空串
    pub fn text(&self) -> String {
        if self.msg_type != TEXT_MSG_TYPE && self.msg_type != 0 {
            return String::new();
        }
        match serde_json::from_str::<serde_json::Value>(&self.content) {
            Ok(value) => value
                .get("content")
                .and_then(|c| c.as_str())
                .map(str::to_string)
                .unwrap_or_default(),
            Err(_) => self.content.clone(),
        }
    }
}

impl Session {
    /// 有未读，且最后一条不是自己发出的
    pub fn needs_reply(&self, my_mid: u64) -> bool {
        match &self.last_msg {
            Some(msg) => self.unread_count > 0 && msg.sender_uid != my_mid,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_deserialization() {
        let json_str = r#"{
            "talker_id": 42,
            "unread_count": 2,
            "last_msg": {
                "sender_uid": 42,
                "msg_type": 1,
                "content": "{\"content\":\"你好呀\"}"
            }
        }"#;
        let session: Session = serde_json::from_str(json_str).unwrap();
        assert_eq!(session.talker_id, 42);
        assert_eq!(session.last_msg.unwrap().text(), "你好呀");
    }

    #[test]
    fn test_non_text_message_is_empty() {
        let msg = LastMessage {
            sender_uid: 1,
            msg_type: 2,
            content: "{\"url\":\"https://i0.hdslb.com/x.png\"}".to_string(),
        };
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn test_raw_content_fallback() {
        let msg = LastMessage {
            sender_uid: 1,
            msg_type: 1,
            content: "plain".to_string(),
        };
        assert_eq!(msg.text(), "plain");
    }

    #[test]
    fn test_needs_reply() {
        let session = Session {
            talker_id: 5,
            unread_count: 1,
            last_msg: Some(LastMessage {
                sender_uid: 99,
                msg_type: 1,
                content: String::new(),
            }),
        };
        assert!(!session.needs_reply(99));
        assert!(session.needs_reply(100));

        let read = Session {
            unread_count: 0,
            ..session
        };
        assert!(!read.needs_reply(100));
    }
}
