//! 面板访问认证
//!
//! 口令校验通过后签发 JWT 会话令牌。签名密钥混入当前口令，
//! 修改口令后旧令牌全部失效。

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// 会话有效期：7 天
pub const SESSION_TTL_SECS: u64 = 3600 * 24 * 7;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtService {
    secret: String,
    algorithm: Algorithm,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            algorithm: Algorithm::HS256,
        }
    }

    fn signing_secret(&self, token_key: &str) -> Vec<u8> {
        format!("{}:{}", self.secret, token_key).into_bytes()
    }

    /// 为当前口令签发会话令牌
    pub fn generate_token(&self, token_key: &str) -> Result<String> {
        let expiration = (chrono::Utc::now().timestamp() as u64 + SESSION_TTL_SECS) as usize;
        let claims = Claims {
            sub: "dashboard".to_string(),
            exp: expiration,
        };
        let key = EncodingKey::from_secret(&self.signing_secret(token_key));
        Ok(encode(&Header::new(self.algorithm), &claims, &key)?)
    }

    pub fn validate_token(&self, token: &str, token_key: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;

        let key = DecodingKey::from_secret(&self.signing_secret(token_key));
        let token_data = decode::<Claims>(token, &key, &validation)?;
        Ok(token_data.claims)
    }
}

/// 比较口令，避免按前缀提前返回
pub fn passphrase_matches(input: &str, expected: &str) -> bool {
    let a = input.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let jwt = JwtService::new("secret");
        let token = jwt.generate_token("BiliMate").unwrap();
        let claims = jwt.validate_token(&token, "BiliMate").unwrap();
        assert_eq!(claims.sub, "dashboard");
    }

    #[test]
    fn test_changed_passphrase_invalidates_token() {
        let jwt = JwtService::new("secret");
        let token = jwt.generate_token("old").unwrap();
        assert!(jwt.validate_token(&token, "new").is_err());
    }

    #[test]
    fn test_passphrase_matches() {
        assert!(passphrase_matches("BiliMate", "BiliMate"));
        assert!(!passphrase_matches("BiliMat", "BiliMate"));
        assert!(!passphrase_matches("bilimate", "BiliMate"));
    }
}
