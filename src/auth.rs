/// 연결 인증
/// WebSocket 업그레이드 시 전달된 토큰으로 참가자 신원과 역할을 확인한다.
// region:    --- Imports
use crate::bidding::model::Role;
use crate::error::AuctionError;
use jwt_simple::{
    algorithms::{HS256Key, MACLike},
    claims::Claims,
    prelude::Duration,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

// endregion: --- Imports

// region:    --- Identity
/// 인증된 참가자 신원
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub participant_id: i64,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// 토큰의 사용자 정의 클레임
#[derive(Serialize, Deserialize)]
pub struct AuctionClaims {
    pub username: String,
    pub name: String,
    /// 역할은 이 값 하나로만 판단한다.
    #[serde(default)]
    pub admin: bool,
}

// endregion: --- Identity

// region:    --- JWT Verifier
/// HS256 토큰 검증기
#[derive(Clone)]
pub struct JwtVerifier(HS256Key);

impl JwtVerifier {
    pub fn from(secret: &str) -> Self {
        Self(HS256Key::from_bytes(secret.as_bytes()))
    }

    /// 토큰 검증 후 신원 반환
    pub fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuctionError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuctionError::Unauthenticated)?;
        let claims = self
            .0
            .verify_token::<AuctionClaims>(token, None)
            .map_err(|e| {
                warn!("{:<12} --> 토큰 검증 실패: {}", "Auth", e);
                AuctionError::Unauthenticated
            })?;

        let participant_id = claims
            .subject
            .as_deref()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(AuctionError::Unauthenticated)?;

        Ok(Identity {
            participant_id,
            username: claims.custom.username,
            name: claims.custom.name,
            role: if claims.custom.admin {
                Role::Admin
            } else {
                Role::Bidder
            },
        })
    }

    /// 토큰 발급 (운영 도구, 테스트용)
    pub fn issue(&self, identity: &Identity, valid_hours: u64) -> Result<String, jwt_simple::Error> {
        let claims = Claims::with_custom_claims(
            AuctionClaims {
                username: identity.username.clone(),
                name: identity.name.clone(),
                admin: identity.is_admin(),
            },
            Duration::from_hours(valid_hours),
        )
        .with_subject(identity.participant_id.to_string());
        self.0.authenticate(claims)
    }
}

// endregion: --- JWT Verifier
