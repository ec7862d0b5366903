//! Clash Royale API 원본 응답 타입
//!
//! 저장 스키마로 투영되기 전의 응답 형태를 그대로 받습니다. 델타 추적
//! 대상 카운터는 누락 시 0, 그 외 필드는 누락 시 null로 취급합니다.

use serde::Deserialize;
use serde_json::Value;

/// `/clans/{tag}` 응답
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClan {
    pub tag: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub clan_type: Option<String>,
    pub description: Option<String>,
    pub badge_id: Option<i64>,
    pub badge_urls: Option<Value>,
    pub members: Option<i64>,
    pub required_trophies: Option<i64>,
    #[serde(default)]
    pub clan_score: i64,
    #[serde(default)]
    pub clan_war_trophies: i64,
    #[serde(default)]
    pub donations_per_week: i64,
    pub clan_chest_status: Option<String>,
    pub clan_chest_level: Option<i64>,
    pub clan_chest_max_level: Option<i64>,
    #[serde(default)]
    pub clan_chest_points: i64,
    pub location: Option<Value>,
}

/// `/clans/{tag}/members` 응답 래퍼
#[derive(Debug, Clone, Deserialize)]
pub struct RawMemberList {
    #[serde(default)]
    pub items: Vec<RawMember>,
}

/// 클랜 멤버 한 명
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMember {
    pub tag: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub arena: Option<Value>,
    /// `%Y%m%dT%H%M%S.%3fZ` 형식의 UTC 타임스탬프
    pub last_seen: Option<String>,
    pub exp_level: Option<i64>,
    #[serde(default)]
    pub trophies: i64,
    pub clan_rank: Option<i64>,
    pub previous_clan_rank: Option<i64>,
    #[serde(default)]
    pub donations: i64,
    #[serde(default)]
    pub donations_received: i64,
}

/// `/clans/{tag}/currentriverrace` 응답
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRiverRace {
    pub state: Option<String>,
    #[serde(default)]
    pub section_index: i64,
    #[serde(default)]
    pub period_index: i64,
    pub period_type: Option<String>,
    #[serde(default)]
    pub clans: Vec<RawRiverClan>,
}

/// 리버 레이스에 참가 중인 클랜
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRiverClan {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub badge_id: Option<i64>,
    pub clan_score: Option<i64>,
    pub fame: Option<i64>,
    pub repair_points: Option<i64>,
    pub finish_time: Option<String>,
    pub period_points: Option<i64>,
    #[serde(default)]
    pub participants: Vec<RawParticipant>,
}

/// 리버 레이스 참가자
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParticipant {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub fame: Option<i64>,
    pub repair_points: Option<i64>,
    pub boat_attacks: Option<i64>,
    pub decks_used: Option<i64>,
    pub decks_used_today: Option<i64>,
}
