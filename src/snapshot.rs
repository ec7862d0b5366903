//! 저장 스키마로의 스냅샷 투영
//!
//! API 원본 엔티티에서 저장 스키마에 없는 필드를 버리고, 누락된
//! 소스 필드는 (델타 추적 카운터가 아닌 한) null로 직렬화합니다.
//! 순수 변환이며, 변경 감지는 정규화된 출력의 값 내용에만 의존합니다.

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::royale::models::{RawClan, RawMember};

/// `clan/info`에 저장되는 클랜 스냅샷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClanInfo {
    pub tag: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub clan_type: Option<String>,
    pub description: Option<String>,
    pub badge_id: Option<i64>,
    pub badge_urls: Option<Value>,
    pub members: Option<i64>,
    pub required_trophies: Option<i64>,
    pub clan_score: i64,
    pub clan_war_trophies: i64,
    pub donations_per_week: i64,
    pub clan_chest_status: Option<String>,
    pub clan_chest_level: Option<i64>,
    pub clan_chest_max_level: Option<i64>,
    pub clan_chest_points: i64,
    pub location: Option<Value>,
}

impl From<RawClan> for ClanInfo {
    fn from(value: RawClan) -> Self {
        Self {
            tag: value.tag,
            name: value.name,
            clan_type: value.clan_type,
            description: value.description,
            badge_id: value.badge_id,
            badge_urls: value.badge_urls,
            members: value.members,
            required_trophies: value.required_trophies,
            clan_score: value.clan_score,
            clan_war_trophies: value.clan_war_trophies,
            donations_per_week: value.donations_per_week,
            clan_chest_status: value.clan_chest_status,
            clan_chest_level: value.clan_chest_level,
            clan_chest_max_level: value.clan_chest_max_level,
            clan_chest_points: value.clan_chest_points,
            location: value.location,
        }
    }
}

/// `members/list`에 저장되는 멤버 스냅샷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub tag: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub arena: Option<Value>,
    pub last_seen_epoch: Option<i64>,
    pub exp_level: Option<i64>,
    pub trophies: i64,
    pub clan_rank: Option<i64>,
    pub previous_clan_rank: Option<i64>,
    pub donations: i64,
    pub donations_received: i64,
}

impl From<RawMember> for MemberInfo {
    fn from(value: RawMember) -> Self {
        Self {
            tag: value.tag,
            name: value.name,
            role: value.role,
            arena: value.arena,
            last_seen_epoch: value.last_seen.as_deref().and_then(to_epoch),
            exp_level: value.exp_level,
            trophies: value.trophies,
            clan_rank: value.clan_rank,
            previous_clan_rank: value.previous_clan_rank,
            donations: value.donations,
            donations_received: value.donations_received,
        }
    }
}

/// API 타임스탬프(`20260823T101010.000Z`)를 Unix 초로 변환
///
/// 파싱할 수 없으면 None (null로 저장됨).
pub fn to_epoch(timestamp: &str) -> Option<i64> {
    if let Ok(parsed) =
        chrono::NaiveDateTime::parse_from_str(timestamp, "%Y%m%dT%H%M%S%.3fZ")
    {
        return Some(parsed.and_utc().timestamp());
    }

    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_epoch_parses_api_compact_format() {
        assert_eq!(to_epoch("20260823T101010.000Z"), Some(1_787_479_810));
    }

    #[test]
    fn to_epoch_rejects_garbage() {
        assert_eq!(to_epoch("not-a-timestamp"), None);
        assert_eq!(to_epoch(""), None);
    }

    #[test]
    fn missing_fields_serialize_as_null_not_zero() {
        let raw: RawMember = serde_json::from_str(r##"{"tag": "#AAA"}"##).unwrap();
        let info = MemberInfo::from(raw);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["name"], serde_json::Value::Null);
        assert_eq!(json["expLevel"], serde_json::Value::Null);
        assert_eq!(json["lastSeenEpoch"], serde_json::Value::Null);
        // 델타 추적 카운터는 0으로
        assert_eq!(json["trophies"], 0);
        assert_eq!(json["donations"], 0);
    }

    #[test]
    fn clan_projection_drops_unknown_fields() {
        let raw: RawClan = serde_json::from_str(
            r##"{"tag": "#RG2VL88G", "name": "Test", "clanScore": 51000,
                "memberList": [{"tag": "#X"}], "clanWarTrophies": 2400}"##,
        )
        .unwrap();
        let json = serde_json::to_value(ClanInfo::from(raw)).unwrap();

        assert_eq!(json["tag"], "#RG2VL88G");
        assert_eq!(json["clanScore"], 51_000);
        assert!(json.get("memberList").is_none());
    }
}
