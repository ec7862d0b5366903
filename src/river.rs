//! 리버 레이스 투영과 경쟁 기간 종료 시각 캐시
//!
//! 종료 시각은 기간(periodIndex)이 바뀔 때 정확히 한 번만 계산합니다.
//! 폴링마다 다시 계산하면 매 사이클 종료 시각이 앞으로 밀리는 드리프트가
//! 생기므로, 같은 기간 안에서는 저장된 문자열을 그대로 재사용합니다.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::clock;
use crate::royale::models::{RawParticipant, RawRiverClan, RawRiverRace};

/// 일일 마감 시각: 10:00 IST
const DAILY_CUTOFF: (u32, u32) = (10, 0);

/// `river/period`에 저장되는 기간 상태
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodState {
    pub period_index: i64,
    pub end_time: String,
}

/// 현재 기간의 종료 시각을 결정합니다.
///
/// 저장된 상태가 같은 기간을 가리키면 저장된 값을 그대로 반환하고
/// (벽시계가 흘렀어도 재계산하지 않음), 기간이 바뀌었을 때만 새로
/// 도출합니다.
pub fn period_end_time(
    stored: Option<&PeriodState>,
    current_index: i64,
    now: DateTime<Utc>,
) -> PeriodState {
    if let Some(state) = stored {
        if state.period_index == current_index && !state.end_time.is_empty() {
            return state.clone();
        }
    }

    PeriodState {
        period_index: current_index,
        end_time: derive_end_time(now),
    }
}

/// now 이후 첫 일일 마감 시각 (10:00 IST), API의 고정폭 UTC 형식으로
///
/// 오늘 마감이 이미 지났으면 (같더라도) 내일 마감으로 넘깁니다.
pub fn derive_end_time(now: DateTime<Utc>) -> String {
    let ist = clock::ist();
    let local = now.with_timezone(&ist);

    let cutoff_time = NaiveTime::from_hms_opt(DAILY_CUTOFF.0, DAILY_CUTOFF.1, 0).unwrap();
    let mut cutoff = ist
        .from_local_datetime(&local.date_naive().and_time(cutoff_time))
        .unwrap();

    if cutoff <= local {
        cutoff = cutoff + Duration::days(1);
    }

    cutoff
        .with_timezone(&Utc)
        .format("%Y%m%dT%H%M%S%.3fZ")
        .to_string()
}

/// `river/current`에 저장되는 리버 레이스 스냅샷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiverRaceSnapshot {
    pub race_id: String,
    pub state: Option<String>,
    pub section_index: i64,
    pub period_index: i64,
    pub period_type: Option<String>,
    pub end_time: String,
    pub all_clans: Vec<RiverClan>,
}

impl RiverRaceSnapshot {
    pub fn project(raw: &RawRiverRace, end_time: String) -> Self {
        Self {
            race_id: format!("{}-{}", raw.section_index, raw.period_index),
            state: raw.state.clone(),
            section_index: raw.section_index,
            period_index: raw.period_index,
            period_type: raw.period_type.clone(),
            end_time,
            all_clans: raw.clans.iter().map(RiverClan::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiverClan {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub badge_id: Option<i64>,
    pub clan_score: Option<i64>,
    pub fame: Option<i64>,
    pub repair_points: Option<i64>,
    pub finish_time: Option<String>,
    pub period_points: Option<i64>,
    pub participants: Vec<RiverParticipant>,
}

impl From<&RawRiverClan> for RiverClan {
    fn from(value: &RawRiverClan) -> Self {
        Self {
            tag: value.tag.clone(),
            name: value.name.clone(),
            badge_id: value.badge_id,
            clan_score: value.clan_score,
            fame: value.fame,
            repair_points: value.repair_points,
            finish_time: value.finish_time.clone(),
            period_points: value.period_points,
            participants: value
                .participants
                .iter()
                .map(RiverParticipant::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiverParticipant {
    pub tag: Option<String>,
    pub name: Option<String>,
    pub fame: Option<i64>,
    pub repair_points: Option<i64>,
    pub boat_attacks: Option<i64>,
    pub decks_used: Option<i64>,
    pub decks_used_today: Option<i64>,
}

impl From<&RawParticipant> for RiverParticipant {
    fn from(value: &RawParticipant) -> Self {
        Self {
            tag: value.tag.clone(),
            name: value.name.clone(),
            fame: value.fame,
            repair_points: value.repair_points,
            boat_attacks: value.boat_attacks,
            decks_used: value.decks_used,
            decks_used_today: value.decks_used_today,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn end_time_before_cutoff_is_same_day() {
        // 07:30 IST -> 오늘 10:00 IST == 04:30 UTC
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 2, 0, 0).unwrap();
        assert_eq!(derive_end_time(now), "20260823T043000.000Z");
    }

    #[test]
    fn end_time_at_or_after_cutoff_rolls_to_tomorrow() {
        // 정확히 10:00 IST: "strictly after now"이므로 내일로
        let at_cutoff = Utc.with_ymd_and_hms(2026, 8, 23, 4, 30, 0).unwrap();
        assert_eq!(derive_end_time(at_cutoff), "20260824T043000.000Z");

        let past_cutoff = Utc.with_ymd_and_hms(2026, 8, 23, 12, 0, 0).unwrap();
        assert_eq!(derive_end_time(past_cutoff), "20260824T043000.000Z");
    }

    #[test]
    fn same_period_reuses_stored_end_time_verbatim() {
        let stored = PeriodState {
            period_index: 3,
            end_time: "20260823T043000.000Z".to_string(),
        };

        // 벽시계가 한참 흘렀어도 저장된 값이 그대로 돌아와야 함
        let later = Utc.with_ymd_and_hms(2026, 8, 23, 23, 0, 0).unwrap();
        let first = period_end_time(Some(&stored), 3, later);
        let second = period_end_time(Some(&first), 3, later + Duration::hours(2));

        assert_eq!(first, stored);
        assert_eq!(second, stored);
    }

    #[test]
    fn period_transition_recomputes_strictly_later() {
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 2, 0, 0).unwrap();
        let first = period_end_time(None, 3, now);
        assert_eq!(first.end_time, "20260823T043000.000Z");

        // 기간 전환은 마감 이후에 관측되므로 now가 이전 마감을 지난 상태
        let after = Utc.with_ymd_and_hms(2026, 8, 23, 5, 0, 0).unwrap();
        let next = period_end_time(Some(&first), 4, after);

        assert_eq!(next.period_index, 4);
        assert!(next.end_time > first.end_time);
    }

    #[test]
    fn missing_stored_end_time_is_recomputed() {
        let stored = PeriodState {
            period_index: 3,
            end_time: String::new(),
        };
        let now = Utc.with_ymd_and_hms(2026, 8, 23, 2, 0, 0).unwrap();
        let state = period_end_time(Some(&stored), 3, now);
        assert_eq!(state.end_time, "20260823T043000.000Z");
    }

    #[test]
    fn race_id_combines_section_and_period() {
        let raw: RawRiverRace = serde_json::from_str(
            r#"{"state": "full", "sectionIndex": 12, "periodIndex": 38,
                "periodType": "warDay", "clans": []}"#,
        )
        .unwrap();
        let snapshot = RiverRaceSnapshot::project(&raw, "20260823T043000.000Z".into());

        assert_eq!(snapshot.race_id, "12-38");
        assert_eq!(snapshot.period_index, 38);
    }
}
