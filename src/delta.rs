//! 일 단위 누적 델타 엔진
//!
//! 폴링 간 관측된 변화량만 누적합니다. 카운터 자체가 업스트림에서
//! 리셋되어도 (폴링이 리셋보다 잦은 한) 누적치가 망가지지 않습니다:
//! `delta_new = current - last_stored + delta_stored_prev`
//!
//! 기준점(Baseline)은 명시적 타입입니다. 날짜 비교를 갱신 경로 곳곳에
//! 흩뿌리는 대신, 호출자가 오늘 날짜와 저장된 메타로 Baseline을 한 번
//! 만들어 넘깁니다.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `<metric>Delta` / `last<Metric>` 키 쌍
fn metric_keys(metric: &str) -> (String, String) {
    let mut capitalized = String::with_capacity(metric.len());
    let mut chars = metric.chars();
    if let Some(first) = chars.next() {
        capitalized.extend(first.to_uppercase());
        capitalized.push_str(chars.as_str());
    }
    (format!("{}Delta", metric), format!("last{}", capitalized))
}

/// 델타 파일 공통 메타
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaMeta {
    /// 마지막 리셋이 일어난 현지 달력 날짜 (IST)
    #[serde(rename = "lastReset")]
    pub last_reset: Option<NaiveDate>,
}

/// 한 스코프의 누적 델타와 직전 스냅샷 값들
///
/// 평탄한 `<metric>Delta` / `last<Metric>` 정수 키로 직렬화됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterSet(BTreeMap<String, i64>);

#[cfg(test)]
impl CounterSet {
    pub fn delta(&self, metric: &str) -> i64 {
        let (delta_key, _) = metric_keys(metric);
        self.0.get(&delta_key).copied().unwrap_or(0)
    }

    pub fn last(&self, metric: &str) -> Option<i64> {
        let (_, last_key) = metric_keys(metric);
        self.0.get(&last_key).copied()
    }
}

/// 누적 계산의 명시적 기준점
///
/// 날짜가 바뀌었거나 저장된 기록이 없으면 `Fresh`: 모든 메트릭의
/// 직전 값은 현재 값, 누적치는 0으로 간주되어 첫 폴링의 델타는
/// 항상 0이 됩니다.
#[derive(Debug, Clone, Copy)]
pub enum Baseline<'a> {
    Fresh,
    Carried(&'a CounterSet),
}

impl<'a> Baseline<'a> {
    /// 저장된 메타의 리셋 날짜가 오늘과 같을 때만 이월합니다.
    pub fn resolve(
        today: NaiveDate,
        last_reset: Option<NaiveDate>,
        prior: Option<&'a CounterSet>,
    ) -> Self {
        match prior {
            Some(counters) if last_reset == Some(today) => Baseline::Carried(counters),
            _ => Baseline::Fresh,
        }
    }
}

/// 현재 스냅샷 값들로 새 누적 레코드를 계산합니다.
///
/// API 응답에 없는 메트릭은 호출자가 0으로 넘깁니다. 델타는 부호 있는
/// 정수이며 음수로 내려갈 수 있습니다 (업스트림 리셋 직후의 일시적
/// 음수는 다음 폴링에서 자가 교정됨).
pub fn accumulate(baseline: Baseline<'_>, current: &[(&str, i64)]) -> CounterSet {
    let mut out = BTreeMap::new();

    for &(metric, value) in current {
        let (delta_key, last_key) = metric_keys(metric);
        let (prev_last, prev_delta) = match baseline {
            Baseline::Carried(prior) => (
                prior.0.get(&last_key).copied().unwrap_or(value),
                prior.0.get(&delta_key).copied().unwrap_or(0),
            ),
            Baseline::Fresh => (value, 0),
        };

        out.insert(delta_key, value - prev_last + prev_delta);
        out.insert(last_key, value);
    }

    CounterSet(out)
}

/// 클랜 전체 스코프의 델타 파일 (`clan/info_deltas`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClanDeltaFile {
    #[serde(rename = "_meta")]
    pub meta: DeltaMeta,
    // Firebase는 빈 오브젝트를 저장하지 않으므로 누락 허용
    #[serde(default)]
    pub delta: CounterSet,
}

impl ClanDeltaFile {
    pub fn compute(
        today: NaiveDate,
        previous: Option<&ClanDeltaFile>,
        current: &[(&str, i64)],
    ) -> Self {
        let baseline = Baseline::resolve(
            today,
            previous.and_then(|p| p.meta.last_reset),
            previous.map(|p| &p.delta),
        );

        Self {
            meta: DeltaMeta {
                last_reset: Some(today),
            },
            delta: accumulate(baseline, current),
        }
    }
}

/// 멤버 한 명의 누적 델타 레코드
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDelta {
    pub tag: String,
    pub name: Option<String>,
    #[serde(flatten)]
    pub counters: CounterSet,
}

/// 멤버 태그별 델타 파일 (`members/deltas`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberDeltaFile {
    #[serde(rename = "_meta")]
    pub meta: DeltaMeta,
    #[serde(default)]
    pub deltas: Vec<MemberDelta>,
}

/// 한 멤버의 현재 스냅샷 관측치
pub struct MemberObservation {
    pub tag: String,
    pub name: Option<String>,
    pub metrics: Vec<(&'static str, i64)>,
}

impl MemberDeltaFile {
    /// 현재 로스터 기준으로 재계산합니다. 로스터에서 빠진 멤버의
    /// 레코드는 이월되지 않고 그대로 사라집니다.
    pub fn compute(
        today: NaiveDate,
        previous: Option<&MemberDeltaFile>,
        roster: &[MemberObservation],
    ) -> Self {
        let carried_day = previous
            .map(|p| p.meta.last_reset == Some(today))
            .unwrap_or(false);

        let prior_by_tag: BTreeMap<&str, &CounterSet> = if carried_day {
            previous
                .map(|p| {
                    p.deltas
                        .iter()
                        .map(|d| (d.tag.as_str(), &d.counters))
                        .collect()
                })
                .unwrap_or_default()
        } else {
            BTreeMap::new()
        };

        let deltas = roster
            .iter()
            .map(|member| {
                let baseline = match prior_by_tag.get(member.tag.as_str()) {
                    Some(counters) => Baseline::Carried(counters),
                    None => Baseline::Fresh,
                };

                MemberDelta {
                    tag: member.tag.clone(),
                    name: member.name.clone(),
                    counters: accumulate(baseline, &member.metrics),
                }
            })
            .collect();

        Self {
            meta: DeltaMeta {
                last_reset: Some(today),
            },
            deltas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn fresh_baseline_nets_zero_delta() {
        let counters = accumulate(Baseline::Fresh, &[("donations", 120)]);
        assert_eq!(counters.delta("donations"), 0);
        assert_eq!(counters.last("donations"), Some(120));
    }

    #[test]
    fn carried_baseline_accumulates_change() {
        // 스펙 예시: last=100, delta=50, 현재 120 -> delta 70
        let prior = accumulate(Baseline::Fresh, &[("donations", 100)]);
        let prior = CounterSet({
            let mut map = prior.0;
            map.insert("donationsDelta".into(), 50);
            map
        });

        let counters = accumulate(Baseline::Carried(&prior), &[("donations", 120)]);
        assert_eq!(counters.delta("donations"), 70);
        assert_eq!(counters.last("donations"), Some(120));
    }

    #[test]
    fn telescoping_over_many_polls() {
        // 업스트림 리셋이 없으면 N회 폴링의 누적치는 최종값 - 최초값
        let observed = [1000, 1003, 1003, 1010, 1007, 1021];
        let mut counters = accumulate(Baseline::Fresh, &[("trophies", observed[0])]);

        for value in &observed[1..] {
            counters = accumulate(Baseline::Carried(&counters), &[("trophies", *value)]);
        }

        assert_eq!(counters.delta("trophies"), observed[5] - observed[0]);
    }

    #[test]
    fn upstream_reset_goes_negative_then_self_corrects() {
        let counters = accumulate(Baseline::Fresh, &[("donations", 300)]);
        // 업스트림이 카운터를 0으로 리셋
        let counters = accumulate(Baseline::Carried(&counters), &[("donations", 0)]);
        assert_eq!(counters.delta("donations"), -300);

        // 이후 폴링은 리셋된 값 기준으로 누적 재개
        let counters = accumulate(Baseline::Carried(&counters), &[("donations", 40)]);
        assert_eq!(counters.delta("donations"), -260);
    }

    #[test]
    fn day_boundary_discards_previous_record() {
        let yesterday = ClanDeltaFile::compute(
            day("2026-08-22"),
            None,
            &[("clanScore", 50_000)],
        );
        let yesterday = ClanDeltaFile::compute(
            day("2026-08-22"),
            Some(&yesterday),
            &[("clanScore", 50_400)],
        );
        assert_eq!(yesterday.delta.delta("clanScore"), 400);

        // 다음 날 첫 폴링은 어떤 현재 값이든 델타 0으로 시작
        let next = ClanDeltaFile::compute(
            day("2026-08-23"),
            Some(&yesterday),
            &[("clanScore", 50_700)],
        );
        assert_eq!(next.meta.last_reset, Some(day("2026-08-23")));
        assert_eq!(next.delta.delta("clanScore"), 0);
        assert_eq!(next.delta.last("clanScore"), Some(50_700));
    }

    #[test]
    fn departed_member_is_dropped() {
        let today = day("2026-08-23");
        let roster = vec![
            MemberObservation {
                tag: "#AAA".into(),
                name: Some("Alice".into()),
                metrics: vec![("donations", 10)],
            },
            MemberObservation {
                tag: "#BBB".into(),
                name: Some("Bob".into()),
                metrics: vec![("donations", 20)],
            },
        ];
        let file = MemberDeltaFile::compute(today, None, &roster);
        assert_eq!(file.deltas.len(), 2);

        let smaller = vec![MemberObservation {
            tag: "#BBB".into(),
            name: Some("Bob".into()),
            metrics: vec![("donations", 25)],
        }];
        let file = MemberDeltaFile::compute(today, Some(&file), &smaller);

        assert_eq!(file.deltas.len(), 1);
        assert_eq!(file.deltas[0].tag, "#BBB");
        assert_eq!(file.deltas[0].counters.delta("donations"), 5);
    }

    #[test]
    fn new_member_mid_day_starts_fresh() {
        let today = day("2026-08-23");
        let file = MemberDeltaFile::compute(
            today,
            None,
            &[MemberObservation {
                tag: "#AAA".into(),
                name: None,
                metrics: vec![("trophies", 4000)],
            }],
        );

        let roster = vec![
            MemberObservation {
                tag: "#AAA".into(),
                name: None,
                metrics: vec![("trophies", 4100)],
            },
            MemberObservation {
                tag: "#CCC".into(),
                name: None,
                metrics: vec![("trophies", 3000)],
            },
        ];
        let file = MemberDeltaFile::compute(today, Some(&file), &roster);

        assert_eq!(file.deltas[0].counters.delta("trophies"), 100);
        assert_eq!(file.deltas[1].counters.delta("trophies"), 0);
    }

    #[test]
    fn wire_format_matches_store_schema() {
        let file = ClanDeltaFile::compute(
            day("2026-08-23"),
            None,
            &[("clanScore", 50_000), ("clanWarTrophies", 2_500)],
        );
        let json = serde_json::to_value(&file).unwrap();

        assert_eq!(json["_meta"]["lastReset"], "2026-08-23");
        assert_eq!(json["delta"]["clanScoreDelta"], 0);
        assert_eq!(json["delta"]["lastClanScore"], 50_000);
        assert_eq!(json["delta"]["lastClanWarTrophies"], 2_500);
    }
}
