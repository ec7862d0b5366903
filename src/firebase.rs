//! Firebase Realtime Database REST 클라이언트
//!
//! 경로 주소 방식의 JSON 트리에 대해 get / put / patch를 제공합니다.
//! `set_if_changed`는 정규화된 컨텐츠 지문을 비교하여 내용이 같으면
//! 쓰기를 생략합니다. 읽기 실패는 "이전 값 없음"으로 취급하고 (빈 저장소
//! 에서 자가 복구하기 위함), 쓰기 실패는 에러로 전파됩니다.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::Firebase as FirebaseConfig;

// 저장 경로
pub const CLAN_INFO_PATH: &str = "clan/info";
pub const CLAN_INFO_DELTA_PATH: &str = "clan/info_deltas";
pub const CLAN_MEMBERS_PATH: &str = "members/list";
pub const CLAN_MEMBERS_DELTA_PATH: &str = "members/deltas";
pub const PLAYER_INFO_REQUEST_PATH: &str = "players/request";
pub const PLAYER_INFO_PATH: &str = "players/info";
pub const CURRENT_RIVER_PATH: &str = "river/current";
pub const RIVER_PERIOD_PATH: &str = "river/period";
pub const RIVER_RACE_LOG_PATH: &str = "river/log";
pub const UPDATES_PATH: &str = "updates";

pub struct FirebaseClient {
    config: FirebaseConfig,
    http: reqwest::Client,
}

impl FirebaseClient {
    pub fn new(config: FirebaseConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}.json", self.config.root, path)
    }

    /// 경로의 현재 값 조회. 실패는 None으로 축소됩니다.
    pub async fn get(&self, path: &str) -> Option<Value> {
        let response = match self
            .http
            .get(self.url(path))
            .timeout(Duration::from_secs(20))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("firebase read error at {}: {}", path, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!("firebase read {} returned {}", path, response.status());
            return None;
        }

        match response.json::<Value>().await {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("firebase read {} returned invalid json: {}", path, e);
                None
            }
        }
    }

    /// 경로 전체 교체
    pub async fn put<T: Serialize>(&self, path: &str, data: &T) -> anyhow::Result<()> {
        let response = self
            .http
            .put(self.url(path))
            .json(data)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .with_context(|| format!("could not write {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("firebase write {} failed: {} - {}", path, status, body);
        }

        Ok(())
    }

    /// 경로 부분 갱신. 저장소 표면의 세 기본 연산 중 하나로 유지하며,
    /// 현재 호출처는 없습니다 (모든 쓰기가 전체 교체이므로).
    #[allow(unused)]
    pub async fn patch<T: Serialize>(&self, path: &str, data: &T) -> anyhow::Result<()> {
        let response = self
            .http
            .patch(self.url(path))
            .json(data)
            .timeout(Duration::from_secs(20))
            .send()
            .await
            .with_context(|| format!("could not patch {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("firebase patch {} failed: {} - {}", path, status, body);
        }

        Ok(())
    }

    /// 내용이 달라졌을 때만 쓰기. 실제로 썼으면 true를 반환합니다.
    pub async fn set_if_changed<T: Serialize>(
        &self,
        path: &str,
        data: &T,
    ) -> anyhow::Result<bool> {
        let new_value = serde_json::to_value(data)?;
        let old_value = self.get(path).await;

        if !needs_write(old_value.as_ref(), &new_value) {
            return Ok(false);
        }

        self.put(path, &new_value).await?;
        Ok(true)
    }

    /// 이번 사이클에 변경된 경로 목록을 감사 레코드로 기록
    pub async fn write_updates(&self, files: &[String]) -> anyhow::Result<()> {
        self.put(
            UPDATES_PATH,
            &serde_json::json!({
                "updatedFiles": files,
                "timestamp": Utc::now().timestamp_millis(),
            }),
        )
        .await
    }
}

/// 쓰기가 필요한지 판단. 기존 값이 없으면 항상 씁니다.
pub fn needs_write(old: Option<&Value>, new: &Value) -> bool {
    match old {
        Some(old) => fingerprint(old) != fingerprint(new),
        None => true,
    }
}

/// 키 순서와 무관한 컨텐츠 지문 (정규화 후 SHA-256)
pub fn fingerprint(value: &Value) -> [u8; 32] {
    let canonical = canonicalize(value);
    let serialized = serde_json::to_vec(&canonical).expect("canonical json is serializable");
    Sha256::digest(&serialized).into()
}

/// 오브젝트 키를 재귀적으로 정렬한 사본을 만듭니다.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            serde_json::to_value(sorted).expect("sorted map is serializable")
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fingerprint_ignores_key_order() {
        let a: Value =
            serde_json::from_str(r#"{"name":"Foo","score":10,"nested":{"x":1,"y":2}}"#).unwrap();
        let b: Value =
            serde_json::from_str(r#"{"nested":{"y":2,"x":1},"score":10,"name":"Foo"}"#).unwrap();
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_detects_single_field_change() {
        let a = json!({"name": "Foo", "score": 10});
        let b = json!({"name": "Foo", "score": 11});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_distinguishes_array_order() {
        let a = json!({"items": [1, 2, 3]});
        let b = json!({"items": [3, 2, 1]});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn write_needed_when_no_previous_value() {
        let new = json!({"tag": "#ABC"});
        assert!(needs_write(None, &new));
    }

    #[test]
    fn write_suppressed_for_identical_content() {
        let old = json!({"tag": "#ABC", "trophies": 5000});
        let new: Value =
            serde_json::from_str(r##"{"trophies":5000,"tag":"#ABC"}"##).unwrap();
        assert!(!needs_write(Some(&old), &new));
    }
}
