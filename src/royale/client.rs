//! Clash Royale API 클라이언트
//!
//! 정적 Bearer 토큰으로 인증하며, 모든 호출 앞에 Rate Limit 대기를
//! 삽입합니다. 2xx가 아닌 응답은 에러로 전파됩니다.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Royale as RoyaleConfig, Sync as SyncConfig};
use crate::royale::models::{RawClan, RawMember, RawMemberList, RawRiverRace};

/// Clash Royale API 클라이언트
pub struct RoyaleClient {
    config: RoyaleConfig,
    rate_limit_delay: Duration,
    http: reqwest::Client,
}

impl RoyaleClient {
    pub fn new(config: RoyaleConfig, sync: &SyncConfig) -> Self {
        Self {
            config,
            rate_limit_delay: Duration::from_millis(sync.rate_limit_delay_ms),
            http: reqwest::Client::new(),
        }
    }

    /// 동기화 대상 클랜 태그
    pub fn clan_tag(&self) -> &str {
        &self.config.clan_tag
    }

    /// Rate Limit 대기 후 GET, JSON 역직렬화
    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> anyhow::Result<T> {
        tokio::time::sleep(self.rate_limit_delay).await;

        let response = self
            .http
            .get(format!("{}{}", self.config.base_url, endpoint))
            .bearer_auth(&self.config.token)
            .header("Accept", "application/json")
            .timeout(Duration::from_secs(20))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Clash Royale API error: {} - {}", status, body);
        }

        Ok(response.json().await?)
    }

    fn clan_endpoint(&self, suffix: &str) -> String {
        format!("/clans/{}{}", urlencoding::encode(&self.config.clan_tag), suffix)
    }

    /// 클랜 정보 조회
    pub async fn clan(&self) -> anyhow::Result<RawClan> {
        self.get(&self.clan_endpoint("")).await
    }

    /// 클랜 멤버 목록 조회
    pub async fn clan_members(&self) -> anyhow::Result<Vec<RawMember>> {
        let list: RawMemberList = self.get(&self.clan_endpoint("/members")).await?;
        Ok(list.items)
    }

    /// 현재 리버 레이스 조회
    pub async fn current_river_race(&self) -> anyhow::Result<RawRiverRace> {
        self.get(&self.clan_endpoint("/currentriverrace")).await
    }

    /// 리버 레이스 로그 조회 (원본 그대로 저장되므로 Value로 받음)
    pub async fn river_race_log(&self) -> anyhow::Result<Value> {
        self.get(&self.clan_endpoint("/riverracelog")).await
    }

    /// 플레이어 프로필 조회
    pub async fn player(&self, tag: &str) -> anyhow::Result<Value> {
        self.get(&format!("/players/{}", urlencoding::encode(tag))).await
    }

    /// 플레이어 배틀 로그 조회
    pub async fn battle_log(&self, tag: &str) -> anyhow::Result<Value> {
        self.get(&format!("/players/{}/battlelog", urlencoding::encode(tag)))
            .await
    }
}
