use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub royale: Royale,
    pub firebase: Firebase,
    #[serde(default)]
    pub sync: Sync,
}

/// Clash Royale API 접속 설정
#[derive(Debug, Clone, Deserialize)]
pub struct Royale {
    /// 정적 Bearer 토큰
    pub token: String,
    /// 동기화 대상 클랜 태그 (예: "#RG2VL88G")
    pub clan_tag: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Firebase {
    /// Realtime Database 루트 URL (끝에 슬래시 없음)
    pub root: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sync {
    /// 메인 갱신 주기 (초)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    /// API 호출 간 Rate Limit 대기 (밀리초)
    #[serde(default = "default_rate_limit_delay")]
    pub rate_limit_delay_ms: u64,
    /// 플레이어 요청 슬롯 폴링 주기 (밀리초)
    #[serde(default = "default_request_poll")]
    pub request_poll_ms: u64,
}

impl Default for Sync {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            rate_limit_delay_ms: default_rate_limit_delay(),
            request_poll_ms: default_request_poll(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.clashroyale.com/v1".to_string()
}

fn default_refresh_interval() -> u64 {
    120
}

fn default_rate_limit_delay() -> u64 {
    1_200
}

fn default_request_poll() -> u64 {
    500
}
