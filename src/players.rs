//! 온디맨드 플레이어 조회 채널
//!
//! `players/request` 경로가 단일 슬롯 메일박스입니다. 외부에서 태그를
//! 써 넣으면 이 워커가 프로필과 배틀 로그를 조회해 `players/info`에
//! 응답을 쓰고 슬롯을 비웁니다. 조회가 실패해도 슬롯은 반드시 비워서
//! 채널이 오래된 요청에 물려 있지 않게 합니다.
//!
//! 슬롯은 최대 한 건만 담습니다. 처리 중에 새 요청이 덮어써지면 그
//! 요청은 조용히 사라집니다 (last-write-wins, 의도된 제한).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::firebase::{PLAYER_INFO_PATH, PLAYER_INFO_REQUEST_PATH};
use crate::sync::State;

/// `players/info`에 저장되는 응답 페이로드
///
/// 프로필과 배틀 로그는 원본처럼 JSON 문자열로 담습니다.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub requested_tag: String,
    pub fetched_at: i64,
    pub player: String,
    pub battlelog: String,
}

pub fn spawn_request_task(state: Arc<State>) {
    let poll = Duration::from_millis(state.config.sync.request_poll_ms);

    tokio::task::spawn(async move {
        tracing::info!("player request watcher started");
        loop {
            if let Err(e) = service_pending(&state).await {
                tracing::error!("player request worker error: {:#}", e);
            }
            tokio::time::sleep(poll).await;
        }
    });
}

/// 조회 결과에 대한 슬롯 처리 방침
struct Settlement {
    /// 저장할 응답 (실패 시 없음)
    response: Option<PlayerResponse>,
    /// 슬롯 비우기 여부. 성공/실패 모두 true여야 채널이 막히지 않음.
    clear_slot: bool,
}

/// 조회 결과를 처리 방침으로 바꿉니다.
///
/// 실패하면 에러 상세는 채널로 전달하지 않고 요청만 소비합니다.
fn settle_fetch(tag: &str, fetched: anyhow::Result<PlayerResponse>) -> Settlement {
    match fetched {
        Ok(payload) => Settlement {
            response: Some(payload),
            clear_slot: true,
        },
        Err(e) => {
            tracing::warn!("failed to fetch info for {}: {:#}", tag, e);
            Settlement {
                response: None,
                clear_slot: true,
            }
        }
    }
}

/// 요청 슬롯을 한 번 확인하고, 있으면 처리합니다.
async fn service_pending(state: &State) -> anyhow::Result<()> {
    let Some(tag) = pending_tag(state.firebase.get(PLAYER_INFO_REQUEST_PATH).await) else {
        return Ok(());
    };

    tracing::info!("fetching player info for {}", tag);

    let settlement = settle_fetch(&tag, fetch_player_bundle(state, &tag).await);

    if let Some(payload) = settlement.response {
        if state
            .firebase
            .set_if_changed(PLAYER_INFO_PATH, &payload)
            .await?
        {
            tracing::info!("player info saved for {}", tag);
        }
    }

    if settlement.clear_slot {
        clear_request(state).await?;
    }

    Ok(())
}

async fn fetch_player_bundle(state: &State, tag: &str) -> anyhow::Result<PlayerResponse> {
    let player = state.royale.player(tag).await?;
    let battlelog = state.royale.battle_log(tag).await?;

    Ok(PlayerResponse {
        requested_tag: tag.to_string(),
        fetched_at: Utc::now().timestamp_millis(),
        player: serde_json::to_string(&player)?,
        battlelog: serde_json::to_string(&battlelog)?,
    })
}

/// 성공/실패 공통의 슬롯 비우기
async fn clear_request(state: &State) -> anyhow::Result<()> {
    state
        .firebase
        .put(
            PLAYER_INFO_REQUEST_PATH,
            &serde_json::json!({ "tag": null, "timestamp": null }),
        )
        .await
}

/// 슬롯 값에서 대기 중인 태그 추출
///
/// 비어 있는 슬롯(`null` 또는 `{tag: null}`)과 공백 태그는 요청이
/// 아닙니다.
fn pending_tag(slot: Option<Value>) -> Option<String> {
    let tag = slot?.get("tag")?.as_str()?.trim().to_string();
    if tag.is_empty() {
        None
    } else {
        Some(tag)
    }
}
