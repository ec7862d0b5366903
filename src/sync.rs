//! 메인 동기화 오케스트레이터
//!
//! 고정 주기마다 클랜 정보 → 멤버 → 현재 리버 레이스 → 레이스 로그
//! 순으로 갱신하고, 실제로 바뀐 경로 목록을 감사 레코드로 남깁니다.
//! 중간에 조회가 실패하면 해당 사이클의 나머지 단계는 건너뛰지만
//! 프로세스는 다음 사이클로 계속 진행합니다.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::config::Config;
use crate::delta::{ClanDeltaFile, MemberDeltaFile, MemberObservation};
use crate::firebase::{
    FirebaseClient, CLAN_INFO_DELTA_PATH, CLAN_INFO_PATH, CLAN_MEMBERS_DELTA_PATH,
    CLAN_MEMBERS_PATH, CURRENT_RIVER_PATH, RIVER_PERIOD_PATH, RIVER_RACE_LOG_PATH,
};
use crate::river::{PeriodState, RiverRaceSnapshot};
use crate::royale::RoyaleClient;
use crate::snapshot::{ClanInfo, MemberInfo};
use crate::{clock, players};

pub struct State {
    pub config: Arc<Config>,
    pub royale: RoyaleClient,
    pub firebase: FirebaseClient,
}

impl State {
    pub fn new(config: Arc<Config>) -> Arc<Self> {
        let royale = RoyaleClient::new(config.royale.clone(), &config.sync);
        let firebase = FirebaseClient::new(config.firebase.clone());

        Arc::new(Self {
            config,
            royale,
            firebase,
        })
    }

    /// 저장된 값을 타입으로 읽기. 없거나 형식이 깨졌으면 None.
    async fn read_stored<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        let value = self.firebase.get(path).await?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("stored value at {} is malformed, rebuilding: {}", path, e);
                None
            }
        }
    }
}

pub async fn start(config: Arc<Config>) -> Result<()> {
    let state = State::new(config);

    players::spawn_request_task(Arc::clone(&state));

    tracing::info!(
        "starting sync for clan {} every {}s",
        state.royale.clan_tag(),
        state.config.sync.refresh_interval_secs
    );
    run(state).await
}

async fn run(state: Arc<State>) -> Result<()> {
    let interval = Duration::from_secs(state.config.sync.refresh_interval_secs);
    let mut cycle: u64 = 1;

    loop {
        let started = Instant::now();
        tracing::info!("sync cycle #{}", cycle);

        let mut changed = Vec::new();
        if let Err(e) = run_cycle(&state, &mut changed).await {
            tracing::error!("cycle #{} aborted: {:#}", cycle, e);
        }

        if let Err(e) = state.firebase.write_updates(&changed).await {
            tracing::error!("could not write updates record: {:#}", e);
        }

        if changed.is_empty() {
            tracing::info!("no data changes detected");
        } else {
            tracing::info!("updated paths: {}", changed.join(", "));
        }

        cycle += 1;

        let elapsed = started.elapsed();
        if elapsed < interval {
            tokio::time::sleep(interval - elapsed).await;
        }
    }
}

/// 네 단계를 순서대로 실행. 에러는 즉시 전파되어 남은 단계를 건너뜀.
async fn run_cycle(state: &State, changed: &mut Vec<String>) -> Result<()> {
    tracing::info!("[1/4] clan info");
    changed.extend(update_clan_info(state).await?);

    tracing::info!("[2/4] members");
    changed.extend(update_clan_members(state).await?);

    tracing::info!("[3/4] current river race");
    changed.extend(update_current_river_race(state).await?);

    tracing::info!("[4/4] river race log");
    changed.extend(update_river_race_log(state).await?);

    Ok(())
}

async fn update_clan_info(state: &State) -> Result<Vec<String>> {
    let clan = state.royale.clan().await?;
    let today = clock::civil_date(Utc::now());

    let current = [
        ("clanScore", clan.clan_score),
        ("clanWarTrophies", clan.clan_war_trophies),
        ("donationsPerWeek", clan.donations_per_week),
        ("clanChestPoints", clan.clan_chest_points),
    ];

    let previous: Option<ClanDeltaFile> = state.read_stored(CLAN_INFO_DELTA_PATH).await;
    let delta_file = ClanDeltaFile::compute(today, previous.as_ref(), &current);
    let info = ClanInfo::from(clan);

    let mut labels = Vec::new();
    if state.firebase.set_if_changed(CLAN_INFO_PATH, &info).await? {
        labels.push("clan_info".to_string());
    }
    if state
        .firebase
        .set_if_changed(CLAN_INFO_DELTA_PATH, &delta_file)
        .await?
    {
        labels.push("clan_info_deltas".to_string());
    }

    Ok(labels)
}

async fn update_clan_members(state: &State) -> Result<Vec<String>> {
    let members = state.royale.clan_members().await?;
    let today = clock::civil_date(Utc::now());

    let roster: Vec<MemberObservation> = members
        .iter()
        .map(|m| MemberObservation {
            tag: m.tag.clone(),
            name: m.name.clone(),
            metrics: vec![
                ("trophies", m.trophies),
                ("donations", m.donations),
                ("donationsReceived", m.donations_received),
            ],
        })
        .collect();

    let previous: Option<MemberDeltaFile> = state.read_stored(CLAN_MEMBERS_DELTA_PATH).await;
    let delta_file = MemberDeltaFile::compute(today, previous.as_ref(), &roster);
    let list: Vec<MemberInfo> = members.into_iter().map(MemberInfo::from).collect();

    let mut labels = Vec::new();
    if state
        .firebase
        .set_if_changed(CLAN_MEMBERS_PATH, &list)
        .await?
    {
        labels.push("clan_members".to_string());
    }
    if state
        .firebase
        .set_if_changed(CLAN_MEMBERS_DELTA_PATH, &delta_file)
        .await?
    {
        labels.push("clan_members_deltas".to_string());
    }

    Ok(labels)
}

async fn update_current_river_race(state: &State) -> Result<Vec<String>> {
    let race = state.royale.current_river_race().await?;

    let stored: Option<PeriodState> = state.read_stored(RIVER_PERIOD_PATH).await;
    let period = crate::river::period_end_time(stored.as_ref(), race.period_index, Utc::now());
    state
        .firebase
        .set_if_changed(RIVER_PERIOD_PATH, &period)
        .await?;

    let snapshot = RiverRaceSnapshot::project(&race, period.end_time);

    let mut labels = Vec::new();
    if state
        .firebase
        .set_if_changed(CURRENT_RIVER_PATH, &snapshot)
        .await?
    {
        labels.push("river_race".to_string());
    }

    Ok(labels)
}

async fn update_river_race_log(state: &State) -> Result<Vec<String>> {
    let log = state.royale.river_race_log().await?;

    let mut labels = Vec::new();
    if state
        .firebase
        .set_if_changed(RIVER_RACE_LOG_PATH, &log)
        .await?
    {
        labels.push("river_race_log".to_string());
    }

    Ok(labels)
}
