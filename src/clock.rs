//! 고정 타임존(IST, UTC+05:30) 기준의 달력 계산
//!
//! 누적 카운터의 일 단위 리셋은 IST 달력 날짜로 판정합니다.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// IST는 DST가 없으므로 고정 오프셋으로 충분합니다.
pub fn ist() -> FixedOffset {
    FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
}

/// 주어진 시각의 IST 달력 날짜
pub fn civil_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&ist()).date_naive()
}
