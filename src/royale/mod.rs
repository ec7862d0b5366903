//! Clash Royale API 관련 모듈
//!
//! - `client`: Rate Limit이 적용된 API 클라이언트
//! - `models`: API 원본 응답 타입

pub mod client;
pub mod models;

pub use client::RoyaleClient;
