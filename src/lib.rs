//! ckweb: 마이닝 풀 웹 프런트엔드의 ckdb 클라이언트
//!
//! 모든 풀 회계는 외부 데몬 ckdb가 담당하고, 여기서는 길이 접두 소켓
//! 프로토콜로 요청을 보내고 `id.stamp.status.필드` 응답을 해석한다.

pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod protocol;
pub mod web;

pub use client::{CkdbClient, CkdbTransport, Endpoint};
pub use db::PoolDb;
pub use error::{CkwebError, Result};
