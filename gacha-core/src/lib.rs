//! Gacha Core Library
//!
//! Draw-and-collection logic for the streamer promo site's gacha machine:
//! - Fixed item catalog in four rarity tiers (RON-definable)
//! - Weighted draw engine with pluggable random sources
//! - Append-only collection store persisted to key/value storage
//! - One-shot completion announcement latch
//! - Spin/reveal machine with a logical clock
//! - Monte-Carlo simulation of draw odds and completion cost
//! - FFI bridge (JSON over C-ABI) for embedding hosts

pub mod bridge;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod constants;
pub mod draw;
pub mod error;
pub mod logging;
pub mod simulation;
