//! # goblin-bot
//!
//! Scheduled client for the goblin.meme box game: polls the box list,
//! starts anything eligible, and claims rewards once the maturation
//! timer elapses. Every step lands in an append-only, size-rotated
//! audit journal.

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod model;
