//! Wallcaster library.
//!
//! A service that monitors a VK community or user wall and mirrors new posts
//! to a Telegram channel, preserving nested-repost structure and translating
//! VK attachments (photos, videos, documents, audio, polls) into Telegram
//! message primitives.

pub mod config;
pub mod mirror;
pub mod state;
pub mod telegram;
pub mod vk;
