//! Abuse Guard - admission control and chat moderation for game servers
//!
//! This crate provides the two primitives a multiplayer game server uses to
//! defend itself: a per-address load counter that decides whether a source
//! is over its limit, and a substring filter for disallowed words in chat.
//! The [`gatekeeper`] module composes both in the shape a connection handler
//! calls them.

pub mod admission;
pub mod config;
pub mod error;
pub mod gatekeeper;
pub mod moderation;
pub mod replay;
