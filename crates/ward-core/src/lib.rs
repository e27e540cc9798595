//! # ward-core
//!
//! Foundation types for the Ward clinical chat assistant.
//!
//! This crate provides the shared vocabulary the other Ward crates depend on:
//!
//! - **Branded IDs**: [`ids::ConversationId`], [`ids::PatientId`] as newtypes
//! - **Transcript model**: [`transcript::Transcript`],
//!   [`transcript::TranscriptMessage`] with tagged plain-text/structured
//!   content and a single flat-text extraction
//! - **Errors**: [`errors::PersistenceError`] via `thiserror`
//! - **Text utilities**: UTF-8-safe truncation in [`text`]
//! - **Logging**: [`logging::init_subscriber`] tracing bootstrap
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other ward crates.

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod text;
pub mod transcript;
