// Copyright 2026 Quarry Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rendered web content extraction over a single browser engine.
//!
//! Concurrent callers submit URLs through [`dispatch::ExtractorHandle`];
//! one dispatcher task owns the rendering engine and processes jobs
//! strictly in arrival order. This crate exposes the core modules for
//! integration testing.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod pdf;
pub mod server;
