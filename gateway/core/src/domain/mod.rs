// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain Layer
//!
//! Session-scoped file objects and the identity rules they are evaluated under.

pub mod identity;
pub mod permission;
pub mod remote_path;
pub mod remote_fs;
pub mod delegation;
pub mod session;
pub mod path_entry;
pub mod directory_cursor;
pub mod gateway_config;
