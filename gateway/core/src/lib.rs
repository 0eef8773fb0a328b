// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HDFS Gateway Core
//!
//! Presents a remote HDFS namespace to a file-transfer protocol server as
//! per-session directory views made of lazily evaluated path entries.
//!
//! # Architecture
//!
//! - **Domain:** identities, permission bits, path entries, directory cursors,
//!   identity delegation
//! - **Application:** session view factory, protocol command dispatch, composition root
//! - **Infrastructure:** WebHDFS and in-memory remote filesystems, keytab login,
//!   users file

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
