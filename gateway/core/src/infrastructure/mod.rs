// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod keytab;
pub mod remote;
pub mod user_store;

pub use keytab::KeytabLogin;
pub use remote::{create_remote_filesystem, MemoryFileSystem, RemoteBackend, RemoteFsHandle, WebHdfsClient};
pub use user_store::{hash_password, AuthenticationError, UserAccount, UserRegistry, UserStoreError};
