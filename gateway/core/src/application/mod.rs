// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod command_dispatcher;
pub mod gateway;
pub mod session_manager;

pub use command_dispatcher::{CommandDispatcher, ProtocolCommand, Reply};
pub use gateway::{Gateway, LoginError};
pub use session_manager::{SessionError, SessionViewFactory};
