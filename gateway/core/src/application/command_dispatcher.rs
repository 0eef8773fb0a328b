// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Protocol Command Dispatcher
//!
//! Maps FTP-style commands onto a session's [`DirectoryCursor`] and the
//! [`PathEntry`] objects it resolves, and typed failures onto numeric
//! replies. Wire framing and the passive data connection belong to the
//! protocol server; data commands take the already-open channel as an
//! `AsyncRead`/`AsyncWrite`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use metrics::counter;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::domain::directory_cursor::DirectoryCursor;
use crate::domain::path_entry::{EntryMetadata, PathEntry};
use crate::domain::remote_fs::FileKind;
use crate::domain::session::EntryError;

/// Commands the gateway understands, with their path argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolCommand {
    Pwd,
    Cwd(String),
    Cdup,
    List(Option<String>),
    Nlst(Option<String>),
    Mkd(String),
    Rmd(String),
    Dele(String),
    Rnfr(String),
    Rnto(String),
    Size(String),
    Mdtm(String),
    Retr(String),
    Stor(String),
}

impl ProtocolCommand {
    /// Whether the command transfers data over a data connection
    pub fn uses_data_channel(&self) -> bool {
        matches!(
            self,
            ProtocolCommand::List(_) | ProtocolCommand::Nlst(_) | ProtocolCommand::Retr(_) | ProtocolCommand::Stor(_)
        )
    }

    pub fn verb(&self) -> &'static str {
        match self {
            ProtocolCommand::Pwd => "PWD",
            ProtocolCommand::Cwd(_) => "CWD",
            ProtocolCommand::Cdup => "CDUP",
            ProtocolCommand::List(_) => "LIST",
            ProtocolCommand::Nlst(_) => "NLST",
            ProtocolCommand::Mkd(_) => "MKD",
            ProtocolCommand::Rmd(_) => "RMD",
            ProtocolCommand::Dele(_) => "DELE",
            ProtocolCommand::Rnfr(_) => "RNFR",
            ProtocolCommand::Rnto(_) => "RNTO",
            ProtocolCommand::Size(_) => "SIZE",
            ProtocolCommand::Mdtm(_) => "MDTM",
            ProtocolCommand::Retr(_) => "RETR",
            ProtocolCommand::Stor(_) => "STOR",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("Empty command")]
    Empty,

    #[error("Command not implemented: {0}")]
    Unknown(String),

    #[error("{0} requires an argument")]
    MissingArgument(String),
}

impl FromStr for ProtocolCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim_end_matches(['\r', '\n']).trim_start();
        let (verb, argument) = match line.split_once(' ') {
            Some((verb, rest)) => (verb, Some(rest.trim()).filter(|a| !a.is_empty())),
            None => (line, None),
        };
        if verb.is_empty() {
            return Err(CommandParseError::Empty);
        }

        let verb = verb.to_ascii_uppercase();
        let required = |arg: Option<&str>| {
            arg.map(str::to_string)
                .ok_or_else(|| CommandParseError::MissingArgument(verb.clone()))
        };

        Ok(match verb.as_str() {
            "PWD" | "XPWD" => ProtocolCommand::Pwd,
            "CWD" | "XCWD" => ProtocolCommand::Cwd(required(argument)?),
            "CDUP" | "XCUP" => ProtocolCommand::Cdup,
            "LIST" => ProtocolCommand::List(listing_target(argument)),
            "NLST" => ProtocolCommand::Nlst(listing_target(argument)),
            "MKD" | "XMKD" => ProtocolCommand::Mkd(required(argument)?),
            "RMD" | "XRMD" => ProtocolCommand::Rmd(required(argument)?),
            "DELE" => ProtocolCommand::Dele(required(argument)?),
            "RNFR" => ProtocolCommand::Rnfr(required(argument)?),
            "RNTO" => ProtocolCommand::Rnto(required(argument)?),
            "SIZE" => ProtocolCommand::Size(required(argument)?),
            "MDTM" => ProtocolCommand::Mdtm(required(argument)?),
            "RETR" => ProtocolCommand::Retr(required(argument)?),
            "STOR" => ProtocolCommand::Stor(required(argument)?),
            _ => return Err(CommandParseError::Unknown(verb.clone())),
        })
    }
}

/// Strip leading `ls`-style option tokens (`-la`), keeping any path after them
fn listing_target(argument: Option<&str>) -> Option<String> {
    let mut rest = argument?;
    while rest.starts_with('-') {
        rest = match rest.split_once(char::is_whitespace) {
            Some((_, tail)) => tail.trim_start(),
            None => "",
        };
    }
    Some(rest).filter(|r| !r.is_empty()).map(str::to_string)
}

/// Numeric protocol reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub message: String,
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_positive(&self) -> bool {
        (100..400).contains(&self.code)
    }

    fn denied(path: &str) -> Self {
        Reply::new(550, format!("{}: Permission denied.", path))
    }

    fn not_found(path: &str) -> Self {
        Reply::new(550, format!("{}: No such file or directory.", path))
    }

    fn opening(what: &str) -> Self {
        Reply::new(150, format!("Opening data connection for {}.", what))
    }

    fn transfer_complete() -> Self {
        Reply::new(226, "Transfer complete.")
    }

    fn transfer_aborted() -> Self {
        Reply::new(426, "Connection closed; transfer aborted.")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

/// Executes commands for one session
pub struct CommandDispatcher {
    cursor: DirectoryCursor,
    rename_from: Option<PathEntry>,
}

impl CommandDispatcher {
    pub fn new(cursor: DirectoryCursor) -> Self {
        Self {
            cursor,
            rename_from: None,
        }
    }

    pub fn cursor(&self) -> &DirectoryCursor {
        &self.cursor
    }

    /// Run a control-connection command. Data commands are answered with 425;
    /// use [`CommandDispatcher::list`], [`CommandDispatcher::retrieve`] or
    /// [`CommandDispatcher::store`] once the data connection is open.
    pub async fn dispatch(&mut self, command: ProtocolCommand) -> Reply {
        counter!("hdfs_gateway.commands", "verb" => command.verb()).increment(1);
        debug!(session_id = %self.cursor.session_id(), command = ?command, "Dispatching command");

        // A rename source only survives until the next command
        let rename_from = self.rename_from.take();

        match command {
            ProtocolCommand::Pwd => Reply::new(
                257,
                format!("\"{}\" is current directory.", self.cursor.current_path()),
            ),
            ProtocolCommand::Cwd(path) => self.change_directory(&path).await,
            ProtocolCommand::Cdup => self.change_directory("..").await,
            ProtocolCommand::Mkd(path) => self.make_directory(&path).await,
            ProtocolCommand::Rmd(path) => self.remove(&path, FileKind::Directory).await,
            ProtocolCommand::Dele(path) => self.remove(&path, FileKind::File).await,
            ProtocolCommand::Rnfr(path) => self.mark_rename_source(&path).await,
            ProtocolCommand::Rnto(path) => match rename_from {
                Some(source) => self.rename_to(source, &path).await,
                None => Reply::new(503, "Bad sequence of commands: send RNFR first."),
            },
            ProtocolCommand::Size(path) => self.size(&path).await,
            ProtocolCommand::Mdtm(path) => self.modification_time(&path).await,
            command @ (ProtocolCommand::List(_)
            | ProtocolCommand::Nlst(_)
            | ProtocolCommand::Retr(_)
            | ProtocolCommand::Stor(_)) => {
                Reply::new(425, format!("{} requires a data connection.", command.verb()))
            }
        }
    }

    /// LIST / NLST into the data channel. Returns the 150 and final replies.
    pub async fn list<W>(&self, target: Option<&str>, names_only: bool, out: &mut W) -> Vec<Reply>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let entry = match target {
            Some(path) => match self.entry(path) {
                Ok(entry) => entry,
                Err(reply) => return vec![reply],
            },
            None => self.cursor.current_directory(),
        };

        let entries = if entry.is_directory().await {
            match entry.list_files().await {
                Some(children) => children,
                None => return vec![Reply::denied(entry.full_name())],
            }
        } else if entry.exists().await {
            vec![entry.clone()]
        } else {
            return vec![Reply::not_found(entry.full_name())];
        };

        let now = Utc::now();
        let mut listing = String::new();
        for child in &entries {
            if names_only {
                listing.push_str(child.short_name());
                listing.push_str("\r\n");
            } else if let Some(meta) = child.describe().await {
                listing.push_str(&format_list_line(&meta, now));
                listing.push_str("\r\n");
            }
        }

        let opening = Reply::opening(&format!("file list of {}", entry.full_name()));
        match write_all(out, listing.as_bytes()).await {
            Ok(()) => vec![opening, Reply::transfer_complete()],
            Err(e) => {
                warn!(path = %entry.full_name(), error = %e, "Listing transfer failed");
                vec![opening, Reply::transfer_aborted()]
            }
        }
    }

    /// RETR: stream a remote file into the data channel
    pub async fn retrieve<W>(&self, path: &str, out: &mut W) -> Vec<Reply>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return vec![reply],
        };
        if !entry.is_file().await {
            return vec![Reply::not_found(entry.full_name())];
        }

        let mut input = match entry.create_input_stream(0).await {
            Ok(input) => input,
            Err(e) => return vec![failure_reply(entry.full_name(), &e)],
        };

        let opening = Reply::opening(entry.full_name());
        let copied = tokio::io::copy(&mut input, out).await;
        let flushed = match copied {
            Ok(bytes) => out.flush().await.map(|_| bytes),
            Err(e) => Err(e),
        };
        match flushed {
            Ok(bytes) => {
                counter!("hdfs_gateway.bytes", "direction" => "download").increment(bytes);
                info!(path = %entry.full_name(), user = %entry.identity(), bytes, "File downloaded");
                vec![opening, Reply::transfer_complete()]
            }
            Err(e) => {
                warn!(path = %entry.full_name(), error = %e, "Download aborted");
                vec![opening, Reply::transfer_aborted()]
            }
        }
    }

    /// STOR: write the data channel into a (truncated) remote file
    pub async fn store<R>(&self, path: &str, input: &mut R) -> Vec<Reply>
    where
        R: AsyncRead + Unpin + Send,
    {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return vec![reply],
        };
        if entry.is_directory().await {
            return vec![Reply::new(553, format!("{}: Is a directory.", entry.full_name()))];
        }

        let mut output = match entry.create_output_stream(0).await {
            Ok(output) => output,
            Err(e) => return vec![failure_reply(entry.full_name(), &e)],
        };

        let opening = Reply::opening(entry.full_name());
        let copied = tokio::io::copy(input, &mut output).await;
        let completed = match copied {
            Ok(bytes) => output.shutdown().await.map(|_| bytes),
            Err(e) => Err(e),
        };
        match completed {
            Ok(bytes) => {
                counter!("hdfs_gateway.bytes", "direction" => "upload").increment(bytes);
                info!(path = %entry.full_name(), user = %entry.identity(), bytes, "File uploaded");
                vec![opening, Reply::transfer_complete()]
            }
            Err(e) => {
                warn!(path = %entry.full_name(), error = %e, "Upload aborted");
                vec![opening, Reply::transfer_aborted()]
            }
        }
    }

    fn entry(&self, path: &str) -> Result<PathEntry, Reply> {
        self.cursor.get_file_object(path).map_err(|e| {
            debug!(path, error = %e, "Path rejected");
            Reply::denied(path)
        })
    }

    async fn change_directory(&mut self, path: &str) -> Reply {
        if self.cursor.change_directory(path).await {
            Reply::new(250, format!("Directory changed to {}", self.cursor.current_path()))
        } else {
            Reply::new(550, format!("{}: No such directory.", path))
        }
    }

    async fn make_directory(&self, path: &str) -> Reply {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };
        if entry.exists().await {
            return Reply::new(550, format!("{}: Already exists.", entry.full_name()));
        }

        match entry.try_mkdir().await {
            Ok(()) => Reply::new(257, format!("\"{}\" created.", entry.full_name())),
            Err(e) => failure_reply(entry.full_name(), &e),
        }
    }

    async fn remove(&self, path: &str, kind: FileKind) -> Reply {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };

        let matches_kind = match kind {
            FileKind::Directory => entry.is_directory().await,
            FileKind::File => entry.is_file().await,
        };
        if !matches_kind {
            return Reply::not_found(entry.full_name());
        }
        if !entry.has_delete_permission().await {
            return Reply::denied(entry.full_name());
        }

        if entry.delete().await {
            info!(path = %entry.full_name(), user = %entry.identity(), "Deleted");
            Reply::new(250, format!("{}: Deleted.", entry.full_name()))
        } else {
            Reply::new(450, format!("{}: Delete failed.", entry.full_name()))
        }
    }

    async fn mark_rename_source(&mut self, path: &str) -> Reply {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };
        if !entry.exists().await {
            return Reply::not_found(entry.full_name());
        }
        // Moving a path away removes it from its directory
        if !entry.has_delete_permission().await {
            return Reply::denied(entry.full_name());
        }

        self.rename_from = Some(entry);
        Reply::new(350, "Requested file action pending further information.")
    }

    async fn rename_to(&self, source: PathEntry, path: &str) -> Reply {
        let target = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };
        if !target.has_write_permission().await {
            return Reply::new(553, format!("{}: Permission denied.", target.full_name()));
        }

        if source.move_to(&target).await {
            info!(from = %source.full_name(), to = %target.full_name(), "Renamed");
            Reply::new(250, "Requested file action okay, file renamed.")
        } else {
            Reply::new(553, format!("Cannot rename {} to {}.", source.full_name(), target.full_name()))
        }
    }

    async fn size(&self, path: &str) -> Reply {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };
        if !entry.is_file().await {
            return Reply::not_found(entry.full_name());
        }
        Reply::new(213, entry.size().await.to_string())
    }

    async fn modification_time(&self, path: &str) -> Reply {
        let entry = match self.entry(path) {
            Ok(entry) => entry,
            Err(reply) => return reply,
        };
        match entry.describe().await {
            Some(meta) => Reply::new(213, meta.modified.format("%Y%m%d%H%M%S").to_string()),
            None => Reply::not_found(entry.full_name()),
        }
    }
}

fn failure_reply(path: &str, error: &EntryError) -> Reply {
    match error {
        EntryError::AccessDenied { .. } => Reply::denied(path),
        EntryError::Authorization(e) => Reply::new(530, format!("Not authorized: {}", e)),
        EntryError::Remote(e) => Reply::new(550, format!("{}: {}", path, e)),
    }
}

async fn write_all<W: AsyncWrite + Unpin>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    out.write_all(bytes).await?;
    out.flush().await
}

/// One `ls -l` style line, without the line terminator
pub fn format_list_line(meta: &EntryMetadata, now: DateTime<Utc>) -> String {
    let kind = match meta.kind {
        FileKind::Directory => 'd',
        FileKind::File => '-',
    };
    // Recent entries show the time, older ones the year
    let recent = now.signed_duration_since(meta.modified).abs() < ChronoDuration::days(180);
    let date = if recent {
        meta.modified.format("%b %e %H:%M")
    } else {
        meta.modified.format("%b %e  %Y")
    };

    format!(
        "{}{} {:>3} {:<8} {:<8} {:>12} {} {}",
        kind, meta.permission, meta.link_count, meta.owner, meta.group, meta.size, date, meta.name
    )
}
