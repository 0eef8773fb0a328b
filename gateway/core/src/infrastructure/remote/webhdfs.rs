// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! WebHDFS Remote Filesystem Implementation
//!
//! Talks to the NameNode's REST interface. Implements the RemoteFileSystem
//! trait as an Anti-Corruption Layer.
//!
//! # API Endpoints
//!
//! - `GET  /webhdfs/v1/{path}?op=GETFILESTATUS` - Path metadata
//! - `GET  /webhdfs/v1/{path}?op=LISTSTATUS` - Directory listing
//! - `GET  /webhdfs/v1/{path}?op=OPEN` - Redirects to a DataNode serving the bytes
//! - `PUT  /webhdfs/v1/{path}?op=MKDIRS` - Create directory and ancestors
//! - `PUT  /webhdfs/v1/{path}?op=RENAME&destination=..` - Rename
//! - `PUT  /webhdfs/v1/{path}?op=SETOWNER&owner=..&group=..` - Change owner
//! - `PUT  /webhdfs/v1/{path}?op=CREATE&overwrite=true` - Two-step upload
//! - `DELETE /webhdfs/v1/{path}?op=DELETE&recursive=..` - Delete
//!
//! # Identity
//!
//! `ExecutionScope::Ambient` sends `user.name=<service user>` (pseudo
//! authentication). `ExecutionScope::Proxy` adds `doas=<end user>`, which the
//! NameNode accepts when the service user is configured as a proxy user, and
//! which makes the audit log name the end user.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncWrite, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;
use url::Url;

use crate::domain::permission::PermissionBits;
use crate::domain::remote_fs::{
    ExecutionScope, FileKind, FileStatus, ReadStream, RemoteFileSystem, RemoteFsError, WriteStream,
};
use crate::domain::remote_path::RemotePath;

const API_PREFIX: [&str; 2] = ["webhdfs", "v1"];
const UPLOAD_PIPE_CAPACITY: usize = 64 * 1024;

/// WebHDFS REST adapter
pub struct WebHdfsClient {
    client: Client,
    /// NameNode base URL with an http(s) scheme
    base: Url,
    /// Bound on metadata calls; streaming transfers are not bounded
    timeout: Duration,
}

impl WebHdfsClient {
    /// Create a client for `uri`. `webhdfs://` and `swebhdfs://` are accepted
    /// as aliases for `http://` and `https://`.
    pub fn new(uri: &str, timeout: Duration) -> Result<Self, RemoteFsError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base: Self::parse_base(uri)?,
            timeout,
        })
    }

    fn parse_base(uri: &str) -> Result<Url, RemoteFsError> {
        let normalized = if let Some(rest) = uri.strip_prefix("webhdfs://") {
            format!("http://{}", rest)
        } else if let Some(rest) = uri.strip_prefix("swebhdfs://") {
            format!("https://{}", rest)
        } else {
            uri.to_string()
        };

        let base = Url::parse(&normalized)
            .map_err(|e| RemoteFsError::InvalidPath(format!("invalid remote uri '{}': {}", uri, e)))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteFsError::InvalidPath(format!(
                "remote uri '{}' must use http, https, webhdfs or swebhdfs",
                uri
            )));
        }
        Ok(base)
    }

    /// Build the operation URL for `path` with identity and extra parameters
    fn operation_url(
        &self,
        path: &str,
        op: &str,
        scope: &ExecutionScope,
        params: &[(&str, &str)],
    ) -> Result<Url, RemoteFsError> {
        if !path.starts_with('/') {
            return Err(RemoteFsError::InvalidPath("Path must start with /".to_string()));
        }

        let path = RemotePath::new(path);
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RemoteFsError::InvalidPath(format!("cannot extend {}", self.base)))?;
            segments.pop_if_empty().extend(API_PREFIX);
            if path.is_root() {
                segments.push("");
            } else {
                segments.extend(path.as_str().split('/').filter(|s| !s.is_empty()));
            }
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op);
            match scope {
                ExecutionScope::Ambient { service_user: Some(user) } => {
                    query.append_pair("user.name", user);
                }
                ExecutionScope::Ambient { service_user: None } => {}
                ExecutionScope::Proxy {
                    service_user,
                    effective_user,
                } => {
                    query.append_pair("user.name", service_user);
                    query.append_pair("doas", effective_user);
                }
            }
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn metadata_request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url).timeout(self.timeout)
    }

    async fn boolean_call(
        &self,
        method: Method,
        path: &str,
        op: &str,
        scope: &ExecutionScope,
        params: &[(&str, &str)],
    ) -> Result<bool, RemoteFsError> {
        let url = self.operation_url(path, op, scope, params)?;
        let response = check(self.metadata_request(method, url).send().await?, path).await?;
        let body: BooleanResponse = response.json().await?;
        Ok(body.boolean)
    }

    /// Target of a two-step operation: `Location` header on a redirect, or
    /// the `Location` JSON field when `noredirect=true` was honored
    async fn redirect_target(response: Response, path: &str) -> Result<Url, RemoteFsError> {
        let location = if response.status().is_redirection() {
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| RemoteFsError::Protocol(format!("redirect without Location for {}", path)))?
        } else {
            let response = check(response, path).await?;
            let body: LocationResponse = response.json().await?;
            body.location
        };

        Url::parse(&location)
            .map_err(|e| RemoteFsError::Protocol(format!("invalid redirect '{}': {}", location, e)))
    }
}

#[async_trait]
impl RemoteFileSystem for WebHdfsClient {
    async fn get_status(&self, scope: &ExecutionScope, path: &str) -> Result<FileStatus, RemoteFsError> {
        let url = self.operation_url(path, "GETFILESTATUS", scope, &[])?;
        let response = check(self.metadata_request(Method::GET, url).send().await?, path).await?;
        let body: FileStatusResponse = response.json().await?;
        body.file_status.into_status(path)
    }

    async fn list_status(&self, scope: &ExecutionScope, path: &str) -> Result<Vec<FileStatus>, RemoteFsError> {
        let url = self.operation_url(path, "LISTSTATUS", scope, &[])?;
        let response = check(self.metadata_request(Method::GET, url).send().await?, path).await?;
        let body: FileStatusesResponse = response.json().await?;
        body.file_statuses
            .file_status
            .into_iter()
            .map(|wire| wire.into_status(path))
            .collect()
    }

    async fn mkdirs(&self, scope: &ExecutionScope, path: &str) -> Result<(), RemoteFsError> {
        if self.boolean_call(Method::PUT, path, "MKDIRS", scope, &[]).await? {
            Ok(())
        } else {
            Err(RemoteFsError::Protocol(format!("MKDIRS refused for {}", path)))
        }
    }

    async fn delete(&self, scope: &ExecutionScope, path: &str, recursive: bool) -> Result<bool, RemoteFsError> {
        let recursive = if recursive { "true" } else { "false" };
        self.boolean_call(Method::DELETE, path, "DELETE", scope, &[("recursive", recursive)])
            .await
    }

    async fn rename(&self, scope: &ExecutionScope, src: &str, dst: &str) -> Result<bool, RemoteFsError> {
        let destination = RemotePath::new(dst);
        self.boolean_call(
            Method::PUT,
            src,
            "RENAME",
            scope,
            &[("destination", destination.as_str())],
        )
        .await
    }

    async fn open(&self, scope: &ExecutionScope, path: &str) -> Result<ReadStream, RemoteFsError> {
        let url = self.operation_url(path, "OPEN", scope, &[])?;
        let mut response = self.client.get(url).send().await?;

        if response.status().is_redirection() {
            let target = Self::redirect_target(response, path).await?;
            debug!(path, datanode = %target.host_str().unwrap_or_default(), "Following OPEN redirect");
            response = self.client.get(target).send().await?;
        }
        let response = check(response, path).await?;

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(Box::pin(StreamReader::new(body)))
    }

    async fn create(&self, scope: &ExecutionScope, path: &str) -> Result<WriteStream, RemoteFsError> {
        let url = self.operation_url(
            path,
            "CREATE",
            scope,
            &[("overwrite", "true"), ("noredirect", "true")],
        )?;
        let response = self.metadata_request(Method::PUT, url).send().await?;
        let target = Self::redirect_target(response, path).await?;
        debug!(path, datanode = %target.host_str().unwrap_or_default(), "Streaming upload");

        let (pipe, reader) = tokio::io::duplex(UPLOAD_PIPE_CAPACITY);
        let request = self
            .client
            .put(target)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(reqwest::Body::wrap_stream(ReaderStream::new(reader)));

        let upload_path = path.to_string();
        let upload = tokio::spawn(async move {
            let response = request.send().await?;
            check(response, &upload_path).await.map(|_| ())
        });

        Ok(Box::pin(UploadStream {
            pipe,
            upload: Some(upload),
        }))
    }

    async fn set_owner(&self, scope: &ExecutionScope, path: &str, user: &str, group: &str) -> Result<(), RemoteFsError> {
        let url = self.operation_url(path, "SETOWNER", scope, &[("owner", user), ("group", group)])?;
        check(self.metadata_request(Method::PUT, url).send().await?, path).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RemoteFsError> {
        let url = self.operation_url("/", "GETFILESTATUS", &ExecutionScope::ambient(None), &[])?;
        let response = self.metadata_request(Method::GET, url).send().await?;
        if response.status().is_server_error() {
            return Err(RemoteFsError::Unavailable(format!(
                "NameNode responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Map a non-success response to a typed error
async fn check(response: Response, path: &str) -> Result<Response, RemoteFsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let exception = serde_json::from_str::<RemoteExceptionResponse>(&body)
        .ok()
        .map(|r| r.remote_exception);

    let message = exception
        .as_ref()
        .map(|e| format!("{}: {}", e.exception, e.message))
        .unwrap_or_else(|| format!("HTTP {} for {}", status, path));

    match exception.as_ref().map(|e| e.exception.as_str()) {
        Some("FileNotFoundException") => return Err(RemoteFsError::NotFound(path.to_string())),
        Some("AccessControlException") | Some("SecurityException") => {
            return Err(RemoteFsError::PermissionDenied(message))
        }
        Some("FileAlreadyExistsException") => return Err(RemoteFsError::AlreadyExists(path.to_string())),
        _ => {}
    }

    Err(match status {
        StatusCode::NOT_FOUND => RemoteFsError::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteFsError::PermissionDenied(message),
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => RemoteFsError::Unavailable(message),
        StatusCode::GATEWAY_TIMEOUT | StatusCode::REQUEST_TIMEOUT => RemoteFsError::Timeout,
        _ => RemoteFsError::Protocol(message),
    })
}

/// Write half of an upload; `shutdown` waits for the DataNode to accept it
struct UploadStream {
    pipe: DuplexStream,
    upload: Option<JoinHandle<Result<(), RemoteFsError>>>,
}

impl AsyncWrite for UploadStream {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.pipe).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.pipe).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(Pin::new(&mut self.pipe).poll_shutdown(cx))?;

        if let Some(upload) = self.upload.as_mut() {
            let outcome = ready!(Pin::new(upload).poll(cx));
            self.upload = None;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Poll::Ready(Err(io::Error::other(e.to_string()))),
                Err(e) => return Poll::Ready(Err(io::Error::other(e.to_string()))),
            }
        }
        Poll::Ready(Ok(()))
    }
}

impl Drop for UploadStream {
    fn drop(&mut self) {
        // Not shut down: do not let a truncated upload complete
        if let Some(upload) = self.upload.take() {
            upload.abort();
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFileStatus {
    #[serde(default)]
    path_suffix: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    length: u64,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    group: String,
    permission: String,
    #[serde(default)]
    modification_time: i64,
    #[serde(default)]
    children_num: Option<u64>,
}

impl WireFileStatus {
    fn into_status(self, requested: &str) -> Result<FileStatus, RemoteFsError> {
        let requested = RemotePath::new(requested);
        let path = if self.path_suffix.is_empty() {
            requested
        } else {
            requested.join(&self.path_suffix)
        };
        let kind = match self.kind.as_str() {
            "DIRECTORY" => FileKind::Directory,
            _ => FileKind::File,
        };
        let permission = PermissionBits::parse_octal(&self.permission)
            .map_err(|e| RemoteFsError::Serialization(e.to_string()))?;

        Ok(FileStatus {
            path: path.to_string(),
            kind,
            length: self.length,
            owner: self.owner,
            group: self.group,
            permission,
            modification_time: self.modification_time,
            child_count: match kind {
                FileKind::Directory => self.children_num,
                FileKind::File => None,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct FileStatusResponse {
    #[serde(rename = "FileStatus")]
    file_status: WireFileStatus,
}

#[derive(Debug, Deserialize)]
struct FileStatusesResponse {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatusList,
}

#[derive(Debug, Deserialize)]
struct FileStatusList {
    #[serde(rename = "FileStatus", default)]
    file_status: Vec<WireFileStatus>,
}

#[derive(Debug, Deserialize)]
struct BooleanResponse {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct LocationResponse {
    #[serde(rename = "Location")]
    location: String,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionResponse {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteException,
}

#[derive(Debug, Deserialize)]
struct RemoteException {
    exception: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn client(url: &str) -> WebHdfsClient {
        WebHdfsClient::new(url, Duration::from_secs(5)).unwrap()
    }

    fn hdfs() -> ExecutionScope {
        ExecutionScope::ambient(Some("hdfs".to_string()))
    }

    fn query(pairs: &[(&str, &str)]) -> Matcher {
        Matcher::AllOf(
            pairs
                .iter()
                .map(|(k, v)| Matcher::UrlEncoded(k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_scheme_aliases() {
        assert_eq!(
            WebHdfsClient::parse_base("webhdfs://nn:9870").unwrap().as_str(),
            "http://nn:9870/"
        );
        assert_eq!(WebHdfsClient::parse_base("swebhdfs://nn:9871").unwrap().scheme(), "https");
        assert!(WebHdfsClient::parse_base("hdfs://nn:8020").is_err());
    }

    #[test]
    fn test_operation_url_carries_identity() {
        let c = client("http://nn:9870");
        let proxy = ExecutionScope::Proxy {
            service_user: "ftp".to_string(),
            effective_user: "alice".to_string(),
        };
        let url = c.operation_url("/home/alice dir/x", "LISTSTATUS", &proxy, &[]).unwrap();
        assert_eq!(url.path(), "/webhdfs/v1/home/alice%20dir/x");
        assert_eq!(url.query(), Some("op=LISTSTATUS&user.name=ftp&doas=alice"));

        let root = c.operation_url("/", "GETFILESTATUS", &ExecutionScope::ambient(None), &[]).unwrap();
        assert_eq!(root.path(), "/webhdfs/v1/");
        assert!(c.operation_url("relative", "OPEN", &hdfs(), &[]).is_err());
    }

    #[tokio::test]
    async fn test_get_status_decodes_file_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/webhdfs/v1/home/alice/file.txt")
            .match_query(query(&[("op", "GETFILESTATUS"), ("user.name", "hdfs")]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"FileStatus":{"accessTime":0,"blockSize":134217728,"group":"staff","length":5,
                "modificationTime":1700000000000,"owner":"alice","pathSuffix":"","permission":"640",
                "replication":3,"type":"FILE"}}"#,
            )
            .create_async()
            .await;

        let status = client(&server.url())
            .get_status(&hdfs(), "/home/alice/file.txt")
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(status.path, "/home/alice/file.txt");
        assert!(status.is_file());
        assert_eq!(status.owner, "alice");
        assert_eq!(status.permission.to_string(), "rw-r-----");
        assert_eq!(status.length, 5);
        assert_eq!(status.child_count, None);
    }

    #[tokio::test]
    async fn test_list_status_builds_child_paths() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/webhdfs/v1/home/alice")
            .match_query(query(&[("op", "LISTSTATUS"), ("doas", "alice")]))
            .with_status(200)
            .with_body(
                r#"{"FileStatuses":{"FileStatus":[
                {"pathSuffix":"docs","type":"DIRECTORY","length":0,"owner":"alice","group":"staff",
                 "permission":"755","modificationTime":1,"childrenNum":4},
                {"pathSuffix":"a.txt","type":"FILE","length":3,"owner":"alice","group":"staff",
                 "permission":"644","modificationTime":2}]}}"#,
            )
            .create_async()
            .await;

        let proxy = ExecutionScope::Proxy {
            service_user: "ftp".to_string(),
            effective_user: "alice".to_string(),
        };
        let children = client(&server.url()).list_status(&proxy, "/home/alice").await.unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].path, "/home/alice/docs");
        assert_eq!(children[0].child_count, Some(4));
        assert_eq!(children[1].path, "/home/alice/a.txt");
    }

    #[tokio::test]
    async fn test_remote_exceptions_are_typed() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/webhdfs/v1/missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(
                r#"{"RemoteException":{"exception":"FileNotFoundException",
                "javaClassName":"java.io.FileNotFoundException","message":"File does not exist: /missing"}}"#,
            )
            .create_async()
            .await;
        let _denied = server
            .mock("GET", "/webhdfs/v1/secret")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(
                r#"{"RemoteException":{"exception":"AccessControlException",
                "message":"Permission denied: user=bob, access=READ"}}"#,
            )
            .create_async()
            .await;

        let c = client(&server.url());
        let missing = c.get_status(&hdfs(), "/missing").await.unwrap_err();
        assert!(missing.is_not_found());
        assert!(!c.is_file(&hdfs(), "/missing").await.unwrap());

        let denied = c.get_status(&hdfs(), "/secret").await.unwrap_err();
        assert!(matches!(denied, RemoteFsError::PermissionDenied(ref m) if m.contains("user=bob")));
    }

    #[tokio::test]
    async fn test_boolean_operations() {
        let mut server = mockito::Server::new_async().await;
        let _mkdirs = server
            .mock("PUT", "/webhdfs/v1/home/alice/new")
            .match_query(query(&[("op", "MKDIRS")]))
            .with_status(200)
            .with_body(r#"{"boolean":false}"#)
            .create_async()
            .await;
        let rename = server
            .mock("PUT", "/webhdfs/v1/a")
            .match_query(query(&[("op", "RENAME"), ("destination", "/b")]))
            .with_status(200)
            .with_body(r#"{"boolean":true}"#)
            .create_async()
            .await;
        let _delete = server
            .mock("DELETE", "/webhdfs/v1/b")
            .match_query(query(&[("op", "DELETE"), ("recursive", "true")]))
            .with_status(200)
            .with_body(r#"{"boolean":false}"#)
            .create_async()
            .await;

        let c = client(&server.url());
        assert!(c.mkdirs(&hdfs(), "/home/alice/new").await.is_err());
        assert!(c.rename(&hdfs(), "/a", "/b").await.unwrap());
        rename.assert_async().await;
        assert!(!c.delete(&hdfs(), "/b", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_open_follows_datanode_redirect() {
        let mut server = mockito::Server::new_async().await;
        let datanode = format!("{}/datanode/file.txt?op=OPEN", server.url());
        let _namenode = server
            .mock("GET", "/webhdfs/v1/file.txt")
            .match_query(query(&[("op", "OPEN")]))
            .with_status(307)
            .with_header("location", &datanode)
            .create_async()
            .await;
        let _dn = server
            .mock("GET", "/datanode/file.txt")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("hello world")
            .create_async()
            .await;

        let mut reader = client(&server.url()).open(&hdfs(), "/file.txt").await.unwrap();
        let mut contents = String::new();
        reader.read_to_string(&mut contents).await.unwrap();
        assert_eq!(contents, "hello world");
    }

    #[tokio::test]
    async fn test_create_streams_upload_to_location() {
        let mut server = mockito::Server::new_async().await;
        let upload_url = format!("{}/datanode/upload", server.url());
        let _namenode = server
            .mock("PUT", "/webhdfs/v1/home/alice/out.bin")
            .match_query(query(&[("op", "CREATE"), ("overwrite", "true"), ("noredirect", "true")]))
            .with_status(200)
            .with_body(format!(r#"{{"Location":"{}"}}"#, upload_url))
            .create_async()
            .await;
        let upload = server
            .mock("PUT", "/datanode/upload")
            .match_body("chunk-1 chunk-2")
            .with_status(201)
            .create_async()
            .await;

        let mut writer = client(&server.url())
            .create(&hdfs(), "/home/alice/out.bin")
            .await
            .unwrap();
        writer.write_all(b"chunk-1 ").await.unwrap();
        writer.write_all(b"chunk-2").await.unwrap();
        writer.shutdown().await.unwrap();

        upload.assert_async().await;
    }

    #[tokio::test]
    async fn test_failed_upload_surfaces_on_shutdown() {
        let mut server = mockito::Server::new_async().await;
        let upload_url = format!("{}/datanode/upload", server.url());
        let _namenode = server
            .mock("PUT", "/webhdfs/v1/f")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(format!(r#"{{"Location":"{}"}}"#, upload_url))
            .create_async()
            .await;
        let _upload = server
            .mock("PUT", "/datanode/upload")
            .with_status(500)
            .with_body(r#"{"RemoteException":{"exception":"IOException","message":"disk full"}}"#)
            .create_async()
            .await;

        let mut writer = client(&server.url()).create(&hdfs(), "/f").await.unwrap();
        writer.write_all(b"data").await.unwrap();
        let err = writer.shutdown().await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}
