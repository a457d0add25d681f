// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

/// Commit-if-changed synchronization of report files in a repository.
///
/// Provides the [`ContentsApi`] seam over the repository contents endpoints,
/// an Octocrab-backed implementation, and [`push_if_changed`] which only
/// commits when the stored bytes differ from the rendered report.
use std::fmt;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use octocrab::{
    Octocrab,
    models::repos::{CommitAuthor, Content, FileUpdate},
};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{error::Error, inputs::CommitIdentity};

/// Default REST endpoint used when no API URL is configured.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Repository file addressed by owner, repository and path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct FileLocation
{
    /// Account that owns the repository.
    pub owner: String,
    /// Repository name.
    pub repo:  String,
    /// `/`-separated path inside the repository.
    pub path:  String,
}

impl fmt::Display for FileLocation
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        write!(f, "{}/{}:{}", self.owner, self.repo, self.path)
    }
}

/// File currently stored in the repository.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct RemoteFile
{
    /// Repository path of the file.
    pub path:     String,
    /// Decoded bytes, or `None` when the API did not inline decodable
    /// content.
    pub content:  Option<Vec<u8,>,>,
    /// Blob SHA identifying the stored revision.
    pub revision: String,
}

/// Result of probing for an existing file.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub enum FetchOutcome
{
    /// The file exists.
    Found(RemoteFile,),
    /// The file is absent or could not be read.
    NotFound,
}

/// Create-or-update request sent to the contents API.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct FileWrite
{
    /// Target file.
    pub location:  FileLocation,
    /// Commit message.
    pub message:   String,
    /// Raw bytes to store.
    pub content:   Vec<u8,>,
    /// Revision being replaced; `None` creates the file.
    pub revision:  Option<String,>,
    /// Committer recorded on the commit.
    pub committer: Option<CommitIdentity,>,
}

/// Acknowledgement of a successful write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize,)]
pub struct WriteReceipt
{
    /// SHA of the created commit, when reported.
    pub commit: Option<String,>,
}

/// Repository contents operations needed to synchronize a file.
#[async_trait]
pub trait ContentsApi: Send + Sync
{
    /// Reads the file at `location`.
    ///
    /// Failures are reported as [`FetchOutcome::NotFound`]: a missing file is
    /// the normal state on a first run.
    async fn fetch(&self, location: &FileLocation,) -> FetchOutcome;

    /// Creates or updates a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteWrite`] when the API rejects the write,
    /// including revision conflicts with concurrent writers.
    async fn write(&self, request: &FileWrite,) -> Result<WriteReceipt, Error,>;
}

/// Report to synchronize into a repository.
#[derive(Debug, Clone, PartialEq, Eq,)]
pub struct PushRequest
{
    /// Target file.
    pub location:  FileLocation,
    /// Commit message used when a write is needed.
    pub message:   String,
    /// Proposed file content.
    pub content:   Vec<u8,>,
    /// Committer recorded on the commit.
    pub committer: Option<CommitIdentity,>,
}

/// Outcome of [`push_if_changed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct PushOutcome
{
    /// Repository path of the file.
    pub path:    String,
    /// Whether a commit was created.
    pub updated: bool,
    /// SHA of the created commit, when reported.
    pub commit:  Option<String,>,
}

/// Commits `request.content` unless the stored file already holds the same
/// bytes.
///
/// The existing file is read first. Byte-equal content returns
/// `updated: false` without writing. Otherwise a single create-or-update is
/// issued carrying the stored revision, if any, so a concurrent change makes
/// the write fail instead of being overwritten.
///
/// # Errors
///
/// Only the write can fail; see [`ContentsApi::write`].
///
/// # Example
///
/// ```no_run
/// use actions_usage::{
///     CommitIdentity, FileLocation, OctocrabContents, PushRequest, push_if_changed,
/// };
///
/// # async fn example() -> Result<(), actions_usage::Error> {
/// let contents = OctocrabContents::from_token("ghp_token", None,)?;
/// let outcome = push_if_changed(&contents, &PushRequest {
///     location:  FileLocation {
///         owner: "acme".to_owned(),
///         repo:  "reports".to_owned(),
///         path:  "usage.csv".to_owned(),
///     },
///     message:   "Save/Update GitHub Actions usage report (csv)".to_owned(),
///     content:   b"action,count\n".to_vec(),
///     committer: Some(CommitIdentity::actions_bot(),),
/// },)
/// .await?;
/// println!("updated: {}", outcome.updated);
/// # Ok(())
/// # }
/// ```
pub async fn push_if_changed<C,>(api: &C, request: &PushRequest,) -> Result<PushOutcome, Error,>
where
    C: ContentsApi + ?Sized,
{
    let revision = match api.fetch(&request.location,).await {
        FetchOutcome::Found(existing,) => {
            if existing.content.as_deref() == Some(request.content.as_slice(),) {
                info!("no change detected for {}", request.location.path);
                return Ok(PushOutcome {
                    path:    request.location.path.clone(),
                    updated: false,
                    commit:  None,
                },);
            }
            Some(existing.revision,)
        }
        FetchOutcome::NotFound => None,
    };

    debug!(
        "Writing {} ({} bytes, revision {})",
        request.location,
        request.content.len(),
        revision.as_deref().unwrap_or("none")
    );

    let receipt = api
        .write(&FileWrite {
            location:  request.location.clone(),
            message:   request.message.clone(),
            content:   request.content.clone(),
            revision,
            committer: request.committer.clone(),
        },)
        .await?;

    info!("Pushed {}", request.location);

    Ok(PushOutcome {
        path:    request.location.path.clone(),
        updated: true,
        commit:  receipt.commit,
    },)
}

/// [`ContentsApi`] backed by the GitHub REST API.
#[derive(Debug, Clone,)]
pub struct OctocrabContents
{
    client: Octocrab,
}

/// Bytes escaped inside a single repository path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-',).remove(b'.',).remove(b'_',).remove(b'~',);

/// Create-or-update body. `committer` is spelled out here because the
/// octocrab file builder serializes it under a misspelled key.
#[derive(Debug, Serialize,)]
struct PutContentBody<'a,>
{
    message:   &'a str,
    content:   String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha:       Option<&'a str,>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committer: Option<CommitAuthor,>,
}

impl OctocrabContents
{
    /// Wraps an already configured client.
    pub fn new(client: Octocrab,) -> Self
    {
        Self {
            client,
        }
    }

    /// Builds a client authenticated with `token`.
    ///
    /// `api_url` selects a GitHub Enterprise Server endpoint; `None` uses
    /// [`DEFAULT_API_URL`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Client`] when the URL is invalid or the client cannot
    /// be built.
    pub fn from_token(token: &str, api_url: Option<&str,>,) -> Result<Self, Error,>
    {
        let api_url = api_url.map(str::trim,).filter(|url| !url.is_empty(),).unwrap_or(DEFAULT_API_URL,);

        let client = Octocrab::builder()
            .base_uri(api_url,)
            .map_err(|e| Error::client(format!("invalid API URL '{api_url}': {e}"),),)?
            .personal_token(token.to_owned(),)
            .build()
            .map_err(|e| Error::client(e.to_string(),),)?;

        Ok(Self::new(client,),)
    }

    async fn try_fetch(&self, location: &FileLocation,) -> Result<RemoteFile, Error,>
    {
        let fetch_error = |message: String| Error::RemoteFetch {
            path: location.path.clone(),
            message,
        };

        let listing = self
            .client
            .repos(&location.owner, &location.repo,)
            .get_content()
            .path(encode_path(&location.path,),)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string(),),)?;

        let file = listing
            .items
            .into_iter()
            .find(|item| item.r#type == "file" && item.path == location.path,)
            .ok_or_else(|| fetch_error("path does not name a file".to_owned(),),)?;

        Ok(RemoteFile {
            path:     location.path.clone(),
            content:  inline_content(&file, location,),
            revision: file.sha,
        },)
    }
}

#[async_trait]
impl ContentsApi for OctocrabContents
{
    async fn fetch(&self, location: &FileLocation,) -> FetchOutcome
    {
        match self.try_fetch(location,).await {
            Ok(file,) => FetchOutcome::Found(file,),
            Err(error,) => {
                debug!("Treating {} as absent: {}", location, error);
                FetchOutcome::NotFound
            }
        }
    }

    async fn write(&self, request: &FileWrite,) -> Result<WriteReceipt, Error,>
    {
        let location = &request.location;
        let route = format!(
            "/repos/{}/{}/contents/{}",
            utf8_percent_encode(&location.owner, PATH_SEGMENT,),
            utf8_percent_encode(&location.repo, PATH_SEGMENT,),
            encode_path(&location.path,)
        );
        let body = PutContentBody {
            message:   &request.message,
            content:   STANDARD.encode(&request.content,),
            sha:       request.revision.as_deref(),
            committer: request.committer.as_ref().map(commit_author,),
        };

        let update: FileUpdate = self.client.put(route, Some(&body,),).await.map_err(|e| {
            Error::RemoteWrite {
                path: location.path.clone(), message: e.to_string(),
            }
        },)?;

        Ok(WriteReceipt {
            commit: update.commit.sha,
        },)
    }
}

/// Decoded bytes of `file`, or `None` when the API did not inline base64
/// content (files above 1 MB come back with `encoding: "none"`).
fn inline_content(file: &Content, location: &FileLocation,) -> Option<Vec<u8,>,>
{
    if file.encoding.as_deref() != Some("base64",) {
        debug!("No inline content for {} (encoding {:?})", location, file.encoding);
        return None;
    }

    decode_content(file.content.as_deref()?,)
        .map_err(|e| debug!("Undecodable content for {}: {}", location, e),)
        .ok()
}

/// Decodes API base64, which wraps lines every 60 characters.
///
/// `Content::decoded_content` panics on malformed input, so decoding stays
/// here.
fn decode_content(encoded: &str,) -> Result<Vec<u8,>, base64::DecodeError,>
{
    let compact: String = encoded.chars().filter(|ch| !ch.is_ascii_whitespace(),).collect();
    STANDARD.decode(compact,)
}

fn encode_path(path: &str,) -> String
{
    path.split('/',)
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT,).to_string(),)
        .collect::<Vec<_,>>()
        .join("/",)
}

fn commit_author(identity: &CommitIdentity,) -> CommitAuthor
{
    CommitAuthor {
        name:  identity.name.clone(),
        email: identity.email.clone(),
        date:  None,
    }
}


#[cfg(test)]
mod tests
{
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::{fake::MemoryContents, *};

    fn request(path: &str, content: &[u8],) -> PushRequest
    {
        PushRequest {
            location:  FileLocation {
                owner: "acme".to_owned(),
                repo:  "reports".to_owned(),
                path:  path.to_owned(),
            },
            message:   "Save/Update GitHub Actions usage report (csv)".to_owned(),
            content:   content.to_vec(),
            committer: Some(CommitIdentity::actions_bot(),),
        }
    }

    fn file_json(path: &str, sha: &str, encoding: &str, content: &str,) -> serde_json::Value
    {
        let url = format!("https://api.github.com/repos/acme/reports/contents/{path}");
        json!({
            "type": "file",
            "name": path.rsplit('/').next().unwrap_or(path),
            "path": path,
            "sha": sha,
            "size": content.len(),
            "encoding": encoding,
            "content": content,
            "url": &url,
            "_links": {"self": &url}
        })
    }

    fn update_json(path: &str, commit: &str,) -> serde_json::Value
    {
        json!({
            "content": file_json(path, "def456", "base64", ""),
            "commit": {"sha": commit}
        })
    }

    fn contents_for(server: &MockServer,) -> OctocrabContents
    {
        let uri = server.uri();
        OctocrabContents::from_token("ghp_test_token", Some(uri.as_str(),),)
            .expect("failed to build client",)
    }

    #[test]
    fn path_segments_are_percent_encoded()
    {
        assert_eq!(encode_path("usage reports/2025#1.csv",), "usage%20reports/2025%231.csv");
        assert_eq!(encode_path("reports/usage-v1_final.csv",), "reports/usage-v1_final.csv");
    }

    #[test]
    fn decode_content_ignores_line_breaks()
    {
        let decoded = decode_content("YWN0aW9u\nLGNvdW50\n",).expect("valid base64",);
        assert_eq!(decoded, b"action,count");
    }

    #[tokio::test]
    async fn identical_content_is_written_once()
    {
        let contents = MemoryContents::default();
        let proposed = request("usage.csv", b"action,count\n",);

        let first = push_if_changed(&contents, &proposed,).await.expect("first push",);
        let second = push_if_changed(&contents, &proposed,).await.expect("second push",);

        assert!(first.updated);
        assert!(!second.updated);
        assert_eq!(contents.write_count(), 1);
        assert_eq!(contents.fetch_count(), 2);
    }

    #[tokio::test]
    async fn changed_content_is_written_with_revision()
    {
        let contents = MemoryContents::default().with_file("usage.csv", Some(b"old\n",), "sha-old",);

        let outcome =
            push_if_changed(&contents, &request("usage.csv", b"new\n",),).await.expect("push",);

        assert!(outcome.updated);
        assert_eq!(contents.write_count(), 1);
        let writes = contents.writes_seen.lock().unwrap();
        assert_eq!(writes[0].revision.as_deref(), Some("sha-old"));
        assert_eq!(writes[0].committer, Some(CommitIdentity::actions_bot()));
        drop(writes,);
        assert_eq!(contents.stored("usage.csv",), Some(b"new\n".to_vec()));
    }

    #[tokio::test]
    async fn uninlined_content_counts_as_changed()
    {
        let contents = MemoryContents::default().with_file("usage.csv", None, "sha-large",);

        let outcome =
            push_if_changed(&contents, &request("usage.csv", b"new\n",),).await.expect("push",);

        assert!(outcome.updated);
        assert_eq!(contents.write_count(), 1);
        assert_eq!(contents.writes_seen.lock().unwrap()[0].revision.as_deref(), Some("sha-large"));
    }

    #[tokio::test]
    async fn missing_file_is_created_without_revision()
    {
        let contents = MemoryContents::default();

        let outcome =
            push_if_changed(&contents, &request("usage.csv", b"new\n",),).await.expect("push",);

        assert!(outcome.updated);
        assert_eq!(contents.writes_seen.lock().unwrap()[0].revision, None);
    }

    #[tokio::test]
    async fn write_failure_is_propagated()
    {
        let contents = MemoryContents::default().failing_on("usage.csv",);

        let error = push_if_changed(&contents, &request("usage.csv", b"new\n",),)
            .await
            .expect_err("expected write failure",);

        assert!(matches!(error, Error::RemoteWrite { .. }));
    }

    #[tokio::test]
    async fn octocrab_fetch_decodes_existing_file()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/repos/acme/reports/contents/reports/usage.csv",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(file_json(
                "reports/usage.csv",
                "3d21ec53a331a6f037a91c368710b99387d012c1",
                "base64",
                "YWN0aW9u\nLGNvdW50\n",
            ),),)
            .mount(&server,)
            .await;

        let location = FileLocation {
            owner: "acme".to_owned(),
            repo:  "reports".to_owned(),
            path:  "reports/usage.csv".to_owned(),
        };
        let outcome = contents_for(&server,).fetch(&location,).await;

        assert_eq!(
            outcome,
            FetchOutcome::Found(RemoteFile {
                path:     "reports/usage.csv".to_owned(),
                content:  Some(b"action,count".to_vec()),
                revision: "3d21ec53a331a6f037a91c368710b99387d012c1".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn octocrab_fetch_treats_404_as_absent()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .respond_with(ResponseTemplate::new(404,).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            }),),)
            .mount(&server,)
            .await;

        let location = FileLocation {
            owner: "acme".to_owned(),
            repo:  "reports".to_owned(),
            path:  "usage.csv".to_owned(),
        };

        assert_eq!(contents_for(&server,).fetch(&location,).await, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn octocrab_push_skips_unchanged_file()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .respond_with(
                ResponseTemplate::new(200,).set_body_json(file_json("usage.csv", "abc123", "base64", "YWN0aW9uLGNvdW50Cg==",),),
            )
            .mount(&server,)
            .await;
        Mock::given(method("PUT",),)
            .respond_with(ResponseTemplate::new(200,),)
            .expect(0,)
            .mount(&server,)
            .await;

        let outcome = push_if_changed(&contents_for(&server,), &request("usage.csv", b"action,count\n",),)
            .await
            .expect("push",);

        assert!(!outcome.updated);
    }

    #[tokio::test]
    async fn octocrab_push_updates_changed_file()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .respond_with(
                ResponseTemplate::new(200,).set_body_json(file_json("usage.csv", "abc123", "base64", "b2xkCg==",),),
            )
            .mount(&server,)
            .await;
        Mock::given(method("PUT",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .and(body_partial_json(json!({
                "message": "Save/Update GitHub Actions usage report (csv)",
                "content": "YWN0aW9uLGNvdW50Cg==",
                "sha": "abc123",
                "committer": {
                    "name": "github-actions[bot]",
                    "email": "41898282+github-actions[bot]@users.noreply.github.com"
                }
            }),),)
            .respond_with(
                ResponseTemplate::new(200,)
                    .set_body_json(update_json("usage.csv", "7638417db6d59f3c431d3e1f261cc637155684cd",),),
            )
            .expect(1,)
            .mount(&server,)
            .await;

        let outcome = push_if_changed(&contents_for(&server,), &request("usage.csv", b"action,count\n",),)
            .await
            .expect("push",);

        assert!(outcome.updated);
        assert_eq!(outcome.commit.as_deref(), Some("7638417db6d59f3c431d3e1f261cc637155684cd"));
    }

    #[tokio::test]
    async fn octocrab_push_creates_missing_file_without_sha()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .respond_with(ResponseTemplate::new(404,).set_body_json(json!({"message": "Not Found"}),),)
            .mount(&server,)
            .await;
        Mock::given(method("PUT",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .respond_with(ResponseTemplate::new(201,).set_body_json(update_json("usage.csv", "c0ffee",),),)
            .expect(1,)
            .mount(&server,)
            .await;

        let outcome = push_if_changed(&contents_for(&server,), &request("usage.csv", b"new\n",),)
            .await
            .expect("push",);
        assert!(outcome.updated);

        let requests = server.received_requests().await.expect("request recording enabled",);
        let put = requests
            .iter()
            .find(|request| request.method.as_str() == "PUT",)
            .expect("PUT request",);
        let body: serde_json::Value = serde_json::from_slice(&put.body,).expect("JSON body",);
        assert!(body.get("sha",).is_none());
        assert_eq!(body["content"], "bmV3Cg==");
        assert_eq!(body["committer"]["name"], "github-actions[bot]");
    }

    #[tokio::test]
    async fn octocrab_push_with_uninlined_content_sends_sha()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(file_json("usage.csv", "abc", "none", "",),),)
            .mount(&server,)
            .await;
        Mock::given(method("PUT",),)
            .and(path("/repos/acme/reports/contents/usage.csv",),)
            .and(body_partial_json(json!({"content": "", "sha": "abc"}),),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(update_json("usage.csv", "c0ffee",),),)
            .expect(1,)
            .mount(&server,)
            .await;

        let outcome = push_if_changed(&contents_for(&server,), &request("usage.csv", b"",),)
            .await
            .expect("push",);

        assert!(outcome.updated);
        assert_eq!(outcome.commit.as_deref(), Some("c0ffee"));
    }

    #[tokio::test]
    async fn octocrab_fetch_server_error_is_absent()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .respond_with(ResponseTemplate::new(500,).set_body_json(json!({"message": "Server Error"}),),)
            .mount(&server,)
            .await;

        let location = FileLocation {
            owner: "acme".to_owned(),
            repo:  "reports".to_owned(),
            path:  "usage.csv".to_owned(),
        };

        assert_eq!(contents_for(&server,).fetch(&location,).await, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn octocrab_fetch_of_directory_is_absent()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .and(path("/repos/acme/reports/contents/reports",),)
            .respond_with(ResponseTemplate::new(200,).set_body_json(json!([file_json(
                "reports/usage.csv",
                "abc",
                "base64",
                "YQ==",
            )]),),)
            .mount(&server,)
            .await;

        let location = FileLocation {
            owner: "acme".to_owned(),
            repo:  "reports".to_owned(),
            path:  "reports".to_owned(),
        };

        assert_eq!(contents_for(&server,).fetch(&location,).await, FetchOutcome::NotFound);
    }

    #[tokio::test]
    async fn octocrab_write_conflict_is_fatal()
    {
        let server = MockServer::start().await;
        Mock::given(method("GET",),)
            .respond_with(ResponseTemplate::new(404,).set_body_json(json!({"message": "Not Found"}),),)
            .mount(&server,)
            .await;
        Mock::given(method("PUT",),)
            .respond_with(ResponseTemplate::new(409,).set_body_json(json!({
                "message": "usage.csv does not match abc123",
                "documentation_url": "https://docs.github.com/rest"
            }),),)
            .mount(&server,)
            .await;

        let error = push_if_changed(&contents_for(&server,), &request("usage.csv", b"new\n",),)
            .await
            .expect_err("expected conflict",);

        match error {
            Error::RemoteWrite {
                path, ..
            } => assert_eq!(path, "usage.csv"),
            other => panic!("unexpected error variant: {other:?}"),
        }
    }
}
