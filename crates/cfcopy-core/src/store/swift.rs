//! Swift / Cloud Files HTTP client.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, ETAG, RANGE};
use reqwest::{Body, Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use super::{ByteSink, ByteSource, ObjectPath, ObjectStat, ObjectStore, ReadOutcome};
use crate::checksum::ContentHasher;
use crate::config::Credentials;
use crate::copy::ManifestItem;
use crate::errors::{CopyError, CopyResult, TransferStage};
use crate::session::Session;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const OBJECT_STORE_SERVICE: &str = "cloudFiles";

#[derive(Serialize)]
struct AuthRequest<'a> {
    auth: KeyCredentialsWrapper<'a>,
}

#[derive(Serialize)]
struct KeyCredentialsWrapper<'a> {
    #[serde(rename = "RAX-KSKEY:apiKeyCredentials")]
    credentials: KeyCredentials<'a>,
}

#[derive(Serialize)]
struct KeyCredentials<'a> {
    username: &'a str,
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct AccessWrapper {
    access: ServiceAccess,
}

#[derive(Debug, Deserialize)]
struct ServiceAccess {
    #[serde(rename = "serviceCatalog", default)]
    catalog: Vec<ServiceCatalog>,
    token: TokenData,
}

#[derive(Debug, Deserialize)]
struct ServiceCatalog {
    name: String,
    #[serde(default)]
    endpoints: Vec<ServiceEndpoint>,
}

#[derive(Debug, Deserialize)]
struct ServiceEndpoint {
    region: String,
    #[serde(rename = "publicURL")]
    public_url: String,
}

#[derive(Debug, Deserialize)]
struct TokenData {
    id: String,
    #[serde(default)]
    tenant: Option<TenantData>,
}

#[derive(Debug, Deserialize)]
struct TenantData {
    id: String,
}

/// [`ObjectStore`] speaking the Swift HTTP API with Rackspace key authentication.
#[derive(Clone)]
pub struct SwiftClient {
    http: Client,
    credentials: Credentials,
}

impl SwiftClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_http_client(Client::new(), credentials)
    }

    pub fn with_http_client(http: Client, credentials: Credentials) -> Self {
        Self { http, credentials }
    }

    fn object_url(session: &Session, path: ObjectPath<'_>) -> CopyResult<Url> {
        let endpoint = session.endpoint(path.region)?;
        build_object_url(endpoint, path.container, path.key).ok_or_else(|| {
            CopyError::download(
                path.to_string(),
                format!("invalid object URL under endpoint {endpoint}"),
                false,
            )
        })
    }
}

fn build_object_url(endpoint: &str, container: &str, key: &str) -> Option<Url> {
    let mut url = Url::parse(endpoint).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty().push(container).extend(key.split('/'));
    }
    Some(url)
}

/// `Range` header value for a ranged read; `None` means the whole object.
///
/// `length == 0` reads from `offset` through the end of the object.
fn range_header(offset: u64, length: u64) -> Option<String> {
    match (offset, length) {
        (0, 0) => None,
        (_, 0) => Some(format!("bytes={offset}-")),
        // The range end is inclusive
        _ => Some(format!("bytes={}-{}", offset, offset + length - 1)),
    }
}

/// Region -> public URL for the object-store service in the catalog.
fn catalog_endpoints(access: &ServiceAccess) -> HashMap<String, String> {
    access
        .catalog
        .iter()
        .find(|entry| entry.name == OBJECT_STORE_SERVICE)
        .map(|entry| {
            entry
                .endpoints
                .iter()
                .map(|ep| (ep.region.clone(), ep.public_url.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn status_is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

fn request_error(stage: TransferStage, path: &ObjectPath<'_>, err: reqwest::Error) -> CopyError {
    CopyError::Transfer {
        stage,
        path: path.to_string(),
        message: err.to_string(),
        retryable: err.is_timeout() || err.is_connect() || err.is_request() || err.is_body(),
    }
}

fn status_error(
    stage: TransferStage,
    path: &ObjectPath<'_>,
    verb: &str,
    status: StatusCode,
) -> CopyError {
    CopyError::Transfer {
        stage,
        path: path.to_string(),
        message: format!("could not {verb} cloud file, status: {}", status.as_u16()),
        retryable: status_is_retryable(status),
    }
}

fn header_str<'a>(resp: &'a Response, name: reqwest::header::HeaderName) -> Option<&'a str> {
    resp.headers().get(name).and_then(|v| v.to_str().ok())
}

fn required_etag(
    stage: TransferStage,
    path: &ObjectPath<'_>,
    resp: &Response,
) -> CopyResult<String> {
    header_str(resp, ETAG)
        .map(str::to_string)
        .ok_or_else(|| CopyError::Transfer {
            stage,
            path: path.to_string(),
            message: "response carried no Etag header".into(),
            retryable: false,
        })
}

#[async_trait]
impl ObjectStore for SwiftClient {
    async fn authorize(&self) -> CopyResult<Session> {
        let body = AuthRequest {
            auth: KeyCredentialsWrapper {
                credentials: KeyCredentials {
                    username: &self.credentials.username,
                    api_key: &self.credentials.api_key,
                },
            },
        };

        let resp = self
            .http
            .post(&self.credentials.identity_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CopyError::Auth(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(CopyError::Auth(format!("{} ({})", text.trim(), status.as_u16())));
        }

        let wrapper: AccessWrapper = resp
            .json()
            .await
            .map_err(|e| CopyError::Auth(format!("malformed identity response: {e}")))?;
        let endpoints = catalog_endpoints(&wrapper.access);
        if endpoints.is_empty() {
            return Err(CopyError::Auth(format!(
                "service catalog has no {OBJECT_STORE_SERVICE} endpoints"
            )));
        }
        let token = wrapper.access.token;
        let tenant_id = token.tenant.map(|t| t.id).unwrap_or_default();
        let session = Session::new(token.id, tenant_id, endpoints);

        let mut regions: Vec<&str> = session.regions().collect();
        regions.sort_unstable();
        debug!(
            "authorized {} with object store regions: {}",
            self.credentials.username,
            regions.join(", ")
        );
        Ok(session)
    }

    async fn stat(&self, session: &Session, path: ObjectPath<'_>) -> CopyResult<ObjectStat> {
        let url = Self::object_url(session, path)?;
        let resp = self
            .http
            .head(url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .send()
            .await
            .map_err(|e| request_error(TransferStage::Download, &path, e))?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(CopyError::NotFound {
                    path: path.to_string(),
                })
            }
            other => return Err(status_error(TransferStage::Download, &path, "fetch", other)),
        }

        let size = header_str(&resp, CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                CopyError::download(path.to_string(), "could not determine content length", false)
            })?;
        let hash = required_etag(TransferStage::Download, &path, &resp)?;
        Ok(ObjectStat { size, hash })
    }

    async fn ranged_read(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        offset: u64,
        length: u64,
        sink: ByteSink<'_>,
    ) -> CopyResult<ReadOutcome> {
        let url = Self::object_url(session, path)?;
        let mut request = self.http.get(url).header(AUTH_TOKEN_HEADER, &session.token);
        let range = range_header(offset, length);
        if let Some(ref value) = range {
            request = request.header(RANGE, value);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| request_error(TransferStage::Download, &path, e))?;
        match resp.status() {
            StatusCode::OK | StatusCode::PARTIAL_CONTENT => {}
            StatusCode::NOT_FOUND => {
                return Err(CopyError::NotFound {
                    path: path.to_string(),
                })
            }
            other => return Err(status_error(TransferStage::Download, &path, "fetch", other)),
        }

        // The service etag always describes the entire object, so a partial
        // read has to be hashed locally.
        let whole_object_etag = if range.is_none() {
            Some(required_etag(TransferStage::Download, &path, &resp)?)
        } else {
            None
        };

        let mut hasher = ContentHasher::new();
        let mut body = resp.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| request_error(TransferStage::Download, &path, e))?;
            sink.write_all(&chunk)
                .await
                .map_err(|e| CopyError::from_io(TransferStage::Download, path.to_string(), &e))?;
            hasher.update(&chunk);
        }
        sink.flush()
            .await
            .map_err(|e| CopyError::from_io(TransferStage::Download, path.to_string(), &e))?;

        let bytes = hasher.bytes();
        let hash = whole_object_etag.unwrap_or_else(|| hasher.finalize_hex());
        Ok(ReadOutcome { bytes, hash })
    }

    async fn write(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        source: ByteSource,
        length: u64,
    ) -> CopyResult<String> {
        let url = Self::object_url(session, path)?;
        let body = Body::wrap_stream(ReaderStream::new(source));
        let resp = self
            .http
            .put(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, length)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .body(body)
            .send()
            .await
            .map_err(|e| request_error(TransferStage::Upload, &path, e))?;

        if resp.status() != StatusCode::CREATED {
            return Err(status_error(TransferStage::Upload, &path, "put", resp.status()));
        }
        required_etag(TransferStage::Upload, &path, &resp)
    }

    async fn write_manifest(
        &self,
        session: &Session,
        path: ObjectPath<'_>,
        items: &[ManifestItem],
    ) -> CopyResult<()> {
        let manifest_error = |message: String| CopyError::Manifest {
            path: path.to_string(),
            message,
        };

        let mut url = Self::object_url(session, path)?;
        url.set_query(Some("multipart-manifest=put"));
        let resp = self
            .http
            .put(url)
            .header(AUTH_TOKEN_HEADER, &session.token)
            .json(items)
            .send()
            .await
            .map_err(|e| manifest_error(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let text = resp.text().await.unwrap_or_default();
            return Err(manifest_error(format!(
                "status: {}, error: {}",
                status.as_u16(),
                text.trim()
            )));
        }
        Ok(())
    }
}
