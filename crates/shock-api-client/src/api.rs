//! Node, ACL, index and query methods of the Shock client.

use std::path::{Path, PathBuf};

use reqwest::multipart::Form;
use reqwest::Method;
use serde_json::Value;
use shock_core::{Acl, AclKind, Compression, Node, PreauthUrl, ShockError, ShockResult};

use crate::payload::{Payload, UploadFile};
use crate::transport::{DownloadOptions, TransportKind};
use crate::ApiClient;

impl ApiClient {
    /// Fetch a node's metadata.
    pub async fn get_node(&self, node_id: &str) -> ShockResult<Node> {
        require("node id", node_id)?;
        let url = self.http.node_url(node_id, "");
        self.http
            .send_data(self.http.request(Method::GET, &url), &url)
            .await
    }

    /// Create a node, optionally with content and an attributes document.
    pub async fn create_node(
        &self,
        upload: Option<UploadFile>,
        attributes: Option<UploadFile>,
    ) -> ShockResult<Node> {
        self.upload(None, upload, attributes).await
    }

    /// `PUT /node/{id}` when `node_id` is given, `POST /node` otherwise.
    ///
    /// With the external transport a new node from a path is created by the
    /// helper; attributes are then attached with a second request.
    pub async fn upload(
        &self,
        node_id: Option<&str>,
        upload: Option<UploadFile>,
        attributes: Option<UploadFile>,
    ) -> ShockResult<Node> {
        let external_path = match (&upload, node_id) {
            (Some(file), None) if self.transport.kind() == TransportKind::External => {
                file.path().map(Path::to_path_buf)
            }
            _ => None,
        };

        if let Some(path) = external_path {
            let node = self.transport.upload_path(&path).await?;
            return match attributes {
                Some(attributes) => self.send_node_form(Some(&node.id), None, Some(attributes)).await,
                None => Ok(node),
            };
        }

        self.send_node_form(node_id, upload, attributes).await
    }

    async fn send_node_form(
        &self,
        node_id: Option<&str>,
        upload: Option<UploadFile>,
        attributes: Option<UploadFile>,
    ) -> ShockResult<Node> {
        let (method, url) = match node_id {
            Some(id) => {
                require("node id", id)?;
                (Method::PUT, self.http.node_url(id, ""))
            }
            None => (Method::POST, self.http.build_url("/node")),
        };

        let mut form = Form::new();
        if let Some(upload) = upload {
            form = form.part("upload", upload.into_part().await?);
        }
        if let Some(attributes) = attributes {
            form = form.part("attributes", attributes.into_part().await?);
        }

        tracing::debug!(method = %method, url = %url, "Sending node form");
        let request = self.http.streaming_request(method, &url).multipart(form);
        self.http.send_data(request, &url).await
    }

    /// Write a node's content to `path`.
    pub async fn download_to_path(
        &self,
        node_id: &str,
        path: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> ShockResult<PathBuf> {
        let path = path.as_ref();
        require("node id", node_id)?;
        if path.as_os_str().is_empty() {
            return Err(ShockError::InvalidInput(
                "download requires a non-empty path".into(),
            ));
        }
        self.transport
            .download_to_path(node_id, path, options)
            .await
    }

    /// Request a one-time download URL that needs no credentials.
    pub async fn download_url(
        &self,
        node_id: &str,
        compression: Option<Compression>,
    ) -> ShockResult<PreauthUrl> {
        require("node id", node_id)?;
        let mut query = String::from("download_url");
        if let Some(compression) = compression {
            query.push_str(&format!("&compression={}", compression));
        }
        let url = self.http.node_url(node_id, &format!("?{}", query));
        self.http
            .send_data(self.http.request(Method::GET, &url), &url)
            .await
    }

    pub async fn delete_node(&self, node_id: &str) -> ShockResult<()> {
        require("node id", node_id)?;
        let url = self.http.node_url(node_id, "");
        self.http
            .send_value(self.http.request(Method::DELETE, &url), &url)
            .await?;
        tracing::info!(node_id = %node_id, "Deleted node");
        Ok(())
    }

    pub async fn get_acl(&self, node_id: &str) -> ShockResult<Acl> {
        require("node id", node_id)?;
        let url = self.http.node_url(node_id, "/acl");
        self.http
            .send_data(self.http.request(Method::GET, &url), &url)
            .await
    }

    /// Grant `kind` to every user in `users`.
    pub async fn add_acl(&self, node_id: &str, kind: AclKind, users: &[&str]) -> ShockResult<Acl> {
        self.modify_acl(Method::PUT, node_id, kind, users).await
    }

    /// Revoke `kind` from every user in `users`.
    pub async fn delete_acl(
        &self,
        node_id: &str,
        kind: AclKind,
        users: &[&str],
    ) -> ShockResult<Acl> {
        self.modify_acl(Method::DELETE, node_id, kind, users).await
    }

    /// Make `user` the node's owner.
    pub async fn chown(&self, node_id: &str, user: &str) -> ShockResult<Acl> {
        self.add_acl(node_id, AclKind::Owner, &[user]).await
    }

    async fn modify_acl(
        &self,
        method: Method,
        node_id: &str,
        kind: AclKind,
        users: &[&str],
    ) -> ShockResult<Acl> {
        require("node id", node_id)?;
        if users.is_empty() || users.iter().any(|u| u.trim().is_empty()) {
            return Err(ShockError::InvalidInput(
                "ACL change requires at least one user".into(),
            ));
        }
        let users = users
            .iter()
            .map(|u| urlencoding::encode(u.trim()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let url = self
            .http
            .node_url(node_id, &format!("/acl/{}?users={}", kind, users));
        self.http
            .send_data(self.http.request(method, &url), &url)
            .await
    }

    /// Nodes whose attributes match every `key=value` filter.
    pub async fn query_node(&self, filters: &[(&str, &str)]) -> ShockResult<Vec<Node>> {
        let mut query = String::from("query");
        for (key, value) in filters {
            query.push_str(&format!(
                "&{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            ));
        }
        let url = self.http.build_url(&format!("/node?{}", query));
        let data = self
            .http
            .send_value(self.http.request(Method::GET, &url), &url)
            .await?;

        // The service reports an empty result set as null.
        if data.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(data)
            .map_err(|e| ShockError::MalformedResponse(format!("unexpected data shape: {}", e)))
    }

    /// Build the named index on a node.
    pub async fn index_node(&self, node_id: &str, index: &str) -> ShockResult<Value> {
        require("node id", node_id)?;
        require("index name", index)?;
        let url = self
            .http
            .node_url(node_id, &format!("/index/{}", urlencoding::encode(index)));
        self.http
            .send_value(self.http.streaming_request(Method::PUT, &url), &url)
            .await
    }
}

fn require(what: &str, value: &str) -> ShockResult<()> {
    if value.trim().is_empty() {
        return Err(ShockError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Attributes document from an in-memory JSON value.
pub fn attributes_json(attributes: &Value) -> UploadFile {
    UploadFile::named(
        Payload::Bytes(attributes.to_string().into_bytes()),
        "attributes.json",
    )
}
