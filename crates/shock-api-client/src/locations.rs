//! Client for the location directory: which nodes are stored where.

use reqwest::Method;
use serde_json::Value;
use shock_core::{LocationInfo, LocationState, Node, NodeLocation, ShockError, ShockResult};

use crate::HttpCore;

/// Stateless wrapper around `/location/{name}/...` and `/node/{id}/locations`.
#[derive(Clone, Debug)]
pub struct LocationClient {
    http: HttpCore,
}

impl LocationClient {
    pub fn new(http: HttpCore) -> Self {
        Self { http }
    }

    /// Definition of a location. A 404 or a null payload is `NotFound`.
    pub async fn get_location_info(&self, location: &str) -> ShockResult<LocationInfo> {
        let url = self.location_url(location, "info")?;
        let data = self
            .http
            .send_value(self.http.request(Method::GET, &url), &url)
            .await?;

        if data.is_null() {
            return Err(ShockError::NotFound(format!("location {}", location)));
        }
        decode(data)
    }

    /// Nodes in the given state relative to `location`.
    pub async fn get_nodes_for_location(
        &self,
        location: &str,
        state: LocationState,
    ) -> ShockResult<Vec<Node>> {
        let url = self.location_url(location, state.as_str())?;
        let data = self
            .http
            .send_value(self.http.request(Method::GET, &url), &url)
            .await?;

        let nodes: Vec<Node> = if data.is_null() {
            Vec::new()
        } else {
            decode(data)?
        };
        tracing::debug!(
            location = %location,
            state = %state,
            count = nodes.len(),
            "Listed nodes for location"
        );
        Ok(nodes)
    }

    /// Ids of the nodes in the given state relative to `location`.
    pub async fn get_ids_for_location(
        &self,
        location: &str,
        state: LocationState,
    ) -> ShockResult<Vec<String>> {
        Ok(self
            .get_nodes_for_location(location, state)
            .await?
            .into_iter()
            .map(|node| node.id)
            .collect())
    }

    /// Record that `node_id` is stored at `location`; returns the node's
    /// updated location list.
    pub async fn set_node_location(
        &self,
        node_id: &str,
        location: &str,
    ) -> ShockResult<Vec<NodeLocation>> {
        let url = self.node_locations_url(node_id, None)?;
        let request = self
            .http
            .request(Method::POST, &url)
            .json(&NodeLocation::stored(location));
        let data = self.http.send_value(request, &url).await?;
        tracing::info!(node_id = %node_id, location = %location, "Recorded node location");
        locations_from(data)
    }

    pub async fn get_node_locations(&self, node_id: &str) -> ShockResult<Vec<NodeLocation>> {
        let url = self.node_locations_url(node_id, None)?;
        let data = self
            .http
            .send_value(self.http.request(Method::GET, &url), &url)
            .await?;
        locations_from(data)
    }

    pub async fn delete_node_location(&self, node_id: &str, location: &str) -> ShockResult<()> {
        let url = self.node_locations_url(node_id, Some(location))?;
        self.http
            .send_value(self.http.request(Method::DELETE, &url), &url)
            .await?;
        tracing::info!(node_id = %node_id, location = %location, "Removed node location");
        Ok(())
    }

    fn location_url(&self, location: &str, function: &str) -> ShockResult<String> {
        if location.trim().is_empty() {
            return Err(ShockError::InvalidInput("location must not be empty".into()));
        }
        Ok(self.http.build_url(&format!(
            "/location/{}/{}",
            urlencoding::encode(location),
            function
        )))
    }

    fn node_locations_url(&self, node_id: &str, location: Option<&str>) -> ShockResult<String> {
        if node_id.trim().is_empty() {
            return Err(ShockError::InvalidInput("node id must not be empty".into()));
        }
        Ok(match location {
            Some(location) => self.http.node_url(
                node_id,
                &format!("/locations/{}", urlencoding::encode(location)),
            ),
            None => self.http.node_url(node_id, "/locations"),
        })
    }
}

fn decode<T: serde::de::DeserializeOwned>(data: Value) -> ShockResult<T> {
    serde_json::from_value(data)
        .map_err(|e| ShockError::MalformedResponse(format!("unexpected data shape: {}", e)))
}

// The service answers with either the bare list or a single entry.
fn locations_from(data: Value) -> ShockResult<Vec<NodeLocation>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => decode(data),
        single => Ok(vec![decode(single)?]),
    }
}
