/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Trello REST client.
//!
//! Trello authenticates with `key` and `token` query parameters, so request
//! URLs are never logged and errors are built with the URL stripped.

use super::{BoardService, BoardSpec, CardSpec, CheckItemSpec, RemoteBoard, RemoteCard};
use crate::error::ClientError;
use async_trait::async_trait;
use patchwork_utils::logging::prelude::*;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub struct TrelloClient {
    client: reqwest::Client,
    base_url: Url,
    app_key: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Member {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    id_organizations: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    id: String,
    #[serde(default)]
    short_url: String,
}

#[derive(Debug, Deserialize)]
struct Id {
    id: String,
}

impl TrelloClient {
    pub fn new(
        api_url: &str,
        app_key: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(api_url)
            .map_err(|e| ClientError::Config(format!("Invalid Trello URL: {}", e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            app_key: app_key.to_string(),
            token: token.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(&format!("/1/{}", path))
            .map_err(|e| ClientError::Config(format!("Invalid endpoint: {}", e)))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ClientError> {
        self.client
            .request(method, self.endpoint(path)?)
            .query(&[("key", self.app_key.as_str()), ("token", self.token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(ClientError::from_reqwest)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let response = self.send(method, path, query).await?;
        if !response.status().is_success() {
            return Err(ClientError::from_response(response).await);
        }
        response.json().await.map_err(ClientError::from_reqwest)
    }
}

#[async_trait]
impl BoardService for TrelloClient {
    async fn create_board(&self, spec: &BoardSpec) -> Result<RemoteBoard, ClientError> {
        let me: Member = self
            .call(Method::GET, "members/me", &[("fields", "fullName,idOrganizations")])
            .await?;
        debug!("Creating Trello board as {}", me.full_name);

        let mut query = vec![
            ("name", spec.name.as_str()),
            ("desc", spec.description.as_str()),
            ("prefs_background", spec.background.as_str()),
            ("defaultLists", "true"),
        ];
        // boards are shared with the first organization of the token owner
        if let Some(organization) = me.id_organizations.first() {
            query.push(("idOrganization", organization.as_str()));
            query.push(("prefs_permissionLevel", "org"));
            query.push(("prefs_selfJoin", "true"));
        }

        let created: Created = self.call(Method::POST, "boards/", &query).await?;
        Ok(RemoteBoard {
            id: created.id,
            url: created.short_url,
        })
    }

    async fn first_list(&self, board_id: &str) -> Result<String, ClientError> {
        let lists: Vec<Id> = self
            .call(
                Method::GET,
                &format!("boards/{}/lists", board_id),
                &[("filter", "open")],
            )
            .await?;
        lists
            .into_iter()
            .next()
            .map(|list| list.id)
            .ok_or_else(|| ClientError::Decode(format!("Board {} has no lists", board_id)))
    }

    async fn add_card(&self, list_id: &str, card: &CardSpec) -> Result<RemoteCard, ClientError> {
        let created: Created = self
            .call(
                Method::POST,
                "cards",
                &[
                    ("idList", list_id),
                    ("name", card.name.as_str()),
                    ("desc", card.description.as_str()),
                ],
            )
            .await?;
        Ok(RemoteCard {
            id: created.id,
            url: created.short_url,
        })
    }

    async fn add_checklist(&self, card_id: &str, name: &str) -> Result<String, ClientError> {
        let created: Id = self
            .call(Method::POST, "checklists", &[("idCard", card_id), ("name", name)])
            .await?;
        Ok(created.id)
    }

    async fn add_check_item(
        &self,
        checklist_id: &str,
        item: &CheckItemSpec,
    ) -> Result<String, ClientError> {
        let checked = if item.checked { "true" } else { "false" };
        let created: Id = self
            .call(
                Method::POST,
                &format!("checklists/{}/checkItems", checklist_id),
                &[
                    ("name", item.name.as_str()),
                    ("pos", "bottom"),
                    ("checked", checked),
                ],
            )
            .await?;
        Ok(created.id)
    }

    async fn delete_board(&self, board_id: &str) -> Result<bool, ClientError> {
        let response = self
            .send(Method::DELETE, &format!("boards/{}", board_id), &[])
            .await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(ClientError::from_response(response).await),
        }
    }
}
