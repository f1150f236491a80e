use std::path::Path;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::molecule::Molecule;

use super::{
    ClientConfig, Collection, ComputeResponse, DatasetKind, KeywordSet, ObjectId,
    OptimizationProcedure, PortalClient, PortalError, TorsionDriveInput,
};

#[derive(Serialize)]
struct RequestBody<'a, T: Serialize> {
    meta: Value,
    data: &'a T,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseMeta {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error_description: Value,
    #[serde(default)]
    errors: Vec<Value>,
}

impl ResponseMeta {
    fn message(&self) -> String {
        match &self.error_description {
            Value::String(s) if !s.is_empty() => s.clone(),
            _ if !self.errors.is_empty() => format!("{:?}", self.errors),
            _ => "no error description".to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct ResponseBody<R> {
    #[serde(default)]
    meta: ResponseMeta,
    data: R,
}

/// REST client for a QCFractal server.
pub struct FractalClient {
    base_url: String,
    http: reqwest::Client,
    credentials: Option<(String, Option<String>)>,
}

impl FractalClient {
    pub fn from_config(config: &ClientConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify)
            .build()?;

        if !config.verify {
            log::warn!("TLS certificate verification is disabled");
        }

        Ok(Self {
            base_url: config.base_url(),
            http,
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
        })
    }

    pub fn from_file(path: Option<&Path>) -> Result<Self, PortalError> {
        let config = ClientConfig::from_file(path)?;
        let client = Self::from_config(&config)?;
        log::info!("connected to {}", client.base_url);
        Ok(client)
    }

    async fn request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        meta: Value,
        data: &T,
    ) -> Result<R, PortalError>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        log::debug!("{} {}", method, url);

        let mut builder = self
            .http
            .request(method, &url)
            .json(&RequestBody { meta, data });
        if let Some((user, password)) = &self.credentials {
            builder = builder.basic_auth(user, password.as_ref());
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(PortalError::Remote {
                endpoint: endpoint.to_string(),
                message: format!("{}: {}", status, text),
            });
        }

        let body: ResponseBody<R> = serde_json::from_str(&text)?;
        if !body.meta.success {
            return Err(PortalError::Remote {
                endpoint: endpoint.to_string(),
                message: body.meta.message(),
            });
        }

        Ok(body.data)
    }
}

fn required_ids(endpoint: &str, ids: Vec<Option<ObjectId>>) -> Result<Vec<ObjectId>, PortalError> {
    ids.into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| PortalError::Remote {
            endpoint: endpoint.to_string(),
            message: "server did not return an id for every object".to_string(),
        })
}

impl PortalClient for FractalClient {
    async fn get_collection(
        &self,
        kind: DatasetKind,
        name: &str,
    ) -> Result<Collection, PortalError> {
        let query = json!({"collection": kind.collection_type(), "name": name});
        let found: Vec<Collection> = self
            .request(Method::GET, "collection", json!({}), &query)
            .await?;

        found
            .into_iter()
            .next()
            .ok_or_else(|| PortalError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    async fn add_collection(
        &self,
        collection: &Collection,
        overwrite: bool,
    ) -> Result<ObjectId, PortalError> {
        self.request(
            Method::POST,
            "collection",
            json!({"overwrite": overwrite}),
            collection,
        )
        .await
    }

    async fn add_keywords(&self, keywords: &[KeywordSet]) -> Result<Vec<ObjectId>, PortalError> {
        let ids = self
            .request(Method::POST, "keyword", json!({}), &keywords)
            .await?;
        required_ids("keyword", ids)
    }

    async fn add_molecules(&self, molecules: &[Molecule]) -> Result<Vec<ObjectId>, PortalError> {
        let ids = self
            .request(Method::POST, "molecule", json!({}), &molecules)
            .await?;
        required_ids("molecule", ids)
    }

    async fn add_service(
        &self,
        services: &[TorsionDriveInput],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        self.request(
            Method::POST,
            "service",
            json!({"tag": tag, "priority": "normal"}),
            &services,
        )
        .await
    }

    async fn add_procedure(
        &self,
        procedure: &OptimizationProcedure,
        molecules: &[ObjectId],
        tag: Option<&str>,
    ) -> Result<ComputeResponse, PortalError> {
        let meta = json!({
            "procedure": "optimization",
            "program": procedure.program,
            "keywords": procedure.keywords,
            "qc_spec": procedure.qc_spec,
            "tag": tag,
            "priority": "normal",
        });
        self.request(Method::POST, "task_queue", meta, &molecules)
            .await
    }
}
