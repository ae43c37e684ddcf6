use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ScaleWobError, ScaleWobResult};

/// Declared type of a required evaluation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Boolean,
}

/// A parameter value collected from the user before evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnvironmentMetrics {
    #[serde(default)]
    pub complexity: f64,
    #[serde(default)]
    pub completion: f64,
}

/// Catalog record describing one hosted environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDescriptor {
    pub id: String,
    pub task_name: String,
    #[serde(default)]
    pub description: String,
    /// e.g. "Web Applications", "Mobile Interfaces".
    #[serde(default)]
    pub platform: String,
    /// "Beginner", "Intermediate" or "Advanced".
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Parameter name → declared type; all listed parameters are required
    /// for evaluation.
    #[serde(default)]
    pub params: BTreeMap<String, ParamType>,
    #[serde(default)]
    pub metrics: EnvironmentMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvironmentCatalog {
    #[serde(default)]
    pub environments: Vec<EnvironmentDescriptor>,
}

impl EnvironmentCatalog {
    pub fn lookup(&self, id: &str) -> Option<&EnvironmentDescriptor> {
        self.environments.iter().find(|env| env.id == id)
    }

    pub fn previews(&self) -> &[EnvironmentDescriptor] {
        &self.environments
    }

    /// Gallery listing narrowed by platform and difficulty; `None` means no
    /// filter on that axis.
    pub fn filtered_previews(
        &self,
        platform: Option<&str>,
        difficulty: Option<&str>,
    ) -> Vec<&EnvironmentDescriptor> {
        self.environments
            .iter()
            .filter(|env| platform.map_or(true, |p| env.platform == p))
            .filter(|env| difficulty.map_or(true, |d| env.difficulty == d))
            .collect()
    }
}

/// Where an environment document is served from.
pub fn environment_url(cdn_base: &str, environment_id: &str) -> String {
    format!(
        "{}/{}/index.html",
        cdn_base.trim_end_matches('/'),
        environment_id
    )
}

/// Read-only source of catalog data.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self) -> ScaleWobResult<EnvironmentCatalog>;
}

pub struct HttpCatalogSource {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self) -> ScaleWobResult<EnvironmentCatalog> {
        tracing::debug!(url = %self.url, "fetching environment catalog");
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ScaleWobError::Catalog(format!(
                "catalog request failed with status {}",
                response.status()
            )));
        }
        let catalog: EnvironmentCatalog = response.json().await?;
        tracing::info!(count = catalog.environments.len(), "environment catalog loaded");
        Ok(catalog)
    }
}

/// Local JSON file source, used in tests and offline setups.
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self) -> ScaleWobResult<EnvironmentCatalog> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let catalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptor_parses_wire_field_names() {
        let catalog: EnvironmentCatalog = serde_json::from_value(json!({
            "environments": [{
                "id": "shopping-cart",
                "taskName": "Add items to cart",
                "params": {"count": "number", "label": "string"},
                "metrics": {"complexity": 6.0, "completion": 72.5}
            }]
        }))
        .unwrap();

        let env = catalog.lookup("shopping-cart").unwrap();
        assert_eq!(env.task_name, "Add items to cart");
        assert_eq!(env.params["count"], ParamType::Number);
        assert_eq!(env.metrics.complexity, 6.0);
        assert!(catalog.lookup("missing").is_none());
    }

    #[test]
    fn previews_filter_by_platform_and_difficulty() {
        let catalog = EnvironmentCatalog {
            environments: vec![
                EnvironmentDescriptor {
                    id: "a".into(),
                    platform: "Web Applications".into(),
                    difficulty: "Beginner".into(),
                    ..Default::default()
                },
                EnvironmentDescriptor {
                    id: "b".into(),
                    platform: "Mobile Interfaces".into(),
                    difficulty: "Advanced".into(),
                    ..Default::default()
                },
            ],
        };

        assert_eq!(catalog.filtered_previews(None, None).len(), 2);
        let mobile = catalog.filtered_previews(Some("Mobile Interfaces"), None);
        assert_eq!(mobile.len(), 1);
        assert_eq!(mobile[0].id, "b");
        assert!(catalog
            .filtered_previews(Some("Mobile Interfaces"), Some("Beginner"))
            .is_empty());
    }

    #[test]
    fn environment_url_is_templated_from_base_and_id() {
        assert_eq!(
            environment_url("https://cdn.example/scalewob-env/", "todo-list"),
            "https://cdn.example/scalewob-env/todo-list/index.html"
        );
    }

    #[tokio::test]
    async fn file_source_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"environments": [{"id": "demo", "taskName": "Demo"}]}"#,
        )
        .unwrap();

        let catalog = FileCatalogSource::new(&path).fetch().await.unwrap();
        assert_eq!(catalog.environments.len(), 1);
        assert!(catalog.lookup("demo").unwrap().params.is_empty());
    }
}
