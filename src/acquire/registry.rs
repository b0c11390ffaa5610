use anyhow::{bail, Result};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const HUB_URL: &str = "https://huggingface.co";

/// The slice of the hub's model-info response we care about: which files
/// the repository actually carries.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    #[serde(default)]
    pub siblings: Vec<RepoFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepoFile {
    pub rfilename: String,
}

impl RepoInfo {
    pub fn has_file(&self, name: &str) -> bool {
        self.siblings.iter().any(|f| f.rfilename == name)
    }
}

/// Client for the model-hub registry: identifier-based lookup first,
/// then a resolve URL for the actual blob.
pub struct Registry {
    client: reqwest::Client,
    hub_url: String,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_hub(HUB_URL)
    }

    pub fn with_hub(hub_url: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap(),
            hub_url: hub_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn repo_info(&self, repo: &str) -> Result<RepoInfo> {
        let url = format!("{}/api/models/{}", self.hub_url, repo);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("registry lookup for {} failed: {}", repo, response.status());
        }

        let info = response.json().await?;
        Ok(info)
    }

    pub fn resolve_url(&self, repo: &str, file: &str) -> Result<Url> {
        let url = Url::parse(&format!("{}/{}/resolve/main/{}", self.hub_url, repo, file))?;
        Ok(url)
    }

}

/// Human-facing repository page, used in manual-recovery instructions.
pub fn browse_url(repo: &str) -> String {
    format!("{HUB_URL}/{repo}/tree/main")
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
