//! Package registries - where registry keys get their clone URLs.
//!
//! The default registry lists every repository of a GitHub organization
//! through the REST API. An `index` registry instead downloads one JSON
//! object mapping package names to clone URLs.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::core::package_ref::PackageIndex;
use crate::util::config::{RegistryConfig, RegistryKind};

/// Repositories requested per API page (GitHub's maximum).
const PAGE_SIZE: usize = 100;

/// A source of registry entries.
pub trait PackageRegistry {
    /// Human-readable location, for messages.
    fn describe(&self) -> String;

    /// Download the full name -> clone URL map.
    fn fetch_index(&self) -> Result<PackageIndex>;
}

/// Every repository of a GitHub organization, keyed by repository name.
#[derive(Debug, Clone)]
pub struct GithubOrgRegistry {
    api_url: String,
    organization: String,
    prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    clone_url: String,
}

impl GithubOrgRegistry {
    pub fn new(
        api_url: impl Into<String>,
        organization: impl Into<String>,
        prefix: Option<String>,
    ) -> Self {
        GithubOrgRegistry {
            api_url: api_url.into(),
            organization: organization.into(),
            prefix,
        }
    }

    fn page_url(&self, page: usize) -> String {
        format!(
            "{}/orgs/{}/repos?per_page={}&page={}",
            self.api_url.trim_end_matches('/'),
            self.organization,
            PAGE_SIZE,
            page
        )
    }

    /// Turn one page of API results into index entries.
    fn collect(&self, repos: Vec<GithubRepo>, index: &mut PackageIndex) {
        for repo in repos {
            if let Some(prefix) = &self.prefix {
                if !repo.name.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            index.insert(repo.name, repo.clone_url);
        }
    }
}

impl PackageRegistry for GithubOrgRegistry {
    fn describe(&self) -> String {
        format!("GitHub organization {}", self.organization)
    }

    fn fetch_index(&self) -> Result<PackageIndex> {
        let client = http_client()?;
        let mut index = PackageIndex::new();

        for page in 1.. {
            let url = self.page_url(page);
            tracing::debug!("listing {}", url);

            let response = client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .send()
                .with_context(|| format!("failed to list repositories from {}", url))?;

            if !response.status().is_success() {
                bail!(
                    "failed to list repositories of {}: HTTP {}",
                    self.organization,
                    response.status()
                );
            }

            let repos: Vec<GithubRepo> = response
                .json()
                .with_context(|| format!("unexpected response from {}", url))?;
            let last_page = repos.len() < PAGE_SIZE;
            self.collect(repos, &mut index);
            if last_page {
                break;
            }
        }

        tracing::debug!("{} lists {} packages", self.describe(), index.len());
        Ok(index)
    }
}

/// A JSON document `{ "<name>": "<clone url>", ... }`.
#[derive(Debug, Clone)]
pub struct IndexRegistry {
    url: String,
}

impl IndexRegistry {
    pub fn new(url: impl Into<String>) -> Self {
        IndexRegistry { url: url.into() }
    }
}

impl PackageRegistry for IndexRegistry {
    fn describe(&self) -> String {
        format!("package index {}", self.url)
    }

    fn fetch_index(&self) -> Result<PackageIndex> {
        tracing::debug!("downloading {}", self.url);

        let response = http_client()?
            .get(&self.url)
            .send()
            .with_context(|| format!("failed to download package index from {}", self.url))?;

        if !response.status().is_success() {
            bail!(
                "failed to download package index from {}: HTTP {}",
                self.url,
                response.status()
            );
        }

        response
            .json()
            .with_context(|| format!("package index at {} is not a name -> URL map", self.url))
    }
}

/// No remote at all; only static entries resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    index: PackageIndex,
}

impl StaticRegistry {
    pub fn new(index: PackageIndex) -> Self {
        StaticRegistry { index }
    }
}

impl PackageRegistry for StaticRegistry {
    fn describe(&self) -> String {
        "static package list".to_string()
    }

    fn fetch_index(&self) -> Result<PackageIndex> {
        Ok(self.index.clone())
    }
}

/// Build the registry described by the `[registry]` config section.
pub fn registry_from_config(config: &RegistryConfig) -> Result<Box<dyn PackageRegistry>> {
    match config.kind() {
        RegistryKind::GithubOrg => Ok(Box::new(GithubOrgRegistry::new(
            config.api_url(),
            config.organization(),
            config.prefix.clone(),
        ))),
        RegistryKind::Index => match &config.url {
            Some(url) => Ok(Box::new(IndexRegistry::new(url.clone()))),
            None => bail!("registry kind `index` requires `registry.url` to be set"),
        },
    }
}

/// Static `[registry.packages]` entries from the config.
pub fn static_entries(config: &RegistryConfig) -> PackageIndex {
    config
        .packages
        .iter()
        .map(|(name, url)| (name.clone(), url.clone()))
        .collect()
}

fn http_client() -> Result<Client> {
    // GitHub rejects API requests without a User-Agent
    Client::builder()
        .user_agent(concat!("sammy/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to create HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_API: &str = crate::util::config::DEFAULT_API_URL;

    fn repo(name: &str) -> GithubRepo {
        GithubRepo {
            name: name.to_string(),
            clone_url: format!("https://github.com/SJSU-Dev2/{}.git", name),
        }
    }

    #[test]
    fn test_page_url() {
        let registry = GithubOrgRegistry::new("https://api.github.com/", "SJSU-Dev2", None);
        assert_eq!(
            registry.page_url(2),
            "https://api.github.com/orgs/SJSU-Dev2/repos?per_page=100&page=2"
        );
    }

    #[test]
    fn test_prefix_filter() {
        let registry =
            GithubOrgRegistry::new(DEFAULT_API, "SJSU-Dev2", Some("lib".to_string()));
        let mut index = PackageIndex::new();
        registry.collect(
            vec![repo("libcore"), repo("sammy"), repo("liblpc40xx")],
            &mut index,
        );

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("libcore"),
            Some("https://github.com/SJSU-Dev2/libcore.git")
        );
        assert!(index.get("sammy").is_none());
    }

    #[test]
    fn test_no_prefix_keeps_everything() {
        let registry = GithubOrgRegistry::new(DEFAULT_API, "SJSU-Dev2", None);
        let mut index = PackageIndex::new();
        registry.collect(vec![repo("libcore"), repo("sammy")], &mut index);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_github_response_shape() {
        let body = r#"[
            {"id": 1, "name": "libcore", "clone_url": "https://github.com/SJSU-Dev2/libcore.git", "private": false}
        ]"#;
        let repos: Vec<GithubRepo> = serde_json::from_str(body).unwrap();
        assert_eq!(repos[0].name, "libcore");
    }

    #[test]
    fn test_registry_from_config() {
        let config = RegistryConfig::default();
        let registry = registry_from_config(&config).unwrap();
        assert_eq!(registry.describe(), "GitHub organization SJSU-Dev2");

        let config = RegistryConfig {
            kind: Some(RegistryKind::Index),
            url: Some("https://example.com/index.json".into()),
            ..Default::default()
        };
        let registry = registry_from_config(&config).unwrap();
        assert_eq!(
            registry.describe(),
            "package index https://example.com/index.json"
        );

        let config = RegistryConfig {
            kind: Some(RegistryKind::Index),
            ..Default::default()
        };
        assert!(registry_from_config(&config).is_err());
    }

    #[test]
    fn test_static_entries() {
        let mut config = RegistryConfig::default();
        config
            .packages
            .insert("libmirror".into(), "/srv/git/libmirror".into());
        let index = static_entries(&config);
        assert_eq!(index.get("libmirror"), Some("/srv/git/libmirror"));

        let registry = StaticRegistry::new(index);
        assert_eq!(registry.fetch_index().unwrap().len(), 1);
    }
}
