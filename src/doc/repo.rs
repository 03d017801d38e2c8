//! Repository descriptor for issue links
//!
//! `#123` in a doc comment becomes a link only when a descriptor is known.
//! Descriptors come from config, from `kind:owner/repo[@baseUrl]`, or from a
//! git remote URL.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::Error;

/// Hosting service kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepositoryKind {
    GitHub,
    GitLab,
    Bitbucket,
    AzureDevOps,
    #[default]
    Unknown,
}

impl RepositoryKind {
    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            RepositoryKind::GitHub => Some("https://github.com"),
            RepositoryKind::GitLab => Some("https://gitlab.com"),
            RepositoryKind::Bitbucket => Some("https://bitbucket.org"),
            RepositoryKind::AzureDevOps => Some("https://dev.azure.com"),
            RepositoryKind::Unknown => None,
        }
    }

    fn from_host(host: &str) -> Self {
        let host = host.to_lowercase();
        if host.contains("github") {
            RepositoryKind::GitHub
        } else if host.contains("gitlab") {
            RepositoryKind::GitLab
        } else if host.contains("bitbucket") {
            RepositoryKind::Bitbucket
        } else if host.contains("dev.azure.com") || host.contains("visualstudio.com") {
            RepositoryKind::AzureDevOps
        } else {
            RepositoryKind::Unknown
        }
    }
}

impl FromStr for RepositoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" | "gh" => Ok(RepositoryKind::GitHub),
            "gitlab" | "gl" => Ok(RepositoryKind::GitLab),
            "bitbucket" | "bb" => Ok(RepositoryKind::Bitbucket),
            "azuredevops" | "azure" | "ado" => Ok(RepositoryKind::AzureDevOps),
            "unknown" => Ok(RepositoryKind::Unknown),
            _ => Err(Error::invalid_argument(format!(
                "unknown repository kind '{s}' (expected github, gitlab, bitbucket or azuredevops)"
            ))),
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepositoryKind::GitHub => "github",
            RepositoryKind::GitLab => "gitlab",
            RepositoryKind::Bitbucket => "bitbucket",
            RepositoryKind::AzureDevOps => "azuredevops",
            RepositoryKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Where a repository's issues live
///
/// For Azure DevOps `owner` is the organization and `repo` the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RepositoryInfo {
    pub kind: RepositoryKind,
    pub owner: String,
    pub repo: String,
    /// Empty means the kind's public host
    pub base_url: String,
}

impl RepositoryInfo {
    pub fn new(kind: RepositoryKind, owner: &str, repo: &str) -> Self {
        Self {
            kind,
            owner: owner.to_string(),
            repo: repo.to_string(),
            base_url: String::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn base(&self) -> Option<&str> {
        if self.base_url.is_empty() {
            self.kind.default_base_url()
        } else {
            Some(self.base_url.trim_end_matches('/'))
        }
    }

    /// URL of issue `number`, or `None` for an unknown kind
    pub fn issue_url(&self, number: u64) -> Option<String> {
        let base = self.base()?;
        let (owner, repo) = (&self.owner, &self.repo);
        match self.kind {
            RepositoryKind::GitHub | RepositoryKind::Bitbucket => {
                Some(format!("{base}/{owner}/{repo}/issues/{number}"))
            }
            RepositoryKind::GitLab => Some(format!("{base}/{owner}/{repo}/-/issues/{number}")),
            RepositoryKind::AzureDevOps => {
                Some(format!("{base}/{owner}/{repo}/_workitems/edit/{number}"))
            }
            RepositoryKind::Unknown => None,
        }
    }

    /// Parse a git remote URL (https, ssh:// or scp-like `git@host:path`)
    pub fn from_remote_url(url: &str) -> Option<Self> {
        let url = url.trim();
        let (scheme, host, path) = split_remote(url)?;
        let kind = RepositoryKind::from_host(host);
        let segments: Vec<&str> = path
            .trim_matches('/')
            .trim_end_matches(".git")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if kind == RepositoryKind::AzureDevOps {
            return azure_from_segments(host, &segments);
        }

        let [owner_parts @ .., repo] = segments.as_slice() else {
            return None;
        };
        if owner_parts.is_empty() {
            return None;
        }
        // GitLab subgroups stay part of the owner
        let owner = owner_parts.join("/");
        let base_url = if scheme == "http" {
            format!("http://{host}")
        } else {
            format!("https://{host}")
        };
        Some(Self::new(kind, &owner, repo).with_base_url(&base_url))
    }

    /// Descriptor from the `origin` remote (or the first remote) of a
    /// `.git/config` file's text
    pub fn from_git_config(config: &str) -> Option<Self> {
        let mut section = String::new();
        let mut first_url: Option<&str> = None;

        for line in config.lines() {
            let line = line.trim();
            if line.starts_with('[') {
                section = line.to_string();
                continue;
            }
            if !section.starts_with("[remote ") {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            if key.trim() != "url" {
                continue;
            }
            let url = value.trim();
            if section == "[remote \"origin\"]" {
                return Self::from_remote_url(url);
            }
            first_url.get_or_insert(url);
        }

        first_url.and_then(Self::from_remote_url)
    }

    /// Look for `.git/config` under `root`
    pub fn discover(root: &Path) -> Option<Self> {
        let config = std::fs::read_to_string(root.join(".git").join("config")).ok()?;
        let info = Self::from_git_config(&config);
        if let Some(info) = &info {
            log::debug!("repository from git remote: {}:{}/{}", info.kind, info.owner, info.repo);
        }
        info
    }
}

/// `(scheme, host, path)`; scp-like remotes report `ssh`
fn split_remote(url: &str) -> Option<(&str, &str, &str)> {
    if let Some((scheme, rest)) = url.split_once("://") {
        let (authority, path) = rest.split_once('/')?;
        let host = authority.rsplit('@').next()?;
        let host = host.split(':').next()?;
        return Some((scheme, host, path));
    }
    let (user_host, path) = url.split_once(':')?;
    let host = user_host.rsplit('@').next()?;
    if host.is_empty() {
        return None;
    }
    Some(("ssh", host, path))
}

fn azure_from_segments(host: &str, segments: &[&str]) -> Option<RepositoryInfo> {
    let host_lower = host.to_lowercase();
    let is_ssh =
        host_lower.contains("vs-ssh.visualstudio.com") || host_lower == "ssh.dev.azure.com";
    let (org, project) = if is_ssh {
        // v3/{org}/{project}/{repo}
        match segments {
            ["v3", org, project, ..] => (org.to_string(), project.to_string()),
            _ => return None,
        }
    } else if host_lower.ends_with(".visualstudio.com") {
        // https://{org}.visualstudio.com/{project}/_git/{repo}
        let org = host_lower.split('.').next()?.to_string();
        (org, segments.first()?.to_string())
    } else {
        // https://dev.azure.com/{org}/{project}/_git/{repo}
        match segments {
            [org, project, ..] => (org.to_string(), project.to_string()),
            _ => return None,
        }
    };
    Some(RepositoryInfo::new(RepositoryKind::AzureDevOps, &org, &project))
}

impl FromStr for RepositoryInfo {
    type Err = Error;

    /// `kind:owner/repo[@baseUrl]`, or a git remote URL
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((kind, rest)) = s.split_once(':') {
            if let Ok(kind) = kind.parse::<RepositoryKind>() {
                let (path, base_url) = match rest.split_once('@') {
                    Some((path, base)) => (path, Some(base)),
                    None => (rest, None),
                };
                if let Some((owner, repo)) = path.rsplit_once('/') {
                    if !owner.is_empty() && !repo.is_empty() {
                        let info = Self::new(kind, owner, repo);
                        return Ok(match base_url {
                            Some(base) => info.with_base_url(base),
                            None => info,
                        });
                    }
                }
            }
        }

        Self::from_remote_url(s).ok_or_else(|| {
            Error::invalid_argument(format!(
                "cannot parse repository '{s}' (expected kind:owner/repo[@baseUrl] or a git remote URL)"
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_url_templates() {
        let gh = RepositoryInfo::new(RepositoryKind::GitHub, "octo", "app");
        assert_eq!(gh.issue_url(7).as_deref(), Some("https://github.com/octo/app/issues/7"));

        let gl = RepositoryInfo::new(RepositoryKind::GitLab, "grp", "app")
            .with_base_url("https://git.example.com/");
        assert_eq!(
            gl.issue_url(3).as_deref(),
            Some("https://git.example.com/grp/app/-/issues/3")
        );

        let bb = RepositoryInfo::new(RepositoryKind::Bitbucket, "team", "svc");
        assert_eq!(bb.issue_url(1).as_deref(), Some("https://bitbucket.org/team/svc/issues/1"));

        let ado = RepositoryInfo::new(RepositoryKind::AzureDevOps, "org", "proj");
        assert_eq!(
            ado.issue_url(42).as_deref(),
            Some("https://dev.azure.com/org/proj/_workitems/edit/42")
        );

        let unknown = RepositoryInfo::new(RepositoryKind::Unknown, "a", "b");
        assert_eq!(unknown.issue_url(1), None);
    }

    #[test]
    fn test_parse_descriptor() {
        let info: RepositoryInfo = "github:octo/app".parse().unwrap();
        assert_eq!(info, RepositoryInfo::new(RepositoryKind::GitHub, "octo", "app"));

        let info: RepositoryInfo = "gitlab:group/sub/app@https://gl.corp".parse().unwrap();
        assert_eq!(info.owner, "group/sub");
        assert_eq!(info.base_url, "https://gl.corp");

        assert!("nonsense".parse::<RepositoryInfo>().is_err());
    }

    #[test]
    fn test_from_remote_url() {
        let info = RepositoryInfo::from_remote_url("git@github.com:octo/app.git").unwrap();
        assert_eq!(info.kind, RepositoryKind::GitHub);
        assert_eq!((info.owner.as_str(), info.repo.as_str()), ("octo", "app"));

        let info = RepositoryInfo::from_remote_url("https://gitlab.example.com/a/b/c.git").unwrap();
        assert_eq!(info.kind, RepositoryKind::GitLab);
        assert_eq!(info.owner, "a/b");
        assert_eq!(
            info.issue_url(5).as_deref(),
            Some("https://gitlab.example.com/a/b/c/-/issues/5")
        );

        let info = RepositoryInfo::from_remote_url("https://user@dev.azure.com/org/proj/_git/repo")
            .unwrap();
        assert_eq!((info.owner.as_str(), info.repo.as_str()), ("org", "proj"));

        let info =
            RepositoryInfo::from_remote_url("org@vs-ssh.visualstudio.com:v3/org/proj/repo").unwrap();
        assert_eq!(info.kind, RepositoryKind::AzureDevOps);
        assert_eq!(info.repo, "proj");

        assert!(RepositoryInfo::from_remote_url("not a url").is_none());
    }

    #[test]
    fn test_from_git_config() {
        let config = r#"[core]
	bare = false
[remote "upstream"]
	url = https://github.com/upstream/app.git
[remote "origin"]
	url = git@gitlab.com:me/app.git
	fetch = +refs/heads/*:refs/remotes/origin/*
"#;
        let info = RepositoryInfo::from_git_config(config).unwrap();
        assert_eq!(info.kind, RepositoryKind::GitLab);
        assert_eq!(info.owner, "me");

        let only_upstream = "[remote \"upstream\"]\n\turl = https://github.com/u/r\n";
        assert_eq!(RepositoryInfo::from_git_config(only_upstream).unwrap().owner, "u");
        assert!(RepositoryInfo::from_git_config("[core]\n").is_none());
    }

    #[test]
    fn test_kind_serde_names() {
        let info: RepositoryInfo =
            toml::from_str("kind = \"azuredevops\"\nowner = \"o\"\nrepo = \"p\"").unwrap();
        assert_eq!(info.kind, RepositoryKind::AzureDevOps);
        assert_eq!(info.base_url, "");
    }
}
