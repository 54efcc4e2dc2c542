//! Site registry
//!
//! Known sites are defined in a TOML file of `[[site]]` tables:
//!
//! ```toml
//! [[site]]
//! name = "Example News"
//! domain = "example.com"
//! twitter_handle = "@examplenews"
//! regions = ["US"]
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::{ScanRecord, ScanSummary};

/// Errors from loading or validating site definitions
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read site definitions: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse site definitions: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid domain '{0}': specify the domain name without the scheme")]
    InvalidDomain(String),

    #[error("Invalid twitter handle '{0}' for site '{1}'")]
    InvalidTwitterHandle(String, String),

    #[error("Slug must not be an empty string (site name '{0}')")]
    EmptySlug(String),

    #[error("Duplicate {0}: '{1}'")]
    Duplicate(&'static str, String),
}

/// A site definition as written in the registry file
#[derive(Debug, Clone, Deserialize)]
pub struct SiteDefinition {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    site: Vec<SiteDefinition>,
}

/// A known news site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub name: String,
    pub slug: String,
    /// Bare host name, e.g. `example.com`
    pub domain: String,
    pub twitter_handle: Option<String>,
    /// Leaderboards the site appears on
    pub regions: Vec<String>,
}

impl Site {
    /// Validate a definition and derive its slug
    pub fn from_definition(def: SiteDefinition) -> Result<Self, RegistryError> {
        let domain = def.domain.trim().to_string();
        if !domain_pattern().is_match(&domain) {
            return Err(RegistryError::InvalidDomain(def.domain));
        }

        if let Some(handle) = &def.twitter_handle {
            if !twitter_pattern().is_match(handle) {
                return Err(RegistryError::InvalidTwitterHandle(
                    handle.clone(),
                    def.name.clone(),
                ));
            }
        }

        let slug = slugify(&def.name);
        if slug.is_empty() {
            return Err(RegistryError::EmptySlug(def.name));
        }

        Ok(Self {
            name: def.name,
            slug,
            domain,
            twitter_handle: def.twitter_handle,
            regions: def.regions,
        })
    }

    /// Combine the site with its latest scan
    pub fn summary(&self, latest: &ScanRecord) -> SiteSummary {
        SiteSummary {
            name: self.name.clone(),
            slug: self.slug.clone(),
            domain: self.domain.clone(),
            scan: ScanSummary::from(latest),
        }
    }
}

/// Site plus the results of its most recent scan
#[derive(Debug, Clone, Serialize)]
pub struct SiteSummary {
    pub name: String,
    pub slug: String,
    pub domain: String,
    #[serde(flatten)]
    pub scan: ScanSummary,
}

/// All known sites, ordered by name and indexed by domain
#[derive(Debug, Clone, Default)]
pub struct SiteRegistry {
    sites: Vec<Site>,
    by_domain: HashMap<String, usize>,
}

impl SiteRegistry {
    pub fn new(definitions: Vec<SiteDefinition>) -> Result<Self, RegistryError> {
        let mut sites = definitions
            .into_iter()
            .map(Site::from_definition)
            .collect::<Result<Vec<_>, _>>()?;
        sites.sort_by(|a, b| a.name.cmp(&b.name));

        let mut by_domain = HashMap::with_capacity(sites.len());
        let mut slugs = HashMap::with_capacity(sites.len());
        for (idx, site) in sites.iter().enumerate() {
            if idx > 0 && sites[idx - 1].name == site.name {
                return Err(RegistryError::Duplicate("name", site.name.clone()));
            }
            if by_domain.insert(site.domain.clone(), idx).is_some() {
                return Err(RegistryError::Duplicate("domain", site.domain.clone()));
            }
            if slugs.insert(site.slug.clone(), idx).is_some() {
                return Err(RegistryError::Duplicate("slug", site.slug.clone()));
            }
        }

        Ok(Self { sites, by_domain })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(content)?;
        Self::new(file.site)
    }

    /// Load the registry from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Look up a site by exact domain
    pub fn get(&self, domain: &str) -> Option<&Site> {
        self.by_domain.get(domain).map(|&idx| &self.sites[idx])
    }

    /// All sites, ordered by name
    pub fn all(&self) -> &[Site] {
        &self.sites
    }

    /// Sites appearing on a region's leaderboard
    pub fn in_region<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a Site> + 'a {
        self.sites
            .iter()
            .filter(move |site| site.regions.iter().any(|r| r == region))
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s/:-][^\s/:]*$").expect("valid domain regex"))
}

fn twitter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^@\w{1,15}$").expect("valid handle regex"))
}

/// Lowercase slug with unicode letters kept and separators collapsed to `-`
pub fn slugify(name: &str) -> String {
    static STRIP: OnceLock<Regex> = OnceLock::new();
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();

    let strip = STRIP.get_or_init(|| Regex::new(r"[^\w\s-]").expect("valid strip regex"));
    let separators =
        SEPARATORS.get_or_init(|| Regex::new(r"[-\s]+").expect("valid separator regex"));

    let lowered = name.to_lowercase();
    let stripped = strip.replace_all(&lowered, "");
    separators
        .replace_all(stripped.trim(), "-")
        .trim_matches(|c: char| c == '-' || c == '_')
        .to_string()
}
