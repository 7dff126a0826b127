use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use quarry_core::{CatalogVersion, VersionType};
use quarry_downloader::{AuthProvider, AuthToken, DownloadLink, UpdateIdentityResolver};

/// Environment variable holding the account token for beta downloads.
pub const UPDATE_TOKEN_VAR: &str = "QUARRY_UPDATE_TOKEN";

/// Parse the locally cached catalog list: the minified triplet array
/// published by the version database, `[["<uuid>", "<name>", <type>],
/// ...]` with 0 = release, 1 = beta, 2 = preview. A missing cache is an
/// empty catalog; unknown type tags are skipped.
pub fn load_catalog_cache(path: &Path) -> Result<Vec<CatalogVersion>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read catalog cache: {}", path.display()));
        }
    };

    let rows: Vec<(String, String, u8)> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse catalog cache: {}", path.display()))?;

    Ok(rows
        .into_iter()
        .filter_map(|(uuid, name, tag)| {
            let version_type = match tag {
                0 => VersionType::Release,
                1 => VersionType::Beta,
                2 => VersionType::Preview,
                _ => return None,
            };
            Some(CatalogVersion {
                uuid,
                name,
                version_type,
                is_new: false,
            })
        })
        .collect())
}

/// Update-identity resolver backed by a local `download_links.json` map
/// of uuid to URL. This is the injection point for a real update-service
/// client; an identifier missing from the map means no download link.
pub struct LinkFileResolver {
    path: PathBuf,
}

impl LinkFileResolver {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl UpdateIdentityResolver for LinkFileResolver {
    async fn resolve(
        &self,
        uuid: &str,
        _revision: &str,
        _auth: Option<&AuthToken>,
    ) -> Result<Option<DownloadLink>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read download links: {}", self.path.display())
                });
            }
        };
        let links: HashMap<String, String> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse download links: {}", self.path.display()))?;
        Ok(links
            .get(uuid)
            .map(|url| DownloadLink { url: url.clone() }))
    }
}

/// Auth provider reading a pre-provisioned token from the environment;
/// stands in for the interactive account login service.
#[derive(Debug, Default)]
pub struct EnvTokenProvider;

impl EnvTokenProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthProvider for EnvTokenProvider {
    async fn login(&self) -> Result<AuthToken> {
        let token = std::env::var(UPDATE_TOKEN_VAR).map_err(|_| {
            anyhow!("{UPDATE_TOKEN_VAR} is not set; beta downloads require an account token")
        })?;
        Ok(AuthToken { token })
    }
}
