use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::package_manager::{DeploymentProgress, InstalledPackage, PackageManager, ProgressSink};

/// Production package manager backed by the host's PowerShell Appx
/// cmdlets. Each long-running cmdlet invocation is reported to the
/// progress sink as a start/finish pair; the host publishes no finer
/// progress over this interface.
#[derive(Debug, Default)]
pub struct AppxPackageManager;

impl AppxPackageManager {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PackageManager for AppxPackageManager {
    async fn packages_by_family(&self, family: &str) -> Result<Vec<InstalledPackage>> {
        let script = format!(
            "Get-AppxPackage -PackageTypeFilter All | \
             Where-Object {{ $_.PackageFamilyName -eq '{}' }} | \
             ForEach-Object {{ '{{0}}|{{1}}|{{2}}' -f $_.PackageFullName, $_.InstallLocation, $_.IsDevelopmentMode }}",
            escape_single_quoted(family)
        );
        let stdout = run_powershell(&script, "failed to enumerate packages").await?;

        let mut packages = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let mut fields = line.splitn(3, '|');
            let full_name = fields
                .next()
                .ok_or_else(|| anyhow!("malformed package line: {line}"))?
                .to_string();
            let location = fields.next().unwrap_or("");
            let development_mode = fields
                .next()
                .map(|value| value.eq_ignore_ascii_case("true"))
                .unwrap_or(false);

            packages.push(InstalledPackage {
                full_name,
                family: family.to_string(),
                location: if location.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(location))
                },
                development_mode,
            });
        }
        Ok(packages)
    }

    async fn register(&self, manifest: &Path, progress: ProgressSink<'_>) -> Result<()> {
        progress(DeploymentProgress {
            state: "registering".to_string(),
            percent: 0,
        });
        let script = format!(
            "Add-AppxPackage -Register '{}'",
            escape_single_quoted(&manifest.display().to_string())
        );
        run_powershell(&script, "package registration failed").await?;
        progress(DeploymentProgress {
            state: "registered".to_string(),
            percent: 100,
        });
        Ok(())
    }

    async fn remove(
        &self,
        full_name: &str,
        preserve_data: bool,
        progress: ProgressSink<'_>,
    ) -> Result<()> {
        progress(DeploymentProgress {
            state: "removing".to_string(),
            percent: 0,
        });
        let preserve_flag = if preserve_data {
            " -PreserveApplicationData"
        } else {
            ""
        };
        let script = format!(
            "Remove-AppxPackage -Package '{}'{}",
            escape_single_quoted(full_name),
            preserve_flag
        );
        run_powershell(&script, "package removal failed").await?;
        progress(DeploymentProgress {
            state: "removed".to_string(),
            percent: 100,
        });
        Ok(())
    }

    fn private_data_dir(&self, family: &str) -> Result<PathBuf> {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve package data directory")?;
        Ok(PathBuf::from(app_data)
            .join("Packages")
            .join(family)
            .join("LocalState"))
    }

    async fn launch_app(&self, family: &str) -> Result<()> {
        debug!("launching app for family {}", family);
        let script = format!(
            "Start-Process 'shell:AppsFolder\\{}!App'",
            escape_single_quoted(family)
        );
        run_powershell(&script, "app launch failed").await?;
        Ok(())
    }
}

async fn run_powershell(script: &str, context_message: &str) -> Result<String> {
    let output = Command::new("powershell")
        .arg("-NoProfile")
        .arg("-NonInteractive")
        .arg("-Command")
        .arg(script)
        .output()
        .await
        .with_context(|| format!("{context_message}: powershell failed to start"))?;

    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

fn escape_single_quoted(value: &str) -> String {
    value.replace('\'', "''")
}
