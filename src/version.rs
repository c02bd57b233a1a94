use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::io::Write;

pub const BINARY_NAME: &str = "appctl-server";

/// Build metadata reported by `appctl-server version` and `GET /api/version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_commit: &'static str,
    pub platform: String,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            // set by the release pipeline
            git_commit: option_env!("APPCTL_GIT_COMMIT").unwrap_or("unknown"),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    pub fn short(&self) -> String {
        format!("{}: v{}", BINARY_NAME, self.version)
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.short())?;
        writeln!(f, "  GitCommit: {}", self.git_commit)?;
        write!(f, "  Platform: {}", self.platform)
    }
}

pub fn print_version(short: bool, json: bool) -> anyhow::Result<()> {
    let info = VersionInfo::current();
    let rendered = if json {
        serde_json::to_string_pretty(&info).context("failed to encode version info")?
    } else if short {
        info.short()
    } else {
        info.to_string()
    };
    writeln!(std::io::stdout(), "{}", rendered).context("failed to write version info")?;
    Ok(())
}
