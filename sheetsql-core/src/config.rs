//! Configuration for import runs

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::writer::ScriptOptions;

/// Import settings, usually read from `sheetsql.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Tenant used when none is given on the command line
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// 0-based sheet to read
    #[serde(default)]
    pub sheet_index: usize,
    /// Start the script with a generator comment
    #[serde(default = "default_header_comment")]
    pub header_comment: bool,
}

fn default_header_comment() -> bool {
    true
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            sheet_index: 0,
            header_comment: default_header_comment(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ImportConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Reject settings that cannot produce a usable script
    pub fn validate(&self) -> Result<()> {
        if let Some(tenant_id) = &self.tenant_id
            && tenant_id.trim().is_empty()
        {
            anyhow::bail!("Configuration error: 'tenant_id' must not be blank");
        }
        Ok(())
    }

    pub fn script_options(&self) -> ScriptOptions {
        ScriptOptions {
            header_comment: self.header_comment,
        }
    }
}
