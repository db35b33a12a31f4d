//! Local API key storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const APP_DIR: &str = "tokenprobe";
const CREDENTIALS_FILE: &str = "credentials.json";
const MASK_PREFIX_CHARS: usize = 3;
const MASK_SUFFIX_CHARS: usize = 4;

#[derive(Debug, Deserialize, Serialize, Default)]
struct CredentialsFile {
    #[serde(default)]
    api_key: Option<String>,
}

/// 存放单个 API Key 的 JSON 文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config_dir>/tokenprobe/credentials.json`。
    ///
    /// # Errors
    /// 当平台没有配置目录时返回错误。
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| Error::InvalidConfig {
            message: "No configuration directory available on this platform".into(),
        })?;
        Ok(Self::new(dir.join(APP_DIR).join(CREDENTIALS_FILE)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取已保存的密钥；文件不存在时返回 `None`。
    ///
    /// # Errors
    /// 当文件无法读取或解析时返回错误。
    pub fn load(&self) -> Result<Option<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let parsed: CredentialsFile =
            serde_json::from_str(&content).map_err(|err| Error::InvalidConfig {
                message: format!(
                    "Failed to parse credentials {}: {err}",
                    self.path.display()
                ),
            })?;
        Ok(parsed.api_key.filter(|key| !key.trim().is_empty()))
    }

    /// 保存密钥（覆盖旧值）。
    ///
    /// # Errors
    /// 当密钥为空或写入失败时返回错误。
    pub fn save(&self, api_key: &str) -> Result<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(Error::InvalidConfig {
                message: "API key must not be empty".into(),
            });
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(&CredentialsFile {
            api_key: Some(api_key.to_string()),
        })?;
        std::fs::write(&self.path, payload)?;
        restrict_permissions(&self.path)?;
        tracing::debug!(path = %self.path.display(), "saved API key");
        Ok(())
    }

    /// 删除已保存的密钥；返回之前是否存在。
    ///
    /// # Errors
    /// 当删除失败时返回错误。
    pub fn clear(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// 仅显示前 3 位和后 4 位，如 `sk-…wxyz`；过短的密钥全部遮盖。
#[must_use]
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.trim().chars().collect();
    if chars.len() <= MASK_PREFIX_CHARS + MASK_SUFFIX_CHARS {
        return "*".repeat(chars.len().max(1));
    }
    let prefix: String = chars[..MASK_PREFIX_CHARS].iter().collect();
    let suffix: String = chars[chars.len() - MASK_SUFFIX_CHARS..].iter().collect();
    format!("{prefix}…{suffix}")
}
