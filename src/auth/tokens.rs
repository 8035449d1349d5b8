//! Token pair storage for voicenav.
//!
//! This module provides the [`TokenPair`] value and [`TokenFile`], which
//! persists it to `~/.voicenav/tokens.json`.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::traits::TokenStoreError;

/// The token directory name.
const TOKEN_DIR: &str = ".voicenav";

/// The token file name.
const TOKEN_FILE: &str = "tokens.json";

/// Access and refresh token returned by a successful code exchange.
///
/// Written and cleared as a unit; a store never holds one half without the
/// other. The backend sends camelCase keys, the file uses snake_case.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    #[serde(alias = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens never show up in logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Reads and writes the token file.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Create a TokenFile under the user's home directory.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn new() -> Option<Self> {
        let home = dirs::home_dir()?;
        Some(Self {
            path: home.join(TOKEN_DIR).join(TOKEN_FILE),
        })
    }

    /// Create a TokenFile at an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored pair.
    ///
    /// A missing file means "logged out" and yields `Ok(None)`.
    pub fn load(&self) -> Result<Option<TokenPair>, TokenStoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let tokens = serde_json::from_reader(reader)?;
        Ok(Some(tokens))
    }

    /// Overwrite the stored pair, creating the parent directory if needed.
    ///
    /// The pair is written to a sibling temp file and renamed into place so a
    /// crash mid-write never leaves a half-written file behind.
    pub fn save(&self, tokens: &TokenPair) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut writer, tokens)?;
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Remove the token file. Succeeds if it does not exist.
    pub fn clear(&self) -> Result<(), TokenStoreError> {
        if !self.path.exists() {
            return Ok(());
        }

        fs::remove_file(&self.path)?;
        Ok(())
    }
}
