//! The resolved configuration model.
//!
//! `ConfigOptions` is the normalized result of one resolution pass: fixed
//! sections (`project` / `upload` / `preview` / `build` / `sourcemap` /
//! `base`), each the union of built-in defaults, manifest-derived defaults,
//! file values, and CLI overrides. It is constructed once per invocation and
//! consumed read-only by the dispatcher; the same shape is what the global
//! registry persists per profile.
//!
//! Wire names are camelCase (the platform's own spelling, including the
//! irregular `minifyJS` / `minifyWXML` / `minifyWXSS` / `autoPrefixWXSS`).

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// One fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOptions {
    pub project: ProjectConfig,
    pub upload: UploadConfig,
    pub preview: PreviewConfig,
    pub build: BuildConfig,
    pub sourcemap: SourcemapConfig,
    #[serde(default)]
    pub base: BaseConfig,
}

/// Identity of the project the external service operates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub appid: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub project_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignores: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProjectType {
    MiniProgram,
    MiniProgramPlugin,
    MiniGame,
    MiniGamePlugin,
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectType::MiniProgram => "miniProgram",
            ProjectType::MiniProgramPlugin => "miniProgramPlugin",
            ProjectType::MiniGame => "miniGame",
            ProjectType::MiniGamePlugin => "miniGamePlugin",
        };
        f.write_str(name)
    }
}

/// Options forwarded to the external upload operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    /// CI robot id. The 1-30 range is documented in the help text but not
    /// range-checked anywhere in the resolution path.
    pub robot: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<bool>,
    #[serde(default, skip_serializing_if = "CompileSettings::is_empty")]
    pub setting: CompileSettings,
}

/// Options forwarded to the external preview operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    pub robot: u8,
    pub qrcode_format: QrcodeFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qrcode_output_dest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "CompileSettings::is_empty")]
    pub setting: CompileSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrcodeFormat {
    #[default]
    Terminal,
    Image,
    Base64,
}

impl fmt::Display for QrcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QrcodeFormat::Terminal => "terminal",
            QrcodeFormat::Image => "image",
            QrcodeFormat::Base64 => "base64",
        };
        f.write_str(name)
    }
}

/// Options forwarded to the external npm-build operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignores: Vec<String>,
}

/// Options forwarded to the external sourcemap fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcemapConfig {
    pub robot: u8,
    pub source_map_save_path: PathBuf,
}

/// Top-level toggles that are not forwarded to the external service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfig {
    #[serde(default)]
    pub show_progress_log: bool,
}

/// Compile-option bag shared by upload and preview.
///
/// Absent flags are omitted on the wire; a CLI flag can only switch one on
/// (a `false` is compacted away during the merge).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompileSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub es6: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub es7: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minify: Option<bool>,
    #[serde(rename = "codeProtect", skip_serializing_if = "Option::is_none")]
    pub code_protect: Option<bool>,
    #[serde(rename = "minifyJS", skip_serializing_if = "Option::is_none")]
    pub minify_js: Option<bool>,
    #[serde(rename = "minifyWXML", skip_serializing_if = "Option::is_none")]
    pub minify_wxml: Option<bool>,
    #[serde(rename = "minifyWXSS", skip_serializing_if = "Option::is_none")]
    pub minify_wxss: Option<bool>,
    #[serde(rename = "autoPrefixWXSS", skip_serializing_if = "Option::is_none")]
    pub auto_prefix_wxss: Option<bool>,
}

impl CompileSettings {
    pub fn is_empty(&self) -> bool {
        *self == CompileSettings::default()
    }
}

/// Which configuration source one invocation resolved to.
///
/// `is_root` is true only when the source is the user-global registry file,
/// which switches the merger into root mode (the raw config is synthesized
/// from a registry profile instead of read from a project file).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub is_root: bool,
}
