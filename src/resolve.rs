//! Section-by-section configuration resolution.
//!
//! Resolution is a pure function of a [`ResolveInput`]: the raw file map,
//! the parsed CLI argument map, and whether the source was the user-global
//! registry (root mode). No file or environment reads happen here except the
//! manifest probes the defaults layer performs under the validated project
//! path.
//!
//! Each section is merged as `defaults ⊕ compact(file) ⊕ CLI overrides`,
//! later layers winning key-by-key. Only the file layer is compacted: a CLI
//! value counts whenever it was supplied at all, so `--test=false` really
//! overrides a file-level `true`. The `setting` bag is merged the same way
//! one level deeper and compacted afterwards, so a `false` compile flag
//! never survives into the resolved config: CLI flags can force a compile
//! option on, never off.
//!
//! The project path is special-cased up front: it is taken from the CLI or
//! the raw `project` section before anything else, and must point at an
//! existing location, because the defaults layer searches manifests under
//! it.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::aliases::{AliasSpec, first_defined, resolve_aliases};
use crate::defaults;
use crate::error::MiniCiError;
use crate::merge::{assign, compact};
use crate::types::ConfigOptions;

/// Everything one resolution pass needs, pre-loaded by the caller.
pub struct ResolveInput {
    /// Raw key/value map from the discovered source (or synthesized from a
    /// registry profile in root mode).
    pub raw: Map<String, Value>,
    /// Parsed CLI overrides, keyed by flag spelling.
    pub cli: Map<String, Value>,
    /// True when the source was the user-global registry.
    pub is_root: bool,
}

const PROJECT_ALIASES: [AliasSpec; 5] = [
    AliasSpec::new("appid", &["appid", "id"]),
    AliasSpec::new("projectPath", &["projectPath", "proPath"]),
    AliasSpec::new("privateKeyPath", &["privateKeyPath", "keyPath"]),
    AliasSpec::new("type", &["type", "t"]),
    AliasSpec::new("ignores", &["ignores", "ig"]),
];

const UPLOAD_ALIASES: [AliasSpec; 4] = [
    AliasSpec::new("version", &["version", "ver"]),
    AliasSpec::bare("test"),
    AliasSpec::new("desc", &["desc", "d"]),
    AliasSpec::new("robot", &["robot", "r"]),
];

const SETTING_ALIASES: [AliasSpec; 8] = [
    AliasSpec::flag("es6"),
    AliasSpec::flag("es7"),
    AliasSpec::flag("minify"),
    AliasSpec::flag("codeProtect"),
    AliasSpec::flag("minifyJS"),
    AliasSpec::flag("minifyWXML"),
    AliasSpec::flag("minifyWXSS"),
    AliasSpec::flag("autoPrefixWXSS"),
];

const PREVIEW_ALIASES: [AliasSpec; 6] = [
    AliasSpec::new("desc", &["desc", "d"]),
    AliasSpec::new("robot", &["robot", "r"]),
    AliasSpec::new("qrcodeFormat", &["qrcodeFormat", "qrFormat", "qrf"]),
    AliasSpec::new("qrcodeOutputDest", &["qrcodeOutputDest", "qrDest", "qrd"]),
    AliasSpec::new("pagePath", &["pagePath", "pp", "p"]),
    AliasSpec::new("searchQuery", &["searchQuery", "sq", "q"]),
];

const BUILD_ALIASES: [AliasSpec; 1] = [AliasSpec::new("ignores", &["ignores", "igno"])];

const SOURCEMAP_ALIASES: [AliasSpec; 2] = [
    AliasSpec::new("robot", &["robot", "r"]),
    AliasSpec::new("sourceMapSavePath", &["sourceMapSavePath", "sp"]),
];

const BASE_ALIASES: [AliasSpec; 1] = [AliasSpec::new("showProgressLog", &["showProgressLog", "spl"])];

fn section(raw: &Map<String, Value>, name: &str) -> Map<String, Value> {
    match raw.get(name) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

/// Merge the CLI compile flags into a section's `setting` bag and compact
/// it, dropping the bag entirely when nothing survives.
fn merge_setting(file_section: &mut Map<String, Value>, cli: &Map<String, Value>) {
    let mut setting = match file_section.remove("setting") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    assign(&mut setting, resolve_aliases(cli, &SETTING_ALIASES));
    let setting = compact(setting);
    if !setting.is_empty() {
        file_section.insert("setting".into(), Value::Object(setting));
    }
}

fn merged_section(
    defaults: Map<String, Value>,
    file: Map<String, Value>,
    overrides: Map<String, Value>,
) -> Map<String, Value> {
    let mut out = defaults;
    assign(&mut out, compact(file));
    assign(&mut out, overrides);
    out
}

fn typed<T: DeserializeOwned>(name: &str, map: Map<String, Value>) -> Result<T, MiniCiError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| MiniCiError::InvalidValue {
        key: name.into(),
        reason: e.to_string(),
    })
}

/// The project path is needed before any other merge: manifest-derived
/// defaults are searched under it. CLI spellings win over the file value.
fn resolve_project_path(input: &ResolveInput) -> Result<PathBuf, MiniCiError> {
    let cli_path = first_defined(&input.cli, &["projectPath", "proPath"])
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);
    let file_path = section(&input.raw, "project")
        .get("projectPath")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let path = cli_path
        .or(file_path)
        .ok_or(MiniCiError::ProjectPathMissing)?;
    if !path.exists() {
        return Err(MiniCiError::ProjectPathNotFound { path });
    }
    Ok(path)
}

/// Resolve one invocation's configuration from its pre-loaded input.
pub fn resolve(input: &ResolveInput) -> Result<ConfigOptions, MiniCiError> {
    let project_path = resolve_project_path(input)?;

    let project = {
        let mut map = merged_section(
            defaults::project_defaults(&project_path),
            section(&input.raw, "project"),
            resolve_aliases(&input.cli, &PROJECT_ALIASES),
        );
        // The validated path is authoritative regardless of which layer
        // supplied it.
        map.insert(
            "projectPath".into(),
            json!(project_path.display().to_string()),
        );
        typed("project", map)?
    };

    let upload = {
        let mut file = section(&input.raw, "upload");
        merge_setting(&mut file, &input.cli);
        typed(
            "upload",
            merged_section(
                defaults::upload_defaults(&project_path, input.is_root),
                file,
                resolve_aliases(&input.cli, &UPLOAD_ALIASES),
            ),
        )?
    };

    let preview = {
        let cli_format = first_defined(&input.cli, &["qrcodeFormat", "qrFormat", "qrf"])
            .and_then(Value::as_str)
            .map(str::to_owned);
        let mut file = section(&input.raw, "preview");
        merge_setting(&mut file, &input.cli);
        typed(
            "preview",
            merged_section(
                defaults::preview_defaults(&project_path, input.is_root, cli_format.as_deref()),
                file,
                resolve_aliases(&input.cli, &PREVIEW_ALIASES),
            ),
        )?
    };

    let build = typed(
        "build",
        merged_section(
            defaults::build_defaults(),
            section(&input.raw, "build"),
            resolve_aliases(&input.cli, &BUILD_ALIASES),
        ),
    )?;

    let sourcemap = typed(
        "sourcemap",
        merged_section(
            defaults::sourcemap_defaults(&project_path),
            section(&input.raw, "sourcemap"),
            resolve_aliases(&input.cli, &SOURCEMAP_ALIASES),
        ),
    )?;

    let base = {
        // showProgressLog lives at the top level of config files; registry
        // snapshots carry it inside a base section.
        let mut file = section(&input.raw, "base");
        if let Some(value) = input.raw.get("showProgressLog") {
            file.insert("showProgressLog".into(), value.clone());
        }
        typed(
            "base",
            merged_section(
                defaults::base_defaults(),
                file,
                resolve_aliases(&input.cli, &BASE_ALIASES),
            ),
        )?
    };

    Ok(ConfigOptions {
        project,
        upload,
        preview,
        build,
        sourcemap,
        base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProjectType, QrcodeFormat};
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn project_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("project.config.json"),
            r#"{"appid": "wxmanifest"}"#,
        )
        .unwrap();
        dir
    }

    fn raw_for(dir: &TempDir) -> Map<String, Value> {
        map(json!({
            "project": {"projectPath": dir.path().display().to_string()}
        }))
    }

    fn input(raw: Map<String, Value>, cli: Map<String, Value>) -> ResolveInput {
        ResolveInput {
            raw,
            cli,
            is_root: false,
        }
    }

    #[test]
    fn missing_project_path_is_rejected() {
        let err = resolve(&input(map(json!({"project": {}})), Map::new())).unwrap_err();
        assert!(matches!(err, MiniCiError::ProjectPathMissing));
    }

    #[test]
    fn nonexistent_project_path_is_rejected() {
        let raw = map(json!({"project": {"projectPath": "/definitely/not/here"}}));
        let err = resolve(&input(raw, Map::new())).unwrap_err();
        assert!(matches!(err, MiniCiError::ProjectPathNotFound { .. }));
    }

    #[test]
    fn cli_project_path_wins_over_the_file() {
        let dir = project_dir();
        let raw = map(json!({"project": {"projectPath": "/definitely/not/here"}}));
        let cli = map(json!({"proPath": dir.path().display().to_string()}));
        let config = resolve(&input(raw, cli)).unwrap();
        assert_eq!(config.project.project_path, dir.path());
    }

    #[test]
    fn manifest_appid_fills_the_default() {
        let dir = project_dir();
        let config = resolve(&input(raw_for(&dir), Map::new())).unwrap();
        assert_eq!(config.project.appid, "wxmanifest");
        assert_eq!(config.project.project_type, ProjectType::MiniProgram);
    }

    #[test]
    fn file_values_shadow_defaults_and_cli_shadows_file() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert("upload".into(), json!({"robot": 7, "desc": "from file"}));
        let cli = map(json!({"desc": "from cli"}));
        let config = resolve(&input(raw, cli)).unwrap();
        assert_eq!(config.upload.robot, 7);
        assert_eq!(config.upload.desc.as_deref(), Some("from cli"));
    }

    #[test]
    fn blank_file_values_cannot_shadow_defaults() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert("upload".into(), json!({"robot": 0, "desc": ""}));
        let config = resolve(&input(raw, Map::new())).unwrap();
        assert_eq!(config.upload.robot, 1);
        assert!(config.upload.desc.as_deref().unwrap().ends_with(" upload"));
    }

    #[test]
    fn explicit_cli_false_overrides_a_file_true() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert("upload".into(), json!({"test": true}));
        let cli = map(json!({"test": false}));
        let config = resolve(&input(raw, cli)).unwrap();
        assert_eq!(config.upload.test, Some(false));
    }

    #[test]
    fn declaration_order_breaks_alias_ties() {
        // --robot=5 and -r=9 both present: robot is listed first.
        let dir = project_dir();
        let cli = map(json!({"robot": 5, "r": 9}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert_eq!(config.upload.robot, 5);
        assert_eq!(config.sourcemap.robot, 5);
    }

    #[test]
    fn short_alias_applies_when_canonical_absent() {
        let dir = project_dir();
        let cli = map(json!({"r": 9}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert_eq!(config.upload.robot, 9);
        assert_eq!(config.preview.robot, 9);
    }

    #[test]
    fn single_letter_preview_aliases_reach_their_fields() {
        let dir = project_dir();
        let cli = map(json!({"p": "pages/detail", "q": "id=7"}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert_eq!(config.preview.page_path.as_deref(), Some("pages/detail"));
        assert_eq!(config.preview.search_query.as_deref(), Some("id=7"));
    }

    #[test]
    fn terminal_preview_gets_no_output_dest() {
        let dir = project_dir();
        let config = resolve(&input(raw_for(&dir), Map::new())).unwrap();
        assert_eq!(config.preview.qrcode_format, QrcodeFormat::Terminal);
        assert!(config.preview.qrcode_output_dest.is_none());
    }

    #[test]
    fn image_preview_defaults_dest_under_the_project() {
        let dir = project_dir();
        let cli = map(json!({"qrf": "image"}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert_eq!(config.preview.qrcode_format, QrcodeFormat::Image);
        let dest = config.preview.qrcode_output_dest.unwrap();
        assert!(dest.ends_with("preview.jpg"));
        assert!(dest.starts_with(dir.path()));
    }

    #[test]
    fn file_output_dest_shadows_the_synthesized_default() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert(
            "preview".into(),
            json!({"qrcodeOutputDest": "/custom/qr.jpg"}),
        );
        let cli = map(json!({"qrcodeFormat": "base64"}));
        let config = resolve(&input(raw, cli)).unwrap();
        assert_eq!(config.preview.qrcode_format, QrcodeFormat::Base64);
        assert_eq!(
            config.preview.qrcode_output_dest.as_deref(),
            Some(Path::new("/custom/qr.jpg"))
        );
    }

    #[test]
    fn compile_flags_force_enable_but_never_disable() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert(
            "upload".into(),
            json!({"setting": {"es6": true, "minify": false}}),
        );
        let cli = map(json!({"es7": true, "es6": false}));
        let config = resolve(&input(raw, cli)).unwrap();
        // file true survives a CLI false, file false is compacted away,
        // CLI true switches a new flag on.
        assert_eq!(config.upload.setting.es6, Some(true));
        assert_eq!(config.upload.setting.es7, Some(true));
        assert_eq!(config.upload.setting.minify, None);
    }

    #[test]
    fn root_mode_skips_dated_descriptions() {
        let dir = project_dir();
        let config = resolve(&ResolveInput {
            raw: raw_for(&dir),
            cli: Map::new(),
            is_root: true,
        })
        .unwrap();
        assert!(config.upload.desc.is_none());
        assert!(config.preview.desc.is_none());
    }

    #[test]
    fn top_level_progress_toggle_reaches_base() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert("showProgressLog".into(), json!(true));
        let config = resolve(&input(raw, Map::new())).unwrap();
        assert!(config.base.show_progress_log);

        let cli = map(json!({"spl": true}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert!(config.base.show_progress_log);
    }

    #[test]
    fn resolution_is_deterministic_for_fixed_inputs() {
        let dir = project_dir();
        let mut raw = raw_for(&dir);
        raw.insert("upload".into(), json!({"desc": "pinned", "version": "1.0.0"}));
        // pin the preview desc too so the dated default can't tick between
        // the two passes
        raw.insert("preview".into(), json!({"desc": "pinned preview"}));
        let cli = map(json!({"robot": 3}));
        let first = resolve(&input(raw.clone(), cli.clone())).unwrap();
        let second = resolve(&input(raw, cli)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sourcemap_save_path_is_overridable_by_alias() {
        let dir = project_dir();
        let cli = map(json!({"sp": "/out/maps.zip"}));
        let config = resolve(&input(raw_for(&dir), cli)).unwrap();
        assert_eq!(
            config.sourcemap.source_map_save_path,
            PathBuf::from("/out/maps.zip")
        );
    }
}
