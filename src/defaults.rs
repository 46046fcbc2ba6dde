//! Manifest-derived baselines: the lowest merge layer of every section.
//!
//! Baselines come from two adjacent manifest files when present — the
//! platform project descriptor (`project.config.json`, supplying `appid`)
//! and the package descriptor (`package.json`, supplying `version`) — found
//! by searching upward from the resolved project path, bounded to three
//! parent levels. Every read failure degrades to an empty default; nothing
//! in this module errors outward.
//!
//! Root mode (resolving from the registry's stored profile) skips the
//! timestamped `desc` and manifest `version` defaults: the stored snapshot
//! already carries the values that were current when the profile was saved.

use std::fs;
use std::path::Path;

use chrono::Local;
use serde_json::{Map, Value, json};

const PROJECT_MANIFEST: &str = "project.config.json";
const PACKAGE_MANIFEST: &str = "package.json";
/// How many parent directories above the project path to try.
const MANIFEST_SEARCH_DEPTH: usize = 3;

/// Nearest manifest with the given file name, from the project path upward.
fn read_manifest(project_path: &Path, name: &str) -> Option<Map<String, Value>> {
    for dir in project_path.ancestors().take(MANIFEST_SEARCH_DEPTH + 1) {
        let Ok(content) = fs::read_to_string(dir.join(name)) else {
            continue;
        };
        if let Ok(Value::Object(map)) = serde_json::from_str(&content) {
            return Some(map);
        }
    }
    None
}

fn manifest_string(project_path: &Path, name: &str, key: &str) -> Option<String> {
    read_manifest(project_path, name)?
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

/// Current local date-time, as it appears in default `desc` strings.
pub fn local_date() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn project_defaults(project_path: &Path) -> Map<String, Value> {
    let appid = manifest_string(project_path, PROJECT_MANIFEST, "appid").unwrap_or_default();
    let mut out = Map::new();
    out.insert("appid".into(), json!(appid));
    out.insert("type".into(), json!("miniProgram"));
    out
}

pub fn upload_defaults(project_path: &Path, is_root: bool) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("robot".into(), json!(1));
    if !is_root {
        out.insert("desc".into(), json!(format!("{} upload", local_date())));
        if let Some(version) = manifest_string(project_path, PACKAGE_MANIFEST, "version") {
            out.insert("version".into(), json!(version));
        }
    }
    out
}

/// `cli_format` is the qrcodeFormat the CLI supplied, if any: a non-terminal
/// CLI format is the only thing that makes a default output destination
/// appear. Terminal output never synthesizes a path.
pub fn preview_defaults(
    project_path: &Path,
    is_root: bool,
    cli_format: Option<&str>,
) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("robot".into(), json!(1));
    out.insert(
        "qrcodeFormat".into(),
        json!(cli_format.unwrap_or("terminal")),
    );
    if !is_root {
        out.insert("desc".into(), json!(format!("{} preview", local_date())));
    }
    if let Some(format) = cli_format
        && format != "terminal"
    {
        let file_name = if format == "base64" {
            "preview-base64"
        } else {
            "preview.jpg"
        };
        out.insert(
            "qrcodeOutputDest".into(),
            json!(project_path.join(file_name).display().to_string()),
        );
    }
    out
}

pub fn build_defaults() -> Map<String, Value> {
    Map::new()
}

pub fn sourcemap_defaults(project_path: &Path) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("robot".into(), json!(1));
    out.insert(
        "sourceMapSavePath".into(),
        json!(project_path.join("sourcemap.zip").display().to_string()),
    );
    out
}

pub fn base_defaults() -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("showProgressLog".into(), json!(false));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn appid_comes_from_adjacent_project_descriptor() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PROJECT_MANIFEST),
            r#"{"appid": "wx777", "compileType": "miniprogram"}"#,
        )
        .unwrap();
        let out = project_defaults(dir.path());
        assert_eq!(out.get("appid"), Some(&json!("wx777")));
        assert_eq!(out.get("type"), Some(&json!("miniProgram")));
    }

    #[test]
    fn appid_found_up_to_three_parent_levels() {
        let root = TempDir::new().unwrap();
        let deep = root.path().join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();
        fs::write(root.path().join(PROJECT_MANIFEST), r#"{"appid": "wx1"}"#).unwrap();
        let out = project_defaults(&deep);
        assert_eq!(out.get("appid"), Some(&json!("wx1")));
    }

    #[test]
    fn appid_beyond_the_search_bound_is_ignored() {
        let root = TempDir::new().unwrap();
        let deep = root.path().join("a").join("b").join("c").join("d");
        fs::create_dir_all(&deep).unwrap();
        fs::write(root.path().join(PROJECT_MANIFEST), r#"{"appid": "wx1"}"#).unwrap();
        let out = project_defaults(&deep);
        assert_eq!(out.get("appid"), Some(&json!("")));
    }

    #[test]
    fn unreadable_manifest_degrades_to_empty_appid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_MANIFEST), "not json at all").unwrap();
        let out = project_defaults(dir.path());
        assert_eq!(out.get("appid"), Some(&json!("")));
    }

    #[test]
    fn upload_defaults_carry_version_and_dated_desc() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(PACKAGE_MANIFEST),
            r#"{"name": "demo", "version": "2.1.0"}"#,
        )
        .unwrap();
        let out = upload_defaults(dir.path(), false);
        assert_eq!(out.get("robot"), Some(&json!(1)));
        assert_eq!(out.get("version"), Some(&json!("2.1.0")));
        let desc = out.get("desc").unwrap().as_str().unwrap();
        assert!(desc.ends_with(" upload"));
    }

    #[test]
    fn root_mode_skips_desc_and_version() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PACKAGE_MANIFEST), r#"{"version": "2.1.0"}"#).unwrap();
        let out = upload_defaults(dir.path(), true);
        assert!(out.get("desc").is_none());
        assert!(out.get("version").is_none());
        assert_eq!(out.get("robot"), Some(&json!(1)));
    }

    #[test]
    fn terminal_format_never_gets_an_output_dest() {
        let dir = TempDir::new().unwrap();
        let unset = preview_defaults(dir.path(), false, None);
        assert!(unset.get("qrcodeOutputDest").is_none());
        assert_eq!(unset.get("qrcodeFormat"), Some(&json!("terminal")));

        let explicit = preview_defaults(dir.path(), false, Some("terminal"));
        assert!(explicit.get("qrcodeOutputDest").is_none());
    }

    #[test]
    fn image_format_defaults_dest_under_the_project_path() {
        let dir = TempDir::new().unwrap();
        let out = preview_defaults(dir.path(), false, Some("image"));
        let dest = out.get("qrcodeOutputDest").unwrap().as_str().unwrap();
        assert!(dest.ends_with("preview.jpg"));
        assert!(dest.starts_with(&dir.path().display().to_string()));
    }

    #[test]
    fn base64_format_uses_the_base64_suffix() {
        let dir = TempDir::new().unwrap();
        let out = preview_defaults(dir.path(), false, Some("base64"));
        let dest = out.get("qrcodeOutputDest").unwrap().as_str().unwrap();
        assert!(dest.ends_with("preview-base64"));
    }

    #[test]
    fn sourcemap_save_path_defaults_under_the_project() {
        let dir = TempDir::new().unwrap();
        let out = sourcemap_defaults(dir.path());
        let path = out.get("sourceMapSavePath").unwrap().as_str().unwrap();
        assert!(path.ends_with("sourcemap.zip"));
    }
}
