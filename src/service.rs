//! The consumed external service: build, upload, preview, sourcemap.
//!
//! [`CiBackend`] is the seam between resolution and the platform toolchain.
//! The shipped implementation shells out to the vendor's own CLI and streams
//! its stdout back as progress events; tests substitute a recording mock.

use std::env;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use crate::error::MiniCiError;
use crate::types::{
    BuildConfig, CompileSettings, PreviewConfig, ProjectConfig, ProjectType, SourcemapConfig,
    UploadConfig,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Doing,
    Done,
    Failed,
}

/// One progress notification from a backend operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// Operation the event belongs to ("upload", "preview", ...).
    pub id: String,
    pub message: String,
    pub status: ProgressStatus,
}

/// Project handle passed to every backend operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub appid: String,
    pub project_type: ProjectType,
    pub project_path: PathBuf,
    pub private_key_path: Option<PathBuf>,
    pub ignores: Option<Vec<String>>,
}

impl Project {
    pub fn from_config(config: &ProjectConfig) -> Self {
        Self {
            appid: config.appid.clone(),
            project_type: config.project_type,
            project_path: config.project_path.clone(),
            private_key_path: config.private_key_path.clone(),
            ignores: config.ignores.clone(),
        }
    }
}

/// External operations the dispatcher can invoke. Each reports progress
/// through the callback and returns only when the operation has finished.
pub trait CiBackend {
    fn upload(
        &self,
        project: &Project,
        options: &UploadConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError>;

    fn preview(
        &self,
        project: &Project,
        options: &PreviewConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError>;

    fn pack_npm(
        &self,
        project: &Project,
        options: &BuildConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError>;

    fn sourcemap(
        &self,
        project: &Project,
        options: &SourcemapConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError>;
}

/// Backend that drives the vendor's `miniprogram-ci` executable.
pub struct VendorCli {
    program: String,
}

const DEFAULT_PROGRAM: &str = "miniprogram-ci";

/// Environment override for the executable name, mostly for testing.
pub const PROGRAM_ENV_VAR: &str = "MINI_CI_VENDOR_CLI";

impl VendorCli {
    pub fn from_env() -> Self {
        let program = env::var(PROGRAM_ENV_VAR).unwrap_or_else(|_| DEFAULT_PROGRAM.to_string());
        Self { program }
    }

    fn run(
        &self,
        op: &str,
        args: Vec<String>,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError> {
        progress(ProgressEvent {
            id: op.to_string(),
            message: format!("running {} {op}", self.program),
            status: ProgressStatus::Doing,
        });

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MiniCiError::ExternalOperation {
                message: format!("could not start {}: {e}", self.program),
            })?;

        // Drain stderr on its own thread; blocking on stdout alone would
        // deadlock against a process that fills the stderr pipe first.
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut detail = String::new();
                let _ = stderr.read_to_string(&mut detail);
                detail
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                progress(ProgressEvent {
                    id: op.to_string(),
                    message: line,
                    status: ProgressStatus::Doing,
                });
            }
        }

        let status = child.wait().map_err(|e| MiniCiError::ExternalOperation {
            message: format!("{op} did not finish: {e}"),
        })?;
        let detail = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if !status.success() {
            progress(ProgressEvent {
                id: op.to_string(),
                message: format!("{op} failed"),
                status: ProgressStatus::Failed,
            });
            return Err(MiniCiError::ExternalOperation {
                message: format!("{op} failed: {}", detail.trim()),
            });
        }

        progress(ProgressEvent {
            id: op.to_string(),
            message: format!("{op} finished"),
            status: ProgressStatus::Done,
        });
        Ok(())
    }
}

fn project_args(project: &Project) -> Vec<String> {
    let mut args = vec![
        "--project-path".into(),
        project.project_path.display().to_string(),
        "--appid".into(),
        project.appid.clone(),
        "--project-type".into(),
        project.project_type.to_string(),
    ];
    if let Some(key) = &project.private_key_path {
        args.push("--private-key-path".into());
        args.push(key.display().to_string());
    }
    args
}

fn setting_args(setting: &CompileSettings) -> Vec<String> {
    let flags = [
        ("--enable-es6", setting.es6),
        ("--enable-es7", setting.es7),
        ("--enable-minify", setting.minify),
        ("--enable-code-protect", setting.code_protect),
        ("--enable-minify-js", setting.minify_js),
        ("--enable-minify-wxml", setting.minify_wxml),
        ("--enable-minify-wxss", setting.minify_wxss),
        ("--enable-auto-prefix-wxss", setting.auto_prefix_wxss),
    ];
    flags
        .into_iter()
        .filter(|(_, value)| *value == Some(true))
        .flat_map(|(flag, _)| [flag.to_string(), "true".to_string()])
        .collect()
}

fn upload_args(project: &Project, options: &UploadConfig) -> Vec<String> {
    let mut args = vec!["upload".to_string()];
    args.extend(project_args(project));
    args.push("--robot".into());
    args.push(options.robot.to_string());
    if let Some(version) = &options.version {
        args.push("--upload-version".into());
        args.push(version.clone());
    }
    if let Some(desc) = &options.desc {
        args.push("--upload-description".into());
        args.push(desc.clone());
    }
    if options.test == Some(true) {
        args.push("--test".into());
    }
    args.extend(setting_args(&options.setting));
    args
}

fn preview_args(project: &Project, options: &PreviewConfig) -> Vec<String> {
    let mut args = vec!["preview".to_string()];
    args.extend(project_args(project));
    args.push("--robot".into());
    args.push(options.robot.to_string());
    args.push("--qrcode-format".into());
    args.push(options.qrcode_format.to_string());
    if let Some(dest) = &options.qrcode_output_dest {
        args.push("--qrcode-output-dest".into());
        args.push(dest.display().to_string());
    }
    if let Some(desc) = &options.desc {
        args.push("--upload-description".into());
        args.push(desc.clone());
    }
    if let Some(page) = &options.page_path {
        args.push("--page-path".into());
        args.push(page.clone());
    }
    if let Some(query) = &options.search_query {
        args.push("--search-query".into());
        args.push(query.clone());
    }
    args.extend(setting_args(&options.setting));
    args
}

fn pack_npm_args(project: &Project, options: &BuildConfig) -> Vec<String> {
    let mut args = vec!["pack-npm".to_string()];
    args.extend(project_args(project));
    for pattern in &options.ignores {
        args.push("--pack-npm-ignore".into());
        args.push(pattern.clone());
    }
    args
}

fn sourcemap_args(project: &Project, options: &SourcemapConfig) -> Vec<String> {
    let mut args = vec!["sourcemap".to_string()];
    args.extend(project_args(project));
    args.push("--robot".into());
    args.push(options.robot.to_string());
    args.push("--source-map-save-path".into());
    args.push(options.source_map_save_path.display().to_string());
    args
}

impl CiBackend for VendorCli {
    fn upload(
        &self,
        project: &Project,
        options: &UploadConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError> {
        self.run("upload", upload_args(project, options), progress)
    }

    fn preview(
        &self,
        project: &Project,
        options: &PreviewConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError> {
        self.run("preview", preview_args(project, options), progress)
    }

    fn pack_npm(
        &self,
        project: &Project,
        options: &BuildConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError> {
        self.run("pack-npm", pack_npm_args(project, options), progress)
    }

    fn sourcemap(
        &self,
        project: &Project,
        options: &SourcemapConfig,
        progress: &mut dyn FnMut(ProgressEvent),
    ) -> Result<(), MiniCiError> {
        self.run("sourcemap", sourcemap_args(project, options), progress)
    }
}
