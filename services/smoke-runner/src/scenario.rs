//! Scenarios
//!
//! A scenario is the ordered list of operations one smoke test performs.
//! Local inputs (upload files, the data directory) are read while planning,
//! so a missing file fails the run before any network call is made.
//!
//! Relative upload paths resolve against the working directory.

use std::path::{Path, PathBuf};

use identity_auth::IdToken;
use remote_op::Operation;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::config::{Config, require};

/// Operation for a step, possibly depending on the acquired token
#[derive(Debug, Clone, PartialEq)]
pub enum StepOperation {
    Fixed(Operation),
    /// Signed URL for the caller's output bucket; the bucket name embeds
    /// the uid, which is only known after sign-in
    OutputWorkspace,
}

/// One planned request
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Logged on success, e.g. "Bucket created"
    pub label: String,
    pub url: String,
    pub operation: StepOperation,
}

impl Step {
    fn fixed(label: &str, url: &str, operation: Operation) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
            operation: StepOperation::Fixed(operation),
        }
    }

    /// Concrete operation once the run's token is known.
    pub fn operation_for(&self, token: &IdToken) -> Operation {
        match &self.operation {
            StepOperation::Fixed(op) => op.clone(),
            StepOperation::OutputWorkspace => Operation::WorkspaceUrl {
                bucket_name: output_bucket_name(token.user_id()),
            },
        }
    }
}

pub fn output_bucket_name(user_id: &str) -> String {
    format!("output-user-bucket-{user_id}")
}

/// Create both buckets, upload configured files and the data directory,
/// then generate requirements.txt.
pub fn buckets(config: &Config) -> common::Result<Vec<Step>> {
    let url = require(
        &config.endpoints.bucket_operations,
        "endpoints.bucket_operations",
    )?;

    let mut steps = vec![
        Step::fixed("Bucket created", url, Operation::Create),
        Step::fixed("Output bucket created", url, Operation::CreateOutput),
    ];

    for upload in &config.buckets.uploads {
        let content = read_upload(&upload.file)?;
        steps.push(Step::fixed(
            "File uploaded",
            url,
            Operation::Upload {
                path: upload.path.clone(),
                content,
            },
        ));
    }

    if let Some(dir) = &config.buckets.data_dir {
        for (file, remote) in data_files(dir, &config.buckets.data_prefix)? {
            let content = read_upload(&file)?;
            steps.push(Step::fixed(
                "File uploaded",
                url,
                Operation::Upload {
                    path: remote,
                    content,
                },
            ));
        }
    }

    steps.push(Step::fixed(
        "Requirements generated",
        url,
        Operation::GenerateRequirements,
    ));
    Ok(steps)
}

/// Read a file back from the bucket.
pub fn read(config: &Config, path: &str) -> common::Result<Vec<Step>> {
    let url = require(
        &config.endpoints.bucket_operations,
        "endpoints.bucket_operations",
    )?;
    Ok(vec![Step::fixed(
        "File read",
        url,
        Operation::Read {
            path: path.to_string(),
        },
    )])
}

/// Request a signed download URL for a bucket file.
pub fn download(config: &Config, path: &str) -> common::Result<Vec<Step>> {
    let url = require(
        &config.endpoints.bucket_operations,
        "endpoints.bucket_operations",
    )?;
    Ok(vec![Step::fixed(
        "Download URL generated",
        url,
        Operation::Download {
            path: path.to_string(),
        },
    )])
}

/// Trigger the code update, then the data update.
pub fn update(config: &Config) -> common::Result<Vec<Step>> {
    let code = require(&config.endpoints.code_update, "endpoints.code_update")?;
    let data = require(&config.endpoints.data_update, "endpoints.data_update")?;
    Ok(vec![
        Step::fixed("Code updated", code, Operation::Trigger),
        Step::fixed("Data updated", data, Operation::Trigger),
    ])
}

pub fn destroy(config: &Config) -> common::Result<Vec<Step>> {
    let url = require(&config.endpoints.destroy, "endpoints.destroy")?;
    Ok(vec![Step::fixed(
        "Resources destroyed",
        url,
        Operation::Destroy,
    )])
}

pub fn workspace_url(config: &Config) -> common::Result<Vec<Step>> {
    let url = require(
        &config.endpoints.output_workspace,
        "endpoints.output_workspace",
    )?;
    Ok(vec![Step {
        label: "Workspace URL generated".to_string(),
        url: url.to_string(),
        operation: StepOperation::OutputWorkspace,
    }])
}

/// Single ad-hoc operation from the command line.
pub fn call(
    url: &str,
    method: &str,
    name: Option<String>,
    body: Option<&str>,
) -> common::Result<Vec<Step>> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "--url must start with http:// or https://, got: {url}"
        )));
    }
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|e| common::Error::Config(format!("invalid --method {method:?}: {e}")))?;
    let body = body
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|e| common::Error::Config(format!("--body is not valid JSON: {e}")))?;

    let operation = Operation::Custom { method, name, body };
    let label = format!("{} completed", operation.name());
    Ok(vec![Step::fixed(&label, url, operation)])
}

fn read_upload(path: &Path) -> common::Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        common::Error::Config(format!("failed to read upload {}: {e}", path.display()))
    })
}

/// Every regular file under `dir`, paired with `<prefix>/<relative path>`.
/// Sorted so uploads happen in a stable order.
fn data_files(dir: &Path, prefix: &str) -> common::Result<Vec<(PathBuf, String)>> {
    if !dir.is_dir() {
        return Err(common::Error::Config(format!(
            "{} is not a valid directory",
            dir.display()
        )));
    }
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let prefix = prefix.trim_end_matches('/');
    files
        .into_iter()
        .map(|file| {
            let relative = file.strip_prefix(dir).map_err(|e| {
                common::Error::Config(format!("{} escapes data_dir: {e}", file.display()))
            })?;
            let relative: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let remote = if prefix.is_empty() {
                relative.join("/")
            } else {
                format!("{prefix}/{}", relative.join("/"))
            };
            debug!(file = %file.display(), remote, "planned data upload");
            Ok((file, remote))
        })
        .collect()
}

/// Symlinked directories are skipped so a link cycle cannot recurse;
/// symlinks to files are uploaded like regular files.
fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect_files(&path, out)?;
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            out.push(path);
        } else if file_type.is_symlink() {
            debug!(path = %path.display(), "skipping symlinked directory");
        }
    }
    Ok(())
}
