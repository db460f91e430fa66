//! Security module for gandalf-mcp.
//!
//! Provides protection against:
//! - Path traversal attacks (escaping a root directory)
//! - Sensitive file exposure (.env, credentials, keys) when reading source
//!   stores or project files
//!
//! # Design Philosophy
//!
//! Only **security-sensitive files** are hardcoded exclusions; everyday
//! ignore behavior (build output, dependencies, lock files) is left to
//! the layered ignore policy in [`crate::project::files`].

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Security-related errors.
#[derive(Error, Debug, Clone)]
pub enum SecurityError {
    #[error("Path traversal blocked: '{attempted}' escapes root '{}'", root.display())]
    PathTraversal { attempted: String, root: PathBuf },

    #[error("Access denied: '{path}' is a sensitive file ({reason})")]
    SensitiveFile { path: String, reason: &'static str },

    #[error("Absolute path not allowed: '{path}'")]
    AbsolutePath { path: String },
}

impl SecurityError {
    /// Returns a machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PathTraversal { .. } => "PATH_TRAVERSAL",
            Self::SensitiveFile { .. } => "SENSITIVE_FILE",
            Self::AbsolutePath { .. } => "ABSOLUTE_PATH",
        }
    }
}

// ============================================================================
// Path Validation
// ============================================================================

/// Validates that a user-provided path stays within a root directory.
///
/// # Security Properties
///
/// 1. Rejects absolute paths
/// 2. Normalizes path components (resolves `.` and `..`)
/// 3. Ensures final path starts with root
pub fn validate_path(root: &Path, user_path: &str) -> Result<PathBuf, SecurityError> {
    let user_path_obj = Path::new(user_path);

    if user_path_obj.is_absolute() {
        return Err(SecurityError::AbsolutePath {
            path: user_path.to_string(),
        });
    }

    let normalized = normalize_path(user_path_obj);

    for component in normalized.components() {
        if matches!(component, Component::ParentDir) {
            return Err(SecurityError::PathTraversal {
                attempted: user_path.to_string(),
                root: root.to_path_buf(),
            });
        }
    }

    let joined = root.join(&normalized);

    let resolved = if joined.exists() {
        joined.canonicalize().map_err(|_| SecurityError::PathTraversal {
            attempted: user_path.to_string(),
            root: root.to_path_buf(),
        })?
    } else {
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        canonical_root.join(&normalized)
    };

    let canonical_root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    if !resolved.starts_with(&canonical_root) {
        return Err(SecurityError::PathTraversal {
            attempted: user_path.to_string(),
            root: root.to_path_buf(),
        });
    }

    Ok(resolved)
}

/// Normalizes a path by resolving `.` and `..` components without filesystem access.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if components.last().is_some_and(|c| !matches!(c, Component::ParentDir)) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            _ => {
                components.push(component);
            }
        }
    }

    components.iter().collect()
}

// ============================================================================
// Sensitive File Detection
// ============================================================================

/// Patterns covering credentials, secrets, and keys that must never be
/// exposed through `list_project_files`, regardless of gitignore settings.
pub const SENSITIVE_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern::exact(".env", "environment variables"),
    SensitivePattern::prefix(".env.", "environment variables"),
    SensitivePattern::suffix(".env", "environment variables"),
    SensitivePattern::exact(".envrc", "direnv config"),
    SensitivePattern::exact("credentials.json", "credentials file"),
    SensitivePattern::exact("secrets.yaml", "secrets file"),
    SensitivePattern::exact("secrets.yml", "secrets file"),
    SensitivePattern::contains(".secret.", "secrets file"),
    SensitivePattern::suffix(".pem", "private key/certificate"),
    SensitivePattern::suffix(".key", "private key"),
    SensitivePattern::suffix(".p12", "PKCS#12 keystore"),
    SensitivePattern::suffix(".pfx", "PKCS#12 keystore"),
    SensitivePattern::exact("id_rsa", "SSH private key"),
    SensitivePattern::prefix("id_rsa.", "SSH private key"),
    SensitivePattern::exact("id_ed25519", "SSH private key"),
    SensitivePattern::prefix("id_ed25519.", "SSH private key"),
    SensitivePattern::path_contains(".aws/credentials", "AWS credentials"),
    SensitivePattern::path_contains(".azure/credentials", "Azure credentials"),
    SensitivePattern::exact("gcloud-credentials.json", "GCloud credentials"),
    SensitivePattern::exact("terraform.tfstate", "Terraform state"),
    SensitivePattern::suffix(".tfstate", "Terraform state"),
    SensitivePattern::suffix(".tfvars", "Terraform variables (may contain secrets)"),
    SensitivePattern::exact("kubeconfig", "Kubernetes config"),
    SensitivePattern::path_contains(".kube/config", "Kubernetes config"),
    SensitivePattern::exact(".npmrc", "npm config (may contain tokens)"),
    SensitivePattern::exact(".pypirc", "PyPI credentials"),
    SensitivePattern::exact(".git-credentials", "Git credentials"),
    SensitivePattern::exact(".netrc", "network credentials"),
    SensitivePattern::path_contains(".ssh/config", "SSH config"),
    SensitivePattern::exact("authorized_keys", "SSH authorized keys"),
    SensitivePattern::exact(".bash_history", "shell history"),
    SensitivePattern::exact(".zsh_history", "shell history"),
];

/// A pattern for matching sensitive files.
#[derive(Debug, Clone, Copy)]
pub struct SensitivePattern {
    pub pattern: &'static str,
    pub reason: &'static str,
    pub match_type: PatternMatchType,
}

#[derive(Debug, Clone, Copy)]
pub enum PatternMatchType {
    Exact,
    Prefix,
    Suffix,
    Contains,
    PathContains,
}

impl SensitivePattern {
    const fn exact(pattern: &'static str, reason: &'static str) -> Self {
        Self { pattern, reason, match_type: PatternMatchType::Exact }
    }

    const fn prefix(pattern: &'static str, reason: &'static str) -> Self {
        Self { pattern, reason, match_type: PatternMatchType::Prefix }
    }

    const fn suffix(pattern: &'static str, reason: &'static str) -> Self {
        Self { pattern, reason, match_type: PatternMatchType::Suffix }
    }

    const fn contains(pattern: &'static str, reason: &'static str) -> Self {
        Self { pattern, reason, match_type: PatternMatchType::Contains }
    }

    const fn path_contains(pattern: &'static str, reason: &'static str) -> Self {
        Self { pattern, reason, match_type: PatternMatchType::PathContains }
    }

    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        let path_str = path.to_string_lossy();

        match self.match_type {
            PatternMatchType::Exact => filename == self.pattern,
            PatternMatchType::Prefix => filename.starts_with(self.pattern),
            PatternMatchType::Suffix => filename.ends_with(self.pattern),
            PatternMatchType::Contains => filename.contains(self.pattern),
            PatternMatchType::PathContains => path_str.contains(self.pattern),
        }
    }
}

/// Checks if a path points to a sensitive file, returning the reason if so.
#[must_use]
pub fn is_sensitive_file(path: &Path) -> Option<&'static str> {
    SENSITIVE_PATTERNS.iter().find_map(|p| p.matches(path).then_some(p.reason))
}

/// Validates a path is safe to read (not traversal, not sensitive).
pub fn validate_read_access(root: &Path, user_path: &str) -> Result<PathBuf, SecurityError> {
    let resolved = validate_path(root, user_path)?;

    if let Some(reason) = is_sensitive_file(&resolved) {
        return Err(SecurityError::SensitiveFile { path: user_path.to_string(), reason });
    }
    if let Some(reason) = is_sensitive_file(Path::new(user_path)) {
        return Err(SecurityError::SensitiveFile { path: user_path.to_string(), reason });
    }

    Ok(resolved)
}

/// Validates that an exporter's output directory stays within the Gandalf
/// home directory when given a relative path. Unlike `validate_path`,
/// export targets may be absolute (the RPC contract's `output_dir`
/// default is `<home>/exports`, and callers may name any destination
/// directory explicitly) — an absolute path is trusted as-is. A relative
/// path is resolved against `base` and rejected if it normalizes outside it.
pub fn validate_export_dir(base: &Path, output_dir: &Path) -> Result<PathBuf, SecurityError> {
    if output_dir.is_absolute() {
        return Ok(normalize_path(output_dir));
    }

    let joined = base.join(output_dir);
    let normalized = normalize_path(&joined);
    let normalized_base = normalize_path(base);

    if !normalized.starts_with(&normalized_base) {
        return Err(SecurityError::PathTraversal {
            attempted: output_dir.display().to_string(),
            root: base.to_path_buf(),
        });
    }

    Ok(normalized)
}
