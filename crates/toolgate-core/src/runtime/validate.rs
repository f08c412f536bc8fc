// crates/toolgate-core/src/runtime/validate.rs
// ============================================================================
// Module: Request Validation
// Description: Path, branch, and repository checks for untrusted requests.
// Purpose: Reject unsafe request fields before any downstream call is made.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Every rule exists in two forms: a pure boolean predicate and an assertive
//! `ensure_*` form that fails with a typed rejection mapped to a named error
//! kind. Callers choose whichever fits their control flow. Validation is
//! synchronous, side-effect-free, and fails closed: anything ambiguous is
//! rejected. Repository membership is closed-world against the configured
//! allowlist, never pattern-based.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use thiserror::Error;

use crate::core::error::ErrorKind;
use crate::core::identifiers::RepositoryId;
use crate::core::policy::RepositoryAllowlist;
use crate::core::policy::RepositoryCredential;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path prefixes rejected regardless of tier or operation.
///
/// Covers dotenv files, version-control metadata, dependency directories,
/// sandbox-tool metadata, OS system directories, and ssh/cloud-credential/
/// generic-config dotfiles. The absolute entries are kept even though leading
/// slashes are rejected outright, so the list stays authoritative on its own.
pub const FORBIDDEN_PATH_PREFIXES: [&str; 16] = [
    ".env",
    ".git",
    "node_modules",
    ".e2b",
    "/etc",
    "/root",
    "/proc",
    "/sys",
    "/var",
    "/usr",
    "/bin",
    "/sbin",
    "/boot",
    ".ssh",
    ".aws",
    ".config",
];

// ============================================================================
// SECTION: Rejection Types
// ============================================================================

/// Typed rejection for unsafe paths.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    /// Path contains a `..` segment.
    #[error("path contains a traversal segment")]
    TraversalSegment,
    /// Path starts with `/`.
    #[error("path is absolute")]
    AbsolutePath,
    /// Path starts with a drive-letter prefix.
    #[error("path has a drive-letter prefix")]
    DriveLetterPrefix,
    /// Path matches a forbidden prefix.
    #[error("path matches forbidden prefix {0}")]
    ForbiddenPrefix(&'static str),
}

impl PathRejection {
    /// Returns the boundary error kind for this rejection.
    #[must_use]
    pub const fn error_kind(&self) -> ErrorKind {
        ErrorKind::PathTraversal
    }
}

/// Typed rejection for invalid branch names.
///
/// # Invariants
/// - Variants are stable for audit labeling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchRejection {
    /// Branch name is empty.
    #[error("branch name is empty")]
    Empty,
    /// Branch name contains whitespace.
    #[error("branch name contains whitespace")]
    ContainsWhitespace,
    /// Branch name contains a character outside the allowed class.
    #[error("branch name contains a disallowed character")]
    DisallowedChar,
    /// Branch name contains `..`.
    #[error("branch name contains a traversal segment")]
    TraversalSegment,
    /// Branch name contains `//`.
    #[error("branch name contains an empty segment")]
    EmptySegment,
}

impl BranchRejection {
    /// Returns the boundary error kind for this rejection.
    #[must_use]
    pub const fn error_kind(&self) -> ErrorKind {
        ErrorKind::InvalidBranch
    }
}

/// Typed rejection for repositories outside the allowlist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryRejection {
    /// Repository identifier is not in the configured allowlist.
    #[error("repository {0} is not allowlisted")]
    NotAllowlisted(String),
}

impl RepositoryRejection {
    /// Returns the boundary error kind for this rejection.
    #[must_use]
    pub const fn error_kind(&self) -> ErrorKind {
        ErrorKind::InvalidRepository
    }
}

// ============================================================================
// SECTION: Path Predicate
// ============================================================================

/// Returns true when the path is safe to hand to a sandbox operation.
#[must_use]
pub fn is_safe_path(path: &str) -> bool {
    ensure_safe_path(path).is_ok()
}

/// Asserts the path is safe to hand to a sandbox operation.
///
/// # Errors
///
/// Returns [`PathRejection`] naming the first failed check.
pub fn ensure_safe_path(path: &str) -> Result<(), PathRejection> {
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(PathRejection::TraversalSegment);
    }
    if path.starts_with('/') {
        return Err(PathRejection::AbsolutePath);
    }
    if has_drive_letter_prefix(path) {
        return Err(PathRejection::DriveLetterPrefix);
    }
    for prefix in FORBIDDEN_PATH_PREFIXES {
        if path.starts_with(prefix) {
            return Err(PathRejection::ForbiddenPrefix(prefix));
        }
    }
    Ok(())
}

/// Returns true when the path begins with a Windows drive-letter prefix.
fn has_drive_letter_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

// ============================================================================
// SECTION: Branch Predicate
// ============================================================================

/// Returns true when the branch name is safe to pass downstream.
#[must_use]
pub fn is_valid_branch(branch: &str) -> bool {
    ensure_valid_branch(branch).is_ok()
}

/// Asserts the branch name is safe to pass downstream.
///
/// # Errors
///
/// Returns [`BranchRejection`] naming the first failed check.
pub fn ensure_valid_branch(branch: &str) -> Result<(), BranchRejection> {
    if branch.is_empty() {
        return Err(BranchRejection::Empty);
    }
    if branch.chars().any(char::is_whitespace) {
        return Err(BranchRejection::ContainsWhitespace);
    }
    if !branch.chars().all(is_branch_char) {
        return Err(BranchRejection::DisallowedChar);
    }
    if branch.contains("..") {
        return Err(BranchRejection::TraversalSegment);
    }
    if branch.contains("//") {
        return Err(BranchRejection::EmptySegment);
    }
    Ok(())
}

/// Returns true when the character is in the allowed branch class.
const fn is_branch_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '/' | '-')
}

// ============================================================================
// SECTION: Request Validator
// ============================================================================

/// Validator bound to the process-lifetime rule set.
///
/// # Invariants
/// - The allowlist is loaded once at process start and never mutated.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    /// Closed set of permitted repositories.
    allowlist: RepositoryAllowlist,
}

impl RequestValidator {
    /// Creates a validator over the configured repository allowlist.
    #[must_use]
    pub const fn new(allowlist: RepositoryAllowlist) -> Self {
        Self {
            allowlist,
        }
    }

    /// Returns true when the path is safe to hand to a sandbox operation.
    #[must_use]
    pub fn is_safe_path(&self, path: &str) -> bool {
        is_safe_path(path)
    }

    /// Asserts the path is safe to hand to a sandbox operation.
    ///
    /// # Errors
    ///
    /// Returns [`PathRejection`] naming the first failed check.
    pub fn ensure_safe_path(&self, path: &str) -> Result<(), PathRejection> {
        ensure_safe_path(path)
    }

    /// Returns true when the branch name is safe to pass downstream.
    #[must_use]
    pub fn is_valid_branch(&self, branch: &str) -> bool {
        is_valid_branch(branch)
    }

    /// Asserts the branch name is safe to pass downstream.
    ///
    /// # Errors
    ///
    /// Returns [`BranchRejection`] naming the first failed check.
    pub fn ensure_valid_branch(&self, branch: &str) -> Result<(), BranchRejection> {
        ensure_valid_branch(branch)
    }

    /// Returns true when the repository is allowlisted.
    #[must_use]
    pub fn is_allowed_repository(&self, repository: &RepositoryId) -> bool {
        self.allowlist.contains(repository)
    }

    /// Asserts the repository is allowlisted.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryRejection::NotAllowlisted`] for unknown
    /// identifiers.
    pub fn ensure_allowed_repository(
        &self,
        repository: &RepositoryId,
    ) -> Result<(), RepositoryRejection> {
        if self.allowlist.contains(repository) {
            Ok(())
        } else {
            Err(RepositoryRejection::NotAllowlisted(repository.as_str().to_string()))
        }
    }

    /// Returns the credential for an allowlisted repository.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryRejection::NotAllowlisted`] for unknown
    /// identifiers.
    pub fn credential_for(
        &self,
        repository: &RepositoryId,
    ) -> Result<&RepositoryCredential, RepositoryRejection> {
        self.allowlist
            .credential(repository)
            .ok_or_else(|| RepositoryRejection::NotAllowlisted(repository.as_str().to_string()))
    }
}

impl fmt::Display for RequestValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestValidator({} repositories)", self.allowlist.len())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
