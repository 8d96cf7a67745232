//! Repository context for service roles, read from the local git checkout

use std::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("could not detect {0} from git; pass it explicitly")]
    Undetected(&'static str),
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8(output.stdout).ok()?;
    let trimmed = stdout.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `owner/name` from a GitHub remote url
pub fn repo_from_remote(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    let path = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;

    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Some(format!("{}/{}", owner, name))
        }
        _ => None,
    }
}

/// The `owner/name` of the `origin` remote
pub fn detect_repo() -> Result<String, GitError> {
    git(&["remote", "get-url", "origin"])
        .and_then(|url| repo_from_remote(&url))
        .ok_or(GitError::Undetected("repository"))
}

/// The checked-out branch
pub fn detect_branch() -> Result<String, GitError> {
    git(&["rev-parse", "--abbrev-ref", "HEAD"])
        .filter(|branch| branch != "HEAD")
        .ok_or(GitError::Undetected("branch"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_repo_from_remote() {
        assert_eq!(
            repo_from_remote("git@github.com:envcrypts/api.git").as_deref(),
            Some("envcrypts/api")
        );
        assert_eq!(
            repo_from_remote("https://github.com/envcrypts/api\n").as_deref(),
            Some("envcrypts/api")
        );
        assert_eq!(
            repo_from_remote("ssh://git@github.com/envcrypts/api.git").as_deref(),
            Some("envcrypts/api")
        );
        assert_eq!(repo_from_remote("https://gitlab.com/envcrypts/api"), None);
        assert_eq!(repo_from_remote("https://github.com/envcrypts"), None);
    }
}
