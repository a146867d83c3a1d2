use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

/// The mailbox owner, used to scrub personal data from fixtures.
#[derive(Args, Debug, Clone, Default)]
pub struct Identity {
    /// First name to redact from fixtures
    #[arg(long = "first-name", env = "JOBMAIL_FIRST_NAME")]
    pub first_name: Option<String>,

    /// Last name to redact from fixtures
    #[arg(long = "last-name", env = "JOBMAIL_LAST_NAME")]
    pub last_name: Option<String>,

    /// Mailbox address to redact from fixtures
    #[arg(long = "owner-email", env = "JOBMAIL_EMAIL")]
    pub email: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Write sanitized fixtures for every processed alert
    #[arg(long, env = "JOBMAIL_DEBUG", default_value_t = false)]
    pub debug: bool,

    /// Directory for generated fixtures
    #[arg(long, env = "JOBMAIL_FIXTURE_DIR", default_value = "email_fixtures")]
    pub fixture_dir: PathBuf,

    /// SQLite database path (defaults to the platform data dir)
    #[arg(long, env = "JOBMAIL_DB")]
    pub db: Option<PathBuf>,

    #[command(flatten)]
    pub identity: Identity,
}

impl Settings {
    pub fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.db {
            return Ok(path.clone());
        }
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobmail") {
            Ok(proj_dirs.data_dir().join("jobmail.db"))
        } else {
            Ok(PathBuf::from("jobmail.db"))
        }
    }
}

/// Expand a leading `~/` against `$HOME`.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/passwd"), PathBuf::from("/etc/passwd"));
        assert!(expand_home("~/.pw").ends_with(".pw"));
        assert!(!expand_home("~/.pw").starts_with("~"));
    }

    #[test]
    fn test_explicit_db_path_wins() {
        let settings = Settings {
            debug: false,
            fixture_dir: PathBuf::from("fx"),
            db: Some(PathBuf::from("/tmp/jobs.db")),
            identity: Identity::default(),
        };
        assert_eq!(settings.db_path().unwrap(), PathBuf::from("/tmp/jobs.db"));
    }
}
