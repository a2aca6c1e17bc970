use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "CASABOT_HOME";
const HOME_DIR_NAME: &str = "casabot";
const CONFIG_FILE_NAME: &str = "casabot.json";

/// Skill categories created under `skills/` on first run.
pub const SKILL_CATEGORIES: [&str; 6] = ["agent", "config", "chat", "service", "memory", "subskills"];

/// On-disk layout of one casabot home directory.
///
/// Built once at startup and passed to whatever needs a path, so tests can
/// point everything at a temporary directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasabotPaths {
    pub home: PathBuf,
    pub skills: PathBuf,
    pub workspaces: PathBuf,
    pub history: PathBuf,
    pub memory: PathBuf,
    pub config_file: PathBuf,
}

impl CasabotPaths {
    #[must_use]
    pub fn from_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            skills: home.join("skills"),
            workspaces: home.join("workspaces"),
            history: home.join("history"),
            memory: home.join("memory"),
            config_file: home.join(CONFIG_FILE_NAME),
            home,
        }
    }

    /// `$CASABOT_HOME`, falling back to `~/casabot`.
    pub fn resolve() -> io::Result<Self> {
        Self::resolve_with(std::env::var_os(HOME_ENV), dirs::home_dir())
    }

    fn resolve_with(override_home: Option<OsString>, user_home: Option<PathBuf>) -> io::Result<Self> {
        if let Some(home) = override_home.filter(|value| !value.is_empty()) {
            return Ok(Self::from_home(PathBuf::from(home)));
        }
        let user_home = user_home.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("cannot determine home directory; set {HOME_ENV}"),
            )
        })?;
        Ok(Self::from_home(user_home.join(HOME_DIR_NAME)))
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Creates every directory of the layout, including skill categories.
    pub fn ensure_directories(&self) -> io::Result<()> {
        for dir in [&self.home, &self.skills, &self.workspaces, &self.history, &self.memory] {
            std::fs::create_dir_all(dir)?;
        }
        for category in SKILL_CATEGORIES {
            std::fs::create_dir_all(self.skills.join(category))?;
        }
        Ok(())
    }
}
