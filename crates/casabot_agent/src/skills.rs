use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::fs;
use tracing::warn;

pub const SKILL_FILE_NAME: &str = "SKILL.md";

/// One skill document advertised to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Skill {
    pub name: String,
    pub description: String,
    pub metadata: Map<String, Value>,
    pub instructions: String,
    pub path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SkillLoadError {
    #[error("failed to read skills directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unterminated front matter (missing closing '---' fence)")]
    UnterminatedFrontmatter,
    #[error("invalid front matter: {0}")]
    InvalidFrontmatter(#[source] serde_yaml::Error),
}

#[derive(Debug, Default, Deserialize)]
struct SkillFrontmatter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    metadata: Option<Map<String, Value>>,
}

/// Parses one `SKILL.md`. Front matter is optional.
pub fn parse_skill_document(
    dir_name: &str,
    path: PathBuf,
    content: &str,
) -> Result<Skill, SkillLoadError> {
    let (frontmatter, body) = split_frontmatter(content)?;
    let frontmatter = match frontmatter {
        Some(yaml) if !yaml.trim().is_empty() => {
            serde_yaml::from_str::<SkillFrontmatter>(&yaml).map_err(SkillLoadError::InvalidFrontmatter)?
        }
        _ => SkillFrontmatter::default(),
    };

    Ok(Skill {
        name: frontmatter.name.unwrap_or_else(|| dir_name.to_string()),
        description: frontmatter.description.unwrap_or_default(),
        metadata: frontmatter.metadata.unwrap_or_default(),
        instructions: body.trim().to_string(),
        path,
    })
}

fn split_frontmatter(content: &str) -> Result<(Option<String>, String), SkillLoadError> {
    let content = content.replace("\r\n", "\n");
    let mut lines = content.split('\n');
    if lines.next() != Some("---") {
        return Ok((None, content));
    }

    let mut yaml = Vec::new();
    while let Some(line) = lines.next() {
        if line == "---" {
            let body = lines.collect::<Vec<_>>().join("\n");
            return Ok((Some(yaml.join("\n")), body));
        }
        yaml.push(line);
    }
    Err(SkillLoadError::UnterminatedFrontmatter)
}

/// Loads `<skills_dir>/<name>/SKILL.md` for every subdirectory, sorted by
/// directory name.
///
/// A missing skills directory yields no skills. Subdirectories without a
/// readable `SKILL.md` are ignored; malformed documents are skipped with a
/// warning so one bad skill cannot hide the rest.
pub async fn load_skills(skills_dir: &Path) -> Result<Vec<Skill>, SkillLoadError> {
    let mut entries = match fs::read_dir(skills_dir).await {
        Ok(entries) => entries,
        Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(SkillLoadError::ReadDir {
                path: skills_dir.to_path_buf(),
                source,
            });
        }
    };

    let mut dirs = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|source| SkillLoadError::ReadDir {
                path: skills_dir.to_path_buf(),
                source,
            })?;
        let Some(entry) = entry else {
            break;
        };
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if is_dir {
            dirs.push((entry.file_name().to_string_lossy().to_string(), entry.path()));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut skills = Vec::new();
    for (dir_name, dir_path) in dirs {
        let skill_file = dir_path.join(SKILL_FILE_NAME);
        let Ok(content) = fs::read_to_string(&skill_file).await else {
            continue;
        };
        if content.trim().is_empty() {
            continue;
        }

        match parse_skill_document(&dir_name, skill_file.clone(), &content) {
            Ok(skill) => skills.push(skill),
            Err(error) => warn!(path = %skill_file.display(), %error, "skipping malformed skill"),
        }
    }
    Ok(skills)
}

/// Renders the skill list section of the system prompt.
#[must_use]
pub fn format_skills_for_prompt(skills: &[Skill]) -> String {
    if skills.is_empty() {
        return "No skills available.".to_string();
    }

    let mut lines = vec!["Available Skills:".to_string()];
    for skill in skills {
        lines.push(format!("\n### {}", skill.name));
        if !skill.description.is_empty() {
            lines.push(skill.description.clone());
        }
        lines.push(format!("Path: {}", skill.path.display()));
    }
    lines.join("\n")
}
