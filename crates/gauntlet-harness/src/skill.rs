use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads skill instruction files (`skills/<id>/SKILL.md`) and caches
/// them by id. A missing skill file is a load-time warning, not an
/// error — the test still runs, without injected instructions.
pub struct SkillLibrary {
    skills_dir: PathBuf,
    cache: HashMap<String, Option<String>>,
}

impl SkillLibrary {
    pub fn new(skills_dir: impl Into<PathBuf>) -> Self {
        Self {
            skills_dir: skills_dir.into(),
            cache: HashMap::new(),
        }
    }

    pub fn skills_dir(&self) -> &Path {
        &self.skills_dir
    }

    /// Instruction text for a skill, if its SKILL.md exists.
    pub fn instructions(&mut self, skill_id: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(skill_id) {
            return cached.clone();
        }

        let path = self.skills_dir.join(skill_id).join("SKILL.md");
        let loaded = match std::fs::read_to_string(&path) {
            Ok(text) => {
                debug!(skill = skill_id, path = %path.display(), "loaded skill instructions");
                Some(text)
            }
            Err(e) => {
                warn!(
                    skill = skill_id,
                    path = %path.display(),
                    error = %e,
                    "skill instructions not found, running without them"
                );
                None
            }
        };
        self.cache.insert(skill_id.to_string(), loaded.clone());
        loaded
    }
}
