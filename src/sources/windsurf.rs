//! Windsurf adapter (§4.4): a design-documented limitation. Windsurf's
//! on-disk conversation format is not reverse-engineered here, so this
//! adapter produces only workspace metadata and empty conversation
//! shells — it still participates in aggregation so totals are reported,
//! per §9's open question on its value beyond metadata.

use super::{ConversationSource, SourceFilter};
use crate::error::Result;
use crate::types::{Conversation, Source, Workspace};
use std::path::{Path, PathBuf};

pub struct WindsurfSource {
    data_dir: Option<PathBuf>,
}

impl WindsurfSource {
    #[must_use]
    pub fn new() -> Self {
        Self { data_dir: default_data_dir() }
    }

    #[must_use]
    pub fn with_data_dir(dir: PathBuf) -> Self {
        Self { data_dir: Some(dir) }
    }
}

impl Default for WindsurfSource {
    fn default() -> Self {
        Self::new()
    }
}

fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Windsurf").join("User"))
}

impl ConversationSource for WindsurfSource {
    fn source(&self) -> Source {
        Source::Windsurf
    }

    fn detect(&self) -> bool {
        self.data_dir.as_deref().is_some_and(Path::is_dir)
    }

    fn store_paths(&self) -> Vec<PathBuf> {
        self.data_dir.iter().cloned().collect()
    }

    fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let Some(dir) = &self.data_dir else { return Ok(Vec::new()) };
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(vec![Workspace {
            workspace_id: "windsurf-default".to_string(),
            path: dir.clone(),
            conversation_count: 0,
            prompt_count: 0,
            generation_count: 0,
        }])
    }

    fn extract(&self, _filter: &SourceFilter) -> Result<Vec<Conversation>> {
        // No message content is ever produced; only workspace totals
        // (reported via list_workspaces) participate in aggregation.
        Ok(Vec::new())
    }
}
