use serde::{Deserialize, Serialize};

/// Operation carried by one chunk of a raw diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Add,
    Delete,
    Equal,
}

/// One change chunk as reported by the diff provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChunk {
    pub kind: ChunkKind,
    pub lines: usize,
}

/// Per-file diff of a commit against one of its parents, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFileDiff {
    pub path: String,
    #[serde(default)]
    pub old_path: Option<String>,
    #[serde(default)]
    pub binary: bool,
    #[serde(default)]
    pub chunks: Vec<RawChunk>,
}

/// A changed region within a file, positioned in both the old and the new version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPoint {
    pub old_position: usize,
    pub new_position: usize,
    pub added: usize,
    pub deleted: usize,
}

/// Reconstructed per-file diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub old_path: Option<String>,
    pub binary: bool,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub lines_equal: usize,
    pub points: Vec<DiffPoint>,
}

impl FileDiff {
    /// Walk the raw chunks with an old and a new line cursor, recording a
    /// point for every add or delete chunk.
    pub fn from_raw(raw: &RawFileDiff) -> Self {
        let mut old_position = 0usize;
        let mut new_position = 0usize;
        let mut lines_added = 0usize;
        let mut lines_deleted = 0usize;
        let mut lines_equal = 0usize;
        let mut points = Vec::new();

        for chunk in &raw.chunks {
            if chunk.lines == 0 {
                continue;
            }
            match chunk.kind {
                ChunkKind::Equal => {
                    old_position += chunk.lines;
                    new_position += chunk.lines;
                    lines_equal += chunk.lines;
                }
                ChunkKind::Add => {
                    points.push(DiffPoint {
                        old_position,
                        new_position,
                        added: chunk.lines,
                        deleted: 0,
                    });
                    new_position += chunk.lines;
                    lines_added += chunk.lines;
                }
                ChunkKind::Delete => {
                    points.push(DiffPoint {
                        old_position,
                        new_position,
                        added: 0,
                        deleted: chunk.lines,
                    });
                    old_position += chunk.lines;
                    lines_deleted += chunk.lines;
                }
            }
        }

        Self {
            path: raw.path.clone(),
            old_path: raw.old_path.clone(),
            binary: raw.binary,
            lines_added,
            lines_deleted,
            lines_equal,
            points,
        }
    }

    /// Total lines touched (added + deleted).
    pub fn churn(&self) -> usize {
        self.lines_added + self.lines_deleted
    }

    /// Spread of edit positions in the new version: `(max - min) / points`, at least 1.
    pub fn edit_spread(&self) -> f64 {
        let (Some(min), Some(max)) = (
            self.points.iter().map(|p| p.new_position).min(),
            self.points.iter().map(|p| p.new_position).max(),
        ) else {
            return 1.0;
        };
        let spread = (max - min) as f64 / self.points.len() as f64;
        spread.max(1.0)
    }
}
