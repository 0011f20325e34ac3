use serde::{Deserialize, Serialize};

/// Separator between pack and video in a composite video id (`K01_V001`)
pub const VIDEO_ID_SEPARATOR: char = '_';

/// Score reported for hits that come from a filter-only scroll
pub const UNRANKED_SCORE: f32 = 1.0;

/// Split a composite video id on its first separator.
///
/// Returns `None` when the id has no separator.
pub fn split_video_id(video_id: &str) -> Option<(&str, &str)> {
    video_id.split_once(VIDEO_ID_SEPARATOR)
}

/// Compose a video id from its pack and video parts
pub fn join_video_id(pack: &str, video: &str) -> String {
    format!("{pack}{VIDEO_ID_SEPARATOR}{video}")
}

/// A keyframe stored in the index together with its visual embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeRecord {
    pub pack: String,
    pub video: String,
    /// Frame label, usually the keyframe file stem (`001`, `042`, ...)
    pub frame: String,
    /// Position of the frame in the source video
    pub frame_index: u64,
    pub vector: Vec<f32>,
}

impl KeyframeRecord {
    pub fn new(
        pack: impl Into<String>,
        video: impl Into<String>,
        frame: impl Into<String>,
        frame_index: u64,
        vector: Vec<f32>,
    ) -> Self {
        Self {
            pack: pack.into(),
            video: video.into(),
            frame: frame.into(),
            frame_index,
            vector,
        }
    }

    pub fn video_id(&self) -> String {
        join_video_id(&self.pack, &self.video)
    }
}

/// One hit returned by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeHit {
    pub pack: String,
    pub video: String,
    pub frame: String,
    pub frame_index: u64,
    /// Similarity score, higher is better. [`UNRANKED_SCORE`] for scroll results.
    pub score: f32,
}

impl KeyframeHit {
    pub fn video_id(&self) -> String {
        join_video_id(&self.pack, &self.video)
    }
}
