//! Turning raw segments into a readable document.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{RawResult, RawSegment};

/// Speaker id used when the service omits one
pub const DEFAULT_SPEAKER: &str = "0";

/// One utterance, with times in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub begin_ms: u64,
    pub end_ms: u64,
    pub text: String,
    pub speaker_id: String,
}

impl Segment {
    pub fn new(speaker_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            begin_ms: 0,
            end_ms: 0,
            text: text.into(),
            speaker_id: speaker_id.into(),
        }
    }
}

impl From<&RawSegment> for Segment {
    fn from(raw: &RawSegment) -> Self {
        Self {
            begin_ms: raw.bg.trim().parse().unwrap_or(0),
            end_ms: raw.ed.trim().parse().unwrap_or(0),
            text: raw.onebest.clone(),
            speaker_id: raw
                .speaker
                .clone()
                .unwrap_or_else(|| DEFAULT_SPEAKER.to_string()),
        }
    }
}

/// Segments of a raw result, in service order
pub fn segments_from_raw(raw: &RawResult) -> Vec<Segment> {
    raw.segments.iter().map(Segment::from).collect()
}

/// All segments of one speaker, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerGroup {
    pub speaker_id: String,
    pub segments: Vec<Segment>,
}

/// Document view of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedTranscript {
    /// Zero or one distinct speaker: texts in array order, one per line
    Single(String),
    /// Several speakers, grouped in order of first appearance
    Multi(Vec<SpeakerGroup>),
}

impl FormattedTranscript {
    pub fn from_segments(segments: &[Segment]) -> Self {
        let mut groups: Vec<SpeakerGroup> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for segment in segments {
            let slot = *index.entry(segment.speaker_id.as_str()).or_insert_with(|| {
                groups.push(SpeakerGroup {
                    speaker_id: segment.speaker_id.clone(),
                    segments: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].segments.push(segment.clone());
        }

        if groups.len() <= 1 {
            let text = segments
                .iter()
                .map(|s| s.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            FormattedTranscript::Single(text)
        } else {
            FormattedTranscript::Multi(groups)
        }
    }
}

impl fmt::Display for FormattedTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormattedTranscript::Single(text) => f.write_str(text),
            FormattedTranscript::Multi(groups) => {
                for (i, group) in groups.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n\n")?;
                    }
                    let texts: Vec<&str> = group.segments.iter().map(|s| s.text.as_str()).collect();
                    write!(f, "Speaker {}: {}", group.speaker_id, texts.join(" "))?;
                }
                Ok(())
            }
        }
    }
}

/// Render segments as text. Deterministic; empty input gives an empty string.
pub fn format(segments: &[Segment]) -> String {
    FormattedTranscript::from_segments(segments).to_string()
}
