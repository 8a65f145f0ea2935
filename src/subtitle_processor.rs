/*!
 * Subtitle parsing and serialization.
 *
 * Implements the Parser capability for SRT and WebVTT documents. The
 * translation engine only consumes the ordered line sequence; timing and
 * metadata are carried through untouched.
 */

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// Matches SRT and VTT cue timings; both ',' and '.' millisecond separators.
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})")
        .unwrap()
});

/// Supported subtitle file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
}

impl SubtitleFormat {
    /// Detect the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            _ => None,
        }
    }

    /// Detect the format from a file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
        }
    }
}

impl std::fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// A single timed subtitle line.
///
/// Source fields are immutable once parsed; `translated` is the only field
/// the translation engine writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleLine {
    /// Ordinal position within the document (0-based, dense)
    pub index: usize,
    /// Start time in milliseconds
    pub start_ms: u64,
    /// End time in milliseconds (>= start_ms)
    pub end_ms: u64,
    /// Original text
    pub text: String,
    /// Translated text, populated by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
    /// Formatting tag carried through from the source format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl SubtitleLine {
    /// Create a new subtitle line.
    pub fn new(index: usize, start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            index,
            start_ms,
            end_ms,
            text: text.into(),
            translated: None,
            style: None,
        }
    }

    /// Text to emit when serializing: the translation when present and
    /// non-empty, otherwise the original.
    pub fn output_text(&self) -> &str {
        match &self.translated {
            Some(t) if !t.is_empty() => t,
            _ => &self.text,
        }
    }
}

/// A parsed subtitle document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtitle {
    pub format: SubtitleFormat,
    pub lines: Vec<SubtitleLine>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Subtitle {
    /// Parse a document of the given format.
    pub fn parse(content: &str, format: SubtitleFormat) -> Result<Self> {
        let lines = match format {
            SubtitleFormat::Srt => parse_cues(content, false)?,
            SubtitleFormat::Vtt => parse_cues(content, true)?,
        };
        Ok(Self {
            format,
            lines,
            metadata: HashMap::new(),
        })
    }

    /// Serialize back to the document's own format, writing translations
    /// where present.
    pub fn serialize(&self) -> String {
        match self.format {
            SubtitleFormat::Srt => self.serialize_srt(),
            SubtitleFormat::Vtt => self.serialize_vtt(),
        }
    }

    fn serialize_srt(&self) -> String {
        let mut out = String::new();
        for (seq, line) in self.lines.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                seq + 1,
                format_timestamp(line.start_ms, ','),
                format_timestamp(line.end_ms, ','),
                line.output_text()
            ));
        }
        out
    }

    fn serialize_vtt(&self) -> String {
        let mut out = String::from("WEBVTT\n\n");
        for line in &self.lines {
            out.push_str(&format!(
                "{} --> {}\n{}\n\n",
                format_timestamp(line.start_ms, '.'),
                format_timestamp(line.end_ms, '.'),
                line.output_text()
            ));
        }
        out
    }
}

fn parse_timestamp_pair(line: &str) -> Option<(u64, u64)> {
    let caps = TIMESTAMP_REGEX.captures(line)?;
    let field = |i: usize| caps.get(i).unwrap().as_str().parse::<u64>().unwrap();

    let start = field(1) * 3_600_000 + field(2) * 60_000 + field(3) * 1_000 + field(4);
    let end = field(5) * 3_600_000 + field(6) * 60_000 + field(7) * 1_000 + field(8);
    Some((start, end))
}

fn format_timestamp(ms: u64, millis_sep: char) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02}{}{:03}", hours, minutes, seconds, millis_sep, millis)
}

fn parse_cues(content: &str, is_vtt: bool) -> Result<Vec<SubtitleLine>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    let flush = |block: &mut Vec<&str>, lines: &mut Vec<SubtitleLine>| {
        if block.is_empty() {
            return;
        }
        if let Some(line) = parse_cue_block(block, lines.len(), is_vtt) {
            lines.push(line);
        }
        block.clear();
    };

    for raw in content.lines() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            flush(&mut block, &mut lines);
        } else {
            block.push(line);
        }
    }
    flush(&mut block, &mut lines);

    if lines.is_empty() && !content.trim().is_empty() && !is_vtt {
        return Err(anyhow!("No valid subtitle cues found in document"));
    }

    Ok(lines)
}

fn parse_cue_block(block: &[&str], index: usize, is_vtt: bool) -> Option<SubtitleLine> {
    let first = block[0].trim();
    if is_vtt && (first.starts_with("WEBVTT") || first.starts_with("NOTE") || first.starts_with("STYLE")) {
        return None;
    }

    // The timestamp line may be preceded by a numeric counter (SRT) or a cue
    // identifier (VTT).
    let timing_pos = block.iter().position(|l| TIMESTAMP_REGEX.is_match(l))?;
    let (start_ms, end_ms) = parse_timestamp_pair(block[timing_pos])?;

    if end_ms < start_ms {
        warn!("Skipping cue {} with end time before start time", index + 1);
        return None;
    }

    let text = block[timing_pos + 1..].join("\n");
    Some(SubtitleLine::new(index, start_ms, end_ms, text))
}
