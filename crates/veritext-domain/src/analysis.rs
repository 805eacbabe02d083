//! Analysis result types and confidence banding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::user::UnknownVariant;

/// Minimum accepted text length, in Unicode scalar values.
pub const MIN_TEXT_CHARS: usize = 50;

/// Maximum accepted text length, in Unicode scalar values.
pub const MAX_TEXT_CHARS: usize = 10_000;

/// Language of the submitted text. Wire format: `"pt"` / `"en"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Pt,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pt => "pt",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pt" => Ok(Self::Pt),
            "en" => Ok(Self::En),
            other => Err(UnknownVariant {
                kind: "language",
                value: other.to_owned(),
            }),
        }
    }
}

/// Confidence band derived from an AI-probability score.
///
/// Variants are declared in ascending order so `Ord` follows the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl FromStr for Confidence {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            other => Err(UnknownVariant {
                kind: "confidence",
                value: other.to_owned(),
            }),
        }
    }
}

/// Severity of a single indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lenient parse used when normalizing provider output; unknown values map to `Medium`.
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" | "baixa" | "baixo" => Self::Low,
            "high" | "alta" | "alto" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// A signal that contributed to the score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub severity: Severity,
}

/// A span of the input the provider flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousPart {
    pub text: String,
    pub score: f64,
    pub reason: String,
}

/// Errors from [`ConfidenceThresholds::new`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ThresholdError {
    #[error("thresholds must lie within 0..=100")]
    OutOfRange,
    #[error("thresholds must satisfy medium <= ai_cutoff <= high")]
    NotMonotonic,
}

/// Cut points for confidence banding.
///
/// `score >= high` is HIGH, `score >= medium` is MEDIUM, anything else is LOW.
/// `ai_cutoff` decides `is_ai_generated` and sits between the two so a HIGH
/// result is always flagged and a LOW result never is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceThresholds {
    medium: f64,
    high: f64,
    ai_cutoff: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            medium: 30.0,
            high: 70.0,
            ai_cutoff: 50.0,
        }
    }
}

/// Result of banding one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub confidence: Confidence,
    pub is_ai_generated: bool,
}

impl ConfidenceThresholds {
    pub fn new(medium: f64, high: f64, ai_cutoff: f64) -> Result<Self, ThresholdError> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !(in_range(medium) && in_range(high) && in_range(ai_cutoff)) {
            return Err(ThresholdError::OutOfRange);
        }
        if !(medium <= ai_cutoff && ai_cutoff <= high) {
            return Err(ThresholdError::NotMonotonic);
        }
        Ok(Self {
            medium,
            high,
            ai_cutoff,
        })
    }

    pub fn medium(&self) -> f64 {
        self.medium
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn ai_cutoff(&self) -> f64 {
        self.ai_cutoff
    }

    /// Band a score. Total over every `f64`; NaN bands as LOW.
    pub fn classify(&self, score: f64) -> Classification {
        let confidence = if score >= self.high {
            Confidence::High
        } else if score >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        Classification {
            confidence,
            is_ai_generated: score >= self.ai_cutoff,
        }
    }
}

/// Size measurements of a submitted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMetrics {
    pub char_count: usize,
    pub word_count: usize,
}

impl TextMetrics {
    pub fn measure(text: &str) -> Self {
        Self {
            char_count: text.chars().count(),
            word_count: text.split_whitespace().count(),
        }
    }
}
