//! Library of canonical ordinal scales.
//!
//! When ordinal labels arrive without an explicit ordering, the label mapping
//! searches this library for a scale that contains every observed label
//! (case-insensitively). Scales from configuration are searched before the
//! built-in ones, so a project can override the ordering of shared labels
//! such as "Neutral" or "Good".

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReliabilityError;

/// Case-folded, whitespace-trimmed form used for every scale comparison.
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// An ordered list of labels, lowest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalScale {
    pub name: String,
    pub labels: Vec<String>,
}

impl OrdinalScale {
    pub fn new(name: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    fn from_static(name: &str, labels: &[&str]) -> Self {
        Self::new(name, labels.iter().map(|l| l.to_string()).collect())
    }

    /// 0-based rank of `label` in this scale, ignoring case.
    pub fn position(&self, label: &str) -> Option<usize> {
        let needle = normalize_label(label);
        self.labels
            .iter()
            .position(|l| normalize_label(l) == needle)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    /// Every label in `labels` appears in this scale.
    pub fn covers<'a>(&self, labels: impl IntoIterator<Item = &'a str>) -> bool {
        labels.into_iter().all(|l| self.contains(l))
    }

    pub fn validate(&self) -> Result<(), ReliabilityError> {
        let distinct: HashSet<String> = self.labels.iter().map(|l| normalize_label(l)).collect();
        if distinct.len() != self.labels.len() {
            return Err(ReliabilityError::InvalidScale(format!(
                "scale {:?} repeats a label",
                self.name
            )));
        }
        if distinct.len() < 2 || distinct.contains("") {
            return Err(ReliabilityError::InvalidScale(format!(
                "scale {:?} needs at least two non-empty labels",
                self.name
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Library
// =============================================================================

/// Ordered collection of scales; the first scale covering a label set wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleLibrary {
    scales: Vec<OrdinalScale>,
}

impl Default for ScaleLibrary {
    fn default() -> Self {
        Self::canonical()
    }
}

impl ScaleLibrary {
    pub fn empty() -> Self {
        Self { scales: Vec::new() }
    }

    /// The built-in scales for common survey, rating and severity labels.
    pub fn canonical() -> Self {
        let scales = vec![
            // Sentiment and opinion
            OrdinalScale::from_static(
                "sentiment",
                &["Very Negative", "Negative", "Neutral", "Positive", "Very Positive"],
            ),
            OrdinalScale::from_static(
                "agreement",
                &["Strongly Disagree", "Disagree", "Neutral", "Agree", "Strongly Agree"],
            ),
            OrdinalScale::from_static(
                "satisfaction",
                &["Very Dissatisfied", "Dissatisfied", "Neutral", "Satisfied", "Very Satisfied"],
            ),
            // Ratings and reviews
            OrdinalScale::from_static("quality", &["Poor", "Fair", "Good", "Very Good", "Excellent"]),
            OrdinalScale::from_static(
                "stars",
                &["1 Star", "2 Stars", "3 Stars", "4 Stars", "5 Stars"],
            ),
            OrdinalScale::from_static(
                "usability",
                &["Unusable", "Difficult", "Neutral", "Easy", "Very Easy"],
            ),
            // Proficiency
            OrdinalScale::from_static("expertise", &["Beginner", "Intermediate", "Advanced", "Expert"]),
            OrdinalScale::from_static("grade", &["F", "D", "C", "B", "A"]),
            OrdinalScale::from_static(
                "language_proficiency",
                &["Novice", "Basic", "Conversational", "Fluent", "Native"],
            ),
            // Risk and severity
            OrdinalScale::from_static("pain", &["No Pain", "Mild", "Moderate", "Severe", "Extreme"]),
            OrdinalScale::from_static("risk", &["Very Low", "Low", "Moderate", "High", "Very High"]),
            OrdinalScale::from_static(
                "urgency",
                &["Not Urgent", "Slightly Urgent", "Moderately Urgent", "Urgent", "Critical"],
            ),
            // Likelihood
            OrdinalScale::from_static(
                "likelihood",
                &["Impossible", "Unlikely", "Neutral", "Likely", "Certain"],
            ),
            OrdinalScale::from_static(
                "confidence",
                &[
                    "Not Confident",
                    "Slightly Confident",
                    "Moderately Confident",
                    "Very Confident",
                    "Completely Confident",
                ],
            ),
            // Generic
            OrdinalScale::from_static("informal_quality", &["Terrible", "Bad", "Okay", "Good", "Excellent"]),
            OrdinalScale::from_static("five_level", &["Very Low", "Low", "Medium", "High", "Very High"]),
        ];
        Self { scales }
    }

    /// Prepend `extra` so that it is searched before the current scales.
    pub fn with_extra(mut self, extra: impl IntoIterator<Item = OrdinalScale>) -> Self {
        let mut scales: Vec<OrdinalScale> = extra.into_iter().collect();
        scales.append(&mut self.scales);
        self.scales = scales;
        self
    }

    pub fn scales(&self) -> &[OrdinalScale] {
        &self.scales
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// First scale containing every label. An empty label set matches nothing.
    pub fn find_match<'a, I>(&self, labels: I) -> Option<&OrdinalScale>
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: Clone,
    {
        let labels = labels.into_iter();
        if labels.clone().next().is_none() {
            return None;
        }
        self.scales.iter().find(|s| s.covers(labels.clone()))
    }
}
