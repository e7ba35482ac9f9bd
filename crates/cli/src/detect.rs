// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Prompt detection over free-form process output.
//!
//! Two signals mean the supervised tool is blocked on a second factor:
//! a line containing one of the configured keywords, or silence for a while
//! after the tool printed its startup banner. Some tools write the actual
//! prompt to a terminal device the pipes never see, so the silence is all
//! the supervisor gets.

use regex::Regex;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{ConfigError, SupervisorConfig, DEFAULT_BANNER_KEYWORDS, DEFAULT_PROMPT_KEYWORDS};

/// Stateless line classifier.
#[derive(Clone, Debug)]
pub struct PromptDetector {
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    banners: Vec<String>,
}

impl PromptDetector {
    /// Build a detector from keyword and banner lists. Matching is case-insensitive.
    pub fn new<K, B>(keywords: K, banners: B) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        Self {
            keywords: lowered(keywords),
            patterns: Vec::new(),
            banners: lowered(banners),
        }
    }

    /// Also treat lines matching any of `patterns` as prompts.
    ///
    /// Patterns run against the lower-cased line.
    pub fn with_patterns<P>(mut self, patterns: P) -> Result<Self, regex::Error>
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        for pattern in patterns {
            self.patterns.push(Regex::new(pattern.as_ref())?);
        }
        Ok(self)
    }

    pub fn from_config(config: &SupervisorConfig) -> Result<Self, ConfigError> {
        Self::new(&config.prompt_keywords, &config.banner_keywords)
            .with_patterns(&config.prompt_patterns)
            .map_err(ConfigError::from)
    }

    /// Whether `line` says the tool is waiting for a confirmation.
    pub fn is_prompt(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.keywords.iter().any(|k| line.contains(k.as_str()))
            || self.patterns.iter().any(|p| p.is_match(&line))
    }

    /// Whether `line` is the tool's startup banner.
    pub fn is_banner(&self, line: &str) -> bool {
        let line = line.to_lowercase();
        self.banners.iter().any(|b| line.contains(b.as_str()))
    }

    /// Prompt wins over banner when a line is both.
    pub fn classify(&self, line: &str) -> LineKind {
        if self.is_prompt(line) {
            LineKind::Prompt
        } else if self.is_banner(line) {
            LineKind::Banner
        } else {
            LineKind::Other
        }
    }
}

/// What a single line of output means to the supervisor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    Prompt,
    Banner,
    Other,
}

impl std::fmt::Display for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prompt => f.write_str("prompt"),
            Self::Banner => f.write_str("banner"),
            Self::Other => f.write_str("-"),
        }
    }
}

impl Default for PromptDetector {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_KEYWORDS, DEFAULT_BANNER_KEYWORDS)
    }
}

fn lowered<I>(items: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Tracks the banner-then-silence heuristic for one run.
///
/// Armed by the first banner line. Every line seen while armed pushes the
/// deadline out by the quiet period. Fires at most once; disarming is final.
#[derive(Clone, Debug)]
pub struct QuietPeriod {
    period: Option<Duration>,
    deadline: Option<Instant>,
    spent: bool,
}

impl QuietPeriod {
    /// `None` disables the heuristic entirely.
    pub fn new(period: Option<Duration>) -> Self {
        Self {
            period,
            deadline: None,
            spent: false,
        }
    }

    /// Record a line of output seen at `now`.
    pub fn observe(&mut self, now: Instant, is_banner: bool) {
        let Some(period) = self.period else {
            return;
        };
        if self.spent {
            return;
        }
        if is_banner || self.deadline.is_some() {
            self.deadline = Some(now + period);
        }
    }

    /// When the silence will count as a prompt, if armed.
    pub fn deadline(&self) -> Option<Instant> {
        if self.spent {
            None
        } else {
            self.deadline
        }
    }

    /// Consume the trigger if the deadline has passed. True at most once.
    pub fn take_if_due(&mut self, now: Instant) -> bool {
        match self.deadline() {
            Some(deadline) if now >= deadline => {
                self.disarm();
                true
            }
            _ => false,
        }
    }

    /// Never fire for the rest of the run.
    pub fn disarm(&mut self) {
        self.spent = true;
        self.deadline = None;
    }

    pub fn is_spent(&self) -> bool {
        self.spent
    }
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
