//! Layout-artifact cleanup applied before chunking.
//!
//! Extracted document text carries page furniture (page numbers, stamps,
//! "intentionally left blank" pages, tables of contents) that wastes prompt
//! budget and confuses boundary detection. Removals are reported back so a
//! run can log exactly what was dropped.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tap::Pipe;
use tracing::debug;

use crate::classify::{char_len, is_heading_line, split_paragraphs};

#[expect(clippy::expect_used)]
static TOC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)\A\s*(?:#{1,6}[ \t]*)?(?i:table of contents)[ \t]*:?[ \t]*\n.+?(SECTION|Section|ARTICLE|Article|1\.\s|I\.\s)",
    )
    .expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static PAGE_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*page[ \t]+\d+.*$").expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static STAMP_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t]*(confidential|draft|sample|—+|-{3,})[ \t]*$")
        .expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static BARE_NUMBER_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+[ \t]*$").expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static PAGE_OF_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\d+[ \t]+of[ \t]+\d+[ \t]*$").expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static BOILERPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)this page intentionally left blank|do not distribute")
        .expect("hardcoded regex pattern is valid")
});

#[expect(clippy::expect_used)]
static EXCESS_BLANK_LINES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n(?:[ \t]*\n){2,}").expect("hardcoded regex pattern is valid")
});

/// Which cleanup passes run before chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessOptions {
    /// Strip page numbers, stamps, boilerplate and tables of contents.
    #[serde(default = "default_true")]
    pub strip_artifacts: bool,

    /// Drop an unusually short leading paragraph (letterhead, sender block).
    #[serde(default = "default_true")]
    pub drop_letterhead: bool,

    /// A leading paragraph shorter than this many characters counts as letterhead.
    #[serde(default = "default_letterhead_max_chars")]
    pub letterhead_max_chars: usize,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            strip_artifacts: true,
            drop_letterhead: true,
            letterhead_max_chars: default_letterhead_max_chars(),
        }
    }
}

impl PreprocessOptions {
    /// Options that leave the text untouched apart from line-ending normalization.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            strip_artifacts: false,
            drop_letterhead: false,
            letterhead_max_chars: 0,
        }
    }
}

/// Cleaned text plus a record of every removed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preprocessed {
    pub text: String,
    pub removed: Vec<String>,
}

/// Normalize line endings and strip layout artifacts.
pub fn preprocess(text: &str, options: &PreprocessOptions) -> Preprocessed {
    let mut removed = Vec::new();
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let cleaned = if options.strip_artifacts {
        strip_artifacts(&normalized, &mut removed)
    } else {
        normalized
    };

    let text = if options.drop_letterhead {
        drop_letterhead(&cleaned, options.letterhead_max_chars, &mut removed)
    } else {
        cleaned
    };

    for fragment in &removed {
        debug!(fragment = %fragment, "Removed layout artifact");
    }

    Preprocessed {
        text: text.trim().to_string(),
        removed,
    }
}

fn strip_artifacts(text: &str, removed: &mut Vec<String>) -> String {
    let without_toc = strip_leading_toc(text, removed);

    let mut record = |caps: &Captures<'_>| {
        if let Some(m) = caps.get(0) {
            removed.push(m.as_str().trim().to_string());
        }
        String::new()
    };

    [
        &*PAGE_LINE_REGEX,
        &*STAMP_LINE_REGEX,
        &*PAGE_OF_REGEX,
        &*BARE_NUMBER_LINE_REGEX,
        &*BOILERPLATE_REGEX,
    ]
    .into_iter()
    .fold(without_toc, |acc, regex| {
        regex.replace_all(&acc, &mut record).into_owned()
    })
    .pipe(|cleaned| EXCESS_BLANK_LINES_REGEX.replace_all(&cleaned, "\n\n").into_owned())
}

/// Remove a table of contents that opens the text, up to the first section marker.
fn strip_leading_toc(text: &str, removed: &mut Vec<String>) -> String {
    let Some(marker) = TOC_REGEX.captures(text).and_then(|caps| caps.get(1)) else {
        return text.to_string();
    };

    match (text.get(..marker.start()), text.get(marker.start()..)) {
        (Some(toc), Some(rest)) => {
            removed.push(toc.trim().to_string());
            rest.to_string()
        }
        _ => text.to_string(),
    }
}

fn drop_letterhead(text: &str, max_chars: usize, removed: &mut Vec<String>) -> String {
    let paragraphs = split_paragraphs(text);
    let Some(first) = paragraphs.first().copied() else {
        return text.to_string();
    };

    let is_letterhead =
        paragraphs.len() > 1 && char_len(first) < max_chars && !is_heading_line(first);
    if !is_letterhead {
        return text.to_string();
    }

    match text.find(first).and_then(|offset| text.get(offset.saturating_add(first.len())..)) {
        Some(rest) => {
            removed.push(first.to_string());
            rest.trim_start().to_string()
        }
        None => text.to_string(),
    }
}

const fn default_true() -> bool {
    true
}

const fn default_letterhead_max_chars() -> usize {
    80
}
