//! Ranges bound to a concrete host string.

use crate::range::{Constraint, RangeFlex};
use crate::RangeError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A string addressed by character offset.
#[derive(Debug, PartialEq, Eq)]
pub struct Host {
    text: String,
    chars: Vec<char>,
}

impl Host {
    pub fn new(text: &str) -> Arc<Host> {
        Arc::new(Host {
            text: text.to_string(),
            chars: text.chars().collect(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn matches_at(&self, start: usize, pattern: &[char]) -> bool {
        self.chars
            .get(start..start + pattern.len())
            .is_some_and(|window| window == pattern)
    }

    /// Every start offset where `pattern` occurs, left to right. Occurrences
    /// may overlap.
    pub fn occurrences(&self, pattern: &str) -> Vec<usize> {
        let pattern: Vec<char> = pattern.chars().collect();
        if pattern.len() > self.len() {
            return Vec::new();
        }
        (0..=self.len() - pattern.len())
            .filter(|&start| self.matches_at(start, &pattern))
            .collect()
    }
}

/// The text of an [`Applied`] range split at its window boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    /// Text the start window may or may not include.
    pub prefix: String,
    /// Text every placement includes. Empty unless anchored.
    pub main: String,
    /// Text the end window may or may not include.
    pub suffix: String,
    /// False when the windows overlap, leaving no certain main text.
    pub anchored: bool,
}

#[derive(Debug, Clone)]
pub struct Applied {
    host: Arc<Host>,
    flex: RangeFlex,
}

impl RangeFlex {
    pub fn apply_to(&self, host: &Arc<Host>) -> Result<Applied, RangeError> {
        Applied::new(Arc::clone(host), *self)
    }
}

impl Applied {
    pub fn new(host: Arc<Host>, flex: RangeFlex) -> Result<Self, RangeError> {
        if flex.end().max() > host.len() {
            return Err(RangeError::OutOfBounds {
                range: flex.to_string(),
                len: host.len(),
            });
        }
        Ok(Self { host, flex })
    }

    /// The whole of `text`, fixed, on a host of its own.
    pub fn of(text: &str) -> Self {
        let host = Host::new(text);
        let flex = RangeFlex::spanning(host.len());
        Self { host, flex }
    }

    pub fn host(&self) -> &Arc<Host> {
        &self.host
    }

    pub fn flex(&self) -> RangeFlex {
        self.flex
    }

    /// The text every placement agrees on, if there is exactly one.
    pub fn text(&self) -> Option<String> {
        if self.flex.max_len() == 0 {
            Some(String::new())
        } else if self.flex.is_fixed() {
            Some(self.maximal())
        } else {
            None
        }
    }

    pub fn maximal(&self) -> String {
        let (start, end) = self.flex.maximal();
        self.host.slice(start, end)
    }

    pub fn segments(&self) -> Segments {
        let start = self.flex.start();
        let end = self.flex.end();
        let anchored = start.max() <= end.min();
        let prefix = self.host.slice(start.min(), start.max());
        let suffix = self.host.slice(end.min(), end.max());
        let main = if anchored {
            self.host.slice(start.max(), end.min())
        } else {
            String::new()
        };
        Segments {
            prefix,
            main,
            suffix,
            anchored,
        }
    }

    fn same_host(&self, other: &Applied) -> bool {
        Arc::ptr_eq(&self.host, &other.host) || self.host.text == other.host.text
    }

    /// Narrows `self` to where it agrees with `other`.
    ///
    /// On a shared host the two flexes are intersected. Otherwise, and when
    /// the intersection is empty, the candidate texts of `other` are tried
    /// longest first and the first one found inside `self`'s placements,
    /// leftmost, wins. Each distinct text is searched for once.
    pub fn merge(&self, other: &Applied) -> Option<Applied> {
        if self.same_host(other) {
            if let Some(flex) = self.flex.constrain(&Constraint::ToRange(other.flex)) {
                return Some(Applied {
                    host: Arc::clone(&self.host),
                    flex,
                });
            }
        }
        let mut tried: HashSet<&[char]> = HashSet::new();
        for (start, end) in other.flex.placements() {
            let candidate = &other.host.chars[start..end];
            if !tried.insert(candidate) {
                continue;
            }
            if let Some(at) = self.find(candidate) {
                return Some(Applied {
                    host: Arc::clone(&self.host),
                    flex: RangeFlex::fixed(at, candidate.len()),
                });
            }
        }
        None
    }

    fn find(&self, pattern: &[char]) -> Option<usize> {
        self.flex
            .start()
            .offsets()
            .find(|&start| {
                self.flex.admits(start, start + pattern.len()) && self.host.matches_at(start, pattern)
            })
    }
}

impl PartialEq for Applied {
    fn eq(&self, other: &Self) -> bool {
        self.flex == other.flex && self.host.text == other.host.text
    }
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.flex.start();
        let end = self.flex.end();
        let before = self.host.slice(0, start.min());
        let after = self.host.slice(end.max(), self.host.len());
        if self.flex.max_len() == 0 && !self.flex.is_fixed() {
            // Zero width, anywhere in the bracketed region.
            let region = self.host.slice(start.min(), end.max());
            return write!(f, "{before}[]({region}){after}");
        }
        let segments = self.segments();
        write!(f, "{before}[")?;
        if self.flex.is_fixed() {
            write!(f, "{}", segments.main)?;
        } else if segments.anchored {
            if !start.is_point() {
                write!(f, "({})", segments.prefix)?;
            }
            write!(f, "{}", segments.main)?;
            if !end.is_point() {
                write!(f, "({})", segments.suffix)?;
            }
        } else {
            write!(f, "({})", self.host.slice(start.min(), end.max()))?;
        }
        write!(f, "]{after}")
    }
}
