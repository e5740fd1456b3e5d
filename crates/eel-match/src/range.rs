//! Flexible substring ranges.
//!
//! A [`RangeFlex`] stands for a set of candidate placements `(start, end)`
//! over a host of known length: `start` anywhere in the start window, `end`
//! anywhere in the end window, with `end - start` between the length bounds.
//! Offsets count characters, not bytes.
//!
//! Every constructor and narrowing operation normalises the four bounds to
//! a fixpoint, so each remaining bound value is supported by at least one
//! placement. Infeasible narrowing returns `None`.

use std::fmt;
use std::ops::RangeInclusive;

/// An inclusive window of admissible offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window {
    min: usize,
    max: usize,
}

impl Window {
    pub fn new(min: usize, max: usize) -> Option<Self> {
        (min <= max).then_some(Self { min, max })
    }

    pub fn point(at: usize) -> Self {
        Self { min: at, max: at }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.min <= offset && offset <= self.max
    }

    pub fn intersect(&self, other: &Window) -> Option<Window> {
        Window::new(self.min.max(other.min), self.max.min(other.max))
    }

    pub fn offsets(&self) -> RangeInclusive<usize> {
        self.min..=self.max
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_point() {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}~{}", self.min, self.max)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeFlex {
    start: Window,
    end: Window,
    min_len: usize,
    max_len: usize,
}

/// A narrowing operation over a [`RangeFlex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Intersect with another range.
    ToRange(RangeFlex),
    /// Collapse both windows to the widest single placement.
    ToFixedRange,
    ToMinLength(usize),
    ToMaxLength(usize),
}

impl Constraint {
    pub fn to_range(range: RangeFlex) -> Self {
        Constraint::ToRange(range)
    }

    pub fn to_fixed_range() -> Self {
        Constraint::ToFixedRange
    }

    pub fn to_min_length(len: usize) -> Self {
        Constraint::ToMinLength(len)
    }

    pub fn to_max_length(len: usize) -> Self {
        Constraint::ToMaxLength(len)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::ToRange(range) => write!(f, "to {range}"),
            Constraint::ToFixedRange => write!(f, "to a fixed range"),
            Constraint::ToMinLength(len) => write!(f, "to length >= {len}"),
            Constraint::ToMaxLength(len) => write!(f, "to length <= {len}"),
        }
    }
}

/// Two ranges placed back to back, plus the range they cover together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Concatenation {
    pub left: RangeFlex,
    pub right: RangeFlex,
    pub combined: RangeFlex,
}

impl RangeFlex {
    pub fn new(start: Window, end: Window) -> Option<Self> {
        Self::with_lengths(start, end, 0, usize::MAX)
    }

    pub fn with_lengths(start: Window, end: Window, min_len: usize, max_len: usize) -> Option<Self> {
        Self::normalized(start, end, min_len, max_len)
    }

    /// A single placement of `len` characters at `start`.
    pub fn fixed(start: usize, len: usize) -> Self {
        Self {
            start: Window::point(start),
            end: Window::point(start + len),
            min_len: len,
            max_len: len,
        }
    }

    /// Any placement inside a host of `len` characters.
    pub fn within(len: usize) -> Self {
        Self {
            start: Window { min: 0, max: len },
            end: Window { min: 0, max: len },
            min_len: 0,
            max_len: len,
        }
    }

    /// The whole of a host of `len` characters.
    pub fn spanning(len: usize) -> Self {
        Self::fixed(0, len)
    }

    fn normalized(
        mut start: Window,
        mut end: Window,
        mut min_len: usize,
        mut max_len: usize,
    ) -> Option<Self> {
        loop {
            let before = (start, end, min_len, max_len);
            if end.max < start.min {
                return None;
            }
            max_len = max_len.min(end.max - start.min);
            min_len = min_len.max(end.min.saturating_sub(start.max));
            if min_len > max_len {
                return None;
            }
            start = Window::new(
                start.min.max(end.min.saturating_sub(max_len)),
                start.max.min(end.max - min_len),
            )?;
            end = Window::new(
                end.min.max(start.min + min_len),
                end.max.min(start.max.saturating_add(max_len)),
            )?;
            if (start, end, min_len, max_len) == before {
                return Some(Self {
                    start,
                    end,
                    min_len,
                    max_len,
                });
            }
        }
    }

    pub fn start(&self) -> Window {
        self.start
    }

    pub fn end(&self) -> Window {
        self.end
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn is_fixed(&self) -> bool {
        self.start.is_point() && self.end.is_point()
    }

    /// Whether `offset` lies in the start or the end window.
    pub fn contains(&self, offset: usize) -> bool {
        self.start.contains(offset) || self.end.contains(offset)
    }

    pub fn admits(&self, start: usize, end: usize) -> bool {
        self.start.contains(start)
            && self.end.contains(end)
            && end >= start
            && (self.min_len..=self.max_len).contains(&(end - start))
    }

    /// The widest admissible placement.
    pub fn maximal(&self) -> (usize, usize) {
        let end = self.end.max;
        let start = self.start.min.max(end - self.max_len.min(end));
        (start, end)
    }

    /// Every admissible placement, longest first, then leftmost first.
    pub fn placements(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (self.min_len..=self.max_len).rev().flat_map(move |len| {
            self.start
                .offsets()
                .map(move |start| (start, start + len))
                .filter(move |&(start, end)| self.admits(start, end))
        })
    }

    pub fn constrain(&self, constraint: &Constraint) -> Option<RangeFlex> {
        match constraint {
            Constraint::ToRange(other) => Self::normalized(
                self.start.intersect(&other.start)?,
                self.end.intersect(&other.end)?,
                self.min_len.max(other.min_len),
                self.max_len.min(other.max_len),
            ),
            Constraint::ToFixedRange => {
                let (start, end) = self.maximal();
                Some(Self::fixed(start, end - start))
            }
            Constraint::ToMinLength(len) => {
                Self::normalized(self.start, self.end, self.min_len.max(*len), self.max_len)
            }
            Constraint::ToMaxLength(len) => {
                Self::normalized(self.start, self.end, self.min_len, self.max_len.min(*len))
            }
        }
    }

    /// Places `self` immediately before `right`, with no gap and no
    /// overlap, contracting both to the boundary where they meet.
    pub fn concatenate(&self, right: &RangeFlex) -> Option<Concatenation> {
        let mut left = *self;
        let mut right = *right;
        while left.end != right.start {
            let boundary = left.end.intersect(&right.start)?;
            left = Self::normalized(left.start, boundary, left.min_len, left.max_len)?;
            right = Self::normalized(boundary, right.end, right.min_len, right.max_len)?;
        }
        let combined = Self::normalized(
            left.start,
            right.end,
            left.min_len + right.min_len,
            left.max_len.saturating_add(right.max_len),
        )?;
        Some(Concatenation {
            left,
            right,
            combined,
        })
    }
}

impl fmt::Display for RangeFlex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)?;
        if !self.is_fixed() {
            write!(f, " (len {}~{})", self.min_len, self.max_len)?;
        }
        Ok(())
    }
}
