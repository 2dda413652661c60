use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Domain used when a code or pattern is written without one.
pub const DEFAULT_DOMAIN: &str = "game";

/// Errors from parsing block codes and code patterns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodeError {
    #[error("block code is empty")]
    Empty,
    #[error("block code {0:?} has an empty domain or path")]
    MissingPart(String),
}

/// Namespaced block identifier, `domain:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlockCode {
    domain: String,
    path: String,
}

impl BlockCode {
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            path: path.into(),
        }
    }

    /// The literal empty-cell code.
    pub fn air() -> Self {
        Self::new(DEFAULT_DOMAIN, "air")
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_air(&self) -> bool {
        self.domain == DEFAULT_DOMAIN && self.path == "air"
    }
}

fn split_code(s: &str) -> Result<(String, String), CodeError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CodeError::Empty);
    }
    let (domain, path) = match s.split_once(':') {
        Some((d, p)) => (d, p),
        None => (DEFAULT_DOMAIN, s),
    };
    if domain.is_empty() || path.is_empty() {
        return Err(CodeError::MissingPart(s.to_string()));
    }
    Ok((domain.to_string(), path.to_string()))
}

impl FromStr for BlockCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, path) = split_code(s)?;
        Ok(Self { domain, path })
    }
}

impl TryFrom<String> for BlockCode {
    type Error = CodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BlockCode> for String {
    fn from(code: BlockCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for BlockCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}

/// A configured block code entry, optionally containing `*` wildcards.
///
/// A wildcard matches any run of characters (including none), so
/// `game:crop-*` matches `game:crop-wheat` and `game:crop-` but not
/// `game:crop`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodePattern {
    domain: String,
    path: String,
}

impl CodePattern {
    pub fn is_wildcard(&self) -> bool {
        self.domain.contains('*') || self.path.contains('*')
    }

    pub fn matches(&self, code: &BlockCode) -> bool {
        if !self.is_wildcard() {
            return self.domain == code.domain && self.path == code.path;
        }
        glob_match(&self.domain, &code.domain) && glob_match(&self.path, &code.path)
    }
}

impl FromStr for CodePattern {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, path) = split_code(s)?;
        Ok(Self { domain, path })
    }
}

impl fmt::Display for CodePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.path)
    }
}

/// `*`-only glob with single-star backtracking.
fn glob_match(pattern: &str, text: &str) -> bool {
    let (p, t) = (pattern.as_bytes(), text.as_bytes());
    let (mut pi, mut ti) = (0, 0);
    let mut resume: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            resume = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star, matched)) = resume {
            pi = star + 1;
            ti = matched + 1;
            resume = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&b| b == b'*')
}

/// Replaceability of the empty cell.
pub const AIR_REPLACEABILITY: u32 = 9999;

/// Cells at or above this replaceability do not obstruct anything.
pub const AIR_LIKE_MIN_REPLACEABILITY: u32 = 9505;

/// Replaceability band of loose plants and surface rocks.
pub const PLANT_OR_ROCK_REPLACEABILITY: RangeInclusive<u32> = 5500..=6500;

/// What occupies a cell, as seen by the pipeline.
///
/// `replaceable` is the host's obstruction metric: higher values are easier
/// to overwrite (air sits near 10000, loose plants and stones around 6000,
/// full solid blocks near 0).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub code: BlockCode,
    pub replaceable: u32,
    /// Whether the upward-facing side is a full solid face.
    pub solid_top: bool,
    /// Host display name, if it differs from the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Block {
    pub fn air() -> Self {
        Self {
            code: BlockCode::air(),
            replaceable: AIR_REPLACEABILITY,
            solid_top: false,
            name: None,
        }
    }

    /// A full cube with a solid top face.
    pub fn solid(code: BlockCode) -> Self {
        Self {
            code,
            replaceable: 100,
            solid_top: true,
            name: None,
        }
    }

    /// Loose ground cover: grass tufts, flowers, surface stones.
    pub fn ground_cover(code: BlockCode) -> Self {
        Self {
            code,
            replaceable: 6000,
            solid_top: false,
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Literal air, as opposed to the broader air-like classification.
    pub fn is_air(&self) -> bool {
        self.code.is_air()
    }

    /// Non-obstructive: counts as empty space for mass and clearance.
    pub fn is_air_like(&self) -> bool {
        self.replaceable >= AIR_LIKE_MIN_REPLACEABILITY
    }

    pub fn in_plant_or_rock_band(&self) -> bool {
        PLANT_OR_ROCK_REPLACEABILITY.contains(&self.replaceable)
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.code.to_string())
    }
}

impl Default for Block {
    fn default() -> Self {
        Self::air()
    }
}
