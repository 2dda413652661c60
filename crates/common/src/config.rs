use crate::block::{CodeError, CodePattern};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Errors from loading or validating a [`PackConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("invalid colour {0:?}, expected #RRGGBB or #AARRGGBB")]
    Color(String),
    #[error("invalid block pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: CodeError,
    },
}

/// Pack/unpack configuration.
///
/// Read-only to the pipeline. Field names are camelCase on disk so existing
/// mod config files load unchanged; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackConfig {
    /// Cells out from the target on X and Z.
    pub max_radius: i32,
    /// Cells above the target; clamped to at least 3 when building regions.
    pub max_height: i32,
    /// Resource cost per solid block.
    pub build_effort: f32,
    /// Archived snapshots kept per actor before the oldest is deleted.
    #[serde(alias = "maxSchematicHistory")]
    pub max_history: usize,
    /// Every floor cell must present a solid top face when unpacking.
    pub require_solid_ground: bool,
    /// Shift the pack region down one cell to take the floor along.
    pub grab_floor: bool,
    /// Copy the region instead of clearing it after packing.
    pub copy_mode: bool,
    /// Treat plants and loose rocks as replaceable.
    pub replace_plants_and_rocks: bool,
    /// Use `allowed_blocks` as an allow list instead of `banned_blocks`.
    pub allow_list_mode: bool,
    /// Send a chat summary after each pack/unpack.
    pub show_chat_notification: bool,
    /// Drop a location marker where a snapshot is unpacked.
    #[serde(alias = "dropWaypoint")]
    pub drop_marker_on_unpack: bool,
    #[serde(alias = "pinWaypoint")]
    pub pin_marker: bool,
    #[serde(alias = "waypointIcon")]
    pub marker_icon: String,
    #[serde(alias = "waypointColor")]
    pub marker_color: String,
    /// Colour used to highlight offending cells.
    #[serde(alias = "highlightErrorColor")]
    pub highlight_color: String,
    pub banned_blocks: Vec<String>,
    pub allowed_blocks: Vec<String>,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            max_radius: 3,
            max_height: 7,
            build_effort: 2.0,
            max_history: 10,
            require_solid_ground: false,
            grab_floor: false,
            copy_mode: false,
            replace_plants_and_rocks: true,
            allow_list_mode: false,
            show_chat_notification: true,
            drop_marker_on_unpack: true,
            pin_marker: true,
            marker_icon: "home".into(),
            marker_color: "dodgerblue".into(),
            highlight_color: "#2FFF0000".into(),
            banned_blocks: [
                "game:paperlantern-*",
                "game:chandelier-*",
                "game:log-grown-*",
                "game:log-resin-*",
                "game:log-resinharvested-*",
                "game:statictranslocator-*",
                "game:teleporterbase",
                "game:crop-*",
                "game:herb-*",
                "game:mushroom-*",
                "game:smallberrybush-*",
                "game:bigberrybush-*",
                "game:water-*",
                "game:lava-*",
                "game:farmland-*",
                "game:rawclay-*",
                "game:peat-*",
                "game:rock-*",
                "game:ore-*",
                "game:crock-burned-*",
                "game:bowl-meal",
                "game:claypot-cooked",
                "game:anvil-*",
                "game:forge",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            allowed_blocks: vec!["game:soil-*".into()],
        }
    }
}

impl PackConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_radius < 0 {
            return Err(ConfigError::Invalid {
                field: "maxRadius",
                reason: format!("{} is negative", self.max_radius),
            });
        }
        if self.max_height < 0 {
            return Err(ConfigError::Invalid {
                field: "maxHeight",
                reason: format!("{} is negative", self.max_height),
            });
        }
        if !self.build_effort.is_finite() || self.build_effort < 0.0 {
            return Err(ConfigError::Invalid {
                field: "buildEffort",
                reason: format!("{} is not a finite non-negative number", self.build_effort),
            });
        }
        if self.max_history == 0 {
            return Err(ConfigError::Invalid {
                field: "maxHistory",
                reason: "must keep at least one snapshot".into(),
            });
        }
        self.highlight_argb()?;
        self.banned_patterns()?;
        self.allowed_patterns()?;
        Ok(())
    }

    /// Height above the target used for regions, never below 3.
    pub fn effective_height(&self) -> i32 {
        self.max_height.max(3)
    }

    /// Highlight colour as packed `0xAARRGGBB`.
    pub fn highlight_argb(&self) -> Result<u32, ConfigError> {
        parse_argb(&self.highlight_color)
    }

    pub fn banned_patterns(&self) -> Result<Vec<CodePattern>, ConfigError> {
        parse_patterns(&self.banned_blocks)
    }

    pub fn allowed_patterns(&self) -> Result<Vec<CodePattern>, ConfigError> {
        parse_patterns(&self.allowed_blocks)
    }
}

fn parse_patterns(entries: &[String]) -> Result<Vec<CodePattern>, ConfigError> {
    entries
        .iter()
        .map(|entry| {
            entry.parse().map_err(|source| ConfigError::Pattern {
                pattern: entry.clone(),
                source,
            })
        })
        .collect()
}

/// Parse `#RRGGBB` (opaque) or `#AARRGGBB`.
pub fn parse_argb(text: &str) -> Result<u32, ConfigError> {
    let hex = text
        .strip_prefix('#')
        .ok_or_else(|| ConfigError::Color(text.to_string()))?;
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConfigError::Color(text.to_string()));
    }
    let value =
        u32::from_str_radix(hex, 16).map_err(|_| ConfigError::Color(text.to_string()))?;
    match hex.len() {
        6 => Ok(0xFF00_0000 | value),
        8 => Ok(value),
        _ => Err(ConfigError::Color(text.to_string())),
    }
}
