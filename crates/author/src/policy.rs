use packspace_common::{Block, CodePattern, ConfigError, PackConfig};

/// Block classification rules compiled from a [`PackConfig`].
#[derive(Debug, Clone)]
pub struct BlockPolicy {
    replace_plants_and_rocks: bool,
    allow_list_mode: bool,
    banned: Vec<CodePattern>,
    allowed: Vec<CodePattern>,
}

impl BlockPolicy {
    pub fn from_config(config: &PackConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            replace_plants_and_rocks: config.replace_plants_and_rocks,
            allow_list_mode: config.allow_list_mode,
            banned: config.banned_patterns()?,
            allowed: config.allowed_patterns()?,
        })
    }

    pub fn is_air_like(&self, block: &Block) -> bool {
        block.is_air_like()
    }

    /// Loose plants and surface rocks, when the config lets them be overwritten.
    pub fn is_plant_or_rock_like(&self, block: &Block) -> bool {
        self.replace_plants_and_rocks && block.in_plant_or_rock_band()
    }

    /// Safe to overwrite during unpack.
    pub fn is_replaceable(&self, block: &Block) -> bool {
        self.is_air_like(block) || self.is_plant_or_rock_like(block)
    }

    /// Whether `block` may not be packed.
    ///
    /// In allow-list mode everything outside `allowed_blocks` is banned,
    /// except literal air and plant/rock cells.
    pub fn is_banned(&self, block: &Block) -> bool {
        if self.allow_list_mode {
            if block.is_air() || self.is_plant_or_rock_like(block) {
                return false;
            }
            return !self.allowed.iter().any(|p| p.matches(&block.code));
        }
        self.banned.iter().any(|p| p.matches(&block.code))
    }
}
