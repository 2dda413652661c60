//! Failure kinds and the user-facing notices they map to.

use packspace_kernel::Notice;
use std::fmt;

/// Which direction of the pipeline ran short of resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Pack,
    Unpack,
}

/// Why an invocation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    PermissionDenied,
    BannedContent { name: String },
    InsufficientResources(Direction),
    EmptyRegion,
    GroundRequirementUnmet,
    RegionNotClear,
    SnapshotDecodeFailure,
}

impl FailureKind {
    /// Localisation key, compatible with existing translation files.
    pub fn key(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "tentbag:permission-error",
            Self::BannedContent { .. } => "tentbag:illegal-item-error",
            Self::InsufficientResources(Direction::Pack) => "tentbag:pack-hunger-error",
            Self::InsufficientResources(Direction::Unpack) => "tentbag:unpack-hunger-error",
            Self::EmptyRegion => "tentbag:empty-build-error",
            Self::GroundRequirementUnmet => "tentbag:solid-ground-error",
            Self::RegionNotClear => "tentbag:clear-area-error",
            Self::SnapshotDecodeFailure => "tentbag:unpack-error",
        }
    }

    pub fn notice(&self) -> Notice {
        let args = match self {
            Self::BannedContent { name } => vec![name.clone()],
            _ => Vec::new(),
        };
        Notice {
            key: self.key(),
            args,
            text: self.to_string(),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => f.write_str("You do not have permission to build here."),
            Self::BannedContent { name } => write!(f, "Cannot pack {name}."),
            Self::InsufficientResources(Direction::Pack) => {
                f.write_str("You are too hungry to pack this.")
            }
            Self::InsufficientResources(Direction::Unpack) => {
                f.write_str("You are too hungry to unpack this.")
            }
            Self::EmptyRegion => f.write_str("There is nothing here to pack."),
            Self::GroundRequirementUnmet => f.write_str("Needs solid ground to unpack."),
            Self::RegionNotClear => f.write_str("Not enough room to unpack here."),
            Self::SnapshotDecodeFailure => f.write_str("The packed contents could not be read."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banned_notice_carries_name() {
        let notice = FailureKind::BannedContent {
            name: "Forge".into(),
        }
        .notice();
        assert_eq!(notice.key, "tentbag:illegal-item-error");
        assert_eq!(notice.args, vec!["Forge".to_string()]);
        assert_eq!(notice.text, "Cannot pack Forge.");
    }

    #[test]
    fn hunger_keys_differ_by_direction() {
        assert_ne!(
            FailureKind::InsufficientResources(Direction::Pack).key(),
            FailureKind::InsufficientResources(Direction::Unpack).key()
        );
    }
}
