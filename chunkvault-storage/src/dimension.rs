use std::fmt;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// The three dimensions a Java world directory can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::End];

    pub fn id(self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => -1,
            Dimension::End => 1,
        }
    }

    /// `region/`, `DIM-1/region/` or `DIM1/region/` under the world directory.
    pub fn region_dir(self, world_dir: &Path) -> PathBuf {
        match self {
            Dimension::Overworld => world_dir.join("region"),
            Dimension::Nether => world_dir.join("DIM-1").join("region"),
            Dimension::End => world_dir.join("DIM1").join("region"),
        }
    }
}

impl TryFrom<i32> for Dimension {
    type Error = StoreError;

    fn try_from(id: i32) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Dimension::Overworld),
            -1 => Ok(Dimension::Nether),
            1 => Ok(Dimension::End),
            other => Err(StoreError::UnsupportedDimension(other)),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Overworld => "overworld",
            Dimension::Nether => "nether",
            Dimension::End => "end",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_dirs() {
        let world = Path::new("/saves/world");
        assert_eq!(Dimension::Overworld.region_dir(world), Path::new("/saves/world/region"));
        assert_eq!(Dimension::Nether.region_dir(world), Path::new("/saves/world/DIM-1/region"));
        assert_eq!(Dimension::End.region_dir(world), Path::new("/saves/world/DIM1/region"));
    }

    #[test]
    fn test_ids() {
        for dimension in Dimension::ALL {
            assert_eq!(Dimension::try_from(dimension.id()).unwrap(), dimension);
        }
        assert!(matches!(
            Dimension::try_from(2),
            Err(StoreError::UnsupportedDimension(2))
        ));
    }
}
