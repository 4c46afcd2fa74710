use glam::{IVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::constants::CONNECTIVITY_MASK;

/// One of the 6 cube face directions.
///
/// The discriminant is the face slot inside a voxel and the bit index inside
/// a connectivity mask. The order is fixed: generated primitive indices depend
/// on the accumulated face count, so it must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Down = 0,
    Up = 1,
    North = 2,
    South = 3,
    East = 4,
    West = 5,
}

/// All 6 directions in face-slot order.
pub const ALL_DIRECTIONS: [Direction; 6] = [
    Direction::Down,
    Direction::Up,
    Direction::North,
    Direction::South,
    Direction::East,
    Direction::West,
];

impl Direction {
    /// Face slot / connectivity bit index.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Grid offset of the neighbor in this direction. Y-up, North = -Z, East = +X.
    pub fn offset(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::new(0, -1, 0),
            Direction::Up => IVec3::new(0, 1, 0),
            Direction::North => IVec3::new(0, 0, -1),
            Direction::South => IVec3::new(0, 0, 1),
            Direction::East => IVec3::new(1, 0, 0),
            Direction::West => IVec3::new(-1, 0, 0),
        }
    }

    /// Outward unit normal of the face pointing this way.
    pub fn normal(self) -> Vec3 {
        self.offset().as_vec3()
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Connectivity bit for this direction.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// 6-bit neighbor-connectivity mask. Bit i set means a neighboring block
/// exists in direction `ALL_DIRECTIONS[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceMask(pub u32);

impl FaceMask {
    pub const NONE: FaceMask = FaceMask(0);
    pub const ALL: FaceMask = FaceMask(CONNECTIVITY_MASK);

    /// Build a mask from raw bits, dropping anything above bit 5.
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & CONNECTIVITY_MASK)
    }

    pub fn contains(self, dir: Direction) -> bool {
        self.0 & dir.bit() != 0
    }

    pub fn with(self, dir: Direction) -> Self {
        Self(self.0 | dir.bit())
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}
