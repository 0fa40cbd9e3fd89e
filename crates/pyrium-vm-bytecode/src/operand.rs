//! Bytecode operands

use serde::Serialize;

/// Index into the constant pool (signed on the wire, negative means "none")
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[repr(transparent)]
pub struct ConstantIndex(pub i32);

impl ConstantIndex {
    /// Index used for operands an opcode does not read
    pub const NONE: Self = Self(0);

    /// Create a new constant index
    #[inline]
    pub const fn new(index: i32) -> Self {
        Self(index)
    }

    /// Get index value
    #[inline]
    pub const fn index(self) -> i32 {
        self.0
    }
}

impl From<i32> for ConstantIndex {
    fn from(index: i32) -> Self {
        Self(index)
    }
}

const LANE_MASK: i64 = 0xFFFF;

fn lane(packed: i64, n: u32) -> i32 {
    ((packed >> (16 * n)) & LANE_MASK) as i32
}

/// Block coordinate unpacked from the integer operand.
///
/// Version 1 packs x, y and z as unsigned 16-bit lanes (bits 0-15, 16-31,
/// 32-47), so negative coordinates cannot be expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct BlockPos {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
    /// Z coordinate
    pub z: i32,
}

impl BlockPos {
    /// Create a new block position
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Decode from the packed integer operand
    pub fn unpack(packed: i64) -> Self {
        Self {
            x: lane(packed, 0),
            y: lane(packed, 1),
            z: lane(packed, 2),
        }
    }

    /// Encode into the packed integer operand (each axis truncated to 16 bits)
    pub fn pack(self) -> i64 {
        (i64::from(self.x) & LANE_MASK)
            | ((i64::from(self.y) & LANE_MASK) << 16)
            | ((i64::from(self.z) & LANE_MASK) << 32)
    }
}

/// Axis-aligned region unpacked from the integer operand.
///
/// Only four lanes fit in 64 bits: x1, y1, z1 and x2. The far corner reuses
/// y1 and z1, so regions are one block thick on those axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    /// First corner
    pub min: BlockPos,
    /// Second corner
    pub max: BlockPos,
}

impl Region {
    /// Decode from the packed integer operand
    pub fn unpack(packed: i64) -> Self {
        let min = BlockPos::unpack(packed);
        Self {
            min,
            max: BlockPos::new(lane(packed, 3), min.y, min.z),
        }
    }

    /// Encode x1, y1, z1 and x2 into the packed integer operand
    pub fn pack(self) -> i64 {
        self.min.pack() | ((i64::from(self.max.x) & LANE_MASK) << 48)
    }

    /// Whether a point lies inside the region (bounds inclusive, corners in any order)
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        let within = |v: f64, a: i32, b: i32| {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            v >= f64::from(lo) && v <= f64::from(hi)
        };
        within(x, self.min.x, self.max.x)
            && within(y, self.min.y, self.max.y)
            && within(z, self.min.z, self.max.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pos_lanes() {
        let packed = 10 | (64 << 16) | (300 << 32);
        assert_eq!(BlockPos::unpack(packed), BlockPos::new(10, 64, 300));
    }

    #[test]
    fn test_negative_coordinates_wrap() {
        // The 16-bit lanes are unsigned; -1 comes back as 65535.
        let packed = BlockPos::new(-1, 0, 0).pack();
        assert_eq!(BlockPos::unpack(packed).x, 65535);
    }

    #[test]
    fn test_region_far_corner() {
        let packed = 1 | (2 << 16) | (3 << 32) | (9 << 48);
        let region = Region::unpack(packed);

        assert_eq!(region.min, BlockPos::new(1, 2, 3));
        assert_eq!(region.max, BlockPos::new(9, 2, 3));
        assert_eq!(region.pack(), packed);
        assert!(region.contains(5.0, 2.0, 3.0));
        assert!(!region.contains(5.0, 2.5, 3.0));
    }
}
