//! Size constants shared by the geometry, arena and report code.

/// Bytes in one mebibyte.
pub const MIB: u64 = 1 << 20;

/// Bytes in one gibibyte. Volumes at or above this are reported in GiB.
pub const GIB: u64 = 1 << 30;
