/// 16 point Bresenham circle of radius 3. Order is clockwise starting at top,
/// so indices wrap: 15 is adjacent to 0.
pub const CIRCLE3: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Circle radius; pixels closer than this to the border are never scored.
pub const RADIUS: usize = 3;

/// Contiguous arc length required by FAST-9.
pub const ARC_LENGTH: usize = 9;
