/// Utility functions for the FAST segment test

/// True when `mask` holds a run of at least `min_count` set bits on the
/// 16-sample Bresenham circle, wrap-around included.
pub fn has_arc(mask: u16, min_count: u32) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    let mut run = mask;
    for i in 1..min_count {
        run &= mask.rotate_left(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}
