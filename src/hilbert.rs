//! Hilbert curve keys on a 16-bit-per-axis grid.

/// Largest grid coordinate on either axis.
pub(crate) const HILBERT_MAX: u32 = u16::MAX as u32;

/// Maps a leaf center into the grid spanned by the total bounds and returns
/// its Hilbert key.
///
/// `width` and `height` are the total bounds extents; a zero extent is
/// treated as 1 so degenerate datasets still produce finite keys.
pub(crate) fn hilbert_key(
    center_x: f64,
    center_y: f64,
    min_x: f64,
    min_y: f64,
    width: f64,
    height: f64,
) -> u32 {
    let width = if width > 0.0 { width } else { 1.0 };
    let height = if height > 0.0 { height } else { 1.0 };
    let scale = f64::from(HILBERT_MAX);
    let hx = to_grid(scale * (center_x - min_x) / width);
    let hy = to_grid(scale * (center_y - min_y) / height);
    hilbert_xy_to_index(hx, hy)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "value is clamped into the u16 grid first"
)]
fn to_grid(v: f64) -> u32 {
    v.floor().clamp(0.0, f64::from(HILBERT_MAX)) as u32
}

/// Hilbert curve index computation
/// From <https://github.com/rawrunprotected/hilbert_curves> (public domain)
fn interleave(mut x: u32) -> u32 {
    x = (x | (x << 8)) & 0x00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333;
    x = (x | (x << 1)) & 0x5555_5555;
    x
}

#[expect(non_snake_case, reason = "mirrors the published prefix-scan formulation")]
pub(crate) fn hilbert_xy_to_index(x: u32, y: u32) -> u32 {
    // Initial prefix scan round, prime with x and y
    let mut a = x ^ y;
    let mut b = 0xFFFF ^ a;
    let mut c = 0xFFFF ^ (x | y);
    let mut d = x & (y ^ 0xFFFF);
    let mut A = a | (b >> 1);
    let mut B = (a >> 1) ^ a;
    let mut C = ((c >> 1) ^ (b & (d >> 1))) ^ c;
    let mut D = ((a & (c >> 1)) ^ (d >> 1)) ^ d;

    a = A;
    b = B;
    c = C;
    d = D;
    A = (a & (a >> 2)) ^ (b & (b >> 2));
    B = (a & (b >> 2)) ^ (b & ((a ^ b) >> 2));
    C ^= (a & (c >> 2)) ^ (b & (d >> 2));
    D ^= (b & (c >> 2)) ^ ((a ^ b) & (d >> 2));

    a = A;
    b = B;
    c = C;
    d = D;
    A = (a & (a >> 4)) ^ (b & (b >> 4));
    B = (a & (b >> 4)) ^ (b & ((a ^ b) >> 4));
    C ^= (a & (c >> 4)) ^ (b & (d >> 4));
    D ^= (b & (c >> 4)) ^ ((a ^ b) & (d >> 4));

    // Final round and projection
    a = A;
    b = B;
    c = C;
    d = D;
    C ^= (a & (c >> 8)) ^ (b & (d >> 8));
    D ^= (b & (c >> 8)) ^ ((a ^ b) & (d >> 8));

    // Undo transformation prefix scan
    a = C ^ (C >> 1);
    b = D ^ (D >> 1);

    // Recover index bits
    let i0 = x ^ y;
    let i1 = b | (0xFFFF ^ (i0 | a));

    (interleave(i1) << 1) | interleave(i0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_zero() {
        assert_eq!(hilbert_xy_to_index(0, 0), 0);
    }

    #[test]
    fn keys_are_unique_on_a_small_grid() {
        // Low-order cells of the 16-bit curve: every key must be distinct.
        let mut keys: Vec<u32> = (0..64)
            .flat_map(|x| (0..64).map(move |y| hilbert_xy_to_index(x, y)))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 64 * 64, "Hilbert keys must not collide");
    }

    #[test]
    fn neighbouring_cells_along_curve_are_adjacent() {
        // Walking the curve in key order over a 16x16 corner, consecutive keys
        // belong to cells one step apart.
        let mut cells: Vec<(u32, u32, u32)> = (0..16)
            .flat_map(|x| (0..16).map(move |y| (hilbert_xy_to_index(x, y), x, y)))
            .collect();
        cells.sort_unstable();
        for pair in cells.windows(2) {
            let (k0, x0, y0) = pair[0];
            let (k1, x1, y1) = pair[1];
            if k1 == k0 + 1 {
                assert_eq!(x0.abs_diff(x1) + y0.abs_diff(y1), 1, "curve must be continuous");
            }
        }
    }

    #[test]
    fn key_clamps_outside_and_degenerate_extents() {
        let inside = hilbert_key(5.0, 5.0, 0.0, 0.0, 10.0, 10.0);
        assert_eq!(hilbert_key(5.0, 5.0, 5.0, 5.0, 0.0, 0.0), 0, "zero extent maps to origin");
        assert_eq!(
            hilbert_key(-50.0, -50.0, 0.0, 0.0, 10.0, 10.0),
            0,
            "below-range centers clamp to the grid origin"
        );
        assert_ne!(inside, 0);
    }
}
