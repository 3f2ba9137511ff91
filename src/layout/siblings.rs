//! Sibling circle packing with a front chain.
//!
//! Implements the sequential placement of Wang et al., "Visualization of Large
//! Hierarchical Data by Circle Packing" (CHI 2006):
//!
//! 1. Place the first circle at the origin, the second tangent to its right,
//!    the third tangent to both.
//! 2. Keep the outer boundary as a circular doubly-linked "front chain".
//! 3. Place each further circle tangent to the chain pair (a, b) whose
//!    weighted midpoint is closest to the origin. If it intersects another
//!    chain circle, drop the chain circles between and retry against the
//!    intersecting one.
//! 4. Recentre everything on the smallest enclosing circle of the chain.
//!
//! Placement order is the slice order, so callers control determinism by
//! sorting before packing.

use super::enclose::{Circle, enclose};

/// Pack `circles` in place so that none overlap.
///
/// Radii are read, centers are overwritten. On return the circles are centred
/// on their enclosing circle, whose radius is returned. Returns None if the
/// enclosing circle cannot be computed.
pub fn pack_siblings(circles: &mut [Circle]) -> Option<f64> {
    let n = circles.len();
    if n == 0 {
        return Some(0.0);
    }

    circles[0].x = 0.0;
    circles[0].y = 0.0;
    if n == 1 {
        return Some(circles[0].r);
    }

    circles[0].x = -circles[1].r;
    circles[1].x = circles[0].r;
    circles[1].y = 0.0;
    if n == 2 {
        return Some(circles[0].r + circles[1].r);
    }

    let (x, y) = place(&circles[1], &circles[0], &circles[2]);
    circles[2].x = x;
    circles[2].y = y;

    // Front chain over circle indices: a → b → c → a
    let mut next = vec![0_usize; n];
    let mut prev = vec![0_usize; n];
    next[0] = 1;
    prev[1] = 0;
    next[1] = 2;
    prev[2] = 1;
    next[2] = 0;
    prev[0] = 2;

    let mut a = 0_usize;
    let mut b = 1_usize;
    let mut i = 3;

    'pack: while i < n {
        let (x, y) = place(&circles[a], &circles[b], &circles[i]);
        circles[i].x = x;
        circles[i].y = y;
        let c = i;

        // Find the closest intersecting circle on the front chain, if any,
        // measured by distance along the chain.
        let mut j = next[b];
        let mut k = prev[a];
        let mut sj = circles[b].r;
        let mut sk = circles[a].r;
        loop {
            if sj <= sk {
                if intersects(&circles[j], &circles[c]) {
                    b = j;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sj += circles[j].r;
                j = next[j];
            } else {
                if intersects(&circles[k], &circles[c]) {
                    a = k;
                    next[a] = b;
                    prev[b] = a;
                    continue 'pack;
                }
                sk += circles[k].r;
                k = prev[k];
            }
            if j == next[k] {
                break;
            }
        }

        // Insert c between a and b.
        prev[c] = a;
        next[c] = b;
        next[a] = c;
        prev[b] = c;
        b = c;

        // New closest pair to the centroid.
        let mut best = score(a, &next, circles);
        let mut cur = next[c];
        while cur != b {
            let s = score(cur, &next, circles);
            if s < best {
                a = cur;
                best = s;
            }
            cur = next[cur];
        }
        b = next[a];
        i += 1;
    }

    // Enclose the front chain and recentre on it.
    let mut chain = vec![circles[b]];
    let mut cur = next[b];
    while cur != b {
        chain.push(circles[cur]);
        cur = next[cur];
    }
    let e = enclose(&chain)?;

    for circle in circles.iter_mut() {
        circle.x -= e.x;
        circle.y -= e.y;
    }

    Some(e.r)
}

/// Center for `c` tangent to both `b` and `a`.
fn place(b: &Circle, a: &Circle, c: &Circle) -> (f64, f64) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let d2 = dx * dx + dy * dy;
    if d2 == 0.0 {
        return (a.x + c.r, a.y);
    }

    let a2 = (a.r + c.r).powi(2);
    let b2 = (b.r + c.r).powi(2);
    if a2 > b2 {
        let x = (d2 + b2 - a2) / (2.0 * d2);
        let y = (b2 / d2 - x * x).max(0.0).sqrt();
        (b.x - x * dx - y * dy, b.y - x * dy + y * dx)
    } else {
        let x = (d2 + a2 - b2) / (2.0 * d2);
        let y = (a2 / d2 - x * x).max(0.0).sqrt();
        (a.x + x * dx - y * dy, a.y + x * dy + y * dx)
    }
}

fn intersects(a: &Circle, b: &Circle) -> bool {
    let dr = a.r + b.r - 1e-6;
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    dr > 0.0 && dr * dr > dx * dx + dy * dy
}

/// Squared distance from the origin to the weighted midpoint of a chain pair.
fn score(node: usize, next: &[usize], circles: &[Circle]) -> f64 {
    let a = &circles[node];
    let b = &circles[next[node]];
    let ab = a.r + b.r;
    let dx = (a.x * b.r + b.x * a.r) / ab;
    let dy = (a.y * b.r + b.y * a.r) / ab;
    dx * dx + dy * dy
}
