use glam::IVec2;

/// Integer line walk from `from` to `to`, both ends included.
///
/// Every rasterising and ray-marching routine steps through this so they
/// all agree on which pixels a segment covers.
#[derive(Clone, Debug)]
pub struct Bresenham {
    cur: IVec2,
    end: IVec2,
    dx: i64,
    dy: i64,
    sx: i32,
    sy: i32,
    err: i64,
    done: bool,
}

impl Bresenham {
    pub fn new(from: IVec2, to: IVec2) -> Self {
        let dx = (to.x as i64 - from.x as i64).abs();
        let dy = -(to.y as i64 - from.y as i64).abs();
        Self {
            cur: from,
            end: to,
            dx,
            dy,
            sx: if from.x < to.x { 1 } else { -1 },
            sy: if from.y < to.y { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

/// Major-axis step count between two points, saturating at `i32::MAX`.
#[inline]
pub fn steps(from: IVec2, to: IVec2) -> i32 {
    let dx = (to.x as i64 - from.x as i64).abs();
    let dy = (to.y as i64 - from.y as i64).abs();
    dx.max(dy).min(i32::MAX as i64) as i32
}

impl Iterator for Bresenham {
    type Item = IVec2;

    fn next(&mut self) -> Option<IVec2> {
        if self.done {
            return None;
        }
        let out = self.cur;
        if self.cur == self.end {
            self.done = true;
            return Some(out);
        }
        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.cur.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.cur.y += self.sy;
        }
        Some(out)
    }
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    fn walk(a: (i32, i32), b: (i32, i32)) -> Vec<(i32, i32)> {
        Bresenham::new(IVec2::from(a), IVec2::from(b))
            .map(|p| (p.x, p.y))
            .collect()
    }

    #[test]
    fn single_pixel() {
        assert_eq!(walk((3, 4), (3, 4)), vec![(3, 4)]);
    }

    #[test]
    fn shallow_and_steep() {
        assert_eq!(walk((0, 0), (4, 2)), vec![(0, 0), (1, 1), (2, 1), (3, 2), (4, 2)]);
        assert_eq!(walk((0, 0), (1, 3)), vec![(0, 0), (0, 1), (1, 2), (1, 3)]);
    }

    #[test]
    fn extreme_endpoints_do_not_overflow() {
        let (a, b) = (IVec2::new(i32::MIN, 0), IVec2::new(i32::MAX, 1));
        assert_eq!(steps(a, b), i32::MAX);
        let head: Vec<IVec2> = Bresenham::new(a, b).take(3).collect();
        assert_eq!(head, vec![a, a + IVec2::X, a + IVec2::new(2, 0)]);
    }

    #[test]
    fn one_pixel_per_major_step() {
        for &(a, b) in &[((0, 0), (7, -3)), ((5, 5), (-2, 9)), ((0, 0), (0, -6))] {
            let pts = walk(a, b);
            let n = steps(IVec2::from(a), IVec2::from(b)) as usize + 1;
            assert_eq!(pts.len(), n);
            assert_eq!(*pts.first().unwrap(), a);
            assert_eq!(*pts.last().unwrap(), b);
            for w in pts.windows(2) {
                assert!((w[1].0 - w[0].0).abs() <= 1 && (w[1].1 - w[0].1).abs() <= 1);
            }
        }
    }
}
