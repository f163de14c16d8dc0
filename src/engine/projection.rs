//! Geometry preprocessor: model → world → screen.
//!
//! ```text
//! local ─┐
//!        ├─ compose ─ transform_module ─ make_view_canonical ─▶ rasteriser
//! global ┘                               (view, homogenize, clip)
//! ```

use glam::{Mat4, Vec3, Vec4};

use crate::error::RenderError;

/// Current transform: `local` applied first, then `global`.
#[inline]
pub fn compose(local: &Mat4, global: &Mat4) -> Mat4 {
    *global * *local
}

/// Matrix from a row-major buffer (the binding layer's layout).
#[inline]
pub fn row_major(m: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(m).transpose()
}

/// Move a module's points and normals into world space.
pub fn transform_module(
    points: &mut [Vec4],
    normals: &mut [Vec3],
    local: &Mat4,
    global: &Mat4,
) -> Result<(), RenderError> {
    if points.len() != normals.len() {
        return Err(RenderError::GeometryMismatch {
            points: points.len(),
            normals: normals.len(),
        });
    }
    let ctm = compose(local, global);
    for p in points.iter_mut() {
        *p = ctm * *p;
    }
    for n in normals.iter_mut() {
        *n = ctm.transform_vector3(*n);
    }
    Ok(())
}

/// Perspective divide of x/y; z is flipped so larger means farther.
pub fn homogenize(points: &mut [Vec4]) {
    for p in points {
        if p.w != 0.0 {
            p.x /= p.w;
            p.y /= p.w;
        }
        p.z = -p.z;
    }
}

/// Clamp x/y onto the `width × height` pixel grid.
pub fn clip_to_viewport(points: &mut [Vec4], width: usize, height: usize) {
    let max_x = width.saturating_sub(1) as f32;
    let max_y = height.saturating_sub(1) as f32;
    for p in points {
        p.x = p.x.clamp(0.0, max_x);
        p.y = p.y.clamp(0.0, max_y);
    }
}

/// View transform, perspective divide and viewport clamp in one go.
pub fn make_view_canonical(points: &mut [Vec4], view: &Mat4, width: usize, height: usize) {
    for p in points.iter_mut() {
        *p = *view * *p;
    }
    homogenize(points);
    clip_to_viewport(points, width, height);
}

/*──────────────────────────────── Tests ───────────────────────────────*/
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_applies_local_first() {
        let local = Mat4::from_scale(Vec3::splat(2.0));
        let global = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let p = compose(&local, &global) * Vec4::new(1.0, 1.0, 1.0, 1.0);
        assert_eq!(p, Vec4::new(12.0, 2.0, 2.0, 1.0));
    }

    #[test]
    fn row_major_reads_translation_from_last_column() {
        let m = row_major(&[
            1.0, 0.0, 0.0, 5.0, //
            0.0, 1.0, 0.0, 6.0, //
            0.0, 0.0, 1.0, 7.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        assert_eq!(m.transform_point3(Vec3::ZERO), Vec3::new(5.0, 6.0, 7.0));
    }

    #[test]
    fn transform_module_checks_lengths() {
        let mut pts = vec![Vec4::W; 2];
        let mut nrm = vec![Vec3::Z; 1];
        assert_eq!(
            transform_module(&mut pts, &mut nrm, &Mat4::IDENTITY, &Mat4::IDENTITY),
            Err(RenderError::GeometryMismatch {
                points: 2,
                normals: 1
            })
        );
    }

    #[test]
    fn normals_ignore_translation() {
        let mut pts = vec![Vec4::W];
        let mut nrm = vec![Vec3::Z];
        let t = Mat4::from_translation(Vec3::new(3.0, 4.0, 5.0));
        transform_module(&mut pts, &mut nrm, &Mat4::IDENTITY, &t).unwrap();
        assert_eq!(pts[0], Vec4::new(3.0, 4.0, 5.0, 1.0));
        assert_eq!(nrm[0], Vec3::Z);
    }

    #[test]
    fn homogenize_divides_and_flips() {
        let mut pts = [Vec4::new(4.0, 6.0, 3.0, 2.0), Vec4::new(4.0, 6.0, 3.0, 0.0)];
        homogenize(&mut pts);
        assert_eq!(pts[0], Vec4::new(2.0, 3.0, -3.0, 2.0));
        assert_eq!(pts[1], Vec4::new(4.0, 6.0, -3.0, 0.0));
    }

    #[test]
    fn canonical_view_clamps_to_frame() {
        let mut pts = [Vec4::new(-5.0, 500.0, -2.0, 1.0)];
        make_view_canonical(&mut pts, &Mat4::IDENTITY, 64, 48);
        assert_eq!(pts[0], Vec4::new(0.0, 47.0, 2.0, 1.0));
    }
}
