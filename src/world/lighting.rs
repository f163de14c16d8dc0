//! Light descriptor read by the lighting pass.

use glam::{Mat4, Vec3};
use log::warn;

use crate::error::RenderError;

/// Kind of a light source, numbered as in the flat binding buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Ambient = 1,
    Point = 2,
}

impl LightKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Ambient),
            2 => Some(Self::Point),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Color, `[0,1]` per channel.
    pub color: Vec3,
    pub kind: LightKind,
    pub pos: Vec3,
    /// Specular exponent.
    pub sharpness: u32,
}

impl Light {
    pub fn ambient(color: Vec3) -> Self {
        Self {
            color,
            kind: LightKind::Ambient,
            pos: Vec3::ZERO,
            sharpness: 0,
        }
    }

    pub fn point(color: Vec3, pos: Vec3, sharpness: u32) -> Self {
        Self {
            color,
            kind: LightKind::Point,
            pos,
            sharpness,
        }
    }
}

/// Every light of the frame plus the camera it is viewed through.
#[derive(Clone, Debug, PartialEq)]
pub struct LightingSetup {
    pub lights: Vec<Light>,
    /// Direction towards the viewer, used for the half-vector.
    pub view: Vec3,
    /// Maps light positions into screen space.
    pub view_transform: Mat4,
}

impl LightingSetup {
    pub fn new(lights: Vec<Light>, view: Vec3, view_transform: Mat4) -> Self {
        Self {
            lights,
            view,
            view_transform,
        }
    }

    /// Decode the binding layer's flat buffers.
    ///
    /// `colors` and `positions` hold four values per light (`r,g,b,a` as
    /// `0..=255` and `x,y,z,w`); `types` and `sharpness` hold one. Lights of
    /// an unknown type are skipped with a warning.
    pub fn from_buffers(
        colors: &[i32],
        types: &[i32],
        positions: &[i32],
        view_matrix: &[f32; 16],
        count: usize,
        sharpness: &[i32],
        view: Vec3,
    ) -> Result<Self, RenderError> {
        check_len("light color", colors, 4 * count)?;
        check_len("light type", types, count)?;
        check_len("light position", positions, 4 * count)?;
        check_len("sharpness", sharpness, count)?;

        let mut lights = Vec::with_capacity(count);
        for j in 0..count {
            let Some(kind) = LightKind::from_code(types[j]) else {
                warn!("light {j} has unknown type {}; skipped", types[j]);
                continue;
            };
            let c = &colors[4 * j..4 * j + 3];
            let p = &positions[4 * j..4 * j + 3];
            lights.push(Light {
                color: Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32) / 255.0,
                kind,
                pos: Vec3::new(p[0] as f32, p[1] as f32, p[2] as f32),
                sharpness: sharpness[j].max(0) as u32,
            });
        }
        Ok(Self::new(
            lights,
            view,
            crate::engine::projection::row_major(view_matrix),
        ))
    }
}

fn check_len<T>(what: &'static str, buf: &[T], need: usize) -> Result<(), RenderError> {
    if buf.len() < need {
        return Err(RenderError::ShortBuffer {
            what,
            len: buf.len(),
            need,
        });
    }
    Ok(())
}

/*──────────────────────────────── Tests ───────────────────────────────*/
