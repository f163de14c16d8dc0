//! view_sw - renders a small test scene through the full pipeline and shows
//! it in a window.
//!
//! USAGE:
//! ```bash
//! RUST_LOG=debug cargo run --release --bin view_sw -- \
//!     --width 800 --height 600 --passes lighting,shadows,transparency
//! ```
//!
//! ←/→ orbit the camera, Esc quits.

use anyhow::{Context, ensure};
use clap::{Parser, ValueEnum};
use glam::{Mat4, Vec3, Vec4};
use log::info;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::Instant;

use lilac_rs::{
    FrameBuffer, Passes, Renderer, RendererExt, Rgb, Software,
    engine::{homogenize, make_view_canonical, row_major, transform_module},
    world::{Light, LightingSetup, Polygon, Vertex},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Pass {
    Lighting,
    Shadows,
    Reflections,
    Transparency,
}

impl From<Pass> for Passes {
    fn from(p: Pass) -> Self {
        match p {
            Pass::Lighting => Passes::LIGHTING,
            Pass::Shadows => Passes::SHADOWS,
            Pass::Reflections => Passes::REFLECTIONS,
            Pass::Transparency => Passes::TRANSPARENCY,
        }
    }
}

/// CLI options handled via `clap` derive.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Opts {
    #[arg(long, default_value_t = 640)]
    width: usize,

    #[arg(long, default_value_t = 480)]
    height: usize,

    /// Post passes to run, in pipeline order regardless of listing order
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "lighting,shadows,reflections,transparency"
    )]
    passes: Vec<Pass>,

    /// Outline polygons instead of filling them
    #[arg(long)]
    wireframe: bool,

    /// Screen-space light `x,y,z` for shadows and reflections
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    light: Option<Vec<f32>>,

    #[arg(long, default_value_t = 0.0)]
    fog: f32,

    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
}

/// One flat-colored face of the scene with its surface settings.
struct Face {
    corners: Vec<Vec3>,
    normal: Vec3,
    color: Vec3,
    alpha: f32,
    beta: f32,
}

fn scene() -> Vec<Face> {
    let floor = Face {
        corners: vec![
            Vec3::new(-4.0, 0.0, -4.0),
            Vec3::new(4.0, 0.0, -4.0),
            Vec3::new(4.0, 0.0, 4.0),
            Vec3::new(-4.0, 0.0, 4.0),
        ],
        normal: Vec3::Y,
        color: Vec3::new(0.55, 0.55, 0.6),
        alpha: 0.0,
        beta: 0.6,
    };
    let panel = Face {
        corners: vec![
            Vec3::new(-1.5, 0.3, 0.5),
            Vec3::new(1.5, 0.3, 0.5),
            Vec3::new(1.5, 2.5, 0.5),
            Vec3::new(-1.5, 2.5, 0.5),
        ],
        normal: Vec3::Z,
        color: Vec3::new(0.2, 0.4, 0.9),
        alpha: 0.5,
        beta: 1.0,
    };
    let tri = |x: f32, z: f32, color: Vec3| Face {
        corners: vec![
            Vec3::new(x - 0.8, 0.0, z),
            Vec3::new(x + 0.8, 0.0, z),
            Vec3::new(x, 1.8, z),
        ],
        normal: Vec3::Z,
        color,
        alpha: 0.0,
        beta: 1.0,
    };
    vec![
        floor,
        tri(-1.8, -1.5, Vec3::new(0.9, 0.25, 0.2)),
        tri(1.6, -2.2, Vec3::new(0.3, 0.85, 0.3)),
        panel,
    ]
}

/// Pinhole projection onto a `w × h` grid; keeps view z so the
/// homogenize step turns it into a positive distance.
fn projection(w: usize, h: usize) -> Mat4 {
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let f = cx / (35_f32.to_radians()).tan();
    row_major(&[
        f, 0.0, -cx, 0.0, //
        0.0, -f, -cy, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, -1.0, 0.0,
    ])
}

/// Camera-space normal with the screen's flipped y and z.
fn screen_normal(camera: &Mat4, n: Vec3) -> Vec3 {
    let v = camera.transform_vector3(n);
    Vec3::new(v.x, -v.y, -v.z)
}

fn render(
    sw: &mut Software,
    fb: &mut FrameBuffer,
    opts: &Opts,
    passes: Passes,
    yaw: f32,
) -> anyhow::Result<()> {
    let (w, h) = (fb.width(), fb.height());
    let eye = Vec3::new(9.0 * yaw.sin(), 4.0, 9.0 * yaw.cos());
    let camera = Mat4::look_at_rh(eye, Vec3::new(0.0, 0.8, 0.0), Vec3::Y);
    let view = projection(w, h) * camera;

    sw.init_trace_buffer(w, h)?;
    let mut image = fb.view();
    image.clear(sw.config().background);

    let sun = {
        let mut p = [view * Vec4::new(3.0, 6.0, 4.0, 1.0)];
        homogenize(&mut p);
        p[0].truncate()
    };
    sw.set_lighting(LightingSetup::new(
        vec![
            Light::ambient(Vec3::splat(0.35)),
            Light::point(Vec3::splat(0.8), sun, 12),
        ],
        -Vec3::Z,
        Mat4::IDENTITY,
    ));

    for (id, face) in scene().into_iter().enumerate() {
        let mut points: Vec<Vec4> = face.corners.iter().map(|c| c.extend(1.0)).collect();
        let mut normals = vec![face.normal; points.len()];
        transform_module(&mut points, &mut normals, &Mat4::IDENTITY, &Mat4::IDENTITY)?;
        make_view_canonical(&mut points, &view, w, h);

        let cfg = sw.config_mut();
        cfg.set_polygon_id(id as i32);
        cfg.set_alpha(face.alpha);
        cfg.set_beta(face.beta);
        cfg.set_polygon_fill(!opts.wireframe);

        let vertices = points
            .iter()
            .map(|p| Vertex::new(p.x, p.y, p.z, face.color))
            .collect();
        let poly = Polygon::new(vertices, screen_normal(&camera, normals[0]));
        sw.draw_polygon(&mut image, &poly)?;
    }

    let light = match &opts.light {
        Some(l) => Vec3::new(l[0], l[1], l[2]),
        None => sun,
    };
    sw.post_process(&mut image, passes, light)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = Opts::parse();
    if let Some(l) = &opts.light {
        ensure!(l.len() == 3, "--light takes exactly three values, got {}", l.len());
    }
    let passes = opts
        .passes
        .iter()
        .fold(Passes::empty(), |acc, &p| acc | Passes::from(p));

    let mut sw = Software::default();
    {
        let cfg = sw.config_mut();
        cfg.set_fog_scale(opts.fog);
        cfg.set_seed(opts.seed);
        cfg.set_background_color(24, 24, 32);
        cfg.set_shadow_meta_parameters(24, 24, 0.01, 2, 0.6);
    }
    let mut fb = FrameBuffer::new(opts.width, opts.height, Rgb::BLACK);

    let mut win = Window::new("lilac software render", opts.width, opts.height, WindowOptions::default())
        .context("opening window")?;
    win.set_target_fps(30);

    let mut yaw = 0.6_f32;
    let mut dirty = true;
    while win.is_open() && !win.is_key_down(Key::Escape) {
        if win.is_key_pressed(Key::Left, KeyRepeat::Yes) {
            yaw -= 0.1;
            dirty = true;
        }
        if win.is_key_pressed(Key::Right, KeyRepeat::Yes) {
            yaw += 0.1;
            dirty = true;
        }
        if dirty {
            let t0 = Instant::now();
            render(&mut sw, &mut fb, &opts, passes, yaw)?;
            info!("frame: {:.2} ms", t0.elapsed().as_secs_f64() * 1000.0);
            dirty = false;
        }
        win.update_with_buffer(fb.pixels(), fb.width(), fb.height())?;
    }
    Ok(())
}
