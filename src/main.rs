//! sr2 viewer: renders a mesh with the software pipeline in a window
//!
//! Each frame: clear, transform + rasterize + merge, present, export depth,
//! then sleep out the rest of the frame budget.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use log::{debug, error, info};
use macroquad::prelude::{
    clear_background, draw_texture_ex, is_key_pressed, next_frame, screen_height, screen_width, Conf,
    DrawTextureParams, FilterMode, KeyCode, Texture2D, BLACK, WHITE,
};

use sr2::app::FrameController;
use sr2::config::RenderConfig;
use sr2::error::Result;
use sr2::mesh::{demo_vertex_buffer, ObjMesh};
use sr2::rasterizer::Framebuffer;
use sr2::VERSION;

/// Minimal software rasterizer
#[derive(Parser)]
#[command(name = "sr2")]
#[command(about = "Software rasterization pipeline viewer", long_about = None)]
struct Args {
    /// OBJ mesh to render (built-in demo triangles if omitted)
    mesh: Option<PathBuf>,

    /// RON config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Depth image output path (overrides the config)
    #[arg(short = 'o', long)]
    export: Option<PathBuf>,

    /// Skip the per-frame depth export
    #[arg(long, conflicts_with = "export")]
    no_export: bool,

    /// Render without a window
    #[arg(long)]
    headless: bool,

    /// Number of frames to render in headless mode
    #[arg(short = 'n', long, default_value_t = 1)]
    frames: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("sr2 v{}", VERSION);

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            RenderConfig::load(path)?
        }
        None => RenderConfig::default(),
    };
    if let Some(path) = &args.export {
        config.depth_export = Some(path.clone());
    }
    if args.no_export {
        config.depth_export = None;
    }

    let mut controller = FrameController::new(config)?;
    load_geometry(&mut controller, args.mesh.as_deref());

    if args.headless {
        return run_headless(&mut controller, args.frames);
    }

    macroquad::Window::from_config(window_conf(&controller.config), run_windowed(controller));
    Ok(())
}

/// Malformed input is logged and rendering continues with empty geometry
fn load_geometry(controller: &mut FrameController, mesh: Option<&Path>) {
    let positions = match mesh {
        Some(path) => match ObjMesh::load(path).and_then(|m| m.vertex_array()) {
            Ok(positions) => positions,
            Err(e) => {
                error!("{}; continuing with empty geometry", e);
                return;
            }
        },
        None => {
            info!("No mesh given, using demo triangles");
            demo_vertex_buffer()
        }
    };

    if let Err(e) = controller.set_geometry(&positions) {
        error!("{}; continuing with empty geometry", e);
    }
}

fn run_headless(controller: &mut FrameController, frames: u64) -> Result<()> {
    for _ in 0..frames {
        let stats = controller.render_frame()?;
        controller.export_depth()?;
        info!(
            "Frame {}: {} triangles, {} fragments, {} pixels written",
            controller.frame_index(),
            stats.triangles,
            stats.fragments,
            stats.accepted
        );
    }
    Ok(())
}

fn window_conf(config: &RenderConfig) -> Conf {
    Conf {
        window_title: format!("SR2 v{}", VERSION),
        window_width: config.width as i32,
        window_height: config.height as i32,
        window_resizable: false,
        ..Default::default()
    }
}

async fn run_windowed(mut controller: FrameController) {
    let budget = controller.config.frame_budget();

    let fb = &controller.framebuffer;
    let texture = Texture2D::from_rgba8(fb.width as u16, fb.height as u16, &fb.pixels);
    texture.set_filter(FilterMode::Nearest);

    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Escape pressed, exiting");
            break;
        }

        let started = Instant::now();

        if let Err(e) = controller.render_frame() {
            error!("Frame {} failed: {}", controller.frame_index(), e);
            break;
        }

        present(&texture, &controller.framebuffer);

        if let Err(e) = controller.export_depth() {
            error!("Depth export failed: {}", e);
            break;
        }

        next_frame().await;

        match budget.checked_sub(started.elapsed()) {
            Some(rest) => std::thread::sleep(rest),
            None => debug!("Frame {} over budget ({:?})", controller.frame_index(), started.elapsed()),
        }
    }
}

/// Upload the color target and stretch it over the whole window.
/// Row 0 is drawn at the top.
fn present(texture: &Texture2D, fb: &Framebuffer) {
    clear_background(BLACK);

    texture.update_from_bytes(fb.width as u32, fb.height as u32, &fb.pixels);

    draw_texture_ex(
        texture,
        0.0,
        0.0,
        WHITE,
        DrawTextureParams {
            dest_size: Some(macroquad::math::Vec2::new(screen_width(), screen_height())),
            ..Default::default()
        },
    );
}
