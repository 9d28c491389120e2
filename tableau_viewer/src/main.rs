mod cli;
mod framebuffer;
mod scene;

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{anyhow, Context};
use clap::Parser;
use crossbeam::channel::{self, Receiver};
use glam::Vec3;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::{pixels::PixelFormatEnum, render::TextureAccess};

use tableau::assets::{Texture, ThreadedLoader};
use tableau::{
    Discovery, ImageProbe, LoadRequest, LoadTicket, ModelPlacement, Orchestrator, Pose,
    SceneEvent, TableauConfig,
};

use cli::Args;
use framebuffer::Framebuffer;
use scene::Scene;

const BACKGROUND: [u8; 4] = [16, 16, 24, 255];
const FACE_COLOR: [u8; 4] = [235, 235, 235, 255];
const PROP_COLOR: [u8; 4] = [255, 190, 90, 255];

const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_STEP: f32 = 0.9;

fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

/// Scans for numbered backdrops on a thread of its own so the window comes up
/// straight away. Statically listed backdrops come first.
fn spawn_discovery(config: &TableauConfig) -> std::io::Result<Receiver<Vec<PathBuf>>> {
    let (sender, receiver) = channel::bounded(1);
    let mut paths = config.backdrop_paths();
    let params = config.discovery_params();
    thread::Builder::new()
        .name("discovery".to_string())
        .spawn(move || {
            if let Some(params) = params {
                paths.extend(Discovery::new(params).run(&mut ImageProbe));
            }
            let _ = sender.send(paths);
        })?;
    Ok(receiver)
}

/// Loads in flight, with the placement each model gets once it arrives.
struct Loads {
    loader: ThreadedLoader<LoadTicket>,
    placements: HashMap<LoadTicket, ModelPlacement>,
}

impl Loads {
    fn request(&mut self, request: LoadRequest) {
        if let Some(placement) = request.placement {
            self.placements.insert(request.ticket, placement);
        }
        self.loader.request(request.ticket, request.path, request.kind);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => TableauConfig::load(path)?,
        None => TableauConfig::default(),
    };
    if let Some(root) = args.asset_root.clone() {
        config.asset_root = root;
    }
    log::info!("assets from {}", config.asset_root.display());

    let mut orchestrator = Orchestrator::<usize>::new(config)?;
    orchestrator.on_ready(|channels| {
        log::info!("scene ready ({} channels)", channels.len());
    });

    let mut loads = Loads {
        loader: ThreadedLoader::new(),
        placements: HashMap::new(),
    };
    for request in orchestrator.load_plan() {
        loads.request(request);
    }
    let discovery =
        spawn_discovery(orchestrator.config()).context("failed to start backdrop discovery")?;

    let sdl_context = sdl2::init().map_err(|e| anyhow!(e))?;
    let video_subsystem = sdl_context.video().map_err(|e| anyhow!(e))?;
    let window = video_subsystem
        .window("tableau", args.width, args.height)
        .position_centered()
        .build()
        .context("failed to create window")?;
    let mut canvas = window.into_canvas().build()?;
    let texture_creator = canvas.texture_creator();
    let mut display_texture = texture_creator.create_texture(
        PixelFormatEnum::RGBA32,
        TextureAccess::Streaming,
        args.width,
        args.height,
    )?;

    let mut frame = Framebuffer::new(args.width, args.height);
    let mut scene = Scene::default();
    let mut backdrop: Option<Texture> = None;
    let aspect = args.width as f32 / args.height as f32;

    let mut event_pump = sdl_context.event_pump().map_err(|e| anyhow!(e))?;
    let mut timer = Instant::now();
    let mut frames = 0u64;
    'running: loop {
        let delta = timer.elapsed();
        timer = Instant::now();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'running,
                Event::KeyDown {
                    keycode: Some(kc),
                    repeat: false,
                    ..
                } => match kc {
                    Keycode::Space | Keycode::P => {
                        orchestrator.start_choreography();
                    }
                    Keycode::V | Keycode::E => {
                        orchestrator.advance_variant();
                    }
                    Keycode::B => {
                        if let Some(request) = orchestrator.swap_backdrop() {
                            loads.request(request);
                        }
                    }
                    _ => {}
                },
                Event::MouseMotion {
                    mousestate,
                    xrel,
                    yrel,
                    ..
                } if mousestate.left() => {
                    orchestrator.orbit(
                        -xrel as f32 * ORBIT_SENSITIVITY,
                        -yrel as f32 * ORBIT_SENSITIVITY,
                    );
                }
                Event::MouseWheel { y, .. } => {
                    orchestrator.zoom(ZOOM_STEP.powi(y));
                }
                _ => {}
            }
        }

        if let Ok(paths) = discovery.try_recv() {
            if let Some(request) = orchestrator.set_backdrops(paths)? {
                loads.request(request);
            }
        }

        for completion in loads.loader.poll() {
            let path = completion.path;
            match completion.ticket {
                LoadTicket::Backdrop { index } => {
                    let result = completion.result.and_then(|a| a.into_texture(&path));
                    if let Some(texture) = orchestrator.backdrop_loaded(index, result)? {
                        backdrop = Some(texture);
                    }
                }
                ticket => {
                    let placement = loads.placements.remove(&ticket).unwrap_or(ModelPlacement {
                        pose: Pose::at(Vec3::ZERO),
                        size: 1.0,
                    });
                    let color = match ticket {
                        LoadTicket::Face { .. } => FACE_COLOR,
                        _ => PROP_COLOR,
                    };
                    let result = completion
                        .result
                        .and_then(|asset| asset.into_mesh(&path))
                        .map(|mesh| scene.add(&mesh, placement, color));
                    orchestrator.complete(ticket, result)?;
                }
            }
        }

        orchestrator.tick(delta);
        for event in orchestrator.drain_events() {
            match event {
                SceneEvent::Ready => {
                    log::info!("{} models in the scene", scene.len());
                    if args.autoplay {
                        orchestrator.start_choreography();
                    }
                }
                SceneEvent::VariantChanged(_) => log::debug!("prompt: {}", orchestrator.prompt()),
                other => log::debug!("{:?}", other),
            }
        }

        match &backdrop {
            Some(texture) => {
                frame.paint_backdrop(texture, orchestrator.camera(), orchestrator.lens())
            }
            None => frame.clear(BACKGROUND),
        }
        let view_projection = orchestrator.lens().projection_matrix(aspect)
            * orchestrator.camera().view_matrix();
        scene.render(&mut frame, view_projection, orchestrator.visible_handles());

        let caption = if orchestrator.is_ready() {
            orchestrator.prompt().to_string()
        } else {
            orchestrator.status_line()
        };
        canvas.window_mut().set_title(&format!(
            "{} | FPS : {:.02}",
            caption,
            1.0 / delta.as_secs_f32().max(1e-6)
        ))?;
        display_texture.update(None, frame.pixels(), frame.pitch())?;
        canvas
            .copy(&display_texture, None, None)
            .map_err(|e| anyhow!(e))?;
        canvas.present();

        frames += 1;
        if args.frames.map_or(false, |limit| frames >= limit) {
            log::info!("frame limit reached");
            break;
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbosity);
    log::debug!("{:?}", args);

    if let Err(err) = run(args) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}
