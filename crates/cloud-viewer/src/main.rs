//! Entry point for the point cloud viewer application.

use anyhow::Result;
use clap::Parser;
use cloud_viewer::app::App;
use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};
use winit::{
    event::{Event, StartCause, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::WindowBuilder,
};

/// Redraw cadence of the frame timer.
const FRAME_INTERVAL: Duration = Duration::from_millis(20);

/// Deadline for the redraw after a tick fires at `now`. Anchored to
/// the current time so a stall longer than one interval skips the
/// missed ticks instead of replaying them back-to-back.
fn next_deadline(now: Instant) -> Instant {
    now + FRAME_INTERVAL
}

#[derive(Parser, Debug)]
#[command(about = "View a PLY point cloud with rotation sliders")]
struct Args {
    /// Path to the PLY point-cloud file
    input: PathBuf,
}

fn main() -> Result<()> {
    // Initialize logging; default to "info" if RUST_LOG is unset.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Create the event loop and window.
    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Point Cloud Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(1024, 768))
            .build(&event_loop)?,
    );

    // Initialise the application (async → sync). Loads the cloud once;
    // a missing or corrupt file terminates with the error.
    let mut app = pollster::block_on(App::new(window.clone(), &args.input))?;

    // Drive redraws from a fixed 20 ms timer rather than free-running.
    let mut next_frame = next_deadline(Instant::now());

    event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::WaitUntil(next_frame));

        match event {
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                next_frame = next_deadline(Instant::now());
                window.request_redraw();
            }
            Event::WindowEvent { window_id, event } if window_id == window.id() => {
                // Forward events to the app; handle unconsumed window events.
                if !app.handle_event(&window, &event) {
                    match event {
                        WindowEvent::CloseRequested => elwt.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                                elwt.exit();
                            }
                        }
                        WindowEvent::RedrawRequested => {
                            match app.render(&window) {
                                Ok(_) => {}
                                Err(wgpu::SurfaceError::Lost) => {
                                    app.resize(app.renderer.gfx.size);
                                }
                                Err(wgpu::SurfaceError::OutOfMemory) => {
                                    log::error!("WGPU out of memory – exiting.");
                                    elwt.exit();
                                }
                                Err(e) => log::error!("Render error: {:?}", e),
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    })?;

    Ok(())
}
