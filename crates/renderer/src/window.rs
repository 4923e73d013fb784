use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use shadersync::{FetchedSource, Poller, ResyncOutcome, SourceClient};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::gpu::Session;
use crate::types::RendererConfig;

#[derive(Debug, Clone)]
enum WindowCommand {
    Source(FetchedSource),
}

/// Field order matters: the session's surface must drop before the window.
struct WindowState {
    session: Session,
    window: Arc<Window>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Exit,
    Resync,
}

fn key_action(event: &KeyEvent) -> Option<KeyAction> {
    if event.state != ElementState::Pressed || event.repeat {
        return None;
    }
    match &event.logical_key {
        Key::Named(NamedKey::Escape) => Some(KeyAction::Exit),
        Key::Named(NamedKey::F5) => Some(KeyAction::Resync),
        Key::Character(value) if value.eq_ignore_ascii_case("r") => Some(KeyAction::Resync),
        _ => None,
    }
}

/// New surface size carried by `event`.
///
/// `ScaleFactorChanged` reports nothing here: the window's size is not final
/// until the `Resized` that follows it.
fn resize_target(event: &WindowEvent) -> Option<PhysicalSize<u32>> {
    match event {
        WindowEvent::Resized(size) => Some(*size),
        _ => None,
    }
}

/// Opens the preview window and blocks until it is closed.
///
/// The event loop owns the [`Session`]; fetched sources arrive from the poller
/// thread as user events, so every GPU call happens on this thread.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoopBuilder::<WindowCommand>::with_user_event()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let fetcher = SourceClient::new(&config.source, config.fetch_timeout)
        .context("failed to prepare shader source client")?;
    let session = Session::new(window.as_ref(), window.inner_size(), config, &fetcher)
        .context("failed to initialise renderer")?;
    let mut state = WindowState { session, window };

    let mut poller = Some(
        Poller::spawn(fetcher, config.poll_interval, move |fetched| {
            proxy.send_event(WindowCommand::Source(fetched)).is_ok()
        })
        .context("failed to spawn shader poller")?,
    );
    let resync = poller.as_ref().map(Poller::handle);
    info!(
        source = %config.source,
        interval = ?config.poll_interval,
        "watching shader source"
    );

    state.window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| {
        elwt.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(WindowCommand::Source(fetched)) => {
                match state.session.apply_source(&fetched) {
                    ResyncOutcome::Applied { fingerprint, linked } => {
                        debug!(%fingerprint, linked, sequence = fetched.sequence, "shader source applied");
                        state.window.request_redraw();
                    }
                    ResyncOutcome::Unchanged(_) | ResyncOutcome::Stale { .. } => {}
                }
            }
            Event::WindowEvent { window_id, event } if window_id == state.window.id() => {
                if let Some(new_size) = resize_target(&event) {
                    state.session.resize(new_size);
                    state.window.request_redraw();
                }
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        elwt.exit();
                    }
                    WindowEvent::KeyboardInput { event, .. } => match key_action(&event) {
                        Some(KeyAction::Exit) => elwt.exit(),
                        Some(KeyAction::Resync) => {
                            let triggered = resync.as_ref().is_some_and(|handle| handle.trigger());
                            if !triggered {
                                warn!("shader poller is not running; resync ignored");
                            }
                        }
                        None => {}
                    },
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        debug!(scale_factor, "scale factor changed");
                    }
                    WindowEvent::RedrawRequested => match state.session.render() {
                        Ok(()) => {}
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            debug!(size = ?state.session.size(), "surface lost; reconfiguring");
                            state.session.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; exiting");
                            elwt.exit();
                        }
                        Err(wgpu::SurfaceError::Timeout) => {
                            debug!("surface timeout; retrying next frame");
                        }
                        Err(other) => {
                            warn!("surface error: {other:?}; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                state.window.request_redraw();
            }
            Event::LoopExiting => {
                state.session.dispose();
                if let Some(mut poller) = poller.take() {
                    poller.shutdown();
                }
                info!("window closed");
            }
            _ => {}
        }
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
