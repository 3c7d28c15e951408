use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;
use kiosk_core::input::KeyPress;
use kiosk_core::ports::{AssetProvider, AudioPort, GamepadSource, MenuAssets, Ports, Renderer};
use kiosk_core::{QuantityAction, Session};
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

mod audio;
mod cli;
mod gamepad;
mod headless;
mod texture;
mod ui_layout;
mod viewer;

use audio::init_audio;
use cli::Args;
use gamepad::init_gamepads;
use viewer::{PanelSurface, ParticleField, ViewerState};

/// Longest step handed to the core; a stalled frame should not fling the
/// carousel.
const MAX_FRAME_DT: f32 = 0.1;

/// What a window key press means to the kiosk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KioskKey {
    Core(KeyPress),
    Quantity(QuantityAction),
}

fn kiosk_key(key: &Key) -> Option<KioskKey> {
    let mapped = match key {
        Key::Named(NamedKey::ArrowLeft) => KioskKey::Core(KeyPress::ArrowLeft),
        Key::Named(NamedKey::ArrowRight) => KioskKey::Core(KeyPress::ArrowRight),
        Key::Named(NamedKey::Enter) => KioskKey::Core(KeyPress::Enter),
        Key::Named(NamedKey::Space) => KioskKey::Core(KeyPress::Space),
        Key::Character(text) => match text.chars().next()? {
            '+' | '=' => KioskKey::Quantity(QuantityAction::Increment),
            '-' | '_' => KioskKey::Quantity(QuantityAction::Decrement),
            ch => KioskKey::Core(KeyPress::Character(ch)),
        },
        Key::Named(_) => KioskKey::Core(KeyPress::Other),
        _ => return None,
    };
    Some(mapped)
}

/// The window-side collaborators the session borrows each call.
struct Host {
    audio: Box<dyn AudioPort>,
    panel: PanelSurface,
    particles: ParticleField,
    gamepads: Box<dyn GamepadSource>,
}

impl Host {
    fn ports(&mut self) -> Ports<'_> {
        Ports {
            audio: self.audio.as_mut(),
            particles: &mut self.particles,
            overlay: &mut self.panel,
            gamepads: self.gamepads.as_mut(),
        }
    }
}

fn window_title(session: &Session) -> String {
    let item = session.selected_item();
    let details = session.catalog().details_by_key(&item.key);
    format!("Food Kiosk - {}", details.display_name)
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let config = cli::load_config(args.config.as_deref())?;
    let mut assets = MenuAssets::new();
    let registry = assets
        .load_model(args.menu.as_deref(), &mut |progress: f32| {
            log::debug!("menu load {:.0}%", progress * 100.0)
        })
        .context("loading menu items")?;
    println!(
        "Loaded {} menu items ({})",
        registry.len(),
        args.menu
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "built-in menu".to_string())
    );
    let mut session =
        Session::new(config, assets.into_catalog(), registry).context("building kiosk session")?;

    if args.headless {
        return headless::run(session, args.headless_seconds, args.event_log.as_deref());
    }

    let audio = init_audio(args.audio_dir.as_deref())?;

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(window_title(&session))
            .with_inner_size(PhysicalSize::new(args.width, args.height))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(
        window,
        session.registry(),
        cli::load_font_bytes(args.font.as_deref()),
    )
    .block_on()?;

    let mut host = Host {
        audio,
        panel: PanelSurface::new(state.panel_metrics()),
        particles: ParticleField::new(),
        gamepads: init_gamepads(),
    };
    session.subscribe(|event| log::debug!("session event {event:?}"));
    session.init(&mut host.ports());

    let started = Instant::now();
    let mut last_frame = started;
    let mut cursor = (0.0f32, 0.0f32);
    let mut title_index = session.selection().selected_index();

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);
            let now_ms = started.elapsed().as_secs_f64() * 1000.0;

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => match kiosk_key(&logical_key) {
                            Some(KioskKey::Core(key)) => {
                                session.key(key, &mut host.ports());
                            }
                            Some(KioskKey::Quantity(action)) => {
                                session.quantity_action(action, &mut host.ports());
                            }
                            None => {}
                        },
                        WindowEvent::CursorMoved { position, .. } => {
                            cursor = (position.x as f32, position.y as f32);
                            session.pointer_move(cursor.0, cursor.1);
                        }
                        WindowEvent::MouseInput {
                            state: button_state,
                            button: MouseButton::Left,
                            ..
                        } => match button_state {
                            ElementState::Pressed => session.pointer_down(cursor.0, cursor.1, now_ms),
                            ElementState::Released => {
                                session.pointer_up(cursor.0, cursor.1, now_ms, &mut host.ports());
                                session.click(&mut host.ports());
                            }
                        },
                        WindowEvent::Touch(Touch {
                            id,
                            phase,
                            location,
                            ..
                        }) => {
                            let (x, y) = (location.x as f32, location.y as f32);
                            match phase {
                                TouchPhase::Started => session.touch_start(id, x, y, now_ms),
                                TouchPhase::Moved => session.touch_move(id, x, y),
                                TouchPhase::Ended => {
                                    session.touch_end(id, x, y, now_ms, &mut host.ports())
                                }
                                TouchPhase::Cancelled => session.touch_cancel(id),
                            }
                        }
                        WindowEvent::Resized(new_size) => {
                            state.resize(new_size.width, new_size.height)
                        }
                        WindowEvent::RedrawRequested => {
                            let now = Instant::now();
                            let dt = now
                                .duration_since(last_frame)
                                .as_secs_f32()
                                .min(MAX_FRAME_DT);
                            last_frame = now;

                            host.panel.advance(dt);
                            host.particles.update(dt);
                            session.tick(dt, &mut host.ports());

                            let selected = session.selection().selected_index();
                            if selected != title_index {
                                title_index = selected;
                                state.window().set_title(&window_title(&session));
                            }

                            state.sync_panel(&host.panel);
                            state.set_particles(host.particles.instances());
                            session.render(&mut state);
                            match state.take_surface_error() {
                                None => {}
                                Some(SurfaceError::OutOfMemory) => target.exit(),
                                Some(err) => eprintln!("[kiosk_viewer] render error: {err:?}"),
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                Event::LoopExiting => session.dispose(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::SmolStr;

    #[test]
    fn arrows_and_enter_reach_the_core() {
        assert_eq!(
            kiosk_key(&Key::Named(NamedKey::ArrowLeft)),
            Some(KioskKey::Core(KeyPress::ArrowLeft))
        );
        assert_eq!(
            kiosk_key(&Key::Named(NamedKey::Enter)),
            Some(KioskKey::Core(KeyPress::Enter))
        );
        assert_eq!(
            kiosk_key(&Key::Named(NamedKey::Tab)),
            Some(KioskKey::Core(KeyPress::Other))
        );
    }

    #[test]
    fn plus_and_minus_step_quantity() {
        assert_eq!(
            kiosk_key(&Key::Character(SmolStr::new("+"))),
            Some(KioskKey::Quantity(QuantityAction::Increment))
        );
        assert_eq!(
            kiosk_key(&Key::Character(SmolStr::new("="))),
            Some(KioskKey::Quantity(QuantityAction::Increment))
        );
        assert_eq!(
            kiosk_key(&Key::Character(SmolStr::new("-"))),
            Some(KioskKey::Quantity(QuantityAction::Decrement))
        );
    }

    #[test]
    fn letters_pass_through_as_characters() {
        assert_eq!(
            kiosk_key(&Key::Character(SmolStr::new("d"))),
            Some(KioskKey::Core(KeyPress::Character('d')))
        );
        assert_eq!(kiosk_key(&Key::Character(SmolStr::new(""))), None);
    }

    #[test]
    fn title_names_the_selected_item() {
        let mut assets = MenuAssets::new();
        let registry = assets.load_model(None, &mut |_| {}).expect("built-in menu");
        let session = Session::new(Default::default(), assets.into_catalog(), registry)
            .expect("session");
        assert_eq!(window_title(&session), "Food Kiosk - Classic Burger");
    }
}
