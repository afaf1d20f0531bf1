//! Spritesheet Demo Tool -- window, event loop and frame pump.
//!
//! winit drives the loop via `ApplicationHandler`. Each `RedrawRequested`:
//!
//!   1. build the stage from the running session (if any)
//!   2. run the egui form and apply what the user did
//!   3. reconcile the renderer with the form
//!   4. step the session on a fixed timestep
//!   5. clear to the canvas background and composite egui on top

mod demo;
mod form;
mod object_url;
mod renderer;
mod session;

use std::path::Path;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use demo::SpritesheetDemo;
use object_url::SelectedFile;
use renderer::MountTarget;
use sheet_core::config::{load_config, DemoConfig};
use sheet_core::time::FrameClock;
use sheet_platform::window::PlatformConfig;
use sheet_render::GpuContext;
use sheet_ui::{FormActions, FormInputs, FormView, UiShell};

const CONFIG_PATH: &str = "assets/spritesheet_demo.json";
const FIXED_DT_US: u64 = 16_667;
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Everything that needs a live window. Built in `resumed`.
struct ToolState {
    window: Arc<Window>,
    gpu: GpuContext,
    ui: UiShell,
    clock: FrameClock,
    demo: SpritesheetDemo,
    mount: MountTarget,
}

impl ToolState {
    fn new(window: Arc<Window>, config: &DemoConfig, surface_id: u64) -> Result<Self, String> {
        let gpu = GpuContext::new(window.clone(), config.background_rgb())?;
        let inputs = FormInputs::new(config.default_frame_width, config.default_frame_height);
        let ui = UiShell::new(&gpu.device, gpu.surface_format, &window, inputs);
        Ok(Self {
            window,
            gpu,
            ui,
            clock: FrameClock::new(FIXED_DT_US),
            demo: SpritesheetDemo::new(config),
            mount: MountTarget { surface_id },
        })
    }

    fn open_file(&mut self, path: &Path) {
        match SelectedFile::from_path(path) {
            Ok(file) => {
                self.ui.inputs.path = path.display().to_string();
                self.demo.select_file(Some(file));
            }
            Err(err) => {
                log::error!("{err}");
                self.demo.notify(&err);
            }
        }
    }

    fn apply_actions(&mut self, actions: FormActions) {
        if actions.dismiss_alert {
            self.demo.dismiss_alert();
        }
        if let Some(path) = actions.open_path {
            self.open_file(&path);
        }
        if actions.browse {
            let picked = rfd::FileDialog::new()
                .set_title("Choose a spritesheet")
                .add_filter("Images", IMAGE_EXTENSIONS)
                .pick_file();
            match picked {
                Some(path) => self.open_file(&path),
                None => log::debug!("File dialog cancelled"),
            }
        }
        if let Some(raw) = actions.width_changed {
            self.demo.set_width(&raw);
        }
        if let Some(raw) = actions.height_changed {
            self.demo.set_height(&raw);
        }
        if actions.run {
            self.demo.run();
        }
    }

    fn redraw(&mut self) {
        if self.gpu.size.0 == 0 || self.gpu.size.1 == 0 {
            return;
        }

        let stage = self.demo.stage_view(self.ui.ctx());
        let session_label = self.demo.status_label();
        let (primitives, textures_delta, actions) = {
            let form = self.demo.form();
            let view = FormView {
                selected_file: form.selected_file().map(|f| f.name.as_str()),
                can_run: form.can_run(),
                alert: form.alert(),
                live_urls: self.demo.urls().live_count(),
                session_label: &session_label,
                fps: self.clock.smoothed_fps,
            };
            self.ui.prepare(&self.window, &view, &stage)
        };

        self.apply_actions(actions);
        self.demo.sync(Some(self.mount));

        self.clock.begin_frame();
        while self.clock.should_step() {
            self.demo.update(self.clock.fixed_dt_us);
        }

        let Some((output, view)) = self.gpu.begin_frame() else {
            return;
        };

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.gpu.size.0, self.gpu.size.1],
            pixels_per_point: self.window.scale_factor() as f32,
        };

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let _clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.gpu.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
        }

        self.ui.upload(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &primitives,
            &textures_delta,
            &screen_descriptor,
        );

        {
            let mut egui_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("egui Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    ..Default::default()
                })
                .forget_lifetime();

            self.ui.paint(&mut egui_pass, &primitives, &screen_descriptor);
        }

        self.ui.cleanup(&textures_delta);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}

struct App {
    config: DemoConfig,
    state: Option<ToolState>,
    surfaces_created: u64,
    failed: bool,
}

impl App {
    fn new(config: DemoConfig) -> Self {
        Self {
            config,
            state: None,
            surfaces_created: 0,
            failed: false,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let platform = PlatformConfig {
            title: self.config.window.title.clone(),
            width: self.config.window.width,
            height: self.config.window.height,
        };
        let built = sheet_platform::window::create_window(event_loop, &platform).and_then(|window| {
            self.surfaces_created += 1;
            ToolState::new(window, &self.config, self.surfaces_created)
        });
        match built {
            Ok(state) => {
                log::info!("Window created: {}x{}", platform.width, platform.height);
                self.state = Some(state);
            }
            Err(err) => {
                log::error!("Startup failed: {err}");
                self.failed = true;
                event_loop.exit();
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let state = match self.state.as_mut() {
            Some(s) => s,
            None => return,
        };

        state.ui.handle_window_event(&state.window, &event);

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting.");
                state.demo.shutdown();
                event_loop.exit();
            }

            WindowEvent::Resized(physical_size) => {
                let w = physical_size.width;
                let h = physical_size.height;
                if w > 0 && h > 0 {
                    state.gpu.resize(w, h);
                    log::info!("Resized to {}x{}", w, h);
                }
            }

            WindowEvent::DroppedFile(path) => {
                log::info!("File dropped: {}", path.display());
                state.open_file(&path);
            }

            WindowEvent::RedrawRequested => state.redraw(),

            _ => {}
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Spritesheet Demo Tool starting...");

    let config = load_config(Path::new(CONFIG_PATH)).unwrap_or_else(|err| {
        log::error!("{err}; using defaults");
        DemoConfig::default()
    });

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("Failed to create event loop: {err}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    if let Err(err) = event_loop.run_app(&mut app) {
        log::error!("Event loop error: {err}");
        std::process::exit(1);
    }
    if app.failed {
        std::process::exit(1);
    }
}
