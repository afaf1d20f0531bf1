//! The tool as a whole: the form owns the inputs, and the renderer is mounted
//! only while the form is ready and holds a preview URL.

use sheet_core::config::DemoConfig;
use sheet_core::dimension::FrameDimensions;
use sheet_ui::StageView;

use crate::form::{RunOutcome, UploadForm};
use crate::object_url::{ObjectUrlRegistry, SelectedFile};
use crate::renderer::{MountTarget, Reconciled, RendererProps, RendererSettings, SpriteRenderer};

const PLACEHOLDER_MESSAGE: &str = "Load an image, enter the frame size and press Run to start!";

pub struct SpritesheetDemo {
    form: UploadForm,
    renderer: SpriteRenderer,
    urls: ObjectUrlRegistry,
}

impl SpritesheetDemo {
    pub fn new(config: &DemoConfig) -> Self {
        Self {
            form: UploadForm::new(FrameDimensions::new(
                config.default_frame_width,
                config.default_frame_height,
            )),
            renderer: SpriteRenderer::new(RendererSettings::from(config)),
            urls: ObjectUrlRegistry::new(),
        }
    }

    pub fn select_file(&mut self, file: Option<SelectedFile>) {
        self.form.on_file_selected(file, &mut self.urls);
    }

    pub fn set_width(&mut self, raw: &str) {
        self.form.on_width_changed(raw);
    }

    pub fn set_height(&mut self, raw: &str) {
        self.form.on_height_changed(raw);
    }

    pub fn run(&mut self) -> RunOutcome {
        self.form.on_run_requested(&mut self.urls)
    }

    pub fn dismiss_alert(&mut self) {
        self.form.dismiss_alert();
    }

    pub fn notify(&mut self, message: &str) {
        self.form.notify(message);
    }

    /// Inputs for the renderer, or `None` while it should not be mounted.
    pub fn renderer_props(&self) -> Option<RendererProps> {
        let url = self.form.image_url()?;
        if !self.form.is_ready() {
            return None;
        }
        Some(RendererProps {
            image_url: Some(url.clone()),
            dimensions: self.form.dimensions(),
            is_ready: true,
        })
    }

    /// Bring the renderer in line with the form. Call after every batch of
    /// input events.
    pub fn sync(&mut self, mount: Option<MountTarget>) -> Reconciled {
        match self.renderer_props() {
            Some(props) => self.renderer.reconcile(&props, mount, &mut self.urls),
            None => {
                self.renderer.unmount(&mut self.urls);
                Reconciled::Idle
            }
        }
    }

    pub fn update(&mut self, dt_us: u64) {
        self.renderer.update(dt_us, &self.urls);
    }

    pub fn stage_view(&mut self, ctx: &egui::Context) -> StageView {
        match self.renderer.session_mut() {
            Some(session) => session.stage_view(ctx),
            None => StageView::Placeholder {
                message: PLACEHOLDER_MESSAGE.to_string(),
            },
        }
    }

    pub fn status_label(&self) -> String {
        match self.renderer.session() {
            None => "No session".to_string(),
            Some(session) => match session.setup_error() {
                Some(err) => format!("Session {}: {}", session.id(), err),
                None => format!("Session {}: {:?}", session.id(), session.phase()),
            },
        }
    }

    /// Release everything. Used when the window closes.
    pub fn shutdown(&mut self) {
        self.renderer.unmount(&mut self.urls);
        if let Some(url) = self.form.image_url() {
            self.urls.revoke(url);
        }
    }

    pub fn form(&self) -> &UploadForm {
        &self.form
    }

    pub fn renderer(&self) -> &SpriteRenderer {
        &self.renderer
    }

    pub fn urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }
}
