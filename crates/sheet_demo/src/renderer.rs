//! Keeps at most one rendering session in step with the renderer's inputs.
//!
//! `reconcile` is called with the current inputs every frame. Unchanged inputs
//! are a no-op. Any change tears the previous cycle down completely before the
//! guard is evaluated again; sessions are never updated in place.
//!
//! A cycle owns the preview URL it was given. The URL is released when a cycle
//! ends and the next one does not carry the same URL (a new run, a new file,
//! or the renderer unmounting). A cycle that only differs in frame size keeps
//! the URL: the form still holds it and the rebuilt session must load it, so
//! releasing it on every input change would hand the new session a dead URL.
//! The form releases it later, when it allocates a new one or a new file is
//! chosen.

use glam::Vec2;
use sheet_core::animation::Repeat;
use sheet_core::config::{ContainerSizing, DemoConfig};
use sheet_core::dimension::FrameDimensions;

use crate::object_url::{ObjectUrlRegistry, PreviewUrl};
use crate::session::{DemoScene, RenderSession, SessionConfig};

#[derive(Debug, Clone)]
pub struct RendererProps {
    pub image_url: Option<PreviewUrl>,
    pub dimensions: FrameDimensions,
    pub is_ready: bool,
}

impl RendererProps {
    /// Bitwise comparison so a NaN dimension compares equal to itself.
    fn same_as(&self, other: &RendererProps) -> bool {
        self.image_url == other.image_url
            && self.is_ready == other.is_ready
            && self.dimensions.width.to_bits() == other.dimensions.width.to_bits()
            && self.dimensions.height.to_bits() == other.dimensions.height.to_bits()
    }
}

/// The host surface a session draws into. A new surface means a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountTarget {
    pub surface_id: u64,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub canvas: (u32, u32),
    pub background: [u8; 3],
    pub frame_rate: u32,
    pub repeat: Repeat,
    pub margin: u32,
    pub spacing: u32,
    pub texture_key: String,
    pub animation_key: String,
    pub container: ContainerSizing,
}

impl From<&DemoConfig> for RendererSettings {
    fn from(config: &DemoConfig) -> Self {
        Self {
            canvas: (config.canvas.width, config.canvas.height),
            background: config.background_rgb(),
            frame_rate: config.frame_rate,
            repeat: Repeat::from_count(config.repeat),
            margin: config.margin,
            spacing: config.spacing,
            texture_key: config.texture_key.clone(),
            animation_key: config.animation_key.clone(),
            container: config.container,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    Unchanged,
    Idle,
    SessionStarted(u64),
}

struct Cycle {
    url: Option<PreviewUrl>,
    session: Option<RenderSession>,
}

pub struct SpriteRenderer {
    settings: RendererSettings,
    inputs: Option<(RendererProps, Option<MountTarget>)>,
    cycle: Option<Cycle>,
    next_session_id: u64,
}

impl SpriteRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            settings,
            inputs: None,
            cycle: None,
            next_session_id: 1,
        }
    }

    pub fn reconcile(
        &mut self,
        props: &RendererProps,
        mount: Option<MountTarget>,
        urls: &mut ObjectUrlRegistry,
    ) -> Reconciled {
        if let Some((last_props, last_mount)) = &self.inputs {
            if last_props.same_as(props) && *last_mount == mount {
                return Reconciled::Unchanged;
            }
        }

        self.teardown(props.image_url.as_ref(), urls);
        self.inputs = Some((props.clone(), mount));

        let pixels = props.dimensions.to_pixels();
        let (Some(url), Some((frame_width, frame_height)), Some(_), true) =
            (props.image_url.as_ref(), pixels, mount, props.is_ready)
        else {
            log::debug!(
                "Renderer idle: ready={} url={} size={}x{} mounted={}",
                props.is_ready,
                props.image_url.is_some(),
                props.dimensions.width,
                props.dimensions.height,
                mount.is_some()
            );
            self.cycle = Some(Cycle {
                url: props.image_url.clone(),
                session: None,
            });
            return Reconciled::Idle;
        };

        let scene = DemoScene {
            texture_key: self.settings.texture_key.clone(),
            animation_key: self.settings.animation_key.clone(),
            url: url.clone(),
            frame_width,
            frame_height,
            margin: self.settings.margin,
            spacing: self.settings.spacing,
            frame_rate: self.settings.frame_rate,
            repeat: self.settings.repeat,
        };
        let container = match self.settings.container {
            ContainerSizing::FrameSize => Vec2::new(frame_width as f32, frame_height as f32),
            ContainerSizing::Canvas => {
                Vec2::new(self.settings.canvas.0 as f32, self.settings.canvas.1 as f32)
            }
        };
        let id = self.next_session_id;
        self.next_session_id += 1;
        let session = RenderSession::new(
            id,
            SessionConfig {
                canvas: self.settings.canvas,
                background: self.settings.background,
                container,
            },
            Box::new(scene),
        );
        self.cycle = Some(Cycle {
            url: Some(url.clone()),
            session: Some(session),
        });
        Reconciled::SessionStarted(id)
    }

    /// End the current cycle, releasing its session and its URL. Safe to call
    /// any number of times.
    pub fn unmount(&mut self, urls: &mut ObjectUrlRegistry) {
        self.teardown(None, urls);
        self.inputs = None;
    }

    fn teardown(&mut self, next_url: Option<&PreviewUrl>, urls: &mut ObjectUrlRegistry) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        if let Some(session) = cycle.session {
            session.destroy();
        }
        if let Some(url) = cycle.url {
            if next_url != Some(&url) {
                urls.revoke(&url);
            }
        }
    }

    pub fn update(&mut self, dt_us: u64, urls: &ObjectUrlRegistry) {
        if let Some(session) = self.session_mut() {
            session.update(dt_us, urls);
        }
    }

    pub fn session(&self) -> Option<&RenderSession> {
        self.cycle.as_ref().and_then(|c| c.session.as_ref())
    }

    pub fn session_mut(&mut self) -> Option<&mut RenderSession> {
        self.cycle.as_mut().and_then(|c| c.session.as_mut())
    }

    pub fn held_url(&self) -> Option<&PreviewUrl> {
        self.cycle.as_ref().and_then(|c| c.url.as_ref())
    }

    pub fn sessions_created(&self) -> u64 {
        self.next_session_id - 1
    }
}

impl Drop for SpriteRenderer {
    fn drop(&mut self) {
        if let Some(cycle) = &self.cycle {
            if cycle.session.is_some() || cycle.url.is_some() {
                log::warn!("Renderer dropped without unmount; its preview URL stays registered");
            }
        }
    }
}
