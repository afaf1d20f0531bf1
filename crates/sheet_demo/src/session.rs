//! A rendering session: one scene, the textures it loaded, its animations and
//! its sprites.
//!
//! Scenes follow a two-phase contract. `preload` only declares assets; they are
//! fetched and decoded on the session's first `update`, after which `create`
//! runs exactly once. A session destroyed before that first update never
//! touches its assets.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use glam::Vec2;
use sheet_core::animation::{
    generate_frame_numbers, AnimationConfig, AnimationManager, AnimationState, Repeat,
};
use sheet_core::spritesheet::{decode_spritesheet, SheetConfig, TextureManager};
use sheet_ui::{StageSprite, StageView};
use thiserror::Error;

use crate::object_url::{ObjectUrlRegistry, PreviewUrl};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("texture '{key}' did not load or has no frames to enumerate; check the image")]
    TextureMissing { key: String },
    #[error("no frames found in '{key}' at {frame_width}x{frame_height}; check the frame width/height")]
    NoFrames {
        key: String,
        frame_width: u32,
        frame_height: u32,
    },
    #[error("animation setup failed: {0}")]
    Animation(String),
    #[error("a frame of '{key}' is {width}x{height}, larger than the GPU texture limit of {max_side}")]
    TextureTooLarge {
        key: String,
        width: u32,
        height: u32,
        max_side: usize,
    },
}

#[derive(Debug, Clone)]
pub enum LoadRequest {
    Spritesheet {
        key: String,
        url: PreviewUrl,
        config: SheetConfig,
    },
}

/// Assets a scene asked for during `preload`.
#[derive(Debug, Default)]
pub struct LoadQueue {
    pending: Vec<LoadRequest>,
}

impl LoadQueue {
    pub fn spritesheet(&mut self, key: &str, url: PreviewUrl, config: SheetConfig) {
        self.pending.push(LoadRequest::Spritesheet {
            key: key.to_string(),
            url,
            config,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    fn drain(&mut self) -> Vec<LoadRequest> {
        std::mem::take(&mut self.pending)
    }
}

#[derive(Debug, Clone)]
pub struct Sprite {
    pub texture_key: String,
    /// Canvas position of the sprite's center.
    pub position: Vec2,
    pub scale: f32,
    pub frame: usize,
    pub anim: Option<AnimationState>,
}

impl Sprite {
    pub fn new(texture_key: &str, position: Vec2) -> Self {
        Self {
            texture_key: texture_key.to_string(),
            position,
            scale: 1.0,
            frame: 0,
            anim: None,
        }
    }

    /// Start `key` from its first frame.
    pub fn play(&mut self, key: &str, anims: &AnimationManager) -> Result<(), String> {
        let clip = anims
            .get(key)
            .ok_or_else(|| format!("Animation '{key}' is not registered"))?;
        if let Some(first) = clip.frames.first() {
            self.texture_key = first.texture_key.clone();
            self.frame = first.frame;
        }
        self.anim = Some(AnimationState::new(key));
        Ok(())
    }

    fn tick(&mut self, dt_us: u64, anims: &AnimationManager) {
        let Some(state) = self.anim.as_mut() else {
            return;
        };
        let Some(clip) = anims.get(&state.clip_key) else {
            return;
        };
        if let Some(frame) = state.tick(dt_us, clip) {
            self.texture_key = frame.texture_key.clone();
            self.frame = frame.frame;
        }
    }
}

/// What `Scene::create` may touch.
pub struct SceneContext<'a> {
    pub textures: &'a TextureManager,
    pub anims: &'a mut AnimationManager,
    pub sprites: &'a mut Vec<Sprite>,
    pub canvas: (u32, u32),
}

impl SceneContext<'_> {
    pub fn canvas_center(&self) -> Vec2 {
        Vec2::new(self.canvas.0 as f32 / 2.0, self.canvas.1 as f32 / 2.0)
    }
}

pub trait Scene {
    fn name(&self) -> &str;
    fn preload(&mut self, load: &mut LoadQueue);
    fn create(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), SceneError>;
}

/// Loads one spritesheet and loops all of its frames on a sprite at the
/// canvas center. Holds its own copy of the inputs it was built from.
#[derive(Debug, Clone)]
pub struct DemoScene {
    pub texture_key: String,
    pub animation_key: String,
    pub url: PreviewUrl,
    pub frame_width: u32,
    pub frame_height: u32,
    pub margin: u32,
    pub spacing: u32,
    pub frame_rate: u32,
    pub repeat: Repeat,
}

impl Scene for DemoScene {
    fn name(&self) -> &str {
        "DemoScene"
    }

    fn preload(&mut self, load: &mut LoadQueue) {
        load.spritesheet(
            &self.texture_key,
            self.url.clone(),
            SheetConfig {
                margin: self.margin,
                spacing: self.spacing,
                ..SheetConfig::new(self.frame_width, self.frame_height)
            },
        );
    }

    fn create(&mut self, ctx: &mut SceneContext<'_>) -> Result<(), SceneError> {
        let texture = ctx
            .textures
            .get(&self.texture_key)
            .ok_or_else(|| SceneError::TextureMissing {
                key: self.texture_key.clone(),
            })?;

        let total_frames = texture.frame_names().len();
        if total_frames == 0 {
            return Err(SceneError::NoFrames {
                key: self.texture_key.clone(),
                frame_width: self.frame_width,
                frame_height: self.frame_height,
            });
        }

        ctx.anims
            .create(AnimationConfig {
                key: self.animation_key.clone(),
                frames: generate_frame_numbers(ctx.textures, &self.texture_key, 0, total_frames - 1),
                frame_rate: self.frame_rate,
                repeat: self.repeat,
            })
            .map_err(SceneError::Animation)?;

        let mut sprite = Sprite::new(&self.texture_key, ctx.canvas_center());
        sprite.scale = 1.0;
        sprite
            .play(&self.animation_key, &*ctx.anims)
            .map_err(SceneError::Animation)?;
        ctx.sprites.push(sprite);

        log::info!(
            "Animation '{}' created with {} frames at {} fps",
            self.animation_key,
            total_frames,
            self.frame_rate
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub canvas: (u32, u32),
    pub background: [u8; 3],
    /// Size of the box the canvas is fitted into.
    pub container: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Running,
}

pub struct RenderSession {
    id: u64,
    config: SessionConfig,
    scene: Box<dyn Scene>,
    load_queue: LoadQueue,
    textures: TextureManager,
    anims: AnimationManager,
    sprites: Vec<Sprite>,
    phase: SessionPhase,
    setup_error: Option<SceneError>,
    /// Keyed by texture and, for sheets over the size limit, frame index.
    gpu_textures: HashMap<(String, Option<usize>), egui::TextureHandle>,
}

impl RenderSession {
    pub fn new(id: u64, config: SessionConfig, mut scene: Box<dyn Scene>) -> Self {
        let mut load_queue = LoadQueue::default();
        scene.preload(&mut load_queue);
        log::info!(
            "Session {} started: scene '{}', canvas {}x{}, {} asset(s) queued",
            id,
            scene.name(),
            config.canvas.0,
            config.canvas.1,
            load_queue.len()
        );
        Self {
            id,
            config,
            scene,
            load_queue,
            textures: TextureManager::new(),
            anims: AnimationManager::new(),
            sprites: Vec::new(),
            phase: SessionPhase::Loading,
            setup_error: None,
            gpu_textures: HashMap::new(),
        }
    }

    /// Advance the session. The first call loads queued assets and runs the
    /// scene's `create`; every call advances sprite animations by `dt_us`.
    pub fn update(&mut self, dt_us: u64, urls: &ObjectUrlRegistry) {
        if self.phase == SessionPhase::Loading {
            self.run_loads(urls);
            self.run_create();
            self.phase = SessionPhase::Running;
            return;
        }
        for sprite in &mut self.sprites {
            sprite.tick(dt_us, &self.anims);
        }
    }

    fn run_loads(&mut self, urls: &ObjectUrlRegistry) {
        for request in self.load_queue.drain() {
            match request {
                LoadRequest::Spritesheet { key, url, config } => {
                    let Some(bytes) = urls.resolve(&url) else {
                        log::error!("Session {}: failed to load '{}': {} is not live", self.id, key, url);
                        continue;
                    };
                    match decode_spritesheet(&key, &bytes, &config) {
                        Ok(texture) => {
                            log::debug!(
                                "Session {}: loaded '{}' ({}x{}, {} frames)",
                                self.id,
                                key,
                                texture.size().0,
                                texture.size().1,
                                texture.frame_count()
                            );
                            if let Err(err) = self.textures.add(texture) {
                                log::error!("Session {}: {}", self.id, err);
                            }
                        }
                        Err(err) => log::error!("Session {}: {}", self.id, err),
                    }
                }
            }
        }
    }

    fn run_create(&mut self) {
        let mut ctx = SceneContext {
            textures: &self.textures,
            anims: &mut self.anims,
            sprites: &mut self.sprites,
            canvas: self.config.canvas,
        };
        if let Err(err) = self.scene.create(&mut ctx) {
            match &err {
                SceneError::TextureMissing { .. } => {
                    log::error!("Session {}: texture error: {}", self.id, err)
                }
                SceneError::NoFrames { .. } => {
                    log::error!("Session {}: empty spritesheet: {}", self.id, err)
                }
                SceneError::Animation(_) | SceneError::TextureTooLarge { .. } => {
                    log::error!("Session {}: {}", self.id, err)
                }
            }
            self.setup_error = Some(err);
        }
    }

    /// Build the stage for this frame, uploading sprite textures on first use.
    ///
    /// A sheet that fits the GPU texture limit is uploaded once and sampled by
    /// UV. A larger sheet is uploaded one frame at a time as frames come up. A
    /// frame that alone exceeds the limit is not drawn and becomes the
    /// session's setup error.
    pub fn stage_view(&mut self, ctx: &egui::Context) -> StageView {
        let max_side = ctx.input(|i| i.max_texture_side);
        let mut stage_sprites = Vec::with_capacity(self.sprites.len());
        for sprite in &self.sprites {
            let Some(texture) = self.textures.get(&sprite.texture_key) else {
                continue;
            };
            let Some(rect) = texture.frame(sprite.frame) else {
                continue;
            };
            let (sheet_w, sheet_h) = texture.size();
            let whole_sheet = sheet_w as usize <= max_side && sheet_h as usize <= max_side;
            if !whole_sheet && (rect.w as usize > max_side || rect.h as usize > max_side) {
                if self.setup_error.is_none() {
                    let err = SceneError::TextureTooLarge {
                        key: texture.key().to_string(),
                        width: rect.w,
                        height: rect.h,
                        max_side,
                    };
                    log::error!("Session {}: {}", self.id, err);
                    self.setup_error = Some(err);
                }
                continue;
            }

            let slot = if whole_sheet { None } else { Some(sprite.frame) };
            let handle = match self.gpu_textures.entry((sprite.texture_key.clone(), slot)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let (name, pixels) = match slot {
                        None => (
                            format!("session-{}/{}", self.id, texture.key()),
                            texture.source().clone(),
                        ),
                        Some(frame) => match texture.frame_image(frame) {
                            Some(pixels) => (
                                format!("session-{}/{}#{}", self.id, texture.key(), frame),
                                pixels,
                            ),
                            None => continue,
                        },
                    };
                    if slot.is_some() {
                        log::debug!(
                            "Session {}: '{}' is {}x{}, over the {} texture limit; uploading {}",
                            self.id,
                            texture.key(),
                            sheet_w,
                            sheet_h,
                            max_side,
                            name
                        );
                    }
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [pixels.width() as usize, pixels.height() as usize],
                        pixels.as_raw(),
                    );
                    entry.insert(ctx.load_texture(name, image, egui::TextureOptions::NEAREST))
                }
            };
            stage_sprites.push(StageSprite {
                texture: handle.id(),
                uv: if whole_sheet {
                    rect.uv(sheet_w, sheet_h)
                } else {
                    [0.0, 0.0, 1.0, 1.0]
                },
                center: sprite.position,
                size: Vec2::new(rect.w as f32, rect.h as f32) * sprite.scale,
            });
        }

        StageView::Active {
            container: self.config.container,
            canvas: self.config.canvas,
            background: self.config.background,
            sprites: stage_sprites,
        }
    }

    /// Tear the session down, releasing its textures (GPU copies included).
    pub fn destroy(self) {
        log::info!(
            "Session {} destroyed ({} texture(s), {} sprite(s))",
            self.id,
            self.textures.len(),
            self.sprites.len()
        );
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn setup_error(&self) -> Option<&SceneError> {
        self.setup_error.as_ref()
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn textures(&self) -> &TextureManager {
        &self.textures
    }

    pub fn anims(&self) -> &AnimationManager {
        &self.anims
    }

    pub fn gpu_texture_count(&self) -> usize {
        self.gpu_textures.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_url::SelectedFile;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([0, 128, 255, 255]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).expect("encode png");
        out.into_inner()
    }

    fn demo_scene(urls: &mut ObjectUrlRegistry, bytes: Vec<u8>, frame: u32) -> DemoScene {
        DemoScene {
            texture_key: "demoSprite".to_string(),
            animation_key: "walk".to_string(),
            url: urls.create(&SelectedFile::new("sheet.png", bytes)),
            frame_width: frame,
            frame_height: frame,
            margin: 0,
            spacing: 0,
            frame_rate: 10,
            repeat: Repeat::Forever,
        }
    }

    fn demo_session(urls: &mut ObjectUrlRegistry, bytes: Vec<u8>, frame: u32) -> RenderSession {
        session_for(demo_scene(urls, bytes, frame))
    }

    fn session_for(scene: DemoScene) -> RenderSession {
        let frame = scene.frame_width;
        RenderSession::new(
            1,
            SessionConfig {
                canvas: (800, 600),
                background: [0x2d, 0x2d, 0x2d],
                container: Vec2::new(frame as f32, frame as f32),
            },
            Box::new(scene),
        )
    }

    #[test]
    fn preload_queues_without_loading() {
        let mut urls = ObjectUrlRegistry::new();
        let session = demo_session(&mut urls, png_bytes(128, 128), 32);
        assert_eq!(session.phase(), SessionPhase::Loading);
        assert_eq!(session.load_queue.len(), 1);
        assert!(session.textures().is_empty());
    }

    #[test]
    fn full_grid_registers_walk_over_all_frames() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(128, 128), 32);
        session.update(0, &urls);

        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.setup_error().is_none());
        let clip = session.anims().get("walk").expect("walk registered");
        assert_eq!(clip.frames.len(), 16);
        assert_eq!(clip.frames.first().map(|f| f.frame), Some(0));
        assert_eq!(clip.frames.last().map(|f| f.frame), Some(15));
        assert_eq!(clip.repeat, Repeat::Forever);
        assert_eq!(clip.frame_duration_us, 100_000);

        assert_eq!(session.sprites().len(), 1);
        let sprite = &session.sprites()[0];
        assert_eq!(sprite.position, Vec2::new(400.0, 300.0));
        assert_eq!(sprite.scale, 1.0);
        assert_eq!(sprite.anim.as_ref().map(|a| a.clip_key.as_str()), Some("walk"));
    }

    #[test]
    fn strip_registers_four_frames() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(128, 32), 32);
        session.update(0, &urls);
        let clip = session.anims().get("walk").expect("walk registered");
        assert_eq!(clip.frames.iter().map(|f| f.frame).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn single_frame_sheet_loops_one_frame() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(32, 32), 32);
        session.update(0, &urls);
        let clip = session.anims().get("walk").expect("walk registered");
        assert_eq!(clip.frames.len(), 1);

        for _ in 0..30 {
            session.update(16_667, &urls);
        }
        assert_eq!(session.sprites()[0].frame, 0);
    }

    #[test]
    fn sprite_advances_at_ten_fps() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(128, 32), 32);
        session.update(0, &urls);
        session.update(100_000, &urls);
        assert_eq!(session.sprites()[0].frame, 1);
        session.update(300_000, &urls);
        assert_eq!(session.sprites()[0].frame, 0);
    }

    #[test]
    fn undecodable_image_leaves_empty_scene() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, b"definitely not a png".to_vec(), 32);
        session.update(0, &urls);

        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.sprites().is_empty());
        assert!(session.anims().is_empty());
        assert_eq!(
            session.setup_error(),
            Some(&SceneError::TextureMissing {
                key: "demoSprite".to_string()
            })
        );
    }

    #[test]
    fn oversized_frames_report_no_frames() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(16, 16), 32);
        session.update(0, &urls);

        assert!(session.sprites().is_empty());
        assert!(matches!(session.setup_error(), Some(SceneError::NoFrames { .. })));
    }

    #[test]
    fn revoked_url_is_a_load_failure() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(64, 64), 32);
        let LoadRequest::Spritesheet { url, .. } = session.load_queue.pending[0].clone();
        urls.revoke(&url);
        session.update(0, &urls);
        assert!(matches!(session.setup_error(), Some(SceneError::TextureMissing { .. })));
    }

    #[test]
    fn create_runs_once() {
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(64, 64), 32);
        session.update(0, &urls);
        session.update(0, &urls);
        session.update(0, &urls);
        assert_eq!(session.sprites().len(), 1);
        assert_eq!(session.textures().len(), 1);
    }

    #[test]
    fn stage_view_uploads_texture_once() {
        let ctx = egui::Context::default();
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(64, 32), 32);
        session.update(0, &urls);

        let StageView::Active { sprites, canvas, .. } = session.stage_view(&ctx) else {
            panic!("session stage should be active");
        };
        assert_eq!(canvas, (800, 600));
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].center, Vec2::new(400.0, 300.0));
        assert_eq!(sprites[0].size, Vec2::new(32.0, 32.0));
        assert_eq!(sprites[0].uv, [0.0, 0.0, 0.5, 1.0]);

        session.stage_view(&ctx);
        assert_eq!(session.gpu_texture_count(), 1);
    }

    #[test]
    fn sheet_wider_than_texture_limit_uploads_single_frames() {
        let ctx = egui::Context::default();
        let max_side = ctx.input(|i| i.max_texture_side) as u32;
        let mut urls = ObjectUrlRegistry::new();
        let mut session = demo_session(&mut urls, png_bytes(max_side * 2, 64), 64);
        session.update(0, &urls);

        let StageView::Active { sprites, .. } = session.stage_view(&ctx) else {
            panic!("session stage should be active");
        };
        assert!(session.setup_error().is_none());
        assert_eq!(sprites.len(), 1);
        assert_eq!(sprites[0].uv, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(sprites[0].size, Vec2::new(64.0, 64.0));
        assert_eq!(session.gpu_texture_count(), 1);

        session.update(100_000, &urls);
        assert_eq!(session.sprites()[0].frame, 1);
        session.stage_view(&ctx);
        session.stage_view(&ctx);
        assert_eq!(session.gpu_texture_count(), 2);
    }

    #[test]
    fn frame_over_texture_limit_leaves_stage_empty() {
        let ctx = egui::Context::default();
        let max_side = ctx.input(|i| i.max_texture_side) as u32;
        let mut urls = ObjectUrlRegistry::new();
        let mut scene = demo_scene(&mut urls, png_bytes(max_side + 64, 16), 16);
        scene.frame_width = max_side + 64;
        let mut session = session_for(scene);
        session.update(0, &urls);
        assert!(session.setup_error().is_none());

        let StageView::Active { sprites, .. } = session.stage_view(&ctx) else {
            panic!("session stage should be active");
        };
        assert!(sprites.is_empty());
        assert_eq!(session.gpu_texture_count(), 0);
        assert_eq!(
            session.setup_error(),
            Some(&SceneError::TextureTooLarge {
                key: "demoSprite".to_string(),
                width: max_side + 64,
                height: 16,
                max_side: max_side as usize,
            })
        );
    }

    #[test]
    fn margin_and_spacing_reach_the_slicer() {
        let mut urls = ObjectUrlRegistry::new();
        let mut scene = demo_scene(&mut urls, png_bytes(50, 16), 16);
        scene.spacing = 2;
        let mut session = session_for(scene);
        session.update(0, &urls);

        let texture = session.textures().get("demoSprite").expect("texture");
        assert_eq!(texture.frame_count(), 2);
        assert_eq!(texture.frame(1).map(|r| r.x), Some(18));
        assert_eq!(session.anims().get("walk").map(|c| c.frames.len()), Some(2));
    }

    #[test]
    fn finite_repeat_stops_on_last_frame() {
        let mut urls = ObjectUrlRegistry::new();
        let mut scene = demo_scene(&mut urls, png_bytes(64, 32), 32);
        scene.repeat = Repeat::Times(0);
        let mut session = session_for(scene);
        session.update(0, &urls);
        session.update(500_000, &urls);

        let sprite = &session.sprites()[0];
        assert_eq!(sprite.frame, 1);
        assert!(sprite.anim.as_ref().is_some_and(|a| a.finished));
    }
}
