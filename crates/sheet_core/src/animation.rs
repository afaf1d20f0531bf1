//! Frame-based sprite animation types and deterministic tick logic.
//!
//! An animation is a named list of spritesheet frames played at a fixed frame
//! rate. All timing uses integer microseconds (`u64`) so advancement is exact
//! under the fixed-timestep clock -- no floating-point drift between runs.

use std::collections::HashMap;

use crate::spritesheet::TextureManager;

/// One frame of an animation: a texture key plus a frame index into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFrame {
    pub texture_key: String,
    pub frame: usize,
}

/// How many times a clip plays after its first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    Forever,
    Times(u32),
}

impl Repeat {
    /// Engine-style repeat count: any negative value loops forever.
    pub fn from_count(count: i32) -> Self {
        if count < 0 {
            Self::Forever
        } else {
            Self::Times(count as u32)
        }
    }
}

/// Everything needed to register an animation.
#[derive(Debug, Clone)]
pub struct AnimationConfig {
    pub key: String,
    pub frames: Vec<AnimationFrame>,
    pub frame_rate: u32,
    pub repeat: Repeat,
}

/// A registered animation with its per-frame duration resolved.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub key: String,
    pub frames: Vec<AnimationFrame>,
    pub frame_duration_us: u64,
    pub repeat: Repeat,
}

impl AnimationClip {
    /// Total duration of one pass in microseconds.
    pub fn cycle_duration_us(&self) -> u64 {
        self.frame_duration_us * self.frames.len() as u64
    }
}

/// Frames `start..=end` of the texture `key`, skipping indices the texture does
/// not have. A missing texture yields an empty list.
pub fn generate_frame_numbers(
    textures: &TextureManager,
    key: &str,
    start: usize,
    end: usize,
) -> Vec<AnimationFrame> {
    let Some(texture) = textures.get(key) else {
        log::warn!("generate_frame_numbers: texture '{}' not found", key);
        return Vec::new();
    };
    (start..=end)
        .filter(|&i| texture.frame(i).is_some())
        .map(|frame| AnimationFrame {
            texture_key: key.to_string(),
            frame,
        })
        .collect()
}

/// Global (per-session) registry of animations by key.
#[derive(Debug, Default)]
pub struct AnimationManager {
    clips: HashMap<String, AnimationClip>,
}

impl AnimationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an animation. An existing key is left untouched and reported
    /// as a warning; an empty frame list or zero frame rate is rejected.
    pub fn create(&mut self, config: AnimationConfig) -> Result<&AnimationClip, String> {
        if config.key.is_empty() {
            return Err("Animation key is empty".to_string());
        }
        if config.frames.is_empty() {
            return Err(format!("Animation '{}' has no frames", config.key));
        }
        if config.frame_rate == 0 {
            return Err(format!("Animation '{}' has a zero frame rate", config.key));
        }
        if self.clips.contains_key(&config.key) {
            log::warn!("Animation key '{}' already exists, keeping the original", config.key);
        } else {
            let clip = AnimationClip {
                key: config.key.clone(),
                frames: config.frames,
                frame_duration_us: 1_000_000 / u64::from(config.frame_rate),
                repeat: config.repeat,
            };
            self.clips.insert(config.key.clone(), clip);
        }
        self.clips
            .get(&config.key)
            .ok_or_else(|| format!("Animation '{}' vanished after insert", config.key))
    }

    pub fn get(&self, key: &str) -> Option<&AnimationClip> {
        self.clips.get(key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

/// Runtime playback state for one sprite.
#[derive(Debug, Clone)]
pub struct AnimationState {
    pub clip_key: String,
    pub frame_index: usize,
    pub elapsed_us: u64,
    pub repeats_done: u32,
    pub finished: bool,
}

impl AnimationState {
    pub fn new(clip_key: &str) -> Self {
        Self {
            clip_key: clip_key.to_string(),
            frame_index: 0,
            elapsed_us: 0,
            repeats_done: 0,
            finished: false,
        }
    }

    /// Advance by `dt_us` microseconds and return the frame now showing.
    pub fn tick<'a>(&mut self, dt_us: u64, clip: &'a AnimationClip) -> Option<&'a AnimationFrame> {
        if clip.frames.is_empty() {
            return None;
        }
        if self.finished || clip.frame_duration_us == 0 {
            return clip.frames.get(self.frame_index).or(clip.frames.last());
        }

        self.elapsed_us += dt_us;

        while self.elapsed_us >= clip.frame_duration_us {
            self.elapsed_us -= clip.frame_duration_us;
            self.frame_index += 1;

            if self.frame_index >= clip.frames.len() {
                let may_repeat = match clip.repeat {
                    Repeat::Forever => true,
                    Repeat::Times(n) => self.repeats_done < n,
                };
                if may_repeat {
                    self.frame_index = 0;
                    self.repeats_done = self.repeats_done.saturating_add(1);
                } else {
                    self.frame_index = clip.frames.len() - 1;
                    self.elapsed_us = 0;
                    self.finished = true;
                    break;
                }
            }
        }

        clip.frames.get(self.frame_index)
    }
}
