use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use egui::{Color32, Vec2};

use crate::graph_utils::pipeline::Sprite;
use super::scene::AlphaProbe;

/// Native sprite resolution, before the node scale is applied.
pub const SPRITE_SIZE: [usize; 2] = [400, 260];

const OUTLINE: f32 = 8.0;

#[derive(Clone, Debug)]
pub struct SpriteImage {
    pub size: [usize; 2],
    pub rgba: Vec<u8>,
}

impl SpriteImage {
    pub fn alpha_at(&self, uv: Vec2) -> u8 {
        let [w, h] = self.size;
        if w == 0 || h == 0 || !(0.0..1.0).contains(&uv.x) || !(0.0..1.0).contains(&uv.y) {
            return 0;
        }
        let x = ((uv.x * w as f32) as usize).min(w - 1);
        let y = ((uv.y * h as f32) as usize).min(h - 1);
        self.rgba[(y * w + x) * 4 + 3]
    }

    pub fn to_color_image(&self) -> egui::ColorImage {
        egui::ColorImage::from_rgba_unmultiplied(self.size, &self.rgba)
    }
}

#[derive(Copy, Clone)]
enum Outline {
    Block,
    Factory,
    Funnel,
    Hexagon,
}

fn palette(sprite: Sprite) -> (Outline, Color32) {
    match sprite {
        Sprite::RegularPipe => (Outline::Block, Color32::from_rgb(96, 125, 139)),
        Sprite::FactoryPipe => (Outline::Factory, Color32::from_rgb(121, 85, 72)),
        Sprite::NullSinkPipe => (Outline::Funnel, Color32::from_rgb(84, 110, 122)),
        Sprite::EvaluatorPipe => (Outline::Hexagon, Color32::from_rgb(63, 81, 181)),
        Sprite::AggregationEvaluator => (Outline::Hexagon, Color32::from_rgb(0, 137, 123)),
        Sprite::MazeEvaluator => (Outline::Hexagon, Color32::from_rgb(142, 36, 170)),
        Sprite::NoopEvaluator => (Outline::Hexagon, Color32::from_rgb(117, 117, 117)),
        Sprite::OperatorUsageEvaluator => (Outline::Hexagon, Color32::from_rgb(239, 108, 0)),
        Sprite::PassthroughEvaluator => (Outline::Hexagon, Color32::from_rgb(2, 136, 209)),
        Sprite::RuntimeStatisticsEvaluator => (Outline::Hexagon, Color32::from_rgb(198, 40, 40)),
    }
}

// Coordinates are normalized to the sprite; everything outside is transparent.
fn covers(outline: Outline, x: f32, y: f32) -> bool {
    let body = (0.06..0.94).contains(&x) && (0.12..0.88).contains(&y);
    match outline {
        Outline::Block => body,
        Outline::Factory => {
            let hall = (0.06..0.94).contains(&x) && (0.38..0.88).contains(&y);
            let chimney = (0.14..0.30).contains(&x) && (0.08..0.38).contains(&y);
            hall || chimney
        }
        Outline::Funnel => {
            // Wide mouth on the left narrowing to a spout on the right.
            if !(0.06..0.94).contains(&x) {
                return false;
            }
            let half = if x < 0.70 { 0.40 - (x - 0.06) * 0.40 } else { 0.14 };
            (y - 0.5).abs() < half
        }
        Outline::Hexagon => {
            let dx = (x - 0.5).abs();
            let dy = (y - 0.5).abs();
            dy < 0.40 && dx < 0.44 - dy * 0.30
        }
    }
}

/// Draw `sprite` into a fresh RGBA buffer.
pub fn rasterize(sprite: Sprite) -> SpriteImage {
    let [w, h] = SPRITE_SIZE;
    let (outline, fill) = palette(sprite);
    let edge = Color32::from_rgb(fill.r() / 2, fill.g() / 2, fill.b() / 2);
    let (ex, ey) = (OUTLINE / w as f32, OUTLINE / h as f32);
    let mut rgba = vec![0u8; w * h * 4];
    for py in 0..h {
        for px in 0..w {
            let x = (px as f32 + 0.5) / w as f32;
            let y = (py as f32 + 0.5) / h as f32;
            if !covers(outline, x, y) {
                continue;
            }
            let interior = covers(outline, x - ex, y)
                && covers(outline, x + ex, y)
                && covers(outline, x, y - ey)
                && covers(outline, x, y + ey);
            let c = if interior { fill } else { edge };
            let i = (py * w + px) * 4;
            rgba[i..i + 4].copy_from_slice(&[c.r(), c.g(), c.b(), 255]);
        }
    }
    SpriteImage { size: SPRITE_SIZE, rgba }
}

/// Sprites that have finished loading.
#[derive(Default)]
pub struct SpriteAtlas {
    images: HashMap<Sprite, SpriteImage>,
}

impl SpriteAtlas {
    pub fn insert(&mut self, sprite: Sprite, image: SpriteImage) { self.images.insert(sprite, image); }
    pub fn get(&self, sprite: Sprite) -> Option<&SpriteImage> { self.images.get(&sprite) }
    pub fn contains(&self, sprite: Sprite) -> bool { self.images.contains_key(&sprite) }
}

impl AlphaProbe for SpriteAtlas {
    fn is_opaque(&self, sprite: Sprite, uv: Vec2) -> Option<bool> {
        self.images.get(&sprite).map(|img| img.alpha_at(uv) > 0)
    }
}

/// Loads sprites off the UI thread, once per sprite.
pub struct AssetLoader {
    tx: Sender<(Sprite, SpriteImage)>,
    rx: Receiver<(Sprite, SpriteImage)>,
    requested: HashSet<Sprite>,
    wake: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl AssetLoader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx, requested: HashSet::new(), wake: None }
    }

    /// Called from the loader thread after an image is ready.
    pub fn with_wake(mut self, wake: Arc<dyn Fn() + Send + Sync>) -> Self {
        self.wake = Some(wake);
        self
    }

    /// Schedule a load. Returns false if it was already requested.
    pub fn request(&mut self, sprite: Sprite) -> bool {
        if !self.requested.insert(sprite) {
            return false;
        }
        let tx = self.tx.clone();
        let wake = self.wake.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("sprite-{}", sprite.asset_name()))
            .spawn(move || {
                let image = rasterize(sprite);
                if tx.send((sprite, image)).is_ok()
                    && let Some(wake) = wake
                {
                    wake();
                }
            });
        if let Err(e) = spawned {
            log::warn!("could not load {}: {}", sprite.asset_name(), e);
            self.requested.remove(&sprite);
            return false;
        }
        true
    }

    /// Drain whatever finished since the last call.
    pub fn finished(&self) -> Vec<(Sprite, SpriteImage)> { self.rx.try_iter().collect() }
}

impl Default for AssetLoader {
    fn default() -> Self { Self::new() }
}
