//! Static arena geometry - platforms, death zone and spawn points

use rand::Rng;
use serde::Serialize;

/// Number of spawn points eligible for a mid-round respawn
pub const RESPAWN_POINT_COUNT: usize = 3;

/// Axis-aligned rectangle in world coordinates (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap test; touching edges do not count
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Strict overlap on the horizontal axis only
    pub fn overlaps_horizontally(&self, other: &Rect) -> bool {
        self.x < other.right() && self.right() > other.x
    }
}

/// Platform surface tag, used by clients for styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Main,
    Side,
    Top,
}

#[derive(Debug, Clone, Serialize)]
pub struct Platform {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type")]
    pub kind: PlatformKind,
}

impl Platform {
    pub fn new(x: f32, y: f32, width: f32, height: f32, kind: PlatformKind) -> Self {
        Self {
            x,
            y,
            width,
            height,
            kind,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Bounds outside which a player has fallen out of the arena
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeathZone {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl DeathZone {
    /// True while the point is inside the survivable rectangle (edges inclusive)
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
}

/// The arena, built once at startup and never mutated
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    pub platforms: Vec<Platform>,
    pub death_zone: DeathZone,
    /// Server-side only; clients never need spawn locations
    #[serde(skip)]
    pub spawn_points: Vec<SpawnPoint>,
}

impl Arena {
    /// Spawn point for the player at `index` in join order
    pub fn spawn_point(&self, index: usize) -> SpawnPoint {
        self.spawn_points[index % self.spawn_points.len()]
    }

    /// Random spawn point for a respawn after a lost life
    pub fn respawn_point<R: Rng + ?Sized>(&self, rng: &mut R) -> SpawnPoint {
        let eligible = RESPAWN_POINT_COUNT.min(self.spawn_points.len());
        self.spawn_points[rng.gen_range(0..eligible)]
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            platforms: vec![
                Platform::new(200.0, 550.0, 800.0, 40.0, PlatformKind::Main),
                Platform::new(50.0, 400.0, 200.0, 30.0, PlatformKind::Side),
                Platform::new(950.0, 400.0, 200.0, 30.0, PlatformKind::Side),
                Platform::new(450.0, 280.0, 300.0, 30.0, PlatformKind::Top),
            ],
            death_zone: DeathZone {
                top: -200.0,
                bottom: 900.0,
                left: -100.0,
                right: 1300.0,
            },
            spawn_points: vec![
                SpawnPoint { x: 300.0, y: 400.0 },
                SpawnPoint { x: 900.0, y: 400.0 },
                SpawnPoint { x: 600.0, y: 150.0 },
                SpawnPoint { x: 150.0, y: 250.0 },
            ],
        }
    }
}
