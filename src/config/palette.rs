//! Colour palettes and the frequency bands they tint.

/// One analysed frequency band and the colour it is drawn with.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBand {
    pub name: &'static str,
    /// Lower edge in Hz.
    pub min_hz: f32,
    /// Upper edge in Hz.
    pub max_hz: f32,
    /// Hue offset in degrees added to the animated hue.
    pub hue_offset: f32,
    pub saturation: f32,
    pub brightness: f32,
}

/// Number of bands every palette provides a hue for.
pub const BAND_COUNT: usize = 8;

const BAND_EDGES: [(&str, f32, f32); BAND_COUNT] = [
    ("Sub-Bass", 20.0, 40.0),
    ("Bass", 40.0, 80.0),
    ("Low-Bass", 80.0, 100.0),
    ("Low-Mid", 100.0, 200.0),
    ("Mid", 200.0, 400.0),
    ("Upper-Mid", 400.0, 600.0),
    ("High-Mid", 600.0, 800.0),
    ("Presence", 800.0, 1000.0),
];

/// A named set of band hues.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub name: &'static str,
    pub display_name: &'static str,
    pub hues: [f32; BAND_COUNT],
    pub saturation: f32,
    pub brightness: f32,
}

impl Palette {
    const fn new(
        name: &'static str,
        display_name: &'static str,
        hues: [f32; BAND_COUNT],
        saturation: f32,
        brightness: f32,
    ) -> Self {
        Self {
            name,
            display_name,
            hues,
            saturation,
            brightness,
        }
    }

    /// Build the band table tinted with this palette.
    pub fn bands(&self) -> Vec<FrequencyBand> {
        BAND_EDGES
            .iter()
            .zip(self.hues.iter())
            .map(|(&(name, min_hz, max_hz), &hue)| FrequencyBand {
                name,
                min_hz,
                max_hz,
                hue_offset: hue,
                saturation: self.saturation,
                brightness: self.brightness,
            })
            .collect()
    }
}

/// Every palette, in display order.
pub static PALETTES: [Palette; 17] = [
    Palette::new("rainbow", "Rainbow", [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0], 1.0, 1.0),
    Palette::new("spring", "Spring", [80.0, 100.0, 120.0, 140.0, 280.0, 300.0, 320.0, 340.0], 0.8, 0.95),
    Palette::new("summer", "Summer", [30.0, 45.0, 60.0, 180.0, 200.0, 220.0, 240.0, 260.0], 1.0, 1.0),
    Palette::new("autumn", "Autumn", [0.0, 15.0, 30.0, 35.0, 40.0, 25.0, 20.0, 10.0], 0.9, 0.85),
    Palette::new("winter", "Winter", [180.0, 200.0, 220.0, 240.0, 260.0, 200.0, 190.0, 210.0], 0.7, 0.9),
    Palette::new("ice", "Ice", [180.0, 190.0, 200.0, 210.0, 220.0, 200.0, 195.0, 205.0], 0.5, 1.0),
    Palette::new("fire", "Fire", [0.0, 10.0, 20.0, 30.0, 40.0, 25.0, 15.0, 35.0], 1.0, 0.95),
    Palette::new("water", "Water", [160.0, 170.0, 180.0, 190.0, 150.0, 165.0, 175.0, 185.0], 0.8, 0.9),
    Palette::new("earth", "Earth", [25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0], 0.6, 0.7),
    Palette::new("neon", "Neon", [330.0, 195.0, 120.0, 60.0, 300.0, 210.0, 150.0, 75.0], 1.0, 1.0),
    Palette::new("sunset", "Sunset", [0.0, 10.0, 20.0, 30.0, 290.0, 310.0, 330.0, 350.0], 0.95, 0.9),
    Palette::new("synthwave", "Synthwave", [280.0, 290.0, 300.0, 310.0, 320.0, 330.0, 195.0, 210.0], 1.0, 0.95),
    Palette::new("galaxy", "Galaxy", [260.0, 270.0, 280.0, 290.0, 300.0, 310.0, 200.0, 220.0], 0.85, 0.85),
    Palette::new("rock", "Rock", [0.0, 5.0, 10.0, 15.0, 280.0, 290.0, 20.0, 25.0], 0.95, 0.85),
    Palette::new("jazz", "Jazz", [260.0, 270.0, 45.0, 50.0, 230.0, 240.0, 35.0, 40.0], 0.7, 0.75),
    Palette::new("aurora", "Aurora", [120.0, 140.0, 160.0, 180.0, 280.0, 300.0, 200.0, 220.0], 0.8, 0.9),
    Palette::new("desert", "Desert", [40.0, 45.0, 50.0, 30.0, 35.0, 25.0, 20.0, 55.0], 0.75, 0.85),
];

/// Look up a palette by its lowercase name.
pub fn palette_by_name(name: &str) -> Option<&'static Palette> {
    let name = name.to_lowercase();
    PALETTES.iter().find(|p| p.name == name)
}

/// Band table for a palette name, falling back to rainbow for unknown names.
pub fn bands_for_palette(name: &str) -> Vec<FrequencyBand> {
    match palette_by_name(name) {
        Some(palette) => palette.bands(),
        None => {
            log::warn!("Palette '{}' not found, using rainbow", name);
            PALETTES[0].bands()
        }
    }
}
