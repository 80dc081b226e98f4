//! Colour palettes for chart series.

use plotters::style::{HSLColor, RGBColor};
use serde::{Deserialize, Serialize};

pub const PASTEL: [RGBColor; 10] = [
    RGBColor(161, 201, 244), // Blue
    RGBColor(255, 180, 130), // Orange
    RGBColor(141, 229, 161), // Green
    RGBColor(255, 159, 155), // Red
    RGBColor(208, 187, 255), // Purple
    RGBColor(222, 187, 155), // Brown
    RGBColor(250, 176, 228), // Pink
    RGBColor(207, 207, 207), // Grey
    RGBColor(255, 254, 163), // Yellow
    RGBColor(185, 242, 240), // Cyan
];

pub const DEEP: [RGBColor; 10] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
    RGBColor(218, 139, 195),
    RGBColor(140, 140, 140),
    RGBColor(204, 185, 116),
    RGBColor(100, 181, 205),
];

pub const ACTUAL_RED: RGBColor = RGBColor(231, 76, 60);
pub const ESTIMATE_BLUE: RGBColor = RGBColor(52, 152, 219);
pub const GRID_GREY: RGBColor = RGBColor(225, 225, 225);

/// Named palette selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    #[default]
    Pastel,
    Deep,
}

impl Palette {
    fn colors(self) -> &'static [RGBColor; 10] {
        match self {
            Palette::Pastel => &PASTEL,
            Palette::Deep => &DEEP,
        }
    }

    /// Color for the `index`-th series, cycling through the palette.
    pub fn pick(self, index: usize) -> RGBColor {
        let colors = self.colors();
        colors[index % colors.len()]
    }

    /// Colors for `count` hue levels.
    ///
    /// Up to the palette size the named colors are used; beyond that the hue
    /// circle is sampled evenly so neighbouring levels stay distinguishable.
    pub fn hues(self, count: usize) -> Vec<RGBColor> {
        if count <= self.colors().len() {
            return (0..count).map(|i| self.pick(i)).collect();
        }

        let lightness = match self {
            Palette::Pastel => 0.78,
            Palette::Deep => 0.5,
        };
        (0..count)
            .map(|i| hsl_to_rgb(HSLColor(i as f64 / count as f64, 0.6, lightness)))
            .collect()
    }
}

fn hsl_to_rgb(color: HSLColor) -> RGBColor {
    use plotters::style::Color;
    let (r, g, b) = color.rgb();
    RGBColor(r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_cycles() {
        assert_eq!(Palette::Pastel.pick(0), PASTEL[0]);
        assert_eq!(Palette::Pastel.pick(10), PASTEL[0]);
        assert_eq!(Palette::Deep.pick(3), DEEP[3]);
    }

    #[test]
    fn hues_cover_many_levels() {
        let six = Palette::Pastel.hues(6);
        assert_eq!(six, PASTEL[..6].to_vec());

        let sixteen = Palette::Pastel.hues(16);
        assert_eq!(sixteen.len(), 16);
        assert_ne!(sixteen[0], sixteen[1]);
    }
}
