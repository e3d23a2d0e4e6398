//! Cluster palette shared by the point cloud and the chart panels.
//!
//! Colors are stored as sRGB hex and decoded to linear RGB for the point
//! buffers.

use std::sync::LazyLock;

/// One sRGB hex color per cluster id.
pub const CLUSTER_COLORS: [&str; 8] = [
    "#FF6B6B", // Red
    "#4ECDC4", // Teal
    "#45B7D1", // Blue
    "#FFA07A", // Orange
    "#98D8C8", // Mint
    "#F7DC6F", // Yellow
    "#BB8FCE", // Purple
    "#85C1E2", // Sky Blue
];

/// Display label for each cluster id.
pub const CLUSTER_LABELS: [&str; 8] = [
    "Ballads & Slow",
    "Spoken Word",
    "Balanced Mix",
    "Dance & Pop",
    "Classical",
    "Rock & Alt",
    "Energetic",
    "Folk & Trad",
];

/// Linear RGB for every palette entry, decoded on first use.
static LINEAR_PALETTE: LazyLock<[[f32; 3]; 8]> =
    LazyLock::new(|| CLUSTER_COLORS.map(|hex| parse_hex(hex).unwrap_or([1.0, 1.0, 1.0])));

/// Linear RGB for a cluster. Ids outside 0..8 wrap.
pub fn cluster_color(cluster: u8) -> [f32; 3] {
    LINEAR_PALETTE[usize::from(cluster) % LINEAR_PALETTE.len()]
}

/// sRGB hex string for a cluster. Ids outside 0..8 wrap.
pub fn cluster_hex(cluster: u8) -> &'static str {
    CLUSTER_COLORS[usize::from(cluster) % CLUSTER_COLORS.len()]
}

pub fn cluster_label(cluster: u8) -> &'static str {
    CLUSTER_LABELS[usize::from(cluster) % CLUSTER_LABELS.len()]
}

/// Parse `#RRGGBB` (leading `#` optional) into linear RGB.
pub fn parse_hex(hex: &str) -> Option<[f32; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(hex_to_linear)
}

fn hex_to_linear(rgb: u32) -> [f32; 3] {
    [
        srgb_to_linear(((rgb >> 16) & 0xFF) as f32 / 255.0),
        srgb_to_linear(((rgb >> 8) & 0xFF) as f32 / 255.0),
        srgb_to_linear((rgb & 0xFF) as f32 / 255.0),
    ]
}

/// Inverse of the sRGB transfer curve.
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}
