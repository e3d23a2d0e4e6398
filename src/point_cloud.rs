use crate::catalog::FilteredView;
use crate::palette;
use serde::Serialize;

/// Uniform factor applied to embedding coordinates to reach scene radius.
pub const POSITION_SCALE: f32 = 5.0;
/// Smallest point size (energy 0).
pub const MIN_POINT_SCALE: f32 = 0.3;
/// Largest point size (energy 1).
pub const MAX_POINT_SCALE: f32 = 1.0;

/// Flat per-point attribute arrays, parallel to the view they were built from:
/// `positions` and `colors` hold 3 floats per point, `scales` holds one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PointCloudBuffers {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub scales: Vec<f32>,
}

impl PointCloudBuffers {
    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Position of point `i`, if it exists.
    pub fn position(&self, i: usize) -> Option<[f32; 3]> {
        let p = self.positions.get(i * 3..i * 3 + 3)?;
        Some([p[0], p[1], p[2]])
    }

    pub fn color(&self, i: usize) -> Option<[f32; 3]> {
        let c = self.colors.get(i * 3..i * 3 + 3)?;
        Some([c[0], c[1], c[2]])
    }
}

/// Build the point buffers for a view, one point per record in view order.
pub fn build_point_cloud(view: &FilteredView<'_>) -> PointCloudBuffers {
    let n = view.len();
    let mut buffers = PointCloudBuffers {
        positions: Vec::with_capacity(n * 3),
        colors: Vec::with_capacity(n * 3),
        scales: Vec::with_capacity(n),
    };

    for song in view.iter() {
        buffers
            .positions
            .extend(song.position.map(|c| (c * f64::from(POSITION_SCALE)) as f32));
        buffers.colors.extend(palette::cluster_color(song.cluster));
        buffers.scales.push(point_scale(song.features.energy));
    }

    log::debug!("Built point cloud for {} songs", n);
    buffers
}

/// Map energy to point size. The clamp holds even for out-of-range energy.
pub fn point_scale(energy: f64) -> f32 {
    let scale = MIN_POINT_SCALE + energy as f32 * (MAX_POINT_SCALE - MIN_POINT_SCALE);
    if scale.is_nan() {
        return MIN_POINT_SCALE;
    }
    scale.clamp(MIN_POINT_SCALE, MAX_POINT_SCALE)
}
