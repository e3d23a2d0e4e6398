//! Chart aggregates over a filtered view.
//!
//! All transforms are pure and accept an empty view, returning empty output.

use crate::catalog::{CLUSTER_COUNT, Features, FilteredView};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-cluster counts and mean feature percentages (one decimal place).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStat {
    pub cluster_id: u8,
    pub count: usize,
    pub avg_danceability_pct: f64,
    pub avg_energy_pct: f64,
    pub avg_valence_pct: f64,
}

impl ClusterStat {
    pub fn feature_pct(&self, feature: RadarFeature) -> f64 {
        match feature {
            RadarFeature::Danceability => self.avg_danceability_pct,
            RadarFeature::Energy => self.avg_energy_pct,
            RadarFeature::Valence => self.avg_valence_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RadarFeature {
    Danceability,
    Energy,
    Valence,
}

impl RadarFeature {
    pub const ALL: [RadarFeature; 3] = [Self::Danceability, Self::Energy, Self::Valence];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Danceability => "Danceability",
            Self::Energy => "Energy",
            Self::Valence => "Valence",
        }
    }
}

/// One radar axis: the feature's percentage for every cluster present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarRow {
    pub feature: RadarFeature,
    pub values: BTreeMap<u8, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YearDurationPoint {
    pub year: i32,
    pub avg_minutes: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DecadeCount {
    pub decade: i32,
    pub count: usize,
}

/// Dashboard totals for a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSummary {
    pub total: usize,
    /// Songs per cluster id, with zero for clusters absent from the view.
    pub cluster_counts: [usize; CLUSTER_COUNT as usize],
    /// Mean features over the whole view, `None` when empty.
    pub avg_features: Option<Features>,
    pub decades: Vec<DecadeCount>,
}

#[derive(Default)]
struct FeatureSums {
    count: usize,
    danceability: f64,
    energy: f64,
    valence: f64,
}

impl FeatureSums {
    fn add(&mut self, f: &Features) {
        self.count += 1;
        self.danceability += f.danceability;
        self.energy += f.energy;
        self.valence += f.valence;
    }

    fn mean(&self) -> Option<Features> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Features {
            danceability: self.danceability / n,
            energy: self.energy / n,
            valence: self.valence / n,
        })
    }
}

/// Percentage rounded to one decimal place.
fn pct_1dp(mean: f64) -> f64 {
    (mean * 100.0 * 10.0).round() / 10.0
}

/// Group by cluster and average the three features, ascending cluster id.
pub fn compute_cluster_stats(view: &FilteredView<'_>) -> Vec<ClusterStat> {
    let mut groups: BTreeMap<u8, FeatureSums> = BTreeMap::new();
    for song in view.iter() {
        groups.entry(song.cluster).or_default().add(&song.features);
    }

    groups
        .into_iter()
        .filter_map(|(cluster_id, sums)| {
            let mean = sums.mean()?;
            Some(ClusterStat {
                cluster_id,
                count: sums.count,
                avg_danceability_pct: pct_1dp(mean.danceability),
                avg_energy_pct: pct_1dp(mean.energy),
                avg_valence_pct: pct_1dp(mean.valence),
            })
        })
        .collect()
}

/// Transpose cluster stats into one row per feature.
pub fn compute_radar_series(stats: &[ClusterStat]) -> Vec<RadarRow> {
    if stats.is_empty() {
        return Vec::new();
    }
    RadarFeature::ALL
        .iter()
        .map(|&feature| RadarRow {
            feature,
            values: stats
                .iter()
                .map(|s| (s.cluster_id, s.feature_pct(feature)))
                .collect(),
        })
        .collect()
}

/// Mean duration per year in minutes (unrounded), ascending year.
pub fn compute_duration_series(view: &FilteredView<'_>) -> Vec<YearDurationPoint> {
    let mut groups: BTreeMap<i32, (u64, u64)> = BTreeMap::new();
    for song in view.iter() {
        let (total, count) = groups.entry(song.year).or_default();
        *total += song.duration_ms;
        *count += 1;
    }

    groups
        .into_iter()
        .map(|(year, (total, count))| YearDurationPoint {
            year,
            avg_minutes: total as f64 / count as f64 / 60_000.0,
        })
        .collect()
}

/// Cluster histogram, overall feature means and songs per decade.
pub fn compute_view_summary(view: &FilteredView<'_>) -> ViewSummary {
    let mut cluster_counts = [0usize; CLUSTER_COUNT as usize];
    let mut sums = FeatureSums::default();
    let mut decades: BTreeMap<i32, usize> = BTreeMap::new();

    for song in view.iter() {
        cluster_counts[usize::from(song.cluster % CLUSTER_COUNT)] += 1;
        sums.add(&song.features);
        *decades.entry(song.year.div_euclid(10) * 10).or_default() += 1;
    }

    ViewSummary {
        total: view.len(),
        cluster_counts,
        avg_features: sums.mean(),
        decades: decades
            .into_iter()
            .map(|(decade, count)| DecadeCount { decade, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{song, view};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_cluster_stats_scenario() {
        let songs = [
            song(1990, 0, 0.5),
            song(1991, 0, 0.7),
            song(1992, 1, 0.2),
            song(1993, 1, 0.9),
        ];
        let stats = compute_cluster_stats(&view(&songs));
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].cluster_id, 0);
        assert_eq!(stats[0].count, 2);
        assert!(close(stats[0].avg_energy_pct, 60.0));
        assert_eq!(stats[1].cluster_id, 1);
        assert_eq!(stats[1].count, 2);
        assert!(close(stats[1].avg_energy_pct, 55.0));
    }

    #[test]
    fn test_cluster_stats_sorted_and_rounded() {
        let mut a = song(2000, 6, 0.1);
        a.features.danceability = 0.12345;
        let b = song(2000, 2, 0.3);
        let c = song(2000, 6, 0.2);
        let songs = [a, b, c];
        let stats = compute_cluster_stats(&view(&songs));
        let ids: Vec<u8> = stats.iter().map(|s| s.cluster_id).collect();
        assert_eq!(ids, vec![2, 6]);
        // (0.12345 + 0.5) / 2 = 0.311725 -> 31.2
        assert!(close(stats[1].avg_danceability_pct, 31.2));
        // (0.1 + 0.2) / 2 = 0.15 -> 15.0
        assert!(close(stats[1].avg_energy_pct, 15.0));
    }

    #[test]
    fn test_radar_series_transposes_stats() {
        let songs = [song(1990, 0, 0.5), song(1990, 3, 0.8)];
        let stats = compute_cluster_stats(&view(&songs));
        let rows = compute_radar_series(&stats);

        let features: Vec<&str> = rows.iter().map(|r| r.feature.label()).collect();
        assert_eq!(features, vec!["Danceability", "Energy", "Valence"]);

        let energy = &rows[1];
        assert_eq!(energy.values.len(), 2);
        assert!(close(energy.values[&0], 50.0));
        assert!(close(energy.values[&3], 80.0));
        assert!(close(rows[0].values[&3], 50.0));
    }

    #[test]
    fn test_radar_series_empty() {
        assert!(compute_radar_series(&[]).is_empty());
    }

    #[test]
    fn test_duration_series_scenario() {
        let mut a = song(2000, 0, 0.5);
        a.duration_ms = 180_000;
        let mut b = song(2000, 1, 0.5);
        b.duration_ms = 220_000;
        let songs = [a, b];
        let series = compute_duration_series(&view(&songs));
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].year, 2000);
        assert!(close(series[0].avg_minutes, 200_000.0 / 60_000.0));
    }

    #[test]
    fn test_duration_series_sorted_by_year() {
        let mut a = song(1999, 0, 0.5);
        a.duration_ms = 60_000;
        let mut b = song(1965, 0, 0.5);
        b.duration_ms = 150_000;
        let mut c = song(1999, 0, 0.5);
        c.duration_ms = 120_000;
        let songs = [a, b, c];
        let series = compute_duration_series(&view(&songs));
        let years: Vec<i32> = series.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![1965, 1999]);
        assert!(close(series[0].avg_minutes, 2.5));
        assert!(close(series[1].avg_minutes, 1.5));
    }

    #[test]
    fn test_empty_view_aggregates() {
        let v = view(&[]);
        assert!(compute_cluster_stats(&v).is_empty());
        assert!(compute_duration_series(&v).is_empty());

        let summary = compute_view_summary(&v);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.cluster_counts, [0; 8]);
        assert!(summary.avg_features.is_none());
        assert!(summary.decades.is_empty());
    }

    #[test]
    fn test_view_summary() {
        let songs = [
            song(1969, 0, 0.2),
            song(1971, 0, 0.4),
            song(1979, 7, 0.6),
            song(2005, 3, 0.8),
        ];
        let summary = compute_view_summary(&view(&songs));
        assert_eq!(summary.total, 4);
        assert_eq!(summary.cluster_counts, [2, 0, 0, 1, 0, 0, 0, 1]);

        let avg = summary.avg_features.unwrap();
        assert!(close(avg.energy, 0.5));

        assert_eq!(
            summary.decades,
            vec![
                DecadeCount { decade: 1960, count: 1 },
                DecadeCount { decade: 1970, count: 2 },
                DecadeCount { decade: 2000, count: 1 },
            ]
        );
    }
}
