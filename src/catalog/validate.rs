use super::{CLUSTER_COUNT, Features, MAX_YEAR, MIN_YEAR, SongRecord};
use rayon::prelude::*;
use serde::Deserialize;
use std::fmt;

/// A record as it appears in the input file, before any invariant is checked.
#[derive(Debug, Deserialize)]
struct RawSong {
    id: Option<serde_json::Value>,
    name: Option<String>,
    artist: Option<String>,
    year: Option<i64>,
    duration_ms: Option<i64>,
    cluster: Option<i64>,
    features: Option<RawFeatures>,
    position: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawFeatures {
    danceability: Option<f64>,
    energy: Option<f64>,
    valence: Option<f64>,
}

/// Why an input record was left out of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    /// Wrong JSON shape or field type.
    Malformed(String),
    MissingField(&'static str),
    YearOutOfRange(i64),
    ClusterOutOfRange(i64),
    FeatureOutOfRange { feature: &'static str, value: f64 },
    NonPositiveDuration(i64),
    BadPosition,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed record: {msg}"),
            Self::MissingField(field) => write!(f, "missing field `{field}`"),
            Self::YearOutOfRange(y) => {
                write!(f, "year {y} outside {MIN_YEAR}..={MAX_YEAR}")
            }
            Self::ClusterOutOfRange(c) => {
                write!(f, "cluster {c} outside 0..{CLUSTER_COUNT}")
            }
            Self::FeatureOutOfRange { feature, value } => {
                write!(f, "{feature} = {value} outside [0, 1]")
            }
            Self::NonPositiveDuration(d) => write!(f, "duration_ms {d} is not positive"),
            Self::BadPosition => write!(f, "position must be 3 finite numbers"),
        }
    }
}

/// A skipped record: its index in the input array and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectReason,
}

/// Validate every item in parallel, keeping input order for the survivors.
pub(super) fn validate_all(items: Vec<serde_json::Value>) -> (Vec<SongRecord>, Vec<Rejection>) {
    let results: Vec<(usize, Result<SongRecord, RejectReason>)> = items
        .into_par_iter()
        .enumerate()
        .map(|(index, item)| (index, validate_value(index, item)))
        .collect();

    let mut songs = Vec::with_capacity(results.len());
    let mut rejections = Vec::new();
    for (index, result) in results {
        match result {
            Ok(song) => songs.push(song),
            Err(reason) => rejections.push(Rejection { index, reason }),
        }
    }
    (songs, rejections)
}

fn validate_value(index: usize, item: serde_json::Value) -> Result<SongRecord, RejectReason> {
    let raw: RawSong =
        serde_json::from_value(item).map_err(|e| RejectReason::Malformed(e.to_string()))?;
    validate(index, raw)
}

fn validate(index: usize, raw: RawSong) -> Result<SongRecord, RejectReason> {
    let name = raw.name.ok_or(RejectReason::MissingField("name"))?;
    let artist = raw.artist.ok_or(RejectReason::MissingField("artist"))?;

    let year = raw.year.ok_or(RejectReason::MissingField("year"))?;
    if year < i64::from(MIN_YEAR) || year > i64::from(MAX_YEAR) {
        return Err(RejectReason::YearOutOfRange(year));
    }

    let duration_ms = raw.duration_ms.ok_or(RejectReason::MissingField("duration_ms"))?;
    if duration_ms <= 0 {
        return Err(RejectReason::NonPositiveDuration(duration_ms));
    }

    let cluster = raw.cluster.ok_or(RejectReason::MissingField("cluster"))?;
    if cluster < 0 || cluster >= i64::from(CLUSTER_COUNT) {
        return Err(RejectReason::ClusterOutOfRange(cluster));
    }

    let features = raw.features.ok_or(RejectReason::MissingField("features"))?;
    let features = Features {
        danceability: unit_feature("danceability", features.danceability)?,
        energy: unit_feature("energy", features.energy)?,
        valence: unit_feature("valence", features.valence)?,
    };

    let position = raw.position.ok_or(RejectReason::MissingField("position"))?;
    let position: [f64; 3] = position
        .try_into()
        .map_err(|_| RejectReason::BadPosition)?;
    if position.iter().any(|c| !c.is_finite()) {
        return Err(RejectReason::BadPosition);
    }

    let id = match raw.id {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => index.to_string(),
    };

    Ok(SongRecord {
        id,
        name,
        artist,
        // Range-checked above
        year: year as i32,
        duration_ms: duration_ms as u64,
        cluster: cluster as u8,
        features,
        position,
    })
}

fn unit_feature(feature: &'static str, value: Option<f64>) -> Result<f64, RejectReason> {
    let value = value.ok_or(RejectReason::MissingField(feature))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(RejectReason::FeatureOutOfRange { feature, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn good() -> serde_json::Value {
        json!({
            "name": "Heroes",
            "artist": "David Bowie",
            "year": 1977,
            "duration_ms": 371000,
            "cluster": 6,
            "features": {"danceability": 0.49, "energy": 0.75, "valence": 0.48},
            "position": [0.5, -1.25, 2.0]
        })
    }

    fn reject(value: serde_json::Value) -> RejectReason {
        validate_value(0, value).unwrap_err()
    }

    #[test]
    fn test_valid_record() {
        let song = validate_value(7, good()).unwrap();
        assert_eq!(song.id, "7");
        assert_eq!(song.year, 1977);
        assert_eq!(song.cluster, 6);
        assert_eq!(song.position, [0.5, -1.25, 2.0]);
    }

    #[test]
    fn test_numeric_id_is_stringified() {
        let mut v = good();
        v["id"] = json!(42);
        assert_eq!(validate_value(0, v).unwrap().id, "42");
    }

    #[test]
    fn test_year_bounds() {
        let mut v = good();
        v["year"] = json!(1919);
        assert_eq!(reject(v), RejectReason::YearOutOfRange(1919));

        let mut v = good();
        v["year"] = json!(2021);
        assert_eq!(reject(v), RejectReason::YearOutOfRange(2021));

        let mut v = good();
        v["year"] = json!(2020);
        assert!(validate_value(0, v).is_ok());
    }

    #[test]
    fn test_cluster_bounds() {
        let mut v = good();
        v["cluster"] = json!(8);
        assert_eq!(reject(v), RejectReason::ClusterOutOfRange(8));

        let mut v = good();
        v["cluster"] = json!(-1);
        assert_eq!(reject(v), RejectReason::ClusterOutOfRange(-1));
    }

    #[test]
    fn test_feature_bounds() {
        let mut v = good();
        v["features"]["valence"] = json!(1.5);
        assert_eq!(
            reject(v),
            RejectReason::FeatureOutOfRange { feature: "valence", value: 1.5 }
        );
    }

    #[test]
    fn test_missing_fields() {
        let mut v = good();
        v.as_object_mut().unwrap().remove("duration_ms");
        assert_eq!(reject(v), RejectReason::MissingField("duration_ms"));

        let mut v = good();
        v["features"].as_object_mut().unwrap().remove("energy");
        assert_eq!(reject(v), RejectReason::MissingField("energy"));
    }

    #[test]
    fn test_duration_must_be_positive() {
        let mut v = good();
        v["duration_ms"] = json!(0);
        assert_eq!(reject(v), RejectReason::NonPositiveDuration(0));
    }

    #[test]
    fn test_position_shape() {
        let mut v = good();
        v["position"] = json!([1.0, 2.0]);
        assert_eq!(reject(v), RejectReason::BadPosition);
    }

    #[test]
    fn test_mistyped_field_is_malformed() {
        let mut v = good();
        v["year"] = json!("nineteen seventy-seven");
        assert!(matches!(reject(v), RejectReason::Malformed(_)));
    }

    #[test]
    fn test_validate_all_preserves_order() {
        let mut bad = good();
        bad["cluster"] = json!(99);
        let mut second = good();
        second["name"] = json!("Second");
        let (songs, rejections) = validate_all(vec![good(), bad, second]);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].name, "Second");
        assert_eq!(songs[1].id, "2");
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].index, 1);
    }
}
