use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use song_galaxy::aggregate::{self, ClusterStat, RadarRow, ViewSummary, YearDurationPoint};
use song_galaxy::catalog::{FilteredView, SongCatalog, YearRange};
use song_galaxy::hit_test::{PointIndex, Ray};
use song_galaxy::palette;
use song_galaxy::point_cloud;
use song_galaxy::replay::{self, FrameRecord, Script};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "song-galaxy", version, about = "Song galaxy point cloud and chart aggregates")]
struct Cli {
    /// Path to the catalog JSON file
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// First year of the filter (inclusive)
    #[arg(long, global = true)]
    from: Option<i32>,

    /// Last year of the filter (inclusive)
    #[arg(long, global = true)]
    to: Option<i32>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    format: OutputFormat,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-cluster song counts and average features, plus radar rows
    Clusters {
        /// Only include these cluster ids in the radar rows (e.g. 0,3,5)
        #[arg(long, value_delimiter = ',')]
        only: Vec<u8>,
    },

    /// Average song duration per year
    Durations,

    /// Cluster histogram, overall averages and songs per decade
    Summary,

    /// Dump point cloud buffers
    Points {
        /// Number of points to print (table format only)
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Find the song under a pointer ray
    Pick {
        /// Ray origin as x,y,z
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        origin: Vec<f32>,

        /// Ray direction as x,y,z
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        direction: Vec<f32>,

        /// Scene rotation about Y in radians
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        angle: f64,
    },

    /// Replay an interaction script (JSON or YAML) through a scene
    Replay {
        /// Script file
        script: PathBuf,
    },
}

#[derive(Serialize)]
struct ClusterReport<'a> {
    clusters: &'a [ClusterStat],
    radar: &'a [RadarRow],
}

#[derive(Serialize)]
struct PickReport {
    index: usize,
    id: String,
    name: String,
    artist: String,
    year: i32,
    distance_to_ray: f32,
    distance_along_ray: f32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = song_galaxy::config::AppConfig::load();

    // Resolve catalog path: CLI > config > XDG default
    let catalog_path = cli
        .catalog
        .or(config.catalog_path.clone())
        .unwrap_or_else(song_galaxy::config::default_catalog_path);

    let (catalog, report) = SongCatalog::load(&catalog_path, config.workers)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    if report.skipped > 0 {
        eprintln!(
            "Loaded {} songs ({} invalid records skipped)",
            report.loaded, report.skipped
        );
    }

    let defaults = config.year_range();
    let years = YearRange::new(
        cli.from.unwrap_or(defaults.from),
        cli.to.unwrap_or(defaults.to),
    );
    let view = catalog.filter(years);
    log::info!("{} of {} songs in {}..={}", view.len(), catalog.len(), years.from, years.to);

    match cli.command {
        Commands::Clusters { only } => {
            let mut stats = aggregate::compute_cluster_stats(&view);
            let all_stats = stats.clone();
            if !only.is_empty() {
                stats.retain(|s| only.contains(&s.cluster_id));
            }
            let radar = aggregate::compute_radar_series(&stats);

            match cli.format {
                OutputFormat::Table => {
                    if all_stats.is_empty() {
                        println!("No songs in {}..={}.", years.from, years.to);
                        return Ok(());
                    }
                    print_cluster_table(&all_stats);
                    println!();
                    print_radar_table(&radar);
                }
                format => emit(format, &ClusterReport { clusters: &all_stats, radar: &radar })?,
            }
        }

        Commands::Durations => {
            let series = aggregate::compute_duration_series(&view);
            match cli.format {
                OutputFormat::Table => {
                    if series.is_empty() {
                        println!("No songs in {}..={}.", years.from, years.to);
                        return Ok(());
                    }
                    print_duration_table(&series);
                }
                format => emit(format, &series)?,
            }
        }

        Commands::Summary => {
            let summary = aggregate::compute_view_summary(&view);
            match cli.format {
                OutputFormat::Table => print_summary(&summary, years),
                format => emit(format, &summary)?,
            }
        }

        Commands::Points { limit } => {
            let buffers = point_cloud::build_point_cloud(&view);
            match cli.format {
                OutputFormat::Table => print_points(&view, &buffers, limit),
                format => emit(format, &buffers)?,
            }
        }

        Commands::Pick { origin, direction, angle } => {
            let ray = Ray::new(triple(&origin)?, triple(&direction)?).to_local(angle);
            let buffers = point_cloud::build_point_cloud(&view);
            let hit = buffers.nearest_hit(&ray, config.scene_settings().hit_radius);

            let Some(hit) = hit else {
                match cli.format {
                    OutputFormat::Table => println!("Nothing under the ray."),
                    format => emit(format, &Option::<PickReport>::None)?,
                }
                return Ok(());
            };
            let song = view
                .get(hit.index)
                .context("Hit index outside the filtered view")?;
            let picked = PickReport {
                index: hit.index,
                id: song.id.clone(),
                name: song.name.clone(),
                artist: song.artist.clone(),
                year: song.year,
                distance_to_ray: hit.distance_to_ray,
                distance_along_ray: hit.distance_along_ray,
            };

            match cli.format {
                OutputFormat::Table => {
                    println!("{} — {} ({})", picked.name, picked.artist, picked.year);
                    println!(
                        "  index {}  cluster {} ({})  {:.3} from ray, {:.2} along",
                        picked.index,
                        song.cluster,
                        palette::cluster_label(song.cluster),
                        picked.distance_to_ray,
                        picked.distance_along_ray
                    );
                }
                format => emit(format, &Some(picked))?,
            }
        }

        Commands::Replay { script } => {
            let parsed = Script::from_path(&script)
                .with_context(|| format!("Failed to read script {}", script.display()))?;
            let records = replay::run(&catalog, years, config.scene_settings(), &parsed);
            match cli.format {
                OutputFormat::Table => print_replay(&records),
                format => emit(format, &records)?,
            }
        }
    }

    Ok(())
}

fn triple(v: &[f32]) -> Result<[f32; 3]> {
    match v {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => anyhow::bail!("Expected 3 comma-separated numbers, got {}", v.len()),
    }
}

/// Print a serializable value as JSON or YAML.
fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Table => anyhow::bail!("table output has no serialized form"),
    }
    Ok(())
}

fn print_cluster_table(stats: &[ClusterStat]) {
    println!(
        "{:<3} {:<16} {:>7}  {:>6} {:>6} {:>6}  {}",
        "Id", "Cluster", "Songs", "Dnc%", "Eng%", "Val%", "Color"
    );
    println!("{}", "-".repeat(60));

    for s in stats {
        println!(
            "{:<3} {:<16} {:>7}  {:>6.1} {:>6.1} {:>6.1}  {}",
            s.cluster_id,
            palette::cluster_label(s.cluster_id),
            s.count,
            s.avg_danceability_pct,
            s.avg_energy_pct,
            s.avg_valence_pct,
            palette::cluster_hex(s.cluster_id),
        );
    }
}

fn print_radar_table(rows: &[RadarRow]) {
    let Some(first) = rows.first() else {
        println!("No clusters selected for the radar chart.");
        return;
    };

    print!("{:<14}", "Feature");
    for id in first.values.keys() {
        print!(" {:>6}", format!("C{id}"));
    }
    println!();
    println!("{}", "-".repeat(14 + first.values.len() * 7));

    for row in rows {
        print!("{:<14}", row.feature.label());
        for v in row.values.values() {
            print!(" {v:>6.1}");
        }
        println!();
    }
}

fn print_duration_table(series: &[YearDurationPoint]) {
    println!("{:<6} {:>8}", "Year", "Minutes");
    println!("{}", "-".repeat(15));
    for p in series {
        println!("{:<6} {:>8.2}", p.year, p.avg_minutes);
    }
}

fn print_summary(summary: &ViewSummary, years: YearRange) {
    println!("Songs {}..={}: {}", years.from, years.to, summary.total);
    println!("==================");
    let Some(avg) = summary.avg_features else {
        return;
    };
    println!();

    println!("Clusters:");
    for (id, count) in summary.cluster_counts.iter().enumerate() {
        let id = id as u8;
        println!("  C{} {:<16} {}", id, palette::cluster_label(id), count);
    }
    println!();

    println!("Average features:");
    println!("  Danceability  {:>3.0}%", avg.danceability * 100.0);
    println!("  Energy        {:>3.0}%", avg.energy * 100.0);
    println!("  Valence       {:>3.0}%", avg.valence * 100.0);
    println!();

    println!("Decades:");
    for d in &summary.decades {
        println!("  {}s  {}", d.decade, d.count);
    }
}

fn print_points(view: &FilteredView<'_>, buffers: &point_cloud::PointCloudBuffers, limit: usize) {
    println!(
        "{:<25} {:>8} {:>8} {:>8}  {:>5} {:>5} {:>5}  {:>5}",
        "Song", "X", "Y", "Z", "R", "G", "B", "Size"
    );
    println!("{}", "-".repeat(80));

    for i in 0..buffers.len().min(limit) {
        let (Some(p), Some(c), Some(song)) = (buffers.position(i), buffers.color(i), view.get(i)) else {
            break;
        };
        // Truncate long titles
        let title: String = if song.name.chars().count() > 25 {
            format!("{}...", song.name.chars().take(22).collect::<String>())
        } else {
            song.name.clone()
        };
        println!(
            "{:<25} {:>8.3} {:>8.3} {:>8.3}  {:>5.3} {:>5.3} {:>5.3}  {:>5.2}",
            title, p[0], p[1], p[2], c[0], c[1], c[2], buffers.scales[i]
        );
    }

    if buffers.len() > limit {
        println!("... {} more", buffers.len() - limit);
    }
}

fn print_replay(records: &[FrameRecord]) {
    println!(
        "{:>7}  {:<28} {:<30} {:>6} {:>9}",
        "At(ms)", "State", "Hovered", "Timer", "Angle"
    );
    println!("{}", "-".repeat(86));

    for r in records {
        let state = match r.state {
            song_galaxy::interaction::InteractionState::Idle => "Idle".to_string(),
            song_galaxy::interaction::InteractionState::Hovering { index } => {
                format!("Hovering({index})")
            }
            song_galaxy::interaction::InteractionState::Paused { index, deadline } => {
                format!("Paused({index}, until {}ms)", deadline.as_millis())
            }
        };
        println!(
            "{:>7}  {:<28} {:<30} {:>6} {:>9.4}",
            r.at_ms,
            state,
            r.hovered.as_deref().unwrap_or("-"),
            r.timers,
            r.angle
        );
    }
}
