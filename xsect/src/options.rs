use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Extract acoustic cross-sections between every receiver and source
/// of a scene.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Scene JSON file (mesh, buildings, ground types, receivers and
    /// sources).
    #[arg(short, long)]
    pub scene: PathBuf,

    /// Source height above terrain, in meters.
    #[arg(long, default_value_t = 0.05)]
    pub source_height: f64,

    /// Receiver height above terrain, in meters.
    #[arg(long, default_value_t = 2.0)]
    pub receiver_height: f64,

    /// How much taller a neighboring building must be to hide a
    /// reflecting wall, in meters.
    #[arg(long, default_value_t = 1.0)]
    pub min_height_diff: f64,

    /// Maximum reflected path length, in meters.
    #[arg(long, default_value_t = 2000.0)]
    pub max_path: f64,

    /// Search radius around each receiver for reflecting buildings, in
    /// meters.
    #[arg(short, long, default_value_t = 2000.0)]
    pub radius: f64,

    /// Only compute direct paths.
    #[arg(long, default_value_t = false)]
    pub no_reflections: bool,

    /// Douglas-Peucker threshold applied to every cross-section.
    #[arg(long)]
    pub simplify: Option<f64>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print samples to stdout.
    Display,

    /// Print samples as CSV to stdout.
    Csv,

    /// Print cross-sections as JSON to stdout.
    Json,

    /// Plot each cross-section to terminal.
    Plot,
}
