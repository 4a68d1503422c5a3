mod options;
mod progress;
mod scene;

use anyhow::Error as AnyError;
use clap::Parser;
use log::{info, warn};
use options::{Cli, Command as CliCmd};
use rayon::prelude::*;
use scene::Scene;
use serde::Serialize;
use std::io::Write;
use textplots::{Chart, Plot, Shape};
use xsection::{CrossSection, Marker, Reflection, ReflectionFinder, TriangleCache};

/// A cross-section together with what it connects.
struct Labeled {
    receiver: usize,
    source: usize,
    reflection: Option<Reflection>,
    section: CrossSection,
}

fn main() -> Result<(), AnyError> {
    let Cli {
        scene,
        source_height,
        receiver_height,
        min_height_diff,
        max_path,
        radius,
        no_reflections,
        simplify,
        cmd,
    } = Cli::parse();

    env_logger::init();

    let world = Scene::load(&scene)?.into_world()?;
    info!(
        "scene; triangles: {}, receivers: {}, sources: {}",
        world.mesh.len(),
        world.receivers.len(),
        world.sources.len()
    );

    let finder = ReflectionFinder::new()
        .min_height_difference(min_height_diff)
        .max_path_length(max_path);
    let cache = TriangleCache::new();
    let pb = progress::bar(
        "Extracting cross-sections".to_string(),
        world.receivers.len() as u64,
    )?;

    let mut sections: Vec<Labeled> = world
        .receivers
        .par_iter()
        .enumerate()
        .flat_map_iter(|(receiver_idx, receiver)| {
            let mut out = Vec::new();
            let receiver_triangle = match cache.locate(&world.mesh, &world.vertices, *receiver) {
                Ok(tri) => tri,
                Err(e) => {
                    warn!("receiver {receiver_idx}: {e}");
                    pb.inc(1);
                    return out;
                }
            };
            let template = CrossSection::builder()
                .receiver_triangle(receiver_triangle)
                .source_height(source_height)
                .receiver_height(receiver_height);

            for (source_idx, source) in world.sources.iter().enumerate() {
                let label = |reflection, section: CrossSection| Labeled {
                    receiver: receiver_idx,
                    source: source_idx,
                    reflection,
                    section: match simplify {
                        Some(threshold) => section.simplify(threshold),
                        None => section,
                    },
                };

                match template
                    .clone()
                    .receiver(*receiver)
                    .source(*source)
                    .build(&world.mesh, &world.attributes)
                {
                    Ok(section) => out.push(label(None, section)),
                    Err(e) => warn!("receiver {receiver_idx}, source {source_idx}: {e}"),
                }

                if no_reflections {
                    continue;
                }
                let path = match finder.first_order_near(
                    &world.footprints,
                    radius,
                    *source,
                    *receiver,
                    &world.mesh,
                    &world.attributes,
                ) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("receiver {receiver_idx}, source {source_idx}, reflections: {e}");
                        continue;
                    }
                };
                for (reflection, section) in path
                    .reflections()
                    .iter()
                    .zip(path.cross_sections(&template, &world.mesh, &world.attributes))
                {
                    match section {
                        Ok(section) => out.push(label(Some(*reflection), section)),
                        Err(e) => warn!(
                            "receiver {receiver_idx}, source {source_idx}, building {}: {e}",
                            reflection.building
                        ),
                    }
                }
            }
            pb.inc(1);
            out
        })
        .collect();
    pb.finish_and_clear();

    sections.sort_by_key(|l| (l.receiver, l.source, l.reflection.map(|r| (r.building, r.wall))));

    match cmd {
        CliCmd::Display => display(&sections)?,
        CliCmd::Csv => print_csv(&sections)?,
        CliCmd::Json => print_json(&sections)?,
        CliCmd::Plot => plot_ascii(&sections),
    };
    Ok(())
}

fn describe(labeled: &Labeled) -> String {
    match labeled.reflection {
        None => format!("receiver {} <- source {}", labeled.receiver, labeled.source),
        Some(r) => format!(
            "receiver {} <- building {} wall {} <- source {}",
            labeled.receiver, r.building, r.wall, labeled.source
        ),
    }
}

fn marker_label(marker: Option<&Marker>) -> String {
    match marker {
        None => String::new(),
        Some(Marker::Source { height }) => format!("source({height})"),
        Some(Marker::Receiver { height }) => format!("receiver({height})"),
        Some(Marker::Wall { height, material }) => format!("wall({height},{material})"),
    }
}

fn display(sections: &[Labeled]) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    for labeled in sections {
        writeln!(stdout, "{}", describe(labeled))?;
        let section = &labeled.section;
        for (idx, ((v, material), distance)) in section
            .samples()
            .iter()
            .zip(section.distances())
            .enumerate()
        {
            writeln!(
                stdout,
                "{idx:4}: {distance:10.2} {:12.2} {:12.2} {:8.2} {material:>2} {}",
                v.x,
                v.y,
                v.z,
                marker_label(section.markers().get(&idx))
            )?;
        }
    }
    Ok(())
}

/// # Example with gnuplot
///
/// ```sh
/// cargo run -- --scene=scene.json --no-reflections csv | tr ',' ' ' > /tmp/plot && gnuplot -p -e "plot '/tmp/plot' using 5:8 with lines"
/// ```
fn print_csv(sections: &[Labeled]) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "Receiver,Source,Building,Wall,Index,Distance,X,Y,Z,Material,Marker"
    )?;
    for labeled in sections {
        let (building, wall) = labeled
            .reflection
            .map_or((String::new(), String::new()), |r| {
                (r.building.to_string(), r.wall.to_string())
            });
        let section = &labeled.section;
        for (idx, ((v, material), distance)) in section
            .samples()
            .iter()
            .zip(section.distances())
            .enumerate()
        {
            writeln!(
                stdout,
                "{},{},{building},{wall},{idx},{distance},{},{},{},{material},{}",
                labeled.receiver,
                labeled.source,
                v.x,
                v.y,
                v.z,
                marker_label(section.markers().get(&idx))
            )?;
        }
    }
    Ok(())
}

fn print_json(sections: &[Labeled]) -> Result<(), AnyError> {
    #[derive(Serialize)]
    #[serde(rename_all = "snake_case")]
    enum JsonMarker {
        Source { height: f64 },
        Receiver { height: f64 },
        Wall { height: f64, material: String },
    }

    #[derive(Serialize)]
    struct JsonSample {
        location: [f64; 2],
        distance: f64,
        elevation: f64,
        material: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        marker: Option<JsonMarker>,
    }

    #[derive(Serialize)]
    struct JsonEntry {
        receiver: usize,
        source: usize,
        reflection: Option<[f64; 2]>,
        samples: Vec<JsonSample>,
    }

    let reshaped: Vec<JsonEntry> = sections
        .iter()
        .map(|labeled| {
            let section = &labeled.section;
            let samples = section
                .samples()
                .iter()
                .zip(section.distances())
                .enumerate()
                .map(|(idx, ((v, material), distance))| JsonSample {
                    location: [v.x, v.y],
                    distance,
                    elevation: v.z,
                    material: material.to_string(),
                    marker: section.markers().get(&idx).map(|marker| match *marker {
                        Marker::Source { height } => JsonMarker::Source { height },
                        Marker::Receiver { height } => JsonMarker::Receiver { height },
                        Marker::Wall { height, material } => JsonMarker::Wall {
                            height,
                            material: material.to_string(),
                        },
                    }),
                })
                .collect();
            JsonEntry {
                receiver: labeled.receiver,
                source: labeled.source,
                reflection: labeled.reflection.map(|r| [r.point.x, r.point.y]),
                samples,
            }
        })
        .collect();
    let json = serde_json::to_string(&reshaped)?;
    println!("{json}");
    Ok(())
}

fn plot_ascii(sections: &[Labeled]) {
    for labeled in sections {
        println!("{}", describe(labeled));
        #[allow(clippy::cast_possible_truncation)]
        let plot_data: Vec<(f32, f32)> = labeled
            .section
            .distances()
            .into_iter()
            .zip(labeled.section.samples())
            .map(|(distance, (v, _))| (distance as f32, v.z as f32))
            .collect();
        let end = plot_data.last().map_or(1.0, |(d, _)| d.max(1.0));
        Chart::new(300, 150, 0.0, end)
            .lineplot(&Shape::Lines(&plot_data))
            .display();
    }
}
