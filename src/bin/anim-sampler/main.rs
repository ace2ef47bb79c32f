//! anim-sampler CLI - Sample a scene description and print its animation curves.

use std::env;
use std::process;

use anim_sampler::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Curves of one exported object.
#[derive(Serialize)]
struct ObjectCurves<'a> {
    name: &'a str,
    curves: Vec<&'a AnimationCurve>,
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = args.first().map_or("anim-sampler", String::as_str);

    // Parse global flags
    let mut level = "info";
    let mut settings_path: Option<&str> = None;
    let mut positional: Vec<&str> = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "-s" | "--settings" => match iter.next() {
                Some(path) => settings_path = Some(path.as_str()),
                None => {
                    eprintln!("--settings needs a file argument");
                    process::exit(1);
                }
            },
            "-h" | "--help" | "help" => {
                print_usage(prog);
                return;
            }
            _ => positional.push(arg),
        }
    }

    init_logging(level);

    let Some(&scene_path) = positional.first() else {
        print_usage(prog);
        process::exit(1);
    };

    if let Err(e) = run(scene_path, settings_path) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn print_usage(prog: &str) {
    println!("anim-sampler - Sample scene animation into keyframe curves");
    println!();
    println!("Usage: {} [options] <scene.json>", prog);
    println!();
    println!("Options:");
    println!("  -s, --settings <file>  Export settings (JSON)");
    println!("  -v, --verbose          Debug output");
    println!("  -vv, --trace           Trace output (very verbose)");
    println!("  -q, --quiet            Errors only");
    println!("  -h, --help             Show this help");
}

fn run(scene_path: &str, settings_path: Option<&str>) -> Result<()> {
    let settings = match settings_path {
        Some(path) => ExportSettings::load(path)?,
        None => ExportSettings::default(),
    };
    let mut scene = MemoryScene::load(scene_path)?;
    let objects: Vec<ObjectId> = scene.object_ids().collect();
    info!("Loaded {} objects from {}", objects.len(), scene_path);

    if !has_any_animations(&scene, &objects) {
        info!("No keyframed objects in {}", scene_path);
        println!("[]");
        return Ok(());
    }

    let mut sampler = AnimationSampler::new();
    for &object in &objects {
        sampler.register_object(&scene, object);
    }
    let animated = classify_animated(&scene, &objects);
    info!("{} of {} objects are animated", animated.len(), objects.len());

    sampler.run_sampling_pass(&mut scene, &settings.to_options());

    let mut maps = Vec::with_capacity(animated.len());
    for &object in &animated {
        let (_, static_transform) = sampler.samples(object);
        debug!("{}: transform {}", scene.object_name(object), if static_transform { "static" } else { "animated" });

        let mut curves = sampler.build_curve_map(&scene, object);
        sampler.populate_curves(object, &mut curves, settings.mode);
        maps.push((object, curves));
    }

    let output: Vec<ObjectCurves> = maps
        .iter()
        .map(|(object, curves)| ObjectCurves {
            name: scene.object_name(*object),
            curves: curves
                .values()
                .filter(|c| settings.include_flat_channels || !c.is_flat())
                .collect(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
