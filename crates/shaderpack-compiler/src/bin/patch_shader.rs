//! Shader source patching tool
//!
//! Applies one source transform to a single GLSL stage file and prints the
//! patched source to stdout.

use shaderpack_compiler::transform::{AttributeParameters, InputAvailability, Patch, ShaderStage, TransformPatcher};
use std::{env, fs, process};
use tracing::Level;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <patch> <shader_file> [stage] [--geometry] [--inputs=texture,lightmap,overlay] [-v]");
    eprintln!("Patches a GLSL stage source and prints the result");
    eprintln!("  patch:       One of attributes, terrain, composite_depth");
    eprintln!("  stage:       vertex, geometry or fragment (required for attributes and terrain)");
    eprintln!("  --geometry:  The program has a geometry stage (attributes only)");
    eprintln!("  --inputs:    Comma separated vertex inputs the renderer supplies (attributes only)");
    eprintln!("  -v:          Trace patch input, output and timing to stderr");
    process::exit(1);
}

fn parse_inputs(list: &str) -> Result<InputAvailability, String> {
    let mut inputs = InputAvailability::default();
    for input in list.split(',').map(str::trim).filter(|input| !input.is_empty()) {
        match input {
            "texture" => inputs.texture = true,
            "lightmap" => inputs.lightmap = true,
            "overlay" => inputs.overlay = true,
            other => return Err(format!("unknown vertex input '{other}'")),
        }
    }
    Ok(inputs)
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let mut positional = Vec::new();
    let mut has_geometry = false;
    let mut inputs = InputAvailability::default();
    let mut verbose = false;

    for arg in args.iter().skip(1) {
        if arg == "--geometry" {
            has_geometry = true;
        } else if arg == "-v" || arg == "--verbose" {
            verbose = true;
        } else if let Some(list) = arg.strip_prefix("--inputs=") {
            inputs = parse_inputs(list).unwrap_or_else(|e| {
                eprintln!("Error: {e}");
                usage(&args[0]);
            });
        } else if arg.starts_with('-') {
            usage(&args[0]);
        } else {
            positional.push(arg.as_str());
        }
    }

    if !(2..=3).contains(&positional.len()) {
        usage(&args[0]);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::TRACE } else { Level::WARN })
        .init();

    let stage = positional.get(2).map(|stage| stage.parse::<ShaderStage>());
    let stage = match stage {
        Some(Ok(stage)) => Some(stage),
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        None => None,
    };

    let patch = match (positional[0], stage) {
        ("attributes", Some(stage)) => Patch::Attributes(AttributeParameters { stage, has_geometry, inputs }),
        ("terrain", Some(stage)) => Patch::Terrain { stage },
        ("composite_depth", _) => Patch::CompositeDepth,
        ("attributes" | "terrain", None) => {
            eprintln!("Error: the {} patch requires a stage", positional[0]);
            process::exit(1);
        }
        _ => usage(&args[0]),
    };

    let shader_file = positional[1];
    let source = match fs::read_to_string(shader_file) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading shader file '{shader_file}': {e}");
            process::exit(1);
        }
    };

    let patcher = TransformPatcher::new();
    let patched = match patch {
        Patch::Attributes(parameters) => patcher.patch_attributes(&source, parameters.stage, parameters.has_geometry, parameters.inputs),
        Patch::Terrain { stage } => patcher.patch_terrain(&source, stage),
        Patch::CompositeDepth => patcher.patch_composite_depth(&source),
    };

    match patched {
        Ok(patched) => print!("{patched}"),
        Err(e) => {
            eprintln!("Error patching '{shader_file}' with {patch}: {e}");
            process::exit(1);
        }
    }
}
