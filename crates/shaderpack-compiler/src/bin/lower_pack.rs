//! Shader pack lowering tool
//!
//! Loads a pack manifest, patches its program sources, lowers the composite
//! sequence and writes the compiled pack as JSON.

use shaderpack_compiler::{compile_pack, rendergraph::PackManifest};
use std::{env, fs, path::Path, process};
use tracing::Level;

fn main() {
    let args: Vec<String> = env::args().collect();
    let verbose = args.iter().any(|arg| arg == "-v" || arg == "--verbose");
    let positional: Vec<&String> = args.iter().skip(1).filter(|arg| !arg.starts_with('-')).collect();

    if positional.is_empty() || positional.len() > 2 {
        eprintln!("Usage: {} <manifest.yaml> [output.json] [-v]", args[0]);
        eprintln!("Compiles a shader pack manifest and dumps the lowered passes as JSON");
        eprintln!("  manifest.yaml: Path to the pack manifest");
        eprintln!("  output.json:   Optional output file (default is stdout)");
        eprintln!("  -v:            Log lowering decisions to stderr");
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let manifest_path = Path::new(positional[0]);
    if !manifest_path.exists() {
        eprintln!("Error: Manifest file '{}' does not exist", manifest_path.display());
        process::exit(1);
    }

    let manifest = match PackManifest::from_file(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error loading manifest '{}': {e}", manifest_path.display());
            process::exit(1);
        }
    };

    // Stage files are resolved relative to the manifest directory
    let manifest_dir = manifest_path.parent().unwrap_or(Path::new("."));
    let load_shader_file = |file_path: &str| fs::read_to_string(manifest_dir.join(file_path));

    let compiled = match compile_pack(&manifest, load_shader_file) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("Error compiling pack '{}': {e}", manifest.name);
            process::exit(1);
        }
    };

    for failure in &compiled.failures {
        eprintln!("Skipped program: {failure}");
    }

    let json = match serde_json::to_string_pretty(&compiled) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error serializing compiled pack: {e}");
            process::exit(1);
        }
    };

    match positional.get(1) {
        Some(output_file) => {
            if let Err(e) = fs::write(output_file, json) {
                eprintln!("Error writing output file '{output_file}': {e}");
                process::exit(1);
            }
            let screen_passes = compiled.passes.iter().filter_map(|pass| pass.as_screen()).count();
            println!("Wrote {} passes ({screen_passes} screen passes) to '{output_file}'", compiled.passes.len());
        }
        None => println!("{json}"),
    }
}
