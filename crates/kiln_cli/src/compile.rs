//! `kiln compile`: resolve, compile (or fetch from cache), and print the result.

use std::fmt::Write as _;
use std::path::Path;

use kiln_cache::ArtifactCache;
use kiln_compile::{CompileResponse, LocalDispatcher, Pipeline};
use kiln_config::KilnConfig;

use crate::project::load_project;
use crate::{CompileArgs, GlobalArgs, ReportFormat, EXIT_COMPILE_ERROR};

/// Runs the `kiln compile` command.
///
/// Returns exit code 0 on success and 2 when the compiler rejects the source.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut pipeline = Pipeline::new(&project.config, &project.dir)?;
    if let Some(version) = probe_version(&project.config, &project.dir) {
        pipeline = pipeline.with_fallback_version(version);
    }

    let entry = Path::new(&args.entry);
    if !global.quiet && args.format == ReportFormat::Text {
        eprintln!("   Compiling {}", entry.display());
    }

    let response = pipeline.compile(entry, &args.libraries, args.optimize)?;

    match args.format {
        ReportFormat::Text => {
            if response.is_compile_error() {
                eprintln!("{}", response.error);
            } else {
                if !global.quiet && !response.warning.is_empty() {
                    eprintln!("{}", response.warning);
                }
                print!("{}", render_text(&response));
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    if response.is_compile_error() {
        Ok(EXIT_COMPILE_ERROR)
    } else {
        Ok(0)
    }
}

/// Asks the local compiler for its version when it may be used.
///
/// The version only refines metadata stripping, so a failed probe is logged
/// and otherwise ignored.
fn probe_version(config: &KilnConfig, project_dir: &Path) -> Option<String> {
    let uses_local = config.remote.as_ref().map_or(true, |r| r.fallback_local);
    if !uses_local {
        return None;
    }
    let local = LocalDispatcher::new(
        config.compiler.binary.clone(),
        ArtifactCache::new(&config.scratch_root(project_dir)),
        config.compiler_timeout(),
    );
    match local.version() {
        Ok(version) => {
            tracing::debug!(%version, "local compiler version");
            Some(version)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not determine compiler version");
            None
        }
    }
}

fn render_text(response: &CompileResponse) -> String {
    let mut out = String::new();
    for item in &response.objects {
        let _ = writeln!(out, "{}", item.object_name);
        let _ = writeln!(out, "  bin: {}", item.bytecode);
        let _ = writeln!(out, "  abi: {}", item.abi);
    }
    out
}
