//! `kiln clean`: remove the scratch cache.

use kiln_cache::ArtifactCache;

use crate::project::load_project;
use crate::GlobalArgs;

/// Runs the `kiln clean` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let cache = ArtifactCache::new(&project.config.scratch_root(&project.dir));
    let removed = cache.clear()?;

    if !global.quiet {
        eprintln!(
            "   Removed {removed} cached request(s) from {}",
            cache.root().display()
        );
    }
    Ok(0)
}
