//! `kiln request`: print the compile request for an entry file.

use std::path::Path;

use kiln_compile::RequestBuilder;

use crate::project::load_project;
use crate::{GlobalArgs, RequestArgs};

/// Runs the `kiln request` command.
///
/// Prints the request as pretty JSON on stdout and its digest on stderr.
/// Nothing is compiled or cached.
pub fn run(args: &RequestArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let builder =
        RequestBuilder::new().with_search_paths(project.config.search_roots(&project.dir));

    let request = builder.create_request(Path::new(&args.entry), &args.libraries, args.optimize)?;

    println!("{}", serde_json::to_string_pretty(&request)?);
    if !global.quiet {
        eprintln!(
            "   Request {} ({} file(s))",
            request.digest(),
            request.includes.len()
        );
    }
    Ok(0)
}
