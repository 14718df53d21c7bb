//! Read-through, write-through orchestration of a compile.

use std::path::Path;

use kiln_cache::ArtifactCache;
use kiln_config::KilnConfig;
use kiln_source::SourceNames;

use crate::dispatch::{Dispatcher, LocalDispatcher, RawOutput, RemoteDispatcher};
use crate::error::{DispatchError, ParseError, PipelineError};
use crate::metadata::{parse_compiler_version, MetadataPolicy};
use crate::parser::ResponseParser;
use crate::request::{CompileRequest, RequestBuilder};
use crate::response::CompileResponse;

/// Compiles entry files, consulting the artifact cache first.
pub struct Pipeline {
    builder: RequestBuilder,
    primary: Box<dyn Dispatcher>,
    fallback: Option<Box<dyn Dispatcher>>,
    parser: ResponseParser,
    cache: ArtifactCache,
}

impl Pipeline {
    /// Builds a pipeline from configuration.
    ///
    /// With a `[remote]` section the remote service is the primary
    /// dispatcher, and the local compiler backs it up when
    /// `fallback_local` is set. Otherwise the local compiler is used.
    pub fn new(config: &KilnConfig, project_dir: &Path) -> Result<Self, PipelineError> {
        let cache = ArtifactCache::new(&config.scratch_root(project_dir));
        let local = LocalDispatcher::new(
            config.compiler.binary.clone(),
            cache.clone(),
            config.compiler_timeout(),
        );

        let (primary, fallback): (Box<dyn Dispatcher>, Option<Box<dyn Dispatcher>>) =
            match &config.remote {
                Some(remote) => {
                    let dispatcher =
                        RemoteDispatcher::new(remote.url.clone(), config.remote_timeout().unwrap_or_default())?;
                    let fallback = remote
                        .fallback_local
                        .then(|| Box::new(local) as Box<dyn Dispatcher>);
                    (Box::new(dispatcher), fallback)
                }
                None => (Box::new(local), None),
            };

        Ok(Self {
            builder: RequestBuilder::new().with_search_paths(config.search_roots(project_dir)),
            primary,
            fallback,
            parser: ResponseParser::new(MetadataPolicy::from_config(&config.metadata.strip)),
            cache,
        })
    }

    /// Assembles a pipeline from parts.
    pub fn from_parts(
        builder: RequestBuilder,
        dispatcher: impl Dispatcher + 'static,
        parser: ResponseParser,
        cache: ArtifactCache,
    ) -> Self {
        Self {
            builder,
            primary: Box::new(dispatcher),
            fallback: None,
            parser,
            cache,
        }
    }

    /// Replaces the dispatcher. Any fallback is dropped.
    pub fn with_dispatcher(mut self, dispatcher: impl Dispatcher + 'static) -> Self {
        self.primary = Box::new(dispatcher);
        self.fallback = None;
        self
    }

    /// Sets the dispatcher tried when the primary one is unreachable.
    pub fn with_fallback(mut self, dispatcher: impl Dispatcher + 'static) -> Self {
        self.fallback = Some(Box::new(dispatcher));
        self
    }

    /// Compiler version assumed when the output does not report one.
    pub fn with_fallback_version(mut self, version: impl Into<String>) -> Self {
        self.parser = self.parser.with_fallback_version(version);
        self
    }

    /// The artifact cache.
    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    /// Builds the request for `entry` without compiling it.
    pub fn request(
        &self,
        entry: &Path,
        libraries: &str,
        optimize: bool,
    ) -> Result<CompileRequest, PipelineError> {
        Ok(self.builder.create_request(entry, libraries, optimize)?)
    }

    /// Compiles `entry`.
    ///
    /// A rejected source yields `Ok` with a populated `error`. Only accepted
    /// sources are cached. When the compiler version is known, a cached
    /// result from a different release is treated as a miss. Include keys
    /// in `warning` and `error` are replaced with the paths the sources were
    /// read from.
    pub fn compile(
        &self,
        entry: &Path,
        libraries: &str,
        optimize: bool,
    ) -> Result<CompileResponse, PipelineError> {
        let prepared = self.builder.prepare(entry, libraries, optimize)?;
        let digest = prepared.request.digest();

        if let Some(cached) = self.cache.get_entry::<CompileResponse>(&digest) {
            match self.parser.fallback_version() {
                Some(expected) if !same_compiler(&cached.compiler_version, expected) => {
                    tracing::info!(
                        entry = %entry.display(),
                        %digest,
                        cached = %cached.compiler_version,
                        expected,
                        "cached result is from another compiler"
                    );
                }
                _ => {
                    tracing::info!(entry = %entry.display(), %digest, "cache hit");
                    return Ok(restore_names(cached.value, &prepared.names));
                }
            }
        } else {
            tracing::info!(entry = %entry.display(), %digest, "cache miss");
        }

        let raw = self.dispatch(&prepared.request)?;
        let response = self.parser.parse(&raw).map_err(|ParseError::Decode { warning, reason }| {
            ParseError::Decode {
                warning: prepared.names.restore(&warning),
                reason,
            }
        })?;

        if response.is_compile_error() {
            tracing::info!(entry = %entry.display(), "compiler rejected source");
        } else {
            self.cache.put(&digest, &response, &response.version)?;
        }

        Ok(restore_names(response, &prepared.names))
    }

    /// Removes every cached result and scratch directory.
    pub fn clear_cache(&self) -> Result<usize, PipelineError> {
        Ok(self.cache.clear()?)
    }

    fn dispatch(&self, request: &CompileRequest) -> Result<RawOutput, DispatchError> {
        tracing::debug!(target_compiler = %self.primary.describe(), "dispatching");
        match self.primary.send(request) {
            Err(err @ DispatchError::RemoteUnavailable { .. }) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(error = %err, fallback = %fallback.describe(), "falling back");
                    fallback.send(request)
                }
                None => Err(err),
            },
            other => other,
        }
    }
}

/// Whether two compiler version strings name the same release. Strings that
/// do not parse must match exactly.
fn same_compiler(cached: &str, expected: &str) -> bool {
    match (parse_compiler_version(cached), parse_compiler_version(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => cached == expected,
    }
}

fn restore_names(mut response: CompileResponse, names: &SourceNames) -> CompileResponse {
    response.warning = names.restore(&response.warning);
    response.error = names.restore(&response.error);
    response
}
