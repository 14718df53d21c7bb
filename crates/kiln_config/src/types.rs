//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// Default local compiler binary.
pub const DEFAULT_COMPILER_BINARY: &str = "solc";

/// Default bound on a local compiler run, in seconds.
pub const DEFAULT_COMPILER_TIMEOUT_SECS: u64 = 60;

/// Default bound on a remote compile call, in seconds.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Default scratch directory, relative to the project directory.
pub const DEFAULT_SCRATCH_DIR: &str = ".kiln/scratch";

/// The top-level configuration parsed from `kiln.toml`.
///
/// Every section is optional; an empty file yields the same configuration as
/// [`KilnConfig::default`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct KilnConfig {
    /// Local compiler settings.
    #[serde(default)]
    pub compiler: CompilerConfig,
    /// Remote compilation service. When present, requests go remote first.
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    /// Scratch cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Import resolution settings.
    #[serde(default)]
    pub resolve: ResolveConfig,
    /// Bytecode metadata stripping overrides.
    #[serde(default)]
    pub metadata: MetadataConfig,
}

/// Settings for the locally installed compiler.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Compiler executable name or path.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Maximum wall-clock time for one compiler run.
    #[serde(default = "default_compiler_timeout")]
    pub timeout_secs: u64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: DEFAULT_COMPILER_TIMEOUT_SECS,
        }
    }
}

/// Settings for a remote compilation service.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// Endpoint receiving serialized compile requests.
    pub url: String,
    /// Maximum wall-clock time for one remote call.
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
    /// Compile locally when the service cannot be reached.
    #[serde(default)]
    pub fallback_local: bool,
}

/// Scratch cache location.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root of the scratch cache, relative to the project directory unless absolute.
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
        }
    }
}

/// Import resolution settings.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Directories searched for non-relative imports, in order.
    ///
    /// Accepts either a single string or a list of strings.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub search_paths: Vec<String>,
}

/// Overrides for the bytecode metadata strip policy.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Rules consulted before the built-in ones, first match wins.
    #[serde(default)]
    pub strip: Vec<StripRule>,
}

/// Strip `hex_len` trailing hex characters from bytecode produced by
/// compilers matching `versions`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StripRule {
    /// A semver requirement such as `">=0.8.0, <0.9.0"`.
    pub versions: String,
    /// Number of trailing hex characters of metadata.
    pub hex_len: usize,
}

fn default_binary() -> String {
    DEFAULT_COMPILER_BINARY.to_string()
}

fn default_compiler_timeout() -> u64 {
    DEFAULT_COMPILER_TIMEOUT_SECS
}

fn default_remote_timeout() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}

fn default_scratch_dir() -> String {
    DEFAULT_SCRATCH_DIR.to_string()
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `search_paths = "lib"` as well as `search_paths = ["lib", "vendor"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
