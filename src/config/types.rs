use crate::decode::DecodeOp;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Main configuration structure for Link-Resolver
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    #[serde(default)]
    pub resolver: EngineConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub aliases: AliasConfig,

    /// Host profiles in dispatch order; the first match wins
    #[serde(default, rename = "host")]
    pub hosts: Vec<HostProfile>,
}

/// Resolution engine bounds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Maximum redirect hops per branch
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    /// Timeout for a single request (milliseconds)
    #[serde(default = "default_per_hop_timeout_ms")]
    pub per_hop_timeout_ms: u64,

    /// Deadline for a whole branch (milliseconds)
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,

    /// Number of branches resolved in parallel
    #[serde(default = "default_max_concurrent_branches")]
    pub max_concurrent_branches: u32,

    /// How many times a branch may hand off to another host
    #[serde(default = "default_max_delegation_depth")]
    pub max_delegation_depth: u32,

    /// Drop streaming manifests unless the caller asks otherwise
    #[serde(default = "default_true")]
    pub download_only: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_hops: default_max_hops(),
            per_hop_timeout_ms: default_per_hop_timeout_ms(),
            overall_timeout_ms: default_overall_timeout_ms(),
            max_concurrent_branches: default_max_concurrent_branches(),
            max_delegation_depth: default_max_delegation_depth(),
            download_only: true,
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Domain alias table configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AliasConfig {
    /// JSON object of logical host name to live base URL
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Timeout for the one-off remote fetch (milliseconds)
    #[serde(default = "default_alias_timeout_ms")]
    pub timeout_ms: u64,

    /// Entries consulted when the remote table lacks a key
    #[serde(default, rename = "static")]
    pub static_entries: HashMap<String, String>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            remote_url: None,
            timeout_ms: default_alias_timeout_ms(),
            static_entries: HashMap::new(),
        }
    }
}

/// A hosting site and how to resolve its pages
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HostProfile {
    /// Unique name, also used as the candidates' source tag
    pub name: String,

    /// Key in the alias table; the reference host is rewritten to its base URL
    #[serde(default)]
    pub alias: Option<String>,

    /// Wildcard domains (e.g., "*.example.com")
    #[serde(default)]
    pub domains: Vec<String>,

    /// Hostname substrings, for hosts that rotate TLDs
    #[serde(default)]
    pub fragments: Vec<String>,

    /// Path substrings (e.g., "/drive/")
    #[serde(default)]
    pub path_markers: Vec<String>,

    /// Regex over the full URL
    #[serde(default)]
    pub pattern: Option<String>,

    /// Whether this host may emit HLS/DASH manifests
    #[serde(default)]
    pub allows_streaming: bool,

    /// Attach the page URL as `Referer` to emitted candidates
    #[serde(default)]
    pub referer_header: bool,

    /// Headers attached to emitted candidates
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-host redirect budget
    #[serde(default)]
    pub max_hops: Option<u32>,

    pub strategy: StrategyKind,
}

impl HostProfile {
    /// Creates a profile with no matchers
    pub fn new(name: impl Into<String>, strategy: StrategyKind) -> Self {
        Self {
            name: name.into(),
            alias: None,
            domains: Vec::new(),
            fragments: Vec::new(),
            path_markers: Vec::new(),
            pattern: None,
            allows_streaming: false,
            referer_header: false,
            headers: BTreeMap::new(),
            max_hops: None,
            strategy,
        }
    }

    /// Returns true if at least one matcher is configured
    pub fn has_matchers(&self) -> bool {
        !self.domains.is_empty()
            || !self.fragments.is_empty()
            || !self.path_markers.is_empty()
            || self.pattern.is_some()
    }
}

/// How a host's pages are turned into candidates
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Follow HTTP redirects to the file
    Redirect(RedirectSpec),
    /// Pick download buttons off the page
    Scrape(ScrapeSpec),
    /// Decode an obfuscated payload embedded in the page
    Cipher(CipherSpec),
    /// Ask the host's JSON API
    JsonApi(JsonApiSpec),
    /// Follow the page's embed to another host
    Delegate(DelegateSpec),
    /// Resolve every button on the page as its own branch
    Aggregator(AggregatorSpec),
    /// Scan the raw body for media URLs
    BestEffort,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Redirect(_) => "redirect",
            Self::Scrape(_) => "scrape",
            Self::Cipher(_) => "cipher",
            Self::JsonApi(_) => "json-api",
            Self::Delegate(_) => "delegate",
            Self::Aggregator(_) => "aggregator",
            Self::BestEffort => "best-effort",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RedirectSpec {
    /// Hostname fragments of the gateway; leaving them marks a URL terminal
    #[serde(default)]
    pub gateway_fragments: Vec<String>,

    /// Query parameters that may carry the real target
    #[serde(default = "default_embedded_params")]
    pub embedded_params: Vec<String>,
}

impl Default for RedirectSpec {
    fn default() -> Self {
        Self {
            gateway_fragments: Vec::new(),
            embedded_params: default_embedded_params(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScrapeSpec {
    /// CSS selectors whose `href`/`src` are download links
    #[serde(default)]
    pub selectors: Vec<String>,

    /// Anchor texts (case-insensitive substrings) marking download buttons
    #[serde(default)]
    pub button_texts: Vec<String>,

    /// CSS selector for quality text; defaults to the page title
    #[serde(default)]
    pub quality_selector: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CipherSpec {
    /// Regex whose first capture group is the obfuscated payload
    pub payload_pattern: String,

    /// Chain turning the payload into JSON
    pub decode: Vec<DecodeOp>,

    /// JSON pointer of the media URL
    pub url_pointer: String,

    /// Chain applied to the URL field itself
    #[serde(default)]
    pub url_decode: Vec<DecodeOp>,

    /// JSON pointer of an array of `{language|label, url|file}` objects
    #[serde(default)]
    pub subtitles_pointer: Option<String>,

    #[serde(default)]
    pub label_pointer: Option<String>,

    #[serde(default)]
    pub size_pointer: Option<String>,
}

/// HTTP method for JSON API calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JsonApiSpec {
    /// Endpoint template with `{base}` and `{id}` placeholders
    pub endpoint: String,

    /// Regex over the reference URL; the first capture group is `{id}`
    pub id_pattern: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Form fields for POST; values may contain `{id}`
    #[serde(default)]
    pub form: BTreeMap<String, String>,

    /// JSON pointer of an item array; the root is one item when unset
    #[serde(default)]
    pub items_pointer: Option<String>,

    /// Pointers below are relative to each item
    pub url_pointer: String,

    #[serde(default)]
    pub label_pointer: Option<String>,

    #[serde(default)]
    pub size_pointer: Option<String>,

    #[serde(default)]
    pub quality_pointer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DelegateSpec {
    /// Extra selectors tried before the built-in embed detection
    #[serde(default)]
    pub selectors: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AggregatorSpec {
    #[serde(default)]
    pub selectors: Vec<String>,

    #[serde(default)]
    pub button_texts: Vec<String>,
}

fn default_max_hops() -> u32 {
    8
}

fn default_per_hop_timeout_ms() -> u64 {
    10_000
}

fn default_overall_timeout_ms() -> u64 {
    45_000
}

fn default_max_concurrent_branches() -> u32 {
    4
}

fn default_max_delegation_depth() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
        .to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_alias_timeout_ms() -> u64 {
    3_000
}

fn default_embedded_params() -> Vec<String> {
    vec!["link".to_string(), "url".to_string()]
}
