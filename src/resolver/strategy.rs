//! Host strategies
//!
//! One function per [`StrategyKind`]. Every strategy turns a reference into
//! candidates, subtitle tracks and references delegated to other hosts; the
//! common per-host rules (source tag, headers, streaming policy) are applied
//! once in [`execute`].

use crate::config::{
    AggregatorSpec, CipherSpec, DelegateSpec, HostProfile, HttpMethod, JsonApiSpec, RedirectSpec,
    ScrapeSpec, StrategyKind,
};
use crate::decode::{decode, decode_json, json_string};
use crate::fetch::FetchRequest;
use crate::model::{CandidateLink, SourceReference, SubtitleTrack};
use crate::resolver::context::ResolutionContext;
use crate::resolver::page;
use crate::resolver::redirect::{follow, HopRequest};
use crate::resolver::Engine;
use crate::score::parse_size;
use crate::url::{base_url, has_media_extension, is_http_url, rebase};
use crate::{ConfigError, ResolveError, Result};
use regex::Regex;
use serde_json::Value;
use url::Url;

/// What a single strategy run produced
#[derive(Debug, Default)]
pub(crate) struct StrategyOutput {
    pub links: Vec<CandidateLink>,
    pub subtitles: Vec<SubtitleTrack>,

    /// References to resolve as their own branches, one level deeper
    pub delegated: Vec<SourceReference>,
}

impl StrategyOutput {
    fn link(link: CandidateLink) -> Self {
        Self {
            links: vec![link],
            ..Self::default()
        }
    }

    fn delegate(references: Vec<SourceReference>) -> Self {
        Self {
            delegated: references,
            ..Self::default()
        }
    }
}

/// A fetched host page
struct Page {
    url: String,
    body: String,
}

impl Page {
    fn base(&self) -> Result<Url> {
        Ok(Url::parse(&self.url)?)
    }

    fn title(&self) -> String {
        page::extract_title(&self.body).unwrap_or_default()
    }

    /// Reference for a link found on this page
    fn refer(&self, url: String) -> SourceReference {
        SourceReference::new(url).with_referer(self.url.clone())
    }
}

/// Runs the host's strategy against a reference
pub(crate) async fn execute(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    let target = rewrite_host(engine, host, &reference.url).await?;

    tracing::debug!(
        host = %host.name,
        strategy = host.strategy.name(),
        url = %target,
        depth = ctx.depth,
        "running strategy"
    );

    let mut output = match &host.strategy {
        StrategyKind::Redirect(spec) => redirect(engine, host, reference, &target, spec, ctx).await?,
        StrategyKind::Scrape(spec) => scrape(engine, host, reference, &target, spec, ctx).await?,
        StrategyKind::Cipher(spec) => cipher(engine, host, reference, &target, spec, ctx).await?,
        StrategyKind::JsonApi(spec) => json_api(engine, host, reference, &target, spec, ctx).await?,
        StrategyKind::Delegate(spec) => delegate(engine, host, reference, &target, spec, ctx).await?,
        StrategyKind::Aggregator(spec) => {
            aggregate(engine, host, reference, &target, spec, ctx).await?
        }
        StrategyKind::BestEffort => best_effort(engine, host, reference, &target, ctx).await?,
    };

    apply_host_rules(host, &target, &mut output);
    Ok(output)
}

/// Points the reference at the host's live domain
async fn rewrite_host(engine: &Engine, host: &HostProfile, url: &str) -> Result<String> {
    let Some(alias) = host.alias.as_deref() else {
        return Ok(url.to_string());
    };

    let base = engine.aliases.resolve(alias, url).await;
    let rewritten = rebase(url, &base)?;
    if rewritten != url {
        tracing::debug!(from = %url, to = %rewritten, alias, "host rewritten");
    }
    Ok(rewritten)
}

/// Stamps host metadata on candidates and enforces the streaming policy
fn apply_host_rules(host: &HostProfile, page_url: &str, output: &mut StrategyOutput) {
    output.links.retain(|link| {
        let allowed = host.allows_streaming || !link.is_streaming();
        if !allowed {
            tracing::debug!(host = %host.name, url = %link.url, "dropping streaming URL");
        }
        allowed
    });

    for link in &mut output.links {
        link.source_tag = host.name.clone();
        for (name, value) in &host.headers {
            link.headers.insert(name.clone(), value.clone());
        }
        if host.referer_header {
            link.headers
                .insert("Referer".to_string(), page_url.to_string());
        }
    }
}

async fn fetch_page(
    engine: &Engine,
    host: &HostProfile,
    url: &str,
    referer: Option<&str>,
    ctx: &ResolutionContext,
) -> Result<Page> {
    let mut request = FetchRequest::new(url, ctx.per_hop_timeout)
        .with_referer(referer.map(str::to_string));
    for (name, value) in &host.headers {
        request = request.with_header(name, value);
    }

    let response = engine.fetcher.get(&request).await?;
    if !response.is_success() {
        return Err(ResolveError::parse(
            url,
            format!("HTTP status {}", response.status),
        ));
    }

    let url = if response.final_url.is_empty() {
        url.to_string()
    } else {
        response.final_url
    };

    Ok(Page {
        url,
        body: response.body,
    })
}

fn compile(host: &HostProfile, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!("host '{}': {}", host.name, e)).into()
    })
}

fn ensure_can_delegate(url: &str, ctx: &ResolutionContext) -> Result<()> {
    if ctx.can_delegate() {
        Ok(())
    } else {
        Err(ResolveError::DelegationDepth {
            url: url.to_string(),
            depth: ctx.depth + 1,
        })
    }
}

async fn redirect(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    spec: &RedirectSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    let hop = HopRequest {
        referer: reference.referer.as_deref(),
        headers: Some(&host.headers),
    };

    let url = follow(engine.fetcher.as_ref(), target, spec, &hop, ctx)
        .await?
        .into_result()?;

    Ok(StrategyOutput::link(
        CandidateLink::new(url, &host.name).with_label(&host.name),
    ))
}

async fn scrape(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    spec: &ScrapeSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    let page = fetch_page(engine, host, target, reference.referer.as_deref(), ctx).await?;
    let buttons = page::extract_buttons(&page.body, &page.base()?, &spec.selectors, &spec.button_texts);
    if buttons.is_empty() {
        return Err(ResolveError::parse(&page.url, "no download buttons"));
    }

    let quality = spec
        .quality_selector
        .as_deref()
        .and_then(|selector| page::select_text(&page.body, selector))
        .unwrap_or_else(|| page.title());

    let mut output = StrategyOutput::default();
    for button in buttons {
        // Buttons leading to another configured host are resolved there
        let other_host = engine
            .dispatcher
            .find(&button.url)
            .map(|profile| profile.name != host.name)
            .unwrap_or(false);

        if other_host && !has_media_extension(&button.url) {
            output.delegated.push(page.refer(button.url));
        } else {
            output.links.push(
                CandidateLink::new(button.url, &host.name)
                    .with_label(button.text)
                    .with_quality_text(quality.clone()),
            );
        }
    }

    Ok(output)
}

async fn cipher(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    spec: &CipherSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    let page = fetch_page(engine, host, target, reference.referer.as_deref(), ctx).await?;
    let pattern = compile(host, &spec.payload_pattern)?;

    let payload = pattern
        .captures(&page.body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| ResolveError::parse(&page.url, "payload not found"))?;

    let json = decode_json(payload, &spec.decode)?;
    tracing::debug!(url = %page.url, "payload decoded");

    let mut url = json_string(&json, &spec.url_pointer)?;
    if !spec.url_decode.is_empty() {
        url = decode(&url, &spec.url_decode)?;
    }
    let url = url.trim().to_string();
    if !is_http_url(&url) {
        return Err(ResolveError::parse(&page.url, "decoded media URL is not http(s)"));
    }

    let label = spec
        .label_pointer
        .as_deref()
        .and_then(|pointer| json_string(&json, pointer).ok())
        .unwrap_or_else(|| host.name.clone());
    let size = spec
        .size_pointer
        .as_deref()
        .and_then(|pointer| size_at(&json, pointer));

    let subtitles = spec
        .subtitles_pointer
        .as_deref()
        .map(|pointer| subtitle_tracks(&json, pointer))
        .unwrap_or_default();

    Ok(StrategyOutput {
        links: vec![CandidateLink::new(url, &host.name)
            .with_label(label)
            .with_size(size)
            .with_quality_text(page.title())],
        subtitles,
        delegated: Vec::new(),
    })
}

async fn json_api(
    engine: &Engine,
    host: &HostProfile,
    _reference: &SourceReference,
    target: &str,
    spec: &JsonApiSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    let id = compile(host, &spec.id_pattern)?
        .captures(target)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ResolveError::parse(target, "no id in reference"))?;

    let base = base_url(target)?;
    let fill = |template: &str| template.replace("{base}", &base).replace("{id}", &id);
    let endpoint = fill(&spec.endpoint);

    let mut request = FetchRequest::new(endpoint.as_str(), ctx.per_hop_timeout)
        .with_referer(Some(target.to_string()));
    for (name, value) in &host.headers {
        request = request.with_header(name, value);
    }

    let response = match spec.method {
        HttpMethod::Get => engine.fetcher.get(&request).await?,
        HttpMethod::Post => {
            let form: Vec<(String, String)> = spec
                .form
                .iter()
                .map(|(key, value)| (key.clone(), fill(value)))
                .collect();
            engine.fetcher.post(&request, &form).await?
        }
    };

    if !response.is_success() {
        return Err(ResolveError::parse(
            &endpoint,
            format!("HTTP status {}", response.status),
        ));
    }

    let json: Value = serde_json::from_str(&response.body)
        .map_err(|e| ResolveError::parse(&endpoint, format!("invalid JSON: {}", e)))?;

    let items: Vec<&Value> = match spec.items_pointer.as_deref() {
        Some(pointer) => json
            .pointer(pointer)
            .and_then(Value::as_array)
            .map(|items| items.iter().collect())
            .ok_or_else(|| ResolveError::parse(&endpoint, format!("no item array at {}", pointer)))?,
        None => vec![&json],
    };

    let mut output = StrategyOutput::default();
    for item in items {
        let url = match json_string(item, &spec.url_pointer) {
            Ok(url) if is_http_url(&url) => url,
            _ => {
                tracing::debug!(endpoint = %endpoint, "skipping item without usable URL");
                continue;
            }
        };

        let text_at = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .and_then(|p| json_string(item, p).ok())
                .unwrap_or_default()
        };

        output.links.push(
            CandidateLink::new(url, &host.name)
                .with_label(text_at(&spec.label_pointer))
                .with_quality_text(text_at(&spec.quality_pointer))
                .with_size(spec.size_pointer.as_deref().and_then(|p| size_at(item, p))),
        );
    }

    if output.links.is_empty() {
        return Err(ResolveError::parse(&endpoint, "no usable items"));
    }
    Ok(output)
}

async fn delegate(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    spec: &DelegateSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    ensure_can_delegate(target, ctx)?;

    let page = fetch_page(engine, host, target, reference.referer.as_deref(), ctx).await?;
    let embed = page::find_embed(&page.body, &page.base()?, &spec.selectors)
        .ok_or_else(|| ResolveError::parse(&page.url, "no embedded target"))?;

    tracing::debug!(from = %page.url, to = %embed, "delegating");
    Ok(StrategyOutput::delegate(vec![page.refer(embed)]))
}

async fn aggregate(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    spec: &AggregatorSpec,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    ensure_can_delegate(target, ctx)?;

    let page = fetch_page(engine, host, target, reference.referer.as_deref(), ctx).await?;
    let buttons = page::extract_buttons(&page.body, &page.base()?, &spec.selectors, &spec.button_texts);
    if buttons.is_empty() {
        return Err(ResolveError::parse(&page.url, "no buttons"));
    }

    tracing::debug!(url = %page.url, buttons = buttons.len(), "fanning out");
    Ok(StrategyOutput::delegate(
        buttons.into_iter().map(|b| page.refer(b.url)).collect(),
    ))
}

async fn best_effort(
    engine: &Engine,
    host: &HostProfile,
    reference: &SourceReference,
    target: &str,
    ctx: &mut ResolutionContext,
) -> Result<StrategyOutput> {
    // Already a media file; fetching it would download it
    if has_media_extension(target) {
        return Ok(StrategyOutput::link(CandidateLink::new(target, &host.name)));
    }

    let page = fetch_page(engine, host, target, reference.referer.as_deref(), ctx).await?;
    let title = page.title();

    Ok(StrategyOutput {
        links: page::scan_media_urls(&page.body)
            .into_iter()
            .map(|url| CandidateLink::new(url, &host.name).with_quality_text(title.clone()))
            .collect(),
        ..StrategyOutput::default()
    })
}

/// Reads a byte count that may be a number or a size text like "1.4 GB"
fn size_at(value: &Value, pointer: &str) -> Option<u64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok().or_else(|| parse_size(s)),
        _ => None,
    }
}

/// Reads `{language|label|lang, url|file|src}` objects from an array
fn subtitle_tracks(value: &Value, pointer: &str) -> Vec<SubtitleTrack> {
    let Some(entries) = value.pointer(pointer).and_then(Value::as_array) else {
        return Vec::new();
    };

    let first = |entry: &Value, keys: &[&str]| {
        keys.iter()
            .find_map(|key| entry.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    entries
        .iter()
        .filter_map(|entry| {
            let url = first(entry, &["url", "file", "src"]).filter(|u| is_http_url(u))?;
            let language =
                first(entry, &["language", "label", "lang"]).unwrap_or_else(|| "unknown".to_string());
            Some(SubtitleTrack { language, url })
        })
        .collect()
}
