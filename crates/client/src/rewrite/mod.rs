//! Markup rewriting for local serving.
//!
//! Turns upstream markup into a self-contained page that works on the mirror
//! domain. Pure, total and deterministic: no I/O, no global state.
//!
//! ### Rule Order
//! Rules run in a fixed order because later rules assume earlier ones ran:
//! 1. Strip archive wrapper prefixes from absolute URLs
//! 2. Make origin and mirror links root-relative
//! 3. Point legacy CDN hosts at the canonical asset host
//! 4. Replace canonical tags with exactly one for the serving domain
//! 5. Drop client router bundles (`main.*.js`, `*chunk*.js`)
//! 6. Drop inline hydration-state scripts
//! 7. Neutralize `pointer-events: none`
//! 8. Inject a link-clickability style block before `</head>`
//! 9. Fill empty application shells with a readable fallback
//!
//! A rule that finds nothing is a no-op. Running the full chain twice gives
//! the same output as running it once.

mod canonical;
mod links;
mod scripts;
mod shell;
mod styles;

use std::borrow::Cow;
use std::fmt;

use lazarus_core::{AppConfig, RequestPath};
use regex::{Regex, Replacer};

use canonical::CanonicalRules;
use links::LinkRules;
use scripts::ScriptRules;
use shell::ShellRules;
use styles::StyleRules;

/// Error raised when a host-derived pattern fails to compile.
pub use regex::Error as PatternError;

/// Per-request rewrite inputs beyond the markup itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteConfig {
    /// Path the page is served under, always with a leading slash.
    pub target_path: String,
    /// Domain written into the canonical link.
    pub canonical_domain: String,
}

impl RewriteConfig {
    pub fn new(target_path: impl Into<String>, canonical_domain: impl Into<String>) -> Self {
        let mut target_path = target_path.into();
        if !target_path.starts_with('/') {
            target_path.insert(0, '/');
        }
        Self { target_path, canonical_domain: canonical_domain.into() }
    }

    pub fn for_path(path: &RequestPath, canonical_domain: impl Into<String>) -> Self {
        Self::new(path.as_str(), canonical_domain)
    }

    /// Absolute canonical URL for the page.
    pub fn canonical_url(&self) -> String {
        format!("https://{}{}", self.canonical_domain, self.target_path)
    }
}

/// Hosts and defaults that describe the mirrored site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub origin_host: String,
    pub mirror_host: String,
    pub asset_host: String,
    pub legacy_asset_hosts: Vec<String>,
    pub archive_host: String,
    pub fallback_title: String,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SiteProfile {
    fn from(config: &AppConfig) -> Self {
        Self {
            origin_host: config.origin_host.clone(),
            mirror_host: config.mirror_host.clone(),
            asset_host: config.asset_host.clone(),
            legacy_asset_hosts: config.legacy_asset_hosts.clone(),
            archive_host: config.archive_host.clone(),
            fallback_title: config.fallback_title.clone(),
        }
    }
}

/// One named rewrite step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rule {
    StripArchiveWrapper,
    RootRelativeLinks,
    CanonicalAssetHosts,
    CanonicalLink,
    StripClientBundles,
    StripHydrationState,
    NeutralizePointerEvents,
    ClickableLinkStyle,
    EmptyShellFallback,
}

impl Rule {
    /// Every rule, in application order.
    pub const ALL: [Rule; 9] = [
        Rule::StripArchiveWrapper,
        Rule::RootRelativeLinks,
        Rule::CanonicalAssetHosts,
        Rule::CanonicalLink,
        Rule::StripClientBundles,
        Rule::StripHydrationState,
        Rule::NeutralizePointerEvents,
        Rule::ClickableLinkStyle,
        Rule::EmptyShellFallback,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rule::StripArchiveWrapper => "strip_archive_wrapper",
            Rule::RootRelativeLinks => "root_relative_links",
            Rule::CanonicalAssetHosts => "canonical_asset_hosts",
            Rule::CanonicalLink => "canonical_link",
            Rule::StripClientBundles => "strip_client_bundles",
            Rule::StripHydrationState => "strip_hydration_state",
            Rule::NeutralizePointerEvents => "neutralize_pointer_events",
            Rule::ClickableLinkStyle => "clickable_link_style",
            Rule::EmptyShellFallback => "empty_shell_fallback",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Compiled rewrite chain for one site.
#[derive(Debug)]
pub struct Rewriter {
    links: LinkRules,
    canonical: CanonicalRules,
    scripts: ScriptRules,
    styles: StyleRules,
    shell: ShellRules,
    enabled: Vec<Rule>,
}

impl Rewriter {
    /// Compile every rule for `profile`.
    ///
    /// # Errors
    ///
    /// Returns the regex error if a host-derived pattern fails to compile.
    pub fn new(profile: &SiteProfile) -> Result<Self, regex::Error> {
        Self::with_rules(profile, &Rule::ALL)
    }

    /// Compile a chain that runs only `rules`, still in canonical order.
    ///
    /// # Errors
    ///
    /// Returns the regex error if a host-derived pattern fails to compile.
    pub fn with_rules(profile: &SiteProfile, rules: &[Rule]) -> Result<Self, regex::Error> {
        let mut enabled = rules.to_vec();
        enabled.sort();
        enabled.dedup();

        Ok(Self {
            links: LinkRules::new(profile)?,
            canonical: CanonicalRules::new(),
            scripts: ScriptRules::new(),
            styles: StyleRules::new(),
            shell: ShellRules::new(&profile.fallback_title),
            enabled,
        })
    }

    pub fn enabled_rules(&self) -> &[Rule] {
        &self.enabled
    }

    /// Run the enabled rules left to right.
    ///
    /// Rules 1 and 2 repeat together until neither matches, since each can
    /// expose a match for the other.
    pub fn rewrite(&self, markup: &str, cfg: &RewriteConfig) -> String {
        let split = self.enabled.partition_point(|rule| *rule <= Rule::RootRelativeLinks);
        let (url_rules, rest) = self.enabled.split_at(split);

        let out = settle(markup.to_string(), |m| url_rules.iter().fold(m, |acc, rule| self.run(*rule, acc, cfg)));
        rest.iter().fold(out, |acc, rule| self.run(*rule, acc, cfg))
    }

    /// Run a single rule, regardless of whether it is enabled.
    pub fn apply_rule(&self, rule: Rule, markup: &str, cfg: &RewriteConfig) -> String {
        self.run(rule, markup.to_string(), cfg)
    }

    fn run(&self, rule: Rule, markup: String, cfg: &RewriteConfig) -> String {
        match rule {
            Rule::StripArchiveWrapper => self.links.strip_archive_wrapper(markup),
            Rule::RootRelativeLinks => self.links.root_relative(markup),
            Rule::CanonicalAssetHosts => self.links.canonical_assets(markup),
            Rule::CanonicalLink => self.canonical.apply(markup, cfg),
            Rule::StripClientBundles => self.scripts.strip_bundles(markup),
            Rule::StripHydrationState => self.scripts.strip_hydration(markup),
            Rule::NeutralizePointerEvents => self.styles.neutralize_pointer_events(markup),
            Rule::ClickableLinkStyle => self.styles.inject_clickable_style(markup),
            Rule::EmptyShellFallback => self.shell.apply(markup),
        }
    }
}

/// `replace_all` that hands back the input buffer untouched when nothing matched.
fn replace_all<R: Replacer>(re: &Regex, markup: String, rep: R) -> String {
    match re.replace_all(&markup, rep) {
        Cow::Borrowed(_) => markup,
        Cow::Owned(out) => out,
    }
}

/// Repeat a shortening step until it stops matching.
///
/// `step` must either leave the markup alone or make it strictly shorter, so
/// an unchanged length is a fixed point.
fn settle(mut markup: String, step: impl Fn(String) -> String) -> String {
    loop {
        let before = markup.len();
        markup = step(markup);
        if markup.len() == before {
            return markup;
        }
    }
}

/// Escape text for use inside an HTML attribute or element body.
fn escape_html(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(s);
    }
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}
