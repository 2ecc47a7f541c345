//! URL rules: archive wrappers, site-absolute links and CDN hosts.

use regex::{Captures, Regex};

use super::{SiteProfile, replace_all, settle};

#[derive(Debug)]
pub(super) struct LinkRules {
    archive_wrapper: Regex,
    site_with_slash: Regex,
    site_before_quote: Regex,
    legacy_assets: Option<Regex>,
    asset_host: String,
}

fn host_alternation<'a>(hosts: impl IntoIterator<Item = &'a str>) -> String {
    hosts.into_iter().map(regex::escape).collect::<Vec<_>>().join("|")
}

impl LinkRules {
    pub(super) fn new(profile: &SiteProfile) -> Result<Self, regex::Error> {
        let archive = regex::escape(&profile.archive_host);
        let origin = regex::escape(&profile.origin_host);
        let site = host_alternation([profile.mirror_host.as_str(), profile.origin_host.as_str()]);

        // <archive>/web/<capture>[id_|im_|..]/<scheme>://<origin>
        let archive_wrapper = Regex::new(&format!(r"https?://{archive}/web/\d+(?:[a-z]{{2}}_)?/https?://{origin}"))?;
        // repeated prefixes (`//a//a/x`) collapse in one match
        let site_with_slash = Regex::new(&format!(r"(?:(?:https?:)?//(?:{site}))+/"))?;
        let site_before_quote = Regex::new(&format!(r#"(?:(?:https?:)?//(?:{site}))+(["'])"#))?;

        let legacy_assets = if profile.legacy_asset_hosts.is_empty() {
            None
        } else {
            let hosts = host_alternation(profile.legacy_asset_hosts.iter().map(String::as_str));
            Some(Regex::new(&format!(r"(?i)(https?:)?//(?:{hosts})"))?)
        };

        Ok(Self {
            archive_wrapper,
            site_with_slash,
            site_before_quote,
            legacy_assets,
            asset_host: profile.asset_host.clone(),
        })
    }

    pub(super) fn strip_archive_wrapper(&self, markup: String) -> String {
        settle(markup, |m| replace_all(&self.archive_wrapper, m, ""))
    }

    pub(super) fn root_relative(&self, markup: String) -> String {
        settle(markup, |m| {
            let m = replace_all(&self.site_with_slash, m, "/");
            replace_all(&self.site_before_quote, m, "/${1}")
        })
    }

    pub(super) fn canonical_assets(&self, markup: String) -> String {
        let Some(re) = &self.legacy_assets else {
            return markup;
        };
        replace_all(re, markup, |caps: &Captures| {
            if caps.get(1).is_some() {
                format!("https://{}", self.asset_host)
            } else {
                format!("//{}", self.asset_host)
            }
        })
    }
}
