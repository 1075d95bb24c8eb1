use regex_lite::Regex;
use tracing::info;

use super::config::UrlRewriteRule;
use super::error::DownloaderError;

struct CompiledRule {
    name: String,
    regex: Regex,
    replacement: String,
}

/// Applies configured URL rewrites.
pub struct UrlRewriter {
    rules: Vec<CompiledRule>,
}

impl UrlRewriter {
    pub fn new(rules: &[UrlRewriteRule]) -> Result<Self, DownloaderError> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|regex| CompiledRule {
                        name: rule.name.clone(),
                        regex,
                        replacement: rule.replacement.clone(),
                    })
                    .map_err(|e| DownloaderError::InvalidRewriteRule {
                        name: rule.name.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Rewrites `url` with the first matching rule, or returns it unchanged.
    pub fn rewrite(&self, url: &str) -> String {
        for rule in &self.rules {
            if rule.regex.is_match(url) {
                let rewritten = rule
                    .regex
                    .replace_all(url, rule.replacement.as_str())
                    .into_owned();
                info!(rule = %rule.name, from = %url, to = %rewritten, "Rewrote source URL");
                return rewritten;
            }
        }
        url.to_string()
    }
}
