//! `%tag%` placeholder substitution.
//!
//! Action parameters are stored verbatim at parse time and resolved here at
//! execution time, so one compiled action renders different text for every
//! message it fires on.

use crate::context::FilterContext;
use std::collections::HashMap;
use std::fmt;

pub type TagFn = Box<dyn Fn(&FilterContext) -> String + Send + Sync>;

pub struct TagResolver {
    tags: HashMap<String, TagFn>,
}

impl TagResolver {
    /// A resolver with no tags at all.
    pub fn empty() -> Self {
        TagResolver { tags: HashMap::new() }
    }

    /// Register (or replace) a tag. Names are case-insensitive.
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&FilterContext) -> String + Send + Sync + 'static,
    {
        self.tags.insert(name.to_ascii_lowercase(), Box::new(f));
    }

    /// Value of one tag, or `None` when the name is unknown.
    pub fn resolve(&self, name: &str, ctx: &FilterContext) -> Option<String> {
        self.tags.get(&name.to_ascii_lowercase()).map(|f| f(ctx))
    }

    /// Substitute every `%name%` in `template`. Unknown tags stay verbatim.
    pub fn replace_tags(&self, template: &str, ctx: &FilterContext) -> String {
        if !template.contains('%') {
            return template.to_string();
        }
        regex!(r"%(\w+)%")
            .replace_all(template, |caps: &regex::Captures| {
                self.resolve(&caps[1], ctx).unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TagResolver {
    fn default() -> Self {
        let mut tags = TagResolver::empty();
        tags.register("player", |ctx| ctx.author().name());
        tags.register("string", |ctx| ctx.modified().plain().to_string());
        tags.register("rawstring", |ctx| ctx.modified().raw());
        tags.register("original", |ctx| ctx.original().plain().to_string());
        tags.register("chain", |ctx| ctx.chain_name().unwrap_or_default().to_string());
        tags
    }
}

impl fmt::Debug for TagResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagResolver").field("tags", &self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingAuthor;

    #[test]
    fn builtin_tags_resolve_against_context() {
        let tags = TagResolver::default();
        let mut ctx = FilterContext::new("§chello there", RecordingAuthor::arc("steve"));
        ctx.set_modified("hi".into());

        assert_eq!(tags.resolve("player", &ctx).as_deref(), Some("steve"));
        assert_eq!(tags.resolve("PLAYER", &ctx).as_deref(), Some("steve"));
        assert_eq!(tags.resolve("original", &ctx).as_deref(), Some("hello there"));
        assert_eq!(tags.replace_tags("%player% said '%string%'", &ctx), "steve said 'hi'");
    }

    #[test]
    fn unknown_tags_are_left_alone() {
        let tags = TagResolver::default();
        let ctx = FilterContext::new("x", RecordingAuthor::arc("alex"));
        assert_eq!(tags.replace_tags("100% sure, %nope%", &ctx), "100% sure, %nope%");
    }

    #[test]
    fn hosts_can_add_tags() {
        let mut tags = TagResolver::default();
        tags.register("world", |_| "overworld".to_string());
        let ctx = FilterContext::new("x", RecordingAuthor::arc("alex"));
        assert_eq!(tags.replace_tags("in %world%", &ctx), "in overworld");
    }
}
