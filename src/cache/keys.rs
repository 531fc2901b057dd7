//! Cache key derivation.
//!
//! Keys are `:`-delimited. Every caller-supplied component (id, sort field,
//! criteria field and value) has `\` and `:` backslash-escaped, and each
//! criteria section carries its pair count, so distinct inputs never share a
//! key. Criteria order is part of the key; pairs are not sorted.

use crate::application::pagination::{Criteria, FilterSpec, QueryParams, SearchSpec};

const DELIMITER: char = ':';
const ESCAPE: char = '\\';
const DEFAULT_PREFIX: &str = "marquee";

/// Builds cache keys for one entity namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    namespace: String,
}

impl CacheKeyBuilder {
    /// Builder under the default service prefix.
    pub fn new(entity: &str) -> Self {
        Self::with_prefix(DEFAULT_PREFIX, entity)
    }

    pub fn with_prefix(prefix: &str, entity: &str) -> Self {
        Self {
            namespace: format!("{}{DELIMITER}{}", escape(prefix), escape(entity)),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for a single record.
    pub fn single_key(&self, id: &str) -> String {
        format!("{}{DELIMITER}one{DELIMITER}{}", self.namespace, escape(id))
    }

    /// Key for one list/search/filter page.
    pub fn list_key(
        &self,
        params: &QueryParams,
        search: Option<&SearchSpec>,
        filter: Option<&FilterSpec>,
    ) -> String {
        let mut key = format!(
            "{ns}{d}list{d}{page}{d}{size}{d}{sort}{d}{order}",
            ns = self.namespace,
            d = DELIMITER,
            page = params.page(),
            size = params.page_size(),
            sort = escape(params.sort_by()),
            order = params.order().as_str(),
        );
        push_section(&mut key, 's', search);
        push_section(&mut key, 'f', filter);
        key
    }
}

fn push_section(key: &mut String, marker: char, criteria: Option<&Criteria>) {
    let pairs = criteria.map(Criteria::pairs).unwrap_or_default();
    key.push(DELIMITER);
    key.push(marker);
    key.push_str(&pairs.len().to_string());
    for pair in pairs {
        key.push(DELIMITER);
        key.push_str(&escape(&pair.field));
        key.push(DELIMITER);
        key.push_str(&escape(&pair.value));
    }
}

/// Backslash-escape the escape character and the delimiter.
pub fn escape(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for ch in component.chars() {
        if ch == ESCAPE || ch == DELIMITER {
            escaped.push(ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: i64, size: i64, sort: &str, descending: bool) -> QueryParams {
        QueryParams::new(page, size, sort, descending).expect("valid params")
    }

    #[test]
    fn single_key_is_deterministic() {
        let builder = CacheKeyBuilder::new("films");
        assert_eq!(builder.single_key("abc"), builder.single_key("abc"));
        assert_eq!(builder.single_key("abc"), "marquee:films:one:abc");
    }

    #[test]
    fn list_key_is_deterministic() {
        let builder = CacheKeyBuilder::new("films");
        let search = Criteria::single("title", "star");
        let filter = Criteria::single("genres.name", "Action");
        let first = builder.list_key(&params(1, 25, "id", false), Some(&search), Some(&filter));
        let second = builder.list_key(&params(1, 25, "id", false), Some(&search), Some(&filter));
        assert_eq!(first, second);
    }

    #[test]
    fn list_key_layout() {
        let builder = CacheKeyBuilder::new("genres");
        let key = builder.list_key(&params(2, 10, "name", true), None, None);
        assert_eq!(key, "marquee:genres:list:2:10:name:desc:s0:f0");
    }

    #[test]
    fn each_field_changes_the_key() {
        let builder = CacheKeyBuilder::new("films");
        let base = params(1, 25, "id", false);
        let search = Criteria::single("title", "star");
        let baseline = builder.list_key(&base, Some(&search), None);

        let variants = [
            builder.list_key(&params(2, 25, "id", false), Some(&search), None),
            builder.list_key(&params(1, 26, "id", false), Some(&search), None),
            builder.list_key(&params(1, 25, "title", false), Some(&search), None),
            builder.list_key(&params(1, 25, "id", true), Some(&search), None),
            builder.list_key(&base, Some(&Criteria::single("title", "wars")), None),
            builder.list_key(&base, None, Some(&search)),
            builder.list_key(&base, None, None),
            CacheKeyBuilder::new("persons").list_key(&base, Some(&search), None),
        ];

        for variant in variants {
            assert_ne!(variant, baseline);
        }
    }

    #[test]
    fn search_and_filter_sections_do_not_alias() {
        let builder = CacheKeyBuilder::new("films");
        let base = params(1, 25, "id", false);
        let pair = Criteria::single("title", "star");
        assert_ne!(
            builder.list_key(&base, Some(&pair), None),
            builder.list_key(&base, None, Some(&pair))
        );
    }

    #[test]
    fn criteria_order_is_significant() {
        let builder = CacheKeyBuilder::new("films");
        let base = params(1, 25, "id", false);
        let ab = Criteria::new().with("a", "1").with("b", "2");
        let ba = Criteria::new().with("b", "2").with("a", "1");
        assert_ne!(
            builder.list_key(&base, Some(&ab), None),
            builder.list_key(&base, Some(&ba), None)
        );
    }

    #[test]
    fn delimiter_in_values_cannot_collide() {
        let builder = CacheKeyBuilder::new("films");
        let base = params(1, 25, "id", false);
        let joined = Criteria::single("a:b", "c");
        let split = Criteria::single("a", "b:c");
        assert_ne!(
            builder.list_key(&base, Some(&joined), None),
            builder.list_key(&base, Some(&split), None)
        );

        let one_pair = Criteria::single("x", "y:f1:z:w");
        let two_sections = builder.list_key(
            &base,
            Some(&Criteria::single("x", "y")),
            Some(&Criteria::single("z", "w")),
        );
        assert_ne!(builder.list_key(&base, Some(&one_pair), None), two_sections);
    }

    #[test]
    fn single_and_list_keys_never_overlap() {
        let builder = CacheKeyBuilder::new("films");
        let list = builder.list_key(&params(1, 25, "id", false), None, None);
        let crafted = builder.single_key("list:1:25:id:asc:s0:f0");
        assert_ne!(crafted, list);
        assert!(crafted.starts_with("marquee:films:one:"));
    }

    #[test]
    fn escape_handles_backslash_and_delimiter() {
        assert_eq!(escape("a:b"), "a\\:b");
        assert_eq!(escape("a\\b"), "a\\\\b");
        assert_eq!(escape("plain"), "plain");
    }
}
