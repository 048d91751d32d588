//! URL generation by route name.
//!
//! Routes are looked up by `name`, falling back to their component key. The
//! name index is rebuilt whenever the route registry changes; full-path
//! templates are cached by full path.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use waymark_core::{
    ParamValue, Params, PathTemplate, Route, UrlError, encode_segment, join_paths,
    registry_revision, url_for_path, with_base,
};

#[derive(Default)]
struct NameIndex {
    revision: Option<u64>,
    full_paths: HashMap<String, Vec<String>>,
    templates: HashMap<String, Arc<PathTemplate>>,
}

/// Generates URLs for the routes below a root.
pub struct UrlGenerator<V> {
    root: Arc<Route<V>>,
    base_url: String,
    index: Mutex<NameIndex>,
}

impl<V> UrlGenerator<V> {
    /// Creates a generator for the tree under `root`, prefixing `base_url`.
    pub fn new(root: Arc<Route<V>>, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into(),
            index: Mutex::new(NameIndex::default()),
        }
    }

    /// URL of the route registered under `name`.
    pub fn url_for_name(&self, name: &str, params: &Params) -> Result<String, UrlError> {
        let template = self.template(name)?;
        Ok(with_base(&self.base_url, &template.render(params)?))
    }

    /// Like [`UrlGenerator::url_for_name`], appending parameters the pattern
    /// does not use as a query string.
    pub fn url_for_name_with_query(
        &self,
        name: &str,
        params: &Params,
    ) -> Result<String, UrlError> {
        let template = self.template(name)?;
        let mut url = with_base(&self.base_url, &template.render(params)?);

        let used: HashSet<String> = template.keys().map(|key| key.name.to_string()).collect();
        let query = encode_query(params.iter().filter(|(name, _)| !used.contains(*name)));
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }
        Ok(url)
    }

    /// Fills `pattern` with `params`, prefixing the base URL.
    pub fn url_for_path(&self, pattern: &str, params: &Params) -> Result<String, UrlError> {
        Ok(with_base(&self.base_url, &url_for_path(pattern, params)?))
    }

    fn template(&self, name: &str) -> Result<Arc<PathTemplate>, UrlError> {
        let mut index = self.index.lock();
        let revision = registry_revision();
        if index.revision != Some(revision) {
            index.full_paths.clear();
            collect_names(&self.root, "", &mut index.full_paths);
            index.revision = Some(revision);
        }

        let full_path = match index.full_paths.get(name).map(Vec::as_slice) {
            None | Some([]) => return Err(UrlError::UnknownName(name.to_string())),
            Some([full_path]) => full_path.clone(),
            Some(_) => return Err(UrlError::DuplicateName(name.to_string())),
        };

        if let Some(template) = index.templates.get(&full_path) {
            return Ok(template.clone());
        }
        let template = Arc::new(PathTemplate::new(&full_path)?);
        index.templates.insert(full_path, template.clone());
        Ok(template)
    }
}

fn collect_names<V>(route: &Route<V>, prefix: &str, out: &mut HashMap<String, Vec<String>>) {
    for child in route.children().iter() {
        let full_path = join_paths([prefix, child.path()]);
        if let Some(name) = child.name().or(child.component()) {
            out.entry(name.to_string())
                .or_default()
                .push(full_path.clone());
        }
        collect_names(child, &full_path, out);
    }
}

fn encode_query<'a>(params: impl Iterator<Item = (&'a String, &'a ParamValue)>) -> String {
    let mut pairs = Vec::new();
    for (name, value) in params {
        for item in value.as_slice() {
            pairs.push(format!("{}={}", encode_segment(name), encode_segment(item)));
        }
    }
    pairs.join("&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_core::RouteDescriptor;

    fn tree() -> Arc<Route<()>> {
        Route::root(vec![
            RouteDescriptor::new("/users").children(vec![
                RouteDescriptor::new("/").component("user-list"),
                RouteDescriptor::new("/:id").component("user-profile").name("user"),
            ]),
            RouteDescriptor::new("/about").component("about-page"),
        ])
        .unwrap()
    }

    #[test]
    fn generates_by_name_and_component() {
        let urls = UrlGenerator::new(tree(), "");
        let params = Params::new().with("id", "42");
        assert_eq!(urls.url_for_name("user", &params).unwrap(), "/users/42");
        assert_eq!(urls.url_for_name("about-page", &Params::new()).unwrap(), "/about");
        assert_eq!(urls.url_for_name("user-list", &Params::new()).unwrap(), "/users/");
    }

    #[test]
    fn unknown_names_fail() {
        let urls = UrlGenerator::new(tree(), "");
        assert_eq!(
            urls.url_for_name("nope", &Params::new()).unwrap_err(),
            UrlError::UnknownName("nope".into())
        );
    }

    #[test]
    fn prefixes_base_url() {
        let urls = UrlGenerator::new(tree(), "/app/");
        let params = Params::new().with("id", "1");
        assert_eq!(urls.url_for_name("user", &params).unwrap(), "/app/users/1");
        assert_eq!(urls.url_for_path("/x/:id", &params).unwrap(), "/app/x/1");
    }

    #[test]
    fn leftover_params_become_query() {
        let urls = UrlGenerator::new(tree(), "");
        let params = Params::new()
            .with("id", "42")
            .with("tab", "a b")
            .with("tag", vec!["x", "y"]);
        assert_eq!(
            urls.url_for_name_with_query("user", &params).unwrap(),
            "/users/42?tab=a%20b&tag=x&tag=y"
        );
    }

    #[test]
    fn sees_routes_added_later() {
        let root = tree();
        let urls = UrlGenerator::new(root.clone(), "");
        assert!(urls.url_for_name("contact", &Params::new()).is_err());

        root.add_routes(vec![RouteDescriptor::new("/contact").component("contact")])
            .unwrap();
        assert_eq!(urls.url_for_name("contact", &Params::new()).unwrap(), "/contact");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let root = Route::<()>::root(vec![
            RouteDescriptor::new("/a").component("page"),
            RouteDescriptor::new("/b").component("page"),
        ])
        .unwrap();
        let urls = UrlGenerator::new(root, "");
        assert_eq!(
            urls.url_for_name("page", &Params::new()).unwrap_err(),
            UrlError::DuplicateName("page".into())
        );
    }
}
