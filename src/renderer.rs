//! Template rendering for subst.
//! Wraps a MiniJinja environment preloaded with the helper functions from
//! [`crate::functions`], bound to the process [`Snapshot`].
use crate::context::{GlobalContext, Snapshot};
use crate::error::Result;
use crate::functions;
use log::debug;
use minijinja::value::Rest;
use minijinja::{Environment, UndefinedBehavior};
use std::sync::Arc;

/// Name under which the input is registered, as shown in error messages.
pub const TEMPLATE_NAME: &str = "<stdin>";

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given context.
    ///
    /// # Arguments
    /// * `template` - Template source, usually already variable-expanded
    /// * `context` - Global values for the template
    ///
    /// # Returns
    /// * `Result<String>` - Rendered template string
    fn render(&self, template: &str, context: &GlobalContext<'_>) -> Result<String>;
}

/// MiniJinja-based template rendering engine.
pub struct MiniJinjaRenderer {
    /// MiniJinja environment instance
    env: Environment<'static>,
}

impl MiniJinjaRenderer {
    /// Creates a renderer whose environment-reading functions see `snapshot`.
    pub fn new(snapshot: Arc<Snapshot>) -> Self {
        let mut env = Environment::new();
        // Chained lookups on missing keys render empty, as in shell templates.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_keep_trailing_newline(true);

        env.add_function("sh", functions::sh);
        env.add_function("required_vals", functions::required_vals);
        env.add_function("required_files", functions::required_files);
        let envs = Arc::clone(&snapshot);
        env.add_function("required_envs", move |names: Rest<String>| {
            functions::required_envs(&envs, &names)
        });
        env.add_function("getenv", move |name: String, default: Option<String>| {
            functions::getenv(&snapshot, &name, default)
        });
        env.add_function("fail", functions::fail);
        env.add_function("dict", functions::dict);
        env.add_function("list", functions::list);
        env.add_function("coalesce", functions::coalesce);
        env.add_function("ternary", functions::ternary);

        env.add_filter("empty", functions::empty);
        env.add_filter("b64encode", functions::b64encode);
        env.add_filter("b64decode", functions::b64decode);
        env.add_filter("quote", functions::quote);
        env.add_filter("squote", functions::squote);
        env.add_filter("nindent", functions::nindent);
        env.add_filter("trunc", functions::trunc);
        env.add_filter("trimprefix", functions::trimprefix);
        env.add_filter("trimsuffix", functions::trimsuffix);
        env.add_filter("snakecase", functions::snakecase);
        env.add_filter("kebabcase", functions::kebabcase);
        env.add_filter("camelcase", functions::camelcase);
        env.add_filter("sha256", functions::sha256sum);
        env.add_filter("toyaml", functions::toyaml);
        env.add_filter("regex_match", functions::regex_match);
        env.add_filter("regex_replace", functions::regex_replace);

        Self { env }
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    /// Renders a template string using MiniJinja.
    ///
    /// # Errors
    /// * `Error::TemplateError` if the template does not parse, or if rendering
    ///   fails (including errors raised by functions such as `sh()`)
    fn render(&self, template: &str, context: &GlobalContext<'_>) -> Result<String> {
        debug!("Rendering {} bytes of template source", template.len());
        let mut env = self.env.clone();
        env.add_template_owned(TEMPLATE_NAME, template.to_string())?;

        let tmpl = env.get_template(TEMPLATE_NAME)?;

        Ok(tmpl.render(context)?)
    }
}
