//! Home page view
//!
//! Renders the upload form and viewer canvas through a minijinja template.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use crate::config::AssetsConfig;

const TEMPLATE_NAME: &str = "home.html";
const DEFAULT_TEMPLATE: &str = include_str!("home.html");

/// Values the template can reference
#[derive(Debug, Clone, Serialize)]
pub struct HomeContext {
    pub upload_route: String,
    pub upload_field: String,
    pub upload_prefix: String,
    pub wasm_prefix: String,
    pub viewer_script: String,
}

impl HomeContext {
    pub fn from_assets(assets: &AssetsConfig) -> Self {
        Self {
            upload_route: assets.upload_route.clone(),
            upload_field: assets.upload_field.clone(),
            upload_prefix: assets.upload_prefix(),
            wasm_prefix: assets.wasm_prefix(),
            viewer_script: assets.viewer_script.clone(),
        }
    }
}

/// Compiled home template plus its fixed context
pub struct HomePage {
    env: Environment<'static>,
    context: HomeContext,
}

impl HomePage {
    /// Compile `source`, or the built-in page when `None`.
    ///
    /// Auto-escaping is off: every value comes from operator configuration and
    /// URL paths must render verbatim.
    pub fn new(source: Option<String>, context: HomeContext) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        match source {
            Some(source) => env.add_template_owned(TEMPLATE_NAME, source)?,
            None => env.add_template(TEMPLATE_NAME, DEFAULT_TEMPLATE)?,
        }
        Ok(Self { env, context })
    }

    pub fn render(&self) -> Result<String, minijinja::Error> {
        self.env.get_template(TEMPLATE_NAME)?.render(&self.context)
    }
}
