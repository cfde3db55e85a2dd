use std::sync::Arc;

use log::warn;
use qfilter_parser::ast::Document;

use crate::{
    adapter::{CompiledQuery, Part, Query, RenderContext},
    errors::{Error, PluginError, Result, Stage},
};

/// What a query-stage hook sees.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub adapter: &'a str,
    pub query: &'a CompiledQuery,
    pub render: &'a RenderContext,
    pub parts: Option<&'a [Part]>,
}

#[derive(Debug, Clone, Copy)]
pub enum QueryOutput<'a> {
    /// From `render_sql` and `render_explain`.
    Text(&'a str),
    Query(&'a Query),
}

/// Hooks around parsing and rendering. Every hook defaults to a no-op; returning an error stops
/// the stage.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// May rewrite the filter text. Plugins run in registration order, each receiving the
    /// previous one's output.
    fn before_parse(&self, dsl: &str) -> Result<String, PluginError> {
        Ok(dsl.to_string())
    }

    fn after_parse(&self, _document: &Document) -> Result<(), PluginError> {
        Ok(())
    }

    fn before_query(&self, _ctx: &QueryContext) -> Result<(), PluginError> {
        Ok(())
    }

    fn after_query(&self, _ctx: &QueryContext, _output: &QueryOutput) -> Result<(), PluginError> {
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct PluginManager {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

fn failed(plugin: &dyn Plugin, stage: Stage, e: PluginError) -> Error {
    warn!("plugin `{}` failed in {stage}: {e}", plugin.name());
    Error::Plugin {
        plugin: plugin.name().to_string(),
        stage,
        message: e.0,
    }
}

impl PluginManager {
    /// A plugin registered under an existing name replaces it in place.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        match self.plugins.iter().position(|p| p.name() == plugin.name()) {
            Some(i) => self.plugins[i] = plugin,
            None => self.plugins.push(plugin),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|p| p.name() != name);
        self.plugins.len() != before
    }

    pub fn names(&self) -> Vec<String> {
        self.plugins.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn before_parse(&self, dsl: &str) -> Result<String> {
        let mut dsl = dsl.to_string();
        for plugin in &self.plugins {
            dsl = plugin
                .before_parse(&dsl)
                .map_err(|e| failed(plugin.as_ref(), Stage::BeforeParse, e))?;
        }
        Ok(dsl)
    }

    pub fn after_parse(&self, document: &Document) -> Result<()> {
        self.plugins.iter().try_for_each(|plugin| {
            plugin
                .after_parse(document)
                .map_err(|e| failed(plugin.as_ref(), Stage::AfterParse, e))
        })
    }

    pub fn before_query(&self, ctx: &QueryContext) -> Result<()> {
        self.plugins.iter().try_for_each(|plugin| {
            plugin
                .before_query(ctx)
                .map_err(|e| failed(plugin.as_ref(), Stage::BeforeQuery, e))
        })
    }

    pub fn after_query(&self, ctx: &QueryContext, output: &QueryOutput) -> Result<()> {
        self.plugins.iter().try_for_each(|plugin| {
            plugin
                .after_query(ctx, output)
                .map_err(|e| failed(plugin.as_ref(), Stage::AfterQuery, e))
        })
    }
}
