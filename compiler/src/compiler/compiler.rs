use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use indexmap::{IndexMap, IndexSet};
use log::debug;
use qfilter_parser::{
    ast::{Document, Expr, Page, Preloads, SortDirection, SortEntry},
    repair_checked, validate,
};

use crate::{
    adapter::{Adapter, CompiledQuery, Part, Query, RenderContext},
    cache::QueryCache,
    document::DocumentAdapter,
    errors::{msg, Error, Result},
    metrics::{Metrics, MetricsSnapshot},
    options::{Options, ValidationMode},
    plugin::{Plugin, PluginManager, QueryContext, QueryOutput},
    policy::{FieldPolicy, NamingStrategy},
    sql::{Postgres, SqlAdapter, Standard},
};

use super::constants::*;
#[cfg(feature = "batch")]
use crate::batch::{BatchExecutor, BatchResult};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Default)]
struct State {
    dsl: String,
    document: Document,
    selected: IndexSet<String>,
    ignored: IndexSet<String>,
    allowed: IndexSet<String>,
    whitelist_active: bool,
    naming: NamingStrategy,
    group_by: Vec<String>,
}

trait AsOutput {
    fn as_output(&self) -> QueryOutput<'_>;
}

impl AsOutput for String {
    fn as_output(&self) -> QueryOutput<'_> {
        QueryOutput::Text(self)
    }
}

impl AsOutput for Query {
    fn as_output(&self) -> QueryOutput<'_> {
        QueryOutput::Query(self)
    }
}

/// Parses filter text, holds the result together with the field policy, and renders it
/// through named adapters.
///
/// A compiler is safe to share between threads. Readers get copies of the state; a parse
/// replaces the document atomically and only after every check and plugin has passed.
pub struct Compiler {
    options: Options,
    state: RwLock<State>,
    adapters: RwLock<IndexMap<String, Arc<dyn Adapter>>>,
    plugins: RwLock<PluginManager>,
    cache: Option<QueryCache<String, Document>>,
    metrics: Metrics,
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field("adapters", &self.adapter_names())
            .field("plugins", &*read(&self.plugins))
            .finish()
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        let mut sql = SqlAdapter::new(Standard).named(SQL_ADAPTER);
        let mut postgres = SqlAdapter::new(Postgres).named(POSTGRES_ADAPTER);
        if let Some(op) = &options.regex_operator {
            sql = sql.with_regex_operator(op.as_str());
            postgres = postgres.with_regex_operator(op.as_str());
        }
        let mut adapters: IndexMap<String, Arc<dyn Adapter>> = IndexMap::new();
        adapters.insert(SQL_ADAPTER.to_string(), Arc::new(sql));
        adapters.insert(POSTGRES_ADAPTER.to_string(), Arc::new(postgres));
        adapters.insert(DOCUMENT_ADAPTER.to_string(), Arc::new(DocumentAdapter));

        let cache = options
            .cache
            .map(|c| QueryCache::new(c.capacity, c.ttl(), c.reap_interval()));
        let state = State {
            naming: options.naming_strategy,
            ..Default::default()
        };
        Self {
            options,
            state: RwLock::new(state),
            adapters: RwLock::new(adapters),
            plugins: RwLock::new(PluginManager::default()),
            cache,
            metrics: Metrics::default(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    // Parse stage

    fn track_plugin<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(Error::Plugin { .. }) = &result {
            self.metrics.plugin_failed();
        }
        result
    }

    fn checked(&self, dsl: String) -> Result<String> {
        match self.options.validation {
            ValidationMode::Off => Ok(dsl),
            ValidationMode::Strict => match validate(&dsl) {
                Ok(()) => Ok(dsl),
                Err(e) => {
                    self.metrics.parse_failed();
                    Err(e.into())
                }
            },
            ValidationMode::Repair => match repair_checked(&dsl) {
                Ok(repaired) => {
                    if repaired != dsl {
                        debug!("repaired filter `{dsl}` into `{repaired}`");
                        self.metrics.repaired();
                    }
                    Ok(repaired)
                }
                Err(e) => {
                    self.metrics.parse_failed();
                    Err(e.into())
                }
            },
        }
    }

    fn parse_cached(&self, dsl: &str) -> Document {
        let key = dsl.to_string();
        if let Some(cache) = &self.cache {
            if let Some(document) = cache.get(&key) {
                self.metrics.cache_hit();
                return document;
            }
            self.metrics.cache_miss();
        }
        let document = qfilter_parser::parse(dsl);
        self.metrics.parsed();
        if let Some(cache) = &self.cache {
            cache.insert(key, document.clone());
        }
        document
    }

    /// Everything a parse does except committing the result.
    fn prepare(&self, dsl: &str) -> Result<(String, Document)> {
        let plugins = read(&self.plugins).clone();
        let dsl = self.track_plugin(plugins.before_parse(dsl))?;
        let dsl = self.checked(dsl)?;
        let document = self.parse_cached(&dsl);
        self.track_plugin(plugins.after_parse(&document))?;
        Ok((dsl, document))
    }

    /// Parses `dsl` and makes it the current document. On error the previous state is kept.
    pub fn parse(&self, dsl: &str) -> Result<Document> {
        let (dsl, document) = self.prepare(dsl)?;
        let mut state = write(&self.state);
        state.dsl = dsl;
        state.document = document.clone();
        Ok(document)
    }

    // Readers

    /// The filter text of the last successful parse, after plugins and repair.
    pub fn dsl(&self) -> String {
        read(&self.state).dsl.clone()
    }

    pub fn document(&self) -> Document {
        read(&self.state).document.clone()
    }

    pub fn filter(&self) -> Option<Expr> {
        read(&self.state).document.filter.clone()
    }

    pub fn sort(&self) -> Vec<SortEntry> {
        read(&self.state).document.sort.clone()
    }

    pub fn page(&self) -> Page {
        read(&self.state).document.page
    }

    pub fn preloads(&self) -> Preloads {
        read(&self.state).document.preloads.clone()
    }

    pub fn selected_fields(&self) -> Vec<String> {
        read(&self.state).selected.iter().cloned().collect()
    }

    pub fn ignored_fields(&self) -> Vec<String> {
        read(&self.state).ignored.iter().cloned().collect()
    }

    pub fn allowed_fields(&self) -> Vec<String> {
        read(&self.state).allowed.iter().cloned().collect()
    }

    pub fn whitelist_active(&self) -> bool {
        read(&self.state).whitelist_active
    }

    pub fn naming_strategy(&self) -> NamingStrategy {
        read(&self.state).naming
    }

    pub fn group_by(&self) -> Vec<String> {
        read(&self.state).group_by.clone()
    }

    // Mutators

    pub fn set_filter(&self, filter: Option<Expr>) {
        write(&self.state).document.filter = filter;
    }

    pub fn set_sort(&self, sort: Vec<SortEntry>) {
        write(&self.state).document.sort = sort;
    }

    pub fn add_sort(&self, field: impl Into<String>, direction: SortDirection) {
        write(&self.state).document.sort.push(SortEntry {
            field: field.into(),
            direction,
        });
    }

    /// Negative values clamp to zero, which means "not set".
    pub fn set_page(&self, skip: i64, take: i64) {
        write(&self.state).document.page = Page::clamped(skip, take);
    }

    /// Adds a preload; `None` loads the relation without conditions.
    pub fn add_preload(&self, relation: impl Into<String>, filter: Option<Expr>) {
        write(&self.state)
            .document
            .preloads
            .entry(relation.into())
            .or_default()
            .extend(filter);
    }

    pub fn set_selected_fields<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) {
        write(&self.state).selected = fields.into_iter().map(Into::into).collect();
    }

    pub fn add_selected_field(&self, field: impl Into<String>) {
        write(&self.state).selected.insert(field.into());
    }

    pub fn set_ignored_fields<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) {
        write(&self.state).ignored = fields.into_iter().map(Into::into).collect();
    }

    pub fn add_ignored_field(&self, field: impl Into<String>) {
        write(&self.state).ignored.insert(field.into());
    }

    pub fn set_allowed_fields<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) {
        write(&self.state).allowed = fields.into_iter().map(Into::into).collect();
    }

    pub fn add_allowed_field(&self, field: impl Into<String>) {
        write(&self.state).allowed.insert(field.into());
    }

    pub fn set_whitelist_active(&self, active: bool) {
        write(&self.state).whitelist_active = active;
    }

    pub fn set_naming_strategy(&self, naming: NamingStrategy) {
        write(&self.state).naming = naming;
    }

    pub fn set_group_by<S: Into<String>>(&self, fields: impl IntoIterator<Item = S>) {
        write(&self.state).group_by = fields.into_iter().map(Into::into).collect();
    }

    /// Forgets the parsed document and every field list. The naming strategy returns to the
    /// configured one.
    pub fn reset(&self) {
        *write(&self.state) = State {
            naming: self.options.naming_strategy,
            ..Default::default()
        };
    }

    // Field policy

    fn policy(&self, state: &State) -> FieldPolicy {
        FieldPolicy::new(state.naming, self.options.identifier_resolution)
            .ignore(&state.ignored)
            .allow(&state.allowed)
            .whitelist(state.whitelist_active)
    }

    fn compile_with(&self, state: &State, document: &Document) -> CompiledQuery {
        let selected: Vec<String> = state.selected.iter().cloned().collect();
        self.policy(state)
            .compile(document, &selected, &state.group_by)
    }

    fn compile_document(&self, document: &Document) -> CompiledQuery {
        self.compile_with(&read(&self.state), document)
    }

    /// The current document with the field policy applied, both read from one snapshot.
    pub fn compiled(&self) -> CompiledQuery {
        let state = read(&self.state);
        self.compile_with(&state, &state.document)
    }

    // Adapters

    /// Registers `adapter` under `name`, replacing any adapter already there.
    pub fn register_adapter(&self, name: impl Into<String>, adapter: Arc<dyn Adapter>) {
        write(&self.adapters).insert(name.into(), adapter);
    }

    pub fn adapter(&self, name: &str) -> Result<Arc<dyn Adapter>> {
        let adapters = read(&self.adapters);
        adapters
            .get(name)
            .or_else(|| adapters.get(&name.trim().to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| Error::AdapterMismatch(msg::unknown_adapter(name)))
    }

    pub fn adapter_names(&self) -> Vec<String> {
        read(&self.adapters).keys().cloned().collect()
    }

    // Plugins

    pub fn register_plugin(&self, plugin: Arc<dyn Plugin>) {
        write(&self.plugins).register(plugin);
    }

    pub fn unregister_plugin(&self, name: &str) -> bool {
        write(&self.plugins).unregister(name)
    }

    pub fn plugin_names(&self) -> Vec<String> {
        read(&self.plugins).names()
    }

    // Render stage

    fn run_render<R: AsOutput>(
        &self,
        adapter: &str,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
        render: impl FnOnce(&dyn Adapter) -> Result<R>,
    ) -> Result<R> {
        let found = self.adapter(adapter)?;
        let plugins = read(&self.plugins).clone();
        let qctx = QueryContext {
            adapter,
            query,
            render: ctx,
            parts,
        };
        self.track_plugin(plugins.before_query(&qctx))?;
        let rendered = match render(found.as_ref()) {
            Ok(rendered) => rendered,
            Err(e) => {
                self.metrics.render_failed();
                return Err(e);
            }
        };
        self.metrics.rendered();
        self.track_plugin(plugins.after_query(&qctx, &rendered.as_output()))?;
        Ok(rendered)
    }

    pub fn render_sql(
        &self,
        adapter: &str,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        let query = self.compiled();
        self.run_render(adapter, &query, ctx, parts, |a| {
            a.render_sql(&query, ctx, parts)
        })
    }

    pub fn render_query(
        &self,
        adapter: &str,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<Query> {
        let query = self.compiled();
        self.run_render(adapter, &query, ctx, parts, |a| {
            a.render_query(&query, ctx, parts)
        })
    }

    /// Rendered text with arguments inlined, for logs and debugging only.
    pub fn render_explain(
        &self,
        adapter: &str,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        let query = self.compiled();
        self.run_render(adapter, &query, ctx, parts, |a| {
            a.render_explain(&query, ctx, parts)
        })
    }

    /// Parses and renders `dsl` in one go without touching the current document. Field lists
    /// and the naming strategy still apply.
    pub fn compile(
        &self,
        dsl: &str,
        adapter: &str,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<Query> {
        let (_, document) = self.prepare(dsl)?;
        let query = self.compile_document(&document);
        self.run_render(adapter, &query, ctx, parts, |a| {
            a.render_query(&query, ctx, parts)
        })
    }

    /// [`Compiler::compile`] for many filters at once, on `executor`. Results keep input order.
    #[cfg(feature = "batch")]
    pub async fn compile_batch(
        self: &Arc<Self>,
        executor: &BatchExecutor,
        dsls: Vec<String>,
        adapter: &str,
        ctx: &RenderContext,
    ) -> Vec<BatchResult<Query>> {
        let units = dsls
            .into_iter()
            .map(|dsl| {
                let compiler = Arc::clone(self);
                let adapter = adapter.to_string();
                let ctx = ctx.clone();
                move || compiler.compile(&dsl, &adapter, &ctx, None)
            })
            .collect::<Vec<_>>();
        executor.run(units).await
    }

    // Observability

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stops the cache reaper, if there is one. The compiler stays usable.
    pub fn close(&self) {
        if let Some(cache) = &self.cache {
            cache.close();
        }
    }
}
