use indexmap::IndexSet;
use log::debug;
use qfilter_parser::ast::{Document, Expr, Preloads, SortEntry};

use crate::{adapter::CompiledQuery, options::IdentifierResolution, utils::FlexSet};

use super::NamingStrategy;

/// Decides which fields survive into a rendered query and under which names.
///
/// Entries of the ignore list and the whitelist are stored already renamed by the naming
/// strategy, and every field is renamed before it is looked up, so `vendorId` and `vendor_id`
/// always refer to the same column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldPolicy {
    ignored: IndexSet<String>,
    allowed: IndexSet<String>,
    whitelist_active: bool,
    naming: NamingStrategy,
    resolution: IdentifierResolution,
}

impl FieldPolicy {
    pub fn new(naming: NamingStrategy, resolution: IdentifierResolution) -> Self {
        Self {
            naming,
            resolution,
            ..Default::default()
        }
    }

    pub fn ignore<S: AsRef<str>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        let renamed: Vec<String> = fields.into_iter().map(|f| self.rename(f.as_ref())).collect();
        self.ignored.extend(renamed);
        self
    }

    pub fn allow<S: AsRef<str>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        let renamed: Vec<String> = fields.into_iter().map(|f| self.rename(f.as_ref())).collect();
        self.allowed.extend(renamed);
        self
    }

    /// An inactive whitelist admits every field, whatever it contains.
    pub fn whitelist(mut self, active: bool) -> Self {
        self.whitelist_active = active;
        self
    }

    pub fn rename(&self, name: &str) -> String {
        self.naming.apply(name)
    }

    fn lookup<'a>(&self, set: &'a IndexSet<String>, name: &str) -> Option<&'a String> {
        match self.resolution {
            IdentifierResolution::Strict => set.get(name),
            IdentifierResolution::Flexible => set.flex_get(name),
        }
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.lookup(&self.ignored, &self.rename(name)).is_some()
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        !self.whitelist_active || self.lookup(&self.allowed, &self.rename(name)).is_some()
    }

    /// The name a field is rendered under, or `None` when the policy drops it. An active
    /// whitelist renders its own spelling of the entry the field matched.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if name.is_empty() || self.is_ignored(name) {
            return None;
        }
        let renamed = self.rename(name);
        if !self.whitelist_active {
            return Some(renamed);
        }
        self.lookup(&self.allowed, &renamed).cloned()
    }

    /// [`FieldPolicy::resolve`] for a field of a preloaded relation, which may be listed bare
    /// or as `relation.field`.
    pub fn resolve_nested(&self, relation: &str, field: &str) -> Option<String> {
        let qualified = format!("{relation}.{field}");
        if field.is_empty() || self.is_ignored(field) || self.is_ignored(&qualified) {
            return None;
        }
        let renamed = self.rename(field);
        if !self.whitelist_active {
            return Some(renamed);
        }
        if let Some(entry) = self.lookup(&self.allowed, &renamed) {
            return Some(entry.clone());
        }
        let depth = relation.split('.').count();
        self.lookup(&self.allowed, &self.rename(&qualified))
            .and_then(|entry| entry.splitn(depth + 1, '.').nth(depth))
            .filter(|field| !field.is_empty())
            .map(str::to_string)
    }

    pub fn admits(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn admits_nested(&self, relation: &str, field: &str) -> bool {
        self.resolve_nested(relation, field).is_some()
    }

    pub fn filter(&self, expr: Expr) -> Option<Expr> {
        let mut expr = expr.prune(&|field| self.admits(field))?;
        expr.rename_fields(&|field| self.resolve(field).unwrap_or_else(|| self.rename(field)));
        Some(expr)
    }

    fn nested_filter(&self, relation: &str, expr: Expr) -> Option<Expr> {
        let mut expr = expr.prune(&|field| self.admits_nested(relation, field))?;
        expr.rename_fields(&|field| {
            self.resolve_nested(relation, field)
                .unwrap_or_else(|| self.rename(field))
        });
        Some(expr)
    }

    /// Admitted names, resolved, without duplicates.
    pub fn names(&self, names: &[String]) -> Vec<String> {
        names
            .iter()
            .filter_map(|name| self.resolve(name))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn sort(&self, entries: &[SortEntry]) -> Vec<SortEntry> {
        entries
            .iter()
            .filter_map(|entry| {
                Some(SortEntry {
                    field: self.resolve(&entry.field)?,
                    direction: entry.direction,
                })
            })
            .collect()
    }

    /// Drops relations that are not admitted. A relation whose filters are all pruned is still
    /// loaded, with no conditions.
    pub fn preloads(&self, preloads: &Preloads) -> Preloads {
        let mut result = Preloads::new();
        for (relation, exprs) in preloads {
            let Some(name) = self.resolve(relation) else {
                debug!("dropping preload of `{relation}`");
                continue;
            };
            let exprs = exprs
                .iter()
                .cloned()
                .filter_map(|e| self.nested_filter(relation, e))
                .collect::<Vec<_>>();
            result.entry(name).or_default()
                .extend(exprs);
        }
        result
    }

    /// A renderable copy of `document`. The document itself is never modified.
    pub fn compile(
        &self,
        document: &Document,
        selected: &[String],
        group_by: &[String],
    ) -> CompiledQuery {
        CompiledQuery {
            filter: document.filter.clone().and_then(|f| self.filter(f)),
            sort: self.sort(&document.sort),
            page: document.page,
            preloads: self.preloads(&document.preloads),
            selected: self.names(selected),
            group_by: self.names(group_by),
        }
    }
}
