//! Mongo-style `find` and `aggregate` documents.

mod filter;

pub use filter::{filter, like_to_regex, value};

use log::{debug, trace};
use qfilter_parser::ast::{Expr, SortDirection, SortEntry};
use serde_json::{Map, Value as Json};

use crate::{
    adapter::{Adapter, CompiledQuery, DocumentQuery, Part, Query, RenderContext},
    errors::{msg, Error, Result},
};

#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentAdapter;

fn object(entries: impl IntoIterator<Item = (String, Json)>) -> Json {
    Json::Object(entries.into_iter().collect::<Map<_, _>>())
}

fn conjunction(exprs: &[Expr]) -> Option<Json> {
    match exprs {
        [] => None,
        [single] => Some(filter(single)),
        many => Some(object([(
            "$and".to_string(),
            many.iter().map(filter).collect(),
        )])),
    }
}

fn sort(entries: &[SortEntry]) -> Json {
    object(entries.iter().map(|s| {
        let order = match s.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        (s.field.clone(), Json::from(order))
    }))
}

fn projection(fields: &[String]) -> Json {
    object(fields.iter().map(|f| (f.clone(), Json::from(1))))
}

impl DocumentAdapter {
    /// `{filter, sort, skip?, limit?, projection?}`. Preloads need a pipeline and are left out.
    pub fn find(&self, query: &CompiledQuery) -> Json {
        if !query.preloads.is_empty() {
            debug!("FIND ignores preloads; render AGGREGATE to load relations");
        }
        let mut find = Map::new();
        let filter = query.filter.as_ref().map(filter).unwrap_or_else(|| object([]));
        find.insert("filter".to_string(), filter);
        find.insert("sort".to_string(), sort(&query.sort));
        if query.page.skip > 0 {
            find.insert("skip".to_string(), Json::from(query.page.skip));
        }
        if query.page.take > 0 {
            find.insert("limit".to_string(), Json::from(query.page.take));
        }
        if !query.selected.is_empty() {
            find.insert("projection".to_string(), projection(&query.selected));
        }
        Json::Object(find)
    }

    /// One `$lookup` stage per preload, then the match, grouping, sort, paging and projection
    /// stages that have something to do.
    pub fn aggregate(&self, query: &CompiledQuery, ctx: &RenderContext) -> Json {
        let mut pipeline = Vec::new();
        for (relation, exprs) in &query.preloads {
            let sub_pipeline = conjunction(exprs)
                .map(|m| vec![object([("$match".to_string(), m)])])
                .unwrap_or_default();
            pipeline.push(object([(
                "$lookup".to_string(),
                object([
                    ("from".to_string(), Json::from(ctx.collection_for(relation))),
                    ("pipeline".to_string(), Json::Array(sub_pipeline)),
                    ("as".to_string(), Json::from(relation.as_str())),
                ]),
            )]));
        }
        if let Some(f) = &query.filter {
            pipeline.push(object([("$match".to_string(), filter(f))]));
        }
        if !query.group_by.is_empty() {
            let id = object(
                query
                    .group_by
                    .iter()
                    .map(|f| (f.clone(), Json::from(format!("${f}")))),
            );
            pipeline.push(object([(
                "$group".to_string(),
                object([("_id".to_string(), id)]),
            )]));
        }
        if !query.sort.is_empty() {
            pipeline.push(object([("$sort".to_string(), sort(&query.sort))]));
        }
        if query.page.skip > 0 {
            pipeline.push(object([("$skip".to_string(), Json::from(query.page.skip))]));
        }
        if query.page.take > 0 {
            pipeline.push(object([("$limit".to_string(), Json::from(query.page.take))]));
        }
        if !query.selected.is_empty() {
            pipeline.push(object([(
                "$project".to_string(),
                projection(&query.selected),
            )]));
        }
        Json::Array(pipeline)
    }

    fn render(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<DocumentQuery> {
        let collection = ctx
            .table
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::AdapterMismatch(msg::no_collection()))?;
        let default = Part::DOCUMENT_DEFAULT;
        let parts = parts.unwrap_or(&default);
        let mut rendered = Map::new();
        for part in parts {
            let doc = match part {
                Part::Find => self.find(query),
                Part::Aggregate => self.aggregate(query, ctx),
                other => {
                    trace!("document queries have no `{other}` part");
                    continue;
                }
            };
            rendered.insert(part.tag().to_string(), doc);
        }
        Ok(DocumentQuery {
            collection,
            parts: rendered,
        })
    }
}

impl Adapter for DocumentAdapter {
    fn name(&self) -> &str {
        "document"
    }

    /// Compact JSON keyed by part tag.
    fn render_sql(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        let rendered = self.render(query, ctx, parts)?;
        Ok(Json::Object(rendered.parts).to_string())
    }

    fn render_query(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<Query> {
        self.render(query, ctx, parts).map(Query::Document)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use qfilter_parser::parse;
    use serde_json::json;

    use super::*;

    fn compiled(dsl: &str) -> CompiledQuery {
        let doc = parse(dsl);
        CompiledQuery {
            filter: doc.filter,
            sort: doc.sort,
            page: doc.page,
            preloads: doc.preloads,
            ..Default::default()
        }
    }

    #[test]
    fn test_find() {
        let mut query = compiled("age>18 sort=name:asc,age:desc page=skip:10,take:5");
        query.selected = vec!["name".to_string()];
        assert_eq!(
            DocumentAdapter.find(&query),
            json!({
                "filter": {"age": {"$gt": 18}},
                "sort": {"name": 1, "age": -1},
                "skip": 10,
                "limit": 5,
                "projection": {"name": 1}
            })
        );
        assert_eq!(
            DocumentAdapter.find(&CompiledQuery::default()),
            json!({"filter": {}, "sort": {}})
        );
    }

    #[test]
    fn test_aggregate_lookups() {
        let query = compiled(r#"id>5 load=[orders:status="open"|items] page=take:3"#);
        let ctx = RenderContext::table("users").with_collection("items", "order_items");
        assert_eq!(
            DocumentAdapter.aggregate(&query, &ctx),
            json!([
                {"$lookup": {
                    "from": "orders",
                    "pipeline": [{"$match": {"status": {"$eq": "open"}}}],
                    "as": "orders"
                }},
                {"$lookup": {"from": "order_items", "pipeline": [], "as": "items"}},
                {"$match": {"id": {"$gt": 5}}},
                {"$limit": 3}
            ])
        );
    }

    #[test]
    fn test_render_sql_is_compact_json() {
        let text = DocumentAdapter
            .render_sql(&compiled("a=1"), &RenderContext::table("c"), None)
            .unwrap();
        assert_eq!(text, r#"{"FIND":{"filter":{"a":{"$eq":1}},"sort":{}}}"#);
    }

    #[test]
    fn test_parts_and_collection() {
        let parts = Part::parse_list("aggregate, where, find");
        let rendered = DocumentAdapter
            .render_query(&compiled("a=1"), &RenderContext::table("c"), Some(&parts))
            .unwrap();
        let Query::Document(doc) = rendered else {
            panic!("expected a document query");
        };
        assert_eq!(doc.collection, "c");
        assert_eq!(doc.parts.keys().collect::<Vec<_>>(), vec!["AGGREGATE", "FIND"]);

        assert_eq!(
            DocumentAdapter.render_sql(&compiled("a=1"), &RenderContext::default(), None),
            Err(Error::AdapterMismatch(msg::no_collection()))
        );
    }
}
