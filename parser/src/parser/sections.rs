use chumsky::prelude::*;
use log::debug;

use crate::ast::{clamp, Page, SortDirection, SortEntry};
use crate::tokens::*;

use super::utils::*;

const PAIR_STOP: &[char] = &[SECTION_PAIR_SEPARATOR, SECTION_ENTRY_SEPARATOR];

/// `key` or `key:value`.
fn pair() -> impl Psr<(String, Option<String>)> {
    padded_to_end(
        bareword(PAIR_STOP).then(
            just(SECTION_PAIR_SEPARATOR)
                .ignore_then(bareword(PAIR_STOP))
                .or_not(),
        ),
    )
}

fn pairs(body: &str) -> impl Iterator<Item = (String, Option<String>)> + '_ {
    body.split(SECTION_ENTRY_SEPARATOR)
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| match pair().parse(entry) {
            Ok(p) => Some(p),
            Err(_) => {
                debug!("dropping malformed section entry `{entry}`");
                None
            }
        })
}

/// Entries of a `sort=` section. A missing direction means ascending; an unknown one drops the
/// entry.
pub fn sort(body: &str) -> Vec<SortEntry> {
    pairs(body)
        .filter_map(|(field, direction)| {
            let direction = match direction {
                None => SortDirection::default(),
                Some(keyword) => match SortDirection::from_keyword(&keyword) {
                    Some(d) => d,
                    None => {
                        debug!("dropping sort on `{field}`: unknown direction `{keyword}`");
                        return None;
                    }
                },
            };
            Some(SortEntry { field, direction })
        })
        .collect()
}

/// Applies a `page=` section on top of `page`. Keys that are absent leave the current value;
/// values that are not integers are ignored; negatives clamp to zero.
pub fn apply_page(page: &mut Page, body: &str) {
    for (key, value) in pairs(body) {
        let Some(n) = value.as_deref().and_then(|v| v.parse::<i64>().ok()) else {
            debug!("ignoring page entry `{key}` without an integer value");
            continue;
        };
        if key.eq_ignore_ascii_case(PAGE_SKIP) {
            page.skip = clamp(n);
        } else if key.eq_ignore_ascii_case(PAGE_TAKE) {
            page.take = clamp(n);
        } else {
            debug!("ignoring unknown page key `{key}`");
        }
    }
}

/// One `relation:sub-filter` section of a `load=[...]` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSection<'a> {
    pub relation: &'a str,
    pub filter: Option<&'a str>,
}

/// Splits the inside of a `load=[...]` block on top-level `|`. A section without `:` or with
/// nothing after it names the relation alone.
pub fn load_sections(body: &str) -> Vec<LoadSection<'_>> {
    split_top_level(body, LOAD_SEPARATOR)
        .into_iter()
        .filter_map(|section| {
            let section = section.trim();
            let (relation, filter) = match find_unquoted(section, ":") {
                Some(at) => (section[..at].trim(), Some(section[at + 1..].trim())),
                None => (section, None),
            };
            if relation.is_empty() {
                if !section.is_empty() {
                    debug!("dropping load section `{section}` without a relation");
                }
                return None;
            }
            Some(LoadSection {
                relation,
                filter: filter.filter(|f| !f.is_empty()),
            })
        })
        .collect()
}
