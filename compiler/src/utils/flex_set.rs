use indexmap::IndexSet;

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
}

/// Loose identifier equality: case and every non-alphanumeric character are ignored, so
/// `vendorId`, `vendor_id` and `Vendor ID` all name the same field.
pub fn flex_eq(a: &str, b: &str) -> bool {
    itertools::equal(folded(a), folded(b))
}

pub trait FlexSet {
    /// The member equal to `name`, or else the first one equal via [`flex_eq`].
    fn flex_get(&self, name: &str) -> Option<&String>;

    fn flex_contains(&self, name: &str) -> bool {
        self.flex_get(name).is_some()
    }
}

impl FlexSet for IndexSet<String> {
    fn flex_get(&self, name: &str) -> Option<&String> {
        self.get(name)
            .or_else(|| self.iter().find(|candidate| flex_eq(candidate, name)))
    }
}
