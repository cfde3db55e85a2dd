use crate::ast::Expr;

/// What the parser collects for one parenthesized level before precedence is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Logic(Logic),
    Group(Vec<Node>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
    Not,
}

#[derive(Debug)]
enum Item {
    Expr(Expr),
    Logic(Logic),
}

/// Collapses one level of nodes into a single expression with `not` binding tighter than `and`,
/// and `and` binding tighter than `or`. Groups are assembled first and take part as plain
/// operands. Two operands with nothing between them are joined by `and`; logical keywords with
/// nothing to combine are discarded.
pub fn assemble(nodes: Vec<Node>) -> Option<Expr> {
    let items: Vec<Item> = nodes
        .into_iter()
        .filter_map(|node| match node {
            Node::Expr(e) => Some(Item::Expr(e)),
            Node::Logic(l) => Some(Item::Logic(l)),
            Node::Group(children) => assemble(children).map(Item::Expr),
        })
        .collect();

    let items = apply_not(items);
    let (first, rest) = alternate(items)?;

    let mut disjuncts = Vec::new();
    let mut current = first;
    for (logic, operand) in rest {
        match logic {
            Logic::Or => disjuncts.push(std::mem::replace(&mut current, operand)),
            _ => current = Expr::And(vec![current, operand]),
        }
    }
    disjuncts.push(current);

    disjuncts
        .into_iter()
        .reduce(|left, right| Expr::Or(vec![left, right]))
}

/// Wraps the operand after each `not`. Walking right to left lets `not not x` nest.
fn apply_not(mut items: Vec<Item>) -> Vec<Item> {
    let mut i = items.len();
    while i > 0 {
        i -= 1;
        if !matches!(items[i], Item::Logic(Logic::Not)) {
            continue;
        }
        if matches!(items.get(i + 1), Some(Item::Expr(_))) {
            if let Item::Expr(operand) = items.remove(i + 1) {
                items[i] = Item::Expr(Expr::not(operand));
            }
        } else {
            log::debug!("dropping `not` with no operand");
            items.remove(i);
        }
    }
    items
}

/// Normalizes the item list to `expr (logic expr)*`.
fn alternate(items: Vec<Item>) -> Option<(Expr, Vec<(Logic, Expr)>)> {
    let mut first: Option<Expr> = None;
    let mut rest = Vec::new();
    let mut pending: Option<Logic> = None;
    for item in items {
        match item {
            Item::Expr(e) if first.is_none() => first = Some(e),
            Item::Expr(e) => rest.push((pending.take().unwrap_or(Logic::And), e)),
            Item::Logic(logic) if first.is_some() && pending.is_none() => pending = Some(logic),
            Item::Logic(logic) => log::debug!("dropping dangling `{logic:?}`"),
        }
    }
    if let Some(logic) = pending {
        log::debug!("dropping trailing `{logic:?}`");
    }
    first.map(|first| (first, rest))
}
