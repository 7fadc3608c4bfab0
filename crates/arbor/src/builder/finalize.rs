//! Deferred relation-aware rewriting of normalized conditions.
//!
//! Leaves that reach through a to-many relation cannot stay in the outer WHERE
//! over a plain join without multiplying root rows. Within each group, leaves
//! are collected per *anchor* (the first multi-valued node below the current
//! scope) and replaced, at the first leaf's position, by the anchor relation's
//! semi-join. The same pass runs inside each semi-join with the anchor as scope.
//!
//! Merging is only sound when a group is purely AND or purely OR. A group that
//! mixes both around anchored leaves is first split into its OR-separated AND
//! runs, each run becoming a nested group.

use crate::arborescence::{Arborescence, NodeId};
use crate::condition::{ConditionNode, LogicalOp};
use crate::error::{OrmError, OrmResult};

/// Rewrite top-level conditions and mark the outer joins they need.
pub(crate) fn finalize(
    arb: &mut Arborescence<'_>,
    conditions: Vec<ConditionNode>,
) -> OrmResult<Vec<ConditionNode>> {
    let conjunctive = conditions
        .iter()
        .skip(1)
        .all(|c| c.logic() == LogicalOp::And);
    if conjunctive {
        for condition in &conditions {
            if !condition.rejects_missing_row() {
                continue;
            }
            let Some(id) = condition.table_alias().and_then(|a| arb.node_by_alias(a)) else {
                continue;
            };
            if arb.anchor(NodeId::ROOT, id).is_none() {
                arb.require(id);
            }
        }
    }

    let mut needed = Vec::new();
    let rewritten = rewrite(arb, conditions, NodeId::ROOT, &mut needed)?;
    for id in needed {
        arb.join_path(id);
    }
    Ok(rewritten)
}

enum Slot {
    Done(ConditionNode),
    Anchor(NodeId),
}

/// Rewrite one group. `needed` collects nodes the enclosing statement must
/// join for the conditions left in place.
fn rewrite(
    arb: &mut Arborescence<'_>,
    conditions: Vec<ConditionNode>,
    scope: NodeId,
    needed: &mut Vec<NodeId>,
) -> OrmResult<Vec<ConditionNode>> {
    let conditions = split_and_runs(arb, conditions, scope);
    let mut slots = Vec::with_capacity(conditions.len());
    let mut groups: Vec<(NodeId, Vec<ConditionNode>)> = Vec::new();

    for condition in conditions {
        if let ConditionNode::Nested { children, logic } = condition {
            let children = rewrite(arb, children, scope, needed)?;
            slots.push(Slot::Done(ConditionNode::Nested { children, logic }));
            continue;
        }

        let Some(owner) = condition.table_alias().and_then(|a| arb.node_by_alias(a)) else {
            slots.push(Slot::Done(condition));
            continue;
        };

        let anchor = arb.anchor(scope, owner);
        if let ConditionNode::Attribute { right_alias, .. } = &condition {
            if let Some(right) = arb.node_by_alias(right_alias) {
                match (anchor, arb.anchor(scope, right)) {
                    (_, None) => needed.push(right),
                    (Some(left), Some(other)) if left == other => {}
                    (None, Some(_)) => {
                        return Err(OrmError::malformed(
                            "conditions",
                            "a to-many column may only appear on the left side of a column comparison",
                        ));
                    }
                    (Some(_), Some(_)) => {
                        return Err(OrmError::malformed(
                            "conditions",
                            "cannot compare columns across different to-many relations",
                        ));
                    }
                }
            }
        }

        match anchor {
            None => {
                needed.push(owner);
                slots.push(Slot::Done(condition));
            }
            Some(anchor) => match groups.iter_mut().find(|(a, _)| *a == anchor) {
                Some((_, leaves)) => leaves.push(condition),
                None => {
                    groups.push((anchor, vec![condition]));
                    slots.push(Slot::Anchor(anchor));
                }
            },
        }
    }

    let mut out = Vec::with_capacity(slots.len());
    for slot in slots {
        match slot {
            Slot::Done(condition) => out.push(condition),
            Slot::Anchor(anchor) => {
                let Some(idx) = groups.iter().position(|(a, _)| *a == anchor) else {
                    continue;
                };
                let (_, leaves) = groups.swap_remove(idx);
                if let Some(parent) = arb.node(anchor).parent {
                    needed.push(parent);
                }
                out.push(semi_join(arb, anchor, leaves)?);
            }
        }
    }
    Ok(out)
}

/// Regroup a group mixing AND and OR into its AND runs, so that AND keeps
/// binding tighter than OR once anchored leaves are merged. Groups that are
/// purely one operator, or have no anchored leaf, are returned unchanged.
fn split_and_runs(
    arb: &Arborescence<'_>,
    conditions: Vec<ConditionNode>,
    scope: NodeId,
) -> Vec<ConditionNode> {
    let has_or = conditions.iter().skip(1).any(|c| c.logic() == LogicalOp::Or);
    let has_and = conditions.iter().skip(1).any(|c| c.logic() == LogicalOp::And);
    let anchored = conditions.iter().any(|c| {
        !matches!(c, ConditionNode::Nested { .. })
            && c.table_alias()
                .and_then(|a| arb.node_by_alias(a))
                .is_some_and(|owner| arb.anchor(scope, owner).is_some())
    });
    if !(has_or && has_and && anchored) {
        return conditions;
    }

    let mut runs: Vec<Vec<ConditionNode>> = Vec::new();
    for (i, condition) in conditions.into_iter().enumerate() {
        match runs.last_mut() {
            Some(run) if i > 0 && condition.logic() == LogicalOp::And => run.push(condition),
            _ => runs.push(vec![condition]),
        }
    }
    runs.into_iter()
        .map(|mut run| {
            if run.len() == 1 {
                return run.remove(0);
            }
            let logic = run[0].logic();
            run[0].set_logic(LogicalOp::And);
            ConditionNode::Nested {
                children: run,
                logic,
            }
        })
        .collect()
}

/// Replace the leaves collected on `anchor` by its relation's semi-join.
fn semi_join(
    arb: &mut Arborescence<'_>,
    anchor: NodeId,
    leaves: Vec<ConditionNode>,
) -> OrmResult<ConditionNode> {
    let logic = leaves.first().map_or(LogicalOp::And, ConditionNode::logic);
    let any = leaves.len() > 1 && leaves.iter().skip(1).all(|l| l.logic() == LogicalOp::Or);
    let leaves: Vec<ConditionNode> = leaves
        .into_iter()
        .enumerate()
        .map(|(i, l)| if i == 0 { l.with_logic(LogicalOp::And) } else { l })
        .collect();

    let mut inner_needed = Vec::new();
    let inner = rewrite(arb, leaves, anchor, &mut inner_needed)?;
    let joins = arb.joins_within(anchor, &inner_needed);

    let node = arb.node(anchor);
    let (Some(relation), Some(parent)) = (node.relation.clone(), node.parent) else {
        return Err(OrmError::validation(format!(
            "'{}' is not reached through a relation",
            node.alias
        )));
    };
    let combinator = if any { LogicalOp::Or } else { LogicalOp::And };
    let strategy = relation.condition_strategy(combinator, inner.len());
    tracing::debug!(
        relation = %relation.name,
        alias = %node.alias,
        conditions = inner.len(),
        ?strategy,
        "semi-join"
    );

    Ok(relation.semi_join(
        &arb.node(parent).alias,
        &node.alias,
        joins,
        inner,
        strategy,
        logic,
    ))
}
