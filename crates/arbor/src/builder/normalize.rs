//! Raw condition specs → condition nodes.

use crate::arborescence::{Arborescence, NodeId};
use crate::condition::{ConditionNode, Conditions, Entry, LogicalOp, Operator};
use crate::error::{OrmError, OrmResult};
use crate::relation::RelationKind;
use crate::value::Value;

/// Normalize `conditions`, resolving paths relative to `scope`.
pub(crate) fn normalize(
    arb: &mut Arborescence<'_>,
    scope: NodeId,
    conditions: &Conditions,
) -> OrmResult<Vec<ConditionNode>> {
    let mut out = Vec::with_capacity(conditions.len());
    for (logic, entry) in &conditions.entries {
        let node = match entry {
            Entry::Compare {
                path,
                operator,
                value,
            } => compare(arb, scope, path, operator, value, *logic)?,
            Entry::Group(group) => ConditionNode::Nested {
                children: normalize(arb, scope, group)?,
                logic: *logic,
            },
            Entry::In {
                path,
                values,
                negate,
            } => {
                let (node, columns) = target(arb, scope, path)?;
                let [column] = columns.as_slice() else {
                    return Err(OrmError::malformed(
                        "conditions",
                        format!("IN on compound attribute '{path}'"),
                    ));
                };
                let leaf = ConditionNode::In {
                    table_alias: arb.node(node).alias.clone(),
                    column: column.clone(),
                    values: values.iter().map(resolve_entity).collect(),
                    negate: *negate,
                    logic: *logic,
                };
                arb.attach(node, leaf.clone());
                leaf
            }
            Entry::Attributes {
                left,
                operator,
                right,
            } => {
                let operator = Operator::parse(operator)?;
                let (left_node, left_columns) = target(arb, scope, left)?;
                let (right_node, right_columns) = target(arb, scope, right)?;
                let ([left_column], [right_column]) =
                    (left_columns.as_slice(), right_columns.as_slice())
                else {
                    return Err(OrmError::malformed(
                        "conditions",
                        format!("cannot compare compound attributes '{left}' and '{right}'"),
                    ));
                };
                let leaf = ConditionNode::Attribute {
                    left_alias: arb.node(left_node).alias.clone(),
                    left_column: left_column.clone(),
                    operator,
                    right_alias: arb.node(right_node).alias.clone(),
                    right_column: right_column.clone(),
                    logic: *logic,
                };
                arb.attach(left_node, leaf.clone());
                leaf
            }
            Entry::Exists { subquery, negate } => ConditionNode::Exists {
                subquery: subquery.clone(),
                negate: *negate,
                logic: *logic,
            },
            Entry::SubQuery {
                subquery,
                operator,
                value,
            } => ConditionNode::SubQuery {
                subquery: subquery.clone(),
                operator: Operator::parse(operator)?,
                value: resolve_entity(value),
                logic: *logic,
            },
        };
        out.push(node);
    }
    Ok(out)
}

fn compare(
    arb: &mut Arborescence<'_>,
    scope: NodeId,
    path: &str,
    operator: &str,
    value: &Value,
    logic: LogicalOp,
) -> OrmResult<ConditionNode> {
    let operator = Operator::parse(operator)?;
    let (node, attribute) = arb.resolve_from(scope, path)?;

    if let Some(hook) = arb.model(node).and_then(|m| m.hook(&attribute)) {
        let produced = hook(operator, value)?;
        tracing::trace!(path, "expanding attribute hook");
        return Ok(ConditionNode::Nested {
            children: normalize(arb, node, &produced)?,
            logic,
        });
    }

    let (node, columns) = attribute_columns(arb, node, &attribute)?;
    let alias = arb.node(node).alias.clone();
    let value = resolve_entity(value);
    let leaf = match columns.as_slice() {
        [column] => scalar(&alias, column, operator, value)?,
        _ => compound(&alias, &columns, operator, value)?,
    }
    .with_logic(logic);
    arb.attach(node, leaf.clone());
    Ok(leaf)
}

/// Resolve a path to the node holding its column(s).
fn target(
    arb: &mut Arborescence<'_>,
    scope: NodeId,
    path: &str,
) -> OrmResult<(NodeId, Vec<String>)> {
    let (node, attribute) = arb.resolve_from(scope, path)?;
    attribute_columns(arb, node, &attribute)
}

/// Columns an attribute stands for. A comma list is a compound attribute; a
/// relation name compares against the linked key.
fn attribute_columns(
    arb: &mut Arborescence<'_>,
    node: NodeId,
    attribute: &str,
) -> OrmResult<(NodeId, Vec<String>)> {
    if attribute.contains(',') {
        let table = arb.table(node);
        let columns = attribute
            .split(',')
            .map(|a| table.column_real_name(a.trim()).to_string())
            .collect();
        return Ok((node, columns));
    }

    if let Some(relation) = arb.model(node).and_then(|m| m.relation(attribute)) {
        if relation.kind == RelationKind::BelongsTo {
            return Ok((node, vec![relation.current.column.clone()]));
        }
        let child = arb.child(node, attribute)?;
        return Ok((child, arb.table(child).primary_key_columns()));
    }

    Ok((node, vec![arb.table(node).column_real_name(attribute).to_string()]))
}

/// Entity references become their key: a scalar, or a list for compound keys.
fn resolve_entity(value: &Value) -> Value {
    match value {
        Value::Entity(key) if key.len() == 1 => key[0].clone(),
        Value::Entity(key) => Value::List(key.clone()),
        Value::List(items) => Value::List(items.iter().map(resolve_entity).collect()),
        other => other.clone(),
    }
}

fn simple(alias: &str, column: &str, operator: Operator, value: Value) -> ConditionNode {
    ConditionNode::simple(alias, column, operator, value)
}

/// `=` / `!=` against nothing become NULL tests.
fn null_test(alias: &str, column: &str, operator: Operator) -> OrmResult<ConditionNode> {
    match operator {
        Operator::Eq | Operator::Is => Ok(simple(alias, column, Operator::IsNull, Value::Null)),
        Operator::Ne | Operator::IsNot => {
            Ok(simple(alias, column, Operator::IsNotNull, Value::Null))
        }
        Operator::IsNull | Operator::IsNotNull => Ok(simple(alias, column, operator, Value::Null)),
        other => Err(OrmError::malformed(
            "conditions",
            format!("operator {other} on '{column}' needs a value"),
        )),
    }
}

fn scalar(alias: &str, column: &str, operator: Operator, value: Value) -> OrmResult<ConditionNode> {
    if operator.is_unary() {
        return null_test(alias, column, operator);
    }
    match value {
        Value::Null => null_test(alias, column, operator),
        Value::List(items) if matches!(operator, Operator::Between | Operator::NotBetween) => {
            if items.len() != 2 {
                return Err(OrmError::malformed(
                    "conditions",
                    format!("{operator} on '{column}' needs exactly two values"),
                ));
            }
            Ok(simple(alias, column, operator, Value::List(items)))
        }
        Value::List(items) if operator.takes_list() => {
            Ok(simple(alias, column, operator, Value::List(items)))
        }
        Value::List(mut items) => match items.len() {
            0 => null_test(alias, column, operator),
            1 => scalar(alias, column, operator, items.remove(0)),
            _ => {
                let arrayified = operator.arrayified().ok_or_else(|| {
                    OrmError::malformed(
                        "conditions",
                        format!("operator {operator} on '{column}' does not accept a list"),
                    )
                })?;
                Ok(simple(alias, column, arrayified, Value::List(items)))
            }
        },
        value if matches!(operator, Operator::In | Operator::NotIn) => {
            Ok(simple(alias, column, operator, Value::List(vec![value])))
        }
        _ if operator.takes_list() => Err(OrmError::malformed(
            "conditions",
            format!("operator {operator} on '{column}' needs a list"),
        )),
        value => Ok(simple(alias, column, operator, value)),
    }
}

/// Compound attribute: a disjunction of per-tuple conjunctions. `!=` uses the
/// De Morgan dual (a conjunction of per-tuple disjunctions).
fn compound(
    alias: &str,
    columns: &[String],
    operator: Operator,
    value: Value,
) -> OrmResult<ConditionNode> {
    let negate = match operator {
        Operator::Eq | Operator::In => false,
        Operator::Ne | Operator::NotIn => true,
        other => {
            return Err(OrmError::malformed(
                "conditions",
                format!("operator {other} is not supported on compound attributes"),
            ));
        }
    };

    let tuples: Vec<Vec<Value>> = match value {
        Value::List(items) if items.iter().all(Value::is_list) && !items.is_empty() => items
            .into_iter()
            .map(|t| match t {
                Value::List(values) => values,
                other => vec![other],
            })
            .collect(),
        Value::List(items) if items.is_empty() => Vec::new(),
        Value::List(items) => vec![items],
        other => vec![vec![other]],
    };

    if tuples.is_empty() {
        return Ok(ConditionNode::In {
            table_alias: alias.to_string(),
            column: columns[0].clone(),
            values: Vec::new(),
            negate,
            logic: LogicalOp::And,
        });
    }

    let (inner, outer) = if negate {
        (LogicalOp::Or, LogicalOp::And)
    } else {
        (LogicalOp::And, LogicalOp::Or)
    };
    let column_operator = if negate { Operator::Ne } else { Operator::Eq };

    let mut groups = Vec::with_capacity(tuples.len());
    for (i, tuple) in tuples.into_iter().enumerate() {
        if tuple.len() != columns.len() {
            return Err(OrmError::malformed(
                "conditions",
                format!(
                    "expected {} values for ({}), got {}",
                    columns.len(),
                    columns.join(","),
                    tuple.len()
                ),
            ));
        }
        let mut children = Vec::with_capacity(columns.len());
        for (j, (column, value)) in columns.iter().zip(tuple).enumerate() {
            let logic = if j == 0 { LogicalOp::And } else { inner };
            children.push(scalar(alias, column, column_operator, value)?.with_logic(logic));
        }
        let logic = if i == 0 { LogicalOp::And } else { outer };
        groups.push(ConditionNode::Nested { children, logic });
    }

    Ok(match groups.len() {
        1 => groups.remove(0),
        _ => ConditionNode::nested(groups),
    })
}
