//! FLWOR clause execution: iteration, `let`/`where`, ordering, `return`
//! shaping and `collect` grouping.

use std::cmp::Ordering;

use log::trace;

use crate::{
    ast::{CollectClause, Direction, Expr, Flwor, OrderBy, ReturnClause, ReturnItems, Terminal},
    evaluator::{EvalError, Evaluator},
    scope::Scope,
    value::{Key, Map, Value},
};

impl Evaluator {
    pub(crate) fn eval_flwor(&self, flwor: &Flwor, scope: &Scope) -> Result<Value, EvalError> {
        match &flwor.terminal {
            Terminal::Return(clause) => self.eval_return(flwor, clause, scope),
            Terminal::Collect(clauses) => self.eval_collect(flwor, clauses, scope),
        }
    }

    /// Calls `body` once per surviving iteration with the iteration's scope.
    ///
    /// Without a `for` clause the chain runs exactly once in `scope`.
    fn each_iteration<F>(&self, flwor: &Flwor, scope: &Scope, mut body: F) -> Result<(), EvalError>
    where
        F: FnMut(&Scope) -> Result<(), EvalError>,
    {
        let Some(clause) = &flwor.for_clause else {
            return self.run_iteration(flwor, scope.clone(), &mut body);
        };

        let source = self.eval_expr(&clause.source, scope)?;
        for (i, item) in source.iterate()?.into_iter().enumerate() {
            trace!("for {} iteration {}", clause.variable, i);
            let frame = scope.bind(clause.variable.clone(), item);
            self.run_iteration(flwor, frame, &mut body)?;
        }
        Ok(())
    }

    fn run_iteration<F>(&self, flwor: &Flwor, mut scope: Scope, body: &mut F) -> Result<(), EvalError>
    where
        F: FnMut(&Scope) -> Result<(), EvalError>,
    {
        for binding in &flwor.lets {
            let value = match &binding.value {
                Expr::Function { params, body: code } => {
                    self.closure(params, code, &scope, Some(binding.name.clone()))
                }
                expr => self.eval_expr(expr, &scope)?,
            };
            scope = scope.bind(binding.name.clone(), value);
        }

        if let Some(condition) = &flwor.where_clause
            && !self.eval_expr(condition, &scope)?.is_truthy()
        {
            return Ok(());
        }
        body(&scope)
    }

    fn eval_return(
        &self,
        flwor: &Flwor,
        clause: &ReturnClause,
        scope: &Scope,
    ) -> Result<Value, EvalError> {
        let mut rows = Vec::new();
        self.each_iteration(flwor, scope, |frame| {
            let row = match &clause.items {
                ReturnItems::Positional(items) if items.len() == 1 => {
                    self.eval_expr(&items[0], frame)?
                }
                ReturnItems::Positional(items) => Value::List(
                    items
                        .iter()
                        .map(|item| self.eval_expr(item, frame))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                ReturnItems::Named(items) => {
                    let mut map = Map::new();
                    for (name, item) in items {
                        map.insert(Key::String(name.clone()), self.eval_expr(item, frame)?);
                    }
                    Value::Map(map)
                }
            };
            rows.push(row);
            Ok(())
        })?;

        if let Some(order) = &flwor.order_by {
            rows = sort_rows(rows, order, clause.items.len() == 1)?;
        }

        if clause.flatten {
            let mut flat = Vec::new();
            for row in rows {
                flatten_into(row, &mut flat);
            }
            Ok(Value::List(flat))
        } else {
            Ok(Value::List(rows))
        }
    }

    /// Groups the surviving iterations into one mapping per clause, in a
    /// single pass: `acc[key] = reducer(acc.get(key, None), value)`.
    fn eval_collect(
        &self,
        flwor: &Flwor,
        clauses: &[CollectClause],
        scope: &Scope,
    ) -> Result<Value, EvalError> {
        let mut groups = vec![Map::new(); clauses.len()];
        self.each_iteration(flwor, scope, |frame| {
            for (clause, group) in clauses.iter().zip(groups.iter_mut()) {
                let key = Key::from_value(&self.eval_expr(&clause.key, frame)?)?;
                let value = self.eval_expr(&clause.value, frame)?;
                let reducer = self.eval_expr(&clause.reducer, frame)?;
                let previous = group.get(&key).cloned().unwrap_or(Value::None);
                let next = reducer.call(&[previous, value])?;
                trace!("collect {} -> {}", key, next);
                group.insert(key, next);
            }
            Ok(())
        })?;

        if groups.len() == 1 {
            Ok(Value::Map(groups.remove(0)))
        } else {
            Ok(Value::List(groups.into_iter().map(Value::Map).collect()))
        }
    }
}

/// Stable sort of return rows by one component.
///
/// A single-item return is ordered by the value itself.
fn sort_rows(rows: Vec<Value>, order: &OrderBy, single: bool) -> Result<Vec<Value>, EvalError> {
    let keys = rows
        .iter()
        .map(|row| match row {
            _ if single => Ok(row.clone()),
            Value::List(items) => items.get(order.index).cloned().ok_or(EvalError::Index {
                index: order.index as i64,
                len: items.len(),
            }),
            other => Err(EvalError::type_error(format!(
                "cannot order '{}' rows by component {}",
                other.type_name(),
                order.index
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut positions: Vec<usize> = (0..rows.len()).collect();
    let mut failure = None;
    positions.sort_by(|&a, &b| {
        let ordering = keys[a].compare(&keys[b]).unwrap_or_else(|e| {
            failure.get_or_insert(e);
            Ordering::Equal
        });
        match order.direction {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    });
    if let Some(e) = failure {
        return Err(e);
    }

    let mut slots: Vec<Option<Value>> = rows.into_iter().map(Some).collect();
    Ok(positions
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect())
}

/// Appends every non-list leaf of `value`, unfolding lists at any depth.
fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::List(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        leaf => out.push(leaf),
    }
}
