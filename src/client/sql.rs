//! SQL helpers shared by the clients and the query layer.
//!
//! Statements name their parameters `@name`. Before handing SQL to
//! `sqlparser` the parameters are rewritten into positional `?N`
//! placeholders, so any dialect-level handling of `@` never matters.

use sqlparser::ast as sp;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use super::error::{ClientError, ClientResult};
use crate::mapping::Value;

/// Rewrite every `@name` parameter reference outside quoted literals.
///
/// `replace` receives the parameter name and returns its replacement text;
/// `None` leaves the reference untouched.
pub fn replace_parameters<F>(sql: &str, mut replace: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((i, ch)) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                out.push(ch);
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, next)) = chars.peek() {
                    let valid = if j == start {
                        next.is_ascii_alphabetic() || next == '_'
                    } else {
                        next.is_ascii_alphanumeric() || next == '_'
                    };
                    if !valid {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                let name = &sql[start..end];
                match (name.is_empty(), replace(name)) {
                    (false, Some(replacement)) => out.push_str(&replacement),
                    _ => {
                        out.push('@');
                        out.push_str(name);
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Names of the `@name` parameters a statement references, in order of
/// first appearance.
pub fn parameter_names(sql: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    replace_parameters(sql, |name| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        None
    });
    names
}

/// Check that `sql` is exactly one `SELECT` query.
pub fn validate_query(sql: &str) -> ClientResult<()> {
    parse_query(sql).map(|_| ())
}

/// Whether `sql` is a query whose only projection is a `COUNT` call,
/// optionally aliased. Anything unparseable is not a count query.
pub fn is_count_query(sql: &str) -> bool {
    let Ok((query, _)) = parse_query(sql) else {
        return false;
    };
    let sp::SetExpr::Select(select) = query.body.as_ref() else {
        return false;
    };
    match select.projection.as_slice() {
        [sp::SelectItem::UnnamedExpr(sp::Expr::Function(f))]
        | [sp::SelectItem::ExprWithAlias {
            expr: sp::Expr::Function(f),
            ..
        }] => f.name.to_string().eq_ignore_ascii_case("count"),
        _ => false,
    }
}

/// What a simple `SELECT` returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
    CountAll,
}

/// Right-hand side of an equality filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Param(String),
}

/// A single-table `SELECT` with an optional conjunction of equalities.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleSelect {
    pub table: String,
    pub projection: Projection,
    pub filter: Vec<(String, Operand)>,
    pub limit: Option<u64>,
}

impl SimpleSelect {
    /// Parse the subset of `SELECT` the in-memory client evaluates:
    /// `SELECT * | cols | COUNT(*) FROM t [WHERE a = x AND ...] [LIMIT n]`.
    pub fn parse(sql: &str) -> ClientResult<Self> {
        let (query, params) = parse_query(sql)?;
        let select = match query.body.as_ref() {
            sp::SetExpr::Select(select) => select,
            _ => return Err(ClientError::unimplemented("only plain SELECT is supported")),
        };

        if select.from.len() != 1 {
            return Err(ClientError::unimplemented("exactly one table in FROM required"));
        }
        let table = match &select.from[0].relation {
            sp::TableFactor::Table { name, .. } => table_name(name)?,
            other => {
                return Err(ClientError::unimplemented(format!(
                    "unsupported FROM clause: {}",
                    other
                )))
            }
        };

        let projection = convert_projection(&select.projection)?;
        let mut filter = Vec::new();
        if let Some(selection) = &select.selection {
            collect_equalities(selection, &params, &mut filter)?;
        }
        let limit = query.limit.as_ref().and_then(expr_to_u64);

        Ok(Self {
            table,
            projection,
            filter,
            limit,
        })
    }
}

/// Parse `sql` as one query, returning it with the parameter names in
/// placeholder order.
fn parse_query(sql: &str) -> ClientResult<(Box<sp::Query>, Vec<String>)> {
    let mut params: Vec<String> = Vec::new();
    let rewritten = replace_parameters(sql, |name| {
        params.push(name.to_string());
        Some(format!("?{}", params.len() - 1))
    });

    let statements = Parser::parse_sql(&GenericDialect {}, &rewritten)
        .map_err(|e| ClientError::invalid_argument(format!("syntax error: {}", e)))?;
    let mut statements = statements.into_iter();
    match (statements.next(), statements.next()) {
        (Some(sp::Statement::Query(query)), None) => Ok((query, params)),
        (None, _) => Err(ClientError::invalid_argument("empty query")),
        (Some(_), None) => Err(ClientError::invalid_argument("statement is not a query")),
        (Some(_), Some(_)) => Err(ClientError::invalid_argument(
            "multiple statements not supported",
        )),
    }
}

fn table_name(name: &sp::ObjectName) -> ClientResult<String> {
    name.0
        .last()
        .map(|i| i.as_ident().map(|id| id.value.clone()).unwrap_or_else(|| i.to_string()))
        .ok_or_else(|| ClientError::invalid_argument("empty table name"))
}

fn convert_projection(items: &[sp::SelectItem]) -> ClientResult<Projection> {
    if let [sp::SelectItem::Wildcard(_)] = items {
        return Ok(Projection::All);
    }
    if let [sp::SelectItem::UnnamedExpr(sp::Expr::Function(f))] = items {
        if f.name.to_string().eq_ignore_ascii_case("count") {
            return Ok(Projection::CountAll);
        }
    }

    items
        .iter()
        .map(|item| match item {
            sp::SelectItem::UnnamedExpr(sp::Expr::Identifier(id)) => Ok(id.value.clone()),
            other => Err(ClientError::unimplemented(format!(
                "unsupported projection: {}",
                other
            ))),
        })
        .collect::<ClientResult<Vec<_>>>()
        .map(Projection::Columns)
}

fn collect_equalities(
    expr: &sp::Expr,
    params: &[String],
    out: &mut Vec<(String, Operand)>,
) -> ClientResult<()> {
    match expr {
        sp::Expr::Nested(inner) => collect_equalities(inner, params, out),
        sp::Expr::BinaryOp {
            left,
            op: sp::BinaryOperator::And,
            right,
        } => {
            collect_equalities(left, params, out)?;
            collect_equalities(right, params, out)
        }
        sp::Expr::BinaryOp {
            left,
            op: sp::BinaryOperator::Eq,
            right,
        } => {
            let column = match left.as_ref() {
                sp::Expr::Identifier(id) => id.value.clone(),
                other => {
                    return Err(ClientError::unimplemented(format!(
                        "unsupported comparison: {}",
                        other
                    )))
                }
            };
            out.push((column, convert_operand(right, params)?));
            Ok(())
        }
        other => Err(ClientError::unimplemented(format!(
            "unsupported filter: {}",
            other
        ))),
    }
}

fn convert_operand(expr: &sp::Expr, params: &[String]) -> ClientResult<Operand> {
    let value = match expr {
        sp::Expr::Value(v) => &v.value,
        other => {
            return Err(ClientError::unimplemented(format!(
                "unsupported operand: {}",
                other
            )))
        }
    };
    match value {
        sp::Value::Placeholder(p) => p
            .strip_prefix('?')
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| params.get(index))
            .map(|name| Operand::Param(name.clone()))
            .ok_or_else(|| ClientError::invalid_argument(format!("unknown placeholder: {}", p))),
        sp::Value::Null => Ok(Operand::Literal(Value::Null)),
        sp::Value::Boolean(b) => Ok(Operand::Literal(Value::Bool(*b))),
        sp::Value::Number(s, _) => s
            .parse::<i64>()
            .map(Value::Int64)
            .or_else(|_| s.parse::<f64>().map(Value::Float64))
            .map(Operand::Literal)
            .map_err(|_| ClientError::invalid_argument(format!("invalid number: {}", s))),
        sp::Value::SingleQuotedString(s) | sp::Value::DoubleQuotedString(s) => {
            Ok(Operand::Literal(Value::String(s.clone())))
        }
        other => Err(ClientError::unimplemented(format!(
            "unsupported literal: {}",
            other
        ))),
    }
}

fn expr_to_u64(expr: &sp::Expr) -> Option<u64> {
    match expr {
        sp::Expr::Value(v) => match &v.value {
            sp::Value::Number(s, _) => s.parse().ok(),
            _ => None,
        },
        _ => None,
    }
}
