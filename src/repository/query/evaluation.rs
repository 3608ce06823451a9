//! Parameter evaluation for named SQL.
//!
//! Method arguments are reachable by parameter name and by position. Named
//! SQL refers to them as `@name`; expression references `#{name}` and
//! `#{[0]}` are evaluated here and replaced by generated bound parameters.

use once_cell::sync::Lazy;
use regex::Regex;

use super::method::QueryMethod;
use crate::client::sql::parameter_names;
use crate::client::Statement;
use crate::core::{DataError, DataResult};
use crate::mapping::Value;

static EXPRESSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\{\s*([^}]*?)\s*\}").expect("valid expression regex"));
static INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\s*(\d+)\s*\]$").expect("valid index regex"));

const EXPRESSION_PARAM_PREFIX: &str = "__expr";

/// Arguments of one query method invocation.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    names: &'a [String],
    values: &'a [Value],
}

impl<'a> EvaluationContext<'a> {
    /// Bind invocation arguments to the method's parameter names.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidArgument`] when the argument count differs
    /// from the method's parameter count.
    pub fn new(method: &'a QueryMethod, values: &'a [Value]) -> DataResult<Self> {
        if method.parameters().len() != values.len() {
            return Err(DataError::invalid_argument(format!(
                "{} expects {} arguments, got {}",
                method.name(),
                method.parameters().len(),
                values.len()
            )));
        }
        Ok(Self {
            names: method.parameters(),
            values,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Evaluate a `name` or `[index]` reference.
    pub fn evaluate(&self, expression: &str) -> DataResult<Value> {
        let expression = expression.trim();
        let value = match INDEX_RE.captures(expression) {
            Some(caps) => caps[1].parse::<usize>().ok().and_then(|i| self.index(i)),
            None => self.lookup(expression),
        };
        value.cloned().ok_or_else(|| {
            DataError::invalid_argument(format!("cannot evaluate #{{{}}}", expression))
        })
    }

    /// Produce the statement for `sql` with every reference bound.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidArgument`] when an expression or an
    /// `@name` reference does not resolve to an argument.
    pub fn bind(&self, sql: &str) -> DataResult<Statement> {
        let mut evaluated = Vec::new();
        let mut failure = None;
        let rewritten = rewrite_expressions(sql, |expression| match self.evaluate(expression) {
            Ok(value) => {
                evaluated.push(value);
            }
            Err(err) => {
                failure.get_or_insert(err);
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        let mut statement = Statement::of(rewritten.clone());
        for (i, value) in evaluated.into_iter().enumerate() {
            statement = statement.bind(format!("{}{}", EXPRESSION_PARAM_PREFIX, i), value);
        }
        for name in parameter_names(&rewritten) {
            if name.starts_with(EXPRESSION_PARAM_PREFIX) {
                continue;
            }
            let value = self.lookup(&name).cloned().ok_or_else(|| {
                DataError::invalid_argument(format!("no parameter named @{}", name))
            })?;
            statement = statement.bind(name, value);
        }
        Ok(statement)
    }
}

/// Replace each `#{...}` with a generated `@__exprN` parameter, calling
/// `visit` with the expression text in order of appearance.
pub(crate) fn rewrite_expressions<F>(sql: &str, mut visit: F) -> String
where
    F: FnMut(&str),
{
    let mut index = 0;
    EXPRESSION_RE
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            visit(&caps[1]);
            let param = format!("@{}{}", EXPRESSION_PARAM_PREFIX, index);
            index += 1;
            param
        })
        .into_owned()
}

/// Parameter names a statement needs from the method, expressions excluded.
pub(crate) fn referenced_parameters(sql: &str) -> Vec<String> {
    parameter_names(&rewrite_expressions(sql, |_| {}))
        .into_iter()
        .filter(|name| !name.starts_with(EXPRESSION_PARAM_PREFIX))
        .collect()
}

/// `sql` with expressions replaced, ready for syntax validation.
pub(crate) fn without_expressions(sql: &str) -> String {
    rewrite_expressions(sql, |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{Entity, EntityBuilder};
    use crate::repository::query::method::ReturnKind;

    #[derive(Default)]
    struct Trader {
        id: String,
    }

    impl Entity for Trader {
        fn describe(entity: &mut EntityBuilder<Self>) {
            entity.id("id", |t| &t.id, |t| &mut t.id);
        }
    }

    fn method() -> QueryMethod {
        QueryMethod::new::<Trader>("findByNameAndRating", &["name", "rating"], ReturnKind::Collection)
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let method = method();
        let values = vec![Value::from("Ann"), Value::from(3_i64)];
        let context = EvaluationContext::new(&method, &values).unwrap();

        assert_eq!(context.lookup("rating"), Some(&Value::Int64(3)));
        assert_eq!(context.evaluate("[0]").unwrap(), Value::from("Ann"));
        assert_eq!(context.evaluate(" name ").unwrap(), Value::from("Ann"));
        assert!(context.evaluate("[5]").is_err());
        assert!(context.evaluate("missing").is_err());
    }

    #[test]
    fn test_argument_count_checked() {
        let method = method();
        let values = vec![Value::from("Ann")];
        assert!(matches!(
            EvaluationContext::new(&method, &values),
            Err(DataError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_bind_named_and_expression_references() {
        let method = method();
        let values = vec![Value::from("Ann"), Value::from(3_i64)];
        let context = EvaluationContext::new(&method, &values).unwrap();

        let statement = context
            .bind("SELECT * FROM trader WHERE name = @name AND rating = #{[1]}")
            .unwrap();
        assert_eq!(
            statement.sql(),
            "SELECT * FROM trader WHERE name = @name AND rating = @__expr0"
        );
        assert_eq!(statement.param("name"), Some(&Value::from("Ann")));
        assert_eq!(statement.param("__expr0"), Some(&Value::Int64(3)));

        let err = context.bind("SELECT * FROM trader WHERE x = @other").unwrap_err();
        assert!(matches!(err, DataError::InvalidArgument(_)));
        assert!(context.bind("SELECT * FROM trader WHERE x = #{nope}").is_err());
    }

    #[test]
    fn test_referenced_parameters() {
        let sql = "SELECT * FROM t WHERE a = @a AND b = #{b} AND c = '@c'";
        assert_eq!(referenced_parameters(sql), vec!["a".to_string()]);
        assert_eq!(
            without_expressions(sql),
            "SELECT * FROM t WHERE a = @a AND b = @__expr0 AND c = '@c'"
        );
    }
}
