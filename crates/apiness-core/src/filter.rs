//! The filter compiler: request parameters → a composed `SELECT`.
//!
//! Parameter names select an operator by suffix (`score_gt`, `name_like`,
//! ...) or by reserved name (`cols`, `cmd`, `where`, `tohtml`). Operand
//! values are inlined as SQL literals after a crude sanitisation; the three
//! raw-SQL parameters are guarded only by the [`FORBIDDEN_SQL`] denylist.

use crate::{
  Error, Result,
  ident::validate_identifier,
  kind::{ParamValue, ScalarKind, coerce},
};

/// Keywords that may not appear (case-insensitively, as substrings) in the
/// `cols`, `cmd` or `where` operands.
pub const FORBIDDEN_SQL: [&str; 8] =
  ["insert", "delete", "update", "create", "replace", "drop", "rename", "alter"];

/// Parameters every data route accepts regardless of its columns.
pub const FIXED_PARAMS: [&str; 4] = ["where", "cols", "cmd", "tohtml"];

// ─── Operators ───────────────────────────────────────────────────────────────

/// A filter operator, selected from a parameter's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
  Equals,
  GreaterThan,
  GreaterOrEqual,
  LessThan,
  LessOrEqual,
  /// Comma-separated set membership.
  In,
  /// Substring match.
  Like,
  /// Prefix match.
  Begin,
  /// Suffix match.
  End,
  RawCols,
  RawCmd,
  RawWhere,
  ToHtml,
}

/// Suffix operators in dispatch precedence order.
static SUFFIXED: [FilterOp; 8] = [
  FilterOp::GreaterThan,
  FilterOp::GreaterOrEqual,
  FilterOp::LessThan,
  FilterOp::LessOrEqual,
  FilterOp::In,
  FilterOp::Like,
  FilterOp::Begin,
  FilterOp::End,
];

impl FilterOp {
  /// Split a lower-cased parameter name into its operator and the column
  /// it applies to. The first matching suffix wins; an unmatched name is an
  /// equality filter on the column of the same name.
  pub fn parse(name: &str) -> (Self, &str) {
    for op in SUFFIXED {
      if let Some(base) = name.strip_suffix(op.suffix())
        && !base.is_empty()
      {
        return (op, base);
      }
    }
    let op = match name {
      "cols" => Self::RawCols,
      "cmd" => Self::RawCmd,
      "where" => Self::RawWhere,
      "tohtml" => Self::ToHtml,
      _ => Self::Equals,
    };
    (op, name)
  }

  /// The parameter-name suffix selecting this operator; empty for operators
  /// selected by a whole name.
  pub fn suffix(self) -> &'static str {
    match self {
      Self::GreaterThan => "_gt",
      Self::GreaterOrEqual => "_gte",
      Self::LessThan => "_lt",
      Self::LessOrEqual => "_lte",
      Self::In => "_in",
      Self::Like => "_like",
      Self::Begin => "_begin",
      Self::End => "_end",
      Self::Equals | Self::RawCols | Self::RawCmd | Self::RawWhere | Self::ToHtml => "",
    }
  }

  /// The suffixed operators a column of `kind` supports, besides equality.
  pub fn variants_for(kind: ScalarKind) -> &'static [FilterOp] {
    if kind.is_numeric() { &SUFFIXED[..4] } else { &SUFFIXED[4..] }
  }

  pub fn is_raw_sql(self) -> bool {
    matches!(self, Self::RawCols | Self::RawCmd | Self::RawWhere)
  }
}

// ─── Compiled query ──────────────────────────────────────────────────────────

/// The output of [`compile`]: predicate, projection and post-processing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledQuery {
  pub table:      String,
  /// Clauses combined with `AND`, in the order their parameters arrived.
  pub predicates: Vec<String>,
  pub projection: Option<String>,
  /// Appended verbatim after the `WHERE` clause (`ORDER BY`, `LIMIT`, ...).
  pub trailing:   Option<String>,
  /// Render the result as an HTML document instead of JSON.
  pub to_html:    bool,
}

impl CompiledQuery {
  pub fn where_clause(&self) -> Option<String> {
    if self.predicates.is_empty() {
      None
    } else {
      Some(format!("WHERE {}", self.predicates.join(" AND ")))
    }
  }

  /// `SELECT COUNT(*) FROM {table} {where}`
  pub fn count_sql(&self) -> String {
    join_sql(["SELECT COUNT(*) FROM", self.table.as_str()], self.where_clause(), None)
  }

  /// `SELECT {cols|*} FROM {table} {where} {cmd}`
  pub fn select_sql(&self) -> String {
    let head = format!("SELECT {} FROM", self.projection.as_deref().unwrap_or("*"));
    join_sql([head.as_str(), self.table.as_str()], self.where_clause(), self.trailing.clone())
  }
}

fn join_sql(head: [&str; 2], filter: Option<String>, tail: Option<String>) -> String {
  let mut parts: Vec<String> = head.iter().map(|s| s.to_string()).collect();
  parts.extend(filter);
  parts.extend(tail.filter(|t| !t.trim().is_empty()));
  parts.join(" ")
}

// ─── Compiler ────────────────────────────────────────────────────────────────

/// Compile `params` into a query against `table`.
///
/// Validation happens entirely up front: nothing here touches storage, so a
/// rejected request never reaches the database.
pub fn compile(table: &str, params: &[(String, ParamValue)]) -> Result<CompiledQuery> {
  let table = table.to_lowercase();
  validate_identifier(&table)?;

  let mut query = CompiledQuery { table, ..CompiledQuery::default() };
  let mut cols = Vec::new();
  let mut cmds = Vec::new();

  for (name, value) in params {
    let name = name.to_lowercase();
    let (op, column) = FilterOp::parse(&name);

    if op == FilterOp::ToHtml {
      query.to_html = true;
      continue;
    }
    if op.is_raw_sql() {
      let text = value.to_string();
      check_forbidden(&name, &text)?;
      match op {
        FilterOp::RawCols => cols.push(text),
        FilterOp::RawCmd => cmds.push(text),
        _ => query.predicates.push(format!("({text})")),
      }
      continue;
    }

    let value = sanitize(value);
    let clause = match op {
      FilterOp::GreaterThan => format!("{column}>{}", numeric(&value)?),
      FilterOp::GreaterOrEqual => format!("{column}>={}", numeric(&value)?),
      FilterOp::LessThan => format!("{column}<{}", numeric(&value)?),
      FilterOp::LessOrEqual => format!("{column}<={}", numeric(&value)?),
      FilterOp::In => {
        let members: Vec<String> = value
          .to_string()
          .split(',')
          .map(|m| quote(m.trim()))
          .collect();
        format!("{column} IN ({})", members.join(", "))
      }
      FilterOp::Like => format!("{column} LIKE {}", quote(&format!("%{value}%"))),
      FilterOp::Begin => format!("{column} LIKE {}", quote(&format!("{value}%"))),
      FilterOp::End => format!("{column} LIKE {}", quote(&format!("%{value}"))),
      _ => match &value {
        ParamValue::Text(s) => format!("{column}={}", quote(s)),
        other => format!("{column}={other}"),
      },
    };
    query.predicates.push(clause);
  }

  if !cols.is_empty() {
    query.projection = Some(cols.join(", "));
  }
  if !cmds.is_empty() {
    query.trailing = Some(cmds.join(" "));
  }
  Ok(query)
}

/// Fail with [`Error::ForbiddenOperation`] if `value` contains a denylisted
/// keyword.
pub fn check_forbidden(param: &str, value: &str) -> Result<()> {
  let lowered = value.to_lowercase();
  if FORBIDDEN_SQL.iter().any(|kw| lowered.contains(kw)) {
    return Err(Error::ForbiddenOperation {
      param: param.to_owned(),
      value: value.to_owned(),
    });
  }
  Ok(())
}

/// Strip parentheses and double quotes from text operands, then trim.
fn sanitize(value: &ParamValue) -> ParamValue {
  match value {
    ParamValue::Text(s) => {
      let cleaned: String = s.chars().filter(|c| !matches!(c, '(' | ')' | '"')).collect();
      ParamValue::Text(cleaned.trim().to_owned())
    }
    other => other.clone(),
  }
}

fn numeric(value: &ParamValue) -> Result<ParamValue> {
  match value {
    ParamValue::Text(s) => coerce(s),
    other => Ok(other.clone()),
  }
}

/// Single-quote a SQL string literal.
pub fn quote(s: &str) -> String { format!("'{}'", s.replace('\'', "''")) }

#[cfg(test)]
mod tests {
  use super::*;

  fn text(name: &str, v: &str) -> (String, ParamValue) {
    (name.to_owned(), ParamValue::Text(v.to_owned()))
  }

  fn int(name: &str, v: i64) -> (String, ParamValue) {
    (name.to_owned(), ParamValue::Integer(v))
  }

  #[test]
  fn suffix_dispatch() {
    assert_eq!(FilterOp::parse("score_gt"), (FilterOp::GreaterThan, "score"));
    assert_eq!(FilterOp::parse("score_gte"), (FilterOp::GreaterOrEqual, "score"));
    assert_eq!(FilterOp::parse("score_lt"), (FilterOp::LessThan, "score"));
    assert_eq!(FilterOp::parse("score_lte"), (FilterOp::LessOrEqual, "score"));
    assert_eq!(FilterOp::parse("name_in"), (FilterOp::In, "name"));
    assert_eq!(FilterOp::parse("name_like"), (FilterOp::Like, "name"));
    assert_eq!(FilterOp::parse("name_begin"), (FilterOp::Begin, "name"));
    assert_eq!(FilterOp::parse("name_end"), (FilterOp::End, "name"));
    assert_eq!(FilterOp::parse("cols"), (FilterOp::RawCols, "cols"));
    assert_eq!(FilterOp::parse("cmd"), (FilterOp::RawCmd, "cmd"));
    assert_eq!(FilterOp::parse("where"), (FilterOp::RawWhere, "where"));
    assert_eq!(FilterOp::parse("tohtml"), (FilterOp::ToHtml, "tohtml"));
    assert_eq!(FilterOp::parse("name"), (FilterOp::Equals, "name"));
    assert_eq!(FilterOp::parse("_gt"), (FilterOp::Equals, "_gt"));
  }

  #[test]
  fn empty_parameters_select_everything() {
    let q = compile("Items", &[]).unwrap();
    assert_eq!(q.count_sql(), "SELECT COUNT(*) FROM items");
    assert_eq!(q.select_sql(), "SELECT * FROM items");
    assert!(!q.to_html);
  }

  #[test]
  fn clauses_are_anded_in_order() {
    let q = compile("items", &[int("score_gt", 1), text("name", "b")]).unwrap();
    assert_eq!(q.select_sql(), "SELECT * FROM items WHERE score>1 AND name='b'");
    assert_eq!(q.count_sql(), "SELECT COUNT(*) FROM items WHERE score>1 AND name='b'");
  }

  #[test]
  fn text_operands_are_coerced_for_comparisons() {
    let q = compile("t", &[text("price_lte", "9.5"), text("qty_gte", " 3 ")]).unwrap();
    assert_eq!(q.predicates, ["price<=9.5", "qty>=3"]);

    let err = compile("t", &[text("price_lt", "cheap")]).unwrap_err();
    assert!(matches!(err, Error::InvalidOperand { .. }));
  }

  #[test]
  fn set_membership_is_quoted() {
    let q = compile("t", &[text("name_in", "a, b ,c")]).unwrap();
    assert_eq!(q.predicates, ["name IN ('a', 'b', 'c')"]);
  }

  #[test]
  fn pattern_operators() {
    let q = compile(
      "t",
      &[text("name_like", "an"), text("name_begin", "a"), text("name_end", "z")],
    )
    .unwrap();
    assert_eq!(
      q.predicates,
      ["name LIKE '%an%'", "name LIKE 'a%'", "name LIKE '%z'"]
    );
  }

  #[test]
  fn operands_are_sanitised() {
    let q = compile("t", &[text("name", " \"(x)\" "), text("city", "O'Hara")]).unwrap();
    assert_eq!(q.predicates, ["name='x'", "city='O''Hara'"]);
  }

  #[test]
  fn raw_fragments_and_projection() {
    let q = compile(
      "t",
      &[
        text("cols", "name, score"),
        text("where", "score > 1 OR name = 'a'"),
        text("cmd", "ORDER BY score DESC LIMIT 5"),
      ],
    )
    .unwrap();
    assert_eq!(
      q.select_sql(),
      "SELECT name, score FROM t WHERE (score > 1 OR name = 'a') ORDER BY score DESC LIMIT 5"
    );
    assert_eq!(q.count_sql(), "SELECT COUNT(*) FROM t WHERE (score > 1 OR name = 'a')");
  }

  #[test]
  fn denylisted_keywords_are_rejected() {
    for (param, value) in [
      ("cmd", "DROP TABLE items"),
      ("where", "1=1; drop table x"),
      ("cols", "name, (SELECT 1); DeLeTe FROM t"),
      ("cmd", "LIMIT 1; Alter table t"),
    ] {
      let err = compile("items", &[text(param, value)]).unwrap_err();
      assert!(matches!(err, Error::ForbiddenOperation { .. }), "{param}={value}");
      assert!(err.is_client_error());
    }
  }

  #[test]
  fn tohtml_is_a_presence_flag() {
    let q = compile("t", &[text("tohtml", "")]).unwrap();
    assert!(q.to_html);
    assert!(q.predicates.is_empty());
  }

  #[test]
  fn parameter_names_are_case_insensitive() {
    let q = compile("t", &[int("Score_GT", 2)]).unwrap();
    assert_eq!(q.predicates, ["score>2"]);
  }

  #[test]
  fn table_name_is_validated() {
    assert!(matches!(
      compile("items;--", &[]).unwrap_err(),
      Error::InvalidIdentifier { .. }
    ));
  }

  #[test]
  fn kind_variants() {
    let numeric: Vec<&str> =
      FilterOp::variants_for(ScalarKind::Real).iter().map(|op| op.suffix()).collect();
    assert_eq!(numeric, ["_gt", "_gte", "_lt", "_lte"]);
    let text: Vec<&str> =
      FilterOp::variants_for(ScalarKind::Text).iter().map(|op| op.suffix()).collect();
    assert_eq!(text, ["_in", "_like", "_begin", "_end"]);
  }
}
