use sqlparser::ast::{
    self, Expr, ObjectNamePart, SetExpr, Statement, TableFactor, TableObject, Value, ValueWithSpan,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use ulid::Ulid;

use crate::model::Ms;

/// Page defaults when the query carries no `"from"`/`size` pseudo-filters.
const DEFAULT_FROM: i64 = 0;
const DEFAULT_PAGE_SIZE: i64 = 20;

/// Parsed command from SQL input.
#[derive(Debug, PartialEq)]
pub enum Command {
    InsertUser {
        id: Ulid,
        name: String,
        email: String,
    },
    UpdateUser {
        id: Ulid,
        name: Option<String>,
        email: Option<String>,
    },
    SelectUserById {
        id: Ulid,
    },
    InsertItem {
        id: Ulid,
        owner_id: Ulid,
        name: String,
        description: String,
        available: bool,
    },
    UpdateItem {
        id: Ulid,
        caller_id: Ulid,
        name: Option<String>,
        description: Option<String>,
        available: Option<bool>,
    },
    SelectItemById {
        id: Ulid,
    },
    SelectItemsByOwner {
        owner_id: Ulid,
        from: i64,
        size: i64,
    },
    InsertBooking {
        id: Ulid,
        item_id: Ulid,
        booker_id: Ulid,
        start: Ms,
        end: Ms,
    },
    DecideBooking {
        id: Ulid,
        caller_id: Ulid,
        approved: bool,
    },
    SelectBookingById {
        id: Ulid,
        caller_id: Ulid,
    },
    SelectBookingsByBooker {
        booker_id: Ulid,
        state: String,
        from: i64,
        size: i64,
    },
    SelectBookingsByOwner {
        owner_id: Ulid,
        state: String,
        from: i64,
        size: i64,
    },
    InsertComment {
        id: Ulid,
        item_id: Ulid,
        author_id: Ulid,
        text: String,
    },
    SelectComments {
        item_id: Ulid,
    },
}

pub fn parse_sql(sql: &str) -> Result<Command, SqlError> {
    let dialect = PostgreSqlDialect {};
    let stmts = Parser::parse_sql(&dialect, sql).map_err(|e| SqlError::Parse(e.to_string()))?;
    if stmts.is_empty() {
        return Err(SqlError::Empty);
    }

    match &stmts[0] {
        Statement::Insert(insert) => parse_insert(insert),
        Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => parse_update(table, assignments, selection),
        Statement::Query(query) => parse_select(query),
        other => Err(SqlError::Unsupported(format!("{other}"))),
    }
}

fn parse_insert(insert: &ast::Insert) -> Result<Command, SqlError> {
    let table = insert_table_name(insert)?;
    let values = extract_insert_values(insert)?;

    match table.as_str() {
        "users" => {
            if values.len() < 3 {
                return Err(SqlError::WrongArity("users", 3, values.len()));
            }
            Ok(Command::InsertUser {
                id: parse_ulid_expr(&values[0])?,
                name: parse_string_expr(&values[1])?,
                email: parse_string_expr(&values[2])?,
            })
        }
        "items" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("items", 4, values.len()));
            }
            let available = if values.len() >= 5 {
                parse_bool_expr(&values[4])?
            } else {
                true
            };
            Ok(Command::InsertItem {
                id: parse_ulid_expr(&values[0])?,
                owner_id: parse_ulid_expr(&values[1])?,
                name: parse_string_expr(&values[2])?,
                description: parse_string_expr(&values[3])?,
                available,
            })
        }
        "bookings" => {
            if values.len() < 5 {
                return Err(SqlError::WrongArity("bookings", 5, values.len()));
            }
            Ok(Command::InsertBooking {
                id: parse_ulid_expr(&values[0])?,
                item_id: parse_ulid_expr(&values[1])?,
                booker_id: parse_ulid_expr(&values[2])?,
                start: parse_i64_expr(&values[3])?,
                end: parse_i64_expr(&values[4])?,
            })
        }
        "comments" => {
            if values.len() < 4 {
                return Err(SqlError::WrongArity("comments", 4, values.len()));
            }
            Ok(Command::InsertComment {
                id: parse_ulid_expr(&values[0])?,
                item_id: parse_ulid_expr(&values[1])?,
                author_id: parse_ulid_expr(&values[2])?,
                text: parse_string_expr(&values[3])?,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_update(
    table: &ast::TableWithJoins,
    assignments: &[ast::Assignment],
    selection: &Option<Expr>,
) -> Result<Command, SqlError> {
    let table = table_factor_name(&table.relation)?;
    let mut filters = Filters::default();
    if let Some(sel) = selection {
        collect_filters(sel, &mut filters)?;
    }
    let id = filters.id.ok_or(SqlError::MissingFilter("id"))?;

    match table.as_str() {
        "users" => {
            let mut name = None;
            let mut email = None;
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "name" => name = Some(parse_string_expr(&a.value)?),
                    "email" => email = Some(parse_string_expr(&a.value)?),
                    col => return Err(SqlError::Unsupported(format!("users column: {col}"))),
                }
            }
            Ok(Command::UpdateUser { id, name, email })
        }
        "items" => {
            let caller_id = filters
                .owner_id
                .ok_or(SqlError::MissingFilter("owner_id"))?;
            let mut name = None;
            let mut description = None;
            let mut available = None;
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "name" => name = Some(parse_string_expr(&a.value)?),
                    "description" => description = Some(parse_string_expr(&a.value)?),
                    "available" => available = Some(parse_bool_expr(&a.value)?),
                    col => return Err(SqlError::Unsupported(format!("items column: {col}"))),
                }
            }
            Ok(Command::UpdateItem {
                id,
                caller_id,
                name,
                description,
                available,
            })
        }
        "bookings" => {
            let caller_id = filters
                .caller_id
                .ok_or(SqlError::MissingFilter("caller_id"))?;
            let mut approved = None;
            for a in assignments {
                match assignment_column(a)?.as_str() {
                    "approved" => approved = Some(parse_bool_expr(&a.value)?),
                    col => return Err(SqlError::Unsupported(format!("bookings column: {col}"))),
                }
            }
            let approved = approved.ok_or(SqlError::MissingFilter("approved"))?;
            Ok(Command::DecideBooking {
                id,
                caller_id,
                approved,
            })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

fn parse_select(query: &ast::Query) -> Result<Command, SqlError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(s) => s,
        _ => return Err(SqlError::Unsupported("non-SELECT query".into())),
    };

    if select.from.is_empty() {
        return Err(SqlError::Parse("SELECT without FROM".into()));
    }
    let table = table_factor_name(&select.from[0].relation)?;

    let mut filters = Filters::default();
    if let Some(selection) = &select.selection {
        collect_filters(selection, &mut filters)?;
    }
    let from = filters.from.unwrap_or(DEFAULT_FROM);
    let size = filters.size.unwrap_or(DEFAULT_PAGE_SIZE);

    match table.as_str() {
        "users" => {
            let id = filters.id.ok_or(SqlError::MissingFilter("id"))?;
            Ok(Command::SelectUserById { id })
        }
        "items" => {
            if let Some(id) = filters.id {
                Ok(Command::SelectItemById { id })
            } else if let Some(owner_id) = filters.owner_id {
                Ok(Command::SelectItemsByOwner {
                    owner_id,
                    from,
                    size,
                })
            } else {
                Err(SqlError::MissingFilter("id or owner_id"))
            }
        }
        "bookings" => {
            let state = filters.state.unwrap_or_else(|| "ALL".to_string());
            if let Some(id) = filters.id {
                let caller_id = filters
                    .caller_id
                    .ok_or(SqlError::MissingFilter("caller_id"))?;
                Ok(Command::SelectBookingById { id, caller_id })
            } else if let Some(booker_id) = filters.booker_id {
                Ok(Command::SelectBookingsByBooker {
                    booker_id,
                    state,
                    from,
                    size,
                })
            } else if let Some(owner_id) = filters.owner_id {
                Ok(Command::SelectBookingsByOwner {
                    owner_id,
                    state,
                    from,
                    size,
                })
            } else {
                Err(SqlError::MissingFilter("booker_id or owner_id"))
            }
        }
        "comments" => {
            let item_id = filters.item_id.ok_or(SqlError::MissingFilter("item_id"))?;
            Ok(Command::SelectComments { item_id })
        }
        _ => Err(SqlError::UnknownTable(table)),
    }
}

// ── WHERE-clause filters ──────────────────────────────────────

/// Every equality filter a lendr query can carry. Pagination and caller
/// identity ride in the WHERE clause as pseudo-columns.
#[derive(Default)]
struct Filters {
    id: Option<Ulid>,
    caller_id: Option<Ulid>,
    owner_id: Option<Ulid>,
    booker_id: Option<Ulid>,
    item_id: Option<Ulid>,
    state: Option<String>,
    from: Option<i64>,
    size: Option<i64>,
}

fn collect_filters(expr: &Expr, filters: &mut Filters) -> Result<(), SqlError> {
    if let Expr::BinaryOp { left, op, right } = expr {
        match op {
            ast::BinaryOperator::And => {
                collect_filters(left, filters)?;
                collect_filters(right, filters)?;
            }
            ast::BinaryOperator::Eq => {
                let Some(col) = expr_column_name(left) else {
                    return Ok(());
                };
                match col.as_str() {
                    "id" => filters.id = Some(parse_ulid_expr(right)?),
                    "caller_id" => filters.caller_id = Some(parse_ulid_expr(right)?),
                    "owner_id" => filters.owner_id = Some(parse_ulid_expr(right)?),
                    "booker_id" => filters.booker_id = Some(parse_ulid_expr(right)?),
                    "item_id" => filters.item_id = Some(parse_ulid_expr(right)?),
                    "state" => filters.state = Some(parse_string_expr(right)?),
                    "from" => filters.from = Some(parse_i64_expr(right)?),
                    "size" => filters.size = Some(parse_i64_expr(right)?),
                    _ => {}
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────

fn object_name_last(name: &ast::ObjectName) -> Option<String> {
    name.0.last().and_then(|part| match part {
        ObjectNamePart::Identifier(ident) => Some(ident.value.to_lowercase()),
        _ => None,
    })
}

fn insert_table_name(insert: &ast::Insert) -> Result<String, SqlError> {
    match &insert.table {
        TableObject::TableName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("unsupported table object in INSERT".into())),
    }
}

fn table_factor_name(tf: &TableFactor) -> Result<String, SqlError> {
    match tf {
        TableFactor::Table { name, .. } => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty table name".into()))
        }
        _ => Err(SqlError::Parse("complex table expression".into())),
    }
}

fn assignment_column(assignment: &ast::Assignment) -> Result<String, SqlError> {
    match &assignment.target {
        ast::AssignmentTarget::ColumnName(name) => {
            object_name_last(name).ok_or_else(|| SqlError::Parse("empty column name".into()))
        }
        _ => Err(SqlError::Parse("unsupported assignment target".into())),
    }
}

fn extract_insert_values(insert: &ast::Insert) -> Result<Vec<Expr>, SqlError> {
    let body = insert
        .source
        .as_ref()
        .ok_or(SqlError::Parse("no VALUES".into()))?;
    match body.body.as_ref() {
        SetExpr::Values(values) => {
            if values.rows.is_empty() {
                return Err(SqlError::Parse("empty VALUES".into()));
            }
            if values.rows.len() > 1 {
                return Err(SqlError::Unsupported("multi-row INSERT".into()));
            }
            Ok(values.rows[0].clone())
        }
        _ => Err(SqlError::Parse("expected VALUES".into())),
    }
}

fn expr_column_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Identifier(ident) => Some(ident.value.to_lowercase()),
        Expr::CompoundIdentifier(parts) => parts.last().map(|i| i.value.to_lowercase()),
        _ => None,
    }
}

fn extract_value(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Value(ValueWithSpan { value, .. }) => Some(value),
        _ => None,
    }
}

fn parse_ulid_expr(expr: &Expr) -> Result<Ulid, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) | Value::Number(s, _) => {
                Ulid::from_string(s).map_err(|e| SqlError::Parse(format!("bad ULID: {e}")))
            }
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_string_expr(expr: &Expr) -> Result<String, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::SingleQuotedString(s) => Ok(s.clone()),
            _ => Err(SqlError::Parse(format!("expected string, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_i64_expr(expr: &Expr) -> Result<i64, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Number(s, _) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            Value::SingleQuotedString(s) => s
                .parse()
                .map_err(|e| SqlError::Parse(format!("bad i64: {e}"))),
            _ => Err(SqlError::Parse(format!("expected number, got {value:?}"))),
        }
    } else if let Expr::UnaryOp {
        op: ast::UnaryOperator::Minus,
        expr,
    } = expr
    {
        Ok(-parse_i64_expr(expr)?)
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

fn parse_bool_expr(expr: &Expr) -> Result<bool, SqlError> {
    if let Some(value) = extract_value(expr) {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SingleQuotedString(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "1" => Ok(true),
                "false" | "f" | "0" => Ok(false),
                _ => Err(SqlError::Parse(format!("bad bool: {s}"))),
            },
            Value::Number(n, _) => Ok(n != "0"),
            _ => Err(SqlError::Parse(format!("expected bool, got {value:?}"))),
        }
    } else {
        Err(SqlError::Parse(format!("expected value, got {expr:?}")))
    }
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Empty,
    Unsupported(String),
    UnknownTable(String),
    WrongArity(&'static str, usize, usize),
    MissingFilter(&'static str),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Empty => write!(f, "empty query"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::UnknownTable(t) => write!(f, "unknown table: {t}"),
            SqlError::WrongArity(t, expected, got) => {
                write!(f, "{t}: expected {expected} values, got {got}")
            }
            SqlError::MissingFilter(col) => write!(f, "missing filter: {col}"),
        }
    }
}

impl std::error::Error for SqlError {}

#[cfg(test)]
mod tests {
    use super::*;

    const U1: &str = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    const U2: &str = "01BX5ZZKBKACTAV9WEVGEMMVRZ";

    #[test]
    fn parse_insert_user() {
        let sql = format!("INSERT INTO users (id, name, email) VALUES ('{U1}', 'alice', 'alice@example.com')");
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertUser { id, name, email } => {
                assert_eq!(id.to_string(), U1);
                assert_eq!(name, "alice");
                assert_eq!(email, "alice@example.com");
            }
            _ => panic!("expected InsertUser, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_user_wrong_arity() {
        let sql = format!("INSERT INTO users (id) VALUES ('{U1}')");
        assert!(matches!(
            parse_sql(&sql),
            Err(SqlError::WrongArity("users", 3, 1))
        ));
    }

    #[test]
    fn parse_update_user_partial() {
        let sql = format!("UPDATE users SET email = 'new@example.com' WHERE id = '{U1}'");
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::UpdateUser { id, name, email } => {
                assert_eq!(id.to_string(), U1);
                assert_eq!(name, None);
                assert_eq!(email.as_deref(), Some("new@example.com"));
            }
            _ => panic!("expected UpdateUser, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_item_defaults_available() {
        let sql = format!(
            "INSERT INTO items (id, owner_id, name, description) VALUES ('{U1}', '{U2}', 'drill', 'cordless')"
        );
        let cmd = parse_sql(&sql).unwrap();
        match cmd {
            Command::InsertItem {
                available, name, ..
            } => {
                assert!(available);
                assert_eq!(name, "drill");
            }
            _ => panic!("expected InsertItem, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_insert_item_explicit_unavailable() {
        let sql = format!(
            "INSERT INTO items (id, owner_id, name, description, available) VALUES ('{U1}', '{U2}', 'drill', 'cordless', false)"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertItem { available, .. } => assert!(!available),
            cmd => panic!("expected InsertItem, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_item_availability() {
        let sql = format!(
            "UPDATE items SET available = false WHERE id = '{U1}' AND owner_id = '{U2}'"
        );
        match parse_sql(&sql).unwrap() {
            Command::UpdateItem {
                id,
                caller_id,
                available,
                name,
                ..
            } => {
                assert_eq!(id.to_string(), U1);
                assert_eq!(caller_id.to_string(), U2);
                assert_eq!(available, Some(false));
                assert_eq!(name, None);
            }
            cmd => panic!("expected UpdateItem, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_update_item_requires_owner_filter() {
        let sql = format!("UPDATE items SET available = false WHERE id = '{U1}'");
        assert!(matches!(
            parse_sql(&sql),
            Err(SqlError::MissingFilter("owner_id"))
        ));
    }

    #[test]
    fn parse_insert_booking() {
        let sql = format!(
            r#"INSERT INTO bookings (id, item_id, booker_id, start, "end") VALUES ('{U1}', '{U2}', '{U2}', 1000, 2000)"#
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertBooking { start, end, .. } => {
                assert_eq!(start, 1000);
                assert_eq!(end, 2000);
            }
            cmd => panic!("expected InsertBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_decide_booking() {
        let sql =
            format!("UPDATE bookings SET approved = true WHERE id = '{U1}' AND caller_id = '{U2}'");
        match parse_sql(&sql).unwrap() {
            Command::DecideBooking {
                id,
                caller_id,
                approved,
            } => {
                assert_eq!(id.to_string(), U1);
                assert_eq!(caller_id.to_string(), U2);
                assert!(approved);
            }
            cmd => panic!("expected DecideBooking, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_decide_booking_requires_caller() {
        let sql = format!("UPDATE bookings SET approved = true WHERE id = '{U1}'");
        assert!(matches!(
            parse_sql(&sql),
            Err(SqlError::MissingFilter("caller_id"))
        ));
    }

    #[test]
    fn parse_select_booking_by_id() {
        let sql = format!("SELECT * FROM bookings WHERE id = '{U1}' AND caller_id = '{U2}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectBookingById { id, caller_id } => {
                assert_eq!(id.to_string(), U1);
                assert_eq!(caller_id.to_string(), U2);
            }
            cmd => panic!("expected SelectBookingById, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_bookings_by_booker_defaults() {
        let sql = format!("SELECT * FROM bookings WHERE booker_id = '{U1}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectBookingsByBooker {
                state, from, size, ..
            } => {
                assert_eq!(state, "ALL");
                assert_eq!(from, 0);
                assert_eq!(size, 20);
            }
            cmd => panic!("expected SelectBookingsByBooker, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_bookings_by_owner_with_state_and_page() {
        let sql = format!(
            r#"SELECT * FROM bookings WHERE owner_id = '{U1}' AND state = 'CURRENT' AND "from" = 5 AND size = 10"#
        );
        match parse_sql(&sql).unwrap() {
            Command::SelectBookingsByOwner {
                owner_id,
                state,
                from,
                size,
            } => {
                assert_eq!(owner_id.to_string(), U1);
                assert_eq!(state, "CURRENT");
                assert_eq!(from, 5);
                assert_eq!(size, 10);
            }
            cmd => panic!("expected SelectBookingsByOwner, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_bookings_passes_bad_state_through() {
        // Token validity is the engine's concern, not the parser's.
        let sql = format!("SELECT * FROM bookings WHERE booker_id = '{U1}' AND state = 'SOON'");
        match parse_sql(&sql).unwrap() {
            Command::SelectBookingsByBooker { state, .. } => assert_eq!(state, "SOON"),
            cmd => panic!("expected SelectBookingsByBooker, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_bookings_requires_some_party() {
        let sql = "SELECT * FROM bookings WHERE state = 'ALL'";
        assert!(matches!(
            parse_sql(sql),
            Err(SqlError::MissingFilter("booker_id or owner_id"))
        ));
    }

    #[test]
    fn parse_insert_comment() {
        let sql = format!(
            "INSERT INTO comments (id, item_id, author_id, text) VALUES ('{U1}', '{U2}', '{U2}', 'great drill')"
        );
        match parse_sql(&sql).unwrap() {
            Command::InsertComment { text, .. } => assert_eq!(text, "great drill"),
            cmd => panic!("expected InsertComment, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_comments() {
        let sql = format!("SELECT * FROM comments WHERE item_id = '{U1}'");
        match parse_sql(&sql).unwrap() {
            Command::SelectComments { item_id } => assert_eq!(item_id.to_string(), U1),
            cmd => panic!("expected SelectComments, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_select_items_by_owner() {
        let sql = format!(r#"SELECT * FROM items WHERE owner_id = '{U1}' AND size = 50"#);
        match parse_sql(&sql).unwrap() {
            Command::SelectItemsByOwner { from, size, .. } => {
                assert_eq!(from, 0);
                assert_eq!(size, 50);
            }
            cmd => panic!("expected SelectItemsByOwner, got {cmd:?}"),
        }
    }

    #[test]
    fn parse_unknown_table_errors() {
        let sql = format!("INSERT INTO gadgets (id) VALUES ('{U1}')");
        assert!(matches!(parse_sql(&sql), Err(SqlError::UnknownTable(_))));
    }

    #[test]
    fn parse_multi_row_insert_rejected() {
        let sql = format!(
            "INSERT INTO users (id, name, email) VALUES ('{U1}', 'a', 'a@x'), ('{U2}', 'b', 'b@x')"
        );
        assert!(matches!(parse_sql(&sql), Err(SqlError::Unsupported(_))));
    }

    #[test]
    fn parse_empty_errors() {
        assert!(matches!(parse_sql(""), Err(SqlError::Empty)));
    }

    #[test]
    fn parse_delete_unsupported() {
        let sql = format!("DELETE FROM bookings WHERE id = '{U1}'");
        assert!(matches!(parse_sql(&sql), Err(SqlError::Unsupported(_))));
    }
}
