//! Statements shared by every backend. Identifiers use backticks, which both
//! MySQL and SQLite accept; only the table definition is dialect specific.

use sqlx::database::HasArguments;
use sqlx::query::Query;
use sqlx::{Database, Encode, Type};

use crate::models::Quotation;

pub(crate) const INSERT_QUOTATION: &str = r#"
    INSERT INTO cotacoes
        (code, codein, name, high, low, var_bid, pct_change, bid, ask, `timestamp`, create_date)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub(crate) const SELECT_QUOTATIONS: &str = r#"
    SELECT id, code, codein AS counter_code, name, high, low,
           var_bid AS variation_bid, pct_change AS percent_change,
           bid, ask, `timestamp`, create_date
    FROM cotacoes
    ORDER BY id ASC
"#;

pub(crate) const COUNT_QUOTATIONS: &str = "SELECT COUNT(*) FROM cotacoes";

/// Binds the eleven quotation columns in `INSERT_QUOTATION` order.
pub(crate) fn bind_quotation<'q, DB>(
    query: Query<'q, DB, <DB as HasArguments<'q>>::Arguments>,
    q: &'q Quotation,
) -> Query<'q, DB, <DB as HasArguments<'q>>::Arguments>
where
    DB: Database,
    &'q str: Encode<'q, DB> + Type<DB>,
{
    query
        .bind(q.code.as_str())
        .bind(q.counter_code.as_str())
        .bind(q.name.as_str())
        .bind(q.high.as_str())
        .bind(q.low.as_str())
        .bind(q.variation_bid.as_str())
        .bind(q.percent_change.as_str())
        .bind(q.bid.as_str())
        .bind(q.ask.as_str())
        .bind(q.timestamp.as_str())
        .bind(q.create_date.as_str())
}
