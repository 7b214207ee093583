use model::core::value::Value;
use sqlx::{Postgres, postgres::PgArguments, query::Query};

/// Binds rendered parameters in order. The renderer writes NULL inline, so
/// the NULL arm only serves hand-built parameter lists.
pub fn bind_values<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Decimal(d) => query.bind(d),
            Value::String(s) => query.bind(s),
            Value::Boolean(b) => query.bind(*b),
            Value::Json(j) => query.bind(j),
            Value::Uuid(u) => query.bind(*u),
            Value::Bytes(b) => query.bind(b),
            Value::Date(d) => query.bind(*d),
            Value::Timestamp(t) => query.bind(*t),
            Value::TimestampNaive(t) => query.bind(*t),
            Value::Enum(_, v) => query.bind(v),
            Value::StringArray(arr) => query.bind(arr),
            Value::Null => query.bind(None::<String>),
        };
    }
    query
}

