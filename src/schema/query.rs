//! Statement string builder

/// Builds `<op> <what> [FROM ..] [WHERE ..] [VALUES(..)] [ORDER BY ..]`.
/// Empty parts are skipped.
#[derive(Debug, Clone, Default)]
pub struct Query {
    operation: String,
    what: String,
    from: String,
    where_clause: String,
    values: String,
    order_by: String,
}

impl Query {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            ..Default::default()
        }
    }

    pub fn select(what: &str) -> Self {
        Self::new("SELECT").what(what)
    }

    pub fn what(mut self, what: &str) -> Self {
        self.what = what.to_string();
        self
    }

    pub fn from(mut self, table: &str) -> Self {
        self.from = table.to_string();
        self
    }

    pub fn filter(mut self, where_clause: &str) -> Self {
        self.where_clause = where_clause.trim().to_string();
        self
    }

    pub fn values(mut self, values: &str) -> Self {
        self.values = values.to_string();
        self
    }

    pub fn order_by(mut self, order_by: &str) -> Self {
        self.order_by = order_by.trim().to_string();
        self
    }

    pub fn build(&self) -> String {
        let mut out = self.operation.clone();
        if !self.what.is_empty() {
            out.push(' ');
            out.push_str(&self.what);
        }
        if !self.from.is_empty() {
            out.push_str(" FROM ");
            out.push_str(&self.from);
        }
        if !self.where_clause.is_empty() {
            out.push_str(" WHERE ");
            out.push_str(&self.where_clause);
        }
        if !self.values.is_empty() {
            out.push_str(" VALUES(");
            out.push_str(&self.values);
            out.push(')');
        }
        if !self.order_by.is_empty() {
            out.push_str(" ORDER BY ");
            out.push_str(&self.order_by);
        }
        tracing::trace!(query = %out, "Generated query");
        out
    }
}
