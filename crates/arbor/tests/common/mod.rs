#![allow(dead_code)]

use arbor::{Connection, DriverError, ModelDef, Outcome, Registry, RelationDef, Row, Value};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

/// Customers, their orders, order lines and products.
pub fn shop_registry() -> Registry {
    Registry::builder()
        .model(
            ModelDef::new("Customer", "customers")
                .attributes(["name", "country"])
                .has_many("orders", "Order"),
        )
        .model(
            ModelDef::new("Order", "orders")
                .attributes(["customerId", "total", "status"])
                .belongs_to("customer", "Customer")
                .has_many("lines", "Line")
                .relation(RelationDef::many_many("products", "Product").inverse("orders")),
        )
        .model(
            ModelDef::new("Line", "order_lines")
                .attributes(["orderId", "productId", "quantity"])
                .belongs_to("order", "Order")
                .belongs_to("product", "Product"),
        )
        .model(ModelDef::new("Product", "products").attributes(["sku", "price"]))
        .build()
        .expect("shop registry")
}

/// Connection that records statements and replays queued outcomes.
#[derive(Default)]
pub struct RecordingConnection {
    executed: Mutex<Vec<(String, Vec<Value>)>>,
    outcomes: Mutex<VecDeque<Result<Outcome, DriverError>>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_rows(&self, rows: Vec<Row>) {
        self.outcomes.lock().unwrap().push_back(Ok(Outcome::rows(rows)));
    }

    pub fn push_error(&self, err: DriverError) {
        self.outcomes.lock().unwrap().push_back(Err(err));
    }

    pub fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.executed.lock().unwrap().clone()
    }

    pub fn last(&self) -> (String, Vec<Value>) {
        self.executed().pop().expect("a statement was executed")
    }
}

impl Connection for RecordingConnection {
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Result<Outcome, DriverError>> + Send {
        self.executed
            .lock()
            .unwrap()
            .push((sql.to_string(), params.to_vec()));
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Outcome::affected(0)));
        std::future::ready(outcome)
    }

    fn last_insert_id(&self) -> Option<Value> {
        None
    }
}
