//! Structured reporting of experimental results as JSON.
//!
//! Values are reported under a key into the current context. Contexts nest like the callgraph:
//! `push_context` opens an object under a key, `push_collection_context` an array of objects.
//! Each context is closed when its guard is dropped. When the `ReportingGuard` returned by
//! `enable_reporting` is dropped, the complete report is printed to stdout.
//!
//! The reporter is thread local. Values reported from other threads (e.g. rayon workers) are dropped.

use serde_json::{Map, Value};
use std::{cell::RefCell, marker::PhantomData};

pub use serde_json::json;

#[derive(Debug)]
enum Node {
    Object(Map<String, Value>),
    Collection(Vec<Value>),
}

#[derive(Debug)]
struct Frame {
    /// Where the node goes in the parent frame. Collection items have no key.
    key: Option<String>,
    node: Node,
}

#[derive(Debug)]
struct Reporter {
    stack: Vec<Frame>,
}

impl Default for Reporter {
    fn default() -> Self {
        Reporter {
            stack: vec![Frame {
                key: None,
                node: Node::Object(Map::new()),
            }],
        }
    }
}

impl Reporter {
    fn current(&mut self) -> &mut Node {
        &mut self.stack.last_mut().expect("reporting root is gone").node
    }

    fn open(&mut self, key: String, node: Node) {
        assert!(matches!(self.current(), Node::Object(_)), "contexts under a key need an object as parent");
        self.stack.push(Frame { key: Some(key), node });
    }

    fn open_item(&mut self) {
        assert!(matches!(self.current(), Node::Collection(_)), "collection items need a collection as parent");
        self.stack.push(Frame {
            key: None,
            node: Node::Object(Map::new()),
        });
    }

    fn report(&mut self, key: String, val: Value) {
        match self.current() {
            Node::Object(object) => {
                let prev = object.insert(key, val);
                if !cfg!(feature = "report-allow-override") {
                    assert!(prev.is_none(), "value reported twice");
                }
            }
            Node::Collection(_) => panic!("cannot report a value directly into a collection"),
        }
    }

    fn close(&mut self) {
        assert!(self.stack.len() > 1, "tried to close the reporting root");
        let Frame { key, node } = self.stack.pop().expect("stack is not empty");
        let val = into_value(node);

        match (self.current(), key) {
            (Node::Object(object), Some(key)) => {
                let prev = object.insert(key, val);
                assert!(prev.is_none(), "context reported twice");
            }
            (Node::Collection(collection), None) => collection.push(val),
            _ => panic!("inconsistent reporting context stack"),
        }
    }

    fn finish(mut self) -> Value {
        assert_eq!(self.stack.len(), 1, "reporting contexts still open");
        into_value(self.stack.pop().expect("root frame").node)
    }
}

fn into_value(node: Node) -> Value {
    match node {
        Node::Object(object) => Value::Object(object),
        Node::Collection(collection) => Value::Array(collection),
    }
}

thread_local! {
    static REPORTER: RefCell<Option<Reporter>> = RefCell::new(None);
}

fn with_reporter(f: impl FnOnce(&mut Reporter)) {
    REPORTER.with(|reporter| {
        if let Some(reporter) = reporter.borrow_mut().as_mut() {
            f(reporter)
        }
    });
}

fn close_context() {
    with_reporter(Reporter::close);
}

#[must_use]
pub struct ContextGuard(());

impl Drop for ContextGuard {
    fn drop(&mut self) {
        close_context();
    }
}

/// Report into a new object under `key` until the guard is dropped.
pub fn push_context(key: String) -> ContextGuard {
    with_reporter(|r| r.open(key, Node::Object(Map::new())));
    ContextGuard(())
}

#[must_use]
pub struct CollectionContextGuard(());

impl Drop for CollectionContextGuard {
    fn drop(&mut self) {
        close_context();
    }
}

/// Open an array under `key`. Values go into its items, see `push_collection_item`.
pub fn push_collection_context(key: String) -> CollectionContextGuard {
    with_reporter(|r| r.open(key, Node::Collection(Vec::new())));
    CollectionContextGuard(())
}

impl CollectionContextGuard {
    pub fn push_collection_item(&mut self) -> CollectionItemContextGuard<'_> {
        with_reporter(Reporter::open_item);
        CollectionItemContextGuard(PhantomData)
    }
}

#[must_use]
pub struct CollectionItemContextGuard<'a>(PhantomData<&'a mut CollectionContextGuard>);

impl<'a> Drop for CollectionItemContextGuard<'a> {
    fn drop(&mut self) {
        close_context();
    }
}

pub fn report(key: String, val: Value) {
    if cfg!(feature = "report-to-stderr") {
        eprintln!("{}: {}", key, val);
    }
    report_silent(key, val)
}

pub fn report_silent(key: String, val: Value) {
    with_reporter(|r| r.report(key, val));
}

#[macro_export]
macro_rules! report {
    ($k:expr, $($json:tt)+) => { $crate::report::report($k.to_string(), $crate::report::json!($($json)+)) };
}

#[macro_export]
macro_rules! report_silent {
    ($k:expr, $($json:tt)+) => { $crate::report::report_silent($k.to_string(), $crate::report::json!($($json)+)) };
}

pub mod benchmark;
pub use benchmark::*;

fn take_report() -> Option<Value> {
    REPORTER.with(|reporter| reporter.borrow_mut().take().map(Reporter::finish))
}

/// Prints the report on drop.
#[must_use]
pub struct ReportingGuard(());

impl Drop for ReportingGuard {
    fn drop(&mut self) {
        if let Some(report) = take_report() {
            println!("{}", report);
        }
    }
}

/// Start collecting reported values on this thread.
pub fn enable_reporting(program: &str) -> ReportingGuard {
    REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));

    report!("program", program);
    let start_time = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    report!("start_time", start_time);
    report!("args", std::env::args().collect::<Vec<String>>());
    report!("num_threads", rayon::current_num_threads());

    ReportingGuard(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_contexts() {
        REPORTER.with(|reporter| reporter.replace(Some(Reporter::default())));
        report!("graph", "test");
        {
            let _ctxt = push_context("preprocessing".to_string());
            report!("num_arcs", 42);
        }
        {
            let mut iterations = push_collection_context("iterations".to_string());
            for i in 1..=2 {
                let _item = iterations.push_collection_item();
                report!("iteration", i);
            }
        }

        assert_eq!(
            take_report(),
            Some(json!({
                "graph": "test",
                "preprocessing": { "num_arcs": 42 },
                "iterations": [{ "iteration": 1 }, { "iteration": 2 }]
            }))
        );
    }

    #[test]
    fn disabled_reporting_discards_values() {
        report!("ignored", 1);
        let _ctxt = push_context("ignored".to_string());
        assert_eq!(take_report(), None);
    }
}
