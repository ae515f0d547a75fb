use scrapekit_adaptor::steps::{add_from_arg, split_on, to_integer};
use scrapekit_adaptor::{Adaptor, AdaptorArgs, AdaptorError, Step, StepError, StepResult};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn add(n: i64) -> impl Fn(Value) -> StepResult<Value> + Send + Sync + 'static {
    move |v: Value| Ok(json!(v.as_i64().unwrap() + n))
}

fn overrides(pairs: &[(&str, Value)]) -> AdaptorArgs {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

// ── identity ─────────────────────────────────────────────────────

#[test]
fn empty_pipeline_passes_value_through() {
    let ad = Adaptor::new();
    assert_eq!(ad.run("string").unwrap(), vec![json!("string")]);
    assert!(ad.is_empty());
}

#[test]
fn empty_pipeline_feeds_list_elements() {
    let ad = Adaptor::identity();
    assert_eq!(ad.run(json!(["a", "b"])).unwrap(), vec![json!("a"), json!("b")]);
}

// ── composition ──────────────────────────────────────────────────

#[test]
fn single_step_wraps_scalar_result() {
    let ad = Adaptor::new().then_fn(add(1));
    assert_eq!(ad.run(0).unwrap(), vec![json!(1)]);
}

#[test]
fn steps_compose_left_to_right() {
    let ad = Adaptor::new().then_fn(add(1)).then_fn(add(2));
    assert_eq!(ad.run(0).unwrap(), vec![json!(3)]);
    assert_eq!(ad.len(), 2);
}

#[test]
fn pipelines_nest_as_steps() {
    let ad = Adaptor::new().then_fn(add(1));
    let ad2 = Adaptor::new().then_fn(add(1)).then_fn(add(2));
    let ad3 = Adaptor::new().then(ad.clone()).then(ad2.clone());
    assert_eq!(ad3.run(0).unwrap(), vec![json!(4)]);
    assert_eq!(ad.run(0).unwrap(), vec![json!(1)]);
}

#[test]
fn order_matters() {
    let double = |v: Value| -> StepResult<Value> { Ok(json!(v.as_i64().unwrap() * 2)) };
    let a = Adaptor::new().then_fn(add(1)).then_fn(double);
    let b = Adaptor::new().then_fn(double).then_fn(add(1));
    assert_eq!(a.run(3).unwrap(), vec![json!(8)]);
    assert_eq!(b.run(3).unwrap(), vec![json!(7)]);
}

// ── side-channel arguments ───────────────────────────────────────

#[test]
fn unbound_argument_defaults_in_step() {
    let ad = Adaptor::single(add_from_arg("add_value"));
    assert_eq!(ad.run(0).unwrap(), vec![json!(0)]);
    assert_eq!(
        ad.run_with(0, &overrides(&[("add_value", json!(3))])).unwrap(),
        vec![json!(3)]
    );
    assert_eq!(ad.run(0).unwrap(), vec![json!(0)]);
}

#[test]
fn overrides_do_not_persist() {
    let ad = Adaptor::single(add_from_arg("add_value")).arg("add_value", 5);
    assert_eq!(ad.run(0).unwrap(), vec![json!(5)]);
    assert_eq!(
        ad.run_with(0, &overrides(&[("add_value", json!(3))])).unwrap(),
        vec![json!(3)]
    );
    assert_eq!(ad.run(0).unwrap(), vec![json!(5)]);
    assert_eq!(ad.bound_args()["add_value"], 5);
}

#[test]
fn step_mutations_do_not_leak_between_runs() {
    let ad = Adaptor::new()
        .then_with(|v: Value, args: &mut AdaptorArgs| {
            let seen = args.get("seen").and_then(Value::as_i64).unwrap_or(0);
            args.insert("seen".into(), json!(seen + 1));
            Ok(v)
        })
        .then_with(|_v: Value, args: &mut AdaptorArgs| Ok(args["seen"].clone()));

    assert_eq!(ad.run("x").unwrap(), vec![json!(1)]);
    assert_eq!(ad.run("x").unwrap(), vec![json!(1)]);
    assert!(ad.bound_args().is_empty());
}

#[test]
fn nested_pipeline_sees_caller_arguments() {
    let inner = Adaptor::single(add_from_arg("n")).arg("n", 1);
    let outer = Adaptor::new().then(inner).arg("n", 10);
    assert_eq!(outer.run(0).unwrap(), vec![json!(10)]);
}

#[test]
fn nested_pipeline_keeps_its_own_defaults_when_caller_is_silent() {
    let inner = Adaptor::single(add_from_arg("n")).arg("n", 1);
    let outer = Adaptor::new().then(inner);
    assert_eq!(outer.run(0).unwrap(), vec![json!(1)]);
}

// ── fan-out ──────────────────────────────────────────────────────

#[test]
fn fan_out_flattens_in_order() {
    let ad = Adaptor::new().then(split_on("&")).then(split_on("="));
    assert_eq!(
        ad.run("name=joe&job=joker").unwrap(),
        vec![json!("name"), json!("joe"), json!("job"), json!("joker")]
    );
}

#[test]
fn empty_sequence_drops_value() {
    let ad = Adaptor::new()
        .then(split_on(","))
        .then_fn(|v: Value| -> StepResult<Value> {
            if v == "" { Ok(json!([])) } else { Ok(v) }
        });
    assert_eq!(ad.run("a,,b").unwrap(), vec![json!("a"), json!("b")]);
}

#[test]
fn each_fanned_value_runs_next_step_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let ad = Adaptor::new()
        .then(split_on(" "))
        .then_fn(move |v: Value| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v)
        });
    assert_eq!(ad.run("a b c").unwrap().len(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

// ── errors ───────────────────────────────────────────────────────

#[test]
fn step_error_reports_pipeline_and_index() {
    let ad = Adaptor::new().then(split_on(",")).then(to_integer()).named("ids");
    let err = ad.run("1,x").unwrap_err();
    match err {
        AdaptorError::Step { pipeline, index, source } => {
            assert_eq!(pipeline, "ids");
            assert_eq!(index, 1);
            assert!(matches!(source, StepError::Parse { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn nested_failure_is_wrapped() {
    let inner = Adaptor::single(to_integer()).named("inner");
    let outer = Adaptor::new().then_fn(Ok).then(inner).named("outer");
    let err = outer.run("nope").unwrap_err();
    match err {
        AdaptorError::Step { pipeline, index, source } => {
            assert_eq!(pipeline, "outer");
            assert_eq!(index, 1);
            assert!(matches!(source, StepError::Nested { ref pipeline, index: 0, .. } if pipeline == "inner"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn custom_step_errors_propagate() {
    let ad = Adaptor::new().then_fn(|_v: Value| Err(StepError::Custom("boom".into())));
    let err = ad.run(1).unwrap_err();
    assert!(err.to_string().contains("boom"));
}

// ── Step trait ───────────────────────────────────────────────────

struct Prefix(&'static str);

impl Step for Prefix {
    fn apply(&self, value: Value, _args: &mut AdaptorArgs) -> StepResult<Value> {
        Ok(json!(format!("{}{}", self.0, value.as_str().unwrap_or_default())))
    }

    fn name(&self) -> &str {
        "prefix"
    }
}

#[test]
fn custom_step_types_plug_in() {
    let ad = Adaptor::single(Prefix("id-")).then(Prefix("#"));
    assert_eq!(ad.run("7").unwrap(), vec![json!("#id-7")]);
    assert!(format!("{ad:?}").contains("prefix"));
}

#[test]
fn adaptor_is_named_step() {
    let ad = Adaptor::new().named("clean");
    assert_eq!(Step::name(&ad), "clean");
    assert_eq!(ad.name(), Some("clean"));
}
