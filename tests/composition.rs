use std::sync::Arc;

use datavirt::filter::{FilterChain, FilterState, FilterType, PredicateFilter, StateEnvelope};
use datavirt::model::{Datasource, StaticTimestamps, Timestamps, ValueSet};
use datavirt::source::{parse_descriptor, StaticValueTable};
use datavirt::view::UnionTimestamps;
use datavirt::{JoinTable, Value, ValueTable, ValueType, Variable, VariableEntity, View};

fn participant(id: &str) -> VariableEntity {
    VariableEntity::new("Participant", id)
}

fn admin_table() -> Arc<dyn ValueTable> {
    Arc::new(
        StaticValueTable::builder("T", "Participant")
            .variable(Variable::builder("Admin.Name", ValueType::Text, "Participant").build())
            .variable(Variable::builder("Other.X", ValueType::Integer, "Participant").build())
            .value("1234", "Admin.Name", Value::text("Ann"))
            .value("5678", "Admin.Name", Value::text("Bob"))
            .value("5678", "Other.X", Value::integer(7))
            .build()
            .unwrap(),
    )
}

#[test]
fn view_selects_admin_variables_and_hides_rows() {
    let view = View::builder("admin", admin_table())
        .select(|v: &Variable| v.name().starts_with("Admin"))
        .where_clause(|vs: &ValueSet| vs.entity().identifier() != "1234")
        .build()
        .expect("view builds");

    let names: Vec<String> = view.variables().map(|v| v.name().to_string()).collect();
    assert_eq!(names, vec!["Admin.Name"]);
    let ids: Vec<String> = view
        .entities()
        .map(|e| e.identifier().to_string())
        .collect();
    assert_eq!(ids, vec!["5678"]);
    assert!(view.value_set(&participant("1234")).is_err(), "row hidden by where clause");

    let row = view.value_set(&participant("5678")).expect("visible row");
    let name = view.variable("Admin.Name").expect("selected variable");
    assert_eq!(view.value(&name, &row).unwrap(), Value::text("Bob"));
}

#[test]
fn join_resolves_shared_variable_through_first_member() {
    let left: Arc<dyn ValueTable> = Arc::new(
        StaticValueTable::builder("left", "Participant")
            .variable(Variable::builder("X", ValueType::Integer, "Participant").build())
            .value("1", "X", Value::integer(1))
            .build()
            .unwrap(),
    );
    let right: Arc<dyn ValueTable> = Arc::new(
        StaticValueTable::builder("right", "Participant")
            .variable(Variable::builder("X", ValueType::Integer, "Participant").build())
            .value("1", "X", Value::integer(2))
            .build()
            .unwrap(),
    );

    let join = JoinTable::new("lr", vec![Arc::clone(&left), Arc::clone(&right)]).unwrap();
    let x = join.variable("X").unwrap();
    let row = join.value_set(&participant("1")).unwrap();
    assert_eq!(join.value(&x, &row).unwrap(), Value::integer(1));

    let reversed = JoinTable::new("rl", vec![right, left]).unwrap();
    let row = reversed.value_set(&participant("1")).unwrap();
    assert_eq!(reversed.value(&x, &row).unwrap(), Value::integer(2));
}

#[test]
fn join_row_timestamps_are_merged() {
    let at = |millis: i64| Value::from_millis(millis).unwrap();
    let null = || ValueType::DateTime.null_value();
    let first: Arc<dyn ValueTable> = Arc::new(
        StaticValueTable::builder("first", "Participant")
            .row_timestamps("1", StaticTimestamps::new(at(1000), null()))
            .build()
            .unwrap(),
    );
    let second: Arc<dyn ValueTable> = Arc::new(
        StaticValueTable::builder("second", "Participant")
            .row_timestamps("1", StaticTimestamps::new(null(), at(4_000_000_000)))
            .build()
            .unwrap(),
    );

    let join = JoinTable::new("both", vec![first, second]).unwrap();
    let row = join.value_set(&participant("1")).unwrap();
    assert_eq!(row.timestamps().created(), at(1000));
    assert_eq!(row.timestamps().last_update(), at(4_000_000_000));

    let nothing = UnionTimestamps::new(vec![
        Arc::new(StaticTimestamps::null()) as Arc<dyn Timestamps>,
        Arc::new(StaticTimestamps::null()),
    ]);
    assert!(nothing.created().is_null());
    assert!(nothing.last_update().is_null());
}

#[test]
fn filter_chain_exclude_then_include() {
    let empty = FilterChain::<&str>::new();
    assert_eq!(empty.filter("kept"), Some("kept"));

    let exclude = PredicateFilter::<&str>::exclude("tmp", |s| Some(s.starts_with("tmp")));
    let also_exclude = PredicateFilter::<&str>::exclude("all", |_| Some(true));
    let include = PredicateFilter::<&str>::include("keep", |s| Some(s.ends_with("keep")));

    let envelope = StateEnvelope::new("tmp_keep").apply(&exclude);
    assert_eq!(envelope.state(), FilterState::Out);
    let envelope = envelope.apply(&also_exclude);
    assert_eq!(envelope.state(), FilterState::Out);
    let envelope = envelope.apply(&include);
    assert_eq!(envelope.state(), FilterState::In);

    let unsure = PredicateFilter::<&str>::new(FilterType::Exclude, "unsure", |_| None);
    assert_eq!(StateEnvelope::new("x").apply(&unsure).state(), FilterState::In);
}

#[test]
fn values_round_trip_through_text() {
    let samples = [
        (ValueType::Text, "hello"),
        (ValueType::Integer, "-42"),
        (ValueType::Decimal, "3.25"),
        (ValueType::Boolean, "true"),
        (ValueType::Date, "2024-02-29"),
        (ValueType::DateTime, "2024-02-29T13:14:15.016+0000"),
        (ValueType::Locale, "fr_CA"),
    ];
    for (value_type, text) in samples {
        let value = value_type.value_of_str(text).unwrap();
        let formatted = value_type.format(&value).unwrap().unwrap();
        assert_eq!(value_type.value_of_str(&formatted).unwrap(), value, "{}", value_type);
    }

    let flag = Value::boolean(false);
    assert_eq!(flag.not().unwrap().not().unwrap(), flag);
    let null = ValueType::Boolean.null_value();
    assert_eq!(null.not().unwrap(), null);
    assert_eq!(
        ValueType::Integer.convert(&Value::decimal(-0.9)).unwrap(),
        Value::integer(0)
    );
}

#[test]
fn views_nest_over_joins_loaded_from_a_descriptor() {
    let datasource = parse_descriptor(
        r#"{
            "name": "study",
            "tables": [
                { "name": "visits", "entity_type": "Participant",
                  "variables": [{ "name": "height", "value_type": "decimal", "unit": "cm" }],
                  "entities": [{ "id": "p1", "values": { "height": 180.5 } },
                               { "id": "p2", "values": { "height": 162 } }] },
                { "name": "labs", "entity_type": "Participant",
                  "variables": [{ "name": "weight", "value_type": "decimal" }],
                  "entities": [{ "id": "p1", "values": { "weight": 81 } }] }
            ]
        }"#,
    )
    .unwrap();

    let join: Arc<dyn ValueTable> = Arc::new(
        JoinTable::new(
            "body",
            vec![
                datasource.value_table("visits").unwrap(),
                datasource.value_table("labs").unwrap(),
            ],
        )
        .unwrap(),
    );
    let view = View::builder("bmi", join)
        .derive(
            Variable::builder("bmi", ValueType::Decimal, "Participant").build(),
            |ctx| {
                let height = ctx.value("height")?.as_decimal();
                let weight = ctx.value("weight")?.as_decimal();
                Ok(match (height, weight) {
                    (Some(h), Some(w)) => Value::decimal(w / (h / 100.0).powi(2)),
                    _ => ValueType::Decimal.null_value(),
                })
            },
        )
        .build()
        .unwrap();

    let bmi = view.variable("bmi").unwrap();
    let p1 = view.value_set(&participant("p1")).unwrap();
    let value = view.value(&bmi, &p1).unwrap().as_decimal().unwrap();
    assert!((value - 24.86).abs() < 0.01, "bmi was {}", value);

    let p2 = view.value_set(&participant("p2")).unwrap();
    assert!(view.value(&bmi, &p2).unwrap().is_null(), "no weight for p2");
}
