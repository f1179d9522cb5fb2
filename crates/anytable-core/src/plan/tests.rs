use super::*;
use crate::{
    adapter::{Capabilities, CostModel},
    filter::{Filter, Range},
    test_support::{FixtureAdapter, people_columns, people_rows},
    value::Value,
};

const ID: usize = 0;
const NAME: usize = 1;
const AGE: usize = 2;

fn adapter() -> FixtureAdapter {
    FixtureAdapter::new(people_columns(), people_rows())
}

fn plan_for(adapter: &FixtureAdapter, constraints: &[IndexConstraint], order_by: &[IndexOrderBy]) -> IndexPlan {
    best_index(
        adapter,
        &PlanInput {
            constraints,
            order_by,
            columns_used: None,
        },
    )
    .expect("planning should succeed")
}

#[test]
fn exact_filters_are_omitted_inexact_are_rechecked() {
    let adapter = adapter();
    let constraints = [
        IndexConstraint::compare(ID, Operator::Eq, true),
        IndexConstraint::compare(AGE, Operator::Gt, true),
        IndexConstraint::compare(NAME, Operator::Ne, true),
    ];

    let plan = plan_for(&adapter, &constraints, &[]);

    assert_eq!(
        plan.usage,
        vec![
            Some(ConstraintUsage {
                argv_index: 0,
                omit: true
            }),
            Some(ConstraintUsage {
                argv_index: 1,
                omit: false
            }),
            None,
        ]
    );
    assert_eq!(plan.pushed_filters(), 2);
}

#[test]
fn unusable_constraints_stay_with_the_engine() {
    let adapter = adapter();
    let plan = plan_for(&adapter, &[IndexConstraint::compare(ID, Operator::Eq, false)], &[]);

    assert_eq!(plan.usage, vec![None]);
    assert!(plan.index.args.is_empty());
}

#[test]
fn one_family_per_column_covering_most_operators() {
    let adapter = adapter();
    // Equal is declared first but Range covers both operators.
    let constraints = [
        IndexConstraint::compare(ID, Operator::Eq, true),
        IndexConstraint::compare(ID, Operator::Lt, true),
    ];
    let plan = plan_for(&adapter, &constraints, &[]);
    assert_eq!(plan.pushed_filters(), 2);

    let request = build_scan_request(
        adapter.columns(),
        &plan.index,
        &[Value::Integer(3), Value::Integer(10)],
    )
    .expect("request should build");
    assert_eq!(
        request.bounds["id"],
        Filter::Range(Range::new(Some(Value::Integer(3)), Some(Value::Integer(3)), true, true))
    );
}

#[test]
fn second_pattern_on_a_column_stays_with_the_engine() {
    let adapter = adapter();
    let constraints = [
        IndexConstraint::compare(NAME, Operator::Like, true),
        IndexConstraint::compare(NAME, Operator::Like, true),
    ];
    let plan = plan_for(&adapter, &constraints, &[]);

    assert!(plan.usage[0].is_some());
    assert_eq!(plan.usage[1], None);

    let request = build_scan_request(adapter.columns(), &plan.index, &[Value::from("a%")])
        .expect("request should build");
    assert!(matches!(request.bounds["name"], Filter::Like(_)));
}

#[test]
fn static_order_is_consumed_without_delegation() {
    let adapter = adapter();
    let plan = plan_for(
        &adapter,
        &[],
        &[IndexOrderBy {
            column: ID,
            direction: Direction::Ascending,
        }],
    );

    assert!(plan.order_consumed, "ascending column needs no sort");
    assert!(plan.index.order.is_empty());

    let plan = plan_for(
        &adapter,
        &[],
        &[IndexOrderBy {
            column: ID,
            direction: Direction::Descending,
        }],
    );
    assert!(!plan.order_consumed, "mismatched direction needs a sort");
}

#[test]
fn any_order_is_delegated() {
    let adapter = adapter();
    let plan = plan_for(
        &adapter,
        &[],
        &[IndexOrderBy {
            column: NAME,
            direction: Direction::Descending,
        }],
    );

    assert!(plan.order_consumed);
    assert_eq!(plan.index.order, vec![(NAME, Direction::Descending)]);
}

#[test]
fn mixed_static_and_any_order_is_sorted_locally() {
    let adapter = adapter();
    let plan = plan_for(
        &adapter,
        &[],
        &[
            IndexOrderBy {
                column: ID,
                direction: Direction::Ascending,
            },
            IndexOrderBy {
                column: NAME,
                direction: Direction::Ascending,
            },
        ],
    );

    assert!(!plan.order_consumed);
    assert!(plan.index.order.is_empty());
}

#[test]
fn limit_needs_capability_whole_predicate_and_order() {
    let sliced = adapter().with_capabilities(Capabilities::NONE.with_limit_offset());
    let plain = adapter();

    let exact = [IndexConstraint::compare(ID, Operator::Ge, true), IndexConstraint::limit()];
    assert!(plan_for(&sliced, &exact, &[]).limit_delegated());
    assert!(!plan_for(&plain, &exact, &[]).limit_delegated(), "no capability");

    let inexact = [IndexConstraint::compare(AGE, Operator::Ge, true), IndexConstraint::limit()];
    assert!(!plan_for(&sliced, &inexact, &[]).limit_delegated(), "inexact filter");

    let residual = [IndexConstraint::compare(NAME, Operator::Ne, true), IndexConstraint::limit()];
    assert!(!plan_for(&sliced, &residual, &[]).limit_delegated(), "engine-side predicate");

    let unsorted = [IndexOrderBy {
        column: AGE,
        direction: Direction::Ascending,
    }];
    assert!(
        !plan_for(&sliced, &[IndexConstraint::limit()], &unsorted).limit_delegated(),
        "engine sort"
    );
}

#[test]
fn limit_without_offset_capability_is_widened() {
    let limit_only = adapter().with_capabilities(Capabilities {
        limit: true,
        ..Capabilities::NONE
    });
    let constraints = [IndexConstraint::limit(), IndexConstraint::offset()];
    let plan = plan_for(&limit_only, &constraints, &[]);

    assert!(plan.limit_delegated());
    assert!(!plan.offset_delegated());
    assert_eq!(
        plan.usage[1],
        Some(ConstraintUsage {
            argv_index: 1,
            omit: false
        }),
        "offset stays with the engine"
    );

    let request = build_scan_request(
        limit_only.columns(),
        &plan.index,
        &[Value::Integer(2), Value::Integer(3)],
    )
    .expect("request should build");
    assert_eq!(request.limit, Some(5));
    assert_eq!(request.offset, None);
}

#[test]
fn bounds_convert_values_with_the_field() {
    let columns = crate::field::Columns::new().with(
        "born",
        crate::field::Field::iso_date().with_filters([FilterKind::Range]),
    );
    let spec = IndexSpec {
        args: vec![PlannedArg::Filter {
            column: 0,
            op: Operator::Ge,
        }],
        ..IndexSpec::default()
    };
    let date = chrono::NaiveDate::from_ymd_opt(2020, 5, 17).expect("valid date");

    let request = build_scan_request(&columns, &spec, &[Value::Date(date)]).expect("request should build");
    assert_eq!(
        request.bounds["born"],
        Filter::Range(Range::new(Some(Value::Text("2020-05-17".into())), None, true, false))
    );

    let err = build_scan_request(&columns, &spec, &[Value::Text("soon".into())])
        .expect_err("text is not a date");
    assert_eq!(err.class, crate::error::ErrorClass::TypeConversion);
}

#[test]
fn index_survives_encoding() {
    let adapter = adapter().with_capabilities(Capabilities::NONE.with_limit_offset().with_requested_columns());
    let used = [ID, NAME].into_iter().collect();
    let plan = best_index(
        &adapter,
        &PlanInput {
            constraints: &[IndexConstraint::compare(NAME, Operator::Like, true), IndexConstraint::limit()],
            order_by: &[],
            columns_used: Some(&used),
        },
    )
    .expect("planning should succeed");

    let encoded = plan.index.encode().expect("encode should succeed");
    assert_eq!(IndexSpec::decode(&encoded).expect("decode should succeed"), plan.index);
    assert_eq!(
        plan.index.requested_columns,
        Some(vec!["id".to_string(), "name".to_string()])
    );
    assert!(IndexSpec::decode("{not json").is_err());
}

#[test]
fn cheaper_plan_wins_then_more_pushdown() {
    let costly = adapter().with_cost(CostModel::Simple { rows: 100, fixed: 1.0 });
    let all = plan_for(&costly, &[IndexConstraint::compare(ID, Operator::Eq, true)], &[]);
    let none = plan_for(&costly, &[IndexConstraint::compare(ID, Operator::Eq, false)], &[]);
    assert!(all.estimated_cost > none.estimated_cost);

    let chosen = choose_plan([all.clone(), none.clone()]).expect("a plan should be chosen");
    assert_eq!(chosen, none);

    let flat = adapter();
    let all = plan_for(&flat, &[IndexConstraint::compare(ID, Operator::Eq, true)], &[]);
    let none = plan_for(&flat, &[IndexConstraint::compare(ID, Operator::Eq, false)], &[]);
    let chosen = choose_plan([none, all.clone()]).expect("a plan should be chosen");
    assert_eq!(chosen, all, "equal cost prefers pushdown");
}

#[test]
fn explain_reports_pushdown_and_sort() {
    let adapter = adapter();
    let constraints = [
        IndexConstraint::compare(AGE, Operator::Lt, true),
        IndexConstraint::compare(NAME, Operator::Ne, true),
        IndexConstraint::limit(),
    ];
    let order_by = [IndexOrderBy {
        column: ID,
        direction: Direction::Ascending,
    }];
    let plan = plan_for(&adapter, &constraints, &order_by);
    let explain = ExplainPlan::new("people", adapter.columns(), &constraints, &plan);

    assert_eq!(
        explain.pushed,
        vec![ExplainPredicate {
            column: "age".to_string(),
            op: Operator::Lt,
            rechecked: true
        }]
    );
    assert_eq!(explain.residual.len(), 1);
    assert!(!explain.sort_required);
    assert_eq!(explain.limit, ExplainSlice::Local);
    assert_eq!(explain.offset, ExplainSlice::Absent);
    assert!(explain.to_string().starts_with("SCAN people"));
}
