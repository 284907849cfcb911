use std::sync::Arc;

use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use rowbind::prelude::*;
use rowbind::validate;
use rowbind_memory::MemoryConnection;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn expect_validation<T>(outcome: Outcome<T, Error>) -> ValidationError {
    match outcome {
        Outcome::Err(Error::Validation(errors)) => errors,
        Outcome::Ok(_) => panic!("expected a validation error, got success"),
        Outcome::Err(e) => panic!("expected a validation error, got: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn validated_type() -> Arc<RecordType> {
    let schema = Schema::new(
        "accounts",
        vec![
            FieldDef::new("id", SqlType::Integer)
                .primary_key()
                .auto_increment(),
            FieldDef::new("email", SqlType::Text),
        ],
    )
    .expect("schema binds");
    Arc::new(
        RecordType::builder(schema)
            .validates("email", "email is required", validate::present())
            .validates(
                "email",
                "email is invalid",
                |v| v.is_null() || v.as_str().is_some_and(|s| s.contains('@')),
            )
            .build()
            .expect("type builds"),
    )
}

#[test]
fn save_with_validation_errors_performs_no_storage_call() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::new();
        let mut account = Record::new(validated_type());
        assert!(account.has_errors());

        let errors = expect_validation(account.save(&cx, &conn).await);
        assert_eq!(
            errors.field_errors("email"),
            Some(&["email is required".to_string()][..])
        );
        // the exact in-memory errors were reported
        assert_eq!(errors.errors, account.get_errors());
        assert!(conn.executed_statements().is_empty());
        assert!(!account.in_storage());
    });
}

#[test]
fn all_failing_rules_for_a_field_report_together() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::new();
        let schema = Schema::new(
            "accounts",
            vec![
                FieldDef::new("id", SqlType::Integer).primary_key(),
                FieldDef::new("email", SqlType::Text),
            ],
        )
        .expect("schema binds");
        let ty = Arc::new(
            RecordType::builder(schema)
                .validates("email", "email is required", validate::present())
                .validates("email", "email is too short", validate::min_length(6))
                .build()
                .expect("type builds"),
        );

        let mut account = Record::new(ty);
        let errors = expect_validation(account.save(&cx, &conn).await);
        assert_eq!(
            errors.field_errors("email"),
            Some(
                &[
                    "email is required".to_string(),
                    "email is too short".to_string()
                ][..]
            )
        );
        assert!(conn.executed_statements().is_empty());

        account.set("email", "not-an-address").unwrap();
        assert!(account.error_object().is_none());
    });
}

#[test]
fn storage_failure_lands_under_the_query_key() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::new();
        let mut account = Record::new(validated_type());
        account.set("email", "a@example.com").unwrap();
        assert!(!account.has_errors());

        conn.fail_next_query("connection reset");
        let errors = expect_validation(account.save(&cx, &conn).await);
        assert_eq!(
            errors.field_errors(QUERY_ERROR_KEY),
            Some(&["query failed: connection reset".to_string()][..])
        );
        // persistence state is unchanged by the failure
        assert!(!account.in_storage());

        // the recorded error gates the next save until cleared by callers
        let errors = expect_validation(account.save(&cx, &conn).await);
        assert!(errors.field_errors(QUERY_ERROR_KEY).is_some());
        assert_eq!(conn.executed_statements().len(), 1);
    });
}

#[test]
fn destroy_failure_keeps_record_in_storage() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::new();
        let mut account = Record::new(validated_type());
        account.set("email", "a@example.com").unwrap();
        unwrap_outcome(account.save(&cx, &conn).await);

        conn.fail_next_query("lock timeout");
        let errors = expect_validation(account.destroy(&cx, &conn).await);
        assert_eq!(
            errors.field_errors(QUERY_ERROR_KEY),
            Some(&["query failed: lock timeout".to_string()][..])
        );
        assert!(account.in_storage());
        assert_eq!(conn.table_len("accounts"), 1);
    });
}

#[test]
fn destroy_before_save_reports_not_saved_without_io() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let conn = MemoryConnection::new();
        let mut account = Record::new(validated_type());
        account.set("email", "a@example.com").unwrap();

        let errors = expect_validation(account.destroy(&cx, &conn).await);
        assert_eq!(
            errors.field_errors(QUERY_ERROR_KEY),
            Some(&["Model has not been saved".to_string()][..])
        );
        assert!(conn.executed_statements().is_empty());
        // the transient error is not recorded on the record itself
        assert!(!account.get_errors().contains_key(QUERY_ERROR_KEY));
    });
}
