use chrono::NaiveDate;
use finance_core::db::{BackingStore, StoreError, StoreResult};
use finance_core::model::date::parse_display_date;
use finance_core::table::cash_flow::{
    AMOUNT_COLUMN, DATE_COLUMN, DESCRIPTION_COLUMN, TRANSACTION_ID_COLUMN,
};
use finance_core::{
    CacheSync, CashFlow, FinanceDatabase, MonthCode, Row, SourcedTable, SqliteStore,
    TiePlacement, TableError,
};
use rusqlite::types::Value;

fn transaction_row(id: i64, description: &str, date: &str, amount: &str) -> Row {
    Row::from_pairs([
        (DESCRIPTION_COLUMN, description.to_string()),
        (TRANSACTION_ID_COLUMN, id.to_string()),
        (AMOUNT_COLUMN, amount.to_string()),
        (DATE_COLUMN, date.to_string()),
    ])
    .unwrap()
}

fn august() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
}

fn loaded_database() -> FinanceDatabase {
    let mut database = FinanceDatabase::open_in_memory().unwrap();
    database.load(august()).unwrap();
    database
}

fn cached_ids(cash_flow: &CashFlow) -> Vec<String> {
    cash_flow
        .table()
        .rows()
        .iter()
        .map(|row| row.value(TRANSACTION_ID_COLUMN).unwrap().to_string())
        .collect()
}

fn stored_count(database: &FinanceDatabase) -> usize {
    database
        .store()
        .query("SELECT * FROM CashFlow;", &[])
        .unwrap()
        .len()
}

/// Store whose every statement fails.
struct FailingStore;

impl BackingStore for FailingStore {
    fn execute(&self, _sql: &str, _params: &[Value]) -> StoreResult<usize> {
        Err(StoreError::NotConnected)
    }

    fn query(&self, _sql: &str, _params: &[Value]) -> StoreResult<Vec<Row>> {
        Err(StoreError::NotConnected)
    }

    fn query_scalar(
        &self,
        _sql: &str,
        _params: &[Value],
        _column: &str,
    ) -> StoreResult<Option<i64>> {
        Err(StoreError::NotConnected)
    }
}

#[test]
fn rows_are_cached_newest_first() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "groceries", "05/08/2024", "-20"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "salary", "20/08/2024", "1500"))
        .unwrap();
    database
        .add_transaction(transaction_row(2, "rent", "01/08/2024", "-500"))
        .unwrap();

    assert_eq!(cached_ids(database.cash_flow()), vec!["1", "0", "2"]);
}

#[test]
fn equal_dates_go_before_existing_rows_by_default() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "first", "10/08/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "second", "10/08/2024", "-2"))
        .unwrap();

    assert_eq!(database.cash_flow().tie_placement(), TiePlacement::BeforeEqual);
    assert_eq!(cached_ids(database.cash_flow()), vec!["1", "0"]);
}

#[test]
fn equal_dates_go_after_existing_rows_when_configured() {
    let mut store = SqliteStore::new();
    store.connect_in_memory().unwrap();
    let mut cash_flow = CashFlow::with_tie_placement(TiePlacement::AfterEqual).unwrap();

    cash_flow
        .add_row(&store, transaction_row(0, "first", "10/08/2024", "-1"))
        .unwrap();
    cash_flow
        .add_row(&store, transaction_row(1, "later", "12/08/2024", "-1"))
        .unwrap();
    cash_flow
        .add_row(&store, transaction_row(2, "second", "10/08/2024", "-2"))
        .unwrap();

    assert_eq!(cached_ids(&cash_flow), vec!["1", "0", "2"]);
}

#[test]
fn available_id_is_one_past_the_maximum() {
    let mut database = loaded_database();
    assert_eq!(database.next_transaction_id(), 0);

    for id in [0, 2, 3] {
        database
            .add_transaction(transaction_row(id, "t", "03/08/2024", "-1"))
            .unwrap();
    }
    assert_eq!(database.next_transaction_id(), 4);

    database.delete_transaction(3).unwrap();
    assert_eq!(database.next_transaction_id(), 3);
}

#[test]
fn record_transaction_assigns_ids_in_sequence() {
    let mut database = loaded_database();
    let date = NaiveDate::from_ymd_opt(2024, 8, 9).unwrap();

    assert_eq!(database.record_transaction("coffee", date, -3.5).unwrap(), 0);
    assert_eq!(database.record_transaction("lunch", date, -12.0).unwrap(), 1);

    let row = database.cash_flow().table().row(0).unwrap();
    assert_eq!(row.value(DESCRIPTION_COLUMN).unwrap(), "lunch");
    assert_eq!(row.value(AMOUNT_COLUMN).unwrap(), "-12");
    assert_eq!(row.value(DATE_COLUMN).unwrap(), "09/08/2024");
}

#[test]
fn invalid_fields_are_rejected_before_the_store() {
    let mut database = loaded_database();

    assert!(matches!(
        database.add_transaction(transaction_row(0, "t", "31/02/2024", "-1")),
        Err(TableError::Format { column: DATE_COLUMN, .. })
    ));
    assert!(matches!(
        database.add_transaction(transaction_row(0, "t", "2024-08-01", "-1")),
        Err(TableError::Format { column: DATE_COLUMN, .. })
    ));
    assert!(matches!(
        database.add_transaction(transaction_row(0, &"x".repeat(51), "01/08/2024", "-1")),
        Err(TableError::Length { max: 50, actual: 51, .. })
    ));
    assert!(matches!(
        database.add_transaction(transaction_row(0, "t", "01/08/2024", "ten")),
        Err(TableError::Parse { column: AMOUNT_COLUMN, .. })
    ));
    assert!(matches!(
        database.add_transaction(Row::from_pairs([(DESCRIPTION_COLUMN, "t")]).unwrap()),
        Err(TableError::InvalidRow(_))
    ));

    assert!(database.cash_flow().table().is_empty());
    assert_eq!(stored_count(&database), 0);
}

#[test]
fn description_of_exactly_fifty_characters_is_accepted() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, &"é".repeat(50), "01/08/2024", "-1"))
        .unwrap();

    assert_eq!(database.cash_flow().table().len(), 1);
}

#[test]
fn duplicate_id_fails_in_store_and_leaves_cache_unchanged() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();

    let err = database
        .add_transaction(transaction_row(0, "again", "02/08/2024", "-5"))
        .unwrap_err();

    assert!(matches!(err, TableError::Store(_)));
    assert_eq!(cached_ids(database.cash_flow()), vec!["0"]);
}

#[test]
fn reload_reproduces_cached_rows() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "coffee", "15/08/2024", "-3.5"))
        .unwrap();
    database
        .add_transaction(transaction_row(2, "refund", "15/08/2024", "12.25"))
        .unwrap();
    let before = database.cash_flow().table().rows().to_vec();

    database.load(august()).unwrap();

    assert_eq!(database.cash_flow().table().rows(), before.as_slice());
}

#[test]
fn load_only_caches_the_requested_month() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "july", "31/07/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "august", "01/08/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(2, "september", "01/09/2024", "-1"))
        .unwrap();

    database.load(august()).unwrap();

    assert_eq!(cached_ids(database.cash_flow()), vec!["1"]);
    assert_eq!(database.loaded_month(), MonthCode::parse("082024"));
}

#[test]
fn month_filter_is_scoped_by_year() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "this year", "05/08/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "last year", "05/08/2023", "-1"))
        .unwrap();

    let month = MonthCode::parse("082024").unwrap();
    let rows = database.rows_in_month(month);

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value(TRANSACTION_ID_COLUMN).unwrap(), "0");
    assert_eq!(database.cash_flow().number_of_rows(month), 1);
}

#[test]
fn delete_is_idempotent() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();

    assert_eq!(database.delete_transaction(0).unwrap(), CacheSync::Applied);
    assert_eq!(database.delete_transaction(0).unwrap(), CacheSync::Missing);
    assert!(database.cash_flow().table().is_empty());
    assert_eq!(stored_count(&database), 0);
}

#[test]
fn update_of_unknown_id_reports_missing() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();

    assert_eq!(
        database.update_transaction(999, AMOUNT_COLUMN, "5").unwrap(),
        CacheSync::Missing
    );
    assert_eq!(
        database
            .update_transaction(999, DATE_COLUMN, "02/08/2024")
            .unwrap(),
        CacheSync::Missing
    );
    assert_eq!(
        database.cash_flow().table().rows(),
        &[transaction_row(0, "rent", "01/08/2024", "-500")]
    );
    let stored = database
        .store()
        .query("SELECT Amount FROM CashFlow;", &[])
        .unwrap();
    assert_eq!(stored[0].value(AMOUNT_COLUMN).unwrap(), "-500");
}

#[test]
fn negative_zero_amount_survives_reload() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "even", "01/08/2024", "-0"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "rent", "02/08/2024", "-500"))
        .unwrap();
    database.update_transaction(1, AMOUNT_COLUMN, "-0.0").unwrap();
    let before = database.cash_flow().table().rows().to_vec();

    database.load(august()).unwrap();

    assert_eq!(database.cash_flow().table().rows(), before.as_slice());
    for row in &before {
        assert_eq!(row.value(AMOUNT_COLUMN).unwrap(), "0");
    }
}

#[test]
fn insertion_keeps_date_order_for_every_arrival_order() {
    fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut all = Vec::new();
        for (index, first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(index);
            for mut tail in permutations(&rest) {
                tail.insert(0, *first);
                all.push(tail);
            }
        }
        all
    }

    let dates = ["10/08/2024", "03/08/2024", "10/08/2024", "21/08/2024", "03/08/2024"];
    let orders = permutations(&dates);
    assert_eq!(orders.len(), 120);

    for placement in [TiePlacement::BeforeEqual, TiePlacement::AfterEqual] {
        for order in &orders {
            let mut store = SqliteStore::new();
            store.connect_in_memory().unwrap();
            let mut cash_flow = CashFlow::with_tie_placement(placement).unwrap();
            for (id, date) in order.iter().enumerate() {
                cash_flow
                    .add_row(&store, transaction_row(id as i64, "t", date, "-1"))
                    .unwrap();
            }

            let cached: Vec<NaiveDate> = cash_flow
                .table()
                .rows()
                .iter()
                .map(|row| parse_display_date(row.value(DATE_COLUMN).unwrap()).unwrap())
                .collect();
            assert_eq!(cached.len(), dates.len());
            assert!(
                cached.windows(2).all(|pair| pair[0] >= pair[1]),
                "{placement:?} {order:?} cached {cached:?}"
            );
        }
    }
}

#[test]
fn update_changes_store_and_cache() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();

    assert_eq!(
        database.update_transaction(0, AMOUNT_COLUMN, "-450.5").unwrap(),
        CacheSync::Applied
    );
    assert_eq!(
        database
            .update_transaction(0, DESCRIPTION_COLUMN, "rent (discounted)")
            .unwrap(),
        CacheSync::Applied
    );
    let cached = database.cash_flow().table().rows().to_vec();

    database.load(august()).unwrap();

    assert_eq!(database.cash_flow().table().rows(), cached.as_slice());
    assert_eq!(cached[0].value(AMOUNT_COLUMN).unwrap(), "-450.5");
}

#[test]
fn date_update_moves_row_to_keep_order() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "a", "01/08/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "b", "10/08/2024", "-1"))
        .unwrap();
    database
        .add_transaction(transaction_row(2, "c", "20/08/2024", "-1"))
        .unwrap();

    database
        .update_transaction(0, DATE_COLUMN, "25/08/2024")
        .unwrap();

    assert_eq!(cached_ids(database.cash_flow()), vec!["0", "2", "1"]);
}

#[test]
fn update_rejects_unknown_columns_and_bad_values() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();

    assert!(matches!(
        database.update_transaction(0, TRANSACTION_ID_COLUMN, "7"),
        Err(TableError::InvalidColumn(column)) if column == TRANSACTION_ID_COLUMN
    ));
    assert!(matches!(
        database.update_transaction(0, DATE_COLUMN, "30/02/2024"),
        Err(TableError::Format { .. })
    ));
    assert_eq!(
        database.cash_flow().table().row(0).unwrap(),
        &transaction_row(0, "rent", "01/08/2024", "-500")
    );
}

#[test]
fn update_of_row_outside_loaded_month_reaches_store_only() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "july rent", "01/07/2024", "-500"))
        .unwrap();
    database.load(august()).unwrap();

    assert_eq!(
        database.update_transaction(0, AMOUNT_COLUMN, "-400").unwrap(),
        CacheSync::StoreOnly
    );

    database
        .load(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
        .unwrap();
    let row = database.cash_flow().table().row(0).unwrap();
    assert_eq!(row.value(AMOUNT_COLUMN).unwrap(), "-400");
}

#[test]
fn delete_of_row_outside_loaded_month_reaches_store_only() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "july rent", "01/07/2024", "-500"))
        .unwrap();
    database.load(august()).unwrap();

    assert_eq!(database.delete_transaction(0).unwrap(), CacheSync::StoreOnly);
    assert_eq!(stored_count(&database), 0);
}

#[test]
fn store_failure_leaves_cache_unchanged() {
    let mut store = SqliteStore::new();
    store.connect_in_memory().unwrap();
    let mut cash_flow = CashFlow::new().unwrap();
    cash_flow
        .add_row(&store, transaction_row(0, "rent", "01/08/2024", "-500"))
        .unwrap();
    let before = cash_flow.table().clone();

    let failing = FailingStore;
    assert!(matches!(
        cash_flow.add_row(&failing, transaction_row(1, "t", "02/08/2024", "-1")),
        Err(TableError::Store(StoreError::NotConnected))
    ));
    assert!(cash_flow.delete_from(&failing, 0).is_err());
    assert!(cash_flow
        .update_row(&failing, 0, AMOUNT_COLUMN, "-1")
        .is_err());

    assert_eq!(cash_flow.table(), &before);
}

#[test]
fn failing_store_degrades_reads() {
    let mut cash_flow = CashFlow::new().unwrap();

    assert_eq!(cash_flow.available_transaction_id(&FailingStore), 0);
    assert_eq!(cash_flow.load_from_source(&FailingStore, august()).unwrap(), 0);
    assert!(cash_flow.table().is_empty());
}

#[test]
fn balance_series_starts_from_default_allowance_without_budget() {
    let mut database = loaded_database();
    database
        .add_transaction(transaction_row(0, "rent", "01/08/2024", "-150"))
        .unwrap();
    database
        .add_transaction(transaction_row(1, "refund", "03/08/2024", "25.5"))
        .unwrap();

    let month = MonthCode::parse("082024").unwrap();
    let balances: Vec<f64> = database
        .balance_series(month, 200.0)
        .unwrap()
        .into_iter()
        .map(|point| point.balance)
        .collect();

    assert_eq!(balances, vec![200.0, 50.0, 75.5]);
}
