use std::time::{SystemTime, UNIX_EPOCH};
use tradefill_domain::repositories::trade_store::TradeStore;
use tradefill_domain::value_objects::interval::Interval;
use tradefill_domain::value_objects::trade::{Side, TradeRecord};
use tradefill_infrastructure::persistence::postgres_trades::PostgresTradeStore;

fn should_run_db_tests() -> bool {
    std::env::var("TRADEFILL_DB_RUN_TESTS").ok().as_deref() == Some("1")
}

fn db_url() -> Option<String> {
    std::env::var("TRADEFILL_DB_URL").ok()
}

fn unique_table() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("trades_test_{}_{}", std::process::id(), now)
}

fn trade(id: i64, timestamp: i64) -> TradeRecord {
    TradeRecord {
        id,
        timestamp,
        price: 10.0 + id as f64,
        amount: 0.25,
        side: if id % 2 == 0 { Side::Buy } else { Side::Sell },
    }
}

#[test]
fn postgres_store_round_trip() {
    if !should_run_db_tests() {
        eprintln!("skipping: set TRADEFILL_DB_RUN_TESTS=1 to run Postgres tests");
        return;
    }
    let Some(url) = db_url() else {
        eprintln!("skipping: TRADEFILL_DB_URL is not set");
        return;
    };

    let store = PostgresTradeStore::new(&url, unique_table(), 2).expect("store");
    store.migrate(None).expect("migrate");

    assert_eq!(store.coverage("ETHBTC").unwrap(), None);

    let batch: Vec<TradeRecord> = (1..=5).map(|id| trade(id, 100 + id / 2)).collect();
    assert_eq!(store.insert_if_absent("ETHBTC", &batch).unwrap(), 5);
    assert_eq!(store.insert_if_absent("ETHBTC", &batch[3..]).unwrap(), 0);
    assert_eq!(store.insert_if_absent("BNBBTC", &batch[..1]).unwrap(), 1);

    let coverage = store.coverage("ETHBTC").unwrap().expect("coverage");
    assert_eq!((coverage.oldest_id, coverage.newest_id), (1, 5));
    assert_eq!((coverage.oldest_ts, coverage.newest_ts), (100, 102));
    assert_eq!(store.count("ETHBTC").unwrap(), 5);
    assert_eq!(
        store.list_symbols().unwrap(),
        vec!["BNBBTC".to_string(), "ETHBTC".to_string()]
    );

    let loaded = store
        .load_range("ETHBTC", &Interval::new(101, 102))
        .unwrap();
    assert_eq!(loaded, batch[1..3].to_vec());

    store.drop_symbol("ETHBTC").unwrap();
    assert_eq!(store.coverage("ETHBTC").unwrap(), None);
    assert_eq!(store.count("BNBBTC").unwrap(), 1);
}
