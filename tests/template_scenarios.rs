use std::sync::Arc;
use std::thread;

use chrono::{NaiveDate, TimeZone, Utc};

use spanner_data::client::{InMemoryClient, Key, KeySet, Op, ReadOptions, ResultSet, Row};
use spanner_data::convert::StructObjectMapper;
use spanner_data::core::{DataError, MutationFactory, SpannerTemplate};
use spanner_data::mapping::{
    Entity, EntityBuilder, FnStrategy, MappingContext, MappingError, Value,
};

#[derive(Debug, Default, Clone, PartialEq)]
struct Trade {
    id: String,
    symbol: String,
    action: String,
    trader_id: String,
    price: f64,
}

impl Entity for Trade {
    fn describe(entity: &mut EntityBuilder<Self>) {
        entity
            .table("Trade")
            .id("id", |t| &t.id, |t| &mut t.id)
            .property("symbol", |t| &t.symbol, |t| &mut t.symbol)
            .property("action", |t| &t.action, |t| &mut t.action)
            .property("traderId", |t| &t.trader_id, |t| &mut t.trader_id)
            .property("price", |t| &t.price, |t| &mut t.price);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Settlement {
    id: i64,
    settled: bool,
    value_date: NaiveDate,
    booked_at: chrono::DateTime<Utc>,
    note: Option<String>,
}

impl Entity for Settlement {
    fn describe(entity: &mut EntityBuilder<Self>) {
        entity
            .id("id", |s| &s.id, |s| &mut s.id)
            .property("settled", |s| &s.settled, |s| &mut s.settled)
            .property("valueDate", |s| &s.value_date, |s| &mut s.value_date)
            .property("bookedAt", |s| &s.booked_at, |s| &mut s.booked_at)
            .property("note", |s| &s.note, |s| &mut s.note);
    }
}

#[derive(Debug, Default)]
struct Ledger {
    id: String,
    owner: String,
}

impl Entity for Ledger {
    fn describe(entity: &mut EntityBuilder<Self>) {
        entity
            .id("id", |l| &l.id, |l| &mut l.id)
            .property("owner", |l| &l.owner, |l| &mut l.owner)
            .column("");
    }
}

fn trade(id: &str, symbol: &str, price: f64) -> Trade {
    Trade {
        id: id.to_string(),
        symbol: symbol.to_string(),
        action: "BUY".to_string(),
        trader_id: "tr1".to_string(),
        price,
    }
}

fn setup() -> (InMemoryClient, SpannerTemplate) {
    let client = InMemoryClient::new().with_table("Trade", &["id"]);
    let template = SpannerTemplate::new(Arc::new(client.clone()), Arc::new(MappingContext::new()));
    (client, template)
}

#[test]
fn test_insert_binds_all_columns_and_reads_back() {
    let context = Arc::new(MappingContext::new());
    let factory = MutationFactory::new(context);
    let t1 = trade("t1", "ABCD", 100.0);

    let mutation = factory.insert(&t1).unwrap();
    assert_eq!(mutation.op(), Op::Insert);
    assert_eq!(mutation.table(), "Trade");
    assert_eq!(
        mutation.columns(),
        vec!["id", "symbol", "action", "traderId", "price"]
    );
    assert_eq!(mutation.value("price"), Some(&Value::Float64(100.0)));

    let (_, template) = setup();
    template.insert(&t1).unwrap();
    assert_eq!(template.find_by_key::<Trade>(&Key::of("t1")).unwrap(), t1);
}

#[test]
fn test_missing_key_is_not_found() {
    let (_, template) = setup();
    let err = template.find_by_key::<Trade>(&Key::of("nope")).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, DataError::NotFound { ref table, .. } if table == "Trade"));
}

#[test]
fn test_partial_update_binds_id_and_named_properties() {
    let factory = MutationFactory::new(Arc::new(MappingContext::new()));
    let t1 = trade("t1", "ABCD", 100.0);

    let only_id = factory.update(&t1, &[]).unwrap();
    assert_eq!(only_id.op(), Op::Update);
    assert_eq!(only_id.columns(), vec!["id"]);

    let with_symbol = factory.update(&t1, &["symbol"]).unwrap();
    assert_eq!(with_symbol.columns(), vec!["id", "symbol"]);

    let (client, template) = setup();
    template.insert(&t1).unwrap();
    let mut changed = t1.clone();
    changed.symbol = "WXYZ".to_string();
    changed.price = 1.0;
    template.update(&changed, &["symbol"]).unwrap();

    let stored = template.find_by_key::<Trade>(&Key::of("t1")).unwrap();
    assert_eq!(stored.symbol, "WXYZ");
    assert_eq!(stored.price, 100.0);
    assert_eq!(client.applied_mutations().len(), 2);
}

#[test]
fn test_delete_of_empty_list_is_empty_key_set() {
    let factory = MutationFactory::new(Arc::new(MappingContext::new()));
    let mutation = factory.delete_entities::<Trade, _>(Vec::<&Trade>::new()).unwrap();
    assert_eq!(mutation.op(), Op::Delete);
    assert!(mutation.key_set().map_or(false, KeySet::is_empty));

    let (client, template) = setup();
    template.insert(&trade("t1", "ABCD", 1.0)).unwrap();
    template.delete_entities::<Trade, _>(&Vec::new()).unwrap();
    assert_eq!(client.rows("Trade").len(), 1);
}

#[test]
fn test_constant_naming_strategy_is_accepted() {
    let strategy = FnStrategy(|_: &str| -> Option<String> { Some("anyField".to_string()) });
    let context = MappingContext::with_naming_strategy(Arc::new(strategy));

    let entity = context.entity::<Trade>().unwrap();
    for property in entity.properties() {
        assert_eq!(property.column_name().unwrap(), "anyField");
    }
    assert_eq!(entity.columns().unwrap().len(), 5);
}

#[test]
fn test_empty_column_override_fails_on_request() {
    let context = MappingContext::new();
    let entity = context.entity::<Ledger>().unwrap();

    assert_eq!(entity.property("id").unwrap().column_name().unwrap(), "id");
    let err = entity.property("owner").unwrap().column_name().unwrap_err();
    assert!(matches!(err, MappingError::UnresolvedColumnName { .. }));
    assert!(entity.columns().is_err());
}

#[test]
fn test_count_reads_single_value() {
    let (client, template) = setup();
    client.stub_query(
        "select count(*) from Trade",
        ResultSet::from_rows(vec![Row::new().with("count", 5_i64)]),
    );
    assert_eq!(template.count::<Trade>().unwrap(), 5);
}

#[test]
fn test_count_against_table() {
    let (_, template) = setup();
    for i in 0..3 {
        template.insert(&trade(&format!("t{}", i), "ABCD", 1.0)).unwrap();
    }
    assert_eq!(template.count::<Trade>().unwrap(), 3);
}

#[test]
fn test_resolution_is_idempotent_under_concurrency() {
    let context = Arc::new(MappingContext::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = Arc::clone(&context);
            thread::spawn(move || {
                let entity = context.entity::<Trade>().unwrap();
                (
                    entity.table_name().to_string(),
                    entity
                        .columns()
                        .unwrap()
                        .into_iter()
                        .map(str::to_string)
                        .collect::<Vec<_>>(),
                )
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(context.cached_entities(), 1);
}

#[test]
fn test_bindings_round_trip_every_supported_type() {
    let mapper = StructObjectMapper::new(Arc::new(MappingContext::new()));
    let settlement = Settlement {
        id: 42,
        settled: true,
        value_date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        booked_at: Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap(),
        note: Some("net".to_string()),
    };

    let bindings = mapper.bindings(&settlement, |_| true).unwrap();
    let row = Row::from_pairs(bindings);
    let restored: Settlement = mapper.read(&row).unwrap();
    assert_eq!(restored, settlement);
}

#[test]
fn test_transaction_commits_and_aborts() {
    let (client, template) = setup();

    let symbol = template
        .transaction(|tx| {
            tx.insert(&trade("t1", "ABCD", 1.0))?;
            tx.insert(&trade("t2", "EFGH", 2.0))?;
            Ok("done")
        })
        .unwrap();
    assert_eq!(symbol, "done");
    assert_eq!(client.rows("Trade").len(), 2);
    assert_eq!(client.commit_count(), 1);

    let err = template
        .transaction(|tx| -> Result<(), DataError> {
            tx.delete_by_key::<Trade>(Key::of("t1"))?;
            let missing = tx.find_by_key::<Trade>(&Key::of("zzz"))?;
            tx.upsert(&missing)
        })
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(client.abort_count(), 1);
    assert_eq!(client.rows("Trade").len(), 2);
}

#[test]
fn test_transaction_reads_snapshot() {
    let (_, template) = setup();
    template.insert(&trade("t1", "ABCD", 1.0)).unwrap();

    let seen = template
        .transaction(|tx| {
            tx.upsert(&trade("t2", "EFGH", 2.0))?;
            tx.find_all::<Trade>(&ReadOptions::default())
        })
        .unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(template.find_all::<Trade>(&ReadOptions::default()).unwrap().len(), 2);
}
