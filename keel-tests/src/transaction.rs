use keel::{Connection, QueryOptions, Record, Transaction, is_not_found};
use std::sync::LazyLock;
use tokio::sync::Mutex;

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Account {
    #[sql("primary_key,where")]
    id: i64,
    #[sql("size=32,not_null")]
    owner: String,
    balance: i64,
}

pub async fn transaction<C: Connection>(connection: &mut C) {
    static MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
    let _lock = MUTEX.lock().await;

    // Setup
    Account::drop_table(connection, true)
        .await
        .expect("Failed to drop the account table");
    Account::create_table(connection, true)
        .await
        .expect("Failed to create the account table");
    let mut first = Account {
        id: 1,
        owner: "ann".into(),
        balance: 100,
    };
    first
        .insert(connection, QueryOptions::new())
        .await
        .expect("Failed to insert the first account");

    // Rollback discards the changes
    let mut transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    let mut second = Account {
        id: 2,
        owner: "bob".into(),
        balance: 50,
    };
    second
        .insert(&mut transaction, QueryOptions::new())
        .await
        .expect("Failed to insert the second account in the transaction");
    let seen = Account::get(&mut transaction, QueryOptions::new().selector("id=2"))
        .await
        .expect("The transaction must see its own insert");
    assert_eq!(seen, second);
    transaction
        .rollback()
        .await
        .expect("Failed to rollback the transaction");
    let error = Account::get(connection, QueryOptions::new().selector("id=2"))
        .await
        .expect_err("The rolled back insert must not be visible");
    assert!(is_not_found(&error));

    // Commit persists them
    let mut transaction = connection
        .begin()
        .await
        .expect("Could not begin a transaction");
    first.balance -= 30;
    first
        .update(&mut transaction, QueryOptions::new())
        .await
        .expect("Failed to update the first account in the transaction");
    second.balance += 30;
    second
        .insert(&mut transaction, QueryOptions::new())
        .await
        .expect("Failed to insert the second account in the transaction");
    transaction
        .commit()
        .await
        .expect("Failed to commit the transaction");
    let accounts = Account::list(connection, QueryOptions::new())
        .await
        .expect("Failed to list the accounts");
    let mut balances = accounts
        .iter()
        .map(|v| (v.id, v.balance))
        .collect::<Vec<_>>();
    balances.sort();
    assert_eq!(balances, [(1, 70), (2, 80)]);
}
