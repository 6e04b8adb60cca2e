mod common;

use anyhow::Result;
use common::{StandardAccounts, balance_of, cents, test_bank};
use tellerbook::application::AppError;
use tellerbook::domain::TransactionKind;

#[tokio::test]
async fn test_transfer_walkthrough() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create(&bank).await?;

    let receipt = bank
        .ledger
        .transfer(&accounts.alice, "bob12", cents("50.00"))
        .await?;

    assert_eq!(receipt.sender.balance, -5000);
    assert_eq!(receipt.recipient_username, "bob12");
    assert_eq!(balance_of(&bank, &accounts.alice).await?, -5000);
    assert_eq!(balance_of(&bank, &accounts.bob).await?, 5000);

    let report = bank.ledger.check_integrity().await?;
    assert_eq!(report.transaction_count, 2);

    Ok(())
}

#[tokio::test]
async fn test_transfer_writes_one_record_per_side() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("200")).await?;

    let receipt = bank
        .ledger
        .transfer(&accounts.alice, "bob12", cents("75.25"))
        .await?;

    assert_eq!(receipt.debit.kind, TransactionKind::Transfer);
    assert_eq!(receipt.debit.account_id, accounts.alice.id);
    assert_eq!(receipt.debit.amount_cents, -7525);
    assert_eq!(receipt.credit.kind, TransactionKind::Transfer);
    assert_eq!(receipt.credit.account_id, accounts.bob.id);
    assert_eq!(receipt.credit.amount_cents, 7525);
    assert!(receipt.debit.sequence < receipt.credit.sequence);

    let alice_history = bank.ledger.history(&accounts.alice).await?;
    assert_eq!(alice_history.len(), 2);
    assert_eq!(alice_history.last(), Some(&receipt.debit));

    let bob_history = bank.ledger.history(&accounts.bob).await?;
    assert_eq!(bob_history, vec![receipt.credit.clone()]);

    Ok(())
}

#[tokio::test]
async fn test_transfer_moves_exact_amount() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("1000")).await?;
    let carol = bank.auth.register("carol9", "pw").await?;

    for amount in [1, 99, 12345] {
        let alice_before = balance_of(&bank, &accounts.alice).await?;
        let carol_before = balance_of(&bank, &carol).await?;

        bank.ledger.transfer(&accounts.alice, "carol9", amount).await?;

        assert_eq!(balance_of(&bank, &accounts.alice).await?, alice_before - amount);
        assert_eq!(balance_of(&bank, &carol).await?, carol_before + amount);
    }

    // Bob was never involved
    assert_eq!(balance_of(&bank, &accounts.bob).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_transfer_to_unknown_recipient_changes_nothing() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("100")).await?;

    let result = bank
        .ledger
        .transfer(&accounts.alice, "nobody", cents("10"))
        .await;

    assert!(matches!(result, Err(AppError::RecipientNotFound(name)) if name == "nobody"));
    assert_eq!(balance_of(&bank, &accounts.alice).await?, cents("100"));
    assert_eq!(bank.ledger.history(&accounts.alice).await?.len(), 1);
    assert_eq!(bank.ledger.check_integrity().await?.transaction_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_transfer_rolls_back_when_a_later_step_fails() -> Result<()> {
    let (bank, store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("100")).await?;

    // Make the last of the four writes (the recipient's record) fail
    sqlx::query(
        r#"
        CREATE TRIGGER reject_transfer_credit
        BEFORE INSERT ON transactions
        WHEN NEW.transaction_type = 'Transfer' AND NEW.transaction_amount > 0
        BEGIN
            SELECT RAISE(ABORT, 'credit log unavailable');
        END
        "#,
    )
    .execute(store.pool())
    .await?;

    let result = bank
        .ledger
        .transfer(&accounts.alice, "bob12", cents("40"))
        .await;
    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

    assert_eq!(balance_of(&bank, &accounts.alice).await?, cents("100"));
    assert_eq!(balance_of(&bank, &accounts.bob).await?, 0);
    assert_eq!(bank.ledger.history(&accounts.alice).await?.len(), 1);
    assert!(bank.ledger.history(&accounts.bob).await?.is_empty());
    assert!(bank.ledger.check_integrity().await?.is_healthy());

    // Once the fault is gone the same transfer goes through
    sqlx::query("DROP TRIGGER reject_transfer_credit")
        .execute(store.pool())
        .await?;
    bank.ledger
        .transfer(&accounts.alice, "bob12", cents("40"))
        .await?;
    assert_eq!(balance_of(&bank, &accounts.bob).await?, cents("40"));

    Ok(())
}

#[tokio::test]
async fn test_transfer_rejects_self_and_invalid_amounts() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("100")).await?;

    assert!(matches!(
        bank.ledger.transfer(&accounts.alice, "alice1", cents("10")).await,
        Err(AppError::SelfTransfer)
    ));
    assert!(matches!(
        bank.ledger.transfer(&accounts.alice, "bob12", 0).await,
        Err(AppError::InvalidAmount(_))
    ));
    assert!(matches!(
        bank.ledger.transfer(&accounts.alice, "bob12", -500).await,
        Err(AppError::InvalidAmount(_))
    ));

    assert_eq!(balance_of(&bank, &accounts.alice).await?, cents("100"));
    assert_eq!(balance_of(&bank, &accounts.bob).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_transfer_permits_overdraft() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create_funded(&bank, cents("10")).await?;

    let receipt = bank
        .ledger
        .transfer(&accounts.alice, "bob12", cents("25"))
        .await?;

    assert_eq!(receipt.sender.balance, -cents("15"));
    assert_eq!(balance_of(&bank, &accounts.bob).await?, cents("25"));

    Ok(())
}

#[tokio::test]
async fn test_history_counts_both_sides_of_transfers() -> Result<()> {
    let (bank, _store, _temp) = test_bank().await?;
    let accounts = StandardAccounts::create(&bank).await?;

    bank.ledger.deposit(&accounts.alice, 1000).await?;
    bank.ledger.transfer(&accounts.alice, "bob12", 300).await?;
    bank.ledger.transfer(&accounts.bob, "alice1", 100).await?;
    bank.ledger.withdraw(&accounts.bob, 50).await?;

    let alice_kinds: Vec<TransactionKind> = bank
        .ledger
        .history(&accounts.alice)
        .await?
        .iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(
        alice_kinds,
        vec![
            TransactionKind::Deposit,
            TransactionKind::Transfer,
            TransactionKind::Transfer
        ]
    );

    let bob_amounts: Vec<i64> = bank
        .ledger
        .history(&accounts.bob)
        .await?
        .iter()
        .map(|r| r.amount_cents)
        .collect();
    assert_eq!(bob_amounts, vec![300, -100, -50]);

    assert_eq!(balance_of(&bank, &accounts.alice).await?, 800);
    assert_eq!(balance_of(&bank, &accounts.bob).await?, 150);

    Ok(())
}
