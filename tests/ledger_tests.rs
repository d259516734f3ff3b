// Ledger processing tests: legacy and state chains, result codes, queries
mod util;

use lattice_ledger::{Account, Block, BlockHash, Epoch, LedgerConfig, Link, ProcessResult, Root};
use util::{key, send, state, TestLedger, SUPPLY};

#[test]
fn test_genesis_state() {
    let t = TestLedger::new();
    let txn = t.ledger.store().tx_begin_read().unwrap();
    let account = t.genesis_account();

    assert_eq!(t.ledger.genesis_hash(&txn).unwrap(), t.genesis_hash());
    assert_eq!(t.ledger.supply(&txn).unwrap(), SUPPLY);
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 1);
    assert_eq!(t.ledger.account_balance(&txn, &account).unwrap(), SUPPLY);
    assert_eq!(t.ledger.weight(&txn, &account).unwrap(), SUPPLY);
    assert_eq!(t.ledger.latest(&txn, &account).unwrap(), t.genesis_hash());
    assert_eq!(t.ledger.latest_root(&txn, &account).unwrap(), Root::from(t.genesis_hash()));
    assert_eq!(t.ledger.representative(&txn, &t.genesis_hash()).unwrap(), t.genesis_hash());

    let info = t.ledger.account_info(&txn, &account).unwrap().unwrap();
    assert_eq!(info.open_block, t.genesis_hash());
    assert_eq!(info.block_count, 1);
    assert_eq!(info.epoch, Epoch::LEGACY);
}

#[test]
fn test_initialize_is_idempotent() {
    let t = TestLedger::new();
    let txn = t.ledger.store().tx_begin_write().unwrap();
    t.ledger.initialize(&txn, &t.genesis).unwrap();
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 1);

    let other = lattice_ledger::Genesis::new(&key(9), 10);
    assert!(t.ledger.initialize(&txn, &other).is_err());
}

#[test]
fn test_send_open_receive_change() {
    let t = TestLedger::new();
    let genesis = t.genesis_account();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let send1 = send(t.genesis_hash(), key1.account(), SUPPLY - 100, &t.genesis_key);
    let result = t.ledger.process(&txn, &send1).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.account, genesis);
    assert_eq!(result.amount, 100);
    assert_eq!(result.pending_account, key1.account());
    assert_eq!(t.ledger.account_pending(&txn, &key1.account()).unwrap(), 100);
    assert_eq!(t.ledger.weight(&txn, &genesis).unwrap(), SUPPLY - 100);
    assert!(t.ledger.is_send(&txn, &send1).unwrap());
    assert_eq!(t.ledger.block_destination(&txn, &send1).unwrap(), key1.account());

    let open = Block::open(send1.hash(), key1.account(), &key1, 0);
    let result = t.ledger.process(&txn, &open).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.account, key1.account());
    assert_eq!(result.amount, 100);
    assert_eq!(t.ledger.account_pending(&txn, &key1.account()).unwrap(), 0);
    assert_eq!(t.ledger.account_balance(&txn, &key1.account()).unwrap(), 100);
    assert_eq!(t.ledger.weight(&txn, &key1.account()).unwrap(), 100);
    assert_eq!(t.ledger.amount(&txn, &open.hash()).unwrap(), 100);
    assert_eq!(t.ledger.block_source(&txn, &open).unwrap(), send1.hash());

    let send2 = send(send1.hash(), key1.account(), SUPPLY - 150, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send2).unwrap().code, ProcessResult::Progress);
    let receive = Block::receive(open.hash(), send2.hash(), &key1, 0);
    let result = t.ledger.process(&txn, &receive).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 50);
    assert_eq!(t.ledger.balance(&txn, &receive.hash()).unwrap(), 150);
    assert_eq!(t.ledger.representative(&txn, &receive.hash()).unwrap(), open.hash());

    let change = Block::change(receive.hash(), genesis, &key1, 0);
    let result = t.ledger.process(&txn, &change).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 0);
    assert_eq!(t.ledger.weight(&txn, &key1.account()).unwrap(), 0);
    assert_eq!(t.ledger.weight(&txn, &genesis).unwrap(), SUPPLY);

    let info = t.ledger.account_info(&txn, &key1.account()).unwrap().unwrap();
    assert_eq!(info.head, change.hash());
    assert_eq!(info.rep_block, change.hash());
    assert_eq!(info.block_count, 3);
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 5);
    assert_eq!(
        t.ledger.successor(&txn, &Root::from(receive.hash())).unwrap(),
        Some(change.clone())
    );
    assert_eq!(t.ledger.successor(&txn, &Root::from(key1.account())).unwrap(), Some(open));
    assert_eq!(t.ledger.account(&txn, &change.hash()).unwrap(), Some(key1.account()));
}

#[test]
fn test_legacy_result_codes() {
    let t = TestLedger::new();
    let key1 = key(1);
    let key2 = key(2);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let send1 = send(t.genesis_hash(), key1.account(), SUPPLY - 100, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Old);

    // Unknown previous
    let orphan = send(BlockHash::from(1u64), key1.account(), 0, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &orphan).unwrap().code, ProcessResult::GapPrevious);

    // Signed by the wrong key
    let forged = send(send1.hash(), key1.account(), 0, &key2);
    assert_eq!(t.ledger.process(&txn, &forged).unwrap().code, ProcessResult::BadSignature);

    // Balance above the current one
    let overspend = send(send1.hash(), key1.account(), SUPPLY - 99, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &overspend).unwrap().code, ProcessResult::NegativeSpend);

    // Second block on the genesis open
    let fork = send(t.genesis_hash(), key2.account(), SUPPLY - 1, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &fork).unwrap().code, ProcessResult::Fork);

    // Unknown source
    let open_gap = Block::open(BlockHash::from(5u64), key1.account(), &key1, 0);
    assert_eq!(t.ledger.process(&txn, &open_gap).unwrap().code, ProcessResult::GapSource);

    // Send addressed to someone else
    let open_wrong = Block::open(send1.hash(), key2.account(), &key2, 0);
    assert_eq!(t.ledger.process(&txn, &open_wrong).unwrap().code, ProcessResult::Unreceivable);

    let open = Block::open(send1.hash(), key1.account(), &key1, 0);
    assert_eq!(t.ledger.process(&txn, &open).unwrap().code, ProcessResult::Progress);

    // Already received
    let receive_twice = Block::receive(open.hash(), send1.hash(), &key1, 0);
    assert_eq!(t.ledger.process(&txn, &receive_twice).unwrap().code, ProcessResult::Unreceivable);

    // Second open of the same account
    let send2 = send(send1.hash(), key1.account(), SUPPLY - 200, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send2).unwrap().code, ProcessResult::Progress);
    let open_again = Block::open(send2.hash(), t.genesis_account(), &key1, 0);
    assert_eq!(t.ledger.process(&txn, &open_again).unwrap().code, ProcessResult::Fork);

    // Rejections leave the store untouched
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 4);
    assert_eq!(t.ledger.account_pending(&txn, &key1.account()).unwrap(), 100);
}

#[test]
fn test_send_full_balance_and_zero_amount() {
    let t = TestLedger::new();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let same = send(t.genesis_hash(), key1.account(), SUPPLY, &t.genesis_key);
    let result = t.ledger.process(&txn, &same).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 0);

    let all = send(same.hash(), key1.account(), 0, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &all).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.account_balance(&txn, &t.genesis_account()).unwrap(), 0);
    assert_eq!(t.ledger.weight(&txn, &t.genesis_account()).unwrap(), 0);
}

#[test]
fn test_state_send_receive_open() {
    let t = TestLedger::new();
    let genesis = t.genesis_account();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let send1 = state(&t.genesis_key, t.genesis_hash(), genesis, SUPPLY - 1_000, key1.account());
    let result = t.ledger.process(&txn, &send1).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 1_000);
    assert_eq!(result.pending_account, key1.account());
    assert!(t.ledger.is_send(&txn, &send1).unwrap());
    assert_eq!(t.ledger.block_destination(&txn, &send1).unwrap(), key1.account());

    // Legacy blocks cannot follow a state block
    let legacy = send(send1.hash(), key1.account(), 0, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &legacy).unwrap().code, ProcessResult::BlockPosition);
    let change = Block::change(send1.hash(), key1.account(), &t.genesis_key, 0);
    assert_eq!(t.ledger.process(&txn, &change).unwrap().code, ProcessResult::BlockPosition);

    // Opening with the wrong amount
    let open_bad = state(&key1, BlockHash::zero(), key1.account(), 999, send1.hash());
    assert_eq!(t.ledger.process(&txn, &open_bad).unwrap().code, ProcessResult::BalanceMismatch);

    let open = state(&key1, BlockHash::zero(), key1.account(), 1_000, send1.hash());
    let result = t.ledger.process(&txn, &open).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 1_000);
    assert_eq!(t.ledger.weight(&txn, &key1.account()).unwrap(), 1_000);
    assert!(!t.ledger.is_send(&txn, &open).unwrap());
    assert_eq!(t.ledger.block_source(&txn, &open).unwrap(), send1.hash());

    // State send back, then a state receive by genesis
    let back = state(&key1, open.hash(), key1.account(), 400, genesis);
    assert_eq!(t.ledger.process(&txn, &back).unwrap().code, ProcessResult::Progress);
    let receive = state(&t.genesis_key, send1.hash(), genesis, SUPPLY - 400, back.hash());
    let result = t.ledger.process(&txn, &receive).unwrap();
    assert_eq!(result.code, ProcessResult::Progress);
    assert_eq!(result.amount, 600);
    assert_eq!(t.ledger.amount(&txn, &receive.hash()).unwrap(), 600);

    // Representative change with no link; any balance change is a mismatch
    let rep_change = state(&key1, back.hash(), genesis, 400, Link::zero());
    assert_eq!(t.ledger.process(&txn, &rep_change).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.weight(&txn, &key1.account()).unwrap(), 0);
    assert_eq!(t.ledger.weight(&txn, &genesis).unwrap(), SUPPLY);
    let sneaky = state(&key1, rep_change.hash(), genesis, 500, Link::zero());
    assert_eq!(t.ledger.process(&txn, &sneaky).unwrap().code, ProcessResult::BalanceMismatch);
}

#[test]
fn test_state_result_codes() {
    let t = TestLedger::new();
    let genesis = t.genesis_account();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    // Open without a link
    let open_no_link = state(&key1, BlockHash::zero(), key1.account(), 0, Link::zero());
    assert_eq!(t.ledger.process(&txn, &open_no_link).unwrap().code, ProcessResult::GapSource);

    // First block of an account must not name a previous
    let no_account = state(&key1, BlockHash::from(3u64), key1.account(), 0, Link::from(4u64));
    assert_eq!(t.ledger.process(&txn, &no_account).unwrap().code, ProcessResult::GapPrevious);

    // Existing account with zero previous
    let reopen = state(&t.genesis_key, BlockHash::zero(), genesis, SUPPLY, Link::from(4u64));
    assert_eq!(t.ledger.process(&txn, &reopen).unwrap().code, ProcessResult::Fork);

    // Existing account with an unknown previous
    let gap = state(&t.genesis_key, BlockHash::from(3u64), genesis, SUPPLY - 1, key1.account());
    assert_eq!(t.ledger.process(&txn, &gap).unwrap().code, ProcessResult::GapPrevious);

    let send1 = state(&t.genesis_key, t.genesis_hash(), genesis, SUPPLY - 10, key1.account());
    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Progress);

    // Previous known but not the head
    let stale = state(&t.genesis_key, t.genesis_hash(), genesis, SUPPLY - 20, key1.account());
    assert_eq!(t.ledger.process(&txn, &stale).unwrap().code, ProcessResult::Fork);

    // Signed by someone else
    let forged = state(&key1, send1.hash(), genesis, SUPPLY - 20, key1.account());
    let forged = match forged {
        Block::State(mut b) => {
            b.account = genesis;
            Block::State(b)
        }
        _ => unreachable!(),
    };
    assert_eq!(t.ledger.process(&txn, &forged).unwrap().code, ProcessResult::BadSignature);

    // Receive from an unknown source
    let open_gap = state(&key1, BlockHash::zero(), key1.account(), 10, Link::from(77u64));
    assert_eq!(t.ledger.process(&txn, &open_gap).unwrap().code, ProcessResult::GapSource);

    // Source known but not receivable by this account
    let key2 = key(2);
    let open_other = state(&key2, BlockHash::zero(), key2.account(), 10, send1.hash());
    assert_eq!(t.ledger.process(&txn, &open_other).unwrap().code, ProcessResult::Unreceivable);
}

#[test]
fn test_could_fit() {
    let t = TestLedger::new();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let send1 = send(t.genesis_hash(), key1.account(), SUPPLY - 1, &t.genesis_key);
    let open = Block::open(send1.hash(), key1.account(), &key1, 0);
    assert!(t.ledger.could_fit(&txn, &send1).unwrap());
    assert!(!t.ledger.could_fit(&txn, &open).unwrap());

    // Signatures are not checked
    let unsigned = send(t.genesis_hash(), key1.account(), SUPPLY - 1, &key1);
    assert!(t.ledger.could_fit(&txn, &unsigned).unwrap());

    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Progress);
    assert!(t.ledger.could_fit(&txn, &open).unwrap());
    assert!(!t.ledger.could_fit(&txn, &send1).unwrap());
    // Nothing was written by could_fit
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 2);
}

#[test]
fn test_forked_block() {
    let t = TestLedger::new();
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    let send1 = send(t.genesis_hash(), key1.account(), SUPPLY - 1, &t.genesis_key);
    let send2 = send(t.genesis_hash(), key1.account(), SUPPLY - 2, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.process(&txn, &send2).unwrap().code, ProcessResult::Fork);
    assert_eq!(t.ledger.forked_block(&txn, &send2).unwrap(), Some(send1.clone()));
    assert_eq!(t.ledger.forked_block(&txn, &send1).unwrap(), None);

    let open1 = Block::open(send1.hash(), key1.account(), &key1, 0);
    let open2 = Block::open(send1.hash(), t.genesis_account(), &key1, 0);
    assert_eq!(t.ledger.process(&txn, &open1).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.process(&txn, &open2).unwrap().code, ProcessResult::Fork);
    assert_eq!(t.ledger.forked_block(&txn, &open2).unwrap(), Some(open1));
}

#[test]
fn test_bootstrap_weights() {
    let rep = key(5).account();
    let mut config = LedgerConfig {
        bootstrap_weight_max_blocks: 3,
        ..Default::default()
    };
    config.bootstrap_weights.insert(rep, 1_000);
    let t = TestLedger::with_config(config);
    let key1 = key(1);
    let txn = t.ledger.store().tx_begin_write().unwrap();

    assert_eq!(t.ledger.weight(&txn, &rep).unwrap(), 1_000);
    let send1 = send(t.genesis_hash(), key1.account(), SUPPLY - 1, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send1).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.weight(&txn, &rep).unwrap(), 1_000);

    let send2 = send(send1.hash(), key1.account(), SUPPLY - 2, &t.genesis_key);
    assert_eq!(t.ledger.process(&txn, &send2).unwrap().code, ProcessResult::Progress);
    assert_eq!(t.ledger.weight(&txn, &rep).unwrap(), 0);

    // The override stays off once the threshold has been reached
    t.ledger.rollback(&txn, &send2.hash()).unwrap();
    assert_eq!(t.ledger.block_count(&txn).unwrap(), 2);
    assert_eq!(t.ledger.weight(&txn, &rep).unwrap(), 0);
}

#[test]
fn test_unknown_account_queries() {
    let t = TestLedger::new();
    let txn = t.ledger.store().tx_begin_read().unwrap();
    let stranger = Account::from(42u64);
    assert_eq!(t.ledger.account_balance(&txn, &stranger).unwrap(), 0);
    assert_eq!(t.ledger.account_pending(&txn, &stranger).unwrap(), 0);
    assert_eq!(t.ledger.weight(&txn, &stranger).unwrap(), 0);
    assert!(t.ledger.latest(&txn, &stranger).unwrap().is_zero());
    assert_eq!(t.ledger.latest_root(&txn, &stranger).unwrap(), Root::from(stranger));
    assert_eq!(t.ledger.successor(&txn, &Root::from(stranger)).unwrap(), None);
    assert_eq!(t.ledger.account(&txn, &BlockHash::from(1u64)).unwrap(), None);
    assert!(t.ledger.get_block(&txn, &BlockHash::from(1u64)).unwrap().is_none());
    assert!(t.ledger.account_info(&txn, &stranger).unwrap().is_none());
}
