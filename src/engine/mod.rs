//! Command Execution Engine
//!
//! The [`Engine`] is the heart of the server. It interprets a validated
//! [`Command`] against the active database, enforces the transaction
//! queueing state machine, and produces the protocol-visible [`Reply`].
//!
//! ## Transaction state machine
//!
//! The engine is either idle or queueing:
//!
//! ```text
//!            MULTI                        EXEC (drain queue, collect replies)
//!   Idle ───────────────> Queueing ──────────────────────────────> Idle
//!    ▲                       │  │
//!    │       DISCARD         │  │ any non-terminator command
//!    └───────────────────────┘  └──> appended to queue, "QUEUED"
//! ```
//!
//! While queueing, every command except EXEC and DISCARD is buffered
//! unexecuted and acknowledged with `QUEUED`. Validation still runs first:
//! a command with the wrong arity is rejected immediately and never
//! enqueued. EXEC drains the queue in FIFO order through the same dispatch
//! path used outside a transaction; a failing command contributes its error
//! at its position without aborting the rest of the batch. There is no
//! rollback and no nesting: a MULTI issued while queueing is itself queued
//! like any other command.
//!
//! ## Database routing
//!
//! The caller supplies its active database index on every call and must
//! carry the returned index into the next call; only a successful SELECT
//! changes it. Commands drained by EXEC all run against the index that was
//! active when EXEC was issued.

use crate::command::{Command, Operation};
use crate::protocol::Reply;
use crate::storage::Store;

/// Executes commands against a store, tracking transaction state.
///
/// The engine owns the transaction queue and open-flag; these are the only
/// mutable state outside the store itself. One engine binds one store for
/// its lifetime. The engine performs no locking of its own: callers sharing
/// it across tasks must serialize the whole execute path (the server wraps
/// it in a mutex).
#[derive(Debug)]
pub struct Engine {
    store: Store,
    in_multi: bool,
    queue: Vec<Command>,
}

impl Engine {
    /// Creates an engine bound to the given store.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            in_multi: false,
            queue: Vec::new(),
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Executes one command against the database at `db_index`.
    ///
    /// Returns the index the caller should use for its next call (changed
    /// only by a successful SELECT) and the protocol-visible reply. Errors
    /// are returned as [`Reply::Error`] values, never as `Err`.
    pub fn execute(&mut self, db_index: usize, command: Command) -> (usize, Reply) {
        if let Err(e) = command.validate() {
            return (db_index, Reply::Error(e));
        }

        if self.in_multi && !command.is_terminator() {
            self.queue.push(command);
            return (db_index, Reply::queued());
        }

        self.dispatch(db_index, command)
    }

    fn dispatch(&mut self, db_index: usize, command: Command) -> (usize, Reply) {
        match command.operation() {
            Operation::Select => {
                // Validation guarantees the key argument is present.
                let raw = command.key().unwrap_or_default();
                match self.store.select(raw) {
                    Ok(index) => (index, Reply::ok()),
                    Err(e) => (db_index, Reply::Error(e)),
                }
            }
            Operation::Multi => {
                self.in_multi = true;
                (db_index, Reply::ok())
            }
            Operation::Discard => {
                self.in_multi = false;
                self.queue.clear();
                (db_index, Reply::ok())
            }
            Operation::Exec => {
                self.in_multi = false;
                let reply = self.run_queued(db_index);
                (db_index, reply)
            }
            Operation::Compact => {
                let dump = self
                    .store
                    .entries(db_index)
                    .map(|(k, v)| Reply::value(format!("SET {} {}", k, v)))
                    .collect();
                (db_index, Reply::Many(dump))
            }
            Operation::Set => {
                let key = command.key().unwrap_or_default().to_string();
                let value = command.value().unwrap_or_default().to_string();
                self.store.set(db_index, key, value);
                (db_index, Reply::ok())
            }
            Operation::Get => {
                let reply = match self.store.get(db_index, command.key().unwrap_or_default()) {
                    Some(value) => Reply::Value(value),
                    None => Reply::Nil,
                };
                (db_index, reply)
            }
            Operation::Del => {
                let removed = self.store.delete(db_index, command.key().unwrap_or_default());
                (db_index, Reply::Integer(removed))
            }
            Operation::Incr => {
                let key = command.key().unwrap_or_default().to_string();
                (db_index, self.increment(db_index, &key, None))
            }
            Operation::IncrBy => {
                let key = command.key().unwrap_or_default().to_string();
                let amount = command.value().unwrap_or_default().to_string();
                (db_index, self.increment(db_index, &key, Some(amount)))
            }
            Operation::Unknown(_) => {
                // Unreachable in practice: validate() rejects unknown tags.
                (db_index, Reply::Error(command.unknown_error()))
            }
        }
    }

    /// Shared INCR/INCRBY path. `amount` is `None` for INCR (step of 1).
    ///
    /// On an absent key, INCR stores `"1"` while INCRBY stores the raw
    /// amount verbatim; the asymmetry is long-observed behavior that clients
    /// rely on, so it is preserved deliberately.
    fn increment(&mut self, db_index: usize, key: &str, amount: Option<String>) -> Reply {
        let stored = match self.store.get(db_index, key) {
            Some(v) => v,
            None => {
                let initial = amount.unwrap_or_else(|| "1".to_string());
                self.store.set(db_index, key, initial.clone());
                return Reply::Value(initial);
            }
        };

        let current: i64 = match stored.parse() {
            Ok(n) => n,
            Err(_) => return Reply::Error(crate::command::CommandError::NotAnInteger),
        };

        let step: i64 = match &amount {
            None => 1,
            Some(raw) => match raw.parse() {
                Ok(n) => n,
                Err(_) => return Reply::Error(crate::command::CommandError::NotAnInteger),
            },
        };

        let next = match current.checked_add(step) {
            Some(n) => n,
            None => return Reply::Error(crate::command::CommandError::NotAnInteger),
        };

        let rendered = next.to_string();
        self.store.set(db_index, key, rendered.clone());
        Reply::Value(rendered)
    }

    /// Drains the transaction queue in FIFO order, dispatching each command
    /// through the normal execute path and collecting one reply per command.
    ///
    /// Index updates from queued SELECTs are discarded: every queued command
    /// runs against the index that was active when EXEC arrived.
    fn run_queued(&mut self, db_index: usize) -> Reply {
        let queued = std::mem::take(&mut self.queue);
        let mut replies = Vec::with_capacity(queued.len());
        for command in queued {
            let (_, reply) = self.execute(db_index, command);
            replies.push(reply);
        }
        // A drained MULTI reopens queueing mid-batch, so later commands in
        // the same batch land back on the queue. They belong to this EXEC
        // and must not replay on the next one.
        self.queue.clear();
        Reply::Many(replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandError;

    fn cmd(parts: &[&str]) -> Command {
        Command::from_parts(parts.iter().map(|s| s.to_string()).collect())
    }

    /// Runs a command sequence from database 0, carrying the index between
    /// calls the way a connection does, and returns the replies.
    fn run(engine: &mut Engine, script: &[&[&str]]) -> Vec<Reply> {
        let mut db = 0;
        let mut replies = Vec::new();
        for parts in script {
            let (next, reply) = engine.execute(db, cmd(parts));
            db = next;
            replies.push(reply);
        }
        replies
    }

    fn engine() -> Engine {
        Engine::new(Store::new(16))
    }

    #[test]
    fn test_set() {
        let mut e = engine();
        assert_eq!(run(&mut e, &[&["SET", "foo", "bar"]]), vec![Reply::ok()]);
    }

    #[test]
    fn test_set_missing_value() {
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["SET", "foo"]]),
            vec![Reply::Error(CommandError::WrongArity("set"))]
        );
    }

    #[test]
    fn test_get_absent_key() {
        let mut e = engine();
        assert_eq!(run(&mut e, &[&["GET", "nonexisting"]]), vec![Reply::Nil]);
    }

    #[test]
    fn test_set_and_get() {
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["SET", "foo", "bar"], &["GET", "foo"]]),
            vec![Reply::ok(), Reply::value("bar")]
        );
    }

    #[test]
    fn test_del_absent_key() {
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["DEL", "nonexisting"]]),
            vec![Reply::Integer(0)]
        );
    }

    #[test]
    fn test_set_delete_get() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[&["SET", "foo", "bar"], &["DEL", "foo"], &["GET", "foo"]]
            ),
            vec![Reply::ok(), Reply::Integer(1), Reply::Nil]
        );
    }

    #[test]
    fn test_incr_absent_key_starts_at_one() {
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["INCR", "counter"], &["GET", "counter"]]),
            vec![Reply::value("1"), Reply::value("1")]
        );
    }

    #[test]
    fn test_incr_existing_integer() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "counter", "3"],
                    &["INCR", "counter"],
                    &["GET", "counter"]
                ]
            ),
            vec![Reply::ok(), Reply::value("4"), Reply::value("4")]
        );
    }

    #[test]
    fn test_incr_non_integer_leaves_value_untouched() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "counter", "non-integer"],
                    &["INCR", "counter"],
                    &["GET", "counter"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::Error(CommandError::NotAnInteger),
                Reply::value("non-integer")
            ]
        );
    }

    #[test]
    fn test_incrby_absent_key_stores_raw_amount() {
        // Not amount + 1: the raw amount itself, stored verbatim.
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["INCRBY", "counter", "10"], &["GET", "counter"]]),
            vec![Reply::value("10"), Reply::value("10")]
        );
    }

    #[test]
    fn test_incrby_missing_amount() {
        let mut e = engine();
        assert_eq!(
            run(&mut e, &[&["INCRBY", "counter"], &["GET", "counter"]]),
            vec![
                Reply::Error(CommandError::WrongArity("incrby")),
                Reply::Nil
            ]
        );
    }

    #[test]
    fn test_incrby_existing_integer() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "counter", "3"],
                    &["INCRBY", "counter", "10"],
                    &["GET", "counter"]
                ]
            ),
            vec![Reply::ok(), Reply::value("13"), Reply::value("13")]
        );
    }

    #[test]
    fn test_incrby_non_integer_stored_value() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[&["SET", "counter", "non-integer"], &["INCRBY", "counter", "10"]]
            ),
            vec![Reply::ok(), Reply::Error(CommandError::NotAnInteger)]
        );
    }

    #[test]
    fn test_incrby_non_integer_amount() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "counter", "10"],
                    &["INCRBY", "counter", "non-integer"],
                    &["GET", "counter"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::Error(CommandError::NotAnInteger),
                Reply::value("10")
            ]
        );
    }

    #[test]
    fn test_incr_overflow_reports_out_of_range() {
        let mut e = engine();
        let max = i64::MAX.to_string();
        let (_, set) = e.execute(0, cmd(&["SET", "counter", &max]));
        assert_eq!(set, Reply::ok());
        let (_, reply) = e.execute(0, cmd(&["INCR", "counter"]));
        assert_eq!(reply, Reply::Error(CommandError::NotAnInteger));
        assert_eq!(e.store().get(0, "counter"), Some(max));
    }

    #[test]
    fn test_multiple_keys() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "foo", "bar"],
                    &["SET", "baz", "qux"],
                    &["GET", "foo"],
                    &["GET", "baz"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::ok(),
                Reply::value("bar"),
                Reply::value("qux")
            ]
        );
    }

    #[test]
    fn test_multi_exec_block() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["MULTI"],
                    &["SET", "foo", "bar"],
                    &["GET", "foo"],
                    &["EXEC"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::queued(),
                Reply::queued(),
                Reply::Many(vec![Reply::ok(), Reply::value("bar")])
            ]
        );
    }

    #[test]
    fn test_queued_commands_do_not_execute_before_exec() {
        let mut e = engine();
        let replies = run(&mut e, &[&["MULTI"], &["SET", "foo", "bar"]]);
        assert_eq!(replies, vec![Reply::ok(), Reply::queued()]);
        // Nothing applied yet: the store has no trace of the queued SET.
        assert_eq!(e.store().get(0, "foo"), None);
    }

    #[test]
    fn test_multi_block_with_failing_command() {
        // The failing INCR reports its error at its position; the rest of
        // the batch still runs.
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["MULTI"],
                    &["SET", "foo", "bar"],
                    &["GET", "foo"],
                    &["INCR", "foo"],
                    &["EXEC"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::queued(),
                Reply::queued(),
                Reply::queued(),
                Reply::Many(vec![
                    Reply::ok(),
                    Reply::value("bar"),
                    Reply::Error(CommandError::NotAnInteger)
                ])
            ]
        );
    }

    #[test]
    fn test_invalid_command_is_rejected_not_queued() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[&["MULTI"], &["SET", "foo"], &["EXEC"]]
            ),
            vec![
                Reply::ok(),
                Reply::Error(CommandError::WrongArity("set")),
                Reply::Many(vec![])
            ]
        );
    }

    #[test]
    fn test_discard_drops_queue() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["MULTI"],
                    &["SET", "foo", "bar"],
                    &["DISCARD"],
                    &["GET", "foo"]
                ]
            ),
            vec![Reply::ok(), Reply::queued(), Reply::ok(), Reply::Nil]
        );
    }

    #[test]
    fn test_exec_clears_commands_requeued_mid_drain() {
        // A MULTI inside the batch reopens queueing while EXEC drains, so
        // the SET after it is re-queued instead of executed. It belongs to
        // that EXEC and must not replay on the next one.
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["MULTI"],
                    &["MULTI"],
                    &["SET", "a", "b"],
                    &["EXEC"],
                    &["EXEC"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::queued(),
                Reply::queued(),
                Reply::Many(vec![Reply::ok(), Reply::queued()]),
                Reply::Many(vec![])
            ]
        );
        assert_eq!(e.store().get(0, "a"), None);
    }

    #[test]
    fn test_exec_while_idle_yields_empty_sequence() {
        let mut e = engine();
        assert_eq!(run(&mut e, &[&["EXEC"]]), vec![Reply::Many(vec![])]);
    }

    #[test]
    fn test_discard_while_idle_is_accepted() {
        let mut e = engine();
        assert_eq!(run(&mut e, &[&["DISCARD"]]), vec![Reply::ok()]);
    }

    #[test]
    fn test_commands_after_exec_run_immediately() {
        let mut e = engine();
        let replies = run(
            &mut e,
            &[
                &["MULTI"],
                &["SET", "a", "1"],
                &["EXEC"],
                &["SET", "b", "2"],
            ],
        );
        assert_eq!(replies[3], Reply::ok());
        assert_eq!(e.store().get(0, "b"), Some("2".to_string()));
    }

    #[test]
    fn test_select_routes_subsequent_commands() {
        let mut e = engine();
        assert_eq!(
            run(
                &mut e,
                &[
                    &["SET", "key", "zero"],
                    &["SELECT", "1"],
                    &["GET", "key"],
                    &["SET", "key", "one"],
                    &["SELECT", "0"],
                    &["GET", "key"]
                ]
            ),
            vec![
                Reply::ok(),
                Reply::ok(),
                Reply::Nil,
                Reply::ok(),
                Reply::ok(),
                Reply::value("zero")
            ]
        );
    }

    #[test]
    fn test_select_errors_leave_index_unchanged() {
        let mut e = engine();

        let (db, reply) = e.execute(0, cmd(&["SELECT", "abc"]));
        assert_eq!(db, 0);
        assert_eq!(reply, Reply::Error(CommandError::NotAnInteger));

        let (db, reply) = e.execute(0, cmd(&["SELECT", "16"]));
        assert_eq!(db, 0);
        assert_eq!(reply, Reply::Error(CommandError::DbIndexOutOfRange));
    }

    #[test]
    fn test_compact_dumps_reconstructable_sets() {
        let mut e = engine();
        run(&mut e, &[&["SET", "foo", "bar"], &["SET", "baz", "qux"]]);

        let (_, reply) = e.execute(0, cmd(&["COMPACT"]));
        let mut lines: Vec<String> = match reply {
            Reply::Many(items) => items.iter().map(|r| r.to_string()).collect(),
            other => panic!("expected sequence, got {other:?}"),
        };
        lines.sort();
        assert_eq!(lines, vec!["SET baz qux", "SET foo bar"]);
    }

    #[test]
    fn test_compact_empty_database() {
        let mut e = engine();
        let (_, reply) = e.execute(0, cmd(&["COMPACT"]));
        assert_eq!(reply, Reply::Many(vec![]));
    }

    #[test]
    fn test_compact_only_sees_active_database() {
        let mut e = engine();
        let replies = run(
            &mut e,
            &[
                &["SET", "visible", "yes"],
                &["SELECT", "2"],
                &["SET", "hidden", "yes"],
                &["SELECT", "0"],
                &["COMPACT"],
            ],
        );
        assert_eq!(
            replies[4],
            Reply::Many(vec![Reply::value("SET visible yes")])
        );
    }

    #[test]
    fn test_unknown_command() {
        let mut e = engine();
        let (_, reply) = e.execute(0, cmd(&["UNKNOWN", "command"]));
        assert_eq!(
            reply.render(),
            "(error) ERR unknown command `UNKNOWN`, with args beginning with: `command`,\n"
        );
    }
}
