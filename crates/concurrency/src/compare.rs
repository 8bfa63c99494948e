//! Conditional transaction evaluation
//!
//! A transaction reads one key, compares its value against a test value with
//! a [`CompareOp`], and writes either the "then" or the "else" entry.
//!
//! Key rules:
//! - A missing key compares as the empty string
//! - `=`/`!=` are exact equality; `<`/`>` are byte-lexicographic
//! - Values are never interpreted numerically
//! - Read, compare and write happen inside one [`KeySpaceTxn`]

use hmkv_core::{CompareOp, KviResult};
use hmkv_storage::KeySpaceTxn;

/// Evaluate `stored <op> test`
pub fn compare(stored: &str, op: CompareOp, test: &str) -> bool {
    let (stored, test) = (stored.as_bytes(), test.as_bytes());
    match op {
        CompareOp::Equal => stored == test,
        CompareOp::NotEqual => stored != test,
        CompareOp::Less => stored < test,
        CompareOp::Greater => stored > test,
    }
}

/// Which branch a transaction wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// The comparison held; the "then" entry was written
    Then,
    /// The comparison failed; the "else" entry was written
    Else,
}

impl Branch {
    /// True for [`Branch::Then`]
    pub fn took_then(self) -> bool {
        matches!(self, Branch::Then)
    }
}

/// A fully described conditional transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareRequest<'a> {
    /// Key whose value is compared
    pub key: &'a str,
    /// Relational operator
    pub op: CompareOp,
    /// Right-hand side of the comparison
    pub test_value: &'a str,
    /// Key written when the comparison holds
    pub then_key: &'a str,
    /// Value written when the comparison holds
    pub then_value: &'a str,
    /// Key written when the comparison fails
    pub else_key: &'a str,
    /// Value written when the comparison fails
    pub else_value: &'a str,
}

impl<'a> CompareRequest<'a> {
    /// Build a request, parsing the operator symbol
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unsupported operator.
    #[allow(clippy::too_many_arguments)]
    pub fn parse(
        key: &'a str,
        op: &str,
        test_value: &'a str,
        then_key: &'a str,
        then_value: &'a str,
        else_key: &'a str,
        else_value: &'a str,
    ) -> KviResult<Self> {
        Ok(Self {
            key,
            op: op.parse()?,
            test_value,
            then_key,
            then_value,
            else_key,
            else_value,
        })
    }

    /// Decide the branch against a stored value (missing = empty string)
    pub fn decide(&self, stored: Option<&str>) -> Branch {
        if compare(stored.unwrap_or(""), self.op, self.test_value) {
            Branch::Then
        } else {
            Branch::Else
        }
    }

    /// Read, decide and write inside `txn`
    pub fn execute(&self, txn: &mut KeySpaceTxn<'_>) -> Branch {
        let branch = self.decide(txn.get(self.key));
        match branch {
            Branch::Then => txn.put(self.then_key, self.then_value),
            Branch::Else => txn.put(self.else_key, self.else_value),
        };
        branch
    }
}
