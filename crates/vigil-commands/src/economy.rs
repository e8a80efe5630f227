// SPDX-License-Identifier: Apache-2.0

//! Economy commands: mint and transfer.
//!
//! Ledger invariants enforced here and re-checked by the integrity sweep:
//! balances are non-negative integers, and `minted_total` advances only on
//! mint (including quest reward payouts, which are mints in disguise), so
//! the circulating sum never exceeds it.

use vigil_world::doc::WorldDoc;

use crate::ctx::CmdCtx;
use crate::feed;

/// Whether `name` names a known principal: a remembered agent or anyone
/// with a ledger entry.
pub fn agent_known(doc: &WorldDoc, name: &str) -> bool {
    doc.agents.contains_key(name) || doc.world.economy.ledger.contains_key(name)
}

/// Mint `amount` into existence for `agent`. Used by `mint` and by reward
/// payouts.
pub fn mint_into(doc: &mut WorldDoc, agent: &str, amount: i64) {
    let economy = &mut doc.world.economy;
    *economy.ledger.entry(agent.to_owned()).or_insert(0) += amount;
    economy.minted_total = Some(economy.minted_total.unwrap_or(0) + amount);
}

/// `mint <agent> <n>`
pub fn mint(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, agent: &str, amount: i64) -> bool {
    if amount <= 0 {
        return ctx.refuse("mint amount must be positive");
    }
    mint_into(doc, agent, amount);
    let currency = doc.world.economy.currency.clone();
    let balance = doc.world.economy.ledger[agent];
    feed::chronicle(
        &mut doc.world,
        ctx,
        "economy",
        None,
        None,
        "mint",
        format!("{amount} {currency} minted for {agent}"),
    );
    ctx.say(format!("{agent} holds {balance} {currency}"));
    true
}

/// `transfer <src> <dst> <n>`
pub fn transfer(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    src: &str,
    dst: &str,
    amount: i64,
) -> bool {
    if amount <= 0 {
        return ctx.refuse("transfer amount must be positive");
    }
    if src == dst {
        return ctx.refuse("transfer needs two different agents");
    }
    let Some(balance) = doc.world.economy.ledger.get(src).copied() else {
        return ctx.refuse(format!("unknown agent: {src}"));
    };
    if balance < amount {
        return ctx.refuse(format!("{src} holds only {balance}"));
    }
    let economy = &mut doc.world.economy;
    if let Some(src_balance) = economy.ledger.get_mut(src) {
        *src_balance -= amount;
    }
    *economy.ledger.entry(dst.to_owned()).or_insert(0) += amount;
    let currency = economy.currency.clone();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "economy",
        None,
        None,
        "transfer",
        format!("{src} paid {amount} {currency} to {dst}"),
    );
    ctx.say(format!("{src} paid {dst} {amount} {currency}"));
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{mint, transfer};
    use crate::ctx::CmdCtx;
    use vigil_world::doc::WorldDoc;
    use vigil_world::integrity;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    #[test]
    fn mint_advances_minted_total() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(mint(&mut doc, &mut c, "Mara", 25));
        assert!(mint(&mut doc, &mut c, "Eli", 25));
        assert_eq!(doc.world.economy.ledger["Mara"], 25);
        assert_eq!(doc.world.economy.minted_total, Some(50));
        assert!(integrity::check(&doc).ok());
    }

    #[test]
    fn transfer_guards_balance_and_targets() {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(mint(&mut doc, &mut c, "Mara", 10));
        assert!(!transfer(&mut doc, &mut c, "Eli", "Mara", 5), "unknown src");
        assert!(!transfer(&mut doc, &mut c, "Mara", "Eli", 11), "insufficient");
        assert!(!transfer(&mut doc, &mut c, "Mara", "Mara", 1), "self");
        assert!(!transfer(&mut doc, &mut c, "Mara", "Eli", 0), "non-positive");
        assert!(transfer(&mut doc, &mut c, "Mara", "Eli", 4));
        assert_eq!(doc.world.economy.ledger["Mara"], 6);
        assert_eq!(doc.world.economy.ledger["Eli"], 4);
        // minted_total does not move on transfer
        assert_eq!(doc.world.economy.minted_total, Some(10));
        assert!(integrity::check(&doc).ok());
    }
}
