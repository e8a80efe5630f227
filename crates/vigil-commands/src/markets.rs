// SPDX-License-Identifier: Apache-2.0

//! Markets, offers, and trades.
//!
//! Offer book rules: `offer_id` is unique within a market (the id counter is
//! global, which is stronger); an offer whose `active` flag drops to false is
//! frozen and never mutated again. A trade is one atomic mutation — buyer
//! debited, seller credited, offer decremented — inside the surrounding
//! transaction, so a replay (same event id) is strictly a no-op.

use vigil_world::doc::{IdCounters, Market, Offer, QuestKind, QuestStatus, Side, WorldDoc};

use crate::ctx::CmdCtx;
use crate::economy::agent_known;
use crate::feed;

/// `market add <name> [<marker>]`
pub fn market_add(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str, marker: Option<&str>) -> bool {
    if doc.world.markets.iter().any(|m| m.name == name) {
        return ctx.refuse(format!("market {name} already exists"));
    }
    if let Some(marker) = marker {
        if !doc.world.markers.iter().any(|m| m.name == marker) {
            return ctx.refuse(format!("unknown marker: {marker}"));
        }
    }
    doc.world.markets.push(Market {
        name: name.to_owned(),
        marker: marker.map(str::to_owned),
        offers: Vec::new(),
    });
    feed::chronicle(
        &mut doc.world,
        ctx,
        "market",
        None,
        None,
        "market",
        format!("market {name} opened"),
    );
    ctx.say(format!("market {name} open for business"));
    true
}

/// `market remove <name>`
pub fn market_remove(doc: &mut WorldDoc, ctx: &mut CmdCtx<'_>, name: &str) -> bool {
    let before = doc.world.markets.len();
    doc.world.markets.retain(|m| m.name != name);
    if doc.world.markets.len() == before {
        return ctx.refuse(format!("unknown market: {name}"));
    }
    feed::chronicle(
        &mut doc.world,
        ctx,
        "market",
        None,
        None,
        "market",
        format!("market {name} shuttered"),
    );
    ctx.say(format!("market {name} closed"));
    true
}

/// `market list` — read-only.
pub fn market_list(doc: &WorldDoc, ctx: &mut CmdCtx<'_>) -> bool {
    if doc.world.markets.is_empty() {
        ctx.say("no markets");
        return false;
    }
    for market in &doc.world.markets {
        let open = market.offers.iter().filter(|o| o.active).count();
        ctx.say(format!("{} ({} open offers)", market.name, open));
        for offer in market.offers.iter().filter(|o| o.active) {
            let side = match offer.side {
                Side::Buy => "buys",
                Side::Sell => "sells",
            };
            ctx.say(format!(
                "  {} {} {} x{} @ {}",
                offer.offer_id, offer.owner, side, offer.amount, offer.price
            ));
        }
    }
    false
}

/// `offer add <market> <owner> <side> <amount> <price>`
pub fn offer_add(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    market_name: &str,
    owner: &str,
    side: Side,
    amount: i64,
    price: i64,
) -> bool {
    if amount <= 0 || price <= 0 {
        return ctx.refuse("amount and price must be positive");
    }
    if !agent_known(doc, owner) {
        return ctx.refuse(format!("unknown agent: {owner}"));
    }
    let Some(market_idx) = doc.world.markets.iter().position(|m| m.name == market_name) else {
        return ctx.refuse(format!("unknown market: {market_name}"));
    };
    let ordinal = IdCounters::take(&mut doc.world.ids.offer);
    let offer_id = format!("of{ordinal:04}");
    let market = &mut doc.world.markets[market_idx];
    market.offers.push(Offer {
        offer_id: offer_id.clone(),
        owner: owner.to_owned(),
        side,
        amount,
        price,
        active: true,
    });
    ctx.say(format!("offer {offer_id} listed in {market_name}"));
    true
}

/// `offer cancel <market> <offer_id>`
pub fn offer_cancel(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    market_name: &str,
    offer_id: &str,
) -> bool {
    let Some(market) = doc.world.markets.iter_mut().find(|m| m.name == market_name) else {
        return ctx.refuse(format!("unknown market: {market_name}"));
    };
    let Some(offer) = market.offers.iter_mut().find(|o| o.offer_id == offer_id) else {
        return ctx.refuse(format!("unknown offer: {offer_id}"));
    };
    if !offer.active {
        return ctx.refuse(format!("offer {offer_id} is already closed"));
    }
    offer.active = false;
    ctx.say(format!("offer {offer_id} cancelled"));
    true
}

/// `trade <market> <offer_id> <taker> <qty>`
pub fn trade(
    doc: &mut WorldDoc,
    ctx: &mut CmdCtx<'_>,
    market_name: &str,
    offer_id: &str,
    taker: &str,
    qty: i64,
) -> bool {
    if qty <= 0 {
        return ctx.refuse("qty must be positive");
    }
    if !agent_known(doc, taker) {
        return ctx.refuse(format!("unknown agent: {taker}"));
    }
    let Some(market) = doc.world.markets.iter().find(|m| m.name == market_name) else {
        return ctx.refuse(format!("unknown market: {market_name}"));
    };
    let Some(offer) = market.offers.iter().find(|o| o.offer_id == offer_id) else {
        return ctx.refuse(format!("unknown offer: {offer_id}"));
    };
    if !offer.active {
        return ctx.refuse(format!("offer {offer_id} is closed"));
    }
    if qty > offer.amount {
        return ctx.refuse(format!("offer {offer_id} has only {}", offer.amount));
    }

    // The offer owner is the counterparty; which of the two is the buyer
    // depends on the offer side.
    let owner = offer.owner.clone();
    let (buyer, seller) = match offer.side {
        Side::Sell => (taker.to_owned(), owner),
        Side::Buy => (owner, taker.to_owned()),
    };
    let cost = qty * offer.price;
    let buyer_balance = doc.world.economy.ledger.get(&buyer).copied().unwrap_or(0);
    if buyer_balance < cost {
        return ctx.refuse(format!("{buyer} holds only {buyer_balance}, needs {cost}"));
    }

    // Atomic within the transaction: debit, credit, decrement.
    if let Some(balance) = doc.world.economy.ledger.get_mut(&buyer) {
        *balance -= cost;
    }
    *doc.world.economy.ledger.entry(seller.clone()).or_insert(0) += cost;
    if let Some(market) = doc.world.markets.iter_mut().find(|m| m.name == market_name) {
        if let Some(offer) = market.offers.iter_mut().find(|o| o.offer_id == offer_id) {
            offer.amount -= qty;
            if offer.amount == 0 {
                offer.active = false;
            }
        }
    }

    // Buyer-side progress for trade quests owned by the buyer.
    for quest in doc
        .world
        .quests
        .iter_mut()
        .filter(|q| q.kind == QuestKind::TradeN && q.owner.as_deref() == Some(buyer.as_str()))
    {
        if matches!(quest.status, QuestStatus::Accepted | QuestStatus::InProgress) {
            quest.progress += qty;
            if quest.target > 0 && quest.progress > quest.target {
                quest.progress = quest.target;
            }
            if quest.status == QuestStatus::Accepted {
                quest.status = QuestStatus::InProgress;
            }
        }
    }

    let currency = doc.world.economy.currency.clone();
    feed::chronicle(
        &mut doc.world,
        ctx,
        "market",
        None,
        None,
        "trade",
        format!("{buyer} bought {qty} from {seller} for {cost} {currency}"),
    );
    ctx.say(format!("{buyer} bought {qty} for {cost} {currency}"));
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{market_add, offer_add, offer_cancel, trade};
    use crate::ctx::CmdCtx;
    use crate::economy::mint;
    use vigil_world::doc::{Side, WorldDoc};
    use vigil_world::integrity;

    fn ctx() -> CmdCtx<'static> {
        CmdCtx::new("op1", "2024-01-01T00:00:00Z".to_owned(), 0)
    }

    fn seeded() -> (WorldDoc, CmdCtx<'static>) {
        let mut doc = WorldDoc::fresh();
        let mut c = ctx();
        assert!(mint(&mut doc, &mut c, "Mara", 25));
        assert!(mint(&mut doc, &mut c, "Eli", 25));
        assert!(market_add(&mut doc, &mut c, "bazaar", None));
        assert!(offer_add(&mut doc, &mut c, "bazaar", "Mara", Side::Sell, 8, 5));
        (doc, c)
    }

    #[test]
    fn sell_offer_trade_moves_funds_and_stock() {
        let (mut doc, mut c) = seeded();
        assert!(trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 1));
        assert_eq!(doc.world.economy.ledger["Eli"], 20);
        assert_eq!(doc.world.economy.ledger["Mara"], 30);
        assert_eq!(doc.world.markets[0].offers[0].amount, 7);
        assert!(doc.world.markets[0].offers[0].active);
        assert!(integrity::check(&doc).ok());
    }

    #[test]
    fn exhausted_offer_freezes() {
        let (mut doc, mut c) = seeded();
        assert!(trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 4));
        assert!(trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 4));
        let offer = &doc.world.markets[0].offers[0];
        assert_eq!(offer.amount, 0);
        assert!(!offer.active);
        // frozen: no further trades or cancellation
        assert!(!trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 1));
        assert!(!offer_cancel(&mut doc, &mut c, "bazaar", "of0001"));
    }

    #[test]
    fn trade_guards_funds_and_stock() {
        let (mut doc, mut c) = seeded();
        assert!(!trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 9), "stock");
        assert!(!trade(&mut doc, &mut c, "bazaar", "of0001", "Eli", 6), "funds: 30 > 25");
        assert!(!trade(&mut doc, &mut c, "bazaar", "of9999", "Eli", 1), "offer");
        assert!(!trade(&mut doc, &mut c, "nowhere", "of0001", "Eli", 1), "market");
        assert!(!trade(&mut doc, &mut c, "bazaar", "of0001", "Ghost", 1), "agent");
    }
}
