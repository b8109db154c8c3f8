//! Ground-item authority: first-come pickup, player drops, party gold.

use std::sync::Arc;

use ember_protocol::client::{
    CItemPickedUp, CItemPickupRejected, CPartyGoldShare, CPartyGoldShareResult, CPlayerDropConfirm,
    CPlayerItemDropped,
};
use ember_protocol::server::{SItemPickup, SPlayerDropItem, SSharePartyGold};
use ember_protocol::ClientboundEvent;

use crate::net::rate_limit::RateAction;
use crate::server::Server;
use crate::world::loot;
use crate::world::presence::Identity;
use crate::world::GroundItem;

/// First-come pickup. The winner's claim deletes the item while the room
/// lock is held; every later claim gets a private rejection.
pub async fn item_pickup(server: &Arc<Server>, identity: &Identity, payload: SItemPickup) {
    if !server.rate.admit(&identity.od_id, RateAction::Pickup) {
        return;
    }
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(player) = state.players.get(&identity.od_id) else {
        return;
    };
    let conn = player.conn.clone();
    let name = player.name.clone();

    match state.ground_items.remove(&payload.item_id) {
        Some(item) => {
            log::debug!(
                "{} picked up {} after {} ms (dropped by {})",
                identity.od_id,
                item.id,
                ember_core::unix_millis().saturating_sub(item.timestamp),
                item.dropped_by
            );
            state.broadcast(&ClientboundEvent::ItemPickedUp(CItemPickedUp {
                item_id: item.id.clone(),
                item_name: Some(item.name.clone()),
                x: item.x,
                y: item.y,
                picked_up_by: identity.od_id.clone(),
                picked_up_by_name: name,
            }));
        }
        None => {
            // Somebody beat them to it (or the id was never real). Only the
            // loser hears about it.
            conn.send(&ClientboundEvent::ItemPickupRejected(CItemPickupRejected {
                item_id: payload.item_id,
                item_name: payload.item_name,
                reason: "already_picked_up",
            }));
        }
    }
}

/// Player-initiated drop: mint the canonical id, remember the item, tell
/// the room, and hand the id back to the dropper.
pub async fn player_drop_item(server: &Arc<Server>, identity: &Identity, payload: SPlayerDropItem) {
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let mut state = room.state.lock().await;
    let Some(player) = state.players.get(&identity.od_id) else {
        return;
    };
    let conn = player.conn.clone();
    let dropper_name = player.name.clone();

    let mut rng = rand::thread_rng();
    let id = loot::mint_player_drop_id(&mut rng);
    let (velocity_x, velocity_y) = loot::scatter_velocity(&mut rng);

    let item = GroundItem {
        id: id.clone(),
        name: payload.name,
        x: payload.x,
        y: payload.y,
        dropped_by: identity.od_id.to_string(),
        timestamp: ember_core::unix_millis(),
        amount: payload.amount,
        is_gold: payload.is_gold,
        stats: payload.stats,
        rarity: payload.rarity,
        enhancement: payload.enhancement,
        quantity: payload.quantity,
        level_req: payload.level_req,
        is_quest_item: payload.is_quest_item,
    };
    let snapshot = item.snapshot(velocity_x, velocity_y);
    state.ground_items.insert(id.clone(), item);

    state.broadcast_except(
        &identity.od_id,
        &ClientboundEvent::PlayerItemDropped(CPlayerItemDropped {
            drop: snapshot,
            dropped_by: identity.od_id.clone(),
            dropped_by_name: dropper_name,
        }),
    );
    conn.send(&ClientboundEvent::PlayerDropConfirm(CPlayerDropConfirm {
        id,
        velocity_x,
        velocity_y,
    }));
}

/// Splits looted gold across same-map party members. Every recipient is
/// guaranteed at least 1 gold, so the split may mint up to `M - 1` extra
/// units; that is intentional.
pub async fn share_party_gold(server: &Arc<Server>, identity: &Identity, payload: SSharePartyGold) {
    let total = payload.total_amount;
    if total <= 0 {
        return;
    }
    let Some(room) = server.room(&identity.map_id).await else {
        return;
    };
    let state = room.state.lock().await;
    let Some(looter) = state.players.get(&identity.od_id) else {
        return;
    };
    let Some(party_id) = looter.party_id.as_deref() else {
        return;
    };

    let members: Vec<_> = state
        .players
        .values()
        .filter(|p| p.od_id != identity.od_id && p.party_id.as_deref() == Some(party_id))
        .collect();
    let member_count = 1 + members.len();
    if member_count == 1 {
        return;
    }

    let share = ((total + member_count as i64 - 1) / member_count as i64).max(1);
    for member in &members {
        member.conn.send(&ClientboundEvent::PartyGoldShare(CPartyGoldShare {
            amount: share,
            from_name: looter.name.clone(),
        }));
    }

    let looter_share = (total - share * (member_count as i64 - 1)).max(1);
    looter
        .conn
        .send(&ClientboundEvent::PartyGoldShareResult(CPartyGoldShareResult {
            original_amount: total,
            your_share: looter_share,
            member_count,
        }));
}
