//! Lockdown snapshots restored onto Discord permission overwrites

use contro_security::{LockdownSnapshot, OverwriteState};
use contro_social::{apply_overwrite_state, overwrite_state_from};
use serenity::all::{PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId};
use std::collections::BTreeMap;

const GUILD: u64 = 4242;

fn everyone_overwrite(allow: Permissions, deny: Permissions) -> PermissionOverwrite {
    PermissionOverwrite {
        allow,
        deny,
        kind: PermissionOverwriteType::Role(RoleId::new(GUILD)),
    }
}

#[test]
fn test_snapshot_survives_persistence_and_restores_channels() {
    let everyone = RoleId::new(GUILD);
    let originals = vec![
        (1u64, None),
        (
            2u64,
            Some(everyone_overwrite(
                Permissions::SEND_MESSAGES,
                Permissions::EMBED_LINKS,
            )),
        ),
    ];

    // Capture and lock each channel the way a lockdown does
    let mut snapshot = LockdownSnapshot {
        guild_id: GUILD,
        channels: BTreeMap::new(),
        timestamp: chrono::Utc::now(),
        reason: "Join raid".to_string(),
    };
    let mut locked = BTreeMap::new();
    for (channel_id, overwrite) in &originals {
        let overwrites: Vec<PermissionOverwrite> = overwrite.iter().cloned().collect();
        snapshot
            .channels
            .insert(*channel_id, overwrite_state_from(&overwrites, everyone));
        locked.insert(
            *channel_id,
            apply_overwrite_state(overwrite.as_ref(), everyone, OverwriteState::locked()),
        );
    }

    // Persist and reload the snapshot
    let stored = serde_json::to_string(&snapshot).unwrap();
    let reloaded: LockdownSnapshot = serde_json::from_str(&stored).unwrap();
    assert_eq!(reloaded, snapshot);

    for (channel_id, overwrite) in &originals {
        let restored = apply_overwrite_state(
            locked.get(channel_id),
            everyone,
            reloaded.channels[channel_id],
        );
        let expected = overwrite
            .clone()
            .unwrap_or_else(|| everyone_overwrite(Permissions::empty(), Permissions::empty()));
        assert_eq!(restored.allow, expected.allow, "channel {}", channel_id);
        assert_eq!(restored.deny, expected.deny, "channel {}", channel_id);
    }
}

#[test]
fn test_locked_overwrite_denies_all_three_flags() {
    let everyone = RoleId::new(GUILD);
    let locked = apply_overwrite_state(None, everyone, OverwriteState::locked());

    assert_eq!(overwrite_state_from(&[locked.clone()], everyone), OverwriteState::locked());
    assert!(locked.allow.is_empty());
    assert_eq!(locked.kind, PermissionOverwriteType::Role(everyone));
}
