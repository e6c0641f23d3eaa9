//! Conversions between Discord payloads and security framework types.

use contro_security::{
    OverwriteState, SecurityEvent, SecurityEventBuilder, SecurityEventBuilderError, Severity,
};
use serenity::all::{PermissionOverwrite, PermissionOverwriteType, Permissions, RoleId};
use uuid::Uuid;

/// The permission bits a lockdown touches, in `OverwriteState` field order.
const LOCKDOWN_FLAGS: [Permissions; 3] = [
    Permissions::SEND_MESSAGES,
    Permissions::ADD_REACTIONS,
    Permissions::CREATE_PUBLIC_THREADS,
];

fn flag_state(overwrite: &PermissionOverwrite, flag: Permissions) -> Option<bool> {
    if overwrite.allow.contains(flag) {
        Some(true)
    } else if overwrite.deny.contains(flag) {
        Some(false)
    } else {
        None
    }
}

fn state_flags(state: &OverwriteState) -> [Option<bool>; 3] {
    [
        state.send_messages,
        state.add_reactions,
        state.create_public_threads,
    ]
}

/// Read the lockdown flags of a role from a channel's overwrites.
///
/// `everyone` is the `@everyone` role, whose id equals the guild id.
pub fn overwrite_state_from(overwrites: &[PermissionOverwrite], everyone: RoleId) -> OverwriteState {
    let Some(overwrite) = overwrites
        .iter()
        .find(|o| o.kind == PermissionOverwriteType::Role(everyone))
    else {
        return OverwriteState::default();
    };

    OverwriteState {
        send_messages: flag_state(overwrite, Permissions::SEND_MESSAGES),
        add_reactions: flag_state(overwrite, Permissions::ADD_REACTIONS),
        create_public_threads: flag_state(overwrite, Permissions::CREATE_PUBLIC_THREADS),
    }
}

/// Build the overwrite for `everyone` with the lockdown flags set to `state`.
///
/// Bits outside the three lockdown flags are copied from `existing`.
pub fn apply_overwrite_state(
    existing: Option<&PermissionOverwrite>,
    everyone: RoleId,
    state: OverwriteState,
) -> PermissionOverwrite {
    let (mut allow, mut deny) = existing
        .map(|o| (o.allow, o.deny))
        .unwrap_or((Permissions::empty(), Permissions::empty()));

    for (flag, value) in LOCKDOWN_FLAGS.into_iter().zip(state_flags(&state)) {
        allow.remove(flag);
        deny.remove(flag);
        match value {
            Some(true) => allow.insert(flag),
            Some(false) => deny.insert(flag),
            None => {}
        }
    }

    PermissionOverwrite {
        allow,
        deny,
        kind: PermissionOverwriteType::Role(everyone),
    }
}

/// Security event for a guild message.
///
/// `mention_count` covers users, roles and `@everyone`/`@here`.
pub fn message_event(
    guild_id: u64,
    channel_id: u64,
    message_id: u64,
    author_id: u64,
    mention_count: usize,
    content_length: usize,
) -> Result<SecurityEvent, SecurityEventBuilderError> {
    let mut builder = SecurityEventBuilder::default();
    builder
        .event_id(Uuid::new_v4().to_string())
        .event_type("message")
        .guild_id(guild_id)
        .channel_id(channel_id)
        .user_id(author_id)
        .datum("message_id", message_id)
        .datum("mention_count", mention_count as u64)
        .datum("content_length", content_length as u64);
    builder.build()
}

/// Security event for a member joining a guild.
pub fn member_join_event(
    guild_id: u64,
    user_id: u64,
    account_age_days: u64,
) -> Result<SecurityEvent, SecurityEventBuilderError> {
    let mut builder = SecurityEventBuilder::default();
    builder
        .event_id(Uuid::new_v4().to_string())
        .event_type("member_join")
        .guild_id(guild_id)
        .user_id(user_id)
        .datum("account_age_days", account_age_days)
        .severity(if account_age_days == 0 {
            Severity::Medium
        } else {
            Severity::Low
        });
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serenity::all::UserId;

    const GUILD: u64 = 9000;

    fn everyone() -> RoleId {
        RoleId::new(GUILD)
    }

    #[test]
    fn test_missing_overwrite_inherits_everything() {
        assert_eq!(overwrite_state_from(&[], everyone()), OverwriteState::default());
    }

    #[test]
    fn test_reads_only_everyone_overwrite() {
        let overwrites = vec![
            PermissionOverwrite {
                allow: Permissions::empty(),
                deny: Permissions::SEND_MESSAGES,
                kind: PermissionOverwriteType::Member(UserId::new(5)),
            },
            PermissionOverwrite {
                allow: Permissions::ADD_REACTIONS | Permissions::VIEW_CHANNEL,
                deny: Permissions::CREATE_PUBLIC_THREADS,
                kind: PermissionOverwriteType::Role(everyone()),
            },
        ];

        let state = overwrite_state_from(&overwrites, everyone());
        assert_eq!(
            state,
            OverwriteState {
                send_messages: None,
                add_reactions: Some(true),
                create_public_threads: Some(false),
            }
        );
    }

    #[test]
    fn test_lock_preserves_unrelated_bits() {
        let existing = PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
            deny: Permissions::ATTACH_FILES,
            kind: PermissionOverwriteType::Role(everyone()),
        };

        let locked = apply_overwrite_state(Some(&existing), everyone(), OverwriteState::locked());
        assert_eq!(locked.allow, Permissions::VIEW_CHANNEL);
        assert_eq!(
            locked.deny,
            Permissions::ATTACH_FILES
                | Permissions::SEND_MESSAGES
                | Permissions::ADD_REACTIONS
                | Permissions::CREATE_PUBLIC_THREADS
        );

        // Restoring the prior state gives back the original overwrite
        let prior = overwrite_state_from(std::slice::from_ref(&existing), everyone());
        let restored = apply_overwrite_state(Some(&locked), everyone(), prior);
        assert_eq!(restored.allow, existing.allow);
        assert_eq!(restored.deny, existing.deny);
    }

    #[test]
    fn test_message_event_payload() {
        let event = message_event(GUILD, 10, 555, 42, 3, 120).unwrap();
        assert_eq!(event.event_type(), "message");
        assert_eq!(event.guild_id(), GUILD);
        assert_eq!(event.channel_id(), Some(10));
        assert_eq!(event.user_id(), Some(42));
        assert_eq!(event.datum_u64("message_id"), Some(555));
        assert_eq!(event.datum_u64("mention_count"), Some(3));
        assert!(!event.event_id().is_empty());
    }

    #[test]
    fn test_member_join_event_payload() {
        let fresh = member_join_event(GUILD, 42, 0).unwrap();
        assert_eq!(fresh.event_type(), "member_join");
        assert_eq!(fresh.severity(), Severity::Medium);
        assert_eq!(fresh.channel_id(), None);

        let old = member_join_event(GUILD, 43, 400).unwrap();
        assert_eq!(old.severity(), Severity::Low);
        assert_eq!(old.datum_u64("account_age_days"), Some(400));
        assert_ne!(fresh.event_id(), old.event_id());
    }
}
