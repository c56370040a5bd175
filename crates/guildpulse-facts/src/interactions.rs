//! Derives mention and reply edges between members from a message.

use crate::facts::{InteractionEdge, InteractionKind, MessageFact};
use crate::raw_events::RawUser;

/// Returns one edge per qualifying mention plus at most one reply edge.
///
/// Bot targets and self-interactions are dropped per edge. Repeated mentions
/// of the same user are kept; aggregation belongs to the sink.
pub fn extract_interactions(
    message: &MessageFact,
    mentions: &[RawUser],
    replied_to: Option<&RawUser>,
) -> Vec<InteractionEdge> {
    let mention_edges = mentions
        .iter()
        .map(|target| (target, InteractionKind::Mention));
    let reply_edge = replied_to
        .into_iter()
        .map(|target| (target, InteractionKind::Reply));

    mention_edges
        .chain(reply_edge)
        .filter(|(target, _)| !target.bot && target.id != message.author_id)
        .map(|(target, kind)| InteractionEdge {
            guild_id: message.guild_id.clone(),
            source_id: message.author_id.clone(),
            target_id: target.id.clone(),
            kind,
            channel_id: message.channel_id.clone(),
            occurred_at: message.timestamp,
        })
        .collect()
}
