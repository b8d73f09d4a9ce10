//! Feature-flag tagging: a byproduct of lowering, telling the emitter
//! which optional runtime capabilities a unit's generated parser needs.

use bitflags::bitflags;
use bpc_ast::{AttributeSet, Context, NodeId, NodeKind};

use crate::production::{Grammar, LoopControl, Production};
use crate::synchronize::SyncPoints;

bitflags! {
    /// Required runtime capabilities, translated by the emitter into
    /// runtime-capability attributes on the generated record.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FeatureFlags: u8 {
        /// Parsing must be able to resynchronize mid-stream.
        const USES_SYNC_ADVANCE = 1 << 0;
        /// A `%filter` property transforms the input before parsing.
        const NEEDS_FILTER = 1 << 1;
        /// A field feeds a sink for incremental sub-parsing.
        const NEEDS_SINKS = 1 << 2;
        /// The grammar never needs look-ahead disambiguation or unbounded
        /// loops, so the runtime can seek rather than stream.
        const SUPPORTS_RANDOM_ACCESS = 1 << 3;
    }
}

fn has_attribute_named(ctx: &Context, attribute_set: NodeId, name: &str) -> bool {
    let AttributeSet { attributes } = match &ctx.node(attribute_set).kind {
        NodeKind::AttributeSet(set) => set,
        _ => return false,
    };
    attributes.iter().any(|&id| matches!(&ctx.node(id).kind, NodeKind::Attribute(a) if a.name == name))
}

fn uses_unbounded_or_lookahead(grammar: &Grammar) -> bool {
    grammar.ids().any(|id| {
        matches!(
            grammar.get(id),
            Production::LookAhead(..) | Production::Loop { control: LoopControl::Unbounded, .. }
        )
    })
}

/// Computes the feature flags for a unit's grammar. `properties`/`items`
/// are the unit's own property and field lists (for `%filter`/`&sink`
/// scanning); `sync_points` reports whether this unit had any
/// synchronization points collected for it.
pub fn compute_features(
    ctx: &Context,
    grammar: &Grammar,
    properties: &[NodeId],
    items: &[NodeId],
    sync_points: &SyncPoints,
) -> FeatureFlags {
    let mut flags = FeatureFlags::empty();

    let has_sync = sync_points.unit_properties.contains_key(&grammar.unit)
        || sync_points.synchronized_fields.iter().any(|&f| items.contains(&f));
    if has_sync {
        flags |= FeatureFlags::USES_SYNC_ADVANCE;
    }

    let has_filter = properties
        .iter()
        .any(|&p| matches!(&ctx.node(p).kind, NodeKind::Attribute(a) if a.name == "filter"));
    if has_filter {
        flags |= FeatureFlags::NEEDS_FILTER;
    }

    let needs_sinks = items.iter().any(|&item| match &ctx.node(item).kind {
        NodeKind::Statement(bpc_ast::Statement::UnitField(f)) => has_attribute_named(ctx, f.attributes, "sink"),
        _ => false,
    });
    if needs_sinks {
        flags |= FeatureFlags::NEEDS_SINKS;
    }

    if !uses_unbounded_or_lookahead(grammar) {
        flags |= FeatureFlags::SUPPORTS_RANDOM_ACCESS;
    }

    flags
}
