use super::context::DecisionContext;

pub const DEFAULT_REASON: &str = "Default: Feature enabled (not specified in rules)";

/// Enables every requested feature the rules left undecided.
///
/// Returns the number of features that fell back to the default.
pub fn apply_defaults(context: &mut DecisionContext<'_>) -> usize {
    let requested = context.requested_features();
    let mut defaulted = 0;

    for feature in requested {
        if context.is_decided(feature) {
            continue;
        }
        context.set_feature(feature, true, DEFAULT_REASON.to_string());
        defaulted += 1;
    }

    defaulted
}
