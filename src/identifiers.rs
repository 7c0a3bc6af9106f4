use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Folds each contribution's external ids into `provider_ids`, in order.
///
/// Every source is trusted equally here: a later contribution overwrites an
/// earlier value for the same provider key. Locks do not apply to ids.
pub fn merge_provider_ids<'a, I>(provider_ids: &mut BTreeMap<String, String>, contributions: I)
where
    I: IntoIterator<Item = &'a HashMap<String, String>>,
{
    for ids in contributions {
        for (provider, id) in ids {
            if let Some(previous) = provider_ids.insert(provider.clone(), id.clone()) {
                if previous != *id {
                    debug!(provider = %provider, from = %previous, to = %id, "Provider id replaced");
                }
            }
        }
    }
}
