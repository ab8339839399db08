/// Determines what happens when the same item is added to a group more than once.
///
/// Items are always compared by identity (the address of the shared allocation), never by value.
/// Two distinct items that compare equal by value are never treated as duplicates.
///
/// By default, a group ignores repeated registrations of an item it already holds.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use reference_map::{DuplicatePolicy, ReferenceMap};
///
/// let map = ReferenceMap::<&str, String>::builder()
///     .duplicates(DuplicatePolicy::Allow)
///     .build();
///
/// let listener = Arc::new("listener".to_string());
/// map.add("key", &listener);
/// map.add("key", &listener);
///
/// // Two registrations, so the first removal leaves one behind.
/// map.remove("key", &*listener);
/// assert!(map.has("key"));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum DuplicatePolicy {
    /// Adding an item that is already in the group is a no-op. This is the default.
    #[default]
    Reject,

    /// Every add creates a separate registration and every remove drops exactly one.
    Allow,
}
