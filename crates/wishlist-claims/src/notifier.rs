use wishlist_types::WishlistSlug;

/// Receiver of "this wishlist changed" signals emitted after every commit.
///
/// Notification is fire-and-forget: it cannot fail the mutation that
/// triggered it, and it carries no description of what changed.
pub trait ChangeNotifier: Send + Sync {
    fn wishlist_changed(&self, slug: &WishlistSlug);
}

/// Notifier that drops every signal.
pub struct NoopNotifier;

impl ChangeNotifier for NoopNotifier {
    fn wishlist_changed(&self, _slug: &WishlistSlug) {}
}
