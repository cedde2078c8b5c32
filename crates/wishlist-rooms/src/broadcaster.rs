use std::sync::Arc;

use wishlist_claims::ChangeNotifier;
use wishlist_types::WishlistSlug;

use crate::event::RoomEvent;
use crate::registry::RoomRegistry;

/// Turns committed ledger changes into `wishlist_updated` room events.
///
/// Constructed once at startup and handed to the claim engine and catalog
/// as their [`ChangeNotifier`].
pub struct UpdateBroadcaster {
    registry: Arc<RoomRegistry>,
}

impl UpdateBroadcaster {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this broadcaster delivers to.
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }
}

impl ChangeNotifier for UpdateBroadcaster {
    fn wishlist_changed(&self, slug: &WishlistSlug) {
        self.registry
            .broadcast(slug, &RoomEvent::wishlist_updated(slug.clone()));
    }
}
