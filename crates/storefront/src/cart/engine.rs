//! The cart state machine.
//!
//! [`CartEngine`] is the single writer for cart state. Every operation takes
//! `&mut self`, so mutations are serialized by construction; readers observe
//! [`CartSnapshot`]s through a `watch` channel.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --init--> Loading --validated--> Ready
//!                                                  |
//!                    on_login: fetch server cart, merge guest cart once,
//!                              validate, push if anything changed
//! ```
//!
//! While authenticated, every mutation is persisted locally as an account
//! replica and scheduled on the [`CartPusher`]. Guests persist locally only.

use std::sync::Arc;

use shopkeep_core::{
    Cart, CartItem, CartSummary, HydrationState, Product, ProductId, format_price,
};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::api::{ServerCartLine, ShopApi};
use crate::error::{Result, StoreError};
use crate::notify::{Notification, Notifier};
use crate::storage::{GuestStore, StoreScope};

use super::merge::merge_carts;
use super::push::CartPusher;
use super::validator::StockValidator;

/// What readers see of the cart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    /// Bumped on every committed change.
    pub revision: u64,
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
    pub state: HydrationState,
}

impl CartSnapshot {
    /// Whether the first validation pass has completed.
    #[must_use]
    pub const fn hydrated(&self) -> bool {
        self.state.is_hydrated()
    }
}

/// Cart contents handed to the checkout flow.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutHandoff {
    pub items: Vec<CartItem>,
    pub summary: CartSummary,
}

/// Owns the cart and keeps local storage and the server in step with it.
pub struct CartEngine {
    api: Arc<dyn ShopApi>,
    store: GuestStore,
    notifier: Arc<dyn Notifier>,
    validator: StockValidator,
    pusher: CartPusher,
    cart: Cart,
    state: HydrationState,
    authenticated: bool,
    merge_pending: bool,
    revision: u64,
    snapshots: watch::Sender<CartSnapshot>,
}

impl CartEngine {
    /// Create an engine for a guest session. Must be called inside a Tokio
    /// runtime; the push worker is spawned immediately.
    pub fn new(api: Arc<dyn ShopApi>, store: GuestStore, notifier: Arc<dyn Notifier>) -> Self {
        let validator = StockValidator::new(api.clone(), notifier.clone());
        let pusher = CartPusher::spawn(api.clone());
        let (snapshots, _) = watch::channel(CartSnapshot::default());

        Self {
            api,
            store,
            notifier,
            validator,
            pusher,
            cart: Cart::new(),
            state: HydrationState::Uninitialized,
            authenticated: false,
            merge_pending: false,
            revision: 0,
            snapshots,
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// Receive a snapshot after every committed change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshots.subscribe()
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn state(&self) -> HydrationState {
        self.state
    }

    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        self.state.is_hydrated()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Whether a failed login merge is waiting for [`Self::retry_merge`].
    #[must_use]
    pub const fn merge_pending(&self) -> bool {
        self.merge_pending
    }

    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn summary(&self) -> CartSummary {
        self.cart.summary()
    }

    // =========================================================================
    // Hydration and server sync
    // =========================================================================

    /// Mark a restored session as authenticated without merging.
    ///
    /// Only meaningful before [`Self::init`].
    pub const fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Hydrate the cart.
    ///
    /// Guests load the persisted guest cart; authenticated sessions load the
    /// server cart. Either way the result is stock-validated before the
    /// engine reports [`HydrationState::Ready`].
    #[instrument(skip(self), fields(authenticated = self.authenticated))]
    pub async fn init(&mut self) {
        self.state = HydrationState::Loading;
        self.publish();

        if self.authenticated {
            if let Err(e) = self.sync_with_server(false).await {
                warn!(error = %e, "Initial server cart sync failed");
            }
        } else {
            let guest = self.store.load_cart().guest_cart();
            let result = self.validator.validate(guest.into_items()).await;
            self.cart = Cart::from_items(result.validated_items);
            self.persist();
        }

        self.state = HydrationState::Ready;
        self.commit();
        info!(lines = self.cart.len(), "Cart hydrated");
    }

    /// Replace the local cart with the server cart.
    ///
    /// With `merge_once` the persisted guest cart is folded in first (see
    /// [`merge_carts`]) and consumed on success: the result is saved locally
    /// as the account replica. It is pushed back when it differs from what
    /// the server sent.
    ///
    /// # Errors
    ///
    /// `StoreError::MergeFailed` when the server cart cannot be fetched during
    /// a merge; guest data is left untouched and [`Self::merge_pending`] is
    /// set. `StoreError::Api` for the same failure outside a merge, in which
    /// case the local replica stays in place.
    #[instrument(skip(self))]
    pub async fn sync_with_server(&mut self, merge_once: bool) -> Result<()> {
        let server_items: Vec<CartItem> = match self.api.cart().await {
            Ok(lines) => lines.iter().map(ServerCartLine::to_cart_item).collect(),
            Err(e) if merge_once => {
                warn!(error = %e, "Server cart fetch failed, guest cart kept for retry");
                self.merge_pending = true;
                self.notifier.notify(Notification::error(
                    "Could not sync your cart with your account. Your items are saved and will be merged when you retry.",
                ));
                return Err(StoreError::MergeFailed(e));
            }
            Err(e) => {
                warn!(error = %e, "Server cart fetch failed, keeping local replica");
                if self.cart.is_empty() {
                    self.adopt_account_replica().await;
                }
                return Err(e.into());
            }
        };

        let mut guest_contributed = false;
        let items = if merge_once {
            let guest = self.store.load_cart().guest_cart();
            let outcome = merge_carts(server_items, &guest);
            for line in &outcome.reduced {
                self.notifier.notify(Notification::warning(format!(
                    "Quantity of {} reduced from {} to {} due to limited stock",
                    line.name, line.requested, line.quantity
                )));
            }
            guest_contributed = outcome.guest_contributed;
            outcome.items
        } else {
            server_items
        };

        let result = self.validator.validate(items).await;
        self.cart = Cart::from_items(result.validated_items);
        self.merge_pending = false;
        self.persist();
        self.commit();

        if guest_contributed || result.changed {
            debug!(guest_contributed, validation_changed = result.changed, "Pushing reconciled cart");
            self.schedule_push();
        }
        Ok(())
    }

    /// Re-run a login merge that previously failed. No-op when none is pending.
    ///
    /// # Errors
    ///
    /// Same as [`Self::sync_with_server`] with `merge_once`.
    pub async fn retry_merge(&mut self) -> Result<()> {
        if !self.merge_pending {
            return Ok(());
        }
        self.sync_with_server(true).await
    }

    /// Guest-to-authenticated transition: merge the guest cart into the
    /// account.
    ///
    /// # Errors
    ///
    /// `StoreError::MergeFailed` if the server cart could not be fetched.
    pub async fn on_login(&mut self) -> Result<()> {
        self.authenticated = true;
        let result = self.sync_with_server(true).await;
        self.state = HydrationState::Ready;
        self.publish();
        result
    }

    /// Authenticated-to-guest transition: forget the account cart locally.
    ///
    /// Call [`Self::flush`] first so no push is still pending.
    pub fn on_logout(&mut self) {
        self.authenticated = false;
        self.merge_pending = false;
        self.cart.clear();
        if let Err(e) = self.store.clear_cart() {
            warn!(error = %e, "Failed to clear local cart on logout");
        }
        self.commit();
    }

    /// Wait until every scheduled server push has been attempted.
    pub async fn flush(&mut self) {
        self.pusher.flush().await;
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `qty` of a product, merging into an existing line.
    ///
    /// The product record is the caller's latest view of it; its stock is used
    /// for the check and cached on the line.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero, `OutOfStock` when nothing is available and
    /// `ExceedsStock` when the resulting quantity would be more than stock.
    /// Stock rejections are also reported through the notifier.
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub fn add_to_cart(&mut self, product: &Product, qty: u32) -> Result<()> {
        if qty == 0 {
            return Err(StoreError::InvalidQuantity(qty));
        }

        if !product.in_stock() {
            return Err(self.reject(StoreError::OutOfStock {
                id: product.id.clone(),
                name: product.name.clone(),
            }));
        }

        let requested = self.cart.quantity_of(&product.id).saturating_add(qty);
        if i64::from(requested) > product.count_in_stock {
            return Err(self.reject(StoreError::ExceedsStock {
                id: product.id.clone(),
                name: product.name.clone(),
                requested,
                available: product.count_in_stock,
            }));
        }

        self.cart.upsert(CartItem::from_product(product, qty));
        self.notifier.notify(Notification::success(format!(
            "Added {} to cart ({})",
            product.name,
            format_price(product.final_price())
        )));
        self.commit_mutation();
        Ok(())
    }

    /// Remove a line. Returns whether anything was removed.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn remove_from_cart(&mut self, id: &ProductId) -> bool {
        if self.cart.remove(id).is_none() {
            return false;
        }
        self.commit_mutation();
        true
    }

    /// Set the quantity of an existing line. Zero removes the line.
    ///
    /// # Errors
    ///
    /// `NotInCart` when there is no line for `id`, `ExceedsStock` when `qty`
    /// is more than the cached stock of the line.
    #[instrument(skip(self), fields(product_id = %id))]
    pub fn update_qty(&mut self, id: &ProductId, qty: u32) -> Result<()> {
        let Some(item) = self.cart.get(id) else {
            return Err(StoreError::NotInCart(id.clone()));
        };

        if qty == 0 {
            self.remove_from_cart(id);
            return Ok(());
        }

        if i64::from(qty) > item.count_in_stock {
            let err = StoreError::ExceedsStock {
                id: id.clone(),
                name: item.name.clone(),
                requested: qty,
                available: item.count_in_stock,
            };
            return Err(self.reject(err));
        }

        self.cart.set_quantity(id, qty);
        self.commit_mutation();
        Ok(())
    }

    /// Empty the cart. With `push` the empty cart is also sent to the server
    /// when authenticated.
    pub fn clear_cart(&mut self, push: bool) {
        self.cart.clear();
        self.persist();
        self.commit();
        if push && self.authenticated {
            self.schedule_push();
        }
    }

    /// Hand the cart to checkout and clear it locally.
    ///
    /// The server cart is left alone; the order flow owns it from here.
    pub fn begin_checkout(&mut self) -> CheckoutHandoff {
        let handoff = CheckoutHandoff {
            items: self.cart.items().to_vec(),
            summary: self.cart.summary(),
        };
        info!(
            lines = handoff.items.len(),
            subtotal = %handoff.summary.subtotal,
            "Cart handed to checkout"
        );
        self.clear_cart(false);
        handoff
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Offline fallback for an authenticated session: show the last account
    /// replica, validated like any other hydration. Guest-scoped data is never
    /// adopted here; it only enters an account through the login merge.
    async fn adopt_account_replica(&mut self) {
        let Some(replica) = self.store.load_cart().account_cart() else {
            debug!("No account replica stored, cart stays empty");
            return;
        };
        let result = self.validator.validate(replica.into_items()).await;
        self.cart = Cart::from_items(result.validated_items);
        self.commit();
    }

    fn reject(&self, err: StoreError) -> StoreError {
        debug!(error = %err, "Cart operation rejected");
        self.notifier.notify(Notification::error(err.to_string()));
        err
    }

    fn commit_mutation(&mut self) {
        self.persist();
        self.commit();
        if self.authenticated {
            self.schedule_push();
        }
    }

    fn commit(&mut self) {
        self.revision += 1;
        self.publish();
    }

    fn publish(&self) {
        self.snapshots.send_replace(CartSnapshot {
            revision: self.revision,
            items: self.cart.items().to_vec(),
            summary: self.cart.summary(),
            state: self.state,
        });
    }

    fn persist(&self) {
        let scope = if self.authenticated {
            StoreScope::Account
        } else {
            StoreScope::Guest
        };
        if let Err(e) = self.store.save_cart(&self.cart, scope) {
            warn!(error = %e, "Failed to persist cart locally");
        }
    }

    fn schedule_push(&mut self) {
        self.pusher.schedule(self.revision, self.cart.lines());
    }
}
