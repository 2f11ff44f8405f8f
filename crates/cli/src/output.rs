//! Terminal rendering for command results.

use shopkeep_core::{Cart, Favorites, NotificationLevel, Product, format_price};
use shopkeep_storefront::analytics::LiveCounters;
use shopkeep_storefront::cart::CheckoutHandoff;
use shopkeep_storefront::notify::Notification;

#[allow(clippy::print_stderr)]
pub fn print_fatal(err: &dyn std::error::Error) {
    eprintln!("error: {err}");
}

#[allow(clippy::print_stdout)]
pub fn print_notifications(notifications: &[Notification]) {
    for notification in notifications {
        let marker = match notification.level {
            NotificationLevel::Info => "i",
            NotificationLevel::Success => "+",
            NotificationLevel::Warning => "!",
            NotificationLevel::Error => "x",
        };
        println!("[{marker}] {}", notification.message);
    }
}

#[allow(clippy::print_stdout)]
pub fn print_product(product: &Product) {
    println!("{} ({})", product.name, product.id);
    if product.final_price() < product.price {
        println!(
            "  price:  {} (was {})",
            format_price(product.final_price()),
            format_price(product.price)
        );
    } else {
        println!("  price:  {}", format_price(product.price));
    }
    if product.in_stock() {
        println!("  stock:  {}", product.count_in_stock);
    } else {
        println!("  stock:  sold out");
    }
    if !product.brand.is_empty() {
        println!("  brand:  {}", product.brand);
    }
    if !product.category.is_empty() {
        println!("  category: {}", product.category);
    }
}

#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty");
        return;
    }

    for item in cart {
        println!(
            "{:>3} x {:<32} {:>10}  ({})",
            item.qty,
            item.name,
            format_price(item.line_total()),
            item.id
        );
    }

    let summary = cart.summary();
    println!("{} items, subtotal {}", summary.item_count, format_price(summary.subtotal));
    if !summary.savings.is_zero() {
        println!("You save {}", format_price(summary.savings));
    }
}

#[allow(clippy::print_stdout)]
pub fn print_checkout(handoff: &CheckoutHandoff) {
    if handoff.items.is_empty() {
        println!("Nothing to check out");
        return;
    }
    println!(
        "Checking out {} items for {}",
        handoff.summary.item_count,
        format_price(handoff.summary.subtotal)
    );
}

#[allow(clippy::print_stdout)]
pub fn print_favorites(favorites: &Favorites) {
    if favorites.is_empty() {
        println!("No favorites yet");
        return;
    }
    for product in favorites.items() {
        println!("{}  {}  {}", product.id, product.name, format_price(product.final_price()));
    }
}

#[allow(clippy::print_stdout)]
pub fn print_toggle(name: &str, now_favorite: bool) {
    if now_favorite {
        println!("Added {name} to favorites");
    } else {
        println!("Removed {name} from favorites");
    }
}

#[allow(clippy::print_stdout)]
pub fn print_counters(counters: &LiveCounters) {
    let line = counters
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("  ");
    match counters.updated_at() {
        Some(at) => println!("[{}] {line}", at.format("%H:%M:%S")),
        None => println!("{line}"),
    }
}
