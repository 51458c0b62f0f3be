use anyhow::Result;

use storefront_core::cart::{Cart, CartReconciler, MutationReport, ProductSnapshot};

use super::context::AppContext;

pub fn show(ctx: &AppContext) -> Result<()> {
    let mut cart = ctx.open_cart()?;
    warn_restore_failure(&cart);
    print_cart(cart.observe());
    Ok(())
}

pub fn add(
    ctx: &AppContext,
    product_id: String,
    name: String,
    price: f64,
    quantity: u32,
    image: Option<String>,
) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        anyhow::bail!("Price must be a non-negative number, got {}", price);
    }
    let mut product = ProductSnapshot::new(product_id, name, price);
    if let Some(image) = image {
        product = product.with_image(image);
    }

    let mut cart = ctx.open_cart()?;
    let report = cart.add_item(product, quantity);
    finish(&cart, &report);
    Ok(())
}

pub fn update(ctx: &AppContext, id: &str, quantity: i64) -> Result<()> {
    let mut cart = ctx.open_cart()?;
    let report = cart.update_quantity(id, quantity);
    if !report.changed {
        println!("No line '{}' in the cart.", id);
    }
    finish(&cart, &report);
    Ok(())
}

pub fn remove(ctx: &AppContext, id: &str) -> Result<()> {
    let mut cart = ctx.open_cart()?;
    let report = cart.remove_item(id);
    if !report.changed {
        println!("No line '{}' in the cart.", id);
    }
    finish(&cart, &report);
    Ok(())
}

pub fn clear(ctx: &AppContext) -> Result<()> {
    let mut cart = ctx.open_cart()?;
    let report = cart.clear();
    finish(&cart, &report);
    Ok(())
}

fn finish(cart: &CartReconciler, report: &MutationReport) {
    if let Some(e) = &report.persistence_error {
        eprintln!("⚠️  Change applied but not saved: {}", e);
    }
    print_cart(cart.cart());
}

fn warn_restore_failure(cart: &CartReconciler) {
    if let Some(e) = cart.persistence_failure() {
        eprintln!("⚠️  Stored cart could not be read: {}", e);
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        println!("Cart is empty.");
        return;
    }
    for item in cart.items() {
        println!(
            "{:<12} {:<30} {:>4} x {:>9.2} = {:>10.2}",
            item.id,
            item.name,
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    println!(
        "{} items, subtotal {:.2}",
        cart.total_quantity(),
        cart.subtotal()
    );
}
