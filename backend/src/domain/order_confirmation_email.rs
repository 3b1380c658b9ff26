//! Rendering of the order confirmation message.
//!
//! The text and HTML bodies come from the `order_confirmation.*` Askama
//! templates and always carry the same information.

use crate::domain::order_record::{OrderItem, OrderRecord};
use askama::Template;
use chrono::{DateTime, Utc};

const NOT_AVAILABLE: &str = "N/A";
const DEFAULT_CUSTOMER_NAME: &str = "Customer";
const DEFAULT_ITEM_NAME: &str = "Unnamed item";

/// An order with every missing field replaced by its default.
#[derive(Debug)]
pub struct OrderSummary {
    pub customer_name: String,
    pub confirmation_number: String,
    pub items: Vec<ItemLine>,
    pub total_price: String,
    pub shipping_address: String,
    pub payment_method: String,
    pub order_date: String,
}

#[derive(Debug)]
pub struct ItemLine {
    pub name: String,
    pub quantity: u32,
    pub price: String,
}

impl OrderSummary {
    /// `now` stands in for a missing order timestamp.
    pub fn from_record(order: &OrderRecord, now: DateTime<Utc>) -> Self {
        let items = order
            .items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(ItemLine::from)
            .collect();

        Self {
            customer_name: or_default(&order.name, DEFAULT_CUSTOMER_NAME),
            confirmation_number: or_default(&order.confirmation_number, NOT_AVAILABLE),
            items,
            total_price: format_price(order.total_price.unwrap_or_default()),
            shipping_address: or_default(&order.shipping_address, NOT_AVAILABLE),
            payment_method: or_default(&order.payment_method, NOT_AVAILABLE),
            order_date: order
                .timestamp
                .unwrap_or(now)
                .format("%B %-d, %Y %H:%M UTC")
                .to_string(),
        }
    }
}

impl From<&OrderItem> for ItemLine {
    fn from(item: &OrderItem) -> Self {
        Self {
            name: or_default(&item.name, DEFAULT_ITEM_NAME),
            quantity: item.quantity.unwrap_or(1),
            price: format_price(item.price.unwrap_or_default()),
        }
    }
}

fn or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn format_price(price: f64) -> String {
    format!("{:.2}", price)
}

#[derive(Template)]
#[template(path = "order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a OrderSummary,
}

#[derive(Template)]
#[template(path = "order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a OrderSummary,
}

/// A rendered confirmation, ready to hand to an [`EmailClient`](crate::domain::email_client::EmailClient).
#[derive(Debug)]
pub struct OrderConfirmationEmail {
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl OrderConfirmationEmail {
    pub fn render(summary: &OrderSummary) -> Result<Self, askama::Error> {
        let html_body = OrderConfirmationHtml { order: summary }.render()?;
        let text_body = OrderConfirmationText { order: summary }.render()?;

        Ok(Self {
            subject: format!("Order Confirmation - {}", summary.confirmation_number),
            html_body,
            text_body,
        })
    }
}
