//! Conversions from GraphQL nodes into core records.
//!
//! Shopify omits or nulls many fields depending on scopes and shop setup.
//! Every missing value falls back to a default instead of failing the page.

use rust_decimal::Decimal;

use growth_pilot_core::{
    AbandonedCheckoutRecord, CheckoutId, CurrencyCode, CustomerId, CustomerRecord, LineItem,
    OrderCustomer, OrderId, OrderRecord, ProductId, ProductRecord, ShopInfo,
};

use super::queries::{
    AbandonedCheckoutNode, CustomerNode, MoneyBag, MoneyV2, OrderNode, ProductNode, ShopNode,
};

fn parse_amount(raw: &str) -> Decimal {
    raw.trim().parse().unwrap_or(Decimal::ZERO)
}

fn bag_amount(bag: Option<&MoneyBag>) -> Decimal {
    bag.map_or(Decimal::ZERO, |b| parse_amount(&b.shop_money.amount))
}

fn money_amount(money: Option<&MoneyV2>) -> Decimal {
    money.map_or(Decimal::ZERO, |m| parse_amount(&m.amount))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

pub fn order_record(node: OrderNode) -> OrderRecord {
    let currency = node
        .currency_code
        .as_deref()
        .or_else(|| {
            node.total_price_set
                .as_ref()
                .and_then(|b| b.shop_money.currency_code.as_deref())
        })
        .map_or_else(CurrencyCode::default, CurrencyCode::parse);

    OrderRecord {
        id: OrderId::new(node.id),
        name: node.name,
        created_at: node.created_at,
        currency,
        total: bag_amount(node.total_price_set.as_ref()),
        subtotal: bag_amount(node.subtotal_price_set.as_ref()),
        total_tax: bag_amount(node.total_tax_set.as_ref()),
        total_shipping: bag_amount(node.total_shipping_price_set.as_ref()),
        total_discounts: bag_amount(node.total_discounts_set.as_ref()),
        total_refunded: bag_amount(node.total_refunded_set.as_ref()),
        financial_status: node.display_financial_status.unwrap_or_default(),
        fulfillment_status: node.display_fulfillment_status.unwrap_or_default(),
        channel: non_empty(
            node.channel_information
                .and_then(|c| c.channel_definition)
                .and_then(|d| d.channel_name),
        ),
        gateway: non_empty(node.payment_gateway_names.into_iter().next()),
        country: non_empty(node.billing_address.and_then(|a| a.country)),
        customer: node.customer.map(|c| OrderCustomer {
            id: CustomerId::new(c.id),
            display_name: non_empty(c.display_name).unwrap_or_else(|| "Guest".to_string()),
            number_of_orders: c.number_of_orders,
        }),
        line_items: node
            .line_items
            .map(|c| c.nodes)
            .unwrap_or_default()
            .into_iter()
            .map(|li| LineItem {
                title: li.title,
                quantity: u64::try_from(li.quantity).unwrap_or(0),
            })
            .collect(),
        cancelled: node.cancelled_at.is_some(),
    }
}

pub fn product_record(node: ProductNode) -> ProductRecord {
    let min_price = node.price_range_v2.map(|r| r.min_variant_price);
    ProductRecord {
        id: ProductId::new(node.id),
        title: node.title,
        status: node.status.unwrap_or_default(),
        total_inventory: node.total_inventory.unwrap_or(0),
        price: money_amount(min_price.as_ref()),
        currency: min_price
            .as_ref()
            .and_then(|m| m.currency_code.as_deref())
            .map_or_else(CurrencyCode::default, CurrencyCode::parse),
        vendor: non_empty(node.vendor),
        product_type: non_empty(node.product_type),
        created_at: node.created_at,
    }
}

pub fn customer_record(node: CustomerNode) -> CustomerRecord {
    CustomerRecord {
        id: CustomerId::new(node.id),
        display_name: non_empty(node.display_name).unwrap_or_else(|| "Unnamed".to_string()),
        email: non_empty(node.email),
        orders_count: node.number_of_orders,
        amount_spent: money_amount(node.amount_spent.as_ref()),
        currency: node
            .amount_spent
            .as_ref()
            .and_then(|m| m.currency_code.as_deref())
            .map_or_else(CurrencyCode::default, CurrencyCode::parse),
        country: non_empty(node.default_address.and_then(|a| a.country)),
        created_at: node.created_at,
        updated_at: node.updated_at,
    }
}

pub fn abandoned_checkout_record(node: AbandonedCheckoutNode) -> AbandonedCheckoutRecord {
    AbandonedCheckoutRecord {
        id: CheckoutId::new(node.id),
        created_at: node.created_at,
        total: bag_amount(node.total_price_set.as_ref()),
    }
}

pub fn shop_info(node: ShopNode) -> ShopInfo {
    ShopInfo {
        name: node.name,
        email: non_empty(node.email),
        myshopify_domain: node.myshopify_domain,
        plan_name: node.plan.and_then(|p| non_empty(p.display_name)),
        currency: node
            .currency_code
            .as_deref()
            .map_or_else(CurrencyCode::default, CurrencyCode::parse),
    }
}
